//! Push items through a four-shard weighted queue on a local Redis.
//!
//! Run with: `cargo run --example basic` (requires redis on 127.0.0.1:6379).

use rand::Rng;
use std::time::Duration;
use weightq::{QueueConfig, QueueEvent, WeightedQueue};

#[tokio::main]
async fn main() -> weightq::Result<()> {
    tracing_subscriber::fmt::init();

    let config = QueueConfig::new(vec![10.0, 3.0, 2.0, 1.0])
        .with_redis_url("redis://127.0.0.1:6379")
        .with_base_key("mylists")
        .with_max_size(1_000_000);
    let shard_count = config.shard_count();

    let queue = WeightedQueue::connect(config).await?;

    let mut events = queue.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let QueueEvent::SizeChange { size } = event {
                println!("size {size}");
            }
        }
    });

    for _ in 0..1000 {
        let shard = rand::thread_rng().gen_range(0..shard_count);
        queue.put(shard, &((shard + 1) * 100)).await?;
    }

    // Give the size broadcasts a moment to fan out before consuming.
    tokio::time::sleep(Duration::from_secs(2)).await;

    while let Some(item) = queue.get::<usize>().await? {
        println!("size={} data={}", queue.size(), item);
    }

    Ok(())
}
