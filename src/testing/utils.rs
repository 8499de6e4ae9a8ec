use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Polling interval for [`wait_for`].
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Poll `condition` until it returns true or `timeout` elapses.
///
/// Returns whether the condition was met. Useful for waiting on
/// eventually-consistent state such as cached shard sizes converging after
/// a broadcast.
pub async fn wait_for<F>(mut condition: F, timeout: Duration) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(POLL_INTERVAL).await;
    }
}
