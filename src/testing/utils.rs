use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Poll `predicate` until it holds or `timeout` elapses.
pub async fn wait_until<P>(predicate: P, timeout: Duration) -> bool
where
    P: Fn() -> bool,
{
    let start = Instant::now();
    let interval = Duration::from_millis(10);

    while start.elapsed() < timeout {
        if predicate() {
            return true;
        }
        sleep(interval).await;
    }
    predicate()
}
