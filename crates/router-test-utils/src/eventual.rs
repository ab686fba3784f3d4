//! Polling assertions for effects produced by spawned tasks.

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Default bound for in-process effects.
pub const DEFAULT_EVENTUAL_TIMEOUT: Duration = Duration::from_secs(2);

const INITIAL_DELAY: Duration = Duration::from_millis(5);
const MAX_DELAY: Duration = Duration::from_millis(100);

/// Wait until `condition` returns true, polling with exponential backoff.
///
/// Returns an error describing the timeout if the condition never holds.
pub async fn assert_eventually<F, Fut>(timeout: Duration, mut condition: F) -> Result<(), String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = Instant::now();
    let mut delay = INITIAL_DELAY;

    loop {
        if condition().await {
            return Ok(());
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Err(format!("Condition not met within {timeout:?}"));
        }

        sleep(delay.min(timeout.saturating_sub(elapsed))).await;
        delay = (delay * 2).min(MAX_DELAY);
    }
}

/// Wait until a synchronous `condition` holds, panicking after
/// [`DEFAULT_EVENTUAL_TIMEOUT`].
///
/// Suited to checks over mock call logs, which need no `.await`.
pub async fn wait_until<F>(what: &str, mut condition: F)
where
    F: FnMut() -> bool,
{
    let result = assert_eventually(DEFAULT_EVENTUAL_TIMEOUT, || {
        let met = condition();
        async move { met }
    })
    .await;
    if let Err(e) = result {
        panic!("{what}: {e}");
    }
}
