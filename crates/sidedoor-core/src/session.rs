//! Session state and the bounded keep-alive loop.

use std::time::Duration;

use anyhow::Result;
use tokio::time::Instant;
use tracing::info;

/// Fixed sleep between keep-alive ticks, the loop's sole suspension point.
pub const TICK_INTERVAL: Duration = Duration::from_secs(5);

/// Mutable state owned by the session controller. Created at process start,
/// mutated only by the keep-alive loop, never shared across threads.
#[derive(Debug)]
pub struct SessionState {
    pub started_at: Instant,
    pub running: bool,
    pub public_endpoint: Option<String>,
}

impl SessionState {
    pub fn new(public_endpoint: Option<String>) -> Self {
        Self {
            started_at: Instant::now(),
            running: false,
            public_endpoint,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Terminal outcome of the keep-alive state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepAliveState {
    Active,
    Expired,
}

/// Run the keep-alive loop until the timeout budget is spent.
///
/// Each iteration invokes `tick` (status reporting, log tailing), then checks
/// elapsed wall-clock time against the budget; on expiry the loop exits
/// immediately with [`KeepAliveState::Expired`] and no further ticks. A zero
/// timeout still ticks exactly once. An error from `tick` aborts the loop at
/// once and propagates; the state stays non-terminal in that case.
pub async fn run_keep_alive<F>(
    state: &mut SessionState,
    timeout: Duration,
    mut tick: F,
) -> Result<KeepAliveState>
where
    F: FnMut(&SessionState) -> Result<()>,
{
    state.started_at = Instant::now();
    state.running = true;

    loop {
        tick(state)?;
        if state.elapsed() >= timeout {
            state.running = false;
            info!(elapsed_secs = state.elapsed().as_secs(), "session timeout reached");
            return Ok(KeepAliveState::Expired);
        }
        tokio::time::sleep(TICK_INTERVAL).await;
    }
}
