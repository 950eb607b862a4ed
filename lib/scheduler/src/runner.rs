//! Fixed-delay background loop around an engine run.

use crate::engine::RunReport;
use crate::error::SchedulerError;
use duebell_core::Result;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// Timing for one background loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Pause between the end of one run and the start of the next.
    pub interval: Duration,
    /// Wall-clock budget for a single run. An overrunning run is dropped.
    pub budget: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            budget: Duration::from_secs(50),
        }
    }
}

/// Calls `run` repeatedly until `shutdown` turns true or its sender is dropped.
///
/// Runs never overlap: the delay starts only once a run finishes or is
/// abandoned. Errors and timeouts are logged and the loop carries on.
pub async fn run_fixed_delay<F, Fut>(
    name: &'static str,
    config: RunnerConfig,
    mut shutdown: watch::Receiver<bool>,
    mut run: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<RunReport, SchedulerError>>,
{
    info!(engine = name, interval = ?config.interval, "trigger engine started");
    loop {
        if *shutdown.borrow() {
            break;
        }
        match tokio::time::timeout(config.budget, run()).await {
            Ok(Ok(_)) => {}
            Ok(Err(error)) => warn!(engine = name, %error, "trigger run failed"),
            Err(_) => warn!(engine = name, budget = ?config.budget, "trigger run abandoned"),
        }
        tokio::select! {
            () = tokio::time::sleep(config.interval) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
    info!(engine = name, "trigger engine stopped");
}
