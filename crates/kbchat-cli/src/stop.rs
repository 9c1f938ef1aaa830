//! Stop handling: Ctrl-C and the optional deadline both trigger the same
//! cancellation token that the running stream watches.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Watches for stop triggers until dropped.
pub struct StopGuard {
    task: JoinHandle<()>,
}

impl Drop for StopGuard {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Cancel `token` on Ctrl-C, or once `deadline` elapses if one is given.
pub fn watch(token: CancellationToken, deadline: Option<Duration>) -> StopGuard {
    let task = tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => return,
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    // no signal handler means we can only rely on the deadline
                    debug!(error = %e, "ctrl-c handler unavailable");
                    wait_deadline(deadline).await;
                    info!("deadline reached, stopping stream");
                } else {
                    info!("interrupt received, stopping stream");
                }
            }
            _ = wait_deadline(deadline) => {
                info!("deadline reached, stopping stream");
            }
        }
        token.cancel();
    });
    StopGuard { task }
}

async fn wait_deadline(deadline: Option<Duration>) {
    match deadline {
        Some(d) => tokio::time::sleep(d).await,
        None => std::future::pending().await,
    }
}
