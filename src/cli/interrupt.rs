//! Ctrl-C handling
//!
//! The first interrupt asks the run to stop at the next turn boundary. A
//! second one gives up on waiting and exits the process.

use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Exit status used when the user forces an exit
pub const FORCED_EXIT_CODE: i32 = 130;

/// What an interrupt should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptAction {
    /// Cancel the run and let the current turn finish
    Cancel,
    /// Leave immediately
    Exit,
}

/// Tracks interrupts received during one run
#[derive(Debug)]
pub struct Interrupts {
    cancel: CancellationToken,
    received: usize,
}

impl Interrupts {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel, received: 0 }
    }

    /// Record an interrupt and decide what to do about it
    pub fn press(&mut self) -> InterruptAction {
        self.received += 1;
        if self.received == 1 {
            self.cancel.cancel();
            InterruptAction::Cancel
        } else {
            InterruptAction::Exit
        }
    }

    /// Listen for Ctrl-C until the process exits
    pub async fn watch(mut self) {
        while tokio::signal::ctrl_c().await.is_ok() {
            match self.press() {
                InterruptAction::Cancel => {
                    warn!("interrupt received, stopping after the current turn (Ctrl-C again to quit)");
                }
                InterruptAction::Exit => {
                    warn!("second interrupt, exiting");
                    std::process::exit(FORCED_EXIT_CODE);
                }
            }
        }
    }
}
