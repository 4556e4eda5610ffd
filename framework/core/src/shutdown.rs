use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast::{error::RecvError, Receiver, Sender};

/// Run-wide cancellation signal.
///
/// A passive uperf server is expected to run until it is cancelled, either by its timeout or by
/// this handle. Client runs listen to the same handle so that an interrupted run still cleans up
/// its child process and profile.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: Sender<()>,
    triggered: Arc<AtomicBool>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self {
            sender: tokio::sync::broadcast::channel(1).0,
            triggered: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Signal every listener, including listeners created after this call.
    pub fn shutdown(&self) {
        self.triggered.store(true, Ordering::SeqCst);
        if let Err(e) = self.sender.send(()) {
            // Nobody is waiting yet. Late listeners still observe the flag.
            log::trace!("No active shutdown listeners: {e:?}");
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    pub fn new_listener(&self) -> DelegatedShutdownListener {
        DelegatedShutdownListener {
            receiver: self.sender.subscribe(),
            triggered: self.triggered.clone(),
        }
    }
}

#[derive(Debug)]
pub struct DelegatedShutdownListener {
    receiver: Receiver<()>,
    triggered: Arc<AtomicBool>,
}

impl DelegatedShutdownListener {
    /// Point in time check for the shutdown signal.
    pub fn should_shutdown(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Wait until the shutdown signal is received.
    ///
    /// Safe to race against other futures in a `select!`. If every [`ShutdownHandle`] has been
    /// dropped without signalling then this never completes.
    pub async fn wait_for_shutdown(&mut self) {
        if self.should_shutdown() {
            return;
        }

        loop {
            match self.receiver.recv().await {
                Ok(()) => return,
                Err(RecvError::Lagged(_)) => {
                    if self.should_shutdown() {
                        return;
                    }
                }
                Err(RecvError::Closed) => {
                    if self.should_shutdown() {
                        return;
                    }
                    std::future::pending::<()>().await;
                }
            }
        }
    }
}

/// Returned when work is abandoned because the shutdown signal was received.
#[derive(derive_more::Error, derive_more::Display, Debug)]
pub struct ShutdownSignalError {
    msg: String,
}

impl Default for ShutdownSignalError {
    fn default() -> Self {
        Self {
            msg: "Execution cancelled by shutdown signal".to_string(),
        }
    }
}
