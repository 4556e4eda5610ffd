use tokio::signal;
use uperf_core::prelude::ShutdownHandle;

/// Trigger the returned handle when the user presses Ctrl-C.
///
/// Must be called from within a Tokio runtime.
pub fn start_shutdown_listener() -> ShutdownHandle {
    let handle = ShutdownHandle::default();

    let listener_handle = handle.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                log::info!("Received shutdown signal, shutting down...");
                listener_handle.shutdown();
            }
            Err(e) => log::error!("Failed to listen for Ctrl-C: {e}"),
        }
    });

    handle
}
