//! Cooperative cancellation: per-session tokens plus a process-wide signal flag

use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;

/// Global shutdown flag, set by the SIGINT/SIGTERM handler
fn shutdown_flag() -> &'static AtomicBool {
    static FLAG: AtomicBool = AtomicBool::new(false);
    &FLAG
}

/// Check if shutdown was requested from the terminal
pub fn is_shutdown_requested() -> bool {
    shutdown_flag().load(Ordering::Relaxed)
}

/// Whether a worker should stop before issuing its next request.
///
/// Checked only at iteration boundaries; an in-flight request always runs
/// to completion first.
pub fn should_stop(token: &CancellationToken) -> bool {
    token.is_cancelled() || is_shutdown_requested()
}

/// First signal sets the shutdown flag, a second one exits with 130.
pub fn install_signal_handlers() -> std::io::Result<()> {
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        // SAFETY: AtomicBool::swap and process::exit are async-signal-safe
        unsafe {
            signal_hook::low_level::register(signal, || {
                if shutdown_flag().swap(true, Ordering::Relaxed) {
                    std::process::exit(130);
                }
            })?;
        }
    }
    Ok(())
}
