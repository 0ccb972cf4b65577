//! Graceful stop support via atomic flag

use std::sync::atomic::{AtomicBool, Ordering};

/// Global stop flag, set by the SIGTERM/SIGINT handler.
///
/// The fetch loop finishes the record in hand, then returns.
pub fn shutdown_flag() -> &'static AtomicBool {
    static FLAG: AtomicBool = AtomicBool::new(false);
    &FLAG
}

/// Check if shutdown was requested
pub fn is_shutdown_requested() -> bool {
    shutdown_flag().load(Ordering::Relaxed)
}
