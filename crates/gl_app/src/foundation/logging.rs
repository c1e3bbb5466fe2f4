//! Logging utilities and structured logging support

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system
///
/// Safe to call more than once; later calls are ignored. Tests and binaries
/// can both call this without coordinating.
pub fn init() {
    let _ = env_logger::builder().is_test(cfg!(test)).try_init();
}

/// Error callback handed to GLFW
///
/// Forwards native windowing-library errors into the `log` facade.
#[allow(clippy::needless_pass_by_value)]
pub fn glfw_error_callback(error: glfw::Error, description: String) {
    log::error!("GLFW error {:?}: {}", error, description);
}
