//! Application startup utilities

mod logging;

pub use logging::{LogRotation, LoggingConfig, LoggingGuard, init_logging};
