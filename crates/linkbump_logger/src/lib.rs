pub mod global_loggers;
pub mod log_errors;
pub mod log_level;
pub mod logger_impl;
pub mod terminal_escape_code;
pub mod terminal_macros;

pub use global_loggers::{core_logger_init, logger_init};
pub use log_errors::LogError;
pub use log_level::*;
pub use logger_impl::{LogTarget, Logger, LoggerBuilder, CORE_LEVEL_ENV, CORE_LOGGER_NAME};
pub use terminal_escape_code::*;
