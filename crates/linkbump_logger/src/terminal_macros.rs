#[macro_export]
macro_rules! escape_sequence {
    ($($code:expr),*) => {
        $crate::TerminalEscapeSequence(vec![$($code),*])
    };
}

/// Formats and sends a message to a named logger from the global registry.
/// Arguments are only formatted when the logger exists and accepts `$log_level`.
#[macro_export]
macro_rules! log_to_global {
    ($logger_name: expr, $log_level: expr, $($args: tt)+) => {{
        let level: $crate::LogLevel = $log_level;
        if $crate::global_loggers::is_enabled($logger_name, level) {
            $crate::global_loggers::log_to($logger_name, level, format!($($args)+));
        }
    }};
}

#[macro_export]
macro_rules! core_debug {
    ($($args: tt)+) => {
        $crate::log_to_global!($crate::CORE_LOGGER_NAME, $crate::LogLevel::Debug, $($args)+)
    };
}

#[macro_export]
macro_rules! core_warn {
    ($($args: tt)+) => {
        $crate::log_to_global!($crate::CORE_LOGGER_NAME, $crate::LogLevel::Warn, $($args)+)
    };
}
