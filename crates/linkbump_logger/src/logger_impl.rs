use std::{fs::OpenOptions, io::Write};

use crate::{log_errors::LogError, log_level::LogLevel, TerminalEscapeSequence, RESET};

pub const CORE_LOGGER_NAME: &str = "core";

/// Environment variable that overrides the core logger's minimum level.
pub const CORE_LEVEL_ENV: &str = "LINKBUMP_LOG";

const DEFAULT_TIME_FORMAT: &str = "%H:%M:%S%.3f";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogTarget {
    Stdout,
    Stderr,
    File(Box<str>),
}

#[derive(Debug, Clone)]
pub struct Logger {
    pub min_level: LogLevel,
    pub label: &'static str,
    pub targets: Vec<LogTarget>,
    pub time_format: &'static str,
}

impl Default for Logger {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Debug,
            label: "System",
            targets: vec![LogTarget::Stdout, LogTarget::Stderr],
            time_format: DEFAULT_TIME_FORMAT,
        }
    }
}

impl Logger {
    /// The logger the allocator crates write into. Chunk traffic is chatty,
    /// so only warnings and above are shown unless `LINKBUMP_LOG` names a
    /// lower level.
    pub fn default_core() -> Self {
        let min_level = std::env::var(CORE_LEVEL_ENV)
            .ok()
            .and_then(|level| level.parse().ok())
            .unwrap_or(LogLevel::Warn);
        Self {
            label: "Core",
            min_level,
            ..Default::default()
        }
    }

    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn accepts(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    pub fn log(&self, level: LogLevel, msg: &str) {
        if !self.accepts(level) {
            return;
        }

        let time = chrono::Local::now().format(self.time_format).to_string();

        for target in self.targets.iter() {
            if let Err(e) = self.log_to_target(target, level, &time, msg) {
                eprintln!("{e}");
            }
        }
    }

    fn log_to_target(
        &self,
        target: &LogTarget,
        level: LogLevel,
        time: &str,
        msg: &str,
    ) -> Result<(), LogError> {
        // Errors go to stderr, everything else to stdout, when both are targets.
        if (target == &LogTarget::Stdout && level >= LogLevel::Error)
            || (target == &LogTarget::Stderr && level < LogLevel::Error)
        {
            return Ok(());
        }
        match target {
            LogTarget::Stdout | LogTarget::Stderr => {
                let line = format!(
                    "{}{} - {} [{}]: {}{}",
                    TerminalEscapeSequence::from(level),
                    time,
                    self.label,
                    level,
                    msg,
                    TerminalEscapeSequence::from(RESET),
                );
                if target == &LogTarget::Stdout {
                    println!("{line}");
                } else {
                    eprintln!("{line}");
                }
                Ok(())
            }
            LogTarget::File(path) => {
                let mut file = OpenOptions::new()
                    .append(true)
                    .create(true)
                    .open(&**path)
                    .map_err(|source| LogError::CouldNotOpenFile {
                        path: path.to_string(),
                        source,
                    })?;

                let line = format!("{} - {} [{}]: {}\n", time, self.label, level, msg);
                file.write_all(line.as_bytes())
                    .map_err(|source| LogError::CouldNotWriteToFile {
                        path: path.to_string(),
                        source,
                    })
            }
        }
    }
}

#[derive(Debug)]
pub struct LoggerBuilder {
    logger: Logger,
}

impl LoggerBuilder {
    pub fn new() -> Self {
        Self {
            logger: Logger {
                targets: vec![LogTarget::Stdout],
                ..Default::default()
            },
        }
    }

    pub fn min_level(mut self, min_level: LogLevel) -> Self {
        self.logger.min_level = min_level;
        self
    }

    pub fn label(mut self, label: &'static str) -> Self {
        self.logger.label = label;
        self
    }

    pub fn time_format(mut self, time_format: &'static str) -> Self {
        self.logger.time_format = time_format;
        self
    }

    pub fn targets(mut self, targets: Vec<LogTarget>) -> Self {
        self.logger.targets = targets;
        self
    }

    pub fn build(self) -> Logger {
        self.logger
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
