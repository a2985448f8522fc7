pub use linkbump_logger as log;
pub use linkbump_memory as memory;
