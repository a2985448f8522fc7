use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationError {
    #[error("Not enough memory to allocate {requested} bytes")]
    OutOfMemory { requested: usize },
    #[error("Alignment {align} is not a power of two")]
    InvalidAlignment { align: usize },
    #[error("Cannot lay out {requested} bytes aligned to {align} in a single chunk")]
    SizeOverflow { requested: usize, align: usize },
}
