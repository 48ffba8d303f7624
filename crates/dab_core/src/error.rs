use thiserror::Error;

/// Errors shared by the bitstream-level decoders in this crate.
#[derive(Debug, Error)]
pub enum DabCoreError {
    #[error("buffer length {actual} does not match expected length {expected}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("CRC check failed")]
    CrcMismatch,
    #[error("value {value} out of range [{min},{max}]")]
    OutOfRange { value: i64, min: i64, max: i64 },
}
