use thiserror::Error;

/// Reasons a CLI-level or configuration-level operation in this crate can fail.
/// In-band per-frame/per-FIG/per-packet errors are never represented this way;
/// those are dropped-and-counted per the core's never-panic policy.
#[derive(Debug, Error)]
pub enum DabRadioError {
    #[error("subchannel {0} is not configured")]
    UnknownSubchannel(u32),
    #[error("subchannel {id} has contradictory or missing configuration: {reason}")]
    BadSubchannelConfig { id: u32, reason: &'static str },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
