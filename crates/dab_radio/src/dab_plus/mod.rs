pub mod firecode;
pub mod reed_solomon;
pub mod superframe;

pub use reed_solomon::ReedSolomonDecoder;
pub use superframe::{AacObserver, SuperframeAssembler, SuperframeHeader};
