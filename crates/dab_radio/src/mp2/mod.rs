pub mod mp2_frame_processor;

pub use mp2_frame_processor::{Mp2FrameHeader, Mp2FrameProcessor, Mp2Observer};
