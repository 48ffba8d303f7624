pub mod data_group;
pub mod mot_processor;
pub mod packet_processor;

pub use data_group::{parse_data_group_header, DataGroupHeader};
pub use mot_processor::{MotEntity, MotGroupType, MotObserver, MotProcessor, SegmentKind};
pub use packet_processor::{PacketHeader, PacketProcessor};
