//! MSC data group header (ETSI EN 300 401 Clause 5.3.3.1), the layer that
//! wraps a reassembled packet-mode data group before `MotProcessor`'s own
//! inner segmentation header. No literal source file for this header made it
//! into the retrieval pack, so the field shape here follows the general
//! `(extension, crc, segment, user_access, type)` byte layout EN 300 401 uses
//! for every MSC data group rather than a ported implementation.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataGroupHeader {
    pub data_group_type: u8,
    pub transport_id: Option<u16>,
    pub segment_number: u16,
    pub is_last_segment: bool,
    pub has_crc: bool,
}

/// Parses the leading data group header and returns it alongside the byte
/// offset where the segment payload (the 2-byte MOT segmentation header plus
/// data, consumed by `MotProcessor::push_segment`) begins.
pub fn parse_data_group_header(data_group: &[u8]) -> Option<(DataGroupHeader, usize)> {
    if data_group.is_empty() {
        return None;
    }
    let b0 = data_group[0];
    let extension_flag = (b0 & 0b1000_0000) != 0;
    let crc_flag = (b0 & 0b0100_0000) != 0;
    let segment_flag = (b0 & 0b0010_0000) != 0;
    let user_access_flag = (b0 & 0b0001_0000) != 0;
    let data_group_type = b0 & 0b0000_1111;
    let mut i = 1usize;

    let (segment_number, is_last_segment) = if segment_flag {
        if i + 2 > data_group.len() {
            return None;
        }
        let is_last_segment = (data_group[i] & 0b1000_0000) != 0;
        let segment_number = (((data_group[i] as u16) & 0b0111_1111) << 8) | data_group[i + 1] as u16;
        i += 2;
        (segment_number, is_last_segment)
    } else {
        (0, true)
    };

    let transport_id = if user_access_flag {
        if i >= data_group.len() {
            return None;
        }
        let transport_id_flag = (data_group[i] & 0b0001_0000) != 0;
        let length_indicator = (data_group[i] & 0b0000_1111) as usize;
        i += 1;
        let transport_id = if transport_id_flag {
            if i + 2 > data_group.len() {
                return None;
            }
            let id = ((data_group[i] as u16) << 8) | data_group[i + 1] as u16;
            i += 2;
            Some(id)
        } else {
            None
        };
        let end_user_address_len = length_indicator.saturating_sub(if transport_id_flag { 2 } else { 0 });
        i += end_user_address_len.min(data_group.len().saturating_sub(i));
        transport_id
    } else {
        None
    };

    if extension_flag {
        if i + 2 > data_group.len() {
            return None;
        }
        i += 2;
    }

    Some((DataGroupHeader { data_group_type, transport_id, segment_number, is_last_segment, has_crc: crc_flag }, i))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_only_flag_byte() {
        let data_group = [0b0000_0011u8, 0xAA, 0xBB];
        let (header, consumed) = parse_data_group_header(&data_group).unwrap();
        assert_eq!(header.data_group_type, 3);
        assert_eq!(header.transport_id, None);
        assert!(header.is_last_segment);
        assert_eq!(consumed, 1);
    }

    #[test]
    fn segment_field_and_user_access_field_with_transport_id() {
        // segment flag + user access flag, type=4, segment header last=1 number=5,
        // user access header: transport_id_flag set, length_indicator=2 (just the id)
        let data_group = [0b0011_0100u8, 0b1000_0000, 0x05, 0b0001_0010, 0x12, 0x34, 0xFF];
        let (header, consumed) = parse_data_group_header(&data_group).unwrap();
        assert_eq!(header.data_group_type, 4);
        assert!(header.is_last_segment);
        assert_eq!(header.segment_number, 5);
        assert_eq!(header.transport_id, Some(0x1234));
        assert_eq!(consumed, 6);
    }
}
