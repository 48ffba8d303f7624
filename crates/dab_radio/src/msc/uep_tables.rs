//! Unequal error protection (UEP) table: 64 rows indexed by the `uep_table_index`
//! field carried on FIG 0/1's short form.
//!
//! DOC: ETSI EN 300 401 Table 8 (subchannel size, bitrate, protection level)
//! combined with Table 15 (puncture codes and padding bits), ported verbatim
//! from `subchannel_protection_tables.h`'s `UEP_PROTECTION_TABLE`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UepTableRow {
    pub subchannel_size_cu: u16,
    pub bitrate_kbps: u16,
    pub protection_level: u8,
    pub l: [u16; 4],
    pub pi: [u8; 4],
    pub padding_bits: u16,
}

const NB_ROWS: usize = 64;

const TABLE: [UepTableRow; NB_ROWS] = [
    UepTableRow { subchannel_size_cu: 16, bitrate_kbps: 32, protection_level: 5, l: [3, 4, 17, 0], pi: [5, 3, 2, 0], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 21, bitrate_kbps: 32, protection_level: 4, l: [3, 3, 18, 0], pi: [11, 6, 5, 0], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 24, bitrate_kbps: 32, protection_level: 3, l: [3, 4, 14, 3], pi: [15, 9, 6, 8], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 29, bitrate_kbps: 32, protection_level: 2, l: [3, 4, 14, 3], pi: [22, 13, 8, 13], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 35, bitrate_kbps: 32, protection_level: 1, l: [3, 5, 13, 3], pi: [24, 17, 12, 17], padding_bits: 4 },
    UepTableRow { subchannel_size_cu: 24, bitrate_kbps: 48, protection_level: 5, l: [4, 3, 26, 3], pi: [5, 4, 2, 3], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 29, bitrate_kbps: 48, protection_level: 4, l: [3, 4, 26, 3], pi: [9, 6, 4, 6], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 35, bitrate_kbps: 48, protection_level: 3, l: [3, 4, 26, 3], pi: [15, 10, 6, 9], padding_bits: 4 },
    UepTableRow { subchannel_size_cu: 42, bitrate_kbps: 48, protection_level: 2, l: [3, 4, 26, 3], pi: [24, 14, 8, 15], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 52, bitrate_kbps: 48, protection_level: 1, l: [3, 5, 25, 3], pi: [24, 18, 13, 18], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 29, bitrate_kbps: 56, protection_level: 5, l: [6, 10, 23, 3], pi: [5, 4, 2, 3], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 35, bitrate_kbps: 56, protection_level: 4, l: [6, 10, 23, 3], pi: [9, 6, 4, 5], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 42, bitrate_kbps: 56, protection_level: 3, l: [6, 12, 21, 3], pi: [16, 7, 6, 9], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 52, bitrate_kbps: 56, protection_level: 2, l: [6, 10, 23, 3], pi: [23, 13, 8, 13], padding_bits: 8 },
    UepTableRow { subchannel_size_cu: 32, bitrate_kbps: 64, protection_level: 5, l: [6, 9, 31, 2], pi: [5, 3, 2, 3], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 42, bitrate_kbps: 64, protection_level: 4, l: [6, 9, 33, 0], pi: [11, 6, 5, 0], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 48, bitrate_kbps: 64, protection_level: 3, l: [6, 12, 27, 3], pi: [16, 8, 6, 9], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 58, bitrate_kbps: 64, protection_level: 2, l: [6, 10, 29, 3], pi: [23, 13, 8, 13], padding_bits: 8 },
    UepTableRow { subchannel_size_cu: 70, bitrate_kbps: 64, protection_level: 1, l: [6, 11, 28, 3], pi: [24, 18, 12, 18], padding_bits: 4 },
    UepTableRow { subchannel_size_cu: 40, bitrate_kbps: 80, protection_level: 5, l: [6, 10, 41, 3], pi: [6, 3, 2, 3], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 52, bitrate_kbps: 80, protection_level: 4, l: [6, 10, 41, 3], pi: [11, 6, 5, 6], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 58, bitrate_kbps: 80, protection_level: 3, l: [6, 11, 40, 3], pi: [16, 8, 6, 7], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 70, bitrate_kbps: 80, protection_level: 2, l: [6, 10, 41, 3], pi: [23, 13, 8, 13], padding_bits: 8 },
    UepTableRow { subchannel_size_cu: 84, bitrate_kbps: 80, protection_level: 1, l: [6, 10, 41, 3], pi: [24, 17, 12, 18], padding_bits: 4 },
    UepTableRow { subchannel_size_cu: 48, bitrate_kbps: 96, protection_level: 5, l: [7, 9, 53, 3], pi: [5, 4, 2, 4], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 58, bitrate_kbps: 96, protection_level: 4, l: [7, 10, 52, 3], pi: [9, 6, 4, 6], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 70, bitrate_kbps: 96, protection_level: 3, l: [6, 12, 51, 3], pi: [16, 9, 6, 10], padding_bits: 4 },
    UepTableRow { subchannel_size_cu: 84, bitrate_kbps: 96, protection_level: 2, l: [6, 10, 53, 3], pi: [22, 12, 9, 12], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 104, bitrate_kbps: 96, protection_level: 1, l: [6, 13, 50, 3], pi: [24, 18, 13, 19], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 58, bitrate_kbps: 112, protection_level: 5, l: [14, 17, 50, 3], pi: [5, 4, 2, 5], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 70, bitrate_kbps: 112, protection_level: 4, l: [11, 21, 49, 3], pi: [9, 6, 4, 8], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 84, bitrate_kbps: 112, protection_level: 3, l: [11, 23, 47, 3], pi: [16, 8, 6, 9], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 104, bitrate_kbps: 112, protection_level: 2, l: [11, 21, 49, 3], pi: [23, 12, 9, 14], padding_bits: 4 },
    UepTableRow { subchannel_size_cu: 84, bitrate_kbps: 128, protection_level: 5, l: [12, 19, 62, 3], pi: [5, 3, 2, 4], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 64, bitrate_kbps: 128, protection_level: 4, l: [11, 21, 61, 3], pi: [11, 6, 5, 7], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 96, bitrate_kbps: 128, protection_level: 3, l: [11, 22, 60, 3], pi: [16, 9, 6, 10], padding_bits: 4 },
    UepTableRow { subchannel_size_cu: 116, bitrate_kbps: 128, protection_level: 2, l: [11, 21, 61, 3], pi: [22, 12, 9, 14], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 140, bitrate_kbps: 128, protection_level: 1, l: [11, 20, 62, 3], pi: [24, 17, 13, 19], padding_bits: 8 },
    UepTableRow { subchannel_size_cu: 80, bitrate_kbps: 160, protection_level: 5, l: [11, 19, 87, 3], pi: [5, 4, 2, 4], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 104, bitrate_kbps: 160, protection_level: 4, l: [11, 23, 83, 3], pi: [11, 6, 5, 9], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 116, bitrate_kbps: 160, protection_level: 3, l: [11, 24, 82, 3], pi: [16, 8, 6, 11], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 140, bitrate_kbps: 160, protection_level: 2, l: [11, 21, 85, 3], pi: [22, 11, 9, 13], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 168, bitrate_kbps: 160, protection_level: 1, l: [11, 22, 84, 3], pi: [24, 18, 12, 19], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 96, bitrate_kbps: 192, protection_level: 5, l: [11, 20, 110, 3], pi: [6, 4, 2, 5], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 116, bitrate_kbps: 192, protection_level: 4, l: [11, 22, 108, 3], pi: [10, 6, 4, 9], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 140, bitrate_kbps: 192, protection_level: 3, l: [11, 24, 106, 3], pi: [16, 10, 6, 11], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 168, bitrate_kbps: 192, protection_level: 2, l: [11, 20, 110, 3], pi: [22, 13, 9, 13], padding_bits: 8 },
    UepTableRow { subchannel_size_cu: 208, bitrate_kbps: 192, protection_level: 1, l: [11, 21, 109, 3], pi: [24, 20, 13, 24], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 116, bitrate_kbps: 224, protection_level: 5, l: [12, 22, 131, 3], pi: [8, 6, 2, 6], padding_bits: 4 },
    UepTableRow { subchannel_size_cu: 140, bitrate_kbps: 224, protection_level: 4, l: [12, 26, 127, 3], pi: [12, 8, 4, 11], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 168, bitrate_kbps: 224, protection_level: 3, l: [11, 20, 134, 3], pi: [16, 10, 7, 9], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 208, bitrate_kbps: 224, protection_level: 2, l: [11, 22, 132, 3], pi: [24, 16, 10, 15], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 232, bitrate_kbps: 224, protection_level: 1, l: [11, 24, 130, 3], pi: [24, 20, 12, 20], padding_bits: 4 },
    UepTableRow { subchannel_size_cu: 128, bitrate_kbps: 256, protection_level: 5, l: [11, 24, 154, 3], pi: [6, 5, 2, 5], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 168, bitrate_kbps: 256, protection_level: 4, l: [11, 24, 154, 3], pi: [12, 9, 5, 10], padding_bits: 4 },
    UepTableRow { subchannel_size_cu: 192, bitrate_kbps: 256, protection_level: 3, l: [11, 27, 151, 3], pi: [16, 10, 7, 10], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 232, bitrate_kbps: 256, protection_level: 2, l: [11, 22, 156, 3], pi: [24, 14, 10, 13], padding_bits: 8 },
    UepTableRow { subchannel_size_cu: 280, bitrate_kbps: 256, protection_level: 1, l: [11, 26, 152, 3], pi: [24, 19, 14, 18], padding_bits: 4 },
    UepTableRow { subchannel_size_cu: 160, bitrate_kbps: 320, protection_level: 5, l: [11, 26, 200, 3], pi: [8, 5, 2, 6], padding_bits: 4 },
    UepTableRow { subchannel_size_cu: 208, bitrate_kbps: 320, protection_level: 4, l: [11, 25, 201, 3], pi: [13, 9, 5, 10], padding_bits: 8 },
    UepTableRow { subchannel_size_cu: 280, bitrate_kbps: 320, protection_level: 2, l: [11, 26, 200, 3], pi: [24, 17, 9, 17], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 192, bitrate_kbps: 384, protection_level: 5, l: [11, 27, 247, 3], pi: [8, 6, 2, 7], padding_bits: 0 },
    UepTableRow { subchannel_size_cu: 280, bitrate_kbps: 384, protection_level: 3, l: [11, 24, 250, 3], pi: [16, 9, 7, 10], padding_bits: 4 },
    UepTableRow { subchannel_size_cu: 416, bitrate_kbps: 384, protection_level: 1, l: [12, 28, 245, 3], pi: [24, 20, 14, 23], padding_bits: 8 },
];

pub fn lookup(index: u8) -> Option<UepTableRow> {
    TABLE.get(index as usize).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_s4() {
        let row = lookup(2).unwrap();
        assert_eq!(row.subchannel_size_cu, 24);
        assert_eq!(row.bitrate_kbps, 32);
        assert_eq!(row.protection_level, 3);
        assert_eq!(row.l, [3, 4, 14, 3]);
        assert_eq!(row.pi, [15, 9, 6, 8]);
        assert_eq!(row.padding_bits, 0);
    }

    #[test]
    fn last_row_matches_the_table() {
        let row = lookup(63).unwrap();
        assert_eq!(row.subchannel_size_cu, 416);
        assert_eq!(row.bitrate_kbps, 384);
        assert_eq!(row.protection_level, 1);
        assert_eq!(row.l, [12, 28, 245, 3]);
        assert_eq!(row.pi, [24, 20, 14, 23]);
        assert_eq!(row.padding_bits, 8);
    }

    #[test]
    fn out_of_range_index_is_none() {
        assert_eq!(lookup(64), None);
    }
}
