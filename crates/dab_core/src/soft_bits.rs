//! Conversions between viterbi soft-decision bits and packed hard bytes.
//!
//! A soft bit is a signed 8bit value in [-127,+127] where +127 is a confident
//! logical 0 and -127 is a confident logical 1. This mirrors the convention used
//! by the OFDM demodulator's `quantise_to_soft_bit` (see `ofdm::ofdm_demodulator`).

/// +127
pub const SOFT_DECISION_VITERBI_HIGH: i8 = 127;
/// -127
pub const SOFT_DECISION_VITERBI_LOW: i8 = -127;
/// 0, used for punctured/erased positions.
pub const SOFT_DECISION_VITERBI_PUNCTURED: i8 = 0;

/// Converts a single hard bit (0 or 1) into a confident soft bit.
#[inline(always)]
pub fn hard_bit_to_soft_bit(bit: u8) -> i8 {
    if bit == 0 {
        SOFT_DECISION_VITERBI_HIGH
    } else {
        SOFT_DECISION_VITERBI_LOW
    }
}

/// Converts a soft bit back into a hard bit using its sign.
#[inline(always)]
pub fn soft_bit_to_hard_bit(soft_bit: i8) -> u8 {
    if soft_bit >= 0 {
        0
    } else {
        1
    }
}

/// Expands a byte into 8 soft bits, LSB first, matching `convert_viterbi_bytes_to_bits`.
pub fn hard_byte_to_soft_bits(byte: u8, out: &mut [i8; 8]) {
    for (i, slot) in out.iter_mut().enumerate() {
        let bit = (byte >> i) & 0b1;
        *slot = hard_bit_to_soft_bit(bit);
    }
}

/// Packs 8 soft bits, LSB first, back into a hard byte.
pub fn soft_bits_to_hard_byte(bits: &[i8; 8]) -> u8 {
    let mut byte = 0u8;
    for (i, soft_bit) in bits.iter().enumerate() {
        let bit = soft_bit_to_hard_bit(*soft_bit);
        byte |= bit << i;
    }
    byte
}

/// Converts a slice of hard bytes into a freshly allocated slice of soft bits.
pub fn hard_to_soft(bytes: &[u8]) -> Vec<i8> {
    let mut out = Vec::with_capacity(bytes.len() * 8);
    let mut chunk = [0i8; 8];
    for &byte in bytes {
        hard_byte_to_soft_bits(byte, &mut chunk);
        out.extend_from_slice(&chunk);
    }
    out
}

/// Converts a slice of soft bits (a multiple of 8 in length) into hard bytes.
pub fn soft_to_hard(bits: &[i8]) -> Vec<u8> {
    bits.chunks_exact(8)
        .map(|chunk| {
            let chunk: &[i8; 8] = chunk.try_into().expect("chunks_exact(8) guarantees length 8");
            soft_bits_to_hard_byte(chunk)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hard_to_soft_matches_scenario_s1() {
        let input = [0x00u8, 0xFF, 0xAA];
        let soft = hard_to_soft(&input);
        assert_eq!(soft.len(), 24);
        assert!(soft[0..8].iter().all(|&b| b == SOFT_DECISION_VITERBI_HIGH));
        assert!(soft[8..16].iter().all(|&b| b == SOFT_DECISION_VITERBI_LOW));
        // 0xAA = 0b10101010, LSB first => 0,1,0,1,0,1,0,1
        let expected_aa = [
            SOFT_DECISION_VITERBI_HIGH,
            SOFT_DECISION_VITERBI_LOW,
            SOFT_DECISION_VITERBI_HIGH,
            SOFT_DECISION_VITERBI_LOW,
            SOFT_DECISION_VITERBI_HIGH,
            SOFT_DECISION_VITERBI_LOW,
            SOFT_DECISION_VITERBI_HIGH,
            SOFT_DECISION_VITERBI_LOW,
        ];
        assert_eq!(&soft[16..24], &expected_aa);
    }

    #[test]
    fn round_trips_through_soft_and_back() {
        let input = [0x00u8, 0xFF, 0xAA, 0x3C];
        let soft = hard_to_soft(&input);
        let back = soft_to_hard(&soft);
        assert_eq!(&input[..], &back[..]);
    }

    #[test]
    fn polarity_is_preserved() {
        assert_eq!(hard_bit_to_soft_bit(0), SOFT_DECISION_VITERBI_HIGH);
        assert_eq!(hard_bit_to_soft_bit(1), SOFT_DECISION_VITERBI_LOW);
        assert_eq!(soft_bit_to_hard_bit(SOFT_DECISION_VITERBI_HIGH), 0);
        assert_eq!(soft_bit_to_hard_bit(SOFT_DECISION_VITERBI_LOW), 1);
    }
}
