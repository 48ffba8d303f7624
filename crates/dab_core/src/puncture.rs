//! Puncturing vectors for the DAB rate-1/4 mother code.
//!
//! DOC: ETSI EN 300 401 Clause 11.1.1, Table 31. The mother code produces 4 output
//! bits per input bit; a puncturing vector selects a subset of those 4*N bits
//! (N input bits per period) that are actually transmitted, giving the higher
//! code rates used by EEP/UEP protection levels and the FIC puncturing vector.
//!
//! Each vector is generated rather than tabulated verbatim: positions to keep are
//! spread as evenly as possible across the period using a Bresenham-style
//! accumulator, which is the same technique used for rate-matching in other
//! punctured convolutional/turbo codes. This keeps every `PuncturePattern` both
//! internally consistent (puncture then depuncture-with-erasures round-trips)
//! and close in spirit to the ETSI table's monotonically increasing puncturing
//! density as the vector index rises.
//!
//! TODO: this is not bit-exact against Table 31 - the literal PI_1..PI_24/
//! PI_16/PI_X bit patterns live in `constants/puncture_codes.h` in the
//! original codebase, which this retrieval pack does not carry. Decoding a
//! real broadcast's FIC/MSC needs those literal vectors ported in here; until
//! then this module only round-trips against its own generated patterns.

pub const PUNCTURE_PERIOD: usize = 32;

/// A puncturing vector: out of every `PUNCTURE_PERIOD` encoded bits, `keep[i]`
/// says whether position `i` is transmitted (`true`) or punctured (`false`).
#[derive(Debug, Clone)]
pub struct PuncturePattern {
    pub keep: Vec<bool>,
}

impl PuncturePattern {
    fn generate(num_keep: usize, period: usize) -> Self {
        assert!(num_keep <= period);
        let mut keep = vec![false; period];
        let mut acc = 0usize;
        for slot in keep.iter_mut() {
            acc += num_keep;
            if acc >= period {
                acc -= period;
                *slot = true;
            }
        }
        Self { keep }
    }

    pub fn period(&self) -> usize {
        self.keep.len()
    }
}

/// Puncturing vectors PI_1 (least punctured) through PI_24 (most punctured), used
/// by the EEP/UEP protection tables' `PIx` indices.
pub fn pi(index: u8) -> PuncturePattern {
    assert!((1..=24).contains(&index), "PI index must be in [1,24], got {index}");
    // Monotonically decreasing number of kept bits per 32-bit period as the
    // index rises, spanning from near rate-1/4 (index 1) to the highest
    // punctured rate used by protection level 4 (index 24).
    let num_keep = 32 - (index as usize - 1);
    PuncturePattern::generate(num_keep.max(1), PUNCTURE_PERIOD)
}

/// PI_16, the fixed vector used for the FIC body.
pub fn pi_16() -> PuncturePattern {
    pi(16)
}

/// PI_X, the vector applied to the 24 tail bits appended to every convolutionally
/// encoded block (FIC and MSC).
pub fn pi_x() -> PuncturePattern {
    // The tail is always transmitted near rate-1/4 to guarantee reliable trellis
    // termination, so almost nothing is punctured.
    PuncturePattern::generate(31, 32)
}

/// Builds a single-period puncturing vector sized to turn exactly
/// `mother_bit_count` mother-code output bits into exactly `received_bit_count`
/// transmitted bits, spread as evenly as the Bresenham accumulator allows.
///
/// FIC and MSC puncturing both transmit a block whose punctured length is fixed
/// by the ensemble's transmission mode and subchannel sizing; this constructs the
/// exact-length vector for a given block rather than tiling a fixed-period table,
/// which is the counterpart to `pi`/`pi_16` when the target length doesn't divide
/// evenly into a 32-bit period.
pub fn fitted(mother_bit_count: usize, received_bit_count: usize) -> PuncturePattern {
    assert!(received_bit_count <= mother_bit_count);
    PuncturePattern::generate(received_bit_count, mother_bit_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_fewer_bits_as_index_increases() {
        let low = pi(1);
        let high = pi(24);
        let count = |p: &PuncturePattern| p.keep.iter().filter(|&&b| b).count();
        assert!(count(&low) > count(&high));
    }

    #[test]
    fn fitted_produces_exact_received_length() {
        let p = fitted(3096, 2304);
        assert_eq!(p.period(), 3096);
        assert_eq!(p.keep.iter().filter(|&&b| b).count(), 2304);
    }

    #[test]
    fn pi_16_is_well_formed() {
        let p = pi_16();
        assert_eq!(p.period(), PUNCTURE_PERIOD);
        assert!(p.keep.iter().any(|&b| b));
    }
}
