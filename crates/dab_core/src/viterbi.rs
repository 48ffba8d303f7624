//! Soft-decision Viterbi decoder for the DAB rate-1/4, constraint-length-7 mother
//! code, generalised over arbitrary puncturing via [`crate::puncture::PuncturePattern`].
//!
//! DOC: ETSI EN 300 401 Clause 11.1. The mother code is non-systematic,
//! non-recursive, with generator polynomials {133,171,145,133} (octal). The decoder
//! below stores them in the bit-reversed form used throughout (reversed so that the
//! convolution can be expressed as `parity(register & poly)` on a register that
//! shifts the newest bit into the high end), matching the polarity convention
//! already used by `quantise_to_soft_bit` in `ofdm::ofdm_demodulator` (Phil Karn's
//! viterbi decoder convention: a soft value of +127 is a confident 0).

use crate::puncture::PuncturePattern;

const CONSTRAINT_LENGTH: usize = 7;
const NUM_STATES: usize = 1 << (CONSTRAINT_LENGTH - 1);
const RATE: usize = 4;
/// Generator polynomials 133,171,145,133 (octal), bit-reversed.
const MOTHER_POLYS: [u8; RATE] = [109, 79, 83, 109];
/// Number of tail bits appended to terminate the trellis at the all-zeros state.
pub const NB_TAIL_BITS: usize = 6;

fn parity(mut x: u8) -> u8 {
    let mut p = 0u8;
    while x != 0 {
        p ^= x & 1;
        x >>= 1;
    }
    p
}

/// Encodes a single input bit given the encoder's 6-bit memory, returning the
/// `RATE` output bits (as a bitmask, bit i = output stream i) and the updated
/// memory.
fn encode_step(state: u8, input_bit: u8) -> (u8, u8) {
    let reg7 = ((input_bit & 1) << 6) | (state & 0x3F);
    let mut out = 0u8;
    for (i, &poly) in MOTHER_POLYS.iter().enumerate() {
        if parity(reg7 & poly) != 0 {
            out |= 1 << i;
        }
    }
    let new_state = reg7 >> 1;
    (out, new_state)
}

/// Precomputed trellis: for every state and input bit, the `RATE` output bits and
/// the resulting next state.
struct Trellis {
    next_state: [[u8; 2]; NUM_STATES],
    output: [[u8; 2]; NUM_STATES],
}

impl Trellis {
    fn new() -> Self {
        let mut next_state = [[0u8; 2]; NUM_STATES];
        let mut output = [[0u8; 2]; NUM_STATES];
        for (state, (ns_row, out_row)) in next_state.iter_mut().zip(output.iter_mut()).enumerate() {
            for (bit, (ns, out)) in ns_row.iter_mut().zip(out_row.iter_mut()).enumerate() {
                let (o, new_state) = encode_step(state as u8, bit as u8);
                *ns = new_state;
                *out = o;
            }
        }
        Self { next_state, output }
    }
}

/// Encodes a sequence of input bits (0/1 per byte) into `RATE` parallel output
/// streams of punctured soft bits is not this function's job: this just produces
/// the unpunctured mother-code output, one output nibble (as 4 bits) per input bit,
/// followed by `NB_TAIL_BITS` zero bits to flush the trellis to state 0.
pub fn encode(input_bits: &[u8]) -> Vec<u8> {
    let trellis = Trellis::new();
    let mut state = 0u8;
    let mut out = Vec::with_capacity((input_bits.len() + NB_TAIL_BITS) * RATE);
    let mut push = |bit: u8, trellis: &Trellis, state: &mut u8| {
        let (o, ns) = (trellis.output[*state as usize][bit as usize], trellis.next_state[*state as usize][bit as usize]);
        for i in 0..RATE {
            out.push((o >> i) & 1);
        }
        *state = ns;
    };
    for &bit in input_bits {
        push(bit & 1, &trellis, &mut state);
    }
    for _ in 0..NB_TAIL_BITS {
        push(0, &trellis, &mut state);
    }
    out
}

/// Punctures a mother-code output stream (4 soft bits per input bit, see
/// [`encode`]) using a repeating [`PuncturePattern`] applied to the flattened
/// stream of `RATE`-wide groups.
pub fn puncture_soft(mother_soft: &[i8], pattern: &PuncturePattern) -> Vec<i8> {
    let period = pattern.period();
    mother_soft
        .iter()
        .enumerate()
        .filter(|(i, _)| pattern.keep[i % period])
        .map(|(_, &b)| b)
        .collect()
}

/// Reverses [`puncture_soft`], re-inserting erasures (soft value 0) at punctured
/// positions so the result has exactly `total_len` soft bits.
pub fn depuncture_soft(punctured: &[i8], pattern: &PuncturePattern, total_len: usize) -> Vec<i8> {
    let period = pattern.period();
    let mut out = Vec::with_capacity(total_len);
    let mut src = punctured.iter();
    for i in 0..total_len {
        if pattern.keep[i % period] {
            out.push(*src.next().unwrap_or(&0));
        } else {
            out.push(0);
        }
    }
    out
}

#[derive(Clone, Copy)]
struct PathMetric {
    cost: i64,
    prev_state: u8,
    input_bit: u8,
}

/// A soft-decision Viterbi decoder for the DAB mother code, reusable across FIC
/// and MSC (EEP/UEP) decoding. Accepts a depunctured, mother-code-rate soft-bit
/// stream (4 soft bits per input bit, erasures represented as 0) and produces the
/// most likely input bit sequence, including trellis termination.
pub struct ViterbiDecoder {
    trellis: Trellis,
}

impl ViterbiDecoder {
    pub fn new() -> Self {
        Self { trellis: Trellis::new() }
    }

    /// Decodes `nb_data_bits + NB_TAIL_BITS` input bits from a mother-code-rate
    /// soft-bit stream of length `(nb_data_bits + NB_TAIL_BITS) * RATE`. Returns
    /// the decoded data bits (tail bits are consumed but not returned).
    pub fn decode(&self, soft_bits: &[i8], nb_data_bits: usize) -> Vec<u8> {
        let nb_steps = nb_data_bits + NB_TAIL_BITS;
        assert_eq!(soft_bits.len(), nb_steps * RATE, "soft bit stream length mismatch");

        let mut metrics = vec![i64::MAX / 2; NUM_STATES];
        metrics[0] = 0;
        let mut history: Vec<[PathMetric; NUM_STATES]> = Vec::with_capacity(nb_steps);

        for step in 0..nb_steps {
            let received = &soft_bits[step * RATE..step * RATE + RATE];
            let mut next_metrics = vec![i64::MAX / 2; NUM_STATES];
            let mut step_history = [PathMetric { cost: i64::MAX / 2, prev_state: 0, input_bit: 0 }; NUM_STATES];

            for state in 0..NUM_STATES {
                if metrics[state] >= i64::MAX / 4 {
                    continue;
                }
                for bit in 0..2u8 {
                    let out = self.trellis.output[state][bit as usize];
                    let ns = self.trellis.next_state[state][bit as usize] as usize;
                    let branch_cost: i64 = (0..RATE)
                        .map(|i| {
                            let expected_bit = (out >> i) & 1;
                            let expected_soft = if expected_bit == 0 { 127i64 } else { -127i64 };
                            (expected_soft - received[i] as i64).abs()
                        })
                        .sum();
                    let cost = metrics[state] + branch_cost;
                    if cost < next_metrics[ns] {
                        next_metrics[ns] = cost;
                        step_history[ns] = PathMetric { cost, prev_state: state as u8, input_bit: bit };
                    }
                }
            }
            metrics = next_metrics;
            history.push(step_history);
        }

        // Trellis is forced to terminate at state 0 by the tail bits.
        let mut state = 0usize;
        let mut bits = vec![0u8; nb_steps];
        for step in (0..nb_steps).rev() {
            let pm = history[step][state];
            bits[step] = pm.input_bit;
            state = pm.prev_state as usize;
        }
        bits.truncate(nb_data_bits);
        bits
    }
}

impl Default for ViterbiDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::puncture::pi_16;

    #[test]
    fn round_trips_with_no_puncturing() {
        let input: Vec<u8> = (0..64).map(|i| (i * 7 + 1) % 2).collect();
        let mother = encode(&input);
        let soft: Vec<i8> = mother.iter().map(|&b| if b == 0 { 127 } else { -127 }).collect();

        let decoder = ViterbiDecoder::new();
        let decoded = decoder.decode(&soft, input.len());
        assert_eq!(decoded, input);
    }

    #[test]
    fn round_trips_through_puncturing() {
        let input: Vec<u8> = (0..48).map(|i| (i * 3 + 2) % 2).collect();
        let mother = encode(&input);
        let mother_soft: Vec<i8> = mother.iter().map(|&b| if b == 0 { 127 } else { -127 }).collect();

        let pattern = pi_16();
        let punctured = puncture_soft(&mother_soft, &pattern);
        let depunctured = depuncture_soft(&punctured, &pattern, mother_soft.len());

        let decoder = ViterbiDecoder::new();
        let decoded = decoder.decode(&depunctured, input.len());
        assert_eq!(decoded, input);
    }

    #[test]
    fn all_zero_input_decodes_to_all_zero() {
        let input = vec![0u8; 32];
        let mother = encode(&input);
        let soft: Vec<i8> = mother.iter().map(|&b| if b == 0 { 127 } else { -127 }).collect();
        let decoder = ViterbiDecoder::new();
        assert_eq!(decoder.decode(&soft, input.len()), input);
    }
}
