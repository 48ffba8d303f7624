//! Decodes the fast information channel's per-CIF soft bit slice into validated FIBs.

use dab_core::crc::verify_trailing_crc16;
use dab_core::puncture;
use dab_core::scrambler::scramble;
use dab_core::viterbi::{depuncture_soft, ViterbiDecoder, NB_TAIL_BITS};

use crate::dab_radio_parameters::DabRadioParameters;

const FIB_BYTES: usize = 32;

/// Decodes one transmission frame's worth of FIC soft bits into a sequence of
/// valid FIBs (CRC already checked, scrambler already removed).
pub struct FicDecoder {
    params: DabRadioParameters,
    decoder: ViterbiDecoder,
}

impl FicDecoder {
    pub fn new(params: DabRadioParameters) -> Self {
        Self { params, decoder: ViterbiDecoder::new() }
    }

    /// `fic_bits` is the full FIC soft bit region of one frame
    /// (`nb_bits_in_fic` long). Returns the FIBs (each `FIB_BYTES` bytes) whose
    /// CRC passed, across every CIF in the frame. A failing CRC drops just that
    /// FIB; it never aborts the rest of the frame.
    pub fn decode_fic(&self, fic_bits: &[i8]) -> Vec<Vec<u8>> {
        assert_eq!(fic_bits.len(), self.params.nb_bits_in_fic, "FIC soft bit slice length mismatch");

        let nb_fibs_per_cif = self.params.nb_fibs_in_fic / self.params.nb_cifs_in_msc;
        let nb_data_bits = nb_fibs_per_cif * FIB_BYTES * 8;

        let mut fibs = Vec::new();
        for cif_bits in fic_bits.chunks_exact(self.params.nb_bits_per_fig) {
            if let Some(bytes) = self.decode_fig(cif_bits, nb_data_bits) {
                for fib in bytes.chunks_exact(FIB_BYTES) {
                    if verify_trailing_crc16(fib) {
                        fibs.push(fib.to_vec());
                    }
                }
            }
        }
        fibs
    }

    /// Depunctures, Viterbi-decodes and descrambles a single CIF's FIC bit slice.
    /// Returns `None` on a length mismatch (a malformed frame); otherwise always
    /// returns bytes, even if downstream CRCs end up failing.
    fn decode_fig(&self, cif_soft_bits: &[i8], nb_data_bits: usize) -> Option<Vec<u8>> {
        let nb_steps = nb_data_bits + NB_TAIL_BITS;
        let mother_len = nb_steps * 4;
        if cif_soft_bits.len() > mother_len {
            return None;
        }
        let pattern = puncture::fitted(mother_len, cif_soft_bits.len());
        let mother_soft = depuncture_soft(cif_soft_bits, &pattern, mother_len);
        let data_bits = self.decoder.decode(&mother_soft, nb_data_bits);

        let mut bytes = bits_to_bytes(&data_bits);
        scramble(&mut bytes);
        Some(bytes)
    }
}

fn bits_to_bytes(bits: &[u8]) -> Vec<u8> {
    bits.chunks_exact(8)
        .map(|chunk| {
            let mut byte = 0u8;
            for (i, &bit) in chunk.iter().enumerate() {
                byte |= (bit & 1) << (7 - i);
            }
            byte
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dab_radio_parameters::get_dab_radio_parameters;
    use dab_core::dab_transmission_modes::DabTransmissionMode;
    use dab_core::scrambler::scramble as scramble_inplace;
    use dab_core::viterbi::encode;

    #[test]
    fn decodes_a_synthetic_frame_of_fics() {
        let params = get_dab_radio_parameters(DabTransmissionMode::I);
        let nb_fibs_per_cif = params.nb_fibs_in_fic / params.nb_cifs_in_msc;
        let nb_cifs = params.nb_cifs_in_msc;
        let nb_bits_per_fig = params.nb_bits_per_fig;
        let nb_data_bits = nb_fibs_per_cif * FIB_BYTES * 8;

        // Build one CIF's worth of FIB bytes with valid trailing CRCs.
        let mut plain_bytes = Vec::new();
        for fib_index in 0..nb_fibs_per_cif {
            let mut fib = vec![0u8; FIB_BYTES - 2];
            fib[0] = fib_index as u8;
            let crc = dab_core::crc::crc16(&fib);
            fib.push((crc >> 8) as u8);
            fib.push((crc & 0xFF) as u8);
            plain_bytes.extend_from_slice(&fib);
        }
        scramble_inplace(&mut plain_bytes);

        let mut data_bits = Vec::with_capacity(nb_data_bits);
        for byte in &plain_bytes {
            for i in 0..8 {
                data_bits.push((byte >> (7 - i)) & 1);
            }
        }
        let mother = encode(&data_bits);
        let mother_soft: Vec<i8> = mother.iter().map(|&b| if b == 0 { 127 } else { -127 }).collect();

        let pattern = puncture::fitted(mother_soft.len(), nb_bits_per_fig);
        let punctured = dab_core::viterbi::puncture_soft(&mother_soft, &pattern);

        let mut full_fic_bits = Vec::new();
        for _ in 0..nb_cifs {
            full_fic_bits.extend_from_slice(&punctured);
        }

        let decoder = FicDecoder::new(params);
        let fibs = decoder.decode_fic(&full_fic_bits);
        assert_eq!(fibs.len(), nb_fibs_per_cif * nb_cifs);
    }
}
