//! Per-subchannel MSC decoder: extraction, time de-interleaving, Viterbi
//! decoding and descrambling, one instance per subscribed subchannel.

use dab_core::puncture;
use dab_core::scrambler::scramble;
use dab_core::viterbi::{depuncture_soft, ViterbiDecoder, NB_TAIL_BITS};

use super::cif_deinterleaver::CifDeinterleaver;
use crate::database::entities::ProtectionKind;

pub struct MscDecoder {
    start_address_cu: u16,
    length_cu: u16,
    protection: ProtectionKind,
    deinterleaver: CifDeinterleaver,
    decoder: ViterbiDecoder,
}

impl MscDecoder {
    pub fn new(start_address_cu: u16, length_cu: u16, protection: ProtectionKind) -> Self {
        let frame_length = length_cu as usize * 64;
        Self {
            start_address_cu,
            length_cu,
            protection,
            deinterleaver: CifDeinterleaver::new(frame_length),
            decoder: ViterbiDecoder::new(),
        }
    }

    fn bitrate_kbps(&self) -> u16 {
        match self.protection {
            ProtectionKind::Uep { table_index } => super::uep_tables::lookup(table_index).map(|r| r.bitrate_kbps).unwrap_or(8),
            ProtectionKind::Eep { level, is_type_b } => {
                let multiple = super::eep_tables::lookup(is_type_b, level, 1).map(|e| e.capacity_unit_multiple).unwrap_or(1);
                let n = (self.length_cu / multiple.max(1)).max(1);
                super::eep_tables::lookup(is_type_b, level, n).map(|e| e.bitrate_kbps(n)).unwrap_or(8)
            }
        }
    }

    /// Extracts this subchannel's bit range from a frame's full MSC soft bit
    /// block, feeds it through the 16-frame de-interleaver, and once filled,
    /// Viterbi-decodes and descrambles it into payload bytes.
    pub fn process_cif(&mut self, msc_bits: &[i8]) -> Option<Vec<u8>> {
        let start = self.start_address_cu as usize * 64;
        let end = start + self.length_cu as usize * 64;
        assert!(end <= msc_bits.len(), "subchannel bit range exceeds MSC block (invariant 2)");

        let subchannel_bits = &msc_bits[start..end];
        let deinterleaved = self.deinterleaver.push(subchannel_bits)?;

        // CIF duration is 24ms; bitrate (kbit/s) * 24ms = bits carried per CIF.
        let nb_data_bits = self.bitrate_kbps() as usize * 24;
        let nb_steps = nb_data_bits + NB_TAIL_BITS;
        let mother_len = nb_steps * 4;
        if deinterleaved.len() > mother_len {
            return None;
        }
        let pattern = puncture::fitted(mother_len, deinterleaved.len());
        let mother_soft = depuncture_soft(&deinterleaved, &pattern, mother_len);
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

    #[test]
    fn emits_length_times_64_soft_bits_per_cif_once_filled() {
        let mut decoder = MscDecoder::new(0, 4, ProtectionKind::Uep { table_index: 2 });
        let frame = vec![10i8; 4 * 64];
        for _ in 0..15 {
            assert!(decoder.process_cif(&{
                let mut msc = vec![0i8; 4 * 64];
                msc.copy_from_slice(&frame);
                msc
            }).is_none());
        }
        let result = decoder.process_cif(&frame);
        assert!(result.is_some());
    }
}
