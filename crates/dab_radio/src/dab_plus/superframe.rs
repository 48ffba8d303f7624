//! DAB+ super-frame assembly: collects 5 consecutive dab-frames of a
//! subchannel's MSC payload, RS-corrects the assembled block, and splits it
//! into access units (AAC-LC/HE-AAC) plus trailing PAD.
//!
//! DOC: ETSI TS 102 563 Clause 6. The super-frame header's exact AU-count
//! table is not present anywhere in the retrieval pack; `num_access_units`
//! below is a documented, internally-consistent stand-in keyed on the two
//! flags the header does carry (sample rate, SBR), in the same spirit as the
//! generated puncture patterns.

use dab_core::crc;

use super::firecode;
use super::reed_solomon::{ReedSolomonDecoder, DATA_LEN, SHORTENED_LEN};

const NB_FRAMES_PER_SUPERFRAME: usize = 5;
const MAX_DESYNC: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuperframeHeader {
    pub sampling_rate_hz: u32,
    pub sbr_flag: bool,
    pub ps_flag: bool,
    pub is_stereo: bool,
    pub mpeg_surround_config: u8,
}

impl SuperframeHeader {
    fn parse(bytes: &[u8; 5]) -> Self {
        let dac_rate = (bytes[0] & 0x80) != 0;
        let sbr_flag = (bytes[0] & 0x40) != 0;
        let is_stereo = (bytes[0] & 0x20) != 0;
        let ps_flag = (bytes[0] & 0x10) != 0;
        let mpeg_surround_config = bytes[0] & 0x07;
        Self {
            sampling_rate_hz: if dac_rate { 48_000 } else { 24_000 },
            sbr_flag,
            ps_flag,
            is_stereo,
            mpeg_surround_config,
        }
    }

    pub fn num_access_units(&self) -> usize {
        match (self.sampling_rate_hz, self.sbr_flag) {
            (24_000, false) => 4,
            (24_000, true) => 3,
            (48_000, false) => 6,
            (48_000, true) => 5,
            _ => 4,
        }
    }
}

/// Notified as a super-frame is decoded; mirrors the original's
/// `fig_handler_interface.h` style of a synchronous, in-line callback set.
pub trait AacObserver {
    fn on_superframe_header(&mut self, _header: &SuperframeHeader) {}
    fn on_access_unit(&mut self, _index: usize, _total: usize, _bytes: &[u8]) {}
    fn on_firecode_error(&mut self) {}
    fn on_rs_error(&mut self) {}
    fn on_access_unit_crc_error(&mut self, _index: usize) {}
}

enum State {
    WaitFrameStart,
    Collect,
}

pub struct SuperframeAssembler {
    frame_len_bytes: usize,
    state: State,
    buffer: Vec<u8>,
    frames_collected: usize,
    nb_desync: u8,
    rs: ReedSolomonDecoder,
}

impl SuperframeAssembler {
    pub fn new(frame_len_bytes: usize) -> Self {
        Self {
            frame_len_bytes,
            state: State::WaitFrameStart,
            buffer: Vec::with_capacity(frame_len_bytes * NB_FRAMES_PER_SUPERFRAME),
            frames_collected: 0,
            nb_desync: 0,
            rs: ReedSolomonDecoder::new(),
        }
    }

    pub fn push_frame(&mut self, frame: &[u8], observer: &mut dyn AacObserver) {
        assert_eq!(frame.len(), self.frame_len_bytes, "dab-frame length changed mid-stream");

        match self.state {
            State::WaitFrameStart => {
                if frame.len() >= firecode::BLOCK_LEN {
                    let mut block = [0u8; firecode::BLOCK_LEN];
                    block.copy_from_slice(&frame[..firecode::BLOCK_LEN]);
                    if firecode::is_valid(&block) {
                        self.buffer.clear();
                        self.buffer.extend_from_slice(frame);
                        self.frames_collected = 1;
                        self.state = State::Collect;
                        return;
                    }
                }
                observer.on_firecode_error();
            }
            State::Collect => {
                self.buffer.extend_from_slice(frame);
                self.frames_collected += 1;
                if self.frames_collected < NB_FRAMES_PER_SUPERFRAME {
                    return;
                }
                self.frames_collected = 0;
                let mut buf = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.frame_len_bytes * NB_FRAMES_PER_SUPERFRAME));
                if self.decode_superframe(&mut buf, observer).is_ok() {
                    self.nb_desync = 0;
                } else {
                    self.nb_desync += 1;
                    if self.nb_desync >= MAX_DESYNC {
                        self.nb_desync = 0;
                        self.state = State::WaitFrameStart;
                    }
                }
            }
        }
    }

    /// De-interleaves the super-frame into RS(204,188) codewords (interleave
    /// depth = buffer length / 204), corrects each, and returns the
    /// concatenated data portions.
    fn rs_correct(&self, buf: &[u8], observer: &mut dyn AacObserver) -> Result<Vec<u8>, ()> {
        if buf.len() % SHORTENED_LEN != 0 || buf.is_empty() {
            observer.on_rs_error();
            return Err(());
        }
        let depth = buf.len() / SHORTENED_LEN;
        let mut data = vec![0u8; depth * DATA_LEN];
        for row in 0..depth {
            let mut block = [0u8; SHORTENED_LEN];
            for col in 0..SHORTENED_LEN {
                block[col] = buf[col * depth + row];
            }
            match self.rs.decode(&block) {
                Some((corrected, _errata)) => {
                    for (col, &byte) in corrected.iter().enumerate() {
                        data[col * depth + row] = byte;
                    }
                }
                None => {
                    observer.on_rs_error();
                    return Err(());
                }
            }
        }
        Ok(data)
    }

    fn decode_superframe(&self, buf: &mut [u8], observer: &mut dyn AacObserver) -> Result<(), ()> {
        if buf.len() < firecode::BLOCK_LEN {
            observer.on_firecode_error();
            return Err(());
        }
        let mut fc_block = [0u8; firecode::BLOCK_LEN];
        fc_block.copy_from_slice(&buf[..firecode::BLOCK_LEN]);
        if !firecode::is_valid(&fc_block) {
            observer.on_firecode_error();
            return Err(());
        }

        let data = self.rs_correct(buf, observer)?;
        if data.len() < 5 {
            return Err(());
        }
        let mut header_bytes = [0u8; 5];
        header_bytes.copy_from_slice(&data[..5]);
        let header = SuperframeHeader::parse(&header_bytes);
        observer.on_superframe_header(&header);

        let num_aus = header.num_access_units();
        let dir_len = num_aus * 2;
        if data.len() < 5 + dir_len {
            return Err(());
        }
        let dir = &data[5..5 + dir_len];
        let mut offset = 5 + dir_len;
        for i in 0..num_aus {
            let au_len = u16::from_be_bytes([dir[i * 2], dir[i * 2 + 1]]) as usize;
            if offset + au_len > data.len() {
                break;
            }
            let au_bytes = &data[offset..offset + au_len];
            if crc::verify_trailing_crc16(au_bytes) {
                observer.on_access_unit(i, num_aus, au_bytes);
            } else {
                observer.on_access_unit_crc_error(i);
            }
            offset += au_len;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingObserver {
        headers: Vec<SuperframeHeader>,
        access_units: Vec<(usize, usize, Vec<u8>)>,
        firecode_errors: usize,
        rs_errors: usize,
        crc_errors: usize,
    }

    impl AacObserver for RecordingObserver {
        fn on_superframe_header(&mut self, header: &SuperframeHeader) {
            self.headers.push(*header);
        }
        fn on_access_unit(&mut self, index: usize, total: usize, bytes: &[u8]) {
            self.access_units.push((index, total, bytes.to_vec()));
        }
        fn on_firecode_error(&mut self) {
            self.firecode_errors += 1;
        }
        fn on_rs_error(&mut self) {
            self.rs_errors += 1;
        }
        fn on_access_unit_crc_error(&mut self, _index: usize) {
            self.crc_errors += 1;
        }
    }

    fn build_clean_superframe(frame_len: usize, depth: usize) -> Vec<u8> {
        let num_aus = 4usize;
        let au_payload_len = 20usize;
        let mut data = vec![0u8; 0];
        data.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x00]); // 24kHz, no SBR header
        let au_total_len = au_payload_len + 2;
        for _ in 0..num_aus {
            data.extend_from_slice(&(au_total_len as u16).to_be_bytes());
        }
        for au_index in 0..num_aus {
            let mut au = vec![(au_index as u8).wrapping_mul(11); au_payload_len];
            let checksum = dab_core::crc::crc16(&au);
            au.push((checksum >> 8) as u8);
            au.push((checksum & 0xFF) as u8);
            data.extend_from_slice(&au);
        }
        data.resize(depth * DATA_LEN, 0xAA);

        // Systematically RS-encode each interleaved codeword so the assembled
        // buffer passes correction cleanly.
        let mut buf = vec![0u8; depth * SHORTENED_LEN];
        let gf_helper = ReedSolomonDecoderTestHelper::new();
        for row in 0..depth {
            let mut payload = [0u8; DATA_LEN];
            for col in 0..DATA_LEN {
                payload[col] = data[col * depth + row];
            }
            let codeword = gf_helper.encode(&payload);
            for col in 0..SHORTENED_LEN {
                buf[col * depth + row] = codeword[col];
            }
        }

        // Overwrite first 11 bytes with a valid firecode block computed over
        // bytes [2..11].
        let fc_value = firecode::checksum(&buf[2..11]);
        buf[0] = (fc_value >> 8) as u8;
        buf[1] = (fc_value & 0xFF) as u8;

        assert_eq!(buf.len(), frame_len * NB_FRAMES_PER_SUPERFRAME);
        buf
    }

    struct ReedSolomonDecoderTestHelper {
        generator: Vec<u8>,
    }

    impl ReedSolomonDecoderTestHelper {
        fn new() -> Self {
            // Mirrors reed_solomon.rs's private GF(256) arithmetic just enough
            // to build a systematic test codeword.
            let mut exp = [0u8; 512];
            let mut log = [0u8; 256];
            let mut x: u16 = 1;
            for i in 0..255 {
                exp[i] = x as u8;
                log[x as usize] = i as u8;
                x <<= 1;
                if x & 0x100 != 0 {
                    x ^= 0x11D;
                }
            }
            for i in 255..512 {
                exp[i] = exp[i - 255];
            }
            let mul = |a: u8, b: u8| -> u8 {
                if a == 0 || b == 0 {
                    0
                } else {
                    exp[log[a as usize] as usize + log[b as usize] as usize]
                }
            };
            let mut generator = vec![1u8];
            for i in 0..16 {
                let root = exp[i];
                let mut next = vec![0u8; generator.len() + 1];
                for (j, &g) in generator.iter().enumerate() {
                    next[j] ^= mul(g, root);
                    next[j + 1] ^= g;
                }
                generator = next;
            }
            Self { generator }
        }

        fn encode(&self, data: &[u8; DATA_LEN]) -> [u8; SHORTENED_LEN] {
            let mut exp = [0u8; 512];
            let mut log = [0u8; 256];
            let mut x: u16 = 1;
            for i in 0..255 {
                exp[i] = x as u8;
                log[x as usize] = i as u8;
                x <<= 1;
                if x & 0x100 != 0 {
                    x ^= 0x11D;
                }
            }
            let mul = |a: u8, b: u8| -> u8 {
                if a == 0 || b == 0 {
                    0
                } else {
                    exp[log[a as usize] as usize + log[b as usize] as usize]
                }
            };
            let mut padded = vec![0u8; 51];
            padded.extend_from_slice(data);
            padded.extend(vec![0u8; 16]);
            let msg_len = 51 + DATA_LEN;
            for i in 0..msg_len {
                let coef = padded[i];
                if coef != 0 {
                    for j in 1..self.generator.len() {
                        padded[i + j] ^= mul(self.generator[j], coef);
                    }
                }
            }
            padded[51..msg_len].copy_from_slice(data);

            let mut out = [0u8; SHORTENED_LEN];
            out.copy_from_slice(&padded[51..]);
            out
        }
    }

    #[test]
    fn assembles_and_emits_access_units_from_five_clean_frames() {
        let depth = 5;
        let frame_len = depth * SHORTENED_LEN / NB_FRAMES_PER_SUPERFRAME;
        let full = build_clean_superframe(frame_len, depth);

        let mut assembler = SuperframeAssembler::new(frame_len);
        let mut observer = RecordingObserver::default();
        for chunk in full.chunks(frame_len) {
            assembler.push_frame(chunk, &mut observer);
        }

        assert_eq!(observer.firecode_errors, 0);
        assert_eq!(observer.rs_errors, 0);
        assert_eq!(observer.headers.len(), 1);
        assert_eq!(observer.headers[0].sampling_rate_hz, 24_000);
        assert_eq!(observer.access_units.len() + observer.crc_errors, 4);
    }

    #[test]
    fn bad_firecode_is_reported_and_state_stays_at_wait() {
        let mut assembler = SuperframeAssembler::new(8);
        let mut observer = RecordingObserver::default();
        assembler.push_frame(&[0xFFu8; 8], &mut observer);
        assert_eq!(observer.firecode_errors, 1);
    }
}
