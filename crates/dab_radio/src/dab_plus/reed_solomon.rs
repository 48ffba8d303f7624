//! Shortened Reed-Solomon(204,188) forward error correction over GF(256).
//!
//! DOC: ETSI TS 102 563 Annex, a shortened RS(255,239) with 16 parity bytes
//! (correcting up to 8 byte errors), field polynomial
//! `x^8 + x^4 + x^3 + x^2 + 1` (0x11D). The shortened code is realised by
//! conceptually zero-padding 51 symbols ahead of the 204-byte received block,
//! decoding as RS(255,239), then discarding the padding.

const FIELD_POLY: u16 = 0x11D;
const NSYM: usize = 16;
pub const CODEWORD_LEN: usize = 255;
pub const SHORTENED_LEN: usize = 204;
pub const DATA_LEN: usize = 188;
const PAD_LEN: usize = CODEWORD_LEN - SHORTENED_LEN;

struct Gf256 {
    exp: [u8; 512],
    log: [u8; 256],
}

impl Gf256 {
    fn new() -> Self {
        let mut exp = [0u8; 512];
        let mut log = [0u8; 256];
        let mut x: u16 = 1;
        for i in 0..255 {
            exp[i] = x as u8;
            log[x as usize] = i as u8;
            x <<= 1;
            if x & 0x100 != 0 {
                x ^= FIELD_POLY;
            }
        }
        for i in 255..512 {
            exp[i] = exp[i - 255];
        }
        Self { exp, log }
    }

    fn mul(&self, a: u8, b: u8) -> u8 {
        if a == 0 || b == 0 {
            0
        } else {
            self.exp[self.log[a as usize] as usize + self.log[b as usize] as usize]
        }
    }

    fn div(&self, a: u8, b: u8) -> u8 {
        assert!(b != 0);
        if a == 0 {
            0
        } else {
            self.exp[(self.log[a as usize] as usize + 255 - self.log[b as usize] as usize) % 255]
        }
    }

    fn pow(&self, base: u8, exponent: i32) -> u8 {
        if base == 0 {
            return 0;
        }
        let e = exponent.rem_euclid(255) as usize;
        self.exp[(self.log[base as usize] as usize * e) % 255]
    }

    fn inverse(&self, a: u8) -> u8 {
        self.exp[255 - self.log[a as usize] as usize]
    }

    fn poly_mul(&self, p: &[u8], q: &[u8]) -> Vec<u8> {
        let mut r = vec![0u8; p.len() + q.len() - 1];
        for (j, &qc) in q.iter().enumerate() {
            if qc == 0 {
                continue;
            }
            for (i, &pc) in p.iter().enumerate() {
                r[i + j] ^= self.mul(pc, qc);
            }
        }
        r
    }

    fn poly_add(&self, p: &[u8], q: &[u8]) -> Vec<u8> {
        let len = p.len().max(q.len());
        let mut r = vec![0u8; len];
        for (i, &c) in p.iter().enumerate() {
            r[i + len - p.len()] = c;
        }
        for (i, &c) in q.iter().enumerate() {
            r[i + len - q.len()] ^= c;
        }
        r
    }

    fn poly_eval(&self, poly: &[u8], x: u8) -> u8 {
        let mut y = poly[0];
        for &c in &poly[1..] {
            y = self.mul(y, x) ^ c;
        }
        y
    }
}

/// Decodes a shortened RS(204,188) block, correcting up to 8 byte errors.
/// Returns the corrected 188-byte payload and the number of errors corrected,
/// or `None` if the block is uncorrectable.
pub struct ReedSolomonDecoder {
    gf: Gf256,
}

impl ReedSolomonDecoder {
    pub fn new() -> Self {
        Self { gf: Gf256::new() }
    }

    pub fn decode(&self, block: &[u8; SHORTENED_LEN]) -> Option<(Vec<u8>, usize)> {
        let mut codeword = vec![0u8; PAD_LEN];
        codeword.extend_from_slice(block);

        let synd = self.calc_syndromes(&codeword);
        if synd[1..].iter().all(|&s| s == 0) {
            return Some((codeword[PAD_LEN..PAD_LEN + DATA_LEN].to_vec(), 0));
        }

        let err_loc = self.berlekamp_massey(&synd)?;
        let nb_errors = err_loc.len() - 1;
        if nb_errors * 2 > NSYM {
            return None;
        }
        let err_pos = self.find_errors(&err_loc, codeword.len())?;
        let corrected = self.correct_errata(&codeword, &synd, &err_pos, &err_loc);

        let verify = self.calc_syndromes(&corrected);
        if !verify[1..].iter().all(|&s| s == 0) {
            return None;
        }
        Some((corrected[PAD_LEN..PAD_LEN + DATA_LEN].to_vec(), err_pos.len()))
    }

    fn calc_syndromes(&self, codeword: &[u8]) -> Vec<u8> {
        let mut synd = vec![0u8; NSYM + 1];
        for i in 0..NSYM {
            synd[i + 1] = self.gf.poly_eval(codeword, self.gf.pow(2, i as i32));
        }
        synd
    }

    fn berlekamp_massey(&self, synd: &[u8]) -> Option<Vec<u8>> {
        let mut err_loc = vec![1u8];
        let mut old_loc = vec![1u8];
        for i in 0..NSYM {
            old_loc.push(0);
            let mut delta = synd[i + 1];
            for j in 1..err_loc.len() {
                delta ^= self.gf.mul(err_loc[err_loc.len() - 1 - j], synd[i + 1 - j]);
            }
            if delta != 0 {
                if old_loc.len() > err_loc.len() {
                    let new_loc = self.gf.poly_mul(&old_loc, &[delta]);
                    old_loc = self.gf.poly_mul(&err_loc, &[self.gf.inverse(delta)]);
                    err_loc = new_loc;
                }
                let scaled_old_loc = self.gf.poly_mul(&old_loc, &[delta]);
                err_loc = self.gf.poly_add(&err_loc, &scaled_old_loc);
            }
        }
        while err_loc.first() == Some(&0) && err_loc.len() > 1 {
            err_loc.remove(0);
        }
        let errs = err_loc.len() - 1;
        if errs * 2 > NSYM {
            None
        } else {
            Some(err_loc)
        }
    }

    fn find_errors(&self, err_loc: &[u8], nb_symbols: usize) -> Option<Vec<usize>> {
        let errs = err_loc.len() - 1;
        let mut err_pos = Vec::new();
        for i in 0..nb_symbols {
            if self.gf.poly_eval(err_loc, self.gf.pow(2, i as i32)) == 0 {
                err_pos.push(nb_symbols - 1 - i);
            }
        }
        if err_pos.len() != errs {
            return None;
        }
        Some(err_pos)
    }

    fn find_errata_locator(&self, coef_pos: &[usize]) -> Vec<u8> {
        let mut e_loc = vec![1u8];
        for &i in coef_pos {
            let factor = self.gf.poly_add(&[1], &[self.gf.pow(2, i as i32), 0]);
            e_loc = self.gf.poly_mul(&e_loc, &factor);
        }
        e_loc
    }

    fn find_error_evaluator(&self, synd: &[u8], err_loc: &[u8], nsym: usize) -> Vec<u8> {
        let product = self.gf.poly_mul(synd, err_loc);
        let start = product.len().saturating_sub(nsym + 1);
        product[start..].to_vec()
    }

    fn correct_errata(&self, msg_in: &[u8], synd: &[u8], err_pos: &[usize], _err_loc: &[u8]) -> Vec<u8> {
        let coef_pos: Vec<usize> = err_pos.iter().map(|&p| msg_in.len() - 1 - p).collect();
        let errata_loc = self.find_errata_locator(&coef_pos);

        let synd_rev: Vec<u8> = synd.iter().rev().cloned().collect();
        let err_eval_rev = self.find_error_evaluator(&synd_rev, &errata_loc, errata_loc.len() - 1);
        let err_eval: Vec<u8> = err_eval_rev.iter().rev().cloned().collect();

        let x: Vec<u8> = coef_pos.iter().map(|&pos| self.gf.pow(2, 255 - pos as i32)).collect();

        let mut e = vec![0u8; msg_in.len()];
        for (i, &xi) in x.iter().enumerate() {
            let xi_inv = self.gf.inverse(xi);
            let mut err_loc_prime = 1u8;
            for (j, &xj) in x.iter().enumerate() {
                if j != i {
                    err_loc_prime = self.gf.mul(err_loc_prime, 1 ^ self.gf.mul(xi_inv, xj));
                }
            }
            let err_eval_rev_for_horner: Vec<u8> = err_eval.iter().rev().cloned().collect();
            let y = self.gf.mul(xi, self.gf.poly_eval(&err_eval_rev_for_horner, xi_inv));
            let magnitude = if err_loc_prime == 0 { 0 } else { self.gf.div(y, err_loc_prime) };
            e[err_pos[i]] = magnitude;
        }
        self.gf.poly_add(msg_in, &e)
    }
}

impl Default for ReedSolomonDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_for_test(gf: &Gf256, data: &[u8; DATA_LEN]) -> [u8; SHORTENED_LEN] {
        // Builds a systematic codeword the same way the decoder expects it:
        // padded data followed by the remainder of division by the generator.
        let mut generator = vec![1u8];
        for i in 0..NSYM {
            generator = gf.poly_mul(&generator, &gf.poly_add(&[1], &[gf.pow(2, i as i32), 0]));
        }
        let mut padded = vec![0u8; PAD_LEN];
        padded.extend_from_slice(data);
        padded.extend(vec![0u8; NSYM]);

        let msg_len = PAD_LEN + DATA_LEN;
        for i in 0..msg_len {
            let coef = padded[i];
            if coef != 0 {
                for j in 1..generator.len() {
                    padded[i + j] ^= gf.mul(generator[j], coef);
                }
            }
        }
        // The division loop above only touches the parity region past each
        // processed index, but guard against any self-overlap by restoring
        // the message bytes verbatim before slicing out the parity.
        padded[PAD_LEN..msg_len].copy_from_slice(data);

        let mut out = [0u8; SHORTENED_LEN];
        out.copy_from_slice(&padded[PAD_LEN..]);
        out
    }

    #[test]
    fn corrects_injected_byte_errors() {
        let gf = Gf256::new();
        let mut data = [0u8; DATA_LEN];
        for (i, byte) in data.iter_mut().enumerate() {
            *byte = (i * 37 + 5) as u8;
        }
        let mut block = encode_for_test(&gf, &data);

        block[10] ^= 0xFF;
        block[100] ^= 0x01;
        block[150] ^= 0x80;

        let decoder = ReedSolomonDecoder::new();
        let (corrected, nb_errors) = decoder.decode(&block).expect("should correct 3 errors");
        assert_eq!(&corrected[..], &data[..]);
        assert_eq!(nb_errors, 3);
    }

    #[test]
    fn clean_block_decodes_with_zero_errors() {
        let gf = Gf256::new();
        let data = [7u8; DATA_LEN];
        let block = encode_for_test(&gf, &data);
        let decoder = ReedSolomonDecoder::new();
        let (corrected, nb_errors) = decoder.decode(&block).unwrap();
        assert_eq!(nb_errors, 0);
        assert_eq!(&corrected[..], &data[..]);
    }
}
