//! ASM (Attached Sync Marker) bit-serial correlator.
//!
//! Ported from the SEARCH/LOCK state machine in `correlator.cc`: a 64-bit
//! shift register accumulates incoming hard bits; the low 32 bits are
//! compared by Hamming distance against the ASM and its complement to
//! detect lock and polarity ambiguity.

use crate::tables::ASM;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ambiguity {
    Normal,
    Inverted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Search,
    Lock(Ambiguity),
}

/// Bit-serial ASM correlator. Feed it one hard bit (0/1) at a time; it
/// emits a complete, byte-aligned, de-inverted frame buffer once every
/// `frame_len` bytes following a lock.
pub struct AsmCorrelator {
    state: State,
    register: u64,
    bits_seen: u32,
    threshold: u32,
    frame_len: usize,
    byte_acc: u8,
    bit_in_byte: u8,
    frame_buf: Vec<u8>,
    frames_emitted: u64,
}

impl AsmCorrelator {
    pub fn new(threshold: u32, frame_len: usize) -> Self {
        Self {
            state: State::Search,
            register: 0,
            bits_seen: 0,
            threshold,
            frame_len,
            byte_acc: 0,
            bit_in_byte: 0,
            frame_buf: Vec::with_capacity(frame_len),
            frames_emitted: 0,
        }
    }

    pub fn frames_emitted(&self) -> u64 {
        self.frames_emitted
    }

    /// Feed one hard bit. Returns a complete frame buffer when one closes.
    pub fn push_bit(&mut self, bit: u8) -> Option<Vec<u8>> {
        match self.state {
            State::Search => {
                self.register = (self.register << 1) | (bit as u64 & 1);
                self.bits_seen = (self.bits_seen + 1).min(32);
                if self.bits_seen < 32 {
                    return None;
                }
                let window = (self.register & 0xFFFF_FFFF) as u32;
                let dist_normal = (window ^ ASM).count_ones();
                let dist_inverted = (window ^ !ASM).count_ones();

                if dist_normal <= self.threshold {
                    self.enter_lock(Ambiguity::Normal);
                } else if dist_inverted <= self.threshold {
                    self.enter_lock(Ambiguity::Inverted);
                }
                None
            }
            State::Lock(ambiguity) => self.accumulate(bit, ambiguity),
        }
    }

    /// Feed a whole stream of hard bits, returning every frame completed.
    pub fn push_bits(&mut self, bits: &[u8]) -> Vec<Vec<u8>> {
        bits.iter().filter_map(|&b| self.push_bit(b)).collect()
    }

    fn enter_lock(&mut self, ambiguity: Ambiguity) {
        self.state = State::Lock(ambiguity);
        self.byte_acc = 0;
        self.bit_in_byte = 0;
        self.frame_buf.clear();
    }

    fn accumulate(&mut self, bit: u8, ambiguity: Ambiguity) -> Option<Vec<u8>> {
        self.byte_acc = (self.byte_acc << 1) | (bit & 1);
        self.bit_in_byte += 1;
        if self.bit_in_byte == 8 {
            let byte = if ambiguity == Ambiguity::Inverted { self.byte_acc ^ 0xFF } else { self.byte_acc };
            self.frame_buf.push(byte);
            self.byte_acc = 0;
            self.bit_in_byte = 0;

            if self.frame_buf.len() == self.frame_len {
                self.frames_emitted += 1;
                self.state = State::Search;
                self.register = 0;
                self.bits_seen = 0;
                return Some(std::mem::take(&mut self.frame_buf));
            }
        }
        None
    }
}

/// Bypass the ASM search for already-aligned input (the post-Viterbi
/// case, where byte alignment is inherited from the encoder's first
/// bit): given exactly `config.codeword_len()` contiguous bytes, hand
/// them straight to the descrambler and RS framer instead of
/// re-deriving alignment through correlation.
pub fn decode_aligned_bytes(
    bytes: &[u8],
    config: &crate::framing::FramerConfig,
    scramble: bool,
) -> Result<(Vec<u8>, crate::framing::FrameDecodeReport), crate::error::FecError> {
    if bytes.len() != config.codeword_len() {
        return Err(crate::error::FecError::InvalidInputSize);
    }
    let mut codeword = bytes.to_vec();
    if scramble {
        crate::scrambler::scramble_in_place(&mut codeword);
    }
    crate::framing::decode(config, &codeword)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits_of(value: u32, width: u32) -> Vec<u8> {
        (0..width).rev().map(|i| ((value >> i) & 1) as u8).collect()
    }

    fn frame_bits(frame_len: usize) -> Vec<u8> {
        let mut bits = bits_of(ASM, 32);
        for i in 0..frame_len {
            bits.extend(bits_of((i as u32).wrapping_mul(97), 8));
        }
        bits
    }

    #[test]
    fn exact_asm_locks_and_emits_the_frame() {
        let frame_len = 8;
        let bits = frame_bits(frame_len);
        let mut corr = AsmCorrelator::new(0, frame_len);
        let frames = corr.push_bits(&bits);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), frame_len);
        assert_eq!(corr.frames_emitted(), 1);
    }

    #[test]
    fn tolerates_exactly_threshold_bit_flips() {
        let frame_len = 4;
        let mut bits = frame_bits(frame_len);
        // flip two bits within the ASM header
        bits[0] ^= 1;
        bits[31] ^= 1;
        let mut corr = AsmCorrelator::new(2, frame_len);
        let frames = corr.push_bits(&bits);
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn rejects_one_more_than_threshold_bit_flips() {
        let frame_len = 4;
        let mut bits = frame_bits(frame_len);
        bits[0] ^= 1;
        bits[10] ^= 1;
        bits[20] ^= 1;
        let mut corr = AsmCorrelator::new(2, frame_len);
        let frames = corr.push_bits(&bits);
        assert!(frames.is_empty());
    }

    #[test]
    fn inverted_polarity_locks_and_recovers_original_bytes() {
        let frame_len = 6;
        let bits: Vec<u8> = frame_bits(frame_len).iter().map(|&b| 1 - b).collect();
        let mut corr = AsmCorrelator::new(0, frame_len);
        let frames = corr.push_bits(&bits);
        assert_eq!(frames.len(), 1);
        let expected: Vec<u8> = (0..frame_len).map(|i| (i as u32).wrapping_mul(97) as u8).collect();
        assert_eq!(frames[0], expected);
    }

    #[test]
    fn decode_aligned_bytes_descrambles_and_rs_decodes() {
        use crate::framing::{self, FramerConfig};

        let config = FramerConfig { rs_encode: true, rs_decode: true, interleave: false, n_interleave: 1, dual_basis: false };
        let payload: Vec<u8> = (0..crate::rs::RS_DATA_LEN as u32).map(|i| i as u8).collect();
        let mut codeword = framing::encode(&config, &payload).unwrap();
        crate::scrambler::scramble_in_place(&mut codeword);

        let (out, report) = decode_aligned_bytes(&codeword, &config, true).unwrap();
        assert_eq!(out, payload);
        assert!(report.success);
    }

    #[test]
    fn decode_aligned_bytes_rejects_wrong_length() {
        use crate::framing::FramerConfig;

        let config = FramerConfig { rs_encode: true, rs_decode: true, interleave: false, n_interleave: 1, dual_basis: false };
        assert!(decode_aligned_bytes(&[0u8; 7], &config, false).is_err());
    }
}
