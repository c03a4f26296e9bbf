//! Convolutional encoder for the NASA-standard K=7, rate-1/2 code, with
//! runtime-selectable puncturing.
//!
//! Grounded on `viterbi27.c`'s `encode27`/`encode27_bit` (Phil Karn, KA9Q):
//! the encoder state is a 6-bit shift register, the two generators are
//! consulted on the 7-bit working value (state shifted in with the new
//! input bit), and `c2` is inverted relative to its raw parity.

use crate::error::{FecError, Result};
use crate::tables::{POLY_G1, POLY_G2};

/// One of the five fixed CCSDS puncturing patterns (spec section 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PunctureRate {
    OneHalf,
    TwoThirds,
    ThreeQuarters,
    FiveSixths,
    SevenEighths,
}

impl PunctureRate {
    /// `(C1, C2)` puncturing vectors for this rate.
    pub fn pattern(self) -> (&'static [u8], &'static [u8]) {
        match self {
            PunctureRate::OneHalf => (&[1], &[1]),
            PunctureRate::TwoThirds => (&[1, 0], &[1, 1]),
            PunctureRate::ThreeQuarters => (&[1, 0, 1], &[1, 1, 0]),
            PunctureRate::FiveSixths => (&[1, 0, 1, 0, 1], &[1, 1, 0, 1, 0]),
            PunctureRate::SevenEighths => (&[1, 0, 0, 0, 1, 0, 1], &[1, 1, 1, 1, 0, 1, 0]),
        }
    }
}

/// Parity of a byte (number of set bits mod 2).
fn parity(byte: u8) -> u8 {
    byte.count_ones() as u8 & 1
}

/// Convolutional encoder with persistent 6-bit shift-register state.
pub struct ConvolutionalEncoder {
    state: u8,
    puncture: PunctureRate,
    pattern_index: usize,
}

impl ConvolutionalEncoder {
    pub fn new(puncture: PunctureRate) -> Self {
        Self { state: 0, puncture, pattern_index: 0 }
    }

    pub fn reset(&mut self) {
        self.state = 0;
        self.pattern_index = 0;
    }

    /// Encode a single input bit, appending 0/1-valued coded bits to `out`
    /// according to the puncturing pattern. Returns the number emitted.
    fn encode_bit(&mut self, bit: u8, out: &mut Vec<u8>) -> usize {
        let working = ((self.state << 1) | bit) & 0x7F;
        let c1 = parity(working & POLY_G2);
        let c2 = 1 - parity(working & POLY_G1);
        self.state = working & 0x3F;

        let (c1_pat, c2_pat) = self.puncture.pattern();
        let len = c1_pat.len();
        let k = self.pattern_index % len;
        let mut emitted = 0;
        if c1_pat[k] == 1 {
            out.push(c1);
            emitted += 1;
        }
        if c2_pat[k] == 1 {
            out.push(c2);
            emitted += 1;
        }
        self.pattern_index += 1;
        emitted
    }

    /// Encode a full byte stream, MSB-first within each byte. Returns the
    /// number of coded bits emitted.
    pub fn encode(&mut self, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(data.len() * 2);
        for &byte in data {
            for i in (0..8).rev() {
                let bit = (byte >> i) & 1;
                self.encode_bit(bit, &mut out);
            }
        }
        out
    }
}

/// Reinsert erasure sentinels (128) at the positions a puncturing pattern
/// dropped, turning a compact punctured soft stream back into a full
/// two-symbols-per-trellis-step stream the Viterbi decoder expects.
pub fn depuncture_soft(compact: &[u8], rate: PunctureRate) -> Vec<u8> {
    let (c1, c2) = rate.pattern();
    let len = c1.len();
    let mut out = Vec::with_capacity(compact.len() * 2);
    let mut k = 0usize;
    let mut i = 0usize;
    while i < compact.len() {
        let col = k % len;
        out.push(if c1[col] == 1 {
            let v = compact[i];
            i += 1;
            v
        } else {
            128
        });
        out.push(if c2[col] == 1 {
            let v = compact[i];
            i += 1;
            v
        } else {
            128
        });
        k += 1;
    }
    out
}

/// Prepend/append the local zero-padding convention (spec section 9) used
/// to give the continuous Viterbi decoder a clean start and end.
pub fn pad_for_flush(data: &[u8], leading: usize, trailing: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(leading + data.len() + trailing);
    out.extend(std::iter::repeat(0u8).take(leading));
    out.extend_from_slice(data);
    out.extend(std::iter::repeat(0u8).take(trailing));
    out
}

/// Validate that a puncture pattern has at least one set bit per column,
/// the only invariant spec section 3 places on it beyond its fixed shape.
pub fn validate_pattern(c1: &[u8], c2: &[u8]) -> Result<()> {
    if c1.len() != c2.len() || c1.is_empty() {
        return Err(FecError::InvalidConfig("puncture vectors must be equal, nonzero length".into()));
    }
    for k in 0..c1.len() {
        if c1[k] == 0 && c2[k] == 0 {
            return Err(FecError::InvalidConfig(format!("puncture column {k} drops both bits")));
        }
    }
    Ok(())
}
