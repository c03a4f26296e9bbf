//! CCSDS PN scrambler: a fixed, self-inverse XOR sequence applied to the
//! codeword region of a frame (never to the ASM itself).

use crate::tables::pn_sequence;

/// XOR `data` byte-wise against the 255-byte PN sequence, repeating it as
/// needed. The first byte of `data` is assumed to align with PN[0]. Being
/// a pure XOR, calling this twice on the same input restores it.
pub fn scramble(data: &[u8]) -> Vec<u8> {
    let pn = pn_sequence();
    data.iter().enumerate().map(|(i, &b)| b ^ pn[i % pn.len()]).collect()
}

/// In-place variant, avoids an allocation when the caller already owns a
/// mutable buffer (the framer applies this directly to codeword regions).
pub fn scramble_in_place(data: &mut [u8]) {
    let pn = pn_sequence();
    for (i, b) in data.iter_mut().enumerate() {
        *b ^= pn[i % pn.len()];
    }
}
