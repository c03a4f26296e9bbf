//! Conventional <-> dual basis conversion for CCSDS Reed-Solomon symbols.
//!
//! CCSDS RS(255,223) optionally represents each GF(2^8) symbol in the
//! Berlekamp dual basis rather than the conventional polynomial basis
//! `gf.rs` computes in. `reed_solomon.cc`'s `encode`/`decode` select this
//! via `encode_rs_ccsds`/`decode_rs_ccsds`, which apply libfec's `Taltab`/
//! `Tal1tab` conversion tables before/after the conventional RS codec —
//! those tables themselves weren't present in the retrieved source, so
//! rather than guess at their literal bytes this module derives the same
//! object they encode: the dual basis of the conventional power basis
//! `{1, alpha, ..., alpha^7}` under the trace pairing, which is the actual
//! definition of a Berlekamp dual basis over GF(2^8).
//!
//! For a field element `x` written in the conventional basis, its dual
//! basis coordinate `c_i` is `Tr(x * alpha^i)`, where `Tr` is the GF(2)
//! field trace `Tr(y) = y + y^2 + y^4 + ... + y^128`. This is linear in
//! `x`, so it reduces to one fixed 8x8 GF(2) matrix, computed once here
//! from `gf.rs`'s own field tables and inverted for the return trip -
//! the same Gaussian-elimination approach `rs.rs` uses for its own
//! linear-algebra steps.

use crate::gf;
use std::sync::OnceLock;

/// GF(2) trace of a field element: always reduces to 0 or 1.
fn trace(x: u8) -> u8 {
    let mut acc = 0u8;
    let mut power = x;
    for _ in 0..8 {
        acc ^= power;
        power = gf::mult(power, power);
    }
    acc & 1
}

/// Rows of the conventional -> dual basis change matrix. Row `i`'s bit
/// `k` is `Tr(alpha^(i+k))`; applying row `i` to an input byte (via
/// parity of the bitwise AND) yields dual-basis coordinate `c_i =
/// Tr(x * alpha^i)`, packed MSB-first (`c_0` into bit 7).
fn forward_rows() -> &'static [u8; 8] {
    static ROWS: OnceLock<[u8; 8]> = OnceLock::new();
    ROWS.get_or_init(|| {
        let trace_pow: Vec<u8> = (0..15).map(|n| trace(gf::pow(2, n))).collect();
        std::array::from_fn(|i| {
            let mut row = 0u8;
            for k in 0..8 {
                if trace_pow[i + k] == 1 {
                    row |= 1 << k;
                }
            }
            row
        })
    })
}

fn apply(rows: &[u8; 8], byte: u8) -> u8 {
    let mut out = 0u8;
    for (i, &row) in rows.iter().enumerate() {
        let bit = (row & byte).count_ones() & 1;
        out |= (bit as u8) << (7 - i);
    }
    out
}

fn inverse_rows() -> &'static [u8; 8] {
    static INVERSE: OnceLock<[u8; 8]> = OnceLock::new();
    INVERSE.get_or_init(|| invert_gf2_matrix(forward_rows()))
}

/// Gaussian elimination over GF(2) to invert an 8x8 bit matrix given as
/// row bitmasks (MSB = column 0).
fn invert_gf2_matrix(rows: &[u8; 8]) -> [u8; 8] {
    let mut aug: [u16; 8] = std::array::from_fn(|i| ((rows[i] as u16) << 8) | (1 << (7 - i)));

    for col in 0..8 {
        let pivot_mask = 1u16 << (15 - col);
        let pivot = (col..8).find(|&r| aug[r] & pivot_mask != 0).expect("trace pairing must be nondegenerate");
        aug.swap(col, pivot);
        for r in 0..8 {
            if r != col && aug[r] & pivot_mask != 0 {
                aug[r] ^= aug[col];
            }
        }
    }

    std::array::from_fn(|i| (aug[i] & 0xFF) as u8)
}

/// Convert a byte from conventional basis to the dual basis.
pub fn to_dual(byte: u8) -> u8 {
    apply(forward_rows(), byte)
}

/// Convert a byte from the dual basis back to conventional basis.
pub fn to_conventional(byte: u8) -> u8 {
    apply(inverse_rows(), byte)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_byte() {
        for b in 0..=255u8 {
            assert_eq!(to_conventional(to_dual(b)), b);
        }
    }

    #[test]
    fn is_not_the_identity() {
        assert!((0..=255u8).any(|b| to_dual(b) != b));
    }

    #[test]
    fn basis_is_biorthogonal_under_the_trace_pairing() {
        // Tr(alpha^i * alpha^j) should be 1 only when the dual-basis
        // coordinate i lines up with power-basis exponent i itself,
        // i.e. forward_rows()[i] has the single defining property that
        // this module exists to reproduce.
        for i in 0..8 {
            for k in 0..8 {
                let bit = (forward_rows()[i] >> k) & 1;
                let expected = trace(gf::mult(gf::pow(2, i as i32), gf::pow(2, k as i32)));
                assert_eq!(bit, expected, "row {i} bit {k}");
            }
        }
    }
}
