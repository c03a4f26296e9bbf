//! CCSDS TM Synchronization and Channel Coding: concatenated FEC chain
//! (outer RS(255,223), byte interleaving, PN scrambling, 32-bit ASM sync,
//! inner rate-1/2 K=7 convolutional code with puncturing, soft-decision
//! Viterbi decoding).
//!
//! Each stage is usable on its own (see the `convolutional`, `viterbi`,
//! `rs`, `framing`, `scrambler`, and `sync` modules); this top-level
//! module wires them into the transmit/receive chain described in the
//! external interfaces section, honoring the intentional hard- vs
//! soft-decision asymmetry between `ChainMode::OnlyRs` (hard-decision
//! into the ASM correlator) and the two modes that involve the
//! convolutional code (soft-decision into the Viterbi decoder).

pub mod convolutional;
pub mod dual_basis;
pub mod error;
pub mod framing;
pub mod gf;
pub mod rs;
pub mod scrambler;
pub mod sync;
pub mod tables;
pub mod viterbi;

pub use convolutional::{ConvolutionalEncoder, PunctureRate};
pub use error::{FecError, Result};
pub use framing::{FrameDecodeReport, FramerConfig};
pub use sync::AsmCorrelator;
pub use viterbi::{ViterbiConfig, ViterbiDecoder};

/// Which stages of the concatenated chain are active. Spec section 9
/// requires hard-decision demodulation feeding the ASM correlator when
/// the convolutional code is absent (`OnlyRs`), and soft-decision
/// feeding the Viterbi decoder whenever it is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainMode {
    OnlyRs,
    OnlyCc,
    RsAndCc,
}

impl ChainMode {
    pub fn uses_rs(self) -> bool {
        matches!(self, ChainMode::OnlyRs | ChainMode::RsAndCc)
    }

    pub fn uses_cc(self) -> bool {
        matches!(self, ChainMode::OnlyCc | ChainMode::RsAndCc)
    }
}

/// Top-level chain configuration (spec section 6's configuration table).
#[derive(Debug, Clone, Copy)]
pub struct FecConfig {
    pub framer: FramerConfig,
    pub scramble: bool,
    pub puncturing: PunctureRate,
    pub mode: ChainMode,
    pub threshold: u32,
    pub viterbi: ViterbiConfig,
    /// Zero bytes prepended/appended around the payload before
    /// convolutional encoding, to flush the trellis cleanly (spec
    /// section 9's local convention; not standard CCSDS tail-biting).
    pub pad_leading: usize,
    pub pad_trailing: usize,
}

impl FecConfig {
    pub fn validate(&self) -> Result<()> {
        self.framer.validate()?;
        self.viterbi.validate()?;
        Ok(())
    }

    /// Extra trailing erasures fed to the decoder to flush the final
    /// traceback chunk out of the pipeline.
    fn flush_bits(&self) -> usize {
        self.viterbi.merge_dist + self.viterbi.trace_chunk
    }

    /// Fixed decode latency of the continuous traceback, in bits: the
    /// decoded stream is the input stream delayed by `merge_dist` bits.
    fn traceback_latency_bits(&self) -> usize {
        self.viterbi.merge_dist
    }
}

fn bytes_to_bits(bytes: &[u8]) -> Vec<u8> {
    let mut bits = Vec::with_capacity(bytes.len() * 8);
    for &byte in bytes {
        for i in (0..8).rev() {
            bits.push((byte >> i) & 1);
        }
    }
    bits
}

#[cfg(test)]
fn bits_to_bytes(bits: &[u8]) -> Vec<u8> {
    bits.chunks_exact(8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, &b| (acc << 1) | (b & 1)))
        .collect()
}

fn u32_to_bits(value: u32, width: u32) -> Vec<u8> {
    (0..width).rev().map(|i| ((value >> i) & 1) as u8).collect()
}

/// Build the full transmit bitstream for one frame: a 32-bit ASM (never
/// scrambled or channel-coded) followed by the codeword region, which is
/// RS-encoded and interleaved, then scrambled, then convolutionally
/// encoded, depending on `config.mode`.
pub fn transmit(config: &FecConfig, payload: &[u8]) -> Result<Vec<u8>> {
    config.validate()?;

    let mut codeword_bytes = if config.mode.uses_rs() {
        framing::encode(&config.framer, payload)?
    } else {
        payload.to_vec()
    };

    if config.scramble {
        scrambler::scramble_in_place(&mut codeword_bytes);
    }

    let mut bits = u32_to_bits(tables::ASM, 32);

    if config.mode.uses_cc() {
        let padded = convolutional::pad_for_flush(&codeword_bytes, config.pad_leading, config.pad_trailing);
        let mut encoder = ConvolutionalEncoder::new(config.puncturing);
        bits.extend(encoder.encode(&padded));
    } else {
        bits.extend(bytes_to_bits(&codeword_bytes));
    }

    Ok(bits)
}

/// Receive one ASM-prefixed, hard-decision bitstream produced by
/// `transmit` under `ChainMode::OnlyRs`: ASM search, descramble,
/// RS-decode.
pub fn receive_hard(config: &FecConfig, bits: &[u8]) -> Result<(Vec<u8>, FrameDecodeReport)> {
    config.validate()?;
    let frame_len = config.framer.codeword_len();
    let mut correlator = AsmCorrelator::new(config.threshold, frame_len);
    let frames = correlator.push_bits(bits);
    let mut codeword = frames.into_iter().next().ok_or(FecError::InvalidInputSize)?;

    if config.scramble {
        scrambler::scramble_in_place(&mut codeword);
    }
    framing::decode(&config.framer, &codeword)
}

/// Receive one ASM-prefixed, soft-decision sample stream produced for
/// `ChainMode::OnlyCc` or `ChainMode::RsAndCc`: strips the (hard, 0/255)
/// ASM preamble, Viterbi-decodes the remainder, discards the flush
/// padding and decoding latency, then (for `RsAndCc`) descrambles and
/// RS-decodes.
pub fn receive_soft(config: &FecConfig, soft: &[u8]) -> Result<(Vec<u8>, Option<FrameDecodeReport>)> {
    config.validate()?;
    if soft.len() < 32 {
        return Err(FecError::InvalidInputSize);
    }
    let coded = convolutional::depuncture_soft(&soft[32..], config.puncturing);

    let mut decoder = ViterbiDecoder::new(config.viterbi)?;
    let flush = vec![128u8; config.flush_bits() * 2];
    let mut full = coded;
    full.extend_from_slice(&flush);
    let decoded = decoder.decode(&full)?;

    let skip_bytes = config.traceback_latency_bits() / 8;
    let body_start = skip_bytes + config.pad_leading;
    let body_len = if config.mode.uses_rs() {
        config.framer.codeword_len()
    } else {
        // Trim the trailing zero flush pad and the one extra trace_chunk
        // worth of decode latency left over once `traceback_latency_bits`
        // has accounted for `merge_dist` (see `FecConfig::flush_bits`).
        let trailing_overhead = config.pad_trailing + config.viterbi.trace_chunk / 8;
        decoded.len().saturating_sub(body_start + trailing_overhead)
    };
    if decoded.len() < body_start + body_len {
        return Err(FecError::InvalidInputSize);
    }
    let codeword = &decoded[body_start..body_start + body_len];

    if config.mode.uses_rs() {
        let (payload, report) = sync::decode_aligned_bytes(codeword, &config.framer, config.scramble)?;
        Ok((payload, Some(report)))
    } else {
        Ok((codeword.to_vec(), None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rs_and_cc_config() -> FecConfig {
        FecConfig {
            framer: FramerConfig { rs_encode: true, rs_decode: true, interleave: false, n_interleave: 1, dual_basis: false },
            scramble: true,
            puncturing: PunctureRate::OneHalf,
            mode: ChainMode::RsAndCc,
            threshold: 4,
            viterbi: ViterbiConfig::default(),
            pad_leading: 5,
            pad_trailing: 3,
        }
    }

    #[test]
    fn clean_round_trip_rs_and_cc() {
        let config = rs_and_cc_config();
        let payload: Vec<u8> = (0..223u32).map(|i| i as u8).collect();
        let bits = transmit(&config, &payload).unwrap();
        let soft: Vec<u8> = bits.iter().map(|&b| if b == 1 { 255 } else { 0 }).collect();
        let (out, report) = receive_soft(&config, &soft).unwrap();
        assert_eq!(out, payload);
        assert!(report.unwrap().success);
    }

    #[test]
    fn clean_round_trip_only_rs() {
        let mut config = rs_and_cc_config();
        config.mode = ChainMode::OnlyRs;
        let payload: Vec<u8> = (0..223u32).map(|i| (i * 3) as u8).collect();
        let bits = transmit(&config, &payload).unwrap();
        let (out, report) = receive_hard(&config, &bits).unwrap();
        assert_eq!(out, payload);
        assert!(report.success);
    }

    #[test]
    fn clean_round_trip_only_cc_has_no_trailing_flush_bytes() {
        let mut config = rs_and_cc_config();
        config.mode = ChainMode::OnlyCc;
        config.scramble = false;
        let payload: Vec<u8> = (0..64u32).map(|i| (i * 7) as u8).collect();
        let bits = transmit(&config, &payload).unwrap();
        let soft: Vec<u8> = bits.iter().map(|&b| if b == 1 { 255 } else { 0 }).collect();
        let (out, report) = receive_soft(&config, &soft).unwrap();
        assert!(report.is_none());
        assert_eq!(out, payload);
    }

    #[test]
    fn bytes_bits_round_trip() {
        let data = vec![0xA5u8, 0x3C, 0x00, 0xFF];
        assert_eq!(bits_to_bytes(&bytes_to_bits(&data)), data);
    }
}
