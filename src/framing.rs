//! RS framer: gathers/scatters payload bytes across `n_interleave`
//! independent RS(255,223) blocks and assembles/disassembles the
//! codeword region of a frame.
//!
//! Grounded on the interleave stride convention in `ccsds_rs_encoder.cc` /
//! `ccsds_rs_decoder.cc`: block `j`'s byte `i` comes from (or goes to)
//! `payload[j + n_interleave * i]` when interleaving is enabled.

use crate::error::{FecError, Result};
use crate::rs::{self, RsOutcome, RS_BLOCK_LEN, RS_DATA_LEN};

/// Framer-level configuration (spec section 6's external interface table).
#[derive(Debug, Clone, Copy)]
pub struct FramerConfig {
    pub rs_encode: bool,
    pub rs_decode: bool,
    pub interleave: bool,
    pub n_interleave: usize,
    pub dual_basis: bool,
}

impl FramerConfig {
    pub fn validate(&self) -> Result<()> {
        if !(1..=8).contains(&self.n_interleave) {
            return Err(FecError::InvalidConfig("n_interleave must be in 1..=8".into()));
        }
        Ok(())
    }

    pub fn codeword_len(&self) -> usize {
        RS_BLOCK_LEN * self.n_interleave
    }

    pub fn payload_len(&self) -> usize {
        RS_DATA_LEN * self.n_interleave
    }
}

/// Per-frame decode outcome: how many subblocks were examined, how many
/// errors were corrected in total, and whether every subblock succeeded.
#[derive(Debug, Clone, Default)]
pub struct FrameDecodeReport {
    pub subframes_decoded: usize,
    pub total_errors_corrected: u32,
    pub success: bool,
}

/// Encode `payload` (exactly `n_interleave * 223` bytes) into a codeword
/// region of `n_interleave * 255` bytes. If `rs_encode` is false, parity
/// bytes are left zeroed.
pub fn encode(config: &FramerConfig, payload: &[u8]) -> Result<Vec<u8>> {
    config.validate()?;
    if payload.len() != config.payload_len() {
        return Err(FecError::InvalidInputSize);
    }

    let mut codeword = vec![0u8; config.codeword_len()];
    for j in 0..config.n_interleave {
        let mut block = [0u8; RS_BLOCK_LEN];
        for i in 0..RS_DATA_LEN {
            let src_idx = if config.interleave { j + config.n_interleave * i } else { j * RS_DATA_LEN + i };
            block[i] = payload[src_idx];
        }
        if config.rs_encode {
            rs::encode(&mut block, config.dual_basis);
        }
        for i in 0..RS_BLOCK_LEN {
            let dst_idx = if config.interleave { j + config.n_interleave * i } else { j * RS_BLOCK_LEN + i };
            codeword[dst_idx] = block[i];
        }
    }
    Ok(codeword)
}

/// Decode a codeword region back into its payload, correcting each
/// subblock independently. A subblock that exceeds its correction
/// capacity is passed through uncorrected and counted as a failure.
pub fn decode(config: &FramerConfig, codeword: &[u8]) -> Result<(Vec<u8>, FrameDecodeReport)> {
    config.validate()?;
    if codeword.len() != config.codeword_len() {
        return Err(FecError::InvalidInputSize);
    }

    let mut payload = vec![0u8; config.payload_len()];
    let mut report = FrameDecodeReport { success: true, ..Default::default() };

    for j in 0..config.n_interleave {
        let mut block = [0u8; RS_BLOCK_LEN];
        for i in 0..RS_BLOCK_LEN {
            let src_idx = if config.interleave { j + config.n_interleave * i } else { j * RS_BLOCK_LEN + i };
            block[i] = codeword[src_idx];
        }

        if config.rs_decode {
            match rs::decode(&mut block, config.dual_basis) {
                RsOutcome::Ok => {}
                RsOutcome::Corrected(n) => report.total_errors_corrected += n as u32,
                RsOutcome::Failure => report.success = false,
            }
        }
        report.subframes_decoded += 1;

        for i in 0..RS_DATA_LEN {
            let dst_idx = if config.interleave { j + config.n_interleave * i } else { j * RS_DATA_LEN + i };
            payload[dst_idx] = block[i];
        }
    }

    Ok((payload, report))
}
