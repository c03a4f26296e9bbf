//! Continuous soft-decision Viterbi decoder for the K=7 rate-1/2 code.
//!
//! Ported from the streaming-traceback design of `viterbi27.c` (Phil Karn,
//! KA9Q): double-buffered state metrics, a circular path-memory of
//! decision words, and periodic traceback instead of a single
//! whole-message traceback. See spec section 4.3 for the exact butterfly
//! and traceback formulas this mirrors.

use crate::error::{FecError, Result};
use crate::tables::{branch_metric_tables, BUTTERFLY_SYM};

const NUM_STATES: usize = 64;

/// Tunable constants from spec section 6, with the suggested defaults.
#[derive(Debug, Clone, Copy)]
pub struct ViterbiConfig {
    /// Path memory depth in trellis steps. Must be a power of two.
    pub path_mem: usize,
    /// Traceback depth before trusting the survivor path has merged.
    pub merge_dist: usize,
    /// Bits decoded per traceback; must be a multiple of 8.
    pub trace_chunk: usize,
    /// Metric magnitude at which renormalization kicks in.
    pub renormalize: i32,
}

impl Default for ViterbiConfig {
    fn default() -> Self {
        Self { path_mem: 256, merge_dist: 128, trace_chunk: 8, renormalize: 10_000 }
    }
}

impl ViterbiConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.path_mem.is_power_of_two() {
            return Err(FecError::InvalidConfig("path_mem must be a power of two".into()));
        }
        if self.trace_chunk % 8 != 0 {
            return Err(FecError::InvalidConfig("trace_chunk must be a multiple of 8".into()));
        }
        if self.merge_dist + self.trace_chunk >= self.path_mem {
            return Err(FecError::InvalidConfig("merge_dist + trace_chunk must be < path_mem".into()));
        }
        if self.merge_dist < 6 {
            return Err(FecError::InvalidConfig("merge_dist must be at least 6".into()));
        }
        Ok(())
    }
}

/// One trellis step's decision bits, packed into two 32-bit lanes mapping
/// directly to the two butterfly groups (spec section 9).
type PathCell = [u32; 2];

pub struct ViterbiDecoder {
    config: ViterbiConfig,
    metrics: [[i32; NUM_STATES]; 2],
    cur: usize,
    paths: Vec<PathCell>,
    pi: usize,
    mask: usize,
    since_traceback: usize,
    output: Vec<u8>,
}

impl ViterbiDecoder {
    pub fn new(config: ViterbiConfig) -> Result<Self> {
        config.validate()?;
        let mut metrics = [[0i32; NUM_STATES]; 2];
        for s in metrics[0].iter_mut().skip(1) {
            *s = i32::MIN / 2;
        }
        let mask = config.path_mem - 1;
        Ok(Self {
            config,
            metrics,
            cur: 0,
            paths: vec![[0u32; 2]; config.path_mem],
            pi: 0,
            mask,
            since_traceback: 0,
            output: Vec::new(),
        })
    }

    /// Feed a stream of soft samples (offset-binary, two per trellis step;
    /// a punctured position is the sentinel 128). Returns all payload
    /// bytes that have been flushed out by periodic traceback so far.
    pub fn decode(&mut self, soft: &[u8]) -> Result<Vec<u8>> {
        if soft.len() % 2 != 0 {
            return Err(FecError::InvalidInputSize);
        }
        let (m0, m1) = branch_metric_tables();
        for pair in soft.chunks_exact(2) {
            self.renormalize();

            let s0 = pair[0] as usize;
            let s1 = pair[1] as usize;
            let mets = [
                m0[s0] + m0[s1], // 00
                m0[s0] + m1[s1], // 01
                m1[s0] + m0[s1], // 10
                m1[s0] + m1[s1], // 11
            ];

            let read = self.cur;
            let write = 1 - self.cur;
            let mut lanes = [0u32; 2];

            for i in 0..32usize {
                let sym = BUTTERFLY_SYM[i] as usize;
                let m0v = self.metrics[read][i] + mets[sym];
                let m1v = self.metrics[read][i + 32] + mets[3 ^ sym];
                let even_state = 2 * i;
                let (even_metric, even_bit) = if m1v > m0v { (m1v, 1u32) } else { (m0v, 0u32) };
                self.metrics[write][even_state] = even_metric;

                let delta = mets[sym] - mets[3 ^ sym];
                let m0o = m0v - delta;
                let m1o = m1v + delta;
                let odd_state = even_state + 1;
                let (odd_metric, odd_bit) = if m1o > m0o { (m1o, 1u32) } else { (m0o, 0u32) };
                self.metrics[write][odd_state] = odd_metric;

                let lane = even_state / 32;
                lanes[lane] |= even_bit << (even_state & 31);
                lanes[lane] |= odd_bit << (odd_state & 31);
            }

            self.paths[self.pi] = lanes;
            self.cur = write;
            self.pi = (self.pi + 1) & self.mask;
            self.since_traceback += 1;

            if self.since_traceback == self.config.trace_chunk {
                self.traceback();
                self.since_traceback = 0;
            }
        }
        Ok(std::mem::take(&mut self.output))
    }

    fn renormalize(&mut self) {
        let top = self.metrics[self.cur][0];
        if top > i32::MAX - self.config.renormalize {
            let shift = self.config.renormalize;
            for m in self.metrics[self.cur].iter_mut() {
                *m -= shift;
            }
        } else if top < i32::MIN + self.config.renormalize {
            let shift = self.config.renormalize;
            for m in self.metrics[self.cur].iter_mut() {
                *m += shift;
            }
        }
    }

    fn prev(&self, pi: usize) -> usize {
        (pi + self.paths.len() - 1) & self.mask
    }

    fn traceback(&mut self) {
        let mut state: u8 = 0;
        let mut pi = self.prev(self.pi);

        for _ in 0..(self.config.merge_dist - 6) {
            let cell = self.paths[pi];
            let lane = (state >> 5) as usize;
            let bit = (cell[lane] >> (state & 31)) & 1;
            state = (state >> 1) | ((bit as u8) << 5);
            pi = self.prev(pi);
        }

        let chunk_bytes = self.config.trace_chunk / 8;
        let mut chunk = vec![0u8; chunk_bytes];
        for j in (0..chunk_bytes).rev() {
            let mut byte = 0u8;
            for i in 0..8 {
                let cell = self.paths[pi];
                let lane = (state >> 5) as usize;
                let bit = (cell[lane] >> (state & 31)) & 1;
                state = (state >> 1) | ((bit as u8) << 5);
                if bit == 1 {
                    byte |= 1 << i;
                }
                pi = self.prev(pi);
            }
            chunk[j] = byte;
        }
        self.output.extend_from_slice(&chunk);
    }
}
