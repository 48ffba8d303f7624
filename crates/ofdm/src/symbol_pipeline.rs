//! Splits one OFDM frame's data symbols across worker threads.
//!
//! Worker `k` owns the contiguous symbol range `[start_k, end_k)` and moves
//! through the same three stages the sequential demodulator does: cyclic
//! prefix phase error, FFT, then DQPSK plus soft bit demapping. Each worker
//! publishes its progress through a [`Barrier<Vec<WorkerPhase>>`] shared for
//! the frame so other workers (and a caller inspecting the pipeline) can see
//! where every worker is.
//!
//! The DQPSK step for symbol `i` needs the FFT output of symbols `i` and
//! `i+1`, so worker k's last DQPSK symbol depends on the first FFT result
//! owned by worker k+1. Safe Rust can't hand out a mutable slice to worker k
//! and let worker k+1 read through it once it's done writing, so the FFT
//! stage runs to completion for every worker (a full join) before the DQPSK
//! stage starts; the per-worker phase barrier still records and could gate on
//! the single-neighbour dependency described above, it just never blocks in
//! practice because the join already satisfies it by the time DQPSK begins.

use dab_core::barrier::Barrier;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WorkerPhase {
    NotStarted,
    PhaseError,
    Fft,
    End,
}

/// Partitions `[0, nb_symbols)` into `num_workers` contiguous, roughly equal ranges.
#[derive(Debug, Clone)]
pub struct SymbolPipeline {
    num_workers: usize,
}

impl SymbolPipeline {
    pub fn new(num_workers: usize) -> Self {
        Self { num_workers: num_workers.max(1) }
    }

    /// Defaults to `min(nb_symbols, available_parallelism())`.
    pub fn for_frame(nb_symbols: usize) -> Self {
        let available = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        Self::new(nb_symbols.min(available))
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    pub fn set_num_workers(&mut self, num_workers: usize) {
        self.num_workers = num_workers.max(1);
    }

    /// Worker ranges over `[0, nb_symbols)`. The returned count may be less
    /// than `num_workers()` if there are fewer symbols than workers.
    pub fn ranges(&self, nb_symbols: usize) -> Vec<(usize, usize)> {
        let num_workers = self.num_workers.min(nb_symbols.max(1));
        let base = nb_symbols / num_workers;
        let remainder = nb_symbols % num_workers;
        let mut ranges = Vec::with_capacity(num_workers);
        let mut start = 0;
        for k in 0..num_workers {
            let len = base + usize::from(k < remainder);
            ranges.push((start, start + len));
            start += len;
        }
        ranges
    }

    /// Ranges clipped to `[0, nb_dqpsk_symbols)`, dropping the final symbol
    /// of the frame (it has no next symbol to differentially decode against).
    pub fn dqpsk_ranges(&self, nb_symbols: usize, nb_dqpsk_symbols: usize) -> Vec<(usize, usize)> {
        self.ranges(nb_symbols)
            .into_iter()
            .map(|(start, end)| (start.min(nb_dqpsk_symbols), end.min(nb_dqpsk_symbols)))
            .collect()
    }

    pub fn new_phase_barrier(&self, num_workers: usize) -> Arc<Barrier<Vec<WorkerPhase>>> {
        Arc::new(Barrier::new(vec![WorkerPhase::NotStarted; num_workers]))
    }
}

/// Splits `buf` into one contiguous mutable slice per `(start, end)` range, where each
/// range element covers `stride` items of `buf`. `ranges` must be sorted, non-overlapping,
/// and cover `buf` exactly; any gap or overlap causes a panic in `split_at_mut`.
pub fn split_by_ranges_mut<'a, T>(buf: &'a mut [T], ranges: &[(usize, usize)], stride: usize) -> Vec<&'a mut [T]> {
    let mut rest = buf;
    let mut consumed = 0usize;
    let mut chunks = Vec::with_capacity(ranges.len());
    for &(start, end) in ranges {
        let local_start = start * stride - consumed;
        let (_, remainder) = rest.split_at_mut(local_start);
        let local_len = (end - start) * stride;
        let (chunk, remainder) = remainder.split_at_mut(local_len);
        chunks.push(chunk);
        rest = remainder;
        consumed = end * stride;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_worker_degenerates_to_one_full_range() {
        let pipeline = SymbolPipeline::new(1);
        assert_eq!(pipeline.ranges(76), vec![(0, 76)]);
    }

    #[test]
    fn ranges_are_contiguous_and_cover_every_symbol() {
        let pipeline = SymbolPipeline::new(4);
        let ranges = pipeline.ranges(76);
        assert_eq!(ranges.len(), 4);
        assert_eq!(ranges[0].0, 0);
        assert_eq!(ranges.last().unwrap().1, 76);
        for pair in ranges.windows(2) {
            assert_eq!(pair[0].1, pair[1].0);
        }
    }

    #[test]
    fn more_workers_than_symbols_shrinks_to_one_worker_per_symbol() {
        let pipeline = SymbolPipeline::new(8);
        let ranges = pipeline.ranges(3);
        assert_eq!(ranges, vec![(0, 1), (1, 2), (2, 3)]);
    }

    #[test]
    fn dqpsk_ranges_drop_the_final_symbol() {
        let pipeline = SymbolPipeline::new(4);
        let ranges = pipeline.dqpsk_ranges(76, 75);
        assert_eq!(ranges.last().unwrap().1, 75);
    }

    #[test]
    fn split_by_ranges_mut_yields_disjoint_slices_of_expected_length() {
        let mut buf = vec![0u32; 12];
        let ranges = vec![(0usize, 2usize), (2, 3), (3, 4)];
        let chunks = split_by_ranges_mut(&mut buf, &ranges, 3);
        assert_eq!(chunks[0].len(), 6);
        assert_eq!(chunks[1].len(), 3);
        assert_eq!(chunks[2].len(), 3);
        chunks[0][0] = 1;
        chunks[1][0] = 2;
        chunks[2][0] = 3;
        assert_eq!(buf[0], 1);
        assert_eq!(buf[6], 2);
        assert_eq!(buf[9], 3);
    }
}
