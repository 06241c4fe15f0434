//! Local pairwise alignment used to translate between protein coordinate systems.
//!
//! A query (e.g. an isoform fragment) is located inside a longer target (e.g. the
//! sequence observed in a structure chain) with Smith-Waterman, BLOSUM50 scores
//! and a linear gap cost. The resulting [`PositionMap`] converts 1-based query
//! positions into 1-based target positions.
pub mod blosum;

use std::collections::BTreeMap;

/// Linear gap cost used unless another one is configured.
pub const DEFAULT_GAP_COST: i32 = 8;

/// Traceback direction stored next to each score cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pointer {
    Stop,
    Diagonal,
    Up,
    Left,
}

/// The best local alignment between two sequences.
///
/// Offsets refer to the sequences after characters outside the amino-acid
/// alphabet have been stripped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LocalAlignment {
    /// Alignment score, 0 when nothing aligned
    pub score: i32,
    /// 0-based start of the aligned region in the query
    pub query_start: usize,
    /// 0-based exclusive end of the aligned region in the query
    pub query_end: usize,
    /// 0-based start of the aligned region in the target
    pub target_start: usize,
    /// 0-based exclusive end of the aligned region in the target
    pub target_end: usize,
    /// Aligned query residues with `-` for gaps
    pub aligned_query: String,
    /// Aligned target residues with `-` for gaps
    pub aligned_target: String,
}

impl LocalAlignment {
    /// Whether no residues aligned.
    pub fn is_empty(&self) -> bool {
        self.aligned_query.is_empty()
    }

    /// Fraction of aligned columns holding the same residue on both sides.
    pub fn identity(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let same = self
            .aligned_query
            .bytes()
            .zip(self.aligned_target.bytes())
            .filter(|(q, t)| q == t && *q != b'-')
            .count();
        same as f64 / self.aligned_query.len() as f64
    }

    /// Column-by-column mapping of query positions onto target positions.
    pub fn position_map(&self) -> PositionMap {
        let mut map = BTreeMap::new();
        let mut q = self.query_start;
        let mut t = self.target_start;
        for (qc, tc) in self.aligned_query.bytes().zip(self.aligned_target.bytes()) {
            match (qc, tc) {
                (b'-', _) => t += 1,
                (_, b'-') => q += 1,
                _ => {
                    map.insert(q + 1, t + 1);
                    q += 1;
                    t += 1;
                }
            }
        }
        PositionMap { map }
    }
}

/// Maps 1-based query positions to 1-based target positions. Gapped columns have no entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionMap {
    map: BTreeMap<usize, usize>,
}

impl PositionMap {
    /// Target position aligned to `query_pos`, if any.
    pub fn get(&self, query_pos: usize) -> Option<usize> {
        self.map.get(&query_pos).copied()
    }

    /// Number of aligned residue pairs.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether no residue pairs aligned.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Smith-Waterman aligner with BLOSUM50 scores and a linear gap cost.
#[derive(Debug, Clone, Copy)]
pub struct SequenceAligner {
    gap_cost: i32,
}

impl Default for SequenceAligner {
    fn default() -> Self {
        Self::new(DEFAULT_GAP_COST)
    }
}

impl SequenceAligner {
    /// Aligner charging `gap_cost` per gapped column.
    pub fn new(gap_cost: i32) -> Self {
        Self { gap_cost }
    }

    /// The configured linear gap cost.
    pub fn gap_cost(&self) -> i32 {
        self.gap_cost
    }

    /// Compute the highest-scoring local alignment of `query` inside `target`.
    ///
    /// Ties in the recurrence prefer the diagonal, then up, then left; ties for the
    /// best cell keep the first one found in row-major order.
    pub fn align(&self, query: &str, target: &str) -> LocalAlignment {
        let (q_res, q_idx) = strip(query);
        let (t_res, t_idx) = strip(target);
        let n = q_res.len();
        let m = t_res.len();
        if n == 0 || m == 0 {
            return LocalAlignment::default();
        }

        let cols = m + 1;
        let mut scores = vec![0i32; (n + 1) * cols];
        let mut pointers = vec![Pointer::Stop; (n + 1) * cols];
        let at = |i: usize, j: usize| i * cols + j;

        let mut best = (0i32, 0usize, 0usize);
        for i in 1..=n {
            for j in 1..=m {
                let diag = scores[at(i - 1, j - 1)] + blosum::score(q_idx[i - 1], t_idx[j - 1]);
                let up = scores[at(i - 1, j)] - self.gap_cost;
                let left = scores[at(i, j - 1)] - self.gap_cost;

                let mut cell = (0, Pointer::Stop);
                if diag > cell.0 {
                    cell = (diag, Pointer::Diagonal);
                }
                if up > cell.0 {
                    cell = (up, Pointer::Up);
                }
                if left > cell.0 {
                    cell = (left, Pointer::Left);
                }
                scores[at(i, j)] = cell.0;
                pointers[at(i, j)] = cell.1;

                if cell.0 > best.0 {
                    best = (cell.0, i, j);
                }
            }
        }

        let (score, end_i, end_j) = best;
        if score == 0 {
            return LocalAlignment::default();
        }

        let mut aligned_q = Vec::new();
        let mut aligned_t = Vec::new();
        let (mut i, mut j) = (end_i, end_j);
        while scores[at(i, j)] > 0 {
            match pointers[at(i, j)] {
                Pointer::Diagonal => {
                    aligned_q.push(q_res[i - 1]);
                    aligned_t.push(t_res[j - 1]);
                    i -= 1;
                    j -= 1;
                }
                Pointer::Up => {
                    aligned_q.push(q_res[i - 1]);
                    aligned_t.push(b'-');
                    i -= 1;
                }
                Pointer::Left => {
                    aligned_q.push(b'-');
                    aligned_t.push(t_res[j - 1]);
                    j -= 1;
                }
                Pointer::Stop => break,
            }
        }
        aligned_q.reverse();
        aligned_t.reverse();

        LocalAlignment {
            score,
            query_start: i,
            query_end: end_i,
            target_start: j,
            target_end: end_j,
            aligned_query: String::from_utf8_lossy(&aligned_q).into_owned(),
            aligned_target: String::from_utf8_lossy(&aligned_t).into_owned(),
        }
    }
}

/// Keep the residues of the alphabet, upper-cased, along with their matrix rows.
fn strip(seq: &str) -> (Vec<u8>, Vec<usize>) {
    seq.bytes()
        .filter_map(|b| blosum::index_of(b).map(|idx| (b.to_ascii_uppercase(), idx)))
        .unzip()
}

/// 1-based positions of `seq` that take part in an alignment, in order.
///
/// [`PositionMap`] counts only these residues, so entry `k` is the position in
/// `seq` of residue `k + 1` of the map.
pub fn aligned_positions(seq: &str) -> Vec<usize> {
    seq.bytes()
        .enumerate()
        .filter(|(_, b)| blosum::index_of(*b).is_some())
        .map(|(i, _)| i + 1)
        .collect()
}
