//! Pairwise alignment collaborator and derived per-position classification.
//!
//! The aligner contract is small: two sequences in, one [`AlignmentReport`]
//! out. Everything the quality checks need (identity, termini gaps, indel
//! and substitution positions, unresolved residues) is derived from the two
//! aligned strings, so any aligner producing them can be plugged in.

use crate::error::{ProtrepError, Result};
use bio::alignment::pairwise::Aligner;
use bio::alignment::AlignmentOperation;
use bio::scores::blosum62;
use serde::{Deserialize, Serialize};

/// Gap penalties for the default global aligner (positive values)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AlignOptions {
    pub gap_open: i32,
    pub gap_extend: i32,
}

impl Default for AlignOptions {
    fn default() -> Self {
        Self {
            gap_open: 10,
            gap_extend: 1,
        }
    }
}

/// Pairwise alignment collaborator.
///
/// `a` is the reference (representative) sequence, `b` the candidate
/// sequence or structure chain.
pub trait PairwiseAligner {
    fn align(
        &self,
        a_id: &str,
        a_seq: &str,
        b_id: &str,
        b_seq: &str,
        opts: &AlignOptions,
    ) -> Result<AlignmentReport>;
}

/// A point substitution between the reference and the aligned sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mutation {
    /// 1-based residue position in the reference sequence
    pub a_pos: usize,
    pub a_res: char,
    pub b_res: char,
}

impl Mutation {
    /// Conventional mutation label, e.g. `A34G`
    pub fn label(&self) -> String {
        format!("{}{}{}", self.a_res, self.a_pos, self.b_res)
    }
}

/// A run of gap columns inside the alignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapRegion {
    /// 1-based reference position of the first affected column
    pub a_start: usize,
    pub length: usize,
}

/// Outcome of one pairwise alignment: the two aligned strings plus enough
/// derived classification to drive quality checks and residue mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentReport {
    pub id: String,
    pub a_id: String,
    pub b_id: String,
    pub a_aligned: String,
    pub b_aligned: String,
    pub score: i32,
}

impl AlignmentReport {
    pub fn new(
        a_id: impl Into<String>,
        b_id: impl Into<String>,
        a_aligned: impl Into<String>,
        b_aligned: impl Into<String>,
        score: i32,
    ) -> Self {
        let a_id = a_id.into();
        let b_id = b_id.into();
        Self {
            id: format!("{}_{}", a_id, b_id),
            a_id,
            b_id,
            a_aligned: a_aligned.into(),
            b_aligned: b_aligned.into(),
            score,
        }
    }

    fn columns(&self) -> impl Iterator<Item = (char, char)> + '_ {
        self.a_aligned.chars().zip(self.b_aligned.chars())
    }

    /// Number of alignment columns
    pub fn len(&self) -> usize {
        self.a_aligned.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.a_aligned.is_empty()
    }

    /// Number of reference residues in the alignment
    pub fn a_len(&self) -> usize {
        self.a_aligned.chars().filter(|&c| c != '-').count()
    }

    /// Fraction of alignment columns that are exact matches
    pub fn identity(&self) -> f64 {
        let matches = self
            .columns()
            .filter(|&(a, b)| a != '-' && a == b)
            .count();
        matches as f64 / self.len().max(1) as f64
    }

    /// Percentage of reference residues aligned to a `b` residue
    pub fn coverage(&self) -> f64 {
        let aligned = self
            .columns()
            .filter(|&(a, b)| a != '-' && b != '-')
            .count();
        100.0 * aligned as f64 / self.a_len().max(1) as f64
    }

    /// Leading and trailing column counts of the terminal gap runs (columns
    /// where either side is a gap, at the very start or end)
    fn terminal_runs(&self) -> (usize, usize) {
        let cols: Vec<(char, char)> = self.columns().collect();
        let leading = cols
            .iter()
            .take_while(|&&(a, b)| a == '-' || b == '-')
            .count();
        let trailing = if leading == cols.len() {
            0
        } else {
            cols.iter()
                .rev()
                .take_while(|&&(a, b)| a == '-' || b == '-')
                .count()
        };
        (leading, trailing)
    }

    /// Fraction of reference residues missing from `b` at the termini
    pub fn missing_termini_fraction(&self) -> f64 {
        let (leading, trailing) = self.terminal_runs();
        let cols: Vec<(char, char)> = self.columns().collect();
        let n = cols.len();
        let missing = cols[..leading]
            .iter()
            .chain(cols[n - trailing..].iter())
            .filter(|&&(a, b)| a != '-' && b == '-')
            .count();
        missing as f64 / self.a_len().max(1) as f64
    }

    /// Point substitutions at aligned columns, in reference order
    pub fn mutations(&self) -> Vec<Mutation> {
        let mut out = Vec::new();
        let mut a_pos = 0;
        for (a, b) in self.columns() {
            if a != '-' {
                a_pos += 1;
                if b != '-' && b != a && b != 'X' {
                    out.push(Mutation {
                        a_pos,
                        a_res: a,
                        b_res: b,
                    });
                }
            }
        }
        out
    }

    /// 1-based reference positions aligned to an unresolved (`X`) residue
    pub fn unresolved_positions(&self) -> Vec<usize> {
        let mut out = Vec::new();
        let mut a_pos = 0;
        for (a, b) in self.columns() {
            if a != '-' {
                a_pos += 1;
                if b == 'X' {
                    out.push(a_pos);
                }
            }
        }
        out
    }

    /// Internal runs where `b` has gaps (reference residues absent from `b`),
    /// terminal runs excluded
    pub fn deletion_regions(&self) -> Vec<GapRegion> {
        self.internal_gap_regions(|a, b| a != '-' && b == '-')
    }

    /// Internal runs where the reference has gaps (`b` carries extra
    /// residues), terminal runs excluded
    pub fn insertion_regions(&self) -> Vec<GapRegion> {
        self.internal_gap_regions(|a, b| a == '-' && b != '-')
    }

    fn internal_gap_regions<P>(&self, is_gap: P) -> Vec<GapRegion>
    where
        P: Fn(char, char) -> bool,
    {
        let cols: Vec<(char, char)> = self.columns().collect();
        let (leading, trailing) = self.terminal_runs();
        let end = cols.len() - trailing;

        let mut regions = Vec::new();
        let mut a_pos = cols[..leading].iter().filter(|&&(a, _)| a != '-').count();
        let mut current: Option<GapRegion> = None;

        for &(a, b) in &cols[leading..end] {
            if a != '-' {
                a_pos += 1;
            }
            if is_gap(a, b) {
                match current.as_mut() {
                    Some(region) => region.length += 1,
                    None => {
                        current = Some(GapRegion {
                            a_start: a_pos.max(1),
                            length: 1,
                        })
                    }
                }
            } else if let Some(region) = current.take() {
                regions.push(region);
            }
        }
        if let Some(region) = current {
            regions.push(region);
        }
        regions
    }

    /// For each reference residue (0-based), the 0-based index of the `b`
    /// residue it is aligned to, or `None` at gap columns
    pub fn mapped_b_indices(&self) -> Vec<Option<usize>> {
        let mut out = Vec::with_capacity(self.a_len());
        let mut b_idx = 0;
        for (a, b) in self.columns() {
            let mapped = if b != '-' {
                let idx = b_idx;
                b_idx += 1;
                Some(idx)
            } else {
                None
            };
            if a != '-' {
                out.push(mapped);
            }
        }
        out
    }
}

/// Default aligner: global protein alignment with BLOSUM62 scoring
#[derive(Debug, Clone, Default)]
pub struct GlobalAligner;

impl GlobalAligner {
    pub fn new() -> Self {
        Self
    }
}

const BLOSUM_ALPHABET: &[u8] = b"ARNDCQEGHILKMFPSTWYVBZX";

fn sanitize(seq: &str) -> Vec<u8> {
    seq.bytes()
        .map(|c| {
            let up = c.to_ascii_uppercase();
            if BLOSUM_ALPHABET.contains(&up) {
                up
            } else {
                b'X'
            }
        })
        .collect()
}

impl PairwiseAligner for GlobalAligner {
    fn align(
        &self,
        a_id: &str,
        a_seq: &str,
        b_id: &str,
        b_seq: &str,
        opts: &AlignOptions,
    ) -> Result<AlignmentReport> {
        if a_seq.is_empty() || b_seq.is_empty() {
            return Err(ProtrepError::Alignment(format!(
                "{}_{}: cannot align empty sequences",
                a_id, b_id
            )));
        }

        let a = sanitize(a_seq);
        let b = sanitize(b_seq);

        let mut aligner = Aligner::with_capacity(
            a.len(),
            b.len(),
            -opts.gap_open,
            -opts.gap_extend,
            &blosum62,
        );
        let alignment = aligner.global(&a, &b);

        let mut a_aligned = String::with_capacity(alignment.operations.len());
        let mut b_aligned = String::with_capacity(alignment.operations.len());
        let (mut ai, mut bi) = (0usize, 0usize);

        for op in &alignment.operations {
            match op {
                AlignmentOperation::Match | AlignmentOperation::Subst => {
                    a_aligned.push(a[ai] as char);
                    b_aligned.push(b[bi] as char);
                    ai += 1;
                    bi += 1;
                }
                // Ins: residue in `a` without a partner in `b`
                AlignmentOperation::Ins => {
                    a_aligned.push(a[ai] as char);
                    b_aligned.push('-');
                    ai += 1;
                }
                // Del: residue in `b` without a partner in `a`
                AlignmentOperation::Del => {
                    a_aligned.push('-');
                    b_aligned.push(b[bi] as char);
                    bi += 1;
                }
                AlignmentOperation::Xclip(n) => {
                    for _ in 0..*n {
                        a_aligned.push(a[ai] as char);
                        b_aligned.push('-');
                        ai += 1;
                    }
                }
                AlignmentOperation::Yclip(n) => {
                    for _ in 0..*n {
                        a_aligned.push('-');
                        b_aligned.push(b[bi] as char);
                        bi += 1;
                    }
                }
            }
        }

        Ok(AlignmentReport::new(
            a_id,
            b_id,
            a_aligned,
            b_aligned,
            alignment.score,
        ))
    }
}
