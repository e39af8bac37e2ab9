//! Protein sequence records with provenance and annotations

pub mod fasta;

use crate::alignment::AlignmentReport;
use crate::collection::{HasId, IdCollection};
use crate::error::{ProtrepError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Per-residue annotation key holding the representative-chain residue
/// numbers mapped to each position of the representative sequence
pub const REPCHAIN_RESNUMS: &str = "repchain_resnums";

/// Database a sequence record was loaded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SequenceOrigin {
    Kegg,
    UniProt,
    Manual,
}

impl std::fmt::Display for SequenceOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Kegg => write!(f, "KEGG"),
            Self::UniProt => write!(f, "UniProt"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// Backing source of truth for the residues of a sequence.
///
/// A record is either in-memory or file-backed, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SeqSource {
    InMemory(String),
    File(PathBuf),
}

/// One protein sequence and its provenance.
///
/// A plain data record: identifier, origin tag, residue payload (in memory or
/// behind a FASTA file), database cross references and two annotation
/// channels (sequence-level and per-residue).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeqRecord {
    pub id: String,
    pub origin: SequenceOrigin,
    source: Option<SeqSource>,
    pub description: Option<String>,

    // Cross references
    pub kegg_id: Option<String>,
    pub uniprot_id: Option<String>,
    pub gene_name: Option<String>,
    pub pdb_ids: Vec<String>,
    pub ec_numbers: Vec<String>,
    /// UniProt reviewed (Swiss-Prot) status
    pub reviewed: bool,

    pub metadata_path: Option<PathBuf>,

    /// Sequence-level annotations (e.g. transmembrane-helix counts)
    pub annotations: IndexMap<String, serde_json::Value>,
    /// Per-residue annotation channels, one entry per residue position
    pub letter_annotations: IndexMap<String, Vec<Option<i64>>>,

    /// Pairwise alignments of other loaded sequences against this record.
    /// Only populated on a representative sequence.
    #[serde(default)]
    pub alignments: Vec<AlignmentReport>,
}

impl HasId for SeqRecord {
    fn record_id(&self) -> &str {
        &self.id
    }
}

pub type SequenceCollection = IdCollection<SeqRecord>;

impl SequenceCollection {
    /// Ordered view of the records with the given origin tag
    pub fn of_origin(&self, origin: SequenceOrigin) -> Vec<&SeqRecord> {
        self.filtered(|s| s.origin == origin)
    }
}

impl SeqRecord {
    pub fn new(id: impl Into<String>, origin: SequenceOrigin) -> Self {
        Self {
            id: id.into(),
            origin,
            source: None,
            description: None,
            kegg_id: None,
            uniprot_id: None,
            gene_name: None,
            pdb_ids: Vec::new(),
            ec_numbers: Vec::new(),
            reviewed: false,
            metadata_path: None,
            annotations: IndexMap::new(),
            letter_annotations: IndexMap::new(),
            alignments: Vec::new(),
        }
    }

    pub fn with_sequence(mut self, residues: impl Into<String>) -> Self {
        self.source = Some(SeqSource::InMemory(residues.into()));
        self
    }

    pub fn with_sequence_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(SeqSource::File(path.into()));
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_uniprot_id(mut self, uniprot_id: impl Into<String>) -> Self {
        self.uniprot_id = Some(uniprot_id.into());
        self
    }

    pub fn with_kegg_id(mut self, kegg_id: impl Into<String>) -> Self {
        self.kegg_id = Some(kegg_id.into());
        self
    }

    pub fn with_gene_name(mut self, gene_name: impl Into<String>) -> Self {
        self.gene_name = Some(gene_name.into());
        self
    }

    pub fn with_pdb_ids<I, S>(mut self, pdb_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pdb_ids = pdb_ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_reviewed(mut self, reviewed: bool) -> Self {
        self.reviewed = reviewed;
        self
    }

    pub fn source(&self) -> Option<&SeqSource> {
        self.source.as_ref()
    }

    pub fn sequence_path(&self) -> Option<&Path> {
        match &self.source {
            Some(SeqSource::File(p)) => Some(p),
            _ => None,
        }
    }

    /// Replace the residue payload with an in-memory value.
    ///
    /// Fails when a sequence file is already associated with this record,
    /// since the file remains the single source of truth.
    pub fn set_sequence(&mut self, residues: impl Into<String>) -> Result<()> {
        if matches!(self.source, Some(SeqSource::File(_))) {
            return Err(ProtrepError::InvalidInput(format!(
                "{}: unable to set sequence, a sequence file is associated with this record",
                self.id
            )));
        }
        self.source = Some(SeqSource::InMemory(residues.into()));
        Ok(())
    }

    /// Residues of this record, reading the backing FASTA file when
    /// file-backed. Returns `None` when no sequence has been loaded yet.
    pub fn residues(&self) -> Result<Option<String>> {
        match &self.source {
            None => Ok(None),
            Some(SeqSource::InMemory(s)) => Ok(Some(s.clone())),
            Some(SeqSource::File(path)) => {
                let record = fasta::read_first_record(path)?;
                Ok(Some(record.residues))
            }
        }
    }

    pub fn seq_len(&self) -> Result<usize> {
        Ok(self.residues()?.map(|s| s.len()).unwrap_or(0))
    }

    pub fn num_pdbs(&self) -> usize {
        self.pdb_ids.len()
    }

    /// Score used to rank UniProt candidates: reviewed status plus the number
    /// of cross-referenced structures, so entries with structures rank first
    /// and reviewed entries break the remainder
    pub fn ranking_score(&self) -> usize {
        usize::from(self.reviewed) + self.num_pdbs()
    }

    /// Test if this record's residues equal another record's residues.
    /// Records without a loaded sequence never compare equal.
    pub fn equal_to(&self, other: &SeqRecord) -> Result<bool> {
        match (self.residues()?, other.residues()?) {
            (Some(a), Some(b)) => Ok(a == b),
            _ => Ok(false),
        }
    }

    /// Write the in-memory residues to a FASTA file; the record becomes
    /// file-backed afterwards
    pub fn write_fasta_file(&mut self, outfile: impl Into<PathBuf>, force_rerun: bool) -> Result<()> {
        let outfile = outfile.into();
        let residues = self.residues()?.ok_or_else(|| {
            ProtrepError::InvalidInput(format!("{}: no sequence available to write", self.id))
        })?;
        if force_rerun || !outfile.exists() {
            fasta::write_record(&outfile, &self.id, self.description.as_deref(), &residues)?;
        }
        self.source = Some(SeqSource::File(outfile));
        Ok(())
    }

    /// Merge metadata from another record. Existing non-empty fields are kept
    /// unless `overwrite` is set; the residue payload is never touched.
    pub fn merge_from(&mut self, other: &SeqRecord, overwrite: bool) {
        fn fill<T: Clone>(dst: &mut Option<T>, src: &Option<T>, overwrite: bool) {
            if src.is_some() && (overwrite || dst.is_none()) {
                *dst = src.clone();
            }
        }

        fill(&mut self.kegg_id, &other.kegg_id, overwrite);
        fill(&mut self.uniprot_id, &other.uniprot_id, overwrite);
        fill(&mut self.gene_name, &other.gene_name, overwrite);
        fill(&mut self.description, &other.description, overwrite);
        fill(&mut self.metadata_path, &other.metadata_path, overwrite);

        if !other.pdb_ids.is_empty() && (overwrite || self.pdb_ids.is_empty()) {
            self.pdb_ids = other.pdb_ids.clone();
        }
        if !other.ec_numbers.is_empty() && (overwrite || self.ec_numbers.is_empty()) {
            self.ec_numbers = other.ec_numbers.clone();
        }
        if overwrite {
            self.reviewed = other.reviewed;
        }
        for (key, value) in &other.annotations {
            if overwrite || !self.annotations.contains_key(key) {
                self.annotations.insert(key.clone(), value.clone());
            }
        }
    }

    /// Build the derived representative record: a fresh record carrying only
    /// the whitelisted attribute subset of this candidate (origin, cross
    /// references, file pointers). Scratch state such as per-candidate
    /// annotations and stored alignments is not copied.
    pub fn derived_representative(&self) -> SeqRecord {
        let mut rep = SeqRecord::new(self.id.clone(), self.origin);
        rep.source = self.source.clone();
        rep.kegg_id = self.kegg_id.clone();
        rep.uniprot_id = self.uniprot_id.clone();
        rep.gene_name = self.gene_name.clone();
        rep.pdb_ids = self.pdb_ids.clone();
        rep.metadata_path = self.metadata_path.clone();
        rep
    }

    /// Summary of point substitutions observed across the stored alignments.
    ///
    /// Returns two ordered maps: mutation label (e.g. `A34G`) to the ids of
    /// the sequences carrying it, and per-sequence mutation fingerprint
    /// (labels joined by `-`) to the ids sharing that exact set.
    pub fn sequence_mutation_summary(
        &self,
    ) -> (IndexMap<String, Vec<String>>, IndexMap<String, Vec<String>>) {
        let mut single: IndexMap<String, Vec<String>> = IndexMap::new();
        let mut fingerprint: IndexMap<String, Vec<String>> = IndexMap::new();

        for aln in &self.alignments {
            let mutations = aln.mutations();
            if mutations.is_empty() {
                continue;
            }
            let mut labels = Vec::with_capacity(mutations.len());
            for m in &mutations {
                let label = m.label();
                single
                    .entry(label.clone())
                    .or_default()
                    .push(aln.b_id.clone());
                labels.push(label);
            }
            fingerprint
                .entry(labels.join("-"))
                .or_default()
                .push(aln.b_id.clone());
        }

        (single, fingerprint)
    }
}
