//! Protein structure records: experimental structures and homology models

pub mod parse;

use crate::alignment::AlignmentReport;
use crate::collection::{HasId, IdCollection};
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use parse::{parse_structure, ChainFilterCleaner, ParsedChain, ParsedStructure, StructureCleaner};

/// Outcome of the quality check for one chain of one candidate structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainVerdict {
    pub chain: String,
    pub passed: bool,
    /// Reasons for rejection; empty when the chain passed
    pub reasons: Vec<String>,
}

/// One structure and its provenance.
///
/// `is_experimental` is fixed at creation and partitions a protein's
/// structure collection into experimental structures and homology models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructRecord {
    pub id: String,
    pub is_experimental: bool,
    /// Chains of interest, in the order they were mapped; quality checks
    /// evaluate chains in this order
    pub mapped_chains: Vec<String>,
    pub structure_path: Option<PathBuf>,

    // Header metadata, present for experimental structures
    pub resolution: Option<f64>,
    pub taxonomy_name: Option<String>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,

    /// Identifier of the sequence this structure is meant to represent
    pub reference_seq_id: Option<String>,
    /// Chain the representative was restricted to (set on derived
    /// representatives only)
    pub representative_chain: Option<String>,
    /// Percent of the reference sequence covered by the representative chain
    pub reference_seq_top_coverage: Option<f64>,

    /// Per-chain QC scratch produced during selection; never copied into a
    /// derived representative
    #[serde(default)]
    pub chain_alignments: IndexMap<String, AlignmentReport>,
    #[serde(default)]
    pub chain_verdicts: IndexMap<String, ChainVerdict>,
}

impl HasId for StructRecord {
    fn record_id(&self) -> &str {
        &self.id
    }
}

pub type StructureCollection = IdCollection<StructRecord>;

impl StructureCollection {
    /// Ordered view of the experimental structures
    pub fn experimental(&self) -> Vec<&StructRecord> {
        self.filtered(|s| s.is_experimental)
    }

    /// Ordered view of the homology models
    pub fn homology(&self) -> Vec<&StructRecord> {
        self.filtered(|s| !s.is_experimental)
    }
}

impl StructRecord {
    pub fn new(id: impl Into<String>, is_experimental: bool) -> Self {
        Self {
            id: id.into(),
            is_experimental,
            mapped_chains: Vec::new(),
            structure_path: None,
            resolution: None,
            taxonomy_name: None,
            description: None,
            date: None,
            reference_seq_id: None,
            representative_chain: None,
            reference_seq_top_coverage: None,
            chain_alignments: IndexMap::new(),
            chain_verdicts: IndexMap::new(),
        }
    }

    pub fn with_structure_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.structure_path = Some(path.into());
        self
    }

    pub fn with_mapped_chains<I, S>(mut self, chains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for chain in chains {
            self.add_mapped_chain(chain.into());
        }
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = Some(resolution);
        self
    }

    pub fn with_taxonomy_name(mut self, taxonomy_name: impl Into<String>) -> Self {
        self.taxonomy_name = Some(taxonomy_name.into());
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_reference_seq_id(mut self, id: impl Into<String>) -> Self {
        self.reference_seq_id = Some(id.into());
        self
    }

    /// Add a chain of interest, preserving order and skipping duplicates
    pub fn add_mapped_chain(&mut self, chain: impl Into<String>) {
        let chain = chain.into();
        if !self.mapped_chains.contains(&chain) {
            self.mapped_chains.push(chain);
        }
    }

    pub fn add_mapped_chains<I, S>(&mut self, chains: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for chain in chains {
            self.add_mapped_chain(chain.into());
        }
    }

    pub fn set_structure_file(&mut self, path: impl Into<PathBuf>) {
        self.structure_path = Some(path.into());
    }

    pub fn structure_path(&self) -> Option<&Path> {
        self.structure_path.as_deref()
    }

    /// Build the derived representative record for the winning chain: a fresh
    /// record carrying the whitelisted attribute subset (experimental flag,
    /// coverage, date, description, resolution, taxonomy) plus the cleaned,
    /// chain-restricted structure file. Per-candidate QC scratch is left
    /// behind.
    pub fn derived_representative(
        &self,
        new_id: impl Into<String>,
        keep_chain: &str,
        cleaned_file: PathBuf,
        coverage: f64,
        reference_seq_id: &str,
    ) -> StructRecord {
        let mut rep = StructRecord::new(new_id, self.is_experimental);
        rep.mapped_chains = vec![keep_chain.to_string()];
        rep.representative_chain = Some(keep_chain.to_string());
        rep.structure_path = Some(cleaned_file);
        rep.reference_seq_top_coverage = Some(coverage);
        rep.reference_seq_id = Some(reference_seq_id.to_string());
        rep.resolution = self.resolution;
        rep.taxonomy_name = self.taxonomy_name.clone();
        rep.description = self.description.clone();
        rep.date = self.date;
        rep
    }
}
