//! The protein aggregate: one protein, its mapped sequences and structures,
//! and the representative pair chosen from them.
//!
//! Loading is idempotent by identifier. Re-loading an already-tracked record
//! is a no-op unless `force_rerun` is set, in which case the old entry is
//! replaced in place (order preserved for the remaining entries, the
//! replacement appended last).

use crate::alignment::{AlignOptions, PairwiseAligner};
use crate::download::SequenceFetcher;
use crate::error::{ProtrepError, Result};
use crate::select::{RepresentativeSelector, SelectionContext};
use crate::sequence::{SeqRecord, SequenceCollection, SequenceOrigin};
use crate::structure::{StructRecord, StructureCollection};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, error, warn};

/// How often a mutation must appear across the loaded sequences to be listed
/// in the summary
const FREQUENT_MUTATION_FRACTION: f64 = 0.01;

/// Options for loading a sequence record from a remote database
#[derive(Default)]
pub struct SequenceLoadOptions<'a> {
    /// Pre-downloaded FASTA file to use instead of fetching
    pub seq_file: Option<PathBuf>,
    /// Pre-downloaded metadata file to associate with the record
    pub metadata_file: Option<PathBuf>,
    /// Install the loaded record as the representative sequence
    pub set_as_representative: bool,
    /// Download collaborator; without one and without `seq_file` the record
    /// is tracked by id only
    pub fetcher: Option<&'a dyn SequenceFetcher>,
    /// Where fetched sequence files are written; required when fetching
    pub outdir: Option<PathBuf>,
    pub force_rerun: bool,
}

/// One protein: identifier, mapped sequences, mapped structures and the
/// representative pair selected from them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Protein {
    pub id: String,
    pub description: Option<String>,
    pub sequences: SequenceCollection,
    pub structures: StructureCollection,
    pub representative_sequence: Option<SeqRecord>,
    pub representative_structure: Option<StructRecord>,
}

impl Protein {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: None,
            sequences: SequenceCollection::new(),
            structures: StructureCollection::new(),
            representative_sequence: None,
            representative_structure: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn num_sequences(&self) -> usize {
        self.sequences.len()
    }

    pub fn num_structures(&self) -> usize {
        self.structures.len()
    }

    pub fn num_structures_experimental(&self) -> usize {
        self.structures.experimental().len()
    }

    pub fn num_structures_homology(&self) -> usize {
        self.structures.homology().len()
    }

    /// Load a KEGG gene as a sequence record. The stored identifier is
    /// `{organism_code}:{gene_id}` when an organism code is given.
    pub fn load_kegg(
        &mut self,
        kegg_id: &str,
        organism_code: Option<&str>,
        opts: &SequenceLoadOptions<'_>,
    ) -> Result<&SeqRecord> {
        let full_id = match organism_code {
            Some(code) => format!("{}:{}", code, kegg_id),
            None => kegg_id.to_string(),
        };

        if self.sequences.has_id(&full_id) && opts.force_rerun {
            self.sequences.remove(&full_id);
        }

        if !self.sequences.has_id(&full_id) {
            let mut record =
                SeqRecord::new(full_id.clone(), SequenceOrigin::Kegg).with_kegg_id(full_id.clone());
            record.metadata_path = opts.metadata_file.clone();

            if let Some(seq_file) = &opts.seq_file {
                record = record.with_sequence_file(seq_file);
            } else if let (Some(fetcher), Some(outdir)) = (opts.fetcher, &opts.outdir) {
                let path = fetcher.fetch(&full_id, outdir)?;
                record = record.with_sequence_file(path);
            }

            // A KEGG sequence matching the current representative enriches it
            // with KEGG metadata, but only while the representative has no
            // UniProt mapping of its own
            if let Some(rep) = self.representative_sequence.as_mut() {
                if rep.uniprot_id.is_none() {
                    if record.equal_to(rep)? {
                        rep.merge_from(&record, false);
                    } else if record.residues()?.is_some() {
                        warn!(
                            "{}: representative sequence does not match mapped KEGG sequence {}",
                            self.id, full_id
                        );
                    }
                }
            }

            self.sequences.append(record)?;
        } else {
            debug!("{}: KEGG sequence already loaded", full_id);
        }

        if opts.set_as_representative {
            let rep = self.sequences.get_by_id(&full_id)?.derived_representative();
            self.representative_sequence = Some(rep);
        }
        self.sequences.get_by_id(&full_id)
    }

    /// Load a UniProt entry as a sequence record
    pub fn load_uniprot(
        &mut self,
        uniprot_id: &str,
        opts: &SequenceLoadOptions<'_>,
    ) -> Result<&SeqRecord> {
        if self.sequences.has_id(uniprot_id) && opts.force_rerun {
            self.sequences.remove(uniprot_id);
        }

        if !self.sequences.has_id(uniprot_id) {
            let mut record = SeqRecord::new(uniprot_id, SequenceOrigin::UniProt)
                .with_uniprot_id(uniprot_id);
            record.metadata_path = opts.metadata_file.clone();

            if let Some(seq_file) = &opts.seq_file {
                record = record.with_sequence_file(seq_file);
            } else if let (Some(fetcher), Some(outdir)) = (opts.fetcher, &opts.outdir) {
                let path = fetcher.fetch(uniprot_id, outdir)?;
                record = record.with_sequence_file(path);
            }

            if let Some(rep) = self.representative_sequence.as_mut() {
                if record.equal_to(rep)? {
                    rep.merge_from(&record, false);
                } else if record.residues()?.is_some() {
                    warn!(
                        "{}: representative sequence does not match mapped UniProt sequence {}",
                        self.id, uniprot_id
                    );
                }
            }

            self.sequences.append(record)?;
        } else {
            debug!("{}: UniProt sequence already loaded", uniprot_id);
        }

        if opts.set_as_representative {
            let rep = self
                .sequences
                .get_by_id(uniprot_id)?
                .derived_representative();
            self.representative_sequence = Some(rep);
        }
        self.sequences.get_by_id(uniprot_id)
    }

    /// Load a manually provided sequence string
    pub fn load_manual_sequence(
        &mut self,
        id: &str,
        residues: &str,
        set_as_representative: bool,
        force_rerun: bool,
    ) -> Result<&SeqRecord> {
        if self.sequences.has_id(id) && force_rerun {
            self.sequences.remove(id);
        }
        if !self.sequences.has_id(id) {
            let record = SeqRecord::new(id, SequenceOrigin::Manual).with_sequence(residues);
            self.sequences.append(record)?;
        } else {
            debug!("{}: manual sequence already loaded", id);
        }

        if set_as_representative {
            let rep = self.sequences.get_by_id(id)?.derived_representative();
            self.representative_sequence = Some(rep);
        }
        self.sequences.get_by_id(id)
    }

    /// Load a manually provided FASTA file; the record id is the FASTA
    /// header id
    pub fn load_manual_sequence_file(
        &mut self,
        seq_file: impl Into<PathBuf>,
        set_as_representative: bool,
        force_rerun: bool,
    ) -> Result<&SeqRecord> {
        let seq_file = seq_file.into();
        let parsed = crate::sequence::fasta::read_first_record(&seq_file)?;
        let id = parsed.id;

        if self.sequences.has_id(&id) && force_rerun {
            self.sequences.remove(&id);
        }
        if !self.sequences.has_id(&id) {
            let mut record =
                SeqRecord::new(id.clone(), SequenceOrigin::Manual).with_sequence_file(seq_file);
            record.description = parsed.description;
            self.sequences.append(record)?;
        } else {
            debug!("{}: manual sequence already loaded", id);
        }

        if set_as_representative {
            let rep = self.sequences.get_by_id(&id)?.derived_representative();
            self.representative_sequence = Some(rep);
        }
        self.sequences.get_by_id(&id)
    }

    /// Track an experimental PDB structure. The stored identifier is the
    /// lowercased PDB id; repeated loads add any new mapped chains to the
    /// existing record.
    pub fn load_pdb(
        &mut self,
        pdb_id: &str,
        mapped_chains: &[&str],
        pdb_file: Option<PathBuf>,
        force_rerun: bool,
    ) -> Result<&StructRecord> {
        let pdb_id = pdb_id.to_lowercase();

        if self.structures.has_id(&pdb_id) && force_rerun {
            self.structures.remove(&pdb_id);
        }

        if self.structures.has_id(&pdb_id) {
            debug!("{}: PDB structure already loaded", pdb_id);
            let existing = self.structures.get_mut(&pdb_id)?;
            existing.add_mapped_chains(mapped_chains.iter().copied());
            if let Some(file) = pdb_file {
                existing.set_structure_file(file);
            }
        } else {
            let mut record = StructRecord::new(pdb_id.clone(), true)
                .with_mapped_chains(mapped_chains.iter().copied());
            if let Some(file) = pdb_file {
                record = record.with_structure_file(file);
            }
            if let Some(rep) = &self.representative_sequence {
                record = record.with_reference_seq_id(rep.id.clone());
            }
            self.structures.append(record)?;
        }
        self.structures.get_by_id(&pdb_id)
    }

    /// Track a homology model
    pub fn load_homology_model(
        &mut self,
        id: &str,
        structure_file: Option<PathBuf>,
        force_rerun: bool,
    ) -> Result<&StructRecord> {
        if self.structures.has_id(id) && force_rerun {
            self.structures.remove(id);
        }

        if self.structures.has_id(id) {
            debug!("{}: homology model already loaded", id);
            if let Some(file) = structure_file {
                self.structures.get_mut(id)?.set_structure_file(file);
            }
        } else {
            let mut record = StructRecord::new(id, false);
            if let Some(file) = structure_file {
                record = record.with_structure_file(file);
            }
            if let Some(rep) = &self.representative_sequence {
                record = record.with_reference_seq_id(rep.id.clone());
            }
            self.structures.append(record)?;
        }
        self.structures.get_by_id(id)
    }

    /// Choose and install the representative sequence from the loaded
    /// mappings. A no-op when already set, unless `force_rerun`.
    pub fn set_representative_sequence(&mut self, force_rerun: bool) -> Result<&SeqRecord> {
        if self.representative_sequence.is_some() && !force_rerun {
            debug!("{}: representative sequence already set", self.id);
        } else {
            let selector = RepresentativeSelector::new(Default::default());
            let winner = selector.select_sequence(&self.id, &self.sequences)?;
            self.representative_sequence = Some(winner.derived_representative());
        }
        self.representative_sequence
            .as_ref()
            .ok_or_else(|| ProtrepError::NoSequenceAvailable(self.id.clone()))
    }

    /// Choose, clean and install the representative structure. Requires a
    /// representative sequence; a no-op when already set, unless the context
    /// carries `force_rerun`.
    pub fn set_representative_structure(
        &mut self,
        selector: &RepresentativeSelector,
        ctx: &SelectionContext<'_>,
    ) -> Result<&StructRecord> {
        if self.representative_structure.is_some() && !ctx.force_rerun {
            debug!("{}: representative structure already set", self.id);
        } else {
            let protein_id = self.id.clone();
            let repseq = self
                .representative_sequence
                .as_mut()
                .ok_or(ProtrepError::NoRepresentativeSequence(protein_id.clone()))?;
            let rep = selector.select_structure(&protein_id, &mut self.structures, repseq, ctx)?;
            self.representative_structure = Some(rep);
        }
        self.representative_structure
            .as_ref()
            .ok_or_else(|| ProtrepError::NoQualifyingStructure(self.id.clone()))
    }

    /// Align every other loaded sequence against the representative sequence
    /// and store the reports on the representative. Sequences without loaded
    /// residues are skipped with a logged error; already-stored alignments
    /// are not recomputed.
    pub fn align_sequences_to_representative(
        &mut self,
        aligner: &dyn PairwiseAligner,
        opts: &AlignOptions,
    ) -> Result<()> {
        let rep = self
            .representative_sequence
            .as_mut()
            .ok_or_else(|| ProtrepError::NoRepresentativeSequence(self.id.clone()))?;
        let rep_residues = rep.residues()?.ok_or_else(|| {
            ProtrepError::InvalidInput(format!(
                "{}: representative sequence has no residues loaded",
                rep.id
            ))
        })?;

        for seq in self.sequences.iter() {
            if seq.id == rep.id {
                continue;
            }
            let report_id = format!("{}_{}", rep.id, seq.id);
            if rep.alignments.iter().any(|a| a.id == report_id) {
                debug!("{}: alignment already stored", report_id);
                continue;
            }
            let residues = match seq.residues()? {
                Some(r) => r,
                None => {
                    error!("{}: no sequence stored, skipping alignment", seq.id);
                    continue;
                }
            };
            let report = aligner.align(&rep.id, &rep_residues, &seq.id, &residues, opts)?;
            rep.alignments.push(report);
        }
        Ok(())
    }

    /// Flat ordered summary of the protein's state for reporting.
    ///
    /// Fails with [`ProtrepError::IncompleteState`] until a representative
    /// sequence has been set. Mutation frequencies are computed against the
    /// number of non-representative sequences; with fewer than two loaded
    /// sequences the mutation rows are empty.
    pub fn summarize(&self) -> Result<IndexMap<String, String>> {
        let repseq = self.representative_sequence.as_ref().ok_or_else(|| {
            ProtrepError::IncompleteState(format!(
                "{}: no representative sequence set",
                self.id
            ))
        })?;

        let mut summary = IndexMap::new();
        summary.insert("Protein ID".to_string(), self.id.clone());
        if let Some(description) = &self.description {
            summary.insert("Description".to_string(), description.clone());
        }
        summary.insert(
            "Number of sequences".to_string(),
            self.num_sequences().to_string(),
        );
        summary.insert(
            "Number of structures (total)".to_string(),
            self.num_structures().to_string(),
        );
        summary.insert(
            "Number of structures (experimental)".to_string(),
            self.num_structures_experimental().to_string(),
        );
        summary.insert(
            "Number of structures (homology models)".to_string(),
            self.num_structures_homology().to_string(),
        );

        summary.insert("Representative sequence".to_string(), repseq.id.clone());
        summary.insert(
            "Sequence length".to_string(),
            repseq.seq_len()?.to_string(),
        );

        if let Some(repstruct) = &self.representative_structure {
            summary.insert("Representative structure".to_string(), repstruct.id.clone());
            summary.insert(
                "Structure is experimental".to_string(),
                repstruct.is_experimental.to_string(),
            );
            if let Some(coverage) = repstruct.reference_seq_top_coverage {
                summary.insert(
                    "Structure coverage of sequence".to_string(),
                    format!("{:.1}%", coverage),
                );
            }
        }

        let (frequent, frequent_groups) = self.frequent_mutations(repseq);
        summary.insert("Frequent mutations".to_string(), frequent.join("; "));
        summary.insert(
            "Frequent mutation groups".to_string(),
            frequent_groups.join("; "),
        );

        Ok(summary)
    }

    /// Mutations and mutation fingerprints observed in at least
    /// [`FREQUENT_MUTATION_FRACTION`] of the aligned sequences. With fewer
    /// than two loaded sequences there is nothing to compare against and
    /// both lists are empty.
    fn frequent_mutations(&self, repseq: &SeqRecord) -> (Vec<String>, Vec<String>) {
        let num_others = self.num_sequences().saturating_sub(1);
        if num_others == 0 {
            return (Vec::new(), Vec::new());
        }

        let (single, fingerprint) = repseq.sequence_mutation_summary();
        let cutoff = FREQUENT_MUTATION_FRACTION;

        let frequent = single
            .iter()
            .filter(|(_, carriers)| carriers.len() as f64 / num_others as f64 >= cutoff)
            .map(|(label, _)| label.clone())
            .collect();
        let frequent_groups = fingerprint
            .iter()
            .filter(|(_, carriers)| carriers.len() as f64 / num_others as f64 >= cutoff)
            .map(|(labels, _)| labels.clone())
            .collect();
        (frequent, frequent_groups)
    }
}
