//! Representative sequence and structure selection.
//!
//! The selection policy reconciles heterogeneous annotation sources (KEGG vs
//! UniProt) and heterogeneous structural evidence (experimental structures vs
//! homology models): partition candidates, rank or walk them in a fixed
//! order, apply the configured quality cutoffs per chain, and install the
//! first winner as a fresh derived record. No partial representative is ever
//! installed; every failure leaves prior state untouched.

use crate::alignment::{AlignOptions, AlignmentReport, PairwiseAligner};
use crate::download::StructureFetcher;
use crate::error::{ProtrepError, Result};
use crate::sequence::{SeqRecord, SequenceCollection, SequenceOrigin, REPCHAIN_RESNUMS};
use crate::structure::{
    parse_structure, ChainVerdict, ParsedStructure, StructRecord, StructureCleaner,
    StructureCollection,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

/// Quality-control cutoffs for structure selection
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityCutoffs {
    /// Minimum sequence identity between the representative sequence and a
    /// structure chain (fraction of alignment columns)
    pub seq_ident_cutoff: f64,
    /// Maximum fraction of the sequence allowed to be missing from the
    /// structure at the termini
    pub allow_missing_on_termini: f64,
    pub allow_mutants: bool,
    pub allow_deletions: bool,
    pub allow_insertions: bool,
    pub allow_unresolved: bool,
    /// Restrict the search to homology models whenever any exist
    pub always_use_homology: bool,
}

impl Default for QualityCutoffs {
    fn default() -> Self {
        Self {
            seq_ident_cutoff: 0.5,
            allow_missing_on_termini: 0.2,
            allow_mutants: true,
            allow_deletions: false,
            allow_insertions: false,
            allow_unresolved: true,
            always_use_homology: false,
        }
    }
}

impl QualityCutoffs {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| ProtrepError::Configuration(e.to_string()))
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}

/// Collaborators and output locations used during structure selection
pub struct SelectionContext<'a> {
    pub aligner: &'a dyn PairwiseAligner,
    /// Download collaborator for experimental structures without a local
    /// file; candidates that cannot be retrieved are skipped
    pub fetcher: Option<&'a dyn StructureFetcher>,
    pub cleaner: &'a dyn StructureCleaner,
    /// Where fetched and cleaned structure files are written
    pub struct_outdir: PathBuf,
    pub align_options: AlignOptions,
    pub force_rerun: bool,
}

/// Evaluate one chain's alignment against the configured cutoffs
pub fn check_chain(chain: &str, report: &AlignmentReport, cutoffs: &QualityCutoffs) -> ChainVerdict {
    let mut reasons = Vec::new();

    let identity = report.identity();
    if identity < cutoffs.seq_ident_cutoff {
        reasons.push(format!(
            "sequence identity {:.2} below cutoff {:.2}",
            identity, cutoffs.seq_ident_cutoff
        ));
    }

    let missing = report.missing_termini_fraction();
    if missing > cutoffs.allow_missing_on_termini {
        reasons.push(format!(
            "missing termini fraction {:.2} above allowance {:.2}",
            missing, cutoffs.allow_missing_on_termini
        ));
    }

    if !cutoffs.allow_mutants && !report.mutations().is_empty() {
        reasons.push("point substitutions present".to_string());
    }
    if !cutoffs.allow_deletions && !report.deletion_regions().is_empty() {
        reasons.push("deletions present".to_string());
    }
    if !cutoffs.allow_insertions && !report.insertion_regions().is_empty() {
        reasons.push("insertions present".to_string());
    }
    if !cutoffs.allow_unresolved && !report.unresolved_positions().is_empty() {
        reasons.push("unresolved residues present".to_string());
    }

    ChainVerdict {
        chain: chain.to_string(),
        passed: reasons.is_empty(),
        reasons,
    }
}

/// The representative selection algorithm
#[derive(Debug, Clone)]
pub struct RepresentativeSelector {
    cutoffs: QualityCutoffs,
}

impl RepresentativeSelector {
    pub fn new(cutoffs: QualityCutoffs) -> Self {
        Self { cutoffs }
    }

    pub fn cutoffs(&self) -> &QualityCutoffs {
        &self.cutoffs
    }

    /// Pick the representative-sequence candidate from a collection.
    ///
    /// KEGG-only collections yield the first-loaded KEGG candidate (an
    /// ambiguous multi-KEGG mapping is logged, first entry wins). UniProt
    /// candidates are ranked by reviewed status plus structure
    /// cross-reference count, insertion order breaking ties. When both
    /// origins are present, KEGG wins only when it carries structures and
    /// does not duplicate an already-tracked UniProt entry. Manual records
    /// are never picked here; they become representative only when set
    /// explicitly at load time.
    pub fn select_sequence<'a>(
        &self,
        protein_id: &str,
        sequences: &'a SequenceCollection,
    ) -> Result<&'a SeqRecord> {
        if sequences.is_empty() {
            return Err(ProtrepError::NoSequenceAvailable(protein_id.to_string()));
        }

        let kegg_mappings = sequences.of_origin(SequenceOrigin::Kegg);
        let uniprot_mappings = sequences.of_origin(SequenceOrigin::UniProt);

        let kegg_to_use = kegg_mappings.first().copied();
        if kegg_mappings.len() > 1 {
            if let Some(first) = kegg_to_use {
                warn!(
                    "{}: multiple KEGG mappings found, using the first entry {}",
                    protein_id, first.id
                );
            }
        }

        match (kegg_to_use, uniprot_mappings.is_empty()) {
            (Some(kegg), true) => {
                debug!(
                    "{}: representative sequence set from KEGG ID {}",
                    protein_id, kegg.id
                );
                Ok(kegg)
            }
            (None, false) => {
                let best = best_uniprot(&uniprot_mappings);
                debug!(
                    "{}: representative sequence set from UniProt ID {}",
                    protein_id, best.id
                );
                Ok(best)
            }
            (Some(kegg), false) => {
                // Use KEGG if it carries structures and its mapped UniProt
                // entry is not already tracked on its own
                let duplicates_uniprot = kegg
                    .uniprot_id
                    .as_ref()
                    .map(|u| uniprot_mappings.iter().any(|s| &s.id == u))
                    .unwrap_or(false);
                if kegg.num_pdbs() > 0 && !duplicates_uniprot {
                    debug!(
                        "{}: representative sequence set from KEGG ID {}",
                        protein_id, kegg.id
                    );
                    Ok(kegg)
                } else {
                    let best = best_uniprot(&uniprot_mappings);
                    debug!(
                        "{}: representative sequence set from UniProt ID {}",
                        protein_id, best.id
                    );
                    Ok(best)
                }
            }
            (None, true) => Err(ProtrepError::NoSequenceAvailable(protein_id.to_string())),
        }
    }

    /// Pick, clean and install the representative structure.
    ///
    /// Walks candidates of the primary kind in collection order; the first
    /// candidate with a passing chain wins. Returns the fresh derived record
    /// and stores the residue-number mapping on the representative sequence
    /// under [`REPCHAIN_RESNUMS`].
    pub fn select_structure(
        &self,
        protein_id: &str,
        structures: &mut StructureCollection,
        repseq: &mut SeqRecord,
        ctx: &SelectionContext<'_>,
    ) -> Result<StructRecord> {
        if structures.is_empty() {
            return Err(ProtrepError::NoStructureAvailable(protein_id.to_string()));
        }

        let has_experimental = !structures.experimental().is_empty();
        let has_homology = !structures.homology().is_empty();

        let (use_experimental, use_homology) = if self.cutoffs.always_use_homology {
            if has_homology {
                (false, true)
            } else {
                (has_experimental, false)
            }
        } else {
            (has_experimental, has_homology)
        };

        let repseq_residues = repseq.residues()?.ok_or_else(|| {
            ProtrepError::InvalidInput(format!(
                "{}: representative sequence has no residues loaded",
                repseq.id
            ))
        })?;

        if use_experimental {
            debug!("{}: checking quality of experimental structures", protein_id);
            let ids: Vec<String> = structures
                .experimental()
                .iter()
                .map(|s| s.id.clone())
                .collect();
            if let Some(rep) =
                self.scan_candidates(protein_id, &ids, structures, repseq, &repseq_residues, ctx)?
            {
                return Ok(rep);
            }
            debug!("{}: no experimental structures meet cutoffs", protein_id);
        }

        if use_homology {
            debug!("{}: checking quality of homology models", protein_id);
            // Homology models are tried in load order only; there is no
            // ranking among multiple models
            let ids: Vec<String> = structures.homology().iter().map(|s| s.id.clone()).collect();
            if let Some(rep) =
                self.scan_candidates(protein_id, &ids, structures, repseq, &repseq_residues, ctx)?
            {
                return Ok(rep);
            }
        }

        warn!("{}: no representative structure found", protein_id);
        Err(ProtrepError::NoQualifyingStructure(protein_id.to_string()))
    }

    fn scan_candidates(
        &self,
        protein_id: &str,
        ids: &[String],
        structures: &mut StructureCollection,
        repseq: &mut SeqRecord,
        repseq_residues: &str,
        ctx: &SelectionContext<'_>,
    ) -> Result<Option<StructRecord>> {
        for id in ids {
            let candidate = structures.get_mut(id)?;

            if candidate.structure_path.is_none() || ctx.force_rerun {
                if candidate.is_experimental {
                    match ctx.fetcher {
                        Some(fetcher) => match fetcher.fetch(&candidate.id, &ctx.struct_outdir) {
                            Ok(path) => candidate.set_structure_file(path),
                            Err(e) => {
                                error!(
                                    "{}: structure file could not be downloaded: {}",
                                    candidate.id, e
                                );
                                continue;
                            }
                        },
                        None if candidate.structure_path.is_none() => {
                            debug!("{}: no structure file and no fetcher", candidate.id);
                            continue;
                        }
                        None => {}
                    }
                }
            }

            let Some(path) = candidate.structure_path.clone() else {
                debug!("{}: no structure file for {}", protein_id, candidate.id);
                continue;
            };

            let parsed = match parse_structure(&path) {
                Ok(p) => p,
                Err(e) => {
                    error!("{}: unreadable structure file: {}", candidate.id, e);
                    continue;
                }
            };

            // Without an explicit chain mapping, all chains in the file are
            // candidates
            if candidate.mapped_chains.is_empty() {
                candidate.add_mapped_chains(parsed.chain_ids());
            }

            let mut best_chain: Option<String> = None;
            for chain_id in candidate.mapped_chains.clone() {
                let Some(chain) = parsed.chain(&chain_id) else {
                    debug!("{}: chain '{}' not present in file", candidate.id, chain_id);
                    continue;
                };
                if chain.seq.is_empty() {
                    continue;
                }

                let report = ctx.aligner.align(
                    &repseq.id,
                    repseq_residues,
                    &format!("{}-{}", candidate.id, chain_label(&chain_id)),
                    &chain.seq,
                    &ctx.align_options,
                )?;
                let verdict = check_chain(&chain_id, &report, &self.cutoffs);
                let passed = verdict.passed;
                candidate.chain_alignments.insert(chain_id.clone(), report);
                candidate.chain_verdicts.insert(chain_id.clone(), verdict);

                if passed {
                    best_chain = Some(chain_id);
                    break;
                }
            }

            if let Some(chain_id) = best_chain {
                let rep = self.install_representative(
                    candidate,
                    &parsed,
                    &chain_id,
                    repseq,
                    repseq_residues,
                    ctx,
                )?;
                debug!("{}: set as representative structure", rep.id);
                return Ok(Some(rep));
            }
        }
        Ok(None)
    }

    /// Build the derived representative for the winning candidate+chain:
    /// clean the structure file down to the chain, validate the result,
    /// re-run the detailed alignment for the residue-number mapping and copy
    /// the whitelisted attributes
    fn install_representative(
        &self,
        candidate: &StructRecord,
        parsed: &ParsedStructure,
        chain_id: &str,
        repseq: &mut SeqRecord,
        repseq_residues: &str,
        ctx: &SelectionContext<'_>,
    ) -> Result<StructRecord> {
        let suffix = chain_label(chain_id);
        let new_id = format!("{}-{}", candidate.id, suffix);

        let path = candidate.structure_path.clone().ok_or_else(|| {
            ProtrepError::InvalidInput(format!("{}: candidate lost its structure file", candidate.id))
        })?;

        let cleaned = ctx.cleaner.clean(
            &path,
            &[chain_id.to_string()],
            &ctx.struct_outdir,
            &format!("-{}_clean", suffix),
        )?;

        let reparsed = parse_structure(&cleaned)?;
        if reparsed.chain_ids() != vec![chain_id.to_string()] {
            return Err(ProtrepError::Parse(format!(
                "{}: cleaned file does not contain exactly chain '{}'",
                new_id, chain_id
            )));
        }

        let chain = parsed.chain(chain_id).ok_or_else(|| {
            ProtrepError::NotFound(format!("{}: chain '{}'", candidate.id, chain_id))
        })?;
        let detailed = ctx.aligner.align(
            &repseq.id,
            repseq_residues,
            &new_id,
            &chain.seq,
            &ctx.align_options,
        )?;

        let mapping: Vec<Option<i64>> = detailed
            .mapped_b_indices()
            .iter()
            .map(|m| m.map(|i| chain.resnums[i]))
            .collect();
        repseq
            .letter_annotations
            .insert(REPCHAIN_RESNUMS.to_string(), mapping);

        Ok(candidate.derived_representative(
            &new_id,
            chain_id,
            cleaned,
            detailed.coverage(),
            &repseq.id,
        ))
    }
}

/// Chain label used in derived identifiers; blank chain ids fall back to the
/// literal marker `X`
fn chain_label(chain_id: &str) -> String {
    if chain_id.trim().is_empty() {
        "X".to_string()
    } else {
        chain_id.to_string()
    }
}

fn best_uniprot<'a>(candidates: &[&'a SeqRecord]) -> &'a SeqRecord {
    let mut best = candidates[0];
    for candidate in &candidates[1..] {
        if candidate.ranking_score() > best.ranking_score() {
            best = candidate;
        }
    }
    best
}
