//! Protein modeling core: track the sequences and structures mapped to a
//! protein and select a representative pair from them.
//!
//! A [`Protein`] aggregates sequence records (KEGG, UniProt or manual) and
//! structure records (experimental PDB entries or homology models) in
//! insertion-ordered, unique-by-id collections. A [`RepresentativeSelector`]
//! then picks the representative sequence by a fixed provenance policy and
//! the representative structure by per-chain quality checks against
//! configurable [`QualityCutoffs`], recording residue-level provenance on
//! the representative sequence along the way.

pub mod alignment;
pub mod collection;
pub mod download;
pub mod error;
pub mod protein;
pub mod report;
pub mod select;
pub mod sequence;
pub mod structure;

pub use crate::alignment::{AlignOptions, AlignmentReport, GlobalAligner, PairwiseAligner};
pub use crate::collection::{HasId, IdCollection};
pub use crate::download::{
    KeggClient, RcsbClient, SequenceFetcher, StructureFetcher, UniProtClient,
};
pub use crate::error::{ProtrepError, Result};
pub use crate::protein::{Protein, SequenceLoadOptions};
pub use crate::select::{QualityCutoffs, RepresentativeSelector, SelectionContext};
pub use crate::sequence::{SeqRecord, SequenceCollection, SequenceOrigin, REPCHAIN_RESNUMS};
pub use crate::structure::{
    ChainFilterCleaner, StructRecord, StructureCleaner, StructureCollection,
};
