//! End-to-end tests of representative selection over a full Protein

use pretty_assertions::assert_eq;
use protrep::{
    AlignOptions, ChainFilterCleaner, GlobalAligner, ProtrepError, Protein, QualityCutoffs,
    RepresentativeSelector, SelectionContext, SeqRecord, SequenceOrigin, StructureFetcher,
    REPCHAIN_RESNUMS,
};
use std::path::{Path, PathBuf};
use tempfile::tempdir;

const REF_SEQ: &str = "MKTAYIAKQR";

fn one_to_three(res: char) -> &'static str {
    match res {
        'A' => "ALA",
        'I' => "ILE",
        'K' => "LYS",
        'M' => "MET",
        'Q' => "GLN",
        'R' => "ARG",
        'T' => "THR",
        'Y' => "TYR",
        _ => panic!("residue {} not used in fixtures", res),
    }
}

/// Build a single-chain PDB-format fixture for a sequence, one CA atom per
/// residue, numbered from `start_resnum`
fn pdb_for(seq: &str, chain: char, start_resnum: i64) -> String {
    let mut out = String::from("HEADER    TEST STRUCTURE\n");
    for (i, res) in seq.chars().enumerate() {
        out.push_str(&format!(
            "ATOM  {:>5}  CA  {} {}{:>4}    {:8.3}{:8.3}{:8.3}  1.00  0.00           C\n",
            i + 1,
            one_to_three(res),
            chain,
            start_resnum + i as i64,
            i as f64,
            0.0,
            0.0,
        ));
    }
    out.push_str("END\n");
    out
}

fn write_pdb(dir: &Path, name: &str, seq: &str, chain: char, start_resnum: i64) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, pdb_for(seq, chain, start_resnum)).unwrap();
    path
}

fn context<'a>(
    aligner: &'a GlobalAligner,
    cleaner: &'a ChainFilterCleaner,
    outdir: &Path,
) -> SelectionContext<'a> {
    SelectionContext {
        aligner,
        fetcher: None,
        cleaner,
        struct_outdir: outdir.to_path_buf(),
        align_options: AlignOptions::default(),
        force_rerun: false,
    }
}

struct FailingFetcher;

impl StructureFetcher for FailingFetcher {
    fn fetch(&self, id: &str, _dest_dir: &Path) -> protrep::Result<PathBuf> {
        Err(ProtrepError::Retrieval(format!(
            "{}: connection refused",
            id
        )))
    }
}

#[test]
fn kegg_only_collection_picks_first_loaded() {
    let mut protein = Protein::new("b0001");
    protein
        .sequences
        .append(SeqRecord::new("eco:b0001", SequenceOrigin::Kegg).with_sequence(REF_SEQ))
        .unwrap();
    protein
        .sequences
        .append(SeqRecord::new("ecj:JW0001", SequenceOrigin::Kegg).with_sequence(REF_SEQ))
        .unwrap();

    let rep = protein.set_representative_sequence(false).unwrap();
    assert_eq!(rep.id, "eco:b0001");
}

#[test]
fn uniprot_ranking_prefers_structures_over_reviewed() {
    let mut protein = Protein::new("b0001");
    protein
        .sequences
        .append(
            SeqRecord::new("P00001", SequenceOrigin::UniProt)
                .with_sequence(REF_SEQ)
                .with_reviewed(true),
        )
        .unwrap();
    protein
        .sequences
        .append(
            SeqRecord::new("P00002", SequenceOrigin::UniProt)
                .with_sequence(REF_SEQ)
                .with_pdb_ids(["1abc", "2xyz"]),
        )
        .unwrap();

    let rep = protein.set_representative_sequence(false).unwrap();
    assert_eq!(rep.id, "P00002");
}

#[test]
fn sequence_selection_is_idempotent() {
    let mut protein = Protein::new("b0001");
    protein
        .sequences
        .append(SeqRecord::new("P00001", SequenceOrigin::UniProt).with_sequence(REF_SEQ))
        .unwrap();
    protein.set_representative_sequence(false).unwrap();

    // Loading more candidates does not change an already-set representative
    protein
        .sequences
        .append(
            SeqRecord::new("P00002", SequenceOrigin::UniProt)
                .with_sequence(REF_SEQ)
                .with_reviewed(true),
        )
        .unwrap();
    let rep = protein.set_representative_sequence(false).unwrap();
    assert_eq!(rep.id, "P00001");
}

#[test]
fn structure_selection_requires_representative_sequence() {
    let dir = tempdir().unwrap();
    let aligner = GlobalAligner::new();
    let cleaner = ChainFilterCleaner::new();
    let ctx = context(&aligner, &cleaner, dir.path());

    let mut protein = Protein::new("b0001");
    let file = write_pdb(dir.path(), "1abc.pdb", REF_SEQ, 'A', 1);
    protein.load_pdb("1abc", &["A"], Some(file), false).unwrap();

    let selector = RepresentativeSelector::new(QualityCutoffs::default());
    let err = protein
        .set_representative_structure(&selector, &ctx)
        .unwrap_err();
    assert!(matches!(err, ProtrepError::NoRepresentativeSequence(_)));
}

#[test]
fn experimental_structure_wins_and_homology_is_never_evaluated() {
    let dir = tempdir().unwrap();
    let aligner = GlobalAligner::new();
    let cleaner = ChainFilterCleaner::new();
    let ctx = context(&aligner, &cleaner, dir.path());

    let mut protein = Protein::new("b0001");
    protein
        .load_manual_sequence("P00001", REF_SEQ, true, false)
        .unwrap();

    // Homology model loaded first; the experimental entry must still win
    let model_file = write_pdb(dir.path(), "model1.pdb", REF_SEQ, 'A', 1);
    protein
        .load_homology_model("model1", Some(model_file), false)
        .unwrap();
    let pdb_file = write_pdb(dir.path(), "1abc.pdb", REF_SEQ, 'A', 1);
    protein
        .load_pdb("1abc", &["A"], Some(pdb_file), false)
        .unwrap();

    let selector = RepresentativeSelector::new(QualityCutoffs::default());
    let rep = protein
        .set_representative_structure(&selector, &ctx)
        .unwrap();
    assert_eq!(rep.id, "1abc-A");
    assert!(rep.is_experimental);

    let model = protein.structures.get_by_id("model1").unwrap();
    assert!(model.chain_verdicts.is_empty());
}

#[test]
fn homology_model_wins_when_no_experimental_structure_qualifies() {
    let dir = tempdir().unwrap();
    let aligner = GlobalAligner::new();
    let cleaner = ChainFilterCleaner::new();
    let ctx = context(&aligner, &cleaner, dir.path());

    let mut protein = Protein::new("b0001");
    protein
        .load_manual_sequence("P00001", REF_SEQ, true, false)
        .unwrap();
    // Experimental candidate carries an internal deletion and fails QC
    let pdb_file = write_pdb(dir.path(), "1bad.pdb", "MKTAYKQR", 'A', 1);
    protein
        .load_pdb("1bad", &["A"], Some(pdb_file), false)
        .unwrap();
    let model_file = write_pdb(dir.path(), "model1.pdb", REF_SEQ, 'A', 1);
    protein
        .load_homology_model("model1", Some(model_file), false)
        .unwrap();

    let selector = RepresentativeSelector::new(QualityCutoffs::default());
    let rep = protein
        .set_representative_structure(&selector, &ctx)
        .unwrap();
    assert_eq!(rep.id, "model1-A");
    assert!(!rep.is_experimental);

    // The rejected experimental candidate keeps its verdict
    let experimental = protein.structures.get_by_id("1bad").unwrap();
    assert!(!experimental.chain_verdicts["A"].passed);
}

#[test]
fn always_use_homology_restricts_the_search() {
    let dir = tempdir().unwrap();
    let aligner = GlobalAligner::new();
    let cleaner = ChainFilterCleaner::new();
    let ctx = context(&aligner, &cleaner, dir.path());

    let mut protein = Protein::new("b0001");
    protein
        .load_manual_sequence("P00001", REF_SEQ, true, false)
        .unwrap();
    let pdb_file = write_pdb(dir.path(), "1abc.pdb", REF_SEQ, 'A', 1);
    protein
        .load_pdb("1abc", &["A"], Some(pdb_file), false)
        .unwrap();
    let model_file = write_pdb(dir.path(), "model1.pdb", REF_SEQ, 'A', 1);
    protein
        .load_homology_model("model1", Some(model_file), false)
        .unwrap();

    let cutoffs = QualityCutoffs {
        always_use_homology: true,
        ..QualityCutoffs::default()
    };
    let selector = RepresentativeSelector::new(cutoffs);
    let rep = protein
        .set_representative_structure(&selector, &ctx)
        .unwrap();
    assert_eq!(rep.id, "model1-A");
    assert!(!rep.is_experimental);
}

#[test]
fn blank_chain_homology_model_gets_the_x_suffix() {
    let dir = tempdir().unwrap();
    let aligner = GlobalAligner::new();
    let cleaner = ChainFilterCleaner::new();
    let ctx = context(&aligner, &cleaner, dir.path());

    let mut protein = Protein::new("b0001");
    protein
        .load_manual_sequence("P00001", REF_SEQ, true, false)
        .unwrap();
    let model_file = write_pdb(dir.path(), "model1.pdb", REF_SEQ, ' ', 1);
    protein
        .load_homology_model("model1", Some(model_file), false)
        .unwrap();

    let selector = RepresentativeSelector::new(QualityCutoffs::default());
    let rep = protein
        .set_representative_structure(&selector, &ctx)
        .unwrap();

    assert_eq!(rep.id, "model1-X");
    assert_eq!(rep.representative_chain.as_deref(), Some(" "));
    let cleaned = rep.structure_path().unwrap();
    assert_eq!(cleaned.file_name().unwrap(), "model1-X_clean.pdb");
}

#[test]
fn cleaned_representative_file_contains_only_the_kept_chain() {
    let dir = tempdir().unwrap();
    let aligner = GlobalAligner::new();
    let cleaner = ChainFilterCleaner::new();
    let ctx = context(&aligner, &cleaner, dir.path());

    // Chain B first in the file and in the mapping; chain A carries an
    // internal deletion and must be rejected, B wins
    let deleted = "MKTAYKQR";
    let mut contents = pdb_for(deleted, 'A', 1);
    contents.push_str(&pdb_for(REF_SEQ, 'B', 1));
    let file = dir.path().join("1abc.pdb");
    std::fs::write(&file, contents).unwrap();

    let mut protein = Protein::new("b0001");
    protein
        .load_manual_sequence("P00001", REF_SEQ, true, false)
        .unwrap();
    protein
        .load_pdb("1abc", &["A", "B"], Some(file), false)
        .unwrap();

    let selector = RepresentativeSelector::new(QualityCutoffs::default());
    let rep = protein
        .set_representative_structure(&selector, &ctx)
        .unwrap();
    assert_eq!(rep.id, "1abc-B");

    let reparsed = protrep::structure::parse_structure(rep.structure_path().unwrap()).unwrap();
    assert_eq!(reparsed.chain_ids(), vec!["B"]);
    assert_eq!(reparsed.chain("B").unwrap().seq, REF_SEQ);

    // The rejected chain keeps its verdict on the candidate record
    let candidate = protein.structures.get_by_id("1abc").unwrap();
    assert!(!candidate.chain_verdicts["A"].passed);
    assert!(candidate.chain_verdicts["B"].passed);
}

#[test]
fn residue_numbers_are_mapped_onto_the_representative_sequence() {
    let dir = tempdir().unwrap();
    let aligner = GlobalAligner::new();
    let cleaner = ChainFilterCleaner::new();
    let ctx = context(&aligner, &cleaner, dir.path());

    let mut protein = Protein::new("b0001");
    protein
        .load_manual_sequence("P00001", REF_SEQ, true, false)
        .unwrap();
    // Author numbering starts at 5
    let file = write_pdb(dir.path(), "1abc.pdb", REF_SEQ, 'A', 5);
    protein.load_pdb("1abc", &["A"], Some(file), false).unwrap();

    let selector = RepresentativeSelector::new(QualityCutoffs::default());
    let rep = protein
        .set_representative_structure(&selector, &ctx)
        .unwrap();
    assert!((rep.reference_seq_top_coverage.unwrap() - 100.0).abs() < 1e-9);

    let repseq = protein.representative_sequence.as_ref().unwrap();
    let mapping = &repseq.letter_annotations[REPCHAIN_RESNUMS];
    assert_eq!(mapping.len(), REF_SEQ.len());
    assert_eq!(mapping[0], Some(5));
    assert_eq!(mapping[9], Some(14));
}

#[test]
fn unfetchable_candidate_is_skipped_not_fatal() {
    let dir = tempdir().unwrap();
    let aligner = GlobalAligner::new();
    let cleaner = ChainFilterCleaner::new();
    let fetcher = FailingFetcher;
    let mut ctx = context(&aligner, &cleaner, dir.path());
    ctx.fetcher = Some(&fetcher);

    let mut protein = Protein::new("b0001");
    protein
        .load_manual_sequence("P00001", REF_SEQ, true, false)
        .unwrap();
    // First candidate has no local file and the download fails
    protein.load_pdb("1bad", &["A"], None, false).unwrap();
    let file = write_pdb(dir.path(), "2good.pdb", REF_SEQ, 'A', 1);
    protein
        .load_pdb("2good", &["A"], Some(file), false)
        .unwrap();

    let selector = RepresentativeSelector::new(QualityCutoffs::default());
    let rep = protein
        .set_representative_structure(&selector, &ctx)
        .unwrap();
    assert_eq!(rep.id, "2good-A");
}

#[test]
fn no_qualifying_structure_when_all_chains_fail() {
    let dir = tempdir().unwrap();
    let aligner = GlobalAligner::new();
    let cleaner = ChainFilterCleaner::new();
    let ctx = context(&aligner, &cleaner, dir.path());

    let mut protein = Protein::new("b0001");
    protein
        .load_manual_sequence("P00001", REF_SEQ, true, false)
        .unwrap();
    // Internal deletion, rejected under the default cutoffs
    let file = write_pdb(dir.path(), "1abc.pdb", "MKTAYKQR", 'A', 1);
    protein.load_pdb("1abc", &["A"], Some(file), false).unwrap();

    let selector = RepresentativeSelector::new(QualityCutoffs::default());
    let err = protein
        .set_representative_structure(&selector, &ctx)
        .unwrap_err();
    assert!(matches!(err, ProtrepError::NoQualifyingStructure(_)));
    assert!(protein.representative_structure.is_none());
}

#[test]
fn structure_selection_is_idempotent() {
    let dir = tempdir().unwrap();
    let aligner = GlobalAligner::new();
    let cleaner = ChainFilterCleaner::new();
    let ctx = context(&aligner, &cleaner, dir.path());

    let mut protein = Protein::new("b0001");
    protein
        .load_manual_sequence("P00001", REF_SEQ, true, false)
        .unwrap();
    let file = write_pdb(dir.path(), "1abc.pdb", REF_SEQ, 'A', 1);
    protein.load_pdb("1abc", &["A"], Some(file), false).unwrap();

    let selector = RepresentativeSelector::new(QualityCutoffs::default());
    protein
        .set_representative_structure(&selector, &ctx)
        .unwrap();

    // A later, better candidate does not displace the chosen representative
    let other = write_pdb(dir.path(), "2xyz.pdb", REF_SEQ, 'A', 1);
    protein
        .load_pdb("2xyz", &["A"], Some(other), false)
        .unwrap();
    let rep = protein
        .set_representative_structure(&selector, &ctx)
        .unwrap();
    assert_eq!(rep.id, "1abc-A");
}

#[test]
fn force_reload_replaces_a_sequence_in_place() {
    let mut protein = Protein::new("b0001");
    protein
        .load_manual_sequence("P1", "MKTA", false, false)
        .unwrap();
    protein
        .load_manual_sequence("P2", "MKTV", false, false)
        .unwrap();
    protein
        .load_manual_sequence("P1", "MKTAYIAK", false, true)
        .unwrap();

    assert_eq!(protein.num_sequences(), 2);
    let rec = protein.sequences.get_by_id("P1").unwrap();
    assert_eq!(rec.residues().unwrap().as_deref(), Some("MKTAYIAK"));
}
