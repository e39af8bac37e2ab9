//! Minimal PDB-format chain view and chain-restricted cleaning.
//!
//! Parses ATOM records from PDB-format text into per-chain residue lists
//! (one-letter sequence plus residue numbers). Only the first MODEL of a
//! multi-model (NMR) file is read. This is not a full structure parser:
//! coordinates, occupancies and header records beyond the id are ignored,
//! since selection only needs chain sequences and residue numbering.

use crate::error::{ProtrepError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One chain of a parsed structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedChain {
    /// Chain identifier as it appears in the file; may be a single space for
    /// homology models written without chain ids
    pub id: String,
    /// One-letter sequence; unknown residue names become `X`
    pub seq: String,
    /// Author residue numbers, parallel to `seq`
    pub resnums: Vec<i64>,
}

/// Chain-level view of one structure file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedStructure {
    pub chains: Vec<ParsedChain>,
}

impl ParsedStructure {
    pub fn chain(&self, id: &str) -> Option<&ParsedChain> {
        self.chains.iter().find(|c| c.id == id)
    }

    pub fn chain_ids(&self) -> Vec<String> {
        self.chains.iter().map(|c| c.id.clone()).collect()
    }
}

fn three_to_one(resname: &str) -> char {
    match resname {
        "ALA" => 'A',
        "ARG" => 'R',
        "ASN" => 'N',
        "ASP" => 'D',
        "CYS" => 'C',
        "GLN" => 'Q',
        "GLU" => 'E',
        "GLY" => 'G',
        "HIS" => 'H',
        "ILE" => 'I',
        "LEU" => 'L',
        "LYS" => 'K',
        "MET" | "MSE" => 'M',
        "PHE" => 'F',
        "PRO" => 'P',
        "SER" => 'S',
        "THR" => 'T',
        "TRP" => 'W',
        "TYR" => 'Y',
        "VAL" => 'V',
        "SEC" => 'U',
        _ => 'X',
    }
}

/// Fixed-column field access; truncated lines and multibyte bytes straddling
/// a column boundary are parse errors, not panics
fn field(line: &str, start: usize, end: usize) -> Result<&str> {
    line.get(start..end)
        .ok_or_else(|| ProtrepError::Parse(format!("malformed ATOM record: {}", line)))
}

/// Parse a PDB-format string into its chains
pub fn parse_structure_str(input: &str) -> Result<ParsedStructure> {
    let mut chains: IndexMap<String, ParsedChain> = IndexMap::new();
    let mut last_residue: Option<(String, i64, char, String)> = None;
    let mut in_first_model = true;

    for line in input.lines() {
        if line.starts_with("ENDMDL") {
            break;
        }
        if line.starts_with("MODEL") {
            if !in_first_model {
                break;
            }
            in_first_model = false;
            continue;
        }
        let is_mse = line.starts_with("HETATM") && line.get(17..20) == Some("MSE");
        if !line.starts_with("ATOM  ") && !is_mse {
            continue;
        }

        let resname = field(line, 17, 20)?.trim().to_string();
        let chain_id = field(line, 21, 22)?.to_string();
        let seq_num: i64 = field(line, 22, 26)?.trim().parse().map_err(|_| {
            ProtrepError::Parse(format!("unparseable residue number: {}", line))
        })?;
        let i_code = field(line, 26, 27)?.chars().next().unwrap_or(' ');

        let residue_key = (chain_id.clone(), seq_num, i_code, resname.clone());
        if last_residue.as_ref() == Some(&residue_key) {
            continue;
        }
        last_residue = Some(residue_key);

        let chain = chains.entry(chain_id.clone()).or_insert_with(|| ParsedChain {
            id: chain_id,
            seq: String::new(),
            resnums: Vec::new(),
        });
        chain.seq.push(three_to_one(&resname));
        chain.resnums.push(seq_num);
    }

    if chains.is_empty() {
        return Err(ProtrepError::Parse("no ATOM records found".to_string()));
    }

    Ok(ParsedStructure {
        chains: chains.into_values().collect(),
    })
}

/// Parse a PDB file from disk
pub fn parse_structure(path: &Path) -> Result<ParsedStructure> {
    let contents = std::fs::read_to_string(path)?;
    parse_structure_str(&contents)
}

/// Structure-cleaning collaborator: restrict a structure file to a chain
/// subset, producing a new file
pub trait StructureCleaner {
    fn clean(
        &self,
        structure_file: &Path,
        keep_chains: &[String],
        outdir: &Path,
        out_suffix: &str,
    ) -> Result<PathBuf>;
}

/// Default cleaner: line-level chain filter over PDB-format text.
///
/// Keeps HEADER/TITLE, coordinate records of the requested chains and END;
/// everything else (other chains, waters, ANISOU of dropped chains) is
/// removed.
#[derive(Debug, Clone, Default)]
pub struct ChainFilterCleaner;

impl ChainFilterCleaner {
    pub fn new() -> Self {
        Self
    }
}

impl StructureCleaner for ChainFilterCleaner {
    fn clean(
        &self,
        structure_file: &Path,
        keep_chains: &[String],
        outdir: &Path,
        out_suffix: &str,
    ) -> Result<PathBuf> {
        let contents = std::fs::read_to_string(structure_file)?;

        let stem = structure_file
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                ProtrepError::InvalidInput(format!(
                    "{}: not a usable file name",
                    structure_file.display()
                ))
            })?;
        let outfile = outdir.join(format!("{}{}.pdb", stem, out_suffix));

        let mut kept = String::with_capacity(contents.len());
        for line in contents.lines() {
            let keep = if line.starts_with("HEADER") || line.starts_with("TITLE") {
                true
            } else if line.starts_with("ATOM")
                || line.starts_with("HETATM")
                || line.starts_with("ANISOU")
                || line.starts_with("TER")
            {
                matches!(line.get(21..22), Some(chain) if keep_chains.iter().any(|c| c == chain))
            } else {
                line.starts_with("END") && !line.starts_with("ENDMDL")
            };
            if keep {
                kept.push_str(line);
                kept.push('\n');
            }
        }

        std::fs::write(&outfile, kept)?;
        Ok(outfile)
    }
}
