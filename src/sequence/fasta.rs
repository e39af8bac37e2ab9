//! Single-record FASTA I/O for file-backed sequences

use crate::error::{ProtrepError, Result};
use bio::io::fasta;
use std::path::Path;

/// One FASTA record read from disk
#[derive(Debug, Clone)]
pub struct FastaRecord {
    pub id: String,
    pub description: Option<String>,
    pub residues: String,
}

/// Read the first record of a FASTA file.
///
/// Sequence files backing a [`SeqRecord`](crate::sequence::SeqRecord) hold a
/// single record; any further records are ignored.
pub fn read_first_record(path: &Path) -> Result<FastaRecord> {
    let reader = fasta::Reader::from_file(path)
        .map_err(|e| ProtrepError::Parse(format!("{}: {}", path.display(), e)))?;

    let record = reader
        .records()
        .next()
        .ok_or_else(|| ProtrepError::Parse(format!("{}: empty FASTA file", path.display())))?
        .map_err(|e| ProtrepError::Parse(format!("{}: {}", path.display(), e)))?;

    let residues = std::str::from_utf8(record.seq())
        .map_err(|_| ProtrepError::Parse(format!("{}: non-UTF8 sequence data", path.display())))?
        .to_uppercase();

    Ok(FastaRecord {
        id: record.id().to_string(),
        description: record.desc().map(|d| d.to_string()),
        residues,
    })
}

/// Write a single sequence as a FASTA file
pub fn write_record(path: &Path, id: &str, description: Option<&str>, residues: &str) -> Result<()> {
    let mut writer = fasta::Writer::to_file(path)
        .map_err(|e| ProtrepError::Parse(format!("{}: {}", path.display(), e)))?;
    writer.write(id, description, residues.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("p1.fasta");

        write_record(&path, "P1", Some("test protein"), "MKTAYIAKQR").unwrap();
        let record = read_first_record(&path).unwrap();

        assert_eq!(record.id, "P1");
        assert_eq!(record.description.as_deref(), Some("test protein"));
        assert_eq!(record.residues, "MKTAYIAKQR");
    }

    #[test]
    fn test_lowercase_residues_are_uppercased() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("p2.fasta");

        std::fs::write(&path, ">p2\nmkta\nyiak\n").unwrap();
        let record = read_first_record(&path).unwrap();
        assert_eq!(record.residues, "MKTAYIAK");
    }

    #[test]
    fn test_empty_file_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.fasta");
        std::fs::write(&path, "").unwrap();

        let err = read_first_record(&path).unwrap_err();
        assert!(matches!(err, ProtrepError::Parse(_)));
    }
}
