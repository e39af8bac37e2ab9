//! Remote database clients for sequences and structures.
//!
//! Each client downloads one record into a local file and is idempotent: an
//! already-downloaded file is returned as-is without touching the network.
//! Loading and selection code depends only on the [`SequenceFetcher`] and
//! [`StructureFetcher`] traits, so tests run with stub fetchers and offline
//! pipelines simply pass none.

use crate::error::Result;
use anyhow::{bail, Context};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("protrep/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

const KEGG_BASE_URL: &str = "https://rest.kegg.jp";
const UNIPROT_BASE_URL: &str = "https://rest.uniprot.org";
const RCSB_BASE_URL: &str = "https://files.rcsb.org";

/// Download one sequence record as a FASTA file
pub trait SequenceFetcher {
    fn fetch(&self, id: &str, dest_dir: &Path) -> Result<PathBuf>;
}

/// Download one structure as a PDB-format file
pub trait StructureFetcher {
    fn fetch(&self, id: &str, dest_dir: &Path) -> Result<PathBuf>;
}

fn build_client() -> anyhow::Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")
}

fn download_to_file(
    client: &reqwest::blocking::Client,
    url: &str,
    outfile: &Path,
) -> anyhow::Result<()> {
    let response = client
        .get(url)
        .send()
        .with_context(|| format!("Failed to fetch {}", url))?;

    let status = response.status();
    if !status.is_success() {
        bail!("{} returned status {}", url, status);
    }

    let body = response
        .text()
        .with_context(|| format!("Failed to read response body from {}", url))?;
    if body.trim().is_empty() {
        bail!("{} returned an empty response", url);
    }

    std::fs::write(outfile, body)
        .with_context(|| format!("Failed to write {}", outfile.display()))?;
    Ok(())
}

/// Amino-acid sequence client for the KEGG REST API
pub struct KeggClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl KeggClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(KEGG_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into(),
            client: build_client()?,
        })
    }

    fn outfile(&self, id: &str, dest_dir: &Path) -> PathBuf {
        // KEGG ids carry an organism prefix ("eco:b0002"); keep it in the
        // file name but not as a path separator surprise
        dest_dir.join(format!("{}.fasta", id.replace(':', "-")))
    }
}

impl SequenceFetcher for KeggClient {
    fn fetch(&self, id: &str, dest_dir: &Path) -> Result<PathBuf> {
        let outfile = self.outfile(id, dest_dir);
        if outfile.exists() {
            debug!("{}: sequence file already downloaded", id);
            return Ok(outfile);
        }

        let url = format!("{}/get/{}/aaseq", self.base_url, id);
        debug!("{}: downloading sequence from {}", id, url);
        download_to_file(&self.client, &url, &outfile)?;
        Ok(outfile)
    }
}

/// FASTA sequence client for the UniProt REST API
pub struct UniProtClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl UniProtClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(UNIPROT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into(),
            client: build_client()?,
        })
    }

    fn outfile(&self, id: &str, dest_dir: &Path) -> PathBuf {
        dest_dir.join(format!("{}.fasta", id))
    }
}

impl SequenceFetcher for UniProtClient {
    fn fetch(&self, id: &str, dest_dir: &Path) -> Result<PathBuf> {
        let outfile = self.outfile(id, dest_dir);
        if outfile.exists() {
            debug!("{}: sequence file already downloaded", id);
            return Ok(outfile);
        }

        let url = format!("{}/uniprotkb/{}.fasta", self.base_url, id);
        debug!("{}: downloading sequence from {}", id, url);
        download_to_file(&self.client, &url, &outfile)?;
        Ok(outfile)
    }
}

/// PDB-format structure client for the RCSB download service
pub struct RcsbClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl RcsbClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(RCSB_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into(),
            client: build_client()?,
        })
    }

    fn outfile(&self, id: &str, dest_dir: &Path) -> PathBuf {
        dest_dir.join(format!("{}.pdb", id.to_lowercase()))
    }
}

impl StructureFetcher for RcsbClient {
    fn fetch(&self, id: &str, dest_dir: &Path) -> Result<PathBuf> {
        let outfile = self.outfile(id, dest_dir);
        if outfile.exists() {
            debug!("{}: structure file already downloaded", id);
            return Ok(outfile);
        }

        let url = format!("{}/download/{}.pdb", self.base_url, id.to_lowercase());
        debug!("{}: downloading structure from {}", id, url);
        download_to_file(&self.client, &url, &outfile)?;
        Ok(outfile)
    }
}
