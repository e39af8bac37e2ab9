//! Plain-text rendering of protein summaries

use crate::protein::Protein;
use anyhow::Result;
use std::fmt::Write;

/// Render a protein summary as an aligned two-column text report
pub fn generate_text_report(protein: &Protein) -> Result<String> {
    let summary = protein.summarize()?;

    let mut output = String::new();

    let title = format!("Protein Report: {}", protein.id);
    writeln!(&mut output, "{}", title)?;
    writeln!(&mut output, "{}", "=".repeat(title.len()))?;
    writeln!(&mut output)?;

    let width = summary.keys().map(|k| k.len()).max().unwrap_or(0);
    for (key, value) in &summary {
        writeln!(&mut output, "{:width$}  {}", key, value, width = width)?;
    }

    Ok(output)
}
