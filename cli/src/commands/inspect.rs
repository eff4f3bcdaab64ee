//! `aer inspect`

use std::path::Path;

use aer_bundle::archive::reader::parse_archive;
use aer_kernel::proof::hash::sha256;
use anyhow::{Context, Result};

use super::Outcome;

pub fn run(bundle: &Path) -> Result<Outcome> {
    let bytes = std::fs::read(bundle).with_context(|| format!("failed to read {}", bundle.display()))?;
    let entries = parse_archive(&bytes).with_context(|| format!("unusable bundle: {}", bundle.display()))?;
    for entry in entries {
        println!(
            "{}\t{} bytes\tcrc32={:08x}\tsha256={}",
            entry.name,
            entry.data.len(),
            entry.crc32,
            sha256(entry.data)
        );
    }
    Ok(Outcome::Done)
}
