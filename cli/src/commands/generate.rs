//! `aer generate`

use std::path::Path;

use aer_bundle::bundle::{build_manifest, package, BundleParts};
use aer_bundle::bundle_dir::write_bundle_dir;
use aer_report::render::TextPdfRenderer;
use aer_report::{EvidenceSnapshot, ReportGenerator};
use anyhow::{Context, Result};

use super::Outcome;
use crate::config::CliConfig;

pub fn run(snapshot_path: &Path, out: &Path, dir: Option<&Path>, config: &CliConfig) -> Result<Outcome> {
    let raw = std::fs::read(snapshot_path)
        .with_context(|| format!("failed to read snapshot: {}", snapshot_path.display()))?;
    let snapshot = EvidenceSnapshot::from_json_slice(&raw)
        .with_context(|| format!("failed to parse snapshot: {}", snapshot_path.display()))?;

    let generator = ReportGenerator::from_config(&config.generation, Box::new(TextPdfRenderer))?;
    let report = generator.generate(&snapshot)?;
    let bundle = package(&report)?;
    std::fs::write(out, &bundle).with_context(|| format!("failed to write bundle: {}", out.display()))?;

    if let Some(dir) = dir {
        let manifest = build_manifest(&report).to_bytes()?;
        write_bundle_dir(
            BundleParts {
                json: &report.json,
                document: &report.document,
                manifest: &manifest,
            },
            dir,
        )?;
    }

    println!("REPORT_ID={}", report.report_id);
    println!("JSON_SHA256={}", report.json_sha256);
    println!("PDF_SHA256={}", report.document_sha256);
    Ok(Outcome::Done)
}
