//! `aer verify`

use std::path::Path;

use aer_bundle::bundle_dir::verify_bundle_dir;
use aer_bundle::{verify_archive, verify_parts, BundleParts};
use anyhow::{bail, Context, Result};

use super::{print_report, Outcome};
use crate::VerifyArgs;

fn read(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

pub fn run(args: &VerifyArgs) -> Result<Outcome> {
    let report = match (&args.bundle, &args.dir, &args.json, &args.pdf, &args.manifest) {
        (Some(bundle), None, None, None, None) => {
            let bytes = read(bundle)?;
            verify_archive(&bytes).with_context(|| format!("unusable bundle: {}", bundle.display()))?
        }
        (None, Some(dir), None, None, None) => verify_bundle_dir(dir)
            .with_context(|| format!("unusable bundle directory: {}", dir.display()))?,
        (None, None, Some(json), Some(pdf), Some(manifest)) => {
            let (json, document, manifest) = (read(json)?, read(pdf)?, read(manifest)?);
            verify_parts(BundleParts {
                json: &json,
                document: &document,
                manifest: &manifest,
            })
        }
        _ => bail!("pass --bundle, --dir, or all of --json --pdf --manifest"),
    };
    Ok(print_report(&report))
}
