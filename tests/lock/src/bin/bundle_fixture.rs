//! Generates the January fixture report, packages it, writes and re-reads the
//! directory form, verifies both, and prints `key=value` lines for the
//! cross-process determinism test.
//!
//! Output:
//!   `report_id`=AER-v1:...
//!   `json_sha256`=<hex>
//!   `pdf_sha256`=<hex>
//!   `bundle_sha256`=<hex>
//!   `archive_verdict`=PASS
//!   `dir_verdict`=PASS

use aer_bundle::bundle_dir::{verify_bundle_dir, write_bundle_dir};
use aer_bundle::{extract_bundle, verify_archive};
use aer_kernel::proof::hash::sha256;
use lock_tests::{january_bundle, january_report};

fn main() {
    let report = january_report();
    let bundle = january_bundle();

    let archive = verify_archive(&bundle).expect("bundle parses");

    let dir = std::env::temp_dir().join(format!("aer_bundle_fixture_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    write_bundle_dir(extract_bundle(&bundle).expect("bundle extracts"), &dir).expect("write_bundle_dir failed");
    let on_disk = verify_bundle_dir(&dir).expect("verify_bundle_dir failed");
    let _ = std::fs::remove_dir_all(&dir);

    println!("report_id={}", report.report_id);
    println!("json_sha256={}", report.json_sha256);
    println!("pdf_sha256={}", report.document_sha256);
    println!("bundle_sha256={}", sha256(&bundle));
    println!("archive_verdict={}", archive.verdict());
    println!("dir_verdict={}", on_disk.verdict());
}
