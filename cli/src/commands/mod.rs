pub mod fetch_verify;
pub mod generate;
pub mod inspect;
pub mod verify;

use std::process::ExitCode;

use aer_bundle::VerifyReport;

/// Result of a successfully executed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Pass,
    Fail,
}

impl Outcome {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Self::Done | Self::Pass => ExitCode::SUCCESS,
            Self::Fail => ExitCode::from(1),
        }
    }
}

/// Computed and expected digests on stdout, reasons on stderr, then the
/// verdict line.
pub fn print_report(report: &VerifyReport) -> Outcome {
    let expected = |d: Option<aer_kernel::proof::hash::Sha256Digest>| {
        d.map_or_else(|| "-".to_string(), |d| d.to_hex())
    };
    println!("JSON_SHA256={}", report.computed_json);
    println!("PDF_SHA256={}", report.computed_document);
    println!("EXPECTED_JSON_SHA256={}", expected(report.expected_json));
    println!("EXPECTED_PDF_SHA256={}", expected(report.expected_document));
    if let Some(id) = &report.report_id {
        println!("REPORT_ID={id}");
    }
    for failure in &report.failures {
        eprintln!("FAIL: {failure}");
        if let aer_bundle::FailureReason::SchemaViolations { violations } = failure {
            for v in violations {
                eprintln!("  {v}");
            }
        }
    }
    println!("{}", report.verdict());
    if report.passed() {
        Outcome::Pass
    } else {
        Outcome::Fail
    }
}
