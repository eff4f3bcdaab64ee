//! Report identity and selectors.
//!
//! The report id is `AER-v1:<clinic>:<client>:<start>:<end>[:<program>]`. It
//! appears in the manifest, in `audit_integrity.report_id`, and is the
//! idempotency key for fetches.

use crate::period::ReportPeriod;

/// Kinds of report this subsystem produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReportKind {
    /// Adherence Evidence Report.
    Aer,
    /// Clinic-level rollup across clients. Tokens may be scoped to it; this
    /// workspace does not generate it.
    AerRollup,
}

impl ReportKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Aer => "AER",
            Self::AerRollup => "AER_ROLLUP",
        }
    }

    /// Prefix of report ids of this kind, including the contract version.
    #[must_use]
    pub const fn id_prefix(self) -> &'static str {
        match self {
            Self::Aer => "AER-v1",
            Self::AerRollup => "AER-ROLLUP-v1",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "AER" => Some(Self::Aer),
            "AER_ROLLUP" => Some(Self::AerRollup),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error building a report selector.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
    /// The field contains `:` or a line break, which would make the id ambiguous.
    #[error("{field} contains a reserved character: {value:?}")]
    ReservedCharacter { field: &'static str, value: String },
}

/// Everything that selects one logical report.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReportSelector {
    pub clinic_id: String,
    pub client_id: String,
    pub period: ReportPeriod,
    pub program: Option<String>,
}

fn check_component(field: &'static str, value: &str, allow_colon: bool) -> Result<(), IdentityError> {
    if value.is_empty() {
        return Err(IdentityError::Empty { field });
    }
    let reserved = |c: char| c == '\n' || c == '\r' || (!allow_colon && c == ':');
    if value.chars().any(reserved) {
        return Err(IdentityError::ReservedCharacter {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

impl ReportSelector {
    /// Build a selector, rejecting components that would break the id format.
    ///
    /// The program is trimmed, and a blank program means no program. It is
    /// the last id component, so it may contain `:`.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError`] on an empty or reserved-character component.
    pub fn new(
        clinic_id: &str,
        client_id: &str,
        period: ReportPeriod,
        program: Option<&str>,
    ) -> Result<Self, IdentityError> {
        check_component("clinic_id", clinic_id, false)?;
        check_component("client_id", client_id, false)?;
        let program = program.map(str::trim).filter(|p| !p.is_empty());
        if let Some(program) = program {
            check_component("program", program, true)?;
        }
        Ok(Self {
            clinic_id: clinic_id.to_string(),
            client_id: client_id.to_string(),
            period,
            program: program.map(str::to_string),
        })
    }

    /// Report id for `kind`.
    #[must_use]
    pub fn report_id(&self, kind: ReportKind) -> String {
        let mut id = format!(
            "{}:{}:{}:{}:{}",
            kind.id_prefix(),
            self.clinic_id,
            self.client_id,
            self.period.start_label(),
            self.period.end_label()
        );
        if let Some(program) = &self.program {
            id.push(':');
            id.push_str(program);
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn january() -> ReportPeriod {
        ReportPeriod::parse("2026-01-01", "2026-01-31").unwrap()
    }

    #[test]
    fn report_id_without_program() {
        let sel = ReportSelector::new("C1", "U1", january(), None).unwrap();
        assert_eq!(sel.report_id(ReportKind::Aer), "AER-v1:C1:U1:2026-01-01:2026-01-31");
    }

    #[test]
    fn report_id_with_program() {
        let sel = ReportSelector::new("C1", "U1", january(), Some("dbt")).unwrap();
        assert_eq!(
            sel.report_id(ReportKind::Aer),
            "AER-v1:C1:U1:2026-01-01:2026-01-31:dbt"
        );
    }

    #[test]
    fn program_is_trimmed_and_blank_means_none() {
        let padded = ReportSelector::new("C1", "U1", january(), Some(" CBT ")).unwrap();
        assert_eq!(padded.program.as_deref(), Some("CBT"));
        assert_eq!(
            padded.report_id(ReportKind::Aer),
            "AER-v1:C1:U1:2026-01-01:2026-01-31:CBT"
        );
        let blank = ReportSelector::new("C1", "U1", january(), Some("  ")).unwrap();
        assert_eq!(blank, ReportSelector::new("C1", "U1", january(), None).unwrap());
    }

    #[test]
    fn colon_in_clinic_is_rejected() {
        let err = ReportSelector::new("C:1", "U1", january(), None).unwrap_err();
        assert_eq!(
            err,
            IdentityError::ReservedCharacter {
                field: "clinic_id",
                value: "C:1".into(),
            }
        );
    }

    #[test]
    fn newline_in_program_is_rejected() {
        let err = ReportSelector::new("C1", "U1", january(), Some("a\nb")).unwrap_err();
        assert!(matches!(err, IdentityError::ReservedCharacter { field: "program", .. }));
    }

    #[test]
    fn empty_client_is_rejected() {
        let err = ReportSelector::new("C1", "", january(), None).unwrap_err();
        assert_eq!(err, IdentityError::Empty { field: "client_id" });
    }

    #[test]
    fn kind_parse_roundtrips() {
        for kind in [ReportKind::Aer, ReportKind::AerRollup] {
            assert_eq!(ReportKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ReportKind::parse("AER_PDF"), None);
    }
}
