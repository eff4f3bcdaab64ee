//! Document rendering.
//!
//! [`DocumentRenderer`] is the seam for the external renderer collaborator. It
//! must be a pure function of the body. [`TextPdfRenderer`] is the default:
//! a minimal PDF 1.4 writer that lays the body out as wrapped text lines in
//! base-14 Helvetica. It embeds no fonts, writes no `/ID`, and takes
//! its creation date from `meta.generated_at`, so identical bodies produce
//! identical bytes.

use std::io::Write;

use chrono::DateTime;

use crate::body::{AerBody, Intervention};

/// Error rendering a document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("document rendering failed: {detail}")]
    Failed { detail: String },
}

/// Renders report bodies to document bytes.
pub trait DocumentRenderer: Send + Sync {
    /// Render `body`. Identical bodies must yield identical bytes.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if the renderer cannot produce a document.
    fn render(&self, body: &AerBody) -> Result<Vec<u8>, RenderError>;
}

const PAGE_WIDTH: u32 = 612;
const PAGE_HEIGHT: u32 = 792;
const MARGIN: u32 = 50;
const BODY_SIZE: u32 = 10;
const LEADING: u32 = 14;
const FOOTER_SIZE: u32 = 8;
const LINES_PER_PAGE: usize = 46;
const WRAP_COLUMNS: usize = 96;
const TITLE: &str = "Adherence Evidence Report (AER)";
const PRODUCER: &str = "aer-report";

/// Default text-only PDF renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextPdfRenderer;

impl DocumentRenderer for TextPdfRenderer {
    fn render(&self, body: &AerBody) -> Result<Vec<u8>, RenderError> {
        let lines = layout(body);
        let pages: Vec<&[String]> = if lines.is_empty() {
            vec![&[]]
        } else {
            lines.chunks(LINES_PER_PAGE).collect()
        };
        Ok(write_pdf(
            &pages,
            &body.audit_integrity.report_id,
            &pdf_date(&body.meta.generated_at),
        ))
    }
}

fn display(value: Option<&str>) -> &str {
    value.unwrap_or("null")
}

fn key_value(lines: &mut Vec<String>, key: &str, value: Option<&str>) {
    lines.push(format!("{key}: {}", display(value)));
}

fn intervention_rows(lines: &mut Vec<String>, entry: &Intervention) {
    let s = &entry.status_summary;
    lines.push(format!(
        "{} | {} | {} | {} | {} | {} | {}",
        display(entry.title.as_deref()),
        display(entry.assigned_at.as_deref()),
        display(entry.due.end.as_deref()),
        s.completed,
        s.partial,
        s.missed,
        s.late
    ));
    if let Some(src) = &entry.library_source {
        let name = src
            .title
            .as_deref()
            .or(src.slug.as_deref())
            .unwrap_or(&src.item_id);
        let version = src
            .version_id
            .as_deref()
            .map(|v| format!(" v{v}"))
            .unwrap_or_default();
        lines.push(format!("  Source: {name}{version}"));
    }
    if let Some(reviewed) = &entry.reviewed_at {
        lines.push(format!("  Reviewed: {reviewed}"));
    }
}

/// Lay the body out as text lines, before wrapping and pagination.
fn layout(body: &AerBody) -> Vec<String> {
    let mut raw = vec![
        TITLE.to_string(),
        format!("Version: {}", body.meta.version),
        String::new(),
        "Meta".to_string(),
    ];
    let meta = &body.meta;
    key_value(&mut raw, "clinic_id", Some(&meta.clinic_id));
    key_value(&mut raw, "client_id", Some(&meta.client_id));
    key_value(&mut raw, "program", meta.program.as_deref());
    raw.push(format!(
        "reporting_period: {} to {}",
        meta.period.start, meta.period.end
    ));
    key_value(&mut raw, "generated_at", Some(&meta.generated_at));
    key_value(&mut raw, "report_id", Some(&body.audit_integrity.report_id));

    raw.push(String::new());
    raw.push("Prescribed Interventions".to_string());
    raw.push("Title | Assigned At | Due End | Completed | Partial | Missed | Late".to_string());
    for entry in &body.prescribed_interventions {
        intervention_rows(&mut raw, entry);
    }

    raw.push(String::new());
    raw.push("Adherence Timeline".to_string());
    raw.push("Timestamp | Event Type | Source | Reference ID".to_string());
    for event in &body.adherence_timeline {
        let reference = event
            .reference
            .assignment_id
            .as_deref()
            .or(event.reference.response_id.as_deref());
        raw.push(format!(
            "{} | {} | {} | {}",
            event.ts,
            event.kind.as_str(),
            event.source.as_str(),
            display(reference)
        ));
    }

    raw.push(String::new());
    raw.push("Noncompliance / Escalations".to_string());
    raw.push("Timestamp | Type | Channel".to_string());
    for esc in &body.noncompliance_escalations {
        raw.push(format!(
            "{} | {} | {}",
            esc.ts,
            esc.kind.as_str(),
            esc.channel.as_str()
        ));
    }

    raw.push(String::new());
    raw.push("Clinician Review State".to_string());
    let review = &body.clinician_review;
    let status = if review.reviewed { "reviewed" } else { "not_reviewed" };
    key_value(&mut raw, "status", Some(status));
    let reviewed_by_at = review
        .reviewed_at
        .as_ref()
        .map(|at| format!("{} @ {at}", display(review.reviewed_by.name.as_deref())));
    key_value(&mut raw, "reviewed_by_at", reviewed_by_at.as_deref());
    key_value(&mut raw, "signed_by_at", None);
    key_value(&mut raw, "notes", review.notes.as_deref());

    let mut lines = Vec::with_capacity(raw.len());
    for line in raw {
        wrap_into(&mut lines, &pdf_text(&line));
    }
    lines
}

/// Map to printable ASCII; anything else becomes `?`.
fn pdf_text(s: &str) -> String {
    s.chars()
        .map(|c| if (' '..='~').contains(&c) { c } else { '?' })
        .collect()
}

fn wrap_into(out: &mut Vec<String>, line: &str) {
    if line.len() <= WRAP_COLUMNS {
        out.push(line.to_string());
        return;
    }
    // `line` is ASCII here, so byte offsets are char offsets.
    let mut rest = line;
    let mut first = true;
    while !rest.is_empty() {
        let width = if first { WRAP_COLUMNS } else { WRAP_COLUMNS - 2 };
        let cut = rest.len().min(width);
        let (head, tail) = rest.split_at(cut);
        out.push(if first {
            head.to_string()
        } else {
            format!("  {head}")
        });
        rest = tail;
        first = false;
    }
}

fn escape_pdf_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '(' | ')') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// `D:YYYYMMDDHHmmSSZ` from an RFC 3339 instant; the epoch if unparseable.
fn pdf_date(generated_at: &str) -> String {
    DateTime::parse_from_rfc3339(generated_at).map_or_else(
        |_| "D:19700101000000Z".to_string(),
        |dt| dt.naive_utc().format("D:%Y%m%d%H%M%SZ").to_string(),
    )
}

fn page_content(lines: &[String], footer: &str) -> Vec<u8> {
    let mut content = Vec::new();
    let top = PAGE_HEIGHT - MARGIN - BODY_SIZE;
    let _ = write!(
        content,
        "BT\n/F1 {BODY_SIZE} Tf\n{LEADING} TL\n{MARGIN} {top} Td\n"
    );
    for line in lines {
        let _ = writeln!(content, "({}) Tj T*", escape_pdf_string(line));
    }
    content.extend_from_slice(b"ET\n");
    let _ = write!(
        content,
        "BT\n/F1 {FOOTER_SIZE} Tf\n{MARGIN} {} Td\n({}) Tj\nET\n",
        MARGIN - 14,
        escape_pdf_string(footer)
    );
    content
}

fn write_pdf(pages: &[&[String]], report_id: &str, creation_date: &str) -> Vec<u8> {
    // Object layout: 1 catalog, 2 pages, 3 font, 4 info, then (page, content) pairs.
    let page_obj = |i: usize| 5 + 2 * i;
    let total_objects = 4 + 2 * pages.len();

    let mut out: Vec<u8> = Vec::new();
    let mut offsets: Vec<usize> = Vec::with_capacity(total_objects);
    out.extend_from_slice(b"%PDF-1.4\n");

    offsets.push(out.len());
    out.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");

    offsets.push(out.len());
    let kids: Vec<String> = (0..pages.len())
        .map(|i| format!("{} 0 R", page_obj(i)))
        .collect();
    let _ = write!(
        out,
        "2 0 obj\n<< /Type /Pages /Kids [{}] /Count {} >>\nendobj\n",
        kids.join(" "),
        pages.len()
    );

    offsets.push(out.len());
    out.extend_from_slice(
        b"3 0 obj\n<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>\nendobj\n",
    );

    offsets.push(out.len());
    let _ = write!(
        out,
        "4 0 obj\n<< /Title ({}) /Creator ({PRODUCER}) /Producer ({PRODUCER}) /CreationDate ({creation_date}) /ModDate ({creation_date}) >>\nendobj\n",
        escape_pdf_string(TITLE)
    );

    let report_id = pdf_text(report_id);
    for (i, lines) in pages.iter().enumerate() {
        let footer = format!("Report ID: {report_id} | Page {} of {}", i + 1, pages.len());
        let content = page_content(lines, &footer);

        offsets.push(out.len());
        let _ = write!(
            out,
            "{} 0 obj\n<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>\nendobj\n",
            page_obj(i),
            page_obj(i) + 1
        );

        offsets.push(out.len());
        let _ = write!(
            out,
            "{} 0 obj\n<< /Length {} >>\nstream\n",
            page_obj(i) + 1,
            content.len()
        );
        out.extend_from_slice(&content);
        out.extend_from_slice(b"endstream\nendobj\n");
    }

    let xref_offset = out.len();
    let _ = write!(out, "xref\n0 {}\n0000000000 65535 f \n", total_objects + 1);
    for offset in &offsets {
        let _ = write!(out, "{offset:010} 00000 n \n");
    }
    let _ = write!(
        out,
        "trailer\n<< /Size {} /Root 1 0 R /Info 4 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
        total_objects + 1
    );
    out
}
