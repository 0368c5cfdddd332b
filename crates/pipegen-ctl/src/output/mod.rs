//! Styled terminal output for `pipegen-ctl`.
//!
//! Uses `anstyle` for ANSI style definitions and `anstream` for auto-detecting
//! terminal capabilities. Output degrades to plain text when piped.

mod styles;

use std::io::Write;

use pipegen_core::{Document, Entry};

pub(crate) use styles::clap_styles;

use styles::{DIM, ERROR, HEADER, SUCCESS};

/// Print a success message (green checkmark prefix).
pub(crate) fn success(msg: impl std::fmt::Display) {
    let mut out = anstream::stdout().lock();
    writeln!(out, "{SUCCESS}✓{SUCCESS:#} {SUCCESS}{msg}{SUCCESS:#}").ok();
}

/// Print an error message to stderr (red X prefix).
pub(crate) fn error(msg: impl std::fmt::Display) {
    let mut out = anstream::stderr().lock();
    writeln!(out, "{ERROR}✗ {msg}{ERROR:#}").ok();
}

/// Print a section header (bold).
pub(crate) fn header(msg: impl std::fmt::Display) {
    let mut out = anstream::stdout().lock();
    writeln!(out, "{HEADER}{msg}{HEADER:#}").ok();
}

/// Print a list item.
pub(crate) fn item(msg: impl std::fmt::Display) {
    let mut out = anstream::stdout().lock();
    writeln!(out, " - {msg}").ok();
}

/// Print dimmed text.
pub(crate) fn dim(msg: impl std::fmt::Display) {
    let mut out = anstream::stdout().lock();
    writeln!(out, "{DIM}{msg}{DIM:#}").ok();
}

/// Categories of `document` in summary order, with their display labels.
pub(crate) fn summary_sections(document: &Document) -> [(&'static str, &[Entry]); 4] {
    [
        ("jobs", document.jobs.as_slice()),
        ("resource_types", document.resource_types.as_slice()),
        ("resources", document.resources.as_slice()),
        ("groups", document.groups.as_slice()),
    ]
}

/// Print every generated entry, grouped by category.
pub(crate) fn pipeline_stats(document: &Document) {
    for (label, entries) in summary_sections(document) {
        header(format!("Generated {label} ({}):", entries.len()));
        if entries.is_empty() {
            dim("   (none)");
        }
        for entry in entries {
            item(entry);
        }
    }
}
