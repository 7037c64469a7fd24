//! Plain-text rendering for the CLI.

use std::fmt::Write;

use sc_core::language::THREE_LETTER_CODES;
use sc_core::LanguageProfile;
use sc_coverage::{CoverageState, CoverageSummary, Resolution};
use sc_view::{BatchProgress, JobPhase, PageInfo};

use crate::library::{Notice, NoticeLevel, Row, ViewStatus};

fn badge(state: CoverageState) -> &'static str {
    match state {
        CoverageState::Optimal => "+",
        CoverageState::Upgradeable => "~",
        CoverageState::Missing => "-",
    }
}

fn render_resolution(resolution: &Resolution) -> String {
    let mut out = String::new();
    for coverage in &resolution.per_language {
        let result = &coverage.result;
        let source = if result.is_embedded {
            " (embedded)"
        } else if result.matched_sidecar_path.is_some() {
            " (sidecar)"
        } else {
            ""
        };
        let _ = write!(out, " {}{}{}", badge(result.state), coverage.language, source);
    }
    if !resolution.extras.is_empty() {
        let extras: Vec<String> = resolution
            .extras
            .iter()
            .map(|s| match s.sidecar_format() {
                Some(format) => format!("{}.{}", s.language, format),
                None => s.language.clone(),
            })
            .collect();
        let _ = write!(out, "  extras: {}", extras.join(", "));
    }
    if !resolution.duplicates.is_empty() {
        let _ = write!(out, "  duplicates: {}", resolution.duplicates.len());
    }
    out
}

/// One line per row: selection mark, label, title and coverage badges.
pub fn render_rows(rows: &[Row<'_>]) -> String {
    let mut out = String::new();
    for row in rows {
        let mark = if row.selected { "[x]" } else { "[ ]" };
        let label = row.unit.episode_label().unwrap_or_default();
        let file = if row.unit.has_file { "" } else { " (no file)" };
        let _ = writeln!(
            out,
            "{mark} {:>6} {:<8} {}{file}{}",
            row.unit.id.get(),
            label,
            row.unit.title,
            render_resolution(&row.resolution)
        );
    }
    out
}

pub fn render_page_info(info: &PageInfo) -> String {
    format!(
        "page {}/{} ({} rows, {} per page)",
        info.page, info.page_count, info.total, info.page_size
    )
}

pub fn render_summary(summary: &CoverageSummary, profile: Option<&LanguageProfile>) -> String {
    let mut out = String::new();
    if let Some(profile) = profile {
        let name = if profile.name.is_empty() {
            profile.id.to_string()
        } else {
            profile.name.clone()
        };
        let _ = writeln!(
            out,
            "Profile {name}: {}",
            profile.target_languages.join(", ")
        );
    }
    let _ = writeln!(out, "Missing:     {}", summary.missing);
    let _ = writeln!(out, "Upgradeable: {}", summary.upgradeable);
    let _ = writeln!(out, "Optimal:     {}", summary.optimal);
    if summary.units_without_file > 0 {
        let _ = writeln!(out, "Skipped (no file): {}", summary.units_without_file);
    }
    out
}

pub fn render_progress(progress: &BatchProgress) -> String {
    match progress.phase {
        JobPhase::Terminal => format!(
            "job {}: finished, {} succeeded, {} failed, {} skipped",
            progress.job_id, progress.completed, progress.failed, progress.skipped
        ),
        JobPhase::Dispatched => format!(
            "job {}: queued, {} items",
            progress.job_id, progress.total
        ),
        JobPhase::Running | JobPhase::Idle => format!(
            "job {}: {}/{} ({:.0}%), {} completed, {} failed",
            progress.job_id,
            progress.current,
            progress.total,
            progress.fraction() * 100.0,
            progress.completed,
            progress.failed
        ),
    }
}

pub fn render_status(status: &ViewStatus) -> Option<String> {
    match status {
        ViewStatus::Degraded { message, retryable } => Some(format!(
            "warning: showing last known data: {message}{}",
            if *retryable { " (retry later)" } else { "" }
        )),
        ViewStatus::Loading | ViewStatus::Ready => None,
    }
}

pub fn render_notices(notices: &[Notice]) -> String {
    let mut out = String::new();
    for notice in notices {
        let prefix = match notice.level {
            NoticeLevel::Info => "note",
            NoticeLevel::Error => "error",
        };
        let _ = writeln!(out, "{prefix}: {}", notice.message);
    }
    out
}

/// The three-letter to two-letter language table.
pub fn render_languages() -> String {
    let mut out = String::new();
    for (three, two) in THREE_LETTER_CODES {
        let _ = writeln!(out, "{three} -> {two}");
    }
    out
}
