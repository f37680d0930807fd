//! Metadata resolution: institution identity from the document path and
//! the reporting date from first-page text.
//!
//! Two independent sub-derivations, combined into one
//! [`DocumentMetadata`]. Neither ever fails the document: a path without
//! the anchor segment yields a `None` institution, and garbled or absent
//! date text yields `None` date fields. The schema validator downstream is
//! the stage that decides what to do with the holes.
//!
//! Statement headers phrase the reporting date a handful of ways
//! ("pada tanggal 31 Mei 2024", "per 31 Agustus 2024",
//! "TANGGAL LAPORAN : 31 JANUARI 2024"). The patterns are tried in their
//! configured priority order against the lowercased text; first match
//! wins, and month names resolve through the configured vocabulary.

use crate::config::{DatePattern, PipelineConfig};
use crate::record::DocumentMetadata;
use regex::Regex;
use std::path::Path;

/// Resolves institution and reporting date per document.
#[derive(Debug)]
pub struct MetadataResolver {
    anchor_segment: String,
    patterns: Vec<Regex>,
    month_names: Vec<(String, u32)>,
}

impl MetadataResolver {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            anchor_segment: config.anchor_segment.clone(),
            patterns: compile_patterns(&config.date_patterns),
            month_names: config.month_names.clone(),
        }
    }

    /// Derive metadata from the document path and its first-page text.
    /// Never fails; absent pieces degrade to `None`.
    pub fn resolve(&self, path: &Path, first_page_text: &str) -> DocumentMetadata {
        let mut metadata = DocumentMetadata {
            institution: self.institution_from_path(path),
            ..DocumentMetadata::default()
        };

        if let Some((day, month_name, year)) = self.match_date_phrase(first_page_text) {
            metadata.day = Some(day);
            metadata.year = Some(year);
            metadata.month = self.month_number(&month_name);
            metadata.month_name = Some(capitalize(&month_name));
        }
        metadata
    }

    /// The path segment immediately following the anchor segment.
    fn institution_from_path(&self, path: &Path) -> Option<String> {
        let mut segments = path
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned());
        segments
            .by_ref()
            .find(|s| *s == self.anchor_segment)
            .and_then(|_| segments.next())
    }

    /// First matching date phrase, as (day, lowercased month name, year).
    fn match_date_phrase(&self, text: &str) -> Option<(u32, String, i32)> {
        let lower = text.to_lowercase();
        for pattern in &self.patterns {
            if let Some(caps) = pattern.captures(&lower) {
                let day = caps.get(1)?.as_str().parse().ok()?;
                let month_name = caps.get(2)?.as_str().to_string();
                let year = caps.get(3)?.as_str().parse().ok()?;
                return Some((day, month_name, year));
            }
        }
        None
    }

    fn month_number(&self, name: &str) -> Option<u32> {
        self.month_names
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, m)| *m)
    }
}

/// Compile the configured phrase patterns, dropping any that fail to
/// compile. A substituted configuration with a bad pattern degrades the
/// resolver instead of poisoning the whole batch.
fn compile_patterns(patterns: &[DatePattern]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| match Regex::new(&p.pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!("Ignoring unparseable date pattern '{}': {e}", p.pattern);
                None
            }
        })
        .collect()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
