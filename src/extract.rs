//! Change extraction: which parts of the document were inserted or modified
//! since the editing session began.

use crate::config::CheckConfig;
use crate::document::{ContentNode, Document, Operation, Range};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref SEPARATORS: Regex = Regex::new(r"[\s_]+").unwrap();
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Only keep content regions entirely covered by an insertion.
    pub covered_nodes_only: bool,
    /// Narrow results to content-region interiors.
    pub only_content_ranges: bool,
    /// Ignore insertions that replaced adjacent content.
    pub only_pure_insertions: bool,
    /// First log version to consider; 0 is the start of the session.
    pub since: usize,
}

/// Ranges inserted or modified in the window of the operation log selected
/// by `options.since`, after section filtering.
///
/// A log that cannot be squashed is treated as having no modifications.
pub fn modified_ranges(doc: &Document, config: &CheckConfig, options: ExtractOptions) -> Vec<Range> {
    let squashed = match doc.squash_since(options.since) {
        Ok(Some(tx)) => tx,
        Ok(None) => return Vec::new(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to squash operation log, treating document as unmodified");
            return Vec::new();
        }
    };

    let boundary = doc.document_range().end();
    let mut candidates = Vec::new();
    let mut offset = 0;

    for op in squashed.ops() {
        if offset > boundary {
            break;
        }
        match op {
            Operation::Retain(n) => offset += n,
            Operation::Replace { remove, insert } => {
                let inserted = insert.len();
                if inserted > 0 && (!options.only_pure_insertions || remove.is_empty()) {
                    candidates.push(Range::new(offset, (offset + inserted).min(boundary)));
                }
                offset += inserted;
            }
        }
    }

    let mut ranges = if options.only_content_ranges {
        content_ranges(doc, &candidates, options.covered_nodes_only)
    } else {
        candidates
    };
    ranges.retain(|range| !range.is_collapsed() && passes_section_filter(doc, config, *range));
    ranges
}

/// Content regions owning the modified content ranges, one entry per region.
pub fn modified_content_nodes(
    doc: &Document,
    config: &CheckConfig,
    options: ExtractOptions,
) -> Vec<ContentNode> {
    let options = ExtractOptions {
        only_content_ranges: true,
        ..options
    };
    let nodes = doc.content_nodes();
    let mut seen = HashSet::new();
    let mut owners = Vec::new();

    for range in modified_ranges(doc, config, options) {
        if let Some(node) = nodes.iter().find(|node| node.outer.contains_range(&range)) {
            if seen.insert(*node) {
                owners.push(*node);
            }
        }
    }
    owners.sort_by_key(|node| node.outer);
    owners
}

fn content_ranges(doc: &Document, candidates: &[Range], covered_only: bool) -> Vec<Range> {
    let nodes = doc.content_nodes();
    let mut ranges = Vec::new();

    for candidate in candidates {
        for node in &nodes {
            if candidate.contains_range(&node.outer) {
                ranges.push(node.interior);
            } else if !covered_only {
                if let Some(part) = candidate.intersection(&node.interior) {
                    ranges.push(part);
                }
            }
        }
    }

    ranges.sort();
    ranges.dedup();
    ranges
}

/// Whether `range` survives the configured section exclusions.
pub fn passes_section_filter(doc: &Document, config: &CheckConfig, range: Range) -> bool {
    match doc.nearest_heading_before(range.start()) {
        // A document without any headings has no lead section to ignore.
        None => !(config.ignore_lead_section && doc.has_heading_after(range.start())),
        Some(heading) => {
            if config.ignore_sections.is_empty() {
                return true;
            }
            let title = normalize_heading(&doc.text(heading.interior));
            !config
                .ignore_sections
                .iter()
                .any(|section| normalize_heading(section) == title)
        }
    }
}

/// Case and accent folded heading text with separator runs collapsed.
fn normalize_heading(text: &str) -> String {
    let folded: String = text
        .nfd()
        .filter(|ch| !is_combining_mark(*ch))
        .collect::<String>()
        .to_lowercase();
    SEPARATORS.replace_all(folded.trim(), " ").into_owned()
}
