//! Minimal linear document model consumed by the engine.
//!
//! A document is a flat sequence of [`Item`]s: node open/close markers and
//! characters. Every committed [`Transaction`] is appended to the operation
//! log, which the change extractor squashes and fragments map through.

pub mod diff;
pub mod fragment;
pub mod markdown;
pub mod range;
pub mod transaction;

pub use fragment::Fragment;
pub use range::Range;
pub use transaction::{Bias, Operation, Transaction};

/// Annotation kind attached to pasted content.
pub const PASTE_ANNOTATION: &str = "paste";

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("transaction spans {expected} items but the document has {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("transaction removes content that does not match the document at offset {offset}")]
    RemovedMismatch { offset: usize },

    #[error("cannot squash operation log: {left} items after one transaction, {right} expected by the next")]
    Squash { left: usize, right: usize },

    #[error("range {range} is outside the document (length {len})")]
    OutOfBounds { range: Range, len: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Paragraph,
    Heading(u8),
    List,
    ListItem,
    BlockQuote,
}

impl NodeKind {
    /// Leaf containers holding inline content.
    pub fn is_content(&self) -> bool {
        matches!(self, NodeKind::Paragraph | NodeKind::Heading(_))
    }

    pub fn is_heading(&self) -> bool {
        matches!(self, NodeKind::Heading(_))
    }
}

/// Marker carried by a character, e.g. pasted content and its paste event id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Annotation {
    pub kind: String,
    pub id: String,
}

impl Annotation {
    pub fn pasted(id: impl Into<String>) -> Self {
        Self {
            kind: PASTE_ANNOTATION.to_string(),
            id: id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Item {
    Open(NodeKind),
    Close(NodeKind),
    Char {
        ch: char,
        annotation: Option<Annotation>,
    },
}

/// A content region: outer range includes the open/close markers, the
/// interior only the inline content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentNode {
    pub kind: NodeKind,
    pub outer: Range,
    pub interior: Range,
}

pub fn text_items(text: &str, annotation: Option<&Annotation>) -> Vec<Item> {
    text.chars()
        .map(|ch| Item::Char {
            ch,
            annotation: annotation.cloned(),
        })
        .collect()
}

pub fn node_items(kind: NodeKind, text: &str) -> Vec<Item> {
    let mut items = Vec::with_capacity(text.len() + 2);
    items.push(Item::Open(kind));
    items.extend(text_items(text, None));
    items.push(Item::Close(kind));
    items
}

pub fn paragraph_items(text: &str) -> Vec<Item> {
    node_items(NodeKind::Paragraph, text)
}

pub fn heading_items(level: u8, text: &str) -> Vec<Item> {
    node_items(NodeKind::Heading(level), text)
}

#[derive(Debug, Clone, Default)]
pub struct Document {
    items: Vec<Item>,
    history: Vec<Transaction>,
}

impl Document {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items,
            history: Vec::new(),
        }
    }

    /// Document made of one paragraph per entry.
    pub fn from_paragraphs(paragraphs: &[&str]) -> Self {
        Self::new(paragraphs.iter().flat_map(|p| paragraph_items(p)).collect())
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Range of the main document, before any internal bookkeeping content.
    pub fn document_range(&self) -> Range {
        Range::new(0, self.items.len())
    }

    /// Number of committed transactions.
    pub fn version(&self) -> usize {
        self.history.len()
    }

    pub fn history(&self) -> &[Transaction] {
        &self.history
    }

    pub fn transactions_since(&self, version: usize) -> &[Transaction] {
        &self.history[version.min(self.history.len())..]
    }

    pub fn commit(&mut self, tx: Transaction) -> Result<(), DocumentError> {
        tx.apply(&mut self.items)?;
        tracing::trace!(version = self.history.len() + 1, "committed transaction");
        self.history.push(tx);
        Ok(())
    }

    /// Squash the log from `version` onwards into one transaction.
    ///
    /// Returns `None` when nothing was committed since `version`.
    pub fn squash_since(&self, version: usize) -> Result<Option<Transaction>, DocumentError> {
        let mut log = self.transactions_since(version).iter().cloned();
        let Some(first) = log.next() else {
            return Ok(None);
        };
        log.try_fold(first, Transaction::compose).map(Some)
    }

    pub fn content_nodes(&self) -> Vec<ContentNode> {
        let mut nodes = Vec::new();
        let mut open: Option<(NodeKind, usize)> = None;
        for (offset, item) in self.items.iter().enumerate() {
            match item {
                Item::Open(kind) if kind.is_content() => open = Some((*kind, offset)),
                Item::Close(kind) if kind.is_content() => {
                    if let Some((open_kind, start)) = open.take() {
                        if open_kind == *kind {
                            nodes.push(ContentNode {
                                kind: open_kind,
                                outer: Range::new(start, offset + 1),
                                interior: Range::new(start + 1, offset),
                            });
                        }
                    }
                }
                _ => {}
            }
        }
        nodes
    }

    /// The content node whose outer range contains `offset`.
    pub fn content_node_at(&self, offset: usize) -> Option<ContentNode> {
        self.content_nodes()
            .into_iter()
            .find(|node| node.outer.contains_offset(offset))
    }

    /// Nearest heading at or before `offset`.
    ///
    /// Single backward scan that stops at the document start.
    pub fn nearest_heading_before(&self, offset: usize) -> Option<ContentNode> {
        if self.items.is_empty() {
            return None;
        }
        let from = offset.min(self.items.len() - 1);
        let start = self.items[..=from]
            .iter()
            .rposition(|item| matches!(item, Item::Open(kind) if kind.is_heading()))?;
        self.content_nodes()
            .into_iter()
            .find(|node| node.outer.start() == start)
    }

    pub fn has_heading_after(&self, offset: usize) -> bool {
        self.items
            .iter()
            .skip(offset)
            .any(|item| matches!(item, Item::Open(kind) if kind.is_heading()))
    }

    /// Plain text of the characters inside `range`.
    pub fn text(&self, range: Range) -> String {
        let end = range.end().min(self.items.len());
        let start = range.start().min(end);
        self.items[start..end]
            .iter()
            .filter_map(|item| match item {
                Item::Char { ch, .. } => Some(*ch),
                _ => None,
            })
            .collect()
    }

    /// Offset of the first character of `needle` inside a content node.
    pub fn find_text(&self, needle: &str) -> Option<usize> {
        self.content_nodes().into_iter().find_map(|node| {
            let text = self.text(node.interior);
            let byte_idx = text.find(needle)?;
            Some(node.interior.start() + text[..byte_idx].chars().count())
        })
    }

    /// Maximal runs of characters annotated with `kind`, as `(id, range)`.
    pub fn annotation_runs(&self, kind: &str) -> Vec<(String, Range)> {
        let mut runs: Vec<(String, Range)> = Vec::new();
        let mut current: Option<(String, usize)> = None;

        for (offset, item) in self.items.iter().enumerate() {
            let id = match item {
                Item::Char {
                    annotation: Some(annotation),
                    ..
                } if annotation.kind == kind => Some(annotation.id.as_str()),
                _ => None,
            };
            match (&current, id) {
                (Some((open_id, _)), Some(id)) if open_id == id => {}
                _ => {
                    if let Some((open_id, start)) = current.take() {
                        runs.push((open_id, Range::new(start, offset)));
                    }
                    current = id.map(|id| (id.to_string(), offset));
                }
            }
        }
        if let Some((open_id, start)) = current {
            runs.push((open_id, Range::new(start, self.items.len())));
        }
        runs
    }

    /// Append to the log without applying, for exercising malformed logs.
    #[cfg(test)]
    pub(crate) fn push_unchecked(&mut self, tx: Transaction) {
        self.history.push(tx);
    }

    fn check_bounds(&self, range: Range) -> Result<(), DocumentError> {
        if range.end() > self.items.len() {
            return Err(DocumentError::OutOfBounds {
                range,
                len: self.items.len(),
            });
        }
        Ok(())
    }

    pub fn insert_items(&mut self, offset: usize, items: Vec<Item>) -> Result<(), DocumentError> {
        self.check_bounds(Range::collapsed(offset))?;
        self.commit(Transaction::insertion(self.items.len(), offset, items))
    }

    pub fn insert_text(&mut self, offset: usize, text: &str) -> Result<(), DocumentError> {
        self.insert_items(offset, text_items(text, None))
    }

    /// Insert text carrying a paste annotation with the given event id.
    pub fn insert_pasted(&mut self, offset: usize, text: &str, id: &str) -> Result<(), DocumentError> {
        self.insert_items(offset, text_items(text, Some(&Annotation::pasted(id))))
    }

    pub fn insert_paragraph(&mut self, offset: usize, text: &str) -> Result<(), DocumentError> {
        self.insert_items(offset, paragraph_items(text))
    }

    pub fn replace_items(&mut self, range: Range, items: Vec<Item>) -> Result<(), DocumentError> {
        let tx = Transaction::replacement(&self.items, range.start(), range.end(), items)?;
        self.commit(tx)
    }

    pub fn replace_text(&mut self, range: Range, text: &str) -> Result<(), DocumentError> {
        self.replace_items(range, text_items(text, None))
    }

    pub fn remove(&mut self, range: Range) -> Result<(), DocumentError> {
        self.replace_items(range, Vec::new())
    }
}
