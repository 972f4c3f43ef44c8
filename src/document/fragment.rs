use super::{Bias, Document, Range};

/// Live handle on a range of a [`Document`].
///
/// A fragment remembers the document version it was taken at and maps its
/// range through every transaction committed since, so it follows the text
/// it covers as the document changes. Once its content has been removed the
/// range stays collapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    range: Range,
    version: usize,
    exclude_insertions: bool,
}

impl Fragment {
    pub fn new(doc: &Document, range: Range) -> Self {
        Self {
            range,
            version: doc.version(),
            exclude_insertions: false,
        }
    }

    /// Copy of this fragment, rebased on the current version, that does not
    /// grow when content is inserted at its boundaries.
    pub fn excluding_insertions(&self, doc: &Document) -> Self {
        Self {
            range: self.range(doc),
            version: doc.version(),
            exclude_insertions: true,
        }
    }

    pub fn excludes_insertions(&self) -> bool {
        self.exclude_insertions
    }

    /// Current range in `doc`.
    pub fn range(&self, doc: &Document) -> Range {
        let (start_bias, end_bias) = if self.exclude_insertions {
            (Bias::Right, Bias::Left)
        } else {
            (Bias::Left, Bias::Right)
        };

        let mut start = self.range.start();
        let mut end = self.range.end();
        for tx in doc.transactions_since(self.version) {
            if start == end {
                start = tx.map_offset(start, Bias::Left);
                end = start;
                continue;
            }
            start = tx.map_offset(start, start_bias);
            end = tx.map_offset(end, end_bias);
            if end < start {
                start = end;
            }
        }
        Range::new(start, end)
    }

    /// Bring the stored range up to date with `doc`.
    pub fn rebase(&mut self, doc: &Document) {
        self.range = self.range(doc);
        self.version = doc.version();
    }

    /// False once everything the fragment covered has been removed.
    pub fn is_valid(&self, doc: &Document) -> bool {
        !self.range(doc).is_collapsed()
    }

    /// Fragments are equal when they currently cover the same range.
    pub fn same_as(&self, other: &Fragment, doc: &Document) -> bool {
        self.range(doc) == other.range(doc)
    }

    pub fn text(&self, doc: &Document) -> String {
        doc.text(self.range(doc))
    }
}
