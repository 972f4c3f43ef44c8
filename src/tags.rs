use crate::action::Action;
use crate::document::{Document, Fragment, Range};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Dismissed,
    Interacted,
    Pending,
}

/// Session-scoped record of which findings were dismissed, interacted with
/// or are awaiting a recheck.
///
/// Findings with an external id are tracked by id; the rest by the fragments
/// they covered when tagged. Fragments are stored excluding insertions so
/// content typed next to a tagged region is not silently covered by it.
#[derive(Debug, Default)]
pub struct TagStore {
    fragments: HashMap<&'static str, HashMap<Tag, Vec<Fragment>>>,
    ids: HashMap<&'static str, HashMap<Tag, HashSet<String>>>,
}

impl TagStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag(&mut self, tag: Tag, action: &Action, doc: &Document) {
        tracing::debug!(check = action.check(), ?tag, id = ?action.id(), "tagging finding");
        if let Some(id) = action.id() {
            self.ids
                .entry(action.check())
                .or_default()
                .entry(tag)
                .or_default()
                .insert(id.to_string());
            return;
        }

        let tagged = self
            .fragments
            .entry(action.check())
            .or_default()
            .entry(tag)
            .or_default();
        for fragment in action.fragments() {
            if !fragment.is_valid(doc) || tagged.iter().any(|stored| stored.same_as(fragment, doc)) {
                continue;
            }
            tagged.push(fragment.excluding_insertions(doc));
        }
    }

    /// Remove `tag` from the finding. Returns whether anything was removed.
    pub fn untag(&mut self, tag: Tag, action: &Action, doc: &Document) -> bool {
        if let Some(id) = action.id() {
            return self
                .ids
                .get_mut(action.check())
                .and_then(|tags| tags.get_mut(&tag))
                .is_some_and(|ids| ids.remove(id));
        }

        let Some(tagged) = self
            .fragments
            .get_mut(action.check())
            .and_then(|tags| tags.get_mut(&tag))
        else {
            return false;
        };
        let before = tagged.len();
        tagged.retain(|stored| {
            !action
                .fragments()
                .iter()
                .any(|fragment| fragment.same_as(stored, doc))
        });
        tagged.len() != before
    }

    /// A range is tagged when some tagged fragment currently contains it.
    pub fn is_range_tagged(&self, check: &str, tag: Tag, range: Range, doc: &Document) -> bool {
        self.fragments
            .get(check)
            .and_then(|tags| tags.get(&tag))
            .is_some_and(|tagged| {
                tagged
                    .iter()
                    .any(|fragment| fragment.range(doc).contains_range(&range))
            })
    }

    pub fn is_id_tagged(&self, check: &str, tag: Tag, id: &str) -> bool {
        self.ids
            .get(check)
            .and_then(|tags| tags.get(&tag))
            .is_some_and(|ids| ids.contains(id))
    }

    pub fn is_action_tagged(&self, tag: Tag, action: &Action, doc: &Document) -> bool {
        if let Some(id) = action.id() {
            return self.is_id_tagged(action.check(), tag, id);
        }
        let ranges = action.ranges(doc);
        !ranges.is_empty()
            && ranges
                .into_iter()
                .all(|range| self.is_range_tagged(action.check(), tag, range, doc))
    }

    /// Drop every tag, e.g. when the editing session ends.
    pub fn clear(&mut self) {
        self.fragments.clear();
        self.ids.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range_action(doc: &Document, range: Range) -> Action {
        Action::new("tone", vec![Fragment::new(doc, range)], doc)
    }

    #[test]
    fn test_tag_containment() {
        let doc = Document::from_paragraphs(&["A sentence of about thirty chars."]);
        let mut tags = TagStore::new();
        tags.tag(Tag::Dismissed, &range_action(&doc, Range::new(10, 20)), &doc);

        assert!(tags.is_range_tagged("tone", Tag::Dismissed, Range::new(12, 15), &doc));
        assert!(!tags.is_range_tagged("tone", Tag::Dismissed, Range::new(18, 25), &doc));
        assert!(!tags.is_range_tagged("paste", Tag::Dismissed, Range::new(12, 15), &doc));
        assert!(!tags.is_range_tagged("tone", Tag::Interacted, Range::new(12, 15), &doc));
    }

    #[test]
    fn test_tagged_fragment_does_not_grow_with_insertions() {
        let mut doc = Document::from_paragraphs(&["A sentence of about thirty chars."]);
        let mut tags = TagStore::new();
        tags.tag(Tag::Dismissed, &range_action(&doc, Range::new(10, 20)), &doc);

        doc.insert_text(20, "added").unwrap();
        assert!(!tags.is_range_tagged("tone", Tag::Dismissed, Range::new(10, 25), &doc));
        doc.insert_text(1, "moved ").unwrap();
        assert!(tags.is_range_tagged("tone", Tag::Dismissed, Range::new(16, 26), &doc));
    }

    #[test]
    fn test_repeated_tagging_stores_fragment_once() {
        let doc = Document::from_paragraphs(&["A sentence of about thirty chars."]);
        let mut tags = TagStore::new();
        let action = range_action(&doc, Range::new(10, 20));
        for _ in 0..3 {
            tags.tag(Tag::Interacted, &action, &doc);
        }
        tags.tag(Tag::Interacted, &range_action(&doc, Range::new(12, 15)), &doc);

        assert_eq!(tags.fragments["tone"][&Tag::Interacted].len(), 2);
        assert!(tags.untag(Tag::Interacted, &action, &doc));
        assert!(tags.is_range_tagged("tone", Tag::Interacted, Range::new(12, 15), &doc));
        assert!(!tags.is_range_tagged("tone", Tag::Interacted, Range::new(10, 20), &doc));
    }

    #[test]
    fn test_id_tags_ignore_position() {
        let doc = Document::from_paragraphs(&["Pasted text here."]);
        let mut tags = TagStore::new();
        let first = Action::new("paste", vec![Fragment::new(&doc, Range::new(1, 7))], &doc)
            .with_id("paste-7");
        tags.tag(Tag::Dismissed, &first, &doc);

        let elsewhere = Action::new("paste", vec![Fragment::new(&doc, Range::new(8, 12))], &doc)
            .with_id("paste-7");
        assert!(tags.is_action_tagged(Tag::Dismissed, &elsewhere, &doc));
        assert!(tags.is_id_tagged("paste", Tag::Dismissed, "paste-7"));
        assert!(!tags.is_id_tagged("paste", Tag::Dismissed, "paste-8"));
        assert!(!tags.is_range_tagged("paste", Tag::Dismissed, Range::new(1, 7), &doc));
    }

    #[test]
    fn test_untag() {
        let doc = Document::from_paragraphs(&["A sentence of about thirty chars."]);
        let mut tags = TagStore::new();
        let action = range_action(&doc, Range::new(10, 20));
        tags.tag(Tag::Pending, &action, &doc);
        assert!(tags.is_action_tagged(Tag::Pending, &action, &doc));

        assert!(tags.untag(Tag::Pending, &action, &doc));
        assert!(!tags.is_action_tagged(Tag::Pending, &action, &doc));
        assert!(!tags.untag(Tag::Pending, &action, &doc));
    }
}
