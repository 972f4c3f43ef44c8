use crate::document::{Document, Fragment, Range};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Display state of a surfaced finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionMode {
    #[default]
    Normal,
    /// The user is editing the flagged text.
    Revising,
    /// A recheck of the flagged text is in flight.
    Rechecking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DismissReason {
    Irrelevant,
    Appropriate,
    Uncertain,
    Other,
}

impl FromStr for DismissReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "irrelevant" => Ok(DismissReason::Irrelevant),
            "appropriate" => Ok(DismissReason::Appropriate),
            "uncertain" => Ok(DismissReason::Uncertain),
            "other" => Ok(DismissReason::Other),
            _ => Err(format!("Unknown dismiss reason: {}", s)),
        }
    }
}

/// What the user can do with a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Choice {
    Dismiss(Option<DismissReason>),
    Edit,
    Recheck,
    /// Delete the flagged content.
    Remove,
}

impl Choice {
    pub fn name(&self) -> &'static str {
        match self {
            Choice::Dismiss(_) => "dismiss",
            Choice::Edit => "edit",
            Choice::Recheck => "recheck",
            Choice::Remove => "remove",
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A finding produced by a check, bound to one or more fragments.
#[derive(Debug, Clone)]
pub struct Action {
    handle: u64,
    id: Option<String>,
    check: &'static str,
    fragments: Vec<Fragment>,
    choices: Vec<Choice>,
    message: String,
    mode: ActionMode,
    stale: bool,
    snapshot: String,
}

impl Action {
    pub fn new(check: &'static str, fragments: Vec<Fragment>, doc: &Document) -> Self {
        let snapshot = fragments
            .iter()
            .map(|fragment| fragment.text(doc))
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            handle: 0,
            id: None,
            check,
            fragments,
            choices: Vec::new(),
            message: String::new(),
            mode: ActionMode::Normal,
            stale: false,
            snapshot,
        }
    }

    /// Track this finding by an externally supplied id instead of position.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_choices(mut self, choices: &[Choice]) -> Self {
        self.choices = choices.to_vec();
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Controller-assigned handle; 0 until the action is surfaced.
    pub fn handle(&self) -> u64 {
        self.handle
    }

    pub(crate) fn set_handle(&mut self, handle: u64) {
        self.handle = handle;
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn check(&self) -> &'static str {
        self.check
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn mode(&self) -> ActionMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ActionMode) {
        self.mode = mode;
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn set_stale(&mut self, stale: bool) {
        self.stale = stale;
    }

    /// Current ranges of the fragments that still cover content.
    pub fn ranges(&self, doc: &Document) -> Vec<Range> {
        self.fragments
            .iter()
            .map(|fragment| fragment.range(doc))
            .filter(|range| !range.is_collapsed())
            .collect()
    }

    /// Smallest range covering every live fragment.
    pub fn covering_range(&self, doc: &Document) -> Option<Range> {
        self.ranges(doc).into_iter().reduce(|a, b| a.union(&b))
    }

    pub fn text(&self, doc: &Document) -> String {
        self.fragments
            .iter()
            .map(|fragment| fragment.text(doc))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// False once every fragment has collapsed or been removed.
    pub fn is_valid(&self, doc: &Document) -> bool {
        self.fragments.iter().any(|fragment| fragment.is_valid(doc))
    }

    /// The flagged text differs from what it was when surfaced.
    pub fn has_drifted(&self, doc: &Document) -> bool {
        self.text(doc) != self.snapshot
    }

    /// Take the current text as the new reference for drift detection.
    pub(crate) fn refresh_snapshot(&mut self, doc: &Document) {
        self.snapshot = self.text(doc);
    }

    /// Both describe the same finding: same id when present, otherwise the
    /// same current fragment ranges.
    pub fn same_finding(&self, other: &Action, doc: &Document) -> bool {
        if self.check != other.check {
            return false;
        }
        match (&self.id, &other.id) {
            (Some(a), Some(b)) => a == b,
            (None, None) => {
                self.fragments.len() == other.fragments.len()
                    && self
                        .fragments
                        .iter()
                        .zip(&other.fragments)
                        .all(|(a, b)| a.same_as(b, doc))
            }
            _ => false,
        }
    }

    pub fn overlaps(&self, other: &Action, doc: &Document) -> bool {
        let theirs = other.ranges(doc);
        self.ranges(doc)
            .iter()
            .any(|mine| theirs.iter().any(|range| mine.overlaps(range)))
    }
}
