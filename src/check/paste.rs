use super::{ActOutcome, Check, CheckContext, Finding, Trigger};
use crate::action::{Action, Choice};
use crate::config::CheckConfig;
use crate::document::{Document, DocumentError, Fragment, Range, PASTE_ANNOTATION};
use crate::extract::passes_section_filter;
use crate::tags::Tag;
use unicode_segmentation::UnicodeSegmentation;

pub const NAME: &str = "paste";

const CHOICES: &[Choice] = &[Choice::Remove, Choice::Edit, Choice::Dismiss(None)];

/// Flags content pasted into the document, one finding per paste.
#[derive(Debug, Clone)]
pub struct PasteCheck {
    config: CheckConfig,
}

impl PasteCheck {
    pub fn new(config: CheckConfig) -> Self {
        Self { config }
    }

    pub fn default_config() -> CheckConfig {
        CheckConfig {
            minimum_characters: 50,
            ..Default::default()
        }
    }

    /// Pasted spans grouped by paste id, in document order of first span.
    fn pasted_spans(&self, trigger: Trigger, ctx: &CheckContext<'_>) -> Vec<(String, Vec<Range>)> {
        let doc = ctx.doc;
        let mut groups: Vec<(String, Vec<Range>)> = Vec::new();

        for (id, range) in doc.annotation_runs(PASTE_ANNOTATION) {
            if trigger != Trigger::AllChecks && ctx.tags.is_id_tagged(NAME, Tag::Dismissed, &id) {
                continue;
            }
            if trigger == Trigger::BeforeSave && ctx.tags.is_id_tagged(NAME, Tag::Interacted, &id) {
                continue;
            }
            let length = doc.text(range).graphemes(true).count();
            if length < self.config.minimum_characters {
                tracing::trace!(%id, length, "pasted span below minimum length");
                continue;
            }
            if !passes_section_filter(doc, &self.config, range) {
                continue;
            }
            match groups.iter_mut().find(|(group, _)| *group == id) {
                Some((_, ranges)) => ranges.push(range),
                None => groups.push((id, vec![range])),
            }
        }
        groups
    }
}

impl Check for PasteCheck {
    fn name(&self) -> &'static str {
        NAME
    }

    fn config(&self) -> &CheckConfig {
        &self.config
    }

    fn choices(&self) -> &[Choice] {
        CHOICES
    }

    fn handles(&self, trigger: Trigger) -> bool {
        matches!(
            trigger,
            Trigger::DocumentChange | Trigger::BeforeSave | Trigger::AllChecks
        )
    }

    /// Every dispatch rescans all pasted content.
    fn reports_whole_document(&self, trigger: Trigger) -> bool {
        trigger != Trigger::AllChecks
    }

    fn run(&self, trigger: Trigger, ctx: &CheckContext<'_>) -> Vec<Finding> {
        let doc = ctx.doc;
        self.pasted_spans(trigger, ctx)
            .into_iter()
            .map(|(id, ranges)| {
                let fragments = ranges.into_iter().map(|range| Fragment::new(doc, range)).collect();
                let action = Action::new(NAME, fragments, doc)
                    .with_id(id)
                    .with_choices(CHOICES)
                    .with_message("This text was pasted. Make sure it is not copied from another source.");
                Finding::Ready(action)
            })
            .collect()
    }

    fn act(&self, choice: Choice, action: &Action, doc: &mut Document) -> Result<ActOutcome, DocumentError> {
        if choice == Choice::Remove {
            let mut ranges = action.ranges(doc);
            ranges.sort();
            // Back to front so earlier ranges stay put.
            for range in ranges.into_iter().rev() {
                doc.remove(range)?;
            }
        }
        Ok(ActOutcome::Done)
    }
}
