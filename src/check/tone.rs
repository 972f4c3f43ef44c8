use super::{Check, CheckContext, Deferred, Finding, Trigger};
use crate::action::{Action, Choice};
use crate::config::CheckConfig;
use crate::document::{Document, Fragment};
use crate::extract::{modified_content_nodes, ExtractOptions};
use crate::scheduler::CheckTextResult;
use crate::tags::Tag;

pub const NAME: &str = "tone";

const CHOICES: &[Choice] = &[Choice::Edit, Choice::Recheck, Choice::Dismiss(None)];

/// Sends each modified paragraph to the tone classifier and flags the ones
/// it considers non-neutral.
#[derive(Debug, Clone)]
pub struct ToneCheck {
    config: CheckConfig,
}

impl ToneCheck {
    pub fn new(config: CheckConfig) -> Self {
        Self { config }
    }

    pub fn default_config() -> CheckConfig {
        CheckConfig::default()
    }
}

impl Check for ToneCheck {
    fn name(&self) -> &'static str {
        NAME
    }

    fn config(&self) -> &CheckConfig {
        &self.config
    }

    fn choices(&self) -> &[Choice] {
        CHOICES
    }

    fn remote_check_type(&self) -> Option<&str> {
        Some(NAME)
    }

    fn handles(&self, trigger: Trigger) -> bool {
        matches!(
            trigger,
            Trigger::BeforeSave | Trigger::BranchNodeChange | Trigger::AllChecks
        )
    }

    fn run(&self, trigger: Trigger, ctx: &CheckContext<'_>) -> Vec<Finding> {
        let Some(scheduler) = ctx.scheduler else {
            tracing::debug!("no classifier configured, skipping tone check");
            return Vec::new();
        };
        let doc = ctx.doc;
        let options = ExtractOptions {
            only_pure_insertions: self.config.only_pure_insertions,
            since: match trigger {
                Trigger::BranchNodeChange => ctx.branch_version,
                _ => 0,
            },
            ..Default::default()
        };

        modified_content_nodes(doc, &self.config, options)
            .into_iter()
            .filter(|node| {
                let range = node.interior;
                let interacted = trigger == Trigger::BeforeSave
                    && ctx.tags.is_range_tagged(NAME, Tag::Interacted, range, doc);
                let dismissed = trigger != Trigger::AllChecks
                    && ctx.tags.is_range_tagged(NAME, Tag::Dismissed, range, doc);
                !(interacted || dismissed)
            })
            .map(|node| {
                let text = doc.text(node.interior);
                tracing::debug!(range = %node.interior, "submitting paragraph for tone check");
                Finding::Deferred(Deferred {
                    check: NAME,
                    fragment: Fragment::new(doc, node.interior),
                    outcome: scheduler.check_text(&text),
                })
            })
            .collect()
    }

    fn evaluate(&self, outcome: &CheckTextResult, fragment: &Fragment, doc: &Document) -> Option<Action> {
        if !fragment.is_valid(doc) {
            tracing::debug!("checked paragraph is gone, dropping outcome");
            return None;
        }
        match outcome {
            Ok(Some(prediction)) if prediction.prediction => Some(
                Action::new(NAME, vec![fragment.clone()], doc)
                    .with_choices(CHOICES)
                    .with_message("This text may not be written in a neutral tone."),
            ),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(error = %e, "tone check failed, treating as no finding");
                None
            }
        }
    }
}
