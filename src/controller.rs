//! Dispatch of checks and lifecycle of the findings they surface.

use crate::action::{Action, ActionMode, Choice};
use crate::check::{can_be_shown, ActOutcome, Check, CheckContext, Deferred, Finding, Recheck, Session, Settled, Trigger};
use crate::document::{Document, DocumentError};
use crate::scheduler::{CheckTextResult, Classifier, RequestContext, Scheduler, SchedulerSettings};
use crate::tags::{Tag, TagStore};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ActError {
    #[error("no action with handle {0}")]
    UnknownAction(u64),

    #[error("action {handle} does not offer '{choice}'")]
    UnsupportedChoice { handle: u64, choice: Choice },

    #[error("check '{0}' has no classifier to recheck with")]
    NoScheduler(&'static str),

    #[error("action {0} no longer covers any content")]
    Collapsed(u64),

    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// How a recheck settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecheckResult {
    /// The finding no longer applies and was removed.
    Resolved,
    /// The finding still applies; the action is shown normally again.
    StillApplies,
    /// No answer from the classifier; the action is left as it was.
    Unavailable,
    /// The action disappeared while the recheck was in flight.
    Gone,
}

pub struct Controller {
    session: Session,
    checks: Vec<Box<dyn Check>>,
    schedulers: HashMap<String, Scheduler>,
    tags: TagStore,
    actions: Vec<Action>,
    next_handle: u64,
    branch_version: usize,
}

impl Controller {
    /// Keep the checks that can be shown in `session` and give every remote
    /// check type its own scheduler when a classifier is available.
    pub fn new(session: Session, checks: Vec<Box<dyn Check>>, classifier: Option<Arc<dyn Classifier>>) -> Self {
        Self::with_scheduler_settings(session, checks, classifier, SchedulerSettings::default())
    }

    pub fn with_scheduler_settings(
        session: Session,
        checks: Vec<Box<dyn Check>>,
        classifier: Option<Arc<dyn Classifier>>,
        settings: SchedulerSettings,
    ) -> Self {
        let checks: Vec<Box<dyn Check>> = checks
            .into_iter()
            .filter(|check| {
                let shown = can_be_shown(check.config(), &session);
                if !shown {
                    tracing::debug!(check = check.name(), "check not applicable in this session");
                }
                shown
            })
            .collect();

        let mut schedulers = HashMap::new();
        if let Some(classifier) = classifier {
            for check_type in checks.iter().filter_map(|check| check.remote_check_type()) {
                let context = RequestContext {
                    page_title: session.page.title.clone(),
                    lang: session.page.lang.clone(),
                    check_type: check_type.to_string(),
                };
                schedulers
                    .entry(check_type.to_string())
                    .or_insert_with(|| Scheduler::with_settings(Arc::clone(&classifier), context, settings));
            }
        }

        Self {
            session,
            checks,
            schedulers,
            tags: TagStore::new(),
            actions: Vec::new(),
            next_handle: 0,
            branch_version: 0,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn check_names(&self) -> Vec<&'static str> {
        self.checks.iter().map(|check| check.name()).collect()
    }

    /// Currently surfaced actions, in the order they were surfaced.
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn action(&self, handle: u64) -> Option<&Action> {
        self.actions.iter().find(|action| action.handle() == handle)
    }

    pub fn tags(&self) -> &TagStore {
        &self.tags
    }

    /// Forget every finding and tag; the session is over.
    pub fn end_session(&mut self) {
        self.actions.clear();
        self.tags.clear();
        self.branch_version = 0;
    }

    /// Run every check interested in `trigger`. Ready findings are merged
    /// into the visible set right away; classifier-backed ones are returned
    /// for the caller to settle and pass to [`Controller::resolve`].
    pub fn dispatch(&mut self, trigger: Trigger, doc: &Document) -> Vec<Deferred> {
        self.refresh(doc);

        let (ready, deferred) = self.collect(trigger, doc);
        if trigger == Trigger::BranchNodeChange {
            self.branch_version = doc.version();
        }
        tracing::debug!(%trigger, ready = ready.len(), deferred = deferred.len(), "dispatched checks");

        let rescanned: Vec<&'static str> = self
            .checks
            .iter()
            .filter(|check| check.handles(trigger) && check.reports_whole_document(trigger))
            .map(|check| check.name())
            .collect();
        self.retire(&rescanned, &ready, doc);

        for action in ready {
            self.merge(action, doc);
        }
        deferred
    }

    /// Turn a settled classifier outcome into a visible action, if any.
    /// Returns the handle of the matching action.
    pub fn resolve(&mut self, settled: Settled, doc: &Document) -> Option<u64> {
        let action = self
            .checks
            .iter()
            .find(|check| check.name() == settled.check)?
            .evaluate(&settled.outcome, &settled.fragment, doc)?;
        self.merge(action, doc)
    }

    /// Dispatch `trigger` and wait for every deferred finding.
    pub async fn run(&mut self, trigger: Trigger, doc: &Document) -> &[Action] {
        let deferred = self.dispatch(trigger, doc);
        let settled = join_all(deferred.into_iter().map(Deferred::settle)).await;
        for outcome in settled {
            self.resolve(outcome, doc);
        }
        self.refresh(doc);
        &self.actions
    }

    pub async fn on_before_save(&mut self, doc: &Document) -> &[Action] {
        self.run(Trigger::BeforeSave, doc).await
    }

    pub async fn on_document_change(&mut self, doc: &Document) -> &[Action] {
        self.run(Trigger::DocumentChange, doc).await
    }

    pub async fn on_branch_node_change(&mut self, doc: &Document) -> &[Action] {
        self.run(Trigger::BranchNodeChange, doc).await
    }

    /// Every current violation, dismissed ones included. The visible set is
    /// left untouched.
    pub async fn all_violations(&self, doc: &Document) -> Vec<Action> {
        let (mut violations, deferred) = self.collect(Trigger::AllChecks, doc);
        for settled in join_all(deferred.into_iter().map(Deferred::settle)).await {
            let action = self
                .checks
                .iter()
                .find(|check| check.name() == settled.check)
                .and_then(|check| check.evaluate(&settled.outcome, &settled.fragment, doc));
            violations.extend(action);
        }
        violations.retain(|action| action.is_valid(doc));
        violations
    }

    /// Act on a surfaced action. The action is always tagged as interacted
    /// with first.
    pub fn act(&mut self, handle: u64, choice: Choice, doc: &mut Document) -> Result<ActOutcome, ActError> {
        let index = self.position(handle)?;
        let action = self.actions[index].clone();
        if !action.choices().iter().any(|offered| offered.name() == choice.name()) {
            return Err(ActError::UnsupportedChoice { handle, choice });
        }

        self.tags.tag(Tag::Interacted, &action, doc);

        match choice {
            Choice::Dismiss(reason) => {
                tracing::info!(check = action.check(), handle, ?reason, "finding dismissed");
                self.tags.tag(Tag::Dismissed, &action, doc);
                self.recompute(doc);
                Ok(ActOutcome::Done)
            }
            Choice::Edit => {
                let range = action.covering_range(doc).ok_or(ActError::Collapsed(handle))?;
                Ok(ActOutcome::Focus(range.collapse_to_end()))
            }
            Choice::Recheck => {
                let scheduler = self
                    .checks
                    .iter()
                    .find(|check| check.name() == action.check())
                    .and_then(|check| check.remote_check_type())
                    .and_then(|check_type| self.schedulers.get(check_type))
                    .ok_or(ActError::NoScheduler(action.check()))?;
                let outcome = scheduler.check_text_paced(&action.text(doc));

                self.tags.tag(Tag::Pending, &action, doc);
                self.actions[index].set_mode(ActionMode::Rechecking);
                Ok(ActOutcome::Rechecking(Recheck { handle, outcome }))
            }
            other => {
                let outcome = match self.checks.iter().find(|check| check.name() == action.check()) {
                    Some(check) => check.act(other, &action, doc)?,
                    None => ActOutcome::Done,
                };
                self.refresh(doc);
                Ok(outcome)
            }
        }
    }

    /// Apply the outcome of a recheck started by [`Controller::act`].
    pub fn complete_recheck(&mut self, handle: u64, outcome: CheckTextResult, doc: &Document) -> RecheckResult {
        let Ok(index) = self.position(handle) else {
            return RecheckResult::Gone;
        };
        let snapshot = self.actions[index].clone();
        self.tags.untag(Tag::Pending, &snapshot, doc);

        if !snapshot.is_valid(doc) {
            self.actions.remove(index);
            return RecheckResult::Gone;
        }
        if matches!(outcome, Ok(None) | Err(_)) {
            self.actions[index].set_mode(ActionMode::Normal);
            return RecheckResult::Unavailable;
        }

        let still_applies = self
            .checks
            .iter()
            .find(|check| check.name() == snapshot.check())
            .zip(snapshot.fragments().first())
            .and_then(|(check, fragment)| check.evaluate(&outcome, fragment, doc))
            .is_some();

        if still_applies {
            let action = &mut self.actions[index];
            action.set_stale(false);
            action.set_mode(ActionMode::Normal);
            action.refresh_snapshot(doc);
            RecheckResult::StillApplies
        } else {
            tracing::debug!(handle, "recheck cleared finding");
            self.actions.remove(index);
            RecheckResult::Resolved
        }
    }

    fn position(&self, handle: u64) -> Result<usize, ActError> {
        self.actions
            .iter()
            .position(|action| action.handle() == handle)
            .ok_or(ActError::UnknownAction(handle))
    }

    fn collect(&self, trigger: Trigger, doc: &Document) -> (Vec<Action>, Vec<Deferred>) {
        let mut ready = Vec::new();
        let mut deferred = Vec::new();

        for check in self.checks.iter().filter(|check| check.handles(trigger)) {
            let ctx = CheckContext {
                doc,
                tags: &self.tags,
                scheduler: check
                    .remote_check_type()
                    .and_then(|check_type| self.schedulers.get(check_type)),
                branch_version: self.branch_version,
            };
            for finding in check.run(trigger, &ctx) {
                match finding {
                    Finding::Ready(action) => ready.push(action),
                    Finding::Deferred(pending) => deferred.push(pending),
                }
            }
        }
        (ready, deferred)
    }

    /// Drop collapsed actions and mark the ones whose text changed as stale.
    fn refresh(&mut self, doc: &Document) {
        self.actions.retain(|action| {
            let valid = action.is_valid(doc);
            if !valid {
                tracing::debug!(handle = action.handle(), "discarding collapsed action");
            }
            valid
        });
        for action in &mut self.actions {
            if !action.is_stale() && action.has_drifted(doc) {
                action.set_stale(true);
                if action.mode() == ActionMode::Normal {
                    action.set_mode(ActionMode::Revising);
                }
            }
        }
    }

    /// Drop dismissed actions from the visible set.
    fn recompute(&mut self, doc: &Document) {
        let tags = &self.tags;
        self.actions
            .retain(|action| !tags.is_action_tagged(Tag::Dismissed, action, doc));
        self.refresh(doc);
    }

    /// Drop actions of `rescanned` checks that are no longer reported.
    /// Actions awaiting a recheck are left to `complete_recheck`.
    fn retire(&mut self, rescanned: &[&str], reported: &[Action], doc: &Document) {
        self.actions.retain(|action| {
            if !rescanned.contains(&action.check()) || action.mode() == ActionMode::Rechecking {
                return true;
            }
            let still_reported = reported.iter().any(|finding| action.same_finding(finding, doc));
            if !still_reported {
                tracing::debug!(handle = action.handle(), check = action.check(), "finding no longer reported");
            }
            still_reported
        });
    }

    fn merge(&mut self, mut action: Action, doc: &Document) -> Option<u64> {
        if !action.is_valid(doc) {
            return None;
        }
        if self.tags.is_action_tagged(Tag::Dismissed, &action, doc) {
            tracing::debug!(check = action.check(), "finding was dismissed, not surfacing");
            return None;
        }
        if let Some(existing) = self.actions.iter().find(|existing| existing.same_finding(&action, doc)) {
            return Some(existing.handle());
        }
        if self
            .actions
            .iter()
            .any(|existing| existing.is_stale() && existing.overlaps(&action, doc))
        {
            tracing::debug!(check = action.check(), "finding overlaps a stale action, not surfacing");
            return None;
        }

        self.next_handle += 1;
        action.set_handle(self.next_handle);
        action.refresh_snapshot(doc);
        self.actions.push(action);
        Some(self.next_handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::DismissReason;
    use crate::check::{PageContext, PasteCheck, ToneCheck, UserContext};
    use crate::config::{CheckConfig, EngineConfig};
    use crate::document::{Fragment, Range};
    use crate::scheduler::testing::MockClassifier;

    fn session() -> Session {
        let page = PageContext {
            title: "Cats".to_string(),
            namespace: 0,
            lang: "en".to_string(),
        };
        Session::new(page, UserContext::default(), &EngineConfig::default())
    }

    fn paste_controller(minimum: usize) -> Controller {
        let paste = PasteCheck::new(CheckConfig {
            minimum_characters: minimum,
            ..Default::default()
        });
        Controller::new(session(), vec![Box::new(paste) as Box<dyn Check>], None)
    }

    fn tone_controller() -> (Controller, Arc<MockClassifier>) {
        let mock = Arc::new(MockClassifier::default());
        let tone = ToneCheck::new(CheckConfig::default());
        let controller = Controller::new(
            session(),
            vec![Box::new(tone) as Box<dyn Check>],
            Some(Arc::clone(&mock) as Arc<dyn Classifier>),
        );
        (controller, mock)
    }

    #[test]
    fn test_inapplicable_checks_are_filtered_once() {
        let disabled = PasteCheck::new(CheckConfig {
            enabled: false,
            ..Default::default()
        });
        let tone = ToneCheck::new(CheckConfig::default());
        let controller = Controller::new(session(), vec![Box::new(disabled) as Box<dyn Check>, Box::new(tone)], None);
        assert_eq!(controller.check_names(), vec!["tone"]);
        assert!(controller.schedulers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pasted_sentence_dismissed_stays_dismissed() {
        let mut doc = Document::from_paragraphs(&["The cat sat."]);
        let full_stop = doc.find_text(".").unwrap();
        doc.insert_pasted(full_stop, " on the mat, which was disgusting", "paste-1")
            .unwrap();
        let mut controller = paste_controller(10);

        let actions = controller.on_document_change(&doc).await;
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].text(&doc), " on the mat, which was disgusting");
        let handle = actions[0].handle();

        let outcome = controller
            .act(handle, Choice::Dismiss(Some(DismissReason::Other)), &mut doc)
            .unwrap();
        assert!(matches!(outcome, ActOutcome::Done));
        assert!(controller.actions().is_empty());
        assert!(controller.tags().is_id_tagged("paste", Tag::Dismissed, "paste-1"));

        assert!(controller.on_branch_node_change(&doc).await.is_empty());
        assert!(controller.on_document_change(&doc).await.is_empty());
        assert_eq!(controller.all_violations(&doc).await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tone_finding_dismissed_stays_dismissed() {
        let mut doc = Document::from_paragraphs(&["The cat sat."]);
        let full_stop = doc.find_text(".").unwrap();
        doc.insert_text(full_stop, " on the mat, which was bad").unwrap();
        let (mut controller, mock) = tone_controller();

        let actions = controller.on_branch_node_change(&doc).await;
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].text(&doc), "The cat sat on the mat, which was bad.");
        let handle = actions[0].handle();

        controller
            .act(handle, Choice::Dismiss(Some(DismissReason::Other)), &mut doc)
            .unwrap();
        assert!(controller.actions().is_empty());

        // Nothing changed since the last branch dispatch.
        assert!(controller.on_branch_node_change(&doc).await.is_empty());
        // Still modified since the session began, but dismissed.
        assert!(controller.on_before_save(&doc).await.is_empty());
        assert_eq!(controller.all_violations(&doc).await.len(), 1);
        assert_eq!(mock.batch_sizes(), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_findings_are_merged_not_duplicated() {
        let mut doc = Document::from_paragraphs(&["Calm."]);
        doc.insert_pasted(1, "copied text ", "p1").unwrap();
        let mut controller = paste_controller(1);

        let first = controller.on_document_change(&doc).await[0].handle();
        let second = controller.on_before_save(&doc).await;
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].handle(), first);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trimmed_paste_is_withdrawn() {
        let mut doc = Document::from_paragraphs(&["Intro."]);
        doc.insert_pasted(1, "a pasted sentence of text. ", "p1").unwrap();
        let mut controller = paste_controller(10);
        let handle = controller.on_document_change(&doc).await[0].handle();

        let pasted = doc.find_text("a pasted").unwrap();
        doc.remove(Range::new(pasted, pasted + 24)).unwrap();
        assert_eq!(controller.action(handle).unwrap().text(&doc), "t. ");

        assert!(controller.all_violations(&doc).await.is_empty());
        assert!(controller.on_document_change(&doc).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_paste_keeps_its_handle() {
        let mut doc = Document::from_paragraphs(&["Intro."]);
        doc.insert_pasted(1, "copied text ", "p1").unwrap();
        let mut controller = paste_controller(1);
        let handle = controller.on_document_change(&doc).await[0].handle();

        let full_stop = doc.find_text(".").unwrap();
        doc.insert_pasted(full_stop, " more copied text", "p2").unwrap();
        let actions = controller.on_document_change(&doc).await;
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].handle(), handle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interacted_paste_not_reported_before_save() {
        let mut doc = Document::from_paragraphs(&["Intro."]);
        doc.insert_pasted(1, "copied text ", "p1").unwrap();
        let mut controller = paste_controller(1);
        let handle = controller.on_document_change(&doc).await[0].handle();

        controller.act(handle, Choice::Edit, &mut doc).unwrap();
        assert!(controller.on_before_save(&doc).await.is_empty());
        assert_eq!(controller.all_violations(&doc).await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_focuses_collapsed_end() {
        let mut doc = Document::from_paragraphs(&["Intro."]);
        doc.insert_pasted(1, "copied text ", "p1").unwrap();
        let mut controller = paste_controller(1);
        let handle = controller.on_document_change(&doc).await[0].handle();

        match controller.act(handle, Choice::Edit, &mut doc).unwrap() {
            ActOutcome::Focus(range) => assert_eq!(range, Range::collapsed(13)),
            other => panic!("unexpected outcome {:?}", other),
        }
        let action = controller.action(handle).unwrap();
        assert!(controller.tags().is_action_tagged(Tag::Interacted, action, &doc));
        assert!(!controller.tags().is_action_tagged(Tag::Dismissed, action, &doc));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_discards_action() {
        let mut doc = Document::from_paragraphs(&["Intro."]);
        doc.insert_pasted(1, "copied text ", "p1").unwrap();
        let mut controller = paste_controller(1);
        let handle = controller.on_document_change(&doc).await[0].handle();

        controller.act(handle, Choice::Remove, &mut doc).unwrap();
        assert_eq!(doc.text(doc.document_range()), "Intro.");
        assert!(controller.actions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsupported_choice_is_rejected() {
        let mut doc = Document::from_paragraphs(&["Intro."]);
        doc.insert_pasted(1, "copied text ", "p1").unwrap();
        let mut controller = paste_controller(1);
        let handle = controller.on_document_change(&doc).await[0].handle();

        assert!(matches!(
            controller.act(handle, Choice::Recheck, &mut doc),
            Err(ActError::UnsupportedChoice { .. })
        ));
        assert!(matches!(
            controller.act(99, Choice::Edit, &mut doc),
            Err(ActError::UnknownAction(99))
        ));
        assert!(!controller
            .tags()
            .is_id_tagged("paste", Tag::Interacted, "p1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_edited_action_goes_stale() {
        let mut doc = Document::from_paragraphs(&["Calm."]);
        doc.insert_text(1, "This is bad. ").unwrap();
        let (mut controller, _mock) = tone_controller();
        let handle = controller.on_branch_node_change(&doc).await[0].handle();

        doc.insert_text(9, "very ").unwrap();
        let actions = controller.on_branch_node_change(&doc).await;
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].handle(), handle);
        assert!(actions[0].is_stale());
        assert_eq!(actions[0].mode(), ActionMode::Revising);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_action_blocks_overlapping_findings() {
        let mut doc = Document::from_paragraphs(&["A fairly long paragraph of text."]);
        let mut controller = paste_controller(1);
        let stale = Action::new("tone", vec![Fragment::new(&doc, Range::new(1, 10))], &doc);
        controller.merge(stale, &doc);
        doc.insert_text(3, "x").unwrap();
        controller.refresh(&doc);
        assert!(controller.actions()[0].is_stale());

        let overlapping = Action::new("tone", vec![Fragment::new(&doc, Range::new(5, 20))], &doc);
        assert_eq!(controller.merge(overlapping, &doc), None);
        let apart = Action::new("tone", vec![Fragment::new(&doc, Range::new(20, 25))], &doc);
        assert!(controller.merge(apart, &doc).is_some());
        assert_eq!(controller.actions().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recheck_resolves_fixed_finding() {
        let mut doc = Document::from_paragraphs(&["Calm."]);
        doc.insert_text(1, "This is bad. ").unwrap();
        let (mut controller, _mock) = tone_controller();
        let handle = controller.on_branch_node_change(&doc).await[0].handle();

        let bad = doc.find_text("bad").unwrap();
        doc.replace_text(Range::new(bad, bad + 3), "fine").unwrap();
        controller.on_branch_node_change(&doc).await;
        assert!(controller.action(handle).unwrap().is_stale());

        let ActOutcome::Rechecking(recheck) = controller.act(handle, Choice::Recheck, &mut doc).unwrap() else {
            panic!("expected a recheck");
        };
        assert_eq!(controller.action(handle).unwrap().mode(), ActionMode::Rechecking);
        let action = controller.action(handle).unwrap();
        assert!(controller.tags().is_action_tagged(Tag::Pending, action, &doc));

        let outcome = recheck.outcome.await;
        assert_eq!(
            controller.complete_recheck(recheck.handle, outcome, &doc),
            RecheckResult::Resolved
        );
        assert!(controller.actions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_recheck_keeps_valid_finding() {
        let mut doc = Document::from_paragraphs(&["Calm."]);
        doc.insert_text(1, "This is bad. ").unwrap();
        let (mut controller, _mock) = tone_controller();
        let handle = controller.on_branch_node_change(&doc).await[0].handle();

        doc.insert_text(1, "Still ").unwrap();
        controller.on_branch_node_change(&doc).await;

        let ActOutcome::Rechecking(recheck) = controller.act(handle, Choice::Recheck, &mut doc).unwrap() else {
            panic!("expected a recheck");
        };
        let outcome = recheck.outcome.await;
        assert_eq!(
            controller.complete_recheck(handle, outcome, &doc),
            RecheckResult::StillApplies
        );

        let action = controller.action(handle).unwrap();
        assert!(!action.is_stale());
        assert_eq!(action.mode(), ActionMode::Normal);
        assert!(!controller.tags().is_action_tagged(Tag::Pending, action, &doc));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deleted_paragraph_is_not_surfaced() {
        let mut doc = Document::from_paragraphs(&["Calm.", "Other."]);
        doc.insert_text(1, "This is bad. ").unwrap();
        let (mut controller, _mock) = tone_controller();

        let deferred = controller.dispatch(Trigger::BranchNodeChange, &doc);
        assert_eq!(deferred.len(), 1);
        // The paragraph goes away while the classifier is busy.
        let paragraph = doc.content_nodes()[0].outer;
        doc.remove(paragraph).unwrap();

        for pending in deferred {
            let settled = pending.settle().await;
            assert_eq!(controller.resolve(settled, &doc), None);
        }
        assert!(controller.actions().is_empty());
    }
}
