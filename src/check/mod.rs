pub mod paste;
pub mod tone;

pub use paste::PasteCheck;
pub use tone::ToneCheck;

use crate::action::{Action, Choice};
use crate::config::{AccountClass, CheckConfig, Config, EngineConfig};
use crate::document::{Document, DocumentError, Fragment, Range};
use crate::scheduler::{CheckTextResult, Scheduler};
use crate::tags::TagStore;
use futures::future::BoxFuture;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Why checks are being dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    BeforeSave,
    DocumentChange,
    BranchNodeChange,
    /// Sweep that also reports dismissed findings.
    AllChecks,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Trigger::BeforeSave => "before_save",
            Trigger::DocumentChange => "document_change",
            Trigger::BranchNodeChange => "branch_node_change",
            Trigger::AllChecks => "all_checks",
        };
        f.write_str(name)
    }
}

impl FromStr for Trigger {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "save" | "before_save" => Ok(Trigger::BeforeSave),
            "change" | "document_change" => Ok(Trigger::DocumentChange),
            "branch" | "branch_node_change" => Ok(Trigger::BranchNodeChange),
            "all" | "all_checks" => Ok(Trigger::AllChecks),
            _ => Err(format!("Unknown trigger: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccountKind {
    #[default]
    Registered,
    Anonymous,
    /// Short-lived account; treated as logged out.
    Temporary,
}

impl AccountKind {
    pub fn is_logged_out(&self) -> bool {
        !matches!(self, AccountKind::Registered)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserContext {
    pub account: AccountKind,
    pub edit_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageContext {
    pub title: String,
    pub namespace: i32,
    pub lang: String,
}

/// Everything about the editing session a check's visibility depends on.
#[derive(Debug, Clone)]
pub struct Session {
    pub page: PageContext,
    pub user: UserContext,
    pub enabled_namespaces: Vec<i32>,
    pub force_hidden: bool,
}

impl Session {
    pub fn new(page: PageContext, user: UserContext, engine: &EngineConfig) -> Self {
        Self {
            page,
            user,
            enabled_namespaces: engine.enabled_namespaces.clone(),
            force_hidden: engine.force_hidden,
        }
    }
}

/// Whether a check with `config` may be shown at all in `session`.
pub fn can_be_shown(config: &CheckConfig, session: &Session) -> bool {
    session.enabled_namespaces.contains(&session.page.namespace)
        && !session.force_hidden
        && does_config_match(config, &session.user)
}

pub fn does_config_match(config: &CheckConfig, user: &UserContext) -> bool {
    if !config.enabled {
        return false;
    }
    let account_matches = match config.account {
        AccountClass::Any => true,
        AccountClass::LoggedIn => !user.account.is_logged_out(),
        AccountClass::LoggedOut => user.account.is_logged_out(),
    };
    let under_ceiling = match config.maximum_editcount {
        None | Some(0) => true,
        Some(max) => user.edit_count <= max,
    };
    account_matches && under_ceiling
}

/// Read-only view handed to a check while it runs.
#[derive(Clone, Copy)]
pub struct CheckContext<'a> {
    pub doc: &'a Document,
    pub tags: &'a TagStore,
    /// Scheduler for the check's remote type, when a classifier is configured.
    pub scheduler: Option<&'a Scheduler>,
    /// Log version at the previous branch-node dispatch.
    pub branch_version: usize,
}

/// A classifier answer still in flight for one fragment.
pub struct Deferred {
    pub check: &'static str,
    pub fragment: Fragment,
    pub outcome: BoxFuture<'static, CheckTextResult>,
}

impl Deferred {
    pub async fn settle(self) -> Settled {
        Settled {
            check: self.check,
            fragment: self.fragment,
            outcome: self.outcome.await,
        }
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("check", &self.check)
            .field("fragment", &self.fragment)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct Settled {
    pub check: &'static str,
    pub fragment: Fragment,
    pub outcome: CheckTextResult,
}

#[derive(Debug)]
pub enum Finding {
    Ready(Action),
    Deferred(Deferred),
}

/// In-flight recheck of a surfaced action.
pub struct Recheck {
    pub handle: u64,
    pub outcome: BoxFuture<'static, CheckTextResult>,
}

impl fmt::Debug for Recheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recheck")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

/// What the caller should do after acting on a finding.
#[derive(Debug)]
pub enum ActOutcome {
    Done,
    /// Put the cursor here (always collapsed).
    Focus(Range),
    /// Await the outcome and hand it to `Controller::complete_recheck`.
    Rechecking(Recheck),
}

pub trait Check {
    fn name(&self) -> &'static str;

    fn config(&self) -> &CheckConfig;

    /// Choices offered on this check's actions.
    fn choices(&self) -> &[Choice];

    /// Classifier `check_type` for checks backed by the remote service.
    fn remote_check_type(&self) -> Option<&str> {
        None
    }

    fn handles(&self, trigger: Trigger) -> bool;

    /// Whether `run` reports every current finding of this check for
    /// `trigger`. The controller then retires visible actions the check no
    /// longer reports.
    fn reports_whole_document(&self, _trigger: Trigger) -> bool {
        false
    }

    fn run(&self, trigger: Trigger, ctx: &CheckContext<'_>) -> Vec<Finding>;

    /// Turn a settled classifier outcome into an action. Must return `None`
    /// when the fragment no longer covers any content.
    fn evaluate(&self, _outcome: &CheckTextResult, _fragment: &Fragment, _doc: &Document) -> Option<Action> {
        None
    }

    /// Handle a check-specific choice.
    fn act(&self, _choice: Choice, _action: &Action, _doc: &mut Document) -> Result<ActOutcome, DocumentError> {
        Ok(ActOutcome::Done)
    }
}

pub const BUILTIN_CHECKS: &[&str] = &[paste::NAME, tone::NAME];

/// The built-in checks with their options from `config`.
pub fn builtin(config: &Config) -> Vec<Box<dyn Check>> {
    let paste = PasteCheck::new(config.check_config(paste::NAME, PasteCheck::default_config()));
    let tone = ToneCheck::new(config.check_config(tone::NAME, ToneCheck::default_config()));
    vec![Box::new(paste) as Box<dyn Check>, Box::new(tone)]
}
