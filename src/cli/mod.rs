//! Replaying an edit between two Markdown files through the controller.

pub mod output;

use crate::action::Action;
use crate::check::{AccountKind, PageContext, Session, Trigger, UserContext};
use crate::config::Config;
use crate::controller::Controller;
use crate::document::{diff, markdown, Document};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Paste ids assigned with `--mark-pasted` look like `paste-1`, `paste-2`.
pub const PASTE_ID_PREFIX: &str = "paste";

/// Document loaded from `original` with the change to `edited` committed as
/// one transaction.
pub fn replay(original: &str, edited: &str, mark_pasted: bool) -> Result<Document> {
    let mut doc = markdown::load(original);
    let target = markdown::parse(edited);
    let prefix = mark_pasted.then_some(PASTE_ID_PREFIX);
    let tx = diff::transaction(doc.items(), &target, prefix);
    if !tx.is_noop() {
        doc.commit(tx).context("Failed to apply the edit")?;
    }
    Ok(doc)
}

pub fn replay_files(original: &Path, edited: &Path, mark_pasted: bool) -> Result<Document> {
    let before = fs::read_to_string(original)
        .with_context(|| format!("Failed to read file: {}", original.display()))?;
    let after = fs::read_to_string(edited)
        .with_context(|| format!("Failed to read file: {}", edited.display()))?;
    replay(&before, &after, mark_pasted)
}

/// Session for a page, taking the title from the file name when none is given.
pub fn session(
    config: &Config,
    edited: &Path,
    title: Option<String>,
    namespace: i32,
    lang: String,
    user: UserContext,
) -> Session {
    let title = title.unwrap_or_else(|| {
        edited
            .file_stem()
            .map(|stem| stem.to_string_lossy().replace('_', " "))
            .unwrap_or_default()
    });
    Session::new(
        PageContext {
            title,
            namespace,
            lang,
        },
        user,
        &config.engine(),
    )
}

pub fn user(logged_out: bool, edit_count: u64) -> UserContext {
    UserContext {
        account: if logged_out {
            AccountKind::Anonymous
        } else {
            AccountKind::Registered
        },
        edit_count,
    }
}

/// Findings for `trigger`. The all-checks sweep reports dismissed findings
/// too and leaves the visible set alone.
pub async fn findings(controller: &mut Controller, trigger: Trigger, doc: &Document) -> Vec<Action> {
    match trigger {
        Trigger::AllChecks => controller.all_violations(doc).await,
        _ => controller.run(trigger, doc).await.to_vec(),
    }
}
