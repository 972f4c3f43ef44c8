use crate::action::{Action, ActionMode};
use crate::check::Trigger;
use crate::document::{Document, Range};
use anyhow::Result;
use colored::*;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Serialize)]
struct JsonFinding {
    handle: u64,
    check: &'static str,
    id: Option<String>,
    message: String,
    text: String,
    ranges: Vec<Range>,
    choices: Vec<&'static str>,
    mode: ActionMode,
    stale: bool,
}

#[derive(Debug, Serialize)]
struct JsonOutput {
    file: String,
    trigger: Trigger,
    total_findings: usize,
    findings: Vec<JsonFinding>,
}

pub fn print_findings(
    file_path: &Path,
    trigger: Trigger,
    actions: &[Action],
    doc: &Document,
    colored_output: bool,
    format: &OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Text => {
            print_text_findings(file_path, actions, doc, colored_output);
            Ok(())
        }
        OutputFormat::Json => print_json_findings(file_path, trigger, actions, doc),
    }
}

fn print_text_findings(file_path: &Path, actions: &[Action], doc: &Document, colored_output: bool) {
    if actions.is_empty() {
        return;
    }

    let file_name = file_path.display().to_string();

    if colored_output {
        println!("\n{}", file_name.bold().underline());
    } else {
        println!("\n{}", file_name);
    }

    for action in actions {
        let location = action
            .covering_range(doc)
            .map(|range| range.to_string())
            .unwrap_or_default();
        let label = format!("[{}]", action.check());
        let excerpt = excerpt(&action.text(doc));
        let choices = action
            .choices()
            .iter()
            .map(|choice| choice.name())
            .collect::<Vec<_>>();

        if colored_output {
            let stale = if action.is_stale() {
                format!(" {}", "(stale)".yellow())
            } else {
                String::new()
            };
            println!(
                "  {} {} {}{}",
                location.blue().bold(),
                label.red().bold(),
                excerpt.italic(),
                stale
            );
            if !action.message().is_empty() {
                println!("    {}", action.message().dimmed());
            }
            if !choices.is_empty() {
                let choices = choices
                    .iter()
                    .map(|c| c.green().to_string())
                    .collect::<Vec<_>>()
                    .join(&", ".dimmed().to_string());
                println!("    {} {}", "→".dimmed(), choices);
            }
        } else {
            let stale = if action.is_stale() { " (stale)" } else { "" };
            println!("  {} {} {}{}", location, label, excerpt, stale);
            if !action.message().is_empty() {
                println!("    {}", action.message());
            }
            if !choices.is_empty() {
                println!("    → {}", choices.join(", "));
            }
        }
    }
}

fn print_json_findings(file_path: &Path, trigger: Trigger, actions: &[Action], doc: &Document) -> Result<()> {
    let findings: Vec<JsonFinding> = actions
        .iter()
        .map(|action| JsonFinding {
            handle: action.handle(),
            check: action.check(),
            id: action.id().map(str::to_string),
            message: action.message().to_string(),
            text: action.text(doc),
            ranges: action.ranges(doc),
            choices: action.choices().iter().map(|choice| choice.name()).collect(),
            mode: action.mode(),
            stale: action.is_stale(),
        })
        .collect();

    let output = JsonOutput {
        file: file_path.display().to_string(),
        trigger,
        total_findings: findings.len(),
        findings,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Quoted, shortened text of a finding.
fn excerpt(text: &str) -> String {
    const MAX_CHARS: usize = 60;
    let flat = text.replace('\n', " ⏎ ");
    if flat.chars().count() <= MAX_CHARS {
        format!("\"{}\"", flat)
    } else {
        let head: String = flat.chars().take(MAX_CHARS - 1).collect();
        format!("\"{}…\"", head)
    }
}

pub fn print_check_summary(total_findings: usize, file_path: &Path, colored: bool) {
    println!();
    if total_findings == 0 {
        if colored {
            println!("{}", "✓ No findings!".green().bold());
        } else {
            println!("✓ No findings!");
        }
    } else {
        let finding_word = if total_findings == 1 { "finding" } else { "findings" };
        if colored {
            println!(
                "{} {} {} in {}",
                "✗".red().bold(),
                total_findings.to_string().red().bold(),
                finding_word,
                file_path.display()
            );
        } else {
            println!(
                "✗ {} {} in {}",
                total_findings,
                finding_word,
                file_path.display()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parsing() {
        assert!(matches!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json)));
        assert!(matches!("text".parse::<OutputFormat>(), Ok(OutputFormat::Text)));
        assert!("yaml".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }

    #[test]
    fn test_excerpt_is_shortened() {
        assert_eq!(excerpt("short"), "\"short\"");
        let long = "x".repeat(100);
        let shortened = excerpt(&long);
        assert_eq!(shortened.chars().count(), 62);
        assert!(shortened.ends_with("…\""));
        assert_eq!(excerpt("a\nb"), "\"a ⏎ b\"");
    }
}
