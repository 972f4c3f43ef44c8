use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use editcheck::check::{self, Trigger, BUILTIN_CHECKS};
use editcheck::cli::{self, output::OutputFormat};
use editcheck::{Classifier, Config, Controller, HttpClassifier};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "editcheck")]
#[command(version, about = "Run edit checks against the content changed between two revisions", long_about = None)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Generate shell completion script
    #[arg(long, value_name = "SHELL")]
    completion: Option<Shell>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check the changes between two Markdown files
    Check(CheckArgs),
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// Revision the editing session started from
    #[arg(value_name = "ORIGINAL")]
    original: PathBuf,

    /// Revision after editing
    #[arg(value_name = "EDITED")]
    edited: PathBuf,

    /// When the checks run (save, change, branch, all)
    #[arg(short, long, default_value = "save")]
    trigger: Trigger,

    /// Output format (text, json)
    #[arg(short = 'o', long, default_value = "text")]
    format: OutputFormat,

    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Page title sent to the classifier (defaults to the file name)
    #[arg(long)]
    title: Option<String>,

    /// Content language
    #[arg(short, long, default_value = "en")]
    lang: String,

    /// Namespace of the page
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    namespace: i32,

    /// Edit count of the acting account
    #[arg(long, default_value_t = 0)]
    edit_count: u64,

    /// Act as a logged-out user
    #[arg(long)]
    logged_out: bool,

    /// Treat every insertion as pasted content
    #[arg(long)]
    mark_pasted: bool,

    /// Classifier endpoint (overrides engine.classifier_url)
    #[arg(long, env = "EDITCHECK_CLASSIFIER_URL")]
    classifier_url: Option<String>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Exit with code 0 even if findings are reported
    #[arg(long)]
    no_fail: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Handle shell completion generation
    if let Some(shell) = cli.completion {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "editcheck", &mut io::stdout());
        return Ok(());
    }

    let Some(Commands::Check(args)) = cli.command else {
        anyhow::bail!("No command specified. Use --help for usage information.");
    };

    let total_findings = run_check(&args).await?;

    // Exit with appropriate code
    if total_findings > 0 && !args.no_fail {
        std::process::exit(1);
    }

    Ok(())
}

async fn run_check(args: &CheckArgs) -> Result<usize> {
    let config = Config::load(args.config.as_deref())?;
    config.validate(BUILTIN_CHECKS)?;

    let doc = cli::replay_files(&args.original, &args.edited, args.mark_pasted)?;
    let session = cli::session(
        &config,
        &args.edited,
        args.title.clone(),
        args.namespace,
        args.lang.clone(),
        cli::user(args.logged_out, args.edit_count),
    );

    let classifier = match args.classifier_url.clone().or(config.engine().classifier_url) {
        Some(url) => Some(Arc::new(HttpClassifier::new(url)?) as Arc<dyn Classifier>),
        None => None,
    };

    let mut controller = Controller::new(session, check::builtin(&config), classifier);
    tracing::debug!(checks = ?controller.check_names(), trigger = %args.trigger, "running checks");

    let findings = cli::findings(&mut controller, args.trigger, &doc).await;
    let colored = !args.no_color;

    cli::output::print_findings(&args.edited, args.trigger, &findings, &doc, colored, &args.format)?;
    if let OutputFormat::Text = args.format {
        cli::output::print_check_summary(findings.len(), &args.edited, colored);
    }

    Ok(findings.len())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("EDITCHECK_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
