use chatprofile_common::{logger, AppConfig, Result};
use chatprofile_llm::chunk_progress_bar;
use chatprofile_pipeline::{AnalysisReport, PipelineExecutor, SummaryReport};
use clap::{Args, Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Find project root by looking for .git directory
fn find_project_root() -> Option<PathBuf> {
    let mut current_dir = std::env::current_dir().ok()?;

    loop {
        if current_dir.join(".git").exists() {
            return Some(current_dir);
        }

        if !current_dir.pop() {
            break;
        }
    }

    None
}

/// Load .env file from project root
fn load_dotenv_from_project_root() {
    if let Some(root) = find_project_root() {
        let env_path = root.join(".env");
        if env_path.exists() {
            dotenv::from_path(&env_path).ok();
        }
    } else {
        // Fallback to default dotenv behavior
        dotenv::dotenv().ok();
    }
}

#[derive(Parser)]
#[command(name = "chatprofile")]
#[command(about = "chatprofile - speaker profile analysis over chat exports", long_about = None)]
struct Cli {
    /// TOML configuration file (env vars are used when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Default)]
struct Overrides {
    /// Root directory of the chat exports
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Speaker label whose lines are extracted (e.g. "Jane Doe:")
    #[arg(long, global = true)]
    speaker: Option<String>,

    /// Treat the speaker label as a regular expression
    #[arg(long, global = true)]
    speaker_regex: bool,

    /// Completion model
    #[arg(long, global = true)]
    model: Option<String>,

    /// Prompt language ("en" or "es")
    #[arg(long, global = true)]
    language: Option<String>,

    /// Chunk summaries in flight at once
    #[arg(long, global = true)]
    concurrency: Option<usize>,
}

impl Overrides {
    fn apply(self, config: &mut AppConfig) {
        if let Some(dir) = self.dir {
            config.source_dir = dir;
        }
        if let Some(speaker) = self.speaker {
            config.speaker_name = Some(speaker);
        }
        if self.speaker_regex {
            config.speaker_regex = true;
        }
        if let Some(model) = self.model {
            config.llm_model = model;
        }
        if let Some(language) = self.language {
            config.prompt_language = language;
        }
        if let Some(concurrency) = self.concurrency {
            config.summary_concurrency = concurrency;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, summarize and (after confirmation) analyze
    Run {
        /// Skip the confirmation before the analysis
        #[arg(long, short = 'y')]
        yes: bool,

        /// Print the run result as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Extract the speaker's lines only
    Extract,

    /// Summarize the extracted lines only
    Summarize,

    /// Analyze an existing summaries file
    Analyze,
}

const CONFIRM_PROMPT: &str = "Do you want to continue with the profile analysis? (y/n)";

/// Ask on stdin whether the analysis should run
fn confirm_analysis(report: &SummaryReport) -> bool {
    println!(
        "Summarized {} chunks ({} tokens) into {}",
        report.chunk_count,
        report.source_tokens,
        report.summaries_path.display()
    );

    // The gate runs on a runtime worker; stdin reads block
    tokio::task::block_in_place(|| read_confirmation(io::stdin().lock(), io::stdout()))
}

/// Repeat the question until a y/n answer; EOF or a read error declines
fn read_confirmation<R: BufRead, W: Write>(mut input: R, mut output: W) -> bool {
    loop {
        let _ = write!(output, "{} ", CONFIRM_PROMPT);
        let _ = output.flush();

        let mut answer = String::new();
        match input.read_line(&mut answer) {
            Ok(0) | Err(_) => return false,
            Ok(_) => {}
        }

        if let Some(accepted) = parse_answer(&answer) {
            return accepted;
        }
    }
}

fn parse_answer(answer: &str) -> Option<bool> {
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

fn truncation_notice(report: &AnalysisReport) -> Option<String> {
    report.was_truncated().then(|| {
        format!(
            "Summaries truncated from {} to {} tokens before analysis",
            report.original_tokens, report.submitted_tokens
        )
    })
}

fn load_config(cli_config: Option<&PathBuf>, overrides: Overrides) -> Result<AppConfig> {
    let mut config = match cli_config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::from_env()?,
    };
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}

async fn execute(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_ref(), cli.overrides)?;

    // Setup logging
    logger::setup_logging(&config.log_dir, &config.log_level)?;

    tracing::info!("chatprofile starting...");
    tracing::info!("  Source: {}", config.source_dir.display());
    tracing::info!("  Model: {}", config.llm_model);

    let executor = PipelineExecutor::from_config(config)?.with_progress(chunk_progress_bar());

    match cli.command.unwrap_or(Commands::Run { yes: false, json: false }) {
        Commands::Run { yes, json } => {
            let result = if yes {
                executor.run(&true).await?
            } else {
                executor.run(&confirm_analysis).await?
            };

            match &result.analysis {
                Some(analysis) => {
                    if let Some(notice) = truncation_notice(analysis) {
                        println!("{}", notice);
                    }
                    println!("Complete analysis saved in {}", analysis.analysis_path.display());
                }
                None if !result.summary.is_empty() => println!(
                    "Analysis skipped. Run `chatprofile analyze` to analyze {} later.",
                    result.summary.summaries_path.display()
                ),
                None => println!("No lines matched the speaker; nothing to analyze."),
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
        }
        Commands::Extract => {
            let report = executor.extract().await?;
            println!(
                "Extracted {} lines from {} files into {}",
                report.lines_extracted,
                report.files_processed,
                report.output_path.display()
            );
        }
        Commands::Summarize => {
            let report = executor.summarize().await?;
            println!(
                "Summaries of {} chunks saved in {}",
                report.chunk_count,
                report.summaries_path.display()
            );
        }
        Commands::Analyze => {
            let report = executor.analyze().await?;
            if let Some(notice) = truncation_notice(&report) {
                println!("{}", notice);
            }
            println!("Complete analysis saved in {}", report.analysis_path.display());
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load environment variables from .env at project root before the config reads them
    load_dotenv_from_project_root();

    if let Err(e) = execute(cli).await {
        tracing::error!("chatprofile failed: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}
