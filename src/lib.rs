//! # Rusty CFO
//!
//! A conversational front-end over spreadsheet and PDF reports: uploaded
//! files are read into tables, the tables are unified, their columns are
//! classified into financial roles, and simple metrics are derived. Questions
//! are answered with canned findings where possible, phrased by a remote
//! text-completion service, and otherwise sent to that service with the
//! metrics as context.
//!
//! ## Pipeline
//!
//! - [`reader`]: `.xlsx`, `.xlsm`, `.xlam`, `.ods` and `.pdf` files into raw tables and text
//! - [`table`]: the table model and the unifier
//! - [`classify`]: revenue, cost, quantity, product, date and client columns
//! - [`metrics`]: derived profit, totals and top-N products
//! - [`responder`]: intents, prompts and answers
//! - [`analysis`]: the stages above, run once per set of uploads
pub mod analysis;
pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod metrics;
pub mod reader;
pub mod render;
pub mod responder;
pub mod table;

mod helpers;
mod pdf;
mod spreadsheet;

pub use spreadsheet::criteria::Criteria;

use crate::analysis::Analysis;
use crate::cli::AskArgs;
use crate::cli::Cli;
use crate::cli::Commands;
use crate::cli::InputArgs;
use crate::config::Config;
use crate::llm::OpenAiClient;
use crate::reader::read_files;
use crate::reader::Upload;
use crate::render::render_preview;
use crate::render::render_report;
use crate::render::render_table;
use crate::responder::QueryResponder;
use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use log::debug;
use log::info;
use log::warn;
use log::LevelFilter;
use std::env;
use std::io::BufRead;
use std::sync::OnceLock;

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("rusty_cfo", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Summary(args) => handle_summary(&args),
        Commands::Ask(args) => handle_ask(&args),
    }
}

fn handle_summary(args: &InputArgs) -> Result<()> {
    let analysis = load_analysis(args)?;
    print!("{}", render_analysis(&analysis, args.preview_rows));
    Ok(())
}

fn handle_ask(args: &AskArgs) -> Result<()> {
    let config = Config::from_env()
        .and_then(|config| config.with_overrides(args.model.clone(), args.temperature))
        .context("Loading configuration")?;
    info!("Answering with model '{}' at temperature {}", config.model, config.temperature);

    let analysis = load_analysis(&args.input)?;
    print!("{}", render_analysis(&analysis, args.input.preview_rows));

    let client = OpenAiClient::new(&config).context("Creating the completion client")?;
    let responder = QueryResponder::new(&client, config.model.clone(), config.temperature);
    let questions = if args.questions.is_empty() {
        read_questions(std::io::stdin().lock()).context("Reading questions from stdin")?
    } else {
        args.questions.clone()
    };

    for question in questions {
        println!();
        println!("Q: {question}");
        let answer = analysis.answer(&question, &responder);
        if let Some(finding) = &answer.finding {
            println!("{finding}");
        }
        match answer.reply {
            Ok(reply) => println!("{reply}"),
            Err(error) => eprintln!("error: {error}"),
        }
    }
    Ok(())
}

/// Questions one per line, up to end of input or the first empty line
fn read_questions<R: BufRead>(input: R) -> std::io::Result<Vec<String>> {
    let mut questions = Vec::new();
    for line in input.lines() {
        let line = line?;
        let question = line.trim();
        if question.is_empty() {
            break;
        }
        questions.push(question.to_owned());
    }
    Ok(questions)
}

fn load_analysis(args: &InputArgs) -> Result<Analysis> {
    let criteria = if args.sheets.is_empty() {
        Criteria::default()
    } else {
        Criteria::from_globs(&args.sheets)
            .with_context(|| format!("Parsing sheet patterns {:?}", args.sheets))?
    };

    let mut uploads = Vec::with_capacity(args.files.len());
    let mut failures = Vec::new();
    for path in &args.files {
        match Upload::from_path(path) {
            Ok(upload) => uploads.push(upload),
            Err(error) => {
                warn!("Skipping {}: {}", path.display(), error);
                failures.push((path.display().to_string(), error));
            }
        }
    }
    debug!("{} file(s) loaded into memory", uploads.len());

    let mut ingest = read_files(uploads, &criteria);
    failures.append(&mut ingest.failures);
    ingest.failures = failures;
    Ok(Analysis::build(ingest))
}

fn render_analysis(analysis: &Analysis, preview_rows: usize) -> String {
    let mut sections = Vec::new();
    if !analysis.failures.is_empty() {
        let headers = vec!["File".to_owned(), "Error".to_owned()];
        let rows = analysis
            .failures
            .iter()
            .map(|(name, error)| vec![name.to_owned(), error.to_string()])
            .collect::<Vec<_>>();
        sections.push(format!("Skipped files\n{}", render_table(&headers, &rows)));
    }
    match &analysis.table {
        Some(table) => {
            sections.push(format!(
                "Data preview ({} row(s), {} column(s))\n{}",
                table.len(),
                table.columns.len(),
                render_preview(table, preview_rows)
            ));
            let roles = analysis
                .roles
                .iter()
                .map(|(role, label)| format!("{role}={label}"))
                .collect::<Vec<_>>();
            if !roles.is_empty() {
                sections.push(format!("Columns: {}\n", roles.join(", ")));
            }
            let report = render_report(&analysis.metrics);
            if !report.is_empty() {
                sections.push(report);
            }
        }
        None => sections.push(format!(
            "No tables found; {} character(s) of text extracted\n",
            analysis.raw_text.chars().count()
        )),
    }
    sections.join("\n")
}
