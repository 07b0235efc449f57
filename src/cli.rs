use clap::Args;
use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(author, version, about = "Ask a digital CFO about your spreadsheets and PDF reports", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the unified data preview, totals and top products
    Summary(InputArgs),
    /// Print the summary, then answer questions with the completion service
    Ask(AskArgs),
}

#[derive(Debug, Args)]
pub struct InputArgs {
    /// Spreadsheet (.xlsx, .xlsm, .xlam, .ods) or PDF files to read
    #[arg(short = 'f', long = "file", required = true, num_args = 1..)]
    pub files: Vec<PathBuf>,
    /// Only read sheets whose name matches this glob (repeatable)
    #[arg(long = "sheet", action = clap::ArgAction::Append)]
    pub sheets: Vec<String>,
    /// Number of unified rows to print
    #[arg(long, default_value_t = 10)]
    pub preview_rows: usize,
}

#[derive(Debug, Args)]
pub struct AskArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Question to answer (repeatable); without one, questions are read from stdin
    #[arg(short = 'q', long = "question", action = clap::ArgAction::Append)]
    pub questions: Vec<String>,
    /// Completion model, overriding RUSTY_CFO_MODEL
    #[arg(long)]
    pub model: Option<String>,
    /// Sampling temperature between 0.0 and 2.0, overriding RUSTY_CFO_TEMPERATURE
    #[arg(long)]
    pub temperature: Option<f32>,
}
