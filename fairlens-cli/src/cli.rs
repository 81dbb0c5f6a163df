//! Command-line arguments.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use fairlens::backend::{BackendConfig, API_URL_ENV, DEFAULT_ENDPOINT};
use fairlens::catalog::{FairnessDimension, FairnessSelection};
use fairlens::dataset::RowPolicy;
use fairlens::logging::LogConfig;
use fairlens::state::DEFAULT_PROTECTED_ATTRIBUTE;

/// Profile datasets for protected attributes and run fairness checks
#[derive(Parser, Debug)]
#[command(name = "fairlens", author, version, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Increase log output (-v for info, -vv for debug with backend bodies)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Base URL of the analysis backend
    #[arg(long, global = true, env = API_URL_ENV, default_value = DEFAULT_ENDPOINT)]
    pub api_url: String,

    /// Backend request timeout in seconds
    #[arg(long, global = true, default_value_t = 120)]
    pub timeout: u64,
}

impl GlobalArgs {
    pub fn log_config(&self) -> LogConfig {
        match self.verbose {
            0 => LogConfig::quiet(),
            1 => LogConfig::balanced(),
            _ => LogConfig::verbose(),
        }
    }

    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig::new(&self.api_url).with_timeout(Duration::from_secs(self.timeout))
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Profile a dataset locally without contacting the backend
    Profile(ProfileArgs),
    /// Upload a dataset to the backend
    Upload {
        /// Dataset to upload
        file: PathBuf,
    },
    /// Run a fairness check on a file the backend already holds
    Analyze(AnalyzeArgs),
    /// Profile, upload and analyze a dataset in one go
    Run(RunArgs),
}

#[derive(Args, Debug)]
pub struct ProfileArgs {
    /// Dataset to profile
    pub file: PathBuf,

    /// Fail on rows whose cell count differs from the header
    #[arg(long)]
    pub strict_rows: bool,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// File name returned by the upload
    #[arg(long)]
    pub filename: String,

    /// Column to evaluate fairness against
    #[arg(long, default_value = DEFAULT_PROTECTED_ATTRIBUTE)]
    pub protected_attr: String,

    #[command(flatten)]
    pub fairness: FairnessArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Dataset to analyze
    pub file: PathBuf,

    /// Column to evaluate fairness against [default: most confident protected column]
    #[arg(long)]
    pub protected_attr: Option<String>,

    /// Fail on rows whose cell count differs from the header
    #[arg(long)]
    pub strict_rows: bool,

    #[command(flatten)]
    pub fairness: FairnessArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug)]
pub struct FairnessArgs {
    /// Fairness dimension to evaluate
    #[arg(long, value_enum)]
    pub dimension: DimensionArg,

    /// Comma-separated metrics [default: the dimension's metrics]
    #[arg(long, value_delimiter = ',')]
    pub metrics: Vec<String>,

    /// Label column sent to the backend
    #[arg(long)]
    pub label_col: Option<String>,

    /// Scanning tool the backend should use
    #[arg(long)]
    pub tool: Option<String>,
}

impl FairnessArgs {
    pub fn selection(&self) -> FairnessSelection {
        FairnessSelection::new(self.dimension.into(), &self.metrics)
    }

    /// Applies the label column and tool overrides.
    pub fn apply(&self, mut config: BackendConfig) -> BackendConfig {
        if let Some(label_col) = &self.label_col {
            config = config.with_label_col(label_col);
        }
        if let Some(tool) = &self.tool {
            config = config.with_tool(tool);
        }
        config
    }
}

#[derive(Args, Debug)]
pub struct OutputArgs {
    /// Report format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
    Markdown,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DimensionArg {
    Group,
    Individual,
    Intersectional,
}

impl From<DimensionArg> for FairnessDimension {
    fn from(arg: DimensionArg) -> Self {
        match arg {
            DimensionArg::Group => FairnessDimension::Group,
            DimensionArg::Individual => FairnessDimension::Individual,
            DimensionArg::Intersectional => FairnessDimension::Intersectional,
        }
    }
}

pub fn row_policy(strict: bool) -> RowPolicy {
    if strict {
        RowPolicy::Reject
    } else {
        RowPolicy::Pad
    }
}
