//! Subcommand execution.

use std::io::IsTerminal;

use anyhow::{bail, Context, Result};
use fairlens::backend::{BackendClient, FairnessRequest};
use fairlens::dataset::DatasetProcessor;
use fairlens::formatters::{
    FairnessReport, FormatterConfig, HumanFormatter, JsonFormatter, MarkdownFormatter,
    ReportFormatter,
};
use fairlens::intake::read_upload;
use fairlens::logging::LogConfig;
use fairlens::state::{AnalysisStatus, AppState};
use fairlens::workflow::Workflow;
use tracing::{debug, info};

use crate::cli::{
    row_policy, AnalyzeArgs, Cli, Command, GlobalArgs, OutputArgs, OutputFormat, ProfileArgs,
    RunArgs,
};

pub async fn execute(cli: Cli, log: LogConfig) -> Result<()> {
    match cli.command {
        Command::Profile(args) => profile(args, &log).await,
        Command::Upload { file } => {
            let client = client(&cli.global, None, &log)?;
            let upload = read_upload(&file).await?;
            let receipt = client.upload(&upload).await?;
            let body = serde_json::to_string_pretty(receipt.raw())
                .context("Failed to serialize upload response")?;
            println!("{body}");
            Ok(())
        }
        Command::Analyze(args) => analyze(&cli.global, args, &log).await,
        Command::Run(args) => run(&cli.global, args, &log).await,
    }
}

async fn profile(args: ProfileArgs, log: &LogConfig) -> Result<()> {
    let upload = read_upload(&args.file).await?;
    let processor = DatasetProcessor::builder()
        .row_policy(row_policy(args.strict_rows))
        .log_config(log.clone())
        .build();
    let summary = processor.process(&upload.text)?;
    emit(&FairnessReport::for_summary(&summary), &args.output).await
}

async fn analyze(global: &GlobalArgs, args: AnalyzeArgs, log: &LogConfig) -> Result<()> {
    let client = client(global, Some(&args), log)?;
    let selection = args.fairness.selection();
    let request = FairnessRequest::new(&args.filename, &args.protected_attr, selection.clone());
    let result = client.fairness_check(&request).await?;
    emit(
        &FairnessReport::for_analysis(&args.protected_attr, &selection, &result),
        &args.output,
    )
    .await
}

async fn run(global: &GlobalArgs, args: RunArgs, log: &LogConfig) -> Result<()> {
    let config = args.fairness.apply(global.backend_config());
    let client = BackendClient::new(config)?.with_log_config(log.clone());
    let processor = DatasetProcessor::builder()
        .row_policy(row_policy(args.strict_rows))
        .log_config(log.clone())
        .build();
    let workflow = Workflow::new(processor, client);

    let state = workflow.load_file(&AppState::new(), &args.file).await;
    if let Some(message) = state.last_error() {
        if state.summary().is_some() {
            emit(&FairnessReport::from_state(&state), &args.output).await?;
        }
        bail!("{message}");
    }

    let state = match choose_attribute(&state, args.protected_attr.as_deref()) {
        Some(attribute) => {
            info!(attribute = %attribute, "Using protected attribute");
            state.select_protected_attributes([attribute])
        }
        None => state,
    };

    let state = workflow.analyze(&state, args.fairness.selection()).await;
    emit(&FairnessReport::from_state(&state), &args.output).await?;
    match state.analysis() {
        AnalysisStatus::Failed(message) => bail!("{message}"),
        _ => Ok(()),
    }
}

/// The explicit attribute, else the most confident protected column.
fn choose_attribute(state: &AppState, explicit: Option<&str>) -> Option<String> {
    if let Some(attribute) = explicit {
        return Some(attribute.to_string());
    }
    state
        .summary()
        .and_then(|summary| summary.primary_protected_attribute())
        .map(|profile| profile.name.clone())
}

fn client(
    global: &GlobalArgs,
    analyze: Option<&AnalyzeArgs>,
    log: &LogConfig,
) -> Result<BackendClient> {
    let mut config = global.backend_config();
    if let Some(args) = analyze {
        config = args.fairness.apply(config);
    }
    debug!(endpoint = config.endpoint(), "Using analysis backend");
    Ok(BackendClient::new(config)?.with_log_config(log.clone()))
}

async fn emit(report: &FairnessReport<'_>, output: &OutputArgs) -> Result<()> {
    let text = render(report, output)?;
    match &output.output {
        Some(path) => {
            tokio::fs::write(path, text)
                .await
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!(path = %path.display(), "Report written");
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn render(report: &FairnessReport<'_>, output: &OutputArgs) -> Result<String> {
    let colors = output.output.is_none() && std::io::stdout().is_terminal();
    let config = FormatterConfig::default().with_colors(colors);
    let text = match output.format {
        OutputFormat::Human => HumanFormatter::with_config(config).format(report)?,
        OutputFormat::Json => {
            let mut json = JsonFormatter::with_config(config).format(report)?;
            json.push('\n');
            json
        }
        OutputFormat::Markdown => MarkdownFormatter::with_config(config).format(report)?,
    };
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    const CSV: &str = "name,Gender,Years\nAnn,Female,34\nBob,Male,51\n";

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("fairlens").chain(args.iter().copied())).unwrap()
    }

    fn dataset(dir: &tempfile::TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join("people.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[tokio::test]
    async fn test_profile_writes_json_report() {
        let dir = tempfile::tempdir().unwrap();
        let input = dataset(&dir, CSV);
        let report = dir.path().join("report.json");

        let cli = cli(&[
            "profile",
            input.to_str().unwrap(),
            "--format",
            "json",
            "--output",
            report.to_str().unwrap(),
        ]);
        execute(cli, LogConfig::quiet()).await.unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
        assert_eq!(value["dataset"]["rowCount"], 2);
        assert_eq!(value["dataset"]["identifiedAttributes"][1]["isProtected"], true);
        assert!(value.get("analysis").is_none());
    }

    #[tokio::test]
    async fn test_profile_strict_rows() {
        let dir = tempfile::tempdir().unwrap();
        let input = dataset(&dir, "a,b\n1,2\n3\n");
        let path = input.to_str().unwrap();

        let report = dir.path().join("report.md");
        let lenient = cli(&["profile", path, "-f", "markdown", "-o", report.to_str().unwrap()]);
        assert!(execute(lenient, LogConfig::quiet()).await.is_ok());

        let strict = cli(&["profile", path, "--strict-rows"]);
        let err = execute(strict, LogConfig::quiet()).await.unwrap_err();
        let err = err.downcast_ref::<fairlens::error::FairlensError>().unwrap();
        assert!(err.user_message().starts_with("Error processing dataset:"));
    }

    #[tokio::test]
    async fn test_profile_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.csv");
        let cli = cli(&["profile", missing.to_str().unwrap()]);
        assert!(execute(cli, LogConfig::quiet()).await.is_err());
    }

    #[test]
    fn test_choose_attribute() {
        let summary = DatasetProcessor::new().process(CSV).unwrap();
        let (loading, ticket) = AppState::new().begin_dataset();
        let state = loading.dataset_processed(ticket, std::sync::Arc::new(summary));

        assert_eq!(
            choose_attribute(&state, Some("race")).as_deref(),
            Some("race")
        );
        assert_eq!(choose_attribute(&state, None).as_deref(), Some("Gender"));
        assert_eq!(choose_attribute(&AppState::new(), None), None);
    }
}
