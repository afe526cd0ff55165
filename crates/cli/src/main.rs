use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use workline_api::{ReqwestHttpClient, SmtpMailer};
use workline_engine::{
    Collaborators, DirectoryProcessStore, HttpClient, InMemoryRecordStore, JsonFileRecordStore, Mailer, NoopHttpClient, NoopMailer,
    NoopRenderer, PoolInput, ProcessRunner, ProcessStore, RecordStore, StoreConditionEvaluator, TemplateRenderer, load_process_file,
};
use workline_render::PdfFormRenderer;
use workline_types::{Process, Step, StepConfig};
use workline_util::Settings;

#[derive(Debug, Parser)]
#[command(name = "workline", version, about = "Run declarative business processes")]
struct Cli {
    /// Settings file; defaults to WORKLINE_CONFIG_PATH or the platform config directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a process by name and print its result as JSON.
    Run {
        name: String,
        /// JSON file holding the initial pool (a list of variables or a name-keyed map).
        #[arg(long)]
        pool: Option<PathBuf>,
        #[arg(long)]
        processes: Option<PathBuf>,
        #[arg(long)]
        records: Option<PathBuf>,
        /// Skip mail, HTTP and file output, and keep record updates in memory.
        #[arg(long)]
        dry_run: bool,
    },
    /// List the processes found in the processes directory.
    List {
        #[arg(long)]
        processes: Option<PathBuf>,
    },
    /// Parse a process file and report its steps.
    Validate { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Command::Run {
            name,
            pool,
            processes,
            records,
            dry_run,
        } => {
            let processes_dir = processes.unwrap_or_else(|| settings.processes_dir.clone());
            let records_path = records.unwrap_or_else(|| settings.records_path.clone());
            let input = match pool {
                Some(path) => read_pool_input(&path)?,
                None => PoolInput::default(),
            };

            let collaborators = build_collaborators(&settings, &records_path, dry_run).await?;
            let runner = ProcessRunner::new(Arc::new(DirectoryProcessStore::new(processes_dir)), collaborators);
            let result = runner
                .run_named(&name, input)
                .await
                .with_context(|| format!("failed to run process '{name}'"))?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::List { processes } => {
            let processes_dir = processes.unwrap_or_else(|| settings.processes_dir.clone());
            let store = DirectoryProcessStore::new(&processes_dir);
            let processes = store
                .list_processes()
                .await
                .with_context(|| format!("failed to read processes from {}", processes_dir.display()))?;
            if processes.is_empty() {
                println!("No processes found in {}", processes_dir.display());
            }
            for process in processes {
                println!("{}\t{} step(s)", process.name, process.steps.len());
            }
        }
        Command::Validate { file } => {
            let processes = load_process_file(&file).with_context(|| format!("failed to load {}", file.display()))?;
            let mut unknown_total = 0;
            for process in &processes {
                let report = validate_process(process);
                unknown_total += report.iter().filter(|line| line.unknown).count();
                println!("{}", process.name);
                for line in report {
                    println!("{line}");
                }
            }
            if unknown_total > 0 {
                anyhow::bail!("{unknown_total} step(s) have an unknown type and would be skipped");
            }
        }
    }
    Ok(())
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let settings = match path {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    settings.context("failed to load settings")
}

fn read_pool_input(path: &Path) -> Result<PoolInput> {
    let content = std::fs::read_to_string(path).with_context(|| format!("failed to read pool file {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("pool file {} is not a list or map of variables", path.display()))
}

async fn build_collaborators(settings: &Settings, records_path: &Path, dry_run: bool) -> Result<Collaborators> {
    let file_records = JsonFileRecordStore::new(records_path);
    let records: Arc<dyn RecordStore> = if dry_run {
        let snapshot = file_records
            .list(None)
            .await
            .with_context(|| format!("failed to read records from {}", records_path.display()))?;
        Arc::new(InMemoryRecordStore::new(snapshot))
    } else {
        Arc::new(file_records)
    };
    let conditions = Arc::new(StoreConditionEvaluator::new(records.clone()));

    let (mailer, http, renderer): (Arc<dyn Mailer>, Arc<dyn HttpClient>, Arc<dyn TemplateRenderer>) = if dry_run {
        info!("dry run: mail, HTTP and file output are disabled");
        (Arc::new(NoopMailer), Arc::new(NoopHttpClient), Arc::new(NoopRenderer))
    } else {
        let mailer: Arc<dyn Mailer> = match &settings.smtp {
            Some(smtp) => Arc::new(SmtpMailer::new(smtp, settings.mail_from.as_deref()).context("failed to configure SMTP")?),
            None => {
                warn!("no SMTP settings; outgoing email will be discarded");
                Arc::new(NoopMailer)
            }
        };
        let http = ReqwestHttpClient::new(&settings.http).context("failed to build HTTP client")?;
        (mailer, Arc::new(http), Arc::new(PdfFormRenderer::new(&settings.files_dir)))
    };

    Ok(Collaborators::new(records, conditions, mailer, http, renderer))
}

/// One reported step; nested `if` steps are indented under their parent.
#[derive(Debug, PartialEq, Eq)]
struct StepLine {
    depth: usize,
    label: String,
    kind: String,
    unknown: bool,
}

impl std::fmt::Display for StepLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let indent = "  ".repeat(self.depth + 1);
        let marker = if self.unknown { "  (unknown type, skipped at run time)" } else { "" };
        write!(f, "{indent}{} [{}]{marker}", self.label, self.kind)
    }
}

fn validate_process(process: &Process) -> Vec<StepLine> {
    let mut lines = Vec::new();
    collect_step_lines(&process.steps, 0, &mut lines);
    lines
}

fn collect_step_lines(steps: &[Step], depth: usize, lines: &mut Vec<StepLine>) {
    for step in steps {
        lines.push(StepLine {
            depth,
            label: if step.label.is_empty() { step.name.clone() } else { step.label.clone() },
            kind: step.config.type_name().to_string(),
            unknown: step.kind().is_none(),
        });
        if let StepConfig::If(meta) = &step.config {
            collect_step_lines(&meta.steps, depth + 1, lines);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_arguments_parse() {
        let cli = Cli::try_parse_from(["workline", "run", "onboarding", "--pool", "pool.json", "--dry-run"]).unwrap();
        match cli.command {
            Command::Run { name, pool, dry_run, .. } => {
                assert_eq!(name, "onboarding");
                assert_eq!(pool, Some(PathBuf::from("pool.json")));
                assert!(dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn validate_reports_nested_and_unknown_steps() {
        let process: Process = serde_json::from_value(serde_json::json!({
            "name": "onboarding",
            "steps": [
                {"name": "customer", "type": "find_record", "meta": {"conditions": {"statements": []}}},
                {"name": "gate", "type": "if", "meta": {
                    "conditions": {"statements": []},
                    "steps": [{"name": "legacy", "type": "send_sms", "meta": {}}]
                }}
            ]
        }))
        .unwrap();

        let lines = validate_process(&process);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2].depth, 1);
        assert_eq!(lines[2].kind, "send_sms");
        assert!(lines[2].unknown);
        assert!(!lines[0].unknown);
        assert!(lines[2].to_string().contains("unknown type"));
    }

    #[test]
    fn pool_files_accept_lists_of_variables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.json");
        std::fs::write(
            &path,
            r#"[{"_id": "c1", "name": "customer", "object": "customers", "data": {"email": "ada@example.com"}}]"#,
        )
        .unwrap();
        assert!(matches!(read_pool_input(&path).unwrap(), PoolInput::Sequence(variables) if variables.len() == 1));
    }
}
