use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use label_engine::utils::init_logger_with_file;
use label_engine::{Config, ExternalTemplates, LabelJobEngine, TracingNotifier};
use label_printer::{DeviceHandle, NetworkDiscovery};
use serde::Serialize;
use serde_json::Value;
use shared::{ApiResponse, AppError, AppResult, BatchKind, JobSummary};

#[derive(Parser)]
#[command(
    name = "label-engine",
    about = "Render label templates and send them to label printers",
    version
)]
struct Cli {
    /// Network printers, `name=host:port;name=host:port`
    #[arg(long, global = true, env = "LABEL_PRINTERS", value_name = "LIST")]
    printers: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "LOG_LEVEL", value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List reachable label printers
    Scan,
    /// Run a print job
    Print(PrintArgs),
    /// Read a status line from a printer
    Status(StatusArgs),
}

#[derive(Args)]
struct PrintArgs {
    /// Job payload (JSON)
    #[arg(long, value_name = "FILE")]
    job: PathBuf,

    /// External template body for a batch kind, `kit=FILE` or `specimen=FILE`
    #[arg(long = "template", value_name = "KIND=FILE")]
    templates: Vec<String>,

    /// Printer used by batches that name none
    #[arg(long, value_name = "NAME")]
    printer: Option<String>,
}

#[derive(Args)]
struct StatusArgs {
    /// Printer name or uid; defaults to the selected printer
    #[arg(long, value_name = "NAME")]
    printer: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PrinterInfo {
    name: String,
    uid: String,
    connection: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    manufacturer: Option<String>,
    selected: bool,
}

impl PrinterInfo {
    fn new(device: &DeviceHandle, selected: Option<&DeviceHandle>) -> Self {
        Self {
            name: device.name().to_string(),
            uid: device.uid().to_string(),
            connection: device.connection().to_string(),
            manufacturer: device.manufacturer().map(str::to_string),
            selected: selected.is_some_and(|s| s.same_device(device)),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(printers) = cli.printers.clone() {
        config = config.with_printers(printers);
    }
    if let Some(level) = cli.log_level.clone() {
        config.log_level = level;
    }

    init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "label-engine starting");

    let engine = build_engine(&config)?;

    let ok = match cli.command {
        Commands::Scan => emit(scan(&engine).await)?,
        Commands::Print(args) => emit_job(print(&engine, args).await)?,
        Commands::Status(args) => emit(status(&engine, args).await)?,
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

fn build_engine(config: &Config) -> Result<LabelJobEngine> {
    let discovery = NetworkDiscovery::new(config.endpoints()?)
        .with_timeout(config.connect_timeout())
        .with_encoding(config.command_encoding()?)
        .with_probe(config.probe_printers);

    Ok(LabelJobEngine::new(
        Arc::new(discovery),
        Arc::new(TracingNotifier),
        config.engine_options(),
    ))
}

/// Print the result envelope as JSON; returns whether it was a success
fn emit<T: Serialize>(result: AppResult<T>) -> Result<bool> {
    let response = match result {
        Ok(data) => ApiResponse::success(data),
        Err(e) => failure(e),
    };
    write_response(&response)
}

/// Job results carry the summary message; a job with failed labels still
/// exits non-zero
fn emit_job(result: AppResult<JobSummary>) -> Result<bool> {
    match result {
        Ok(summary) => {
            let clean = summary.is_clean();
            let response = ApiResponse::success_with_message(summary.message.clone(), summary);
            Ok(write_response(&response)? && clean)
        }
        Err(e) => write_response(&failure::<JobSummary>(e)),
    }
}

fn failure<T>(e: AppError) -> ApiResponse<T> {
    tracing::error!(code = %e.code, error = %e, "Command failed");
    ApiResponse::from(e)
}

fn write_response<T: Serialize>(response: &ApiResponse<T>) -> Result<bool> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(response.code == Some(0))
}

async fn scan(engine: &LabelJobEngine) -> AppResult<Vec<PrinterInfo>> {
    let devices = engine.scan().await?;
    let selected = engine.directory().selected();
    Ok(devices
        .iter()
        .map(|d| PrinterInfo::new(d, selected.as_ref()))
        .collect())
}

async fn print(engine: &LabelJobEngine, args: PrintArgs) -> AppResult<JobSummary> {
    let payload: Value = serde_json::from_str(&fs::read_to_string(&args.job)?)?;
    let externals = load_templates(&args.templates).map_err(|e| AppError::validation(e.to_string()))?;

    if let Some(name) = args.printer.as_deref() {
        select_printer(engine, name).await?;
    }

    engine.run_json(&payload, &externals).await
}

async fn status(engine: &LabelJobEngine, args: StatusArgs) -> AppResult<String> {
    engine.scan().await?;
    engine.read_status(args.printer.as_deref()).await
}

async fn select_printer(engine: &LabelJobEngine, name: &str) -> AppResult<()> {
    if engine.directory().is_empty() {
        engine.scan().await?;
    }
    let device = engine
        .directory()
        .resolve(name)
        .ok_or_else(|| AppError::device_not_found(name))?;
    Ok(engine.directory().select(Some(device))?)
}

/// Parse `kind=FILE` pairs into template bodies
fn load_templates(pairs: &[String]) -> Result<ExternalTemplates> {
    let mut templates = ExternalTemplates::new();
    for pair in pairs {
        let (kind, file) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KIND=FILE, got {}", pair))?;
        let kind: BatchKind = kind.parse()?;
        let body = fs::read_to_string(Path::new(file.trim()))
            .with_context(|| format!("reading {} template {}", kind, file))?;
        templates.insert(kind, body);
    }
    Ok(templates)
}
