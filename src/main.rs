//! scanlens - command-line entry point

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use scanlens::models::upload_mode::UploadMode;
use scanlens::services::{ScanWorkbench, SummaryState, SummaryView, UploadOutcome};
use scanlens::state::AppState;
use scanlens::utils::{format_file_size, init_logging};
use scanlens_client::FileUpload;
use scanlens_core::{CoreError, CoreResult};

const POLL_INTERVAL: Duration = Duration::from_secs(15);
const MAX_POLLS: u32 = 40;

#[derive(Parser)]
#[command(name = "scanlens", version, about = "Multi-engine file threat scanning client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Upload a file for a full multi-engine scan and wait for the analysis")]
    Scan {
        file: PathBuf,
        /// Password for an encrypted archive
        #[arg(long)]
        password: Option<String>,
    },
    #[command(about = "Look up a file by hash without uploading it for analysis")]
    Lookup { file: PathBuf },
    #[command(about = "Show a previously stored result")]
    Open { uuid: String, filename: String },
    #[command(about = "Generate an AI summary of a stored result")]
    Summary {
        uuid: String,
        /// Wait for the whole summary instead of streaming it
        #[arg(long)]
        once: bool,
    },
    #[command(about = "Print the active configuration")]
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let state = AppState::new();
    if let Err(e) = state.initialize().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    let log_filter = state
        .get_config()
        .await
        .map(|c| c.log_filter)
        .unwrap_or_else(|_| "info".to_string());
    init_logging(&log_filter);

    if let Err(e) = run(&state, cli.command).await {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(state: &AppState, command: Command) -> CoreResult<()> {
    let workbench = state.workbench().await?;
    match command {
        Command::Scan { file, password } => {
            let mut upload = read_upload(&file).await?;
            if let Some(password) = password {
                upload = upload.with_password(password);
            }
            workbench.set_mode(UploadMode::Full).await;
            scan(&workbench, upload).await
        }
        Command::Lookup { file } => {
            let upload = read_upload(&file).await?;
            workbench.set_mode(UploadMode::HashLookup).await;
            scan(&workbench, upload).await
        }
        Command::Open { uuid, filename } => {
            workbench.select_historical(&uuid, &filename).await?;
            print_context(&workbench).await
        }
        Command::Summary { uuid, once } => {
            if once {
                println!("{}", workbench.summaries().summarize_once(&uuid).await?);
                return Ok(());
            }
            stream_summary(&workbench, &uuid).await
        }
        Command::Config => {
            let config = state.get_config().await?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

async fn read_upload(path: &Path) -> CoreResult<FileUpload> {
    let bytes = tokio::fs::read(path).await?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    info!("Read {} ({})", filename, format_file_size(Some(bytes.len() as u64)));
    Ok(FileUpload::new(filename, bytes))
}

async fn scan(workbench: &ScanWorkbench, upload: FileUpload) -> CoreResult<()> {
    let mut current = match workbench.upload(upload).await? {
        UploadOutcome::Scanned(current) => current,
        UploadOutcome::NotFoundInDatabase { message } => {
            println!("{}", message);
            return Ok(());
        }
    };

    let mut polls = 0;
    while !current.result.is_complete() && polls < MAX_POLLS {
        info!("Analysis of {} still running, checking again shortly", current.filename);
        tokio::time::sleep(POLL_INTERVAL).await;
        current = workbench.refresh_analysis().await?;
        polls += 1;
    }

    print_context(workbench).await
}

async fn print_context(workbench: &ScanWorkbench) -> CoreResult<()> {
    let context = workbench
        .context()
        .await
        .ok_or_else(|| CoreError::state("no current result"))?;
    println!("{}", serde_json::to_string_pretty(&context)?);
    Ok(())
}

async fn stream_summary(workbench: &ScanWorkbench, uuid: &str) -> CoreResult<()> {
    let summaries = workbench.summaries();
    if let SummaryView::Cached(text) = summaries.view(uuid).await {
        println!("{}", text);
        return Ok(());
    }

    let mut rx = summaries.subscribe();
    loop {
        let session = rx.borrow_and_update().clone();
        if let Some(status) = &session.status_text {
            eprintln!("... {}", status);
        }
        match session.state {
            SummaryState::Done => {
                println!("{}", session.buffer);
                return Ok(());
            }
            SummaryState::Error => {
                return Err(CoreError::network(
                    session.error_message.unwrap_or_default(),
                ))
            }
            SummaryState::Idle => return Ok(()),
            SummaryState::Connecting | SummaryState::Streaming => {}
        }
        if rx.changed().await.is_err() {
            return Err(CoreError::internal("summary session channel closed"));
        }
    }
}
