// src/main.rs

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use log4rs::{
    append::console::ConsoleAppender,
    append::file::FileAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};
use notes2notion::config::{resolve_state_dir, AppConfig, Command, CommandLineInput, ResetArgs, SyncArgs};
use notes2notion::constants::{LOG_FILE_NAME, NOTION_API_BASE_URL, STATE_FILE_NAME};
use notes2notion::{
    CancellationFlag, DirectoryNoteSource, JsonStateStore, NoteSource, NotionHttpClient,
    NotionPageWriter, ResetScope, StateStore, SyncEngine,
};
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

/// Sets up logging configuration.
fn setup_logging(verbose: bool, state_dir: &Path) -> Result<()> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    fs::create_dir_all(state_dir)
        .with_context(|| format!("creating state directory {}", state_dir.display()))?;
    let log_file_path = state_dir.join(LOG_FILE_NAME);

    let pattern = if verbose {
        "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}"
    } else {
        "{m}{n}"
    };

    let stdout_appender = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}",
        )))
        .build(&log_file_path)?;

    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout_appender)))
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Debug)))
                .build("file", Box::new(file_appender)),
        )
        .build(
            Root::builder()
                .appender("stdout")
                .appender("file")
                .build(log_level),
        )?;

    log4rs::init_config(config)?;
    log::info!("Logging initialized. Log file: {}", log_file_path.display());
    Ok(())
}

fn open_store(state_dir: &Path) -> Result<JsonStateStore> {
    let path = state_dir.join(STATE_FILE_NAME);
    JsonStateStore::open(&path).with_context(|| format!("opening state file {}", path.display()))
}

/// Syncs the notes directory; returns whether every note succeeded.
async fn run_sync(state_dir: &Path, args: &SyncArgs) -> Result<bool> {
    let config = AppConfig::resolve(state_dir.to_path_buf(), args)
        .context("resolving configuration")?;

    let http = NotionHttpClient::with_base_url(
        &config.api_key,
        NOTION_API_BASE_URL,
        config.sync.request_timeout,
    )?;
    let writer = Arc::new(NotionPageWriter::new(http, config.sync.retry));
    let store = Arc::new(open_store(&config.state_dir)?);

    let source = DirectoryNoteSource::new(&config.notes_dir).excluding(&config.state_dir);
    let scan = source
        .scan()
        .with_context(|| format!("reading notes from {}", config.notes_dir.display()))?;
    let present = scan.present_ids();
    let scan_complete = scan.is_complete();

    let cancel = CancellationFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupted; finishing notes already in flight");
                cancel.cancel();
            }
        });
    }

    let deleted_notes = config.sync.deleted_notes;
    let engine = SyncEngine::new(config.sync, writer, store);
    let mut report = engine.run(scan.notes, &cancel).await;
    report.add_unreadable(scan.unreadable);
    if !scan_complete {
        log::warn!("Some directories could not be listed; not looking for deleted notes");
    } else if report.aborted.is_none() && !cancel.is_cancelled() {
        report.orphans = engine.reconcile_deleted(&present, deleted_notes).await;
    }

    print!("{}", report);
    Ok(!report.has_failures())
}

fn run_reset(state_dir: &Path, args: &ResetArgs) -> Result<()> {
    let store = open_store(state_dir)?;
    let scope = match args.note_id()? {
        Some(note_id) => ResetScope::Note(note_id),
        None => ResetScope::All,
    };
    let removed = store.reset(scope)?;
    println!("Reset {} record(s)", removed);
    Ok(())
}

fn run_status(state_dir: &Path) -> Result<()> {
    let store = open_store(state_dir)?;
    let records = store.records();
    if records.is_empty() {
        println!("No notes synced yet ({})", store.path().display());
        return Ok(());
    }
    for record in records {
        let page = record
            .page_id
            .as_ref()
            .map_or_else(|| "-".to_string(), ToString::to_string);
        let synced = record
            .last_synced_at
            .map_or_else(|| "never".to_string(), |at| at.format("%Y-%m-%d %H:%M").to_string());
        print!("{:<40} {:<32} {}", record.note_id, page, synced);
        if let Some(error) = &record.last_error {
            print!("  (last error: {})", error);
        } else if record.has_unconfirmed_create() {
            print!("  (creation unconfirmed)");
        }
        println!();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = CommandLineInput::parse();
    let state_dir = resolve_state_dir(cli.state_dir.clone())?;

    setup_logging(cli.verbose, &state_dir)?;

    match &cli.command {
        Command::Sync(args) => {
            let all_ok = run_sync(&state_dir, args).await?;
            Ok(if all_ok {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Reset(args) => {
            run_reset(&state_dir, args)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Status => {
            run_status(&state_dir)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
