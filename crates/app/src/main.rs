use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::Parser;
use services::{Api, Clock, Portal, Reply};

mod cli;

use cli::{Cli, Command};

#[tokio::main]
async fn main() {
    match run().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(error) => {
            eprintln!("lang-portal error: {error:#}");
            std::process::exit(2);
        }
    }
}

/// Returns whether the command's reply was a success.
async fn run() -> anyhow::Result<bool> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let db_url = normalize_sqlite_url(&cli.db_url);
    prepare_sqlite_file(&db_url)?;
    tracing::debug!(db_url = %db_url, zone = %cli.utc_offset, "opening dataset");

    let portal = Portal::new_sqlite(&db_url, Clock::default_clock(), cli.utc_offset)
        .await
        .with_context(|| format!("failed to open database {db_url}"))?;
    let api = Api::new(portal);

    let reply = dispatch(&api, cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&reply.body)?);
    if !reply.is_success() {
        tracing::warn!(status = reply.status, "command failed");
    }
    Ok(reply.is_success())
}

async fn dispatch(api: &Api, command: Command) -> anyhow::Result<Reply> {
    let reply = match command {
        Command::Seed => api.full_reset().await,
        Command::ResetHistory => api.reset_history().await,
        Command::Start { group, activity } => api.start_session(group, activity).await,
        Command::Review {
            session,
            word,
            correct,
        } => api.review_word(session, word, correct).await,
        Command::QuickStats => api.quick_stats().await,
        Command::StudyProgress => api.study_progress().await,
        Command::LastSession => api.last_study_session().await,
        Command::Sessions {
            page,
            activity: Some(activity),
        } => api.study_activity_sessions(activity, page).await,
        Command::Sessions {
            page,
            activity: None,
        } => api.study_sessions(page).await,
        Command::SessionWords { session, page } => api.study_session_words(session, page).await,
        Command::Rebuild => api.rebuild_counters().await,
        Command::Verify => api.verify_counters().await,
        Command::Request {
            method,
            target,
            body,
        } => {
            let body = body
                .as_deref()
                .map(serde_json::from_str::<serde_json::Value>)
                .transpose()
                .context("--body is not valid JSON")?;
            api.handle(&method, &target, body.as_ref()).await
        }
    };
    Ok(reply)
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { "debug" } else { "info" };

    let filter = tracing_subscriber::EnvFilter::try_from_env("LANG_PORTAL_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

/// Turn a bare or relative path into an absolute `sqlite://` URL.
fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return trimmed.to_owned();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Make sure the database file and its directory exist before connecting.
fn prepare_sqlite_file(db_url: &str) -> anyhow::Result<()> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let Some(path) = db_url.strip_prefix("sqlite://") else {
        bail!("invalid --db value: {db_url}");
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        bail!("invalid --db value: {db_url}");
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
    }
    Ok(())
}
