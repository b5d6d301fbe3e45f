//! scriptloc - machine translation workflow for exported visual-novel scripts
//!
//! Translates the message blocks of exported script files, recombines them
//! with the original text into bilingual blocks and strips speaker notes.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use scriptloc::cli::{Action, Args, MenuChoice, Target, resolve_file_choice};
use scriptloc::config::{Config, GameProfile};
use scriptloc::translate::BackendFactory;
use scriptloc::workflow::{BatchReport, Workflow, find_json_files};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _guard = setup_logging(args.verbose)?;

    let config = Config::load(args.config.as_deref())?;

    let game = match &args.game {
        Some(name) => config.game(name)?.clone(),
        None => choose_game(&config)?,
    };
    info!("Selected game: {}", game.name);

    let action = match args.action() {
        Some(action) => action,
        None => choose_action(&game)?,
    };

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling after the current request");
            ctrl_c.cancel();
        }
    });

    let mut workflow = Workflow::new(game, &config.translate)
        .with_cancellation(cancel)
        .with_progress(true);

    if matches!(action, Action::Translate(_)) {
        let backend = BackendFactory::create_backend(&config.translate)?;
        workflow = workflow.with_backend(backend);
    }

    match action {
        Action::Translate(Target::File(rel)) => workflow.translate_relative(&rel).await?,
        Action::Translate(Target::All) => log_report("Translation", workflow.translate_all().await?),
        Action::Combine(Target::File(rel)) => workflow.combine_file(&rel).await?,
        Action::Combine(Target::All) => log_report("Combine", workflow.combine_all().await?),
        Action::Strip(Target::File(rel)) => workflow.strip_file(&rel).await?,
        Action::Strip(Target::All) => log_report("Strip", workflow.strip_all().await?),
    }

    Ok(())
}

fn log_report(operation: &str, report: BatchReport) {
    info!(
        "{} finished: {} succeeded, {} skipped, {} failed ({} files)",
        operation,
        report.succeeded,
        report.skipped,
        report.failed,
        report.total()
    );
}

fn read_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim().to_string())
}

fn choose_game(config: &Config) -> Result<GameProfile> {
    println!("Available games:");
    for (i, name) in config.game_names().iter().enumerate() {
        println!("{}. {}", i + 1, name);
    }

    let input = read_line("Choose game: ")?;
    let game = input
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|index| config.games.get(index));

    match game {
        Some(game) => Ok(game.clone()),
        None => bail!("Invalid choice: {}", input),
    }
}

fn choose_action(game: &GameProfile) -> Result<Action> {
    for (i, choice) in MenuChoice::ALL.iter().enumerate() {
        println!("{}. {}", i + 1, choice.label());
    }

    let input = read_line("Choose (1 / 2 / 3 / 4 / 5): ")?;
    let Some(choice) = MenuChoice::parse(&input) else {
        bail!("Invalid choice: {}", input);
    };
    info!("{}", choice.label());

    let file = if choice.needs_file() {
        Some(choose_file(game)?)
    } else {
        None
    };
    Ok(choice.into_action(file))
}

fn choose_file(game: &GameProfile) -> Result<PathBuf> {
    let files = find_json_files(&game.export_dir)?;
    if files.is_empty() {
        bail!("No JSON files under {}", game.export_dir.display());
    }

    println!("JSON files under {}:", game.export_dir.display());
    for (i, file) in files.iter().enumerate() {
        println!("{}. {}", i + 1, file.display());
    }

    let input = read_line("JSON file (number or relative path): ")?;
    match resolve_file_choice(&input, &files) {
        Some(file) => Ok(file),
        None => bail!("Not a JSON file under {}: {}", game.export_dir.display(), input),
    }
}

fn setup_logging(verbose: bool) -> Result<WorkerGuard> {
    // Create log directory
    let log_dir = std::env::current_dir()?.join(".scriptloc").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Daily rotation; the guard flushes the file writer on drop
    let file_appender = rolling::daily(&log_dir, "scriptloc.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_file(verbose)
        .with_line_number(verbose);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("scriptloc.log").display()
    );

    Ok(guard)
}
