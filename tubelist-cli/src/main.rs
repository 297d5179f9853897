mod batch;
mod cli;
mod config;
mod dedup;
mod error;
mod expiry;
mod playlist;

use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Europe::Athens;
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{Level, info};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use ytdlp_resolver::{ResolverClient, YtDlpRunner};

use crate::cli::Args;
use crate::config::AppConfig;
use crate::dedup::{EmittedKeys, Rejection, dedupe_input_lines};
use crate::error::{AppError, Result};
use crate::playlist::{PlaylistWriter, SPECIAL_ENTRY_ID, build_extinf};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    if let Err(e) = run(args).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let cfg = AppConfig::load(&args.config);

    let raw_lines = read_input_lines(&args.input)?;
    let (unique_inputs, skipped) = dedupe_input_lines(&raw_lines);
    for line in &skipped {
        println!("{}", format!("Skipping duplicate input line: {line}").yellow());
    }

    let created = Utc::now().with_timezone(&Athens);
    let output_path = if args.timestamp {
        playlist::timestamped_path(&args.output, created)
    } else {
        args.output.clone()
    };

    let backend = Arc::new(YtDlpRunner::new(cfg.resolver_auth()));
    let client = Arc::new(ResolverClient::new(
        backend,
        cfg.timeout(),
        cfg.retry_policy(),
    ));
    let opts = Arc::new(cfg.resolve_options());

    info!(
        references = unique_inputs.len(),
        workers = cfg.workers,
        "starting resolution"
    );
    let progress = ProgressBar::new(unique_inputs.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}")
            .expect("valid progress template")
            .progress_chars("=> "),
    );
    progress.set_message("Checking references");
    let buffered = batch::run_batch(&unique_inputs, client, opts, cfg.workers, &progress).await;
    progress.finish_and_clear();

    let expire_max = expiry::expire_max(&buffered);
    let special_title = expiry::special_entry_title(expire_max, Utc::now());
    let special_url = playlist::select_special_url(&buffered, &unique_inputs);

    let mut writer = PlaylistWriter::create(&output_path, created)?;
    let special_extinf = build_extinf(
        Some(SPECIAL_ENTRY_ID),
        Some(&cfg.favicon_service),
        &special_title,
    );
    match &special_url {
        Some(url) => writer.write_entry(&special_extinf, url)?,
        None => writer.write_descriptor(&special_extinf)?,
    }

    let mut emitted = EmittedKeys::new(special_url);
    for record in &buffered {
        match emitted.admit(record) {
            Ok(url) => {
                let logo = record.thumbnail.as_deref().unwrap_or(&cfg.favicon_service);
                let extinf = build_extinf(record.id.as_deref(), Some(logo), record.display_title());
                writer.write_entry(&extinf, &url)?;
                println!(
                    "{}",
                    format!(
                        "Wrote entry for {} -> {}",
                        record.input,
                        output_path.display()
                    )
                    .green()
                );
            }
            Err(Rejection::Duplicate) => {
                println!(
                    "{}",
                    format!("Skipping in-run duplicate for {}", record.input).yellow()
                );
            }
            // Nothing to emit, or the special entry already lists it.
            Err(Rejection::NoEndpoint | Rejection::MatchesSpecial) => {}
        }
    }

    println!(
        "{}",
        format!("Done. Output file: {}", output_path.display()).cyan()
    );
    Ok(())
}

/// Reads the ordered, non-blank input lines. A missing input file is the
/// one pre-run condition that aborts the process.
fn read_input_lines(path: &Path) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            AppError::InputNotFound(PathBuf::from(path))
        } else {
            AppError::Io(e)
        }
    })?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(ToOwned::to_owned)
        .collect())
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_level(verbose))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_input_file_is_fatal() {
        let err = read_input_lines(Path::new("/nonexistent/urls.txt")).unwrap_err();
        assert!(matches!(err, AppError::InputNotFound(_)));
    }

    #[test]
    fn blank_input_lines_are_ignored() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "abc\n\n   \n https://example.com/v \n").unwrap();
        let lines = read_input_lines(file.path()).unwrap();
        assert_eq!(lines, vec!["abc", "https://example.com/v"]);
    }
}
