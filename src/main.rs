// Entry point and interactive menu.
//
// - Option [1] uploads a spreadsheet (.xlsx, .xls or .csv) and parses it
//   into the order table, reusing the cached table for an identical file.
// - Option [2] renders the dashboard for the current upload.
// - Option [3] prints the same dashboard as JSON for a charting front-end.
// - Option [4] prints the default configuration file.
// - Option [5] shows the uploaded rows as a table.
//
// End of input on stdin exits the menu.
mod aggregator;
mod cache;
mod config;
mod error;
mod loader;
mod output;
mod presenter;
mod types;
mod util;

use anyhow::{Context, Result};
use cache::{FileIdentity, TableCache};
use chrono::Utc;
use config::{Config, DEFAULT_CONFIG_FILE};
use error::LoadError;
use loader::SheetFormat;
use presenter::DashboardView;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Per-session state: configuration plus the last upload.
struct Session {
    config: Config,
    cache: TableCache,
    last_error: Option<LoadError>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Logging was already initialized");
    }
}

/// Trimmed next line from `reader`, or `None` at end of input.
fn next_line<R: BufRead>(reader: &mut R) -> Result<Option<String>> {
    let mut buf = String::new();
    let n = reader
        .read_line(&mut buf)
        .context("Failed to read from stdin")?;
    if n == 0 {
        return Ok(None);
    }
    Ok(Some(buf.trim().to_string()))
}

/// Read a single line of input after printing `prompt`.
fn read_line(prompt: &str) -> Result<Option<String>> {
    print!("{}", prompt);
    io::stdout().flush().context("Failed to flush stdout")?;
    next_line(&mut io::stdin().lock())
}

/// Ask whether to go back to the menu after showing the dashboard. End of
/// input counts as no.
fn prompt_back_to_menu() -> Result<bool> {
    loop {
        let Some(answer) = read_line("Back to menu (Y/N): ")? else {
            return Ok(false);
        };
        match answer.to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Handle option [1]: read the file and parse it through the cache.
fn handle_upload(session: &mut Session) -> Result<()> {
    let Some(input) = read_line("File path: ")? else {
        return Ok(());
    };
    let path = Path::new(&input);
    let result = SheetFormat::from_path(path).and_then(|format| {
        let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
            path: input.clone(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| input.clone());
        let identity = FileIdentity::from_bytes(&name, &bytes);
        let columns = &session.config.columns;
        session
            .cache
            .get_or_load(identity, || loader::load_table(&bytes, format, columns))
    });

    match result {
        Ok(loaded) => {
            session.last_error = None;
            println!(
                "Loaded {} rows from {}.",
                util::format_int(loaded.report.total_rows),
                input
            );
            for (column, count) in &loaded.report.malformed {
                warn!("{} malformed cell(s) in column '{}' were left empty", count, column);
            }
            if loaded.report.malformed_cells() > 0 {
                println!(
                    "Note: {} malformed cells were left empty.",
                    util::format_int(loaded.report.malformed_cells())
                );
            }
            println!();
        }
        Err(e) => {
            warn!("Upload of {} failed: {}", input, e);
            session.last_error = Some(e);
        }
    }
    Ok(())
}

/// Build the view for the current state of the session.
fn current_view(session: &Session) -> DashboardView {
    let presenter_cfg = &session.config.presenter;
    if let Some(err) = &session.last_error {
        return DashboardView::failed(err, presenter_cfg);
    }
    let opts = session.config.aggregate_options();
    let metrics = session
        .cache
        .current()
        .map(|loaded| aggregator::aggregate(&loaded.table, &opts));
    presenter::present(metrics.as_ref(), &opts, presenter_cfg)
}

fn main() -> Result<()> {
    init_logging();

    let config = Config::load(Path::new(DEFAULT_CONFIG_FILE))?;
    info!("SD dashboard v{}", env!("CARGO_PKG_VERSION"));

    let mut session = Session {
        config,
        cache: TableCache::new(),
        last_error: None,
    };

    loop {
        println!("Select an option:");
        println!("[1] Upload file");
        println!("[2] Show dashboard");
        println!("[3] Show dashboard as JSON");
        println!("[4] Print default config");
        println!("[5] Show raw data");
        println!("[0] Exit\n");
        let Some(choice) = read_line("Enter choice: ")? else {
            println!();
            break;
        };
        match choice.as_str() {
            "1" => handle_upload(&mut session)?,
            "2" => {
                println!();
                print!("{}", output::render_text(&current_view(&session)));
                if !prompt_back_to_menu()? {
                    println!("Exiting the program.");
                    break;
                }
            }
            "3" => {
                let json = output::to_json(&current_view(&session), Utc::now())
                    .context("Failed to serialize dashboard")?;
                println!("{}\n", json);
            }
            "4" => println!("{}", Config::default_toml()?),
            "5" => match (&session.last_error, session.cache.current()) {
                (None, Some(loaded)) => {
                    let max_rows = session.config.presenter.raw_preview_rows;
                    println!("{}", output::render_raw_data(&loaded.table, max_rows));
                }
                _ => println!("{}", output::render_text(&current_view(&session))),
            },
            "0" => break,
            _ => println!("Invalid choice. Please enter 0-5.\n"),
        }
    }
    Ok(())
}
