use anyhow::Result;
use std::path::PathBuf;
use std::sync::mpsc;

use phototrail::config::Config;
use phototrail::db::Database;
use phototrail::report;
use phototrail::scanner::{IngestProgress, IngestStats, Scanner};
use phototrail::{geo, logging};

enum Command {
    Scan { directory: PathBuf, force_reprocess: bool },
    Estimate,
    Validate { csv: PathBuf },
    Stats,
}

struct CliArgs {
    config_path: Option<PathBuf>,
    command: Command,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path = None;
    let mut positional = Vec::new();
    let mut force_reprocess = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("phototrail {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--force-reprocess" => force_reprocess = true,
            arg if arg.starts_with('-') => {
                eprintln!("Unknown argument: {arg}");
                print_help();
                std::process::exit(1);
            }
            arg => positional.push(arg.to_string()),
        }
        i += 1;
    }

    let command = match positional.first().map(String::as_str) {
        Some("scan") => match positional.get(1) {
            Some(dir) => Command::Scan {
                directory: PathBuf::from(dir),
                force_reprocess,
            },
            None => {
                eprintln!("Error: scan requires a directory argument");
                std::process::exit(1);
            }
        },
        Some("estimate") => Command::Estimate,
        Some("validate") => match positional.get(1) {
            Some(csv) => Command::Validate { csv: PathBuf::from(csv) },
            None => {
                eprintln!("Error: validate requires a CSV path argument");
                std::process::exit(1);
            }
        },
        Some("stats") => Command::Stats,
        Some(other) => {
            eprintln!("Unknown command: {other}");
            print_help();
            std::process::exit(1);
        }
        None => {
            print_help();
            std::process::exit(1);
        }
    };

    CliArgs { config_path, command }
}

fn print_help() {
    println!(
        r#"phototrail - batch photo metadata pipeline

USAGE:
    phototrail [OPTIONS] <COMMAND>

COMMANDS:
    scan <DIR>          Ingest all photos under a directory
    estimate            Estimate geocoding API calls per H3 resolution
    validate <CSV>      Validate the catalog against a CSV manifest
    stats               Show catalog counts

OPTIONS:
    --force-reprocess   Reprocess photos even if already processed (scan)
    --config, -c PATH   Path to config file
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    PHOTOTRAIL_LOG      Log level (trace, debug, info, warn, error)

Config file location: $XDG_CONFIG_HOME/phototrail/config.toml"#
    );
}

fn main() -> Result<()> {
    let args = parse_args();

    // Initialize logging (uses journald on Linux, file fallback otherwise)
    let _ = logging::init(Some(Config::config_dir().join("logs")));

    // Load configuration
    let config = match args.config_path {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Initialize database
    let db = Database::open(&config.db_path)?;
    db.initialize()?;

    match args.command {
        Command::Scan { directory, force_reprocess } => {
            run_scan(&config, &db, &directory, force_reprocess)
        }
        Command::Estimate => run_estimate(&db),
        Command::Validate { csv } => run_validate(&db, &csv),
        Command::Stats => run_stats(&db),
    }
}

fn run_scan(config: &Config, db: &Database, directory: &PathBuf, force_reprocess: bool) -> Result<()> {
    println!("Processing photos from: {}", directory.display());
    if force_reprocess {
        println!("Force reprocess enabled");
    }

    let (tx, rx) = mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            match event {
                IngestProgress::Started { total_files } => {
                    println!("Found {total_files} photo files");
                }
                IngestProgress::Scanning { current, total, .. } => {
                    if current % 10 == 0 {
                        println!("Progress: {current}/{total} files");
                    }
                }
                IngestProgress::Error { message } => eprintln!("  {message}"),
                IngestProgress::Completed { .. } => {}
            }
        }
    });

    let scanner = Scanner::new(config.scanner.clone());
    let stats = scanner.process_directory(directory, db, force_reprocess, Some(tx))?;
    let _ = printer.join();

    print_scan_summary(&stats);
    Ok(())
}

fn print_scan_summary(stats: &IngestStats) {
    println!("{}", "=".repeat(60));
    println!("Total files found: {}", stats.total_files);
    if stats.created > 0 {
        println!("Created {} new photo records", stats.created);
    }
    if stats.updated > 0 {
        println!("Updated {} existing photo records", stats.updated);
    }
    if stats.skipped > 0 {
        println!("Skipped {} already processed photos", stats.skipped);
    }
    if stats.errors > 0 {
        println!("Errors: {}", stats.errors);
        for error in stats.error_details.iter().take(5) {
            eprintln!("  {error}");
        }
    }
    println!("{}", "=".repeat(60));
}

fn run_estimate(db: &Database) -> Result<()> {
    let estimate = report::estimate_geocoding_cost(db)?;

    if estimate.photos_needing_geocoding == 0 {
        println!("No photos need geocoding");
        return Ok(());
    }

    println!("Total photos needing geocoding: {}", estimate.photos_needing_geocoding);
    println!("{}", "=".repeat(70));
    for level in &estimate.per_resolution {
        println!(
            "Resolution {} ({}) - {}",
            level.resolution, level.approx_area, level.description
        );
        println!(
            "  {} unique locations, {} API calls, ~${:.2}",
            level.unique_cells, level.api_calls, level.cost_usd
        );
    }
    Ok(())
}

fn run_validate(db: &Database, csv: &PathBuf) -> Result<()> {
    println!("Validating photos from: {}", csv.display());
    let stats = report::validate_against_csv(db, csv)?;

    for warning in &stats.warnings {
        println!("  {warning}");
    }
    println!("{}", "=".repeat(60));
    println!("Rows checked: {}", stats.total_rows);
    println!("Matched: {}", stats.matched);
    println!("Missing: {}", stats.missing);
    println!("GPS mismatches: {}", stats.gps_mismatch);
    println!("Timestamp mismatches: {}", stats.timestamp_mismatch);
    Ok(())
}

fn run_stats(db: &Database) -> Result<()> {
    println!("Photos in catalog: {}", db.photo_count()?);
    println!("Awaiting geocoding: {}", db.count_photos_needing_geocoding()?);
    println!("Index resolutions: {:?}", geo::INDEX_LEVELS.map(|l| l.resolution));
    Ok(())
}
