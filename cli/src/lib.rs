//! fontfeat CLI (made by FontLab https://www.fontlab.com/)

use std::env;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};
use regex::Regex;

use fontfeat_core::catalog::{CatalogEntry, CatalogReader, DEFAULT_CATALOG_FILENAME};
use fontfeat_core::config::IngestConfig;
use fontfeat_core::ingest::build_catalog;
use fontfeat_core::output::{write_entries_ndjson, write_entries_plain, write_feature_counts};
use fontfeat_core::report::{RunReporter, SummaryFormat};
use fontfeat_core::tags::parse_tag_list;

/// Environment variable overriding the platform font directories.
pub const FONT_DIRS_ENV: &str = "FONTFEAT_FONT_DIRS";

/// CLI entrypoint for fontfeat.
#[derive(Debug, Parser)]
#[command(
    name = "fontfeat",
    version,
    about = "Catalog the OpenType layout features of installed fonts (made by FontLab https://www.fontlab.com/)"
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scan font directories and write a new catalog
    Build(BuildArgs),
    /// List cataloged faces that support all the given features
    Find(FindArgs),
    /// Count cataloged faces per feature tag
    Stats(StatsArgs),
}

#[derive(Debug, Args)]
struct BuildArgs {
    /// Directories to scan
    #[arg(
        value_hint = ValueHint::DirPath,
        required_unless_present_any = ["system_fonts", "stdin_paths"]
    )]
    paths: Vec<PathBuf>,

    /// Read newline-delimited directories from STDIN
    #[arg(long = "stdin-paths", action = ArgAction::SetTrue)]
    stdin_paths: bool,

    /// Include the platform font directories
    #[arg(long = "system-fonts", action = ArgAction::SetTrue)]
    system_fonts: bool,

    /// Follow symlinks while walking directories
    #[arg(long = "follow-symlinks", action = ArgAction::SetTrue)]
    follow_symlinks: bool,

    /// Catalog file to create; must not exist yet
    #[arg(long = "catalog", default_value = DEFAULT_CATALOG_FILENAME, value_hint = ValueHint::FilePath)]
    catalog: PathBuf,

    /// Print the final summary as JSON
    #[arg(long = "json", action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(Debug, Args)]
struct FindArgs {
    /// Feature tags every listed face must support
    #[arg(short = 'f', long = "features", value_delimiter = ',', required = true)]
    features: Vec<String>,

    /// Regex patterns matched against "family style"
    #[arg(short = 'n', long = "name", value_hint = ValueHint::Other)]
    name_patterns: Vec<String>,

    /// Catalog file to read
    #[arg(long = "catalog", default_value = DEFAULT_CATALOG_FILENAME, value_hint = ValueHint::FilePath)]
    catalog: PathBuf,

    /// Emit newline-delimited JSON
    #[arg(long = "ndjson", action = ArgAction::SetTrue)]
    ndjson: bool,
}

#[derive(Debug, Args)]
struct StatsArgs {
    /// Catalog file to read
    #[arg(long = "catalog", default_value = DEFAULT_CATALOG_FILENAME, value_hint = ValueHint::FilePath)]
    catalog: PathBuf,

    /// Emit a JSON array
    #[arg(long = "json", action = ArgAction::SetTrue)]
    json: bool,
}

/// Parse CLI args and execute the selected command.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Build(args) => run_build(args),
        Command::Find(args) => run_find(args),
        Command::Stats(args) => run_stats(args),
    }
}

fn init_logging(verbose: u8) {
    env_logger::Builder::new()
        .filter_level(match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        })
        .parse_default_env()
        .init();
}

fn run_build(args: BuildArgs) -> Result<()> {
    let stdin = io::stdin();
    let roots = gather_paths(
        &args.paths,
        args.stdin_paths,
        args.system_fonts,
        stdin.lock(),
    )?;
    let config = build_config(&args, roots);

    let format = if args.json {
        SummaryFormat::Json
    } else {
        SummaryFormat::Plain
    };
    let stdout = io::stdout();
    let reporter = RunReporter::new(stdout.lock()).with_summary_format(format);

    let outcome = build_catalog(&config, reporter)
        .with_context(|| format!("building catalog {}", config.catalog_path.display()))?;
    log::info!("wrote {}", outcome.catalog.display());
    Ok(())
}

fn build_config(args: &BuildArgs, roots: Vec<PathBuf>) -> IngestConfig {
    IngestConfig::new(roots)
        .catalog_path(&args.catalog)
        .follow_symlinks(args.follow_symlinks)
}

fn run_find(args: FindArgs) -> Result<()> {
    let tags = parse_tag_list(&args.features)?;
    let patterns = compile_patterns(&args.name_patterns)?;
    let reader = open_reader(&args.catalog)?;

    let mut entries = reader.faces_with_features(&tags)?;
    filter_by_name(&mut entries, &patterns);

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if args.ndjson {
        write_entries_ndjson(&entries, &mut handle)?;
    } else {
        write_entries_plain(&entries, &mut handle)?;
    }
    handle.flush()?;
    Ok(())
}

fn run_stats(args: StatsArgs) -> Result<()> {
    let reader = open_reader(&args.catalog)?;
    let counts = reader.feature_counts()?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if args.json {
        serde_json::to_writer_pretty(&mut handle, &counts)?;
        writeln!(handle)?;
    } else {
        write_feature_counts(&counts, &mut handle)?;
    }
    Ok(())
}

fn open_reader(catalog: &Path) -> Result<CatalogReader> {
    if !catalog.exists() {
        return Err(anyhow!(
            "catalog {} not found; run `fontfeat build` first",
            catalog.display()
        ));
    }
    CatalogReader::open(catalog).with_context(|| format!("opening catalog {}", catalog.display()))
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| Regex::new(p).with_context(|| format!("invalid regex: {p}")))
        .collect()
}

fn filter_by_name(entries: &mut Vec<CatalogEntry>, patterns: &[Regex]) {
    if patterns.is_empty() {
        return;
    }
    entries.retain(|entry| {
        let full = format!("{} {}", entry.family, entry.style);
        patterns.iter().any(|re| re.is_match(&full))
    });
}

fn gather_paths(
    raw_paths: &[PathBuf],
    read_stdin: bool,
    include_system: bool,
    mut stdin: impl BufRead,
) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    if read_stdin {
        paths.extend(read_paths_from(&mut stdin)?);
    }

    for path in raw_paths {
        if path == Path::new("-") {
            paths.extend(read_paths_from(&mut stdin)?);
        } else {
            paths.push(path.clone());
        }
    }

    if include_system {
        paths.extend(system_font_roots()?);
    }

    if paths.is_empty() {
        return Err(anyhow!("no font directories provided"));
    }

    Ok(paths)
}

fn read_paths_from(reader: &mut impl BufRead) -> Result<Vec<PathBuf>> {
    let mut buf = String::new();
    let mut paths = Vec::new();

    loop {
        buf.clear();
        let read = reader.read_line(&mut buf)?;
        if read == 0 {
            break;
        }

        let trimmed = buf.trim();
        if !trimmed.is_empty() {
            paths.push(PathBuf::from(trimmed));
        }
    }

    Ok(paths)
}

fn system_font_roots() -> Result<Vec<PathBuf>> {
    if let Ok(raw) = env::var(FONT_DIRS_ENV) {
        let overrides: Vec<PathBuf> = raw
            .split([':', ';'])
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .filter(|p| p.exists())
            .collect();

        return if overrides.is_empty() {
            Err(anyhow!("{FONT_DIRS_ENV} is set but no paths exist"))
        } else {
            Ok(dedup_keep_order(overrides))
        };
    }

    let mut candidates: Vec<PathBuf> = Vec::new();

    #[cfg(target_os = "macos")]
    {
        candidates.push(PathBuf::from("/System/Library/Fonts"));
        candidates.push(PathBuf::from("/Library/Fonts"));
        if let Some(home) = env::var_os("HOME") {
            candidates.push(PathBuf::from(home).join("Library/Fonts"));
        }
    }

    #[cfg(target_os = "linux")]
    {
        candidates.push(PathBuf::from("/usr/share/fonts"));
        candidates.push(PathBuf::from("/usr/local/share/fonts"));
        if let Some(home) = env::var_os("HOME") {
            candidates.push(PathBuf::from(home).join(".local/share/fonts"));
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(system_root) = env::var_os("SYSTEMROOT") {
            candidates.push(PathBuf::from(system_root).join("Fonts"));
        }
        if let Some(local_appdata) = env::var_os("LOCALAPPDATA") {
            candidates.push(PathBuf::from(local_appdata).join("Microsoft/Windows/Fonts"));
        }
    }

    candidates.retain(|p| p.exists());

    if candidates.is_empty() {
        return Err(anyhow!(
            "no system font directories found for this platform"
        ));
    }

    Ok(dedup_keep_order(candidates))
}

/// Drop repeated roots while keeping the configured order.
fn dedup_keep_order(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = std::collections::HashSet::new();
    paths.into_iter().filter(|p| seen.insert(p.clone())).collect()
}
