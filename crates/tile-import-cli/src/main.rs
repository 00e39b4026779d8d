use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use tile_import_core::prelude::*;
use tile_import_core::read_catalog;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "tile-import",
    about = "Discover UDIM texture sets and plan their node-graph layout",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Show progress bars (disable with --no-progress or --quiet)
    #[arg(long, default_value_t = true, action=ArgAction::Set, global=true, help_heading = "Logging/UX")]
    progress: bool,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action=ArgAction::Count, global=true, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(
        short,
        long,
        default_value_t = false,
        global = true,
        help_heading = "Logging/UX"
    )]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan a folder, print diagnostics lines and write the catalog artifact
    Scan(ScanArgs),
    /// Print one display row per texture set of a catalog artifact
    Rows(RowsArgs),
    /// Resolve a selection against a catalog artifact and print node/backdrop geometry
    Layout(LayoutArgs),
    /// Run `scan` as a child process, then lay out the selection from its artifact
    Import(ImportArgs),
}

#[derive(Parser, Debug, Clone)]
struct ScanArgs {
    /// Folder to scan
    #[arg(help_heading = "Input/Output")]
    input: PathBuf,
    /// Directory for the catalog artifact (defaults to the system temp dir)
    #[arg(short, long, help_heading = "Input/Output")]
    out_dir: Option<PathBuf>,
    /// YAML config file path (discovery and layout sections)
    #[arg(long, help_heading = "Input/Output")]
    config: Option<PathBuf>,
    /// Include patterns (glob). If set, only files matching any pattern are considered
    #[arg(long, help_heading = "Input/Output")]
    include: Vec<String>,
    /// Exclude patterns (glob). Files matching any pattern will be ignored
    #[arg(long, help_heading = "Input/Output")]
    exclude: Vec<String>,

    /// Abort when the folder holds this many files
    #[arg(long, help_heading = "Discovery")]
    max_files: Option<usize>,
    /// Accepted extensions (repeatable), e.g. --ext tif --ext exr
    #[arg(long = "ext", help_heading = "Discovery")]
    extensions: Vec<String>,
    /// Do not follow symbolic links
    #[arg(long, default_value_t = false, help_heading = "Discovery")]
    no_follow_links: bool,

    /// Print the merged configuration (after CLI/YAML) and exit
    #[arg(long, default_value_t = false, help_heading = "Export")]
    print_config: bool,
    /// Output format for --print-config: json|yaml
    #[arg(long, default_value = "json", value_parser = ["json", "yaml"], help_heading = "Export")]
    print_config_format: String,
}

#[derive(Parser, Debug, Clone)]
struct RowsArgs {
    /// Catalog artifact (JSON)
    catalog: PathBuf,
    /// Delete the artifact after reading it
    #[arg(long, default_value_t = false)]
    consume: bool,
}

#[derive(Parser, Debug, Clone)]
struct SelectionArgs {
    /// Texture set to place: name:ext[:b][:<8|16|32>-bit][:color|scalar] (repeatable, in order)
    #[arg(short, long = "select", help_heading = "Selection")]
    select: Vec<String>,
    /// JSON file holding an array of selection requests (appended after --select)
    #[arg(long, help_heading = "Selection")]
    selection_file: Option<PathBuf>,
    /// Select every texture set in the catalog
    #[arg(long, default_value_t = false, help_heading = "Selection")]
    all: bool,
    /// With --all: give every set a broadcaster
    #[arg(long, default_value_t = false, help_heading = "Selection")]
    all_broadcasters: bool,
    /// YAML config file path (layout section)
    #[arg(long, help_heading = "Layout")]
    config: Option<PathBuf>,
    /// Write the layout JSON here instead of stdout
    #[arg(long, help_heading = "Export")]
    output: Option<PathBuf>,
    /// Also include every recorded node-graph call in the output
    #[arg(long, default_value_t = false, help_heading = "Export")]
    dump_graph: bool,
}

#[derive(Parser, Debug, Clone)]
struct LayoutArgs {
    /// Catalog artifact (JSON)
    catalog: PathBuf,
    /// Delete the artifact after reading it
    #[arg(long, default_value_t = false)]
    consume: bool,
    #[command(flatten)]
    selection: SelectionArgs,
}

#[derive(Parser, Debug, Clone)]
struct ImportArgs {
    /// Folder to scan
    input: PathBuf,
    /// Directory for the intermediate catalog artifact
    #[arg(short, long)]
    out_dir: Option<PathBuf>,
    #[command(flatten)]
    selection: SelectionArgs,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);
    match &cli.command {
        Commands::Scan(args) => run_scan(args, cli.progress && !cli.quiet),
        Commands::Rows(args) => run_rows(args),
        Commands::Layout(args) => run_layout(args),
        Commands::Import(args) => run_import(args),
    }
}

fn run_scan(args: &ScanArgs, show_progress: bool) -> anyhow::Result<()> {
    let file_cfg = load_file_config(args.config.as_deref())?;
    let mut cfg = file_cfg.discovery.into_discovery_config(DiscoveryConfig::default());
    if let Some(dir) = &args.out_dir {
        cfg.out_dir = dir.clone();
    }
    if let Some(v) = args.max_files {
        cfg.max_files = v;
    }
    if !args.extensions.is_empty() {
        cfg.extensions = args
            .extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect();
    }
    if args.no_follow_links {
        cfg.follow_links = false;
    }

    if args.print_config {
        match args.print_config_format.as_str() {
            "yaml" => println!("{}", serde_yaml::to_string(&cfg)?),
            _ => println!("{}", serde_json::to_string_pretty(&cfg)?),
        }
        return Ok(());
    }

    fs::create_dir_all(&cfg.out_dir)
        .with_context(|| format!("create out_dir {}", cfg.out_dir.display()))?;

    let include = build_globset(&args.include)?;
    let exclude = build_globset(&args.exclude)?;
    let bar = progress_bar(show_progress);

    let mut diag = Diagnostics::new(std::io::stdout());
    diag.emit(Flag::Debug, format!("Arg passed {}", args.input.display()));

    let provider = ImageCrateProvider;
    let start = Instant::now();
    let mut discovery = Discovery::new(&cfg, &provider)
        .with_filter(|p| !should_skip(p, include.as_ref(), exclude.as_ref()));
    if let Some(b) = &bar {
        discovery = discovery.with_progress(|done, total| {
            b.set_length(total as u64);
            b.set_position(done as u64);
        });
    }
    let result = discovery.run(&args.input, &mut diag);
    if let Some(b) = &bar {
        b.finish_and_clear();
    }
    // Failures have already been reported on stdout under their flag.
    match result {
        Ok(path) => info!(?path, elapsed_ms = start.elapsed().as_millis() as u64, "scan finished"),
        Err(e) => error!(kind = ?e.kind(), error = %e, "scan failed"),
    }
    Ok(())
}

fn run_rows(args: &RowsArgs) -> anyhow::Result<()> {
    let catalog = load_catalog(&args.catalog, args.consume)?;
    println!("{}", serde_json::to_string_pretty(&catalog.rows())?);
    Ok(())
}

fn run_layout(args: &LayoutArgs) -> anyhow::Result<()> {
    let catalog = load_catalog(&args.catalog, args.consume)?;
    layout_and_export(&catalog, &args.selection)
}

fn run_import(args: &ImportArgs) -> anyhow::Result<()> {
    let exe = std::env::current_exe().context("locate tile-import executable")?;
    let mut cmd = Command::new(exe);
    cmd.arg("--quiet").arg("scan").arg(&args.input);
    if let Some(dir) = &args.out_dir {
        cmd.arg("--out-dir").arg(dir);
    }
    let start = Instant::now();
    let output = cmd.output().context("run scan subprocess")?;
    info!(
        elapsed = %format!("{:.2}s", start.elapsed().as_secs_f64()),
        "scan subprocess finished"
    );
    if !output.status.success() {
        anyhow::bail!(
            "[SubprocessError] scan exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let catalog = load_scan_result(&stdout)?;
    layout_and_export(&catalog, &args.selection)
}

/// Reads the catalog named by a scan's diagnostics and deletes the artifact.
/// A failed scan still has its artifact removed if it reported one.
fn load_scan_result(stdout: &str) -> anyhow::Result<Catalog> {
    let report = DiagnosticReport::parse(stdout);
    if let Some((flag, msg)) = report.terminal_failure() {
        discard_artifact(&report);
        anyhow::bail!("[{flag}] {msg}");
    }
    if let Some(msg) = report.get(&Flag::WriteDataError) {
        discard_artifact(&report);
        anyhow::bail!("[{}] {msg}", Flag::WriteDataError);
    }
    let data_path = report
        .data_path()
        .context("scan reported no DataPath")?;
    info!(?data_path, files = report.file_count(), "loading catalog");
    Ok(consume_catalog(&data_path)?)
}

fn discard_artifact(report: &DiagnosticReport) {
    let Some(path) = report.data_path() else {
        return;
    };
    match fs::remove_file(&path) {
        Ok(()) => info!(path = %path.display(), "discarded catalog artifact of failed scan"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to delete catalog artifact"),
    }
}

fn layout_and_export(catalog: &Catalog, sel: &SelectionArgs) -> anyhow::Result<()> {
    let file_cfg = load_file_config(sel.config.as_deref())?;
    let layout_cfg = file_cfg.layout.unwrap_or_default();
    layout_cfg.validate()?;

    let requests = gather_requests(catalog, sel)?;
    if requests.is_empty() {
        anyhow::bail!("nothing selected: pass --select, --selection-file or --all");
    }
    let entries = resolve_selection(catalog, &requests)?;

    let mut graph = RecordingGraph::new();
    let mut session = ImportSession::new(layout_cfg);
    let report = session.import(&mut graph, &entries)?;
    for failure in &report.failures {
        error!(failure = %failure, "entry not fully imported");
    }

    let value = if sel.dump_graph {
        serde_json::json!({"selection": entries, "layout": report, "graph": graph})
    } else {
        serde_json::json!({"selection": entries, "layout": report})
    };
    let json = serde_json::to_string_pretty(&value)?;
    match &sel.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
            info!(?path, entries = report.entries.len(), "layout written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn gather_requests(catalog: &Catalog, sel: &SelectionArgs) -> anyhow::Result<Vec<SelectionRequest>> {
    let mut requests = Vec::new();
    if sel.all {
        for (name, ext, _) in catalog.groups() {
            requests.push(SelectionRequest::new(name, ext).broadcaster(sel.all_broadcasters));
        }
    }
    for raw in &sel.select {
        requests.push(parse_select(raw)?);
    }
    if let Some(path) = &sel.selection_file {
        let text =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let mut from_file: Vec<SelectionRequest> = serde_json::from_str(&text)
            .with_context(|| format!("parse selection file {}", path.display()))?;
        requests.append(&mut from_file);
    }
    Ok(requests)
}

/// `name:ext[:b][:<N>-bit][:color|scalar]`
fn parse_select(raw: &str) -> anyhow::Result<SelectionRequest> {
    let mut parts = raw.split(':');
    let name = parts.next().filter(|s| !s.is_empty());
    let ext = parts.next().filter(|s| !s.is_empty());
    let (Some(name), Some(ext)) = (name, ext) else {
        anyhow::bail!("selection '{}' must look like name:ext", raw);
    };
    let mut req = SelectionRequest::new(name, ext.to_ascii_lowercase());
    for token in parts {
        match token.to_ascii_lowercase().as_str() {
            "b" | "broadcaster" => req = req.broadcaster(true),
            other => {
                if let Ok(depth) = other.parse::<Depth>() {
                    req = req.depth(depth);
                } else if let Ok(cs) = other.parse::<Colourspace>() {
                    req = req.colourspace(cs);
                } else {
                    anyhow::bail!("unknown selection option '{}' in '{}'", other, raw);
                }
            }
        }
    }
    Ok(req)
}

fn load_catalog(path: &Path, consume: bool) -> anyhow::Result<Catalog> {
    let catalog = if consume {
        consume_catalog(path)
    } else {
        read_catalog(path)
    }
    .with_context(|| format!("load catalog {}", path.display()))?;
    info!(
        groups = catalog.group_count(),
        tiles = catalog.tile_count(),
        "catalog loaded"
    );
    Ok(catalog)
}

fn build_globset(patterns: &[String]) -> anyhow::Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut b = GlobSetBuilder::new();
    for pat in patterns {
        b.add(Glob::new(pat)?);
    }
    Ok(Some(b.build()?))
}

fn should_skip(p: &Path, include: Option<&GlobSet>, exclude: Option<&GlobSet>) -> bool {
    let s = p.to_string_lossy().replace('\\', "/");
    if let Some(ex) = exclude {
        if ex.is_match(&s) {
            return true;
        }
    }
    if let Some(inc) = include {
        if !inc.is_match(&s) {
            return true;
        }
    }
    false
}

fn progress_bar(show: bool) -> Option<indicatif::ProgressBar> {
    use indicatif::{ProgressBar, ProgressStyle};
    if !show {
        return None;
    }
    let b = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} reading metadata {pos}/{len} [{elapsed_precise}]",
    ) {
        b.set_style(style);
    }
    Some(b)
}

fn init_tracing_with_level(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => "info".into(),
            1 => "debug".into(),
            _ => "trace".into(),
        }
    };
    // stdout carries the diagnostics protocol; logs go to stderr.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    discovery: YamlDiscovery,
    #[serde(default)]
    layout: Option<LayoutConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct YamlDiscovery {
    extensions: Option<Vec<String>>,
    max_files: Option<usize>,
    follow_links: Option<bool>,
    out_dir: Option<PathBuf>,
}

impl YamlDiscovery {
    fn into_discovery_config(self, mut cfg: DiscoveryConfig) -> DiscoveryConfig {
        if let Some(v) = self.extensions {
            cfg.extensions = v.into_iter().map(|e| e.to_ascii_lowercase()).collect();
        }
        if let Some(v) = self.max_files {
            cfg.max_files = v;
        }
        if let Some(v) = self.follow_links {
            cfg.follow_links = v;
        }
        if let Some(v) = self.out_dir {
            cfg.out_dir = v;
        }
        cfg
    }
}

fn load_file_config(path: Option<&Path>) -> anyhow::Result<FileConfig> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: FileConfig =
        serde_yaml::from_str(&text).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
