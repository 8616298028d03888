//! lqdump - Export protocol definitions and configuration tables
//!
//! This tool renders a protobufjs reflection descriptor into a `.proto`
//! document, and decodes a self-describing configuration table into one
//! JSON file per table sheet.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use lqdump_core::{
    compile_document, render, synthesize, walk, ConfigTable, DecodeOutput, DerivedSchema,
    ReflectionNode, StatsWriter,
};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;

/// Export protocol definitions and configuration tables from game-data bundles
#[derive(Parser, Debug)]
#[command(name = "lqdump")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a reflection descriptor (JSON) as a .proto document
    Render(RenderArgs),
    /// Decode a configuration table into per-sheet JSON files
    Export(ExportArgs),
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Reflection descriptor in protobufjs JSON layout
    #[arg(short, long, env = "LQDUMP_DESCRIPTOR")]
    input: PathBuf,

    /// Package whose namespace is unwrapped into the document
    #[arg(short, long, default_value = "lq")]
    package: String,

    /// Output .proto file (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Compile the rendered document and fail if it is invalid
    #[arg(long)]
    check: bool,

    #[command(flatten)]
    write: WriteOptions,
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// Companion schema describing the configuration table
    #[arg(long, env = "LQDUMP_CONFIG_PROTO")]
    config_proto: PathBuf,

    /// Binary configuration table
    #[arg(long, env = "LQDUMP_TABLE")]
    table: PathBuf,

    /// Root message of the companion schema
    #[arg(long, default_value = lqdump_core::table::DEFAULT_ROOT_MESSAGE)]
    root_message: String,

    /// Output directory for the per-sheet JSON files
    #[arg(short, long, default_value = "data")]
    output_dir: PathBuf,

    /// Also write the derived .proto document to this path
    #[arg(long)]
    derived_proto: Option<PathBuf>,

    /// Exit with an error if any block or row was skipped
    #[arg(long)]
    strict: bool,

    #[command(flatten)]
    write: WriteOptions,
}

#[derive(Args, Debug, Clone, Copy)]
struct WriteOptions {
    /// Dry run - don't write files, just show what would be written
    #[arg(long)]
    dry_run: bool,

    /// Overwrite existing files without prompting
    #[arg(long)]
    force: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    match &cli.command {
        Command::Render(args) => run_render(args),
        Command::Export(args) => run_export(args),
    }
}

/// Render the reflection descriptor
fn run_render(args: &RenderArgs) -> Result<()> {
    let data = read_input(&args.input)?;
    let tree = ReflectionNode::from_json_slice(&data)
        .with_context(|| format!("Failed to parse descriptor: {}", args.input.display()))?;

    let content = render(&tree, &args.package);

    let mut stats = StatsWriter::default();
    walk(&tree, &args.package, &mut stats)?;
    info!(
        "Rendered {} messages ({} fields), {} enums, {} services ({} methods)",
        stats.message_count,
        stats.field_count,
        stats.enum_count,
        stats.service_count,
        stats.method_count
    );

    if args.check {
        let name = proto_file_name(args.output.as_deref(), &args.package);
        compile_document(&name, &content)
            .with_context(|| format!("Rendered document {} does not compile", name))?;
        debug!("Rendered document {} compiles", name);
    }

    match &args.output {
        Some(path) => emit(path, &content, args.write),
        None => {
            print!("{}", content);
            Ok(())
        }
    }
}

/// Decode the configuration table and export every sheet
fn run_export(args: &ExportArgs) -> Result<()> {
    let config_proto = fs::read_to_string(&args.config_proto)
        .with_context(|| format!("Failed to read schema: {}", args.config_proto.display()))?;
    let blob = read_input(&args.table)?;

    let table = ConfigTable::decode_with_root(&blob, &config_proto, &args.root_message)
        .with_context(|| format!("Failed to decode table: {}", args.table.display()))?;
    info!(
        "Loaded {} schemas and {} data blocks ({} rows)",
        table.schemas.len(),
        table.datas.len(),
        table.row_count()
    );

    let derived = synthesize(&table.schemas);
    let schema = DerivedSchema::compile(&derived).context("Derived schema does not compile")?;
    let output = schema.decode(&table.datas);

    let mut targets = table_paths(&output, &args.output_dir);
    targets.extend(args.derived_proto.iter().cloned());
    check_targets(&targets, args.write)?;

    if let Some(path) = &args.derived_proto {
        emit(path, &derived, args.write)?;
    }
    let written = export_tables(&output, &args.output_dir, args.write)?;
    info!(
        "Summary: {} tables, {} records, {} written, {} skipped",
        output.tables.len(),
        output.record_count(),
        written,
        output.warnings.len()
    );

    if args.strict && !output.is_clean() {
        for warning in &output.warnings {
            warn!("{}", warning);
        }
        bail!(
            "{} blocks or rows were skipped (--strict)",
            output.warnings.len()
        );
    }

    Ok(())
}

fn table_paths(output: &DecodeOutput, output_dir: &Path) -> Vec<PathBuf> {
    output
        .tables
        .iter()
        .map(|decoded| output_dir.join(format!("{}.json", decoded.type_name)))
        .collect()
}

/// Refuse the whole run if any target exists, so nothing is half written
fn check_targets(paths: &[PathBuf], options: WriteOptions) -> Result<()> {
    if options.force || options.dry_run {
        return Ok(());
    }
    let existing: Vec<_> = paths.iter().filter(|p| p.exists()).collect();
    if let Some(first) = existing.first() {
        bail!(
            "{} output files already exist, first: {} (use --force to overwrite)",
            existing.len(),
            first.display()
        );
    }
    Ok(())
}

/// Write one `<TypeName>.json` file per decoded table, returning the count
fn export_tables(output: &DecodeOutput, output_dir: &Path, options: WriteOptions) -> Result<usize> {
    let paths = table_paths(output, output_dir);
    check_targets(&paths, options)?;

    let mut written = 0;
    for (decoded, path) in output.tables.iter().zip(&paths) {
        let content = to_pretty_json(&decoded.records)?;
        trace!("{} records for {}", decoded.records.len(), decoded.type_name);
        emit(path, &content, options)?;
        if !options.dry_run {
            written += 1;
        }
    }
    Ok(written)
}

/// Serialize with four-space indentation, non-ASCII left unescaped
fn to_pretty_json(value: &impl Serialize) -> Result<String> {
    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value
        .serialize(&mut serializer)
        .context("Failed to serialize records")?;
    Ok(String::from_utf8(buf)?)
}

fn proto_file_name(output: Option<&Path>, package: &str) -> String {
    output
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}.proto", package))
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    if !path.is_file() {
        bail!("Input file does not exist: {}", path.display());
    }
    trace!("Reading {}", path.display());
    fs::read(path).with_context(|| format!("Failed to read input file: {}", path.display()))
}

fn emit(path: &Path, content: &str, options: WriteOptions) -> Result<()> {
    if options.dry_run {
        println!("Would write: {}", path.display());
        return Ok(());
    }
    write_file(path, content, options.force)?;
    println!("Wrote {}", path.display());
    Ok(())
}

/// Write a file to disk, creating parent directories
fn write_file(output_path: &Path, content: &str, force: bool) -> Result<()> {
    // Create parent directories
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    // Check if file exists
    if output_path.exists() && !force {
        bail!(
            "File already exists: {} (use --force to overwrite)",
            output_path.display()
        );
    }

    let mut file = fs::File::create(output_path)
        .with_context(|| format!("Failed to create file: {}", output_path.display()))?;

    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write file: {}", output_path.display()))?;

    Ok(())
}
