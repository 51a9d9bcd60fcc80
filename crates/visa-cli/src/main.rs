//! Visa Catalog CLI
//!
//! Command-line tool for importing, searching, editing and exporting visa
//! service fee catalogs. Every invocation is one session: the input files are
//! imported into a fresh dataset, the command runs, and nothing is kept.

mod logging;

use chrono::Local;
use clap::{Args, Parser, Subcommand};
use visa_core::serializer::csv_row;
use visa_core::{
    apply_script, export, export_file_name, filter, read_sources, scan_directory, Dataset,
    EditScript, ExportFormat, ImportMode, NewRecord, NormalizerConfig, Operation, Selection,
};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "visa-cli")]
#[command(about = "Visa Service Catalog Editor", long_about = None)]
#[command(version)]
struct Cli {
    /// Log debug output to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where the session's records come from
#[derive(Args)]
struct SourceArgs {
    /// Files or directories to import (replaces the empty dataset)
    #[arg(short, long, required = true)]
    input: Vec<PathBuf>,

    /// Files or directories imported afterwards and appended
    #[arg(long)]
    append: Vec<PathBuf>,

    /// Normalizer settings (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List importable files and their detected formats
    Scan {
        /// Root directories to scan
        #[arg(short, long, required = true)]
        root: Vec<PathBuf>,

        /// Normalizer settings (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Import files and report what was found
    Import {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Show imported records, optionally filtered by a search query
    Show {
        #[command(flatten)]
        source: SourceArgs,

        /// Search text (case-insensitive)
        #[arg(short, long, default_value = "")]
        query: String,

        /// Maximum number of rows to display
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Print summary counters
    Stats {
        #[command(flatten)]
        source: SourceArgs,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export imported records
    Export {
        #[command(flatten)]
        source: SourceArgs,

        /// Output format (csv, json or legacy-json)
        #[arg(long, default_value = "csv")]
        format: ExportFormat,

        /// Only export records matching this search text
        #[arg(short, long, default_value = "")]
        query: String,

        /// Output file path (defaults to visa-catalog-<date>.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Apply an edit script, then export the result
    Apply {
        #[command(flatten)]
        source: SourceArgs,

        /// Path to edit script (JSON)
        #[arg(short, long)]
        edits: PathBuf,

        /// Output format (csv, json or legacy-json)
        #[arg(long, default_value = "json")]
        format: ExportFormat,

        /// Output file path (defaults to visa-catalog-<date>.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Create an edit script template
    CreateEdits {
        /// Output path for the script
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Write the default normalizer settings to a file
    CreateConfig {
        /// Output path for the settings
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> visa_core::Result<()> {
    match command {
        Commands::Scan { root, config } => cmd_scan(&root, config.as_deref()),
        Commands::Import { source } => cmd_import(&source),
        Commands::Show {
            source,
            query,
            limit,
        } => cmd_show(&source, &query, limit),
        Commands::Stats { source, json } => cmd_stats(&source, json),
        Commands::Export {
            source,
            format,
            query,
            output,
        } => cmd_export(&source, format, &query, output),
        Commands::Apply {
            source,
            edits,
            format,
            output,
        } => cmd_apply(&source, &edits, format, output),
        Commands::CreateEdits { output } => cmd_create_edits(&output),
        Commands::CreateConfig { output } => cmd_create_config(&output),
    }
}

fn load_config(path: Option<&Path>) -> visa_core::Result<NormalizerConfig> {
    match path {
        Some(path) => NormalizerConfig::load(path),
        None => Ok(NormalizerConfig::default()),
    }
}

/// Import the session's files into a fresh dataset
fn load_session(source: &SourceArgs) -> visa_core::Result<Dataset> {
    let config = load_config(source.config.as_deref())?;
    let mut dataset = Dataset::new();

    let batches = [
        (&source.input, ImportMode::Replace),
        (&source.append, ImportMode::Append),
    ];
    for (roots, mode) in batches {
        if roots.is_empty() {
            continue;
        }

        let scan = scan_directory(roots, &config)?;
        let (files, read_failures) = read_sources(&scan.paths());
        let report = dataset.normalize(&files, &config);

        for failure in read_failures.iter().chain(report.failures.iter()) {
            eprintln!("Warning: {}: {}", failure.name, failure.error);
        }
        for file in &report.files {
            eprintln!(
                "Imported {} ({} format): {} rows -> {} records",
                file.name, file.format, file.rows, file.records
            );
        }

        if report.is_empty() {
            eprintln!("No valid data found in {} file(s)", files.len());
            continue;
        }
        dataset.import_batch(report.records, mode);
    }

    Ok(dataset)
}

fn cmd_scan(roots: &[PathBuf], config: Option<&Path>) -> visa_core::Result<()> {
    let config = load_config(config)?;
    let result = scan_directory(roots, &config)?;

    println!("Scanned {} root(s):", result.roots.len());
    for root in &result.roots {
        println!("  {}", root.display());
    }
    println!();
    println!("Found {} file(s):", result.candidates.len());
    for candidate in &result.candidates {
        let format = candidate
            .format
            .map(|f| f.to_string())
            .unwrap_or_else(|| "unrecognized".to_string());
        println!("  {} [{}]", candidate.path.display(), format);
    }

    Ok(())
}

fn cmd_import(source: &SourceArgs) -> visa_core::Result<()> {
    let dataset = load_session(source)?;
    println!("Successfully imported {} entries", dataset.len());
    print_stats(&dataset);
    Ok(())
}

fn cmd_show(source: &SourceArgs, query: &str, limit: Option<usize>) -> visa_core::Result<()> {
    let dataset = load_session(source)?;
    let rows = filter(dataset.all(), query);

    if rows.is_empty() {
        println!("No matching records.");
        return Ok(());
    }

    let header = visa_core::serializer::CSV_HEADERS;
    println!("{}", header.join("\t"));
    println!("{}", "-".repeat(header.len() * 12));

    let row_limit = limit.unwrap_or(rows.len());
    for record in rows.iter().take(row_limit) {
        println!("{}", csv_row(record).join("\t"));
    }

    if rows.len() > row_limit {
        println!("... ({} more rows)", rows.len() - row_limit);
    }

    Ok(())
}

fn cmd_stats(source: &SourceArgs, json: bool) -> visa_core::Result<()> {
    let dataset = load_session(source)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&dataset.stats())?);
    } else {
        print_stats(&dataset);
    }
    Ok(())
}

fn print_stats(dataset: &Dataset) {
    let stats = dataset.stats();
    println!("Records:    {}", stats.total);
    println!("Complete:   {}", stats.complete);
    println!("Total cost: ${:.2}", stats.total_cost);
    println!("Documents:  {}", stats.total_documents);
}

fn cmd_export(
    source: &SourceArgs,
    format: ExportFormat,
    query: &str,
    output: Option<PathBuf>,
) -> visa_core::Result<()> {
    let dataset = load_session(source)?;
    let rows = filter(dataset.all(), query);
    let output = write_export(rows.iter().copied(), format, output)?;

    println!("Exported {} rows to {}", rows.len(), output.display());
    Ok(())
}

fn cmd_apply(
    source: &SourceArgs,
    edits_path: &Path,
    format: ExportFormat,
    output: Option<PathBuf>,
) -> visa_core::Result<()> {
    let script = EditScript::load(edits_path)?;
    println!("Loaded edit script with {} operations", script.operations.len());

    let mut dataset = load_session(source)?;
    let result = apply_script(&mut dataset, &script);

    println!(
        "Applied {} operations ({} records affected)",
        result.applied, result.records_affected
    );
    if !result.added_ids.is_empty() {
        println!("Added records: {:?}", result.added_ids);
    }
    if !result.failed.is_empty() {
        println!("\nWarning: {} operations could not be applied:", result.failed.len());
        for (operation, error) in &result.failed {
            println!("  - {:?}: {}", operation, error);
        }
    }

    let output = write_export(dataset.all(), format, output)?;
    println!("Exported {} rows to {}", dataset.len(), output.display());
    Ok(())
}

fn write_export<'a, I>(
    records: I,
    format: ExportFormat,
    output: Option<PathBuf>,
) -> visa_core::Result<PathBuf>
where
    I: IntoIterator<Item = &'a visa_core::CanonicalRecord>,
{
    let output = output
        .unwrap_or_else(|| PathBuf::from(export_file_name(format, Local::now().date_naive())));
    let text = export(records, format)?;

    let file = File::create(&output)?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "{}", text.trim_end())?;
    writer.flush()?;

    Ok(output)
}

fn cmd_create_edits(output: &Path) -> visa_core::Result<()> {
    let mut script = EditScript::new();
    script.push(Operation::SetFee { id: 0, fee: 0.0 });
    script.push(Operation::MergeDocuments {
        selection: Selection::query("schengen"),
        required: vec!["Passport".to_string()],
        special: vec![],
    });
    script.push(Operation::Add {
        record: NewRecord {
            destination_country: "Country".to_string(),
            service_name: "Visa".to_string(),
            ..Default::default()
        },
    });

    script.save(output)?;
    println!("Created edit script: {}", output.display());
    println!();
    println!("Edit the file to describe your changes, then run:");
    println!(
        "  visa-cli apply --input <files> --edits {} --output <file>",
        output.display()
    );

    Ok(())
}

fn cmd_create_config(output: &Path) -> visa_core::Result<()> {
    NormalizerConfig::default().save(output)?;
    println!("Created config: {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_export_arguments() {
        let cli = Cli::try_parse_from([
            "visa-cli", "export", "-i", "data", "--append", "more.csv", "--format", "legacy-json",
            "-q", "schengen",
        ])
        .unwrap();

        match cli.command {
            Commands::Export {
                source,
                format,
                query,
                output,
            } => {
                assert_eq!(source.input, vec![PathBuf::from("data")]);
                assert_eq!(source.append, vec![PathBuf::from("more.csv")]);
                assert_eq!(format, ExportFormat::LegacyJson);
                assert_eq!(query, "schengen");
                assert!(output.is_none());
            }
            _ => panic!("expected export command"),
        }
    }

    #[test]
    fn test_session_import_and_export() {
        let dir = std::env::temp_dir().join(format!("visa-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("feesexport.csv"),
            "Destination Country,Cost,Title\nFrance,80,Schengen Visa\nIndia,25,eVisa\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("feescorrected.csv"),
            "Countries_Applied_To,Cost\n\"Peru, Chile\",30\n",
        )
        .unwrap();

        let source = SourceArgs {
            input: vec![dir.clone()],
            append: vec![dir.join("feesexport.csv")],
            config: None,
        };
        let dataset = load_session(&source).unwrap();
        assert_eq!(dataset.len(), 6);

        let out = dir.join("out.csv");
        write_export(dataset.all(), ExportFormat::Csv, Some(out.clone())).unwrap();
        let text = std::fs::read_to_string(&out).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(text.lines().count(), 7);
        assert!(text.starts_with("\"ID\",\"Destination Country\""));
    }
}
