//! CSV Metadata CLI
//!
//! Command-line tool for exporting book metadata to CSV and updating a
//! library from an edited CSV file.

use clap::{Parser, Subcommand};
use csvmeta_core::{
    format_description, parse_file, serialize_document, Error, ExportTransform, FieldCatalog,
    FieldId, FieldSelection, JsonPrefs, MemoryStore, MergeOptions, MergePlan, MergeReport,
    SelectionSource, UpdateMergeTransform,
};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// File name of the preferences kept next to a library
const PREFS_FILE_NAME: &str = "csvmeta-prefs.json";

#[derive(Parser)]
#[command(name = "csvmeta")]
#[command(about = "Export book metadata to CSV and update it from a CSV file", long_about = None)]
#[command(version)]
struct Cli {
    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty library file with the standard fields
    Init {
        /// Library file to create
        #[arg(short, long)]
        library: PathBuf,

        /// Name of the library
        #[arg(short, long, default_value = "Library")]
        name: String,
    },

    /// List exportable fields in display order
    Fields {
        /// Library file (JSON)
        #[arg(short, long)]
        library: PathBuf,

        /// Preferences file (defaults to csvmeta-prefs.json next to the library)
        #[arg(short, long)]
        prefs: Option<PathBuf>,
    },

    /// Change which fields are exported and in what order
    Select {
        /// Library file (JSON)
        #[arg(short, long)]
        library: PathBuf,

        /// Preferences file (defaults to csvmeta-prefs.json next to the library)
        #[arg(short, long)]
        prefs: Option<PathBuf>,

        /// Fields to include
        #[arg(short, long, value_delimiter = ',')]
        add: Vec<String>,

        /// Fields to exclude
        #[arg(short, long, value_delimiter = ',')]
        remove: Vec<String>,

        /// Field order, first field first
        #[arg(short, long, value_delimiter = ',')]
        order: Vec<String>,

        /// Select every field except those given with --hide
        #[arg(long)]
        select_visible: bool,

        /// Fields hidden from --select-visible
        #[arg(long, value_delimiter = ',')]
        hide: Vec<String>,
    },

    /// Export records to a CSV file
    Export {
        /// Library file (JSON)
        #[arg(short, long)]
        library: PathBuf,

        /// Preferences file (defaults to csvmeta-prefs.json next to the library)
        #[arg(short, long)]
        prefs: Option<PathBuf>,

        /// Record ids to export (all records if omitted)
        #[arg(short, long, value_delimiter = ',')]
        ids: Vec<i64>,

        /// Output file path (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Update records from a CSV file
    Import {
        /// Library file (JSON)
        #[arg(short, long)]
        library: PathBuf,

        /// CSV file to import
        #[arg(short, long)]
        file: PathBuf,

        /// Field identifying the record of each row
        #[arg(short, long, default_value = "id")]
        key: String,

        /// Show what would change without saving the library
        #[arg(long)]
        dry_run: bool,
    },

    /// Describe the CSV format
    Format,

    /// Validate a CSV file and show its shape
    Parse {
        /// Path to CSV file
        #[arg(short, long)]
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands) -> csvmeta_core::Result<()> {
    match command {
        Commands::Init { library, name } => cmd_init(&library, &name),
        Commands::Fields { library, prefs } => cmd_fields(&library, prefs),
        Commands::Select {
            library,
            prefs,
            add,
            remove,
            order,
            select_visible,
            hide,
        } => cmd_select(
            &library,
            prefs,
            SelectChanges {
                add,
                remove,
                order,
                select_visible,
                hide,
            },
        ),
        Commands::Export {
            library,
            prefs,
            ids,
            output,
        } => cmd_export(&library, prefs, &ids, output.as_deref()),
        Commands::Import {
            library,
            file,
            key,
            dry_run,
        } => cmd_import(&library, &file, &key, dry_run),
        Commands::Format => {
            print!("{}", format_description());
            Ok(())
        }
        Commands::Parse { file } => cmd_parse(&file),
    }
}

fn prefs_path(library: &Path, prefs: Option<PathBuf>) -> PathBuf {
    prefs.unwrap_or_else(|| library.with_file_name(PREFS_FILE_NAME))
}

fn cmd_init(library: &Path, name: &str) -> csvmeta_core::Result<()> {
    let store = MemoryStore::with_standard_fields(name);
    store.save(library)?;
    println!("Created library '{}' at {}", name, library.display());
    Ok(())
}

fn cmd_fields(library: &Path, prefs: Option<PathBuf>) -> csvmeta_core::Result<()> {
    let store = MemoryStore::load(library)?;
    let prefs = JsonPrefs::load(prefs_path(library, prefs))?;
    let catalog = FieldCatalog::from_store(&store);
    let selection = FieldSelection::load(&prefs);

    println!("Fields ({}):", catalog.len());
    for (field, selected) in selection.ordered_catalog(&catalog) {
        let marker = if selected { "[x]" } else { "[ ]" };
        println!("  {} {:<24} {}", marker, field.id, field.display_name);
    }
    Ok(())
}

struct SelectChanges {
    add: Vec<String>,
    remove: Vec<String>,
    order: Vec<String>,
    select_visible: bool,
    hide: Vec<String>,
}

fn cmd_select(
    library: &Path,
    prefs: Option<PathBuf>,
    changes: SelectChanges,
) -> csvmeta_core::Result<()> {
    let store = MemoryStore::load(library)?;
    let mut prefs = JsonPrefs::load(prefs_path(library, prefs))?;
    let catalog = FieldCatalog::from_store(&store);
    let mut selection = FieldSelection::load(&prefs);

    let known = |name: &String| -> csvmeta_core::Result<FieldId> {
        let id = FieldId::new(name.trim());
        if catalog.contains(&id) {
            Ok(id)
        } else {
            Err(Error::UnknownField(id))
        }
    };

    if changes.select_visible {
        let hidden = changes
            .hide
            .iter()
            .map(known)
            .collect::<csvmeta_core::Result<HashSet<_>>>()?;
        selection.select_visible(&catalog, &hidden);
    }
    for name in &changes.add {
        selection.toggle(known(name)?, true);
    }
    for name in &changes.remove {
        selection.toggle(known(name)?, false);
    }
    if !changes.order.is_empty() {
        let order = changes
            .order
            .iter()
            .map(known)
            .collect::<csvmeta_core::Result<Vec<_>>>()?;
        selection.reorder(&order);
    }

    let fields = selection.confirm(&catalog, &mut prefs)?;
    prefs.save()?;

    let names: Vec<String> = fields.iter().map(|f| catalog.display_name(f)).collect();
    println!("Selected {} field(s): {}", fields.len(), names.join(", "));
    println!("Saved to {}", prefs.path().display());
    Ok(())
}

fn cmd_export(
    library: &Path,
    prefs: Option<PathBuf>,
    ids: &[i64],
    output: Option<&Path>,
) -> csvmeta_core::Result<()> {
    let store = MemoryStore::load(library)?;
    let mut prefs = JsonPrefs::load(prefs_path(library, prefs))?;
    let catalog = FieldCatalog::from_store(&store);
    let fields = FieldSelection::load(&prefs).confirm(&catalog, &mut prefs)?;

    let record_ids = if ids.is_empty() {
        store.selected_record_ids()
    } else {
        ids.selected_record_ids()
    };

    let doc = ExportTransform::new(&store, &catalog).build_rows(&record_ids, &fields)?;
    let csv = serialize_document(&doc)?;
    prefs.save()?;

    match output {
        Some(path) => {
            fs::write(path, &csv)?;
            info!(path = %path.display(), "wrote export");
            println!(
                "Exported {} record(s) with {} field(s) to {}",
                doc.row_count(),
                doc.column_count(),
                path.display()
            );
        }
        None => print!("{}", csv),
    }
    Ok(())
}

fn cmd_import(library: &Path, file: &Path, key: &str, dry_run: bool) -> csvmeta_core::Result<()> {
    let mut store = MemoryStore::load(library)?;
    let doc = parse_file(file)?;
    let catalog = FieldCatalog::from_store(&store);
    let options = MergeOptions {
        key_field: FieldId::new(key),
    };
    let transform = UpdateMergeTransform::with_options(&catalog, options);

    println!(
        "Loaded {} row(s) with {} column(s) from {}",
        doc.row_count(),
        doc.column_count(),
        file.display()
    );

    if dry_run {
        let plan = transform.plan(&doc, &store)?;
        print_plan(&plan, &catalog);
        return Ok(());
    }

    let report = transform.run(&doc, &mut store)?;
    if report.updated_count > 0 {
        store.save(library)?;
    }
    print_report(&report);
    Ok(())
}

fn print_plan(plan: &MergePlan, catalog: &FieldCatalog) {
    println!("\nDry run, nothing saved.");
    for update in &plan.updates {
        println!("  Record {} (row {}):", update.record, update.row);
        for (field, change) in &update.changes {
            let field_type = catalog
                .get(field)
                .map(|f| f.data_type.clone())
                .unwrap_or(csvmeta_core::DataType::Text);
            match change {
                Some(value) => println!(
                    "    set {} = {}",
                    catalog.display_name(field),
                    value.format(&field_type)
                ),
                None => println!("    delete {}", catalog.display_name(field)),
            }
        }
    }
    println!("\n{} record(s) would be updated", plan.updates.len());
    println!("{} record(s) unchanged", plan.unchanged_count);
    print_problems(
        plan.skipped_rows.iter().map(ToString::to_string),
        plan.skipped_columns.iter().map(ToString::to_string),
        plan.conversion_errors.iter().map(ToString::to_string),
    );
}

fn print_report(report: &MergeReport) {
    println!("\nImport complete:");
    println!("  {} record(s) updated", report.updated_count);
    println!("  {} record(s) unchanged", report.unchanged_count);
    print_problems(
        report.skipped_rows.iter().map(ToString::to_string),
        report.skipped_columns.iter().map(ToString::to_string),
        report
            .conversion_errors
            .iter()
            .map(ToString::to_string)
            .chain(report.failed_updates.iter().map(ToString::to_string)),
    );
}

fn print_problems(
    rows: impl Iterator<Item = String>,
    columns: impl Iterator<Item = String>,
    cells: impl Iterator<Item = String>,
) {
    for (title, lines) in [
        ("Skipped rows", rows.collect::<Vec<_>>()),
        ("Skipped columns", columns.collect()),
        ("Errors", cells.collect()),
    ] {
        if lines.is_empty() {
            continue;
        }
        println!("\n{} ({}):", title, lines.len());
        for line in lines {
            println!("  - {}", line);
        }
    }
}

fn cmd_parse(file: &Path) -> csvmeta_core::Result<()> {
    let doc = parse_file(file)?;

    println!("File: {}", file.display());
    println!("Columns: {}", doc.column_count());
    println!("Rows: {}", doc.row_count());
    println!();

    println!("{}", doc.header().join("\t"));
    println!("{}", "-".repeat(doc.column_count() * 12));

    for row in doc.rows().iter().take(10) {
        println!("{}", row.join("\t"));
    }

    if doc.row_count() > 10 {
        println!("... ({} more rows)", doc.row_count() - 10);
    }

    Ok(())
}
