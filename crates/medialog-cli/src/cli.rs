//! Headless commands for managing the library from a terminal or script
//!
//! Usage:
//!   medialog list                              List stored records
//!   medialog show <id>                         Print one record
//!   medialog delete <id>...                    Remove records
//!   medialog export-archive [<id>...]          Write a zip of records
//!   medialog export-sheet [<id>...]            Write an .xlsx workbook
//!   medialog import <file>...                  Import archives and workbooks
//!
//! Options:
//!   --detailed         Write or read per-record detail sheets
//!   --enrich           Look up missing metadata while importing
//!   --out <path>       Destination file or directory for exports
//!   --json             Output in JSON format

use std::path::{Path, PathBuf};
use std::sync::Arc;

use medialog_core::archive::library_archive_name;
use medialog_core::utils::file_stamp;
use medialog_core::{
    ArchiveExporter, Config, FixedConsent, FolderId, ImportDecision, ImportReconciler, ImportReport,
    ImportSource, LibraryChange, NoProvider, RecordStore, SpreadsheetExporter, StoreObserver,
    TransferProgress,
};

/// CLI command to execute
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    List,
    Show(FolderId),
    Delete(Vec<FolderId>),
    ExportArchive {
        ids: Vec<FolderId>,
        out: Option<PathBuf>,
    },
    ExportSheet {
        ids: Vec<FolderId>,
        out: Option<PathBuf>,
        detailed: bool,
    },
    Import {
        files: Vec<PathBuf>,
        detailed: bool,
        enrich: bool,
    },
}

/// CLI options
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    pub json: bool,
}

/// Parse CLI arguments and return command + options
pub fn parse_args(args: &[String]) -> Result<(CliCommand, CliOptions), String> {
    let mut options = CliOptions::default();
    let mut command: Option<&str> = None;
    let mut operands: Vec<&str> = Vec::new();
    let mut out: Option<PathBuf> = None;
    let mut detailed = false;
    let mut enrich = false;

    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        match arg {
            "--json" => options.json = true,
            "--detailed" => detailed = true,
            "--enrich" => enrich = true,
            "--out" => {
                i += 1;
                if i >= args.len() {
                    return Err("--out requires a path".to_string());
                }
                out = Some(PathBuf::from(&args[i]));
            }
            _ if arg.starts_with('-') => return Err(format!("Unknown option: {}", arg)),
            _ if command.is_none() => command = Some(arg),
            _ => operands.push(arg),
        }
        i += 1;
    }

    let command = match command {
        Some("list") => CliCommand::List,
        Some("show") => match operands.as_slice() {
            [id] => CliCommand::Show(parse_id(id)?),
            _ => return Err("show requires exactly one record id".to_string()),
        },
        Some("delete") => {
            if operands.is_empty() {
                return Err("delete requires at least one record id".to_string());
            }
            CliCommand::Delete(parse_ids(&operands)?)
        }
        Some("export-archive") => CliCommand::ExportArchive {
            ids: parse_ids(&operands)?,
            out,
        },
        Some("export-sheet") => CliCommand::ExportSheet {
            ids: parse_ids(&operands)?,
            out,
            detailed,
        },
        Some("import") => {
            if operands.is_empty() {
                return Err("import requires at least one file".to_string());
            }
            CliCommand::Import {
                files: operands.iter().map(PathBuf::from).collect(),
                detailed,
                enrich,
            }
        }
        Some(other) => return Err(format!("Unknown command: {}", other)),
        None => {
            return Err(
                "No command specified. Use: list, show, delete, export-archive, export-sheet or import"
                    .to_string(),
            )
        }
    };

    Ok((command, options))
}

fn parse_id(s: &str) -> Result<FolderId, String> {
    s.parse::<FolderId>()
        .map_err(|_| format!("Invalid record id: {}", s))
}

fn parse_ids(values: &[&str]) -> Result<Vec<FolderId>, String> {
    values.iter().map(|v| parse_id(v)).collect()
}

/// Workbooks are recognised by extension; everything else is treated as an archive
fn import_source(path: &Path, detailed: bool) -> ImportSource {
    let is_workbook = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xlsx"));
    if is_workbook {
        ImportSource::Spreadsheet {
            workbook: path.to_path_buf(),
            detailed,
        }
    } else {
        ImportSource::Archive(path.to_path_buf())
    }
}

/// Logs every library change
struct LogObserver;

impl StoreObserver for LogObserver {
    fn library_changed(&self, change: &LibraryChange) {
        tracing::info!("Library changed: {:?}", change);
    }
}

/// Run CLI command
pub async fn run(command: CliCommand, options: CliOptions) -> anyhow::Result<()> {
    let config = Config::load()?;
    config.ensure_dirs()?;
    let store = RecordStore::open(&config.library_path)?.with_observer(Arc::new(LogObserver));

    match command {
        CliCommand::List => run_list(&store, options),
        CliCommand::Show(id) => run_show(&store, &id, options),
        CliCommand::Delete(ids) => run_delete(&store, &ids, options),
        CliCommand::ExportArchive { ids, out } => {
            let ids = selection(&store, ids)?;
            let dest = out.unwrap_or_else(|| config.export_path.join(library_archive_name(&file_stamp())));
            run_export_archive(&store, &ids, &dest, options)
        }
        CliCommand::ExportSheet { ids, out, detailed } => {
            let ids = selection(&store, ids)?;
            run_export_sheet(&store, &ids, out, &config.export_path, detailed, options)
        }
        CliCommand::Import {
            files,
            detailed,
            enrich,
        } => {
            let sources: Vec<ImportSource> =
                files.iter().map(|f| import_source(f, detailed)).collect();
            run_import(&store, &config.staging_path, &sources, enrich, options).await
        }
    }
}

/// Explicit ids, or the whole library when none were given
fn selection(store: &RecordStore, ids: Vec<FolderId>) -> anyhow::Result<Vec<FolderId>> {
    if ids.is_empty() {
        Ok(store.list()?)
    } else {
        Ok(ids)
    }
}

fn run_list(store: &RecordStore, options: CliOptions) -> anyhow::Result<()> {
    let records = store.read_all()?;

    if options.json {
        let items: Vec<_> = records
            .iter()
            .map(|(id, record)| {
                serde_json::json!({
                    "id": id.as_str(),
                    "category": record.category().name(),
                    "name": record.display_name(),
                    "rating": record.global_rating(),
                })
            })
            .collect();
        println!("{}", serde_json::json!({ "records": items }));
    } else {
        println!("{} record(s):", records.len());
        for (id, record) in &records {
            println!("  [{}] {}", id, record.display_name());
        }
    }

    Ok(())
}

fn run_show(store: &RecordStore, id: &FolderId, options: CliOptions) -> anyhow::Result<()> {
    let record = store.read(id)?;
    if options.json {
        println!("{}", serde_json::to_string(&record)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&record)?);
    }
    Ok(())
}

fn run_delete(store: &RecordStore, ids: &[FolderId], options: CliOptions) -> anyhow::Result<()> {
    let errors = store.delete(ids);

    if options.json {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        println!(
            "{}",
            serde_json::json!({
                "requested": ids.len(),
                "deleted": ids.len() - errors.len(),
                "errors": messages,
            })
        );
    } else {
        println!("Deleted {} of {} record(s)", ids.len() - errors.len(), ids.len());
        for error in &errors {
            println!("  - {}", error);
        }
    }

    Ok(())
}

fn progress_printer(show: bool) -> Box<dyn Fn(TransferProgress) + Send> {
    if show {
        Box::new(|progress: TransferProgress| match progress.total_files {
            Some(total) => eprint!(
                "\r{} {}/{}",
                progress.phase, progress.files_processed, total
            ),
            None => eprint!("\r{}", progress.phase),
        })
    } else {
        Box::new(|_| {})
    }
}

fn run_export_archive(
    store: &RecordStore,
    ids: &[FolderId],
    dest: &Path,
    options: CliOptions,
) -> anyhow::Result<()> {
    let show_progress = !options.json;
    let summary = ArchiveExporter::new(store)
        .with_progress(progress_printer(show_progress))
        .export(ids, dest)?;

    if show_progress {
        eprintln!(); // New line after progress
    }

    if options.json {
        println!(
            "{}",
            serde_json::json!({
                "archive": dest.to_string_lossy(),
                "records": summary.records.len(),
                "files": summary.files,
                "bytes": summary.bytes,
            })
        );
    } else {
        println!("Exported {} record(s) to {}", summary.records.len(), dest.display());
        println!("  Files: {}", summary.files);
        println!("  Bytes: {}", summary.bytes);
    }

    Ok(())
}

fn run_export_sheet(
    store: &RecordStore,
    ids: &[FolderId],
    out: Option<PathBuf>,
    export_dir: &Path,
    detailed: bool,
    options: CliOptions,
) -> anyhow::Result<()> {
    let exporter = SpreadsheetExporter::new(store).detailed(detailed);
    let export = match out {
        Some(path) if path.extension().is_some() => exporter.export_to(ids, &path)?,
        Some(dir) => exporter.export(ids, &dir)?,
        None => exporter.export(ids, export_dir)?,
    };

    if options.json {
        println!(
            "{}",
            serde_json::json!({
                "workbook": export.workbook.to_string_lossy(),
                "companion": export.companion.to_string_lossy(),
                "records": export.records,
                "detail_sheets": export.detail_sheets,
            })
        );
    } else {
        println!("Exported {} record(s) to {}", export.records, export.workbook.display());
        println!("  Detail sheets: {}", export.detail_sheets);
        println!("  Images:        {}", export.companion.display());
    }

    Ok(())
}

async fn run_import(
    store: &RecordStore,
    staging: &Path,
    sources: &[ImportSource],
    enrich: bool,
    options: CliOptions,
) -> anyhow::Result<()> {
    let decision = if enrich {
        ImportDecision::Enrich
    } else {
        ImportDecision::MergeOnly
    };
    let reconciler = ImportReconciler::new(store, staging, NoProvider, FixedConsent(decision));
    let results = reconciler.import_all(sources).await;

    if options.json {
        let items: Vec<_> = results
            .iter()
            .map(|(source, result)| match result {
                Ok(report) => report_json(source, report),
                Err(e) => serde_json::json!({
                    "file": source.path().to_string_lossy(),
                    "error": e.to_string(),
                }),
            })
            .collect();
        println!("{}", serde_json::json!({ "imports": items }));
        return Ok(());
    }

    for (source, result) in &results {
        println!("{}:", source.path().display());
        match result {
            Ok(report) => print_report(report),
            Err(e) => println!("  Failed: {} ({})", e.notification(), e),
        }
    }

    Ok(())
}

fn report_json(source: &ImportSource, report: &ImportReport) -> serde_json::Value {
    let messages = |errors: &[medialog_core::Error]| -> Vec<String> {
        errors.iter().map(|e| e.to_string()).collect()
    };
    serde_json::json!({
        "file": source.path().to_string_lossy(),
        "aborted": report.aborted(),
        "imported": report.imported.iter().map(|id| id.as_str()).collect::<Vec<_>>(),
        "renamed": report
            .renamed
            .iter()
            .map(|(from, to)| serde_json::json!({ "from": from.as_str(), "to": to.as_str() }))
            .collect::<Vec<_>>(),
        "conflicts": messages(&report.conflicts),
        "enrichment_failures": messages(&report.enrichment_failures),
        "move_failures": messages(&report.move_failures),
        "skipped_rows": report.skipped_rows,
    })
}

fn print_report(report: &ImportReport) {
    if report.aborted() {
        println!("  Aborted");
        return;
    }
    println!("  Imported: {}", report.imported.len());
    for (from, to) in &report.renamed {
        println!("  Renamed:  {} -> {}", from, to);
    }

    let problems = report
        .conflicts
        .iter()
        .chain(&report.enrichment_failures)
        .chain(&report.move_failures);
    for error in problems {
        println!("  - {}", error);
    }
    for row in &report.skipped_rows {
        println!("  - Skipped {}", row);
    }
}

/// Print CLI help
pub fn print_help() {
    println!("medialog v{}", env!("CARGO_PKG_VERSION"));
    println!("Personal catalog of anime, books, films, manga and shows");
    println!();
    println!("USAGE:");
    println!("    medialog <command> [options]");
    println!();
    println!("COMMANDS:");
    println!("    list                        List stored records");
    println!("    show <id>                   Print one record");
    println!("    delete <id>...              Remove records");
    println!("    export-archive [<id>...]    Write records to a zip archive");
    println!("    export-sheet [<id>...]      Write records to an .xlsx workbook");
    println!("    import <file>...            Import archives (.zip) and workbooks (.xlsx)");
    println!();
    println!("OPTIONS:");
    println!("    --detailed                  Include per-record detail sheets");
    println!("    --enrich                    Fetch missing metadata while importing");
    println!("    --out <path>                Destination file or directory for exports");
    println!("    --json                      Output in JSON format");
    println!();
    println!("Exports cover the whole library when no ids are given.");
    println!("Set MEDIALOG_LOG (e.g. MEDIALOG_LOG=debug) to see log output on stderr.");
    println!();
    println!("EXAMPLES:");
    println!("    medialog list --json");
    println!("    medialog export-sheet --detailed");
    println!("    medialog export-archive Anime-CowboyBebop-0 --out bebop.zip");
    println!("    medialog import Medialog-Spreadsheet-2024-01-01.xlsx --detailed");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_parse_args_list() {
        let (cmd, options) = parse_args(&args(&["list", "--json"])).unwrap();
        assert_eq!(cmd, CliCommand::List);
        assert!(options.json);
    }

    #[test]
    fn test_parse_args_show() {
        let (cmd, _) = parse_args(&args(&["show", "Film-Heat-0"])).unwrap();
        assert_eq!(cmd, CliCommand::Show("Film-Heat-0".parse().unwrap()));

        assert!(parse_args(&args(&["show"])).is_err());
        assert!(parse_args(&args(&["show", "not-an-id"])).is_err());
    }

    #[test]
    fn test_parse_args_export_sheet() {
        let (cmd, _) = parse_args(&args(&[
            "export-sheet",
            "--detailed",
            "Anime-CowboyBebop-0",
            "--out",
            "out.xlsx",
        ]))
        .unwrap();
        match cmd {
            CliCommand::ExportSheet { ids, out, detailed } => {
                assert!(detailed);
                assert_eq!(ids.len(), 1);
                assert_eq!(out, Some(PathBuf::from("out.xlsx")));
            }
            _ => panic!("Expected ExportSheet command"),
        }
    }

    #[test]
    fn test_parse_args_import() {
        let (cmd, _) = parse_args(&args(&["import", "a.zip", "b.xlsx", "--enrich"])).unwrap();
        match cmd {
            CliCommand::Import {
                files,
                detailed,
                enrich,
            } => {
                assert_eq!(files.len(), 2);
                assert!(!detailed);
                assert!(enrich);
            }
            _ => panic!("Expected Import command"),
        }
        assert!(parse_args(&args(&["import"])).is_err());
    }

    #[test]
    fn test_parse_args_rejects_unknown() {
        assert!(parse_args(&args(&["frobnicate"])).is_err());
        assert!(parse_args(&args(&["list", "--verbose"])).is_err());
        assert!(parse_args(&args(&["--json"])).is_err());
    }

    #[test]
    fn test_import_source_by_extension() {
        assert!(matches!(
            import_source(Path::new("lib.XLSX"), true),
            ImportSource::Spreadsheet { detailed: true, .. }
        ));
        assert!(matches!(
            import_source(Path::new("lib.zip"), true),
            ImportSource::Archive(_)
        ));
    }
}
