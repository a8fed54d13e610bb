//! `projtrack` command-line front end.
//!
//! # Responsibility
//! - Drive `projtrack_core` operations from a terminal.
//! - Print results as JSON so output can be piped into other tools.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::debug;
use projtrack_core::{init_logging, GanttEdit, LogSettings, ProjectService, TrackerConfig};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "projtrack", author, version, about)]
struct Cli {
    /// Directory holding `projects.xlsx` and `backups/`.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Enables rolling file logs in this directory.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every record.
    List,
    /// Create a record from `COLUMN=VALUE` pairs.
    Create {
        #[arg(short, long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
    /// Update fields of one record.
    Update {
        id: String,
        #[arg(short, long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
    Delete {
        id: String,
    },
    /// Import a workbook by appending to or replacing the collection.
    Import {
        file: PathBuf,
        #[arg(short, long, default_value = "append")]
        mode: String,
        /// Zero-based sheet index or sheet name.
        #[arg(short, long)]
        sheet: Option<String>,
    },
    /// List backup snapshots, newest first.
    Backups,
    FetchBackup {
        name: String,
        out: PathBuf,
    },
    Dashboard,
    Timeline,
    Gantt,
    /// Edit Gantt dates/progress of one record.
    GanttEdit {
        id: String,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        progress: Option<i64>,
    },
    /// Write the current collection to an `.xlsx` file.
    Export {
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli);
    setup_logging(&config)?;
    debug!(
        "event=cli_start module=cli status=ok data_dir={}",
        config.data_dir.display()
    );

    let service = ProjectService::new(&config);
    match cli.command {
        Commands::List => print_json(&service.list_records()),
        Commands::Create { fields } => {
            let created = service.create_record(&fields.into_iter().collect())?;
            print_json(&created)
        }
        Commands::Update { id, fields } => {
            let fields: BTreeMap<String, String> = fields.into_iter().collect();
            print_json(&service.update_record(&id, &fields)?)
        }
        Commands::Delete { id } => {
            let deleted = service.delete_record(&id)?;
            print_json(&serde_json::json!({ "ok": true, "deleted": deleted }))
        }
        Commands::Import { file, mode, sheet } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("failed to read `{}`", file.display()))?;
            print_json(&service.import_workbook(&bytes, &mode, sheet.as_deref())?)
        }
        Commands::Backups => print_json(&service.list_backups()?),
        Commands::FetchBackup { name, out } => {
            let bytes = service.fetch_backup(&name)?;
            write_output(&out, &bytes)
        }
        Commands::Dashboard => print_json(&service.dashboard_summary()),
        Commands::Timeline => print_json(&service.timeline_events()),
        Commands::Gantt => print_json(&serde_json::json!({ "tasks": service.gantt_tasks() })),
        Commands::GanttEdit {
            id,
            start,
            end,
            progress,
        } => {
            let edit = GanttEdit {
                start,
                end,
                progress,
            };
            let updated = service.apply_gantt_edit(&id, &edit)?;
            print_json(&serde_json::json!({ "ok": true, "updated": updated }))
        }
        Commands::Export { out } => {
            let bytes = service.export_workbook()?;
            write_output(&out, &bytes)
        }
    }
}

fn resolve_config(cli: &Cli) -> TrackerConfig {
    let env_config = TrackerConfig::from_env();
    let mut config = match &cli.data_dir {
        Some(dir) => TrackerConfig::with_data_dir(dir),
        None => env_config.clone(),
    };
    config.log_dir = cli.log_dir.clone().or(env_config.log_dir);
    config.log_level = cli.log_level.clone().unwrap_or(env_config.log_level);
    config
}

fn setup_logging(config: &TrackerConfig) -> Result<()> {
    let Some(log_dir) = &config.log_dir else {
        return Ok(());
    };
    let log_dir = std::path::absolute(log_dir)
        .with_context(|| format!("invalid log directory `{}`", log_dir.display()))?;
    let settings = LogSettings {
        level: config.log_level.clone(),
        log_dir,
        duplicate_to_stderr: true,
    };
    init_logging(&settings).map_err(|err| anyhow!("failed to initialize logging: {err}"))
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    let (column, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected COLUMN=VALUE, got `{raw}`"))?;
    let column = column.trim();
    if column.is_empty() {
        return Err(format!("missing column name in `{raw}`"));
    }
    Ok((column.to_string(), value.to_string()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes)
        .with_context(|| format!("failed to write `{}`", path.display()))?;
    print_json(&serde_json::json!({ "ok": true, "path": path, "bytes": bytes.len() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_field_splits_on_first_equals() {
        assert_eq!(
            parse_field("Catatan=a=b").unwrap(),
            ("Catatan".to_string(), "a=b".to_string())
        );
        assert!(parse_field("no-separator").is_err());
        assert!(parse_field(" =value").is_err());
    }

    #[test]
    fn subcommand_flags_parse() {
        let cli = Cli::parse_from([
            "projtrack",
            "--data-dir",
            "/tmp/tracker",
            "create",
            "--field",
            "BRD No=BRD1",
            "-f",
            "Project/Fitur=Alpha",
        ]);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/tracker")));
        match cli.command {
            Commands::Create { fields } => assert_eq!(fields.len(), 2),
            _ => panic!("expected create"),
        }
    }
}
