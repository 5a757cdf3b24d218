use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

use crate::{
    export::{csv::to_csv, ics::entries_to_ics, report::weekly_report, xlsx::to_xlsx},
    import::ImportTarget,
    utils::time::{date_to_key, week_start},
};

use super::{process::open_with_system, App};

#[derive(Debug, Subcommand)]
pub enum ExportCommand {
    #[command(about = "Entries or habits as CSV")]
    Csv {
        #[arg(long, value_enum, default_value_t = ImportTarget::Entries)]
        data: ImportTarget,
        #[arg(short, long, help = "Output file. Printed to stdout when missing")]
        out: Option<PathBuf>,
    },
    #[command(about = "Entries as an iCalendar file, one all-day event per entry")]
    Ics {
        #[arg(short, long, default_value = "habit_entries.ics")]
        out: PathBuf,
    },
    #[command(about = "Entries as an Excel workbook")]
    Xlsx {
        #[arg(short, long, default_value = "habit_entries.xlsx")]
        out: PathBuf,
    },
    #[command(about = "Printable weekly report. Print it to a file to get a PDF")]
    Report {
        #[arg(short, long, help = "Any day of the week to report. Defaults to today")]
        week: Option<String>,
        #[arg(short, long, help = "Output file. Defaults to the journal directory")]
        out: Option<PathBuf>,
        #[arg(long, help = "Only write the file, don't open it")]
        no_open: bool,
    },
}

async fn write_file(path: &Path, content: impl AsRef<[u8]>) -> Result<()> {
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Exported to {path:?}");
    println!("Saved {}", path.display());
    Ok(())
}

pub async fn process_export_command(app: &App, command: ExportCommand) -> Result<()> {
    let view = app.journal.load_view(app.remote()).await?;
    match command {
        ExportCommand::Csv { data, out } => {
            let csv = match data {
                ImportTarget::Entries => to_csv(&view.entries)?,
                ImportTarget::Habits => to_csv(&view.habits)?,
            };
            match out {
                Some(path) => write_file(&path, csv).await?,
                None => println!("{csv}"),
            }
        }
        ExportCommand::Ics { out } => {
            let ics = entries_to_ics(&view.entries, &view.habits, app.journal.clock().time());
            write_file(&out, ics).await?;
        }
        ExportCommand::Xlsx { out } => {
            write_file(&out, to_xlsx(&view.entries)?).await?;
        }
        ExportCommand::Report { week, out, no_open } => {
            let start = week_start(app.day(week.as_deref())?);
            let html = weekly_report(&view.habits, &view.entries, start);
            let path = out.unwrap_or_else(|| {
                app.dir
                    .join(format!("weekly_report_{}.html", date_to_key(start)))
            });
            write_file(&path, html).await?;
            if !no_open {
                open_with_system(&path)?;
            }
        }
    }
    Ok(())
}

pub async fn import_file(app: &App, file: &Path, target: ImportTarget) -> Result<()> {
    let text = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let (imported, skipped) = app.journal.import_csv(&text, target).await?;
    println!("Imported {imported} {target:?}, skipped {skipped}");
    Ok(())
}
