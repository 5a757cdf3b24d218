pub mod calendar;
pub mod entry;
pub mod habit;
pub mod output;
pub mod overview;
pub mod process;
pub mod section;
pub mod sync;
pub mod transfer;

use std::{fmt::Display, path::PathBuf, time::Duration};

use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::{CommandFactory, Parser, Subcommand};
use tracing::level_filters::LevelFilter;

use crate::{
    import::ImportTarget,
    journal::Journal,
    remote::{connect, postgrest::RemoteConfig, RemoteStore},
    storage::{
        entities::{find_habit, Habit, Theme},
        store::FileStore,
    },
    utils::{
        clock::DefaultClock,
        dir::{create_application_default_path, ensure_dir},
        logging::{enable_logging, LogOptions},
        time::{parse_day, DateStyle},
    },
};

pub(crate) const DATE_HELP: &str =
    "Examples are \"2025-03-15\", \"yesterday\", \"15/03/2025\". Defaults to today";

#[derive(Parser, Debug)]
#[command(name = "habit-journal", version, long_about = None)]
#[command(about = "Local-first habit journal with optional remote sync", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        global = true,
        env = "HJ_DATA_DIR",
        help = "Journal directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Print logs to the console")]
    log: bool,
    #[arg(long, global = true, help = "Log level, for example \"debug\". Overrides RUST_LOG")]
    log_level: Option<LevelFilter>,
    #[arg(long, global = true, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
    #[command(flatten)]
    remote: RemoteArgs,
}

#[derive(Debug, clap::Args)]
struct RemoteArgs {
    #[arg(long = "remote-url", global = true, env = "HJ_SUPABASE_URL")]
    url: Option<String>,
    #[arg(
        long = "remote-key",
        global = true,
        env = "HJ_SUPABASE_ANON_KEY",
        hide_env_values = true
    )]
    anon_key: Option<String>,
    #[arg(
        long = "access-token",
        global = true,
        env = "HJ_SUPABASE_ACCESS_TOKEN",
        hide_env_values = true,
        help = "Token of a signed in user. Without it the journal is only stored locally"
    )]
    access_token: Option<String>,
    #[arg(long, global = true, default_value_t = 30, help = "Remote request timeout in seconds")]
    timeout: u64,
}

impl RemoteArgs {
    fn config(self) -> Option<RemoteConfig> {
        let url = self.url.filter(|v| !v.trim().is_empty())?;
        let anon_key = self.anon_key.filter(|v| !v.trim().is_empty())?;
        Some(RemoteConfig {
            url,
            anon_key,
            access_token: self.access_token.filter(|v| !v.trim().is_empty()),
            timeout: Duration::from_secs(self.timeout),
        })
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Create, change and list habits")]
    Habit {
        #[command(subcommand)]
        command: habit::HabitCommand,
    },
    #[command(about = "Record progress against a habit")]
    Entry {
        #[command(subcommand)]
        command: entry::EntryCommand,
    },
    #[command(about = "Summary of the last 7 days")]
    Dashboard,
    #[command(about = "Month or week view of recorded entries")]
    Calendar {
        #[command(flatten)]
        command: calendar::CalendarCommand,
    },
    #[command(about = "Habit with the most entries this week")]
    Insight,
    #[command(about = "Suggested habits based on what is already tracked")]
    Suggest {
        #[command(subcommand)]
        command: Option<overview::SuggestCommand>,
    },
    #[command(about = "Group habits into sections")]
    Section {
        #[command(subcommand)]
        command: section::SectionCommand,
    },
    #[command(about = "Export the journal")]
    Export {
        #[command(subcommand)]
        command: transfer::ExportCommand,
    },
    #[command(about = "Import habits or entries from a CSV file")]
    Import {
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = ImportTarget::Entries)]
        target: ImportTarget,
    },
    #[command(about = "Push local changes to the remote store and merge its data back")]
    Sync,
    #[command(about = "Show or change the colour theme")]
    Theme {
        #[command(subcommand)]
        command: Option<ThemeCommand>,
    },
}

#[derive(Subcommand, Debug)]
enum ThemeCommand {
    Toggle,
    Set {
        #[arg(value_enum)]
        theme: Theme,
    },
}

/// Everything a command needs to run.
pub struct App {
    pub journal: Journal<FileStore>,
    pub remote: Box<dyn RemoteStore>,
    pub dir: PathBuf,
    pub theme: Theme,
    date_style: DateStyle,
}

impl App {
    pub fn remote(&self) -> &dyn RemoteStore {
        self.remote.as_ref()
    }

    pub fn today(&self) -> NaiveDate {
        self.journal.clock().today()
    }

    /// Parses user supplied day. `None` is today.
    pub fn day(&self, value: Option<&str>) -> Result<NaiveDate> {
        match value {
            None => Ok(self.today()),
            Some(value) => parse_day(value, Local::now(), self.date_style).map_err(validation_error),
        }
    }

    pub fn heading(&self, text: &str) -> String {
        output::heading(self.theme, text)
    }
}

pub(crate) fn validation_error(message: impl Display) -> anyhow::Error {
    Args::command()
        .error(clap::error::ErrorKind::ValueValidation, message)
        .into()
}

/// Value parser for amounts and goals. NaN and infinities can't be stored.
pub(crate) fn finite_number(raw: &str) -> Result<f64, String> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        Ok(_) => Err(format!("{raw} is not a finite number")),
        Err(e) => Err(e.to_string()),
    }
}

/// Habits can be referred to by id or by name.
pub(crate) fn resolve_habit<'a>(habits: &'a [Habit], key: &str) -> Option<&'a Habit> {
    let key = key.trim();
    find_habit(habits, key).or_else(|| habits.iter().find(|h| h.name.eq_ignore_ascii_case(key)))
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let dir = match args.dir {
        Some(dir) => ensure_dir(dir)?,
        None => create_application_default_path()?,
    };
    let logging_level = args
        .log_level
        .or_else(|| args.log.then_some(LevelFilter::TRACE));
    enable_logging(LogOptions {
        dir: &dir,
        level: logging_level,
        console: args.log,
    })?;

    let journal = Journal::new(FileStore::new(dir.clone())?, Box::new(DefaultClock));
    let app = App {
        theme: journal.theme().await?,
        journal,
        remote: connect(args.remote.config())?,
        dir,
        date_style: args.date_style,
    };

    match args.commands {
        Commands::Habit { command } => habit::process_habit_command(&app, command).await,
        Commands::Entry { command } => entry::process_entry_command(&app, command).await,
        Commands::Dashboard => overview::print_dashboard(&app).await,
        Commands::Calendar { command } => calendar::process_calendar_command(&app, command).await,
        Commands::Insight => overview::print_insight(&app).await,
        Commands::Suggest { command } => overview::process_suggest_command(&app, command).await,
        Commands::Section { command } => section::process_section_command(&app, command).await,
        Commands::Export { command } => transfer::process_export_command(&app, command).await,
        Commands::Import { file, target } => transfer::import_file(&app, &file, target).await,
        Commands::Sync => sync::run_sync(&app).await,
        Commands::Theme { command } => process_theme_command(&app, command).await,
    }
}

async fn process_theme_command(app: &App, command: Option<ThemeCommand>) -> Result<()> {
    let theme = match command {
        None => app.theme,
        Some(ThemeCommand::Toggle) => app.theme.toggled(),
        Some(ThemeCommand::Set { theme }) => theme,
    };
    if theme != app.theme {
        app.journal.set_theme(theme).await?;
    }
    println!("{}", output::heading(theme, &format!("{theme:?}")));
    Ok(())
}
