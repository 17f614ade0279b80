pub mod manage;
pub mod report;

use std::{
    fmt::Display,
    io::{self, IsTerminal},
    path::{Path, PathBuf},
};

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use manage::{
    process_access_command, process_record_command, process_register_command, AccessCommand,
    RecordCommand, RegisterCommand,
};
use report::{process_show_command, process_status_command, ShowCommand};
use tracing::{debug, level_filters::LevelFilter};

use crate::{
    platform::{
        grants::FileGrantProvider,
        registry::{CompositeRegistry, ExecutableRegistry, ManifestRegistry},
        storage::record_storage::RecordStorageImpl,
        stored_usage::StoredUsageProvider,
    },
    utils::{
        dir::{create_application_default_path, ensure_dir},
        logging::{enable_logging, CLI_PREFIX},
    },
};

/// Owner the usage grant is checked for.
pub const OWNER_ID: &str = env!("CARGO_PKG_NAME");

#[derive(Parser, Debug)]
#[command(name = "usagestats", version, long_about = None)]
#[command(about = "Ranks applications by foreground usage", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, global = true, help = "Print logs to the console")]
    log: bool,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to use $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Check usage access and show what the screen would display")]
    Status {},
    #[command(about = "List applications ranked by foreground time")]
    Show {
        #[command(flatten)]
        command: ShowCommand,
    },
    #[command(about = "Change usage access grant state")]
    Access {
        #[command(flatten)]
        command: AccessCommand,
    },
    #[command(about = "Register an installed application")]
    Register {
        #[command(flatten)]
        command: RegisterCommand,
    },
    #[command(about = "Record foreground time of an application")]
    Record {
        #[command(flatten)]
        command: RecordCommand,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

/// File-backed services living in the application directory.
pub struct Services {
    pub grants: FileGrantProvider,
    pub usage: StoredUsageProvider<RecordStorageImpl>,
    pub registry: CompositeRegistry,
}

impl Services {
    pub fn open(dir: &Path) -> Result<Self> {
        let storage = RecordStorageImpl::new(dir.join("records"))?;
        let manifest = ManifestRegistry::open_in(dir)?;
        Ok(Self {
            grants: FileGrantProvider::in_dir(dir),
            usage: StoredUsageProvider::new(storage),
            registry: CompositeRegistry::new(vec![
                Box::new(manifest),
                Box::new(ExecutableRegistry),
            ]),
        })
    }
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let dir = match args.dir {
        Some(dir) => ensure_dir(dir)?,
        None => create_application_default_path()?,
    };

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(CLI_PREFIX, &dir.join("logs"), logging_level, args.log)?;
    debug!("Using application directory {dir:?}");

    let colored = io::stdout().is_terminal();
    match args.commands {
        Commands::Status {} => process_status_command(&dir, colored),
        Commands::Show { command } => process_show_command(command, &dir, colored).await,
        Commands::Access { command } => process_access_command(command, &dir),
        Commands::Register { command } => process_register_command(command, &dir),
        Commands::Record { command } => process_record_command(command, &dir).await,
    }
}
