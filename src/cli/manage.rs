use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Duration;
use clap::Parser;
use tracing::info;

use crate::{
    platform::{
        grants::FileGrantProvider,
        registry::ManifestRegistry,
        storage::{
            entities::UsageIntervalEntity,
            record_storage::{store_intervals, RecordStorageImpl},
        },
        ApplicationInfo, GrantMode, IconRef, PermissionStatus, OP_GET_USAGE_STATS,
        PERMISSION_PACKAGE_USAGE_STATS,
    },
    utils::clock::{Clock, DefaultClock},
};

use super::{report::parse_moment, DateStyle, OWNER_ID};

#[derive(Debug, Parser)]
pub struct AccessCommand {
    #[arg(long, help = "Grant state of the usage statistics operation")]
    mode: GrantMode,
    #[arg(long, help = "Calling permission consulted while the mode is default")]
    calling_permission: Option<PermissionStatus>,
}

#[derive(Debug, Parser)]
pub struct RegisterCommand {
    #[arg(help = "Package id usage is recorded under")]
    package: String,
    #[arg(long, help = "Name shown in the usage list")]
    name: String,
    #[arg(long, help = "Path to the application icon")]
    icon: Option<PathBuf>,
}

#[derive(Debug, Parser)]
pub struct RecordCommand {
    #[arg(help = "Package id of the application")]
    package: String,
    #[arg(long, help = "Foreground time in seconds")]
    seconds: u32,
    #[arg(
        long = "start",
        short,
        help = "When the application came to the foreground. Defaults to `seconds` ago"
    )]
    start_date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk)]
    date_style: DateStyle,
}

/// Stands in for the system settings screen where usage access is toggled.
pub fn process_access_command(
    AccessCommand {
        mode,
        calling_permission,
    }: AccessCommand,
    dir: &Path,
) -> Result<()> {
    let grants = FileGrantProvider::in_dir(dir);
    grants.set_operation_mode(OP_GET_USAGE_STATS, OWNER_ID, mode)?;
    if let Some(status) = calling_permission {
        grants.set_calling_permission(PERMISSION_PACKAGE_USAGE_STATS, status)?;
    }
    info!("Usage access set to {mode:?}");
    Ok(())
}

pub fn process_register_command(
    RegisterCommand {
        package,
        name,
        icon,
    }: RegisterCommand,
    dir: &Path,
) -> Result<()> {
    let mut registry = ManifestRegistry::open_in(dir)?;
    registry.register(ApplicationInfo {
        package_id: package.into(),
        display_name: name.into(),
        icon: icon.map(IconRef),
    })
}

pub async fn process_record_command(command: RecordCommand, dir: &Path) -> Result<()> {
    let storage = RecordStorageImpl::new(dir.join("records"))?;
    let interval = record_interval(command, &DefaultClock)?;
    info!("Recording {interval:?}");
    store_intervals(&storage, [interval]).await
}

fn record_interval(
    RecordCommand {
        package,
        seconds,
        start_date,
        date_style,
    }: RecordCommand,
    clock: &dyn Clock,
) -> Result<UsageIntervalEntity> {
    let duration = Duration::seconds(seconds.into());
    let start = match start_date {
        Some(start_date) => parse_moment(&start_date, date_style, clock, "start")?,
        None => clock.time() - duration,
    };
    Ok(UsageIntervalEntity {
        package_id: package.into(),
        start,
        duration,
    })
}
