//! Contracts of the services usage statistics are read from, together with file-backed
//! realizations of them. The aggregation code only ever talks to the traits in this module.

pub mod grants;
pub mod registry;
pub mod storage;
pub mod stored_usage;

use std::{fmt::Display, path::PathBuf, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[cfg(test)]
use mockall::automock;

/// Operation that must be authorized before usage statistics can be read.
pub const OP_GET_USAGE_STATS: &str = "get_usage_stats";

/// Permission consulted when the operation grant is left at [GrantMode::Default].
pub const PERMISSION_PACKAGE_USAGE_STATS: &str = "package_usage_stats";

/// Authorization state of an operation for a specific owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GrantMode {
    Allowed,
    Denied,
    /// Nothing was decided for the operation, the calling permission decides instead.
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Granted,
    Denied,
}

#[cfg_attr(test, automock)]
pub trait PermissionProvider {
    fn check_operation_grant(&self, op: &str, process_id: u32, owner_id: &str)
        -> Result<GrantMode>;

    fn check_calling_permission(&self, permission: &str) -> Result<PermissionStatus>;
}

/// Size of the buckets the provider splits usage into. A window crossing a bucket boundary
/// produces one entry per bucket for the same package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum IntervalGranularity {
    #[default]
    Daily,
    Weekly,
    Monthly,
    Yearly,
    /// A single bucket covering the whole window.
    Best,
}

impl Display for IntervalGranularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntervalGranularity::Daily => write!(f, "daily"),
            IntervalGranularity::Weekly => write!(f, "weekly"),
            IntervalGranularity::Monthly => write!(f, "monthly"),
            IntervalGranularity::Yearly => write!(f, "yearly"),
            IntervalGranularity::Best => write!(f, "best"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageStatsEntry {
    pub package_id: Arc<str>,
    pub total_foreground_millis: i64,
}

impl UsageStatsEntry {
    pub fn new(package_id: impl Into<Arc<str>>, total_foreground_millis: i64) -> Self {
        Self {
            package_id: package_id.into(),
            total_foreground_millis,
        }
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait UsageStatsProvider: Send + Sync {
    /// Returns foreground usage per package for `[start_millis, end_millis)`.
    async fn query_usage(
        &self,
        granularity: IntervalGranularity,
        start_millis: i64,
        end_millis: i64,
    ) -> Result<Vec<UsageStatsEntry>>;
}

/// Reference to an application icon. Loading the image is left to whoever renders it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IconRef(pub PathBuf);

impl Display for IconRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationInfo {
    pub package_id: Arc<str>,
    pub display_name: Arc<str>,
    #[serde(default)]
    pub icon: Option<IconRef>,
}

/// Registry of installed applications.
#[cfg_attr(test, automock)]
pub trait PackageRegistry {
    /// [None] when the package is not installed anymore.
    fn resolve_application_info(&self, package_id: &str) -> Option<ApplicationInfo>;
}
