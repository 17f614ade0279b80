use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use crate::{
    platform::{IntervalGranularity, PackageRegistry, UsageStatsEntry, UsageStatsProvider},
    utils::{percentage::Percentage, time::UsageWindow},
};

use super::{duration::format_duration, record::UsageRecord, UsageError};

/// Reads usage for a window and ranks it. Holds nothing but references to the services, so a
/// pass never depends on the previous one.
pub struct UsageAggregator<'a> {
    usage: &'a dyn UsageStatsProvider,
    registry: &'a dyn PackageRegistry,
    granularity: IntervalGranularity,
}

impl<'a> UsageAggregator<'a> {
    pub fn new(
        usage: &'a dyn UsageStatsProvider,
        registry: &'a dyn PackageRegistry,
        granularity: IntervalGranularity,
    ) -> Self {
        Self {
            usage,
            registry,
            granularity,
        }
    }

    /// Returns installed packages used during `[window_start, window_end)`, most used first.
    #[instrument(skip(self))]
    pub async fn compute_usage(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<UsageRecord>, UsageError> {
        let window = UsageWindow::new(window_start, window_end);
        let entries = self
            .usage
            .query_usage(self.granularity, window.start_millis(), window.end_millis())
            .await
            .map_err(UsageError::Provider)?;
        debug!("Provider returned {} entries", entries.len());

        rank_usage(entries, self.registry)
    }
}

/// Ranks raw entries: merges entries of the same package, drops packages the registry can't
/// resolve, and computes every package's share of the remaining total.
pub fn rank_usage(
    entries: Vec<UsageStatsEntry>,
    registry: &dyn PackageRegistry,
) -> Result<Vec<UsageRecord>, UsageError> {
    let mut installed = merge_by_package(entries)
        .into_iter()
        .filter_map(|entry| match registry.resolve_application_info(&entry.package_id) {
            Some(info) => Some((entry, info)),
            None => {
                debug!("Dropping {} as it is no longer installed", entry.package_id);
                None
            }
        })
        .collect::<Vec<_>>();

    installed.sort_by_key(|(entry, _)| entry.total_foreground_millis);

    // Summed wide so that entries close to i64::MAX can't overflow the total.
    let total_time: i128 = installed
        .iter()
        .map(|(entry, _)| i128::from(entry.total_foreground_millis))
        .sum();
    if total_time == 0 {
        return Ok(vec![]);
    }

    let mut records = installed
        .into_iter()
        .map(|(entry, info)| {
            let millis = entry.total_foreground_millis;
            debug_assert!(millis >= 0, "negative durations are dropped while merging");
            Ok(UsageRecord {
                package_id: entry.package_id,
                icon: info.icon,
                display_name: info.display_name,
                foreground_millis: millis,
                percentage: Percentage::of(millis, total_time).unwrap_or(Percentage::ZERO),
                duration_text: format_duration(millis)?,
            })
        })
        .collect::<Result<Vec<_>, UsageError>>()?;

    records.reverse();
    Ok(records)
}

/// A window can span several provider buckets, which yields several entries per package. Merged
/// entries keep the order in which the provider first reported them.
fn merge_by_package(entries: Vec<UsageStatsEntry>) -> Vec<UsageStatsEntry> {
    let mut merged = Vec::<UsageStatsEntry>::with_capacity(entries.len());
    let mut positions = HashMap::<Arc<str>, usize>::new();

    for entry in entries {
        if entry.total_foreground_millis < 0 {
            warn!(
                "Ignoring negative foreground time {} for {}",
                entry.total_foreground_millis, entry.package_id
            );
            continue;
        }
        match positions.get(&entry.package_id) {
            Some(&position) => {
                let merged = &mut merged[position].total_foreground_millis;
                *merged = merged.saturating_add(entry.total_foreground_millis);
            }
            None => {
                positions.insert(entry.package_id.clone(), merged.len());
                merged.push(entry);
            }
        }
    }
    merged
}
