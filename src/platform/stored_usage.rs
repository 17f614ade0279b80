use std::{collections::HashMap, future, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use futures::{stream, Stream, StreamExt};
use tracing::{debug, error};

use crate::utils::time::UsageWindow;

use super::{
    storage::record_storage::RecordStorage, IntervalGranularity, UsageStatsEntry,
    UsageStatsProvider,
};

/// [UsageStatsProvider] reading the intervals kept in a [RecordStorage].
pub struct StoredUsageProvider<S> {
    storage: Arc<S>,
}

impl<S> StoredUsageProvider<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage: Arc::new(storage),
        }
    }
}

#[async_trait]
impl<S: RecordStorage + Send + Sync + 'static> UsageStatsProvider for StoredUsageProvider<S> {
    async fn query_usage(
        &self,
        granularity: IntervalGranularity,
        start_millis: i64,
        end_millis: i64,
    ) -> Result<Vec<UsageStatsEntry>> {
        let Some(window) = UsageWindow::from_millis(start_millis, end_millis) else {
            debug!("Window {start_millis}..{end_millis} is out of range");
            return Ok(vec![]);
        };
        if window.is_empty() {
            return Ok(vec![]);
        }

        let storage = self.storage.clone();
        let days = date_range(window.start.date_naive(), window.end.date_naive())
            .map(move |day| {
                let storage = storage.clone();
                async move { (day, storage.get_data_for(day).await) }
            })
            .buffered(4)
            .collect::<Vec<_>>()
            .await;

        let mut entries = Vec::<UsageStatsEntry>::new();
        let mut positions = HashMap::<(Option<NaiveDate>, Arc<str>), usize>::new();

        for (day, data) in days {
            let data = data.inspect_err(|e| error!("Failed to process file {day} {e}"))?;
            for interval in data
                .into_iter()
                .filter_map(|v| v.clamp(window.start, window.end))
            {
                let bucket = bucket_start(granularity, interval.start.date_naive());
                let millis = interval.duration.num_milliseconds();
                match positions.get(&(bucket, interval.package_id.clone())) {
                    Some(&position) => {
                        let total = &mut entries[position].total_foreground_millis;
                        *total = total.saturating_add(millis);
                    }
                    None => {
                        positions.insert((bucket, interval.package_id.clone()), entries.len());
                        entries.push(UsageStatsEntry::new(interval.package_id, millis));
                    }
                }
            }
        }

        debug!(
            "Found {} {granularity} entries between {} and {}",
            entries.len(),
            window.start,
            window.end
        );
        Ok(entries)
    }
}

/// First day of the bucket `date` falls into. [None] stands for the single bucket of
/// [IntervalGranularity::Best].
fn bucket_start(granularity: IntervalGranularity, date: NaiveDate) -> Option<NaiveDate> {
    match granularity {
        IntervalGranularity::Daily => Some(date),
        IntervalGranularity::Weekly => {
            date.checked_sub_days(chrono::Days::new(date.weekday().num_days_from_monday().into()))
        }
        IntervalGranularity::Monthly => date.with_day(1),
        IntervalGranularity::Yearly => NaiveDate::from_ymd_opt(date.year(), 1, 1),
        IntervalGranularity::Best => None,
    }
}

/// Returns a stream of dates between start (inclusive) and end (inclusive).
fn date_range(start: NaiveDate, end: NaiveDate) -> impl Stream<Item = NaiveDate> {
    stream::unfold((Some(start), end), |(current, end)| {
        future::ready(match current {
            Some(day) if day <= end => Some((day, (day.succ_opt(), end))),
            _ => None,
        })
    })
}
