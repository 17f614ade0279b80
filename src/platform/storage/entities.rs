use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use std::sync::Arc;

/// Foreground usage of a package stored on disk. One interval stands for the package being in
/// the foreground from `start` for `duration`.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct UsageIntervalEntity {
    pub package_id: Arc<str>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub start: DateTime<Utc>,
    #[serde(with = "duration_ser")]
    pub duration: Duration,
}

impl UsageIntervalEntity {
    /// Saturates at the latest representable moment.
    pub fn end(&self) -> DateTime<Utc> {
        self.start
            .checked_add_signed(self.duration)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Splits an interval into 2 halves, 1 before split, 1 after.
    pub fn split_by(
        self,
        split: DateTime<Utc>,
    ) -> (Option<UsageIntervalEntity>, Option<UsageIntervalEntity>) {
        let end = self.end();
        if split <= self.start {
            (None, Some(self))
        } else if split >= end {
            (Some(self), None)
        } else {
            let before = UsageIntervalEntity {
                package_id: self.package_id.clone(),
                start: self.start,
                duration: split - self.start,
            };
            let after = UsageIntervalEntity {
                package_id: self.package_id,
                start: split,
                duration: end - split,
            };
            (Some(before), Some(after))
        }
    }

    /// Returns usage only inside `[from, to)`. Because the usage might happen outside of the
    /// specified interval the result is optional.
    pub fn clamp(self, from: DateTime<Utc>, to: DateTime<Utc>) -> Option<UsageIntervalEntity> {
        self.split_by(from)
            .1
            .and_then(|v| v.split_by(to).0)
            .filter(|v| v.duration > Duration::zero())
    }

    /// Cuts the interval at every UTC midnight it crosses, so each piece belongs to one record
    /// file.
    pub fn split_by_day(self) -> Vec<UsageIntervalEntity> {
        let mut pieces = vec![];
        let mut rest = Some(self);
        while let Some(current) = rest.take() {
            let next_day = current
                .start
                .checked_add_signed(Duration::days(1))
                .and_then(|v| v.with_time(NaiveTime::MIN).single());
            match next_day {
                Some(midnight) => {
                    let (before, after) = current.split_by(midnight);
                    pieces.extend(before);
                    rest = after;
                }
                None => pieces.push(current),
            }
        }
        pieces
    }
}

mod duration_ser {
    use chrono::Duration;
    use serde::{self, de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(duration.num_seconds())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = i64::deserialize(deserializer)?;
        Duration::try_seconds(s)
            .ok_or_else(|| D::Error::custom(format!("duration of {s} seconds is out of range")))
    }
}
