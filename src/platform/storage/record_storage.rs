use std::{
    collections::BTreeMap,
    future::Future,
    io::ErrorKind,
    ops::Deref,
    path::{Path, PathBuf},
};

use anyhow::Result;
use chrono::NaiveDate;
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
};
use tracing::{debug, warn};

use crate::utils::time::date_to_record_name;

use super::entities::UsageIntervalEntity;

/// Interface for abstracting storage of records.
pub trait RecordStorage {
    /// Appends intervals into the record file for `date`. Intervals are expected to start on that
    /// day.
    fn append_intervals(
        &self,
        date: NaiveDate,
        intervals: Vec<UsageIntervalEntity>,
    ) -> impl Future<Output = Result<()>>;

    /// Retrieves data from a record file for a certain day.
    fn get_data_for(
        &self,
        date: NaiveDate,
    ) -> impl Future<Output = Result<Vec<UsageIntervalEntity>>> + Send;
}

impl<T: Deref> RecordStorage for T
where
    T::Target: RecordStorage,
{
    fn append_intervals(
        &self,
        date: NaiveDate,
        intervals: Vec<UsageIntervalEntity>,
    ) -> impl Future<Output = Result<()>> {
        self.deref().append_intervals(date, intervals)
    }

    fn get_data_for(
        &self,
        date: NaiveDate,
    ) -> impl Future<Output = Result<Vec<UsageIntervalEntity>>> + Send {
        self.deref().get_data_for(date)
    }
}

/// Splits intervals at day boundaries and appends every piece into the file of its day.
pub async fn store_intervals(
    storage: &impl RecordStorage,
    intervals: impl IntoIterator<Item = UsageIntervalEntity>,
) -> Result<()> {
    let mut by_day = BTreeMap::<NaiveDate, Vec<UsageIntervalEntity>>::new();
    for piece in intervals.into_iter().flat_map(UsageIntervalEntity::split_by_day) {
        by_day.entry(piece.start.date_naive()).or_default().push(piece);
    }

    for (date, intervals) in by_day {
        storage.append_intervals(date, intervals).await?;
    }
    Ok(())
}

/// The main realization of [RecordStorage].
pub struct RecordStorageImpl {
    record_dir: PathBuf,
}

impl RecordStorageImpl {
    pub fn new(record_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&record_dir)?;

        Ok(Self { record_dir })
    }

    fn record_path(&self, date: NaiveDate) -> PathBuf {
        self.record_dir.join(date_to_record_name(date))
    }

    async fn get_all_inner(&self, path: &Path) -> Result<Vec<UsageIntervalEntity>> {
        async fn extract(
            path: &Path,
        ) -> std::result::Result<Vec<UsageIntervalEntity>, std::io::Error> {
            debug!("Extracting {path:?}");
            let file = File::open(path).await?;
            file.lock_shared()?;
            let buffer = BufReader::new(file);
            let mut lines = buffer.lines();
            let mut intervals = vec![];
            while let Ok(Some(v)) = lines.next_line().await {
                if v.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<UsageIntervalEntity>(&v) {
                    Ok(v) => intervals.push(v),
                    Err(e) => {
                        // A write cut short by a crash leaves a partial line behind.
                        warn!(
                            "During parsing in path {:?} found illegal json string {}:  {e}",
                            path, &v
                        )
                    }
                }
            }

            lines.into_inner().into_inner().unlock_async().await?;

            Ok(intervals)
        }

        match extract(path).await {
            Ok(s) => Ok(s),
            Err(e) => {
                if e.kind() == ErrorKind::NotFound {
                    Ok(vec![])
                } else {
                    Err(e)?
                }
            }
        }
    }
}

impl RecordStorage for RecordStorageImpl {
    async fn append_intervals(
        &self,
        date: NaiveDate,
        intervals: Vec<UsageIntervalEntity>,
    ) -> Result<()> {
        let mut file = File::options()
            .create(true)
            .append(true)
            .open(self.record_path(date))
            .await?;

        let mut buffer = Vec::<u8>::new();
        for interval in intervals {
            serde_json::to_writer(&mut buffer, &interval)?;
            buffer.push(b'\n');
        }

        file.lock_exclusive()?;
        let result = async {
            file.write_all(&buffer).await?;
            file.flush().await
        }
        .await;
        file.unlock_async().await?;
        Ok(result?)
    }

    async fn get_data_for(&self, date: NaiveDate) -> Result<Vec<UsageIntervalEntity>> {
        let path = self.record_path(date);
        let data = self.get_all_inner(&path).await?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use anyhow::Result;
    use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
    use tempfile::tempdir;

    use crate::platform::storage::{
        entities::UsageIntervalEntity,
        record_storage::{store_intervals, RecordStorage, RecordStorageImpl},
    };

    const TEST_START_DATE: NaiveDateTime =
        NaiveDateTime::new(NaiveDate::from_ymd_opt(2018, 7, 4).unwrap(), NaiveTime::MIN);

    fn interval(package_id: &str, offset: Duration, duration: Duration) -> UsageIntervalEntity {
        UsageIntervalEntity {
            package_id: package_id.into(),
            start: Utc.from_utc_datetime(&TEST_START_DATE) + offset,
            duration,
        }
    }

    #[tokio::test]
    async fn test_record_storage_basic() -> Result<()> {
        let dir = tempdir()?;
        let storage = RecordStorageImpl::new(dir.path().to_owned())?;
        let records = [
            interval("org.mail", Duration::zero(), Duration::seconds(10)),
            interval("org.chat", Duration::seconds(10), Duration::seconds(5)),
        ];

        storage
            .append_intervals(TEST_START_DATE.date(), vec![records[0].clone()])
            .await?;
        storage
            .append_intervals(TEST_START_DATE.date(), vec![records[1].clone()])
            .await?;

        let values = storage.get_data_for(TEST_START_DATE.date()).await?;
        assert_eq!(values, records.to_vec());

        Ok(())
    }

    #[tokio::test]
    async fn test_record_storage_missing_day() -> Result<()> {
        let dir = tempdir()?;
        let storage = RecordStorageImpl::new(dir.path().to_owned())?;
        assert!(storage.get_data_for(TEST_START_DATE.date()).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_record_storage_skips_corrupted_lines() -> Result<()> {
        let dir = tempdir()?;
        let storage = RecordStorageImpl::new(dir.path().to_owned())?;
        let valid = interval("org.mail", Duration::zero(), Duration::seconds(3));

        let mut file = std::fs::File::create(dir.path().join("2018-07-04"))?;
        writeln!(file, "{}", serde_json::to_string(&valid)?)?;
        writeln!(file, "{{\"package_id\":\"org.ch")?;

        assert_eq!(storage.get_data_for(TEST_START_DATE.date()).await?, vec![valid]);
        Ok(())
    }

    #[tokio::test]
    async fn test_record_storage_skips_out_of_range_duration() -> Result<()> {
        let dir = tempdir()?;
        let storage = RecordStorageImpl::new(dir.path().to_owned())?;
        let valid = interval("org.mail", Duration::zero(), Duration::seconds(3));

        let mut file = std::fs::File::create(dir.path().join("2018-07-04"))?;
        writeln!(
            file,
            r#"{{"package_id":"org.chat","start":1530662400,"duration":9223372036854775807}}"#
        )?;
        writeln!(file, "{}", serde_json::to_string(&valid)?)?;

        assert_eq!(storage.get_data_for(TEST_START_DATE.date()).await?, vec![valid]);
        Ok(())
    }

    #[tokio::test]
    async fn test_store_intervals_splits_days() -> Result<()> {
        let dir = tempdir()?;
        let storage = RecordStorageImpl::new(dir.path().to_owned())?;

        store_intervals(
            &storage,
            [interval("org.mail", Duration::hours(23), Duration::hours(2))],
        )
        .await?;

        let first = storage.get_data_for(TEST_START_DATE.date()).await?;
        let second = storage
            .get_data_for(TEST_START_DATE.date().succ_opt().unwrap())
            .await?;
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].duration, Duration::hours(1));
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].duration, Duration::hours(1));
        Ok(())
    }
}
