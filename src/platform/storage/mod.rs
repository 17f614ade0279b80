//!  Storage is organized through [record_storage::RecordStorageImpl].
//!  The basic idea is:
//!   - There is a directory with all the records.
//!   - Records are stored using record files, which store data for a UTC day.
//!   - Records are stored as intervals from time a, for duration b, spent in package p.

pub mod entities;
pub mod record_storage;
