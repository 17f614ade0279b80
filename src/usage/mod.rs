//! Turns raw per-package foreground usage into a ranked list of [record::UsageRecord]s, and keeps
//! track of what the screen is showing.

pub mod aggregate;
pub mod duration;
pub mod gate;
pub mod record;
pub mod screen;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UsageError {
    /// A caller broke a precondition, for example by passing a negative duration.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Usage statistics are unavailable")]
    Provider(#[source] anyhow::Error),
}
