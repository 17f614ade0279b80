use std::sync::Arc;

use serde::Serialize;

use crate::{platform::IconRef, utils::percentage::Percentage};

/// One row of the ranking. Built from scratch on every aggregation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageRecord {
    pub package_id: Arc<str>,
    pub icon: Option<IconRef>,
    pub display_name: Arc<str>,
    pub foreground_millis: i64,
    /// Share of the total foreground time of every displayed package.
    pub percentage: Percentage,
    pub duration_text: String,
}
