use tracing::{info, warn};

use crate::utils::time::UsageWindow;

use super::{aggregate::UsageAggregator, gate::PermissionGate, record::UsageRecord, UsageError};

/// What the user is looking at. Exactly one of these holds at any time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresentationState {
    NoPermission,
    PermissionGrantedIdle,
    ShowingResults(Vec<UsageRecord>),
}

/// Drives [PresentationState]. The gate is consulted on every resume, the aggregator only on an
/// explicit refresh.
pub struct UsageScreen<'a> {
    gate: PermissionGate<'a>,
    aggregator: UsageAggregator<'a>,
    state: PresentationState,
}

impl<'a> UsageScreen<'a> {
    pub fn new(gate: PermissionGate<'a>, aggregator: UsageAggregator<'a>) -> Self {
        Self {
            gate,
            aggregator,
            state: PresentationState::NoPermission,
        }
    }

    pub fn state(&self) -> &PresentationState {
        &self.state
    }

    /// Called each time the screen comes to the foreground.
    pub fn on_resume(&mut self) -> &PresentationState {
        let granted = self.gate.has_usage_access();
        let denied_before = self.state == PresentationState::NoPermission;
        match (denied_before, granted) {
            (true, true) => {
                info!("Usage access granted");
                self.state = PresentationState::PermissionGrantedIdle;
            }
            (false, false) => {
                info!("Usage access was revoked");
                self.state = PresentationState::NoPermission;
            }
            _ => (),
        }
        &self.state
    }

    /// Called when the user asks for the usage list. Without usage data nothing is rendered and
    /// the state stays as it was.
    pub async fn on_refresh(
        &mut self,
        window: UsageWindow,
    ) -> Result<&PresentationState, UsageError> {
        if self.state == PresentationState::NoPermission {
            warn!("Refresh requested without usage access");
            return Ok(&self.state);
        }

        let records = self
            .aggregator
            .compute_usage(window.start, window.end)
            .await?;
        if records.is_empty() {
            info!("No usage recorded between {} and {}", window.start, window.end);
        } else {
            self.state = PresentationState::ShowingResults(records);
        }
        Ok(&self.state)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };

    use chrono::{Duration, TimeZone, Utc};

    use crate::{
        platform::{
            ApplicationInfo, GrantMode, IntervalGranularity, MockPackageRegistry,
            MockPermissionProvider, MockUsageStatsProvider, UsageStatsEntry,
        },
        usage::{aggregate::UsageAggregator, gate::PermissionGate},
        utils::time::UsageWindow,
    };

    use super::{PresentationState, UsageScreen};

    fn window() -> UsageWindow {
        UsageWindow::ending_at(
            Utc.with_ymd_and_hms(2024, 4, 5, 12, 0, 0).unwrap(),
            Duration::hours(24),
        )
        .unwrap()
    }

    /// Permission provider whose answer can be flipped between resumes.
    fn switchable(granted: Arc<AtomicBool>) -> MockPermissionProvider {
        let mut provider = MockPermissionProvider::new();
        provider
            .expect_check_operation_grant()
            .returning(move |_, _, _| {
                Ok(if granted.load(Ordering::SeqCst) {
                    GrantMode::Allowed
                } else {
                    GrantMode::Denied
                })
            });
        provider
    }

    fn usage(entries: Vec<UsageStatsEntry>) -> MockUsageStatsProvider {
        let mut usage = MockUsageStatsProvider::new();
        usage
            .expect_query_usage()
            .returning(move |_, _, _| Ok(entries.clone()));
        usage
    }

    fn registry() -> MockPackageRegistry {
        let mut registry = MockPackageRegistry::new();
        registry
            .expect_resolve_application_info()
            .returning(|package_id: &str| {
                Some(ApplicationInfo {
                    package_id: package_id.into(),
                    display_name: package_id.into(),
                    icon: None,
                })
            });
        registry
    }

    #[tokio::test]
    async fn test_full_flow() {
        let granted = Arc::new(AtomicBool::new(false));
        let permissions = switchable(granted.clone());
        let usage = usage(vec![
            UsageStatsEntry::new("a", 1_000),
            UsageStatsEntry::new("b", 3_000),
        ]);
        let registry = registry();
        let mut screen = UsageScreen::new(
            PermissionGate::new(&permissions, 1, "usagestats"),
            UsageAggregator::new(&usage, &registry, IntervalGranularity::Daily),
        );

        assert_eq!(screen.on_resume(), &PresentationState::NoPermission);
        assert_eq!(
            screen.on_refresh(window()).await.unwrap(),
            &PresentationState::NoPermission
        );

        granted.store(true, Ordering::SeqCst);
        assert_eq!(screen.on_resume(), &PresentationState::PermissionGrantedIdle);

        let PresentationState::ShowingResults(records) = screen.on_refresh(window()).await.unwrap()
        else {
            panic!("Expected results");
        };
        assert_eq!(records.len(), 2);
        assert_eq!(&*records[0].package_id, "b");

        // Resuming while granted keeps the results on screen.
        assert!(matches!(
            screen.on_resume(),
            PresentationState::ShowingResults(_)
        ));

        granted.store(false, Ordering::SeqCst);
        assert_eq!(screen.on_resume(), &PresentationState::NoPermission);
    }

    #[tokio::test]
    async fn test_refresh_without_data_keeps_state() {
        let permissions = switchable(Arc::new(AtomicBool::new(true)));
        let usage = usage(vec![]);
        let registry = registry();
        let mut screen = UsageScreen::new(
            PermissionGate::new(&permissions, 1, "usagestats"),
            UsageAggregator::new(&usage, &registry, IntervalGranularity::Daily),
        );

        screen.on_resume();
        assert_eq!(
            screen.on_refresh(window()).await.unwrap(),
            &PresentationState::PermissionGrantedIdle
        );
    }

    #[tokio::test]
    async fn test_aggregator_not_called_without_refresh() {
        let permissions = switchable(Arc::new(AtomicBool::new(true)));
        let mut usage = MockUsageStatsProvider::new();
        usage.expect_query_usage().never();
        let registry = registry();
        let mut screen = UsageScreen::new(
            PermissionGate::new(&permissions, 1, "usagestats"),
            UsageAggregator::new(&usage, &registry, IntervalGranularity::Daily),
        );

        screen.on_resume();
        screen.on_resume();
        assert_eq!(screen.state(), &PresentationState::PermissionGrantedIdle);
    }
}
