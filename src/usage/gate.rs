use tracing::{debug, warn};

use crate::platform::{
    GrantMode, PermissionProvider, PermissionStatus, OP_GET_USAGE_STATS,
    PERMISSION_PACKAGE_USAGE_STATS,
};

/// Decides whether usage statistics may be read by `owner_id`.
pub struct PermissionGate<'a> {
    provider: &'a dyn PermissionProvider,
    process_id: u32,
    owner_id: &'a str,
}

impl<'a> PermissionGate<'a> {
    pub fn new(provider: &'a dyn PermissionProvider, process_id: u32, owner_id: &'a str) -> Self {
        Self {
            provider,
            process_id,
            owner_id,
        }
    }

    /// Missing access is a regular answer. Provider failures are logged and count as no access.
    pub fn has_usage_access(&self) -> bool {
        let mode = match self.provider.check_operation_grant(
            OP_GET_USAGE_STATS,
            self.process_id,
            self.owner_id,
        ) {
            Ok(mode) => mode,
            Err(e) => {
                warn!("Couldn't read grant state {e:?}");
                return false;
            }
        };

        match mode {
            GrantMode::Default => {
                debug!("Operation grant is default, checking calling permission");
                match self
                    .provider
                    .check_calling_permission(PERMISSION_PACKAGE_USAGE_STATS)
                {
                    Ok(status) => status == PermissionStatus::Granted,
                    Err(e) => {
                        warn!("Couldn't read calling permission {e:?}");
                        false
                    }
                }
            }
            mode => mode == GrantMode::Allowed,
        }
    }
}
