use std::{
    collections::BTreeMap,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{GrantMode, PermissionProvider, PermissionStatus};

pub const GRANTS_FILE: &str = "grants.json";

/// Content of `grants.json`. Operations are keyed by operation and then by owner.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantTable {
    #[serde(default)]
    pub operations: BTreeMap<String, BTreeMap<String, GrantMode>>,
    #[serde(default)]
    pub permissions: BTreeMap<String, PermissionStatus>,
}

/// [PermissionProvider] backed by a JSON file. A missing file means nothing was granted yet.
pub struct FileGrantProvider {
    path: PathBuf,
}

impl FileGrantProvider {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(GRANTS_FILE))
    }

    pub fn load(&self) -> Result<GrantTable> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content)
                .with_context(|| format!("Malformed grants file {:?}", self.path)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No grants file at {:?}", self.path);
                Ok(GrantTable::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, table: &GrantTable) -> Result<()> {
        let content = serde_json::to_string_pretty(table)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write grants file {:?}", self.path))?;
        Ok(())
    }

    pub fn set_operation_mode(&self, op: &str, owner_id: &str, mode: GrantMode) -> Result<()> {
        let mut table = self.load()?;
        table
            .operations
            .entry(op.to_owned())
            .or_default()
            .insert(owner_id.to_owned(), mode);
        self.store(&table)
    }

    pub fn set_calling_permission(&self, permission: &str, status: PermissionStatus) -> Result<()> {
        let mut table = self.load()?;
        table.permissions.insert(permission.to_owned(), status);
        self.store(&table)
    }
}

impl PermissionProvider for FileGrantProvider {
    fn check_operation_grant(
        &self,
        op: &str,
        process_id: u32,
        owner_id: &str,
    ) -> Result<GrantMode> {
        let table = self.load()?;
        let mode = table
            .operations
            .get(op)
            .and_then(|owners| owners.get(owner_id))
            .copied()
            .unwrap_or(GrantMode::Default);
        debug!("Operation {op} for {owner_id} (pid {process_id}) is {mode:?}");
        Ok(mode)
    }

    fn check_calling_permission(&self, permission: &str) -> Result<PermissionStatus> {
        let table = self.load()?;
        Ok(table
            .permissions
            .get(permission)
            .copied()
            .unwrap_or(PermissionStatus::Denied))
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use crate::platform::{
        GrantMode, PermissionProvider, PermissionStatus, OP_GET_USAGE_STATS,
        PERMISSION_PACKAGE_USAGE_STATS,
    };

    use super::FileGrantProvider;

    #[test]
    fn test_missing_file_is_default() -> Result<()> {
        let dir = tempdir()?;
        let grants = FileGrantProvider::in_dir(dir.path());

        assert_eq!(
            grants.check_operation_grant(OP_GET_USAGE_STATS, 1, "usagestats")?,
            GrantMode::Default
        );
        assert_eq!(
            grants.check_calling_permission(PERMISSION_PACKAGE_USAGE_STATS)?,
            PermissionStatus::Denied
        );
        Ok(())
    }

    #[test]
    fn test_modes_are_per_owner() -> Result<()> {
        let dir = tempdir()?;
        let grants = FileGrantProvider::in_dir(dir.path());
        grants.set_operation_mode(OP_GET_USAGE_STATS, "usagestats", GrantMode::Allowed)?;
        grants.set_operation_mode(OP_GET_USAGE_STATS, "other", GrantMode::Denied)?;
        grants.set_calling_permission(PERMISSION_PACKAGE_USAGE_STATS, PermissionStatus::Granted)?;

        assert_eq!(
            grants.check_operation_grant(OP_GET_USAGE_STATS, 1, "usagestats")?,
            GrantMode::Allowed
        );
        assert_eq!(
            grants.check_operation_grant(OP_GET_USAGE_STATS, 1, "other")?,
            GrantMode::Denied
        );
        assert_eq!(
            grants.check_calling_permission(PERMISSION_PACKAGE_USAGE_STATS)?,
            PermissionStatus::Granted
        );
        Ok(())
    }

    #[test]
    fn test_malformed_file_is_an_error() -> Result<()> {
        let dir = tempdir()?;
        std::fs::write(dir.path().join(super::GRANTS_FILE), "{ not json")?;
        let grants = FileGrantProvider::in_dir(dir.path());
        assert!(grants.check_operation_grant(OP_GET_USAGE_STATS, 1, "usagestats").is_err());
        Ok(())
    }
}
