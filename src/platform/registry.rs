use std::{
    collections::HashMap,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use tracing::debug;

use super::{ApplicationInfo, PackageRegistry};

pub const MANIFEST_FILE: &str = "packages.json";

/// Applications registered by hand in `packages.json`.
pub struct ManifestRegistry {
    path: PathBuf,
    packages: HashMap<Arc<str>, ApplicationInfo>,
}

impl ManifestRegistry {
    pub fn open(path: PathBuf) -> Result<Self> {
        let packages = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str::<Vec<ApplicationInfo>>(&content)
                .with_context(|| format!("Malformed package manifest {path:?}"))?,
            Err(e) if e.kind() == ErrorKind::NotFound => vec![],
            Err(e) => Err(e)?,
        };

        Ok(Self {
            path,
            packages: packages
                .into_iter()
                .map(|v| (v.package_id.clone(), v))
                .collect(),
        })
    }

    pub fn open_in(dir: &Path) -> Result<Self> {
        Self::open(dir.join(MANIFEST_FILE))
    }

    /// Adds or replaces an application and persists the manifest.
    pub fn register(&mut self, info: ApplicationInfo) -> Result<()> {
        self.packages.insert(info.package_id.clone(), info);

        let mut packages = self.packages.values().collect::<Vec<_>>();
        packages.sort_by(|a, b| a.package_id.cmp(&b.package_id));
        std::fs::write(&self.path, serde_json::to_string_pretty(&packages)?)
            .with_context(|| format!("Failed to write package manifest {:?}", self.path))?;
        Ok(())
    }
}

impl PackageRegistry for ManifestRegistry {
    fn resolve_application_info(&self, package_id: &str) -> Option<ApplicationInfo> {
        self.packages.get(package_id).cloned()
    }
}

/// Treats a package id as a path to an executable. The application counts as installed while
/// the file exists.
pub struct ExecutableRegistry;

impl PackageRegistry for ExecutableRegistry {
    fn resolve_application_info(&self, package_id: &str) -> Option<ApplicationInfo> {
        let path = Path::new(package_id);
        if !path.is_file() {
            return None;
        }
        Some(ApplicationInfo {
            package_id: package_id.into(),
            display_name: clean_process_name(package_id).into(),
            icon: None,
        })
    }
}

/// Asks each registry in turn, first match wins.
pub struct CompositeRegistry {
    inner: Vec<Box<dyn PackageRegistry>>,
}

impl CompositeRegistry {
    pub fn new(inner: Vec<Box<dyn PackageRegistry>>) -> Self {
        Self { inner }
    }
}

impl PackageRegistry for CompositeRegistry {
    fn resolve_application_info(&self, package_id: &str) -> Option<ApplicationInfo> {
        let info = self
            .inner
            .iter()
            .find_map(|v| v.resolve_application_info(package_id));
        if info.is_none() {
            debug!("Package {package_id} is not installed");
        }
        info
    }
}

fn clean_process_name(value: &str) -> String {
    PathBuf::from(value)
        .file_name()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_else(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tempfile::{tempdir, NamedTempFile};

    use crate::platform::{ApplicationInfo, IconRef, PackageRegistry};

    use super::{CompositeRegistry, ExecutableRegistry, ManifestRegistry};

    fn info(package_id: &str, name: &str) -> ApplicationInfo {
        ApplicationInfo {
            package_id: package_id.into(),
            display_name: name.into(),
            icon: Some(IconRef(format!("/icons/{name}.png").into())),
        }
    }

    #[test]
    fn test_manifest_register_persists() -> Result<()> {
        let dir = tempdir()?;
        let mut registry = ManifestRegistry::open_in(dir.path())?;
        assert_eq!(registry.resolve_application_info("org.mail"), None);

        registry.register(info("org.mail", "Mail"))?;

        let reopened = ManifestRegistry::open_in(dir.path())?;
        assert_eq!(
            reopened.resolve_application_info("org.mail"),
            Some(info("org.mail", "Mail"))
        );
        Ok(())
    }

    #[test]
    fn test_executable_registry() -> Result<()> {
        let file = NamedTempFile::new()?;
        let path = file.path().to_string_lossy().to_string();
        let resolved = ExecutableRegistry.resolve_application_info(&path).unwrap();
        assert_eq!(
            &*resolved.display_name,
            file.path().file_name().unwrap().to_string_lossy()
        );

        assert_eq!(
            ExecutableRegistry.resolve_application_info("/definitely/not/installed"),
            None
        );
        Ok(())
    }

    #[test]
    fn test_composite_first_match_wins() -> Result<()> {
        let dir = tempdir()?;
        let mut manifest = ManifestRegistry::open_in(dir.path())?;
        manifest.register(info("org.mail", "Mail"))?;

        let registry = CompositeRegistry::new(vec![Box::new(manifest), Box::new(ExecutableRegistry)]);
        assert_eq!(
            registry.resolve_application_info("org.mail").map(|v| v.display_name),
            Some("Mail".into())
        );
        assert_eq!(registry.resolve_application_info("org.gone"), None);
        Ok(())
    }
}
