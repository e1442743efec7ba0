//! Version accessors over a loaded env file.

use semver::Version;
use tracing::debug;

use super::document::EnvFile;
use super::pools::{PoolGroups, Slot, slot_version_key};
use crate::error::GkupError;

/// Control plane version field.
pub const CONTROL_PLANE_KEY: &str = "KUBERNETES_VERSION";

/// Pool group consulted when inferring the current version.
pub const MAIN_POOL_LABEL: &str = "MAIN";

/// Parse a GKE version such as `1.27.10-gke.1055000`.
pub fn parse_gke_version(version: &str) -> Result<Version, GkupError> {
    Version::parse(version.trim()).map_err(|_| GkupError::InvalidVersion(version.to_string()))
}

/// Minor version family (`major.minor`) of a version.
pub fn minor_family_of(version: &Version) -> String {
    format!("{}.{}", version.major, version.minor)
}

impl EnvFile {
    pub fn pool_groups(&self) -> PoolGroups {
        PoolGroups::discover(self)
    }

    /// Highest version among the control plane and both `MAIN` slots.
    ///
    /// Other pool groups are not considered.
    pub fn highest_current_version(&self) -> Result<Version, GkupError> {
        let keys = [
            CONTROL_PLANE_KEY.to_string(),
            slot_version_key(MAIN_POOL_LABEL, Slot::A),
            slot_version_key(MAIN_POOL_LABEL, Slot::B),
        ];

        let mut highest: Option<Version> = None;
        for key in &keys {
            if !self.contains_key(key) {
                return Err(GkupError::MissingField(key.clone()));
            }
            let version = parse_gke_version(self.get(key).unwrap_or_default())?;
            if highest.as_ref().is_none_or(|h| version > *h) {
                highest = Some(version);
            }
        }

        let highest =
            highest.ok_or_else(|| GkupError::MissingField(CONTROL_PLANE_KEY.to_string()))?;
        debug!("Highest GKE version in file: {}", highest);
        Ok(highest)
    }
}
