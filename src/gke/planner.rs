//! Target version selection.

use semver::Version;
use tracing::{debug, warn};

use super::catalog::{self, ReleaseBatch, Resolution};
use super::feed::ReleaseSource;
use crate::config::VersionSelector;
use crate::envfile::EnvFile;
use crate::envfile::view::minor_family_of;
use crate::error::GkupError;

/// Where the target version came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionOrigin {
    /// Supplied with `--image`.
    Explicit,
    /// Resolved from the release notes feed.
    Feed {
        family: String,
        batch: ReleaseBatch,
        /// Highest version in the file, when the family was inferred from it.
        inferred_from: Option<Version>,
    },
}

/// Resolved target version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedVersion {
    pub version: String,
    pub origin: VersionOrigin,
}

/// Determine the target GKE version.
///
/// The feed is only fetched when the selector needs it.
pub async fn plan<S: ReleaseSource>(
    selector: &VersionSelector,
    env: &EnvFile,
    source: &S,
) -> Result<PlannedVersion, GkupError> {
    match selector {
        VersionSelector::Minor { family, latest } => {
            resolve_from_feed(source, family, *latest, None).await
        }
        VersionSelector::Exact(version) => {
            debug!("Using explicit GKE version {}", version);
            Ok(PlannedVersion {
                version: version.clone(),
                origin: VersionOrigin::Explicit,
            })
        }
        VersionSelector::Inferred { latest } => {
            let highest = env.highest_current_version()?;
            let family = minor_family_of(&highest);
            debug!("Inferred minor version {} from {}", family, highest);
            resolve_from_feed(source, &family, *latest, Some(highest)).await
        }
    }
}

async fn resolve_from_feed<S: ReleaseSource>(
    source: &S,
    family: &str,
    latest: bool,
    inferred_from: Option<Version>,
) -> Result<PlannedVersion, GkupError> {
    let entries = source.fetch_entries().await?;

    match catalog::resolve(&entries, family, latest) {
        Resolution::Found { version, batch } => {
            debug!("{} GKE version for {} is {}", batch, family, version);
            Ok(PlannedVersion {
                version,
                origin: VersionOrigin::Feed {
                    family: family.to_string(),
                    batch,
                    inferred_from,
                },
            })
        }
        Resolution::NotEnoughReleases { matched, required } => {
            warn!(
                "Found {} release batch(es) for minor version {}, need {}",
                matched, family, required
            );
            Err(GkupError::ResolutionFailure {
                minor: family.to_string(),
                available: Vec::new(),
            })
        }
        Resolution::NoMatchingVersion { available } => Err(GkupError::ResolutionFailure {
            minor: family.to_string(),
            available,
        }),
    }
}
