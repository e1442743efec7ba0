//! Resolve a minor version family to a GKE build version.
//!
//! Versions are ranked by plain string ordering, as published in the feed,
//! not by semantic version. By default the newest matching release batch is
//! skipped and the top version of the batch before it is chosen.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::feed::ReleaseEntry;

static LINK_TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<a href=".*?">(.*?)</a>"#).expect("valid link regex"));

/// Which matching release batch a version was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseBatch {
    Latest,
    SecondToLatest,
}

impl ReleaseBatch {
    fn for_latest(latest: bool) -> Self {
        if latest {
            ReleaseBatch::Latest
        } else {
            ReleaseBatch::SecondToLatest
        }
    }

    /// Position among the matching entries.
    fn index(self) -> usize {
        match self {
            ReleaseBatch::Latest => 0,
            ReleaseBatch::SecondToLatest => 1,
        }
    }
}

impl fmt::Display for ReleaseBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseBatch::Latest => f.write_str("Latest"),
            ReleaseBatch::SecondToLatest => f.write_str("Second to latest"),
        }
    }
}

/// Outcome of a catalog lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found { version: String, batch: ReleaseBatch },
    /// Fewer release batches mention the family than the lookup needs.
    NotEnoughReleases { matched: usize, required: usize },
    /// The selected batch lists no version of the family.
    NoMatchingVersion { available: Vec<String> },
}

impl Resolution {
    pub fn version(&self) -> Option<&str> {
        match self {
            Resolution::Found { version, .. } => Some(version),
            _ => None,
        }
    }
}

/// Distinct link texts of an entry, sorted descending as strings.
pub fn release_versions(content: &str) -> Vec<String> {
    let unique: BTreeSet<String> = LINK_TEXT_RE
        .captures_iter(content)
        .map(|c| c[1].to_string())
        .collect();
    unique.into_iter().rev().collect()
}

/// Find the version for `family` in feed `entries`.
pub fn resolve(entries: &[ReleaseEntry], family: &str, latest: bool) -> Resolution {
    let batch = ReleaseBatch::for_latest(latest);
    let required = batch.index() + 1;

    let matching: Vec<&ReleaseEntry> = entries
        .iter()
        .filter(|entry| entry.content.contains(family))
        .take(required)
        .collect();

    let Some(entry) = matching.get(batch.index()) else {
        debug!(
            "Only {} release batch(es) mention {}, need {}",
            matching.len(),
            family,
            required
        );
        return Resolution::NotEnoughReleases {
            matched: matching.len(),
            required,
        };
    };

    // Only the selected batch is consulted; later batches are not scanned.
    let available = release_versions(&entry.content);
    match available.iter().find(|v| v.contains(family)) {
        Some(version) => Resolution::Found {
            version: version.clone(),
            batch,
        },
        None => Resolution::NoMatchingVersion { available },
    }
}
