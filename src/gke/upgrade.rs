//! Apply a target version to the control plane and non-active nodepools.

use tracing::{debug, info, warn};

use crate::envfile::pools::slot_version_key;
use crate::envfile::view::CONTROL_PLANE_KEY;
use crate::envfile::{ActiveFlag, EnvFile, PoolGroup, PoolGroups, Slot};
use crate::error::GkupError;

/// Result of evaluating one version field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldStatus {
    Upgraded { from: String },
    AlreadyCurrent,
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub key: String,
    pub status: FieldStatus,
}

impl FieldChange {
    pub fn is_upgraded(&self) -> bool {
        matches!(self.status, FieldStatus::Upgraded { .. })
    }
}

/// Outcome for one pool group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolOutcome {
    Evaluated {
        active: Slot,
        active_key: String,
        /// Reported only, never written.
        active_version: Option<String>,
        non_active: Slot,
        /// Value of the non-active slot before the upgrade.
        non_active_version: Option<String>,
        change: FieldChange,
    },
    /// The active flag is neither `a` nor `b`; nothing was written.
    InvalidFlag { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolReport {
    pub label: String,
    pub outcome: PoolOutcome,
}

/// Per-field report of an upgrade pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeReport {
    pub target_version: String,
    pub control_plane: FieldChange,
    pub pools: Vec<PoolReport>,
}

impl UpgradeReport {
    /// True when at least one field was rewritten.
    pub fn changed(&self) -> bool {
        self.control_plane.is_upgraded()
            || self.pools.iter().any(|p| match &p.outcome {
                PoolOutcome::Evaluated { change, .. } => change.is_upgraded(),
                PoolOutcome::InvalidFlag { .. } => false,
            })
    }

    /// Keys that were expected but are absent from the file.
    pub fn missing_fields(&self) -> Vec<&str> {
        self.pools
            .iter()
            .filter_map(|p| match &p.outcome {
                PoolOutcome::Evaluated { change, .. } if change.status == FieldStatus::Missing => {
                    Some(change.key.as_str())
                }
                _ => None,
            })
            .collect()
    }
}

/// Upgrade the control plane and every non-active slot to `target_version`.
///
/// Fields already at the target are left untouched, so running this twice
/// with the same target changes nothing the second time.
pub fn apply(
    env: &mut EnvFile,
    groups: &PoolGroups,
    target_version: &str,
) -> Result<UpgradeReport, GkupError> {
    info!("Applying GKE version {}", target_version);

    if !env.contains_key(CONTROL_PLANE_KEY) {
        return Err(GkupError::MissingField(CONTROL_PLANE_KEY.to_string()));
    }
    // A key with an empty value counts as present.
    let current = env.get(CONTROL_PLANE_KEY).unwrap_or_default().to_string();
    let control_plane = set_if_different(env, CONTROL_PLANE_KEY, current, target_version)?;

    let pools = groups
        .iter()
        .map(|group| apply_to_group(env, group, target_version))
        .collect::<Result<Vec<_>, _>>()?;

    let report = UpgradeReport {
        target_version: target_version.to_string(),
        control_plane,
        pools,
    };
    debug!("Upgrade pass changed fields: {}", report.changed());
    Ok(report)
}

fn apply_to_group(
    env: &mut EnvFile,
    group: &PoolGroup,
    target_version: &str,
) -> Result<PoolReport, GkupError> {
    let active = match &group.active {
        ActiveFlag::Valid(slot) => *slot,
        ActiveFlag::Invalid(value) => {
            warn!(
                "{} has unexpected value '{}', skipping pool group {}",
                group.flag_key(),
                value,
                group.label
            );
            return Ok(PoolReport {
                label: group.label.clone(),
                outcome: PoolOutcome::InvalidFlag {
                    key: group.flag_key(),
                    value: value.clone(),
                },
            });
        }
    };

    let non_active = active.complement();
    let active_key = slot_version_key(&group.label, active);
    let key = slot_version_key(&group.label, non_active);

    let active_version = env.get(&active_key).map(str::to_string);
    let non_active_version = env.get(&key).map(str::to_string);

    let change = if env.contains_key(&key) {
        // A key with an empty value counts as present.
        let current = non_active_version.clone().unwrap_or_default();
        set_if_different(env, &key, current, target_version)?
    } else {
        warn!("{} not found in env file", key);
        FieldChange {
            key,
            status: FieldStatus::Missing,
        }
    };

    Ok(PoolReport {
        label: group.label.clone(),
        outcome: PoolOutcome::Evaluated {
            active,
            active_key,
            active_version,
            non_active,
            non_active_version,
            change,
        },
    })
}

fn set_if_different(
    env: &mut EnvFile,
    key: &str,
    current: String,
    target_version: &str,
) -> Result<FieldChange, GkupError> {
    if current == target_version {
        return Ok(FieldChange {
            key: key.to_string(),
            status: FieldStatus::AlreadyCurrent,
        });
    }

    env.set(key, target_version)?;
    Ok(FieldChange {
        key: key.to_string(),
        status: FieldStatus::Upgraded { from: current },
    })
}
