//! Blue/green nodepool slot model.
//!
//! Pool groups are discovered from keys ending in `_NODE_POOL_ACTIVE`; the
//! prefix is the group label (e.g. `MAIN`, `ECK`).

use std::fmt;

use super::document::EnvFile;

pub const NODE_POOL_ACTIVE_SUFFIX: &str = "_NODE_POOL_ACTIVE";

/// One of the two alternating nodepool slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    A,
    B,
}

impl Slot {
    /// Parse an active flag value. Only lowercase `a` and `b` are valid.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "a" => Some(Slot::A),
            "b" => Some(Slot::B),
            _ => None,
        }
    }

    pub fn complement(self) -> Self {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }

    /// Value as stored in the `*_NODE_POOL_ACTIVE` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Slot::A => "a",
            Slot::B => "b",
        }
    }

    /// Letter used inside slot version keys.
    pub fn key_letter(self) -> &'static str {
        match self {
            Slot::A => "A",
            Slot::B => "B",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Version key of a slot, e.g. `MAIN_NODE_POOL_B_KUBERNETES_VERSION`.
pub fn slot_version_key(label: &str, slot: Slot) -> String {
    format!("{}_NODE_POOL_{}_KUBERNETES_VERSION", label, slot.key_letter())
}

/// Active flag key of a pool group, e.g. `MAIN_NODE_POOL_ACTIVE`.
pub fn active_flag_key(label: &str) -> String {
    format!("{}{}", label, NODE_POOL_ACTIVE_SUFFIX)
}

/// Value of a `*_NODE_POOL_ACTIVE` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActiveFlag {
    Valid(Slot),
    Invalid(String),
}

impl ActiveFlag {
    fn from_value(value: Option<&str>) -> Self {
        match value {
            Some(v) => Slot::parse(v)
                .map_or_else(|| ActiveFlag::Invalid(v.to_string()), ActiveFlag::Valid),
            None => ActiveFlag::Invalid(String::new()),
        }
    }
}

/// A pool group: two slots plus the flag naming the active one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolGroup {
    pub label: String,
    pub active: ActiveFlag,
}

impl PoolGroup {
    pub fn active_slot(&self) -> Option<Slot> {
        match self.active {
            ActiveFlag::Valid(slot) => Some(slot),
            ActiveFlag::Invalid(_) => None,
        }
    }

    pub fn non_active_slot(&self) -> Option<Slot> {
        self.active_slot().map(Slot::complement)
    }

    pub fn flag_key(&self) -> String {
        active_flag_key(&self.label)
    }
}

/// Pool groups discovered once at load time, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolGroups {
    groups: Vec<PoolGroup>,
}

impl PoolGroups {
    pub fn discover(env: &EnvFile) -> Self {
        let groups = env
            .keys()
            .filter_map(|key| key.strip_suffix(NODE_POOL_ACTIVE_SUFFIX).map(|label| (key, label)))
            .map(|(key, label)| PoolGroup {
                label: label.to_string(),
                active: ActiveFlag::from_value(env.get(key)),
            })
            .collect();

        Self { groups }
    }

    pub fn iter(&self) -> impl Iterator<Item = &PoolGroup> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Label to active slot, for groups with a valid flag.
    pub fn active_pool_map(&self) -> Vec<(&str, Slot)> {
        self.groups
            .iter()
            .filter_map(|g| g.active_slot().map(|slot| (g.label.as_str(), slot)))
            .collect()
    }

    /// Label to non-active slot, for groups with a valid flag.
    pub fn non_active_pool_map(&self) -> Vec<(&str, Slot)> {
        self.active_pool_map()
            .into_iter()
            .map(|(label, slot)| (label, slot.complement()))
            .collect()
    }
}
