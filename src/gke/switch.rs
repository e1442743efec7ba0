//! Active nodepool switching.

use tracing::{debug, warn};

use crate::envfile::{ActiveFlag, EnvFile, PoolGroups, Slot};
use crate::error::GkupError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagSwitch {
    Switched { from: Slot, to: Slot },
    /// Value other than `a`/`b`, left as is.
    Unchanged { value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchedFlag {
    pub key: String,
    pub result: FlagSwitch,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwitchReport {
    pub flags: Vec<SwitchedFlag>,
}

impl SwitchReport {
    pub fn switched_count(&self) -> usize {
        self.flags
            .iter()
            .filter(|f| matches!(f.result, FlagSwitch::Switched { .. }))
            .count()
    }
}

/// Flip every `*_NODE_POOL_ACTIVE` flag between `a` and `b`.
pub fn switch_all(env: &mut EnvFile, groups: &PoolGroups) -> Result<SwitchReport, GkupError> {
    let mut report = SwitchReport::default();

    for group in groups.iter() {
        let key = group.flag_key();
        let result = match &group.active {
            ActiveFlag::Valid(from) => {
                let to = from.complement();
                env.set(&key, to.as_str())?;
                debug!("Switched {}: {} -> {}", key, from, to);
                FlagSwitch::Switched { from: *from, to }
            }
            ActiveFlag::Invalid(value) => {
                warn!("{} has unexpected value '{}', leaving it unchanged", key, value);
                FlagSwitch::Unchanged {
                    value: value.clone(),
                }
            }
        };
        report.flags.push(SwitchedFlag { key, result });
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
KUBERNETES_VERSION: 1.27.10-gke.1055000
MAIN_NODE_POOL_ACTIVE: a
MAIN_NODE_POOL_A_KUBERNETES_VERSION: 1.27.10-gke.1055000
MAIN_NODE_POOL_B_KUBERNETES_VERSION: 1.27.8-gke.1067004
ECK_NODE_POOL_ACTIVE: 'b'
";

    #[test]
    fn test_switch_all_flips_every_group() {
        let mut env = EnvFile::parse(SAMPLE).unwrap();
        let groups = env.pool_groups();
        let report = switch_all(&mut env, &groups).unwrap();

        assert_eq!(report.switched_count(), 2);
        assert_eq!(env.get("MAIN_NODE_POOL_ACTIVE"), Some("b"));
        assert_eq!(env.get("ECK_NODE_POOL_ACTIVE"), Some("a"));
        assert!(env.text().contains("ECK_NODE_POOL_ACTIVE: 'a'\n"));
        assert_eq!(
            report.flags[0],
            SwitchedFlag {
                key: "MAIN_NODE_POOL_ACTIVE".to_string(),
                result: FlagSwitch::Switched {
                    from: Slot::A,
                    to: Slot::B
                }
            }
        );
    }

    #[test]
    fn test_switch_all_twice_restores_document() {
        let mut env = EnvFile::parse(SAMPLE).unwrap();
        let groups = env.pool_groups();
        switch_all(&mut env, &groups).unwrap();

        let groups = env.pool_groups();
        switch_all(&mut env, &groups).unwrap();

        assert_eq!(env.text(), SAMPLE);
    }

    #[test]
    fn test_switch_all_leaves_versions_untouched() {
        let mut env = EnvFile::parse(SAMPLE).unwrap();
        let groups = env.pool_groups();
        switch_all(&mut env, &groups).unwrap();

        assert_eq!(env.get("KUBERNETES_VERSION"), Some("1.27.10-gke.1055000"));
        assert_eq!(
            env.get("MAIN_NODE_POOL_B_KUBERNETES_VERSION"),
            Some("1.27.8-gke.1067004")
        );
    }

    #[test]
    fn test_switch_all_keeps_unexpected_values() {
        let text = "MAIN_NODE_POOL_ACTIVE: blue\nECK_NODE_POOL_ACTIVE: a\n";
        let mut env = EnvFile::parse(text).unwrap();
        let groups = env.pool_groups();
        let report = switch_all(&mut env, &groups).unwrap();

        assert_eq!(report.switched_count(), 1);
        assert_eq!(
            report.flags[0].result,
            FlagSwitch::Unchanged {
                value: "blue".to_string()
            }
        );
        assert_eq!(env.text(), "MAIN_NODE_POOL_ACTIVE: blue\nECK_NODE_POOL_ACTIVE: b\n");
    }
}
