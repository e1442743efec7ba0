//! Application workflow: load, plan, apply, save.

use anyhow::Result;
use tracing::debug;

use crate::config::{Config, Mode, VersionSelector};
use crate::envfile::{EnvFile, PoolGroups};
use crate::gke::feed::{GkeReleaseFeed, ReleaseSource};
use crate::gke::{planner, switch, upgrade};
use crate::output;

/// What a run did to the env file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Written,
    Unchanged,
    DryRun,
}

/// Run with the release notes feed from the configuration.
pub async fn run(config: &Config) -> Result<Outcome> {
    let feed = GkeReleaseFeed::new(&config.feed_url)?;
    run_with_source(config, &feed).await
}

/// Run against any release notes source.
pub async fn run_with_source<S: ReleaseSource>(config: &Config, source: &S) -> Result<Outcome> {
    let mut env = EnvFile::load(&config.env_file)?;
    let groups = env.pool_groups();
    debug!("Discovered {} pool group(s)", groups.len());

    match &config.mode {
        Mode::SwitchActiveOnly => {
            let report = switch::switch_all(&mut env, &groups)?;
            output::print_switch_report(&report, config.dry_run);
            if config.dry_run {
                return Ok(Outcome::DryRun);
            }
            env.save(&config.env_file)?;
            Ok(Outcome::Written)
        }
        Mode::Upgrade(selector) => upgrade_env(config, selector, &mut env, &groups, source).await,
    }
}

async fn upgrade_env<S: ReleaseSource>(
    config: &Config,
    selector: &VersionSelector,
    env: &mut EnvFile,
    groups: &PoolGroups,
    source: &S,
) -> Result<Outcome> {
    let planned = planner::plan(selector, env, source).await?;
    output::print_planned_version(&planned);

    let report = upgrade::apply(env, groups, &planned.version)?;
    output::print_upgrade_report(&report);
    output::print_upgrade_summary(&report, config.dry_run);

    if !report.changed() {
        return Ok(Outcome::Unchanged);
    }
    if config.dry_run {
        return Ok(Outcome::DryRun);
    }

    env.save(&config.env_file)?;
    Ok(Outcome::Written)
}
