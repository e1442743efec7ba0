//! CLI configuration and argument parsing.

use std::path::PathBuf;
use std::sync::LazyLock;

use clap::Parser;
use regex::Regex;

use crate::error::GkupError;
use crate::gke::feed::GKE_RELEASE_NOTES_URL;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const COMMIT: &str = env!("BUILD_COMMIT");
pub const BUILD_DATE: &str = env!("BUILD_DATE");

static MINOR_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+$").expect("valid minor version regex"));

/// GKE env.yaml upgrade support CLI tool.
///
/// Upgrades the control plane and the non-active nodepool slot of every pool
/// group to a target GKE version, or switches the active nodepool slots.
#[derive(Parser, Debug, Clone)]
#[command(name = "gkup")]
#[command(about = "GKE env.yaml upgrade support CLI tool")]
#[command(version = const_format::formatcp!(
    "{} (commit: {}, build date: {})",
    VERSION, COMMIT, BUILD_DATE
))]
pub struct Args {
    /// Path to env.yaml file (e.g., kbc-stack/terraform/env.yaml)
    pub env_file: PathBuf,

    /// Use specific image version for GKE upgrade (e.g., 1.28.9-gke.1000000)
    #[arg(short, long, value_name = "VERSION")]
    pub image: Option<String>,

    /// GKE minor version to search for (e.g., 1.28)
    #[arg(short, long, value_name = "X.Y")]
    pub minor: Option<String>,

    /// Use latest image for specified version instead of the second to latest
    #[arg(short, long, default_value = "false")]
    pub latest: bool,

    /// Switch active nodepools only, do not change any Kubernetes version fields
    #[arg(long, default_value = "false")]
    pub switch_active_only: bool,

    /// Show what would change without writing the env file
    #[arg(long, default_value = "false")]
    pub dry_run: bool,

    /// GKE release notes feed URL
    #[arg(long, default_value = GKE_RELEASE_NOTES_URL, env = "GKUP_FEED_URL")]
    pub feed_url: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", env = "GKUP_LOG_LEVEL")]
    pub log_level: String,
}

/// How the target GKE version is determined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSelector {
    /// Exact build version, used verbatim.
    Exact(String),
    /// Resolve a minor version family against the release notes feed.
    Minor { family: String, latest: bool },
    /// Derive the minor version family from the highest version in the file.
    Inferred { latest: bool },
}

/// Operation selected once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    SwitchActiveOnly,
    Upgrade(VersionSelector),
}

/// Application configuration derived from CLI args.
#[derive(Debug, Clone)]
pub struct Config {
    pub env_file: PathBuf,
    pub mode: Mode,
    pub dry_run: bool,
    pub feed_url: String,
    pub log_level: String,
}

impl Config {
    /// Validate CLI arguments and select the operation mode.
    pub fn from_args(args: Args) -> Result<Self, GkupError> {
        if args.env_file.as_os_str().is_empty() {
            return Err(GkupError::InvalidInput(
                "Please specify env.yaml file path, e.g. kbc-stack/terraform/env.yaml".to_string(),
            ));
        }

        let mode = select_mode(&args)?;

        Ok(Self {
            env_file: args.env_file,
            mode,
            dry_run: args.dry_run,
            feed_url: args.feed_url,
            log_level: args.log_level,
        })
    }
}

fn select_mode(args: &Args) -> Result<Mode, GkupError> {
    let has_version_flags = args.image.is_some() || args.minor.is_some() || args.latest;

    if args.switch_active_only {
        if has_version_flags {
            return Err(GkupError::InvalidInput(
                "--switch-active-only cannot be used together with --image, --minor or --latest"
                    .to_string(),
            ));
        }
        return Ok(Mode::SwitchActiveOnly);
    }

    if let Some(image) = &args.image {
        if args.minor.is_some() || args.latest {
            return Err(GkupError::InvalidInput(
                "--image cannot be used together with --minor or --latest".to_string(),
            ));
        }
        if image.trim().is_empty() {
            return Err(GkupError::InvalidInput("--image must not be empty".to_string()));
        }
        return Ok(Mode::Upgrade(VersionSelector::Exact(image.trim().to_string())));
    }

    if let Some(minor) = &args.minor {
        if !MINOR_VERSION_RE.is_match(minor) {
            return Err(GkupError::InvalidInput(format!(
                "Invalid minor_version format '{}'. Please use the format 'x.y' where x and y are numbers.",
                minor
            )));
        }
        return Ok(Mode::Upgrade(VersionSelector::Minor {
            family: minor.clone(),
            latest: args.latest,
        }));
    }

    Ok(Mode::Upgrade(VersionSelector::Inferred {
        latest: args.latest,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_args(image: Option<&str>, minor: Option<&str>, latest: bool) -> Args {
        Args {
            env_file: PathBuf::from("env.yaml"),
            image: image.map(String::from),
            minor: minor.map(String::from),
            latest,
            switch_active_only: false,
            dry_run: false,
            feed_url: GKE_RELEASE_NOTES_URL.to_string(),
            log_level: "warn".to_string(),
        }
    }

    #[test]
    fn test_default_mode_is_inferred_upgrade() {
        let config = Config::from_args(create_test_args(None, None, false)).unwrap();
        assert_eq!(
            config.mode,
            Mode::Upgrade(VersionSelector::Inferred { latest: false })
        );
    }

    #[test]
    fn test_latest_only_is_inferred_latest() {
        let config = Config::from_args(create_test_args(None, None, true)).unwrap();
        assert_eq!(
            config.mode,
            Mode::Upgrade(VersionSelector::Inferred { latest: true })
        );
    }

    #[test]
    fn test_minor_mode() {
        let config = Config::from_args(create_test_args(None, Some("1.28"), true)).unwrap();
        assert_eq!(
            config.mode,
            Mode::Upgrade(VersionSelector::Minor {
                family: "1.28".to_string(),
                latest: true
            })
        );
    }

    #[test]
    fn test_exact_mode() {
        let config =
            Config::from_args(create_test_args(Some("1.27.11-gke.1062000"), None, false)).unwrap();
        assert_eq!(
            config.mode,
            Mode::Upgrade(VersionSelector::Exact("1.27.11-gke.1062000".to_string()))
        );
    }

    #[test]
    fn test_image_and_minor_conflict() {
        let result =
            Config::from_args(create_test_args(Some("1.27.11-gke.1"), Some("1.27"), false));
        assert!(matches!(result, Err(GkupError::InvalidInput(_))));
    }

    #[test]
    fn test_image_and_latest_conflict() {
        let result = Config::from_args(create_test_args(Some("1.27.11-gke.1"), None, true));
        assert!(matches!(result, Err(GkupError::InvalidInput(_))));
    }

    #[test]
    fn test_invalid_minor_format() {
        for minor in ["1", "1.x", "v1.28", "1.28.3", "", "1.28 "] {
            let result = Config::from_args(create_test_args(None, Some(minor), false));
            assert!(
                matches!(result, Err(GkupError::InvalidInput(_))),
                "expected {:?} to be rejected",
                minor
            );
        }
    }

    #[test]
    fn test_switch_active_only_mode() {
        let mut args = create_test_args(None, None, false);
        args.switch_active_only = true;
        let config = Config::from_args(args).unwrap();
        assert_eq!(config.mode, Mode::SwitchActiveOnly);
    }

    #[test]
    fn test_switch_active_only_conflicts_with_version_flags() {
        let mut args = create_test_args(None, Some("1.28"), false);
        args.switch_active_only = true;
        assert!(matches!(
            Config::from_args(args),
            Err(GkupError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_empty_env_file_rejected() {
        let mut args = create_test_args(None, None, false);
        args.env_file = PathBuf::new();
        assert!(matches!(
            Config::from_args(args),
            Err(GkupError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_cli_parses_short_flags() {
        let args = Args::try_parse_from(["gkup", "env.yaml", "-m", "1.29", "-l"]).unwrap();
        assert_eq!(args.minor.as_deref(), Some("1.29"));
        assert!(args.latest);
        assert!(!args.switch_active_only);
        assert_eq!(args.env_file, PathBuf::from("env.yaml"));
    }
}
