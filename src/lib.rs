//! gkup - GKE env.yaml upgrade support library.
//!
//! Prepares an env.yaml for staged GKE upgrades:
//! - Resolves a target version from the GKE no-channel release notes
//! - Upgrades the control plane and non-active nodepool slots
//! - Switches active nodepool slots on request

pub mod app;
pub mod config;
pub mod envfile;
pub mod error;
pub mod gke;
pub mod output;
