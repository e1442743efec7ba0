//! env.yaml document handling.

pub mod document;
pub mod pools;
pub mod view;

pub use document::EnvFile;
pub use pools::{ActiveFlag, PoolGroup, PoolGroups, Slot};
