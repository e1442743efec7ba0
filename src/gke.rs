//! GKE version resolution and env file upgrade operations.

pub mod catalog;
pub mod feed;
pub mod planner;
pub mod switch;
pub mod upgrade;
