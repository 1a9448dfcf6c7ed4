//! `acc-core`: foundational types for the accessibility workspace.
//!
//! This crate is a dependency of every other `acc-*` crate.  It has no
//! `acc-*` dependencies and minimal external ones (`thiserror` and `serde`).
//!
//! # What lives here
//!
//! | Module          | Contents                                              |
//! |-----------------|-------------------------------------------------------|
//! | [`ids`]         | `NodeId`, `EdgeId`, `PointId`                         |
//! | [`geo`]         | `Coord`, `Crs`, `LinearUnit`, haversine distance      |
//! | [`weight`]      | `WeightAttribute`, `CostUnit`                         |
//! | [`cost`]        | `FailValue` sentinel                                  |
//! | [`config`]      | `AccessConfig` (validated run configuration)          |
//! | [`error`]       | `AccError`, `AccResult`                               |

pub mod config;
pub mod cost;
pub mod error;
pub mod geo;
pub mod ids;
pub mod weight;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::AccessConfig;
pub use cost::FailValue;
pub use error::{AccError, AccResult};
pub use geo::{Coord, Crs, LinearUnit};
pub use ids::{EdgeId, NodeId, PointId};
pub use weight::{CostUnit, WeightAttribute};
