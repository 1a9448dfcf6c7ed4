//! `acc-pipeline`: the parametric category pipeline.
//!
//! Ties the lower crates together for one batch run:
//!
//! ```text
//! RoadNetwork + origins + [Category]
//!   → snap (acc-network)
//!   → streamed OD rows (acc-matrix) → nearest ranks per category
//!   → walk leg + multimodal costs + composite + class
//!   → RunReport → AccessWriter (acc-output)
//! ```
//!
//! # Crate layout
//!
//! | Module          | Contents                                                  |
//! |-----------------|-----------------------------------------------------------|
//! | [`category`]    | `Category` descriptors and their column names             |
//! | [`builder`]     | `PipelineBuilder`                                         |
//! | [`pipeline`]    | `Pipeline::run`, `PipelineContext`                        |
//! | [`multimodal`]  | Tobler `WalkModel`, `combine`                             |
//! | [`elevation`]   | `ElevationSource`, `FlatTerrain`, `SampledElevation`      |
//! | [`classes`]     | composite score, quartile `AccessClass`                   |
//! | [`straight`]    | straight-line nearest-facility distance                   |
//! | [`summary`]     | `RegionSpec`, weighted regional summaries                 |
//! | [`observer`]    | `PipelineObserver`, `LogObserver`, `NoopObserver`         |
//! | [`report`]      | `RunReport`, `AccessRecord`                               |
//!
//! # Cargo features
//!
//! | Feature    | Effect                                                 |
//! |------------|--------------------------------------------------------|
//! | `parallel` | Snapping and per-origin searches on Rayon's pool.      |
//! | `sqlite`   | Enables `acc_output::SqliteWriter`.                    |
//! | `parquet`  | Enables `acc_output::ParquetWriter`.                   |

pub mod builder;
pub mod category;
pub mod classes;
pub mod elevation;
pub mod error;
pub mod multimodal;
pub mod observer;
pub mod pipeline;
pub mod report;
pub mod straight;
pub mod summary;

#[cfg(test)]
mod tests;

pub use builder::PipelineBuilder;
pub use category::{ordinal, Category};
pub use classes::{composite, percentile, AccessClass, ClassBreaks};
pub use elevation::{ElevationSource, FlatTerrain, SampledElevation};
pub use error::{PipelineError, PipelineResult};
pub use multimodal::{combine, WalkLeg, WalkModel};
pub use observer::{LogObserver, NoopObserver, PipelineObserver, Stage};
pub use pipeline::{Pipeline, PipelineContext};
pub use report::{AccessRecord, RunReport, RunStatus, Scores};
pub use straight::nearest_straight_line;
pub use summary::{summarise, RegionSpec, UNASSIGNED_REGION};
