//! `acc-matrix`: origin/destination cost computation.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                      |
//! |-------------|---------------------------------------------------------------|
//! | [`engine`]  | `CostEngine`, `shortest_costs`, `PathCost`, `DestinationSet`  |
//! | [`matrix`]  | `OdMatrix`, `OdRow`, `OdMatrixBuilder`                        |
//! | [`nearest`] | `nth_nearest`, `nearest_ranks`                                |
//! | [`sink`]    | `RowSink` trait, `CancelToken`, `StreamStatus`                |
//! | [`error`]   | `MatrixError`, `MatrixResult<T>`                              |
//!
//! # Feature flags
//!
//! | Flag       | Effect                                                    |
//! |------------|-----------------------------------------------------------|
//! | `parallel` | Per-origin searches run on Rayon's pool, one scratch      |
//! |            | buffer per worker.  Row order is unchanged.               |

pub mod engine;
pub mod error;
pub mod matrix;
pub mod nearest;
pub mod sink;


pub use engine::{shortest_costs, CostEngine, DestinationSet, PathCost};
pub use error::{MatrixError, MatrixResult};
pub use matrix::{OdMatrix, OdMatrixBuilder, OdRow};
pub use nearest::{nearest_ranks, nth_nearest};
pub use sink::{CancelToken, RowSink, StreamStatus};
