//! `acc-network`: the routable road graph and everything that attaches
//! points to it.
//!
//! # Crate layout
//!
//! | Module     | Contents                                                       |
//! |------------|----------------------------------------------------------------|
//! | [`network`] | `RoadNetwork` (CSR + R-tree), `RoadNetworkBuilder`            |
//! | [`speed`]   | `SpeedTable` (classification → km/h)                         |
//! | [`loader`]  | CSV node/edge loading, `NetworkColumns`                       |
//! | [`points`]  | `PointSet`, CSV point loading, `PointIndex`                   |
//! | [`snap`]    | `snap`, `SnapRecord`, `SnapFailure`, `distinct_nodes`         |
//! | [`error`]   | `NetworkError`, `NetworkResult<T>`                            |
//!
//! # Feature flags
//!
//! | Flag       | Effect                                                    |
//! |------------|-----------------------------------------------------------|
//! | `parallel` | Snap point sets on Rayon's thread pool.                   |

pub mod error;
pub mod loader;
pub mod network;
pub mod points;
pub mod snap;
pub mod speed;


pub use error::{NetworkError, NetworkResult};
pub use loader::{load_network_csv, load_network_readers, NetworkColumns};
pub use network::{RoadNetwork, RoadNetworkBuilder};
pub use points::{load_points_csv, load_points_reader, PointColumns, PointIndex, PointSet};
pub use snap::{distinct_nodes, snap, snap_point, SnapFailure, SnapRecord, Snapped};
pub use speed::SpeedTable;
