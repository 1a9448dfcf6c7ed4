//! Straight-line distance to the nearest facility of a category.

use acc_core::Crs;
use acc_network::PointSet;

/// Metres from each origin to its nearest point of `facilities`, in origin
/// order.  `None` where the origin coordinate is invalid or the category has
/// no valid points.
pub fn nearest_straight_line(origins: &PointSet, facilities: &PointSet, crs: Crs) -> Vec<Option<f64>> {
    let index = facilities.spatial_index(crs);
    if index.is_empty() {
        log::warn!("category {:?} has no valid coordinates for straight-line distances", facilities.name());
    }
    origins.coords().iter().map(|&c| index.nearest(c).map(|(_, d)| d)).collect()
}
