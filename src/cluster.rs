/*!
 * Types and functions for grouping points into hotspots.
 *
 * A [Partitioner] splits a set of points into `k` groups. The [HotspotClusterer] uses one to
 * group a [PointSet](crate::PointSet) and then sizes a square [HotspotFeature] around each
 * group from the spread of its members.
 */

pub use hotspot::{percentile, HotspotClusterer, HotspotFeature};
pub use kmeans::{count_distinct, KMeans};
pub use partition::{Partition, Partitioner};

mod hotspot;
mod kmeans;
mod partition;
