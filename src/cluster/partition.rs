use crate::{error::HotspotResult, geo::Coord};

/// The result of partitioning a set of points.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// For each input point, the index of the group it was assigned to.
    pub labels: Vec<usize>,
    /// The center of each group, the mean latitude and longitude of its members. Groups that
    /// ended up with no members keep whatever center the algorithm last had for them.
    pub centroids: Vec<Coord>,
    /// Sum of squared (degree space) distances from each point to its center.
    pub inertia: f64,
}

impl Partition {
    /// The number of points assigned to each group.
    pub fn counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.centroids.len()];
        for &label in &self.labels {
            counts[label] += 1;
        }
        counts
    }

    /// Gather the members of each group, preserving input order within a group.
    pub fn members<'a>(&self, points: &'a [Coord]) -> Vec<Vec<&'a Coord>> {
        debug_assert_eq!(points.len(), self.labels.len());

        let mut members: Vec<Vec<&Coord>> = vec![vec![]; self.centroids.len()];
        for (pnt, &label) in points.iter().zip(&self.labels) {
            members[label].push(pnt);
        }
        members
    }
}

/// Anything that can split points into `k` groups.
///
/// Implementations must be deterministic for a given input, `k`, and `seed`.
pub trait Partitioner {
    fn partition(&self, points: &[Coord], k: usize, seed: u64) -> HotspotResult<Partition>;
}
