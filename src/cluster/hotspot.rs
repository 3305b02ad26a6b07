use super::{
    kmeans::{count_distinct, KMeans},
    partition::Partitioner,
};
use crate::{
    config::{ClusterCountPolicy, HotspotConfig},
    error::{HotspotError, HotspotResult},
    event::PointSet,
    geo::{square_ring, Coord, Ring},
};
use rand::{rngs::StdRng, SeedableRng};
use std::borrow::Cow;

/// Percentile of member distances used to measure the spread of a cluster.
const SPREAD_PERCENTILE: f64 = 80.0;
/// Fraction of the spread used as the half-size of the hotspot square.
const SPREAD_TO_HALF_SIZE: f64 = 0.5;

/**
 * A single hotspot: a cluster of incidents summarized as a square around its center.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct HotspotFeature {
    /// Mean latitude and longitude of the points in the cluster.
    pub center: Coord,
    /// The number of points that are in this cluster.
    pub count: usize,
    /// Half the width of the square in meters, clamped and truncated.
    pub half_m: u32,
    /// Closed ring of (longitude, latitude) vertices.
    pub ring: Ring,
}

impl HotspotFeature {
    /**
     * Size a hotspot from the members of a cluster.
     *
     * The half-size is half the 80th percentile of the great circle distances from the center to
     * the members, clamped to `[min_buffer_m, max_buffer_m]`.
     *
     * #Arguments
     * * center - the cluster center.
     * * members - the points assigned to the cluster, must not be empty.
     *
     * Fails with `InvalidArgument` unless `0 < min_buffer_m <= max_buffer_m`.
     */
    pub fn from_members(
        center: Coord,
        members: &[&Coord],
        min_buffer_m: f64,
        max_buffer_m: f64,
    ) -> HotspotResult<Self> {
        debug_assert!(!members.is_empty());

        if !(min_buffer_m > 0.0 && min_buffer_m <= max_buffer_m) {
            return Err(HotspotError::InvalidArgument(format!(
                "buffer range must satisfy 0 < min <= max: min={} max={}",
                min_buffer_m, max_buffer_m
            )));
        }

        let mut dists: Vec<f64> = members.iter().map(|pnt| center.distance_to(pnt)).collect();
        let spread = percentile(&mut dists, SPREAD_PERCENTILE);

        let half_size_m = (spread * SPREAD_TO_HALF_SIZE).clamp(min_buffer_m, max_buffer_m);
        let ring = square_ring(center, half_size_m)?;

        Ok(HotspotFeature {
            center,
            count: members.len(),
            half_m: half_size_m as u32,
            ring,
        })
    }
}

/**
 * Percentile of a set of values using linear interpolation between the closest ranks.
 *
 * The values are sorted in place. Returns NaN for an empty slice.
 */
pub fn percentile(values: &mut [f64], pct: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }

    values.sort_by(|a, b| a.total_cmp(b));

    let rank = (pct / 100.0).clamp(0.0, 1.0) * (values.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;

    values[lo] + (values[hi] - values[lo]) * (rank - lo as f64)
}

/**
 * Turns a set of points into at most `k` hotspots.
 */
#[derive(Debug, Clone)]
pub struct HotspotClusterer<P = KMeans> {
    partitioner: P,
    min_buffer_m: f64,
    max_buffer_m: f64,
    seed: u64,
    subsample_cap: usize,
    policy: ClusterCountPolicy,
}

impl HotspotClusterer<KMeans> {
    /// A clusterer using k-means configured from `config`. Fails if `config` is invalid.
    pub fn new(config: &HotspotConfig) -> HotspotResult<Self> {
        Self::with_partitioner(config, KMeans::from_config(config))
    }
}

impl<P: Partitioner> HotspotClusterer<P> {
    pub fn with_partitioner(config: &HotspotConfig, partitioner: P) -> HotspotResult<Self> {
        config.validate()?;

        Ok(HotspotClusterer {
            partitioner,
            min_buffer_m: config.min_buffer_m,
            max_buffer_m: config.max_buffer_m,
            seed: config.seed,
            subsample_cap: config.subsample_cap,
            policy: config.cluster_count_policy,
        })
    }

    /// Build the hotspots for a point set.
    pub fn hotspots(&self, points: &PointSet, k: usize) -> HotspotResult<Vec<HotspotFeature>> {
        log::info!(
            "clustering {} {} points into {} hotspots",
            points.len(),
            points.class(),
            k
        );
        self.cluster(points.points(), k)
    }

    /**
     * Build the hotspots for a slice of points.
     *
     * An empty slice gives no hotspots. Clusters that end up with no members are skipped, so
     * there may be fewer than `k` hotspots.
     */
    pub fn cluster(&self, points: &[Coord], k: usize) -> HotspotResult<Vec<HotspotFeature>> {
        if points.is_empty() {
            return Ok(vec![]);
        }

        let points = self.subsample(points);
        let k = self.feasible_k(&points, k)?;

        let partition = self.partitioner.partition(&points, k, self.seed)?;

        let mut features = Vec::with_capacity(k);
        for (i, (members, center)) in partition
            .members(&points)
            .iter()
            .zip(&partition.centroids)
            .enumerate()
        {
            if members.is_empty() {
                log::debug!("cluster {} has no members, skipping", i);
                continue;
            }

            let feature =
                HotspotFeature::from_members(*center, members, self.min_buffer_m, self.max_buffer_m)?;

            log::debug!(
                "cluster {:>3}: center=({:.6}, {:.6}) count={} half_m={}",
                i,
                feature.center.lat,
                feature.center.lon,
                feature.count,
                feature.half_m
            );

            features.push(feature);
        }

        Ok(features)
    }

    fn subsample<'a>(&self, points: &'a [Coord]) -> Cow<'a, [Coord]> {
        if points.len() <= self.subsample_cap {
            return Cow::Borrowed(points);
        }

        log::info!(
            "subsampling {} points down to {}",
            points.len(),
            self.subsample_cap
        );

        let mut rng = StdRng::seed_from_u64(self.seed);
        let sample = rand::seq::index::sample(&mut rng, points.len(), self.subsample_cap);

        Cow::Owned(sample.into_iter().map(|i| points[i]).collect())
    }

    fn feasible_k(&self, points: &[Coord], k: usize) -> HotspotResult<usize> {
        if k == 0 {
            return Err(HotspotError::InvalidClusterCount { requested: k });
        }

        let distinct = count_distinct(points);
        if k <= distinct {
            return Ok(k);
        }

        match self.policy {
            ClusterCountPolicy::Strict => Err(HotspotError::TooManyClusters {
                requested: k,
                distinct,
            }),
            ClusterCountPolicy::Reduce => {
                log::warn!(
                    "only {} distinct points, reducing cluster count from {} to {}",
                    distinct,
                    k,
                    distinct
                );
                Ok(distinct)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{cluster::Partition, time_of_day::TemporalClass};

    #[test]
    fn test_percentile() {
        let mut vals = vec![4.0, 0.0, 3.0, 1.0, 2.0];
        assert!((percentile(&mut vals, 80.0) - 3.2).abs() < 1.0e-12);
        assert_eq!(percentile(&mut vals, 0.0), 0.0);
        assert_eq!(percentile(&mut vals, 100.0), 4.0);
        assert_eq!(percentile(&mut vals, 50.0), 2.0);

        assert_eq!(percentile(&mut [10.0], 80.0), 10.0);
        assert!(percentile(&mut Vec::new(), 80.0).is_nan());
    }

    #[test]
    fn test_identical_points_give_minimum_square() {
        let center = Coord::new(34.05, -118.25);
        let points = PointSet::from_coords(TemporalClass::Day, vec![center; 3]);

        let clusterer = HotspotClusterer::new(&HotspotConfig::default()).unwrap();
        let features = clusterer.hotspots(&points, 1).unwrap();

        assert_eq!(features.len(), 1);
        assert_eq!(features[0].count, 3);
        assert_eq!(features[0].half_m, 120);
        assert!(features[0].center.is_close(&center, 1.0e-9));
        assert_eq!(features[0].ring[0], features[0].ring[4]);
    }

    #[test]
    fn test_empty_input_is_not_an_error() {
        let clusterer = HotspotClusterer::new(&HotspotConfig::default()).unwrap();
        let features = clusterer.cluster(&[], 50).unwrap();
        assert!(features.is_empty());
    }

    #[test]
    fn test_half_size_is_clamped_to_maximum() {
        let center = Coord::new(0.0, 0.0);
        // All members are ~11 km from the center.
        let far = [
            Coord::new(0.1, 0.0),
            Coord::new(-0.1, 0.0),
            Coord::new(0.0, 0.1),
            Coord::new(0.0, -0.1),
        ];
        let members: Vec<&Coord> = far.iter().collect();

        let feature = HotspotFeature::from_members(center, &members, 120.0, 450.0).unwrap();
        assert_eq!(feature.half_m, 450);
        assert_eq!(feature.count, 4);
    }

    #[test]
    fn test_bad_buffer_range_is_an_error() {
        let center = Coord::new(0.0, 0.0);
        let near = [Coord::new(0.001, 0.0)];
        let members: Vec<&Coord> = near.iter().collect();

        for (min, max) in [(500.0, 450.0), (f64::NAN, 450.0), (120.0, f64::NAN), (0.0, 450.0)] {
            assert!(matches!(
                HotspotFeature::from_members(center, &members, min, max),
                Err(HotspotError::InvalidArgument(_))
            ));

            let config = HotspotConfig {
                min_buffer_m: min,
                max_buffer_m: max,
                ..HotspotConfig::default()
            };
            assert!(matches!(
                HotspotClusterer::new(&config),
                Err(HotspotError::InvalidArgument(_))
            ));
            assert!(HotspotClusterer::with_partitioner(&config, LastGroup).is_err());
        }
    }

    #[test]
    fn test_half_size_between_limits_is_truncated() {
        let center = Coord::new(0.0, 0.0);
        // 0.005 degrees of latitude is about 556 m, so half of it is about 278 m.
        let members_owned = [Coord::new(0.005, 0.0), Coord::new(-0.005, 0.0)];
        let members: Vec<&Coord> = members_owned.iter().collect();

        let feature = HotspotFeature::from_members(center, &members, 120.0, 450.0).unwrap();
        let expected = center.distance_to(&members_owned[0]) * 0.5;

        assert_eq!(feature.half_m, expected as u32);
        assert!(feature.half_m > 120 && feature.half_m < 450);
    }

    #[test]
    fn test_strict_policy_rejects_too_many_clusters() {
        let points = vec![Coord::new(34.0, -118.0), Coord::new(34.1, -118.1)];
        let clusterer = HotspotClusterer::new(&HotspotConfig::default()).unwrap();

        assert!(matches!(
            clusterer.cluster(&points, 3),
            Err(HotspotError::TooManyClusters {
                requested: 3,
                distinct: 2
            })
        ));
    }

    #[test]
    fn test_reduce_policy_lowers_cluster_count() {
        let points = vec![
            Coord::new(34.0, -118.0),
            Coord::new(34.1, -118.1),
            Coord::new(34.1, -118.1),
        ];
        let config = HotspotConfig {
            cluster_count_policy: ClusterCountPolicy::Reduce,
            ..HotspotConfig::default()
        };

        let features = HotspotClusterer::new(&config).unwrap().cluster(&points, 50).unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features.iter().map(|f| f.count).sum::<usize>(), 3);
    }

    #[test]
    fn test_subsample_caps_points() {
        let points: Vec<Coord> = (0..100)
            .map(|i| Coord::new(34.0 + i as f64 * 1.0e-4, -118.0))
            .collect();
        let config = HotspotConfig {
            subsample_cap: 30,
            ..HotspotConfig::default()
        };

        let clusterer = HotspotClusterer::new(&config).unwrap();
        let first = clusterer.subsample(&points);
        let second = clusterer.subsample(&points);

        assert_eq!(first.len(), 30);
        assert_eq!(first, second);

        // Without replacement.
        assert_eq!(count_distinct(&first), 30);

        let features = clusterer.cluster(&points, 4).unwrap();
        assert_eq!(features.iter().map(|f| f.count).sum::<usize>(), 30);
    }

    /// Always puts every point in the last of `k` groups.
    struct LastGroup;

    impl Partitioner for LastGroup {
        fn partition(&self, points: &[Coord], k: usize, _seed: u64) -> HotspotResult<Partition> {
            Ok(Partition {
                labels: vec![k - 1; points.len()],
                centroids: vec![points[0]; k],
                inertia: 0.0,
            })
        }
    }

    #[test]
    fn test_empty_clusters_are_skipped() {
        let points = vec![
            Coord::new(34.0, -118.0),
            Coord::new(34.1, -118.1),
            Coord::new(34.2, -118.2),
        ];
        let clusterer =
            HotspotClusterer::with_partitioner(&HotspotConfig::default(), LastGroup).unwrap();

        let features = clusterer.cluster(&points, 3).unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].count, 3);
    }
}
