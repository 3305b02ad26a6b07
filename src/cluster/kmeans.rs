use super::partition::{Partition, Partitioner};
use crate::{
    config::HotspotConfig,
    error::{HotspotError, HotspotResult},
    geo::Coord,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rustc_hash::FxHashSet as HashSet;

type Point = [f64; 2];

/**
 * Lloyd's k-means with k-means++ seeding, run directly on (latitude, longitude).
 *
 * Each of `restarts` runs is seeded from a single random number generator created from the seed,
 * so the whole thing is reproducible. The run with the lowest inertia is kept.
 */
#[derive(Debug, Clone, Copy)]
pub struct KMeans {
    pub restarts: usize,
    pub max_iterations: usize,
    /// Convergence threshold on the total squared center shift, relative to the mean variance
    /// of the coordinates.
    pub tolerance: f64,
}

impl KMeans {
    pub fn from_config(config: &HotspotConfig) -> Self {
        KMeans {
            restarts: config.restarts,
            max_iterations: config.max_iterations,
            tolerance: config.tolerance,
        }
    }

    fn run_once(&self, data: &[Point], k: usize, tol: f64, rng: &mut StdRng) -> Partition {
        let mut centers = kmeans_plus_plus(data, k, rng);
        let mut labels = vec![0usize; data.len()];

        for iteration in 0..self.max_iterations {
            assign(data, &centers, &mut labels);
            let new_centers = means(data, &labels, &centers);

            let shift: f64 = centers
                .iter()
                .zip(&new_centers)
                .map(|(old, new)| dist_sq(old, new))
                .sum();

            centers = new_centers;

            if shift <= tol {
                log::trace!("k-means converged after {} iterations", iteration + 1);
                break;
            }
        }

        // Make the labels agree with the final centers, then report the true member means.
        assign(data, &centers, &mut labels);
        let centers = means(data, &labels, &centers);

        let inertia = data
            .iter()
            .zip(&labels)
            .map(|(pnt, &label)| dist_sq(pnt, &centers[label]))
            .sum();

        Partition {
            labels,
            centroids: centers
                .into_iter()
                .map(|[lat, lon]| Coord { lat, lon })
                .collect(),
            inertia,
        }
    }
}

impl Default for KMeans {
    fn default() -> Self {
        Self::from_config(&HotspotConfig::default())
    }
}

impl Partitioner for KMeans {
    fn partition(&self, points: &[Coord], k: usize, seed: u64) -> HotspotResult<Partition> {
        if k == 0 {
            return Err(HotspotError::InvalidClusterCount { requested: k });
        }

        let distinct = count_distinct(points);
        if k > distinct {
            return Err(HotspotError::TooManyClusters {
                requested: k,
                distinct,
            });
        }

        let data: Vec<Point> = points.iter().map(|c| [c.lat, c.lon]).collect();
        let tol = self.tolerance * mean_variance(&data);

        let mut rng = StdRng::seed_from_u64(seed);
        let mut best: Option<Partition> = None;

        for restart in 0..self.restarts.max(1) {
            let candidate = self.run_once(&data, k, tol, &mut rng);
            log::debug!(
                "k-means restart {} (k={}, n={}): inertia={:e}",
                restart,
                k,
                data.len(),
                candidate.inertia
            );

            match best {
                Some(ref current) if current.inertia <= candidate.inertia => {}
                _ => best = Some(candidate),
            }
        }

        // restarts is at least one, so there is always a best.
        best.ok_or_else(|| {
            HotspotError::InvalidArgument("k-means requires at least one restart".to_owned())
        })
    }
}

/// Count the points with distinct coordinates.
pub fn count_distinct(points: &[Coord]) -> usize {
    // Adding 0.0 folds -0.0 into 0.0 so they hash the same.
    points
        .iter()
        .map(|c| ((c.lat + 0.0).to_bits(), (c.lon + 0.0).to_bits()))
        .collect::<HashSet<_>>()
        .len()
}

#[inline]
fn dist_sq(a: &Point, b: &Point) -> f64 {
    let dlat = a[0] - b[0];
    let dlon = a[1] - b[1];
    dlat * dlat + dlon * dlon
}

fn mean_variance(data: &[Point]) -> f64 {
    let n = data.len() as f64;
    let mut total = 0.0;

    for dim in 0..2 {
        let mean = data.iter().map(|p| p[dim]).sum::<f64>() / n;
        total += data.iter().map(|p| (p[dim] - mean).powi(2)).sum::<f64>() / n;
    }

    total / 2.0
}

/// Assign each point to its nearest center, ties going to the lowest index.
fn assign(data: &[Point], centers: &[Point], labels: &mut [usize]) {
    for (pnt, label) in data.iter().zip(labels.iter_mut()) {
        let mut best = 0;
        let mut best_dist = f64::INFINITY;

        for (i, center) in centers.iter().enumerate() {
            let dist = dist_sq(pnt, center);
            if dist < best_dist {
                best_dist = dist;
                best = i;
            }
        }

        *label = best;
    }
}

/// Mean of the members of each group. A group with no members keeps its previous center.
fn means(data: &[Point], labels: &[usize], previous: &[Point]) -> Vec<Point> {
    let mut sums = vec![[0.0f64; 2]; previous.len()];
    let mut counts = vec![0usize; previous.len()];

    for (pnt, &label) in data.iter().zip(labels) {
        sums[label][0] += pnt[0];
        sums[label][1] += pnt[1];
        counts[label] += 1;
    }

    sums.into_iter()
        .zip(counts)
        .zip(previous)
        .map(|((sum, count), prev)| {
            if count > 0 {
                [sum[0] / count as f64, sum[1] / count as f64]
            } else {
                *prev
            }
        })
        .collect()
}

/**
 * Greedy k-means++ seeding.
 *
 * The first center is picked uniformly. Each following center is the best, by total potential,
 * of several candidates drawn with probability proportional to their squared distance from the
 * nearest center already chosen.
 */
fn kmeans_plus_plus(data: &[Point], k: usize, rng: &mut StdRng) -> Vec<Point> {
    let n = data.len();
    let n_local_trials = 2 + (k as f64).ln().floor() as usize;

    let mut centers = Vec::with_capacity(k);
    let first = data[rng.gen_range(0..n)];
    centers.push(first);

    let mut closest: Vec<f64> = data.iter().map(|p| dist_sq(p, &first)).collect();
    let mut potential: f64 = closest.iter().sum();

    while centers.len() < k {
        let mut best_candidate: Option<(usize, f64, Vec<f64>)> = None;

        for _ in 0..n_local_trials {
            let idx = weighted_pick(&closest, potential, rng);

            let candidate_closest: Vec<f64> = data
                .iter()
                .zip(&closest)
                .map(|(p, &d)| d.min(dist_sq(p, &data[idx])))
                .collect();
            let candidate_potential: f64 = candidate_closest.iter().sum();

            match best_candidate {
                Some((_, best_potential, _)) if best_potential <= candidate_potential => {}
                _ => best_candidate = Some((idx, candidate_potential, candidate_closest)),
            }
        }

        if let Some((idx, new_potential, new_closest)) = best_candidate {
            centers.push(data[idx]);
            potential = new_potential;
            closest = new_closest;
        }
    }

    centers
}

fn weighted_pick(weights: &[f64], total: f64, rng: &mut StdRng) -> usize {
    if !(total > 0.0) {
        // Every point sits on a center already, fall back to any point not yet chosen.
        return weights.iter().position(|&w| w > 0.0).unwrap_or(0);
    }

    let target = rng.gen::<f64>() * total;
    let mut acc = 0.0;
    let mut last_positive = 0;

    for (i, &w) in weights.iter().enumerate() {
        if w > 0.0 {
            acc += w;
            last_positive = i;
            if acc > target {
                return i;
            }
        }
    }

    // Rounding left the target just past the end of the cumulative sum.
    last_positive
}

#[cfg(test)]
mod test {
    use super::*;

    fn blobs() -> Vec<Coord> {
        let centers = [(34.05, -118.25), (34.10, -118.40), (33.95, -118.20)];
        let mut points = vec![];

        for (i, &(lat, lon)) in centers.iter().enumerate() {
            for j in 0..40 {
                let dlat = ((j % 7) as f64 - 3.0) * 0.0005 + i as f64 * 1.0e-6;
                let dlon = ((j % 5) as f64 - 2.0) * 0.0005;
                points.push(Coord::new(lat + dlat, lon + dlon));
            }
        }

        points
    }

    #[test]
    fn test_separates_obvious_groups() {
        let points = blobs();
        let part = KMeans::default().partition(&points, 3, 42).unwrap();

        assert_eq!(part.labels.len(), points.len());
        assert_eq!(part.centroids.len(), 3);

        let mut counts = part.counts();
        counts.sort_unstable();
        assert_eq!(counts, vec![40, 40, 40]);

        // Each blob should share a single label.
        for blob in 0..3 {
            let first = part.labels[blob * 40];
            assert!(part.labels[blob * 40..(blob + 1) * 40]
                .iter()
                .all(|&l| l == first));
        }
    }

    #[test]
    fn test_centroids_are_member_means() {
        let points = blobs();
        let part = KMeans::default().partition(&points, 3, 42).unwrap();

        for (members, centroid) in part.members(&points).iter().zip(&part.centroids) {
            let n = members.len() as f64;
            let lat = members.iter().map(|c| c.lat).sum::<f64>() / n;
            let lon = members.iter().map(|c| c.lon).sum::<f64>() / n;
            assert!(centroid.is_close(&Coord::new(lat, lon), 1.0e-12));
        }
    }

    #[test]
    fn test_deterministic_for_seed() {
        let points = blobs();
        let kmeans = KMeans::default();

        let first = kmeans.partition(&points, 5, 42).unwrap();
        let second = kmeans.partition(&points, 5, 42).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_rejects_infeasible_k() {
        let points = vec![Coord::new(1.0, 1.0), Coord::new(1.0, 1.0), Coord::new(2.0, 2.0)];
        let kmeans = KMeans::default();

        assert!(matches!(
            kmeans.partition(&points, 3, 42),
            Err(HotspotError::TooManyClusters {
                requested: 3,
                distinct: 2
            })
        ));
        assert!(matches!(
            kmeans.partition(&points, 0, 42),
            Err(HotspotError::InvalidClusterCount { requested: 0 })
        ));
        assert!(kmeans.partition(&points, 2, 42).is_ok());
    }

    #[test]
    fn test_k_equals_distinct_points() {
        let points = vec![
            Coord::new(1.0, 1.0),
            Coord::new(2.0, 2.0),
            Coord::new(3.0, 3.0),
            Coord::new(3.0, 3.0),
        ];

        let part = KMeans::default().partition(&points, 3, 7).unwrap();
        let mut counts = part.counts();
        counts.sort_unstable();

        assert_eq!(counts, vec![1, 1, 2]);
        assert_eq!(part.inertia, 0.0);
    }

    #[test]
    fn test_count_distinct() {
        let points = vec![
            Coord::new(0.0, 0.0),
            Coord::new(-0.0, 0.0),
            Coord::new(34.05, -118.25),
            Coord::new(34.05, -118.25),
        ];
        assert_eq!(count_distinct(&points), 2);
        assert_eq!(count_distinct(&[]), 0);
    }
}
