/*!
 * Run configuration.
 *
 * All the tunable numbers for a run live in a [HotspotConfig] value that is handed to the
 * pipeline, rather than in process wide globals.
 */
use crate::{
    error::{HotspotError, HotspotResult},
    time_of_day::TemporalClass,
};
use static_assertions::const_assert;
use std::fmt::{self, Display};

/// Default number of day hotspots.
pub const DEFAULT_K_DAY: usize = 50;
/// Default number of night hotspots.
pub const DEFAULT_K_NIGHT: usize = 50;
/// Smallest hotspot half-size in meters, roughly one or two blocks.
pub const DEFAULT_MIN_BUFFER_M: u32 = 120;
/// Largest hotspot half-size in meters.
pub const DEFAULT_MAX_BUFFER_M: u32 = 450;
/// Seed shared by subsampling and clustering.
pub const DEFAULT_SEED: u64 = 42;
/// Point sets larger than this are randomly subsampled before clustering.
pub const DEFAULT_SUBSAMPLE_CAP: usize = 250_000;
/// Number of independently seeded k-means runs; the lowest inertia wins.
pub const DEFAULT_RESTARTS: usize = 3;
/// Maximum Lloyd iterations per k-means run.
pub const DEFAULT_MAX_ITERATIONS: usize = 300;
/// Convergence tolerance relative to the mean variance of the coordinates.
pub const DEFAULT_TOLERANCE: f64 = 1.0e-4;

const_assert!(DEFAULT_MIN_BUFFER_M <= DEFAULT_MAX_BUFFER_M);
const_assert!(DEFAULT_K_DAY > 0);
const_assert!(DEFAULT_K_NIGHT > 0);
const_assert!(DEFAULT_SUBSAMPLE_CAP >= DEFAULT_K_DAY);
const_assert!(DEFAULT_SUBSAMPLE_CAP >= DEFAULT_K_NIGHT);
const_assert!(DEFAULT_RESTARTS > 0);

/// What to do when more clusters are requested than there are distinct points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterCountPolicy {
    /// Fail with [HotspotError::TooManyClusters].
    Strict,
    /// Lower the cluster count to the number of distinct points.
    Reduce,
}

#[derive(Debug, Clone)]
pub struct HotspotConfig {
    pub k_day: usize,
    pub k_night: usize,
    pub min_buffer_m: f64,
    pub max_buffer_m: f64,
    pub seed: u64,
    pub subsample_cap: usize,
    pub restarts: usize,
    pub max_iterations: usize,
    pub tolerance: f64,
    pub cluster_count_policy: ClusterCountPolicy,
}

impl Default for HotspotConfig {
    fn default() -> Self {
        HotspotConfig {
            k_day: DEFAULT_K_DAY,
            k_night: DEFAULT_K_NIGHT,
            min_buffer_m: DEFAULT_MIN_BUFFER_M as f64,
            max_buffer_m: DEFAULT_MAX_BUFFER_M as f64,
            seed: DEFAULT_SEED,
            subsample_cap: DEFAULT_SUBSAMPLE_CAP,
            restarts: DEFAULT_RESTARTS,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
            cluster_count_policy: ClusterCountPolicy::Strict,
        }
    }
}

impl HotspotConfig {
    /// The requested number of clusters for a temporal class.
    pub fn k_for(&self, class: TemporalClass) -> usize {
        match class {
            TemporalClass::Day => self.k_day,
            TemporalClass::Night => self.k_night,
        }
    }

    /// Sanity check values that may have come from the command line.
    pub fn validate(&self) -> HotspotResult<()> {
        if self.k_day == 0 {
            return Err(HotspotError::InvalidClusterCount { requested: 0 });
        }

        if self.k_night == 0 {
            return Err(HotspotError::InvalidClusterCount { requested: 0 });
        }

        if !(self.min_buffer_m > 0.0 && self.min_buffer_m <= self.max_buffer_m) {
            return Err(HotspotError::InvalidArgument(format!(
                "buffer range must satisfy 0 < min <= max: min={} max={}",
                self.min_buffer_m, self.max_buffer_m
            )));
        }

        if self.subsample_cap == 0 {
            return Err(HotspotError::InvalidArgument(
                "subsample cap must be positive".to_owned(),
            ));
        }

        if self.restarts == 0 || self.max_iterations == 0 {
            return Err(HotspotError::InvalidArgument(
                "restarts and max iterations must be positive".to_owned(),
            ));
        }

        if !(self.tolerance >= 0.0) {
            return Err(HotspotError::InvalidArgument(format!(
                "tolerance must be non-negative: {}",
                self.tolerance
            )));
        }

        Ok(())
    }
}

impl Display for HotspotConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        writeln!(f, "      Day clusters: {}", self.k_day)?;
        writeln!(f, "    Night clusters: {}", self.k_night)?;
        writeln!(
            f,
            "       Buffer (m): {} -> {}",
            self.min_buffer_m, self.max_buffer_m
        )?;
        writeln!(f, "              Seed: {}", self.seed)?;
        writeln!(f, "     Subsample cap: {}", self.subsample_cap)?;
        writeln!(f, "          Restarts: {}", self.restarts)?;
        writeln!(f, "    Max iterations: {}", self.max_iterations)?;
        writeln!(f, "         Tolerance: {:e}", self.tolerance)?;
        write!(f, "      Count policy: {:?}", self.cluster_count_policy)?;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HotspotConfig::default();

        assert_eq!(config.k_for(TemporalClass::Day), 50);
        assert_eq!(config.k_for(TemporalClass::Night), 50);
        assert_eq!(config.min_buffer_m, 120.0);
        assert_eq!(config.max_buffer_m, 450.0);
        assert_eq!(config.seed, 42);
        assert_eq!(config.subsample_cap, 250_000);
        assert_eq!(config.cluster_count_policy, ClusterCountPolicy::Strict);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_nonsense() {
        let config = HotspotConfig {
            k_night: 0,
            ..HotspotConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(HotspotError::InvalidClusterCount { requested: 0 })
        ));

        let config = HotspotConfig {
            min_buffer_m: 500.0,
            ..HotspotConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(HotspotError::InvalidArgument(_))
        ));

        let config = HotspotConfig {
            tolerance: f64::NAN,
            ..HotspotConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
