/*!
 * The whole batch job: load incidents, split them into day and night, cluster each class, and
 * write the results.
 *
 * The day and night runs share nothing but read only inputs, so each gets its own thread.
 */
use crate::{
    cluster::{HotspotClusterer, HotspotFeature},
    config::HotspotConfig,
    error::{HotspotError, HotspotResult},
    event::{ClassifiedPoints, DateWindow, EventColumns, EventReader, LoadStats},
    feature_collection::save_feature_collection,
    kml::save_kml,
    time_of_day::TemporalClass,
};
use crossbeam_channel::bounded;
use std::{
    path::{Path, PathBuf},
    thread,
};
use strum::IntoEnumIterator;

/// Hotspots for both temporal classes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hotspots {
    pub day: Vec<HotspotFeature>,
    pub night: Vec<HotspotFeature>,
}

impl Hotspots {
    pub fn get(&self, class: TemporalClass) -> &[HotspotFeature] {
        match class {
            TemporalClass::Day => &self.day,
            TemporalClass::Night => &self.night,
        }
    }

    fn set(&mut self, class: TemporalClass, features: Vec<HotspotFeature>) {
        match class {
            TemporalClass::Day => self.day = features,
            TemporalClass::Night => self.night = features,
        }
    }
}

/// Where to put the results of a run.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub day: PathBuf,
    pub night: PathBuf,
    /// Also write a KML file next to each GeoJSON file.
    pub kml: bool,
}

impl OutputPaths {
    /// Use the standard file names inside a directory.
    pub fn in_dir<P: AsRef<Path>>(dir: P, kml: bool) -> Self {
        let dir = dir.as_ref();
        OutputPaths {
            day: dir.join("hotspots_day_ml.geojson"),
            night: dir.join("hotspots_night_ml.geojson"),
            kml,
        }
    }

    pub fn geojson(&self, class: TemporalClass) -> &Path {
        match class {
            TemporalClass::Day => &self.day,
            TemporalClass::Night => &self.night,
        }
    }

    /// The KML file for a class, if KML output was requested.
    pub fn kml(&self, class: TemporalClass) -> Option<PathBuf> {
        if self.kml {
            Some(self.geojson(class).with_extension("kml"))
        } else {
            None
        }
    }
}

/// What a run did.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub stats: LoadStats,
    pub day_features: usize,
    pub night_features: usize,
}

/**
 * Cluster the day and night point sets concurrently.
 *
 * Both runs use the same configuration and seed. An error in either run is reported, the first
 * class (day before night) taking precedence if both fail.
 */
pub fn build_hotspots(
    points: &ClassifiedPoints,
    config: &HotspotConfig,
) -> HotspotResult<Hotspots> {
    config.validate()?;

    let (to_collector, from_workers) = bounded(2);

    let mut results = thread::scope(|scope| -> HotspotResult<Vec<_>> {
        let mut handles = vec![];

        for class in TemporalClass::iter() {
            let to_collector = to_collector.clone();
            let point_set = points.get(class);
            let k = config.k_for(class);
            let name = format!("hotspots-{}", class);

            let jh = thread::Builder::new()
                .name(name.clone())
                .spawn_scoped(scope, move || {
                    let res = HotspotClusterer::new(config)
                        .and_then(|clusterer| clusterer.hotspots(point_set, k));

                    // The collector outlives the workers.
                    let _ = to_collector.send((class, res));
                })?;

            handles.push((name, jh));
        }

        drop(to_collector);
        let results: Vec<_> = from_workers.iter().collect();

        for (name, jh) in handles {
            jh.join().map_err(|_| HotspotError::WorkerPanicked(name))?;
        }

        Ok(results)
    })?;

    results.sort_by_key(|(class, _)| *class as u8);

    let mut hotspots = Hotspots::default();
    for (class, res) in results {
        match res {
            Ok(features) => hotspots.set(class, features),
            Err(err) => {
                log::error!("{} clustering failed: {}", class, err);
                return Err(err);
            }
        }
    }

    Ok(hotspots)
}

/// Write the GeoJSON (and optionally KML) files for both classes.
pub fn write_hotspots(hotspots: &Hotspots, outputs: &OutputPaths) -> HotspotResult<()> {
    for class in TemporalClass::iter() {
        let features = hotspots.get(class);

        let path = outputs.geojson(class);
        save_feature_collection(path, features)?;
        log::info!("wrote {} {} hotspots to {}", features.len(), class, path.display());

        if let Some(kml_path) = outputs.kml(class) {
            save_kml(&kml_path, class, features)?;
            log::info!("wrote {}", kml_path.display());
        }
    }

    Ok(())
}

/// Load, classify, cluster, and write in one go.
pub fn run<P: AsRef<Path>>(
    input: P,
    columns: &EventColumns,
    window: DateWindow,
    config: &HotspotConfig,
    outputs: &OutputPaths,
) -> HotspotResult<RunSummary> {
    let input = input.as_ref();
    log::info!("loading incidents from {}", input.display());

    let reader = EventReader::open(input, columns)?;
    let points = ClassifiedPoints::split(reader, window)?;
    log::info!("loaded: {}", points.stats);

    let hotspots = build_hotspots(&points, config)?;
    write_hotspots(&hotspots, outputs)?;

    Ok(RunSummary {
        stats: points.stats,
        day_features: hotspots.day.len(),
        night_features: hotspots.night.len(),
    })
}
