/*!
 * GeoJSON output.
 *
 * Each temporal class is written as its own `FeatureCollection` of `Polygon` features, which any
 * web map can load directly.
 */
use crate::{cluster::HotspotFeature, error::HotspotResult};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde::Serialize;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

#[derive(Debug, Serialize)]
struct HotspotProperties {
    center_lat: f64,
    center_lng: f64,
    count: usize,
    half_m: u32,
}

impl HotspotFeature {
    /// Convert into a GeoJSON polygon feature.
    pub fn to_geojson(&self) -> HotspotResult<Feature> {
        let props = HotspotProperties {
            center_lat: self.center.lat,
            center_lng: self.center.lon,
            count: self.count,
            half_m: self.half_m,
        };

        let properties: Option<JsonObject> = match serde_json::to_value(props)? {
            serde_json::Value::Object(map) => Some(map),
            _ => None,
        };

        let ring: Vec<Vec<f64>> = self.ring.iter().map(|vertex| vertex.to_vec()).collect();
        let geometry = Geometry::new(Value::Polygon(vec![ring]));

        Ok(Feature {
            bbox: None,
            geometry: Some(geometry),
            id: None,
            properties,
            foreign_members: None,
        })
    }
}

/// Collect hotspots into a GeoJSON feature collection, preserving their order.
pub fn feature_collection(features: &[HotspotFeature]) -> HotspotResult<FeatureCollection> {
    let features = features
        .iter()
        .map(HotspotFeature::to_geojson)
        .collect::<HotspotResult<Vec<_>>>()?;

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

/// Serialize hotspots as a feature collection into any writer.
pub fn write_feature_collection<W: Write>(
    mut output: W,
    features: &[HotspotFeature],
) -> HotspotResult<()> {
    let collection = feature_collection(features)?;
    serde_json::to_writer(&mut output, &collection)?;
    output.flush()?;
    Ok(())
}

/// Write hotspots to a GeoJSON file, replacing anything already there.
pub fn save_feature_collection<P: AsRef<Path>>(
    pth: P,
    features: &[HotspotFeature],
) -> HotspotResult<()> {
    let f = File::create(pth.as_ref())?;
    write_feature_collection(BufWriter::new(f), features)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geo::{square_ring, Coord};

    fn sample_feature() -> HotspotFeature {
        let center = Coord::new(34.05, -118.25);
        HotspotFeature {
            center,
            count: 17,
            half_m: 233,
            ring: square_ring(center, 233.7).unwrap(),
        }
    }

    #[test]
    fn test_feature_layout() {
        let feature = sample_feature();

        let mut buf: Vec<u8> = vec![];
        write_feature_collection(&mut buf, &[feature.clone()]).unwrap();

        let json: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(json["type"], "FeatureCollection");

        let features = json["features"].as_array().unwrap();
        assert_eq!(features.len(), 1);

        let props = &features[0]["properties"];
        assert!((props["center_lat"].as_f64().unwrap() - 34.05).abs() < 1.0e-12);
        assert!((props["center_lng"].as_f64().unwrap() + 118.25).abs() < 1.0e-12);
        assert_eq!(props["count"], 17);
        assert_eq!(props["half_m"], 233);

        let geometry = &features[0]["geometry"];
        assert_eq!(geometry["type"], "Polygon");

        let ring = geometry["coordinates"][0].as_array().unwrap();
        assert_eq!(ring.len(), 5);
        assert_eq!(ring[0], ring[4]);

        // Longitude comes first.
        assert!((ring[0][0].as_f64().unwrap() - feature.ring[0][0]).abs() < 1.0e-12);
        assert!((ring[0][1].as_f64().unwrap() - feature.ring[0][1]).abs() < 1.0e-12);
        assert!(ring[0][0].as_f64().unwrap() < -118.0);
    }

    #[test]
    fn test_empty_collection_is_well_formed() {
        let mut buf: Vec<u8> = vec![];
        write_feature_collection(&mut buf, &[]).unwrap();

        let json: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["features"].as_array().unwrap().len(), 0);
    }

    /// Accepts nothing, like a full disk.
    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "no space left"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "no space left"))
        }
    }

    #[test]
    fn test_write_errors_are_reported() {
        assert!(write_feature_collection(FullDisk, &[sample_feature()]).is_err());
        assert!(write_feature_collection(FullDisk, &[]).is_err());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_save_to_full_device_fails() {
        assert!(save_feature_collection("/dev/full", &[sample_feature()]).is_err());
    }
}
