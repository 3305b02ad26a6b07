//! Very simple functions for producing KML renditions of hotspots.
//!
//! This is not a general solution at all. It only implements the parts of KML needed to draw
//! styled hotspot squares, with a streaming type API. That means the user is responsible for
//! closing all tags.

use crate::{cluster::HotspotFeature, error::HotspotResult, time_of_day::TemporalClass};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

pub struct KmlFile {
    output: BufWriter<File>,
    finished: bool,
}

impl KmlFile {
    pub fn new<P: AsRef<Path>>(pth: P) -> HotspotResult<Self> {
        let p = pth.as_ref();

        let f = std::fs::File::create(p)?;
        let mut new = KmlFile {
            output: BufWriter::new(f),
            finished: false,
        };
        new.start_document()?;
        Ok(new)
    }

    /// Close the document and flush everything to disk.
    pub fn finish(mut self) -> HotspotResult<()> {
        self.finished = true;
        self.finish_document()?;
        self.output.flush()?;
        Ok(())
    }
}

impl KmlWriter for KmlFile {
    fn output(&mut self) -> &mut dyn Write {
        &mut self.output
    }
}

impl Drop for KmlFile {
    fn drop(&mut self) {
        // Only reached without a call to finish(), e.g. on an early error return.
        if !self.finished {
            let _ = self.finish_document();
            let _ = self.output.flush();
        }
    }
}

/// KML color (aabbggrr) used to fill the hotspots of each class.
fn class_color(class: TemporalClass) -> &'static str {
    match class {
        TemporalClass::Day => "7f00aaff",
        TemporalClass::Night => "7fff3333",
    }
}

pub trait KmlWriter {
    fn output(&mut self) -> &mut dyn Write;

    /// Start by putting the header out.
    fn start_document(&mut self) -> HotspotResult<()> {
        const HEADER: &str = concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            "\n",
            r#"<kml xmlns="http://www.opengis.net/kml/2.2">"#,
            "\n",
            "<Document>\n"
        );

        self.output().write_all(HEADER.as_bytes())?;

        Ok(())
    }

    /// Close a document.
    fn finish_document(&mut self) -> HotspotResult<()> {
        const FOOTER: &str = concat!(r#"</Document>"#, "\n", r#"</kml>"#, "\n");
        self.output().write_all(FOOTER.as_bytes())?;
        Ok(())
    }

    /// Write a description element to the file.
    fn write_description(&mut self, description: &str) -> HotspotResult<()> {
        writeln!(
            self.output(),
            "<description><![CDATA[{}]]></description>",
            description
        )?;
        Ok(())
    }

    /// Start a KML folder.
    fn start_folder(&mut self, name: &str, description: &str) -> HotspotResult<()> {
        self.output().write_all("<Folder>\n".as_bytes())?;
        writeln!(self.output(), "<name>{}</name>", name)?;
        self.write_description(description)
    }

    /// Close out a folder element
    fn finish_folder(&mut self) -> HotspotResult<()> {
        writeln!(self.output(), "</Folder>")?;
        Ok(())
    }

    /// Start a placemark element.
    fn start_placemark(
        &mut self,
        name: &str,
        description: &str,
        style_url: &str,
    ) -> HotspotResult<()> {
        writeln!(self.output(), "<Placemark>")?;
        writeln!(self.output(), "<name>{}</name>", name)?;
        self.write_description(description)?;
        writeln!(self.output(), "<styleUrl>{}</styleUrl>", style_url)?;
        Ok(())
    }

    /// Close out a placemark element.
    fn finish_placemark(&mut self) -> HotspotResult<()> {
        writeln!(self.output(), "</Placemark>")?;
        Ok(())
    }

    /// Start a style definition.
    fn start_style(&mut self, style_id: &str) -> HotspotResult<()> {
        writeln!(self.output(), "<Style id=\"{}\">", style_id)?;
        Ok(())
    }

    /// Close out a style definition.
    fn finish_style(&mut self) -> HotspotResult<()> {
        writeln!(self.output(), "</Style>")?;
        Ok(())
    }

    /// Create a filled and outlined PolyStyle element.
    ///
    /// These should ONLY go inside a style element. The color is in KML's aabbggrr order.
    fn create_poly_style(&mut self, color: &str) -> HotspotResult<()> {
        writeln!(self.output(), "<PolyStyle>")?;
        writeln!(self.output(), "<color>{}</color>", color)?;
        writeln!(self.output(), "<colorMode>normal</colorMode>")?;
        writeln!(self.output(), "<fill>1</fill>")?;
        writeln!(self.output(), "<outline>1</outline>")?;
        writeln!(self.output(), "</PolyStyle>")?;
        Ok(())
    }

    /// Start a Polygon element draped over the terrain.
    fn start_polygon(&mut self) -> HotspotResult<()> {
        self.output()
            .write_all("<Polygon>\n<tessellate>1</tessellate>\n".as_bytes())?;
        Ok(())
    }

    /// Close out a Polygon element.
    fn finish_polygon(&mut self) -> HotspotResult<()> {
        self.output().write_all("</Polygon>\n".as_bytes())?;
        Ok(())
    }

    /// Start the polygon outer ring.
    ///
    /// This should only be used inside a Polygon element.
    fn polygon_start_outer_ring(&mut self) -> HotspotResult<()> {
        self.output().write_all("<outerBoundaryIs>\n".as_bytes())?;
        Ok(())
    }

    /// End the polygon outer ring.
    fn polygon_finish_outer_ring(&mut self) -> HotspotResult<()> {
        self.output().write_all("</outerBoundaryIs>\n".as_bytes())?;
        Ok(())
    }

    /// Start a LinearRing.
    fn start_linear_ring(&mut self) -> HotspotResult<()> {
        self.output()
            .write_all("<LinearRing>\n<coordinates>\n".as_bytes())?;
        Ok(())
    }

    /// End a LinearRing.
    fn finish_linear_ring(&mut self) -> HotspotResult<()> {
        self.output()
            .write_all("</coordinates>\n</LinearRing>\n".as_bytes())?;
        Ok(())
    }

    /// Add a vertex to the LinearRing
    ///
    /// Must be used inside a linear ring element.
    fn linear_ring_add_vertex(&mut self, lat: f64, lon: f64) -> HotspotResult<()> {
        writeln!(self.output(), "{},{},0", lon, lat)?;
        Ok(())
    }

    /// Write a folder with one styled polygon placemark per hotspot.
    fn write_hotspots(
        &mut self,
        class: TemporalClass,
        features: &[HotspotFeature],
    ) -> HotspotResult<()> {
        let class_name: &'static str = class.into();
        let style_id = format!("{}_hotspot", class_name);
        let style_url = format!("#{}", style_id);

        self.start_style(&style_id)?;
        self.create_poly_style(class_color(class))?;
        self.finish_style()?;

        let folder_name = format!("{} hotspots", class_name);
        let folder_description = format!("{} hotspots", features.len());
        self.start_folder(&folder_name, &folder_description)?;

        for (i, feature) in features.iter().enumerate() {
            let name = format!("{} {}", class_name, i + 1);
            let description = format!(
                concat!(
                    "<h3>Incidents: {}</h3>",
                    "<h3>Half size: {} m</h3>",
                    "<h3>Center: {:.6}, {:.6}</h3>"
                ),
                feature.count, feature.half_m, feature.center.lat, feature.center.lon
            );

            self.start_placemark(&name, &description, &style_url)?;
            self.start_polygon()?;
            self.polygon_start_outer_ring()?;
            self.start_linear_ring()?;
            for &[lon, lat] in &feature.ring {
                self.linear_ring_add_vertex(lat, lon)?;
            }
            self.finish_linear_ring()?;
            self.polygon_finish_outer_ring()?;
            self.finish_polygon()?;
            self.finish_placemark()?;
        }

        self.finish_folder()?;

        Ok(())
    }
}

/// Write the hotspots of one class to a KML file.
pub fn save_kml<P: AsRef<Path>>(
    pth: P,
    class: TemporalClass,
    features: &[HotspotFeature],
) -> HotspotResult<()> {
    let mut kml = KmlFile::new(pth)?;
    kml.write_hotspots(class, features)?;
    kml.finish()
}
