/*!
 * Incident records and the point sets derived from them.
 *
 * An [EventRecord] is read once from the input table, classified as day or night, reduced to its
 * coordinates, and dropped. Only the [PointSet]s survive to be clustered.
 */
use crate::{
    error::{HotspotError, HotspotResult},
    geo::Coord,
    time_of_day::{TemporalClass, TimeOfDay},
};
use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord};
use std::{
    fmt::{self, Display},
    fs::File,
    io::Read,
    path::Path,
};

/// A single incident as read from the input table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventRecord {
    /// Occurrence date, if present and parsable.
    pub date: Option<NaiveDate>,
    /// Decoded time of day.
    pub time: TimeOfDay,
    /// Latitude in degrees, NaN if missing.
    pub lat: f64,
    /// Longitude in degrees, NaN if missing.
    pub lon: f64,
}

impl EventRecord {
    pub fn coord(&self) -> Coord {
        Coord::new(self.lat, self.lon)
    }

    pub fn class(&self) -> TemporalClass {
        self.time.class()
    }
}

/// The names of the columns to pull out of the input table.
#[derive(Debug, Clone)]
pub struct EventColumns {
    pub date: String,
    pub time: String,
    pub lat: String,
    pub lon: String,
}

impl Default for EventColumns {
    fn default() -> Self {
        EventColumns {
            date: "DATE OCC".to_owned(),
            time: "TIME OCC".to_owned(),
            lat: "LAT".to_owned(),
            lon: "LON".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ColumnIndices {
    date: Option<usize>,
    time: usize,
    lat: usize,
    lon: usize,
}

impl ColumnIndices {
    fn find(headers: &StringRecord, columns: &EventColumns) -> HotspotResult<Self> {
        let position = |name: &str| headers.iter().position(|h| h.trim() == name);
        let required = |name: &str| {
            position(name).ok_or_else(|| HotspotError::MissingColumn(name.to_owned()))
        };

        let date = position(&columns.date);
        if date.is_none() {
            log::warn!(
                "date column '{}' not found, occurrence dates unavailable",
                columns.date
            );
        }

        Ok(ColumnIndices {
            date,
            time: required(&columns.time)?,
            lat: required(&columns.lat)?,
            lon: required(&columns.lon)?,
        })
    }
}

/// Streams [EventRecord]s out of a CSV table with a header row.
pub struct EventReader<R: Read> {
    reader: csv::Reader<R>,
    indices: ColumnIndices,
    record: StringRecord,
}

impl EventReader<File> {
    /// Open a CSV file for reading.
    pub fn open<P: AsRef<Path>>(pth: P, columns: &EventColumns) -> HotspotResult<Self> {
        let f = File::open(pth.as_ref())?;
        Self::from_reader(f, columns)
    }
}

impl<R: Read> EventReader<R> {
    /// Wrap any reader producing CSV text.
    pub fn from_reader(rdr: R, columns: &EventColumns) -> HotspotResult<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(rdr);

        let indices = ColumnIndices::find(reader.headers()?, columns)?;

        Ok(EventReader {
            reader,
            indices,
            record: StringRecord::new(),
        })
    }

    fn current(&self) -> EventRecord {
        let field = |idx: usize| self.record.get(idx).unwrap_or("");

        let date = self.indices.date.and_then(|idx| parse_date(field(idx)));
        let time = TimeOfDay::from_code(field(self.indices.time));
        let lat = parse_coordinate(field(self.indices.lat));
        let lon = parse_coordinate(field(self.indices.lon));

        EventRecord {
            date,
            time,
            lat,
            lon,
        }
    }
}

impl<R: Read> Iterator for EventReader<R> {
    type Item = HotspotResult<EventRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_record(&mut self.record) {
            Ok(true) => Some(Ok(self.current())),
            Ok(false) => None,
            Err(err) => Some(Err(err.into())),
        }
    }
}

fn parse_coordinate(val: &str) -> f64 {
    val.trim().parse().unwrap_or(f64::NAN)
}

/// Parse an occurrence date in any of the formats commonly found in incident exports.
pub fn parse_date(val: &str) -> Option<NaiveDate> {
    const DATETIME_FORMATS: [&str; 3] = [
        "%m/%d/%Y %I:%M:%S %p",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];
    const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

    let val = val.trim();
    if val.is_empty() {
        return None;
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(val, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(val, fmt).ok())
        })
}

/// An optional window of occurrence dates, start inclusive and end exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateWindow {
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Records without a date only pass an unbounded window.
    pub fn contains(&self, date: Option<NaiveDate>) -> bool {
        if self.is_unbounded() {
            return true;
        }

        match date {
            Some(date) => {
                self.start.map_or(true, |start| date >= start)
                    && self.end.map_or(true, |end| date < end)
            }
            None => false,
        }
    }
}

/// An ordered collection of valid coordinates belonging to one temporal class.
#[derive(Debug, Clone, PartialEq)]
pub struct PointSet {
    class: TemporalClass,
    points: Vec<Coord>,
}

impl PointSet {
    pub fn new(class: TemporalClass) -> Self {
        PointSet {
            class,
            points: vec![],
        }
    }

    /// Build a point set, silently skipping coordinates out of range.
    pub fn from_coords<I: IntoIterator<Item = Coord>>(class: TemporalClass, coords: I) -> Self {
        let mut set = Self::new(class);
        for coord in coords {
            set.push(coord);
        }
        set
    }

    /// Add a point, returning false (and keeping nothing) if it is out of range.
    pub fn push(&mut self, coord: Coord) -> bool {
        if coord.is_valid() {
            self.points.push(coord);
            true
        } else {
            false
        }
    }

    pub fn class(&self) -> TemporalClass {
        self.class
    }

    pub fn points(&self) -> &[Coord] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Bookkeeping about what happened to the input rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub rows: usize,
    pub rejected_coords: usize,
    pub outside_window: usize,
    pub unknown_time: usize,
    pub day: usize,
    pub night: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

impl Display for LoadStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(
            f,
            "rows={} rejected_coords={} outside_window={} unknown_time={} day={} night={}",
            self.rows,
            self.rejected_coords,
            self.outside_window,
            self.unknown_time,
            self.day,
            self.night
        )?;

        if let (Some(first), Some(last)) = (self.first_date, self.last_date) {
            write!(f, " dates={}..={}", first, last)?;
        }

        Ok(())
    }
}

/// The result of splitting the input into day and night.
#[derive(Debug, Clone)]
pub struct ClassifiedPoints {
    pub day: PointSet,
    pub night: PointSet,
    pub stats: LoadStats,
}

impl ClassifiedPoints {
    /// Split records into day and night point sets.
    ///
    /// Records with missing or out of range coordinates, or outside the date window, are
    /// dropped before classification.
    pub fn split<I>(records: I, window: DateWindow) -> HotspotResult<Self>
    where
        I: IntoIterator<Item = HotspotResult<EventRecord>>,
    {
        let mut day = PointSet::new(TemporalClass::Day);
        let mut night = PointSet::new(TemporalClass::Night);
        let mut stats = LoadStats::default();

        for record in records {
            let record = record?;
            stats.rows += 1;

            let coord = record.coord();
            if !coord.is_valid() {
                stats.rejected_coords += 1;
                continue;
            }

            if !window.contains(record.date) {
                stats.outside_window += 1;
                continue;
            }

            if let Some(date) = record.date {
                stats.first_date = Some(stats.first_date.map_or(date, |d| d.min(date)));
                stats.last_date = Some(stats.last_date.map_or(date, |d| d.max(date)));
            }

            if record.time == TimeOfDay::Unknown {
                stats.unknown_time += 1;
            }

            match record.class() {
                TemporalClass::Day => {
                    day.push(coord);
                    stats.day += 1;
                }
                TemporalClass::Night => {
                    night.push(coord);
                    stats.night += 1;
                }
            }
        }

        if stats.rejected_coords > 0 {
            log::warn!(
                "dropped {} of {} rows with missing or out of range coordinates",
                stats.rejected_coords,
                stats.rows
            );
        }

        if stats.unknown_time > 0 {
            log::debug!(
                "{} rows had an unreadable time and were counted as day",
                stats.unknown_time
            );
        }

        Ok(ClassifiedPoints { day, night, stats })
    }

    /// Get the point set for a class.
    pub fn get(&self, class: TemporalClass) -> &PointSet {
        match class {
            TemporalClass::Day => &self.day,
            TemporalClass::Night => &self.night,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SAMPLE: &str = "\
DR_NO,DATE OCC,TIME OCC,AREA,LAT,LON
1,01/08/2020 12:00:00 AM,2230,3,34.0141,-118.2978
2,01/01/2020 12:00:00 AM,330,1,34.0459,-118.2545
3,02/13/2020 12:00:00 AM,1200,1,34.0448,-118.2474
4,01/01/2020 12:00:00 AM,1730,15,0.0,0.0
5,01/01/2020 12:00:00 AM,,15,34.2,-118.5
6,not a date,0500,7,95.0,-118.3
7,01/01/2020 12:00:00 AM,2100,7,,
";

    fn read_sample() -> Vec<EventRecord> {
        EventReader::from_reader(SAMPLE.as_bytes(), &EventColumns::default())
            .unwrap()
            .collect::<HotspotResult<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_reader_extracts_columns() {
        let records = read_sample();
        assert_eq!(records.len(), 7);

        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2020, 1, 8));
        assert_eq!(records[0].time, TimeOfDay::Hour(22));
        assert_eq!(records[0].lat, 34.0141);
        assert_eq!(records[0].lon, -118.2978);

        assert_eq!(records[1].time, TimeOfDay::Hour(3));
        assert_eq!(records[4].time, TimeOfDay::Unknown);
        assert_eq!(records[5].date, None);
        assert!(records[6].lat.is_nan());
        assert!(records[6].lon.is_nan());
    }

    #[test]
    fn test_reader_missing_column() {
        let res = EventReader::from_reader("a,b,LAT\n1,2,3\n".as_bytes(), &EventColumns::default());
        assert!(matches!(res, Err(HotspotError::MissingColumn(name)) if name == "TIME OCC"));
    }

    #[test]
    fn test_split_day_night() {
        let records = read_sample().into_iter().map(Ok);
        let split = ClassifiedPoints::split(records, DateWindow::default()).unwrap();

        // Row 6 is out of range and row 7 has no coordinates.
        assert_eq!(split.stats.rows, 7);
        assert_eq!(split.stats.rejected_coords, 2);

        assert_eq!(split.night.len(), 2);
        assert_eq!(split.day.len(), 3);
        assert_eq!(split.stats.unknown_time, 1);
        assert_eq!(split.night.class(), TemporalClass::Night);
        assert_eq!(split.get(TemporalClass::Day).len(), 3);

        assert_eq!(split.night.points()[0], Coord::new(34.0141, -118.2978));

        assert_eq!(split.stats.first_date, NaiveDate::from_ymd_opt(2020, 1, 1));
        assert_eq!(split.stats.last_date, NaiveDate::from_ymd_opt(2020, 2, 13));
    }

    #[test]
    fn test_split_date_window() {
        let window = DateWindow {
            start: NaiveDate::from_ymd_opt(2020, 1, 2),
            end: NaiveDate::from_ymd_opt(2020, 2, 1),
        };

        let records = read_sample().into_iter().map(Ok);
        let split = ClassifiedPoints::split(records, window).unwrap();

        assert_eq!(split.night.len(), 1);
        assert_eq!(split.day.len(), 0);
        assert_eq!(split.stats.outside_window, 4);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2021, 3, 4);
        assert_eq!(parse_date("03/04/2021 12:00:00 AM"), expected);
        assert_eq!(parse_date("2021-03-04"), expected);
        assert_eq!(parse_date("03/04/2021"), expected);
        assert_eq!(parse_date("2021-03-04T10:15:00.000"), expected);
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("yesterday"), None);
    }

    #[test]
    fn test_point_set_rejects_out_of_range() {
        let mut set = PointSet::new(TemporalClass::Day);
        assert!(set.push(Coord::new(34.0, -118.0)));
        assert!(!set.push(Coord::new(-91.0, 0.0)));
        assert!(!set.push(Coord::new(0.0, 181.0)));
        assert_eq!(set.len(), 1);
    }
}
