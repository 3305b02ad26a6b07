use chrono::NaiveDate;
use clap::Parser;
use hotspots::{
    ClusterCountPolicy, DateWindow, EventColumns, HotspotConfig, OutputPaths, DEFAULT_K_DAY,
    DEFAULT_K_NIGHT, DEFAULT_MAX_BUFFER_M, DEFAULT_MAX_ITERATIONS, DEFAULT_MIN_BUFFER_M,
    DEFAULT_RESTARTS, DEFAULT_SEED, DEFAULT_SUBSAMPLE_CAP,
};
use log::{info, LevelFilter};
use simple_logger::SimpleLogger;
use std::{
    error::Error,
    fmt::{self, Display},
    path::PathBuf,
};

/*-------------------------------------------------------------------------------------------------
 *                               Parse Command Line Arguments
 *-----------------------------------------------------------------------------------------------*/
///
/// Build day and night crime hotspots.
///
/// This program clusters geolocated incidents into day (05:00 - 20:59) and night
/// (21:00 - 04:59) hotspots and writes each set as a GeoJSON feature collection of squares.
///
#[derive(Debug, Parser)]
#[clap(bin_name = "buildhotspots")]
#[clap(author, version, about)]
struct BuildHotspotsOptionsInit {
    /// The path to the incident CSV file.
    ///
    /// If this is not specified, then the program will check for it in the "HOTSPOTS_CSV"
    /// environment variable.
    #[clap(short, long)]
    #[clap(env = "HOTSPOTS_CSV")]
    input: PathBuf,

    /// Directory to write hotspots_day_ml.geojson and hotspots_night_ml.geojson into.
    #[clap(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Also write a KML file next to each GeoJSON file.
    #[clap(long)]
    kml: bool,

    /// Number of day hotspots.
    #[clap(long, default_value_t = DEFAULT_K_DAY)]
    k_day: usize,

    /// Number of night hotspots.
    #[clap(long, default_value_t = DEFAULT_K_NIGHT)]
    k_night: usize,

    /// Smallest hotspot half-size in meters.
    #[clap(long, default_value_t = DEFAULT_MIN_BUFFER_M)]
    min_buffer: u32,

    /// Largest hotspot half-size in meters.
    #[clap(long, default_value_t = DEFAULT_MAX_BUFFER_M)]
    max_buffer: u32,

    /// Random seed for subsampling and clustering.
    #[clap(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Point sets larger than this are randomly subsampled before clustering.
    #[clap(long, default_value_t = DEFAULT_SUBSAMPLE_CAP)]
    subsample_cap: usize,

    /// Number of k-means restarts, the best is kept.
    #[clap(long, default_value_t = DEFAULT_RESTARTS)]
    restarts: usize,

    /// Maximum number of k-means iterations per restart.
    #[clap(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    max_iterations: usize,

    /// Reduce the number of hotspots instead of failing when there are too few distinct points.
    #[clap(long)]
    reduce_k: bool,

    /// Only use incidents that occurred on or after this date (YYYY-MM-DD).
    #[clap(long, parse(try_from_str=parse_date_arg))]
    start: Option<NaiveDate>,

    /// Only use incidents that occurred before this date (YYYY-MM-DD).
    #[clap(long, parse(try_from_str=parse_date_arg))]
    end: Option<NaiveDate>,

    /// Name of the occurrence date column.
    #[clap(long, default_value = "DATE OCC")]
    date_col: String,

    /// Name of the 24 hour HHMM time column.
    #[clap(long, default_value = "TIME OCC")]
    time_col: String,

    /// Name of the latitude column.
    #[clap(long, default_value = "LAT")]
    lat_col: String,

    /// Name of the longitude column.
    #[clap(long, default_value = "LON")]
    lon_col: String,

    /// Verbose output
    #[clap(short, long)]
    verbose: bool,
}

/// Parse a command line date
fn parse_date_arg(date_str: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
}

#[derive(Debug)]
struct BuildHotspotsOptionsChecked {
    /// The path to the incident CSV file.
    input: PathBuf,

    /// Where to write the results.
    outputs: OutputPaths,

    /// Columns to read.
    columns: EventColumns,

    /// Occurrence date window.
    window: DateWindow,

    /// Clustering configuration.
    config: HotspotConfig,

    /// Verbose output
    verbose: bool,
}

impl Display for BuildHotspotsOptionsChecked {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        writeln!(f, "\n")?; // yes, two blank lines.
        writeln!(f, "             Input: {}", self.input.display())?;
        writeln!(f, "        Day output: {}", self.outputs.day.display())?;
        writeln!(f, "      Night output: {}", self.outputs.night.display())?;
        writeln!(f, "               KML: {}", self.outputs.kml)?;
        writeln!(
            f,
            "           Columns: {:?} {:?} {:?} {:?}",
            self.columns.date, self.columns.time, self.columns.lat, self.columns.lon
        )?;
        match (self.window.start, self.window.end) {
            (None, None) => writeln!(f, "             Dates: all")?,
            (start, end) => writeln!(f, "             Dates: {:?} -> {:?}", start, end)?,
        }
        writeln!(f, "{}", self.config)?;
        writeln!(f, "\n")?; // yes, two blank lines.

        Ok(())
    }
}

/// Get the command line arguments and check them.
fn parse_args() -> Result<BuildHotspotsOptionsChecked, Box<dyn Error>> {
    let BuildHotspotsOptionsInit {
        input,
        output_dir,
        kml,
        k_day,
        k_night,
        min_buffer,
        max_buffer,
        seed,
        subsample_cap,
        restarts,
        max_iterations,
        reduce_k,
        start,
        end,
        date_col,
        time_col,
        lat_col,
        lon_col,
        verbose,
    } = BuildHotspotsOptionsInit::parse();

    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err(format!("start date {} must be before end date {}", start, end).into());
        }
    }

    let cluster_count_policy = if reduce_k {
        ClusterCountPolicy::Reduce
    } else {
        ClusterCountPolicy::Strict
    };

    let config = HotspotConfig {
        k_day,
        k_night,
        min_buffer_m: min_buffer as f64,
        max_buffer_m: max_buffer as f64,
        seed,
        subsample_cap,
        restarts,
        max_iterations,
        cluster_count_policy,
        ..HotspotConfig::default()
    };
    config.validate()?;

    let checked = BuildHotspotsOptionsChecked {
        input,
        outputs: OutputPaths::in_dir(output_dir, kml),
        columns: EventColumns {
            date: date_col,
            time: time_col,
            lat: lat_col,
            lon: lon_col,
        },
        window: DateWindow { start, end },
        config,
        verbose,
    };

    Ok(checked)
}

/*-------------------------------------------------------------------------------------------------
 *                                             MAIN
 *-----------------------------------------------------------------------------------------------*/
fn main() -> Result<(), Box<dyn Error>> {
    let opts = parse_args()?;

    let module_level = if opts.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .with_module_level("hotspots", module_level)
        .init()?;

    if opts.verbose {
        info!("{}", opts);
    }

    let summary = hotspots::run(
        &opts.input,
        &opts.columns,
        opts.window,
        &opts.config,
        &opts.outputs,
    )?;

    info!("");
    info!("Hotspots written:");
    info!("     incidents - {:>10}", summary.stats.rows);
    info!("      rejected - {:>10}", summary.stats.rejected_coords);
    info!("   day points  - {:>10}", summary.stats.day);
    info!("  night points - {:>10}", summary.stats.night);
    info!("  day hotspots - {:>10}", summary.day_features);
    info!("night hotspots - {:>10}", summary.night_features);
    info!("");

    Ok(())
}
