//! Per-measure time series tables.
//!
//! The engine reports every measure as a table of
//! `time, mean, standard_deviation, confidence_interval` rows, one CSV file
//! per measure named after it. Files are written without a header; a header
//! row starting with `time` is tolerated when present.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use color_eyre::eyre::{eyre, Context, Result};
use serde::{Deserialize, Serialize};

/// Header accepted as the first row of a series file
pub const SERIES_HEADER: &str = "time,mean,standard_deviation,confidence_interval";

/// One sample of a measure across all replicas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub time: f64,
    pub mean: f64,
    pub standard_deviation: f64,
    pub confidence_interval: f64,
}

/// Time series keyed by measure name
pub type MeasureSeries = BTreeMap<String, Vec<TimeSeriesPoint>>;

/// Parse the rows of one series file
pub fn parse_series_csv(text: &str) -> Result<Vec<TimeSeriesPoint>> {
    let mut points = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || (index == 0 && line.starts_with("time")) {
            continue;
        }

        let fields = line
            .split(',')
            .map(|field| field.trim().parse::<f64>())
            .collect::<Result<Vec<f64>, _>>()
            .with_context(|| format!("Non-numeric value on line {}: '{}'", index + 1, line))?;

        match fields.as_slice() {
            [time, mean, standard_deviation, confidence_interval] => points.push(TimeSeriesPoint {
                time: *time,
                mean: *mean,
                standard_deviation: *standard_deviation,
                confidence_interval: *confidence_interval,
            }),
            _ => {
                return Err(eyre!(
                    "Expected 4 columns on line {}, found {}",
                    index + 1,
                    fields.len()
                ))
            }
        }
    }

    Ok(points)
}

/// Render a series as CSV with the standard header
pub fn format_series_csv(points: &[TimeSeriesPoint]) -> String {
    let mut output = String::from(SERIES_HEADER);
    output.push('\n');
    for point in points {
        output.push_str(&format!(
            "{},{},{},{}\n",
            point.time, point.mean, point.standard_deviation, point.confidence_interval
        ));
    }
    output
}

/// Load every `*.csv` file of a result directory, keyed by file stem
pub fn load_result_directory(dir: &Path) -> Result<MeasureSeries> {
    let mut series = MeasureSeries::new();

    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read result directory {}", dir.display()))?;

    for entry in entries {
        let path = entry?.path();
        if !path.is_file() || path.extension().map_or(true, |ext| ext != "csv") {
            continue;
        }
        let Some(measure) = path.file_stem().map(|stem| stem.to_string_lossy().into_owned()) else {
            continue;
        };

        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let points = parse_series_csv(&text)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        log::debug!("Loaded {} samples for {}", points.len(), measure);
        series.insert(measure, points);
    }

    Ok(series)
}

/// Group measure names by their two-character prefix (`%N`, `#C`, ...)
///
/// Groups and the names inside them come out sorted. Duplicate names are kept.
///
/// # Examples
/// ```
/// use popsim::results::group_by_family;
///
/// let groups = group_by_family(["#N[a]", "%N[b]", "%N[a]"]);
/// assert_eq!(groups["%N"], vec!["%N[a]", "%N[b]"]);
/// assert_eq!(groups["#N"], vec!["#N[a]"]);
/// ```
pub fn group_by_family<I, S>(names: I) -> BTreeMap<String, Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for name in names {
        let name = name.as_ref();
        let prefix: String = name.chars().take(2).collect();
        groups.entry(prefix).or_default().push(name.to_string());
    }

    for members in groups.values_mut() {
        members.sort();
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_headerless_series() {
        let points = parse_series_csv("0.0,1.0,0.1,0.05\n1.0,0.8,0.2,0.1\n").unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[1].time, 1.0);
        assert_eq!(points[1].mean, 0.8);
        assert_eq!(points[1].standard_deviation, 0.2);
        assert_eq!(points[1].confidence_interval, 0.1);
    }

    #[test]
    fn test_parse_series_with_header() {
        let text = format!("{}\n0,5,0,0\n", SERIES_HEADER);
        let points = parse_series_csv(&text).unwrap();

        assert_eq!(points, vec![TimeSeriesPoint {
            time: 0.0,
            mean: 5.0,
            standard_deviation: 0.0,
            confidence_interval: 0.0,
        }]);
    }

    #[test]
    fn test_parse_series_rejects_bad_rows() {
        assert!(parse_series_csv("0,1,2\n").is_err());
        assert!(parse_series_csv("0,1,x,3\n").is_err());
    }

    #[test]
    fn test_format_then_parse_preserves_points() {
        let points = vec![TimeSeriesPoint {
            time: 2.5,
            mean: 0.25,
            standard_deviation: 0.5,
            confidence_interval: 0.125,
        }];

        assert_eq!(parse_series_csv(&format_series_csv(&points)).unwrap(), points);
    }

    #[test]
    fn test_load_result_directory() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("%N[a].csv"), "0,1,0,0\n1,0.5,0.1,0.1\n").unwrap();
        fs::write(dir.path().join("#C[a,b].csv"), "0,2,0,0\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::create_dir(dir.path().join("plot")).unwrap();

        let series = load_result_directory(dir.path()).unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series["%N[a]"].len(), 2);
        assert_eq!(series["#C[a,b]"][0].mean, 2.0);
    }

    #[test]
    fn test_load_missing_directory() {
        assert!(load_result_directory(Path::new("/nonexistent/results")).is_err());
    }

    #[test]
    fn test_group_by_family() {
        let groups = group_by_family(vec!["%C[b,a]", "%C[a,b]", "#L[x]", "%F[a,b]", "%C[a,b]"]);

        assert_eq!(groups.keys().collect::<Vec<_>>(), vec!["#L", "%C", "%F"]);
        assert_eq!(groups["%C"], vec!["%C[a,b]", "%C[a,b]", "%C[b,a]"]);
    }
}
