//! Recorded run data.

use std::io::Write;

use serde::Serialize;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub time_s: f64,
    pub frame: u64,
    /// One value per recorded path, in path order.
    pub values: Vec<f64>,
}

/// Time series of bus values sampled during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSeries {
    pub paths: Vec<String>,
    pub samples: Vec<Sample>,
}

/// Summary of a run's time range and data.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub time_range: (f64, f64),
    pub sample_count: usize,
    pub path_count: usize,
}

impl RunSeries {
    pub fn new(paths: Vec<String>) -> Self {
        Self {
            paths,
            samples: Vec::new(),
        }
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn summary(&self) -> AppResult<RunSummary> {
        let (Some(first), Some(last)) = (self.samples.first(), self.samples.last()) else {
            return Err(AppError::InvalidInput("No samples in run".to_string()));
        };
        Ok(RunSummary {
            time_range: (first.time_s, last.time_s),
            sample_count: self.samples.len(),
            path_count: self.paths.len(),
        })
    }

    /// `(time, value)` pairs for one recorded path.
    pub fn series(&self, path: &str) -> AppResult<Vec<(f64, f64)>> {
        let column = self
            .paths
            .iter()
            .position(|p| p == path)
            .ok_or_else(|| AppError::InvalidInput(format!("Path not recorded: {path}")))?;
        Ok(self
            .samples
            .iter()
            .map(|s| (s.time_s, s.values[column]))
            .collect())
    }

    pub fn write_csv(&self, mut out: impl Write) -> AppResult<()> {
        write!(out, "time_s,frame")?;
        for p in &self.paths {
            write!(out, ",{p}")?;
        }
        writeln!(out)?;
        for s in &self.samples {
            write!(out, "{},{}", s.time_s, s.frame)?;
            for v in &s.values {
                write!(out, ",{v}")?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    pub fn to_yaml(&self) -> AppResult<String> {
        serde_yaml::to_string(self).map_err(|e| AppError::InvalidInput(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series() -> RunSeries {
        let mut s = RunSeries::new(vec!["a/x".to_string(), "a/y".to_string()]);
        for i in 0..3 {
            s.push(Sample {
                time_s: i as f64 * 0.5,
                frame: i,
                values: vec![i as f64, -(i as f64)],
            });
        }
        s
    }

    #[test]
    fn extracts_columns() {
        let s = series();
        assert_eq!(s.series("a/y").unwrap()[2], (1.0, -2.0));
        assert!(s.series("a/z").is_err());
        let summary = s.summary().unwrap();
        assert_eq!(summary.time_range, (0.0, 1.0));
        assert_eq!(summary.sample_count, 3);
    }

    #[test]
    fn csv_has_header_and_rows() {
        let mut buf = Vec::new();
        series().write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "time_s,frame,a/x,a/y");
        assert_eq!(lines[2], "0.5,1,1,-1");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn empty_summary_is_error() {
        assert!(RunSeries::new(Vec::new()).summary().is_err());
    }
}
