//! Output records handed to the result sink.
//!
//! Text layout: line 1 is a free-text description, line 2 the comma-separated
//! column headers, then one comma-separated row per captured sample. Loaders
//! skip exactly the first two lines.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// The finished row series of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Short model label used in the record name, e.g. `GoL` or `SIRSHalf`
    pub model: String,
    pub dimension: usize,
    pub sweeps: u64,
    pub description: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl RunRecord {
    pub fn new(
        model: impl Into<String>,
        title: &str,
        dimension: usize,
        cells: usize,
        sweeps: u64,
        headers: &[&str],
    ) -> Self {
        Self {
            model: model.into(),
            dimension,
            sweeps,
            description: format!(
                "{} Simulation of {} Cells and {} Sweeps",
                title, cells, sweeps
            ),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<f64>) {
        debug_assert_eq!(row.len(), self.headers.len());
        self.rows.push(row);
    }

    /// `{model} - {N} - {sweeps}`
    pub fn name(&self) -> String {
        format!("{} - {} - {}", self.model, self.dimension, self.sweeps)
    }

    pub fn file_name(&self) -> String {
        format!("{}.txt", self.name())
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.description);
        out.push('\n');
        out.push_str(&self.headers.join(","));
        out.push('\n');
        for row in &self.rows {
            let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            out.push_str(&line.join(","));
            out.push('\n');
        }
        out
    }

    /// Load a record from its name and text, skipping the two header lines
    pub fn from_text(name: &str, text: &str) -> Result<Self> {
        let name = name.trim_end_matches(".txt");
        let parts: Vec<&str> = name.split(" - ").collect();
        if parts.len() != 3 {
            return Err(Error::Serialization(format!(
                "record name '{}' is not '<model> - <N> - <sweeps>'",
                name
            )));
        }
        let dimension = parts[1]
            .parse::<usize>()
            .map_err(|e| Error::Serialization(format!("bad dimension in record name: {}", e)))?;
        let sweeps = parts[2]
            .parse::<u64>()
            .map_err(|e| Error::Serialization(format!("bad sweep count in record name: {}", e)))?;

        let mut lines = text.lines();
        let description = lines
            .next()
            .ok_or_else(|| Error::Serialization("record is missing its description".into()))?
            .to_string();
        let headers: Vec<String> = lines
            .next()
            .ok_or_else(|| Error::Serialization("record is missing its headers".into()))?
            .split(',')
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for (i, line) in lines.enumerate().filter(|(_, l)| !l.trim().is_empty()) {
            let row = line
                .split(',')
                .map(|v| v.trim().parse::<f64>())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| Error::Serialization(format!("row {}: {}", i + 1, e)))?;
            if row.len() != headers.len() {
                return Err(Error::Serialization(format!(
                    "row {} has {} values for {} headers",
                    i + 1,
                    row.len(),
                    headers.len()
                )));
            }
            rows.push(row);
        }

        Ok(Self {
            model: parts[0].to_string(),
            dimension,
            sweeps,
            description,
            headers,
            rows,
        })
    }
}

/// Receives finished records; persistence is up to the implementor
pub trait ResultSink {
    fn accept(&mut self, record: &RunRecord) -> Result<()>;
}

/// Keeps records in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<RunRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultSink for MemorySink {
    fn accept(&mut self, record: &RunRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}
