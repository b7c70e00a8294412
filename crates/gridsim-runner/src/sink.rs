//! Writes finished runs into the data directory.

use gridsim_core::{Result, ResultSink, RunRecord};
use gridsim_models::{CrossSection, GridSnapshot};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, record: &RunRecord, extension: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", record.name(), extension))
    }

    /// Final grid as bincode, next to the record text
    pub fn write_snapshot(&self, record: &RunRecord, snapshot: &GridSnapshot) -> Result<PathBuf> {
        let path = self.path_for(record, "grid");
        fs::write(&path, snapshot.to_bytes()?)?;
        info!(event = "snapshot_written", path = %path.display(), "Grid snapshot saved");
        Ok(path)
    }

    pub fn write_cross_section(&self, record: &RunRecord, section: &CrossSection) -> Result<PathBuf> {
        let path = self.path_for(record, "section.json");
        fs::write(&path, serde_json::to_vec_pretty(section)?)?;
        info!(event = "cross_section_written", path = %path.display(), "Cross-section saved");
        Ok(path)
    }
}

impl ResultSink for FileSink {
    fn accept(&mut self, record: &RunRecord) -> Result<()> {
        let path = self.dir.join(record.file_name());
        fs::write(&path, record.to_text())?;
        info!(
            event = "record_written",
            path = %path.display(),
            rows = record.rows.len(),
            "Data successfully saved as {}",
            record.file_name()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridsim_models::Lattice;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("gridsim-sink-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_record_round_trip_through_files() {
        let dir = scratch_dir();
        let mut sink = FileSink::new(&dir).unwrap();
        let mut record = RunRecord::new("Cahn", "Cahn Hilliard", 4, 16, 2, &["timesteps", "energy"]);
        record.push_row(vec![0.0, -1.5]);
        record.push_row(vec![1.0, -1.25]);
        sink.accept(&record).unwrap();

        let text = fs::read_to_string(dir.join("Cahn - 4 - 2.txt")).unwrap();
        let loaded = RunRecord::from_text(&record.file_name(), &text).unwrap();
        assert_eq!(loaded, record);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_snapshot_file() {
        let dir = scratch_dir();
        let sink = FileSink::new(&dir).unwrap();
        let record = RunRecord::new("GoL", "Game Of Life", 3, 9, 0, &["sweep", "live"]);
        let snapshot = GridSnapshot::Lattice(Lattice::new(3, 1.0));
        let path = sink.write_snapshot(&record, &snapshot).unwrap();
        assert_eq!(path.file_name().unwrap(), "GoL - 3 - 0.grid");
        let bytes = fs::read(&path).unwrap();
        assert_eq!(GridSnapshot::from_bytes(&bytes).unwrap(), snapshot);
        assert_eq!(sink.dir(), dir.as_path());
        fs::remove_dir_all(&dir).unwrap();
    }
}
