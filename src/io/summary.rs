//! JSON export of a [`RunSummary`].

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};

use crate::sim::framework::RunSummary;

/// Writes a run summary to a JSON file.
pub fn write_summary(path: &Path, summary: &RunSummary) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, summary)
        .with_context(|| format!("Failed to serialize summary to: {}", path.display()))?;

    Ok(())
}

pub fn read_summary(path: &Path) -> Result<RunSummary> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader)
        .with_context(|| format!("Failed to deserialize summary from: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::framework::{ModuleId, ModuleReport};

    #[test]
    fn test_write_read_summary() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("summary.json");
        let summary = RunSummary {
            run_id: "run".to_string(),
            events: 25,
            modules: vec![
                ModuleReport {
                    index: 0,
                    id: ModuleId::unique("GeometryBuilderGeant4"),
                    elapsed_s: 0.5,
                },
                ModuleReport {
                    index: 3,
                    id: ModuleId::for_detector("ElectricFieldReader", "detector1"),
                    elapsed_s: 0.25,
                },
            ],
            failed: 0,
            elapsed_s: 1.0,
        };

        write_summary(&path, &summary)?;
        assert_eq!(read_summary(&path)?, summary);

        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(json["modules"][1]["id"]["detector"], "detector1");
        assert_eq!(json["events"], 25);
        assert_eq!(json["failed"], 0);
        Ok(())
    }

    #[test]
    fn test_write_to_missing_directory_fails() {
        let summary = RunSummary {
            run_id: "run".to_string(),
            events: 1,
            modules: vec![],
            failed: 0,
            elapsed_s: 0.0,
        };
        let err = write_summary(Path::new("/nonexistent/dir/summary.json"), &summary).unwrap_err();
        assert!(err.to_string().contains("Failed to create file"));
    }
}
