//! Append-only journal of finished sessions.
//!
//! Finished instances are appended to a JSONL (JSON Lines) file with file
//! locking so several processes can log at once.

use crate::{Result, WorkoutInstance};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Destination for finished instances
pub trait InstanceSink {
    fn append(&mut self, instance: &WorkoutInstance) -> Result<()>;
}

/// JSONL-based journal with file locking
#[derive(Clone, Debug)]
pub struct JsonlJournal {
    path: PathBuf,
}

impl JsonlJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl InstanceSink for JsonlJournal {
    fn append(&mut self, instance: &WorkoutInstance) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(instance)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;

        tracing::debug!("Appended instance {} to journal", instance.id);
        Ok(())
    }
}

/// In-memory sink, used where nothing should touch the filesystem
impl InstanceSink for Vec<WorkoutInstance> {
    fn append(&mut self, instance: &WorkoutInstance) -> Result<()> {
        self.push(instance.clone());
        Ok(())
    }
}

/// Read every instance from a journal file
///
/// Malformed lines are skipped with a warning.
pub fn read_instances(path: &Path) -> Result<Vec<WorkoutInstance>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;
    let instances = parse_instances(BufReader::new(&file));
    file.unlock()?;

    let instances = instances?;
    tracing::debug!("Read {} instances from journal", instances.len());
    Ok(instances)
}

/// Parse journal lines from a reader whose file lock the caller already holds
pub(crate) fn parse_instances(reader: impl BufRead) -> Result<Vec<WorkoutInstance>> {
    let mut instances = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<WorkoutInstance>(&line) {
            Ok(instance) => instances.push(instance),
            Err(e) => {
                tracing::warn!("Failed to parse instance at line {}: {}", line_num + 1, e);
            }
        }
    }

    Ok(instances)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UserId;
    use chrono::Utc;
    use std::io::Write as _;

    fn finished() -> WorkoutInstance {
        let mut instance = WorkoutInstance::freeform(UserId::local(), "Journal test", Utc::now());
        instance.complete(Utc::now()).unwrap();
        instance
    }

    #[test]
    fn test_append_and_read_back() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("journal/sessions.jsonl");

        let mut journal = JsonlJournal::new(&path);
        let first = finished();
        let second = finished();
        journal.append(&first).unwrap();
        journal.append(&second).unwrap();

        let read = read_instances(&path).unwrap();
        assert_eq!(read, vec![first, second]);
    }

    #[test]
    fn test_read_missing_journal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let read = read_instances(&temp_dir.path().join("missing.jsonl")).unwrap();
        assert!(read.is_empty());
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("sessions.jsonl");

        let mut journal = JsonlJournal::new(&path);
        journal.append(&finished()).unwrap();

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{ truncated").unwrap();
        writeln!(file).unwrap();
        drop(file);

        journal.append(&finished()).unwrap();

        assert_eq!(read_instances(&path).unwrap().len(), 2);
    }
}
