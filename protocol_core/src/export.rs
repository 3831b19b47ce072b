//! CSV rollup of the session journal.
//!
//! Finished sessions are summarized one row each into a long-lived CSV file.
//! The journal is then copied to an archive and emptied, so the next rollup
//! starts fresh.

use crate::journal::parse_instances;
use crate::progress::summarize;
use crate::{Error, Result, WorkoutInstance};
use chrono::Utc;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// A row in the CSV output
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct SessionRow {
    pub id: String,
    pub user_id: String,
    pub protocol_id: Option<String>,
    pub name: String,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub elapsed_seconds: f64,
    pub elapsed: String,
    pub completed: usize,
    pub total: usize,
    pub ratio: f64,
}

impl From<&WorkoutInstance> for SessionRow {
    fn from(instance: &WorkoutInstance) -> Self {
        let summary = summarize(instance);
        SessionRow {
            id: instance.id.to_string(),
            user_id: instance.user_id.to_string(),
            protocol_id: instance.template_id.map(|id| id.to_string()),
            name: instance.name.clone(),
            started_at: instance.started_at.to_rfc3339(),
            ended_at: instance.ended_at.map(|t| t.to_rfc3339()),
            elapsed_seconds: summary.elapsed_seconds,
            elapsed: summary.elapsed_clock,
            completed: summary.completed,
            total: summary.total,
            ratio: summary.ratio,
        }
    }
}

/// Roll journal entries into the CSV and archive the journal
///
/// The journal stays exclusively locked from the read until it is emptied,
/// so an append made during the rollup waits and lands in the fresh journal.
/// The CSV and the archive copy are fsynced before the journal is truncated.
/// Returns the number of rows written.
pub fn journal_to_csv_and_archive(journal_path: &Path, csv_path: &Path) -> Result<usize> {
    if !journal_path.exists() {
        return Ok(0);
    }

    let journal = OpenOptions::new()
        .read(true)
        .write(true)
        .open(journal_path)?;
    journal.lock_exclusive()?;

    let result = roll_up_locked(&journal, journal_path, csv_path);

    if let Err(e) = journal.unlock() {
        tracing::warn!("Failed to release journal lock: {}", e);
    }
    result
}

fn roll_up_locked(journal: &File, journal_path: &Path, csv_path: &Path) -> Result<usize> {
    let mut raw = String::new();
    let mut reader = journal;
    reader.read_to_string(&mut raw)?;

    let instances = parse_instances(raw.as_bytes())?;
    if instances.is_empty() {
        tracing::info!("No sessions in journal to roll up");
        return Ok(0);
    }

    write_rows(&instances, csv_path)?;
    tracing::info!("Wrote {} sessions to CSV", instances.len());

    let archived = archive_path(journal_path);
    let mut archive = File::create(&archived)?;
    archive.write_all(raw.as_bytes())?;
    archive.sync_all()?;

    journal.set_len(0)?;
    journal.sync_all()?;
    tracing::info!("Archived journal to {:?}", archived);

    Ok(instances.len())
}

fn write_rows(instances: &[WorkoutInstance], csv_path: &Path) -> Result<()> {
    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;

    // Only a brand-new file gets a header row
    let needs_headers = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);

    for instance in instances {
        writer.serialize(SessionRow::from(instance))?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
    file.sync_all()?;
    Ok(())
}

/// `sessions.jsonl` -> `sessions.jsonl.<timestamp>.processed`
fn archive_path(journal_path: &Path) -> PathBuf {
    let file_name = journal_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "journal".into());
    journal_path.with_file_name(format!(
        "{}.{}.processed",
        file_name,
        Utc::now().format("%Y%m%dT%H%M%S%.f")
    ))
}

/// Remove archived journals (`*.processed`) from `dir`
pub fn cleanup_processed_journals(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        if path.extension().is_some_and(|ext| ext == "processed") {
            std::fs::remove_file(&path)?;
            tracing::debug!("Removed processed journal: {:?}", path);
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Cleaned up {} processed journals", count);
    }

    Ok(count)
}

/// Read back every summary row from a rollup CSV
pub fn read_rows(csv_path: &Path) -> Result<Vec<SessionRow>> {
    if !csv_path.exists() {
        return Ok(Vec::new());
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(csv_path)?;
    let rows = reader.deserialize().collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duration::DurationValue;
    use crate::instantiate::instantiate;
    use crate::journal::{InstanceSink, JsonlJournal};
    use crate::{Performance, Prescription, Protocol, UserId, WorkoutBlock, WorkoutBlockExercise};
    use std::fs::File;

    fn finished_session(name: &str) -> WorkoutInstance {
        let block = WorkoutBlock::new("Main", None)
            .unwrap()
            .with_exercise(WorkoutBlockExercise::new(
                "rower",
                Prescription::timed(
                    1,
                    DurationValue::minutes(5.0).unwrap(),
                    DurationValue::seconds(0.0).unwrap(),
                ),
            ))
            .with_exercise(WorkoutBlockExercise::new(
                "plank",
                Prescription::timed(
                    1,
                    DurationValue::seconds(60.0).unwrap(),
                    DurationValue::seconds(0.0).unwrap(),
                ),
            ));
        let protocol = Protocol::new(name, vec![block]).unwrap();
        let mut instance = instantiate(&protocol, UserId::local(), Utc::now()).unwrap();
        let first = instance.blocks[0].exercises[0].id;
        instance
            .record_exercise(
                first,
                Performance {
                    reps: 0,
                    duration: Some(DurationValue::minutes(5.0).unwrap()),
                    rest: None,
                },
                Utc::now(),
            )
            .unwrap();
        instance.complete(Utc::now()).unwrap();
        instance
    }

    #[test]
    fn test_rollup_creates_csv_and_archives() {
        let temp_dir = tempfile::tempdir().unwrap();
        let journal_path = temp_dir.path().join("sessions.jsonl");
        let csv_path = temp_dir.path().join("sessions.csv");

        let mut journal = JsonlJournal::new(&journal_path);
        for i in 0..3 {
            journal.append(&finished_session(&format!("P{}", i))).unwrap();
        }

        let count = journal_to_csv_and_archive(&journal_path, &csv_path).unwrap();
        assert_eq!(count, 3);
        assert_eq!(std::fs::metadata(&journal_path).unwrap().len(), 0);
        let archived: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "processed"))
            .collect();
        assert_eq!(archived.len(), 1);
        assert_eq!(crate::journal::read_instances(&archived[0]).unwrap().len(), 3);

        let rows = read_rows(&csv_path).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].elapsed, "05:00");
        assert_eq!(rows[0].completed, 1);
        assert_eq!(rows[0].total, 2);
        assert_eq!(rows[0].ratio, 0.5);
    }

    #[test]
    fn test_rollup_appends_without_repeating_header() {
        let temp_dir = tempfile::tempdir().unwrap();
        let journal_path = temp_dir.path().join("sessions.jsonl");
        let csv_path = temp_dir.path().join("sessions.csv");

        let mut journal = JsonlJournal::new(&journal_path);
        journal.append(&finished_session("First")).unwrap();
        assert_eq!(journal_to_csv_and_archive(&journal_path, &csv_path).unwrap(), 1);

        journal.append(&finished_session("Second")).unwrap();
        assert_eq!(journal_to_csv_and_archive(&journal_path, &csv_path).unwrap(), 1);

        let names: Vec<_> = read_rows(&csv_path)
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["First", "Second"]);
    }

    #[test]
    fn test_rollup_waits_for_journal_writers() {
        let temp_dir = tempfile::tempdir().unwrap();
        let journal_path = temp_dir.path().join("sessions.jsonl");
        let csv_path = temp_dir.path().join("sessions.csv");

        let mut journal = JsonlJournal::new(&journal_path);
        journal.append(&finished_session("Early")).unwrap();

        // A writer holds the journal while the rollup starts
        let writer = OpenOptions::new().append(true).open(&journal_path).unwrap();
        writer.lock_exclusive().unwrap();

        let (jp, cp) = (journal_path.clone(), csv_path.clone());
        let rollup = std::thread::spawn(move || journal_to_csv_and_archive(&jp, &cp).unwrap());
        std::thread::sleep(std::time::Duration::from_millis(50));

        let line = serde_json::to_string(&finished_session("Late")).unwrap();
        let mut w = &writer;
        writeln!(w, "{}", line).unwrap();
        writer.unlock().unwrap();

        assert_eq!(rollup.join().unwrap(), 2);
        let names: Vec<_> = read_rows(&csv_path)
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["Early", "Late"]);
        assert!(crate::journal::read_instances(&journal_path)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_empty_journal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let journal_path = temp_dir.path().join("empty.jsonl");
        let csv_path = temp_dir.path().join("sessions.csv");
        File::create(&journal_path).unwrap();

        assert_eq!(journal_to_csv_and_archive(&journal_path, &csv_path).unwrap(), 0);
        assert!(!csv_path.exists());
    }

    #[test]
    fn test_cleanup_processed_journals() {
        let temp_dir = tempfile::tempdir().unwrap();
        File::create(temp_dir.path().join("a.jsonl.1.processed")).unwrap();
        File::create(temp_dir.path().join("b.jsonl.2.processed")).unwrap();
        File::create(temp_dir.path().join("keep.jsonl")).unwrap();

        assert_eq!(cleanup_processed_journals(temp_dir.path()).unwrap(), 2);
        assert!(temp_dir.path().join("keep.jsonl").exists());
    }
}
