//! Tournament store backed by a JSON file.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{StoreError, TournamentStore};
use crate::models::{TournamentRecord, TournamentTarget};

/// Inclusive start-date window for pending tournaments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}

/// A JSON array of [`TournamentRecord`]s on disk.
///
/// A missing file is an empty store. Writes replace the file atomically and
/// are serialized through an internal lock.
pub struct JsonFileStore {
    path: PathBuf,
    range: DateRange,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            range: DateRange::default(),
            lock: Mutex::new(()),
        }
    }

    /// Only report pending tournaments starting within `range`.
    pub fn with_range(mut self, range: DateRange) -> Self {
        self.range = range;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every stored tournament.
    pub async fn load_all(&self) -> Result<Vec<TournamentRecord>, StoreError> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    /// Replace the stored tournaments.
    pub async fn save_all(&self, records: &[TournamentRecord]) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        self.write(records.to_vec()).await
    }

    /// Callers hold `lock`.
    async fn read(&self) -> Result<Vec<TournamentRecord>, StoreError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || read_records(&path)).await?
    }

    /// Callers hold `lock`.
    async fn write(&self, records: Vec<TournamentRecord>) -> Result<(), StoreError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_records(&path, &records)).await?
    }
}

fn read_records(path: &Path) -> Result<Vec<TournamentRecord>, StoreError> {
    match std::fs::read(path) {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

fn write_records(path: &Path, records: &[TournamentRecord]) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut file = tempfile::NamedTempFile::new_in(&dir)?;
    serde_json::to_writer_pretty(&mut file, records)?;
    file.write_all(b"\n")?;
    file.flush()?;
    file.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

#[async_trait]
impl TournamentStore for JsonFileStore {
    async fn load_pending(&self) -> Result<Vec<TournamentTarget>, StoreError> {
        let records = self.load_all().await?;
        let pending: Vec<TournamentTarget> = records
            .iter()
            .filter(|r| r.is_pending() && self.range.contains(r.start_date))
            .map(TournamentRecord::target)
            .collect();
        debug!(
            "{} pending of {} tournament(s) in {}",
            pending.len(),
            records.len(),
            self.path.display()
        );
        Ok(pending)
    }

    async fn persist_resolved(&self, id: i64, url: &str) -> Result<(), StoreError> {
        let written = self.persist_batch(&[(id, url.to_string())]).await?;
        if written == 0 {
            return Err(StoreError::UnknownTournament(id));
        }
        Ok(())
    }

    /// Applies the whole batch with a single file write. Unknown ids are
    /// skipped.
    async fn persist_batch(&self, resolved: &[(i64, String)]) -> Result<usize, StoreError> {
        if resolved.is_empty() {
            return Ok(0);
        }

        let _guard = self.lock.lock().await;
        let mut records = self.read().await?;
        let mut written = 0;
        for (id, url) in resolved {
            match records.iter_mut().find(|r| r.id == *id) {
                Some(record) => {
                    record.signup_url = Some(url.clone());
                    written += 1;
                }
                None => warn!("Cannot record signup URL of unknown tournament {}", id),
            }
        }
        if written > 0 {
            self.write(records).await?;
        }
        Ok(written)
    }
}
