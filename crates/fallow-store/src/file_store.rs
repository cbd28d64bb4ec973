//! JSON-file record store: one document per world under a data directory.
//!
//! Writes go to a sibling temp file which is synced and then renamed over
//! the record, followed by a sync of the directory. A crash or power loss
//! mid-write leaves either the old or the new document.

use std::fs::File;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use fallow_types::{SessionClock, WorldId};
use tracing::debug;

use crate::error::StoreError;
use crate::record::{RecordStore, decode_record, encode_record};

/// Record store backed by `<data_dir>/<world-id>.json` files.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open (creating if needed) a store rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DataDir`] if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| StoreError::DataDir {
            path: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// Directory holding the record files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record file for `world`.
    pub fn record_path(&self, world: WorldId) -> PathBuf {
        self.dir.join(format!("{world}.json"))
    }

    fn temp_path(&self, world: WorldId) -> PathBuf {
        self.dir.join(format!("{world}.json.tmp"))
    }
}

impl RecordStore for JsonFileStore {
    fn load(&self, world: WorldId) -> Result<Option<SessionClock>, StoreError> {
        let bytes = match std::fs::read(self.record_path(world)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { world, source }),
        };
        let doc: serde_json::Value = serde_json::from_slice(&bytes)?;
        Ok(Some(decode_record(&doc)))
    }

    fn save(&mut self, world: WorldId, clock: &SessionClock) -> Result<(), StoreError> {
        let doc = encode_record(clock);
        let temp = self.temp_path(world);
        write_synced(&temp, &doc).map_err(|source| StoreError::Io { world, source })?;
        std::fs::rename(&temp, self.record_path(world))
            .map_err(|source| StoreError::Io { world, source })?;
        sync_dir(&self.dir);
        debug!(
            %world,
            last_seen_epoch_ms = clock.last_seen_epoch_ms,
            stage_remainder = clock.stage_remainder,
            "Saved session record"
        );
        Ok(())
    }
}

/// Write `doc` to `path` and flush it to disk before returning.
fn write_synced(path: &Path, doc: &serde_json::Value) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, doc).map_err(std::io::Error::other)?;
    writer.flush()?;
    let file = writer.into_inner().map_err(std::io::IntoInnerError::into_error)?;
    file.sync_all()
}

/// Persist the rename. Best effort: some platforms cannot open a directory.
fn sync_dir(dir: &Path) {
    if let Ok(handle) = File::open(dir) {
        let _ = handle.sync_all();
    }
}
