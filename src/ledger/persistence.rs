use std::{
    fs,
    io::{BufWriter, Write},
    path::PathBuf,
};

use serde::{Deserialize, Serialize};

use crate::ledger::{
    error::{LedgerError, storage_error},
    types::UsageRecord,
};

const SNAPSHOT_VERSION: u64 = 1;

/// Durable snapshot of all usage records. Saved atomically through a
/// temp file rename so a crash mid-write never leaves a torn snapshot.
#[derive(Debug, Clone)]
pub struct LedgerPersistence {
    path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedLedgerState {
    version: u64,
    records: Vec<UsageRecord>,
}

impl LedgerPersistence {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn load(&self) -> Result<Option<Vec<UsageRecord>>, LedgerError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(storage_error(format!(
                    "failed to read ledger snapshot '{}': {err}",
                    self.path.display()
                )));
            }
        };

        let parsed: PersistedLedgerState = serde_json::from_str(&content).map_err(|err| {
            storage_error(format!(
                "failed to parse ledger snapshot '{}': {err}",
                self.path.display()
            ))
        })?;
        if parsed.version != SNAPSHOT_VERSION {
            return Err(storage_error(format!(
                "unsupported ledger snapshot version {} at '{}'",
                parsed.version,
                self.path.display()
            )));
        }

        Ok(Some(parsed.records))
    }

    pub fn save(&self, records: &[UsageRecord]) -> Result<(), LedgerError> {
        let parent = self.path.parent().ok_or_else(|| {
            storage_error(format!(
                "ledger snapshot path '{}' has no parent",
                self.path.display()
            ))
        })?;
        fs::create_dir_all(parent).map_err(|err| {
            storage_error(format!(
                "failed to create ledger snapshot directory '{}': {err}",
                parent.display()
            ))
        })?;

        let persisted = PersistedLedgerState {
            version: SNAPSHOT_VERSION,
            records: records.to_vec(),
        };

        let tmp_path = self.path.with_extension("tmp");
        let file = fs::File::create(&tmp_path).map_err(|err| {
            storage_error(format!(
                "failed to create ledger temp file '{}': {err}",
                tmp_path.display()
            ))
        })?;
        {
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &persisted).map_err(|err| {
                storage_error(format!(
                    "failed to serialize ledger snapshot '{}': {err}",
                    tmp_path.display()
                ))
            })?;
            writer.write_all(b"\n").map_err(|err| {
                storage_error(format!(
                    "failed to finalize ledger snapshot '{}': {err}",
                    tmp_path.display()
                ))
            })?;
            writer.flush().map_err(|err| {
                storage_error(format!(
                    "failed to flush ledger snapshot '{}': {err}",
                    tmp_path.display()
                ))
            })?;
        }

        let tmp_file = fs::OpenOptions::new()
            .read(true)
            .open(&tmp_path)
            .map_err(|err| {
                storage_error(format!(
                    "failed to reopen ledger temp file '{}': {err}",
                    tmp_path.display()
                ))
            })?;
        tmp_file.sync_all().map_err(|err| {
            storage_error(format!(
                "failed to sync ledger temp file '{}': {err}",
                tmp_path.display()
            ))
        })?;

        fs::rename(&tmp_path, &self.path).map_err(|err| {
            storage_error(format!(
                "failed to replace ledger snapshot '{}' from '{}': {err}",
                self.path.display(),
                tmp_path.display()
            ))
        })?;

        if let Ok(parent_dir) = fs::File::open(parent) {
            let _ = parent_dir.sync_all();
        }

        Ok(())
    }
}
