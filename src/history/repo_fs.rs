//! CSV history log on the local filesystem.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::common::config::AppCfg;
use crate::common::error::{MaintError, MaintResult};

use super::domain::{HistoryRecord, HistorySink, HISTORY_COLUMNS};

/// Appends one CSV row per record, writing the header when the file is new.
pub struct CsvHistory {
    path: PathBuf,
    // Serialises appends so the header check and the write stay atomic.
    write_lock: Mutex<()>,
}

impl CsvHistory {
    pub fn new(cfg: &AppCfg) -> Self {
        Self::at(cfg.history_path.clone())
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl HistorySink for CsvHistory {
    async fn append(&self, record: &HistoryRecord) -> MaintResult<()> {
        let _guard = self.write_lock.lock().await;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .map_err(|err| MaintError::io("create history dir", err))?;
        }

        let is_new = match fs::metadata(&self.path).await {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        };

        let mut chunk = String::new();
        if is_new {
            chunk.push_str(&csv_row(HISTORY_COLUMNS.iter().copied()));
        }
        let fields = record.fields();
        chunk.push_str(&csv_row(fields.iter().map(String::as_str)));

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|err| MaintError::io("open history", err))?;
        file.write_all(chunk.as_bytes())
            .await
            .map_err(|err| MaintError::io("append history", err))?;
        file.flush()
            .await
            .map_err(|err| MaintError::io("flush history", err))?;
        Ok(())
    }
}

fn csv_row<'a>(fields: impl Iterator<Item = &'a str>) -> String {
    let mut row = fields.map(csv_field).collect::<Vec<_>>().join(",");
    row.push('\n');
    row
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
