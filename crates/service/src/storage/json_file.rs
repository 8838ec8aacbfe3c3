use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::fs;
use tracing::{debug, error};

use models::Record;

use crate::errors::ServiceError;
use crate::storage::{Change, Persistence};

/// Bulk-file persistence: the whole collection lives in one JSON array that is
/// rewritten after every mutation.
///
/// Writes go to a sibling `*.tmp` file that is then renamed over the target,
/// so a crash mid-write leaves the previous contents intact.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    file_path: PathBuf,
}

impl JsonFileBackend {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { file_path: path.into() }
    }

    /// `<data_dir>/<collection>.json`
    pub fn for_collection<P: AsRef<Path>>(data_dir: P, collection: &str) -> Self {
        Self::new(data_dir.as_ref().join(format!("{collection}.json")))
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Read the array, creating the file with `[]` if missing.
    pub async fn read<T: DeserializeOwned + Serialize>(&self) -> Result<Vec<T>, ServiceError> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| self.io_error("create dir for", e))?;
        }
        match fs::read(&self.file_path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                error!(path = %self.file_path.display(), error = %e, "cannot parse collection file");
                ServiceError::Persistence(format!("cannot parse {}: {e}", self.file_path.display()))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let empty: Vec<T> = Vec::new();
                self.write(&empty).await?;
                Ok(empty)
            }
            Err(e) => Err(self.io_error("read", e)),
        }
    }

    /// Overwrite the file with `records`, pretty-printed with 4-space indent.
    pub async fn write<T: Serialize>(&self, records: &[T]) -> Result<(), ServiceError> {
        let data = to_pretty_json(records).map_err(|e| ServiceError::Persistence(e.to_string()))?;
        let tmp = self.file_path.with_extension("json.tmp");
        fs::write(&tmp, data).await.map_err(|e| self.io_error("write", e))?;
        fs::rename(&tmp, &self.file_path).await.map_err(|e| self.io_error("replace", e))?;
        debug!(path = %self.file_path.display(), count = records.len(), "collection file written");
        Ok(())
    }

    fn io_error(&self, op: &str, e: std::io::Error) -> ServiceError {
        error!(path = %self.file_path.display(), error = %e, "cannot {op} collection file");
        ServiceError::Persistence(format!("cannot {op} {}: {e}", self.file_path.display()))
    }
}

fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(buf)
}

#[async_trait]
impl<R: Record> Persistence<R> for JsonFileBackend {
    async fn load(&self) -> Result<Vec<R>, ServiceError> {
        self.read().await
    }

    async fn persist(&self, snapshot: &[R], _change: Change<'_, R>) -> Result<(), ServiceError> {
        self.write(snapshot).await
    }

    async fn flush(&self, snapshot: &[R]) -> Result<(), ServiceError> {
        self.write(snapshot).await
    }
}
