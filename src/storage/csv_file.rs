use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};

use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use uuid::Uuid;

use crate::domain::{COLUMNS, Row};

use super::{Backend, BackendError};

/// A single-sheet spreadsheet kept as a CSV file.
///
/// The first line is the header `date,type,category,amount,note`. Columns are
/// located by header name, so a sheet edited by hand may reorder them. A
/// missing file is an empty ledger.
#[derive(Debug, Clone)]
pub struct CsvFileBackend {
    path: PathBuf,
}

impl CsvFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "ledger.csv".into());
        name.push(format!(".{}.tmp", Uuid::new_v4().simple()));
        self.path.with_file_name(name)
    }

    /// Last byte of the file, `None` when it is missing or empty.
    async fn last_byte(&self) -> Result<Option<u8>, BackendError> {
        let mut file = match tokio::fs::File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if file.metadata().await?.len() == 0 {
            return Ok(None);
        }
        file.seek(SeekFrom::End(-1)).await?;
        let mut last = [0u8; 1];
        file.read_exact(&mut last).await?;
        Ok(Some(last[0]))
    }
}

/// Parse sheet content into rows. Header lookup is case-insensitive.
pub fn parse_sheet(content: &[u8]) -> Result<Vec<Row>, BackendError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(content);

    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Ok(Vec::new());
    }

    let mut index = [0usize; 5];
    for (slot, column) in index.iter_mut().zip(COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(column))
            .ok_or_else(|| BackendError::Malformed(format!("missing column '{}'", column)))?;
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(Row::from_cells(
            index.iter().map(|&i| record.get(i).unwrap_or("")),
        ));
    }
    Ok(rows)
}

/// Render rows as sheet content, header first.
pub fn render_sheet(rows: &[Row]) -> Result<Vec<u8>, BackendError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(COLUMNS)?;
    for row in rows {
        writer.write_record(row.cells())?;
    }
    writer
        .into_inner()
        .map_err(|e| BackendError::Io(std::io::Error::other(e.to_string())))
}

impl Backend for CsvFileBackend {
    fn name(&self) -> &'static str {
        "csv"
    }

    async fn read(&self) -> Result<Vec<Row>, BackendError> {
        match tokio::fs::read(&self.path).await {
            Ok(content) => parse_sheet(&content),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn overwrite(&self, rows: &[Row]) -> Result<(), BackendError> {
        let content = render_sheet(rows)?;
        let temp = self.temp_path();

        tokio::fs::write(&temp, &content).await?;
        if let Err(e) = tokio::fs::rename(&temp, &self.path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn append(&self, row: &Row) -> Result<(), BackendError> {
        let last_byte = self.last_byte().await?;

        let mut bytes = Vec::new();
        // A hand-edited file may lack the final line break
        if last_byte.is_some_and(|byte| byte != b'\n') {
            bytes.push(b'\n');
        }
        let mut writer = csv::Writer::from_writer(bytes);
        if last_byte.is_none() {
            writer.write_record(COLUMNS)?;
        }
        writer.write_record(row.cells())?;
        let bytes = writer
            .into_inner()
            .map_err(|e| BackendError::Io(std::io::Error::other(e.to_string())))?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        Ok(())
    }
}
