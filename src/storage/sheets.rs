//! Remote spreadsheet backend over the spreadsheet values HTTP API.
//!
//! The ledger lives in columns A:E of one sheet, header on the first line.

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::domain::{COLUMNS, Row};

use super::{Backend, BackendError};

#[derive(Clone)]
pub struct SheetsBackend {
    http: Client,
    api_base: String,
    spreadsheet_id: String,
    sheet: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl SheetsBackend {
    /// `spreadsheet_id` and `token` are passed through as given.
    pub fn new(
        api_base: impl Into<String>,
        spreadsheet_id: impl Into<String>,
        sheet: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, BackendError> {
        let http = Client::builder()
            .user_agent(format!("cashbook/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| BackendError::Http(e.to_string()))?;

        Ok(Self {
            http,
            api_base: api_base.into(),
            spreadsheet_id: spreadsheet_id.into(),
            sheet: sheet.into(),
            token: token.into(),
        })
    }

    fn range(&self) -> String {
        format!("{}!A:E", self.sheet)
    }

    fn leftover_range(&self, rows: usize) -> String {
        format!("{}!A{}:E", self.sheet, rows + 2)
    }

    /// `{base}/v4/spreadsheets/{id}/values/{range}{suffix}`
    pub fn values_url(&self, range: &str, suffix: &str) -> Result<Url, BackendError> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| BackendError::Malformed(format!("invalid API base: {}", e)))?;
        let target = format!("{}{}", range, suffix);
        url.path_segments_mut()
            .map_err(|_| BackendError::Malformed("API base cannot hold a path".to_string()))?
            .pop_if_empty()
            .extend([
                "v4",
                "spreadsheets",
                self.spreadsheet_id.as_str(),
                "values",
                target.as_str(),
            ]);
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, BackendError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| BackendError::Http(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(BackendError::Unavailable(format!(
                "sheet '{}' not found",
                self.sheet
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Http(format!("{}: {}", status.as_u16(), body)));
        }
        Ok(response)
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Convert a values response into rows, dropping the header line if present.
pub fn rows_from_values(values: &[Vec<Value>]) -> Vec<Row> {
    let has_header = values
        .first()
        .and_then(|first| first.first())
        .is_some_and(|cell| cell_text(cell).trim().eq_ignore_ascii_case(COLUMNS[0]));

    values
        .iter()
        .skip(usize::from(has_header))
        .map(|cells| Row::from_cells(cells.iter().map(cell_text)))
        .collect()
}

/// Header plus rows, as a values request body.
pub fn values_from_rows(rows: &[Row]) -> Vec<Vec<String>> {
    let header: Vec<String> = COLUMNS.iter().map(|c| c.to_string()).collect();
    std::iter::once(header)
        .chain(
            rows.iter()
                .map(|row| row.cells().iter().map(|c| c.to_string()).collect::<Vec<_>>()),
        )
        .collect()
}

impl Backend for SheetsBackend {
    fn name(&self) -> &'static str {
        "sheets"
    }

    async fn read(&self) -> Result<Vec<Row>, BackendError> {
        let url = self.values_url(&self.range(), "")?;
        let response = self.send(self.http.get(url)).await?;
        let body: ValueRange = response
            .json()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))?;
        Ok(rows_from_values(&body.values))
    }

    /// Write the new table from A1, then clear the lines below it. A failed
    /// write leaves the previous content in place.
    async fn overwrite(&self, rows: &[Row]) -> Result<(), BackendError> {
        let mut update = self.values_url(&format!("{}!A1", self.sheet), "")?;
        update
            .query_pairs_mut()
            .append_pair("valueInputOption", "RAW");
        let body = json!({
            "majorDimension": "ROWS",
            "values": values_from_rows(rows),
        });
        self.send(self.http.put(update).json(&body)).await?;

        // Header plus rows occupy lines 1..=rows.len() + 1
        let leftover = self.values_url(&self.leftover_range(rows.len()), ":clear")?;
        self.send(self.http.post(leftover).json(&json!({}))).await?;
        Ok(())
    }

    async fn append(&self, row: &Row) -> Result<(), BackendError> {
        let mut url = self.values_url(&self.range(), ":append")?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");
        let body = json!({
            "majorDimension": "ROWS",
            "values": [row.cells()],
        });
        self.send(self.http.post(url).json(&body)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> SheetsBackend {
        SheetsBackend::new("https://example.test/", "abc123", "Thu Chi", "token").unwrap()
    }

    #[test]
    fn test_values_url_encodes_sheet_name() {
        let url = backend().values_url("Thu Chi!A:E", ":append").unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.test/v4/spreadsheets/abc123/values/Thu%20Chi!A:E:append"
        );
    }

    #[test]
    fn test_leftover_range_starts_below_written_lines() {
        assert_eq!(backend().leftover_range(0), "Thu Chi!A2:E");
        assert_eq!(backend().leftover_range(3), "Thu Chi!A5:E");
    }

    #[test]
    fn test_rows_from_values_skips_header_and_stringifies() {
        let values = vec![
            vec![json!("date"), json!("type"), json!("category"), json!("amount"), json!("note")],
            vec![json!("2024-01-01"), json!("Chi"), json!("Food"), json!(50000), json!("lunch")],
            vec![json!("2024-01-02"), json!("Thu")],
        ];

        let rows = rows_from_values(&values);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].amount, "50000");
        assert_eq!(rows[1].category, "");
    }

    #[test]
    fn test_values_from_rows_has_header() {
        let values = values_from_rows(&[Row::from_cells(["2024-01-01", "income", "Salary", "1", ""])]);
        assert_eq!(values.len(), 2);
        assert_eq!(values[0][1], "type");
        assert_eq!(values[1][2], "Salary");
    }
}
