//! Foglio coda su Google Sheets (API v4)

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{CellUpdate, QueueSheet};
use crate::error::{AppError, Result};
use crate::models::{CellValue, COLUMN_COUNT};
use crate::services::google_auth::GoogleTokenProvider;

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Risposta `values.get`
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Metadati spreadsheet (solo i titoli dei fogli)
#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    #[serde(default)]
    sheet_id: i64,
    title: String,
}

/// Risposta `spreadsheets.batchUpdate` con `addSheet`
#[derive(Debug, Deserialize)]
struct BatchUpdateResponse {
    #[serde(default)]
    replies: Vec<BatchReply>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchReply {
    add_sheet: Option<SheetEntry>,
}

pub struct GoogleSheetsStore {
    client: reqwest::Client,
    tokens: GoogleTokenProvider,
    spreadsheet_id: String,
    sheet_name: String,
}

impl std::fmt::Debug for GoogleSheetsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleSheetsStore")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("sheet_name", &self.sheet_name)
            .finish()
    }
}

impl GoogleSheetsStore {
    pub fn new(
        client: reqwest::Client,
        tokens: GoogleTokenProvider,
        spreadsheet_id: impl Into<String>,
        sheet_name: impl Into<String>,
    ) -> Self {
        Self {
            client,
            tokens,
            spreadsheet_id: spreadsheet_id.into(),
            sheet_name: sheet_name.into(),
        }
    }

    fn spreadsheet_url(&self) -> String {
        format!("{}/{}", SHEETS_API_BASE, self.spreadsheet_id)
    }

    fn values_url(&self, range: &str) -> String {
        format!("{}/values/{}", self.spreadsheet_url(), urlencoding::encode(range))
    }

    /// Controlla lo status HTTP e decodifica il JSON della risposta
    async fn parse<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        context: &str,
    ) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await.unwrap_or_default();
            return Err(AppError::Sheet(format!("{} fallito (HTTP {}): {}", context, status, error)));
        }
        Ok(response.json::<T>().await?)
    }

    async fn sheet_titles(&self, token: &str) -> Result<Vec<String>> {
        let response = self
            .client
            .get(self.spreadsheet_url())
            .query(&[("fields", "sheets.properties(sheetId,title)")])
            .bearer_auth(token)
            .send()
            .await?;

        let meta: SpreadsheetMeta = Self::parse(response, "Lettura metadati").await?;
        Ok(meta.sheets.into_iter().map(|s| s.properties.title).collect())
    }

    /// Aggiunge il foglio e ne restituisce lo sheetId
    async fn add_sheet(&self, token: &str) -> Result<i64> {
        let body = json!({
            "requests": [
                { "addSheet": { "properties": { "title": self.sheet_name } } }
            ]
        });

        let response = self
            .client
            .post(format!("{}:batchUpdate", self.spreadsheet_url()))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let reply: BatchUpdateResponse = Self::parse(response, "Creazione foglio").await?;
        reply
            .replies
            .into_iter()
            .find_map(|r| r.add_sheet)
            .map(|s| s.properties.sheet_id)
            .ok_or_else(|| AppError::Sheet("risposta addSheet senza sheetId".to_string()))
    }

    /// Intestazione in grassetto
    async fn bold_header(&self, token: &str, sheet_id: i64) -> Result<()> {
        let body = json!({
            "requests": [{
                "repeatCell": {
                    "range": {
                        "sheetId": sheet_id,
                        "startRowIndex": 0,
                        "endRowIndex": 1,
                        "startColumnIndex": 0,
                        "endColumnIndex": COLUMN_COUNT
                    },
                    "cell": { "userEnteredFormat": { "textFormat": { "bold": true } } },
                    "fields": "userEnteredFormat.textFormat.bold"
                }
            }]
        });

        let response = self
            .client
            .post(format!("{}:batchUpdate", self.spreadsheet_url()))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let _: serde_json::Value = Self::parse(response, "Formattazione intestazione").await?;
        Ok(())
    }
}

/// Nome foglio quotato per la notazione A1 (`'Nome'!A1`)
pub(crate) fn quote_sheet_name(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

/// Lettera di colonna A1 (1 = A, 27 = AA)
pub(crate) fn column_letters(mut column: usize) -> String {
    let mut letters = Vec::new();
    while column > 0 {
        let rem = (column - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        column = (column - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Range di una singola cella
pub(crate) fn cell_range(sheet: &str, row: usize, column: usize) -> String {
    format!("{}!{}{}", quote_sheet_name(sheet), column_letters(column), row)
}

/// Range dell'intero foglio coda (colonne A..O)
pub(crate) fn full_range(sheet: &str) -> String {
    format!("{}!A1:{}", quote_sheet_name(sheet), column_letters(COLUMN_COUNT))
}

/// Corpo di `values:batchUpdate` per gli aggiornamenti di una riga
pub(crate) fn batch_update_body(sheet: &str, row: usize, updates: &[CellUpdate]) -> serde_json::Value {
    let data: Vec<serde_json::Value> = updates
        .iter()
        .map(|u| {
            json!({
                "range": cell_range(sheet, row, u.column),
                "values": [[u.value.to_json()]]
            })
        })
        .collect();

    json!({
        "valueInputOption": "USER_ENTERED",
        "data": data
    })
}

#[async_trait]
impl QueueSheet for GoogleSheetsStore {
    fn name(&self) -> &str {
        &self.sheet_name
    }

    async fn sheet_exists(&self) -> Result<bool> {
        let token = self.tokens.access_token().await?;
        Ok(self.sheet_titles(&token).await?.iter().any(|t| t == &self.sheet_name))
    }

    async fn ensure_sheet(&self, headers: &[&str]) -> Result<bool> {
        if self.sheet_exists().await? {
            return Ok(false);
        }
        let token = self.tokens.access_token().await?;

        let sheet_id = self.add_sheet(&token).await?;

        let header_range = format!(
            "{}!A1:{}1",
            quote_sheet_name(&self.sheet_name),
            column_letters(headers.len().max(1))
        );
        let response = self
            .client
            .put(self.values_url(&header_range))
            .query(&[("valueInputOption", "RAW")])
            .bearer_auth(&token)
            .json(&json!({ "values": [headers] }))
            .send()
            .await?;
        let _: serde_json::Value = Self::parse(response, "Scrittura intestazione").await?;

        if let Err(e) = self.bold_header(&token, sheet_id).await {
            tracing::warn!("Intestazione non formattata: {}", e);
        }

        tracing::info!("Foglio \"{}\" creato", self.sheet_name);
        Ok(true)
    }

    async fn read_rows(&self) -> Result<Vec<Vec<CellValue>>> {
        let token = self.tokens.access_token().await?;

        let response = self
            .client
            .get(self.values_url(&full_range(&self.sheet_name)))
            .query(&[
                ("valueRenderOption", "UNFORMATTED_VALUE"),
                ("majorDimension", "ROWS"),
            ])
            .bearer_auth(&token)
            .send()
            .await?;

        let range: ValueRange = Self::parse(response, "Lettura foglio").await?;
        Ok(range
            .values
            .iter()
            .map(|row| row.iter().map(CellValue::from_json).collect())
            .collect())
    }

    async fn write_cells(&self, row: usize, updates: &[CellUpdate]) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }
        let token = self.tokens.access_token().await?;

        let response = self
            .client
            .post(format!("{}/values:batchUpdate", self.spreadsheet_url()))
            .bearer_auth(&token)
            .json(&batch_update_body(&self.sheet_name, row, updates))
            .send()
            .await?;

        let _: serde_json::Value = Self::parse(response, "Aggiornamento celle").await?;
        Ok(())
    }

    async fn append_row(&self, values: Vec<CellValue>) -> Result<()> {
        let token = self.tokens.access_token().await?;
        let range = format!("{}!A1", quote_sheet_name(&self.sheet_name));
        let row: Vec<serde_json::Value> = values.iter().map(CellValue::to_json).collect();

        let response = self
            .client
            .post(format!("{}:append", self.values_url(&range)))
            .query(&[
                ("valueInputOption", "USER_ENTERED"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .bearer_auth(&token)
            .json(&json!({ "values": [row] }))
            .send()
            .await?;

        let _: serde_json::Value = Self::parse(response, "Aggiunta riga").await?;
        Ok(())
    }
}
