//! Spreadsheet web-app source.

use std::time::Duration;

use serde_json::Value;

use super::{decode_rows, RowSource, SourceError};
use crate::telemetry::RawRow;

/// Fetches rows from a spreadsheet published as a JSON web app.
#[derive(Debug, Clone)]
pub struct SheetSource {
    url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl SheetSource {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Config(e.to_string()))?;

        Ok(Self {
            url: url.trim().to_string(),
            timeout,
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> Result<Vec<RawRow>, SourceError> {
        if self.url.is_empty() {
            return Err(SourceError::Config("sheet URL is not set".to_string()));
        }

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| self.map_request_error(e))?;

        decode_rows(payload)
    }

    fn map_request_error(&self, e: reqwest::Error) -> SourceError {
        if e.is_timeout() {
            SourceError::Timeout(self.timeout)
        } else if e.is_builder() {
            SourceError::Config(e.to_string())
        } else if e.is_decode() {
            SourceError::Decode(e.to_string())
        } else {
            SourceError::Network(e.to_string())
        }
    }
}

impl RowSource for SheetSource {
    async fn fetch_rows(&self) -> Result<Vec<RawRow>, SourceError> {
        let rows = self.fetch().await?;
        tracing::debug!("Fetched {} rows from sheet", rows.len());
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_url_is_config_error() {
        let source = SheetSource::new("  ", Duration::from_millis(100)).unwrap();
        let result = source.fetch_rows().await;
        assert!(matches!(result, Err(SourceError::Config(_))));
    }

    #[tokio::test]
    async fn test_malformed_url_is_config_error() {
        let source = SheetSource::new("not a url", Duration::from_millis(100)).unwrap();
        let result = source.fetch_rows().await;
        assert!(matches!(result, Err(SourceError::Config(_))));
    }
}
