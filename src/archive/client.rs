use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;

use super::record::ImageRecord;
use crate::dates;
use crate::error::RetrievalError;

/// Read-only access to the date-indexed archive
///
/// Implementations never retry: any failure is terminal for that call.
#[async_trait]
pub trait ImageService: Send + Sync {
    /// Fetch the record published on `date`
    async fn fetch_single(&self, date: NaiveDate) -> Result<ImageRecord, RetrievalError>;

    /// Fetch every record in `[start, end]` the archive has, oldest first
    ///
    /// The result may be shorter than the span: the archive has gaps and
    /// nothing for days it has not published yet.
    async fn fetch_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ImageRecord>, RetrievalError>;
}

/// HTTP client for the archive API
#[derive(Clone, Debug)]
pub struct ArchiveClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ArchiveClient {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self, RetrievalError> {
        let client = Client::builder().timeout(timeout).build()?;

        log::info!("[ArchiveClient] Creating archive client for {}", base_url);

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Underlying HTTP client, shared with the preview loader
    pub fn http(&self) -> &Client {
        &self.client
    }

    /// `?api_key=..&date=YYYY-MM-DD&thumbs=true`
    pub fn single_url(&self, date: NaiveDate) -> Result<Url, RetrievalError> {
        self.build_url(&[("date", dates::format(date))])
    }

    /// `?api_key=..&start_date=..&end_date=..&thumbs=true`
    pub fn range_url(&self, start: NaiveDate, end: NaiveDate) -> Result<Url, RetrievalError> {
        self.build_url(&[
            ("start_date", dates::format(start)),
            ("end_date", dates::format(end)),
        ])
    }

    fn build_url(&self, params: &[(&str, String)]) -> Result<Url, RetrievalError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| RetrievalError::Transport(format!("invalid archive URL {}: {}", self.base_url, e)))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("api_key", &self.api_key);
            for (key, value) in params {
                query.append_pair(key, value);
            }
            query.append_pair("thumbs", "true");
        }
        Ok(url)
    }

    /// Send a GET and return the body of a successful response
    async fn get_text(&self, url: Url) -> Result<String, RetrievalError> {
        let shown = redact_key(&url);
        log::debug!("[ArchiveClient] GET {}", shown);

        let response = self.client.get(url).send().await?;

        match response.status() {
            status if status.is_success() => Ok(response.text().await?),
            StatusCode::TOO_MANY_REQUESTS => {
                log::warn!("[ArchiveClient] Rate limited by archive: {}", shown);
                Err(RetrievalError::Status {
                    status: StatusCode::TOO_MANY_REQUESTS.as_u16(),
                    url: shown,
                })
            }
            status => {
                log::warn!("[ArchiveClient] {} returned {}", shown, status);
                Err(RetrievalError::Status {
                    status: status.as_u16(),
                    url: shown,
                })
            }
        }
    }
}

#[async_trait]
impl ImageService for ArchiveClient {
    async fn fetch_single(&self, date: NaiveDate) -> Result<ImageRecord, RetrievalError> {
        let body = self.get_text(self.single_url(date)?).await?;
        parse_single(&body)
    }

    async fn fetch_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ImageRecord>, RetrievalError> {
        let body = self.get_text(self.range_url(start, end)?).await?;
        parse_range(&body)
    }
}

/// Decode a single-date response body
pub fn parse_single(body: &str) -> Result<ImageRecord, RetrievalError> {
    Ok(serde_json::from_str(body)?)
}

/// Decode a range response body, ordered by date
pub fn parse_range(body: &str) -> Result<Vec<ImageRecord>, RetrievalError> {
    let mut records: Vec<ImageRecord> = serde_json::from_str(body)?;
    records.sort_by_key(|record| record.date);
    Ok(records)
}

/// Render a URL for logs and errors without the credential
fn redact_key(url: &Url) -> String {
    let mut shown = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "api_key" { "***".to_string() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    shown.query_pairs_mut().clear().extend_pairs(pairs);
    shown.to_string()
}
