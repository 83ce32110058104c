//! HTTP implementation of [`PageSource`] against the archive's geodata API.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use crate::config::DatabaseConfig;
use crate::error::{SourceError, SourceResult};
use crate::fetcher::{PageQuery, PageResponse, PageSource};

/// Pages through `GET {base_url}/api/geodata`.
pub struct HttpPageSource {
    client: Client,
    endpoint: String,
    default_params: BTreeMap<String, String>,
}

impl HttpPageSource {
    pub fn new(config: &DatabaseConfig) -> SourceResult<Self> {
        if config.base_url.trim().is_empty() {
            return Err(SourceError::Config("base_url is empty".to_string()));
        }

        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/geodata", config.base_url.trim_end_matches('/')),
            default_params: config.default_params.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Query string for a page. Configured default params fill in first, so
    /// they can add filters but never override bounds, time range or paging.
    pub fn query_params(&self, query: &PageQuery) -> BTreeMap<String, String> {
        let mut params = self.default_params.clone();
        params.insert("min_lat".to_string(), query.bounds.min_lat.to_string());
        params.insert("min_lon".to_string(), query.bounds.min_lon.to_string());
        params.insert("max_lat".to_string(), query.bounds.max_lat.to_string());
        params.insert("max_lon".to_string(), query.bounds.max_lon.to_string());
        if let Some(range) = &query.time_range {
            params.insert("start_year".to_string(), range.start.clone());
            params.insert("end_year".to_string(), range.end.clone());
        }
        if let Some(kind) = &query.record_kind {
            params.insert("recordtypes".to_string(), kind.clone());
        }
        params.insert("page".to_string(), query.page.to_string());
        params.insert("page_size".to_string(), query.page_size.to_string());
        params
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    #[instrument(skip(self, query), fields(page = query.page))]
    async fn fetch_page(&self, query: &PageQuery) -> SourceResult<PageResponse> {
        let params = self.query_params(query);
        debug!(url = %self.endpoint, "Requesting page");

        let response = self.client.get(&self.endpoint).query(&params).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
