//! Google Custom Search connector
//!
//! Searches in pages of ten results and can fetch every result page to
//! return its text or raw HTML alongside the snippet.

mod scrape;
mod types;

pub use scrape::page_text;
pub use types::*;

use crate::connector::{execute_each, Connector, Execution};
use crate::connectors::get_builtin;
use crate::definition::DefinitionSet;
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, RequestConfig};
use crate::types::{from_config, from_document, to_document, ConnectionState, Document};
use async_trait::async_trait;
use reqwest::Method;
use std::str::FromStr;
use tracing::{debug, warn};
use uuid::Uuid;

const VENDOR: &str = "Google Search";

/// Supported tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Search,
}

impl FromStr for Task {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "TASK_SEARCH" => Ok(Task::Search),
            other => Err(Error::task_not_supported(other)),
        }
    }
}

/// `(start, num)` of every page needed for `top_k` results
///
/// `start` is 1-based, as Custom Search expects.
pub fn page_ranges(top_k: usize) -> Vec<(usize, usize)> {
    (1..=top_k)
        .step_by(MAX_RESULTS_PER_PAGE)
        .map(|start| (start, (top_k - start + 1).min(MAX_RESULTS_PER_PAGE)))
        .collect()
}

/// Google Search connector
pub struct GoogleSearchConnector {
    definitions: DefinitionSet,
}

impl GoogleSearchConnector {
    /// Load the embedded definitions
    pub fn new() -> Result<Self> {
        Ok(Self {
            definitions: DefinitionSet::from_json("googlesearch", get_builtin("googlesearch")?)?,
        })
    }
}

#[async_trait]
impl Connector for GoogleSearchConnector {
    fn vendor(&self) -> &'static str {
        VENDOR
    }

    fn definitions(&self) -> &DefinitionSet {
        &self.definitions
    }

    fn create_execution(
        &self,
        uid: Uuid,
        task: &str,
        config: &Document,
    ) -> Result<Box<dyn Execution>> {
        self.definitions.by_uid(&uid)?;
        let _task: Task = task.parse()?;
        Ok(Box::new(GoogleSearchExecution {
            config: from_config(config)?,
        }))
    }

    async fn test(&self, uid: Uuid, config: &Document) -> Result<ConnectionState> {
        self.definitions.by_uid(&uid)?;
        let _config: GoogleSearchConfig = from_config(config)?;
        Ok(ConnectionState::Connected)
    }
}

struct GoogleSearchExecution {
    config: GoogleSearchConfig,
}

impl GoogleSearchExecution {
    async fn scrape(
        &self,
        pages: &HttpClient,
        item: SearchItem,
        input: &SearchInput,
    ) -> Option<SearchResult> {
        let mut result = SearchResult {
            title: item.title,
            link: item.link,
            snippet: item.snippet,
            ..SearchResult::default()
        };
        if !input.include_link_text && !input.include_link_html {
            return Some(result);
        }

        let page = match pages
            .send_unchecked(Method::GET, &result.link, RequestConfig::new())
            .await
        {
            Ok(page) => page,
            Err(e) => {
                warn!(link = %result.link, error = %e, "Skipping result that could not be fetched");
                return None;
            }
        };

        let html = page.text();
        if input.include_link_text {
            result.link_text = page_text(&html);
        }
        if input.include_link_html {
            result.link_html = html;
        }
        Some(result)
    }

    async fn run_one(
        &self,
        api: &HttpClient,
        pages: &HttpClient,
        input: Document,
    ) -> Result<Document> {
        let input: SearchInput = from_document(&input)?;
        let top_k = usize::try_from(input.top_k)
            .ok()
            .filter(|k| (1..=MAX_RESULTS).contains(k))
            .ok_or_else(|| Error::input(format!("top_k must be between 1 and {MAX_RESULTS}")))?;

        let mut results = Vec::new();
        for (start, num) in page_ranges(top_k) {
            let request = RequestConfig::new()
                .query("key", &self.config.api_key)
                .query("cx", &self.config.cse_id)
                .query("q", &input.query)
                .query("start", start.to_string())
                .query("num", num.to_string());
            let page: SearchResponse = api
                .request_json(Method::GET, self.config.base_url(), request)
                .await?;
            debug!(start, num, items = page.items.len(), "Fetched search page");

            for item in page.items {
                if let Some(result) = self.scrape(pages, item, &input).await {
                    results.push(result);
                }
            }
        }

        to_document(&SearchOutput { results })
    }
}

#[async_trait]
impl Execution for GoogleSearchExecution {
    async fn execute(&self, inputs: Vec<Document>) -> Result<Vec<Document>> {
        let api = HttpClient::with_config(
            HttpClientConfig::builder()
                .vendor(VENDOR)
                .error_body::<GoogleSearchError>()
                .build(),
        )?;
        let pages = HttpClient::with_config(HttpClientConfig::builder().vendor(VENDOR).build())?;
        execute_each(inputs, |input| self.run_one(&api, &pages, input)).await
    }
}
