//! Search index client.
//!
//! Thin HTTP client over the search index REST API (Elasticsearch dialect).
//! The hot path uses [`SearchClient::search`] and [`SearchClient::count`];
//! the admin operations exist for provisioning and the write mirror.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use crate::config::SearchConfig;

/// Errors from search index operations.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Transport-level failure.
    #[error("search request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The index answered with a non-success status.
    #[error("search index returned {status}: {body}")]
    Index {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The index answered with a body we could not interpret.
    #[error("unexpected search response: {0}")]
    Malformed(String),
}

/// A page of hits plus the per-query total reported by the index.
#[derive(Debug)]
pub struct SearchHits {
    /// The `_source` document of each hit, in ranking order.
    pub documents: Vec<Value>,
    /// Total matching documents (capped by the index's own counting limit,
    /// which is why the listing issues a separate count request).
    pub total: i64,
}

#[derive(Debug, Deserialize)]
struct SearchResponseBody {
    hits: HitsBody,
}

#[derive(Debug, Deserialize)]
struct HitsBody {
    total: TotalBody,
    hits: Vec<HitBody>,
}

#[derive(Debug, Deserialize)]
struct TotalBody {
    value: i64,
}

#[derive(Debug, Deserialize)]
struct HitBody {
    #[serde(rename = "_source")]
    source: Value,
}

#[derive(Debug, Deserialize)]
struct CountResponseBody {
    count: i64,
}

/// Client for the search index REST API.
pub struct SearchClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: SecretString,
}

impl SearchClient {
    /// Build a client from the search configuration.
    ///
    /// # Errors
    ///
    /// Returns `reqwest::Error` if the underlying HTTP client cannot be
    /// constructed.
    pub fn new(config: &SearchConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// Path for a paged search; the index pages natively via `from`/`size`.
    fn search_path(index: &str, from: i64, size: i64) -> String {
        format!("{index}/_search?from={from}&size={size}")
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{path}", self.base_url);
        self.http
            .request(method, url)
            .basic_auth(&self.username, Some(self.password.expose_secret()))
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        builder: reqwest::RequestBuilder,
    ) -> Result<T, SearchError> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Index { status, body });
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| SearchError::Malformed(e.to_string()))
    }

    /// Run a search, paging natively with `from`/`size`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] on transport failure or a non-success index
    /// response. Failures propagate to the caller unmodified.
    #[instrument(skip(self, body))]
    pub async fn search(
        &self,
        index: &str,
        from: i64,
        size: i64,
        body: &Value,
    ) -> Result<SearchHits, SearchError> {
        let response: SearchResponseBody = Self::send_json(
            self.request(reqwest::Method::POST, &Self::search_path(index, from, size))
                .json(body),
        )
        .await?;
        Ok(SearchHits {
            documents: response.hits.hits.into_iter().map(|h| h.source).collect(),
            total: response.hits.total.value,
        })
    }

    /// Count documents matching a query body.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] on transport failure or a non-success index
    /// response.
    #[instrument(skip(self, body))]
    pub async fn count(&self, index: &str, body: &Value) -> Result<i64, SearchError> {
        let response: CountResponseBody = Self::send_json(
            self.request(reqwest::Method::POST, &format!("{index}/_count"))
                .json(body),
        )
        .await?;
        Ok(response.count)
    }

    /// Whether an index exists.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] on transport failure or an unexpected status.
    pub async fn index_exists(&self, index: &str) -> Result<bool, SearchError> {
        let response = self.request(reqwest::Method::HEAD, index).send().await?;
        match response.status() {
            s if s.is_success() => Ok(true),
            reqwest::StatusCode::NOT_FOUND => Ok(false),
            status => Err(SearchError::Index {
                status,
                body: String::new(),
            }),
        }
    }

    /// Create an index with the given settings body.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] on transport failure or a non-success index
    /// response.
    pub async fn create_index(&self, index: &str, settings: &Value) -> Result<(), SearchError> {
        let _: Value =
            Self::send_json(self.request(reqwest::Method::PUT, index).json(settings)).await?;
        Ok(())
    }

    /// Install a field mapping on an existing index.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] on transport failure or a non-success index
    /// response.
    pub async fn put_mapping(&self, index: &str, mapping: &Value) -> Result<(), SearchError> {
        let _: Value = Self::send_json(
            self.request(reqwest::Method::PUT, &format!("{index}/_mapping"))
                .json(mapping),
        )
        .await?;
        Ok(())
    }

    /// Upsert one document by id.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] on transport failure or a non-success index
    /// response.
    #[instrument(skip(self, document))]
    pub async fn index_document(
        &self,
        index: &str,
        id: &str,
        document: &Value,
    ) -> Result<(), SearchError> {
        let _: Value = Self::send_json(
            self.request(reqwest::Method::PUT, &format!("{index}/_doc/{id}"))
                .json(document),
        )
        .await?;
        Ok(())
    }

    /// Delete one document by id; absent documents are not an error.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] on transport failure or an unexpected status.
    pub async fn delete_document(&self, index: &str, id: &str) -> Result<(), SearchError> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("{index}/_doc/{id}"))
            .send()
            .await?;
        match response.status() {
            s if s.is_success() || s == reqwest::StatusCode::NOT_FOUND => Ok(()),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(SearchError::Index { status, body })
            }
        }
    }

    /// Make sure the orders index exists with its date mapping installed.
    ///
    /// Idempotent; called once at startup when the search path is enabled.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] when the index cannot be created or mapped.
    pub async fn ensure_orders_index(&self, index: &str) -> Result<(), SearchError> {
        if self.index_exists(index).await? {
            return Ok(());
        }
        tracing::info!(index, "creating orders search index");
        self.create_index(index, &serde_json::json!({})).await?;
        self.put_mapping(
            index,
            &serde_json::json!({
                "properties": {
                    "creation_tsz": { "type": "date" },
                    "expected_ship_date": { "type": "date" },
                    "shop_id": { "type": "long" },
                    "seller_account_id": { "type": "long" }
                }
            }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_path_pages_with_from_and_size() {
        assert_eq!(
            SearchClient::search_path("orders", 200, 50),
            "orders/_search?from=200&size=50"
        );
        assert_eq!(
            SearchClient::search_path("orders", 0, 100),
            "orders/_search?from=0&size=100"
        );
    }
}
