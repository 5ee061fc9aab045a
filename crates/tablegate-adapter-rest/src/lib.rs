//! # tablegate-adapter-rest
//!
//! The managed backend: a PostgREST-style row API at `{service_url}/rest/v1/`.
//! Row operations map to `GET`/`POST`/`PATCH`/`DELETE` on `/{table}`; schema
//! questions are answered from the OpenAPI document served at the API root.
//!
//! Every request carries the service key as `apikey` and as a bearer token.
//! A `schema.table` name targets `/{table}` with the schema selected through
//! the `Accept-Profile` (reads) or `Content-Profile` (writes) header.
//!
//! The OpenAPI document is kept for [`SCHEMA_DOCUMENT_TTL`] so a schema
//! summary over many tables fetches it once.

mod openapi;
mod request;

use async_trait::async_trait;
use openapi::OpenApiDocument;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tablegate_core::{
    BackendSource, Filters, ForeignKeyRef, GatewayError, Record, TableDescriptor,
};
use tablegate_runtime::{DataClient, SchemaBackend, SelectQuery};
use url::Url;

const REST_PATH: &str = "rest/v1/";

/// How long a fetched OpenAPI document answers schema questions.
pub const SCHEMA_DOCUMENT_TTL: Duration = Duration::from_secs(30);

type CachedDocument = Option<(Instant, Arc<OpenApiDocument>)>;

/// HTTP client for the managed row API.
#[derive(Clone)]
pub struct RestClient {
    http: Client,
    base: Url,
    timeout: Duration,
    document: Arc<Mutex<CachedDocument>>,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base", &self.base.as_str())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl RestClient {
    /// Build a client. No request is made until the first operation.
    pub fn new(service_url: &str, service_key: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let base = rest_base(service_url)?;

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(service_key)
            .map_err(|_| GatewayError::configuration("service key contains invalid header characters"))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", service_key))
            .map_err(|_| GatewayError::configuration("service key contains invalid header characters"))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let http = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base,
            timeout,
            document: Arc::new(Mutex::new(None)),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn table_url(&self, table: &str) -> Result<Url, GatewayError> {
        self.base
            .join(table)
            .map_err(|e| GatewayError::validation(format!("invalid table name '{}': {}", table, e)))
    }

    fn request(&self, method: Method, table: &str) -> Result<RequestBuilder, GatewayError> {
        let (schema, name) = split_qualified(table);
        let url = self.table_url(name)?;
        tracing::debug!(method = %method, url = %url, schema = ?schema, "Managed request");

        let profile_header = if method == Method::GET || method == Method::HEAD {
            "Accept-Profile"
        } else {
            "Content-Profile"
        };
        let builder = self.http.request(method, url);
        Ok(match schema {
            Some(schema) => builder.header(profile_header, schema),
            None => builder,
        })
    }

    /// Send a request and decode a JSON array of rows.
    async fn rows(&self, operation: &str, request: RequestBuilder) -> Result<Vec<Record>, GatewayError> {
        let response = request
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, operation, self.timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| map_reqwest_error(e, operation, self.timeout))?;

        if !status.is_success() {
            tracing::warn!(operation, status = %status, "Managed request failed");
            return Err(status_error(status, &body));
        }
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str::<Value>(&body) {
            Ok(Value::Array(items)) => Ok(items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect()),
            Ok(Value::Object(map)) => Ok(vec![map]),
            Ok(other) => Err(GatewayError::backend(format!(
                "unexpected response from managed service: {}",
                other
            ))),
            Err(e) => Err(GatewayError::backend(format!(
                "managed service returned invalid JSON: {}",
                e
            ))),
        }
    }

    /// The OpenAPI root document, refetched once [`SCHEMA_DOCUMENT_TTL`] has passed.
    async fn openapi(&self) -> Result<Arc<OpenApiDocument>, GatewayError> {
        if let Some(document) = self.cached_document() {
            return Ok(document);
        }

        let document = Arc::new(self.fetch_openapi().await?);
        if let Ok(mut cached) = self.document.lock() {
            *cached = Some((Instant::now(), Arc::clone(&document)));
        }
        Ok(document)
    }

    fn cached_document(&self) -> Option<Arc<OpenApiDocument>> {
        let cached = self.document.lock().ok()?;
        cached
            .as_ref()
            .filter(|(fetched, _)| fetched.elapsed() < SCHEMA_DOCUMENT_TTL)
            .map(|(_, document)| Arc::clone(document))
    }

    async fn fetch_openapi(&self) -> Result<OpenApiDocument, GatewayError> {
        tracing::debug!(url = %self.base, "Fetching managed schema document");
        let response = self
            .http
            .get(self.base.clone())
            .header("Accept", "application/openapi+json")
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, "schema document", self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = %status, "Managed schema document unavailable");
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let document: Value = response.json().await.map_err(|e| {
            GatewayError::unsupported(format!("service schema document is not JSON: {}", e))
        })?;
        OpenApiDocument::parse(document)
    }
}

/// `public.users` -> `(Some("public"), "users")`.
fn split_qualified(table: &str) -> (Option<&str>, &str) {
    match table.split_once('.') {
        Some((schema, name)) => (Some(schema), name),
        None => (None, table),
    }
}

/// `{service_url}/rest/v1/`, validated as an absolute http(s) URL.
fn rest_base(service_url: &str) -> Result<Url, GatewayError> {
    let mut url = Url::parse(service_url)
        .map_err(|e| GatewayError::configuration(format!("invalid service URL: {}", e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(GatewayError::configuration(format!(
            "service URL must use http or https, got '{}'",
            url.scheme()
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.join(REST_PATH)
        .map_err(|e| GatewayError::configuration(format!("invalid service URL: {}", e)))
}

fn status_error(status: StatusCode, body: &str) -> GatewayError {
    // Error bodies look like {"code": "...", "message": "...", "details": ..., "hint": ...}
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(String::from))
        .unwrap_or_else(|| body.trim().to_string());

    let message = if message.is_empty() {
        format!("managed service responded with {}", status)
    } else {
        format!("managed service responded with {}: {}", status, message)
    };

    if status == StatusCode::NOT_FOUND {
        GatewayError::not_found(message)
    } else {
        GatewayError::backend(message)
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error, operation: &str, timeout: Duration) -> GatewayError {
    if err.is_timeout() {
        GatewayError::timeout(format!("managed {}", operation), timeout)
    } else if err.is_connect() {
        GatewayError::connection(format!("managed service unreachable: {}", err))
    } else {
        GatewayError::backend(format!("managed {} failed: {}", operation, err))
    }
}

#[async_trait]
impl DataClient for RestClient {
    async fn select(&self, query: &SelectQuery) -> Result<Vec<Record>, GatewayError> {
        let request = self
            .request(Method::GET, &query.table)?
            .query(&request::select_params(query));
        self.rows("select", request).await
    }

    async fn insert(&self, table: &str, records: &[Record]) -> Result<Vec<Record>, GatewayError> {
        let request = self
            .request(Method::POST, table)?
            .header("Prefer", "return=representation")
            .json(records);
        self.rows("insert", request).await
    }

    async fn update(
        &self,
        table: &str,
        filters: &Filters,
        values: &Record,
    ) -> Result<Vec<Record>, GatewayError> {
        let request = self
            .request(Method::PATCH, table)?
            .header("Prefer", "return=representation")
            .query(&request::filter_params(filters))
            .json(values);
        self.rows("update", request).await
    }

    async fn delete(&self, table: &str, filters: &Filters) -> Result<Vec<Record>, GatewayError> {
        let request = self
            .request(Method::DELETE, table)?
            .header("Prefer", "return=representation")
            .query(&request::filter_params(filters));
        self.rows("delete", request).await
    }
}

#[async_trait]
impl SchemaBackend for RestClient {
    fn source(&self) -> BackendSource {
        BackendSource::Managed
    }

    async fn list_tables(&self) -> Result<Vec<String>, GatewayError> {
        self.openapi().await?.table_names()
    }

    async fn describe_table(&self, table: &str) -> Result<TableDescriptor, GatewayError> {
        self.openapi().await?.describe(table)
    }

    async fn get_relationships(
        &self,
        table: Option<&str>,
    ) -> Result<Vec<ForeignKeyRef>, GatewayError> {
        self.openapi().await?.relationships(table)
    }
}
