//! PostgREST table client for chess-trainer
//!
//! A small by-value query builder over the Supabase REST endpoint
//! (`/rest/v1/<table>`). It covers what the trainer needs from its tables:
//!
//! - reads with column selection, filters, ordering and pagination
//! - `insert`, `update`, `upsert` and `delete` returning the affected rows
//! - structured decoding of PostgREST error bodies

use log::debug;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use url::Url;

/// Error body returned by PostgREST (`{"code", "message", "details", "hint"}`)
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct PostgrestApiErrorDetails {
    pub code: Option<String>,
    pub message: Option<String>,
    pub details: Option<String>,
    pub hint: Option<String>,
}

impl fmt::Display for PostgrestApiErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(code) = &self.code {
            parts.push(format!("Code: {}", code));
        }
        if let Some(message) = &self.message {
            parts.push(format!("Message: {}", message));
        }
        if let Some(details) = &self.details {
            parts.push(format!("Details: {}", details));
        }
        if let Some(hint) = &self.hint {
            parts.push(format!("Hint: {}", hint));
        }
        write!(f, "{}", parts.join(", "))
    }
}

#[derive(Error, Debug)]
pub enum PostgrestError {
    #[error("API error: {details} (Status: {status})")]
    ApiError {
        details: PostgrestApiErrorDetails,
        status: StatusCode,
    },

    #[error("API error (unparsed): {message} (Status: {status})")]
    UnparsedApiError { message: String, status: StatusCode },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}

impl PostgrestError {
    /// HTTP status of the failed request, when the server answered at all
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            PostgrestError::ApiError { status, .. } => Some(*status),
            PostgrestError::UnparsedApiError { status, .. } => Some(*status),
            PostgrestError::NetworkError(e) => e.status(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        }
    }
}

/// Client bound to a single table.
///
/// Every builder method consumes and returns the client, so a query reads as
/// one chain ending in `execute`, `execute_one` or a mutation.
#[derive(Debug, Clone)]
pub struct PostgrestClient {
    base_url: String,
    table: String,
    http_client: Client,
    headers: HeaderMap,
    query_params: Vec<(String, String)>,
}

impl PostgrestClient {
    pub fn new(base_url: &str, api_key: &str, table: &str, http_client: Client) -> Self {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(api_key) {
            headers.insert("apikey", value);
        }
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            table: table.to_string(),
            http_client,
            headers,
            query_params: Vec::new(),
        }
    }

    /// Name of the table this client targets
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Result<Self, PostgrestError> {
        let header_value = HeaderValue::from_str(value).map_err(|_| {
            PostgrestError::InvalidParameters(format!("Invalid header value: {}", value))
        })?;
        let header_name = HeaderName::from_bytes(key.as_bytes()).map_err(|_| {
            PostgrestError::InvalidParameters(format!("Invalid header name: {}", key))
        })?;

        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    /// Send requests as the given user so row-level security applies to them
    pub fn with_auth(self, token: &str) -> Result<Self, PostgrestError> {
        self.with_header("Authorization", &format!("Bearer {}", token))
    }

    pub fn select(self, columns: &str) -> Self {
        self.set_param("select", columns.to_string())
    }

    pub fn eq<V: ToString>(self, column: &str, value: V) -> Self {
        self.push_filter(column, "eq", value.to_string())
    }

    pub fn gte<V: ToString>(self, column: &str, value: V) -> Self {
        self.push_filter(column, "gte", value.to_string())
    }

    pub fn lte<V: ToString>(self, column: &str, value: V) -> Self {
        self.push_filter(column, "lte", value.to_string())
    }

    pub fn order(self, column: &str, order: SortOrder) -> Self {
        self.set_param("order", format!("{}.{}", column, order.as_str()))
    }

    pub fn limit(self, count: usize) -> Self {
        self.set_param("limit", count.to_string())
    }

    pub fn offset(self, count: usize) -> Self {
        self.set_param("offset", count.to_string())
    }

    /// Inclusive row window, `range(0, 9)` being the first ten rows
    pub fn range(self, from: usize, to: usize) -> Self {
        let count = to.saturating_sub(from) + 1;
        self.offset(from).limit(count)
    }

    /// Run a read and deserialize every returned row
    pub async fn execute<T: DeserializeOwned>(&self) -> Result<Vec<T>, PostgrestError> {
        let response = self.send(Method::GET, None, None).await?;
        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| PostgrestError::DeserializationError(e.to_string()))
    }

    /// Run a read limited to one row; `None` when nothing matched
    pub async fn execute_one<T: DeserializeOwned>(&self) -> Result<Option<T>, PostgrestError> {
        let rows = self.clone().limit(1).execute::<T>().await?;
        Ok(rows.into_iter().next())
    }

    pub async fn insert<T: Serialize>(&self, values: T) -> Result<Value, PostgrestError> {
        let body = serde_json::to_value(values)?;
        let response = self
            .send(Method::POST, Some(body), Some("return=representation"))
            .await?;
        read_json_body(response).await
    }

    pub async fn update<T: Serialize>(&self, values: T) -> Result<Value, PostgrestError> {
        let body = serde_json::to_value(values)?;
        let response = self
            .send(Method::PATCH, Some(body), Some("return=representation"))
            .await?;
        read_json_body(response).await
    }

    /// Insert, merging into existing rows that collide on `on_conflict`
    pub async fn upsert<T: Serialize>(
        &self,
        values: T,
        on_conflict: Option<&str>,
    ) -> Result<Value, PostgrestError> {
        let body = serde_json::to_value(values)?;
        let client = match on_conflict {
            Some(columns) => self.clone().set_param("on_conflict", columns.to_string()),
            None => self.clone(),
        };
        let response = client
            .send(
                Method::POST,
                Some(body),
                Some("resolution=merge-duplicates,return=representation"),
            )
            .await?;
        read_json_body(response).await
    }

    pub async fn delete(&self) -> Result<Value, PostgrestError> {
        let response = self
            .send(Method::DELETE, None, Some("return=representation"))
            .await?;
        read_json_body(response).await
    }

    fn set_param(mut self, key: &str, value: String) -> Self {
        self.query_params.retain(|(k, _)| k != key);
        self.query_params.push((key.to_string(), value));
        self
    }

    fn push_filter(mut self, column: &str, operator: &str, value: String) -> Self {
        self.query_params
            .push((column.to_string(), format!("{}.{}", operator, value)));
        self
    }

    fn build_url(&self) -> Result<Url, PostgrestError> {
        let mut url = Url::parse(&format!("{}/rest/v1/{}", self.base_url, self.table))?;
        if !self.query_params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.query_params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        body: Option<Value>,
        prefer: Option<&'static str>,
    ) -> Result<Response, PostgrestError> {
        let url = self.build_url()?;
        debug!("{} {}", method, url);

        let mut headers = self.headers.clone();
        if let Some(prefer) = prefer {
            headers.insert(
                HeaderName::from_static("prefer"),
                HeaderValue::from_static(prefer),
            );
        }

        let mut request = self.http_client.request(method, url).headers(headers);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response)
    }
}

async fn error_from_response(response: Response) -> PostgrestError {
    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error response".to_string());

    match serde_json::from_str::<PostgrestApiErrorDetails>(&error_text) {
        Ok(details) => PostgrestError::ApiError { details, status },
        Err(_) => PostgrestError::UnparsedApiError {
            message: error_text,
            status,
        },
    }
}

// Mutations may answer 204 with an empty body.
async fn read_json_body(response: Response) -> Result<Value, PostgrestError> {
    let body_text = response.text().await.map_err(|e| {
        PostgrestError::DeserializationError(format!("Failed to read response body: {}", e))
    })?;

    if body_text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str::<Value>(&body_text)
        .map_err(|e| PostgrestError::DeserializationError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, table: &str) -> PostgrestClient {
        PostgrestClient::new(&server.uri(), "fake-key", table, reqwest::Client::new())
    }

    #[tokio::test]
    async fn test_select_with_filter_and_order() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/puzzles"))
            .and(query_param("select", "*"))
            .and(query_param("difficulty", "eq.3"))
            .and(query_param("order", "id.asc"))
            .and(header("apikey", "fake-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 4, "difficulty": 3 },
                { "id": 9, "difficulty": 3 }
            ])))
            .mount(&mock_server)
            .await;

        let result = client(&mock_server, "puzzles")
            .select("*")
            .eq("difficulty", 3)
            .order("id", SortOrder::Ascending)
            .execute::<Value>()
            .await;

        assert!(result.is_ok());
        let rows = result.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("id").and_then(Value::as_i64), Some(9));
    }

    #[tokio::test]
    async fn test_range_sets_offset_and_limit() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/puzzles"))
            .and(query_param("offset", "10"))
            .and(query_param("limit", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let rows = client(&mock_server, "puzzles")
            .select("*")
            .range(10, 19)
            .execute::<Value>()
            .await
            .unwrap();

        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_execute_one_returns_none_when_empty() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/profiles"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&mock_server)
            .await;

        let row = client(&mock_server, "profiles")
            .select("*")
            .eq("id", "missing")
            .execute_one::<Value>()
            .await
            .unwrap();

        assert!(row.is_none());
    }

    #[tokio::test]
    async fn test_update_sends_patch_with_filter() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .and(path("/rest/v1/profiles"))
            .and(query_param("id", "eq.abc"))
            .and(header("prefer", "return=representation"))
            .and(header("authorization", "Bearer user-token"))
            .and(body_json(json!({ "bio": "Endgame fan" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{ "id": "abc", "bio": "Endgame fan" }])),
            )
            .mount(&mock_server)
            .await;

        let result = client(&mock_server, "profiles")
            .with_auth("user-token")
            .unwrap()
            .eq("id", "abc")
            .update(json!({ "bio": "Endgame fan" }))
            .await
            .unwrap();

        assert_eq!(result[0]["bio"], "Endgame fan");
    }

    #[tokio::test]
    async fn test_insert_empty_body_is_null() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/user_progress"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&mock_server)
            .await;

        let result = client(&mock_server, "user_progress")
            .insert(json!({ "puzzle_id": "1", "solved": true }))
            .await
            .unwrap();

        assert_eq!(result, Value::Null);
    }

    #[tokio::test]
    async fn test_upsert_sets_conflict_target() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/user_progress"))
            .and(query_param("on_conflict", "user_id,puzzle_id"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([{ "id": 1 }])))
            .mount(&mock_server)
            .await;

        let result = client(&mock_server, "user_progress")
            .upsert(json!({ "user_id": "u", "puzzle_id": "p" }), Some("user_id,puzzle_id"))
            .await
            .unwrap();

        assert_eq!(result[0]["id"], 1);
    }

    #[tokio::test]
    async fn test_delete_with_filter() {
        let mock_server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/rest/v1/user_progress"))
            .and(query_param("id", "eq.7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 7 }])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = client(&mock_server, "user_progress")
            .eq("id", 7)
            .delete()
            .await
            .unwrap();

        assert_eq!(result[0]["id"], 7);
    }

    #[tokio::test]
    async fn test_api_error_details_are_parsed() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/puzzles"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "code": "42P01",
                "message": "relation \"public.puzzles\" does not exist",
                "details": null,
                "hint": null
            })))
            .mount(&mock_server)
            .await;

        let err = client(&mock_server, "puzzles")
            .select("id")
            .execute::<Value>()
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        match err {
            PostgrestError::ApiError { details, .. } => {
                assert_eq!(details.code.as_deref(), Some("42P01"));
            }
            other => panic!("expected ApiError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unparsed_error_keeps_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/puzzles"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&mock_server)
            .await;

        let err = client(&mock_server, "puzzles")
            .execute::<Value>()
            .await
            .unwrap_err();

        match err {
            PostgrestError::UnparsedApiError { message, status } => {
                assert_eq!(message, "bad gateway");
                assert_eq!(status, StatusCode::BAD_GATEWAY);
            }
            other => panic!("expected UnparsedApiError, got {:?}", other),
        }
    }

    #[test]
    fn test_repeated_filters_on_one_column_are_kept() {
        let client = PostgrestClient::new(
            "http://localhost:54321/",
            "fake-key",
            "puzzles",
            reqwest::Client::new(),
        )
        .gte("difficulty", 2)
        .lte("difficulty", 4)
        .limit(5)
        .limit(10);

        let url = client.build_url().unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert_eq!(url.path(), "/rest/v1/puzzles");
        assert!(pairs.contains(&("difficulty".to_string(), "gte.2".to_string())));
        assert!(pairs.contains(&("difficulty".to_string(), "lte.4".to_string())));
        assert_eq!(pairs.iter().filter(|(k, _)| k == "limit").count(), 1);
        assert!(pairs.contains(&("limit".to_string(), "10".to_string())));
    }
}
