//! Blocking Elasticsearch client over the shared reqwest runtime

use anyhow::Result;
use docline_core::path::Document;
use docline_core::{
    BackendError, Cursor, CursorFields, Page, SHARED_RUNTIME, SearchBackend, http_client,
};
use serde_json::Value;

use crate::config::{Auth, ElasticConfig};
use crate::query::{count_body, cursor_sort, search_body};

/// Longest error body kept in a message
const MAX_ERROR_BODY: usize = 300;

/// One index pattern with a fixed base filter.
#[derive(Debug)]
pub struct ElasticBackend {
    base_url: String,
    index: String,
    auth: Auth,
    base_query: Value,
    page_size: usize,
    fields: CursorFields,
}

impl ElasticBackend {
    /// Resolve credentials and the base query up front so a bad config fails
    /// before the run starts.
    pub fn new(config: &ElasticConfig, fields: CursorFields) -> Result<Self> {
        anyhow::ensure!(config.page_size > 0, "elastic.page_size must be positive");
        let base_query = config.base_query()?;
        if let Some(sort) = base_query.get("sort") {
            let cursor = cursor_sort(&fields);
            if *sort != cursor {
                log::warn!("Base query sort {sort} replaced by cursor sort {cursor}");
            }
        }
        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            index: config.index.clone(),
            auth: config.auth()?,
            base_query,
            page_size: config.page_size,
            fields,
        })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn base_query(&self) -> &Value {
        &self.base_query
    }

    fn endpoint(&self, api: &str) -> String {
        format!("{}/{}/{api}", self.base_url, self.index)
    }

    /// POST a JSON body and decode the JSON answer.
    fn post(&self, api: &str, body: &Value) -> Result<Value, BackendError> {
        let url = self.endpoint(api);
        log::debug!("POST {api} on {}: {body}", self.index);
        SHARED_RUNTIME.handle().block_on(async {
            let mut request = http_client().post(&url).json(body);
            request = match &self.auth {
                Auth::None => request,
                Auth::Basic { username, password } => request.basic_auth(username, Some(password)),
                Auth::ApiKey(key) => request.header("Authorization", format!("ApiKey {key}")),
            };
            let response = request.send().await.map_err(BackendError::from_reqwest)?;
            let status = response.status();
            let text = response.text().await.map_err(BackendError::from_reqwest)?;
            if !status.is_success() {
                return Err(BackendError::Http {
                    status: Some(status.as_u16()),
                    message: error_reason(&text),
                });
            }
            serde_json::from_str(&text)
                .map_err(|e| BackendError::Decode(format!("{api} response: {e}")))
        })
    }
}

impl SearchBackend for ElasticBackend {
    fn count(&self) -> Result<u64, BackendError> {
        let response = self.post("_count", &count_body(&self.base_query))?;
        parse_count(&response)
    }

    fn search(&self, after: Option<&Cursor>) -> Result<Page, BackendError> {
        let body = search_body(&self.base_query, self.page_size, &self.fields, after);
        let response = self.post("_search", &body)?;
        parse_search_response(response)
    }
}

/// `{"count": N}`
pub fn parse_count(response: &Value) -> Result<u64, BackendError> {
    response
        .get("count")
        .and_then(Value::as_u64)
        .ok_or_else(|| BackendError::Decode("_count response has no numeric 'count'".to_string()))
}

/// `hits.hits[]._source` of a search response, in hit order, plus the last
/// hit's `sort` values.
///
/// A hit without an object `_source` (e.g. `_source` disabled) becomes an
/// empty document.
pub fn parse_search_response(mut response: Value) -> Result<Page, BackendError> {
    let hits = match response.pointer_mut("/hits/hits").map(Value::take) {
        Some(Value::Array(hits)) => hits,
        _ => {
            return Err(BackendError::Decode(
                "_search response has no 'hits.hits' array".to_string(),
            ));
        }
    };
    let last_sort = hits
        .last()
        .and_then(|hit| hit.get("sort"))
        .and_then(Cursor::from_sort_values);
    let documents = hits
        .into_iter()
        .map(|mut hit| match hit.get_mut("_source").map(Value::take) {
            Some(Value::Object(source)) => source,
            _ => {
                log::debug!("Hit without object _source, keeping an empty document");
                Document::new()
            }
        })
        .collect();
    Ok(Page {
        documents,
        last_sort,
    })
}

/// Short reason from an Elasticsearch error body
fn error_reason(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        let error = &json["error"];
        if let (Some(kind), Some(reason)) = (error["type"].as_str(), error["reason"].as_str()) {
            return format!("{kind}: {reason}");
        }
        if let Some(message) = error.as_str() {
            return message.to_string();
        }
    }
    let mut text: String = body.chars().take(MAX_ERROR_BODY).collect();
    if text.len() < body.len() {
        text.push_str("...");
    }
    text
}
