//! Marketaux news adapter.
//!
//! API: `GET {base}/news/all`
//! Auth: `api_token` query parameter.

use crate::error::ProviderError;
use crate::models::{ArticleCandidate, UNTITLED};
use crate::providers::NewsProvider;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

pub const PROVIDER_NAME: &str = "marketaux";

const TITLE_FIELDS: &[&str] = &["title", "description", "headline"];
const ID_FIELDS: &[&str] = &["uuid", "id", "uid"];
const SOURCE_FIELDS: &[&str] = &["source", "source_name"];
const TEXT_FIELDS: &[&str] = &["description", "snippet"];

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

const ERROR_BODY_PREVIEW: usize = 200;

/// Marketaux client
pub struct MarketauxProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl MarketauxProvider {
    pub fn new(
        api_key: Option<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn raw_search(
        &self,
        api_key: &str,
        query: &str,
        country: &str,
        limit: usize,
        published_after: Option<DateTime<Utc>>,
    ) -> Result<Value, ProviderError> {
        let mut params: Vec<(&str, String)> = vec![
            ("api_token", api_key.to_string()),
            ("search", query.to_string()),
            ("limit", limit.to_string()),
            ("countries", country.to_lowercase()),
            ("filter_entities", "false".to_string()),
            ("group_similar", "true".to_string()),
        ];

        if let Some(after) = published_after {
            params.push(("published_after", format_published_after(after)));
        }

        let url = format!("{}/news/all", self.base_url);
        let response = self.client.get(&url).query(&params).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let preview: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
            warn!(status = status.as_u16(), body = %preview, "Marketaux search failed");
            return Err(match status.as_u16() {
                401 | 403 => ProviderError::Auth(preview),
                code => ProviderError::Status {
                    status: code,
                    body: preview,
                },
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| ProviderError::Decode(e.to_string()))
    }
}

#[async_trait]
impl NewsProvider for MarketauxProvider {
    async fn search(
        &self,
        query: &str,
        country: &str,
        limit: usize,
        published_after: Option<DateTime<Utc>>,
    ) -> Result<Vec<ArticleCandidate>, ProviderError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(Vec::new());
        };

        let country = if country.trim().is_empty() { "IN" } else { country.trim() };
        let body = self
            .raw_search(api_key, query, country, limit, published_after)
            .await?;

        let records = extract_records(body);
        debug!(query, count = records.len(), "Marketaux returned records");

        Ok(records
            .iter()
            .map(|record| normalize(record, country))
            .collect())
    }
}

/// Marketaux takes `YYYY-MM-DDTHH:MM:SS` without fraction or zone
pub fn format_published_after(after: DateTime<Utc>) -> String {
    after.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Records live under `data`; a bare array is accepted; anything else is empty
pub fn extract_records(body: Value) -> Vec<Value> {
    match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}

/// First field holding a non-empty string (or a number, for ids)
fn first_text(record: &Value, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| match record.get(*field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Parse RFC 3339, or a naive timestamp taken as UTC
pub fn parse_published_at(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

/// Flatten entities to names; objects contribute their `name`
fn normalize_entities(record: &Value) -> Vec<String> {
    let Some(Value::Array(items)) = record.get("entities") else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Object(obj) => obj
                .get("name")
                .and_then(Value::as_str)
                .map(|name| name.trim().to_string()),
            _ => None,
        })
        .filter(|name| !name.is_empty())
        .collect()
}

/// Map one Marketaux record to the canonical candidate shape
pub fn normalize(record: &Value, query_country: &str) -> ArticleCandidate {
    let published_at = record
        .get("published_at")
        .and_then(Value::as_str)
        .and_then(parse_published_at);

    let country = first_text(record, &["country"])
        .unwrap_or_else(|| query_country.to_string())
        .trim()
        .to_uppercase();

    ArticleCandidate {
        title: first_text(record, TITLE_FIELDS).unwrap_or_else(|| UNTITLED.to_string()),
        url: first_text(record, &["url"]),
        source: first_text(record, SOURCE_FIELDS).unwrap_or_else(|| PROVIDER_NAME.to_string()),
        provider: PROVIDER_NAME.to_string(),
        provider_id: first_text(record, ID_FIELDS),
        published_at,
        raw_text: first_text(record, TEXT_FIELDS).unwrap_or_default(),
        entities: normalize_entities(record),
        raw_payload: record.clone(),
        country,
        language: first_text(record, &["language"]).unwrap_or_default(),
    }
}
