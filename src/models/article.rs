use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Provider name recorded when a candidate does not carry one
pub const DEFAULT_PROVIDER: &str = "unknown";

/// Title used when a provider record has no usable title field
pub const UNTITLED: &str = "untitled";

/// Market impact label assigned by the analysis collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLabel {
    Positive,
    Neutral,
    Negative,
}

impl ImpactLabel {
    /// Convert from database string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Ok(ImpactLabel::Positive),
            "neutral" => Ok(ImpactLabel::Neutral),
            "negative" => Ok(ImpactLabel::Negative),
            _ => Err(format!("Invalid impact label: {}", s)),
        }
    }

    /// Convert to database string
    pub fn as_str(&self) -> &'static str {
        match self {
            ImpactLabel::Positive => "positive",
            ImpactLabel::Neutral => "neutral",
            ImpactLabel::Negative => "negative",
        }
    }
}

impl From<ImpactLabel> for String {
    fn from(label: ImpactLabel) -> Self {
        label.as_str().to_string()
    }
}

/// Confidence at which an impact label turns into a trade call
pub const ACTION_CONFIDENCE_THRESHOLD: i32 = 70;

/// Suggested trade action derived from impact analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
    Hold,
}

impl TradeAction {
    /// Fallback used when the analyzer gives no action
    pub fn from_impact(label: Option<ImpactLabel>, confidence: i32) -> Self {
        match label {
            Some(ImpactLabel::Positive) if confidence >= ACTION_CONFIDENCE_THRESHOLD => TradeAction::Buy,
            Some(ImpactLabel::Negative) if confidence >= ACTION_CONFIDENCE_THRESHOLD => TradeAction::Sell,
            _ => TradeAction::Hold,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TradeAction::Buy => "buy",
            TradeAction::Sell => "sell",
            TradeAction::Hold => "hold",
        }
    }
}

/// Canonical shape of a provider record after normalization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleCandidate {
    pub title: String,
    pub url: Option<String>,
    pub source: String,
    pub provider: String,
    pub provider_id: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub raw_text: String,
    pub entities: Vec<String>,
    pub raw_payload: Value,
    pub country: String,
    pub language: String,
}

impl ArticleCandidate {
    /// Provider name as stored; blank names fall back to [`DEFAULT_PROVIDER`]
    pub fn provider_name(&self) -> &str {
        if self.provider.trim().is_empty() {
            DEFAULT_PROVIDER
        } else {
            &self.provider
        }
    }

    /// Key used for intra-run provider dedup, when a provider id is present
    pub fn provider_key(&self) -> Option<String> {
        self.provider_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(|id| format!("{}||{}", self.provider_name(), id))
    }

    /// Non-empty url, if any
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.is_empty())
    }
}

/// Identity filter used for cross-run dedup.
///
/// Resolution order: provider + provider id, then url, then
/// symbol + title + publish time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleIdentity {
    Provider {
        provider: String,
        provider_id: String,
    },
    Url(String),
    Fallback {
        symbol: String,
        title: String,
        published_at: Option<DateTime<Utc>>,
    },
}

impl ArticleIdentity {
    /// Pick the strongest identity the record carries
    pub fn resolve(new_article: &NewArticle) -> Self {
        if let Some(provider_id) = new_article.provider_id.as_deref().filter(|id| !id.is_empty()) {
            if !new_article.provider.is_empty() {
                return ArticleIdentity::Provider {
                    provider: new_article.provider.clone(),
                    provider_id: provider_id.to_string(),
                };
            }
        }

        if let Some(url) = new_article.url.as_deref().filter(|u| !u.is_empty()) {
            return ArticleIdentity::Url(url.to_string());
        }

        ArticleIdentity::Fallback {
            symbol: new_article.symbol.clone(),
            title: new_article.title.clone(),
            published_at: new_article.published_at,
        }
    }

    /// Whether a stored article satisfies this filter
    pub fn matches(&self, article: &Article) -> bool {
        match self {
            ArticleIdentity::Provider {
                provider,
                provider_id,
            } => {
                article.provider == *provider
                    && article.provider_id.as_deref() == Some(provider_id.as_str())
            }
            ArticleIdentity::Url(url) => article.url.as_deref() == Some(url.as_str()),
            ArticleIdentity::Fallback {
                symbol,
                title,
                published_at,
            } => {
                article.symbol == *symbol
                    && article.title == *title
                    && article.published_at == *published_at
            }
        }
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            ArticleIdentity::Provider { .. } => "provider",
            ArticleIdentity::Url(_) => "url",
            ArticleIdentity::Fallback { .. } => "fallback",
        }
    }
}

/// Insert payload for a first sighting of an article.
/// Analysis fields are not part of it; they start empty.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub symbol: String,
    pub title: String,
    pub url: Option<String>,
    pub source: String,
    pub provider: String,
    pub provider_id: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,
    pub raw_text: String,
    pub entities: Vec<String>,
    pub raw_payload: Value,
    pub country: String,
    pub language: String,
}

impl NewArticle {
    /// Attach a candidate to a symbol, stamping the fetch time
    pub fn from_candidate(symbol: &str, candidate: &ArticleCandidate, fetched_at: DateTime<Utc>) -> Self {
        let provider = candidate.provider_name().to_string();

        let raw_payload = if candidate.raw_payload.is_null() {
            Value::Object(Default::default())
        } else {
            candidate.raw_payload.clone()
        };

        Self {
            symbol: symbol.to_string(),
            title: candidate.title.clone(),
            url: candidate.url().map(str::to_string),
            source: candidate.source.clone(),
            provider,
            provider_id: candidate.provider_id.clone().filter(|id| !id.is_empty()),
            published_at: candidate.published_at,
            fetched_at,
            raw_text: candidate.raw_text.clone(),
            entities: candidate.entities.clone(),
            raw_payload,
            country: candidate.country.trim().to_uppercase(),
            language: candidate.language.clone(),
        }
    }
}

/// Metadata written when a newer-dated duplicate arrives.
/// Never carries summary, key facts, rationale or impact fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleRefresh {
    pub published_at: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,
    pub source: String,
    pub provider: String,
    pub provider_id: Option<String>,
    /// Only set when the candidate supplied non-empty text
    pub raw_text: Option<String>,
    /// Only set when the candidate supplied at least one entity
    pub entities: Option<Vec<String>>,
}

impl ArticleRefresh {
    pub fn from_new(new_article: &NewArticle) -> Self {
        Self {
            published_at: new_article.published_at,
            fetched_at: new_article.fetched_at,
            source: new_article.source.clone(),
            provider: new_article.provider.clone(),
            provider_id: new_article.provider_id.clone(),
            raw_text: Some(new_article.raw_text.clone()).filter(|t| !t.trim().is_empty()),
            entities: Some(new_article.entities.clone()).filter(|e| !e.is_empty()),
        }
    }
}

/// Persisted article record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Article {
    pub id: Uuid,
    pub symbol: String,
    pub title: String,
    pub url: Option<String>,
    pub source: String,
    pub provider: String,
    pub provider_id: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,
    pub summary: String,
    pub key_facts: Vec<String>,
    pub rationale: String,
    pub impact_label: Option<String>, // Stored as TEXT, use ImpactLabel for type safety
    pub impact_confidence: i32,
    pub raw_text: String,
    pub entities: Vec<String>,
    pub raw_payload: Value, // JSONB stored as serde_json::Value
    pub country: String,
    pub language: String,
    pub created_at: DateTime<Utc>,
}

impl Article {
    /// Materialize an insert payload with empty analysis fields
    pub fn from_new(new_article: NewArticle) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: new_article.symbol,
            title: new_article.title,
            url: new_article.url,
            source: new_article.source,
            provider: new_article.provider,
            provider_id: new_article.provider_id,
            published_at: new_article.published_at,
            fetched_at: new_article.fetched_at,
            summary: String::new(),
            key_facts: Vec::new(),
            rationale: String::new(),
            impact_label: None,
            impact_confidence: 0,
            raw_text: new_article.raw_text,
            entities: new_article.entities,
            raw_payload: new_article.raw_payload,
            country: new_article.country,
            language: new_article.language,
            created_at: Utc::now(),
        }
    }

    /// Get impact label as an enum
    pub fn impact_label_enum(&self) -> Option<ImpactLabel> {
        self.impact_label
            .as_deref()
            .and_then(|label| ImpactLabel::from_str(label).ok())
    }

    /// Apply a metadata refresh in place
    pub fn apply_refresh(&mut self, refresh: &ArticleRefresh) {
        self.published_at = refresh.published_at;
        self.fetched_at = refresh.fetched_at;
        self.source = refresh.source.clone();
        self.provider = refresh.provider.clone();
        self.provider_id = refresh.provider_id.clone();
        if let Some(raw_text) = &refresh.raw_text {
            self.raw_text = raw_text.clone();
        }
        if let Some(entities) = &refresh.entities {
            self.entities = entities.clone();
        }
    }

    pub fn headline(&self) -> ArticleHeadline {
        ArticleHeadline {
            id: self.id,
            title: self.title.clone(),
            source: self.source.clone(),
            url: self.url.clone(),
            published_at: self.published_at,
            provider: self.provider.clone(),
        }
    }
}

/// Headline projection exposed by the list view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleHeadline {
    pub id: Uuid,
    pub title: String,
    pub source: String,
    pub url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub provider: String,
}
