//! Article summarization and impact analysis.
//!
//! The language-model work lives behind [`Summarizer`] and
//! [`ImpactAnalyzer`]; this service picks the input, calls the collaborator
//! and persists the result on the article.

use crate::error::{AppError, AppResult};
use crate::models::{Article, ImpactLabel, TradeAction};
use crate::repositories::ArticleStore;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

const MIN_URL_LEN: usize = 5;
const MIN_TEXT_LEN: usize = 50;
const MIN_SUMMARY_LEN: usize = 20;

/// What the summarizer reads: a link to fetch, or text already at hand
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SummarySource {
    Url(String),
    Text(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryInput {
    pub title: String,
    pub source: SummarySource,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryOutput {
    pub final_summary: String,
    pub chunk_outputs: Vec<String>,
    pub key_facts: Vec<String>,
    pub models: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisInput {
    pub title: String,
    pub summary: Option<String>,
    pub raw_text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisOutput {
    pub impact_label: Option<ImpactLabel>,
    pub impact_confidence: Option<i32>,
    pub rationale: Option<String>,
    pub action: Option<TradeAction>,
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, input: SummaryInput) -> anyhow::Result<SummaryOutput>;
}

#[async_trait]
pub trait ImpactAnalyzer: Send + Sync {
    async fn analyze(&self, input: AnalysisInput) -> anyhow::Result<AnalysisOutput>;
}

/// Returned by [`ArticleAnalysisService::summarize`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResult {
    pub article_id: Uuid,
    pub summary: String,
    pub key_facts: Vec<String>,
    pub models: Vec<String>,
}

/// Returned by [`ArticleAnalysisService::analyze`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub article_id: Uuid,
    pub impact_label: Option<ImpactLabel>,
    pub impact_confidence: i32,
    pub rationale: String,
    pub action: TradeAction,
}

/// Pick the summarizer input: the url when usable, else the raw text
pub fn summary_source(article: &Article) -> Option<SummarySource> {
    if let Some(url) = article.url.as_deref().map(str::trim) {
        if url.chars().count() > MIN_URL_LEN {
            return Some(SummarySource::Url(url.to_string()));
        }
    }

    let text = article.raw_text.trim();
    if text.chars().count() > MIN_TEXT_LEN {
        return Some(SummarySource::Text(text.to_string()));
    }

    None
}

fn non_empty(value: &str) -> Option<&str> {
    Some(value.trim()).filter(|v| !v.is_empty())
}

pub struct ArticleAnalysisService {
    articles: Arc<dyn ArticleStore>,
    summarizer: Arc<dyn Summarizer>,
    analyzer: Arc<dyn ImpactAnalyzer>,
}

impl ArticleAnalysisService {
    pub fn new(
        articles: Arc<dyn ArticleStore>,
        summarizer: Arc<dyn Summarizer>,
        analyzer: Arc<dyn ImpactAnalyzer>,
    ) -> Self {
        Self {
            articles,
            summarizer,
            analyzer,
        }
    }

    async fn load(&self, id: Uuid) -> AppResult<Article> {
        self.articles
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Article {} not found", id)))
    }

    /// Summarize an article and store the summary on it.
    /// Key facts already on the article are left untouched.
    pub async fn summarize(&self, id: Uuid) -> AppResult<SummaryResult> {
        let article = self.load(id).await?;
        let source = summary_source(&article)
            .ok_or_else(|| AppError::Validation("no usable article content".to_string()))?;

        let output = self
            .summarizer
            .summarize(SummaryInput {
                title: article.title.clone(),
                source,
            })
            .await
            .map_err(|e| {
                warn!(%id, error = %e, "Summarizer failed");
                AppError::ExternalService(format!("summarizer failed: {}", e))
            })?;

        let rationale = output.chunk_outputs.join("\n\n");
        self.articles
            .save_summary(id, &output.final_summary, &rationale, Utc::now())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Article {} not found", id)))?;

        info!(%id, models = ?output.models, "Article summarized");
        Ok(SummaryResult {
            article_id: id,
            summary: output.final_summary,
            key_facts: output.key_facts,
            models: output.models,
        })
    }

    /// Classify market impact and store label, confidence and rationale
    pub async fn analyze(&self, id: Uuid) -> AppResult<AnalysisResult> {
        let article = self.load(id).await?;

        let summary = Some(article.summary.trim())
            .filter(|s| s.chars().count() > MIN_SUMMARY_LEN)
            .map(str::to_string);
        let input = AnalysisInput {
            title: article.title.clone(),
            summary,
            raw_text: article.raw_text.clone(),
        };

        let output = self.analyzer.analyze(input).await.map_err(|e| {
            warn!(%id, error = %e, "Impact analyzer failed");
            AppError::ExternalService(format!("impact analysis failed: {}", e))
        })?;

        let impact_label = output.impact_label.or_else(|| article.impact_label_enum());
        let impact_confidence = output
            .impact_confidence
            .map(|c| c.clamp(0, 100))
            .unwrap_or(article.impact_confidence);
        let action = output
            .action
            .unwrap_or_else(|| TradeAction::from_impact(impact_label, impact_confidence));
        let rationale = output
            .rationale
            .as_deref()
            .and_then(non_empty)
            .or_else(|| non_empty(&article.rationale))
            .map(str::to_string)
            .unwrap_or_else(|| format!("Decision: {}", action.as_str()));

        self.articles
            .save_analysis(id, impact_label, impact_confidence, &rationale)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Article {} not found", id)))?;

        info!(%id, label = ?impact_label, confidence = impact_confidence, action = action.as_str(), "Article analyzed");
        Ok(AnalysisResult {
            article_id: id,
            impact_label,
            impact_confidence,
            rationale,
            action,
        })
    }
}
