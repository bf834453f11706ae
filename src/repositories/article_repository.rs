use crate::models::{Article, ArticleIdentity, ArticleRefresh, ImpactLabel, NewArticle};
use crate::repositories::{ArticleStore, RepositoryResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

const ARTICLE_COLUMNS: &str = r#"
    id,
    symbol,
    title,
    url,
    source,
    provider,
    provider_id,
    published_at,
    fetched_at,
    summary,
    key_facts,
    rationale,
    impact_label,
    impact_confidence,
    raw_text,
    entities,
    raw_payload,
    country,
    language,
    created_at
"#;

/// Repository for article data access
pub struct ArticleRepository {
    pool: PgPool,
}

impl ArticleRepository {
    /// Create a new ArticleRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ArticleStore for ArticleRepository {
    async fn find_by_identity(&self, identity: &ArticleIdentity) -> RepositoryResult<Option<Article>> {
        let row = match identity {
            ArticleIdentity::Provider {
                provider,
                provider_id,
            } => {
                sqlx::query_as::<_, Article>(&format!(
                    "SELECT {ARTICLE_COLUMNS} FROM articles WHERE provider = $1 AND provider_id = $2"
                ))
                .bind(provider)
                .bind(provider_id)
                .fetch_optional(&self.pool)
                .await?
            }
            ArticleIdentity::Url(url) => {
                sqlx::query_as::<_, Article>(&format!(
                    "SELECT {ARTICLE_COLUMNS} FROM articles WHERE url = $1"
                ))
                .bind(url)
                .fetch_optional(&self.pool)
                .await?
            }
            ArticleIdentity::Fallback {
                symbol,
                title,
                published_at,
            } => {
                sqlx::query_as::<_, Article>(&format!(
                    r#"
                    SELECT {ARTICLE_COLUMNS}
                    FROM articles
                    WHERE symbol = $1
                        AND title = $2
                        AND published_at IS NOT DISTINCT FROM $3
                    ORDER BY created_at ASC
                    LIMIT 1
                    "#
                ))
                .bind(symbol)
                .bind(title)
                .bind(published_at)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        Ok(row)
    }

    async fn insert_if_absent(&self, article: &NewArticle) -> RepositoryResult<Option<Uuid>> {
        // Any of the partial unique indexes turns a conflicting insert into a no-op
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO articles (
                symbol, title, url, source, provider, provider_id,
                published_at, fetched_at, raw_text, entities, raw_payload,
                country, language
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT DO NOTHING
            RETURNING id
            "#,
        )
        .bind(&article.symbol)
        .bind(&article.title)
        .bind(&article.url)
        .bind(&article.source)
        .bind(&article.provider)
        .bind(&article.provider_id)
        .bind(article.published_at)
        .bind(article.fetched_at)
        .bind(&article.raw_text)
        .bind(&article.entities)
        .bind(&article.raw_payload)
        .bind(&article.country)
        .bind(&article.language)
        .fetch_optional(&self.pool)
        .await?;

        Ok(id)
    }

    async fn refresh_if_newer(&self, id: Uuid, refresh: &ArticleRefresh) -> RepositoryResult<bool> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE articles
            SET published_at = $2,
                fetched_at = $3,
                source = $4,
                provider = $5,
                provider_id = $6,
                raw_text = COALESCE($7, raw_text),
                entities = COALESCE($8, entities)
            WHERE id = $1
                AND (published_at IS NULL OR published_at < $2)
            "#,
        )
        .bind(id)
        .bind(refresh.published_at)
        .bind(refresh.fetched_at)
        .bind(&refresh.source)
        .bind(&refresh.provider)
        .bind(&refresh.provider_id)
        .bind(&refresh.raw_text)
        .bind(&refresh.entities)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Article>> {
        let row = sqlx::query_as::<_, Article>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list_by_symbol(&self, symbol: &str, limit: usize) -> RepositoryResult<Vec<Article>> {
        let rows = sqlx::query_as::<_, Article>(&format!(
            r#"
            SELECT {ARTICLE_COLUMNS}
            FROM articles
            WHERE symbol = $1
            ORDER BY published_at DESC NULLS LAST, id DESC
            LIMIT $2
            "#
        ))
        .bind(symbol)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn ids_beyond_retention(&self, symbol: &str, keep: usize) -> RepositoryResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id
            FROM articles
            WHERE symbol = $1
            ORDER BY published_at DESC NULLS LAST, id DESC
            OFFSET $2
            "#,
        )
        .bind(symbol)
        .bind(keep as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn delete_by_ids(&self, ids: &[Uuid]) -> RepositoryResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let rows_affected = sqlx::query("DELETE FROM articles WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    async fn count_by_symbol(&self, symbol: &str) -> RepositoryResult<u64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM articles WHERE symbol = $1")
            .bind(symbol)
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as u64)
    }

    async fn save_summary(
        &self,
        id: Uuid,
        summary: &str,
        rationale: &str,
        fetched_at: DateTime<Utc>,
    ) -> RepositoryResult<Option<Article>> {
        let row = sqlx::query_as::<_, Article>(&format!(
            r#"
            UPDATE articles
            SET summary = $2, rationale = $3, fetched_at = $4
            WHERE id = $1
            RETURNING {ARTICLE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(summary)
        .bind(rationale)
        .bind(fetched_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn save_analysis(
        &self,
        id: Uuid,
        impact_label: Option<ImpactLabel>,
        impact_confidence: i32,
        rationale: &str,
    ) -> RepositoryResult<Option<Article>> {
        let row = sqlx::query_as::<_, Article>(&format!(
            r#"
            UPDATE articles
            SET impact_label = $2, impact_confidence = $3, rationale = $4
            WHERE id = $1
            RETURNING {ARTICLE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(impact_label.map(|label| label.as_str()))
        .bind(impact_confidence)
        .bind(rationale)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}
