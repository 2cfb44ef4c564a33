//! Persistence for generated scripts and the template library.
//!
//! `PgStore` is the real backend (one `generated_scripts` table it owns, one
//! read-only `templates` table seeded externally). `MemoryStore` is the mock
//! counterpart used by `--mock` runs and tests.

use std::sync::Mutex;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::debug;

use crate::config::DbConfig;
use crate::error::HandlerError;

/// Row of `generated_scripts`. Rows are only ever inserted, never updated.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedScript {
    pub id: i32,
    pub prompt: String,
    pub generated_code: String,
    pub created_at: DateTime<Utc>,
}

/// Row of the pre-seeded `templates` table.
#[derive(Debug, Clone, Serialize)]
pub struct Template {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub code: String,
    pub icon: Option<String>,
    pub tags: Vec<String>,
    pub usage_count: i32,
}

/// Key of a freshly inserted script row, echoed back to the caller.
#[derive(Debug, Clone, Copy)]
pub struct InsertedScript {
    pub id: i32,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait ScriptStore: Send + Sync {
    async fn insert_script(
        &self,
        prompt: &str,
        generated_code: &str,
    ) -> Result<InsertedScript, HandlerError>;

    /// Most recent scripts, newest first, at most `limit` rows.
    async fn recent_scripts(&self, limit: i64) -> Result<Vec<GeneratedScript>, HandlerError>;

    /// Templates ordered by usage count then recency, optionally filtered by
    /// category.
    async fn templates(&self, category: Option<&str>) -> Result<Vec<Template>, HandlerError>;
}

// ============================================================================
// Postgres store
// ============================================================================

pub struct PgStore {
    pool: PgPool,
    schema: String,
}

impl PgStore {
    pub async fn connect(config: &DbConfig) -> Result<Self, HandlerError> {
        let schema = validate_schema(&config.schema)?;
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(&config.url)
            .await?;
        debug!("Connected to Postgres, schema {}", schema);
        Ok(Self { pool, schema })
    }
}

/// The schema name is interpolated into SQL (identifiers cannot be bound),
/// so it must look like a plain identifier.
fn validate_schema(schema: &str) -> Result<String, HandlerError> {
    let mut chars = schema.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(schema.to_string())
    } else {
        Err(HandlerError::Config(format!(
            "invalid schema name: {:?}",
            schema
        )))
    }
}

#[async_trait]
impl ScriptStore for PgStore {
    async fn insert_script(
        &self,
        prompt: &str,
        generated_code: &str,
    ) -> Result<InsertedScript, HandlerError> {
        let query = format!(
            "INSERT INTO {}.generated_scripts (prompt, generated_code) \
             VALUES ($1, $2) RETURNING id, created_at",
            self.schema
        );
        let row = sqlx::query(&query)
            .bind(prompt)
            .bind(generated_code)
            .fetch_one(&self.pool)
            .await?;

        Ok(InsertedScript {
            id: row.try_get("id")?,
            created_at: row.try_get("created_at")?,
        })
    }

    async fn recent_scripts(&self, limit: i64) -> Result<Vec<GeneratedScript>, HandlerError> {
        let query = format!(
            "SELECT id, prompt, generated_code, created_at \
             FROM {}.generated_scripts \
             ORDER BY created_at DESC \
             LIMIT $1",
            self.schema
        );
        let rows = sqlx::query(&query).bind(limit).fetch_all(&self.pool).await?;

        let mut scripts = Vec::with_capacity(rows.len());
        for row in rows {
            scripts.push(GeneratedScript {
                id: row.try_get("id")?,
                prompt: row.try_get("prompt")?,
                generated_code: row.try_get("generated_code")?,
                created_at: row.try_get("created_at")?,
            });
        }
        Ok(scripts)
    }

    async fn templates(&self, category: Option<&str>) -> Result<Vec<Template>, HandlerError> {
        let base = format!(
            "SELECT id, title, description, category, code, icon, tags, usage_count \
             FROM {}.templates",
            self.schema
        );
        let rows = match category {
            Some(category) => {
                let query = format!(
                    "{} WHERE category = $1 ORDER BY usage_count DESC, created_at DESC",
                    base
                );
                sqlx::query(&query)
                    .bind(category)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let query = format!("{} ORDER BY usage_count DESC, created_at DESC", base);
                sqlx::query(&query).fetch_all(&self.pool).await?
            }
        };

        let mut templates = Vec::with_capacity(rows.len());
        for row in rows {
            templates.push(Template {
                id: row.try_get("id")?,
                title: row.try_get("title")?,
                description: row.try_get("description")?,
                category: row.try_get("category")?,
                code: row.try_get("code")?,
                icon: row.try_get("icon")?,
                // tags is a nullable text[]; absent means "no tags"
                tags: row
                    .try_get::<Option<Vec<String>>, _>("tags")?
                    .unwrap_or_default(),
                usage_count: row.try_get("usage_count")?,
            });
        }
        Ok(templates)
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Mock-mode store: scripts live in process memory, templates are whatever
/// the constructor seeded.
#[derive(Default)]
pub struct MemoryStore {
    scripts: Mutex<Vec<GeneratedScript>>,
    templates: Vec<Template>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_templates(templates: Vec<Template>) -> Self {
        Self {
            scripts: Mutex::new(Vec::new()),
            templates,
        }
    }
}

#[async_trait]
impl ScriptStore for MemoryStore {
    async fn insert_script(
        &self,
        prompt: &str,
        generated_code: &str,
    ) -> Result<InsertedScript, HandlerError> {
        let mut scripts = self
            .scripts
            .lock()
            .map_err(|_| anyhow!("script store mutex poisoned"))?;
        let script = GeneratedScript {
            id: scripts.len() as i32 + 1,
            prompt: prompt.to_string(),
            generated_code: generated_code.to_string(),
            created_at: Utc::now(),
        };
        let inserted = InsertedScript {
            id: script.id,
            created_at: script.created_at,
        };
        scripts.push(script);
        Ok(inserted)
    }

    async fn recent_scripts(&self, limit: i64) -> Result<Vec<GeneratedScript>, HandlerError> {
        let limit = usize::try_from(limit).map_err(|_| anyhow!("negative limit"))?;
        let scripts = self
            .scripts
            .lock()
            .map_err(|_| anyhow!("script store mutex poisoned"))?;
        Ok(scripts.iter().rev().take(limit).cloned().collect())
    }

    async fn templates(&self, category: Option<&str>) -> Result<Vec<Template>, HandlerError> {
        let mut templates: Vec<Template> = self
            .templates
            .iter()
            .filter(|t| category.map_or(true, |c| t.category == c))
            .cloned()
            .collect();
        templates.sort_by(|a, b| b.usage_count.cmp(&a.usage_count));
        Ok(templates)
    }
}
