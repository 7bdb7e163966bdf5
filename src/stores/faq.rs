use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Serialize;

use crate::domains::answer::MatchType;
use crate::error::{ArborBotError, Result};
use crate::stores::schema::faqs;
use crate::stores::{connect, map_unique_violation, normalize, now_ts, SqlitePool, SqlitePooledConn};

#[derive(Debug, Clone, Serialize, Queryable)]
pub struct FaqEntry {
    pub id: i32,
    pub question: String,
    pub answer: String,
    pub category: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Result of an FAQ-tier match, with the match kind carried through for
/// observability.
#[derive(Debug, Clone)]
pub struct FaqMatch {
    pub answer: String,
    pub faq_id: i32,
    pub category: Option<String>,
    pub match_type: MatchType,
}

#[derive(Insertable)]
#[diesel(table_name = faqs)]
struct NewFaq<'a> {
    question: &'a str,
    answer: &'a str,
    category: Option<&'a str>,
    created_at: i64,
    updated_at: i64,
}

/// Curated question/answer store backing the second tier.
pub struct FaqStore {
    pool: SqlitePool,
}

impl FaqStore {
    pub async fn new(sqlite_path: impl AsRef<str>) -> Result<Self> {
        let pool = connect(sqlite_path.as_ref()).await?;
        Ok(Self { pool })
    }

    async fn conn(&self) -> Result<SqlitePooledConn<'_>> {
        self.pool
            .get()
            .await
            .map_err(|e| ArborBotError::Runtime(e.to_string()))
    }

    pub async fn create_faq(
        &self,
        question: &str,
        answer: &str,
        category: Option<&str>,
    ) -> Result<FaqEntry> {
        let question = question.trim();
        if question.is_empty() || answer.trim().is_empty() {
            return Err(ArborBotError::Validation(
                "faq question and answer must not be empty".to_string(),
            ));
        }
        let now = now_ts();
        let new = NewFaq {
            question,
            answer,
            category,
            created_at: now,
            updated_at: now,
        };
        let mut conn = self.conn().await?;
        diesel::insert_into(faqs::table)
            .values(&new)
            .execute(&mut conn)
            .await
            .map_err(|e| map_unique_violation(e, "faq question"))?;
        let row: FaqEntry = faqs::table.order(faqs::id.desc()).first(&mut conn).await?;
        Ok(row)
    }

    pub async fn get_faq(&self, faq_id: i32) -> Result<FaqEntry> {
        let mut conn = self.conn().await?;
        faqs::table
            .filter(faqs::id.eq(faq_id))
            .first(&mut conn)
            .await
            .optional()?
            .ok_or_else(|| ArborBotError::NotFound(format!("faq {faq_id}")))
    }

    pub async fn list_faqs(&self, category: Option<&str>) -> Result<Vec<FaqEntry>> {
        let mut conn = self.conn().await?;
        let mut query = faqs::table.order(faqs::id.asc()).into_boxed();
        if let Some(category) = category {
            query = query.filter(faqs::category.eq(category));
        }
        let rows = query.load(&mut conn).await?;
        Ok(rows)
    }

    pub async fn list_categories(&self) -> Result<Vec<String>> {
        let mut conn = self.conn().await?;
        let rows: Vec<Option<String>> = faqs::table
            .select(faqs::category)
            .distinct()
            .load(&mut conn)
            .await?;
        let mut categories: Vec<String> = rows.into_iter().flatten().collect();
        categories.sort();
        Ok(categories)
    }

    pub async fn update_faq(
        &self,
        faq_id: i32,
        question: &str,
        answer: &str,
        category: Option<&str>,
    ) -> Result<FaqEntry> {
        let mut conn = self.conn().await?;
        let updated = diesel::update(faqs::table.filter(faqs::id.eq(faq_id)))
            .set((
                faqs::question.eq(question),
                faqs::answer.eq(answer),
                faqs::category.eq(category),
                faqs::updated_at.eq(now_ts()),
            ))
            .execute(&mut conn)
            .await
            .map_err(|e| map_unique_violation(e, "faq question"))?;
        if updated == 0 {
            return Err(ArborBotError::NotFound(format!("faq {faq_id}")));
        }
        drop(conn);
        self.get_faq(faq_id).await
    }

    pub async fn delete_faq(&self, faq_id: i32) -> Result<()> {
        let mut conn = self.conn().await?;
        let deleted = diesel::delete(faqs::table.filter(faqs::id.eq(faq_id)))
            .execute(&mut conn)
            .await?;
        if deleted == 0 {
            return Err(ArborBotError::NotFound(format!("faq {faq_id}")));
        }
        Ok(())
    }

    /// FAQ-tier matcher. Exact case-insensitive equality first (lowest id
    /// wins), then partial containment in either direction, first row in
    /// ascending-id order. Read-only.
    pub async fn match_question(&self, question: &str) -> Result<Option<FaqMatch>> {
        let normalized = normalize(question);
        if normalized.is_empty() {
            return Ok(None);
        }

        let mut conn = self.conn().await?;
        let rows: Vec<FaqEntry> = faqs::table.order(faqs::id.asc()).load(&mut conn).await?;

        if let Some(entry) = rows.iter().find(|r| normalize(&r.question) == normalized) {
            return Ok(Some(FaqMatch {
                answer: entry.answer.clone(),
                faq_id: entry.id,
                category: entry.category.clone(),
                match_type: MatchType::Exact,
            }));
        }

        let partial = rows.iter().find(|r| {
            let stored = normalize(&r.question);
            !stored.is_empty() && (stored.contains(&normalized) || normalized.contains(&stored))
        });
        Ok(partial.map(|entry| FaqMatch {
            answer: entry.answer.clone(),
            faq_id: entry.id,
            category: entry.category.clone(),
            match_type: MatchType::Partial,
        }))
    }
}
