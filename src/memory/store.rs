// src/memory/store.rs — SQLite operations for story records

use chrono::Utc;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::core::types::StoryResult;

/// A story ready to be written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewStory {
    pub story: String,
    pub user_request: String,
    pub category: String,
    pub categorization: serde_json::Value,
    pub judge_score: f64,
    pub judge_feedback: String,
    pub revision_count: u32,
    pub is_valid: bool,
    pub meets_quality_threshold: bool,
    pub validation: serde_json::Value,
    pub parent_settings: serde_json::Value,
    pub variety: serde_json::Value,
}

/// A persisted story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryRecord {
    pub id: i64,
    pub created_at: String,
    pub story_hash: String,
    #[serde(flatten)]
    pub entry: NewStory,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoryStats {
    pub total_stories: i64,
    /// Mean over stories with a score above zero.
    pub average_score: f64,
    /// `(category, count)`, most common first.
    pub category_distribution: Vec<(String, i64)>,
    pub stories_meeting_threshold: i64,
    pub average_revisions: f64,
}

impl StoryResult {
    pub fn to_new_story(&self) -> NewStory {
        NewStory {
            story: self.story.clone(),
            user_request: self.user_request.clone(),
            category: self.category().to_string(),
            categorization: serde_json::to_value(&self.categorization).unwrap_or_default(),
            judge_score: self.judge_score,
            judge_feedback: self.judge_feedback.clone(),
            revision_count: u32::from(self.revision_count),
            is_valid: self.is_valid,
            meets_quality_threshold: self.meets_quality_threshold,
            validation: serde_json::to_value(&self.validation).unwrap_or_default(),
            parent_settings: serde_json::to_value(&self.parent_settings).unwrap_or_default(),
            variety: serde_json::to_value(&self.variety).unwrap_or_default(),
        }
    }
}

pub fn story_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn json_column(row: &Row<'_>, idx: &str) -> rusqlite::Result<serde_json::Value> {
    let text: String = row.get(idx)?;
    Ok(serde_json::from_str(&text).unwrap_or_default())
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<StoryRecord> {
    Ok(StoryRecord {
        id: row.get("id")?,
        created_at: row.get("created_at")?,
        story_hash: row.get("story_hash")?,
        entry: NewStory {
            story: row.get("story_text")?,
            user_request: row.get("user_request")?,
            category: row.get("category")?,
            categorization: json_column(row, "categorization")?,
            judge_score: row.get("judge_score")?,
            judge_feedback: row.get("judge_feedback")?,
            revision_count: row.get("revision_count")?,
            is_valid: row.get("is_valid")?,
            meets_quality_threshold: row.get("meets_quality_threshold")?,
            validation: json_column(row, "validation")?,
            parent_settings: json_column(row, "parent_settings")?,
            variety: json_column(row, "variety_config")?,
        },
    })
}

const SELECT_STORIES: &str = "SELECT id, story_text, user_request, category, categorization,
    judge_score, judge_feedback, revision_count, is_valid, meets_quality_threshold,
    validation, parent_settings, variety_config, story_hash, created_at
    FROM stories";

/// Low-level SQLite operations for stories.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn insert_story(&self, story: &NewStory) -> anyhow::Result<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO stories (
                story_text, user_request, category, categorization,
                judge_score, judge_feedback, revision_count,
                is_valid, meets_quality_threshold, validation,
                parent_settings, variety_config, story_hash, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                story.story,
                story.user_request,
                story.category,
                story.categorization.to_string(),
                story.judge_score,
                story.judge_feedback,
                story.revision_count,
                story.is_valid,
                story.meets_quality_threshold,
                story.validation.to_string(),
                story.parent_settings.to_string(),
                story.variety.to_string(),
                story_hash(&story.story),
                now,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_story(&self, id: i64) -> anyhow::Result<Option<StoryRecord>> {
        let record = self
            .conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_STORIES),
                params![id],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    /// Newest first.
    pub fn list_stories(&self, limit: u32, offset: u32) -> anyhow::Result<Vec<StoryRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2",
            SELECT_STORIES
        ))?;
        let rows = stmt
            .query_map(params![limit, offset], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Substring match on the request or the story text.
    pub fn search_stories(&self, query: &str, limit: u32) -> anyhow::Result<Vec<StoryRecord>> {
        let pattern = format!("%{}%", query);
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE user_request LIKE ?1 OR story_text LIKE ?1
             ORDER BY created_at DESC, id DESC LIMIT ?2",
            SELECT_STORIES
        ))?;
        let rows = stmt
            .query_map(params![pattern, limit], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn filter_stories(
        &self,
        category: Option<&str>,
        min_score: Option<f64>,
        max_score: Option<f64>,
        limit: u32,
    ) -> anyhow::Result<Vec<StoryRecord>> {
        let mut conditions = Vec::new();
        let mut values: Vec<SqlValue> = Vec::new();

        if let Some(c) = category {
            conditions.push("category = ?");
            values.push(SqlValue::Text(c.to_string()));
        }
        if let Some(min) = min_score {
            conditions.push("judge_score >= ?");
            values.push(SqlValue::Real(min));
        }
        if let Some(max) = max_score {
            conditions.push("judge_score <= ?");
            values.push(SqlValue::Real(max));
        }
        values.push(SqlValue::Integer(i64::from(limit)));

        let where_clause = if conditions.is_empty() {
            "1=1".to_string()
        } else {
            conditions.join(" AND ")
        };

        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE {} ORDER BY created_at DESC, id DESC LIMIT ?",
            SELECT_STORIES, where_clause
        ))?;
        let rows = stmt
            .query_map(params_from_iter(values), row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn statistics(&self) -> anyhow::Result<StoryStats> {
        let total_stories: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM stories", [], |r| r.get(0))?;

        let average_score: Option<f64> = self.conn.query_row(
            "SELECT AVG(judge_score) FROM stories WHERE judge_score > 0",
            [],
            |r| r.get(0),
        )?;

        let mut stmt = self.conn.prepare(
            "SELECT category, COUNT(*) AS n FROM stories
             GROUP BY category ORDER BY n DESC, category ASC",
        )?;
        let category_distribution = stmt
            .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let stories_meeting_threshold: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM stories WHERE meets_quality_threshold = 1",
            [],
            |r| r.get(0),
        )?;

        let average_revisions: Option<f64> =
            self.conn
                .query_row("SELECT AVG(revision_count) FROM stories", [], |r| r.get(0))?;

        Ok(StoryStats {
            total_stories,
            average_score: round2(average_score.unwrap_or(0.0)),
            category_distribution,
            stories_meeting_threshold,
            average_revisions: round2(average_revisions.unwrap_or(0.0)),
        })
    }

    /// `true` when a row was removed.
    pub fn delete_story(&self, id: i64) -> anyhow::Result<bool> {
        let n = self
            .conn
            .execute("DELETE FROM stories WHERE id = ?1", params![id])?;
        Ok(n > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_story_hash_is_sha256_hex() {
        let h = story_hash("Once upon a time");
        assert_eq!(h.len(), 64);
        assert_eq!(h, story_hash("Once upon a time"));
        assert_ne!(h, story_hash("Once upon a time."));
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(7.456), 7.46);
        assert_eq!(round2(0.0), 0.0);
    }
}
