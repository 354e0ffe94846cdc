//! SQLite implementation of `CarouselStore`.
//!
//! Every operation opens its own connection to the database file, so the
//! store can be shared freely between request handlers and render batches.
//! Multi-statement changes run inside a transaction.

use crate::error::{ServiceError, ServiceResult};
use crate::storage::{CarouselStore, UpsertOutcome};
use chrono::{DateTime, Utc};
use common::jobs::{CarouselStatus, Progress, SlideStatus};
use common::model::carousel::{Carousel, NewSlide, Slide, Substitutions};
use common::model::template::Template;
use log::warn;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS templates (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    category TEXT NOT NULL,
    template_type TEXT NOT NULL DEFAULT 'flyer',
    template_role TEXT NOT NULL DEFAULT 'main',
    svg_content TEXT NOT NULL,
    width INTEGER NOT NULL,
    height INTEGER NOT NULL,
    content_md5 TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS carousels (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    created_at TEXT NOT NULL,
    completed_at TEXT,
    error_message TEXT
);
CREATE TABLE IF NOT EXISTS carousel_slides (
    id TEXT PRIMARY KEY,
    carousel_id TEXT NOT NULL REFERENCES carousels (id),
    template_id TEXT NOT NULL,
    replacements TEXT NOT NULL,
    slide_order INTEGER NOT NULL,
    output_url TEXT,
    status TEXT NOT NULL DEFAULT 'pending',
    error_message TEXT,
    UNIQUE (carousel_id, slide_order)
);
";

const TEMPLATE_COLUMNS: &str =
    "id, name, category, template_type, template_role, svg_content, width, height, created_at, updated_at";

const INTERRUPTED: &str = "interrupted by restart";

pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    /// Opens (creating when needed) the database at `path` and its schema.
    pub fn open(path: impl Into<PathBuf>) -> ServiceResult<Self> {
        let store = SqliteStore { path: path.into() };
        let conn = store.connect()?;
        conn.execute_batch(SCHEMA)?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> ServiceResult<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(conn)
    }
}

fn md5_hex(content: &str) -> String {
    let mut hasher = md5::Context::new();
    hasher.consume(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn template_from_row(row: &Row) -> rusqlite::Result<Template> {
    Ok(Template {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        template_type: row.get(3)?,
        template_role: row.get(4)?,
        svg_content: row.get(5)?,
        width: row.get(6)?,
        height: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn carousel_from_row(row: &Row) -> rusqlite::Result<Carousel> {
    let status: String = row.get(2)?;
    Ok(Carousel {
        id: row.get(0)?,
        name: row.get(1)?,
        status: status.parse().map_err(|e| conversion_error(2, e))?,
        created_at: row.get(3)?,
        completed_at: row.get(4)?,
        error_message: row.get(5)?,
    })
}

fn slide_from_row(row: &Row) -> rusqlite::Result<Slide> {
    let replacements: String = row.get(3)?;
    let status: String = row.get(6)?;
    Ok(Slide {
        id: row.get(0)?,
        carousel_id: row.get(1)?,
        template_id: row.get(2)?,
        replacements: serde_json::from_str::<Substitutions>(&replacements)
            .map_err(|e| conversion_error(3, e.to_string()))?,
        slide_order: row.get(4)?,
        output_url: row.get(5)?,
        status: status.parse().map_err(|e| conversion_error(6, e))?,
        error: row.get(7)?,
    })
}

impl CarouselStore for SqliteStore {
    fn upsert_template(&self, template: &Template) -> ServiceResult<UpsertOutcome> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let content_md5 = md5_hex(&template.svg_content);

        let existing: Option<String> = tx
            .query_row(
                "SELECT content_md5 FROM templates WHERE id = ?1",
                params![template.id],
                |row| row.get(0),
            )
            .optional()?;

        let outcome = match existing {
            None => {
                tx.execute(
                    "INSERT INTO templates (id, name, category, template_type, template_role, svg_content, width, height, content_md5, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                    params![
                        template.id,
                        template.name,
                        template.category,
                        template.template_type,
                        template.template_role,
                        template.svg_content,
                        template.width,
                        template.height,
                        content_md5,
                        template.created_at,
                        template.updated_at,
                    ],
                )?;
                UpsertOutcome::Created
            }
            Some(previous_md5) => {
                // `created_at` keeps the first upload's timestamp.
                tx.execute(
                    "UPDATE templates
                     SET name = ?2, category = ?3, template_type = ?4, template_role = ?5,
                         svg_content = ?6, width = ?7, height = ?8, content_md5 = ?9, updated_at = ?10
                     WHERE id = ?1",
                    params![
                        template.id,
                        template.name,
                        template.category,
                        template.template_type,
                        template.template_role,
                        template.svg_content,
                        template.width,
                        template.height,
                        content_md5,
                        template.updated_at,
                    ],
                )?;
                if previous_md5 == content_md5 {
                    UpsertOutcome::Unchanged
                } else {
                    UpsertOutcome::Updated
                }
            }
        };

        tx.commit()?;
        Ok(outcome)
    }

    fn get_template(&self, id: &str) -> ServiceResult<Template> {
        let conn = self.connect()?;
        conn.query_row(
            &format!("SELECT {} FROM templates WHERE id = ?1", TEMPLATE_COLUMNS),
            params![id],
            template_from_row,
        )
        .optional()?
        .ok_or_else(|| ServiceError::NotFound(format!("template {}", id)))
    }

    fn list_templates(&self) -> ServiceResult<Vec<Template>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM templates ORDER BY created_at DESC, id",
            TEMPLATE_COLUMNS
        ))?;
        let templates = stmt
            .query_map([], template_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(templates)
    }

    fn create_carousel(&self, name: &str, slides: &[NewSlide]) -> ServiceResult<Carousel> {
        let carousel = Carousel {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            status: CarouselStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
            error_message: None,
        };

        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO carousels (id, name, status, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                carousel.id,
                carousel.name,
                carousel.status.as_str(),
                carousel.created_at
            ],
        )?;
        for slide in slides {
            tx.execute(
                "INSERT INTO carousel_slides (id, carousel_id, template_id, replacements, slide_order, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    Uuid::new_v4().to_string(),
                    carousel.id,
                    slide.template_id,
                    serde_json::to_string(&slide.replacements)?,
                    slide.slide_order,
                    SlideStatus::Pending.as_str(),
                ],
            )?;
        }
        tx.commit()?;
        Ok(carousel)
    }

    fn get_carousel(&self, id: &str) -> ServiceResult<Carousel> {
        let conn = self.connect()?;
        conn.query_row(
            "SELECT id, name, status, created_at, completed_at, error_message
             FROM carousels WHERE id = ?1",
            params![id],
            carousel_from_row,
        )
        .optional()?
        .ok_or_else(|| ServiceError::NotFound(format!("carousel {}", id)))
    }

    fn list_slides(&self, carousel_id: &str) -> ServiceResult<Vec<Slide>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT id, carousel_id, template_id, replacements, slide_order, output_url, status, error_message
             FROM carousel_slides
             WHERE carousel_id = ?1
             ORDER BY slide_order",
        )?;
        let slides = stmt
            .query_map(params![carousel_id], slide_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(slides)
    }

    fn progress(&self, carousel_id: &str) -> ServiceResult<Progress> {
        let conn = self.connect()?;
        let (total, done): (u32, u32) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(CASE WHEN status != 'pending' THEN 1 ELSE 0 END), 0)
             FROM carousel_slides WHERE carousel_id = ?1",
            params![carousel_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(Progress { done, total })
    }

    fn begin_generation(&self, carousel_id: &str) -> ServiceResult<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let claimed = tx.execute(
            "UPDATE carousels
             SET status = 'generating', completed_at = NULL, error_message = NULL
             WHERE id = ?1 AND status != 'generating'",
            params![carousel_id],
        )?;
        if claimed == 0 {
            let exists: Option<String> = tx
                .query_row(
                    "SELECT id FROM carousels WHERE id = ?1",
                    params![carousel_id],
                    |row| row.get(0),
                )
                .optional()?;
            return Err(match exists {
                Some(_) => ServiceError::AlreadyGenerating(carousel_id.to_string()),
                None => ServiceError::NotFound(format!("carousel {}", carousel_id)),
            });
        }

        tx.execute(
            "UPDATE carousel_slides
             SET status = 'pending', output_url = NULL, error_message = NULL
             WHERE carousel_id = ?1",
            params![carousel_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn record_slide(
        &self,
        carousel_id: &str,
        slide_order: u32,
        status: SlideStatus,
        output_url: Option<&str>,
        error: Option<&str>,
    ) -> ServiceResult<()> {
        let conn = self.connect()?;
        let updated = conn.execute(
            "UPDATE carousel_slides
             SET status = ?3, output_url = ?4, error_message = ?5
             WHERE carousel_id = ?1 AND slide_order = ?2",
            params![carousel_id, slide_order, status.as_str(), output_url, error],
        )?;
        if updated == 0 {
            return Err(ServiceError::NotFound(format!(
                "slide {} of carousel {}",
                slide_order, carousel_id
            )));
        }
        Ok(())
    }

    fn finish_carousel(
        &self,
        carousel_id: &str,
        status: CarouselStatus,
        error: Option<&str>,
    ) -> ServiceResult<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let now: DateTime<Utc> = Utc::now();

        let updated = tx.execute(
            "UPDATE carousels SET status = ?2, completed_at = ?3, error_message = ?4 WHERE id = ?1",
            params![carousel_id, status.as_str(), now, error],
        )?;
        if updated == 0 {
            return Err(ServiceError::NotFound(format!("carousel {}", carousel_id)));
        }

        let abandoned = tx.execute(
            "UPDATE carousel_slides SET status = 'error', error_message = ?2
             WHERE carousel_id = ?1 AND status = 'pending'",
            params![
                carousel_id,
                error.unwrap_or("not rendered before the carousel finished")
            ],
        )?;
        if abandoned > 0 {
            warn!(
                "Carousel {} finished with {} unrendered slide(s)",
                carousel_id, abandoned
            );
        }

        tx.commit()?;
        Ok(())
    }

    fn recover_interrupted(&self) -> ServiceResult<usize> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let now: DateTime<Utc> = Utc::now();

        tx.execute(
            "UPDATE carousel_slides SET status = 'error', error_message = ?1
             WHERE status = 'pending'
               AND carousel_id IN (SELECT id FROM carousels WHERE status = 'generating')",
            params![INTERRUPTED],
        )?;
        let recovered = tx.execute(
            "UPDATE carousels SET status = 'error', error_message = ?1, completed_at = ?2
             WHERE status = 'generating'",
            params![INTERRUPTED, now],
        )?;

        tx.commit()?;
        Ok(recovered)
    }
}
