use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};

use crate::database::repository::{check_entries, EntityKind, Repository};
use crate::error::{Error, Result};
use crate::models::{
    application::Application, history_entry::HistoryEntry, offer::Offer,
    status::ApplicationStatus,
};

const OFFER_SELECT: &str = r#"
    SELECT o.id, o.job_title, o.start_date, o.created_at,
           COALESCE(array_agg(a.id ORDER BY a.id) FILTER (WHERE a.id IS NOT NULL), '{}')
               AS applications
    FROM offers o
    LEFT JOIN applications a ON a.offer_id = o.id
"#;

const APPLICATION_SELECT: &str = r#"
    SELECT a.id, a.offer_id, a.email, a.resume, a.status, a.version, a.created_at, a.updated_at,
           COALESCE(array_agg(h.id ORDER BY h.id) FILTER (WHERE h.id IS NOT NULL), '{}')
               AS history
    FROM applications a
    LEFT JOIN application_status_history h ON h.application_id = a.id
"#;

#[derive(Debug, FromRow)]
struct OfferRow {
    id: i64,
    job_title: String,
    start_date: NaiveDate,
    created_at: Option<DateTime<Utc>>,
    applications: Vec<i64>,
}

impl From<OfferRow> for Offer {
    fn from(row: OfferRow) -> Self {
        Self {
            id: row.id,
            job_title: row.job_title,
            start_date: row.start_date,
            applications: row.applications,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ApplicationRow {
    id: i64,
    offer_id: Option<i64>,
    email: String,
    resume: String,
    status: Option<String>,
    version: i64,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    history: Vec<i64>,
}

impl TryFrom<ApplicationRow> for Application {
    type Error = Error;

    fn try_from(row: ApplicationRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            offer_id: row.offer_id,
            email: row.email,
            resume: row.resume,
            status: row.status.as_deref().map(parse_status).transpose()?,
            history: row.history,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct HistoryRow {
    id: i64,
    application_id: i64,
    status: String,
    recorded_at: DateTime<Utc>,
}

impl TryFrom<HistoryRow> for HistoryEntry {
    type Error = Error;

    fn try_from(row: HistoryRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            application_id: Some(row.application_id),
            recorded_at: row.recorded_at,
            status: parse_status(&row.status)?,
        })
    }
}

fn parse_status(raw: &str) -> Result<ApplicationStatus> {
    raw.parse()
        .map_err(|e: String| Error::Internal(format!("Corrupt status column: {}", e)))
}

#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn next_id(&self, kind: EntityKind) -> Result<i64> {
        let sequence = match kind {
            EntityKind::Offer => "offers_id_seq",
            EntityKind::Application => "applications_id_seq",
            EntityKind::HistoryEntry => "application_status_history_id_seq",
        };
        let id = sqlx::query_scalar::<_, i64>("SELECT nextval($1::regclass)")
            .bind(sequence)
            .fetch_one(&self.pool)
            .await?;
        Ok(id)
    }

    async fn find_offer_by_id(&self, id: i64) -> Result<Option<Offer>> {
        let query = format!("{} WHERE o.id = $1 GROUP BY o.id", OFFER_SELECT);
        let row = sqlx::query_as::<_, OfferRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Offer::from))
    }

    async fn find_all_offers(&self) -> Result<Vec<Offer>> {
        let query = format!("{} GROUP BY o.id ORDER BY o.id", OFFER_SELECT);
        let rows = sqlx::query_as::<_, OfferRow>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Offer::from).collect())
    }

    async fn find_application_by_id(&self, id: i64) -> Result<Option<Application>> {
        let query = format!("{} WHERE a.id = $1 GROUP BY a.id", APPLICATION_SELECT);
        let row = sqlx::query_as::<_, ApplicationRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Application::try_from).transpose()
    }

    async fn find_all_applications(&self) -> Result<Vec<Application>> {
        let query = format!("{} GROUP BY a.id ORDER BY a.id", APPLICATION_SELECT);
        let rows = sqlx::query_as::<_, ApplicationRow>(&query)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Application::try_from).collect()
    }

    async fn find_applications_by_offer(&self, offer_id: i64) -> Result<Vec<Application>> {
        let query = format!(
            "{} WHERE a.offer_id = $1 GROUP BY a.id ORDER BY a.id",
            APPLICATION_SELECT
        );
        let rows = sqlx::query_as::<_, ApplicationRow>(&query)
            .bind(offer_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Application::try_from).collect()
    }

    async fn count_applications(&self, offer_id: Option<i64>) -> Result<i64> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM applications WHERE $1::BIGINT IS NULL OR offer_id = $1",
        )
        .bind(offer_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }

    async fn find_history(&self, application_id: i64) -> Result<Vec<HistoryEntry>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT id, application_id, status, recorded_at
            FROM application_status_history
            WHERE application_id = $1
            ORDER BY id
            "#,
        )
        .bind(application_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(HistoryEntry::try_from).collect()
    }

    async fn save_offer(&self, offer: &Offer) -> Result<Offer> {
        sqlx::query(
            r#"
            INSERT INTO offers (id, job_title, start_date)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
            SET job_title = EXCLUDED.job_title,
                start_date = EXCLUDED.start_date
            "#,
        )
        .bind(offer.id)
        .bind(&offer.job_title)
        .bind(offer.start_date)
        .execute(&self.pool)
        .await?;

        self.find_offer_by_id(offer.id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Offer #{} not found", offer.id)))
    }

    async fn save_application(
        &self,
        application: &Application,
        new_entries: &[HistoryEntry],
    ) -> Result<Application> {
        check_entries(application, new_entries)?;
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO applications (id, offer_id, email, resume, status, version)
            VALUES ($1, $2, $3, $4, $5, $6 + 1)
            ON CONFLICT (id) DO UPDATE
            SET offer_id = EXCLUDED.offer_id,
                email = EXCLUDED.email,
                resume = EXCLUDED.resume,
                status = EXCLUDED.status,
                version = EXCLUDED.version,
                updated_at = NOW()
            WHERE applications.version = $6
            "#,
        )
        .bind(application.id)
        .bind(application.offer_id)
        .bind(&application.email)
        .bind(&application.resume)
        .bind(application.status.map(|s| s.as_str()))
        .bind(application.version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::Conflict(format!(
                "application #{} was modified concurrently",
                application.id
            )));
        }

        for entry in new_entries {
            sqlx::query(
                r#"
                INSERT INTO application_status_history (id, application_id, status, recorded_at)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(entry.id)
            .bind(application.id)
            .bind(entry.status.as_str())
            .bind(entry.recorded_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.find_application_by_id(application.id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Application #{} not found", application.id)))
    }

    async fn delete_application(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM applications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Application #{} not found", id)));
        }
        Ok(())
    }
}
