use tracing::{debug, info};

use crate::db::models::{InquiryRow, NewValuation, UserRow, ValuationRow};
use crate::error::{AppError, Result};
use crate::types::{
    DashboardStats, Inquiry, InquiryStatus, NewInquiry, NewUser, StoredValuation, User, UserUpdate,
};

const VALUATION_COLUMNS: &str = "id, user_id, client_email, make, model, year, mileage, vin, \
     condition, estimated_value, confidence, market_trend, report_data, status, is_paid, \
     request_source, created_at";

const INQUIRY_COLUMNS: &str = "id, name, email, phone, message, status, notes, created_at";

const USER_COLUMNS: &str = "id, email, first_name, last_name, role, plan, subscription_status, \
     is_active, created_at, updated_at";

const DAY_MS: i64 = 24 * 3_600 * 1_000;

/// Valuation, inquiry and user persistence on SQLite. Cheap to clone; shares the pool.
#[derive(Clone)]
pub struct ValuationStore {
    pool: sqlx::SqlitePool,
}

impl ValuationStore {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    // -----------------------------------------------------------------------
    // Valuations
    // -----------------------------------------------------------------------

    pub async fn insert_valuation(&self, new: &NewValuation) -> Result<StoredValuation> {
        let report_data = serde_json::to_string(&new.result.report_data)?;
        let created_at = now_ms();

        let id = sqlx::query(
            r#"
            INSERT INTO valuations (
                user_id, client_email, make, model, year, mileage, vin, condition,
                estimated_value, confidence, market_trend, report_data,
                status, is_paid, request_source, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'completed', 0, ?, ?)
            "#,
        )
        .bind(new.user_id)
        .bind(new.client_email.as_deref())
        .bind(&new.vehicle.make)
        .bind(&new.vehicle.model)
        .bind(new.vehicle.year)
        .bind(i64::from(new.vehicle.mileage))
        .bind(new.vehicle.vin.as_deref())
        .bind(new.vehicle.condition.as_str())
        .bind(new.result.estimated_value)
        .bind(new.result.confidence)
        .bind(new.result.market_trend.to_string())
        .bind(report_data)
        .bind(new.request_source.to_string())
        .bind(created_at)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        debug!(valuation_id = id, "Valuation stored");
        self.get_valuation(id)
            .await?
            .ok_or(AppError::NotFound("valuation"))
    }

    pub async fn get_valuation(&self, id: i64) -> Result<Option<StoredValuation>> {
        let sql = format!("SELECT {VALUATION_COLUMNS} FROM valuations WHERE id = ?");
        sqlx::query_as::<_, ValuationRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(StoredValuation::try_from)
            .transpose()
    }

    /// Newest first.
    pub async fn list_valuations(&self, limit: i64) -> Result<Vec<StoredValuation>> {
        let sql = format!(
            "SELECT {VALUATION_COLUMNS} FROM valuations ORDER BY created_at DESC, id DESC LIMIT ?"
        );
        let rows = sqlx::query_as::<_, ValuationRow>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(StoredValuation::try_from).collect()
    }

    /// Newest first.
    pub async fn list_user_valuations(&self, user_id: i64) -> Result<Vec<StoredValuation>> {
        let sql = format!(
            "SELECT {VALUATION_COLUMNS} FROM valuations WHERE user_id = ? \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, ValuationRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(StoredValuation::try_from).collect()
    }

    /// Returns `None` if no valuation has this id.
    pub async fn set_paid(&self, id: i64, paid: bool) -> Result<Option<StoredValuation>> {
        let updated = sqlx::query("UPDATE valuations SET is_paid = ? WHERE id = ?")
            .bind(paid)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if updated == 0 {
            return Ok(None);
        }
        info!(valuation_id = id, paid, "Valuation payment flag updated");
        self.get_valuation(id).await
    }

    // -----------------------------------------------------------------------
    // Inquiries
    // -----------------------------------------------------------------------

    pub async fn insert_inquiry(&self, new: &NewInquiry) -> Result<Inquiry> {
        let id = sqlx::query(
            r#"
            INSERT INTO inquiries (name, email, phone, message, status, created_at)
            VALUES (?, ?, ?, ?, 'unread', ?)
            "#,
        )
        .bind(&new.name)
        .bind(&new.email)
        .bind(new.phone.as_deref())
        .bind(&new.message)
        .bind(now_ms())
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        debug!(inquiry_id = id, "Inquiry stored");
        self.get_inquiry(id)
            .await?
            .ok_or(AppError::NotFound("inquiry"))
    }

    pub async fn get_inquiry(&self, id: i64) -> Result<Option<Inquiry>> {
        let sql = format!("SELECT {INQUIRY_COLUMNS} FROM inquiries WHERE id = ?");
        sqlx::query_as::<_, InquiryRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Inquiry::try_from)
            .transpose()
    }

    /// Newest first.
    pub async fn list_inquiries(&self, limit: i64) -> Result<Vec<Inquiry>> {
        let sql = format!(
            "SELECT {INQUIRY_COLUMNS} FROM inquiries ORDER BY created_at DESC, id DESC LIMIT ?"
        );
        let rows = sqlx::query_as::<_, InquiryRow>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Inquiry::try_from).collect()
    }

    /// Fields left as `None` keep their stored value. Returns `None` for an unknown id.
    pub async fn update_inquiry(
        &self,
        id: i64,
        status: Option<InquiryStatus>,
        notes: Option<&str>,
    ) -> Result<Option<Inquiry>> {
        let updated = sqlx::query(
            "UPDATE inquiries SET status = COALESCE(?, status), notes = COALESCE(?, notes) WHERE id = ?",
        )
        .bind(status.map(|s| s.to_string()))
        .bind(notes)
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        if updated == 0 {
            return Ok(None);
        }
        self.get_inquiry(id).await
    }

    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    /// New users start as `user` / `free` / `inactive`. Emails are unique, case-insensitively.
    pub async fn insert_user(&self, new: &NewUser) -> Result<User> {
        let now = now_ms();
        let inserted = sqlx::query(
            r#"
            INSERT INTO users (email, first_name, last_name, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new.email)
        .bind(new.first_name.as_deref())
        .bind(new.last_name.as_deref())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await;

        let id = match inserted {
            Ok(done) => done.last_insert_rowid(),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(AppError::Conflict(format!(
                    "a user with email {} already exists",
                    new.email
                )));
            }
            Err(e) => return Err(e.into()),
        };

        info!(user_id = id, "User registered");
        self.get_user(id).await?.ok_or(AppError::NotFound("user"))
    }

    pub async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    /// Newest first.
    pub async fn list_users(&self, limit: i64) -> Result<Vec<User>> {
        let sql =
            format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC LIMIT ?");
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(User::try_from).collect()
    }

    /// Fields left as `None` keep their stored value. Returns `None` for an unknown id.
    pub async fn update_user(&self, id: i64, update: &UserUpdate) -> Result<Option<User>> {
        let updated = sqlx::query(
            r#"
            UPDATE users SET
                first_name = COALESCE(?, first_name),
                last_name = COALESCE(?, last_name),
                role = COALESCE(?, role),
                plan = COALESCE(?, plan),
                subscription_status = COALESCE(?, subscription_status),
                is_active = COALESCE(?, is_active),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(update.first_name.as_deref())
        .bind(update.last_name.as_deref())
        .bind(update.role.map(|r| r.to_string()))
        .bind(update.plan.map(|p| p.to_string()))
        .bind(update.subscription_status.map(|s| s.to_string()))
        .bind(update.is_active)
        .bind(now_ms())
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        if updated == 0 {
            return Ok(None);
        }
        info!(user_id = id, "User updated");
        self.get_user(id).await
    }

    // -----------------------------------------------------------------------
    // Dashboard
    // -----------------------------------------------------------------------

    pub async fn dashboard_stats(&self) -> Result<DashboardStats> {
        let (total_users,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        let now = now_ms();
        let today_start = now - now.rem_euclid(DAY_MS);

        let (total_valuations, paid_valuations, valuations_today): (i64, i64, i64) =
            sqlx::query_as(
                r#"
                SELECT
                    COUNT(*),
                    COALESCE(SUM(is_paid), 0),
                    COALESCE(SUM(CASE WHEN created_at >= ? THEN 1 ELSE 0 END), 0)
                FROM valuations
                "#,
            )
            .bind(today_start)
            .fetch_one(&self.pool)
            .await?;

        let (total_inquiries, unread_inquiries): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN status = 'unread' THEN 1 ELSE 0 END), 0)
            FROM inquiries
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(DashboardStats {
            total_users,
            total_valuations,
            paid_valuations,
            valuations_today,
            total_inquiries,
            unread_inquiries,
        })
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
