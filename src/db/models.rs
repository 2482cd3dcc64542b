//! Database row types matching `migrations/`, plus their conversion into API
//! records.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::AppError;
use crate::types::{
    Inquiry, ReportData, RequestSource, StoredValuation, User, ValuationResult, VehicleDescriptor,
};

/// Everything needed to persist one valuation.
#[derive(Debug, Clone)]
pub struct NewValuation {
    pub vehicle: VehicleDescriptor,
    pub result: ValuationResult,
    pub user_id: Option<i64>,
    pub client_email: Option<String>,
    pub request_source: RequestSource,
}

#[derive(Debug, sqlx::FromRow)]
pub struct ValuationRow {
    pub id: i64,
    pub user_id: Option<i64>,
    pub client_email: Option<String>,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub mileage: i64,
    pub vin: Option<String>,
    pub condition: String,
    pub estimated_value: i64,
    pub confidence: f64,
    pub market_trend: String,
    /// JSON-encoded `ReportData`.
    pub report_data: String,
    pub status: String,
    pub is_paid: bool,
    pub request_source: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
}

#[derive(Debug, sqlx::FromRow)]
pub struct InquiryRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: String,
    pub plan: String,
    pub subscription_status: String,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<ValuationRow> for StoredValuation {
    type Error = AppError;

    fn try_from(row: ValuationRow) -> Result<Self, Self::Error> {
        let report_data: ReportData = serde_json::from_str(&row.report_data)?;
        Ok(StoredValuation {
            id: row.id,
            user_id: row.user_id,
            client_email: row.client_email,
            make: row.make,
            model: row.model,
            year: row.year,
            mileage: u32::try_from(row.mileage)
                .map_err(|_| decode_error(format!("mileage {} out of range", row.mileage)))?,
            vin: row.vin,
            condition: row.condition.parse().map_err(decode_error)?,
            estimated_value: row.estimated_value,
            confidence: row.confidence,
            market_trend: row.market_trend.parse().map_err(decode_error)?,
            report_data,
            status: row.status,
            is_paid: row.is_paid,
            request_source: row.request_source.parse().map_err(decode_error)?,
            created_at: format_timestamp(row.created_at),
        })
    }
}

impl TryFrom<InquiryRow> for Inquiry {
    type Error = AppError;

    fn try_from(row: InquiryRow) -> Result<Self, Self::Error> {
        Ok(Inquiry {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            message: row.message,
            status: row.status.parse().map_err(decode_error)?,
            notes: row.notes,
            created_at: format_timestamp(row.created_at),
        })
    }
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            role: row.role.parse().map_err(decode_error)?,
            plan: row.plan.parse().map_err(decode_error)?,
            subscription_status: row.subscription_status.parse().map_err(decode_error)?,
            is_active: row.is_active,
            created_at: format_timestamp(row.created_at),
            updated_at: format_timestamp(row.updated_at),
        })
    }
}

fn decode_error(msg: String) -> AppError {
    AppError::Database(sqlx::Error::Decode(msg.into()))
}

/// Epoch milliseconds → RFC 3339 UTC (`2025-05-12T10:45:00.000Z`).
pub fn format_timestamp(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_render_as_utc() {
        assert_eq!(format_timestamp(0), "1970-01-01T00:00:00.000Z");
        assert_eq!(format_timestamp(1_683_888_300_000), "2023-05-12T10:45:00.000Z");
    }

    #[test]
    fn bad_enum_text_is_a_decode_error() {
        let row = InquiryRow {
            id: 1,
            name: "n".to_string(),
            email: "e@x.io".to_string(),
            phone: None,
            message: "m".to_string(),
            status: "archived".to_string(),
            notes: None,
            created_at: 0,
        };
        assert!(matches!(Inquiry::try_from(row), Err(AppError::Database(_))));
    }

    #[test]
    fn user_row_maps_enums_and_timestamps() {
        let row = UserRow {
            id: 2,
            email: "ivan@example.com".to_string(),
            first_name: Some("Ivan".to_string()),
            last_name: Some("Petrov".to_string()),
            role: "user".to_string(),
            plan: "premium".to_string(),
            subscription_status: "trial".to_string(),
            is_active: true,
            created_at: 0,
            updated_at: 1_683_888_300_000,
        };
        let user = User::try_from(row).unwrap();
        assert_eq!(user.plan, crate::types::Plan::Premium);
        assert_eq!(user.subscription_status, crate::types::SubscriptionStatus::Trial);
        assert_eq!(user.updated_at, "2023-05-12T10:45:00.000Z");
    }
}
