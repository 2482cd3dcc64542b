use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Vehicle input
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Condition {
    Excellent,
    VeryGood,
    Good,
    Fair,
    Poor,
}

impl Condition {
    pub const ALL: [Condition; 5] = [
        Condition::Excellent,
        Condition::VeryGood,
        Condition::Good,
        Condition::Fair,
        Condition::Poor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Excellent => "excellent",
            Condition::VeryGood => "very-good",
            Condition::Good => "good",
            Condition::Fair => "fair",
            Condition::Poor => "poor",
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Condition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Condition::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown condition '{s}'"))
    }
}

/// A validated vehicle. Built by the validation layer, consumed by the estimator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleDescriptor {
    pub make: String,
    pub model: String,
    pub year: i32,
    /// Kilometres.
    pub mileage: u32,
    pub condition: Condition,
    pub vin: Option<String>,
}

impl VehicleDescriptor {
    /// A VIN counts only when it is at least 17 characters long. No checksum.
    pub fn has_usable_vin(&self) -> bool {
        self.vin
            .as_deref()
            .map_or(false, |v| v.chars().count() >= crate::config::VIN_MIN_LEN)
    }
}

// ---------------------------------------------------------------------------
// Valuation output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketTrend {
    Rising,
    Stable,
    Declining,
}

impl std::fmt::Display for MarketTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MarketTrend::Rising => "rising",
            MarketTrend::Stable => "stable",
            MarketTrend::Declining => "declining",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for MarketTrend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rising" => Ok(MarketTrend::Rising),
            "stable" => Ok(MarketTrend::Stable),
            "declining" => Ok(MarketTrend::Declining),
            other => Err(format!("unknown market trend '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: i64,
    pub max: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparableListing {
    pub year: i32,
    pub make: String,
    pub model: String,
    pub mileage: u32,
    pub price: i64,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    pub estimated_value: i64,
    pub price_range: PriceRange,
    pub confidence: f64,
    pub market_trend: MarketTrend,
    pub analysis: String,
    pub comparable_listings: Vec<ComparableListing>,
    /// Demand rating, 5..=9.
    pub market_demand: u8,
    pub insights: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationResult {
    /// Whole euros.
    pub estimated_value: i64,
    pub confidence: f64,
    pub market_trend: MarketTrend,
    pub report_data: ReportData,
}

// ---------------------------------------------------------------------------
// Stored records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestSource {
    Web,
    Api,
}

impl std::fmt::Display for RequestSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestSource::Web => write!(f, "web"),
            RequestSource::Api => write!(f, "api"),
        }
    }
}

impl std::str::FromStr for RequestSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "web" => Ok(RequestSource::Web),
            "api" => Ok(RequestSource::Api),
            other => Err(format!("unknown request source '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InquiryStatus {
    Unread,
    Read,
    Replied,
}

impl std::fmt::Display for InquiryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InquiryStatus::Unread => "unread",
            InquiryStatus::Read => "read",
            InquiryStatus::Replied => "replied",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for InquiryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unread" => Ok(InquiryStatus::Unread),
            "read" => Ok(InquiryStatus::Read),
            "replied" => Ok(InquiryStatus::Replied),
            other => Err(format!("unknown inquiry status '{other}'")),
        }
    }
}

/// A persisted valuation as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredValuation {
    pub id: i64,
    pub user_id: Option<i64>,
    pub client_email: Option<String>,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub mileage: u32,
    pub vin: Option<String>,
    pub condition: Condition,
    pub estimated_value: i64,
    pub confidence: f64,
    pub market_trend: MarketTrend,
    pub report_data: ReportData,
    pub status: String,
    pub is_paid: bool,
    pub request_source: RequestSource,
    /// RFC 3339, UTC.
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Inquiry {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
    pub status: InquiryStatus,
    pub notes: Option<String>,
    pub created_at: String,
}

/// A validated contact-form submission, not yet stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInquiry {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::User => write!(f, "user"),
            UserRole::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(UserRole::User),
            "admin" => Ok(UserRole::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Regular,
    Premium,
    Business,
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Plan::Free => "free",
            Plan::Regular => "regular",
            Plan::Premium => "premium",
            Plan::Business => "business",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Plan::Free),
            "regular" => Ok(Plan::Regular),
            "premium" => Ok(Plan::Premium),
            "business" => Ok(Plan::Business),
            other => Err(format!("unknown plan '{other}'")),
        }
    }
}

/// Recorded only; nothing here bills or expires subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Inactive,
    Trial,
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Inactive => "inactive",
            SubscriptionStatus::Trial => "trial",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SubscriptionStatus::Active),
            "inactive" => Ok(SubscriptionStatus::Inactive),
            "trial" => Ok(SubscriptionStatus::Trial),
            other => Err(format!("unknown subscription status '{other}'")),
        }
    }
}

/// A registered user. No credentials are stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: UserRole,
    pub plan: Plan,
    pub subscription_status: SubscriptionStatus,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// A validated registration, not yet stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Admin edits. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<UserRole>,
    pub plan: Option<Plan>,
    pub subscription_status: Option<SubscriptionStatus>,
    pub is_active: Option<bool>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        *self == UserUpdate::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: i64,
    pub total_valuations: i64,
    pub paid_valuations: i64,
    pub valuations_today: i64,
    pub total_inquiries: i64,
    pub unread_inquiries: i64,
}
