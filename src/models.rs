use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

// ============================================================================
// ENUMS
// ============================================================================

/// Review state of a business application (stored as text)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(ApplicationStatus::Pending),
            "approved" => Some(ApplicationStatus::Approved),
            "rejected" => Some(ApplicationStatus::Rejected),
            _ => None,
        }
    }
}

/// Whether an application proposes a new listing or edits an existing one
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationType {
    New,
    Edit,
}

impl ApplicationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationType::New => "new",
            ApplicationType::Edit => "edit",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "new" => Some(ApplicationType::New),
            "edit" => Some(ApplicationType::Edit),
            _ => None,
        }
    }
}

// ============================================================================
// BUSINESSES
// ============================================================================

/// Directory listing
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Business {
    pub id: i32,
    pub business_name: String,
    pub category: Option<String>,
    pub location: Option<String>,
    pub contact_name: Option<String>,
    pub tel: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
}

/// Category lookup row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq, Eq)]
pub struct Category {
    pub id: i32,
    pub name: String,
}

/// Payload for admin create and update
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BusinessPayload {
    #[validate(length(min = 1, max = 255, message = "business_name is required"))]
    pub business_name: String,
    #[validate(length(min = 1, max = 100, message = "category is required"))]
    pub category: String,
    pub location: Option<String>,
    #[validate(length(max = 255))]
    pub contact_name: Option<String>,
    #[validate(length(max = 50))]
    pub tel: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 255))]
    pub website: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub featured: bool,
}

impl BusinessPayload {
    /// Trims text fields and turns blank optionals into `None`.
    pub fn normalized(mut self) -> Self {
        self.business_name = self.business_name.trim().to_string();
        self.category = self.category.trim().to_string();
        for field in [
            &mut self.location,
            &mut self.contact_name,
            &mut self.tel,
            &mut self.email,
            &mut self.website,
            &mut self.description,
        ] {
            *field = field
                .take()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty());
        }
        self
    }
}

#[derive(Debug, Deserialize)]
pub struct SetFeaturedRequest {
    pub id: Option<i32>,
    pub featured: Option<bool>,
}

// ============================================================================
// BUSINESS APPLICATIONS
// ============================================================================

/// Submitted application awaiting review
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BusinessApplication {
    pub id: i32,
    pub business_name: String,
    pub location: Option<String>,
    pub category: Option<String>,
    pub contact_name: Option<String>,
    pub tel: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub status: String,
    pub application_type: String,
    pub business_id: Option<i32>,
    pub submitted_at: DateTime<Utc>,
}

/// Application fields collected from the public submission form
#[derive(Debug, Clone, Default, Validate)]
pub struct NewBusinessApplication {
    #[validate(length(min = 1, max = 255, message = "business_name is required"))]
    pub business_name: String,
    #[validate(length(min = 1, message = "location is required"))]
    pub location: String,
    #[validate(length(min = 1, max = 100, message = "category is required"))]
    pub category: String,
    pub contact_name: Option<String>,
    #[validate(length(min = 1, max = 50, message = "tel is required"))]
    pub tel: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    pub website: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub application_type: Option<ApplicationType>,
    pub business_id: Option<i32>,
}

impl NewBusinessApplication {
    /// Builds an application from multipart text fields.
    pub fn from_form_field(&mut self, name: &str, value: String) {
        let trimmed = value.trim().to_string();
        let optional = Some(trimmed.clone()).filter(|v| !v.is_empty());
        match name {
            "business_name" => self.business_name = trimmed,
            "location" => self.location = trimmed,
            "category" => self.category = trimmed,
            "contact_name" => self.contact_name = optional,
            "tel" => self.tel = trimmed,
            "email" => self.email = trimmed,
            "website" => self.website = optional,
            "description" => self.description = optional,
            "application_type" => self.application_type = ApplicationType::parse(&trimmed),
            "business_id" => self.business_id = trimmed.parse().ok(),
            other => log::debug!("Ignoring unknown application field '{other}'"),
        }
    }

    pub fn kind(&self) -> ApplicationType {
        self.application_type.unwrap_or(ApplicationType::New)
    }
}

#[derive(Debug, Deserialize)]
pub struct ApplicationStatusRequest {
    pub status: Option<String>,
}

/// Result of a status change; `business` is set when an approval touched a listing
#[derive(Debug, Serialize)]
pub struct ApplicationDecision {
    pub application: BusinessApplication,
    pub business: Option<Business>,
}

// ============================================================================
// ADMINS
// ============================================================================

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Admin {
    pub id: i32,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Authenticated admin resolved from a session cookie
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AdminPrincipal {
    pub id: i32,
    pub username: String,
    #[serde(skip)]
    pub token: uuid::Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePasswordRequest {
    #[serde(rename = "currentPassword")]
    #[validate(length(min = 1, message = "currentPassword is required"))]
    pub current_password: String,
    #[serde(rename = "newPassword")]
    #[validate(length(min = 8, max = 128, message = "newPassword must be 8 to 128 characters"))]
    pub new_password: String,
}

// ============================================================================
// RESPONSES
// ============================================================================

/// Page of businesses plus the filters that produced it
#[derive(Debug, Serialize)]
pub struct BusinessPage {
    pub businesses: Vec<Business>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub category_filter: Option<String>,
    pub search_term: Option<String>,
    pub status_filter: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ApplicationPage {
    pub applications: Vec<BusinessApplication>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub category_filter: Option<String>,
    pub search_term: Option<String>,
    pub status_filter: Option<String>,
}

/// `{success, message}` body for mutations
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

impl ActionResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryStats {
    pub total_businesses: i64,
    pub total_categories: i64,
    pub featured_businesses: i64,
    pub pending_applications: i64,
}
