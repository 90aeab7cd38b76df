use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::audit::Auditable;

/// Per-user, per-module grant keyed by e-mail so it can be provisioned before
/// the account exists. Only ever grants `access`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct IndividualOverride {
    #[schema(example = "ada@example.com")]
    pub user_email: String,
    #[schema(example = "tours")]
    pub module_name: String,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub granted_by: Option<Uuid>,
    pub granted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Auditable for IndividualOverride {
    fn entity_type() -> &'static str { "override" }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GrantOverrideRequest {
    #[schema(example = "ada@example.com")]
    pub user_email: String,
    #[schema(example = "tours")]
    pub module_name: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Grant every module of a catalog category to one address.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CategoryOverrideRequest {
    #[schema(example = "ada@example.com")]
    pub user_email: String,
    #[schema(example = "community")]
    pub category: String,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OverrideListQuery {
    pub email: Option<String>,
}
