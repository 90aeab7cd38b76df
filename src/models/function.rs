use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// An addressable application function gated by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AppFunction {
    #[schema(example = "tours.manage")]
    pub id: String,
    #[schema(example = "Manage Tours")]
    pub name: String,
    #[schema(example = "tours")]
    pub category: String,
    /// Module name used by individual overrides.
    #[schema(example = "tours")]
    pub module: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Presentation metadata for a catalog category. Kept as data so the UI never
/// has to switch on category strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CategoryInfo {
    pub tag: &'static str,
    pub label: &'static str,
    pub color: &'static str,
    pub icon: &'static str,
}
