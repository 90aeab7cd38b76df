use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::audit::Auditable;
use crate::models::profile::ExecPosition;

/// One cell of the executive-board position matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PositionFunctionGrant {
    pub position: ExecPosition,
    #[schema(example = "tours.manage")]
    pub function_id: String,
    pub can_access: bool,
    pub can_manage: bool,
}

impl Auditable for PositionFunctionGrant {
    fn entity_type() -> &'static str { "position_grant" }
    fn function_id(&self) -> Option<&str> { Some(&self.function_id) }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PositionGrantRequest {
    pub can_access: bool,
    pub can_manage: bool,
}
