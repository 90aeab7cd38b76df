pub mod audit;
pub mod bulk;
pub mod catalog;
pub mod groups;
pub mod health;
pub mod memberships;
pub mod overrides;
pub mod positions;
pub mod resolve;

use crate::app::AppState;
use crate::authz::{self, Action, AuthzMode, Decision, PERMISSIONS_FUNCTION};
use crate::errors::{AppError, AppResult, NOT_PERMITTED};
use crate::jwt::Actor;
use crate::store::profiles;
use crate::utils::utc_now;

/// What an admin endpoint demands of its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Requirement {
    /// `access` or `manage` on the permissions administration function.
    Permissions(Action),
    SuperAdmin,
}

/// Check the caller against `requirement`, honouring the enforcement mode.
///
/// Denials never say which source was consulted. Callers without a profile
/// are denied like anyone else.
pub(crate) async fn gate(state: &AppState, actor: &Actor, requirement: Requirement) -> AppResult<()> {
    if state.mode == AuthzMode::Off {
        return Ok(());
    }

    let allowed = match requirement {
        Requirement::Permissions(action) => has_permissions_access(state, actor, action).await?,
        Requirement::SuperAdmin => profiles::find_profile(&state.pool, actor.user_id)
            .await?
            .map(|p| p.is_super_admin())
            .unwrap_or(false),
    };

    if allowed {
        return Ok(());
    }

    match state.mode {
        AuthzMode::Advisory => {
            tracing::warn!(user_id = %actor.user_id, ?requirement, "advisory mode: request would be denied");
            Ok(())
        }
        _ => {
            tracing::debug!(user_id = %actor.user_id, ?requirement, "request denied");
            Err(AppError::forbidden(NOT_PERMITTED))
        }
    }
}

/// Whether the caller may see decision details (reason and source).
pub(crate) async fn is_admin(state: &AppState, actor: &Actor) -> AppResult<bool> {
    has_permissions_access(state, actor, Action::Access).await
}

async fn has_permissions_access(state: &AppState, actor: &Actor, action: Action) -> AppResult<bool> {
    let decision = authz::authorize(
        &state.pool,
        state.resolver.as_ref(),
        actor.user_id,
        PERMISSIONS_FUNCTION,
        action,
        utc_now(),
    )
    .await;

    match decision {
        Ok(Decision { allowed, .. }) => Ok(allowed),
        Err(AppError::NotFound(_)) => Ok(false),
        Err(err) => Err(err),
    }
}
