use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::domain::actor::{Actor, ActorRole};
use crate::flows::WorkflowAction;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationDecision {
    pub allowed: bool,
    pub reason: String,
}

impl AuthorizationDecision {
    fn allow(reason: impl Into<String>) -> Self {
        Self { allowed: true, reason: reason.into() }
    }

    fn deny(reason: impl Into<String>) -> Self {
        Self { allowed: false, reason: reason.into() }
    }
}

/// Decides whether an actor may issue a workflow action. Consulted before the
/// request is loaded, so a refusal never touches storage.
pub trait AuthorizationPolicy: Send + Sync {
    fn authorize(&self, actor: &Actor, action: WorkflowAction) -> AuthorizationDecision;
}

/// Grants each role a fixed set of actions. Administrators may do everything.
#[derive(Clone, Debug)]
pub struct RoleAuthorizationPolicy {
    grants: HashMap<ActorRole, HashSet<WorkflowAction>>,
}

impl RoleAuthorizationPolicy {
    pub fn new(grants: impl IntoIterator<Item = (ActorRole, Vec<WorkflowAction>)>) -> Self {
        let grants = grants
            .into_iter()
            .map(|(role, actions)| (role, actions.into_iter().collect::<HashSet<_>>()))
            .collect();
        Self { grants }
    }

    pub fn permits(&self, role: ActorRole, action: WorkflowAction) -> bool {
        role == ActorRole::Administrator
            || self.grants.get(&role).is_some_and(|actions| actions.contains(&action))
    }
}

impl Default for RoleAuthorizationPolicy {
    fn default() -> Self {
        Self::new([
            (ActorRole::Requester, vec![WorkflowAction::Create]),
            (ActorRole::TechnicalReviewer, vec![WorkflowAction::Approve, WorkflowAction::Reject]),
            (
                ActorRole::ExecutionTechnician,
                vec![WorkflowAction::BeginExecution, WorkflowAction::CompleteExecution],
            ),
        ])
    }
}

impl AuthorizationPolicy for RoleAuthorizationPolicy {
    fn authorize(&self, actor: &Actor, action: WorkflowAction) -> AuthorizationDecision {
        if actor.id.trim().is_empty() {
            return AuthorizationDecision::deny("actor identity is missing");
        }

        if self.permits(actor.role, action) {
            AuthorizationDecision::allow(format!(
                "role `{}` may {}",
                actor.role.as_str(),
                action.as_str()
            ))
        } else {
            AuthorizationDecision::deny(format!(
                "role `{}` may not {}",
                actor.role.as_str(),
                action.as_str()
            ))
        }
    }
}
