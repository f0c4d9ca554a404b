//! Authorization decision engine.
//!
//! Every resource/ability pair is decided by a short-circuit, three-outcome
//! evaluation: a resource-wide pre-check runs first and may resolve the
//! request on its own; only when it abstains does the ability-specific rule
//! run. Rules are pure synchronous functions over already-resolved data and
//! always land on a definite allow or deny.

pub mod task;
pub mod user;

use uuid::Uuid;

use crate::models::role::Role;
use crate::models::user::User;

/// Abilities evaluated against a resource. The set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ability {
    View,
    Store,
    Update,
    Delete,
    List,
}

impl Ability {
    pub fn as_str(self) -> &'static str {
        match self {
            Ability::View => "view",
            Ability::Store => "store",
            Ability::Update => "update",
            Ability::Delete => "delete",
            Ability::List => "list",
        }
    }
}

/// Outcome of a policy rule. `Continue` is only meaningful for pre-checks;
/// ability rules always resolve to `Allow` or `Deny`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
    Continue,
}

/// Ordered evaluator: the pre-check short-circuits, `Continue` falls
/// through to the ability rule.
pub fn evaluate(pre_check: Decision, ability_rule: impl FnOnce() -> Decision) -> bool {
    match pre_check {
        Decision::Allow => true,
        Decision::Deny => false,
        Decision::Continue => matches!(ability_rule(), Decision::Allow),
    }
}

/// The crux of the authorization model, implemented exactly once: an actor
/// may act on a subject when it strictly dominates the subject's role, or
/// when the subject is the actor itself.
pub fn hierarchically_allowed(actor: &User, subject_id: Uuid, subject_role: Role) -> bool {
    actor.role.dominates(subject_role) || actor.id == subject_id
}
