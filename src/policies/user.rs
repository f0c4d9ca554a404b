//! User resource policy.
//!
//! Users are managed strictly top-down: superadmins bypass most checks but
//! still cannot mint or promote another superadmin, admins manage only
//! accounts below them, and plain users may never act on User resources.

use super::{evaluate, hierarchically_allowed, Ability, Decision};
use crate::errors::{AppError, AppResult};
use crate::models::role::Role;
use crate::models::user::User;

#[derive(Debug)]
pub enum UserAction<'a> {
    View {
        target: &'a User,
    },
    Store {
        requested_role: Option<&'a str>,
    },
    Update {
        target: &'a User,
        new_role: Option<&'a str>,
    },
    Delete {
        target: &'a User,
    },
    List {
        role: Option<&'a str>,
    },
}

impl UserAction<'_> {
    pub fn ability(&self) -> Ability {
        match self {
            UserAction::View { .. } => Ability::View,
            UserAction::Store { .. } => Ability::Store,
            UserAction::Update { .. } => Ability::Update,
            UserAction::Delete { .. } => Ability::Delete,
            UserAction::List { .. } => Ability::List,
        }
    }
}

pub fn authorize(actor: &User, action: &UserAction) -> AppResult<()> {
    let allowed = decide(actor, action);
    tracing::debug!(
        actor_id = %actor.id,
        actor_role = %actor.role,
        ability = action.ability().as_str(),
        allowed,
        "user policy decision"
    );

    if allowed {
        Ok(())
    } else {
        Err(AppError::forbidden())
    }
}

pub fn decide(actor: &User, action: &UserAction) -> bool {
    evaluate(pre_check(actor, action.ability()), || rule(actor, action))
}

/// Superadmins pass everything except the abilities that guard against
/// self-deletion and privilege escalation; plain users are cut off from the
/// whole resource.
fn pre_check(actor: &User, ability: Ability) -> Decision {
    if actor.role == Role::Superadmin
        && !matches!(ability, Ability::Delete | Ability::Store | Ability::Update)
    {
        return Decision::Allow;
    }

    if actor.role == Role::User {
        return Decision::Deny;
    }

    Decision::Continue
}

fn rule(actor: &User, action: &UserAction) -> Decision {
    match action {
        UserAction::View { target } => {
            if hierarchically_allowed(actor, target.id, target.role) {
                Decision::Allow
            } else {
                Decision::Deny
            }
        }
        UserAction::Store { requested_role } => store(actor, *requested_role),
        UserAction::Update { target, new_role } => update(actor, target, *new_role),
        UserAction::Delete { target } => delete(actor, target),
        UserAction::List { role } => list(actor, *role),
    }
}

fn store(actor: &User, requested_role: Option<&str>) -> Decision {
    let requested = requested_role.and_then(Role::parse);

    // No one may create a superadmin, whatever the actor's rank.
    if requested == Some(Role::Superadmin) {
        return Decision::Deny;
    }

    if actor.role == Role::Superadmin {
        return Decision::Allow;
    }

    if actor.role == Role::Admin
        && requested.map_or(false, |role| actor.role.lower_roles().contains(&role))
    {
        return Decision::Allow;
    }

    Decision::Deny
}

fn update(actor: &User, target: &User, new_role: Option<&str>) -> Decision {
    let requested = new_role.and_then(Role::parse);

    // No promotion to superadmin through any path.
    if requested == Some(Role::Superadmin) {
        return Decision::Deny;
    }

    let role_assignable = match new_role {
        None => true,
        Some(_) => requested.map_or(false, |role| actor.role.lower_roles().contains(&role)),
    };

    if hierarchically_allowed(actor, target.id, target.role) && role_assignable {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

fn delete(actor: &User, target: &User) -> Decision {
    // An account can never delete itself through this path.
    if actor.id == target.id {
        return Decision::Deny;
    }

    if hierarchically_allowed(actor, target.id, target.role) {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

fn list(actor: &User, role: Option<&str>) -> Decision {
    if let Some(raw) = role {
        let Some(requested) = Role::parse(raw) else {
            return Decision::Deny;
        };

        if actor.role == Role::Admin && !actor.role.lower_roles().contains(&requested) {
            return Decision::Deny;
        }
    }

    if matches!(actor.role, Role::Admin | Role::Superadmin) {
        Decision::Allow
    } else {
        Decision::Deny
    }
}
