//! Task resource policy.
//!
//! Tasks are self-service: owners manage their own, and anyone who
//! hierarchically dominates the owner can step in. The only elevated-rank
//! requirement is handing a task to somebody else.

use uuid::Uuid;

use super::{evaluate, hierarchically_allowed, Ability, Decision};
use crate::errors::{AppError, AppResult};
use crate::models::role::Role;
use crate::models::task::Task;
use crate::models::user::User;

#[derive(Debug)]
pub enum TaskAction<'a> {
    View {
        task: &'a Task,
    },
    Store {
        requested_owner_id: Option<Uuid>,
        /// The resolved owner row, `None` when the id was absent or unknown.
        owner: Option<&'a User>,
    },
    Update {
        task: &'a Task,
        new_owner_id: Option<Uuid>,
    },
    Delete {
        task: &'a Task,
    },
    List {
        /// Whether a `user_id` scope was requested at all.
        requested: bool,
        /// The resolved scope target, `None` when the id was unknown.
        owner: Option<&'a User>,
    },
}

impl TaskAction<'_> {
    pub fn ability(&self) -> Ability {
        match self {
            TaskAction::View { .. } => Ability::View,
            TaskAction::Store { .. } => Ability::Store,
            TaskAction::Update { .. } => Ability::Update,
            TaskAction::Delete { .. } => Ability::Delete,
            TaskAction::List { .. } => Ability::List,
        }
    }
}

pub fn authorize(actor: &User, action: &TaskAction) -> AppResult<()> {
    let allowed = decide(actor, action);
    tracing::debug!(
        actor_id = %actor.id,
        actor_role = %actor.role,
        ability = action.ability().as_str(),
        allowed,
        "task policy decision"
    );

    if allowed {
        Ok(())
    } else {
        Err(AppError::forbidden())
    }
}

pub fn decide(actor: &User, action: &TaskAction) -> bool {
    evaluate(pre_check(actor), || rule(actor, action))
}

/// Tasks have no superadmin carve-outs at all.
fn pre_check(actor: &User) -> Decision {
    if actor.role == Role::Superadmin {
        Decision::Allow
    } else {
        Decision::Continue
    }
}

fn rule(actor: &User, action: &TaskAction) -> Decision {
    match action {
        TaskAction::View { task } => {
            if hierarchically_allowed(actor, task.user_id, task.user_role) {
                Decision::Allow
            } else {
                Decision::Deny
            }
        }
        TaskAction::Store { requested_owner_id, owner } => store(actor, *requested_owner_id, *owner),
        TaskAction::Update { task, new_owner_id } => update(actor, task, *new_owner_id),
        TaskAction::Delete { task } => delete(actor, task),
        TaskAction::List { requested, owner } => list(actor, *requested, *owner),
    }
}

fn store(actor: &User, requested_owner_id: Option<Uuid>, owner: Option<&User>) -> Decision {
    // A task cannot exist without an owner.
    let Some(owner_id) = requested_owner_id else {
        return Decision::Deny;
    };

    // Anyone may add a task to itself.
    if actor.id == owner_id {
        return Decision::Allow;
    }

    match owner {
        Some(owner) if hierarchically_allowed(actor, owner.id, owner.role) => Decision::Allow,
        _ => Decision::Deny,
    }
}

fn update(actor: &User, task: &Task, new_owner_id: Option<Uuid>) -> Decision {
    if actor.id == task.user_id {
        // Owners edit freely, but handing the task to somebody else
        // requires elevated rank.
        let reassigning = new_owner_id.map_or(false, |id| id != actor.id);
        return if reassigning && !matches!(actor.role, Role::Admin | Role::Superadmin) {
            Decision::Deny
        } else {
            Decision::Allow
        };
    }

    if hierarchically_allowed(actor, task.user_id, task.user_role) {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

fn delete(actor: &User, task: &Task) -> Decision {
    if actor.id == task.user_id || hierarchically_allowed(actor, task.user_id, task.user_role) {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

fn list(actor: &User, requested: bool, owner: Option<&User>) -> Decision {
    // Without an explicit scope the query layer defaults to the actor itself.
    if !requested {
        return Decision::Allow;
    }

    match owner {
        Some(owner) if hierarchically_allowed(actor, owner.id, owner.role) => Decision::Allow,
        _ => Decision::Deny,
    }
}
