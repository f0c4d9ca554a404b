use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Closed role enumeration with an explicit ordinal rank.
///
/// The rank drives the whole authorization model: a role dominates another
/// when its rank is strictly greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
    Superadmin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::User, Role::Admin, Role::Superadmin];

    pub fn rank(self) -> u8 {
        match self {
            Role::User => 0,
            Role::Admin => 1,
            Role::Superadmin => 2,
        }
    }

    /// Strict greater-than relation over role ranks.
    pub fn dominates(self, other: Role) -> bool {
        self.rank() > other.rank()
    }

    /// Roles strictly below this one, lowest first.
    pub fn lower_roles(self) -> &'static [Role] {
        match self {
            Role::User => &[],
            Role::Admin => &[Role::User],
            Role::Superadmin => &[Role::User, Role::Admin],
        }
    }

    pub fn parse(value: &str) -> Option<Role> {
        match value {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            "superadmin" => Some(Role::Superadmin),
            _ => None,
        }
    }

    pub fn is_valid(value: &str) -> bool {
        Role::parse(value).is_some()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Superadmin => "superadmin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Role::parse(value).ok_or_else(|| format!("invalid role: {value}"))
    }
}

/// Account status. Orthogonal to `Role`; only ever used as a listing filter,
/// never in authorization decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Enabled,
    Disabled,
}

impl Status {
    pub fn parse(value: &str) -> Option<Status> {
        match value {
            "enabled" => Some(Status::Enabled),
            "disabled" => Some(Status::Disabled),
            _ => None,
        }
    }

    pub fn is_valid(value: &str) -> bool {
        Status::parse(value).is_some()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Enabled => "enabled",
            Status::Disabled => "disabled",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Status::parse(value).ok_or_else(|| format!("invalid status: {value}"))
    }
}
