use std::{fmt, str::FromStr, time::SystemTime};

use serde::{Deserialize, Serialize};

/// Account role. Ordering matters: each role includes the powers of the
/// previous one, with `superuser` as an out-of-band override.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Moderator,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct RoleParseError(String);

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            other => Err(RoleParseError(other.to_string())),
        }
    }
}

pub trait TimeLimited {
    fn set_validity(&mut self, until: SystemTime);
    fn check_validity(&self) -> bool;
}

pub trait Authorization {
    fn role(&self) -> Role;

    fn is_superuser(&self) -> bool {
        false
    }

    fn is_admin(&self) -> bool {
        self.role() == Role::Admin || self.is_superuser()
    }

    /// Moderator powers - admin implies moderator.
    fn is_moderator(&self) -> bool {
        matches!(self.role(), Role::Moderator | Role::Admin) || self.is_superuser()
    }

    fn has_role(&self, role: Role) -> bool {
        self.role() == role
    }

    fn has_any_role<I>(&self, roles: I) -> bool
    where
        I: IntoIterator<Item = Role>,
    {
        roles.into_iter().any(|role| self.has_role(role))
    }
}

/// Claims carried in the bearer access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiClaim {
    pub sub: String,
    pub username: String,
    pub role: Role,
    #[serde(default)]
    pub superuser: bool,
    pub exp: u64,
}

impl ApiClaim {
    /// New claim with zero expiry - `TokenManager::issue` stamps the real one.
    pub fn new_expired(
        sub: impl Into<String>,
        username: impl Into<String>,
        role: Role,
        superuser: bool,
    ) -> Self {
        Self {
            sub: sub.into(),
            username: username.into(),
            role,
            superuser,
            exp: 0,
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

impl Authorization for ApiClaim {
    fn role(&self) -> Role {
        self.role
    }

    fn is_superuser(&self) -> bool {
        self.superuser
    }
}

impl TimeLimited for ApiClaim {
    fn set_validity(&mut self, until: SystemTime) {
        self.exp = until
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap()
            .as_secs();
    }

    fn check_validity(&self) -> bool {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap()
            .as_secs();
        self.exp > now
    }
}
