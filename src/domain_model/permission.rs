use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum PermissionCode {
    #[serde(rename = "reports:read")]
    ReportsRead,
    #[serde(rename = "reports:write")]
    ReportsWrite,
    #[serde(rename = "users:read")]
    UsersRead,
    #[serde(rename = "users:write")]
    UsersWrite,
    #[serde(rename = "system:admin")]
    SystemAdmin,
    #[serde(rename = "system:settings")]
    SystemSettings,
}

impl PermissionCode {
    pub const ALL: [PermissionCode; 6] = [
        PermissionCode::ReportsRead,
        PermissionCode::ReportsWrite,
        PermissionCode::UsersRead,
        PermissionCode::UsersWrite,
        PermissionCode::SystemAdmin,
        PermissionCode::SystemSettings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionCode::ReportsRead => "reports:read",
            PermissionCode::ReportsWrite => "reports:write",
            PermissionCode::UsersRead => "users:read",
            PermissionCode::UsersWrite => "users:write",
            PermissionCode::SystemAdmin => "system:admin",
            PermissionCode::SystemSettings => "system:settings",
        }
    }
}

impl fmt::Display for PermissionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PermissionCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PermissionCode::ALL
            .into_iter()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| format!("unknown permission code: {s}"))
    }
}

/// Ordered so that two snapshots of the same grants compare equal.
pub type PermissionSet = BTreeSet<PermissionCode>;

#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(pub String);

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleName(pub String);

impl RoleName {
    pub const ADMIN: &'static str = "admin";

    pub fn is_admin(&self) -> bool {
        self.0 == Self::ADMIN
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RoleDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub permissions: &'static [PermissionCode],
}

impl RoleDefinition {
    pub fn role_id(&self) -> RoleId {
        RoleId(self.id.to_string())
    }

    pub fn role_name(&self) -> RoleName {
        RoleName(self.name.to_string())
    }

    pub fn permission_set(&self) -> PermissionSet {
        self.permissions.iter().copied().collect()
    }
}

pub const ROLE_DEFINITIONS: [RoleDefinition; 3] = [
    RoleDefinition {
        id: "role-admin",
        name: "admin",
        description: "Full access, including user and system administration.",
        permissions: &PermissionCode::ALL,
    },
    RoleDefinition {
        id: "role-editor",
        name: "editor",
        description: "Create and edit reports.",
        permissions: &[PermissionCode::ReportsRead, PermissionCode::ReportsWrite],
    },
    RoleDefinition {
        id: "role-reader",
        name: "reader",
        description: "Read reports.",
        permissions: &[PermissionCode::ReportsRead],
    },
];

pub fn role_definition(name: &str) -> Option<&'static RoleDefinition> {
    ROLE_DEFINITIONS.iter().find(|role| role.name == name)
}
