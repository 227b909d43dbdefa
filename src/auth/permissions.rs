use anyhow::Error;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ViewOwnProfile,
    ViewDashboard,
    ViewGrades,
    ViewAttendance,

    ViewClassStatistics,

    ViewSchoolStatistics,

    ManageDirectors,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Director,
    Teacher,
    Student,
}

static STUDENT_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.insert(Permission::ViewOwnProfile);
    permissions.insert(Permission::ViewDashboard);
    permissions.insert(Permission::ViewGrades);
    permissions.insert(Permission::ViewAttendance);

    permissions
});

static TEACHER_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.extend(STUDENT_PERMISSIONS.iter().copied());

    permissions.insert(Permission::ViewClassStatistics);

    permissions
});

static DIRECTOR_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.extend(TEACHER_PERMISSIONS.iter().copied());

    permissions.insert(Permission::ViewSchoolStatistics);

    permissions
});

static ADMIN_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.extend(DIRECTOR_PERMISSIONS.iter().copied());

    permissions.insert(Permission::ManageDirectors);

    permissions
});

impl Role {
    pub fn permissions(&self) -> &'static HashSet<Permission> {
        match self {
            Role::Student => &STUDENT_PERMISSIONS,
            Role::Teacher => &TEACHER_PERMISSIONS,
            Role::Director => &DIRECTOR_PERMISSIONS,
            Role::Admin => &ADMIN_PERMISSIONS,
        }
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Director => "director",
            Role::Teacher => "teacher",
            Role::Student => "student",
        }
    }

    /// Where a freshly signed-in user lands.
    pub fn landing_route(&self) -> &'static str {
        match self {
            Role::Admin => "/admin",
            Role::Director | Role::Teacher | Role::Student => "/dashboard",
        }
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "director" => Ok(Role::Director),
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            _ => Err(Error::msg(format!("Unknown role: {}", s))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
