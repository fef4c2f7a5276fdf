//! Client-side routes
//!
//! ```text
//! /login                              public
//! /register                           public
//! /projects                           signed in
//! /projects/new                       signed in
//! /projects/:id                       signed in
//! /projects/:id/defects/:defect_id    signed in
//! /profile                            signed in
//! /admin/users                        admin only
//! ```
//!
//! `/` resolves to `/projects`.

use std::fmt;
use std::str::FromStr;

use defect_control_shared::models::{DefectId, ProjectId, Role};

/// Navigable screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Sign-in form
    Login,

    /// Registration form
    Register,

    /// Project list
    Projects,

    /// Project creation form
    NewProject,

    /// Project with its defects
    Project(ProjectId),

    /// Defect with attachments and comments
    Defect {
        project_id: ProjectId,
        defect_id: DefectId,
    },

    /// Own profile
    Profile,

    /// User administration
    AdminUsers,
}

/// Who may open a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Anyone
    Public,

    /// Any signed-in user
    Authenticated,

    /// Signed-in users holding exactly this role
    Role(Role),
}

/// Error returned for paths that match no route
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("No such page: {0}")]
pub struct UnknownRoute(pub String);

impl Route {
    /// Route shown after sign-in and for insufficient privilege
    pub const HOME: Route = Route::Projects;

    /// Access rule for this route
    pub fn access(&self) -> Access {
        match self {
            Route::Login | Route::Register => Access::Public,
            Route::AdminUsers => Access::Role(Role::Admin),
            _ => Access::Authenticated,
        }
    }

    /// Canonical path
    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".to_string(),
            Route::Register => "/register".to_string(),
            Route::Projects => "/projects".to_string(),
            Route::NewProject => "/projects/new".to_string(),
            Route::Project(id) => format!("/projects/{}", id),
            Route::Defect { project_id, defect_id } => {
                format!("/projects/{}/defects/{}", project_id, defect_id)
            }
            Route::Profile => "/profile".to_string(),
            Route::AdminUsers => "/admin/users".to_string(),
        }
    }

    /// Screen title
    pub fn title(&self) -> String {
        match self {
            Route::Login => "Sign in".to_string(),
            Route::Register => "Register".to_string(),
            Route::Projects => "Projects".to_string(),
            Route::NewProject => "New project".to_string(),
            Route::Project(id) => format!("Project #{}", id),
            Route::Defect { defect_id, .. } => format!("Defect #{}", defect_id),
            Route::Profile => "Profile".to_string(),
            Route::AdminUsers => "Users".to_string(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

impl FromStr for Route {
    type Err = UnknownRoute;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownRoute(s.trim().to_string());

        let path = s.trim().split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|seg| !seg.is_empty()).collect();

        let id = |seg: &str| seg.parse::<u64>().map_err(|_| unknown());

        match segments.as_slice() {
            [] => Ok(Route::HOME),
            ["login"] => Ok(Route::Login),
            ["register"] => Ok(Route::Register),
            ["projects"] => Ok(Route::Projects),
            ["projects", "new"] => Ok(Route::NewProject),
            ["projects", project] => Ok(Route::Project(id(*project)?)),
            ["projects", project, "defects", defect] => Ok(Route::Defect {
                project_id: id(*project)?,
                defect_id: id(*defect)?,
            }),
            ["profile"] => Ok(Route::Profile),
            ["admin", "users"] => Ok(Route::AdminUsers),
            _ => Err(unknown()),
        }
    }
}
