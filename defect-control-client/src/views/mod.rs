//! Per-screen view models
//!
//! Each view fetches its own data when mounted, keeps it in local state and
//! exposes the screen's actions. Views never share state with each other;
//! only the [`Session`](crate::session::Session) is common to all of them.
//!
//! # Mount Lifecycle
//!
//! ```text
//! View::new()     state = Loading, scope mounted
//!   ├─> load()    fetches run inside the scope
//!   ├─> actions   one request each, result merged into local state
//!   └─> unmount() scope cancelled, late results ignored, previews released
//! ```
//!
//! # Failures
//!
//! Primary load failures are logged and shown as a generic message. Secondary
//! fetches (user lists, attachment probes, previews) fail silently. Action
//! failures become a [`Notice`].

pub mod admin_users;
pub mod create_project;
pub mod defect_detail;
pub mod login;
pub mod profile;
pub mod project_detail;
pub mod projects;
pub mod register;

pub use admin_users::{AdminUsersView, PendingRoleChange, RoleChangeStep};
pub use create_project::CreateProjectView;
pub use defect_detail::DefectDetailView;
pub use login::LoginView;
pub use profile::ProfileView;
pub use project_detail::{AssigneeSearch, ProjectDetailView};
pub use projects::ProjectListView;
pub use register::RegisterView;

use std::future::Future;

use tokio_util::sync::CancellationToken;

/// Message shown when a view's data could not be loaded
pub const LOAD_FAILED: &str = "Failed to load data";

/// Async-loaded piece of view state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Loadable<T> {
    /// Request in flight
    Loading,

    /// Data arrived
    Ready(T),

    /// Request failed; holds the message to show
    Failed(String),
}

impl<T> Default for Loadable<T> {
    fn default() -> Self {
        Loadable::Loading
    }
}

impl<T> Loadable<T> {
    /// Loaded data, if any
    pub fn ready(&self) -> Option<&T> {
        match self {
            Loadable::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// Mutable loaded data, if any
    pub fn ready_mut(&mut self) -> Option<&mut T> {
        match self {
            Loadable::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// Whether the request is still in flight
    pub fn is_loading(&self) -> bool {
        matches!(self, Loadable::Loading)
    }

    /// Failure message, if the load failed
    pub fn error(&self) -> Option<&str> {
        match self {
            Loadable::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// Feedback from the last action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Inline confirmation
    Info(String),

    /// Inline error
    Error(String),

    /// Blocking alert the user must acknowledge
    Alert(String),
}

impl Notice {
    /// Message text
    pub fn message(&self) -> &str {
        match self {
            Notice::Info(m) | Notice::Error(m) | Notice::Alert(m) => m,
        }
    }
}

/// Lifetime of a mounted view
///
/// Work run through the scope yields `None` once the view is unmounted, so
/// late results are never applied.
#[derive(Debug, Clone, Default)]
pub struct ViewScope {
    token: CancellationToken,
}

impl ViewScope {
    /// Creates a mounted scope
    pub fn new() -> Self {
        Self::default()
    }

    /// Unmounts the view
    pub fn unmount(&self) {
        self.token.cancel();
    }

    /// Whether the view is still mounted
    pub fn is_mounted(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Runs `work`, discarding its output if the view unmounts first
    pub async fn run<F: Future>(&self, work: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            output = work => self.is_mounted().then_some(output),
        }
    }
}
