//! API data model
//!
//! Records are shaped by the remote API; this crate only enforces what the
//! client relies on: ids identify records and roles come from a closed set.
//!
//! # Models
//!
//! - `user`: Identity, roles, registration/login/profile payloads
//! - `project`: Projects and the project creation form
//! - `defect`: Defects, priorities and the defect creation form
//! - `attachment`: Attachment metadata
//! - `comment`: Defect comments

pub mod attachment;
pub mod comment;
pub mod defect;
pub mod project;
pub mod user;

pub use attachment::{Attachment, AttachmentId};
pub use comment::{Comment, CommentId, CreateComment};
pub use defect::{Assignee, CreateDefect, Defect, DefectId, Priority};
pub use project::{CreateProject, Project, ProjectId};
pub use user::{Identity, LoginRequest, LoginResponse, RegisterUser, Role, RoleUpdate, UpdateProfile, UserId};
