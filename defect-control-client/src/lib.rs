//! # Defect Control Client Library
//!
//! Everything the Defect Control front end does short of drawing pixels:
//! talking to the REST API, holding the signed-in session, deciding which
//! screen a route may show, and the per-screen view models.
//!
//! ## Modules
//!
//! - `config`: Layered configuration (defaults, file, `DEFECT_*` env)
//! - `transport`: HTTP and scripted transports behind one trait
//! - `api`: Bearer-attaching client that decodes the response envelope
//! - `token_store`: Persistent bearer token storage
//! - `session`: Signed-in identity shared by the shell and views
//! - `routes`: Screens and their access levels
//! - `guard`: Route access decisions
//! - `upload`: Multipart file forms and upload progress
//! - `debounce`: Latest-input-wins delays for live search
//! - `preview`: Local blob previews with explicit release
//! - `views`: Per-screen state and actions
//! - `error`: Client error type

pub mod api;
pub mod config;
pub mod debounce;
pub mod error;
pub mod guard;
pub mod preview;
pub mod routes;
pub mod session;
pub mod token_store;
pub mod transport;
pub mod upload;
pub mod views;

pub use api::ApiClient;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use routes::Route;
pub use session::{Session, SessionState};

/// Current version of the Defect Control client library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
