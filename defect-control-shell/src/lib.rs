//! # Defect Control Shell Library
//!
//! Line-oriented front end over the Defect Control client: commands are
//! parsed, routed through the navigation guards and applied to the mounted
//! view, which is then rendered as text.
//!
//! ## Modules
//!
//! - `app`: Mounted screen, navigation and command dispatch
//! - `commands`: Input line parsing
//! - `render`: Text rendering of the header and views
//!
//! ## Example
//!
//! ```no_run
//! use defect_control_client::{ApiClient, ClientConfig, Session};
//! use defect_control_shell::app::Shell;
//! use defect_control_shell::render::render;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ClientConfig::load()?;
//! let session = Session::start(ApiClient::from_config(&config)?).await;
//! let shell = Shell::start(session, config.search_debounce()).await;
//! println!("{}", render(&shell));
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod commands;
pub mod render;
