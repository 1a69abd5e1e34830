//! # Tollgate Server
//!
//! Routing, dispatch and the HTTP accept loop.
//!
//! - [`Gateway`] - the routed entry point; built with [`GatewayBuilder`]
//! - [`Router`] - path patterns with `{name}` / `:name` parameters
//! - [`StaticMount`] - static content under a URL prefix
//! - [`ShutdownSignal`] - graceful shutdown on SIGTERM/SIGINT
//!
//! ## Example
//!
//! ```rust,ignore
//! use tollgate_config::FileConfigSource;
//! use tollgate_server::Gateway;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = Gateway::builder()
//!         .route(http::Method::GET, "/games/{gameId}", GetGame)
//!         .upload_route("/games/{gameId}/replays", UploadReplay)
//!         .build()?;
//!
//!     gateway.run(FileConfigSource::new("tollgate.toml")).await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/tollgate-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod gateway;
pub mod router;
pub mod shutdown;
pub mod static_files;

pub use error::ServerError;
pub use gateway::{Gateway, GatewayBuilder};
pub use router::{RouteError, RouteMatch, Router};
pub use shutdown::{ConnectionTracker, ShutdownSignal};
pub use static_files::{StaticFileError, StaticMount};
