//! # Tollgate Middleware
//!
//! The fixed stages every Tollgate call passes through around its handler.
//!
//! ```text
//! Request → [CORS preflight] → Validator → Context → Handler
//!                                  │                    │
//!                                  └──── failure ───────┴──→ Shaper → Response
//! ```
//!
//! | Stage | Type | Purpose |
//! |-------|------|---------|
//! | Validation | [`RequestValidator`] | Correlation id, client version, bearer credential |
//! | Shaping | [`ResponseShaper`] | Success and failure wire format, one log entry per call |
//! | CORS | [`CorsPolicy`] | Permissive CORS headers and `OPTIONS` preflight |

#![doc(html_root_url = "https://docs.rs/tollgate-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cors;
pub mod shaper;
pub mod types;
pub mod validator;

pub use cors::CorsPolicy;
pub use shaper::{CallLine, Reply, ResponseShaper};
pub use types::{empty_body, full_body, stream_body, Response, ResponseBody};
pub use validator::{InboundHeaders, RequestValidator, Validated, ValidationStage};
