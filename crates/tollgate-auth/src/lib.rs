//! # Tollgate Auth
//!
//! Bearer credential verification for Tollgate.
//!
//! Verification is two-phase. The credential payload is first decoded
//! *without* verification to read its provider tag ([`UnverifiedClaims`]).
//! The [`ProviderRegistry`] uses that tag to pick a verifier, and the chosen
//! verifier then checks the credential authoritatively.
//!
//! - [`BuiltinVerifier`] - signed JWTs checked against issuer keys
//! - [`RemoteVerifier`] - delegates to an external auth endpoint
//! - [`KeySource`] - where the built-in verifier gets its keys
//!   ([`JwksKeySource`], [`StaticKeySource`])

#![doc(html_root_url = "https://docs.rs/tollgate-auth/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod builtin;
mod keys;
mod registry;
mod remote;
mod token;

pub use builtin::{BuiltinVerifier, DEFAULT_ISSUERS, GOOGLE_PROVIDER_TAG};
pub use keys::{JwksKeySource, KeySource, StaticKeySource, DEFAULT_JWKS_URL};
pub use registry::{ProviderRegistry, ProviderRegistryBuilder, RegistryError};
pub use remote::RemoteVerifier;
pub use token::{redact, strip_bearer, Audience, UnverifiedClaims};
