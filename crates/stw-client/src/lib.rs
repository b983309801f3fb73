//! External API capabilities for the STW automation pilot.
//!
//! The automation core never encodes the game API's request/response
//! shapes or credential storage. This crate draws that boundary:
//! - `AuthProvider`: hands out access tokens for an account
//! - `ApiClient`: performs one named automation action
//! - `WorldStateClient`: fetches the daily world snapshot
//!
//! All three are dyn-compatible traits; `HttpApiClient`/`HttpWorldClient`
//! are the production implementations, and tests script their own.

pub mod api;
pub mod auth;
pub mod error;
pub mod http;
pub mod token_cache;
pub mod world;

pub use api::{ApiClient, ApiOutcome, BoxFuture, DynApiClient, ScriptedApiClient};
pub use auth::{AccessToken, AuthProvider, DynAuthProvider, StaticTokenProvider};
pub use error::{ClientError, ClientResult};
pub use http::{HttpApiClient, HttpClientConfig, HttpWorldClient};
pub use token_cache::TokenCache;
pub use world::{DynWorldStateClient, WorldSnapshot, WorldStateClient};
