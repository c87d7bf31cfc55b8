//! # Calboard Core Library
//!
//! Core logic for a calendar display: it authenticates as a Google service
//! account, lists the upcoming events of one calendar and turns them into
//! day columns ready to draw. The `calboard` binary is a thin supervisor
//! over the same library.
//!
//! ## Architecture
//!
//! - **Auth**: RS256 JWT-bearer assertions and a single-entry token cache
//!   with a 30 second refresh margin
//! - **Calendar**: bounded events.list fetch and display normalization
//! - **Cycle**: the token → fetch → normalize → render pipeline with one
//!   typed verdict per failure
//! - **Transport**: the HTTP seam, with a reqwest implementation enforcing
//!   the request timeout and response size cap
//!
//! ## Key Components
//!
//! - [`SyncCycle`]: one refresh of the display
//! - [`TokenCache`]: access-token lifecycle
//! - [`EventFetcher`]: events.list client
//! - [`Config`]: device configuration

pub mod auth;
pub mod calendar;
pub mod codec;
pub mod config;
pub mod cycle;
pub mod error;
pub mod transport;

pub use auth::{AccessToken, CredentialSigner, ServiceAccountKey, TokenCache};
pub use calendar::{DayGroup, EventFetcher, NormalizedEvent, RawEvent};
pub use config::{Config, FailurePolicy};
pub use cycle::{CycleReport, RenderFrame, RenderSink, SyncCycle};
pub use error::{
    AuthError, ConfigError, CoreError, CredentialError, CycleError, FetchError, NormalizeError,
    TransportError,
};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};
