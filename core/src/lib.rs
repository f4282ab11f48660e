//! Client core for the Bandcamp merchandising API.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern). The host supplies an
//! `HttpExecutor`; everything stateful sits on top of that seam:
//!
//! - `credentials`: the token pair persisted between invocations.
//! - `auth`: grant selection and the explicit `login` exchange.
//! - `transport`: authenticated resource calls with error classification
//!   and retry of transient failures.
//! - `ship`: bulk fulfillment updates with dry-run/commit semantics.
//!
//! # Design
//! - `BandcampClient` is stateless; it holds only the provider origin.
//! - Credential state lives only in a `CredentialStore`, injected into
//!   both the token manager and the transport.
//! - Response records keep unknown provider fields so they print losslessly.

pub mod auth;
pub mod client;
pub mod credentials;
pub mod error;
pub mod http;
pub mod ship;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

pub use auth::{AuthRequest, ClientCredentials, Grant, TokenManager};
pub use client::{BandcampClient, DEFAULT_ORIGIN};
pub use credentials::{
    CredentialRecord, CredentialStore, FileCredentialStore, MemoryCredentialStore,
    DEFAULT_CREDENTIALS_PATH,
};
pub use error::{ApiError, ErrorCategory};
pub use http::{HttpExecutor, HttpRequest, HttpResponse};
pub use ship::{
    BatchEngine, BatchPlan, BatchReport, DryRunReport, FailedItem, IdSource, ShipOutcome,
    ShipSettings, Sleeper, SubmitStrategy, ThreadSleeper, DEFAULT_WARMUP,
};
pub use transport::{Api, RetryConfig};
pub use types::{
    Band, IdType, MerchItem, MerchQuery, Order, OrdersQuery, ShipmentOptions, ShipmentUpdate,
    ShippingOrigin, ShippingOriginsQuery,
};
