//! Authenticated calls to the resource endpoints.
//!
//! # Design
//! `Api` glues the stateless `BandcampClient` to a credential store and an
//! executor. Every call re-reads the access token from the store and never
//! writes to it. Transient transport failures are retried with exponential
//! backoff; `Remote` and `Unauthorized` are returned immediately.

use std::thread;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::client::{classify, BandcampClient};
use crate::credentials::CredentialStore;
use crate::error::ApiError;
use crate::http::{HttpExecutor, HttpRequest, HttpResponse};
use crate::types::{
    Band, MerchItem, MerchQuery, Order, OrdersQuery, ShipmentUpdate, ShippingOrigin,
    ShippingOriginsQuery,
};

/// Retry policy for transient transport failures.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Extra attempts after the first one. Zero disables retrying.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(500),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    fn delay_for(&self, retry: u32) -> Duration {
        self.initial_delay
            .mul_f64(self.backoff_multiplier.max(1.0).powi(retry as i32))
    }
}

/// Run `operation` until it succeeds, fails permanently, or retries run out.
pub fn with_retry<T>(
    config: &RetryConfig,
    mut operation: impl FnMut() -> Result<T, ApiError>,
) -> Result<T, ApiError> {
    let mut retry = 0;
    loop {
        match operation() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && retry < config.max_retries => {
                let delay = config.delay_for(retry);
                warn!(error = %e, attempt = retry + 1, delay_ms = delay.as_millis() as u64, "transient failure, retrying");
                thread::sleep(delay);
                retry += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

pub struct Api<S, E> {
    client: BandcampClient,
    store: S,
    executor: E,
    retry: RetryConfig,
}

impl<S: CredentialStore, E: HttpExecutor> Api<S, E> {
    pub fn new(client: BandcampClient, store: S, executor: E) -> Self {
        Self {
            client,
            store,
            executor,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// POST `payload` to `endpoint` with the stored bearer token and decode
    /// the response as `T`.
    ///
    /// Without stored credentials the call fails with `Unauthorized` before
    /// touching the network.
    pub fn call<T, P>(&self, endpoint: &str, payload: &P) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        let response = self.send(endpoint, payload)?;
        self.client.parse_api_response(response)
    }

    fn send<P: Serialize + ?Sized>(&self, endpoint: &str, payload: &P) -> Result<HttpResponse, ApiError> {
        self.send_with(|token| self.client.build_api_request(endpoint, token, payload))
    }

    fn send_with(
        &self,
        build: impl FnOnce(&str) -> Result<HttpRequest, ApiError>,
    ) -> Result<HttpResponse, ApiError> {
        let record = self.store.load().ok_or(ApiError::Unauthorized)?;
        let request = build(&record.access_token)?;
        self.execute(&request)
    }

    /// Execute and classify, so retryable statuses are retried too.
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        with_retry(&self.retry, || {
            let response = self.executor.execute(request)?;
            debug!(url = %request.url, status = response.status, "response received");
            classify(&response)?;
            Ok(response)
        })
    }

    pub fn my_bands(&self) -> Result<Vec<Band>, ApiError> {
        let response = self.send_with(|t| self.client.build_my_bands(t))?;
        self.client.parse_my_bands(response)
    }

    pub fn orders(&self, query: &OrdersQuery) -> Result<Vec<Order>, ApiError> {
        let response = self.send_with(|t| self.client.build_get_orders(t, query))?;
        self.client.parse_get_orders(response)
    }

    pub fn merch(&self, query: &MerchQuery) -> Result<Vec<MerchItem>, ApiError> {
        let response = self.send_with(|t| self.client.build_get_merch(t, query))?;
        self.client.parse_get_merch(response)
    }

    pub fn shipping_origins(&self, query: &ShippingOriginsQuery) -> Result<Vec<ShippingOrigin>, ApiError> {
        let response = self.send_with(|t| self.client.build_get_shipping_origins(t, query))?;
        self.client.parse_get_shipping_origins(response)
    }

    pub fn update_shipped(&self, items: &[ShipmentUpdate]) -> Result<(), ApiError> {
        let response = self.send_with(|t| self.client.build_update_shipped(t, items))?;
        self.client.parse_update_shipped(response)
    }
}
