//! Executes core requests over HTTP with ureq.

use std::time::Duration;

use bandcamp_core::{ApiError, HttpExecutor, HttpRequest, HttpResponse};
use tracing::debug;

pub struct UreqExecutor {
    agent: ureq::Agent,
}

impl UreqExecutor {
    /// Non-2xx statuses come back as data so the core can classify them.
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent }
    }
}

impl HttpExecutor for UreqExecutor {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(url = %request.url, "POST");
        let mut builder = self.agent.post(&request.url);
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        let mut response = builder
            .send(request.body.as_bytes())
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ApiError::Network(format!("reading response body: {e}")))?;
        Ok(HttpResponse::new(status, body))
    }
}
