//! Authenticated blocking HTTP plumbing shared by the Docs and Drive adapters

use std::time::Duration;

use anyhow::{Context, Result};
use mdpush_core::config::GoogleConfig;
use mdpush_core::{CallContext, StoreError};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::wire::ErrorEnvelope;

/// HTTP client carrying endpoints, credentials and the per-request timeout
#[derive(Clone)]
pub struct GoogleClient {
    http: Client,
    token: String,
    pub(crate) docs_endpoint: String,
    pub(crate) drive_endpoint: String,
    pub(crate) upload_endpoint: String,
    request_timeout: Duration,
}

impl GoogleClient {
    /// Build a client from config, reading the access token from `config.token_env`
    pub fn from_config(config: &GoogleConfig) -> Result<Self> {
        let token = std::env::var(&config.token_env).with_context(|| {
            format!(
                "No access token: set the {} environment variable",
                config.token_env
            )
        })?;
        Self::new(config, token)
    }

    pub fn new(config: &GoogleConfig, token: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("mdpush/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            token: token.into(),
            docs_endpoint: config.docs_endpoint.trim_end_matches('/').to_string(),
            drive_endpoint: config.drive_endpoint.trim_end_matches('/').to_string(),
            upload_endpoint: config.upload_endpoint.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    /// Timeout for the next request: the configured one, capped by the context deadline
    fn timeout_for(&self, ctx: &CallContext) -> Duration {
        ctx.remaining()
            .map_or(self.request_timeout, |left| left.min(self.request_timeout))
    }

    /// Authenticate and send a request, mapping non-2xx statuses to [`StoreError::Api`]
    pub(crate) fn send(
        &self,
        ctx: &CallContext,
        request: RequestBuilder,
    ) -> Result<Response, StoreError> {
        ctx.check()?;

        let response = request
            .bearer_auth(&self.token)
            .timeout(self.timeout_for(ctx))
            .send()
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        let message = api_error_message(&body);
        log::debug!("Google API returned {}: {}", status, message);
        Err(StoreError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// Send and decode a JSON response body
    pub(crate) fn send_json<T: DeserializeOwned>(
        &self,
        ctx: &CallContext,
        request: RequestBuilder,
    ) -> Result<T, StoreError> {
        let response = self.send(ctx, request)?;
        response
            .json::<T>()
            .map_err(|e| StoreError::Decode(e.to_string()))
    }
}

fn transport_error(err: reqwest::Error) -> StoreError {
    if err.is_timeout() {
        StoreError::DeadlineExceeded
    } else {
        StoreError::Transport(Box::new(err))
    }
}

/// Message from a Google error envelope, or the raw body when it is not one
fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => match envelope.error.status {
            Some(status) => format!("{} ({})", envelope.error.message, status),
            None => envelope.error.message,
        },
        Err(_) => body.trim().to_string(),
    }
}
