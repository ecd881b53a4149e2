//! HTTP client for the approval gateway API.

use crate::error::FlowError;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Outcome of a verify-code call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Decided { approved: bool },
    Pending { poll_id: String },
}

/// Outcome of a check-approval call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    Decided { approved: bool },
    Pending,
}

/// The gateway operations the verification flow drives.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GatewayApi: Send + Sync {
    async fn submit_phone(&self, phone_number: &str, country: &str) -> Result<(), FlowError>;

    async fn verify_code(
        &self,
        phone_number: &str,
        verification_code: &str,
    ) -> Result<VerifyOutcome, FlowError>;

    async fn check_approval(&self, poll_id: &str) -> Result<CheckOutcome, FlowError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitPhoneBody<'a> {
    phone_number: &'a str,
    country: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyCodeBody<'a> {
    phone_number: &'a str,
    verification_code: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckApprovalBody<'a> {
    poll_id: &'a str,
}

#[derive(Deserialize)]
struct DecisionBody {
    approved: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PendingBody {
    #[serde(default)]
    poll_id: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Gateway client over HTTP.
#[derive(Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
}

impl GatewayClient {
    /// Create a new gateway client.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FlowError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn post(
        &self,
        path: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<(StatusCode, String), FlowError> {
        let response = self
            .client
            .post(self.endpoint(path))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        debug!(%status, path, "Gateway response");
        Ok((status, text))
    }

    /// Extract the error message from a failed response body.
    fn api_error(status: StatusCode, body: &str) -> FlowError {
        let message = serde_json::from_str::<ErrorBody>(body)
            .map(|e| e.error)
            .unwrap_or_else(|_| body.chars().take(200).collect());

        FlowError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl GatewayApi for GatewayClient {
    #[instrument(skip(self))]
    async fn submit_phone(&self, phone_number: &str, country: &str) -> Result<(), FlowError> {
        let (status, body) = self
            .post(
                "/api/submit-phone",
                &SubmitPhoneBody {
                    phone_number,
                    country,
                },
            )
            .await?;

        if !status.is_success() {
            return Err(Self::api_error(status, &body));
        }
        Ok(())
    }

    #[instrument(skip(self, verification_code))]
    async fn verify_code(
        &self,
        phone_number: &str,
        verification_code: &str,
    ) -> Result<VerifyOutcome, FlowError> {
        let (status, body) = self
            .post(
                "/api/verify-code",
                &VerifyCodeBody {
                    phone_number,
                    verification_code,
                },
            )
            .await?;

        match status {
            StatusCode::OK => {
                let decision: DecisionBody = serde_json::from_str(&body)?;
                Ok(VerifyOutcome::Decided {
                    approved: decision.approved,
                })
            }
            StatusCode::ACCEPTED => {
                let pending: PendingBody = serde_json::from_str(&body)?;
                pending
                    .poll_id
                    .map(|poll_id| VerifyOutcome::Pending { poll_id })
                    .ok_or_else(|| {
                        FlowError::UnexpectedResponse("202 pending without pollId".into())
                    })
            }
            _ => Err(Self::api_error(status, &body)),
        }
    }

    #[instrument(skip(self))]
    async fn check_approval(&self, poll_id: &str) -> Result<CheckOutcome, FlowError> {
        let (status, body) = self
            .post("/api/check-approval", &CheckApprovalBody { poll_id })
            .await?;

        match status {
            StatusCode::OK => {
                let decision: DecisionBody = serde_json::from_str(&body)?;
                Ok(CheckOutcome::Decided {
                    approved: decision.approved,
                })
            }
            StatusCode::ACCEPTED => Ok(CheckOutcome::Pending),
            _ => Err(Self::api_error(status, &body)),
        }
    }
}
