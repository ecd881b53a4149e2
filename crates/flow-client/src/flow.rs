//! Verification flow state machine.
//!
//! Mirrors the three-screen flow: phone submission, code entry, result.
//! A code submission always lands on the result step; gateway failures
//! and decision timeouts both land there as a rejection.

use crate::client::{CheckOutcome, GatewayApi, VerifyOutcome};
use crate::error::FlowError;
use std::fmt;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Step of the verification flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStep {
    Phone,
    Verification,
    Result,
}

impl fmt::Display for FlowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlowStep::Phone => "phone",
            FlowStep::Verification => "verification",
            FlowStep::Result => "result",
        };
        write!(f, "{}", name)
    }
}

/// Final outcome of a flow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Approved,
    Rejected,
}

impl Outcome {
    pub fn from_approved(approved: bool) -> Self {
        if approved {
            Outcome::Approved
        } else {
            Outcome::Rejected
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, Outcome::Approved)
    }
}

/// Drives the gateway through the verification steps.
pub struct VerificationFlow<C: GatewayApi> {
    gateway: C,
    step: FlowStep,
    outcome: Option<Outcome>,
    check_interval: Duration,
    max_checks: u32,
}

impl<C: GatewayApi> VerificationFlow<C> {
    pub fn new(gateway: C, check_interval: Duration, max_checks: u32) -> Self {
        Self {
            gateway,
            step: FlowStep::Phone,
            outcome: None,
            check_interval,
            max_checks,
        }
    }

    pub fn step(&self) -> FlowStep {
        self.step
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Submit the phone number. Advances to the verification step only
    /// on success; on failure the flow stays on the phone step.
    pub async fn submit_phone(
        &mut self,
        phone_number: &str,
        country: &str,
    ) -> Result<(), FlowError> {
        self.require_step(FlowStep::Phone)?;

        self.gateway.submit_phone(phone_number, country).await?;
        self.step = FlowStep::Verification;
        Ok(())
    }

    /// Submit the verification code and wait for the operator decision.
    ///
    /// Always lands on the result step. While the decision is pending,
    /// the gateway is re-checked every `check_interval`, at most
    /// `max_checks` times; running out of checks counts as a rejection,
    /// as does any gateway failure.
    pub async fn submit_code(
        &mut self,
        phone_number: &str,
        verification_code: &str,
    ) -> Result<Outcome, FlowError> {
        self.require_step(FlowStep::Verification)?;

        let outcome = self.run_verification(phone_number, verification_code).await;
        self.step = FlowStep::Result;
        self.outcome = Some(outcome);
        Ok(outcome)
    }

    /// Return to the phone step, clearing the outcome.
    pub fn reset(&mut self) {
        self.step = FlowStep::Phone;
        self.outcome = None;
    }

    fn require_step(&self, expected: FlowStep) -> Result<(), FlowError> {
        if self.step != expected {
            return Err(FlowError::InvalidStep {
                expected,
                actual: self.step,
            });
        }
        Ok(())
    }

    async fn run_verification(&self, phone_number: &str, verification_code: &str) -> Outcome {
        let poll_id = match self
            .gateway
            .verify_code(phone_number, verification_code)
            .await
        {
            Ok(VerifyOutcome::Decided { approved }) => return Outcome::from_approved(approved),
            Ok(VerifyOutcome::Pending { poll_id }) => poll_id,
            Err(e) => {
                warn!("Verification request failed: {}", e);
                return Outcome::Rejected;
            }
        };

        info!(poll_id = %poll_id, "Waiting for operator decision");
        for attempt in 1..=self.max_checks {
            sleep(self.check_interval).await;

            match self.gateway.check_approval(&poll_id).await {
                Ok(CheckOutcome::Decided { approved }) => {
                    return Outcome::from_approved(approved);
                }
                Ok(CheckOutcome::Pending) => {
                    debug!(attempt, "Decision still pending");
                }
                Err(e) => {
                    warn!("Approval check failed: {}", e);
                    return Outcome::Rejected;
                }
            }
        }

        info!("No decision after {} checks, giving up", self.max_checks);
        Outcome::Rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockGatewayApi;
    use mockall::Sequence;

    fn flow(mock: MockGatewayApi) -> VerificationFlow<MockGatewayApi> {
        VerificationFlow::new(mock, Duration::ZERO, 3)
    }

    #[tokio::test]
    async fn test_submit_phone_advances_on_success() {
        let mut mock = MockGatewayApi::new();
        mock.expect_submit_phone()
            .withf(|phone, country| phone == "+14155551234" && country == "US")
            .times(1)
            .returning(|_, _| Ok(()));

        let mut flow = flow(mock);
        assert_eq!(flow.step(), FlowStep::Phone);

        flow.submit_phone("+14155551234", "US").await.unwrap();
        assert_eq!(flow.step(), FlowStep::Verification);
        assert_eq!(flow.outcome(), None);
    }

    #[tokio::test]
    async fn test_submit_phone_failure_stays_on_phone() {
        let mut mock = MockGatewayApi::new();
        mock.expect_submit_phone().times(1).returning(|_, _| {
            Err(FlowError::Api {
                status: 500,
                message: "Server configuration error".into(),
            })
        });

        let mut flow = flow(mock);
        let err = flow.submit_phone("+14155551234", "US").await.unwrap_err();

        assert!(matches!(err, FlowError::Api { status: 500, .. }));
        assert_eq!(flow.step(), FlowStep::Phone);
    }

    #[tokio::test]
    async fn test_submit_code_out_of_order_is_rejected() {
        // No expectations: the gateway must not be called.
        let mut flow = flow(MockGatewayApi::new());

        let err = flow.submit_code("+14155551234", "123456").await.unwrap_err();
        assert!(matches!(
            err,
            FlowError::InvalidStep {
                expected: FlowStep::Verification,
                actual: FlowStep::Phone,
            }
        ));
    }

    #[tokio::test]
    async fn test_immediate_decision_skips_checks() {
        let mut mock = MockGatewayApi::new();
        mock.expect_submit_phone().returning(|_, _| Ok(()));
        mock.expect_verify_code()
            .withf(|phone, code| phone == "+14155551234" && code == "123456")
            .times(1)
            .returning(|_, _| Ok(VerifyOutcome::Decided { approved: true }));
        mock.expect_check_approval().times(0);

        let mut flow = flow(mock);
        flow.submit_phone("+14155551234", "US").await.unwrap();

        let outcome = flow.submit_code("+14155551234", "123456").await.unwrap();
        assert_eq!(outcome, Outcome::Approved);
        assert_eq!(flow.step(), FlowStep::Result);
        assert_eq!(flow.outcome(), Some(Outcome::Approved));
    }

    #[tokio::test]
    async fn test_pending_then_approved() {
        let mut mock = MockGatewayApi::new();
        mock.expect_submit_phone().returning(|_, _| Ok(()));
        mock.expect_verify_code().times(1).returning(|_, _| {
            Ok(VerifyOutcome::Pending {
                poll_id: "5276307812".into(),
            })
        });

        let mut seq = Sequence::new();
        mock.expect_check_approval()
            .withf(|poll_id| poll_id == "5276307812")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(CheckOutcome::Pending));
        mock.expect_check_approval()
            .withf(|poll_id| poll_id == "5276307812")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(CheckOutcome::Decided { approved: true }));

        let mut flow = flow(mock);
        flow.submit_phone("+14155551234", "US").await.unwrap();

        let outcome = flow.submit_code("+14155551234", "123456").await.unwrap();
        assert_eq!(outcome, Outcome::Approved);
    }

    #[tokio::test]
    async fn test_pending_timeout_is_rejected() {
        let mut mock = MockGatewayApi::new();
        mock.expect_submit_phone().returning(|_, _| Ok(()));
        mock.expect_verify_code().returning(|_, _| {
            Ok(VerifyOutcome::Pending {
                poll_id: "5276307812".into(),
            })
        });
        // Every allowed check comes back pending.
        mock.expect_check_approval()
            .times(3)
            .returning(|_| Ok(CheckOutcome::Pending));

        let mut flow = flow(mock);
        flow.submit_phone("+14155551234", "US").await.unwrap();

        let outcome = flow.submit_code("+14155551234", "123456").await.unwrap();
        assert_eq!(outcome, Outcome::Rejected);
        assert_eq!(flow.step(), FlowStep::Result);
    }

    #[tokio::test]
    async fn test_verify_failure_is_rejected() {
        let mut mock = MockGatewayApi::new();
        mock.expect_submit_phone().returning(|_, _| Ok(()));
        mock.expect_verify_code().times(1).returning(|_, _| {
            Err(FlowError::Api {
                status: 500,
                message: "Upstream messaging service error".into(),
            })
        });
        mock.expect_check_approval().times(0);

        let mut flow = flow(mock);
        flow.submit_phone("+14155551234", "US").await.unwrap();

        let outcome = flow.submit_code("+14155551234", "123456").await.unwrap();
        assert_eq!(outcome, Outcome::Rejected);
    }

    #[tokio::test]
    async fn test_check_failure_is_rejected() {
        let mut mock = MockGatewayApi::new();
        mock.expect_submit_phone().returning(|_, _| Ok(()));
        mock.expect_verify_code().returning(|_, _| {
            Ok(VerifyOutcome::Pending {
                poll_id: "5276307812".into(),
            })
        });
        mock.expect_check_approval().times(1).returning(|_| {
            Err(FlowError::Api {
                status: 429,
                message: "Rate limit exceeded".into(),
            })
        });

        let mut flow = flow(mock);
        flow.submit_phone("+14155551234", "US").await.unwrap();

        let outcome = flow.submit_code("+14155551234", "123456").await.unwrap();
        assert_eq!(outcome, Outcome::Rejected);
    }

    #[tokio::test]
    async fn test_reset_returns_to_phone() {
        let mut mock = MockGatewayApi::new();
        mock.expect_submit_phone().returning(|_, _| Ok(()));
        mock.expect_verify_code()
            .returning(|_, _| Ok(VerifyOutcome::Decided { approved: false }));

        let mut flow = flow(mock);
        flow.submit_phone("+14155551234", "US").await.unwrap();
        flow.submit_code("+14155551234", "123456").await.unwrap();
        assert_eq!(flow.step(), FlowStep::Result);
        assert_eq!(flow.outcome(), Some(Outcome::Rejected));

        flow.reset();
        assert_eq!(flow.step(), FlowStep::Phone);
        assert_eq!(flow.outcome(), None);
    }

    #[test]
    fn test_step_display() {
        assert_eq!(FlowStep::Phone.to_string(), "phone");
        assert_eq!(FlowStep::Verification.to_string(), "verification");
        assert_eq!(FlowStep::Result.to_string(), "result");
    }
}
