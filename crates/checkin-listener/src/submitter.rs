//! Where completed codes go.

use std::future::Future;

use checkin_core::Submission;
use checkin_network::{ControlClient, ControlError, ControlResponse};

/// Sends one submission to the engine and returns its verdict.
///
/// An `Err` means the submission never reached the engine; a rejection is an
/// `Ok` response with `success == false`.
pub trait Submitter: Send + Sync {
    fn submit(
        &self,
        submission: Submission,
    ) -> impl Future<Output = Result<ControlResponse, ControlError>> + Send;
}

impl Submitter for ControlClient {
    async fn submit(&self, submission: Submission) -> Result<ControlResponse, ControlError> {
        ControlClient::submit(self, submission).await
    }
}
