//! Control-plane handler backed by the scan engine.

use std::sync::Arc;

use checkin_engine::{ScanEngine, ScanError};
use checkin_network::{ControlHandler, ControlRequest, ControlResponse};
use tokio::sync::Mutex;
use tracing::debug;

/// Serialises every control request through one [`ScanEngine`].
///
/// The engine is the only writer of the Status Store and the database, so
/// requests from any number of connections are applied one at a time.
#[derive(Clone)]
pub struct EngineService {
    engine: Arc<Mutex<ScanEngine>>,
}

impl EngineService {
    pub fn new(engine: ScanEngine) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
        }
    }

    pub fn engine(&self) -> Arc<Mutex<ScanEngine>> {
        Arc::clone(&self.engine)
    }
}

fn rejection(error: &ScanError, engine: &ScanEngine) -> ControlResponse {
    ControlResponse::failure(error.kind(), error.to_string()).with_status(engine.status())
}

impl ControlHandler for EngineService {
    async fn handle(&self, request: ControlRequest) -> ControlResponse {
        let op = request.op();
        let mut engine = self.engine.lock().await;
        debug!(op, phase = %engine.phase(), "Applying control request");

        match request {
            ControlRequest::Submit(submission) => match engine.submit(submission).await {
                Ok(accepted) => ControlResponse::ok(accepted.to_string(), Some(accepted.status)),
                Err(e) => rejection(&e, &engine),
            },
            ControlRequest::Activate { session_id } => {
                match engine.activate_session(session_id).await {
                    Ok(status) => {
                        ControlResponse::ok(format!("Session {session_id} active"), Some(status))
                    }
                    Err(e) => rejection(&e, &engine),
                }
            }
            ControlRequest::Deactivate { session_id } => {
                match engine.deactivate_session(session_id).await {
                    Ok(status) => {
                        ControlResponse::ok(format!("Session {session_id} closed"), Some(status))
                    }
                    Err(e) => rejection(&e, &engine),
                }
            }
            ControlRequest::Status => {
                ControlResponse::ok(engine.phase().to_string(), Some(engine.status()))
            }
        }
    }
}
