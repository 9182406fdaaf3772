use std::sync::Arc;

use async_trait::async_trait;
use homegraph_core::{
    bus::Bus, repository::DeviceRepository, settings::ConfigSource, state::StateCache,
};
use serde::Serialize;

pub mod error;
pub mod execute;
pub mod protocol;
pub mod query;
pub mod sync;

use crate::{
    error::IntentError,
    execute::ExecuteIntentHandler,
    protocol::{ErrorPayload, FulfillmentRequest, FulfillmentResponse, Intent, ResponsePayload},
    query::QueryIntentHandler,
    sync::{AttributeMerge, SyncIntentHandler},
};

/// One handler per intent kind.
#[async_trait]
pub trait IntentHandler: Send + Sync {
    type Intent: Send + 'static;
    type Payload: Serialize + Send;

    async fn handle(&self, intent: Self::Intent) -> Result<Self::Payload, IntentError>;
}

/// Routes fulfillment requests to the handler of their intent.
pub struct FulfillmentService {
    sync: SyncIntentHandler,
    query: QueryIntentHandler,
    execute: ExecuteIntentHandler,
}

impl FulfillmentService {
    pub fn new(
        repository: Arc<DeviceRepository>,
        states: Arc<StateCache>,
        bus: Arc<dyn Bus>,
        config: Arc<dyn ConfigSource>,
        merge: AttributeMerge,
    ) -> Self {
        Self {
            sync: SyncIntentHandler::new(repository.clone(), config, merge),
            query: QueryIntentHandler::new(repository.clone(), states),
            execute: ExecuteIntentHandler::new(repository, bus),
        }
    }

    /// Handles the first input of `request`; the assistant sends exactly one.
    pub async fn handle(
        &self,
        request: FulfillmentRequest,
    ) -> Result<FulfillmentResponse, IntentError> {
        let FulfillmentRequest { request_id, inputs } = request;
        let Some(intent) = inputs.into_iter().next() else {
            return Err(IntentError::Protocol("request carries no inputs".into()));
        };

        let payload = match intent {
            Intent::Sync => ResponsePayload::Sync(self.sync.handle(()).await?),
            Intent::Query(q) => ResponsePayload::Query(self.query.handle(q).await?),
            Intent::Execute(e) => ResponsePayload::Execute(self.execute.handle(e).await?),
            Intent::Disconnect => {
                tracing::info!("received DISCONNECT intent");
                ResponsePayload::Empty {}
            }
        };

        Ok(FulfillmentResponse { request_id, payload })
    }

    /// Same as [`handle`](Self::handle) but folds failures into a protocol error payload.
    pub async fn respond(&self, request: FulfillmentRequest) -> FulfillmentResponse {
        let request_id = request.request_id.clone();
        match self.handle(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "fulfillment failed");
                FulfillmentResponse {
                    request_id,
                    payload: ResponsePayload::Error(ErrorPayload {
                        error_code: protocol::error_codes::PROTOCOL_ERROR.to_string(),
                        debug_string: Some(e.to_string()),
                    }),
                }
            }
        }
    }
}
