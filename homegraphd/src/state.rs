use std::sync::Arc;

use homegraph_core::{bus::Bus, repository::DeviceRepository, state::StateCache};
use intents::FulfillmentService;

#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<DeviceRepository>,
    pub bus: Arc<dyn Bus>,
    pub states: Arc<StateCache>,
    pub fulfillment: Arc<FulfillmentService>,
}
