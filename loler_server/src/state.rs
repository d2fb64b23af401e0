use std::sync::Arc;

use loler_core::{
    config::UpstreamConfig,
    github::{DeviceFlowGateway, GithubDeviceClient},
    memory_lol::{LookupGateway, MemoryLolClient},
};

#[derive(Clone)]
pub struct ServerState {
    lookup: Arc<dyn LookupGateway>,
    device_flow: Arc<dyn DeviceFlowGateway>,
}

impl From<(Arc<dyn LookupGateway>, Arc<dyn DeviceFlowGateway>)> for ServerState {
    fn from(states: (Arc<dyn LookupGateway>, Arc<dyn DeviceFlowGateway>)) -> Self {
        let (lookup, device_flow) = states;
        Self {
            lookup,
            device_flow,
        }
    }
}

impl From<&UpstreamConfig> for ServerState {
    fn from(config: &UpstreamConfig) -> Self {
        let lookup: Arc<dyn LookupGateway> = Arc::new(MemoryLolClient::new(config));
        let device_flow: Arc<dyn DeviceFlowGateway> = Arc::new(GithubDeviceClient::new(config));
        Self::from((lookup, device_flow))
    }
}

impl ServerState {
    pub fn lookup(&self) -> &dyn LookupGateway {
        self.lookup.as_ref()
    }

    pub fn device_flow(&self) -> &dyn DeviceFlowGateway {
        self.device_flow.as_ref()
    }
}
