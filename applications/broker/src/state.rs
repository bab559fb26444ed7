/// Shared application state
use crate::config::BrokerConfig;
use crate::engine::LoggingEngine;
use hub_core::{AllowAll, AudioStreamRole, Lifetime, SessionKey};
use hub_session::{DeviceObservers, DeviceProperties, MediaBroker};
use std::sync::Arc;

/// A running broker wired to in-process device properties
pub struct AppState {
    pub broker: MediaBroker,
    pub device: Arc<DeviceProperties>,
}

impl AppState {
    /// Start the broker; must be called from within a tokio runtime
    pub fn start(config: &BrokerConfig) -> Self {
        let device = Arc::new(DeviceProperties::new());
        let broker = MediaBroker::start(
            config.broker_options(),
            Arc::new(AllowAll),
            &DeviceObservers::from_properties(&device),
        );
        Self { broker, device }
    }

    /// Create a session driven by a fresh `LoggingEngine`
    pub async fn create_session(
        &self,
        name: &str,
        role: AudioStreamRole,
        lifetime: Lifetime,
    ) -> SessionKey {
        self.broker
            .create_session(role, lifetime, Arc::new(LoggingEngine::new(name)))
            .await
    }
}
