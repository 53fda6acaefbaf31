//! HTTP transport for the ESP32 firmware.
//!
//! The firmware has no standing connection, so "connecting" means a
//! successful `GET /ping`. Each read is one `GET /pressure`.

use async_trait::async_trait;
use parking_lot::Mutex;
use sockwatch_adapters::esp32::Esp32Adapter;
use tracing::debug;

use super::{stale_handle, Link, RawPayload, Transport, TransportError, TransportHandle};

/// Transport reading pressure from the ESP32 over WiFi.
#[derive(Debug)]
pub struct HttpTransport {
    adapter: Esp32Adapter,
    description: String,
    active: Mutex<Option<u64>>,
}

impl HttpTransport {
    pub fn new(adapter: Esp32Adapter) -> Self {
        let description = format!("esp32: {}", adapter.endpoint());
        Self {
            adapter,
            description,
            active: Mutex::new(None),
        }
    }

    /// The underlying adapter, also used for provisioning.
    pub fn adapter(&self) -> &Esp32Adapter {
        &self.adapter
    }

    fn ensure_active(&self, handle: &TransportHandle) -> Result<(), TransportError> {
        if *self.active.lock() == Some(handle.id()) {
            Ok(())
        } else {
            Err(stale_handle(handle))
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn connect(&self) -> Result<Link, TransportError> {
        self.adapter.ping().await?;
        let handle = TransportHandle::new(self.adapter.endpoint());
        *self.active.lock() = Some(handle.id());
        debug!(endpoint = %self.adapter.endpoint(), "ESP32 answered ping");
        Ok(Link::new(handle))
    }

    async fn disconnect(&self, handle: &TransportHandle) {
        let mut active = self.active.lock();
        if *active == Some(handle.id()) {
            *active = None;
        }
    }

    async fn read_sample(&self, handle: &TransportHandle) -> Result<RawPayload, TransportError> {
        self.ensure_active(handle)?;
        self.adapter.read_pressure().await.map(RawPayload::Text)
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_without_connect_is_refused() {
        let adapter = Esp32Adapter::builder().address("127.0.0.1:9").build().unwrap();
        let transport = HttpTransport::new(adapter);
        let handle = TransportHandle::new("http://127.0.0.1:9");

        assert!(matches!(
            transport.read_sample(&handle).await,
            Err(TransportError::Disconnected(_))
        ));
    }

    #[test]
    fn description_names_the_endpoint() {
        let adapter = Esp32Adapter::builder().address("10.0.0.7").build().unwrap();
        let transport = HttpTransport::new(adapter);
        assert_eq!(transport.description(), "esp32: http://10.0.0.7");
    }
}
