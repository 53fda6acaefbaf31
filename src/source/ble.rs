//! Bluetooth LE transport.

use async_trait::async_trait;
use parking_lot::Mutex;
use sockwatch_adapters::ble::{BleAdapter, BleLink};
use tracing::info;

use super::{
    stale_handle, Link, PayloadEncoding, RawPayload, Transport, TransportError, TransportHandle,
};

/// Transport reading the sock's GATT characteristic.
#[derive(Debug)]
pub struct BleTransport {
    adapter: BleAdapter,
    address: Option<String>,
    encoding: PayloadEncoding,
    description: String,
    active: Mutex<Option<(u64, BleLink)>>,
}

impl BleTransport {
    /// With `address == None` the first sock found by scanning is used.
    pub fn new(adapter: BleAdapter, address: Option<String>, encoding: PayloadEncoding) -> Self {
        let description = match &address {
            Some(a) => format!("ble: {}", a),
            None => "ble: first sock found".to_string(),
        };
        Self {
            adapter,
            address,
            encoding,
            description,
            active: Mutex::new(None),
        }
    }

    pub fn adapter(&self) -> &BleAdapter {
        &self.adapter
    }

    fn link_for(&self, handle: &TransportHandle) -> Result<BleLink, TransportError> {
        match &*self.active.lock() {
            Some((id, link)) if *id == handle.id() => Ok(link.clone()),
            _ => Err(stale_handle(handle)),
        }
    }
}

#[async_trait]
impl Transport for BleTransport {
    async fn connect(&self) -> Result<Link, TransportError> {
        let link = self.adapter.connect(self.address.as_deref()).await?;
        let drops = self.adapter.watch_disconnect(&link).await?;
        let handle = TransportHandle::new(link.device().address.clone());
        info!(name = %link.device().name, address = %link.device().address, "BLE link open");
        *self.active.lock() = Some((handle.id(), link));
        Ok(Link::with_drops(handle, drops))
    }

    async fn disconnect(&self, handle: &TransportHandle) {
        let link = {
            let mut active = self.active.lock();
            match active.take() {
                Some((id, link)) if id == handle.id() => Some(link),
                other => {
                    *active = other;
                    None
                }
            }
        };
        if let Some(link) = link {
            self.adapter.disconnect(&link).await;
        }
    }

    async fn read_sample(&self, handle: &TransportHandle) -> Result<RawPayload, TransportError> {
        let link = self.link_for(handle)?;
        let bytes = self.adapter.read(&link).await?;
        match self.encoding {
            PayloadEncoding::Raw => Ok(RawPayload::Bytes(bytes)),
            PayloadEncoding::Base64 => String::from_utf8(bytes)
                .map(RawPayload::Base64)
                .map_err(|e| TransportError::MalformedResponse(e.to_string())),
        }
    }

    fn description(&self) -> &str {
        &self.description
    }
}
