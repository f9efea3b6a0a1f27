use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use rusb::{Device, DeviceHandle, GlobalContext};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::{BulkTransport, MIN_TIMEOUT, PRODUCT_ID, VENDOR_ID};

/// Configuration for opening the microscope over libusb.
#[derive(Debug, Clone)]
pub struct UsbConfig {
    /// Vendor id to match. Default: `0x04B0`.
    pub vendor_id: u16,
    /// Product id to match. Default: `0x7836`.
    pub product_id: u16,
    /// Interface claimed on open.
    pub interface: u8,
    /// Timeout applied to every bulk write.
    pub write_timeout: Duration,
}

impl Default for UsbConfig {
    fn default() -> Self {
        Self {
            vendor_id: VENDOR_ID,
            product_id: PRODUCT_ID,
            interface: 0,
            write_timeout: Duration::from_secs(10),
        }
    }
}

/// A claimed microscope device handle.
pub struct UsbTransport {
    handle: DeviceHandle<GlobalContext>,
    config: UsbConfig,
    bus: u8,
    address: u8,
}

impl UsbTransport {
    /// Open the first attached device matching the default vendor/product id.
    pub fn open_first() -> Result<Self> {
        let config = UsbConfig::default();
        list_devices_with_config(&config)?
            .into_iter()
            .next()
            .ok_or(TransportError::NoDevice {
                vendor_id: config.vendor_id,
                product_id: config.product_id,
            })
    }

    fn open(device: Device<GlobalContext>, config: UsbConfig) -> Result<Self> {
        let bus = device.bus_number();
        let address = device.address();
        let mut handle = device.open().map_err(usb_error)?;

        // Not supported on every platform; claiming still works without it.
        if let Err(err) = handle.set_auto_detach_kernel_driver(true) {
            debug!(bus, address, error = %err, "kernel driver auto-detach unavailable");
        }
        handle
            .claim_interface(config.interface)
            .map_err(usb_error)?;

        info!(bus, address, "opened microscope");
        Ok(Self {
            handle,
            config,
            bus,
            address,
        })
    }

    /// Bus number the device is attached to.
    pub fn bus(&self) -> u8 {
        self.bus
    }

    /// Device address on its bus.
    pub fn address(&self) -> u8 {
        self.address
    }
}

impl BulkTransport for UsbTransport {
    fn write(&self, endpoint: u8, data: &[u8]) -> Result<()> {
        let timeout = bulk_timeout(self.config.write_timeout);
        let written = self
            .handle
            .write_bulk(endpoint, data, timeout)
            .map_err(|err| map_usb_error(err, endpoint, timeout))?;
        if written != data.len() {
            return Err(TransportError::ShortWrite {
                written,
                expected: data.len(),
            });
        }
        Ok(())
    }

    fn read(&self, endpoint: u8, max_len: usize, timeout: Duration) -> Result<Bytes> {
        let timeout = bulk_timeout(timeout);
        let mut buf = vec![0u8; max_len];
        let read = self
            .handle
            .read_bulk(endpoint, &mut buf, timeout)
            .map_err(|err| map_usb_error(err, endpoint, timeout))?;
        buf.truncate(read);
        Ok(Bytes::from(buf))
    }
}

impl Drop for UsbTransport {
    fn drop(&mut self) {
        if let Err(err) = self.handle.release_interface(self.config.interface) {
            debug!(bus = self.bus, address = self.address, error = %err, "failed releasing interface");
        }
    }
}

impl fmt::Debug for UsbTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UsbTransport")
            .field("bus", &self.bus)
            .field("address", &self.address)
            .field("interface", &self.config.interface)
            .finish()
    }
}

/// Open every attached microscope with the default configuration.
pub fn list_devices() -> Result<Vec<UsbTransport>> {
    list_devices_with_config(&UsbConfig::default())
}

/// Open every attached device matching `config`'s vendor/product id.
pub fn list_devices_with_config(config: &UsbConfig) -> Result<Vec<UsbTransport>> {
    let devices = rusb::devices().map_err(usb_error)?;
    let mut out = Vec::new();

    for device in devices.iter() {
        let descriptor = device.device_descriptor().map_err(usb_error)?;
        if descriptor.vendor_id() != config.vendor_id
            || descriptor.product_id() != config.product_id
        {
            continue;
        }
        out.push(UsbTransport::open(device, config.clone())?);
    }

    debug!(count = out.len(), "enumerated microscopes");
    Ok(out)
}

/// Round sub-millisecond timeouts up so libusb never sees a zero (unlimited) wait.
fn bulk_timeout(timeout: Duration) -> Duration {
    timeout.max(MIN_TIMEOUT)
}

fn map_usb_error(err: rusb::Error, endpoint: u8, timeout: Duration) -> TransportError {
    match err {
        rusb::Error::Timeout => TransportError::Timeout { endpoint, timeout },
        other => usb_error(other),
    }
}

fn usb_error(err: rusb::Error) -> TransportError {
    match err {
        rusb::Error::NoDevice => TransportError::Disconnected,
        rusb::Error::Io => TransportError::Io(std::io::Error::other("libusb I/O error")),
        other => TransportError::Usb(other),
    }
}
