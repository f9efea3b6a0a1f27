use ti2_transport::{list_devices_with_config, UsbConfig, UsbTransport};
use tracing::info;

use crate::config::MicroscopeConfig;
use crate::error::Result;
use crate::microscope::Microscope;

/// Open every attached Ti2 with default configuration.
///
/// An empty list means no microscope is attached.
pub fn connect_all() -> Result<Vec<Microscope<UsbTransport>>> {
    connect_all_with_config(&UsbConfig::default(), MicroscopeConfig::default())
}

/// Open every attached device matching `usb`, each with a copy of `config`.
pub fn connect_all_with_config(
    usb: &UsbConfig,
    config: MicroscopeConfig,
) -> Result<Vec<Microscope<UsbTransport>>> {
    let scopes: Vec<_> = list_devices_with_config(usb)?
        .into_iter()
        .map(|transport| Microscope::with_config(transport, config.clone()))
        .collect();
    info!(count = scopes.len(), "connected microscopes");
    Ok(scopes)
}
