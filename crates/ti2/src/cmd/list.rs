use serde::Serialize;
use tracing::warn;

use crate::cmd::Session;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_all, OutputFormat, Record};

#[derive(Debug, Serialize)]
struct Device {
    index: usize,
    bus: u8,
    address: u8,
    firmware: Option<String>,
}

impl Record for Device {
    fn columns() -> &'static [&'static str] {
        &["INDEX", "BUS", "ADDRESS", "FIRMWARE"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.index.to_string(),
            format!("{:03}", self.bus),
            format!("{:03}", self.address),
            self.firmware.clone().unwrap_or_else(|| "-".to_string()),
        ]
    }
}

pub async fn run(session: &Session, format: OutputFormat) -> CliResult<i32> {
    let scopes = session.open_all()?;

    let mut devices = Vec::with_capacity(scopes.len());
    for (index, scope) in scopes.iter().enumerate() {
        // An unresponsive device is still listed.
        let firmware = match scope.firmware_cpu_version().await {
            Ok(version) => Some(version),
            Err(err) => {
                warn!(index, %err, "firmware query failed");
                None
            }
        };
        devices.push(Device {
            index,
            bus: scope.transport().bus(),
            address: scope.transport().address(),
            firmware,
        });
    }

    print_all(&devices, format);
    Ok(SUCCESS)
}
