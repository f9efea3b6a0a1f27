use serde::Serialize;
use ti2_scope::Microscope;
use ti2_transport::BulkTransport;

use crate::cmd::Session;
use crate::exit::{scope_error, CliResult, SUCCESS};
use crate::output::{print_one, OutputFormat, Record};

#[derive(Debug, Serialize)]
struct Versions {
    firmware: String,
    version: String,
}

impl Record for Versions {
    fn columns() -> &'static [&'static str] {
        &["FIRMWARE", "VERSION"]
    }

    fn cells(&self) -> Vec<String> {
        vec![self.firmware.clone(), self.version.clone()]
    }
}

pub async fn run(session: &Session, format: OutputFormat) -> CliResult<i32> {
    let scope = session.open()?;
    let versions = query(&scope).await?;
    print_one(&versions, format);
    Ok(SUCCESS)
}

async fn query<T: BulkTransport + 'static>(scope: &Microscope<T>) -> CliResult<Versions> {
    Ok(Versions {
        firmware: scope
            .firmware_cpu_version()
            .await
            .map_err(|err| scope_error("firmware query failed", err))?,
        version: scope
            .version()
            .await
            .map_err(|err| scope_error("version query failed", err))?,
    })
}
