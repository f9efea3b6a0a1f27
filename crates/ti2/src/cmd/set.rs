use serde::Serialize;
use ti2_scope::Microscope;
use ti2_transport::BulkTransport;
use tracing::info;

use crate::cmd::{Session, SetArgs, SetTarget};
use crate::exit::{scope_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_one, OutputFormat, Record};

/// A parsed `set` request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "target", content = "value", rename_all = "kebab-case")]
pub enum Setting {
    Objective(u8),
    Filter(u8),
    Condenser(u8),
    OpticalPath(u8),
    Dia(f64),
    Light(bool),
    Shutter(bool),
}

impl Setting {
    pub fn parse(target: SetTarget, value: &str) -> CliResult<Self> {
        let value = value.trim();
        Ok(match target {
            SetTarget::Objective => Setting::Objective(parse_index(value)?),
            SetTarget::Filter => Setting::Filter(parse_index(value)?),
            SetTarget::Condenser => Setting::Condenser(parse_index(value)?),
            SetTarget::OpticalPath => Setting::OpticalPath(parse_index(value)?),
            SetTarget::Dia => Setting::Dia(value.parse().map_err(|_| {
                CliError::new(USAGE, format!("invalid diaphragm fraction: {value}"))
            })?),
            SetTarget::Light => Setting::Light(parse_switch(value)?),
            SetTarget::Shutter => Setting::Shutter(parse_switch(value)?),
        })
    }

    pub async fn apply<T: BulkTransport + 'static>(
        self,
        scope: &Microscope<T>,
    ) -> ti2_scope::Result<()> {
        match self {
            Setting::Objective(index) => scope.set_objective(index).await,
            Setting::Filter(index) => scope.set_filter(index).await,
            Setting::Condenser(index) => scope.set_condenser(index).await,
            Setting::OpticalPath(index) => scope.set_optical_path(index).await,
            Setting::Dia(fraction) => scope.set_dia(fraction).await,
            Setting::Light(on) => scope.set_light(on).await,
            Setting::Shutter(open) => scope.set_shutter(open).await,
        }
    }
}

impl Record for Setting {
    fn columns() -> &'static [&'static str] {
        &["TARGET", "VALUE"]
    }

    fn cells(&self) -> Vec<String> {
        let (target, value) = match *self {
            Setting::Objective(index) => ("objective", index.to_string()),
            Setting::Filter(index) => ("filter", index.to_string()),
            Setting::Condenser(index) => ("condenser", index.to_string()),
            Setting::OpticalPath(index) => ("optical-path", index.to_string()),
            Setting::Dia(fraction) => ("dia", fraction.to_string()),
            Setting::Light(on) => ("light", if on { "on" } else { "off" }.to_string()),
            Setting::Shutter(open) => ("shutter", if open { "open" } else { "closed" }.to_string()),
        };
        vec![target.to_string(), value]
    }
}

fn parse_index(value: &str) -> CliResult<u8> {
    value
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid slot index: {value}")))
}

fn parse_switch(value: &str) -> CliResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "open" | "true" | "1" => Ok(true),
        "off" | "closed" | "close" | "false" | "0" => Ok(false),
        _ => Err(CliError::new(
            USAGE,
            format!("invalid switch value: {value} (expected on/off)"),
        )),
    }
}

pub async fn run(args: SetArgs, session: &Session, format: OutputFormat) -> CliResult<i32> {
    let setting = Setting::parse(args.target, &args.value)?;
    let scope = session.open()?;

    setting
        .apply(&scope)
        .await
        .map_err(|err| scope_error("set failed", err))?;
    info!(?setting, "setting applied");

    print_one(&setting, format);
    Ok(SUCCESS)
}
