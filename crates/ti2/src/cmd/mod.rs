use std::time::Duration;

use clap::{ArgGroup, Args, Subcommand, ValueEnum};
use ti2_scope::{
    connect_all_with_config, ChannelConfig, LabelKind, Microscope, MicroscopeConfig,
    ResponseDeadline,
};
use ti2_transport::{TransportError, UsbConfig, UsbTransport, PRODUCT_ID, VENDOR_ID};
use tracing::debug;

use crate::exit::{scope_error, transport_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod bounds;
pub mod button;
pub mod firmware;
pub mod labels;
pub mod list;
pub mod objectives;
pub mod set;
pub mod stage;
pub mod status;
pub mod version;
pub mod watch;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List attached microscopes.
    List,
    /// Show version information.
    Version(VersionArgs),
    /// Print the firmware and device version strings.
    Firmware,
    /// Print the current status.
    Status(StatusArgs),
    /// Follow the status event stream.
    Watch(WatchArgs),
    /// Describe the objectives in every nosepiece slot.
    Objectives,
    /// Print the accessory labels of one kind.
    Labels(LabelsArgs),
    /// Print the stage travel limits.
    Bounds,
    /// Change one accessory setting.
    Set(SetArgs),
    /// Move the stage.
    Move(MoveArgs),
    /// Assign a function to a hardware button.
    Button(ButtonArgs),
}

pub async fn run(command: Command, device: &DeviceArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Version(args) => version::run(args),
        Command::List => list::run(&device.session()?, format).await,
        Command::Firmware => firmware::run(&device.session()?, format).await,
        Command::Status(args) => status::run(args, &device.session()?, format).await,
        Command::Watch(args) => watch::run(args, &device.session()?, format).await,
        Command::Objectives => objectives::run(&device.session()?, format).await,
        Command::Labels(args) => labels::run(args, &device.session()?, format).await,
        Command::Bounds => bounds::run(&device.session()?, format).await,
        Command::Set(args) => set::run(args, &device.session()?, format).await,
        Command::Move(args) => stage::run(args, &device.session()?, format).await,
        Command::Button(args) => button::run(args, &device.session()?, format).await,
    }
}

/// Device selection and engine timeouts, shared by every subcommand.
#[derive(Args, Debug)]
pub struct DeviceArgs {
    /// Index of the microscope to use, in enumeration order.
    #[arg(long, global = true, env = "TI2_DEVICE", default_value_t = 0)]
    pub device: usize,
    /// Time allowed for a command response (e.g. 10s, 500ms).
    #[arg(
        long,
        value_name = "DURATION",
        global = true,
        env = "TI2_RESPONSE_TIMEOUT",
        default_value = "10s"
    )]
    pub response_timeout: String,
    /// Give every read the full response timeout instead of one overall budget.
    #[arg(long, global = true, env = "TI2_PER_READ_DEADLINE")]
    pub per_read_deadline: bool,
    /// Time allowed for a status event (e.g. 15s).
    #[arg(
        long,
        value_name = "DURATION",
        global = true,
        env = "TI2_EVENT_TIMEOUT",
        default_value = "15s"
    )]
    pub event_timeout: String,
}

impl DeviceArgs {
    pub fn session(&self) -> CliResult<Session> {
        let deadline = if self.per_read_deadline {
            ResponseDeadline::PerRead
        } else {
            ResponseDeadline::Overall
        };
        Ok(Session {
            device: self.device,
            config: MicroscopeConfig {
                channel: ChannelConfig {
                    response_timeout: parse_duration(&self.response_timeout)?,
                    deadline,
                },
                event_timeout: parse_duration(&self.event_timeout)?,
                ..MicroscopeConfig::default()
            },
        })
    }
}

/// Resolved device selection.
#[derive(Debug, Clone)]
pub struct Session {
    pub device: usize,
    pub config: MicroscopeConfig,
}

impl Session {
    /// Open every attached microscope.
    pub fn open_all(&self) -> CliResult<Vec<Microscope<UsbTransport>>> {
        connect_all_with_config(&UsbConfig::default(), self.config.clone())
            .map_err(|err| scope_error("open failed", err))
    }

    /// Open the selected microscope.
    pub fn open(&self) -> CliResult<Microscope<UsbTransport>> {
        let mut scopes = self.open_all()?;
        if scopes.is_empty() {
            return Err(transport_error(
                "open failed",
                TransportError::NoDevice {
                    vendor_id: VENDOR_ID,
                    product_id: PRODUCT_ID,
                },
            ));
        }
        if self.device >= scopes.len() {
            return Err(CliError::new(
                USAGE,
                format!(
                    "no microscope at index {} ({} attached)",
                    self.device,
                    scopes.len()
                ),
            ));
        }
        debug!(device = self.device, "selected microscope");
        Ok(scopes.swap_remove(self.device))
    }
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Wait until status updates stop before printing.
    #[arg(long)]
    pub stable: bool,
    /// Quiet period that counts as stable (e.g. 500ms).
    #[arg(long, value_name = "DURATION", env = "TI2_IDLE", default_value = "500ms")]
    pub idle: String,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Exit after printing N events.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LabelArg {
    Condenser,
    Filter,
    OpticalPath,
    Zoom,
}

impl From<LabelArg> for LabelKind {
    fn from(arg: LabelArg) -> Self {
        match arg {
            LabelArg::Condenser => LabelKind::Condenser,
            LabelArg::Filter => LabelKind::Filter,
            LabelArg::OpticalPath => LabelKind::OpticalPath,
            LabelArg::Zoom => LabelKind::Zoom,
        }
    }
}

#[derive(Args, Debug)]
pub struct LabelsArgs {
    /// Accessory kind.
    pub kind: LabelArg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SetTarget {
    Objective,
    Filter,
    Condenser,
    OpticalPath,
    Dia,
    Light,
    Shutter,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// Setting to change.
    pub target: SetTarget,
    /// Slot index, diaphragm fraction (0-1), or on/off.
    pub value: String,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("axis").required(true).multiple(true).args(["x", "y", "z"])))]
pub struct MoveArgs {
    /// Target x position [0.1 µm].
    #[arg(long, allow_hyphen_values = true)]
    pub x: Option<i32>,
    /// Target y position [0.1 µm].
    #[arg(long, allow_hyphen_values = true)]
    pub y: Option<i32>,
    /// Target z position [0.01 µm].
    #[arg(long, allow_hyphen_values = true)]
    pub z: Option<i32>,
    /// Wait for the stage to settle and print the final status.
    #[arg(long)]
    pub wait: bool,
}

#[derive(Args, Debug)]
pub struct ButtonArgs {
    /// Button index (0-7).
    pub index: u8,
    /// Function code.
    pub function: u8,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
