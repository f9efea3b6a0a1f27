use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use ti2_frame::codec::{
    bound_query, button_function_query, firmware_version_query, label_query, objective_query,
    version_query,
};
use ti2_frame::{
    decode_bound, decode_firmware_version, decode_label, decode_objective_info, decode_version,
    CommandChannel, Command, EventReader, LabelKind, LabelPair, ObjectiveInfo, StageBound,
    StatusEvent,
};
use ti2_transport::{BulkTransport, MIN_TIMEOUT};
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::MicroscopeConfig;
use crate::error::{Result, ScopeError};
use crate::stream::EventStream;

/// Number of objective slots on the nosepiece.
pub const OBJECTIVE_SLOTS: u8 = 6;
/// Number of filter slots.
pub const FILTER_SLOTS: u8 = 6;
/// Number of condenser slots.
pub const CONDENSER_SLOTS: u8 = 7;
/// Number of optical paths.
pub const OPTICAL_PATH_SLOTS: u8 = 4;
/// Number of assignable function buttons.
pub const BUTTON_SLOTS: u8 = 8;

/// One connected microscope.
///
/// Every request (query or command) holds the command lock from identifier
/// allocation until its response has been correlated, so at most one request
/// is in flight per device. Waiters are served in FIFO order.
///
/// The event stream does not take the lock; it reads its own endpoint and
/// can be consumed while commands are in flight.
///
/// If a caller drops a request future while it waits, the blocking worker
/// still owns the lock guard and finishes reading that request's response
/// (or times out) before the next request is issued.
pub struct Microscope<T> {
    commands: Arc<Mutex<CommandChannel<Arc<T>>>>,
    events: EventReader<Arc<T>>,
    config: MicroscopeConfig,
}

impl<T: BulkTransport + 'static> Microscope<T> {
    /// Wrap a transport with default configuration.
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, MicroscopeConfig::default())
    }

    /// Wrap a transport with explicit configuration.
    pub fn with_config(transport: T, config: MicroscopeConfig) -> Self {
        Self::from_shared(Arc::new(transport), config)
    }

    /// Wrap an already shared transport.
    pub fn from_shared(transport: Arc<T>, config: MicroscopeConfig) -> Self {
        let channel = CommandChannel::with_config(Arc::clone(&transport), config.channel.clone());
        Self {
            commands: Arc::new(Mutex::new(channel)),
            events: EventReader::new(transport),
            config,
        }
    }

    /// Current engine configuration.
    pub fn config(&self) -> &MicroscopeConfig {
        &self.config
    }

    /// Borrow the underlying transport.
    pub fn transport(&self) -> &T {
        self.events.get_ref()
    }

    async fn request(&self, payload: Bytes) -> Result<Bytes> {
        let mut channel = Arc::clone(&self.commands).lock_owned().await;
        let response = tokio::task::spawn_blocking(move || channel.issue(&payload)).await??;
        Ok(response)
    }

    async fn send(&self, command: Command) -> Result<()> {
        debug!(?command, "sending command");
        self.request(command.encode()?).await?;
        Ok(())
    }

    // Version numbers

    /// Query the firmware CPU version.
    pub async fn firmware_cpu_version(&self) -> Result<String> {
        let response = self.request(firmware_version_query()).await?;
        Ok(decode_firmware_version(&response)?)
    }

    /// Query the general version string.
    pub async fn version(&self) -> Result<String> {
        let response = self.request(version_query()).await?;
        Ok(decode_version(&response)?)
    }

    // Labels

    /// Query both labels of one accessory slot.
    pub async fn label(&self, kind: LabelKind, index: u8) -> Result<LabelPair> {
        check_index(kind.name(), index, kind.slots())?;
        let response = self.request(label_query(kind, index)).await?;
        Ok(decode_label(&response)?)
    }

    /// Query the display label of every slot of `kind`, in slot order.
    pub async fn labels(&self, kind: LabelKind) -> Result<Vec<String>> {
        let mut labels = Vec::with_capacity(usize::from(kind.slots()));
        for index in 0..kind.slots() {
            labels.push(self.display_label(kind, index).await?);
        }
        Ok(labels)
    }

    async fn display_label(&self, kind: LabelKind, index: u8) -> Result<String> {
        let pair = self.label(kind, index).await?;
        Ok(kind.display_label(pair))
    }

    /// Name of condenser `index` (0-6).
    pub async fn condenser_label(&self, index: u8) -> Result<String> {
        self.display_label(LabelKind::Condenser, index).await
    }

    /// Names of all condensers.
    pub async fn condenser_labels(&self) -> Result<Vec<String>> {
        self.labels(LabelKind::Condenser).await
    }

    /// Name of filter `index` (0-5).
    pub async fn filter_label(&self, index: u8) -> Result<String> {
        self.display_label(LabelKind::Filter, index).await
    }

    /// Names of all filters.
    pub async fn filter_labels(&self) -> Result<Vec<String>> {
        self.labels(LabelKind::Filter).await
    }

    /// Name of optical path `index` (0-3).
    pub async fn optical_path_label(&self, index: u8) -> Result<String> {
        self.display_label(LabelKind::OpticalPath, index).await
    }

    /// Names of all optical paths.
    pub async fn optical_path_labels(&self) -> Result<Vec<String>> {
        self.labels(LabelKind::OpticalPath).await
    }

    /// Name of zoom level `index` (0-1).
    pub async fn zoom_label(&self, index: u8) -> Result<String> {
        self.display_label(LabelKind::Zoom, index).await
    }

    /// Names of both zoom levels.
    pub async fn zoom_labels(&self) -> Result<Vec<String>> {
        self.labels(LabelKind::Zoom).await
    }

    // Objectives

    /// Query the descriptor of objective slot `index` (0-5).
    ///
    /// Not cached; every call queries the device.
    pub async fn objective_info(&self, index: u8) -> Result<ObjectiveInfo> {
        check_index("objective", index, OBJECTIVE_SLOTS)?;
        let response = self.request(objective_query(index)).await?;
        Ok(decode_objective_info(&response)?)
    }

    /// Query the descriptors of all objective slots.
    pub async fn objective_infos(&self) -> Result<Vec<ObjectiveInfo>> {
        let mut infos = Vec::with_capacity(usize::from(OBJECTIVE_SLOTS));
        for index in 0..OBJECTIVE_SLOTS {
            infos.push(self.objective_info(index).await?);
        }
        Ok(infos)
    }

    // Stage bounds

    /// Query one stage travel limit.
    pub async fn bound(&self, bound: StageBound) -> Result<i32> {
        let response = self.request(bound_query(bound)).await?;
        Ok(decode_bound(&response)?)
    }

    /// The minimum and maximum x positions [0.1 µm].
    pub async fn x_bounds(&self) -> Result<(i32, i32)> {
        Ok((
            self.bound(StageBound::XMin).await?,
            self.bound(StageBound::XMax).await?,
        ))
    }

    /// The minimum and maximum y positions [0.1 µm].
    pub async fn y_bounds(&self) -> Result<(i32, i32)> {
        Ok((
            self.bound(StageBound::YMin).await?,
            self.bound(StageBound::YMax).await?,
        ))
    }

    /// The maximum z position [0.01 µm].
    pub async fn z_bound(&self) -> Result<i32> {
        self.bound(StageBound::ZMax).await
    }

    // Stage

    /// Move the stage to an x position [0.1 µm].
    pub async fn set_x(&self, value: i32) -> Result<()> {
        self.send(Command::X(value)).await
    }

    /// Move the stage to a y position [0.1 µm].
    pub async fn set_y(&self, value: i32) -> Result<()> {
        self.send(Command::Y(value)).await
    }

    /// Move the focus to a z position [0.01 µm].
    pub async fn set_z(&self, value: i32) -> Result<()> {
        self.send(Command::Z(value)).await
    }

    // Other controls

    /// Select condenser `index` (0-6).
    pub async fn set_condenser(&self, index: u8) -> Result<()> {
        check_index("condenser", index, CONDENSER_SLOTS)?;
        self.send(Command::Condenser(index)).await
    }

    /// Set the diaphragm opening, from `0.0` (closed) to `1.0` (open).
    pub async fn set_dia(&self, value: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&value) {
            return Err(ScopeError::OutOfRange {
                field: "dia",
                value: value.to_string(),
                range: "0.0..=1.0".to_string(),
            });
        }
        self.send(Command::Diaphragm(value)).await
    }

    /// Select filter `index` (0-5).
    pub async fn set_filter(&self, index: u8) -> Result<()> {
        check_index("filter", index, FILTER_SLOTS)?;
        self.send(Command::Filter(index)).await
    }

    /// Switch the light on or off.
    pub async fn set_light(&self, on: bool) -> Result<()> {
        self.send(Command::Light(on)).await
    }

    /// Select objective `index` (0-5).
    pub async fn set_objective(&self, index: u8) -> Result<()> {
        check_index("objective", index, OBJECTIVE_SLOTS)?;
        self.send(Command::Objective(index)).await
    }

    /// Select optical path `index` (0-3).
    pub async fn set_optical_path(&self, index: u8) -> Result<()> {
        check_index("optical path", index, OPTICAL_PATH_SLOTS)?;
        self.send(Command::OpticalPath(index)).await
    }

    /// Open or close the shutter.
    pub async fn set_shutter(&self, open: bool) -> Result<()> {
        self.send(Command::Shutter(open)).await
    }

    // Buttons

    /// Assign function code `function` to hardware button `index` (0-7).
    pub async fn set_button_function(&self, index: u8, function: u8) -> Result<()> {
        check_index("button", index, BUTTON_SLOTS)?;
        self.request(button_function_query(index, function)).await?;
        Ok(())
    }

    // Events

    /// A stream of status events using the configured event timeout.
    pub fn events(&self) -> EventStream<T> {
        EventStream::new(self.events.clone(), self.config.event_timeout)
    }

    /// The next status event.
    ///
    /// Cancelling this future lets the read in progress finish on the
    /// blocking pool; the event it returns is dropped.
    pub async fn current_status(&self) -> Result<StatusEvent> {
        self.events().next_event().await
    }

    /// The status once updates have stopped for the configured idle duration.
    pub async fn stable_status(&self) -> Result<StatusEvent> {
        self.stable_status_after(self.config.idle_duration).await
    }

    /// The last status received before a quiet period of `idle`.
    ///
    /// Fails with [`ScopeError::NoStatus`] if not even a first event arrives
    /// within the event timeout, and with [`ScopeError::OutOfRange`] if
    /// either duration is shorter than a millisecond.
    pub async fn stable_status_after(&self, idle: Duration) -> Result<StatusEvent> {
        check_timeout("idle", idle)?;
        check_timeout("event_timeout", self.config.event_timeout)?;
        let reader = self.events.clone();
        let first_timeout = self.config.event_timeout;
        let status =
            tokio::task::spawn_blocking(move || reader.settle(first_timeout, idle)).await??;
        Ok(status)
    }
}

impl<T> Clone for Microscope<T> {
    fn clone(&self) -> Self {
        Self {
            commands: Arc::clone(&self.commands),
            events: self.events.clone(),
            config: self.config.clone(),
        }
    }
}

impl<T> fmt::Debug for Microscope<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Microscope")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn check_index(field: &'static str, index: u8, slots: u8) -> Result<()> {
    if index >= slots {
        return Err(ScopeError::OutOfRange {
            field,
            value: index.to_string(),
            range: format!("0..={}", slots - 1),
        });
    }
    Ok(())
}

pub(crate) fn check_timeout(field: &'static str, timeout: Duration) -> Result<()> {
    if timeout < MIN_TIMEOUT {
        return Err(ScopeError::OutOfRange {
            field,
            value: format!("{timeout:?}"),
            range: format!(">= {MIN_TIMEOUT:?}"),
        });
    }
    Ok(())
}
