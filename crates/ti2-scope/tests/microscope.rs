use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures_util::StreamExt;
use ti2_scope::{
    ChannelConfig, LabelKind, Microscope, MicroscopeConfig, ScopeError, StageBound,
};
use ti2_transport::{
    echo_response, BulkTransport, MockTransport, TransportError, COMMAND_FRAME_SIZE, COMMAND_IN,
    EVENT_FRAME_SIZE, EVENT_IN,
};

fn config() -> MicroscopeConfig {
    MicroscopeConfig {
        channel: ChannelConfig {
            response_timeout: Duration::from_millis(200),
            ..ChannelConfig::default()
        },
        event_timeout: Duration::from_millis(100),
        idle_duration: Duration::from_millis(30),
    }
}

fn scope(mock: MockTransport) -> Microscope<MockTransport> {
    Microscope::with_config(mock, config())
}

fn event_at(x: i32) -> Vec<u8> {
    let mut frame = vec![0u8; EVENT_FRAME_SIZE];
    frame[3] = 2;
    frame[4] = 1;
    frame[5] = 0x13;
    frame[8] = 1;
    frame[18..22].copy_from_slice(&x.to_be_bytes());
    frame[34..36].copy_from_slice(&1u16.to_be_bytes());
    frame[36] = 1;
    frame[44] = 0x41;
    frame
}

/// A response frame for `request` with `fill` applied to the body.
fn reply(request: &[u8], fill: impl FnOnce(&mut [u8])) -> Bytes {
    let mut frame = echo_response(request).to_vec();
    fill(&mut frame);
    Bytes::from(frame)
}

fn put_text(frame: &mut [u8], at: usize, text: &str) {
    frame[at..at + text.len()].copy_from_slice(text.as_bytes());
}

fn request_ids(mock: &MockTransport) -> Vec<u16> {
    mock.writes()
        .iter()
        .map(|(_, frame)| u16::from_be_bytes([frame[60], frame[61]]))
        .collect()
}

#[tokio::test]
async fn concurrent_commands_are_serialized() {
    let scope = scope(MockTransport::echoing());

    let mut tasks = Vec::new();
    for i in 0..8 {
        let scope = scope.clone();
        tasks.push(tokio::spawn(async move { scope.set_light(i % 2 == 0).await }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let ids = request_ids(scope.transport());
    assert_eq!(ids.len(), 8);
    for pair in ids.windows(2) {
        assert_eq!(pair[1], pair[0].wrapping_add(1));
    }
}

#[tokio::test]
async fn invalid_arguments_never_reach_the_device() {
    let scope = scope(MockTransport::echoing());

    assert!(matches!(
        scope.set_objective(6).await,
        Err(ScopeError::OutOfRange { .. })
    ));
    assert!(matches!(
        scope.set_condenser(7).await,
        Err(ScopeError::OutOfRange { .. })
    ));
    assert!(matches!(
        scope.set_dia(1.1).await,
        Err(ScopeError::OutOfRange { .. })
    ));
    assert!(matches!(
        scope.set_dia(-0.01).await,
        Err(ScopeError::OutOfRange { .. })
    ));

    assert!(scope.transport().writes().is_empty());
}

#[tokio::test]
async fn unanswered_request_times_out() {
    let scope = scope(MockTransport::new());
    let err = scope.set_shutter(true).await.unwrap_err();
    assert!(matches!(err, ScopeError::RequestTimeout(t) if t == Duration::from_millis(200)));
}

/// Echoes every request after a per-request delay and logs which
/// response identifiers were handed out by reads.
struct SlowEcho {
    delays: Mutex<VecDeque<Duration>>,
    replies: Mutex<VecDeque<(Duration, Bytes)>>,
    served: Mutex<Vec<u16>>,
}

impl SlowEcho {
    fn new(delays: impl IntoIterator<Item = Duration>) -> Self {
        Self {
            delays: Mutex::new(delays.into_iter().collect()),
            replies: Mutex::new(VecDeque::new()),
            served: Mutex::new(Vec::new()),
        }
    }
}

impl BulkTransport for SlowEcho {
    fn write(&self, _endpoint: u8, data: &[u8]) -> ti2_transport::Result<()> {
        let delay = self.delays.lock().unwrap().pop_front().unwrap_or_default();
        self.replies
            .lock()
            .unwrap()
            .push_back((delay, echo_response(data)));
        Ok(())
    }

    fn read(&self, endpoint: u8, _max_len: usize, timeout: Duration) -> ti2_transport::Result<Bytes> {
        let next = if endpoint == COMMAND_IN {
            self.replies.lock().unwrap().pop_front()
        } else {
            None
        };
        match next {
            Some((delay, frame)) if delay <= timeout => {
                std::thread::sleep(delay);
                self.served
                    .lock()
                    .unwrap()
                    .push(u16::from_be_bytes([frame[60], frame[61]]));
                Ok(frame)
            }
            _ => {
                std::thread::sleep(timeout);
                Err(TransportError::Timeout { endpoint, timeout })
            }
        }
    }
}

#[tokio::test]
async fn cancelled_request_does_not_steal_the_next_response() {
    let transport = Arc::new(SlowEcho::new([Duration::from_millis(100)]));
    let scope = Microscope::from_shared(Arc::clone(&transport), config());

    let abandoned = tokio::time::timeout(Duration::from_millis(20), scope.set_light(true)).await;
    assert!(abandoned.is_err(), "first request should still be waiting");

    scope.set_light(false).await.unwrap();

    assert!(transport.replies.lock().unwrap().is_empty());
    let served = transport.served.lock().unwrap().clone();
    assert_eq!(served.len(), 2);
    assert_eq!(served[1], served[0].wrapping_add(1));
}

#[tokio::test]
async fn event_stream_yields_events_in_order() {
    let mock = MockTransport::new();
    for x in [10, 20, 30] {
        mock.push_frame(EVENT_IN, event_at(x));
    }
    let scope = scope(mock);

    let mut events = scope.events();
    let mut xs = Vec::new();
    for _ in 0..3 {
        let event = events.next().await.unwrap().unwrap();
        xs.push(event.x);
    }

    assert_eq!(xs, vec![10, 20, 30]);
}

#[tokio::test]
async fn event_stream_survives_timeouts() {
    let mock = MockTransport::new();
    mock.push_timeout(EVENT_IN);
    mock.push_frame(EVENT_IN, event_at(7));
    let scope = scope(mock);

    let mut events = scope.events();
    assert!(matches!(
        events.next().await,
        Some(Err(ScopeError::NoStatus(_)))
    ));
    let event = events.next().await.unwrap().unwrap();
    assert_eq!(event.x, 7);
    assert_eq!(event.objective, 1);
    assert_eq!(event.filter, 2);
    assert!(event.shutter);
    assert!(event.light);
    assert_eq!(event.zoom, 1);
}

#[tokio::test]
async fn events_flow_while_a_command_is_in_flight() {
    let mock = MockTransport::new();
    mock.push_delayed(EVENT_IN, Duration::from_millis(20), event_at(5));
    let scope = scope(mock);

    let pending = {
        let scope = scope.clone();
        tokio::spawn(async move { scope.set_x(100).await })
    };
    tokio::time::sleep(Duration::from_millis(5)).await;

    let start = Instant::now();
    let status = scope.current_status().await.unwrap();
    assert_eq!(status.x, 5);
    assert!(start.elapsed() < Duration::from_millis(150));

    assert!(matches!(
        pending.await.unwrap(),
        Err(ScopeError::RequestTimeout(_))
    ));
}

#[tokio::test]
async fn cancelled_status_read_drops_its_event() {
    let mock = MockTransport::new();
    mock.push_delayed(EVENT_IN, Duration::from_millis(50), event_at(1));
    mock.push_frame(EVENT_IN, event_at(2));
    let scope = scope(mock);

    let cancelled = tokio::time::timeout(Duration::from_millis(10), scope.current_status()).await;
    assert!(cancelled.is_err());
    tokio::time::sleep(Duration::from_millis(80)).await;

    let status = scope.current_status().await.unwrap();
    assert_eq!(status.x, 2);
}

#[tokio::test]
async fn stable_status_returns_last_event_before_quiet_period() {
    let mock = MockTransport::new();
    for x in 1..=5 {
        mock.push_frame(EVENT_IN, event_at(x));
    }
    mock.push_delayed(EVENT_IN, Duration::from_secs(1), event_at(99));
    let scope = scope(mock);

    let status = scope.stable_status().await.unwrap();
    assert_eq!(status.x, 5);
}

#[tokio::test]
async fn sub_millisecond_event_waits_are_rejected() {
    let mock = MockTransport::new();
    mock.push_frame(EVENT_IN, event_at(1));
    let scope = scope(mock);

    let err = scope.stable_status_after(Duration::ZERO).await.unwrap_err();
    assert!(matches!(err, ScopeError::OutOfRange { field: "idle", .. }));

    let mut events = scope.events().with_timeout(Duration::from_micros(500));
    assert!(matches!(
        events.next_event().await,
        Err(ScopeError::OutOfRange { field: "event_timeout", .. })
    ));
    assert_eq!(scope.transport().pending_reads(EVENT_IN), 1);

    let impatient = Microscope::with_config(
        MockTransport::new(),
        MicroscopeConfig {
            event_timeout: Duration::ZERO,
            ..config()
        },
    );
    assert!(matches!(
        impatient.stable_status().await,
        Err(ScopeError::OutOfRange { field: "event_timeout", .. })
    ));
}

#[tokio::test]
async fn stable_status_without_events_is_no_status() {
    let scope = scope(MockTransport::new());
    let err = scope.stable_status().await.unwrap_err();
    assert!(matches!(err, ScopeError::NoStatus(t) if t == Duration::from_millis(100)));
}

#[tokio::test]
async fn objective_info_is_decoded() {
    let mock = MockTransport::new().with_responder(|_, request| {
        assert_eq!(&request[..4], &[0x01, 0x00, 0x19, 0x00]);
        let slot = request[9];
        vec![reply(request, |frame| {
            put_text(frame, 10, "MRH00201");
            frame[18..20].copy_from_slice(&(100 * u16::from(slot)).to_be_bytes());
            frame[20..22].copy_from_slice(&45u16.to_be_bytes());
            frame[22..24].copy_from_slice(&2u16.to_be_bytes());
            put_text(frame, 24, "Plan Apo");
            put_text(frame, 38, "4.00");
            put_text(frame, 42, "DIC");
            put_text(frame, 46, "Oil");
        })]
    });
    let scope = scope(mock);

    let info = scope.objective_info(1).await.unwrap();
    assert_eq!(info.magnification, 200);
    assert_eq!(info.numerical_aperture, 45);
    assert!(info.pfs);
    assert_eq!(info.model, "MRH00201");
    assert_eq!(info.series, "Plan Apo");
    assert_eq!(info.working_distance, 400);
    assert_eq!(info.observation, "DIC");
    assert_eq!(info.refractive_index, "Oil");

    let all = scope.objective_infos().await.unwrap();
    assert_eq!(all.len(), 6);
    assert_eq!(all[5].magnification, 600);
}

#[tokio::test]
async fn labels_use_long_or_short_name_per_kind() {
    let mock = MockTransport::new().with_responder(|_, request| {
        let slot = request[9];
        vec![reply(request, |frame| {
            frame[10..50].fill(b' ');
            put_text(frame, 10, &format!("Long name {slot}   "));
            put_text(frame, 40, &format!("S{slot}  "));
        })]
    });
    let scope = scope(mock);

    let condensers = scope.condenser_labels().await.unwrap();
    assert_eq!(condensers.len(), 7);
    assert_eq!(condensers[0], "Long name 1");
    assert_eq!(condensers[6], "Long name 7");

    let paths = scope.optical_path_labels().await.unwrap();
    assert_eq!(paths, vec!["S1", "S2", "S3", "S4"]);

    assert_eq!(scope.zoom_label(1).await.unwrap(), "S2");
    assert_eq!(scope.filter_label(5).await.unwrap(), "Long name 6");

    let pair = scope.label(LabelKind::Filter, 0).await.unwrap();
    assert_eq!(pair.long, "Long name 1");
    assert_eq!(pair.short, "S1");
}

#[tokio::test]
async fn stage_bounds_are_queried_by_selector() {
    let mock = MockTransport::new().with_responder(|_, request| {
        let value: i32 = match [request[2], request[3]] {
            [0x1B, 0x08] => -50_000,
            [0x1A, 0x08] => 50_000,
            [0x1B, 0x0C] => -30_000,
            [0x1A, 0x0C] => 30_000,
            [0x1B, 0x04] => 1_000_000,
            other => panic!("unexpected selector {other:?}"),
        };
        vec![reply(request, |frame| {
            frame[6..10].copy_from_slice(&value.to_be_bytes())
        })]
    });
    let scope = scope(mock);

    assert_eq!(scope.x_bounds().await.unwrap(), (-50_000, 50_000));
    assert_eq!(scope.y_bounds().await.unwrap(), (-30_000, 30_000));
    assert_eq!(scope.z_bound().await.unwrap(), 1_000_000);
    assert_eq!(scope.bound(StageBound::XMax).await.unwrap(), 50_000);
}

#[tokio::test]
async fn version_strings() {
    let mock = MockTransport::new().with_responder(|_, request| {
        let text = if request[2] == 0x08 { "1.2.3" } else { "2.10.0\0\0" };
        vec![reply(request, |frame| put_text(frame, 6, text))]
    });
    let scope = scope(mock);

    assert_eq!(scope.firmware_cpu_version().await.unwrap(), "1.2.3");
    assert_eq!(scope.version().await.unwrap(), "2.10.0");
}

#[tokio::test]
async fn short_response_is_a_decode_error() {
    let mock = MockTransport::new().with_responder(|_, request| {
        let mut frame = vec![0u8; COMMAND_FRAME_SIZE];
        frame[60..62].copy_from_slice(&request[60..62]);
        frame.truncate(30);
        vec![Bytes::from(frame)]
    });
    let scope = scope(mock);

    let err = scope.version().await.unwrap_err();
    assert!(matches!(err, ScopeError::Decode(_)));
}
