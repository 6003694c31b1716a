//! Transport of downsampled stills to a gesture recogniser and of gesture events back.
//!
//! The render loop only sees [`FrameTransport`]. [`GestureWorker`] runs a detector on its own
//! thread behind bounded channels so a slow recogniser drops stills instead of stalling frames.
//! [`JsonLinesTransport`] writes the wire messages to any writer for an external recogniser.

use std::collections::BTreeMap;
use std::io::Write;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use glitchconfig::ScriptStep;
use image::RgbaImage;
use selector::GestureTable;
use tracing::{debug, warn};

use crate::capture::EncodedStill;
use crate::error::TransportError;
use crate::wire::{FrameMessage, GestureEvent};

pub trait FrameTransport {
    /// Hands one still to the recogniser. Never blocks on the recogniser.
    fn send_frame(&mut self, still: EncodedStill) -> Result<(), TransportError>;

    /// Stream of gesture events, if this transport produces any.
    fn events(&self) -> Option<Receiver<GestureEvent>>;

    /// Stops the transport. Further sends fail with [`TransportError::Closed`].
    fn close(&mut self);
}

/// Opens the transport for one session. Each `start` gets a fresh one since `stop` closes it.
pub trait TransportFactory {
    fn open(&mut self) -> Result<Box<dyn FrameTransport>, TransportError>;
}

impl<F> TransportFactory for F
where
    F: FnMut() -> Result<Box<dyn FrameTransport>, TransportError>,
{
    fn open(&mut self) -> Result<Box<dyn FrameTransport>, TransportError> {
        self()
    }
}

/// Recognises gestures in a decoded still.
pub trait GestureDetector: Send + 'static {
    fn detect(&mut self, still: &RgbaImage) -> BTreeMap<String, bool>;
}

impl<F> GestureDetector for F
where
    F: FnMut(&RgbaImage) -> BTreeMap<String, bool> + Send + 'static,
{
    fn detect(&mut self, still: &RgbaImage) -> BTreeMap<String, bool> {
        self(still)
    }
}

/// Replays a fixed gesture timeline keyed by how many stills have been seen.
#[derive(Debug, Clone)]
pub struct ScriptedDetector {
    steps: Vec<ScriptStep>,
    labels: Vec<String>,
    seen: u64,
}

impl ScriptedDetector {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        let mut labels: Vec<String> = steps
            .iter()
            .flat_map(|step| step.gestures.iter().cloned())
            .collect();
        labels.sort();
        labels.dedup();
        Self {
            steps,
            labels,
            seen: 0,
        }
    }

    fn current(&self) -> Option<&ScriptStep> {
        self.steps.iter().rev().find(|step| step.still <= self.seen)
    }
}

impl GestureDetector for ScriptedDetector {
    fn detect(&mut self, _still: &RgbaImage) -> BTreeMap<String, bool> {
        let mut gestures: BTreeMap<String, bool> =
            self.labels.iter().map(|label| (label.clone(), false)).collect();
        if let Some(step) = self.current() {
            for label in &step.gestures {
                gestures.insert(label.clone(), true);
            }
        }
        self.seen += 1;
        gestures
    }
}

/// Runs a [`GestureDetector`] on a dedicated thread.
pub struct GestureWorker {
    stills: Option<Sender<EncodedStill>>,
    events: Receiver<GestureEvent>,
    join_handle: Option<JoinHandle<()>>,
}

impl GestureWorker {
    pub fn spawn<D: GestureDetector>(
        detector: D,
        table: GestureTable,
        queue_depth: usize,
    ) -> Result<Self, TransportError> {
        let (still_tx, still_rx) = bounded(queue_depth.max(1));
        let (event_tx, event_rx) = unbounded();
        let handle = thread::Builder::new()
            .name("glitch-gestures".into())
            .spawn(move || run_detector(detector, table, still_rx, event_tx))?;

        Ok(Self {
            stills: Some(still_tx),
            events: event_rx,
            join_handle: Some(handle),
        })
    }
}

fn run_detector<D: GestureDetector>(
    mut detector: D,
    table: GestureTable,
    stills: Receiver<EncodedStill>,
    events: Sender<GestureEvent>,
) {
    for still in stills {
        let image = match still.decode_rgba() {
            Ok(image) => image,
            Err(err) => {
                warn!(error = %err, "gesture worker could not decode still");
                continue;
            }
        };
        let gestures = detector.detect(&image);
        let active_effects = table
            .triggered(gestures.iter())
            .into_iter()
            .map(|kind| kind.id().to_string())
            .collect();
        let event = GestureEvent {
            gestures,
            active_effects,
            timestamp: Some(chrono::Utc::now().timestamp_millis() as f64),
        };
        if events.send(event).is_err() {
            break;
        }
    }
    debug!("gesture worker stopped");
}

impl FrameTransport for GestureWorker {
    fn send_frame(&mut self, still: EncodedStill) -> Result<(), TransportError> {
        let sender = self.stills.as_ref().ok_or(TransportError::Closed)?;
        sender.try_send(still).map_err(|err| match err {
            TrySendError::Full(_) => TransportError::QueueFull,
            TrySendError::Disconnected(_) => TransportError::Closed,
        })
    }

    fn events(&self) -> Option<Receiver<GestureEvent>> {
        Some(self.events.clone())
    }

    fn close(&mut self) {
        self.stills.take();
        if let Some(handle) = self.join_handle.take() {
            if handle.join().is_err() {
                warn!("gesture worker panicked");
            }
        }
    }
}

impl Drop for GestureWorker {
    fn drop(&mut self) {
        self.close();
    }
}

/// Writes one [`FrameMessage`] JSON document per line.
pub struct JsonLinesTransport<W: Write> {
    writer: Option<W>,
    events: Option<Receiver<GestureEvent>>,
}

impl<W: Write> JsonLinesTransport<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Some(writer),
            events: None,
        }
    }

    /// Pairs the outbound log with an inbound event stream read elsewhere.
    pub fn with_events(mut self, events: Receiver<GestureEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn into_inner(mut self) -> Option<W> {
        self.writer.take()
    }
}

impl<W: Write> FrameTransport for JsonLinesTransport<W> {
    fn send_frame(&mut self, still: EncodedStill) -> Result<(), TransportError> {
        let writer = self.writer.as_mut().ok_or(TransportError::Closed)?;
        serde_json::to_writer(&mut *writer, &FrameMessage::from_still(&still))?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    fn events(&self) -> Option<Receiver<GestureEvent>> {
        self.events.clone()
    }

    fn close(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(err) = writer.flush() {
                warn!(error = %err, "failed to flush frame log");
            }
        }
        self.events = None;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::capture::encode_still;
    use crate::effects::testing;
    use crate::types::CaptureOptions;
    use crate::wire::parse_inbound;

    fn still() -> EncodedStill {
        let pixels = testing::gradient(8, 8);
        let options = CaptureOptions {
            width: 8,
            ..CaptureOptions::default()
        };
        encode_still(&testing::frame(8, 8, &pixels), &options).unwrap()
    }

    fn step(still: u64, gestures: &[&str]) -> ScriptStep {
        ScriptStep {
            still,
            gestures: gestures.iter().map(|label| label.to_string()).collect(),
        }
    }

    #[test]
    fn scripted_detector_follows_the_timeline() {
        let mut detector = ScriptedDetector::new(vec![step(1, &["smile"]), step(3, &[])]);
        let image = RgbaImage::new(1, 1);

        let first = detector.detect(&image);
        assert_eq!(first.get("smile"), Some(&false));
        assert_eq!(detector.detect(&image).get("smile"), Some(&true));
        assert_eq!(detector.detect(&image).get("smile"), Some(&true));
        assert_eq!(detector.detect(&image).get("smile"), Some(&false));
    }

    #[test]
    fn worker_maps_detections_to_events() {
        let detector = |_: &RgbaImage| BTreeMap::from([("smile".to_string(), true)]);
        let mut worker = GestureWorker::spawn(detector, GestureTable::default(), 2).unwrap();
        let events = worker.events().unwrap();

        worker.send_frame(still()).unwrap();
        let event = events.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(event.gestures.get("smile"), Some(&true));
        assert_eq!(event.active_effects, vec!["liquify".to_string()]);

        worker.close();
        assert!(matches!(
            worker.send_frame(still()),
            Err(TransportError::Closed)
        ));
    }

    #[test]
    fn full_queue_drops_stills() {
        let (release_tx, release_rx) = bounded::<()>(0);
        let detector = move |_: &RgbaImage| -> BTreeMap<String, bool> {
            let _ = release_rx.recv();
            BTreeMap::new()
        };
        let mut worker = GestureWorker::spawn(detector, GestureTable::default(), 1).unwrap();

        let mut full = false;
        for _ in 0..4 {
            if matches!(worker.send_frame(still()), Err(TransportError::QueueFull)) {
                full = true;
            }
        }
        assert!(full);
        drop(release_tx);
        worker.close();
    }

    #[test]
    fn json_lines_transport_writes_frame_messages() {
        let mut transport = JsonLinesTransport::new(Vec::new());
        transport.send_frame(still()).unwrap();
        transport.send_frame(still()).unwrap();
        assert!(transport.events().is_none());

        let written = transport.into_inner().unwrap();
        let text = String::from_utf8(written).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let message: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(message["type"], "frame");
        assert!(message["data"]
            .as_str()
            .unwrap()
            .starts_with("data:image/jpeg;base64,"));
        assert_eq!(parse_inbound(lines[0]).unwrap(), None);
    }

    #[test]
    fn closed_json_transport_rejects_frames() {
        let mut transport = JsonLinesTransport::new(Vec::new());
        transport.close();
        assert!(matches!(
            transport.send_frame(still()),
            Err(TransportError::Closed)
        ));
    }
}
