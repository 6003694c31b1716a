use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{Context, Result};
use glitchconfig::ScriptStep;
use renderer::crossbeam_channel::{unbounded, Receiver, Sender};
use renderer::{
    parse_inbound, EncodedStill, FrameTransport, GestureEvent, GestureWorker, JsonLinesTransport,
    ScriptedDetector, TransportError, TransportFactory,
};
use selector::GestureTable;

const GESTURE_QUEUE_DEPTH: usize = 2;

/// Opens the gesture transport chosen on the command line, once per render session.
pub struct SessionTransports {
    log: Option<PathBuf>,
    script: Option<(Vec<ScriptStep>, GestureTable)>,
    feed: Option<Receiver<GestureEvent>>,
}

impl SessionTransports {
    /// `None` when nothing would consume stills or produce events.
    pub fn new(
        log: Option<PathBuf>,
        script: Option<(Vec<ScriptStep>, GestureTable)>,
        feed: Option<Receiver<GestureEvent>>,
    ) -> Result<Option<Self>> {
        if log.is_none() && script.is_none() && feed.is_none() {
            return Ok(None);
        }
        if let Some(path) = log.as_ref() {
            // Truncate once; every session appends.
            File::create(path)
                .with_context(|| format!("failed to create transport log {}", path.display()))?;
        }
        Ok(Some(Self { log, script, feed }))
    }

    fn open_log(&self) -> Result<Option<Box<dyn Write>>, TransportError> {
        match self.log.as_ref() {
            Some(path) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                let writer: Box<dyn Write> = Box::new(BufWriter::new(file));
                Ok(Some(writer))
            }
            None => Ok(None),
        }
    }
}

impl TransportFactory for SessionTransports {
    fn open(&mut self) -> Result<Box<dyn FrameTransport>, TransportError> {
        let log = self.open_log()?;

        if let Some((steps, table)) = self.script.as_ref() {
            let detector = ScriptedDetector::new(steps.clone());
            let worker = GestureWorker::spawn(detector, table.clone(), GESTURE_QUEUE_DEPTH)?;
            let transport: Box<dyn FrameTransport> = match log {
                Some(writer) => Box::new(TeeTransport::new(
                    Box::new(worker),
                    Box::new(JsonLinesTransport::new(writer)),
                )),
                None => Box::new(worker),
            };
            return Ok(transport);
        }

        let writer = log.unwrap_or_else(|| Box::new(io::sink()));
        let mut transport = JsonLinesTransport::new(writer);
        if let Some(feed) = self.feed.as_ref() {
            transport = transport.with_events(feed.clone());
        }
        Ok(Box::new(transport))
    }
}

/// Starts a thread that turns `gesture_event` lines from `path` (or stdin for `-`) into events.
/// The stream disconnects when the input ends.
pub fn spawn_feed(path: &Path) -> Result<Receiver<GestureEvent>> {
    let reader: Box<dyn BufRead + Send> = if path == Path::new("-") {
        Box::new(BufReader::new(io::stdin()))
    } else {
        let file = File::open(path)
            .with_context(|| format!("failed to open gesture feed {}", path.display()))?;
        Box::new(BufReader::new(file))
    };
    let (sender, receiver) = unbounded();
    thread::Builder::new()
        .name("glitch-feed".into())
        .spawn(move || {
            let forwarded = forward_feed(reader, &sender);
            tracing::debug!(forwarded, "gesture feed ended");
        })
        .context("failed to start gesture feed reader")?;
    Ok(receiver)
}

/// Forwards every gesture event in `reader`; other message types and malformed lines are
/// skipped. Returns how many events were sent.
fn forward_feed<R: BufRead>(reader: R, sender: &Sender<GestureEvent>) -> usize {
    let mut forwarded = 0;
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!(error = %err, "gesture feed read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse_inbound(&line) {
            Ok(Some(event)) => {
                if sender.send(event).is_err() {
                    break;
                }
                forwarded += 1;
            }
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "skipping malformed gesture feed line"),
        }
    }
    forwarded
}

/// Sends each still to a primary transport and mirrors it into a log transport.
pub struct TeeTransport {
    primary: Box<dyn FrameTransport>,
    mirror: Box<dyn FrameTransport>,
}

impl TeeTransport {
    pub fn new(primary: Box<dyn FrameTransport>, mirror: Box<dyn FrameTransport>) -> Self {
        Self { primary, mirror }
    }
}

impl FrameTransport for TeeTransport {
    fn send_frame(&mut self, still: EncodedStill) -> Result<(), TransportError> {
        if let Err(err) = self.mirror.send_frame(still.clone()) {
            tracing::warn!(error = %err, "failed to mirror still");
        }
        self.primary.send_frame(still)
    }

    fn events(&self) -> Option<Receiver<GestureEvent>> {
        self.primary.events()
    }

    fn close(&mut self) {
        self.primary.close();
        self.mirror.close();
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn feed_forwards_only_gesture_events() {
        let input = concat!(
            r#"{"type":"frame","data":"data:image/jpeg;base64,","timestamp":1}"#,
            "\n",
            "\n",
            "not json\n",
            r#"{"type":"gesture_event","gestures":{"smile":true,"blink":false}}"#,
            "\n",
        );
        let (sender, receiver) = unbounded();

        assert_eq!(forward_feed(Cursor::new(input), &sender), 1);
        let event = receiver.try_recv().unwrap();
        assert_eq!(event.gestures.get("smile"), Some(&true));
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn every_session_gets_a_working_log_transport() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("stills.jsonl");
        std::fs::write(&log, "stale\n").unwrap();
        let mut transports = SessionTransports::new(Some(log.clone()), None, None)
            .unwrap()
            .unwrap();

        let still = EncodedStill {
            width: 1,
            height: 1,
            jpeg: vec![0xFF, 0xD8, 0xFF],
        };
        for _ in 0..2 {
            let mut transport = transports.open().unwrap();
            transport.send_frame(still.clone()).unwrap();
            transport.close();
        }

        let contents = std::fs::read_to_string(&log).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(!contents.contains("stale"));
    }

    #[test]
    fn feed_events_ride_on_the_log_transport() {
        let (sender, receiver) = unbounded();
        let mut transports = SessionTransports::new(None, None, Some(receiver))
            .unwrap()
            .unwrap();
        let transport = transports.open().unwrap();
        sender.send(GestureEvent::default()).unwrap();
        assert!(transport.events().unwrap().try_recv().is_ok());
    }

    #[test]
    fn nothing_configured_means_no_transport() {
        assert!(SessionTransports::new(None, None, None).unwrap().is_none());
    }
}
