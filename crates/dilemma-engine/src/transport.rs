//! Transport adapters: push a pull-based [`EventStream`] into a consumer

use std::io::Write;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::{self, JoinHandle};

use crate::error::TransportError;
use crate::events::{Event, EventStream};
use crate::session::Session;

/// Consumer of events
pub trait Sink {
    fn send(&mut self, event: &Event) -> Result<(), TransportError>;
}

/// One JSON document per line
pub struct JsonLines<W: Write>(pub W);

impl<W: Write> Sink for JsonLines<W> {
    fn send(&mut self, event: &Event) -> Result<(), TransportError> {
        let line = serde_json::to_string(event)?;
        writeln!(self.0, "{}", line)?;
        self.0.flush()?;
        Ok(())
    }
}

/// Server-sent event frames: `event: <name>` plus the JSON payload as `data:`
pub struct ServerSentEvents<W: Write>(pub W);

impl<W: Write> Sink for ServerSentEvents<W> {
    fn send(&mut self, event: &Event) -> Result<(), TransportError> {
        let data = event.data_json()?;
        write!(self.0, "event: {}\ndata: {}\n\n", event.name(), data)?;
        self.0.flush()?;
        Ok(())
    }
}

/// Bounded channel: blocks the producer while the buffer is full
impl Sink for SyncSender<Event> {
    fn send(&mut self, event: &Event) -> Result<(), TransportError> {
        SyncSender::send(self, event.clone()).map_err(|_| TransportError::Disconnected)
    }
}

/// Drain `stream` into `sink`. Returns the name of the terminal event.
///
/// If the sink fails, the stream is aborted and its `error` event is offered
/// to the sink once before the failure is returned.
pub fn pump<S: Sink + ?Sized>(
    mut stream: EventStream,
    sink: &mut S,
) -> Result<&'static str, TransportError> {
    let mut last = "";
    while let Some(event) = stream.next() {
        if let Err(err) = sink.send(&event) {
            let failure = stream.abort(err.to_string());
            if sink.send(&failure).is_err() {
                log::debug!("Could not deliver error event: {}", err);
            }
            return Err(err);
        }
        last = event.name();
    }
    Ok(last)
}

/// Run a session on a worker thread feeding a bounded channel of `capacity`
/// events. Dropping the receiver ends the worker at the next event.
pub fn spawn_channel(
    session: Session,
    capacity: usize,
) -> (Receiver<Event>, JoinHandle<Result<&'static str, TransportError>>) {
    let (mut sender, receiver) = mpsc::sync_channel::<Event>(capacity);
    let worker = thread::spawn(move || pump(session.into_stream(), &mut sender));
    (receiver, worker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::strategy::StrategyConfig;
    use std::io;

    fn session(rounds: u32, runs: u32, batch_size: usize) -> Session {
        let config = SimulationConfig::new(
            rounds,
            runs,
            [StrategyConfig::always_cooperate(), StrategyConfig::always_defect()],
        )
        .unwrap()
        .with_batch_size(batch_size)
        .unwrap();
        Session::with_seed(config, 1)
    }

    /// Accepts `limit` writes, then fails
    struct Flaky {
        limit: usize,
        sent: Vec<String>,
    }

    impl Sink for Flaky {
        fn send(&mut self, event: &Event) -> Result<(), TransportError> {
            if self.sent.len() >= self.limit {
                let closed = io::Error::new(io::ErrorKind::BrokenPipe, "closed");
                return Err(TransportError::Io(closed));
            }
            self.sent.push(event.name().to_string());
            Ok(())
        }
    }

    /// Writer whose reader has gone away
    struct ClosedPipe;

    impl io::Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_json_lines_write_failure_is_io() {
        let result = pump(session(3, 1, 1).into_stream(), &mut JsonLines(ClosedPipe));
        match result {
            Err(TransportError::Io(err)) => assert_eq!(err.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("expected io error, got {:?}", other),
        }
    }

    #[test]
    fn test_json_lines() {
        let mut sink = JsonLines(Vec::new());
        let last = pump(session(4, 1, 2).into_stream(), &mut sink).unwrap();
        assert_eq!(last, "summary");

        let text = String::from_utf8(sink.0).unwrap();
        let lines: Vec<serde_json::Value> =
            text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0]["event"], "round_batch");
        assert_eq!(lines[2]["event"], "run_complete");
        assert_eq!(lines[3]["data"]["total_payoff"]["player2"], 20.0);
    }

    #[test]
    fn test_server_sent_events() {
        let mut sink = ServerSentEvents(Vec::new());
        pump(session(1, 1, 1).into_stream(), &mut sink).unwrap();

        let text = String::from_utf8(sink.0).unwrap();
        let frames: Vec<&str> = text.split("\n\n").filter(|f| !f.is_empty()).collect();
        assert_eq!(frames.len(), 3);
        assert!(frames[0].starts_with("event: round_batch\ndata: {"));
        assert!(frames[1].starts_with("event: run_complete\ndata: {\"run\":1"));
        assert!(frames[2].starts_with("event: summary\ndata: "));
    }

    #[test]
    fn test_sink_failure_aborts() {
        let mut sink = Flaky { limit: 2, sent: Vec::new() };
        let result = pump(session(10, 2, 2).into_stream(), &mut sink);

        assert!(matches!(result, Err(TransportError::Io(_))));
        assert_eq!(sink.sent, vec!["round_batch", "round_batch"]);
    }

    #[test]
    fn test_channel_delivers_in_order() {
        let (receiver, worker) = spawn_channel(session(5, 3, 2), 1);
        let names: Vec<_> = receiver.iter().map(|e| e.name()).collect();

        assert_eq!(names.iter().filter(|n| **n == "run_complete").count(), 3);
        assert_eq!(names.last(), Some(&"summary"));
        assert_eq!(worker.join().unwrap().unwrap(), "summary");
    }

    #[test]
    fn test_channel_disconnect_stops_worker() {
        let (receiver, worker) = spawn_channel(session(1000, 10, 1), 1);
        let first = receiver.recv().unwrap();
        assert_eq!(first.name(), "round_batch");
        drop(receiver);

        assert!(matches!(worker.join().unwrap(), Err(TransportError::Disconnected)));
    }
}
