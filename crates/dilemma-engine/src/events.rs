//! Event stream: batches round records and emits run and summary events
//!
//! Per run the stream yields zero or more `round_batch` events followed by
//! exactly one `run_complete`. After the last run comes `summary`. A stream
//! always ends with one terminal event (`summary`, `stopped` or `error`),
//! then yields `None`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::game::{RoundRecord, RunSummary, Simulation, Step, Summary};

/// A group of consecutive rounds from one run
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoundBatch {
    pub run: u32,
    /// 1-based within the run
    pub batch: u32,
    /// Rounds played across the whole simulation so far
    pub completed_rounds: u64,
    pub total_rounds: u64,
    pub rounds: Vec<RoundRecord>,
}

/// Terminal failure, carrying whatever totals had accumulated
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Failure {
    pub message: String,
    pub partial: Summary,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum Event {
    RoundBatch(RoundBatch),
    RunComplete(RunSummary),
    Summary(Summary),
    Stopped(Summary),
    Error(Failure),
}

impl Event {
    /// Event name on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Event::RoundBatch(_) => "round_batch",
            Event::RunComplete(_) => "run_complete",
            Event::Summary(_) => "summary",
            Event::Stopped(_) => "stopped",
            Event::Error(_) => "error",
        }
    }

    /// Payload without the event tag
    pub fn data_json(&self) -> serde_json::Result<String> {
        match self {
            Event::RoundBatch(batch) => serde_json::to_string(batch),
            Event::RunComplete(summary) => serde_json::to_string(summary),
            Event::Summary(summary) | Event::Stopped(summary) => serde_json::to_string(summary),
            Event::Error(failure) => serde_json::to_string(failure),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::Summary(_) | Event::Stopped(_) | Event::Error(_))
    }
}

/// Cooperative cancellation flag, shared between a session and its stream
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Lazy producer of [`Event`]s. Each call to `next` advances the
/// simulation only as far as the next event.
pub struct EventStream {
    simulation: Simulation,
    stop: StopHandle,
    batch_size: usize,
    pending: Vec<RoundRecord>,
    batches_this_run: u32,
    queue: VecDeque<Event>,
    finished: bool,
}

impl EventStream {
    pub fn new(simulation: Simulation, stop: StopHandle) -> Self {
        let batch_size = simulation.config().batch_size();
        let pending = Vec::with_capacity(buffer_capacity(&simulation, batch_size));
        Self {
            simulation,
            stop,
            batch_size,
            pending,
            batches_this_run: 0,
            queue: VecDeque::new(),
            finished: false,
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// True once the terminal event has been handed out
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Replace everything not yet emitted with a terminal `error` event.
    /// Returns that event so a transport can try to deliver it directly.
    pub fn abort(&mut self, message: impl Into<String>) -> Event {
        let message = message.into();
        log::warn!("Simulation aborted: {}", message);
        self.pending.clear();
        self.queue.clear();
        let event = Event::Error(Failure {
            message,
            partial: self.simulation.halt(),
        });
        self.finished = true;
        event
    }

    fn flush(&mut self) {
        let Some(run) = self.pending.first().map(|r| r.run) else {
            return;
        };
        self.batches_this_run += 1;
        let capacity = buffer_capacity(&self.simulation, self.batch_size);
        let rounds = std::mem::replace(&mut self.pending, Vec::with_capacity(capacity));
        log::trace!(
            "Run {}: batch {} with {} rounds",
            run,
            self.batches_this_run,
            rounds.len()
        );
        self.queue.push_back(Event::RoundBatch(RoundBatch {
            run,
            batch: self.batches_this_run,
            completed_rounds: self.simulation.rounds_played(),
            total_rounds: self.simulation.config().total_rounds(),
            rounds,
        }));
    }

    /// Advance the simulation until at least one event is queued
    fn produce(&mut self) {
        while self.queue.is_empty() {
            if self.stop.is_stopped() {
                self.flush();
                let summary = self.simulation.halt();
                log::info!(
                    "Simulation stopped after {} of {} rounds",
                    summary.rounds_played,
                    self.simulation.config().total_rounds()
                );
                self.queue.push_back(Event::Stopped(summary));
                return;
            }
            match self.simulation.step() {
                Some(Step::Round(record)) => {
                    self.pending.push(record);
                    if self.pending.len() >= self.batch_size {
                        self.flush();
                    }
                }
                Some(Step::RunComplete(summary)) => {
                    self.flush();
                    self.batches_this_run = 0;
                    self.queue.push_back(Event::RunComplete(summary));
                }
                Some(Step::Summary(summary)) => {
                    self.queue.push_back(Event::Summary(summary));
                }
                None => return,
            }
        }
    }
}

/// A batch never holds more than one run's rounds
fn buffer_capacity(simulation: &Simulation, batch_size: usize) -> usize {
    let rounds = usize::try_from(simulation.config().rounds()).unwrap_or(usize::MAX);
    batch_size.min(rounds)
}

impl Iterator for EventStream {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        if self.finished {
            return None;
        }
        self.produce();
        let event = self.queue.pop_front()?;
        if event.is_terminal() {
            self.finished = true;
            self.queue.clear();
        }
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::strategy::StrategyConfig;

    fn stream(rounds: u32, runs: u32, batch_size: usize) -> EventStream {
        let config = SimulationConfig::new(
            rounds,
            runs,
            [StrategyConfig::tit_for_tat(), StrategyConfig::random()],
        )
        .unwrap()
        .with_batch_size(batch_size)
        .unwrap();
        EventStream::new(Simulation::new(config, 42), StopHandle::new())
    }

    fn batch_sizes(events: &[Event], run: u32) -> Vec<usize> {
        events
            .iter()
            .filter_map(|e| match e {
                Event::RoundBatch(b) if b.run == run => Some(b.rounds.len()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_event_order() {
        let names: Vec<_> = stream(5, 2, 2).map(|e| e.name()).collect();
        assert_eq!(
            names,
            vec![
                "round_batch",
                "round_batch",
                "round_batch",
                "run_complete",
                "round_batch",
                "round_batch",
                "round_batch",
                "run_complete",
                "summary",
            ]
        );
    }

    #[test]
    fn test_partial_batch_flushed_at_run_end() {
        let events: Vec<_> = stream(7, 2, 3).collect();
        assert_eq!(batch_sizes(&events, 1), vec![3, 3, 1]);
        assert_eq!(batch_sizes(&events, 2), vec![3, 3, 1]);
    }

    #[test]
    fn test_exact_multiple_has_no_empty_batch() {
        let events: Vec<_> = stream(6, 1, 3).collect();
        assert_eq!(batch_sizes(&events, 1), vec![3, 3]);
    }

    #[test]
    fn test_batch_larger_than_run() {
        let events: Vec<_> = stream(4, 1, 100).collect();
        assert_eq!(batch_sizes(&events, 1), vec![4]);
    }

    #[test]
    fn test_unbounded_batch_size() {
        let events: Vec<_> = stream(3, 1, usize::MAX).collect();
        let names: Vec<_> = events.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["round_batch", "run_complete", "summary"]);
        assert_eq!(batch_sizes(&events, 1), vec![3]);
    }

    #[test]
    fn test_batch_progress_fields() {
        let events: Vec<_> = stream(4, 2, 3).collect();
        let batches: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                Event::RoundBatch(b) => Some((b.run, b.batch, b.completed_rounds, b.total_rounds)),
                _ => None,
            })
            .collect();
        assert_eq!(batches, vec![(1, 1, 3, 8), (1, 2, 4, 8), (2, 1, 7, 8), (2, 2, 8, 8)]);
    }

    #[test]
    fn test_stream_ends_after_summary() {
        let mut events = stream(3, 1, 10);
        let last = events.by_ref().last().unwrap();
        assert!(matches!(last, Event::Summary(_)));
        assert!(events.is_finished());
        assert!(events.next().is_none());
    }

    #[test]
    fn test_stop_before_first_event() {
        let mut events = stream(10, 2, 3);
        events.stop_handle().stop();

        let all: Vec<_> = events.collect();
        assert_eq!(all.len(), 1);
        match &all[0] {
            Event::Stopped(summary) => {
                assert_eq!(summary.rounds_played, 0);
                assert_eq!(summary.runs_completed, 0);
            }
            other => panic!("expected stopped, got {:?}", other),
        }
    }

    #[test]
    fn test_stop_keeps_buffered_batch() {
        let mut events = stream(10, 1, 4);
        events.next();
        events.produce_one_round();
        events.stop_handle().stop();

        let rest: Vec<_> = events.collect();
        let names: Vec<_> = rest.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["round_batch", "stopped"]);
        match &rest[0] {
            Event::RoundBatch(b) => {
                assert_eq!(b.rounds.len(), 1);
                assert_eq!(b.rounds[0].round, 5);
            }
            other => panic!("expected round_batch, got {:?}", other),
        }
    }

    #[test]
    fn test_abort_ends_with_error() {
        let mut events = stream(10, 1, 2);
        events.next();
        let event = events.abort("consumer went away");

        match &event {
            Event::Error(failure) => {
                assert_eq!(failure.message, "consumer went away");
                assert_eq!(failure.partial.rounds_played, 2);
            }
            other => panic!("expected error, got {:?}", other),
        }
        assert!(events.next().is_none());
    }

    #[test]
    fn test_wire_format() {
        let events: Vec<_> = stream(1, 1, 1).collect();
        let json = serde_json::to_value(&events[0]).unwrap();
        assert_eq!(json["event"], "round_batch");
        assert_eq!(json["data"]["rounds"][0]["actions"]["player1"], "C");
        assert_eq!(json["data"]["rounds"][0]["outcome_counts"].as_object().unwrap().len(), 4);

        let json = serde_json::to_value(events.last().unwrap()).unwrap();
        assert_eq!(json["event"], "summary");
        assert_eq!(json["data"]["payoffs"]["reward"], 3.0);
    }

    impl EventStream {
        /// Play one round into the pending buffer without emitting
        fn produce_one_round(&mut self) {
            if let Some(Step::Round(record)) = self.simulation.step() {
                self.pending.push(record);
            }
        }
    }
}
