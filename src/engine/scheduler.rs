//! Deterministic discrete-event scheduler
//!
//! Uses a `BinaryHeap` with reversed `Ord` on [`Event`] to act as a min-heap
//! keyed by `(due, seq)`. Sequence numbers are strictly increasing in
//! scheduling order, so events due at the same simulated instant are
//! dispatched FIFO and two runs with the same inputs dispatch identically.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;

use tracing::trace;

use super::clock::SimTime;
use crate::simulation::{SimulationError, SimulationResult};

/// Strictly increasing insertion sequence number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventSeq(u64);

impl EventSeq {
    /// Return the raw value
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EventSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E#{}", self.0)
    }
}

/// A pending resumption of some continuation.
///
/// `W` identifies which continuation to resume; the scheduler never looks
/// inside it.
#[derive(Debug, Clone)]
pub struct Event<W> {
    /// Simulated instant at which the continuation resumes
    pub due: SimTime,
    /// Insertion order, used to break ties at equal `due`
    pub seq: EventSeq,
    /// Continuation to resume
    pub target: W,
}

impl<W> PartialEq for Event<W> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl<W> Eq for Event<W> {}

/// Ordering: smallest `(due, seq)` first.
///
/// `BinaryHeap` is a max-heap, so the natural ordering is reversed here.
impl<W> Ord for Event<W> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.due.cmp(&self.due).then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<W> PartialOrd for Event<W> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A set of continuations the scheduler can resume.
///
/// `resume` runs the addressed continuation until it terminates or suspends
/// again (by scheduling a future wakeup or by queueing on a resource). Exactly
/// one continuation runs at any instant.
pub trait Process<W> {
    /// Resume the continuation identified by `target`
    fn resume(&mut self, target: W, scheduler: &mut Scheduler<W>) -> SimulationResult<()>;
}

/// Outcome of a [`Scheduler::run`] call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    /// Number of events dispatched during the call
    pub events_processed: u64,
    /// Clock value when the call returned
    pub final_time: SimTime,
}

/// Single-threaded cooperative scheduler driving the simulated clock
#[derive(Debug, Clone)]
pub struct Scheduler<W> {
    now: SimTime,
    queue: BinaryHeap<Event<W>>,
    next_seq: u64,
}

impl<W> Scheduler<W> {
    /// Create an empty scheduler at time zero
    pub fn new() -> Self {
        Self { now: SimTime::ZERO, queue: BinaryHeap::new(), next_seq: 0 }
    }

    /// Current simulated time
    #[inline]
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Number of pending events
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Returns `true` if no event is pending
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Due time of the earliest pending event
    pub fn peek_due(&self) -> Option<SimTime> {
        self.queue.peek().map(|event| event.due)
    }

    /// Enqueue `target` to resume `delay` minutes from now.
    ///
    /// A zero delay resumes the target at the current instant, after every
    /// event already scheduled for this instant.
    pub fn schedule_after(&mut self, delay: f64, target: W) -> SimulationResult<EventSeq> {
        if !(delay.is_finite() && delay >= 0.0) {
            return Err(SimulationError::scheduling_error(format!(
                "delay must be finite and non-negative, got {}",
                delay
            )));
        }
        Ok(self.push(self.now.plus(delay), target))
    }

    /// Enqueue `target` to resume at an absolute time no earlier than now
    pub fn schedule_at(&mut self, due: SimTime, target: W) -> SimulationResult<EventSeq> {
        if due < self.now {
            return Err(SimulationError::scheduling_error(format!(
                "cannot schedule at {} before current time {}",
                due, self.now
            )));
        }
        Ok(self.push(due, target))
    }

    fn push(&mut self, due: SimTime, target: W) -> EventSeq {
        let seq = EventSeq(self.next_seq);
        self.next_seq += 1;
        self.queue.push(Event { due, seq, target });
        seq
    }

    /// Pop the earliest event due strictly before `until`, advancing the clock
    pub fn pop_due(&mut self, until: SimTime) -> Option<Event<W>> {
        match self.queue.peek() {
            Some(event) if event.due < until => {
                let event = self.queue.pop()?;
                self.now = event.due;
                Some(event)
            }
            _ => None,
        }
    }

    /// Dispatch events in `(due, seq)` order until none is due before `until`.
    ///
    /// Events due exactly at `until` stay queued. The clock is left at
    /// `until` (or where it was, if already later). An error returned by a
    /// continuation aborts the run.
    pub fn run<P>(&mut self, until: SimTime, process: &mut P) -> SimulationResult<RunSummary>
    where
        P: Process<W>,
    {
        let mut events_processed = 0;

        while let Some(event) = self.pop_due(until) {
            trace!(seq = event.seq.raw(), due = event.due.minutes(), "dispatching event");
            process.resume(event.target, self)?;
            events_processed += 1;
        }

        if self.now < until {
            self.now = until;
        }

        Ok(RunSummary { events_processed, final_time: self.now })
    }
}

impl<W> Default for Scheduler<W> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records the order in which targets are resumed.
    #[derive(Default)]
    struct Recorder {
        log: Vec<(f64, &'static str)>,
    }

    impl Process<&'static str> for Recorder {
        fn resume(
            &mut self,
            target: &'static str,
            scheduler: &mut Scheduler<&'static str>,
        ) -> SimulationResult<()> {
            self.log.push((scheduler.now().minutes(), target));
            if target == "spawn" {
                scheduler.schedule_after(0.0, "spawned")?;
                scheduler.schedule_after(1.0, "later")?;
            }
            Ok(())
        }
    }

    fn at(minutes: f64) -> SimTime {
        SimTime::new(minutes).unwrap()
    }

    #[test]
    fn test_fifo_at_same_time() {
        let mut sched = Scheduler::new();
        sched.schedule_after(10.0, "first").unwrap();
        sched.schedule_after(10.0, "second").unwrap();
        sched.schedule_after(10.0, "third").unwrap();

        let mut recorder = Recorder::default();
        sched.run(at(100.0), &mut recorder).unwrap();

        let order: Vec<_> = recorder.log.iter().map(|(_, name)| *name).collect();
        assert_eq!(order, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_time_ordering() {
        let mut sched = Scheduler::new();
        sched.schedule_after(30.0, "late").unwrap();
        sched.schedule_after(10.0, "early").unwrap();
        sched.schedule_after(20.0, "mid").unwrap();

        let mut recorder = Recorder::default();
        sched.run(at(100.0), &mut recorder).unwrap();

        assert_eq!(recorder.log, vec![(10.0, "early"), (20.0, "mid"), (30.0, "late")]);
    }

    #[test]
    fn test_zero_delay_runs_after_existing_same_instant_events() {
        let mut sched = Scheduler::new();
        sched.schedule_after(5.0, "spawn").unwrap();
        sched.schedule_after(5.0, "sibling").unwrap();

        let mut recorder = Recorder::default();
        sched.run(at(100.0), &mut recorder).unwrap();

        assert_eq!(
            recorder.log,
            vec![(5.0, "spawn"), (5.0, "sibling"), (5.0, "spawned"), (6.0, "later")]
        );
    }

    #[test]
    fn test_run_stops_before_horizon() {
        let mut sched = Scheduler::new();
        sched.schedule_after(10.0, "inside").unwrap();
        sched.schedule_after(50.0, "at_horizon").unwrap();
        sched.schedule_after(70.0, "beyond").unwrap();

        let mut recorder = Recorder::default();
        let summary = sched.run(at(50.0), &mut recorder).unwrap();

        assert_eq!(recorder.log, vec![(10.0, "inside")]);
        assert_eq!(summary.events_processed, 1);
        assert_eq!(summary.final_time, at(50.0));
        assert_eq!(sched.pending(), 2);
    }

    #[test]
    fn test_clock_is_monotonic() {
        let mut sched = Scheduler::new();
        for delay in [7.0, 3.0, 3.0, 9.5, 0.0, 1.0] {
            sched.schedule_after(delay, "tick").unwrap();
        }

        let mut recorder = Recorder::default();
        sched.run(at(20.0), &mut recorder).unwrap();

        for window in recorder.log.windows(2) {
            assert!(window[0].0 <= window[1].0);
        }
    }

    #[test]
    fn test_rejects_invalid_delays() {
        let mut sched: Scheduler<&'static str> = Scheduler::new();
        assert!(sched.schedule_after(-1.0, "bad").is_err());
        assert!(sched.schedule_after(f64::INFINITY, "bad").is_err());
        assert!(sched.schedule_after(f64::NAN, "bad").is_err());
        assert!(sched.is_empty());
    }

    #[test]
    fn test_rejects_scheduling_in_the_past() {
        let mut sched = Scheduler::new();
        sched.schedule_after(10.0, "tick").unwrap();
        let mut recorder = Recorder::default();
        sched.run(at(20.0), &mut recorder).unwrap();

        assert!(sched.schedule_at(at(5.0), "past").is_err());
        assert!(sched.schedule_at(at(20.0), "now").is_ok());
    }

    #[test]
    fn test_determinism_across_runs() {
        fn build_run() -> Vec<(f64, &'static str)> {
            let mut sched = Scheduler::new();
            sched.schedule_after(5.0, "a").unwrap();
            sched.schedule_after(3.0, "b").unwrap();
            sched.schedule_after(5.0, "c").unwrap();
            sched.schedule_after(1.0, "d").unwrap();
            sched.schedule_after(3.0, "e").unwrap();
            let mut recorder = Recorder::default();
            sched.run(SimTime::new(10.0).unwrap(), &mut recorder).unwrap();
            recorder.log
        }

        assert_eq!(build_run(), build_run());
    }
}
