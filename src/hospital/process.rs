//! Per-patient state machine
//!
//! A [`PatientProcess`] is resumed by the scheduler every time one of its
//! suspension points completes: a service timeout elapses, or a queued
//! resource request is granted. Each resumption runs until the next
//! suspension point.
//!
//! The theatre slot is held from the start of the operation until a recovery
//! bed has been granted. If every bed is taken when the operation ends, the
//! patient is blocked and keeps the theatre occupied while it waits.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace};

use super::patient::{BlockingEpisode, Patient};
use super::system::{Resources, Wakeup};
use crate::engine::{RequestOutcome, Scheduler, Ticket};
use crate::simulation::{SimulationError, SimulationResult};
use crate::types::PoolKind;

/// Where a patient is in the flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatientState {
    /// Created, not yet started
    Arrived,
    /// Queued for a preparation room
    AwaitingPrep,
    /// Holding a preparation room
    InPrep,
    /// Queued for a theatre
    AwaitingTheatre,
    /// Holding a theatre, operation under way
    InOperation,
    /// Operation finished, queued for a recovery bed while still holding the theatre
    AwaitingRecovery {
        /// The recovery pool was full when the operation ended
        blocked: bool,
    },
    /// Holding a recovery bed
    InRecovery,
    /// Left the unit
    Departed,
}

impl fmt::Display for PatientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatientState::Arrived => write!(f, "arrived"),
            PatientState::AwaitingPrep => write!(f, "awaiting-prep"),
            PatientState::InPrep => write!(f, "in-prep"),
            PatientState::AwaitingTheatre => write!(f, "awaiting-theatre"),
            PatientState::InOperation => write!(f, "in-operation"),
            PatientState::AwaitingRecovery { blocked: true } => write!(f, "blocked"),
            PatientState::AwaitingRecovery { blocked: false } => write!(f, "awaiting-recovery"),
            PatientState::InRecovery => write!(f, "in-recovery"),
            PatientState::Departed => write!(f, "departed"),
        }
    }
}

/// Running totals of theatre blocking across one replication
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockingLedger {
    /// Operations that ended with every recovery bed busy
    pub events: u64,
    /// Sum of all completed blocking intervals, in minutes
    pub blocked_time: f64,
    /// Every completed blocking interval, in grant order
    pub episodes: Vec<BlockingEpisode>,
}

impl BlockingLedger {
    fn record(&mut self, episode: BlockingEpisode) {
        self.blocked_time += episode.duration();
        self.episodes.push(episode);
    }
}

/// State machine driving one patient through prep, operation and recovery
#[derive(Debug, Clone)]
pub struct PatientProcess {
    patient: Patient,
    state: PatientState,
    prep_ticket: Option<Ticket>,
    theatre_ticket: Option<Ticket>,
    recovery_ticket: Option<Ticket>,
}

impl PatientProcess {
    /// Wrap a newly arrived patient
    pub fn new(patient: Patient) -> Self {
        Self {
            patient,
            state: PatientState::Arrived,
            prep_ticket: None,
            theatre_ticket: None,
            recovery_ticket: None,
        }
    }

    /// Current state
    pub fn state(&self) -> PatientState {
        self.state
    }

    /// The patient record as filled in so far
    pub fn patient(&self) -> &Patient {
        &self.patient
    }

    /// Consume the process, returning the patient record
    pub fn into_patient(self) -> Patient {
        self.patient
    }

    /// Returns `true` once the patient has left the unit
    pub fn is_departed(&self) -> bool {
        self.state == PatientState::Departed
    }

    /// Run the process from its current suspension point to the next one
    pub fn resume(
        &mut self,
        resources: &mut Resources,
        scheduler: &mut Scheduler<Wakeup>,
        ledger: &mut BlockingLedger,
    ) -> SimulationResult<()> {
        let from = self.state;
        match self.state {
            PatientState::Arrived => self.request_prep(resources, scheduler)?,
            PatientState::AwaitingPrep => {
                self.expect_granted(resources, PoolKind::Preparation, self.prep_ticket)?;
                self.start_prep(scheduler)?;
            }
            PatientState::InPrep => self.finish_prep(resources, scheduler)?,
            PatientState::AwaitingTheatre => {
                self.expect_granted(resources, PoolKind::Theatre, self.theatre_ticket)?;
                self.start_operation(scheduler)?;
            }
            PatientState::InOperation => self.finish_operation(resources, scheduler, ledger)?,
            PatientState::AwaitingRecovery { .. } => {
                self.expect_granted(resources, PoolKind::Recovery, self.recovery_ticket)?;
                self.start_recovery(resources, scheduler, ledger)?;
            }
            PatientState::InRecovery => self.finish_recovery(resources, scheduler)?,
            PatientState::Departed => {
                return Err(SimulationError::process_error(format!(
                    "{} resumed after departure",
                    self.patient.id
                )));
            }
        }
        trace!(
            patient = %self.patient.id,
            time = scheduler.now().minutes(),
            from = %from,
            to = %self.state,
            "patient transition"
        );
        Ok(())
    }

    fn expect_granted(
        &self,
        resources: &Resources,
        kind: PoolKind,
        ticket: Option<Ticket>,
    ) -> SimulationResult<()> {
        match ticket {
            Some(ticket) if resources.pool(kind).is_holding(ticket) => Ok(()),
            _ => Err(SimulationError::process_error(format!(
                "{} resumed in state {} without holding a {} slot",
                self.patient.id, self.state, kind
            ))),
        }
    }

    fn wake_after(&self, delay: f64, scheduler: &mut Scheduler<Wakeup>) -> SimulationResult<()> {
        scheduler.schedule_after(delay, Wakeup::Patient(self.patient.id))?;
        Ok(())
    }

    fn request_prep(
        &mut self,
        resources: &mut Resources,
        scheduler: &mut Scheduler<Wakeup>,
    ) -> SimulationResult<()> {
        let outcome = resources.request(PoolKind::Preparation, self.patient.id);
        self.prep_ticket = Some(outcome.ticket());
        match outcome {
            RequestOutcome::Granted(_) => self.start_prep(scheduler),
            RequestOutcome::Queued(_) => {
                self.state = PatientState::AwaitingPrep;
                Ok(())
            }
        }
    }

    fn start_prep(&mut self, scheduler: &mut Scheduler<Wakeup>) -> SimulationResult<()> {
        self.patient.prep_start = Some(scheduler.now());
        self.state = PatientState::InPrep;
        self.wake_after(self.patient.service.prep, scheduler)
    }

    fn finish_prep(
        &mut self,
        resources: &mut Resources,
        scheduler: &mut Scheduler<Wakeup>,
    ) -> SimulationResult<()> {
        self.patient.prep_end = Some(scheduler.now());
        let ticket = self.take_ticket(PoolKind::Preparation)?;
        resources.release(PoolKind::Preparation, ticket, scheduler)?;

        let outcome = resources.request(PoolKind::Theatre, self.patient.id);
        self.theatre_ticket = Some(outcome.ticket());
        match outcome {
            RequestOutcome::Granted(_) => self.start_operation(scheduler),
            RequestOutcome::Queued(_) => {
                self.state = PatientState::AwaitingTheatre;
                Ok(())
            }
        }
    }

    fn start_operation(&mut self, scheduler: &mut Scheduler<Wakeup>) -> SimulationResult<()> {
        self.patient.operation_start = Some(scheduler.now());
        self.state = PatientState::InOperation;
        self.wake_after(self.patient.service.operation, scheduler)
    }

    fn finish_operation(
        &mut self,
        resources: &mut Resources,
        scheduler: &mut Scheduler<Wakeup>,
        ledger: &mut BlockingLedger,
    ) -> SimulationResult<()> {
        let now = scheduler.now();
        self.patient.operation_end = Some(now);

        // The full check and the request happen in the same step, so no
        // release can slip in between them.
        let recovery = resources.pool(PoolKind::Recovery);
        let busy = recovery.count();
        let full = recovery.is_full();
        self.patient.recovery_busy_at_operation_end = Some(busy);

        let outcome = resources.request(PoolKind::Recovery, self.patient.id);
        self.recovery_ticket = Some(outcome.ticket());

        if full {
            self.patient.was_blocked = true;
            self.patient.blocking_start = Some(now);
            ledger.events += 1;
            debug!(patient = %self.patient.id, time = now.minutes(), busy, "theatre blocked");
        }

        match outcome {
            RequestOutcome::Granted(_) => self.start_recovery(resources, scheduler, ledger),
            RequestOutcome::Queued(_) => {
                self.state = PatientState::AwaitingRecovery { blocked: full };
                Ok(())
            }
        }
    }

    fn start_recovery(
        &mut self,
        resources: &mut Resources,
        scheduler: &mut Scheduler<Wakeup>,
        ledger: &mut BlockingLedger,
    ) -> SimulationResult<()> {
        let now = scheduler.now();

        if self.patient.was_blocked {
            let start = self.patient.blocking_start.ok_or_else(|| {
                SimulationError::process_error(format!(
                    "{} marked blocked without a blocking start",
                    self.patient.id
                ))
            })?;
            let episode = BlockingEpisode { patient_id: self.patient.id, start, end: now };
            self.patient.blocking_end = Some(now);
            self.patient.blocking_duration = Some(episode.duration());
            debug!(
                patient = %self.patient.id,
                time = now.minutes(),
                duration = episode.duration(),
                "theatre unblocked"
            );
            ledger.record(episode);
        }

        self.patient.recovery_start = Some(now);
        let theatre = self.take_ticket(PoolKind::Theatre)?;
        resources.release(PoolKind::Theatre, theatre, scheduler)?;

        self.state = PatientState::InRecovery;
        self.wake_after(self.patient.service.recovery, scheduler)
    }

    fn finish_recovery(
        &mut self,
        resources: &mut Resources,
        scheduler: &mut Scheduler<Wakeup>,
    ) -> SimulationResult<()> {
        let now = scheduler.now();
        self.patient.recovery_end = Some(now);
        let ticket = self.take_ticket(PoolKind::Recovery)?;
        resources.release(PoolKind::Recovery, ticket, scheduler)?;

        self.patient.departure_time = Some(now);
        self.state = PatientState::Departed;
        Ok(())
    }

    fn take_ticket(&mut self, kind: PoolKind) -> SimulationResult<Ticket> {
        let slot = match kind {
            PoolKind::Preparation => &mut self.prep_ticket,
            PoolKind::Theatre => &mut self.theatre_ticket,
            PoolKind::Recovery => &mut self.recovery_ticket,
        };
        slot.take().ok_or_else(|| {
            SimulationError::process_error(format!(
                "{} has no {} ticket to release",
                self.patient.id, kind
            ))
        })
    }
}
