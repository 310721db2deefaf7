//! The surgical unit
//!
//! [`HospitalSystem`] owns the three pools, every live patient process, the
//! arrival stream and the monitor, and dispatches scheduler wakeups to them.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::{debug, trace};

use super::arrivals::ArrivalGenerator;
use super::monitor::{Monitor, MonitorLog};
use super::patient::{Patient, ServiceTimes};
use super::process::{BlockingLedger, PatientProcess};
use crate::engine::{PoolSnapshot, Process, RequestOutcome, ResourcePool, Scheduler, SimTime, Ticket};
use crate::simulation::{SimulationError, SimulationResult};
use crate::types::{PatientId, PatientIdGen, PoolKind, SimulationConfig};

/// Continuations the unit's scheduler can resume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wakeup {
    /// The next patient arrives
    Arrival,
    /// The monitor takes a sample
    Monitor,
    /// A patient's process continues
    Patient(PatientId),
}

/// The unit's three pools, plus the owners of queued tickets so a released
/// slot can wake whoever it was handed to
#[derive(Debug, Clone)]
pub struct Resources {
    prep: ResourcePool,
    theatre: ResourcePool,
    recovery: ResourcePool,
    waiting_owners: HashMap<(PoolKind, Ticket), PatientId>,
}

impl Resources {
    /// Create the pools with the configured capacities
    pub fn new(config: &SimulationConfig) -> SimulationResult<Self> {
        Ok(Self {
            prep: ResourcePool::new(PoolKind::Preparation, config.num_prep_rooms)?,
            theatre: ResourcePool::new(PoolKind::Theatre, config.num_operating_theatres)?,
            recovery: ResourcePool::new(PoolKind::Recovery, config.num_recovery_rooms)?,
            waiting_owners: HashMap::new(),
        })
    }

    /// Read access to one pool
    pub fn pool(&self, kind: PoolKind) -> &ResourcePool {
        match kind {
            PoolKind::Preparation => &self.prep,
            PoolKind::Theatre => &self.theatre,
            PoolKind::Recovery => &self.recovery,
        }
    }

    fn pool_mut(&mut self, kind: PoolKind) -> &mut ResourcePool {
        match kind {
            PoolKind::Preparation => &mut self.prep,
            PoolKind::Theatre => &mut self.theatre,
            PoolKind::Recovery => &mut self.recovery,
        }
    }

    /// Request a slot on behalf of `owner`
    pub fn request(&mut self, kind: PoolKind, owner: PatientId) -> RequestOutcome {
        let outcome = self.pool_mut(kind).request();
        if let RequestOutcome::Queued(ticket) = outcome {
            self.waiting_owners.insert((kind, ticket), owner);
        }
        outcome
    }

    /// Release a slot; if it passes to a waiting request, wake that request's
    /// owner at the current instant
    pub fn release(
        &mut self,
        kind: PoolKind,
        ticket: Ticket,
        scheduler: &mut Scheduler<Wakeup>,
    ) -> SimulationResult<()> {
        if let Some(next) = self.pool_mut(kind).release(ticket)? {
            let owner = self.waiting_owners.remove(&(kind, next)).ok_or_else(|| {
                SimulationError::resource_error(format!("{} granted {} with no owner", kind, next))
            })?;
            scheduler.schedule_after(0.0, Wakeup::Patient(owner))?;
        }
        Ok(())
    }

    /// Snapshots of all three pools in flow order
    pub fn snapshots(&self) -> [PoolSnapshot; 3] {
        PoolKind::ALL.map(|kind| self.pool(kind).snapshot())
    }
}

/// Point-in-time view of the whole unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemState {
    /// Simulated time of the snapshot
    pub time: SimTime,
    /// Patients that have arrived so far
    pub total_arrived: u64,
    /// Patients that have left so far
    pub total_departed: u64,
    /// Patients currently in the unit
    pub in_system: u64,
    /// Preparation rooms
    pub prep: PoolSnapshot,
    /// Theatres
    pub theatre: PoolSnapshot,
    /// Recovery beds
    pub recovery: PoolSnapshot,
}

/// Everything a finished run of the unit hands back
#[derive(Debug, Clone)]
pub struct SystemOutcome {
    /// Patients that departed strictly after the warmup, in departure order
    pub completed: Vec<Patient>,
    /// Pool samples
    pub monitor: MonitorLog,
    /// Blocking totals for the whole run, warmup included
    pub blocking: BlockingLedger,
    /// Patients that arrived
    pub total_arrived: u64,
    /// Patients that departed, warmup included
    pub total_departed: u64,
}

/// Surgical unit model driven by a [`Scheduler<Wakeup>`]
#[derive(Debug)]
pub struct HospitalSystem {
    warmup: SimTime,
    resources: Resources,
    arrivals: Option<ArrivalGenerator>,
    monitor: Monitor,
    ids: PatientIdGen,
    active: BTreeMap<PatientId, PatientProcess>,
    completed: Vec<Patient>,
    ledger: BlockingLedger,
    total_arrived: u64,
    total_departed: u64,
}

impl HospitalSystem {
    /// Create a unit fed by a Poisson arrival stream seeded with `seed`
    pub fn new(config: &SimulationConfig, seed: u64) -> SimulationResult<Self> {
        let arrivals = ArrivalGenerator::new(config, seed)?;
        Self::build(config, Some(arrivals))
    }

    /// Create a unit with no arrival stream; patients enter only via [`admit`](Self::admit)
    pub fn without_arrivals(config: &SimulationConfig) -> SimulationResult<Self> {
        Self::build(config, None)
    }

    fn build(config: &SimulationConfig, arrivals: Option<ArrivalGenerator>) -> SimulationResult<Self> {
        config.validate()?;
        let warmup = SimTime::new(config.warmup_period).ok_or_else(|| {
            SimulationError::configuration_error(format!(
                "invalid warmup period {}",
                config.warmup_period
            ))
        })?;

        Ok(Self {
            warmup,
            resources: Resources::new(config)?,
            arrivals,
            monitor: Monitor::new(config.monitoring_interval, warmup),
            ids: PatientIdGen::new(),
            active: BTreeMap::new(),
            completed: Vec::new(),
            ledger: BlockingLedger::default(),
            total_arrived: 0,
            total_departed: 0,
        })
    }

    /// Schedule the first arrival (if there is an arrival stream) and the
    /// first monitor tick
    pub fn start(&mut self, scheduler: &mut Scheduler<Wakeup>) -> SimulationResult<()> {
        if let Some(arrivals) = self.arrivals.as_mut() {
            let gap = arrivals.next_interarrival();
            scheduler.schedule_after(gap, Wakeup::Arrival)?;
        }
        scheduler.schedule_after(self.monitor.interval(), Wakeup::Monitor)?;
        Ok(())
    }

    /// Create a patient at the current instant and start its process.
    ///
    /// The process begins on a zero-delay wakeup, after everything already
    /// scheduled for this instant.
    pub fn admit(
        &mut self,
        service: ServiceTimes,
        scheduler: &mut Scheduler<Wakeup>,
    ) -> SimulationResult<PatientId> {
        let id = self.ids.next_id();
        let patient = Patient::new(id, scheduler.now(), service);
        self.active.insert(id, PatientProcess::new(patient));
        self.total_arrived += 1;
        scheduler.schedule_after(0.0, Wakeup::Patient(id))?;
        trace!(patient = %id, time = scheduler.now().minutes(), "patient arrived");
        Ok(id)
    }

    fn on_arrival(&mut self, scheduler: &mut Scheduler<Wakeup>) -> SimulationResult<()> {
        let arrivals = self.arrivals.as_mut().ok_or_else(|| {
            SimulationError::process_error("arrival wakeup without an arrival stream")
        })?;
        let service = arrivals.next_service_times();
        let gap = arrivals.next_interarrival();

        self.admit(service, scheduler)?;
        scheduler.schedule_after(gap, Wakeup::Arrival)?;
        Ok(())
    }

    fn on_monitor(&mut self, scheduler: &mut Scheduler<Wakeup>) -> SimulationResult<()> {
        self.monitor.observe(scheduler.now(), &self.resources);
        scheduler.schedule_after(self.monitor.interval(), Wakeup::Monitor)?;
        Ok(())
    }

    fn on_patient(&mut self, id: PatientId, scheduler: &mut Scheduler<Wakeup>) -> SimulationResult<()> {
        let process = self.active.get_mut(&id).ok_or_else(|| {
            SimulationError::process_error(format!("wakeup addressed to unknown {}", id))
        })?;
        process.resume(&mut self.resources, scheduler, &mut self.ledger)?;

        if process.is_departed() {
            if let Some(process) = self.active.remove(&id) {
                self.depart(process.into_patient());
            }
        }
        Ok(())
    }

    fn depart(&mut self, patient: Patient) {
        self.total_departed += 1;
        match patient.departure_time {
            Some(departed) if departed > self.warmup => self.completed.push(patient),
            _ => debug!(patient = %patient.id, "departed during warmup, not retained"),
        }
    }

    /// The unit's pools
    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    /// Patients retained so far (departed strictly after warmup)
    pub fn completed_patients(&self) -> &[Patient] {
        &self.completed
    }

    /// Blocking totals so far
    pub fn blocking(&self) -> &BlockingLedger {
        &self.ledger
    }

    /// Pool samples so far
    pub fn monitor_log(&self) -> &MonitorLog {
        self.monitor.log()
    }

    /// Patients still in the unit, in id order
    pub fn in_progress(&self) -> impl Iterator<Item = &PatientProcess> {
        self.active.values()
    }

    /// Patients that have arrived
    pub fn total_arrived(&self) -> u64 {
        self.total_arrived
    }

    /// Patients that have departed
    pub fn total_departed(&self) -> u64 {
        self.total_departed
    }

    /// Point-in-time view of the unit
    pub fn snapshot(&self, now: SimTime) -> SystemState {
        let [prep, theatre, recovery] = self.resources.snapshots();
        SystemState {
            time: now,
            total_arrived: self.total_arrived,
            total_departed: self.total_departed,
            in_system: self.total_arrived - self.total_departed,
            prep,
            theatre,
            recovery,
        }
    }

    /// Consume the unit, returning what it recorded
    pub fn into_outcome(self) -> SystemOutcome {
        SystemOutcome {
            completed: self.completed,
            monitor: self.monitor.into_log(),
            blocking: self.ledger,
            total_arrived: self.total_arrived,
            total_departed: self.total_departed,
        }
    }
}

impl Process<Wakeup> for HospitalSystem {
    fn resume(&mut self, target: Wakeup, scheduler: &mut Scheduler<Wakeup>) -> SimulationResult<()> {
        match target {
            Wakeup::Arrival => self.on_arrival(scheduler),
            Wakeup::Monitor => self.on_monitor(scheduler),
            Wakeup::Patient(id) => self.on_patient(id, scheduler),
        }
    }
}
