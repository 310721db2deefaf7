//! Finite-capacity resource pools with FIFO waiting
//!
//! A pool hands out opaque [`Ticket`]s. A ticket is either holding a slot or
//! waiting in the pool's queue; grant order is purely the queue position and
//! never depends on who asked.

use std::collections::{HashSet, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::simulation::{SimulationError, SimulationResult};
use crate::types::PoolKind;

/// Opaque handle for one request against a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TICKET_{}", self.0)
    }
}

/// Result of [`ResourcePool::request`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// A slot was free; the ticket now holds it
    Granted(Ticket),
    /// Every slot is taken; the ticket waits at the back of the queue
    Queued(Ticket),
}

impl RequestOutcome {
    /// The ticket issued for the request
    pub fn ticket(self) -> Ticket {
        match self {
            RequestOutcome::Granted(ticket) | RequestOutcome::Queued(ticket) => ticket,
        }
    }

    /// Returns `true` if the request was granted immediately
    pub fn is_granted(self) -> bool {
        matches!(self, RequestOutcome::Granted(_))
    }
}

/// Read-only view of a pool at one instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    /// Which pool this is
    pub kind: PoolKind,
    /// Total number of slots
    pub capacity: usize,
    /// Slots currently held
    pub in_use: usize,
    /// Requests waiting for a slot
    pub queue_length: usize,
}

impl PoolSnapshot {
    /// Fraction of slots held
    pub fn utilization(&self) -> f64 {
        self.in_use as f64 / self.capacity as f64
    }
}

/// Fixed-capacity slot pool with a FIFO wait list.
///
/// Invariant: `0 <= in_use <= capacity`, and a waiting ticket is granted only
/// when it reaches the head of the queue and a slot is released.
#[derive(Debug, Clone)]
pub struct ResourcePool {
    kind: PoolKind,
    capacity: usize,
    holders: HashSet<Ticket>,
    waiting: VecDeque<Ticket>,
    next_ticket: u64,
    peak_in_use: usize,
}

impl ResourcePool {
    /// Create a pool with `capacity` slots.
    ///
    /// A zero capacity is invalid configuration and is rejected here.
    pub fn new(kind: PoolKind, capacity: usize) -> SimulationResult<Self> {
        if capacity == 0 {
            return Err(SimulationError::configuration_error(format!(
                "{} pool capacity must be greater than 0",
                kind
            )));
        }
        Ok(Self {
            kind,
            capacity,
            holders: HashSet::with_capacity(capacity),
            waiting: VecDeque::new(),
            next_ticket: 0,
            peak_in_use: 0,
        })
    }

    /// Ask for a slot.
    ///
    /// Grants immediately when a slot is free, otherwise queues the ticket.
    pub fn request(&mut self) -> RequestOutcome {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;

        if self.holders.len() < self.capacity {
            self.grant(ticket);
            RequestOutcome::Granted(ticket)
        } else {
            self.waiting.push_back(ticket);
            RequestOutcome::Queued(ticket)
        }
    }

    /// Give a held slot back.
    ///
    /// If a request is waiting, the slot passes straight to the head of the
    /// queue and its ticket is returned so the caller can wake its owner.
    pub fn release(&mut self, ticket: Ticket) -> SimulationResult<Option<Ticket>> {
        if !self.holders.remove(&ticket) {
            return Err(SimulationError::resource_error(format!(
                "{} released by {} which does not hold a slot",
                self.kind, ticket
            )));
        }

        match self.waiting.pop_front() {
            Some(next) => {
                self.grant(next);
                Ok(Some(next))
            }
            None => Ok(None),
        }
    }

    fn grant(&mut self, ticket: Ticket) {
        self.holders.insert(ticket);
        debug_assert!(self.holders.len() <= self.capacity);
        self.peak_in_use = self.peak_in_use.max(self.holders.len());
    }

    /// Which pool this is
    pub fn kind(&self) -> PoolKind {
        self.kind
    }

    /// Slots currently held
    pub fn count(&self) -> usize {
        self.holders.len()
    }

    /// Total number of slots
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Requests waiting for a slot
    pub fn queue_length(&self) -> usize {
        self.waiting.len()
    }

    /// Returns `true` when every slot is held
    pub fn is_full(&self) -> bool {
        self.holders.len() >= self.capacity
    }

    /// Fraction of slots held
    pub fn utilization(&self) -> f64 {
        self.holders.len() as f64 / self.capacity as f64
    }

    /// Highest number of slots ever held at once
    pub fn peak_in_use(&self) -> usize {
        self.peak_in_use
    }

    /// Returns `true` if `ticket` currently holds a slot
    pub fn is_holding(&self, ticket: Ticket) -> bool {
        self.holders.contains(&ticket)
    }

    /// Read-only view of the pool
    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            kind: self.kind,
            capacity: self.capacity,
            in_use: self.holders.len(),
            queue_length: self.waiting.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(ResourcePool::new(PoolKind::Theatre, 0).is_err());
    }

    #[test]
    fn test_grants_until_full_then_queues() {
        let mut pool = ResourcePool::new(PoolKind::Recovery, 2).unwrap();

        assert!(pool.request().is_granted());
        assert!(pool.request().is_granted());
        assert!(pool.is_full());

        let third = pool.request();
        assert!(!third.is_granted());
        assert_eq!(pool.count(), 2);
        assert_eq!(pool.queue_length(), 1);
    }

    #[test]
    fn test_release_hands_slot_to_head_of_queue() {
        let mut pool = ResourcePool::new(PoolKind::Theatre, 1).unwrap();
        let holder = pool.request().ticket();
        let first_waiter = pool.request().ticket();
        let second_waiter = pool.request().ticket();

        let next = pool.release(holder).unwrap();
        assert_eq!(next, Some(first_waiter));
        assert_eq!(pool.count(), 1);
        assert!(pool.is_holding(first_waiter));
        assert_eq!(pool.queue_length(), 1);

        let next = pool.release(first_waiter).unwrap();
        assert_eq!(next, Some(second_waiter));

        let next = pool.release(second_waiter).unwrap();
        assert_eq!(next, None);
        assert_eq!(pool.count(), 0);
    }

    #[test]
    fn test_release_of_unheld_ticket_fails() {
        let mut pool = ResourcePool::new(PoolKind::Preparation, 1).unwrap();
        let holder = pool.request().ticket();
        let waiter = pool.request().ticket();

        assert!(pool.release(waiter).is_err());
        pool.release(holder).unwrap();
        // waiter now holds; the old holder cannot release twice
        assert!(pool.release(holder).is_err());
    }

    #[test]
    fn test_in_use_never_exceeds_capacity() {
        let mut pool = ResourcePool::new(PoolKind::Preparation, 3).unwrap();
        let mut held = Vec::new();
        let mut queued = VecDeque::new();

        for round in 0..50 {
            match pool.request() {
                RequestOutcome::Granted(t) => held.push(t),
                RequestOutcome::Queued(t) => queued.push_back(t),
            }
            if round % 3 == 0 && !held.is_empty() {
                let t = held.remove(0);
                if let Some(next) = pool.release(t).unwrap() {
                    assert_eq!(Some(next), queued.pop_front());
                    held.push(next);
                }
            }
            assert!(pool.count() <= pool.capacity());
        }
        assert_eq!(pool.peak_in_use(), 3);
    }

    #[test]
    fn test_snapshot() {
        let mut pool = ResourcePool::new(PoolKind::Recovery, 4).unwrap();
        pool.request();
        let snapshot = pool.snapshot();
        assert_eq!(snapshot.kind, PoolKind::Recovery);
        assert_eq!(snapshot.in_use, 1);
        assert_eq!(snapshot.queue_length, 0);
        assert_eq!(snapshot.utilization(), 0.25);
    }
}
