//! Per-user in-memory view of transactions and budgets.
//!
//! Fetches are tagged with a monotonic generation. A fetch only installs its
//! result when no newer fetch or mutation happened since it started, so a slow
//! superseded read can never overwrite fresher state. Mutations merge the
//! returned record into the cached view instead of forcing a reload.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::aggregator::{BudgetAlert, BudgetStatus, budget_alerts, compute_budget_status};
use crate::models::{Budget, Transaction};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub transactions: Vec<Transaction>,
    pub budgets: Vec<Budget>,
}

#[derive(Debug, Clone)]
pub enum Change {
    TransactionUpserted(Transaction),
    TransactionDeleted(String),
    BudgetUpserted(Budget),
    BudgetDeleted(String),
}

impl Snapshot {
    pub fn apply(&mut self, change: Change) {
        match change {
            Change::TransactionUpserted(tx) => {
                match self.transactions.iter_mut().find(|t| t.id == tx.id) {
                    Some(existing) => *existing = tx,
                    None => self.transactions.push(tx),
                }
            }
            Change::TransactionDeleted(id) => self.transactions.retain(|t| t.id != id),
            Change::BudgetUpserted(budget) => {
                match self.budgets.iter_mut().find(|b| b.id == budget.id) {
                    Some(existing) => *existing = budget,
                    None => self.budgets.push(budget),
                }
            }
            Change::BudgetDeleted(id) => self.budgets.retain(|b| b.id != id),
        }
    }

    pub fn budget_statuses(&self) -> Vec<BudgetStatus> {
        compute_budget_status(&self.budgets, &self.transactions)
    }

    pub fn budget_alerts(&self) -> Vec<BudgetAlert> {
        budget_alerts(&self.budgets, &self.transactions)
    }
}

/// Generation token handed out by [`SnapshotCache::begin_fetch`].
///
/// Generations come from one cache-wide counter, so a ticket never matches an
/// entry that was evicted and recreated after it was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket(u64);

#[derive(Debug)]
struct Entry {
    generation: u64,
    snapshot: Option<Arc<Snapshot>>,
    last_access: Instant,
}

impl Entry {
    fn new(generation: u64) -> Self {
        Entry {
            generation,
            snapshot: None,
            last_access: Instant::now(),
        }
    }
}

#[derive(Debug, Default)]
pub struct SnapshotCache {
    entries: RwLock<HashMap<String, Entry>>,
    next_generation: AtomicU64,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn get(&self, user_id: &str) -> Option<Arc<Snapshot>> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let entry = entries.get_mut(user_id)?;
        entry.last_access = Instant::now();
        entry.snapshot.clone()
    }

    pub fn begin_fetch(&self, user_id: &str) -> FetchTicket {
        let generation = self.bump();
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let entry = entries
            .entry(user_id.to_string())
            .or_insert_with(|| Entry::new(generation));
        entry.generation = generation;
        entry.last_access = Instant::now();
        FetchTicket(generation)
    }

    /// Installs `snapshot` if `ticket` is still the latest generation for the user.
    pub fn complete_fetch(&self, user_id: &str, ticket: FetchTicket, snapshot: Snapshot) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        match entries.get_mut(user_id) {
            Some(entry) if entry.generation == ticket.0 => {
                entry.snapshot = Some(Arc::new(snapshot));
                true
            }
            _ => {
                tracing::debug!(user_id, "discarding superseded snapshot fetch");
                false
            }
        }
    }

    /// Merges a committed mutation into the cached view, if one is loaded.
    ///
    /// Also advances the generation so fetches started before the mutation are discarded.
    pub fn apply(&self, user_id: &str, change: Change) {
        let generation = self.bump();
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = entries.get_mut(user_id) {
            entry.generation = generation;
            if let Some(snapshot) = entry.snapshot.as_mut() {
                Arc::make_mut(snapshot).apply(change);
            }
        }
    }

    /// Drops the user's entry; the next read reloads from the store.
    pub fn invalidate(&self, user_id: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(user_id);
    }

    /// Removes entries nobody read or fetched for at least `max_idle`. Returns how many went.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|_, entry| entry.last_access.elapsed() < max_idle);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Periodically drops idle snapshots so expired sessions do not pin data in memory.
pub fn spawn_eviction(cache: Arc<SnapshotCache>, max_idle: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(max_idle);
        loop {
            ticker.tick().await;
            let evicted = cache.evict_idle(max_idle);
            if evicted > 0 {
                tracing::debug!(evicted, "evicted idle snapshots");
            }
        }
    })
}
