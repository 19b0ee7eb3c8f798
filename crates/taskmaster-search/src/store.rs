//! Per-user index storage.
//!
//! [`IndexStore`] maps each user scope to its own [`ScopeIndex`] behind its
//! own `RwLock`. The scope map is only touched to find or create a scope
//! handle; readers and writers of different scopes never wait on each
//! other.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;

use taskmaster_types::TaskRecord;

use crate::error::SearchError;

/// Size and freshness of one scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    /// Materialized task records
    pub records: usize,
    /// Distinct tokens
    pub tokens: usize,
    /// Total entries across all posting lists
    pub postings: usize,
    /// When the scope was last rebuilt
    pub built_at: Option<DateTime<Utc>>,
}

/// An edit made to a live scope.
#[derive(Debug, Clone)]
enum Change {
    Removed(String),
    Reindexed { record: TaskRecord, terms: Vec<String> },
}

/// Edits made to a scope while rebuilds of it are fetching.
///
/// A rebuild's snapshot may predate them, so they are replayed onto the
/// fresh index before it is swapped in. Nothing is kept while no rebuild
/// is in flight.
#[derive(Debug, Default)]
struct RebuildLog {
    generation: u64,
    in_flight: usize,
    changes: Vec<(u64, Change)>,
}

impl RebuildLog {
    fn begin(&mut self) -> u64 {
        self.in_flight += 1;
        self.generation
    }

    fn end(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if self.in_flight == 0 {
            self.changes.clear();
        }
    }

    fn record(&mut self, change: impl FnOnce() -> Change) {
        self.generation += 1;
        if self.in_flight > 0 {
            self.changes.push((self.generation, change()));
        }
    }

    fn since(&self, mark: u64) -> impl Iterator<Item = &Change> {
        self.changes
            .iter()
            .filter(move |(generation, _)| *generation > mark)
            .map(|(_, change)| change)
    }
}

/// The index of a single user's tasks.
///
/// Holds the materialized records in source order and the token -> task id
/// postings. Every id in a posting list has a record, and no posting list
/// is ever empty.
#[derive(Debug, Default)]
pub struct ScopeIndex {
    records: Vec<TaskRecord>,
    postings: HashMap<String, Vec<String>>,
    built_at: Option<DateTime<Utc>>,
    log: RebuildLog,
}

impl ScopeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard all records and postings.
    pub fn clear(&mut self) {
        self.records.clear();
        self.postings.clear();
        self.built_at = None;
    }

    /// Append a record to the materialized list. Does not tokenize.
    pub fn add_record(&mut self, record: TaskRecord) {
        self.records.push(record);
    }

    /// Append `task_id` to the posting list of every term.
    ///
    /// A term listed twice appends twice unless `dedupe` is set, in which
    /// case an id already present under that term is skipped.
    pub fn index_terms<I, S>(&mut self, task_id: &str, terms: I, dedupe: bool)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for term in terms {
            let ids = self.postings.entry(term.into()).or_default();
            if dedupe && ids.iter().any(|id| id == task_id) {
                continue;
            }
            ids.push(task_id.to_string());
        }
    }

    /// Remove every posting for `task_id`, drop emptied tokens, then drop
    /// its record.
    ///
    /// Returns the number of postings removed. An unknown id removes
    /// nothing.
    pub fn remove_posting(&mut self, task_id: &str) -> usize {
        self.log.record(|| Change::Removed(task_id.to_string()));
        self.drop_task(task_id)
    }

    /// Replace one task's record and postings.
    ///
    /// Only applies to a scope with tokens; returns false otherwise. The
    /// edit is still replayed onto any rebuild in flight.
    pub fn reindex_task(&mut self, record: TaskRecord, terms: Vec<String>, dedupe: bool) -> bool {
        self.log.record(|| Change::Reindexed {
            record: record.clone(),
            terms: terms.clone(),
        });
        if self.is_empty() {
            return false;
        }
        self.drop_task(&record.task_id);
        self.index_terms(&record.task_id, terms, dedupe);
        self.add_record(record);
        true
    }

    fn apply(&mut self, change: &Change, dedupe: bool) {
        match change {
            Change::Removed(task_id) => {
                self.drop_task(task_id);
            }
            Change::Reindexed { record, terms } => {
                self.drop_task(&record.task_id);
                self.index_terms(&record.task_id, terms.iter().cloned(), dedupe);
                self.add_record(record.clone());
            }
        }
    }

    fn drop_task(&mut self, task_id: &str) -> usize {
        let mut removed = 0;
        self.postings.retain(|_, ids| {
            let before = ids.len();
            ids.retain(|id| id != task_id);
            removed += before - ids.len();
            !ids.is_empty()
        });
        self.records.retain(|r| r.task_id != task_id);
        removed
    }

    /// Posting list for an exact token, or empty.
    pub fn lookup(&self, token: &str) -> &[String] {
        self.postings.get(token).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True when no token is indexed.
    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn records(&self) -> &[TaskRecord] {
        &self.records
    }

    pub fn contains_record(&self, task_id: &str) -> bool {
        self.records.iter().any(|r| r.task_id == task_id)
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.postings.keys().map(String::as_str)
    }

    pub fn mark_built(&mut self, at: DateTime<Utc>) {
        self.built_at = Some(at);
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            records: self.records.len(),
            tokens: self.postings.len(),
            postings: self.postings.values().map(Vec::len).sum(),
            built_at: self.built_at,
        }
    }
}

type ScopeHandle = Arc<RwLock<ScopeIndex>>;

/// All scopes, keyed by user id.
///
/// Lives for the whole process and is shared by reference; nothing is
/// persisted.
#[derive(Debug, Default)]
pub struct IndexStore {
    scopes: DashMap<String, ScopeHandle>,
    dedupe_postings: bool,
}

impl IndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dedupe_postings(mut self, dedupe: bool) -> Self {
        self.dedupe_postings = dedupe;
        self
    }

    pub fn dedupe_postings(&self) -> bool {
        self.dedupe_postings
    }

    fn existing(&self, scope: &str) -> Option<ScopeHandle> {
        self.scopes.get(scope).map(|entry| Arc::clone(entry.value()))
    }

    fn get_or_create(&self, scope: &str) -> ScopeHandle {
        Arc::clone(self.scopes.entry(scope.to_string()).or_default().value())
    }

    /// Run `f` with shared access to a scope. Absent scopes read as a
    /// fresh empty index.
    pub fn read<T>(&self, scope: &str, f: impl FnOnce(&ScopeIndex) -> T) -> Result<T, SearchError> {
        match self.existing(scope) {
            Some(handle) => {
                let guard = handle.read().map_err(|e| SearchError::poisoned(scope, e))?;
                Ok(f(&guard))
            }
            None => Ok(f(&ScopeIndex::default())),
        }
    }

    /// Run `f` with exclusive access to a scope, creating it if needed.
    pub fn write<T>(
        &self,
        scope: &str,
        f: impl FnOnce(&mut ScopeIndex) -> T,
    ) -> Result<T, SearchError> {
        let handle = self.get_or_create(scope);
        let mut guard = handle.write().map_err(|e| SearchError::poisoned(scope, e))?;
        Ok(f(&mut guard))
    }

    /// Run `f` with exclusive access to a scope only if it exists.
    pub fn write_existing<T>(
        &self,
        scope: &str,
        f: impl FnOnce(&mut ScopeIndex) -> T,
    ) -> Result<Option<T>, SearchError> {
        match self.existing(scope) {
            Some(handle) => {
                let mut guard = handle.write().map_err(|e| SearchError::poisoned(scope, e))?;
                Ok(Some(f(&mut guard)))
            }
            None => Ok(None),
        }
    }

    /// Swap in a fully built index under a single write lock.
    pub fn replace(&self, scope: &str, index: ScopeIndex) -> Result<(), SearchError> {
        self.write(scope, |current| {
            let log = std::mem::take(&mut current.log);
            *current = index;
            current.log = log;
        })
    }

    /// Mark a rebuild of `scope` as started, creating the scope if needed.
    ///
    /// Returns the mark to pass to [`IndexStore::finish_rebuild`]. Removals
    /// and edits made after this call are replayed onto the rebuilt index.
    pub fn begin_rebuild(&self, scope: &str) -> Result<u64, SearchError> {
        self.write(scope, |index| index.log.begin())
    }

    /// Swap in a rebuilt index and replay every change made since `mark`,
    /// all under one write lock. Returns the number of changes replayed.
    pub fn finish_rebuild(
        &self,
        scope: &str,
        mark: u64,
        index: ScopeIndex,
    ) -> Result<usize, SearchError> {
        let dedupe = self.dedupe_postings;
        self.write(scope, |current| {
            let mut log = std::mem::take(&mut current.log);
            *current = index;

            let mut replayed = 0;
            for change in log.since(mark) {
                current.apply(change, dedupe);
                replayed += 1;
            }

            log.end();
            current.log = log;
            replayed
        })
    }

    /// Mark a rebuild of `scope` as given up, leaving the index untouched.
    pub fn abandon_rebuild(&self, scope: &str) -> Result<(), SearchError> {
        self.write_existing(scope, |index| index.log.end())?;
        Ok(())
    }

    pub fn clear(&self, scope: &str) -> Result<(), SearchError> {
        self.write_existing(scope, ScopeIndex::clear)?;
        debug!(scope, "Cleared scope");
        Ok(())
    }

    pub fn add_record(&self, scope: &str, record: TaskRecord) -> Result<(), SearchError> {
        self.write(scope, |index| index.add_record(record))
    }

    pub fn index_terms<I, S>(&self, scope: &str, task_id: &str, terms: I) -> Result<(), SearchError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let dedupe = self.dedupe_postings;
        self.write(scope, |index| index.index_terms(task_id, terms, dedupe))
    }

    /// Remove a task from a scope. Removing an unknown task, or from an
    /// unknown scope, succeeds and removes nothing.
    pub fn remove_posting(&self, scope: &str, task_id: &str) -> Result<usize, SearchError> {
        let removed = self
            .write_existing(scope, |index| index.remove_posting(task_id))?
            .unwrap_or(0);
        debug!(scope, task_id, removed, "Removed postings");
        Ok(removed)
    }

    pub fn lookup(&self, scope: &str, token: &str) -> Result<Vec<String>, SearchError> {
        self.read(scope, |index| index.lookup(token).to_vec())
    }

    pub fn is_empty(&self, scope: &str) -> Result<bool, SearchError> {
        self.read(scope, ScopeIndex::is_empty)
    }

    pub fn stats(&self, scope: &str) -> Result<IndexStats, SearchError> {
        self.read(scope, ScopeIndex::stats)
    }

    /// Number of scopes that have been created.
    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }
}
