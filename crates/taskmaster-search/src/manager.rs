//! Index manager: build, query and prune per-user task indexes.
//!
//! The manager is the only writer of an [`IndexStore`]. It pulls task
//! documents from a [`TaskSource`], tokenizes them and applies the result to
//! the store, and answers term queries with materialized [`TaskRecord`]s.
//!
//! Source reads happen with no scope lock held. A rebuilt scope is swapped
//! in under one write lock, so concurrent readers see either the old index
//! or the new one, never a half-cleared one.
//!
//! Editing a task's text does not touch the index. Callers that edit must
//! either call [`IndexManager::reindex_task`] or rebuild the scope.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use taskmaster_types::{IndexSettings, TaskRecord, TaskSource};

use crate::error::SearchError;
use crate::store::{IndexStats, IndexStore, ScopeIndex};
use crate::tokenizer::Tokenizer;

pub struct IndexManager {
    store: Arc<IndexStore>,
    source: Arc<dyn TaskSource>,
    tokenizer: Tokenizer,
    settings: IndexSettings,
}

impl IndexManager {
    /// Create a manager over a fresh store configured from `settings`.
    pub fn new(source: Arc<dyn TaskSource>, settings: IndexSettings) -> Self {
        let store = IndexStore::new().with_dedupe_postings(settings.dedupe_postings);
        Self::with_store(Arc::new(store), source, settings)
    }

    /// Create a manager over an existing store.
    ///
    /// The store's own dedupe flag wins over `settings.dedupe_postings`.
    pub fn with_store(
        store: Arc<IndexStore>,
        source: Arc<dyn TaskSource>,
        settings: IndexSettings,
    ) -> Self {
        Self {
            store,
            source,
            tokenizer: Tokenizer::new(settings.min_token_chars),
            settings,
        }
    }

    pub fn store(&self) -> &Arc<IndexStore> {
        &self.store
    }

    pub fn settings(&self) -> &IndexSettings {
        &self.settings
    }

    /// Rebuild the index for `user_id` from the task source.
    ///
    /// Replaces whatever the scope held before. Returns the number of
    /// records indexed. A source failure leaves the previous index intact.
    ///
    /// Removals and edits that land while the source is being read are
    /// replayed onto the new index as it is swapped in.
    pub fn build_index(&self, user_id: &str) -> Result<usize, SearchError> {
        let mark = self.store.begin_rebuild(user_id)?;
        let documents = match self.source.fetch_tasks_for_user(user_id) {
            Ok(documents) => documents,
            Err(e) => {
                self.store.abandon_rebuild(user_id)?;
                return Err(e.into());
            }
        };

        let dedupe = self.store.dedupe_postings();
        let mut index = ScopeIndex::new();
        for doc in &documents {
            let record = TaskRecord::from(doc);
            let tokens = self.tokenizer.tokenize_record(&record);
            debug!(task_id = %record.task_id, tokens = tokens.len(), "Indexing task");
            index.index_terms(&record.task_id, tokens, dedupe);
            index.add_record(record);
        }
        index.mark_built(Utc::now());

        let count = index.records().len();
        let tokens = index.stats().tokens;
        let replayed = self.store.finish_rebuild(user_id, mark, index)?;

        info!(user_id, indexed = count, tokens, replayed, "Built task index");
        Ok(count)
    }

    /// Build the scope if it has no tokens yet.
    fn ensure_built(&self, user_id: &str) -> Result<(), SearchError> {
        if self.store.is_empty(user_id)? {
            debug!(user_id, "Index empty, building before search");
            self.build_index(user_id)?;
        }
        Ok(())
    }

    /// Find tasks matching any of `terms`.
    ///
    /// Builds the scope first if it is empty. Results follow the order of
    /// the materialized record list, not relevance, and each task appears
    /// once.
    pub fn search<S: AsRef<str>>(
        &self,
        user_id: &str,
        terms: &[S],
    ) -> Result<Vec<TaskRecord>, SearchError> {
        self.ensure_built(user_id)?;

        let mode = self.settings.query_normalization;
        let keys: Vec<String> = terms
            .iter()
            .flat_map(|term| self.tokenizer.query_keys(term.as_ref(), mode))
            .collect();

        let results = self.store.read(user_id, |index| {
            let matched: HashSet<&str> = keys
                .iter()
                .flat_map(|key| index.lookup(key))
                .map(String::as_str)
                .collect();

            index
                .records()
                .iter()
                .filter(|record| matched.contains(record.task_id.as_str()))
                .cloned()
                .collect::<Vec<_>>()
        })?;

        info!(
            user_id,
            terms = terms.len(),
            results = results.len(),
            "Task search complete"
        );
        Ok(results)
    }

    /// Single-term form of [`IndexManager::search`].
    pub fn search_term(&self, user_id: &str, term: &str) -> Result<Vec<TaskRecord>, SearchError> {
        self.search(user_id, &[term])
    }

    /// Raw posting list for an already-normalized token.
    pub fn lookup(&self, user_id: &str, token: &str) -> Result<Vec<String>, SearchError> {
        self.store.lookup(user_id, token)
    }

    /// Drop a deleted task from the user's index.
    ///
    /// Idempotent: an id that is not indexed, or a scope that was never
    /// built, is a successful no-op. Returns the number of postings removed.
    pub fn remove_from_index(&self, user_id: &str, task_id: &str) -> Result<usize, SearchError> {
        let removed = self.store.remove_posting(user_id, task_id)?;
        info!(user_id, task_id, removed, "Removed task from index");
        Ok(removed)
    }

    /// Replace one task's record and postings after an edit.
    ///
    /// Only applies to a built scope; returns false otherwise, leaving the
    /// next search to build the whole scope.
    pub fn reindex_task(&self, user_id: &str, record: TaskRecord) -> Result<bool, SearchError> {
        let tokens = self.tokenizer.tokenize_record(&record);
        let dedupe = self.store.dedupe_postings();
        let task_id = record.task_id.clone();

        let applied = self
            .store
            .write_existing(user_id, |index| index.reindex_task(record, tokens, dedupe))?
            .unwrap_or(false);

        debug!(user_id, task_id = %task_id, applied, "Reindexed task");
        Ok(applied)
    }

    pub fn stats(&self, user_id: &str) -> Result<IndexStats, SearchError> {
        self.store.stats(user_id)
    }
}
