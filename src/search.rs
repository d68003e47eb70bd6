//! # Query Engine
//!
//! Read-only queries over the loaded food table.
//!
//! The engine is built once at startup from whatever [`LoadState`] the
//! loader produced and never changes afterward, so any number of request
//! tasks can share it without locking. When the load failed, every query
//! reports [`AppError::Unavailable`] instead of attempting partial work;
//! the failure reason itself surfaces through [`Engine::health`].

use serde::Serialize;

use crate::{
    error::AppError,
    table::{LoadState, Record, Table},
};

/// Cap applied when a search arrives with no query: the first rows serve
/// as a bounded preview instead of the full dataset.
pub const PREVIEW_LIMIT: usize = 100;

pub struct Engine {
    load: LoadState,
}

#[derive(Debug, Serialize)]
pub struct EngineHealth {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Engine {
    pub fn new(load: LoadState) -> Self {
        Self { load }
    }

    fn table(&self) -> Result<&Table, AppError> {
        match &self.load {
            LoadState::Loaded(table) => Ok(table),
            LoadState::Failed(err) => Err(AppError::Unavailable(err.to_string())),
            LoadState::Unloaded => Err(AppError::Unavailable("no source loaded".to_string())),
        }
    }

    /// First record whose key text equals the trimmed input. Duplicate
    /// keys keep their first-in-order row; `Ok(None)` is the not-found
    /// outcome, not a fault.
    pub fn exact_lookup(&self, name: &str) -> Result<Option<Record<'_>>, AppError> {
        let table = self.table()?;
        let needle = name.trim();

        Ok(table
            .records()
            .find(|record| record.key().is_some_and(|key| key == needle)))
    }

    /// Key values of every row whose key text contains the trimmed query,
    /// case-insensitively, in table order. An empty query falls back to
    /// the first [`PREVIEW_LIMIT`] names rather than the whole table.
    pub fn substring_search(&self, query: &str) -> Result<Vec<String>, AppError> {
        let table = self.table()?;
        let needle = query.trim();

        if needle.is_empty() {
            return Ok(table
                .records()
                .filter_map(|record| record.key())
                .take(PREVIEW_LIMIT)
                .collect());
        }

        let needle = needle.to_lowercase();
        Ok(table
            .records()
            .filter_map(|record| record.key())
            .filter(|name| name.to_lowercase().contains(&needle))
            .collect())
    }

    /// Every key value in table order; feeds the index page.
    pub fn names(&self) -> Result<Vec<String>, AppError> {
        Ok(self
            .table()?
            .records()
            .filter_map(|record| record.key())
            .collect())
    }

    pub fn health(&self) -> EngineHealth {
        let detail = match &self.load {
            LoadState::Loaded(_) => None,
            LoadState::Failed(err) => Some(err.to_string()),
            LoadState::Unloaded => Some("no source loaded".to_string()),
        };

        EngineHealth {
            ok: detail.is_none(),
            detail,
        }
    }
}
