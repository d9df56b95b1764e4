//! Resource panels: server-mirrored lists with create, update and delete
//!
//! Every panel follows the same cycle: fetch the collection, show it, map a
//! user action to one HTTP call, then either patch the local list or
//! refetch. A failed call leaves the rows untouched and records the message
//! in [`Panel::error`].

pub mod alerts;
pub mod processors;
pub mod super_admins;
pub mod users;

use crate::api_client::ApiClient;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use tracing::{debug, warn};
use woresk_core::Result;

/// A record type served from one REST collection
pub trait Resource: DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static {
    /// Identity of a row
    type Id: PartialEq + Clone + fmt::Display + fmt::Debug + Send + Sync;

    /// Collection path segment, e.g. `user_roles`
    const COLLECTION: &'static str;

    /// Singular noun for messages
    const LABEL: &'static str;

    /// Row identity
    fn id(&self) -> &Self::Id;
}

/// A resource whose rows are created and edited through a form
pub trait Editable: Resource {
    /// Request body for create and update
    type Form: Serialize + fmt::Debug + Send + Sync;

    /// Validate `form` before it is sent
    ///
    /// # Errors
    ///
    /// Returns [`woresk_core::Error::Validation`] for the first bad field.
    fn check_form(form: &Self::Form, creating: bool) -> Result<()>;
}

/// Client-side state of one panel
#[derive(Debug, Clone)]
pub struct Panel<R: Resource> {
    rows: Vec<R>,
    loading: bool,
    error: Option<String>,
}

impl<R: Resource> Default for Panel<R> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            loading: false,
            error: None,
        }
    }
}

impl<R: Resource> Panel<R> {
    /// Empty panel
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current rows
    #[must_use]
    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    /// Whether a fetch is outstanding
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// Message from the last failed operation
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row with `id`
    #[must_use]
    pub fn find(&self, id: &R::Id) -> Option<&R> {
        self.rows.iter().find(|row| row.id() == id)
    }

    /// Mutable row with `id`
    pub fn find_mut(&mut self, id: &R::Id) -> Option<&mut R> {
        self.rows.iter_mut().find(|row| row.id() == id)
    }

    /// Mark a fetch as started
    pub fn begin_fetch(&mut self) {
        self.loading = true;
    }

    /// Land a fetch result; on failure the previous rows stay
    ///
    /// # Errors
    ///
    /// Passes the fetch error through after recording it.
    pub fn apply_fetch(&mut self, result: Result<Vec<R>>) -> Result<()> {
        self.loading = false;
        match result {
            Ok(rows) => {
                debug!(resource = R::LABEL, rows = rows.len(), "Panel refreshed");
                self.rows = rows;
                self.error = None;
                Ok(())
            }
            Err(e) => {
                warn!(resource = R::LABEL, error = %e, "Panel refresh failed");
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Refetch the whole collection
    ///
    /// # Errors
    ///
    /// Returns the fetch error; the rows are left as they were.
    pub async fn refresh(&mut self, api: &ApiClient) -> Result<()> {
        self.begin_fetch();
        let result = api.list::<R>().await;
        self.apply_fetch(result)
    }

    /// Replace the row with the same id, or append
    pub fn upsert_local(&mut self, row: R) {
        match self.find_mut(row.id()) {
            Some(existing) => *existing = row,
            None => self.rows.push(row),
        }
    }

    /// Drop the row with `id`; returns whether one was removed
    pub fn remove_local(&mut self, id: &R::Id) -> bool {
        let before = self.rows.len();
        self.rows.retain(|row| row.id() != id);
        self.rows.len() != before
    }

    /// Drop every row
    pub fn clear_local(&mut self) {
        self.rows.clear();
    }

    /// Record the outcome of a mutation
    fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                self.error = None;
                Ok(value)
            }
            Err(e) => {
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Delete a row on the server, then locally
    ///
    /// # Errors
    ///
    /// Returns the API error; the row stays in place.
    pub async fn delete(&mut self, api: &ApiClient, id: &R::Id) -> Result<()> {
        let result = api.delete::<R>(id).await;
        self.track(result)?;
        self.remove_local(id);
        debug!(resource = R::LABEL, %id, "Deleted");
        Ok(())
    }
}

impl<R: Editable> Panel<R> {
    /// Create (`editing` is `None`) or update a row, then refetch
    ///
    /// # Errors
    ///
    /// Returns a validation error before any request, or the API error.
    pub async fn save(
        &mut self,
        api: &ApiClient,
        editing: Option<&R::Id>,
        form: &R::Form,
    ) -> Result<()> {
        let checked = R::check_form(form, editing.is_none());
        self.track(checked)?;

        let result = match editing {
            Some(id) => api.update::<R, _>(id, form).await,
            None => api.create::<R, _>(form).await,
        };
        self.track(result)?;
        debug!(resource = R::LABEL, updated = editing.is_some(), "Saved");

        self.refresh(api).await
    }
}
