//! Payment processors panel (`/processors`)
//!
//! Besides the usual list and create, rows change in two other ways: the
//! status toggle, which patches the row after the server accepts it, and
//! push updates, which are merged in by id without a refetch.

use super::{Panel, Resource};
use crate::api_client::ApiClient;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use woresk_core::types::{Processor, ProcessorDraft, ProcessorStatus};
use woresk_core::{Error, Result};

impl Resource for Processor {
    type Id = String;
    const COLLECTION: &'static str = "processors";
    const LABEL: &'static str = "processor";

    fn id(&self) -> &String {
        &self.id
    }
}

/// Partial processor row pushed by the server
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorUpdate {
    /// Processor the update applies to
    pub id: String,
    /// Fields to overwrite; `id` is never among them
    pub fields: Map<String, Value>,
}

impl ProcessorUpdate {
    /// Parse an event payload shaped `{id, ...fields}`
    ///
    /// Numeric ids are accepted and turned into strings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PushChannel`] when the payload is not an object or
    /// carries no usable id.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut fields) = value else {
            return Err(Error::PushChannel(
                "processor update is not an object".to_string(),
            ));
        };

        let id = match fields.remove("id") {
            Some(Value::String(id)) if !id.is_empty() => id,
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                return Err(Error::PushChannel(
                    "processor update has no id".to_string(),
                ));
            }
        };

        Ok(Self { id, fields })
    }
}

/// Panel listing payment processors
pub type ProcessorsPanel = Panel<Processor>;

impl Panel<Processor> {
    /// Register a new processor, then refetch
    ///
    /// # Errors
    ///
    /// Returns a validation error before any request, or the API error.
    pub async fn add(&mut self, api: &ApiClient, draft: &ProcessorDraft) -> Result<()> {
        let checked = draft.check();
        self.track(checked)?;

        let result = api.create::<Processor, _>(draft).await;
        self.track(result)?;
        info!(name = %draft.name, kind = %draft.kind, "Processor added");

        self.refresh(api).await
    }

    /// Flip a processor between `ACTIVE` and `ON_HOLD`
    ///
    /// Returns the new status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an id not in the list, or the API
    /// error; the row is only changed once the server accepts.
    pub async fn toggle(&mut self, api: &ApiClient, id: &str) -> Result<ProcessorStatus> {
        let current = self
            .find(&id.to_string())
            .map(|row| row.status)
            .ok_or_else(|| Error::NotFound {
                resource: format!("processor {id}"),
            });
        let next = self.track(current)?.toggled();

        let result = api.set_processor_status(id, next).await;
        self.track(result)?;

        if let Some(row) = self.find_mut(&id.to_string()) {
            row.status = next;
        }
        info!(%id, status = %next, "Processor status changed");
        Ok(next)
    }

    /// Merge a pushed update into its row
    ///
    /// Fields present in the update overwrite the row; everything else is
    /// kept. Returns whether a row changed. Unknown ids and updates that
    /// would produce an invalid row are ignored.
    pub fn apply_update(&mut self, update: &ProcessorUpdate) -> bool {
        let Some(row) = self.find_mut(&update.id) else {
            debug!(id = %update.id, "Push update for unknown processor ignored");
            return false;
        };

        match merge(row, &update.fields) {
            Ok(merged) => {
                *row = merged;
                true
            }
            Err(e) => {
                warn!(id = %update.id, error = %e, "Push update does not fit processor row");
                false
            }
        }
    }
}

fn merge(row: &Processor, fields: &Map<String, Value>) -> Result<Processor> {
    let mut value = serde_json::to_value(row)?;
    if let Value::Object(object) = &mut value {
        for (key, field) in fields {
            if key != "id" {
                object.insert(key.clone(), field.clone());
            }
        }
    }
    Ok(serde_json::from_value(value)?)
}
