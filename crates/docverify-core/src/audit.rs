//! Review audit trail.
//!
//! Every committed change to a record produces one [`ReviewEvent`]: who did
//! it, what changed, and the status before and after.

use chrono::{DateTime, Utc};
use docverify_state::StoredReviewEvent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{ExtractionId, ExtractionStatus, FieldId, Result};

/// What a review event records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReviewAction {
    Imported {
        field_count: usize,
    },
    FieldEdited {
        field_id: FieldId,
        previous_value: String,
        value: String,
        previous_verified: bool,
        verified: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        comment: Option<String>,
    },
    MarkedFailed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    Reopened,
}

impl ReviewAction {
    pub fn kind(&self) -> &'static str {
        match self {
            ReviewAction::Imported { .. } => "imported",
            ReviewAction::FieldEdited { .. } => "field_edited",
            ReviewAction::MarkedFailed { .. } => "marked_failed",
            ReviewAction::Reopened => "reopened",
        }
    }
}

/// One audit entry for one extraction record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewEvent {
    pub event_id: Uuid,
    pub extraction_id: ExtractionId,
    /// Operator identity.
    pub actor: String,
    pub action: ReviewAction,
    pub status_before: ExtractionStatus,
    pub status_after: ExtractionStatus,
    /// Record version produced by this change.
    pub version: u64,
    pub timestamp: DateTime<Utc>,
}

impl ReviewEvent {
    pub fn new(
        extraction_id: ExtractionId,
        actor: impl Into<String>,
        action: ReviewAction,
        status_before: ExtractionStatus,
        status_after: ExtractionStatus,
        version: u64,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            extraction_id,
            actor: actor.into(),
            action,
            status_before,
            status_after,
            version,
            timestamp: Utc::now(),
        }
    }

    pub fn to_stored(&self) -> Result<StoredReviewEvent> {
        Ok(StoredReviewEvent {
            event_id: self.event_id.to_string(),
            extraction_id: self.extraction_id.to_string(),
            kind: self.action.kind().to_string(),
            actor: self.actor.clone(),
            payload: serde_json::to_value(self)?,
            timestamp: self.timestamp,
        })
    }

    pub fn from_stored(stored: StoredReviewEvent) -> Result<Self> {
        Ok(serde_json::from_value(stored.payload)?)
    }
}
