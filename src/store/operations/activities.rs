use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::kpi::categories::{CategoryCounts, TaskCategory};
use crate::store::keys;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    Pending,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub id: String,
    pub title: String,
    pub assigned_to: String,
    pub category: TaskCategory,
    pub status: ActivityStatus,
    pub deal_id: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Store {
    pub fn create_activity(&self, activity: &ActivityRecord) -> Result<(), StoreError> {
        let key = keys::activity_key(&activity.assigned_to, &activity.id);
        self.activities
            .insert(key.as_bytes(), Self::serialize(activity)?)?;
        // id -> assignee index for id-only lookups
        self.activity_ids
            .insert(activity.id.as_bytes(), activity.assigned_to.as_bytes())?;
        Ok(())
    }

    pub fn get_activity_by_id(
        &self,
        activity_id: &str,
    ) -> Result<Option<ActivityRecord>, StoreError> {
        let Some(assignee_raw) = self.activity_ids.get(activity_id.as_bytes())? else {
            return Ok(None);
        };
        let assigned_to = match String::from_utf8(assignee_raw.to_vec()) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(error = %e, "Invalid UTF-8 in activity id index");
                return Ok(None);
            }
        };
        let key = keys::activity_key(&assigned_to, activity_id);
        match self.activities.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn update_activity(&self, activity: &ActivityRecord) -> Result<(), StoreError> {
        let existing =
            self.get_activity_by_id(&activity.id)?
                .ok_or_else(|| StoreError::NotFound {
                    entity: "activity".to_string(),
                    key: activity.id.clone(),
                })?;

        // Reassignment moves the row under the new assignee's prefix.
        if existing.assigned_to != activity.assigned_to {
            let old_key = keys::activity_key(&existing.assigned_to, &existing.id);
            self.activities.remove(old_key.as_bytes())?;
        }
        self.create_activity(activity)
    }

    pub fn delete_activity(&self, activity_id: &str) -> Result<(), StoreError> {
        let existing = self
            .get_activity_by_id(activity_id)?
            .ok_or_else(|| StoreError::NotFound {
                entity: "activity".to_string(),
                key: activity_id.to_string(),
            })?;
        let key = keys::activity_key(&existing.assigned_to, activity_id);
        self.activities.remove(key.as_bytes())?;
        self.activity_ids.remove(activity_id.as_bytes())?;
        Ok(())
    }

    /// Transition an activity to completed. Idempotent for already-completed
    /// rows; cancelled rows cannot be completed.
    pub fn complete_activity(
        &self,
        activity_id: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<ActivityRecord, StoreError> {
        let mut activity =
            self.get_activity_by_id(activity_id)?
                .ok_or_else(|| StoreError::NotFound {
                    entity: "activity".to_string(),
                    key: activity_id.to_string(),
                })?;

        match activity.status {
            ActivityStatus::Completed => return Ok(activity),
            ActivityStatus::Cancelled => {
                return Err(StoreError::Validation(
                    "Cancelled activities cannot be completed".to_string(),
                ))
            }
            ActivityStatus::Pending => {}
        }

        activity.status = ActivityStatus::Completed;
        activity.completed_at = Some(completed_at);
        activity.updated_at = Utc::now();

        let key = keys::activity_key(&activity.assigned_to, &activity.id);
        self.activities
            .insert(key.as_bytes(), Self::serialize(&activity)?)?;
        Ok(activity)
    }

    pub fn list_user_activities(
        &self,
        assigned_to: &str,
        limit: usize,
        offset: usize,
        status: Option<ActivityStatus>,
    ) -> Result<(Vec<ActivityRecord>, usize), StoreError> {
        let prefix = keys::activity_prefix(assigned_to);
        let mut matched = 0usize;
        let mut rows = Vec::new();
        for item in self.activities.scan_prefix(prefix.as_bytes()) {
            let (_, value) = item?;
            let activity: ActivityRecord = Self::deserialize(&value)?;
            if let Some(wanted) = status {
                if activity.status != wanted {
                    continue;
                }
            }
            if matched >= offset && rows.len() < limit {
                rows.push(activity);
            }
            matched += 1;
        }
        Ok((rows, matched))
    }

    /// Grouped count of one user's completed activities inside the half-open
    /// window `[start, end)`. All five scored counters are zero-filled before
    /// the scan, so a category with no activity reads as an explicit zero.
    pub fn count_completed_by_category(
        &self,
        assigned_to: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<CategoryCounts, StoreError> {
        let prefix = keys::activity_prefix(assigned_to);
        let mut counts = CategoryCounts::default();
        for item in self.activities.scan_prefix(prefix.as_bytes()) {
            let (_, value) = item?;
            let activity: ActivityRecord = Self::deserialize(&value)?;
            if activity.status != ActivityStatus::Completed {
                continue;
            }
            let Some(completed_at) = activity.completed_at else {
                continue;
            };
            if completed_at >= start && completed_at < end {
                counts.record(activity.category);
            }
        }
        Ok(counts)
    }
}
