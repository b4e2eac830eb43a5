use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::kpi::categories::CategoryThresholds;
use crate::kpi::period::PeriodType;
use crate::store::keys;
use crate::store::{Store, StoreError};

/// A versioned KPI threshold configuration. At most one row per period type
/// is active at any time; replacement is append-only, old rows are history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiTarget {
    pub id: String,
    pub period_type: PeriodType,
    pub thresholds: CategoryThresholds,
    pub is_active: bool,
    pub version: u32,
    pub created_at: DateTime<Utc>,
}

impl Store {
    pub fn find_active_target(
        &self,
        period_type: PeriodType,
    ) -> Result<Option<KpiTarget>, StoreError> {
        let pointer_key = keys::kpi_target_latest_key(period_type.as_str());
        let Some(raw) = self.kpi_targets.get(pointer_key.as_bytes())? else {
            return Ok(None);
        };
        let version = decode_version(&raw);
        let row_key = keys::kpi_target_key(period_type.as_str(), version);
        match self.kpi_targets.get(row_key.as_bytes())? {
            Some(bytes) => {
                let target: KpiTarget = Self::deserialize(&bytes)?;
                if target.is_active {
                    Ok(Some(target))
                } else {
                    Ok(None)
                }
            }
            None => Ok(None),
        }
    }

    /// Atomically replace the active target of one period type: the prior
    /// active row is deactivated, the new row inserted, and the latest
    /// pointer advanced, all in one tree transaction. Callers can never
    /// observe two active rows of the same type.
    pub fn replace_active_target(
        &self,
        period_type: PeriodType,
        thresholds: CategoryThresholds,
    ) -> Result<KpiTarget, StoreError> {
        let pointer_key = keys::kpi_target_latest_key(period_type.as_str());
        let period_str = period_type.as_str().to_string();
        let new_id = uuid::Uuid::new_v4().to_string();
        let created_at = Utc::now();

        let result = self.kpi_targets.transaction(move |tx| {
            use sled::transaction::ConflictableTransactionError as Abort;

            let prior_version = tx
                .get(pointer_key.as_bytes())?
                .map(|raw| decode_version(&raw))
                .unwrap_or(0);

            if prior_version > 0 {
                let prior_key = keys::kpi_target_key(&period_str, prior_version);
                if let Some(raw) = tx.get(prior_key.as_bytes())? {
                    let mut prior: KpiTarget = serde_json::from_slice(&raw)
                        .map_err(|e| Abort::Abort(StoreError::Serialization(e)))?;
                    prior.is_active = false;
                    let bytes = serde_json::to_vec(&prior)
                        .map_err(|e| Abort::Abort(StoreError::Serialization(e)))?;
                    tx.insert(prior_key.as_bytes(), bytes)?;
                }
            }

            let target = KpiTarget {
                id: new_id.clone(),
                period_type,
                thresholds,
                is_active: true,
                version: prior_version + 1,
                created_at,
            };
            let row_key = keys::kpi_target_key(&period_str, target.version);
            let bytes = serde_json::to_vec(&target)
                .map_err(|e| Abort::Abort(StoreError::Serialization(e)))?;
            tx.insert(row_key.as_bytes(), bytes)?;
            tx.insert(pointer_key.as_bytes(), &target.version.to_be_bytes())?;

            Ok(target)
        });

        result.map_err(
            |e: sled::transaction::TransactionError<StoreError>| match e {
                sled::transaction::TransactionError::Abort(se) => se,
                sled::transaction::TransactionError::Storage(se) => StoreError::Sled(se),
            },
        )
    }

    /// Deactivate the current active target without installing a new one.
    /// The latest-version pointer is kept so a later replacement continues
    /// the version sequence instead of overwriting history.
    pub fn deactivate_target(&self, period_type: PeriodType) -> Result<bool, StoreError> {
        let Some(mut active) = self.find_active_target(period_type)? else {
            return Ok(false);
        };
        active.is_active = false;
        let row_key = keys::kpi_target_key(period_type.as_str(), active.version);
        self.kpi_targets
            .insert(row_key.as_bytes(), Self::serialize(&active)?)?;
        Ok(true)
    }

    /// Full version history for a period type, oldest first. The latest
    /// pointer row is skipped.
    pub fn list_target_history(
        &self,
        period_type: PeriodType,
    ) -> Result<Vec<KpiTarget>, StoreError> {
        let prefix = keys::kpi_target_prefix(period_type.as_str());
        let pointer_key = keys::kpi_target_latest_key(period_type.as_str());
        let mut rows = Vec::new();
        for item in self.kpi_targets.scan_prefix(prefix.as_bytes()) {
            let (key, value) = item?;
            if key.as_ref() == pointer_key.as_bytes() {
                continue;
            }
            rows.push(Self::deserialize::<KpiTarget>(&value)?);
        }
        rows.sort_by_key(|t| t.version);
        Ok(rows)
    }
}

fn decode_version(raw: &[u8]) -> u32 {
    let bytes: [u8; 4] = raw.try_into().unwrap_or([0; 4]);
    u32::from_be_bytes(bytes)
}
