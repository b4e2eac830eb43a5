use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::kpi::categories::CategoryCounts;
use crate::store::keys;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KpiStatus {
    Met,
    NotMet,
}

/// The aggregation window a snapshot covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SnapshotPeriod {
    Daily { date: NaiveDate },
    Monthly { year: i32, month: u32 },
}

/// Materialized result of one aggregation run for one salesperson and one
/// period. Written only by the KPI engine; re-running the same period
/// overwrites the row in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiSnapshot {
    pub sales_id: String,
    /// Denormalized at write time; a later rename does not rewrite history.
    pub sales_name: String,
    pub period: SnapshotPeriod,
    pub counts: CategoryCounts,
    pub status: KpiStatus,
}

impl KpiSnapshot {
    fn key(&self) -> String {
        match self.period {
            SnapshotPeriod::Daily { date } => keys::kpi_daily_key(&self.sales_id, date),
            SnapshotPeriod::Monthly { year, month } => {
                keys::kpi_monthly_key(&self.sales_id, year, month)
            }
        }
    }

    fn tree<'a>(&self, store: &'a Store) -> &'a sled::Tree {
        match self.period {
            SnapshotPeriod::Daily { .. } => &store.kpi_daily,
            SnapshotPeriod::Monthly { .. } => &store.kpi_monthly,
        }
    }
}

impl Store {
    /// Idempotent upsert keyed on `(sales_id, period)`.
    pub fn upsert_kpi_snapshot(&self, snapshot: &KpiSnapshot) -> Result<(), StoreError> {
        let key = snapshot.key();
        snapshot
            .tree(self)
            .insert(key.as_bytes(), Self::serialize(snapshot)?)?;
        Ok(())
    }

    pub fn get_daily_snapshot(
        &self,
        sales_id: &str,
        date: NaiveDate,
    ) -> Result<Option<KpiSnapshot>, StoreError> {
        let key = keys::kpi_daily_key(sales_id, date);
        match self.kpi_daily.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn get_monthly_snapshot(
        &self,
        sales_id: &str,
        year: i32,
        month: u32,
    ) -> Result<Option<KpiSnapshot>, StoreError> {
        let key = keys::kpi_monthly_key(sales_id, year, month);
        match self.kpi_monthly.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// All daily snapshots for one calendar date, every salesperson.
    /// A full-tree scan; the population is small by design.
    pub fn list_daily_snapshots(&self, date: NaiveDate) -> Result<Vec<KpiSnapshot>, StoreError> {
        let mut rows = Vec::new();
        for item in self.kpi_daily.iter() {
            let (_, value) = item?;
            let snapshot: KpiSnapshot = Self::deserialize(&value)?;
            if matches!(snapshot.period, SnapshotPeriod::Daily { date: d } if d == date) {
                rows.push(snapshot);
            }
        }
        rows.sort_by(|a, b| a.sales_id.cmp(&b.sales_id));
        Ok(rows)
    }

    /// One salesperson's daily snapshots inside a closed date range.
    pub fn list_daily_snapshots_for_sales(
        &self,
        sales_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<KpiSnapshot>, StoreError> {
        let prefix = keys::kpi_daily_prefix(sales_id);
        let mut rows = Vec::new();
        for item in self.kpi_daily.scan_prefix(prefix.as_bytes()) {
            let (_, value) = item?;
            let snapshot: KpiSnapshot = Self::deserialize(&value)?;
            if matches!(snapshot.period, SnapshotPeriod::Daily { date } if date >= from && date <= to)
            {
                rows.push(snapshot);
            }
        }
        Ok(rows)
    }

    pub fn list_monthly_snapshots(
        &self,
        year: i32,
        month: u32,
    ) -> Result<Vec<KpiSnapshot>, StoreError> {
        let mut rows = Vec::new();
        for item in self.kpi_monthly.iter() {
            let (_, value) = item?;
            let snapshot: KpiSnapshot = Self::deserialize(&value)?;
            if matches!(snapshot.period, SnapshotPeriod::Monthly { year: y, month: m } if y == year && m == month)
            {
                rows.push(snapshot);
            }
        }
        rows.sort_by(|a, b| a.sales_id.cmp(&b.sales_id));
        Ok(rows)
    }
}
