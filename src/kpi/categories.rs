use serde::{Deserialize, Serialize};

/// Work-item categories. The first five carry KPI thresholds; `Lainnya`
/// ("other") is a valid category that is never scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskCategory {
    Kanvasing,
    Followup,
    Penawaran,
    KesepakatanTarif,
    #[serde(rename = "DealDO")]
    DealDo,
    Lainnya,
}

/// The five scored counters of a KPI snapshot. Always fully materialized:
/// a category with no activity is an explicit zero, never an absent key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCounts {
    pub kanvasing: u32,
    pub followup: u32,
    pub penawaran: u32,
    pub kesepakatan_tarif: u32,
    pub deal_do: u32,
}

/// Per-category minimums of a KPI target, same shape as the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryThresholds {
    pub kanvasing: u32,
    pub followup: u32,
    pub penawaran: u32,
    pub kesepakatan_tarif: u32,
    pub deal_do: u32,
}

impl CategoryCounts {
    /// Count one completed item. The mapping is an exhaustive match so a new
    /// category variant is a compile error here, not a silent fall-through.
    pub fn record(&mut self, category: TaskCategory) {
        if let Some(slot) = self.scored_slot(category) {
            *slot += 1;
        }
    }

    fn scored_slot(&mut self, category: TaskCategory) -> Option<&mut u32> {
        match category {
            TaskCategory::Kanvasing => Some(&mut self.kanvasing),
            TaskCategory::Followup => Some(&mut self.followup),
            TaskCategory::Penawaran => Some(&mut self.penawaran),
            TaskCategory::KesepakatanTarif => Some(&mut self.kesepakatan_tarif),
            TaskCategory::DealDo => Some(&mut self.deal_do),
            // carries no threshold, explicitly unscored
            TaskCategory::Lainnya => None,
        }
    }

    /// Conjunctive comparison: every counter must reach its threshold, ties
    /// included. A single shortfall fails the whole period.
    pub fn meets(&self, thresholds: &CategoryThresholds) -> bool {
        self.kanvasing >= thresholds.kanvasing
            && self.followup >= thresholds.followup
            && self.penawaran >= thresholds.penawaran
            && self.kesepakatan_tarif >= thresholds.kesepakatan_tarif
            && self.deal_do >= thresholds.deal_do
    }
}
