use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStage {
    Open,
    Negotiation,
    Won,
    Lost,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub id: String,
    pub title: String,
    pub lead_id: Option<String>,
    pub company_id: Option<String>,
    pub value: i64,
    pub stage: DealStage,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Store {
    pub fn create_deal(&self, deal: &Deal) -> Result<(), StoreError> {
        let key = keys::deal_key(&deal.id);
        self.deals.insert(key.as_bytes(), Self::serialize(deal)?)?;
        Ok(())
    }

    pub fn get_deal(&self, deal_id: &str) -> Result<Option<Deal>, StoreError> {
        match self.deals.get(keys::deal_key(deal_id).as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn update_deal(&self, deal: &Deal) -> Result<(), StoreError> {
        if self.get_deal(&deal.id)?.is_none() {
            return Err(StoreError::NotFound {
                entity: "deal".to_string(),
                key: deal.id.clone(),
            });
        }
        self.create_deal(deal)
    }

    pub fn delete_deal(&self, deal_id: &str) -> Result<(), StoreError> {
        let removed = self.deals.remove(keys::deal_key(deal_id).as_bytes())?;
        if removed.is_none() {
            return Err(StoreError::NotFound {
                entity: "deal".to_string(),
                key: deal_id.to_string(),
            });
        }
        Ok(())
    }

    pub fn list_deals(
        &self,
        limit: usize,
        offset: usize,
        query: Option<&str>,
        created_by: Option<&str>,
    ) -> Result<(Vec<Deal>, usize), StoreError> {
        let needle = query.map(str::to_lowercase);
        let mut matched = 0usize;
        let mut rows = Vec::new();
        for item in self.deals.iter() {
            let (_, value) = item?;
            let deal: Deal = Self::deserialize(&value)?;
            if let Some(creator) = created_by {
                if deal.created_by != creator {
                    continue;
                }
            }
            if let Some(ref q) = needle {
                if !deal.title.to_lowercase().contains(q.as_str()) {
                    continue;
                }
            }
            if matched >= offset && rows.len() < limit {
                rows.push(deal);
            }
            matched += 1;
        }
        Ok((rows, matched))
    }
}
