use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Lost,
    Converted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub name: String,
    pub company_name: Option<String>,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub status: LeadStatus,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Store {
    pub fn create_lead(&self, lead: &Lead) -> Result<(), StoreError> {
        let key = keys::lead_key(&lead.id);
        self.leads.insert(key.as_bytes(), Self::serialize(lead)?)?;
        Ok(())
    }

    pub fn get_lead(&self, lead_id: &str) -> Result<Option<Lead>, StoreError> {
        match self.leads.get(keys::lead_key(lead_id).as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn update_lead(&self, lead: &Lead) -> Result<(), StoreError> {
        if self.get_lead(&lead.id)?.is_none() {
            return Err(StoreError::NotFound {
                entity: "lead".to_string(),
                key: lead.id.clone(),
            });
        }
        self.create_lead(lead)
    }

    pub fn delete_lead(&self, lead_id: &str) -> Result<(), StoreError> {
        let removed = self.leads.remove(keys::lead_key(lead_id).as_bytes())?;
        if removed.is_none() {
            return Err(StoreError::NotFound {
                entity: "lead".to_string(),
                key: lead_id.to_string(),
            });
        }
        Ok(())
    }

    pub fn list_leads(
        &self,
        limit: usize,
        offset: usize,
        query: Option<&str>,
        owner_id: Option<&str>,
    ) -> Result<(Vec<Lead>, usize), StoreError> {
        let needle = query.map(str::to_lowercase);
        let mut matched = 0usize;
        let mut rows = Vec::new();
        for item in self.leads.iter() {
            let (_, value) = item?;
            let lead: Lead = Self::deserialize(&value)?;
            if let Some(owner) = owner_id {
                if lead.owner_id != owner {
                    continue;
                }
            }
            if let Some(ref q) = needle {
                if !lead.name.to_lowercase().contains(q.as_str()) {
                    continue;
                }
            }
            if matched >= offset && rows.len() < limit {
                rows.push(lead);
            }
            matched += 1;
        }
        Ok((rows, matched))
    }
}
