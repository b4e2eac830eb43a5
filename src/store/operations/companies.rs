use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Store {
    pub fn create_company(&self, company: &Company) -> Result<(), StoreError> {
        let key = keys::company_key(&company.id);
        self.companies
            .insert(key.as_bytes(), Self::serialize(company)?)?;
        Ok(())
    }

    pub fn get_company(&self, company_id: &str) -> Result<Option<Company>, StoreError> {
        match self.companies.get(keys::company_key(company_id).as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn update_company(&self, company: &Company) -> Result<(), StoreError> {
        if self.get_company(&company.id)?.is_none() {
            return Err(StoreError::NotFound {
                entity: "company".to_string(),
                key: company.id.clone(),
            });
        }
        self.create_company(company)
    }

    pub fn delete_company(&self, company_id: &str) -> Result<(), StoreError> {
        let removed = self
            .companies
            .remove(keys::company_key(company_id).as_bytes())?;
        if removed.is_none() {
            return Err(StoreError::NotFound {
                entity: "company".to_string(),
                key: company_id.to_string(),
            });
        }
        Ok(())
    }

    /// Paginated listing with optional case-insensitive substring search on
    /// the company name.
    pub fn list_companies(
        &self,
        limit: usize,
        offset: usize,
        query: Option<&str>,
    ) -> Result<(Vec<Company>, usize), StoreError> {
        let needle = query.map(str::to_lowercase);
        let mut matched = 0usize;
        let mut rows = Vec::new();
        for item in self.companies.iter() {
            let (_, value) = item?;
            let company: Company = Self::deserialize(&value)?;
            if let Some(ref q) = needle {
                if !company.name.to_lowercase().contains(q.as_str()) {
                    continue;
                }
            }
            if matched >= offset && rows.len() < limit {
                rows.push(company);
            }
            matched += 1;
        }
        Ok((rows, matched))
    }
}
