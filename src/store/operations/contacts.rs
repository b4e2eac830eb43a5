use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub company_id: Option<String>,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Store {
    pub fn create_contact(&self, contact: &Contact) -> Result<(), StoreError> {
        let key = keys::contact_key(&contact.id);
        self.contacts
            .insert(key.as_bytes(), Self::serialize(contact)?)?;
        Ok(())
    }

    pub fn get_contact(&self, contact_id: &str) -> Result<Option<Contact>, StoreError> {
        match self.contacts.get(keys::contact_key(contact_id).as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn update_contact(&self, contact: &Contact) -> Result<(), StoreError> {
        if self.get_contact(&contact.id)?.is_none() {
            return Err(StoreError::NotFound {
                entity: "contact".to_string(),
                key: contact.id.clone(),
            });
        }
        self.create_contact(contact)
    }

    pub fn delete_contact(&self, contact_id: &str) -> Result<(), StoreError> {
        let removed = self
            .contacts
            .remove(keys::contact_key(contact_id).as_bytes())?;
        if removed.is_none() {
            return Err(StoreError::NotFound {
                entity: "contact".to_string(),
                key: contact_id.to_string(),
            });
        }
        Ok(())
    }

    pub fn list_contacts(
        &self,
        limit: usize,
        offset: usize,
        query: Option<&str>,
    ) -> Result<(Vec<Contact>, usize), StoreError> {
        let needle = query.map(str::to_lowercase);
        let mut matched = 0usize;
        let mut rows = Vec::new();
        for item in self.contacts.iter() {
            let (_, value) = item?;
            let contact: Contact = Self::deserialize(&value)?;
            if let Some(ref q) = needle {
                if !contact.name.to_lowercase().contains(q.as_str()) {
                    continue;
                }
            }
            if matched >= offset && rows.len() < limit {
                rows.push(contact);
            }
            matched += 1;
        }
        Ok((rows, matched))
    }
}
