use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

/// Job-title hierarchy, highest first: admin > manager > asmen > gl > sales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Asmen,
    Gl,
    Sales,
}

impl Role {
    pub fn rank(self) -> u8 {
        match self {
            Role::Admin => 4,
            Role::Manager => 3,
            Role::Asmen => 2,
            Role::Gl => 1,
            Role::Sales => 0,
        }
    }

    pub fn at_least(self, min: Role) -> bool {
        self.rank() >= min.rank()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Store {
    pub fn create_user(&self, user: &User) -> Result<(), StoreError> {
        let email_key = keys::user_email_index_key(&user.email);

        // CAS on the email index so two concurrent creates with the same
        // email cannot both pass an existence check.
        let cas_result = self
            .users
            .compare_and_swap(
                email_key.as_bytes(),
                None::<&[u8]>,
                Some(user.id.as_bytes().to_vec()),
            )
            .map_err(StoreError::Sled)?;

        if cas_result.is_err() {
            return Err(StoreError::Conflict {
                entity: "user_email".to_string(),
                key: user.email.clone(),
            });
        }

        let user_key = keys::user_key(&user.id);
        let user_bytes = Self::serialize(user)?;
        if let Err(e) = self.users.insert(user_key.as_bytes(), user_bytes) {
            let _ = self.users.remove(email_key.as_bytes());
            return Err(StoreError::Sled(e));
        }

        Ok(())
    }

    pub fn get_user_by_id(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        let key = keys::user_key(user_id);
        match self.users.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let index_key = keys::user_email_index_key(email);
        let Some(user_id_raw) = self.users.get(index_key.as_bytes())? else {
            return Ok(None);
        };
        let user_id = match String::from_utf8(user_id_raw.to_vec()) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(error = %e, "Invalid UTF-8 in user email index");
                return Ok(None);
            }
        };
        self.get_user_by_id(&user_id)
    }

    pub fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let existing = self
            .get_user_by_id(&user.id)?
            .ok_or_else(|| StoreError::NotFound {
                entity: "user".to_string(),
                key: user.id.clone(),
            })?;

        let user_bytes = Self::serialize(user)?;
        let user_key = keys::user_key(&user.id);

        if existing.email.to_lowercase() != user.email.to_lowercase() {
            let old_email_key = keys::user_email_index_key(&existing.email);
            let new_email_key = keys::user_email_index_key(&user.email);
            let uid_bytes = user.id.as_bytes().to_vec();
            let ub = user_bytes.clone();
            let uk = user_key.clone();
            self.users
                .transaction(move |tx| {
                    if let Some(existing_uid) = tx.get(new_email_key.as_bytes())? {
                        if existing_uid.as_ref() != uid_bytes.as_slice() {
                            return sled::transaction::abort(());
                        }
                    }
                    tx.remove(old_email_key.as_bytes())?;
                    tx.insert(new_email_key.as_bytes(), uid_bytes.as_slice())?;
                    tx.insert(uk.as_bytes(), ub.as_slice())?;
                    Ok(())
                })
                .map_err(|e: sled::transaction::TransactionError<()>| match e {
                    sled::transaction::TransactionError::Abort(()) => StoreError::Conflict {
                        entity: "user_email".to_string(),
                        key: user.email.clone(),
                    },
                    sled::transaction::TransactionError::Storage(se) => StoreError::Sled(se),
                })?;
        } else {
            self.users.insert(user_key.as_bytes(), user_bytes)?;
        }

        Ok(())
    }

    pub fn delete_user(&self, user_id: &str) -> Result<(), StoreError> {
        let existing = self
            .get_user_by_id(user_id)?
            .ok_or_else(|| StoreError::NotFound {
                entity: "user".to_string(),
                key: user_id.to_string(),
            })?;

        let email_key = keys::user_email_index_key(&existing.email);
        let user_key = keys::user_key(user_id);
        self.users
            .transaction(move |tx| {
                tx.remove(user_key.as_bytes())?;
                tx.remove(email_key.as_bytes())?;
                Ok(())
            })
            .map_err(|e: sled::transaction::TransactionError<()>| match e {
                sled::transaction::TransactionError::Abort(()) => StoreError::Validation(
                    "delete aborted".to_string(),
                ),
                sled::transaction::TransactionError::Storage(se) => StoreError::Sled(se),
            })?;
        Ok(())
    }

    /// List user rows (index rows carry raw id bytes and are skipped).
    pub fn list_users(&self, limit: usize, offset: usize) -> Result<Vec<User>, StoreError> {
        let mut users = Vec::new();
        let mut skipped = 0usize;
        for item in self.users.iter() {
            let (key, value) = item?;
            if key.starts_with(b"email:") {
                continue;
            }
            if skipped < offset {
                skipped += 1;
                continue;
            }
            users.push(Self::deserialize::<User>(&value)?);
            if users.len() >= limit {
                break;
            }
        }
        Ok(users)
    }

    pub fn count_users(&self) -> Result<usize, StoreError> {
        let mut count = 0usize;
        for item in self.users.iter() {
            let (key, _) = item?;
            if !key.starts_with(b"email:") {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Candidate set for bulk KPI runs: every user who has ever been assigned
    /// an activity or has ever created a deal. Inactive or unrelated accounts
    /// never enter a bulk run.
    pub fn find_kpi_candidate_ids(&self) -> Result<BTreeSet<String>, StoreError> {
        let mut ids = BTreeSet::new();

        for item in self.activity_ids.iter() {
            let (_, assignee) = item?;
            ids.insert(String::from_utf8_lossy(&assignee).into_owned());
        }

        for item in self.deals.iter() {
            let (_, value) = item?;
            let deal: super::deals::Deal = Self::deserialize(&value)?;
            ids.insert(deal.created_by);
        }

        Ok(ids)
    }

    /// Seed the very first admin account. A no-op once any user row exists,
    /// so restarts never reintroduce the account after it is renamed or
    /// removed.
    pub fn bootstrap_admin(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<Option<User>, StoreError> {
        if self.count_users()? > 0 {
            return Ok(None);
        }

        let now = Utc::now();
        let admin = User {
            id: uuid::Uuid::new_v4().to_string(),
            name: "Administrator".to_string(),
            email: email.to_lowercase(),
            password_hash: password_hash.to_string(),
            role: Role::Admin,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.create_user(&admin)?;
        Ok(Some(admin))
    }
}
