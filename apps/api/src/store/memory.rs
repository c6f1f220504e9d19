use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::{Map, Value};

use crate::models::employee::{EmployeeRecord, ProfilePicPatch, UpsertOutcome};
use crate::models::user::UserCredential;
use crate::store::{CredentialStore, RecordStore, StoreError};

/// Process-local store. Used when no database is configured, and in tests.
/// Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: DashMap<String, UserCredential>,
    employees: DashMap<i64, EmployeeRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserCredential>, StoreError> {
        Ok(self.users.get(email).map(|entry| entry.value().clone()))
    }

    async fn insert(&self, credential: UserCredential) -> Result<(), StoreError> {
        match self.users.entry(credential.email.clone()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate),
            Entry::Vacant(slot) => {
                slot.insert(credential);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find_all(&self) -> Result<Vec<EmployeeRecord>, StoreError> {
        let mut records: Vec<EmployeeRecord> = self
            .employees
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by_key(|r| r.employee_number);
        Ok(records)
    }

    async fn upsert_attributes(
        &self,
        employee_number: i64,
        attributes: Map<String, Value>,
    ) -> Result<UpsertOutcome, StoreError> {
        match self.employees.entry(employee_number) {
            Entry::Occupied(mut existing) => {
                existing.get_mut().attributes.extend(attributes);
                Ok(UpsertOutcome::Matched)
            }
            Entry::Vacant(slot) => {
                let mut record = EmployeeRecord::new(employee_number);
                record.attributes = attributes;
                slot.insert(record);
                Ok(UpsertOutcome::Created)
            }
        }
    }

    async fn upsert_profile_pic(
        &self,
        employee_number: i64,
        patch: &ProfilePicPatch,
        create_if_missing: bool,
    ) -> Result<UpsertOutcome, StoreError> {
        match self.employees.entry(employee_number) {
            Entry::Occupied(mut existing) => {
                existing.get_mut().apply(patch);
                Ok(UpsertOutcome::Matched)
            }
            Entry::Vacant(slot) if create_if_missing => {
                let mut record = EmployeeRecord::new(employee_number);
                record.apply(patch);
                slot.insert(record);
                Ok(UpsertOutcome::Created)
            }
            Entry::Vacant(_) => Ok(UpsertOutcome::NotFound),
        }
    }
}
