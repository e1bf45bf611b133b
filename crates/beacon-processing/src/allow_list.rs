use std::collections::HashSet;

use beacon_parser::identity::allow_list_uuid_key;
use beacon_repository::{AllowListStore, RepositoryError};

/// Service UUIDs accepted for one ingestion request. Never cached across
/// requests.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    uuids: HashSet<String>,
}

impl AllowList {
    pub async fn load<S>(store: &S) -> Result<Self, RepositoryError>
    where
        S: AllowListStore + ?Sized,
    {
        let uuids = store.load_allowed_uuids().await?;
        Ok(Self::from_uuids(uuids))
    }

    pub fn from_uuids<I, T>(uuids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let uuids = uuids
            .into_iter()
            .map(|uuid| allow_list_uuid_key(uuid.as_ref()))
            .filter(|uuid| !uuid.is_empty())
            .collect();
        Self { uuids }
    }

    pub fn contains(&self, uuid: &str) -> bool {
        self.uuids.contains(&allow_list_uuid_key(uuid))
    }

    pub fn len(&self) -> usize {
        self.uuids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uuids.is_empty()
    }
}
