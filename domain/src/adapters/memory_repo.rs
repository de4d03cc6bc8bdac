use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::{Mutex, MutexGuard};

use crate::{
    Company, CompanyFilter, CompanyRepository, CoreError, Ein, Filter, Owner, OwnerFilter,
    OwnerRepository, Ssn,
};

/// Keyed in-memory collection guarded by a single mutex.
///
/// Every operation takes the lock once, so check-then-insert and
/// read-modify-write sequences are atomic with respect to other callers.
/// Iteration (and therefore list order) follows ascending key order.
pub struct MemoryStore<K, V> {
    kind: &'static str,
    inner: Mutex<BTreeMap<K, V>>,
}

impl<K: Ord + Copy + Display, V: Clone> MemoryStore<K, V> {
    /// `kind` names the record type in error messages ("company", "owner").
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            inner: Mutex::new(BTreeMap::new()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<K, V>>, CoreError> {
        self.inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))
    }

    fn not_found(&self, key: &K) -> CoreError {
        CoreError::NotFound {
            kind: self.kind,
            key: key.to_string(),
        }
    }

    pub fn insert(&self, key: K, value: V) -> Result<V, CoreError> {
        let mut map = self.lock()?;
        if map.contains_key(&key) {
            return Err(CoreError::Conflict {
                kind: self.kind,
                key: key.to_string(),
            });
        }
        map.insert(key, value.clone());
        Ok(value)
    }

    pub fn get(&self, key: &K) -> Result<V, CoreError> {
        let map = self.lock()?;
        map.get(key).cloned().ok_or_else(|| self.not_found(key))
    }

    /// Apply `f` to the stored value and return the result.
    pub fn modify(&self, key: &K, f: &mut dyn FnMut(&mut V)) -> Result<V, CoreError> {
        let mut map = self.lock()?;
        match map.get_mut(key) {
            Some(value) => {
                f(value);
                Ok(value.clone())
            }
            None => Err(self.not_found(key)),
        }
    }

    pub fn remove(&self, key: &K) -> Result<V, CoreError> {
        let mut map = self.lock()?;
        map.remove(key).ok_or_else(|| self.not_found(key))
    }

    pub fn list<F: Filter<V>>(&self, filter: &F) -> Result<Vec<V>, CoreError> {
        let map = self.lock()?;
        if filter.is_empty() {
            return Ok(map.values().cloned().collect());
        }
        Ok(map.values().filter(|v| filter.matches(v)).cloned().collect())
    }
}

/// In-memory company repository keyed by EIN.
pub struct InMemoryCompanyRepo {
    store: MemoryStore<Ein, Company>,
}

/// In-memory owner repository keyed by SSN.
pub struct InMemoryOwnerRepo {
    store: MemoryStore<Ssn, Owner>,
}

impl InMemoryCompanyRepo {
    pub fn new() -> Self {
        Self {
            store: MemoryStore::new("company"),
        }
    }
}

impl Default for InMemoryCompanyRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl CompanyRepository for InMemoryCompanyRepo {
    fn insert(&self, company: Company) -> Result<Company, CoreError> {
        self.store.insert(company.ein, company)
    }

    fn get(&self, ein: &Ein) -> Result<Company, CoreError> {
        self.store.get(ein)
    }

    fn update(
        &self,
        ein: &Ein,
        apply: &mut dyn FnMut(&mut Company),
    ) -> Result<Company, CoreError> {
        self.store.modify(ein, apply)
    }

    fn delete(&self, ein: &Ein) -> Result<Company, CoreError> {
        self.store.remove(ein)
    }

    fn list(&self, filter: &CompanyFilter) -> Result<Vec<Company>, CoreError> {
        self.store.list(filter)
    }
}

// ============ InMemoryOwnerRepo ============

impl InMemoryOwnerRepo {
    pub fn new() -> Self {
        Self {
            store: MemoryStore::new("owner"),
        }
    }
}

impl Default for InMemoryOwnerRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl OwnerRepository for InMemoryOwnerRepo {
    fn insert(&self, owner: Owner) -> Result<Owner, CoreError> {
        self.store.insert(owner.ssn, owner)
    }

    fn get(&self, ssn: &Ssn) -> Result<Owner, CoreError> {
        self.store.get(ssn)
    }

    fn update(&self, ssn: &Ssn, apply: &mut dyn FnMut(&mut Owner)) -> Result<Owner, CoreError> {
        self.store.modify(ssn, apply)
    }

    fn delete(&self, ssn: &Ssn) -> Result<Owner, CoreError> {
        self.store.remove(ssn)
    }

    fn list(&self, filter: &OwnerFilter) -> Result<Vec<Owner>, CoreError> {
        self.store.list(filter)
    }
}
