//! Property persistence.
//!
//! The engine only needs atomic ownership-checked writes from the store;
//! [`InMemoryPropertyStore`] provides them under a single lock.

use crate::booking::types::{NewProperty, Property, PropertyId, PropertyUpdate};
use crate::error::{AuthorizationError, DependencyError, Result, ValidationError};
use crate::identity::WalletAddress;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Persistence collaborator for property records.
pub trait PropertyStore: Send + Sync {
    /// Fetch a property.
    ///
    /// # Errors
    ///
    /// `StoreUnavailable` if the store cannot be reached.
    fn get(&self, id: PropertyId) -> Result<Option<Property>>;

    /// Insert a new active listing owned by `owner`.
    ///
    /// # Errors
    ///
    /// `StoreUnavailable` if the store cannot be reached.
    fn insert(&self, owner: WalletAddress, listing: NewProperty) -> Result<Property>;

    /// Apply `update` iff `caller` owns the property, atomically.
    ///
    /// # Errors
    ///
    /// `PropertyNotFound`, `NotOwner` or `StoreUnavailable`.
    fn update_if_owner(
        &self,
        id: PropertyId,
        caller: &WalletAddress,
        update: &PropertyUpdate,
    ) -> Result<Property>;

    /// Delete the property iff `caller` owns it, atomically.
    ///
    /// # Errors
    ///
    /// `PropertyNotFound`, `NotOwner` or `StoreUnavailable`.
    fn delete_if_owner(&self, id: PropertyId, caller: &WalletAddress) -> Result<Property>;

    /// Properties owned by `owner` (empty when none).
    ///
    /// # Errors
    ///
    /// `StoreUnavailable` if the store cannot be reached.
    fn list_by_owner(&self, owner: &WalletAddress) -> Result<Vec<Property>>;
}

#[derive(Debug, Default)]
struct Records {
    next_id: PropertyId,
    properties: BTreeMap<PropertyId, Property>,
}

/// Property store held in memory.
#[derive(Debug, Default)]
pub struct InMemoryPropertyStore {
    records: RwLock<Records>,
    offline: AtomicBool,
}

impl InMemoryPropertyStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with `StoreUnavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(DependencyError::StoreUnavailable("in-memory store offline".into()).into());
        }
        Ok(())
    }
}

fn owned_mut<'a>(
    records: &'a mut Records,
    id: PropertyId,
    caller: &WalletAddress,
) -> Result<&'a mut Property> {
    let property = records
        .properties
        .get_mut(&id)
        .ok_or(ValidationError::PropertyNotFound(id))?;
    if property.owner != *caller {
        return Err(AuthorizationError::NotOwner.into());
    }
    Ok(property)
}

impl PropertyStore for InMemoryPropertyStore {
    fn get(&self, id: PropertyId) -> Result<Option<Property>> {
        self.ensure_online()?;
        Ok(self.records.read().properties.get(&id).cloned())
    }

    fn insert(&self, owner: WalletAddress, listing: NewProperty) -> Result<Property> {
        self.ensure_online()?;
        let mut records = self.records.write();
        records.next_id += 1;
        let property = Property {
            id: records.next_id,
            owner,
            price_per_night: listing.price_per_night,
            is_active: true,
        };
        records.properties.insert(property.id, property.clone());
        Ok(property)
    }

    fn update_if_owner(
        &self,
        id: PropertyId,
        caller: &WalletAddress,
        update: &PropertyUpdate,
    ) -> Result<Property> {
        self.ensure_online()?;
        let mut records = self.records.write();
        let property = owned_mut(&mut records, id, caller)?;
        if let Some(price) = update.price_per_night {
            property.price_per_night = price;
        }
        if let Some(active) = update.is_active {
            property.is_active = active;
        }
        Ok(property.clone())
    }

    fn delete_if_owner(&self, id: PropertyId, caller: &WalletAddress) -> Result<Property> {
        self.ensure_online()?;
        let mut records = self.records.write();
        owned_mut(&mut records, id, caller)?;
        records
            .properties
            .remove(&id)
            .ok_or_else(|| ValidationError::PropertyNotFound(id).into())
    }

    fn list_by_owner(&self, owner: &WalletAddress) -> Result<Vec<Property>> {
        self.ensure_online()?;
        Ok(self
            .records
            .read()
            .properties
            .values()
            .filter(|p| p.owner == *owner)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::booking::types::Money;
    use crate::error::Error;

    fn host() -> WalletAddress {
        WalletAddress::from_bytes([1; 20])
    }

    fn stranger() -> WalletAddress {
        WalletAddress::from_bytes([2; 20])
    }

    fn listing() -> NewProperty {
        NewProperty {
            price_per_night: Money::from_major(100).unwrap(),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let store = InMemoryPropertyStore::new();
        let a = store.insert(host(), listing()).unwrap();
        let b = store.insert(host(), listing()).unwrap();
        assert_ne!(a.id, b.id);
        assert!(a.is_active);
        assert_eq!(store.get(a.id).unwrap(), Some(a));
        assert_eq!(store.get(999).unwrap(), None);
    }

    #[test]
    fn test_update_requires_owner() {
        let store = InMemoryPropertyStore::new();
        let p = store.insert(host(), listing()).unwrap();
        let update = PropertyUpdate {
            price_per_night: Some(Money::from_major(120).unwrap()),
            is_active: Some(false),
        };

        let err = store.update_if_owner(p.id, &stranger(), &update).unwrap_err();
        assert!(matches!(err, Error::Authorization(AuthorizationError::NotOwner)));
        assert_eq!(store.get(p.id).unwrap().unwrap().price_per_night, p.price_per_night);

        let updated = store.update_if_owner(p.id, &host(), &update).unwrap();
        assert_eq!(updated.price_per_night, Money::from_major(120).unwrap());
        assert!(!updated.is_active);
    }

    #[test]
    fn test_delete_requires_owner() {
        let store = InMemoryPropertyStore::new();
        let p = store.insert(host(), listing()).unwrap();

        assert!(store.delete_if_owner(p.id, &stranger()).is_err());
        assert!(store.get(p.id).unwrap().is_some());

        store.delete_if_owner(p.id, &host()).unwrap();
        assert!(store.get(p.id).unwrap().is_none());
        assert!(matches!(
            store.delete_if_owner(p.id, &host()),
            Err(Error::Validation(ValidationError::PropertyNotFound(_)))
        ));
    }

    #[test]
    fn test_list_by_owner_empty_when_none() {
        let store = InMemoryPropertyStore::new();
        store.insert(host(), listing()).unwrap();
        assert_eq!(store.list_by_owner(&host()).unwrap().len(), 1);
        assert!(store.list_by_owner(&stranger()).unwrap().is_empty());
    }

    #[test]
    fn test_offline_store() {
        let store = InMemoryPropertyStore::new();
        store.set_offline(true);
        assert_eq!(store.get(1).unwrap_err().reason(), "STORE_UNAVAILABLE");
    }
}
