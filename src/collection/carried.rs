//! Fixed-capacity collection with reject or evict-oldest overflow.

use super::{CollectionError, ForeignCollection};
use crate::blueprints::BlueprintRoot;
use crate::codec::transport::{BlueprintList, TransportError};
use crate::core::BlueprintConfig;

/// What happens when adding to a full collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Refuse the new blueprint; the collection is unchanged
    Reject,
    /// Drop the oldest blueprint to make room
    EvictOldest,
}

/// Ordered, capacity-bounded list of blueprints, oldest first
#[derive(Debug, Clone, PartialEq)]
pub struct CarriedCollection {
    capacity: usize,
    policy: OverflowPolicy,
    items: Vec<BlueprintRoot>,
}

impl CarriedCollection {
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        Self {
            capacity,
            policy,
            items: Vec::new(),
        }
    }

    /// A player's own collection
    pub fn owned(config: &BlueprintConfig) -> Self {
        Self::new(config.owned_capacity, OverflowPolicy::Reject)
    }

    /// A shared kiosk-like collection
    pub fn shared(config: &BlueprintConfig) -> Self {
        Self::new(config.shared_capacity, OverflowPolicy::EvictOldest)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn get(&self, name: &str) -> Option<&BlueprintRoot> {
        self.items.iter().find(|b| b.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlueprintRoot> {
        self.items.iter()
    }

    /// Serialize for carrying in an item or sending to a peer
    pub fn to_blob(&self) -> Vec<u8> {
        crate::codec::transport::pack(&self.items)
    }

    /// Rebuild from a blob; entries that no longer fit or fail validation
    /// are logged and dropped
    pub fn from_blob(
        blob: &[u8],
        capacity: usize,
        policy: OverflowPolicy,
    ) -> Result<Self, TransportError> {
        let BlueprintList(roots) = BlueprintList::from_blob(blob)?;
        let mut collection = Self::new(capacity, policy);
        for root in roots {
            let name = root.name.clone();
            match collection.add(root) {
                Ok(Some(evicted)) => {
                    tracing::warn!("Dropped '{}' restoring collection", evicted.name)
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("Dropped '{}' restoring collection: {}", name, e),
            }
        }
        Ok(collection)
    }
}

impl ForeignCollection for CarriedCollection {
    fn add(&mut self, blueprint: BlueprintRoot) -> Result<Option<BlueprintRoot>, CollectionError> {
        blueprint.validate()?;
        if self.capacity == 0 {
            return Err(CollectionError::Full(0));
        }

        let evicted = if self.is_full() {
            match self.policy {
                OverflowPolicy::Reject => return Err(CollectionError::Full(self.capacity)),
                OverflowPolicy::EvictOldest => Some(self.items.remove(0)),
            }
        } else {
            None
        };
        if let Some(old) = &evicted {
            tracing::debug!("Evicted '{}' to make room for '{}'", old.name, blueprint.name);
        }
        self.items.push(blueprint);
        Ok(evicted)
    }

    fn delete(&mut self, name: &str) -> Option<BlueprintRoot> {
        let index = self.items.iter().position(|b| b.name == name)?;
        Some(self.items.remove(index))
    }

    fn blueprints(&self) -> &[BlueprintRoot] {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprints::{BlueprintObject, ValidationError};
    use glam::Vec3;

    fn make_blueprint(name: &str) -> BlueprintRoot {
        let mut root = BlueprintRoot::new(name);
        root.objects
            .push(BlueprintObject::new("wood_wall", Vec3::ZERO, Vec3::ZERO));
        root
    }

    fn fill(collection: &mut CarriedCollection, count: usize) {
        for i in 0..count {
            collection.add(make_blueprint(&format!("bp{}", i))).unwrap();
        }
    }

    #[test]
    fn test_full_owned_collection_rejects() {
        let mut owned = CarriedCollection::owned(&BlueprintConfig::default());
        fill(&mut owned, 3);
        let before = owned.clone();

        let result = owned.add(make_blueprint("fourth"));

        assert_eq!(result, Err(CollectionError::Full(3)));
        assert_eq!(owned, before);
    }

    #[test]
    fn test_shared_collection_with_room_accepts() {
        let mut shared = CarriedCollection::shared(&BlueprintConfig::default());
        fill(&mut shared, 3);

        assert_eq!(shared.add(make_blueprint("fourth")), Ok(None));
        assert_eq!(shared.len(), 4);
    }

    #[test]
    fn test_full_shared_collection_evicts_oldest() {
        let mut shared = CarriedCollection::new(2, OverflowPolicy::EvictOldest);
        fill(&mut shared, 2);

        let evicted = shared.add(make_blueprint("newest")).unwrap();

        assert_eq!(evicted.map(|b| b.name), Some("bp0".to_string()));
        let names: Vec<&str> = shared.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["bp1", "newest"]);
    }

    #[test]
    fn test_invalid_blueprint_never_enters() {
        let mut owned = CarriedCollection::owned(&BlueprintConfig::default());
        let result = owned.add(BlueprintRoot::new("hollow"));
        assert!(matches!(
            result,
            Err(CollectionError::Invalid(ValidationError::NoObjects(_)))
        ));
        assert!(owned.is_empty());
    }

    #[test]
    fn test_delete_by_name() {
        let mut owned = CarriedCollection::owned(&BlueprintConfig::default());
        fill(&mut owned, 2);

        assert_eq!(owned.delete("bp0").map(|b| b.name), Some("bp0".to_string()));
        assert!(owned.delete("bp0").is_none());
        assert_eq!(owned.len(), 1);
    }

    #[test]
    fn test_blob_restore_respects_capacity() {
        let mut shared = CarriedCollection::shared(&BlueprintConfig::default());
        fill(&mut shared, 3);
        let blob = shared.to_blob();

        let restored = CarriedCollection::from_blob(&blob, 2, OverflowPolicy::Reject).unwrap();

        let names: Vec<&str> = restored.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["bp0", "bp1"]);
    }
}
