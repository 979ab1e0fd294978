//! The statically known set of migration descriptors.

use crate::descriptor::MigrationDescriptor;
use crate::error::{CoreError, CoreResult};
use crate::migration_id::MigrationId;
use std::collections::BTreeMap;

/// All known descriptors, indexed and ordered by id.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    descriptors: BTreeMap<MigrationId, MigrationDescriptor>,
}

impl Catalog {
    /// Index `descriptors` by id.
    ///
    /// Every descriptor is validated; two descriptors sharing an id fail with
    /// [`CoreError::DuplicateId`].
    pub fn new(descriptors: impl IntoIterator<Item = MigrationDescriptor>) -> CoreResult<Self> {
        let mut map: BTreeMap<MigrationId, MigrationDescriptor> = BTreeMap::new();
        for desc in descriptors {
            desc.validate()?;
            if let Some(existing) = map.get(&desc.id) {
                return Err(CoreError::DuplicateId {
                    id: desc.id.to_string(),
                    first: existing.name.clone(),
                    second: desc.name.clone(),
                });
            }
            map.insert(desc.id.clone(), desc);
        }
        Ok(Self { descriptors: map })
    }

    /// Descriptors in ascending id order.
    pub fn list(&self) -> impl DoubleEndedIterator<Item = &MigrationDescriptor> + '_ {
        self.descriptors.values()
    }

    /// Look up a descriptor by id.
    pub fn find(&self, id: &MigrationId) -> CoreResult<&MigrationDescriptor> {
        self.descriptors.get(id).ok_or_else(|| CoreError::NotFound {
            id: id.to_string(),
        })
    }

    /// True if a descriptor with `id` exists.
    pub fn contains(&self, id: &MigrationId) -> bool {
        self.descriptors.contains_key(id)
    }

    /// The greatest known id.
    pub fn latest(&self) -> Option<&MigrationId> {
        self.descriptors.keys().next_back()
    }

    /// Number of descriptors.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// True if the catalog holds no descriptors.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
