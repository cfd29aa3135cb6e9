use std::collections::{BTreeMap, HashMap};

use asteroid_core::error::RegistryError;
use asteroid_core::types::Identity;

/// Registry of participating identities.
///
/// Keeps registration order so that graphs built from `list_all` get a
/// stable node order from one compile to the next.
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    identities: Vec<Identity>,
    index: HashMap<String, usize>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from an existing roster, rejecting duplicate ids.
    pub fn from_identities(
        identities: impl IntoIterator<Item = Identity>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for identity in identities {
            registry.insert(identity)?;
        }
        Ok(registry)
    }

    /// Register a new identity.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        role: impl Into<String>,
        attributes: BTreeMap<String, f64>,
    ) -> Result<(), RegistryError> {
        self.insert(Identity::new(id, role, attributes))
    }

    /// Register an already-built identity.
    pub fn insert(&mut self, identity: Identity) -> Result<(), RegistryError> {
        if self.index.contains_key(&identity.id) {
            return Err(RegistryError::DuplicateIdentifier(identity.id));
        }
        self.index.insert(identity.id.clone(), self.identities.len());
        self.identities.push(identity);
        Ok(())
    }

    /// Replace the attributes of a registered identity.
    pub fn update(
        &mut self,
        id: &str,
        attributes: BTreeMap<String, f64>,
    ) -> Result<(), RegistryError> {
        let slot = self
            .index
            .get(id)
            .copied()
            .ok_or_else(|| RegistryError::UnknownIdentifier(id.to_string()))?;
        self.identities[slot].attributes = attributes;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Identity> {
        self.index.get(id).map(|&i| self.identities[i].clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Snapshot of every identity, in registration order.
    pub fn list_all(&self) -> Vec<Identity> {
        self.identities.clone()
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = IdentityRegistry::new();
        registry
            .register("agent-1", "Veteran", attrs(&[("strength", 10.0)]))
            .unwrap();

        let identity = registry.get("agent-1").unwrap();
        assert_eq!(identity.role, "Veteran");
        assert_eq!(identity.attribute("strength"), Some(10.0));
        assert!(registry.get("agent-2").is_none());
    }

    #[test]
    fn test_duplicate_register_fails() {
        let mut registry = IdentityRegistry::new();
        registry.register("agent-1", "a", BTreeMap::new()).unwrap();
        let err = registry
            .register("agent-1", "b", BTreeMap::new())
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateIdentifier("agent-1".into()));
        assert_eq!(registry.get("agent-1").unwrap().role, "a");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_update_replaces_attributes() {
        let mut registry = IdentityRegistry::new();
        registry
            .register("agent-1", "a", attrs(&[("strength", 1.0), ("intelligence", 2.0)]))
            .unwrap();
        registry
            .update("agent-1", attrs(&[("strength", 7.0)]))
            .unwrap();

        let identity = registry.get("agent-1").unwrap();
        assert_eq!(identity.attribute("strength"), Some(7.0));
        assert_eq!(identity.attribute("intelligence"), None);
    }

    #[test]
    fn test_update_unknown_fails() {
        let mut registry = IdentityRegistry::new();
        let err = registry.update("ghost", BTreeMap::new()).unwrap_err();
        assert_eq!(err, RegistryError::UnknownIdentifier("ghost".into()));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_list_all_keeps_registration_order() {
        let mut registry = IdentityRegistry::new();
        for id in ["charlie", "alpha", "bravo"] {
            registry.register(id, "r", BTreeMap::new()).unwrap();
        }
        let first: Vec<_> = registry.list_all().into_iter().map(|i| i.id).collect();
        let second: Vec<_> = registry.list_all().into_iter().map(|i| i.id).collect();
        assert_eq!(first, vec!["charlie", "alpha", "bravo"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_list_all_is_a_snapshot() {
        let mut registry = IdentityRegistry::new();
        registry.register("a", "r", BTreeMap::new()).unwrap();
        let snapshot = registry.list_all();
        registry.register("b", "r", BTreeMap::new()).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_from_sample_roster() {
        let registry =
            IdentityRegistry::from_identities(asteroid_test_utils::sample_identities()).unwrap();
        assert_eq!(registry.len(), 3);
        assert!(registry.contains("agent-2"));
        assert_eq!(
            registry.get("agent-3").unwrap().attribute("survivalInstincts"),
            Some(9.0)
        );
    }

    #[test]
    fn test_from_identities_rejects_duplicates() {
        let err = IdentityRegistry::from_identities(vec![
            Identity::new("x", "r", BTreeMap::new()),
            Identity::new("x", "r", BTreeMap::new()),
        ])
        .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateIdentifier("x".into()));
    }
}
