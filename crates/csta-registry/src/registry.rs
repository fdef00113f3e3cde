//! The shared allocation table.

use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::{Allocation, RegistryError, Release, Resource, ResourceKind};

/// Directory number → resource, shared by every server connection.
///
/// Each operation holds the lock across its lookup and mutation, so two
/// sessions racing for the same number see exactly one `Granted`.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    resources: Mutex<HashMap<String, Resource>>,
}

impl ResourceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a resource under its directory number.
    pub async fn add(&self, resource: Resource) -> Result<(), RegistryError> {
        if resource.directory_number.is_empty() {
            return Err(RegistryError::EmptyKey);
        }

        let mut resources = self.resources.lock().await;
        if resources.contains_key(&resource.directory_number) {
            return Err(RegistryError::AlreadyExists(resource.directory_number));
        }
        tracing::debug!(
            dn = %resource.directory_number,
            kind = %resource.kind,
            device = %resource.device,
            "resource added"
        );
        resources.insert(resource.directory_number.clone(), resource);
        Ok(())
    }

    /// Adds a station on the given switch.
    pub async fn add_extension(
        &self,
        directory_number: &str,
        switch_name: &str,
        switch_address: &str,
    ) -> Result<(), RegistryError> {
        self.add(Resource::new(
            directory_number,
            ResourceKind::Extension,
            switch_name,
            switch_address,
        ))
        .await
    }

    /// Adds a vector directory number on the given switch.
    pub async fn add_vdn(
        &self,
        directory_number: &str,
        switch_name: &str,
        switch_address: &str,
    ) -> Result<(), RegistryError> {
        self.add(Resource::new(
            directory_number,
            ResourceKind::Vdn,
            switch_name,
            switch_address,
        ))
        .await
    }

    /// Tries to take the resource at `key` for a requester on the given
    /// switch. A match on either address or name is sufficient.
    ///
    /// The allocation has no owner; see [`Self::allocate_for`].
    pub async fn allocate(
        &self,
        key: &str,
        switch_address: Option<&str>,
        switch_name: Option<&str>,
    ) -> Allocation {
        self.grant(None, key, switch_address, switch_name).await
    }

    /// Like [`Self::allocate`], but records `owner` on a granted resource so
    /// it can later be freed with [`Self::release_owned_by`].
    pub async fn allocate_for(
        &self,
        owner: u64,
        key: &str,
        switch_address: Option<&str>,
        switch_name: Option<&str>,
    ) -> Allocation {
        self.grant(Some(owner), key, switch_address, switch_name).await
    }

    async fn grant(
        &self,
        owner: Option<u64>,
        key: &str,
        switch_address: Option<&str>,
        switch_name: Option<&str>,
    ) -> Allocation {
        let mut resources = self.resources.lock().await;
        let Some(resource) = resources.get_mut(key) else {
            return Allocation::NotFound;
        };

        if !resource.managed_by(switch_address, switch_name) {
            tracing::debug!(
                dn = key,
                requested_address = ?switch_address,
                requested_name = ?switch_name,
                "switch mismatch"
            );
            return Allocation::SwitchMismatch;
        }
        if resource.allocated {
            return Allocation::AlreadyAllocated;
        }

        resource.allocated = true;
        resource.owner = owner;
        tracing::info!(dn = key, device = %resource.device, ?owner, "resource allocated");
        Allocation::Granted(resource.device.clone())
    }

    /// Frees the resource carrying `device`.
    ///
    /// Releasing a resource that is already free still reports `Released`.
    pub async fn release(&self, device: &str) -> Release {
        let mut resources = self.resources.lock().await;
        match resources.values_mut().find(|r| r.device == device) {
            Some(resource) => {
                if resource.allocated {
                    resource.allocated = false;
                    resource.owner = None;
                    tracing::info!(dn = %resource.directory_number, device, "resource released");
                }
                Release::Released
            }
            None => Release::NotFound,
        }
    }

    /// Frees every resource currently allocated to `owner` and returns their
    /// device ids.
    ///
    /// A resource that was released and then granted to someone else is no
    /// longer owned by `owner` and stays allocated.
    pub async fn release_owned_by(&self, owner: u64) -> Vec<String> {
        let mut resources = self.resources.lock().await;
        let mut freed = Vec::new();
        for resource in resources.values_mut() {
            if resource.allocated && resource.owner == Some(owner) {
                resource.allocated = false;
                resource.owner = None;
                tracing::info!(
                    dn = %resource.directory_number,
                    device = %resource.device,
                    owner,
                    "resource released for owner"
                );
                freed.push(resource.device.clone());
            }
        }
        freed
    }

    /// A snapshot of the resource at `key`.
    pub async fn get(&self, key: &str) -> Option<Resource> {
        self.resources.lock().await.get(key).cloned()
    }

    /// Whether the resource at `key` is currently allocated.
    pub async fn is_allocated(&self, key: &str) -> bool {
        self.resources
            .lock()
            .await
            .get(key)
            .is_some_and(|r| r.allocated)
    }

    pub async fn len(&self) -> usize {
        self.resources.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.resources.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn registry_with(dn: &str) -> ResourceRegistry {
        let registry = ResourceRegistry::new();
        registry.add_extension(dn, "S1", "10.0.0.1").await.unwrap();
        registry
    }

    #[tokio::test]
    async fn test_allocate_unknown_key_is_not_found() {
        let registry = ResourceRegistry::new();
        assert_eq!(
            registry.allocate("1233", Some("10.0.0.1"), Some("S1")).await,
            Allocation::NotFound
        );
    }

    #[tokio::test]
    async fn test_allocate_foreign_switch_is_mismatch() {
        let registry = registry_with("1233").await;
        assert_eq!(
            registry.allocate("1233", Some("10.9.9.9"), Some("S2")).await,
            Allocation::SwitchMismatch
        );
        assert!(!registry.is_allocated("1233").await);
    }

    #[tokio::test]
    async fn test_allocate_twice_reports_already_allocated() {
        let registry = registry_with("1233").await;
        assert_eq!(
            registry.allocate("1233", None, Some("S1")).await,
            Allocation::Granted("1233:S1:10.0.0.1:0".into())
        );
        assert_eq!(
            registry.allocate("1233", Some("10.0.0.1"), None).await,
            Allocation::AlreadyAllocated
        );
    }

    #[tokio::test]
    async fn test_release_frees_and_is_idempotent() {
        let registry = registry_with("1233").await;
        registry.allocate("1233", None, Some("S1")).await;

        assert_eq!(registry.release("1233:S1:10.0.0.1:0").await, Release::Released);
        assert!(!registry.is_allocated("1233").await);
        assert_eq!(registry.release("1233:S1:10.0.0.1:0").await, Release::Released);
        assert_eq!(registry.release("9999:S1:10.0.0.1:0").await, Release::NotFound);
    }

    #[tokio::test]
    async fn test_release_owned_by_skips_reallocated_resources() {
        let registry = registry_with("1233").await;
        registry.add_extension("1234", "S1", "10.0.0.1").await.unwrap();

        assert!(registry.allocate_for(1, "1233", None, Some("S1")).await.is_granted());
        assert!(registry.allocate_for(1, "1234", None, Some("S1")).await.is_granted());
        assert_eq!(registry.get("1233").await.unwrap().owner, Some(1));

        // Someone else frees 1233 and owner 2 takes it.
        registry.release("1233:S1:10.0.0.1:0").await;
        assert_eq!(registry.get("1233").await.unwrap().owner, None);
        assert!(registry.allocate_for(2, "1233", None, Some("S1")).await.is_granted());

        assert_eq!(registry.release_owned_by(1).await, vec!["1234:S1:10.0.0.1:0".to_string()]);
        assert!(registry.is_allocated("1233").await);
        assert!(!registry.is_allocated("1234").await);
        assert_eq!(registry.get("1233").await.unwrap().owner, Some(2));
        assert!(registry.release_owned_by(1).await.is_empty());
    }

    #[tokio::test]
    async fn test_add_duplicate_key_fails() {
        let registry = registry_with("1233").await;
        let err = registry.add_vdn("1233", "S1", "10.0.0.1").await.unwrap_err();
        assert_eq!(err, RegistryError::AlreadyExists("1233".into()));
        assert_eq!(registry.get("1233").await.unwrap().kind, ResourceKind::Extension);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_add_empty_key_fails() {
        let registry = ResourceRegistry::new();
        let err = registry.add_extension("", "S1", "10.0.0.1").await.unwrap_err();
        assert_eq!(err, RegistryError::EmptyKey);
        assert!(registry.is_empty().await);
    }
}
