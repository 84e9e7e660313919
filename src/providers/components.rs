use std::collections::HashMap;
use std::sync::Arc;

use super::{ProviderError, ResourceProvider, ResourceProvisioner};

pub type ProviderFactory = Arc<dyn Fn() -> Result<Arc<dyn ResourceProvider>, ProviderError> + Send + Sync>;
pub type ProvisionerFactory =
    Arc<dyn Fn() -> Result<Arc<dyn ResourceProvisioner>, ProviderError> + Send + Sync>;

/// Creates provider and provisioner instances by type name.
pub trait ComponentFactory: Send + Sync {
    /// `uid` identifies the configuration the instance is created for.
    fn resource_provider(&self, type_name: &str, uid: &str) -> Result<Arc<dyn ResourceProvider>, ProviderError>;

    fn resource_provisioner(&self, name: &str, uid: &str) -> Result<Arc<dyn ResourceProvisioner>, ProviderError>;
}

#[derive(Clone, Default)]
pub struct BasicComponentFactory {
    providers: HashMap<String, ProviderFactory>,
    provisioners: HashMap<String, ProvisionerFactory>,
}

impl BasicComponentFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider<F>(mut self, type_name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn ResourceProvider>, ProviderError> + Send + Sync + 'static,
    {
        self.providers.insert(type_name.into(), Arc::new(factory));
        self
    }

    pub fn with_provisioner<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn ResourceProvisioner>, ProviderError> + Send + Sync + 'static,
    {
        self.provisioners.insert(name.into(), Arc::new(factory));
        self
    }

    pub fn provider_types(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl ComponentFactory for BasicComponentFactory {
    fn resource_provider(&self, type_name: &str, uid: &str) -> Result<Arc<dyn ResourceProvider>, ProviderError> {
        let factory = self
            .providers
            .get(type_name)
            .ok_or_else(|| ProviderError::UnknownProvider(type_name.to_string()))?;
        tracing::debug!(provider = type_name, uid, "creating provider instance");
        factory()
    }

    fn resource_provisioner(&self, name: &str, uid: &str) -> Result<Arc<dyn ResourceProvisioner>, ProviderError> {
        let factory = self
            .provisioners
            .get(name)
            .ok_or_else(|| ProviderError::UnknownProvisioner(name.to_string()))?;
        tracing::debug!(provisioner = name, uid, "creating provisioner instance");
        factory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LocalExec;

    impl ResourceProvisioner for LocalExec {}

    #[test]
    fn test_unknown_provider() {
        let factory = BasicComponentFactory::new();
        match factory.resource_provider("unknown", "provider.unknown") {
            Err(ProviderError::UnknownProvider(name)) => assert_eq!(name, "unknown"),
            _ => panic!("expected UnknownProvider error"),
        }
    }

    #[test]
    fn test_provisioner_lookup() {
        let factory = BasicComponentFactory::new().with_provisioner("local-exec", || {
            Ok(Arc::new(LocalExec) as Arc<dyn ResourceProvisioner>)
        });
        assert!(factory.resource_provisioner("local-exec", "root").is_ok());
        assert!(matches!(
            factory.resource_provisioner("remote-exec", "root"),
            Err(ProviderError::UnknownProvisioner(_))
        ));
    }

    #[test]
    fn test_factory_error_is_propagated() {
        let factory = BasicComponentFactory::new()
            .with_provider("aws", || Err(ProviderError::Call("plugin crashed".to_string())));
        assert_eq!(factory.provider_types(), vec!["aws"]);
        let err = factory.resource_provider("aws", "provider.aws").err().unwrap();
        assert!(err.to_string().contains("plugin crashed"));
    }
}
