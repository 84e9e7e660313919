pub mod components;
pub mod shim;

use async_trait::async_trait;
use thiserror::Error;

use crate::diagnostics::Diagnostics;
use crate::resource::InstanceInfo;
use crate::schema::{ProviderSchema, ProviderSchemaRequest};
use crate::terraform::{InstanceDiff, InstanceState};

pub use components::{BasicComponentFactory, ComponentFactory};
pub use shim::LegacyResourceConfig;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("unknown provisioner: {0}")]
    UnknownProvisioner(String),
    #[error("provider call failed: {0}")]
    Call(String),
    #[error("configuration rejected: {0}")]
    Configure(String),
    #[error("close failed: {0}")]
    Close(String),
}

/// A failed apply. `state` is what the provider left behind before failing,
/// when it knows; `None` means the prior state still holds.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct ApplyError {
    pub state: Option<InstanceState>,
    #[source]
    pub source: ProviderError,
}

impl ApplyError {
    pub fn partial(state: InstanceState, source: ProviderError) -> Self {
        Self {
            state: Some(state),
            source,
        }
    }
}

impl From<ProviderError> for ApplyError {
    fn from(source: ProviderError) -> Self {
        Self { state: None, source }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceType {
    pub name: String,
    pub importable: bool,
}

impl ResourceType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            importable: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSource {
    pub name: String,
}

/// A plugin that manages one family of resource types.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    async fn get_schema(&self, req: &ProviderSchemaRequest) -> Result<ProviderSchema, ProviderError>;

    async fn validate(&self, _config: &LegacyResourceConfig) -> Diagnostics {
        Diagnostics::new()
    }

    async fn configure(&self, config: &LegacyResourceConfig) -> Result<(), ProviderError>;

    fn resources(&self) -> Vec<ResourceType>;

    fn data_sources(&self) -> Vec<DataSource>;

    /// Reads the remote object. `None` means it no longer exists.
    async fn refresh(
        &self,
        info: &InstanceInfo,
        state: &InstanceState,
    ) -> Result<Option<InstanceState>, ProviderError>;

    /// Applies a diff. `None` (or a state without an id) means the object
    /// was destroyed.
    async fn apply(
        &self,
        info: &InstanceInfo,
        state: Option<&InstanceState>,
        diff: &InstanceDiff,
    ) -> Result<Option<InstanceState>, ApplyError>;

    /// Providers holding a connection expose it here so it can be closed.
    fn as_closer(&self) -> Option<&dyn ResourceProviderCloser> {
        None
    }
}

#[async_trait]
pub trait ResourceProviderCloser: Send + Sync {
    async fn close(&self) -> Result<(), ProviderError>;
}

/// An opaque provisioner handle. Running provisioners is not done here.
pub trait ResourceProvisioner: Send + Sync {
    fn as_closer(&self) -> Option<&dyn ResourceProvisionerCloser> {
        None
    }
}

#[async_trait]
pub trait ResourceProvisionerCloser: Send + Sync {
    async fn close(&self) -> Result<(), ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_error_display() {
        let err = ProviderError::Call("connection reset".to_string());
        assert_eq!(err.to_string(), "provider call failed: connection reset");
    }

    #[test]
    fn test_unknown_provider_display() {
        let err = ProviderError::UnknownProvider("aws".to_string());
        assert_eq!(err.to_string(), "unknown provider: aws");
    }

    #[test]
    fn test_apply_error_from_call_failure_has_no_state() {
        let err: ApplyError = ProviderError::Call("timeout".to_string()).into();
        assert!(err.state.is_none());
        assert_eq!(err.to_string(), "provider call failed: timeout");
    }

    #[test]
    fn test_partial_apply_error_keeps_state() {
        let err = ApplyError::partial(
            InstanceState::new("i-half"),
            ProviderError::Call("volume still attached".to_string()),
        );
        assert_eq!(err.state.map(|s| s.id).as_deref(), Some("i-half"));
    }

    #[test]
    fn test_resource_type_defaults_not_importable() {
        let rt = ResourceType::new("aws_instance");
        assert_eq!(rt.name, "aws_instance");
        assert!(!rt.importable);
    }
}
