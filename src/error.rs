use thiserror::Error;

use crate::addrs::AddrError;
use crate::diagnostics::Diagnostics;
use crate::graph::GraphError;
use crate::providers::ProviderError;

/// Everything an evaluation tree can surface to the walker.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("{0} is already initialized")]
    ProviderAlreadyInitialized(String),

    #[error("provisioner '{0}' already initialized")]
    ProvisionerAlreadyInitialized(String),

    #[error("provider {0} not initialized")]
    ProviderNotInitialized(String),

    #[error("provisioner '{0}' not initialized")]
    ProvisionerNotInitialized(String),

    #[error("error fetching schema for {addr}: {source}")]
    Schema {
        addr: String,
        #[source]
        source: ProviderError,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// An apply failure, prefixed with the instance it happened to.
    #[error("{id}: {source}")]
    Apply {
        id: String,
        #[source]
        source: ProviderError,
    },

    #[error("{id}: refresh failed: {source}")]
    Refresh {
        id: String,
        #[source]
        source: ProviderError,
    },

    #[error("{0}")]
    Diagnostics(Diagnostics),

    #[error(
        "{addr}: the plan would destroy this resource, but it currently has \
         lifecycle.prevent_destroy set to true; either disable prevent_destroy \
         or narrow the scope of the plan"
    )]
    PreventDestroy { addr: String },

    /// Raised when a hook asks to halt or the walk was stopped. Not a failure.
    #[error("early exit")]
    EarlyExit,

    #[error("evaluation slot '{0}' is empty")]
    EmptySlot(&'static str),

    #[error(transparent)]
    Addr(#[from] AddrError),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl EvalError {
    pub fn is_early_exit(&self) -> bool {
        matches!(self, Self::EarlyExit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostic;

    #[test]
    fn test_already_initialized_display() {
        let err = EvalError::ProviderAlreadyInitialized("provider.aws".to_string());
        assert_eq!(err.to_string(), "provider.aws is already initialized");
    }

    #[test]
    fn test_not_initialized_display() {
        let err = EvalError::ProviderNotInitialized("provider.aws".to_string());
        assert_eq!(err.to_string(), "provider provider.aws not initialized");
    }

    #[test]
    fn test_prevent_destroy_names_address() {
        let err = EvalError::PreventDestroy {
            addr: "aws_instance.b".to_string(),
        };
        assert!(err.to_string().starts_with("aws_instance.b: the plan would destroy"));
    }

    #[test]
    fn test_apply_error_prefixes_instance_id() {
        let err = EvalError::Apply {
            id: "aws_instance.web".to_string(),
            source: ProviderError::Call("timeout".to_string()),
        };
        assert_eq!(err.to_string(), "aws_instance.web: provider call failed: timeout");
    }

    #[test]
    fn test_early_exit_is_distinguished() {
        assert!(EvalError::EarlyExit.is_early_exit());
        assert!(!EvalError::EmptySlot("provider").is_early_exit());
    }

    #[test]
    fn test_diagnostics_error_display() {
        let err = EvalError::Diagnostics(Diagnostic::error("bad region").into());
        assert_eq!(err.to_string(), "error: bad region");
    }

    #[test]
    fn test_addr_error_from_conversion() {
        let addr_err = AddrError::InvalidProvider {
            input: "aws".to_string(),
            message: "missing provider part".to_string(),
        };
        let err: EvalError = addr_err.into();
        assert!(matches!(err, EvalError::Addr(_)));
        assert!(err.to_string().contains("invalid provider address"));
    }
}
