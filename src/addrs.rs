//! Addresses for modules, resources, providers and references.
//!
//! All address types are immutable values compared structurally. Their
//! `Display` output is the configuration-language syntax; the `legacy_*`
//! helpers produce the flat strings stored in persisted state.

mod module;
mod provider;
mod reference;
mod resource;
mod traversal;

pub use module::{ModuleInstance, ModuleInstanceStep};
pub use provider::{AbsProviderConfig, ProviderConfig};
pub use reference::{Reference, Referenceable};
pub use resource::{AbsResource, AbsResourceInstance, Resource, ResourceInstance, ResourceMode};
pub use traversal::{InstanceKey, Traversal, TraverseStep};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddrError {
    #[error("invalid syntax in {input:?}: {message}")]
    Syntax { input: String, message: String },

    #[error("invalid reference {input:?}: {message}")]
    InvalidReference { input: String, message: String },

    #[error("invalid provider address {input:?}: {message}")]
    InvalidProvider { input: String, message: String },

    #[error("invalid resource key {input:?}: {message}")]
    InvalidStateKey { input: String, message: String },
}
