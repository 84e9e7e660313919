//! Graph vertices and the capabilities transforms and the walker look for.
//!
//! Each capability is a small trait implemented only by the vertex kinds
//! that have it. [`Vertex`] is the closed set of kinds a [`Graph`] holds;
//! its `as_*` accessors answer "does this vertex have capability X".
//!
//! [`Graph`]: crate::graph::Graph

mod deposed;
mod instance;
mod orphan;
mod provider;
mod resource;

use std::fmt;
use std::sync::Arc;

use crate::addrs::{
    AbsProviderConfig, AbsResource, AbsResourceInstance, ModuleInstance, Reference, Referenceable,
};
use crate::configs::ResourceConfig;
use crate::diagnostics::Diagnostics;
use crate::eval::EvalNode;
use crate::schema::Block;
use crate::terraform::ResourceState;

pub use deposed::NodeDeposedResourceInstance;
pub use instance::NodeAbstractResourceInstance;
pub use orphan::NodeResourceInstanceOrphan;
pub use provider::{NodeApplyableProvider, NodeCloseProvider, close_provider_eval_tree, provider_eval_tree};
pub use resource::NodeAbstractResource;

/// Vertices that live inside a specific module.
pub trait SubPath {
    fn path(&self) -> &ModuleInstance;
}

pub trait ResourceNode {
    fn resource_addr(&self) -> AbsResource;
}

pub trait ResourceInstanceNode {
    fn resource_instance_addr(&self) -> AbsResourceInstance;
}

/// Addresses other vertices may use to refer to this one.
pub trait ReferenceableNode {
    fn referenceable_addrs(&self) -> Vec<Referenceable>;
}

/// Addresses this vertex depends on.
pub trait ReferencerNode {
    fn references(&self) -> Vec<Reference>;
}

/// The provider a vertex wants. `exact` means no other configuration may
/// stand in for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvidedBy {
    pub addr: AbsProviderConfig,
    pub exact: bool,
    pub diagnostics: Diagnostics,
}

impl ProvidedBy {
    pub fn exact(addr: AbsProviderConfig) -> Self {
        Self {
            addr,
            exact: true,
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn guess(addr: AbsProviderConfig) -> Self {
        Self {
            addr,
            exact: false,
            diagnostics: Diagnostics::new(),
        }
    }
}

pub trait ProviderConsumer {
    fn provided_by(&self) -> ProvidedBy;
    fn set_provider(&mut self, addr: AbsProviderConfig);
}

pub trait ProvisionerConsumer {
    fn provisioned_by(&self) -> Vec<String>;
}

pub trait AttachResourceConfig: ResourceNode {
    fn attach_resource_config(&mut self, config: Arc<ResourceConfig>);
}

/// Vertices that resolve their configuration against the resource type's schema.
pub trait AttachResourceSchema: ResourceNode {
    /// Provider type whose schema describes this resource.
    fn provider_type(&self) -> String;
    fn attach_resource_schema(&mut self, schema: Arc<Block>);
}

pub trait AttachResourceState: ResourceInstanceNode {
    fn attach_resource_state(&mut self, state: ResourceState);
}

pub trait Targetable {
    fn set_targets(&mut self, targets: Vec<AbsResource>);
}

/// Vertices that contribute work to a walk.
pub trait Evalable {
    fn eval_tree(&self) -> EvalNode;
}

#[derive(Debug, Clone)]
pub enum Vertex {
    Resource(NodeAbstractResource),
    ResourceInstance(NodeAbstractResourceInstance),
    Orphan(NodeResourceInstanceOrphan),
    Deposed(NodeDeposedResourceInstance),
    Provider(NodeApplyableProvider),
    CloseProvider(NodeCloseProvider),
}

impl Vertex {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Resource(_) => "resource",
            Self::ResourceInstance(_) => "instance",
            Self::Orphan(_) => "orphan",
            Self::Deposed(_) => "deposed",
            Self::Provider(_) => "provider",
            Self::CloseProvider(_) => "close-provider",
        }
    }

    pub fn name(&self) -> String {
        self.to_string()
    }

    pub fn path(&self) -> &ModuleInstance {
        match self {
            Self::Resource(n) => n.path(),
            Self::ResourceInstance(n) => n.path(),
            Self::Orphan(n) => n.path(),
            Self::Deposed(n) => n.path(),
            Self::Provider(n) => n.path(),
            Self::CloseProvider(n) => n.path(),
        }
    }

    pub fn as_referenceable(&self) -> Option<&dyn ReferenceableNode> {
        match self {
            Self::Resource(n) => Some(n),
            Self::ResourceInstance(n) => Some(n),
            Self::Orphan(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_referencer(&self) -> Option<&dyn ReferencerNode> {
        match self {
            Self::Resource(n) => Some(n),
            Self::ResourceInstance(n) => Some(n),
            Self::Orphan(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_provider_consumer(&self) -> Option<&dyn ProviderConsumer> {
        match self {
            Self::Resource(n) => Some(n),
            Self::ResourceInstance(n) => Some(n),
            Self::Orphan(n) => Some(n),
            Self::Deposed(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_provider_consumer_mut(&mut self) -> Option<&mut dyn ProviderConsumer> {
        match self {
            Self::Resource(n) => Some(n),
            Self::ResourceInstance(n) => Some(n),
            Self::Orphan(n) => Some(n),
            Self::Deposed(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_provisioner_consumer(&self) -> Option<&dyn ProvisionerConsumer> {
        match self {
            Self::Resource(n) => Some(n),
            Self::ResourceInstance(n) => Some(n),
            Self::Orphan(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_attach_config_mut(&mut self) -> Option<&mut dyn AttachResourceConfig> {
        match self {
            Self::Resource(n) => Some(n),
            Self::ResourceInstance(n) => Some(n),
            Self::Orphan(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_attach_schema_mut(&mut self) -> Option<&mut dyn AttachResourceSchema> {
        match self {
            Self::Resource(n) => Some(n),
            Self::ResourceInstance(n) => Some(n),
            Self::Orphan(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_attach_state_mut(&mut self) -> Option<&mut dyn AttachResourceState> {
        match self {
            Self::ResourceInstance(n) => Some(n),
            Self::Orphan(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_targetable_mut(&mut self) -> Option<&mut dyn Targetable> {
        match self {
            Self::Resource(n) => Some(n),
            Self::ResourceInstance(n) => Some(n),
            Self::Orphan(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_evalable(&self) -> Option<&dyn Evalable> {
        match self {
            Self::Orphan(n) => Some(n),
            Self::Deposed(n) => Some(n),
            Self::Provider(n) => Some(n),
            Self::CloseProvider(n) => Some(n),
            _ => None,
        }
    }
}

impl fmt::Display for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resource(n) => n.fmt(f),
            Self::ResourceInstance(n) => n.fmt(f),
            Self::Orphan(n) => n.fmt(f),
            Self::Deposed(n) => n.fmt(f),
            Self::Provider(n) => n.fmt(f),
            Self::CloseProvider(n) => n.fmt(f),
        }
    }
}

macro_rules! impl_from_node {
    ($($variant:ident => $node:ty),* $(,)?) => {
        $(
            impl From<$node> for Vertex {
                fn from(node: $node) -> Self {
                    Self::$variant(node)
                }
            }
        )*
    };
}

impl_from_node! {
    Resource => NodeAbstractResource,
    ResourceInstance => NodeAbstractResourceInstance,
    Orphan => NodeResourceInstanceOrphan,
    Deposed => NodeDeposedResourceInstance,
    Provider => NodeApplyableProvider,
    CloseProvider => NodeCloseProvider,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addrs::{InstanceKey, ProviderConfig, Resource};

    fn instance() -> NodeAbstractResourceInstance {
        NodeAbstractResourceInstance::new(
            Resource::managed("aws_instance", "web")
                .instance(InstanceKey::Int(0))
                .absolute(ModuleInstance::root()),
        )
    }

    #[test]
    fn test_capabilities_per_kind() {
        let mut resource: Vertex = NodeAbstractResource::new(
            Resource::managed("aws_instance", "web").absolute(ModuleInstance::root()),
        )
        .into();
        assert!(resource.as_referencer().is_some());
        assert!(resource.as_attach_config_mut().is_some());
        assert!(resource.as_attach_state_mut().is_none());
        assert!(resource.as_evalable().is_none());

        let mut orphan: Vertex = NodeResourceInstanceOrphan::new(instance()).into();
        assert!(orphan.as_referenceable().is_some());
        assert!(orphan.as_attach_state_mut().is_some());
        assert!(orphan.as_evalable().is_some());

        let mut deposed: Vertex = NodeDeposedResourceInstance::new(
            instance().addr(),
            0,
            ProviderConfig::new("aws").absolute(ModuleInstance::root()),
        )
        .into();
        assert!(deposed.as_provider_consumer().is_some_and(|p| p.provided_by().exact));
        assert!(deposed.as_referencer().is_none());
        assert!(deposed.as_attach_config_mut().is_none());
        assert!(deposed.as_evalable().is_some());

        let provider: Vertex =
            NodeApplyableProvider::new(ProviderConfig::new("aws").absolute(ModuleInstance::root()), None)
                .into();
        assert!(provider.as_provider_consumer().is_none());
        assert!(provider.as_evalable().is_some());
    }

    #[test]
    fn test_vertex_names() {
        let root = ModuleInstance::root();
        let aws = ProviderConfig::new("aws").absolute(root.clone());
        let names: Vec<String> = vec![
            Vertex::from(NodeAbstractResource::new(
                Resource::managed("aws_instance", "foo").absolute(root.clone()),
            )),
            Vertex::from(NodeResourceInstanceOrphan::new(NodeAbstractResourceInstance::new(
                Resource::managed("aws_instance", "foo")
                    .instance(InstanceKey::Int(0))
                    .absolute(root.clone()),
            ))),
            Vertex::from(NodeDeposedResourceInstance::new(
                Resource::managed("aws_instance", "foo")
                    .instance(InstanceKey::NoKey)
                    .absolute(root.clone()),
                0,
                aws.clone(),
            )),
            Vertex::from(NodeApplyableProvider::new(aws.clone(), None)),
            Vertex::from(NodeCloseProvider::new(aws)),
        ]
        .iter()
        .map(Vertex::name)
        .collect();

        assert_eq!(
            names,
            vec![
                "aws_instance.foo",
                "aws_instance.foo[0] (orphan)",
                "aws_instance.foo (deposed #0)",
                "provider.aws",
                "provider.aws (close)",
            ]
        );
    }

    #[test]
    fn test_vertex_path() {
        let path = ModuleInstance::root().child("net", InstanceKey::NoKey);
        let v = Vertex::from(NodeAbstractResource::new(
            Resource::managed("aws_vpc", "main").absolute(path.clone()),
        ));
        assert_eq!(v.path(), &path);
        assert_eq!(v.name(), "module.net.aws_vpc.main");
    }
}
