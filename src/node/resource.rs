use std::fmt;
use std::sync::Arc;

use super::{
    AttachResourceConfig, AttachResourceSchema, ProvidedBy, ProviderConsumer, ProvisionerConsumer, ReferenceableNode,
    ReferencerNode, ResourceNode, SubPath, Targetable,
};
use crate::addrs::{AbsProviderConfig, AbsResource, ModuleInstance, Reference, Referenceable};
use crate::configs::ResourceConfig;
use crate::references::{config_references, dedupe_references, state_references};
use crate::schema::Block;

/// Shared payload of every resource vertex: the address plus whatever
/// transforms attached to it.
#[derive(Debug, Clone)]
pub struct NodeAbstractResource {
    pub addr: AbsResource,
    pub schema: Option<Arc<Block>>,
    pub config: Option<Arc<ResourceConfig>>,
    pub targets: Vec<AbsResource>,
    pub resolved_provider: Option<AbsProviderConfig>,
}

impl NodeAbstractResource {
    pub fn new(addr: AbsResource) -> Self {
        Self {
            addr,
            schema: None,
            config: None,
            targets: Vec::new(),
            resolved_provider: None,
        }
    }

    pub fn set_schema(&mut self, schema: Arc<Block>) {
        self.schema = Some(schema);
    }

    /// References from the attached configuration, or `None` when nothing
    /// is attached.
    pub(crate) fn config_references(&self, own: &[Referenceable]) -> Option<Vec<Reference>> {
        let config = self.config.as_ref()?;
        let refs = config_references(config, self.schema.as_deref());
        Some(dedupe_references(refs, own))
    }

    /// The provider the configuration asks for, or the default for the type.
    pub(crate) fn provider_guess(&self) -> AbsProviderConfig {
        let relative = match &self.config {
            Some(config) => config.provider_config_addr(),
            None => self.addr.resource.default_provider_config(),
        };
        relative.absolute(self.addr.module.clone())
    }

    /// The provider to evaluate with: the resolved one if set, else the guess.
    pub fn provider_addr(&self) -> AbsProviderConfig {
        self.resolved_provider
            .clone()
            .unwrap_or_else(|| self.provider_guess())
    }

    /// Legacy dependency strings to persist for this resource.
    pub fn state_references(&self) -> Vec<String> {
        legacy_state_references(&self.references(), &self.referenceable_addrs(), &self.addr)
    }
}

pub(crate) fn legacy_state_references(
    refs: &[Reference],
    own: &[Referenceable],
    addr: &AbsResource,
) -> Vec<String> {
    let names: Vec<String> = own.iter().map(Referenceable::legacy_string).collect();
    state_references(refs, &names, &format!("{}.", addr.resource))
}

impl SubPath for NodeAbstractResource {
    fn path(&self) -> &ModuleInstance {
        &self.addr.module
    }
}

impl ResourceNode for NodeAbstractResource {
    fn resource_addr(&self) -> AbsResource {
        self.addr.clone()
    }
}

impl ReferenceableNode for NodeAbstractResource {
    fn referenceable_addrs(&self) -> Vec<Referenceable> {
        vec![Referenceable::Resource(self.addr.resource.clone())]
    }
}

impl ReferencerNode for NodeAbstractResource {
    fn references(&self) -> Vec<Reference> {
        self.config_references(&self.referenceable_addrs())
            .unwrap_or_default()
    }
}

impl AttachResourceSchema for NodeAbstractResource {
    fn provider_type(&self) -> String {
        self.provider_addr().config.type_name
    }

    fn attach_resource_schema(&mut self, schema: Arc<Block>) {
        self.set_schema(schema);
    }
}

impl ProviderConsumer for NodeAbstractResource {
    fn provided_by(&self) -> ProvidedBy {
        ProvidedBy::guess(self.provider_guess())
    }

    fn set_provider(&mut self, addr: AbsProviderConfig) {
        self.resolved_provider = Some(addr);
    }
}

impl ProvisionerConsumer for NodeAbstractResource {
    fn provisioned_by(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .config
            .iter()
            .flat_map(|c| c.provisioners())
            .map(|p| p.type_name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

impl AttachResourceConfig for NodeAbstractResource {
    fn attach_resource_config(&mut self, config: Arc<ResourceConfig>) {
        self.config = Some(config);
    }
}

impl Targetable for NodeAbstractResource {
    fn set_targets(&mut self, targets: Vec<AbsResource>) {
        self.targets = targets;
    }
}

impl fmt::Display for NodeAbstractResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.addr)
    }
}
