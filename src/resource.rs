use serde::{Deserialize, Serialize};

use crate::addrs::{AbsResource, AbsResourceInstance};

/// Describes the resource instance a provider call or hook is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct InstanceInfo {
    /// Legacy state key, e.g. `aws_instance.web.0`.
    pub id: String,
    #[serde(rename = "type")]
    pub type_name: String,
    /// Legacy module path, always starting with `root`.
    pub module_path: Vec<String>,
}

impl InstanceInfo {
    pub fn new(addr: &AbsResourceInstance) -> Self {
        Self {
            id: addr.resource.state_key(),
            type_name: addr.resource.resource.type_name.clone(),
            module_path: addr.module.legacy_path(),
        }
    }

    pub fn for_resource(addr: &AbsResource) -> Self {
        Self::new(&addr.instance(Default::default()))
    }

    /// Human-readable address including the module prefix.
    pub fn human_id(&self) -> String {
        if self.module_path.len() <= 1 {
            return self.id.clone();
        }
        let prefix: Vec<String> = self.module_path[1..]
            .iter()
            .map(|name| format!("module.{name}"))
            .collect();
        format!("{}.{}", prefix.join("."), self.id)
    }
}
