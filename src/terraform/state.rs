//! Persisted state in the legacy layout.
//!
//! Resources are keyed per module by their legacy state key
//! (`aws_instance.web.0`). Each resource carries its current instance and the
//! prior instances deposed by create-before-destroy, along with the provider
//! that owns it and its flattened dependency strings.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::addrs::{AbsProviderConfig, AddrError, ModuleInstance};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceState {
    pub id: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, Value>,
    #[serde(default)]
    pub tainted: bool,
}

impl InstanceState {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// An instance without an id does not exist remotely.
    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, rename = "depends_on")]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub primary: Option<InstanceState>,
    /// Emptied entries stay in place until [`State::prune`] so that the
    /// indices of their siblings don't shift mid-walk.
    #[serde(default)]
    pub deposed: Vec<Option<InstanceState>>,
    #[serde(default)]
    pub provider: String,
}

impl ResourceState {
    pub fn new(type_name: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            provider: provider.into(),
            ..Self::default()
        }
    }

    pub fn provider_addr(&self) -> Result<AbsProviderConfig, AddrError> {
        AbsProviderConfig::parse(&self.provider)
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_none() && self.deposed.iter().all(Option::is_none)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleState {
    pub path: ModuleInstance,
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceState>,
}

impl ModuleState {
    pub fn new(path: ModuleInstance) -> Self {
        Self {
            path,
            resources: BTreeMap::new(),
        }
    }

    /// Resources whose key is `prefix` itself or an instance of it.
    pub fn view<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a String, &'a ResourceState)> {
        self.resources.iter().filter(move |(key, _)| {
            key.as_str() == prefix
                || key
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }
}

fn current_version() -> u32 {
    3
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    #[serde(default = "current_version")]
    pub version: u32,
    #[serde(default)]
    pub serial: u64,
    #[serde(default)]
    pub modules: Vec<ModuleState>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            version: current_version(),
            serial: 0,
            modules: Vec::new(),
        }
    }
}

impl State {
    pub fn module_by_path(&self, path: &ModuleInstance) -> Option<&ModuleState> {
        self.modules.iter().find(|m| &m.path == path)
    }

    pub fn module_by_path_mut(&mut self, path: &ModuleInstance) -> Option<&mut ModuleState> {
        self.modules.iter_mut().find(|m| &m.path == path)
    }

    /// Returns the module state for `path`, creating it if needed.
    pub fn add_module(&mut self, path: ModuleInstance) -> &mut ModuleState {
        let idx = match self.modules.iter().position(|m| m.path == path) {
            Some(idx) => idx,
            None => {
                self.modules.push(ModuleState::new(path));
                self.modules.len() - 1
            }
        };
        &mut self.modules[idx]
    }

    /// Drops emptied deposed entries (missing or without an id), resources
    /// with nothing left in them, and non-root modules without resources.
    pub fn prune(&mut self) {
        for module in &mut self.modules {
            for rs in module.resources.values_mut() {
                rs.deposed.retain(|d| d.as_ref().is_some_and(|s| !s.is_empty()));
                if rs.primary.as_ref().is_some_and(InstanceState::is_empty) {
                    rs.primary = None;
                }
            }
            module.resources.retain(|_, rs| !rs.is_empty());
        }
        self.modules
            .retain(|m| m.path.is_root() || !m.resources.is_empty());
    }
}
