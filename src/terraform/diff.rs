//! Planned changes, per module and per resource instance.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::addrs::ModuleInstance;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffChangeType {
    None,
    Create,
    Update,
    Destroy,
    DestroyCreate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrDiff {
    #[serde(default)]
    pub old: String,
    #[serde(default)]
    pub new: String,
    #[serde(default)]
    pub new_computed: bool,
    #[serde(default)]
    pub new_removed: bool,
    #[serde(default)]
    pub requires_new: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceDiff {
    #[serde(default)]
    pub attributes: BTreeMap<String, AttrDiff>,
    #[serde(default)]
    pub destroy: bool,
    #[serde(default)]
    pub destroy_deposed: bool,
    #[serde(default)]
    pub destroy_tainted: bool,
}

impl InstanceDiff {
    pub fn destroy() -> Self {
        Self {
            destroy: true,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.destroy && !self.destroy_deposed && !self.destroy_tainted && self.attributes.is_empty()
    }

    pub fn requires_new(&self) -> bool {
        self.attributes.values().any(|a| a.requires_new)
    }

    pub fn change_type(&self) -> DiffChangeType {
        if self.is_empty() {
            return DiffChangeType::None;
        }
        if self.requires_new() && (self.destroy || self.destroy_tainted) {
            return DiffChangeType::DestroyCreate;
        }
        if self.destroy || self.destroy_deposed {
            return DiffChangeType::Destroy;
        }
        if self.requires_new() {
            return DiffChangeType::Create;
        }
        DiffChangeType::Update
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDiff {
    pub path: ModuleInstance,
    #[serde(default)]
    pub resources: BTreeMap<String, InstanceDiff>,
    #[serde(default)]
    pub destroy: bool,
}

impl ModuleDiff {
    pub fn new(path: ModuleInstance) -> Self {
        Self {
            path,
            resources: BTreeMap::new(),
            destroy: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diff {
    #[serde(default)]
    pub modules: Vec<ModuleDiff>,
}

impl Diff {
    pub fn module_by_path(&self, path: &ModuleInstance) -> Option<&ModuleDiff> {
        self.modules.iter().find(|m| &m.path == path)
    }

    pub fn add_module(&mut self, path: ModuleInstance) -> &mut ModuleDiff {
        let idx = match self.modules.iter().position(|m| m.path == path) {
            Some(idx) => idx,
            None => {
                self.modules.push(ModuleDiff::new(path));
                self.modules.len() - 1
            }
        };
        &mut self.modules[idx]
    }

    pub fn instance(&self, path: &ModuleInstance, key: &str) -> Option<&InstanceDiff> {
        self.module_by_path(path)?.resources.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.modules.iter().all(|m| m.resources.values().all(InstanceDiff::is_empty))
    }
}
