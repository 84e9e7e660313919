use tracing::trace;

use super::{Slot, Slots};
use crate::context::EvalContext;
use crate::error::EvalError;
use crate::terraform::{ModuleState, ResourceState};

/// Reads the primary instance stored under `name` in this module.
#[derive(Debug, Clone)]
pub struct EvalReadState {
    pub name: String,
    pub output: Slot,
}

impl EvalReadState {
    pub async fn eval(&self, ctx: &EvalContext, slots: &mut Slots) -> Result<(), EvalError> {
        let state = ctx.state().read().await;
        let primary = state
            .module_by_path(ctx.path())
            .and_then(|m| m.resources.get(&self.name))
            .and_then(|rs| rs.primary.clone());
        trace!(resource = %self.name, found = primary.is_some(), "read state");
        slots.set_state(self.output, primary);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct EvalReadStateDeposed {
    pub name: String,
    pub index: usize,
    pub output: Slot,
}

impl EvalReadStateDeposed {
    pub async fn eval(&self, ctx: &EvalContext, slots: &mut Slots) -> Result<(), EvalError> {
        let state = ctx.state().read().await;
        let deposed = state
            .module_by_path(ctx.path())
            .and_then(|m| m.resources.get(&self.name))
            .and_then(|rs| rs.deposed.get(self.index).cloned().flatten());
        trace!(resource = %self.name, index = self.index, found = deposed.is_some(), "read deposed state");
        slots.set_state(self.output, deposed);
        Ok(())
    }
}

/// Writes the primary instance, creating the resource entry if needed.
#[derive(Debug, Clone)]
pub struct EvalWriteState {
    pub name: String,
    pub resource_type: String,
    pub provider: String,
    pub dependencies: Vec<String>,
    pub state: Slot,
}

impl EvalWriteState {
    pub async fn eval(&self, ctx: &EvalContext, slots: &mut Slots) -> Result<(), EvalError> {
        let mut state = ctx.state().write().await;
        let rs = resource_entry(
            state.add_module(ctx.path().clone()),
            &self.name,
            &self.resource_type,
            &self.provider,
        );
        rs.dependencies = self.dependencies.clone();
        rs.primary = slots.state(self.state).cloned();
        Ok(())
    }
}

/// Writes one deposed instance by index. Writing no state empties the entry
/// without shifting its siblings.
#[derive(Debug, Clone)]
pub struct EvalWriteStateDeposed {
    pub name: String,
    pub resource_type: String,
    pub provider: String,
    pub index: usize,
    pub state: Slot,
}

impl EvalWriteStateDeposed {
    pub async fn eval(&self, ctx: &EvalContext, slots: &mut Slots) -> Result<(), EvalError> {
        let mut state = ctx.state().write().await;
        let rs = resource_entry(
            state.add_module(ctx.path().clone()),
            &self.name,
            &self.resource_type,
            &self.provider,
        );
        if rs.deposed.len() <= self.index {
            rs.deposed.resize(self.index + 1, None);
        }
        rs.deposed[self.index] = slots.state(self.state).cloned();
        Ok(())
    }
}

fn resource_entry<'a>(
    module: &'a mut ModuleState,
    name: &str,
    resource_type: &str,
    provider: &str,
) -> &'a mut ResourceState {
    let rs = module
        .resources
        .entry(name.to_string())
        .or_insert_with(|| ResourceState::new(resource_type, provider));
    if rs.type_name.is_empty() {
        rs.type_name = resource_type.to_string();
    }
    rs.provider = provider.to_string();
    rs
}
