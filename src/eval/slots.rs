use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::EvalError;
use crate::providers::{ResourceProvider, ResourceProvisioner};
use crate::terraform::{InstanceDiff, InstanceState};

/// A named place where one operation leaves a value for a later one in the
/// same tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot(&'static str);

impl Slot {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

enum SlotValue {
    Provider(Arc<dyn ResourceProvider>),
    Provisioner(Arc<dyn ResourceProvisioner>),
    State(Option<InstanceState>),
    Diff(Option<InstanceDiff>),
    Error(EvalError),
}

/// The slots of one tree run. Never shared between vertices.
#[derive(Default)]
pub struct Slots {
    values: HashMap<Slot, SlotValue>,
}

impl Slots {
    pub fn is_set(&self, slot: Slot) -> bool {
        self.values.contains_key(&slot)
    }

    pub fn set_provider(&mut self, slot: Slot, provider: Arc<dyn ResourceProvider>) {
        self.values.insert(slot, SlotValue::Provider(provider));
    }

    pub fn provider(&self, slot: Slot) -> Result<Arc<dyn ResourceProvider>, EvalError> {
        match self.values.get(&slot) {
            Some(SlotValue::Provider(p)) => Ok(Arc::clone(p)),
            _ => Err(EvalError::EmptySlot(slot.name())),
        }
    }

    pub fn set_provisioner(&mut self, slot: Slot, provisioner: Arc<dyn ResourceProvisioner>) {
        self.values.insert(slot, SlotValue::Provisioner(provisioner));
    }

    pub fn provisioner(&self, slot: Slot) -> Result<Arc<dyn ResourceProvisioner>, EvalError> {
        match self.values.get(&slot) {
            Some(SlotValue::Provisioner(p)) => Ok(Arc::clone(p)),
            _ => Err(EvalError::EmptySlot(slot.name())),
        }
    }

    pub fn set_state(&mut self, slot: Slot, state: Option<InstanceState>) {
        self.values.insert(slot, SlotValue::State(state));
    }

    /// An unset slot reads as no state.
    pub fn state(&self, slot: Slot) -> Option<&InstanceState> {
        match self.values.get(&slot) {
            Some(SlotValue::State(state)) => state.as_ref(),
            _ => None,
        }
    }

    pub fn set_diff(&mut self, slot: Slot, diff: Option<InstanceDiff>) {
        self.values.insert(slot, SlotValue::Diff(diff));
    }

    pub fn diff(&self, slot: Slot) -> Option<&InstanceDiff> {
        match self.values.get(&slot) {
            Some(SlotValue::Diff(diff)) => diff.as_ref(),
            _ => None,
        }
    }

    pub fn set_error(&mut self, slot: Slot, err: EvalError) {
        self.values.insert(slot, SlotValue::Error(err));
    }

    pub fn error(&self, slot: Slot) -> Option<&EvalError> {
        match self.values.get(&slot) {
            Some(SlotValue::Error(err)) => Some(err),
            _ => None,
        }
    }

    pub fn take_error(&mut self, slot: Slot) -> Option<EvalError> {
        match self.values.remove(&slot) {
            Some(SlotValue::Error(err)) => Some(err),
            Some(other) => {
                self.values.insert(slot, other);
                None
            }
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATE: Slot = Slot::new("state");
    const ERR: Slot = Slot::new("error");

    #[test]
    fn test_unset_slots() {
        let slots = Slots::default();
        assert!(slots.state(STATE).is_none());
        assert!(slots.diff(STATE).is_none());
        let err = slots.provider(Slot::new("provider")).err().unwrap();
        assert_eq!(err.to_string(), "evaluation slot 'provider' is empty");
    }

    #[test]
    fn test_state_slot_holds_explicit_none() {
        let mut slots = Slots::default();
        slots.set_state(STATE, Some(InstanceState::new("i-1")));
        assert_eq!(slots.state(STATE).unwrap().id, "i-1");
        slots.set_state(STATE, None);
        assert!(slots.is_set(STATE));
        assert!(slots.state(STATE).is_none());
    }

    #[test]
    fn test_take_error_leaves_other_kinds() {
        let mut slots = Slots::default();
        slots.set_state(ERR, None);
        assert!(slots.take_error(ERR).is_none());
        assert!(slots.is_set(ERR));

        slots.set_error(ERR, EvalError::EarlyExit);
        assert!(slots.error(ERR).is_some());
        assert!(slots.take_error(ERR).unwrap().is_early_exit());
        assert!(!slots.is_set(ERR));
    }
}
