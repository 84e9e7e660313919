//! Callbacks invoked around diff, apply and refresh of each instance.

use crate::error::EvalError;
use crate::resource::InstanceInfo;
use crate::terraform::{InstanceDiff, InstanceState, State};

/// What a hook wants the walk to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HookAction {
    #[default]
    Continue,
    Halt,
}

/// Every callback defaults to [`HookAction::Continue`].
pub trait Hook: Send + Sync {
    fn pre_diff(&self, _info: &InstanceInfo, _state: Option<&InstanceState>) -> HookAction {
        HookAction::Continue
    }

    fn post_diff(&self, _info: &InstanceInfo, _diff: &InstanceDiff) -> HookAction {
        HookAction::Continue
    }

    fn pre_apply(
        &self,
        _info: &InstanceInfo,
        _state: Option<&InstanceState>,
        _diff: &InstanceDiff,
    ) -> HookAction {
        HookAction::Continue
    }

    fn post_apply(
        &self,
        _info: &InstanceInfo,
        _state: Option<&InstanceState>,
        _error: Option<&EvalError>,
    ) -> HookAction {
        HookAction::Continue
    }

    fn pre_refresh(&self, _info: &InstanceInfo, _state: &InstanceState) -> HookAction {
        HookAction::Continue
    }

    fn post_refresh(&self, _info: &InstanceInfo, _state: Option<&InstanceState>) -> HookAction {
        HookAction::Continue
    }

    fn post_state_update(&self, _state: &State) -> HookAction {
        HookAction::Continue
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NilHook;

impl Hook for NilHook {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addrs::{InstanceKey, ModuleInstance, Resource};

    #[test]
    fn test_nil_hook_continues() {
        let addr = Resource::managed("aws_instance", "web")
            .instance(InstanceKey::NoKey)
            .absolute(ModuleInstance::root());
        let info = InstanceInfo::new(&addr);
        let hook = NilHook;
        assert_eq!(hook.pre_diff(&info, None), HookAction::Continue);
        assert_eq!(hook.post_apply(&info, None, None), HookAction::Continue);
        assert_eq!(hook.post_state_update(&State::default()), HookAction::Continue);
    }
}
