use std::sync::Arc;

use tracing::{trace, warn};

use super::{Slot, Slots};
use crate::context::EvalContext;
use crate::error::EvalError;
use crate::providers::ApplyError;
use crate::resource::InstanceInfo;
use crate::terraform::InstanceState;

/// Providers report a destroyed object either as `None` or as a state
/// without an id.
fn existing(state: Option<InstanceState>) -> Option<InstanceState> {
    state.filter(|s| !s.is_empty())
}

/// Marks where a tree's instance descriptor was built.
#[derive(Debug, Clone)]
pub struct EvalInstanceInfo {
    pub info: Arc<InstanceInfo>,
}

impl EvalInstanceInfo {
    pub fn eval(&self, ctx: &EvalContext) -> Result<(), EvalError> {
        trace!(instance = %self.info.human_id(), path = %ctx.path(), "evaluating instance");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct EvalRefresh {
    pub info: Arc<InstanceInfo>,
    pub provider: Slot,
    pub state: Slot,
    pub output: Slot,
}

impl EvalRefresh {
    pub async fn eval(&self, ctx: &EvalContext, slots: &mut Slots) -> Result<(), EvalError> {
        let Some(state) = slots.state(self.state).cloned() else {
            trace!(instance = %self.info.id, "no state, skipping refresh");
            return Ok(());
        };
        let provider = slots.provider(self.provider)?;

        ctx.hook(|h| h.pre_refresh(&self.info, &state))?;
        let refreshed = provider
            .refresh(&self.info, &state)
            .await
            .map_err(|source| EvalError::Refresh {
                id: self.info.id.clone(),
                source,
            })?;
        ctx.hook(|h| h.post_refresh(&self.info, refreshed.as_ref()))?;

        slots.set_state(self.output, existing(refreshed));
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct EvalApplyPre {
    pub info: Arc<InstanceInfo>,
    pub state: Slot,
    pub diff: Slot,
}

impl EvalApplyPre {
    pub fn eval(&self, ctx: &EvalContext, slots: &Slots) -> Result<(), EvalError> {
        let Some(diff) = slots.diff(self.diff).filter(|d| !d.is_empty()) else {
            return Ok(());
        };
        ctx.hook(|h| h.pre_apply(&self.info, slots.state(self.state), diff))
    }
}

/// Applies the planned diff. On failure the prior state is kept as the
/// output; the error goes to `error` when set, otherwise it is returned.
#[derive(Debug, Clone)]
pub struct EvalApply {
    pub info: Arc<InstanceInfo>,
    pub state: Slot,
    pub diff: Slot,
    pub provider: Slot,
    pub output: Slot,
    pub error: Option<Slot>,
}

impl EvalApply {
    pub async fn eval(&self, slots: &mut Slots) -> Result<(), EvalError> {
        let Some(diff) = slots.diff(self.diff).filter(|d| !d.is_empty()).cloned() else {
            trace!(instance = %self.info.id, "empty diff, nothing to apply");
            return Ok(());
        };
        let prior = slots.state(self.state).cloned();
        let provider = slots.provider(self.provider)?;

        match provider.apply(&self.info, prior.as_ref(), &diff).await {
            Ok(new_state) => {
                slots.set_state(self.output, existing(new_state));
                Ok(())
            }
            Err(ApplyError { state, source }) => {
                warn!(
                    instance = %self.info.id,
                    error = %source,
                    partial = state.is_some(),
                    "apply failed"
                );
                let left = match state {
                    Some(partial) => existing(Some(partial)),
                    None => prior,
                };
                slots.set_state(self.output, left);
                let err = EvalError::Apply {
                    id: self.info.id.clone(),
                    source,
                };
                match self.error {
                    Some(slot) => {
                        slots.set_error(slot, err);
                        Ok(())
                    }
                    None => Err(err),
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct EvalApplyPost {
    pub info: Arc<InstanceInfo>,
    pub state: Slot,
    pub error: Slot,
}

impl EvalApplyPost {
    pub fn eval(&self, ctx: &EvalContext, slots: &Slots) -> Result<(), EvalError> {
        ctx.hook(|h| h.post_apply(&self.info, slots.state(self.state), slots.error(self.error)))
    }
}

/// Surfaces an error deferred by an earlier operation.
#[derive(Debug, Clone)]
pub struct EvalReturnError {
    pub error: Slot,
}

impl EvalReturnError {
    pub fn eval(&self, slots: &mut Slots) -> Result<(), EvalError> {
        match slots.take_error(self.error) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EvalUpdateStateHook;

impl EvalUpdateStateHook {
    pub async fn eval(&self, ctx: &EvalContext) -> Result<(), EvalError> {
        let state = ctx.state().read().await;
        ctx.hook(|h| h.post_state_update(&state))
    }
}
