use std::sync::Arc;

use tracing::trace;

use super::{Slot, Slots};
use crate::configs::ResourceConfig;
use crate::context::EvalContext;
use crate::error::EvalError;
use crate::resource::InstanceInfo;
use crate::terraform::{DiffChangeType, InstanceDiff};

/// Plans the destruction of whatever is in `state`. Nothing to destroy
/// yields no diff.
#[derive(Debug, Clone)]
pub struct EvalDiffDestroy {
    pub info: Arc<InstanceInfo>,
    pub state: Slot,
    pub output: Slot,
}

impl EvalDiffDestroy {
    pub async fn eval(&self, ctx: &EvalContext, slots: &mut Slots) -> Result<(), EvalError> {
        let Some(state) = slots.state(self.state).filter(|s| !s.is_empty()).cloned() else {
            trace!(instance = %self.info.id, "nothing to destroy");
            slots.set_diff(self.output, None);
            return Ok(());
        };

        ctx.hook(|h| h.pre_diff(&self.info, Some(&state)))?;
        let diff = InstanceDiff::destroy();
        ctx.hook(|h| h.post_diff(&self.info, &diff))?;

        slots.set_diff(self.output, Some(diff));
        Ok(())
    }
}

/// Fails if the planned diff would destroy a resource configured with
/// `prevent_destroy`.
#[derive(Debug, Clone)]
pub struct EvalCheckPreventDestroy {
    pub config: Option<Arc<ResourceConfig>>,
    pub addr: String,
    pub diff: Slot,
}

impl EvalCheckPreventDestroy {
    pub fn eval(&self, slots: &Slots) -> Result<(), EvalError> {
        let Some(diff) = slots.diff(self.diff) else {
            return Ok(());
        };
        let prevent = self.config.as_ref().is_some_and(|c| c.prevent_destroy());
        let destroys = matches!(
            diff.change_type(),
            DiffChangeType::Destroy | DiffChangeType::DestroyCreate
        );
        if prevent && destroys {
            return Err(EvalError::PreventDestroy {
                addr: self.addr.clone(),
            });
        }
        Ok(())
    }
}

/// Records the planned diff for `name` in this module, or removes the entry
/// when there is none.
#[derive(Debug, Clone)]
pub struct EvalWriteDiff {
    pub name: String,
    pub diff: Slot,
}

impl EvalWriteDiff {
    pub async fn eval(&self, ctx: &EvalContext, slots: &mut Slots) -> Result<(), EvalError> {
        let mut diff = ctx.diff().write().await;
        let module = diff.add_module(ctx.path().clone());
        match slots.diff(self.diff) {
            Some(d) => {
                module.resources.insert(self.name.clone(), d.clone());
            }
            None => {
                module.resources.remove(&self.name);
            }
        }
        Ok(())
    }
}
