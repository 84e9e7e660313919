use std::fmt;
use std::sync::Arc;

use super::{Evalable, SubPath};
use crate::addrs::{AbsProviderConfig, ModuleInstance};
use crate::configs::ProviderConfigBlock;
use crate::eval::{
    EvalCloseProvider, EvalConfigProvider, EvalGetProvider, EvalInitProvider, EvalInputProvider,
    EvalNode, EvalValidateProvider, Slot,
};
use crate::walk::WalkOperation;

const PROVIDER: Slot = Slot::new("provider");

/// Initializes a provider and, depending on the walk, asks for input,
/// validates it or configures it.
pub fn provider_eval_tree(addr: &AbsProviderConfig, config: Option<Arc<ProviderConfigBlock>>) -> EvalNode {
    use WalkOperation::*;

    let get = || {
        EvalNode::GetProvider(EvalGetProvider {
            addr: addr.clone(),
            output: PROVIDER,
        })
    };

    EvalNode::Sequence(vec![
        EvalNode::InitProvider(EvalInitProvider {
            type_name: addr.config.type_name.clone(),
            addr: addr.clone(),
        }),
        EvalNode::filter(
            &[Input, Import],
            EvalNode::Sequence(vec![
                get(),
                EvalNode::InputProvider(EvalInputProvider {
                    addr: addr.clone(),
                    provider: PROVIDER,
                    config: config.clone(),
                }),
            ]),
        ),
        EvalNode::filter(
            &[Validate],
            EvalNode::Sequence(vec![
                get(),
                EvalNode::ValidateProvider(EvalValidateProvider {
                    addr: addr.clone(),
                    provider: PROVIDER,
                    config: config.clone(),
                }),
            ]),
        ),
        EvalNode::filter(&[Refresh, Plan, Apply, Destroy, Import], get()),
        EvalNode::filter(
            &[Refresh, Plan, Apply, Destroy, Import],
            EvalNode::Sequence(vec![
                get(),
                EvalNode::ConfigProvider(EvalConfigProvider {
                    addr: addr.clone(),
                    provider: PROVIDER,
                    config,
                }),
            ]),
        ),
    ])
}

pub fn close_provider_eval_tree(addr: &AbsProviderConfig) -> EvalNode {
    EvalNode::Sequence(vec![EvalNode::CloseProvider(EvalCloseProvider {
        addr: addr.clone(),
    })])
}

#[derive(Debug, Clone)]
pub struct NodeApplyableProvider {
    pub addr: AbsProviderConfig,
    pub config: Option<Arc<ProviderConfigBlock>>,
}

impl NodeApplyableProvider {
    pub fn new(addr: AbsProviderConfig, config: Option<Arc<ProviderConfigBlock>>) -> Self {
        Self { addr, config }
    }
}

impl SubPath for NodeApplyableProvider {
    fn path(&self) -> &ModuleInstance {
        &self.addr.module
    }
}

impl Evalable for NodeApplyableProvider {
    fn eval_tree(&self) -> EvalNode {
        provider_eval_tree(&self.addr, self.config.clone())
    }
}

impl fmt::Display for NodeApplyableProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.addr)
    }
}

#[derive(Debug, Clone)]
pub struct NodeCloseProvider {
    pub addr: AbsProviderConfig,
}

impl NodeCloseProvider {
    pub fn new(addr: AbsProviderConfig) -> Self {
        Self { addr }
    }
}

impl SubPath for NodeCloseProvider {
    fn path(&self) -> &ModuleInstance {
        &self.addr.module
    }
}

impl Evalable for NodeCloseProvider {
    fn eval_tree(&self) -> EvalNode {
        close_provider_eval_tree(&self.addr)
    }
}

impl fmt::Display for NodeCloseProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (close)", self.addr)
    }
}
