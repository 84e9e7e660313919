use std::fmt;
use std::sync::Arc;

use super::{Evalable, ProvidedBy, ProviderConsumer, ResourceInstanceNode, SubPath};
use crate::addrs::{AbsProviderConfig, AbsResourceInstance, ModuleInstance};
use crate::eval::{
    EvalApply, EvalApplyPost, EvalApplyPre, EvalDiffDestroy, EvalGetProvider, EvalInstanceInfo,
    EvalNode, EvalReadStateDeposed, EvalRefresh, EvalReturnError, EvalUpdateStateHook,
    EvalWriteStateDeposed, Slot,
};
use crate::resource::InstanceInfo;
use crate::walk::WalkOperation;

const PROVIDER: Slot = Slot::new("provider");
const STATE: Slot = Slot::new("state");
const DIFF: Slot = Slot::new("diff");
const ERROR: Slot = Slot::new("error");

/// A prior incarnation of an instance kept in the resource's deposed list.
/// It is always handled by the provider recorded in state.
#[derive(Debug, Clone)]
pub struct NodeDeposedResourceInstance {
    pub addr: AbsResourceInstance,
    pub index: usize,
    pub recorded_provider: AbsProviderConfig,
    pub resolved_provider: Option<AbsProviderConfig>,
}

impl NodeDeposedResourceInstance {
    pub fn new(addr: AbsResourceInstance, index: usize, recorded_provider: AbsProviderConfig) -> Self {
        Self {
            addr,
            index,
            recorded_provider,
            resolved_provider: None,
        }
    }

    pub fn provider_addr(&self) -> &AbsProviderConfig {
        self.resolved_provider.as_ref().unwrap_or(&self.recorded_provider)
    }
}

impl Evalable for NodeDeposedResourceInstance {
    fn eval_tree(&self) -> EvalNode {
        let info = Arc::new(InstanceInfo::new(&self.addr));
        let name = self.addr.resource.state_key();
        let resource_type = self.addr.resource.resource.type_name.clone();
        let provider = self.provider_addr();

        let get_provider = || {
            EvalNode::GetProvider(EvalGetProvider {
                addr: provider.clone(),
                output: PROVIDER,
            })
        };
        let read_state = || {
            EvalNode::ReadStateDeposed(EvalReadStateDeposed {
                name: name.clone(),
                index: self.index,
                output: STATE,
            })
        };
        // The entry is written back even after a failed apply so the next
        // walk can retry it.
        let write_state = || {
            EvalNode::WriteStateDeposed(EvalWriteStateDeposed {
                name: name.clone(),
                resource_type: resource_type.clone(),
                provider: self.recorded_provider.to_string(),
                index: self.index,
                state: STATE,
            })
        };

        EvalNode::Sequence(vec![
            EvalNode::InstanceInfo(EvalInstanceInfo { info: info.clone() }),
            EvalNode::filter(
                &[WalkOperation::Refresh],
                EvalNode::Sequence(vec![
                    get_provider(),
                    read_state(),
                    EvalNode::Refresh(EvalRefresh {
                        info: info.clone(),
                        provider: PROVIDER,
                        state: STATE,
                        output: STATE,
                    }),
                    write_state(),
                ]),
            ),
            EvalNode::filter(
                &[WalkOperation::Apply, WalkOperation::Destroy],
                EvalNode::Sequence(vec![
                    get_provider(),
                    read_state(),
                    EvalNode::DiffDestroy(EvalDiffDestroy {
                        info: info.clone(),
                        state: STATE,
                        output: DIFF,
                    }),
                    EvalNode::ApplyPre(EvalApplyPre {
                        info: info.clone(),
                        state: STATE,
                        diff: DIFF,
                    }),
                    EvalNode::Apply(EvalApply {
                        info: info.clone(),
                        state: STATE,
                        diff: DIFF,
                        provider: PROVIDER,
                        output: STATE,
                        error: Some(ERROR),
                    }),
                    write_state(),
                    EvalNode::ApplyPost(EvalApplyPost {
                        info,
                        state: STATE,
                        error: ERROR,
                    }),
                    EvalNode::ReturnError(EvalReturnError { error: ERROR }),
                    EvalNode::UpdateStateHook(EvalUpdateStateHook),
                ]),
            ),
        ])
    }
}

impl SubPath for NodeDeposedResourceInstance {
    fn path(&self) -> &ModuleInstance {
        &self.addr.module
    }
}

impl ResourceInstanceNode for NodeDeposedResourceInstance {
    fn resource_instance_addr(&self) -> AbsResourceInstance {
        self.addr.clone()
    }
}

impl ProviderConsumer for NodeDeposedResourceInstance {
    fn provided_by(&self) -> ProvidedBy {
        ProvidedBy::exact(self.recorded_provider.clone())
    }

    fn set_provider(&mut self, addr: AbsProviderConfig) {
        self.resolved_provider = Some(addr);
    }
}

impl fmt::Display for NodeDeposedResourceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (deposed #{})", self.addr, self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addrs::{InstanceKey, ProviderConfig, Resource};

    fn node() -> NodeDeposedResourceInstance {
        NodeDeposedResourceInstance::new(
            Resource::managed("aws_instance", "c")
                .instance(InstanceKey::NoKey)
                .absolute(ModuleInstance::root()),
            0,
            ProviderConfig::with_alias("aws", "east").absolute(ModuleInstance::root()),
        )
    }

    fn labels(node: &EvalNode) -> Vec<String> {
        match node {
            EvalNode::Sequence(nodes) => nodes.iter().flat_map(labels).collect(),
            other => vec![other.label()],
        }
    }

    #[test]
    fn test_refresh_walk_operations() {
        let tree = node().eval_tree().for_walk(WalkOperation::Refresh).unwrap();
        assert_eq!(
            labels(&tree),
            vec![
                "InstanceInfo(aws_instance.c)",
                "GetProvider(provider.aws.east) -> provider",
                "ReadStateDeposed(aws_instance.c, #0) -> state",
                "Refresh(aws_instance.c) -> state",
                "WriteStateDeposed(aws_instance.c, #0) <- state",
            ]
        );
    }

    #[test]
    fn test_destroy_walk_operations() {
        let tree = node().eval_tree().for_walk(WalkOperation::Destroy).unwrap();
        assert_eq!(
            labels(&tree),
            vec![
                "InstanceInfo(aws_instance.c)",
                "GetProvider(provider.aws.east) -> provider",
                "ReadStateDeposed(aws_instance.c, #0) -> state",
                "DiffDestroy(aws_instance.c) -> diff",
                "ApplyPre(aws_instance.c)",
                "Apply(aws_instance.c) -> state",
                "WriteStateDeposed(aws_instance.c, #0) <- state",
                "ApplyPost(aws_instance.c)",
                "ReturnError(error)",
                "UpdateStateHook",
            ]
        );
    }

    #[test]
    fn test_plan_walk_only_describes_instance() {
        let tree = node().eval_tree().for_walk(WalkOperation::Plan).unwrap();
        assert_eq!(labels(&tree), vec!["InstanceInfo(aws_instance.c)"]);
    }

    #[test]
    fn test_provider_is_the_recorded_one() {
        let mut n = node();
        let p = n.provided_by();
        assert!(p.exact);
        assert_eq!(p.addr.to_string(), "provider.aws.east");

        n.set_provider(ProviderConfig::with_alias("aws", "east").absolute(ModuleInstance::root()));
        assert_eq!(n.provider_addr().to_string(), "provider.aws.east");
    }
}
