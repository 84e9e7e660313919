//! Evaluation trees: small declarative plans of operations, built per vertex
//! and interpreted against an [`EvalContext`].
//!
//! Operations within a tree pass values through named [`Slot`]s. A
//! [`EvalNode::Sequence`] stops at the first error; an
//! [`EvalNode::OpFilter`] runs its child only during the listed walks.
//! Trees are plain data, so they can be inspected or rendered without
//! running anything (see [`EvalNode::for_walk`] and [`EvalNode::to_tree`]).

mod apply;
mod diff;
mod provider;
mod slots;
mod state;

use futures::future::BoxFuture;
use termtree::Tree;
use tracing::{debug, trace};

use crate::context::EvalContext;
use crate::error::EvalError;
use crate::walk::WalkOperation;

pub use apply::{
    EvalApply, EvalApplyPost, EvalApplyPre, EvalInstanceInfo, EvalRefresh, EvalReturnError,
    EvalUpdateStateHook,
};
pub use diff::{EvalCheckPreventDestroy, EvalDiffDestroy, EvalWriteDiff};
pub use provider::{
    EvalCloseProvider, EvalCloseProvisioner, EvalConfigProvider, EvalGetProvider, EvalGetProvisioner,
    EvalInitProvider, EvalInitProvisioner, EvalInputProvider, EvalValidateProvider,
};
pub use slots::{Slot, Slots};
pub use state::{EvalReadState, EvalReadStateDeposed, EvalWriteState, EvalWriteStateDeposed};

#[derive(Debug, Clone)]
pub struct EvalOpFilter {
    pub ops: Vec<WalkOperation>,
    pub node: Box<EvalNode>,
}

#[derive(Debug, Clone)]
pub enum EvalNode {
    Sequence(Vec<EvalNode>),
    OpFilter(EvalOpFilter),

    InitProvider(EvalInitProvider),
    GetProvider(EvalGetProvider),
    ConfigProvider(EvalConfigProvider),
    ValidateProvider(EvalValidateProvider),
    InputProvider(EvalInputProvider),
    CloseProvider(EvalCloseProvider),
    InitProvisioner(EvalInitProvisioner),
    GetProvisioner(EvalGetProvisioner),
    CloseProvisioner(EvalCloseProvisioner),

    ReadState(EvalReadState),
    ReadStateDeposed(EvalReadStateDeposed),
    WriteState(EvalWriteState),
    WriteStateDeposed(EvalWriteStateDeposed),

    DiffDestroy(EvalDiffDestroy),
    CheckPreventDestroy(EvalCheckPreventDestroy),
    WriteDiff(EvalWriteDiff),

    InstanceInfo(EvalInstanceInfo),
    Refresh(EvalRefresh),
    ApplyPre(EvalApplyPre),
    Apply(EvalApply),
    ApplyPost(EvalApplyPost),
    ReturnError(EvalReturnError),
    UpdateStateHook(EvalUpdateStateHook),
}

impl EvalNode {
    pub fn filter(ops: &[WalkOperation], node: EvalNode) -> Self {
        Self::OpFilter(EvalOpFilter {
            ops: ops.to_vec(),
            node: Box::new(node),
        })
    }

    /// One-line description of this node, without its children.
    pub fn label(&self) -> String {
        match self {
            Self::Sequence(_) => "Sequence".to_string(),
            Self::OpFilter(f) => {
                let ops: Vec<&str> = f.ops.iter().map(|op| op.as_str()).collect();
                format!("OpFilter({})", ops.join(", "))
            }
            Self::InitProvider(op) => format!("InitProvider({})", op.addr),
            Self::GetProvider(op) => format!("GetProvider({}) -> {}", op.addr, op.output),
            Self::ConfigProvider(op) => format!("ConfigProvider({})", op.addr),
            Self::ValidateProvider(op) => format!("ValidateProvider({})", op.addr),
            Self::InputProvider(op) => format!("InputProvider({})", op.addr),
            Self::CloseProvider(op) => format!("CloseProvider({})", op.addr),
            Self::InitProvisioner(op) => format!("InitProvisioner({})", op.name),
            Self::GetProvisioner(op) => format!("GetProvisioner({}) -> {}", op.name, op.output),
            Self::CloseProvisioner(op) => format!("CloseProvisioner({})", op.name),
            Self::ReadState(op) => format!("ReadState({}) -> {}", op.name, op.output),
            Self::ReadStateDeposed(op) => {
                format!("ReadStateDeposed({}, #{}) -> {}", op.name, op.index, op.output)
            }
            Self::WriteState(op) => format!("WriteState({}) <- {}", op.name, op.state),
            Self::WriteStateDeposed(op) => {
                format!("WriteStateDeposed({}, #{}) <- {}", op.name, op.index, op.state)
            }
            Self::DiffDestroy(op) => format!("DiffDestroy({}) -> {}", op.info.id, op.output),
            Self::CheckPreventDestroy(op) => format!("CheckPreventDestroy({})", op.addr),
            Self::WriteDiff(op) => format!("WriteDiff({}) <- {}", op.name, op.diff),
            Self::InstanceInfo(op) => format!("InstanceInfo({})", op.info.id),
            Self::Refresh(op) => format!("Refresh({}) -> {}", op.info.id, op.output),
            Self::ApplyPre(op) => format!("ApplyPre({})", op.info.id),
            Self::Apply(op) => format!("Apply({}) -> {}", op.info.id, op.output),
            Self::ApplyPost(op) => format!("ApplyPost({})", op.info.id),
            Self::ReturnError(op) => format!("ReturnError({})", op.error),
            Self::UpdateStateHook(_) => "UpdateStateHook".to_string(),
        }
    }

    /// The tree as it would run during `op`: filters that don't match are
    /// removed and matching ones are replaced by their child. `None` when
    /// nothing would run.
    pub fn for_walk(&self, op: WalkOperation) -> Option<EvalNode> {
        match self {
            Self::Sequence(nodes) => {
                let kept: Vec<EvalNode> = nodes.iter().filter_map(|n| n.for_walk(op)).collect();
                (!kept.is_empty()).then_some(Self::Sequence(kept))
            }
            Self::OpFilter(f) if f.ops.contains(&op) => f.node.for_walk(op),
            Self::OpFilter(_) => None,
            leaf => Some(leaf.clone()),
        }
    }

    pub fn to_tree(&self) -> Tree<String> {
        let mut tree = Tree::new(self.label());
        match self {
            Self::Sequence(nodes) => {
                for n in nodes {
                    tree.push(n.to_tree());
                }
            }
            Self::OpFilter(f) => {
                tree.push(f.node.to_tree());
            }
            _ => {}
        }
        tree
    }
}

/// Runs a tree with fresh slots. An early exit counts as success.
pub async fn eval(node: &EvalNode, ctx: &EvalContext) -> Result<(), EvalError> {
    let mut slots = Slots::default();
    match eval_raw(node, ctx, &mut slots).await {
        Err(EvalError::EarlyExit) => {
            debug!(path = %ctx.path(), node = %node.label(), "evaluation exited early");
            Ok(())
        }
        result => result,
    }
}

/// Runs a tree without translating early exits.
pub fn eval_raw<'a>(
    node: &'a EvalNode,
    ctx: &'a EvalContext,
    slots: &'a mut Slots,
) -> BoxFuture<'a, Result<(), EvalError>> {
    Box::pin(async move {
        trace!(path = %ctx.path(), node = %node.label(), "eval");
        match node {
            EvalNode::Sequence(nodes) => {
                for n in nodes {
                    eval_raw(n, ctx, slots).await?;
                }
                Ok(())
            }
            EvalNode::OpFilter(f) => {
                if f.ops.contains(&ctx.operation()) {
                    eval_raw(&f.node, ctx, slots).await
                } else {
                    trace!(operation = %ctx.operation(), "filtered out");
                    Ok(())
                }
            }

            EvalNode::InitProvider(op) => op.eval(ctx).await,
            EvalNode::GetProvider(op) => op.eval(ctx, slots).await,
            EvalNode::ConfigProvider(op) => op.eval(ctx, slots).await,
            EvalNode::ValidateProvider(op) => op.eval(ctx, slots).await,
            EvalNode::InputProvider(op) => op.eval(ctx, slots).await,
            EvalNode::CloseProvider(op) => op.eval(ctx).await,
            EvalNode::InitProvisioner(op) => op.eval(ctx),
            EvalNode::GetProvisioner(op) => op.eval(ctx, slots),
            EvalNode::CloseProvisioner(op) => op.eval(ctx).await,

            EvalNode::ReadState(op) => op.eval(ctx, slots).await,
            EvalNode::ReadStateDeposed(op) => op.eval(ctx, slots).await,
            EvalNode::WriteState(op) => op.eval(ctx, slots).await,
            EvalNode::WriteStateDeposed(op) => op.eval(ctx, slots).await,

            EvalNode::DiffDestroy(op) => op.eval(ctx, slots).await,
            EvalNode::CheckPreventDestroy(op) => op.eval(slots),
            EvalNode::WriteDiff(op) => op.eval(ctx, slots).await,

            EvalNode::InstanceInfo(op) => op.eval(ctx),
            EvalNode::Refresh(op) => op.eval(ctx, slots).await,
            EvalNode::ApplyPre(op) => op.eval(ctx, slots),
            EvalNode::Apply(op) => op.eval(slots).await,
            EvalNode::ApplyPost(op) => op.eval(ctx, slots),
            EvalNode::ReturnError(op) => op.eval(slots),
            EvalNode::UpdateStateHook(op) => op.eval(ctx).await,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::addrs::{InstanceKey, ModuleInstance, Resource};
    use crate::configs::ResourceConfig;
    use crate::context::ContextOptions;
    use crate::hook::{Hook, HookAction};
    use crate::providers::{
        BasicComponentFactory, ProviderError, ResourceProvisioner, ResourceProvisionerCloser,
    };
    use crate::resource::InstanceInfo;
    use crate::terraform::{InstanceState, ResourceState, SharedState, State};

    const STATE: Slot = Slot::new("state");
    const DIFF: Slot = Slot::new("diff");
    const PROVIDER: Slot = Slot::new("provider");

    fn info() -> Arc<InstanceInfo> {
        let addr = Resource::managed("aws_instance", "a")
            .instance(InstanceKey::NoKey)
            .absolute(ModuleInstance::root());
        Arc::new(InstanceInfo::new(&addr))
    }

    fn context(op: WalkOperation, state: State) -> EvalContext {
        EvalContext::new(
            ContextOptions::new(op, Arc::new(BasicComponentFactory::new()))
                .with_state(SharedState::new(state)),
        )
    }

    fn state_with(key: &str, id: &str) -> State {
        let mut state = State::default();
        let rs = ResourceState {
            primary: Some(InstanceState::new(id)),
            ..ResourceState::new("aws_instance", "provider.aws")
        };
        state
            .add_module(ModuleInstance::root())
            .resources
            .insert(key.to_string(), rs);
        state
    }

    fn destroy_tree(config: Option<Arc<ResourceConfig>>) -> EvalNode {
        EvalNode::Sequence(vec![
            EvalNode::ReadState(EvalReadState {
                name: "aws_instance.a".into(),
                output: STATE,
            }),
            EvalNode::DiffDestroy(EvalDiffDestroy {
                info: info(),
                state: STATE,
                output: DIFF,
            }),
            EvalNode::CheckPreventDestroy(EvalCheckPreventDestroy {
                config,
                addr: "aws_instance.a".into(),
                diff: DIFF,
            }),
            EvalNode::WriteDiff(EvalWriteDiff {
                name: "aws_instance.a".into(),
                diff: DIFF,
            }),
        ])
    }

    #[tokio::test]
    async fn test_destroy_sequence_writes_diff() {
        let ctx = context(WalkOperation::Plan, state_with("aws_instance.a", "x1"));
        eval(&destroy_tree(None), &ctx).await.unwrap();
        let diff = ctx.diff().read().await;
        let planned = diff.instance(&ModuleInstance::root(), "aws_instance.a").unwrap();
        assert!(planned.destroy);
    }

    #[tokio::test]
    async fn test_sequence_short_circuits() {
        let mut rc = ResourceConfig::managed("aws_instance", "a");
        rc.managed.as_mut().unwrap().prevent_destroy = true;
        let ctx = context(WalkOperation::Plan, state_with("aws_instance.a", "x1"));
        let err = eval(&destroy_tree(Some(Arc::new(rc))), &ctx).await.unwrap_err();
        assert!(matches!(err, EvalError::PreventDestroy { .. }));
        assert!(ctx.diff().read().await.is_empty());
    }

    #[tokio::test]
    async fn test_no_state_yields_no_diff() {
        let ctx = context(WalkOperation::Plan, State::default());
        eval(&destroy_tree(None), &ctx).await.unwrap();
        assert!(ctx.diff().read().await.is_empty());
    }

    #[tokio::test]
    async fn test_filtered_node_has_no_side_effects() {
        let ctx = context(WalkOperation::Plan, State::default());
        let tree = EvalNode::filter(
            &[WalkOperation::Apply],
            EvalNode::GetProvider(EvalGetProvider {
                addr: crate::addrs::ProviderConfig::new("aws").absolute(ModuleInstance::root()),
                output: PROVIDER,
            }),
        );
        // Would fail with "not initialized" if it ran.
        eval(&tree, &ctx).await.unwrap();

        let apply_ctx = context(WalkOperation::Apply, State::default());
        assert!(eval(&tree, &apply_ctx).await.is_err());
    }

    struct Halt;
    impl Hook for Halt {
        fn pre_diff(&self, _: &InstanceInfo, _: Option<&InstanceState>) -> HookAction {
            HookAction::Halt
        }
    }

    #[tokio::test]
    async fn test_early_exit_is_not_an_error() {
        let ctx = EvalContext::new(
            ContextOptions::new(WalkOperation::Plan, Arc::new(BasicComponentFactory::new()))
                .with_state(SharedState::new(state_with("aws_instance.a", "x1")))
                .with_hook(Arc::new(Halt)),
        );
        let tree = destroy_tree(None);
        eval(&tree, &ctx).await.unwrap();
        assert!(ctx.diff().read().await.is_empty());

        let mut slots = Slots::default();
        let err = eval_raw(&tree, &ctx, &mut slots).await.unwrap_err();
        assert!(err.is_early_exit());
    }

    #[tokio::test]
    async fn test_return_error_surfaces_deferred_error() {
        let ctx = context(WalkOperation::Apply, State::default());
        let err_slot = Slot::new("err");
        let mut slots = Slots::default();
        slots.set_error(err_slot, EvalError::EmptySlot("x"));
        let tree = EvalNode::ReturnError(EvalReturnError { error: err_slot });
        assert!(eval_raw(&tree, &ctx, &mut slots).await.is_err());
        assert!(eval_raw(&tree, &ctx, &mut slots).await.is_ok());
    }

    #[tokio::test]
    async fn test_write_state_saves_instance_and_dependencies() {
        let ctx = context(WalkOperation::Apply, state_with("aws_instance.a", "x1"));
        let tree = EvalNode::Sequence(vec![
            EvalNode::ReadState(EvalReadState {
                name: "aws_instance.a".into(),
                output: STATE,
            }),
            EvalNode::WriteState(EvalWriteState {
                name: "aws_instance.b".into(),
                resource_type: "aws_instance".into(),
                provider: "provider.aws.east".into(),
                dependencies: vec!["aws_instance.a".into(), "module.net".into()],
                state: STATE,
            }),
        ]);
        eval(&tree, &ctx).await.unwrap();

        let state = ctx.state().read().await;
        let b = &state.module_by_path(&ModuleInstance::root()).unwrap().resources["aws_instance.b"];
        assert_eq!(b.primary, Some(InstanceState::new("x1")));
        assert_eq!(b.dependencies, vec!["aws_instance.a", "module.net"]);
        assert_eq!(b.provider, "provider.aws.east");
        assert_eq!(b.type_name, "aws_instance");
    }

    #[tokio::test]
    async fn test_write_state_replaces_recorded_dependencies() {
        let mut state = state_with("aws_instance.a", "x1");
        state.modules[0]
            .resources
            .get_mut("aws_instance.a")
            .unwrap()
            .dependencies = vec!["aws_instance.stale".into()];
        let ctx = context(WalkOperation::Apply, state);
        let mut slots = Slots::default();
        slots.set_state(STATE, Some(InstanceState::new("x2")));
        let write = EvalNode::WriteState(EvalWriteState {
            name: "aws_instance.a".into(),
            resource_type: "aws_instance".into(),
            provider: "provider.aws".into(),
            dependencies: Vec::new(),
            state: STATE,
        });
        eval_raw(&write, &ctx, &mut slots).await.unwrap();

        let state = ctx.state().read().await;
        let a = &state.modules[0].resources["aws_instance.a"];
        assert!(a.dependencies.is_empty());
        assert_eq!(a.primary, Some(InstanceState::new("x2")));
    }

    #[derive(Default)]
    struct Closes(AtomicUsize);

    struct LocalExec;
    impl ResourceProvisioner for LocalExec {}

    struct FileUpload(Arc<Closes>);
    impl ResourceProvisioner for FileUpload {
        fn as_closer(&self) -> Option<&dyn ResourceProvisionerCloser> {
            Some(self)
        }
    }

    #[async_trait]
    impl ResourceProvisionerCloser for FileUpload {
        async fn close(&self) -> Result<(), ProviderError> {
            self.0.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn provisioner_context(closes: &Arc<Closes>) -> EvalContext {
        let c = Arc::clone(closes);
        let factory = BasicComponentFactory::new()
            .with_provisioner("local-exec", || Ok(Arc::new(LocalExec) as Arc<dyn ResourceProvisioner>))
            .with_provisioner("file", move || {
                Ok(Arc::new(FileUpload(Arc::clone(&c))) as Arc<dyn ResourceProvisioner>)
            });
        EvalContext::new(ContextOptions::new(WalkOperation::Apply, Arc::new(factory)))
    }

    fn provisioner_lifecycle(name: &str) -> EvalNode {
        EvalNode::Sequence(vec![
            EvalNode::InitProvisioner(EvalInitProvisioner { name: name.into() }),
            EvalNode::GetProvisioner(EvalGetProvisioner {
                name: name.into(),
                output: Slot::new("provisioner"),
            }),
            EvalNode::CloseProvisioner(EvalCloseProvisioner { name: name.into() }),
        ])
    }

    #[tokio::test]
    async fn test_provisioner_lifecycle_closes_closable() {
        let closes = Arc::new(Closes::default());
        let ctx = provisioner_context(&closes);
        let mut slots = Slots::default();
        eval_raw(&provisioner_lifecycle("file"), &ctx, &mut slots).await.unwrap();

        assert!(slots.provisioner(Slot::new("provisioner")).is_ok());
        assert_eq!(closes.0.load(Ordering::SeqCst), 1);
        assert!(ctx.provisioner("file").is_none());
    }

    #[tokio::test]
    async fn test_provisioner_lifecycle_keeps_non_closable() {
        let closes = Arc::new(Closes::default());
        let ctx = provisioner_context(&closes);
        let tree = provisioner_lifecycle("local-exec");
        eval(&tree, &ctx).await.unwrap();

        assert!(ctx.provisioner("local-exec").is_some());
        assert_eq!(closes.0.load(Ordering::SeqCst), 0);

        let err = eval(&tree, &ctx).await.unwrap_err();
        assert!(matches!(err, EvalError::ProvisionerAlreadyInitialized(ref name) if name == "local-exec"));
    }

    #[tokio::test]
    async fn test_get_provisioner_before_init_fails() {
        let ctx = provisioner_context(&Arc::new(Closes::default()));
        let get = EvalNode::GetProvisioner(EvalGetProvisioner {
            name: "file".into(),
            output: Slot::new("provisioner"),
        });
        let err = eval(&get, &ctx).await.unwrap_err();
        assert!(matches!(err, EvalError::ProvisionerNotInitialized(_)));
    }

    #[test]
    fn test_for_walk_prunes_filters() {
        let get = |name: &'static str| {
            EvalNode::GetProvisioner(EvalGetProvisioner {
                name: name.into(),
                output: Slot::new("p"),
            })
        };
        let tree = EvalNode::Sequence(vec![
            get("always"),
            EvalNode::filter(&[WalkOperation::Apply], get("apply-only")),
            EvalNode::filter(&[WalkOperation::Input], EvalNode::Sequence(vec![get("input-only")])),
        ]);
        let plan = tree.for_walk(WalkOperation::Plan).unwrap();
        assert_eq!(plan.to_tree().to_string().matches("GetProvisioner").count(), 1);
        let apply = tree.for_walk(WalkOperation::Apply).unwrap();
        let rendered = apply.to_tree().to_string();
        assert!(rendered.contains("GetProvisioner(apply-only)"));
        assert!(!rendered.contains("input-only"));
        assert!(!rendered.contains("OpFilter"));

        let only_filtered = EvalNode::filter(&[WalkOperation::Input], get("x"));
        assert!(only_filtered.for_walk(WalkOperation::Plan).is_none());
    }

    #[test]
    fn test_labels() {
        let node = EvalNode::ReadStateDeposed(EvalReadStateDeposed {
            name: "aws_instance.c".into(),
            index: 0,
            output: STATE,
        });
        assert_eq!(node.label(), "ReadStateDeposed(aws_instance.c, #0) -> state");
        let filter = EvalNode::filter(&[WalkOperation::Apply, WalkOperation::Destroy], node);
        assert_eq!(filter.label(), "OpFilter(apply, destroy)");
    }
}
