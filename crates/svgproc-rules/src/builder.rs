//! Rule accumulation
//!
//! A [`RuleBuilder`] collects processors and guarded branches. Each branch
//! carries a configuration function that, when the branch is taken, runs
//! against a fresh builder forked from the plan that took it.

use std::fmt;
use std::sync::Arc;

use svgproc_core::{Document, NodeId, NodeRef};

use crate::error::ProcessError;
use crate::filter::{self, Filter};
use crate::plan::ExecutionPlan;
use crate::property::{Condition, Context};
use crate::provider::Provider;

/// Whether the remaining processors of a node should still run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// A transformation applied to a node during a visit
///
/// Processors must quietly do nothing on node kinds they do not understand.
pub trait NodeProcessor: Send + Sync {
    fn process(
        &self,
        cx: &Context<'_>,
        doc: &mut Document,
        node: NodeId,
    ) -> Result<Flow, ProcessError>;
}

impl<F> NodeProcessor for F
where
    F: Fn(&Context<'_>, &mut Document, NodeId) -> Result<Flow, ProcessError> + Send + Sync,
{
    fn process(
        &self,
        cx: &Context<'_>,
        doc: &mut Document,
        node: NodeId,
    ) -> Result<Flow, ProcessError> {
        self(cx, doc, node)
    }
}

/// Shared handle to a processor
pub type Processor = Arc<dyn NodeProcessor>;

/// Configuration function of a branch
pub type Configure = Arc<dyn Fn(&mut RuleBuilder<'_>) + Send + Sync>;

/// What decides whether a branch is taken
#[derive(Clone, Debug)]
pub enum Guard {
    /// Tested against the visited node
    Filter(Filter),
    /// Tested against the provider of the visiting plan
    Condition(Condition),
}

impl Guard {
    pub fn holds(&self, cx: &Context<'_>, node: NodeRef<'_>) -> bool {
        match self {
            Guard::Filter(f) => f.applies_to(node),
            Guard::Condition(c) => c.holds(cx),
        }
    }
}

impl From<Filter> for Guard {
    fn from(filter: Filter) -> Self {
        Guard::Filter(filter)
    }
}

impl From<Condition> for Guard {
    fn from(condition: Condition) -> Self {
        Guard::Condition(condition)
    }
}

/// A guard and the nested rules taken when it holds
#[derive(Clone)]
pub struct Branch {
    guard: Guard,
    configure: Configure,
}

impl Branch {
    pub fn guard(&self) -> &Guard {
        &self.guard
    }

    /// Compile this branch's nested rules with `parent` as their parent plan
    pub fn fork(&self, parent: &ExecutionPlan) -> ExecutionPlan {
        let mut builder = RuleBuilder::fork(parent);
        (self.configure)(&mut builder);
        builder.build(None)
    }
}

impl fmt::Debug for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Branch").field("guard", &self.guard).finish()
    }
}

/// Mutable accumulator of rules, compiled into an [`ExecutionPlan`]
///
/// Branches are tried before processors. When a branch is taken, the
/// processors registered here do not run on that node unless the branch
/// calls [`inherit`](RuleBuilder::inherit).
pub struct RuleBuilder<'p> {
    parent: Option<&'p ExecutionPlan>,
    branches: Vec<Branch>,
    processors: Vec<Processor>,
    traverse: bool,
}

impl RuleBuilder<'static> {
    /// A top-level builder with no parent plan
    pub fn new() -> Self {
        Self {
            parent: None,
            branches: Vec::new(),
            processors: Vec::new(),
            traverse: true,
        }
    }
}

impl Default for RuleBuilder<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'p> RuleBuilder<'p> {
    /// A builder nested under `parent`, inheriting its traversal setting
    pub fn fork(parent: &'p ExecutionPlan) -> Self {
        Self {
            parent: Some(parent),
            branches: Vec::new(),
            processors: Vec::new(),
            traverse: parent.traverses(),
        }
    }

    pub fn parent(&self) -> Option<&'p ExecutionPlan> {
        self.parent
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn processors(&self) -> &[Processor] {
        &self.processors
    }

    /// Whether compiled plans descend into children
    pub fn traverses(&self) -> bool {
        self.traverse
    }

    /// Register a processor function
    pub fn process<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&Context<'_>, &mut Document, NodeId) -> Result<Flow, ProcessError>
            + Send
            + Sync
            + 'static,
    {
        self.processors.push(Arc::new(f));
        self
    }

    /// Register a processor implementation
    pub fn add_processor(&mut self, processor: impl NodeProcessor + 'static) -> &mut Self {
        self.processors.push(Arc::new(processor));
        self
    }

    /// Register an already shared processor
    pub fn add_shared(&mut self, processor: Processor) -> &mut Self {
        self.processors.push(processor);
        self
    }

    /// Register a branch taken when `guard` holds
    pub fn when<F>(&mut self, guard: impl Into<Guard>, configure: F) -> &mut Self
    where
        F: Fn(&mut RuleBuilder<'_>) + Send + Sync + 'static,
    {
        self.branches.push(Branch {
            guard: guard.into(),
            configure: Arc::new(configure),
        });
        self
    }

    /// Register a branch taken for nodes matching `filter`
    pub fn when_filter<F>(&mut self, filter: Filter, configure: F) -> &mut Self
    where
        F: Fn(&mut RuleBuilder<'_>) + Send + Sync + 'static,
    {
        self.when(filter, configure)
    }

    /// Register a branch taken while `condition` holds
    pub fn when_condition<F>(&mut self, condition: Condition, configure: F) -> &mut Self
    where
        F: Fn(&mut RuleBuilder<'_>) + Send + Sync + 'static,
    {
        self.when(condition, configure)
    }

    /// Register a branch that is always taken.
    ///
    /// Placed after a series of [`when`](RuleBuilder::when) branches it acts
    /// as their default; branches after it are never reached.
    pub fn otherwise<F>(&mut self, configure: F) -> &mut Self
    where
        F: Fn(&mut RuleBuilder<'_>) + Send + Sync + 'static,
    {
        self.when(filter::any(), configure)
    }

    /// Copy the parent plan's processors, as they are now, into this builder
    pub fn inherit(&mut self) -> &mut Self {
        if let Some(parent) = self.parent {
            self.processors.extend(parent.processors().iter().cloned());
        }
        self
    }

    /// Do not descend into the children of nodes visited by the compiled plan
    pub fn stop_traverse(&mut self) -> &mut Self {
        self.traverse = false;
        self
    }

    /// Compile into a plan.
    ///
    /// `properties`, if given, is stacked above the parent plan's provider.
    /// Without it the parent's provider is used as is, or the empty provider
    /// when there is no parent.
    pub fn build(&self, properties: Option<Provider>) -> ExecutionPlan {
        let properties = match (properties, self.parent) {
            (Some(own), Some(parent)) => own.above(parent.properties()),
            (Some(own), None) => own,
            (None, Some(parent)) => parent.properties().clone(),
            (None, None) => Provider::empty(),
        };
        ExecutionPlan::new(
            self.branches.clone(),
            self.processors.clone(),
            properties,
            self.traverse,
        )
    }
}

impl fmt::Debug for RuleBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleBuilder")
            .field("branches", &self.branches)
            .field("processors", &self.processors.len())
            .field("traverse", &self.traverse)
            .finish()
    }
}
