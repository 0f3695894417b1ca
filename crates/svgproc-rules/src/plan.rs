//! Compiled rule sets and the traversal that applies them
//!
//! Visiting a node under a plan:
//! 1. The first branch whose guard holds is forked into a child plan, and
//!    the node is visited again under that child plan.
//! 2. If no branch was taken, the plan's processors run in order until one
//!    returns [`Flow::Stop`].
//! 3. Unless the node was detached in the meantime, its current children
//!    are visited under this same plan, so every branch of an outer plan is
//!    retested at every depth below it.

use tracing::{debug, trace};

use svgproc_core::{Document, NodeId};

use crate::builder::{Branch, Flow, Processor, RuleBuilder};
use crate::error::ProcessError;
use crate::property::Context;
use crate::provider::Provider;

/// An immutable, compiled rule set
pub struct ExecutionPlan {
    branches: Vec<Branch>,
    processors: Vec<Processor>,
    properties: Provider,
    traverse: bool,
}

impl ExecutionPlan {
    pub(crate) fn new(
        branches: Vec<Branch>,
        processors: Vec<Processor>,
        properties: Provider,
        traverse: bool,
    ) -> Self {
        Self {
            branches,
            processors,
            properties,
            traverse,
        }
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn processors(&self) -> &[Processor] {
        &self.processors
    }

    /// The fully resolved provider of this plan
    pub fn properties(&self) -> &Provider {
        &self.properties
    }

    pub fn traverses(&self) -> bool {
        self.traverse
    }

    pub fn context(&self) -> Context<'_> {
        Context::new(&self.properties)
    }

    /// Value of a named property, or `""` if it is not defined
    pub fn get(&self, name: &str) -> String {
        self.context().get(name)
    }

    /// Build a child plan with this plan as parent
    pub fn fork<F>(&self, configure: F) -> ExecutionPlan
    where
        F: FnOnce(&mut RuleBuilder<'_>),
    {
        let mut builder = RuleBuilder::fork(self);
        configure(&mut builder);
        builder.build(None)
    }

    /// Apply this plan to `node` and, traversal permitting, its descendants.
    ///
    /// The document is modified in place. The first processor error aborts
    /// the walk; changes made up to that point are kept.
    pub fn visit(&self, doc: &mut Document, node: NodeId) -> Result<(), ProcessError> {
        trace!(node = node.index(), "visit");

        if self.take_branch(doc, node)? == Flow::Continue {
            self.run_processors(doc, node)?;
        }

        let current = doc.node(node);
        if !current.is_attached() && current.node_type().is_attached_kind() {
            trace!(node = node.index(), "detached, not descending");
            return Ok(());
        }

        if !self.traverse {
            return Ok(());
        }

        let children = doc.children(node).to_vec();
        for child in children {
            // An earlier sibling's rules may have removed or moved it
            if doc.parent(child) != Some(node) {
                continue;
            }
            self.visit(doc, child)?;
        }

        Ok(())
    }

    fn take_branch(&self, doc: &mut Document, node: NodeId) -> Result<Flow, ProcessError> {
        let cx = self.context();
        let taken = self
            .branches
            .iter()
            .position(|b| b.guard().holds(&cx, doc.node(node)));

        match taken {
            Some(index) => {
                debug!(branch = index, node = node.index(), "branch taken");
                let child = self.branches[index].fork(self);
                child.visit(doc, node)?;
                Ok(Flow::Stop)
            }
            None => Ok(Flow::Continue),
        }
    }

    fn run_processors(&self, doc: &mut Document, node: NodeId) -> Result<(), ProcessError> {
        let cx = self.context();
        for processor in &self.processors {
            if processor.process(&cx, doc, node)? == Flow::Stop {
                break;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for ExecutionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionPlan")
            .field("branches", &self.branches)
            .field("processors", &self.processors.len())
            .field("traverse", &self.traverse)
            .finish()
    }
}

/// Configure a top-level rule set
///
/// ```
/// use svgproc_rules::{compile, id_is, literally, tag_is};
///
/// let rules = compile(|r| {
///     r.when(tag_is("text") & id_is("name"), |r| {
///         r.set_text_content(literally("Reffurence"));
///     });
/// });
/// assert_eq!(rules.branches().len(), 1);
/// ```
pub fn compile<F>(configure: F) -> RuleBuilder<'static>
where
    F: FnOnce(&mut RuleBuilder<'static>),
{
    let mut builder = RuleBuilder::new();
    configure(&mut builder);
    builder
}

/// Compile a fresh root plan from `rules` with `properties` and visit `root`
pub fn apply(
    rules: &RuleBuilder<'_>,
    doc: &mut Document,
    root: NodeId,
    properties: Provider,
) -> Result<(), ProcessError> {
    let plan = rules.build(Some(properties.above(&Provider::empty())));
    plan.visit(doc, root)
}

/// Apply `rules` to a whole document, starting at the document node
pub fn process_document(
    rules: &RuleBuilder<'_>,
    doc: &mut Document,
    properties: Provider,
) -> Result<(), ProcessError> {
    let root = doc.root();
    apply(rules, doc, root, properties)
}
