//! The canonical step tree interpreted by `DSLWorkflow`.
//!
//! Nodes live in an arena and refer to their children by [`NodeId`]. A
//! child must already be in the arena when its parent is pushed, so a tree
//! can never contain a cycle.
//!
//! The serde representation is the loosely-typed wire shape clients send:
//!
//! ```json
//! {
//!   "variables": { "arg1": "value1" },
//!   "root": {
//!     "sequence": [
//!       { "activity": { "name": "SampleActivity", "arguments": ["arg1"], "result": "r1" } },
//!       { "parallel": { "branches": [ ... ] } }
//!     ]
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::WorkflowError;

// ---------------------------------------------------------------------------
// StepTree
// ---------------------------------------------------------------------------

/// Index of a node inside its [`StepTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One activity call. `arguments` name variable bindings; `result` names
/// the binding that receives the activity output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityInvocation {
    pub name: String,
    pub arguments: Vec<String>,
    pub result: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepNode {
    Activity(ActivityInvocation),
    /// Children run in order.
    Sequence(Vec<NodeId>),
    /// Children run concurrently.
    Parallel(Vec<NodeId>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWorkflow", into = "RawWorkflow")]
pub struct StepTree {
    nodes: Vec<StepNode>,
    root: Option<NodeId>,
    variables: Map<String, Value>,
}

impl StepTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the wire shape.
    pub fn from_map(input: &Map<String, Value>) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(input.clone()))
    }

    /// Add a node. Every child it references must already be in the tree.
    pub fn push(&mut self, node: StepNode) -> Result<NodeId, WorkflowError> {
        if let StepNode::Sequence(children) | StepNode::Parallel(children) = &node {
            if let Some(child) = children.iter().find(|c| c.0 >= self.nodes.len()) {
                return Err(WorkflowError::DanglingNode { child: child.0 });
            }
        }
        self.nodes.push(node);
        Ok(NodeId(self.nodes.len() - 1))
    }

    pub fn set_root(&mut self, root: NodeId) -> Result<(), WorkflowError> {
        if root.0 >= self.nodes.len() {
            return Err(WorkflowError::DanglingNode { child: root.0 });
        }
        self.root = Some(root);
        Ok(())
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&StepNode> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn variables(&self) -> &Map<String, Value> {
        &self.variables
    }

    /// A decoded tree is meaningful when it has a root or at least one variable.
    pub fn is_meaningful(&self) -> bool {
        self.root.is_some() || !self.variables.is_empty()
    }

    /// Distinct activity names reachable from the root, in first-visit order.
    pub fn activity_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            match self.node(id) {
                Some(StepNode::Activity(invocation)) => {
                    if !names.contains(&invocation.name.as_str()) {
                        names.push(&invocation.name);
                    }
                }
                Some(StepNode::Sequence(children)) | Some(StepNode::Parallel(children)) => {
                    stack.extend(children.iter().rev());
                }
                None => {}
            }
        }
        names
    }
}

// ---------------------------------------------------------------------------
// Wire shape
// ---------------------------------------------------------------------------
//
// Field names also match their capitalized spelling, and `null` is
// treated as absent throughout.

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawWorkflow {
    #[serde(default, alias = "Variables", skip_serializing_if = "Option::is_none")]
    variables: Option<Map<String, Value>>,
    #[serde(default, alias = "Root", skip_serializing_if = "Option::is_none")]
    root: Option<RawStatement>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawStatement {
    #[serde(default, alias = "Activity", skip_serializing_if = "Option::is_none")]
    activity: Option<RawActivity>,
    #[serde(default, alias = "Sequence", skip_serializing_if = "Option::is_none")]
    sequence: Option<RawChildren>,
    #[serde(default, alias = "Parallel", skip_serializing_if = "Option::is_none")]
    parallel: Option<RawChildren>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawActivity {
    #[serde(default, alias = "Name")]
    name: String,
    #[serde(default, alias = "Arguments", skip_serializing_if = "Option::is_none")]
    arguments: Option<Vec<String>>,
    #[serde(default, alias = "Result", skip_serializing_if = "Option::is_none")]
    result: Option<String>,
}

/// `sequence` / `parallel` body: a bare list, or an object carrying the
/// list under `elements` / `branches`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(try_from = "Value")]
struct RawChildren(Vec<Option<RawStatement>>);

impl TryFrom<Value> for RawChildren {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let list = match value {
            list @ Value::Array(_) => list,
            Value::Object(mut body) => ["elements", "Elements", "branches", "Branches"]
                .iter()
                .find_map(|key| body.remove(*key))
                .unwrap_or(Value::Null),
            Value::Null => Value::Null,
            other => return Err(format!("expected a list of statements, found {other}")),
        };
        if list.is_null() {
            return Ok(Self(Vec::new()));
        }
        serde_json::from_value(list)
            .map(Self)
            .map_err(|e| e.to_string())
    }
}

impl RawChildren {
    fn into_statements(self) -> Vec<RawStatement> {
        self.0.into_iter().flatten().collect()
    }
}

impl TryFrom<RawWorkflow> for StepTree {
    type Error = String;

    fn try_from(raw: RawWorkflow) -> Result<Self, Self::Error> {
        let mut tree = StepTree {
            variables: raw.variables.unwrap_or_default(),
            ..StepTree::default()
        };
        if let Some(statement) = raw.root {
            tree.root = lower(statement, &mut tree.nodes)?;
        }
        Ok(tree)
    }
}

/// Push `statement` and its descendants, children first. An empty
/// statement yields no node.
fn lower(statement: RawStatement, nodes: &mut Vec<StepNode>) -> Result<Option<NodeId>, String> {
    let populated = [
        statement.activity.is_some(),
        statement.sequence.is_some(),
        statement.parallel.is_some(),
    ]
    .into_iter()
    .filter(|set| *set)
    .count();
    if populated > 1 {
        return Err("a statement must set only one of activity, sequence or parallel".to_string());
    }

    let node = if let Some(activity) = statement.activity {
        StepNode::Activity(ActivityInvocation {
            name: activity.name,
            arguments: activity.arguments.unwrap_or_default(),
            result: activity.result.filter(|r| !r.is_empty()),
        })
    } else if let Some(sequence) = statement.sequence {
        StepNode::Sequence(lower_all(sequence, nodes)?)
    } else if let Some(parallel) = statement.parallel {
        StepNode::Parallel(lower_all(parallel, nodes)?)
    } else {
        return Ok(None);
    };

    nodes.push(node);
    Ok(Some(NodeId(nodes.len() - 1)))
}

fn lower_all(children: RawChildren, nodes: &mut Vec<StepNode>) -> Result<Vec<NodeId>, String> {
    let mut ids = Vec::new();
    for statement in children.into_statements() {
        if let Some(id) = lower(statement, nodes)? {
            ids.push(id);
        }
    }
    Ok(ids)
}

impl From<StepTree> for RawWorkflow {
    fn from(tree: StepTree) -> Self {
        let root = tree.root.map(|id| raise(&tree, id));
        RawWorkflow {
            variables: (!tree.variables.is_empty()).then_some(tree.variables),
            root,
        }
    }
}

fn raise(tree: &StepTree, id: NodeId) -> RawStatement {
    let children = |ids: &[NodeId]| {
        RawChildren(ids.iter().map(|c| Some(raise(tree, *c))).collect())
    };
    match tree.node(id) {
        Some(StepNode::Activity(invocation)) => RawStatement {
            activity: Some(RawActivity {
                name: invocation.name.clone(),
                arguments: Some(invocation.arguments.clone()),
                result: invocation.result.clone(),
            }),
            ..RawStatement::default()
        },
        Some(StepNode::Sequence(ids)) => RawStatement {
            sequence: Some(children(ids)),
            ..RawStatement::default()
        },
        Some(StepNode::Parallel(ids)) => RawStatement {
            parallel: Some(children(ids)),
            ..RawStatement::default()
        },
        None => RawStatement::default(),
    }
}
