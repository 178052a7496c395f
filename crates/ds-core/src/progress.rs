//! Hierarchical weighted progress.
//!
//! A node owns `total_units`. Some of those units are completed directly, the
//! rest may be delegated to child nodes via `add_child(child, pending_units)`.
//! A node's fraction is
//!
//! ```text
//! (own_completed + Σ child.fraction × child.pending_units) / total_units
//! ```
//!
//! clamped to `[0, 1]`. Every change is pushed to the node's `watch` channel and
//! then bubbled up to its parent, so a subscriber on the root sees one fraction
//! for the whole tree.
//!
//! 分层加权进度：子节点的变化会向上冒泡到根节点。

use std::sync::{Arc, Mutex, Weak};

use tokio::sync::watch;

struct ChildLink {
    node: Arc<Node>,
    pending_units: u64,
}

struct Node {
    total_units: u64,
    state: Mutex<NodeState>,
    tx: watch::Sender<f64>,
}

#[derive(Default)]
struct NodeState {
    own_completed: u64,
    children: Vec<ChildLink>,
    parent: Option<Weak<Node>>,
}

impl Node {
    fn fraction(&self) -> f64 {
        let (own, children) = {
            let state = lock(&self.state);
            let children: Vec<(Arc<Node>, u64)> = state
                .children
                .iter()
                .map(|c| (c.node.clone(), c.pending_units))
                .collect();
            (state.own_completed, children)
        };
        if self.total_units == 0 {
            return 1.0;
        }
        let delegated: f64 = children
            .iter()
            .map(|(node, weight)| node.fraction() * *weight as f64)
            .sum();
        ((own as f64 + delegated) / self.total_units as f64).clamp(0.0, 1.0)
    }

    fn parent(&self) -> Option<Arc<Node>> {
        let state = lock(&self.state);
        state.parent.as_ref().and_then(Weak::upgrade)
    }

    fn publish(self: &Arc<Self>) {
        let mut current = Some(self.clone());
        while let Some(node) = current {
            let fraction = node.fraction();
            node.tx.send_replace(fraction);
            current = node.parent();
        }
    }
}

/// Shared handle to one node of a progress tree.
#[derive(Clone)]
pub struct ProgressHandle {
    node: Arc<Node>,
}

impl std::fmt::Debug for ProgressHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressHandle")
            .field("total_units", &self.node.total_units)
            .field("fraction", &self.fraction())
            .finish()
    }
}

impl ProgressHandle {
    pub fn new(total_units: u64) -> Self {
        let (tx, _rx) = watch::channel(if total_units == 0 { 1.0 } else { 0.0 });
        Self {
            node: Arc::new(Node {
                total_units,
                state: Mutex::new(NodeState::default()),
                tx,
            }),
        }
    }

    /// A node that starts with `completed` of `total_units` already done.
    pub fn with_completed(total_units: u64, completed: u64) -> Self {
        let handle = Self::new(total_units);
        handle.complete_units(completed);
        handle
    }

    pub fn total_units(&self) -> u64 {
        self.node.total_units
    }

    /// Delegates `pending_units` of this node to `child`.
    pub fn add_child(&self, child: &ProgressHandle, pending_units: u64) {
        {
            let mut child_state = lock(&child.node.state);
            child_state.parent = Some(Arc::downgrade(&self.node));
        }
        {
            let mut state = lock(&self.node.state);
            state.children.push(ChildLink {
                node: child.node.clone(),
                pending_units,
            });
        }
        self.node.publish();
    }

    /// Marks `units` more of this node's own units done.
    pub fn complete_units(&self, units: u64) {
        {
            let mut state = lock(&self.node.state);
            state.own_completed = state
                .own_completed
                .saturating_add(units)
                .min(self.node.total_units);
        }
        self.node.publish();
    }

    /// Completes every remaining own unit, leaving delegated units to children.
    pub fn finish(&self) {
        {
            let mut state = lock(&self.node.state);
            let delegated: u64 = state.children.iter().map(|c| c.pending_units).sum();
            let own_total = self.node.total_units.saturating_sub(delegated);
            state.own_completed = state.own_completed.max(own_total);
        }
        self.node.publish();
    }

    pub fn fraction(&self) -> f64 {
        self.node.fraction()
    }

    pub fn is_finished(&self) -> bool {
        self.fraction() >= 1.0
    }

    pub fn subscribe(&self) -> watch::Receiver<f64> {
        self.node.tx.subscribe()
    }
}

fn lock(state: &Mutex<NodeState>) -> std::sync::MutexGuard<'_, NodeState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
