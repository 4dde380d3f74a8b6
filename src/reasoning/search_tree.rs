//! Arena-backed search tree for the MCTS engine.
//!
//! Nodes live in a single `Vec` and refer to each other by index, so the
//! tree needs no reference counting or interior mutability. Index 0 is the
//! root ("no reasoning yet").

use chrono::{DateTime, Utc};

use super::ReasoningStrategy;

/// Index of a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(usize);

#[derive(Debug, Clone)]
pub(crate) struct SearchNode {
    pub text: String,
    pub strategy: ReasoningStrategy,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub visit_count: u32,
    pub value_sum: f64,
    pub depth: usize,
    pub processing_time_ms: u64,
    pub created_at: DateTime<Utc>,
}

impl SearchNode {
    /// Mean backpropagated value; 0 for an unvisited node.
    pub fn mean_value(&self) -> f64 {
        if self.visit_count == 0 {
            0.0
        } else {
            self.value_sum / self.visit_count as f64
        }
    }
}

/// Text and timing of a freshly generated step.
#[derive(Debug, Clone)]
pub(crate) struct NewStep {
    pub text: String,
    pub processing_time_ms: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct SearchTree {
    nodes: Vec<SearchNode>,
}

impl SearchTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![SearchNode {
                text: String::new(),
                strategy: ReasoningStrategy::Algorithmic,
                parent: None,
                children: Vec::new(),
                visit_count: 0,
                value_sum: 0.0,
                depth: 0,
                processing_time_ms: 0,
                created_at: Utc::now(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &SearchNode {
        &self.nodes[id.0]
    }

    /// Number of nodes excluding the root.
    pub fn explored(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Attach a new child; the strategy is inferred from its text.
    pub fn add_child(&mut self, parent: NodeId, step: NewStep) -> NodeId {
        let id = NodeId(self.nodes.len());
        let depth = self.nodes[parent.0].depth + 1;
        self.nodes.push(SearchNode {
            strategy: ReasoningStrategy::infer(&step.text),
            text: step.text,
            parent: Some(parent),
            children: Vec::new(),
            visit_count: 0,
            value_sum: 0.0,
            depth,
            processing_time_ms: step.processing_time_ms,
            created_at: Utc::now(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Add `value` to every node from `id` up to the root.
    pub fn backpropagate(&mut self, id: NodeId, value: f64) {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = &mut self.nodes[node_id.0];
            node.visit_count += 1;
            node.value_sum += value;
            current = node.parent;
        }
    }

    /// Upper confidence bound; unvisited nodes are always preferred.
    pub fn ucb(&self, id: NodeId, exploration: f64) -> f64 {
        let node = self.node(id);
        if node.visit_count == 0 {
            return f64::INFINITY;
        }
        let parent_visits = node
            .parent
            .map(|p| self.node(p).visit_count)
            .unwrap_or(node.visit_count)
            .max(1);
        node.mean_value()
            + exploration * ((parent_visits as f64).ln() / node.visit_count as f64).sqrt()
    }

    /// True if another child may be attached to `id`.
    pub fn has_capacity(
        &self,
        id: NodeId,
        branching_factor: usize,
        widen_threshold: f64,
        target_depth: usize,
    ) -> bool {
        let node = self.node(id);
        if node.depth >= target_depth {
            return false;
        }
        if node.children.is_empty() {
            return true;
        }
        node.children.len() < branching_factor
            && self
                .best_child_by_mean(id)
                .map_or(true, |best| self.node(best).mean_value() < widen_threshold)
    }

    /// Child with the highest UCB score; the earliest wins ties.
    pub fn best_child_by_ucb(&self, id: NodeId, exploration: f64) -> Option<NodeId> {
        self.argmax_child(id, |child| self.ucb(child, exploration))
    }

    /// Child with the highest mean value; the earliest wins ties.
    pub fn best_child_by_mean(&self, id: NodeId) -> Option<NodeId> {
        self.argmax_child(id, |child| self.node(child).mean_value())
    }

    fn argmax_child(&self, id: NodeId, score: impl Fn(NodeId) -> f64) -> Option<NodeId> {
        let mut best: Option<(NodeId, f64)> = None;
        for &child in &self.node(id).children {
            let s = score(child);
            match best {
                Some((_, best_score)) if s <= best_score => {}
                _ => best = Some((child, s)),
            }
        }
        best.map(|(child, _)| child)
    }

    /// Nodes from the first step down to `id`, excluding the root.
    pub fn path_to(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            if node_id == self.root() {
                break;
            }
            path.push(node_id);
            current = self.node(node_id).parent;
        }
        path.reverse();
        path
    }

    /// Exploitation-only walk from the root by best mean value.
    pub fn best_path(&self) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut current = self.root();
        while let Some(child) = self.best_child_by_mean(current) {
            path.push(child);
            current = child;
        }
        path
    }
}
