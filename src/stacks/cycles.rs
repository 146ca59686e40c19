//! # Cycle Detection
//!
//! Depth-first search over the enabled dependency graph with the classic
//! three-state coloring. The traversal is iterative with an explicit frame
//! stack, and the current path is tracked directly so a detected back-edge
//! can be turned into the offending cycle without reconstruction.
//!
//! Invariants: every node is visited at most once overall, and the path
//! mirrors the frame stack (pushed on entry, popped on completion).
//! Self-loops never reach this detector; the manifest loader rejects them.

use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    Visiting,
    Visited,
}

/// One DFS frame: a node and the index of the next dependency to explore.
struct Frame {
    node: String,
    next: usize,
}

/// Detects circular dependencies in a stack dependency graph.
pub struct CycleDetector {
    /// stack name -> dependencies. A `BTreeMap` so the choice of DFS entry
    /// points is deterministic across runs.
    graph: BTreeMap<String, Vec<String>>,
    state: HashMap<String, VisitState>,
    path: Vec<String>,
}

impl CycleDetector {
    pub fn new(graph: BTreeMap<String, Vec<String>>) -> Self {
        Self {
            graph,
            state: HashMap::new(),
            path: Vec::new(),
        }
    }

    /// Returns the first cycle found, as the ordered list of stacks forming
    /// it (each stack depends on the next, the last depends on the first).
    /// Returns `None` for an acyclic graph.
    pub fn detect(mut self) -> Option<Vec<String>> {
        let starts: Vec<String> = self.graph.keys().cloned().collect();

        // Every node is tried as an entry point so disconnected components
        // are all covered; visited nodes are skipped immediately.
        for start in starts {
            if self.state_of(&start) != VisitState::Unvisited {
                continue;
            }
            if let Some(cycle) = self.dfs_from(start) {
                return Some(cycle);
            }
        }

        None
    }

    fn state_of(&self, node: &str) -> VisitState {
        self.state
            .get(node)
            .copied()
            .unwrap_or(VisitState::Unvisited)
    }

    fn dfs_from(&mut self, start: String) -> Option<Vec<String>> {
        self.state.insert(start.clone(), VisitState::Visiting);
        self.path.push(start.clone());
        let mut frames = vec![Frame { node: start, next: 0 }];

        loop {
            let (node, index) = match frames.last_mut() {
                Some(frame) => {
                    let current = (frame.node.clone(), frame.next);
                    frame.next += 1;
                    current
                }
                None => return None,
            };

            let dep = self
                .graph
                .get(&node)
                .and_then(|deps| deps.get(index))
                .cloned();

            match dep {
                None => {
                    // All dependencies explored: retire the frame.
                    self.state.insert(node, VisitState::Visited);
                    self.path.pop();
                    frames.pop();
                }
                Some(dep) => match self.state_of(&dep) {
                    // Back edge into the current path: cycle found.
                    VisitState::Visiting => return Some(self.extract_cycle(&dep)),
                    VisitState::Unvisited if self.graph.contains_key(&dep) => {
                        self.state.insert(dep.clone(), VisitState::Visiting);
                        self.path.push(dep.clone());
                        frames.push(Frame { node: dep, next: 0 });
                    }
                    // Fully explored, or an edge out of the enabled set
                    // (reported separately by the presence check).
                    _ => {}
                },
            }
        }
    }

    /// The cycle is the suffix of the current path starting at the
    /// back-edge target, in traversal order.
    fn extract_cycle(&self, back_node: &str) -> Vec<String> {
        match self.path.iter().position(|node| node == back_node) {
            Some(start) => self.path[start..].to_vec(),
            None => self.path.clone(),
        }
    }
}
