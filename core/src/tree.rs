//! Dynamic AABB tree used as the broad phase.
//!
//! Nodes live in an arena of slots with free-list recycling; parent and
//! child links are slot indices, so a `NodeId` is stable for the lifetime
//! of the node. Leaves carry a body id; internal nodes carry exactly two
//! children and an AABB equal to the union of their children's.

use std::collections::{HashSet, VecDeque};

use crate::aabb::Aabb;
use crate::body::BodyId;
use crate::math::Vec2;

pub type NodeId = usize;

#[derive(Debug, Clone)]
struct Node {
    aabb: Aabb,
    parent: Option<NodeId>,
    child1: Option<NodeId>,
    child2: Option<NodeId>,
    /// `Some` marks a leaf.
    body: Option<BodyId>,
}

impl Node {
    #[inline]
    fn is_leaf(&self) -> bool {
        self.body.is_some()
    }
}

#[derive(Debug)]
pub struct AabbTree {
    nodes: Vec<Option<Node>>,
    free: Vec<NodeId>,
    root: Option<NodeId>,
    /// Local tree rotations during the refit walk. On by default; exposed
    /// so the balance heuristic can be measured against plain insertion.
    pub rotations: bool,
}

impl Default for AabbTree {
    fn default() -> Self {
        Self::new()
    }
}

impl AabbTree {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: None,
            rotations: true,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Sum of the areas of every node. Diagnostic for the balance
    /// heuristic; lower is better.
    pub fn cost(&self) -> f32 {
        self.nodes
            .iter()
            .flatten()
            .map(|n| n.aabb.area())
            .sum()
    }

    /// AABB stored for a node (for leaves, the enlarged one).
    pub fn node_aabb(&self, id: NodeId) -> Aabb {
        self.node(id).aabb
    }

    /// Body handle carried by a leaf; `None` for internal nodes.
    pub fn leaf_body(&self, id: NodeId) -> Option<BodyId> {
        self.node(id).body
    }

    fn node(&self, id: NodeId) -> &Node {
        self.nodes[id].as_ref().unwrap()
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id].as_mut().unwrap()
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.nodes[id] = Some(node);
            id
        } else {
            self.nodes.push(Some(node));
            self.nodes.len() - 1
        }
    }

    fn dealloc(&mut self, id: NodeId) {
        self.nodes[id] = None;
        self.free.push(id);
    }

    /// Inserts a leaf for `body` with the given (already enlarged) AABB
    /// and returns its node id.
    pub fn insert(&mut self, body: BodyId, aabb: Aabb) -> NodeId {
        let leaf = self.alloc(Node {
            aabb,
            parent: None,
            child1: None,
            child2: None,
            body: Some(body),
        });

        let Some(root) = self.root else {
            self.root = Some(leaf);
            return leaf;
        };

        // Best sibling by surface area heuristic: best-first search with
        // the lower bound area(new) + inherited growth as the prune.
        let mut best = root;
        let mut best_cost = f32::INFINITY;
        let mut queue = VecDeque::new();
        queue.push_back((root, 0.0f32));
        while let Some((current, inherited)) = queue.pop_front() {
            let current_aabb = self.node(current).aabb;
            let direct = current_aabb.union(&aabb).area();
            let cost = direct + inherited;
            if cost < best_cost {
                best_cost = cost;
                best = current;
            }
            let child_inherited = inherited + direct - current_aabb.area();
            let lower_bound = aabb.area() + child_inherited;
            if lower_bound < best_cost {
                let n = self.node(current);
                if let (Some(c1), Some(c2)) = (n.child1, n.child2) {
                    queue.push_back((c1, child_inherited));
                    queue.push_back((c2, child_inherited));
                }
            }
        }

        // Splice a new internal node above the chosen sibling.
        let sibling = best;
        let sibling_aabb = self.node(sibling).aabb;
        let old_parent = self.node(sibling).parent;
        let new_parent = self.alloc(Node {
            aabb: aabb.union(&sibling_aabb),
            parent: old_parent,
            child1: Some(sibling),
            child2: Some(leaf),
            body: None,
        });
        self.node_mut(sibling).parent = Some(new_parent);
        self.node_mut(leaf).parent = Some(new_parent);
        match old_parent {
            None => self.root = Some(new_parent),
            Some(p) => self.replace_child(p, sibling, new_parent),
        }

        // Walk to the root, refreshing AABBs and rebalancing.
        let mut index = Some(new_parent);
        while let Some(i) = index {
            self.refit(i);
            if self.rotations {
                self.rotate(i);
            }
            index = self.node(i).parent;
        }

        leaf
    }

    /// Removes a leaf, splicing its sibling into the parent's slot.
    pub fn remove(&mut self, leaf: NodeId) {
        debug_assert!(self.node(leaf).is_leaf());

        let Some(parent) = self.node(leaf).parent else {
            // Singleton root.
            self.root = None;
            self.dealloc(leaf);
            return;
        };

        let p = self.node(parent);
        let sibling = if p.child1 == Some(leaf) { p.child2 } else { p.child1 };
        let sibling = sibling.unwrap();
        let grandparent = p.parent;

        match grandparent {
            None => {
                self.root = Some(sibling);
                self.node_mut(sibling).parent = None;
            }
            Some(g) => self.replace_child(g, parent, sibling),
        }
        self.dealloc(parent);
        self.dealloc(leaf);

        let mut index = grandparent;
        while let Some(i) = index {
            self.refit(i);
            index = self.node(i).parent;
        }
    }

    /// All bodies whose leaf AABB contains `p`. Order is unspecified.
    pub fn query_point(&self, p: Vec2) -> Vec<BodyId> {
        let mut out = Vec::new();
        let mut queue = VecDeque::new();
        if let Some(root) = self.root {
            queue.push_back(root);
        }
        while let Some(i) = queue.pop_front() {
            let n = self.node(i);
            if !n.aabb.contains_point(p) {
                continue;
            }
            if let Some(body) = n.body {
                out.push(body);
            } else {
                queue.push_back(n.child1.unwrap());
                queue.push_back(n.child2.unwrap());
            }
        }
        out
    }

    /// All bodies whose leaf AABB overlaps `region`. The region is
    /// normalized first, so a min/max swap in user input is harmless.
    pub fn query_region(&self, region: Aabb) -> Vec<BodyId> {
        let region = region.fix();
        let mut out = Vec::new();
        let mut queue = VecDeque::new();
        if let Some(root) = self.root {
            queue.push_back(root);
        }
        while let Some(i) = queue.pop_front() {
            let n = self.node(i);
            if !n.aabb.overlaps(&region) {
                continue;
            }
            if let Some(body) = n.body {
                out.push(body);
            } else {
                queue.push_back(n.child1.unwrap());
                queue.push_back(n.child2.unwrap());
            }
        }
        out
    }

    /// Enumerates every overlapping leaf pair at most once.
    pub fn collision_pairs(&self) -> Vec<(BodyId, BodyId)> {
        let mut pairs = Vec::new();
        let Some(root) = self.root else { return pairs };
        let rn = self.node(root);
        if let (Some(c1), Some(c2)) = (rn.child1, rn.child2) {
            let mut visited = HashSet::new();
            self.check_collision(c1, c2, &mut visited, &mut pairs);
        }
        pairs
    }

    fn check_collision(
        &self,
        a: NodeId,
        b: NodeId,
        visited: &mut HashSet<u64>,
        out: &mut Vec<(BodyId, BodyId)>,
    ) {
        if !visited.insert(pair_key(a, b)) {
            return;
        }
        let na = self.node(a);
        let nb = self.node(b);
        match (na.body, nb.body) {
            (Some(body_a), Some(body_b)) => {
                if na.aabb.overlaps(&nb.aabb) {
                    out.push((body_a, body_b));
                }
            }
            (None, None) => {
                let (a1, a2) = (na.child1.unwrap(), na.child2.unwrap());
                let (b1, b2) = (nb.child1.unwrap(), nb.child2.unwrap());
                // Pairs entirely inside either subtree.
                self.check_collision(a1, a2, visited, out);
                self.check_collision(b1, b2, visited, out);
                // Cross pairs only where the subtrees can meet.
                if na.aabb.overlaps(&nb.aabb) {
                    self.check_collision(a1, b1, visited, out);
                    self.check_collision(a1, b2, visited, out);
                    self.check_collision(a2, b1, visited, out);
                    self.check_collision(a2, b2, visited, out);
                }
            }
            (Some(_), None) => {
                let (b1, b2) = (nb.child1.unwrap(), nb.child2.unwrap());
                self.check_collision(b1, b2, visited, out);
                if na.aabb.overlaps(&nb.aabb) {
                    self.check_collision(a, b1, visited, out);
                    self.check_collision(a, b2, visited, out);
                }
            }
            (None, Some(_)) => {
                let (a1, a2) = (na.child1.unwrap(), na.child2.unwrap());
                self.check_collision(a1, a2, visited, out);
                if na.aabb.overlaps(&nb.aabb) {
                    self.check_collision(a1, b, visited, out);
                    self.check_collision(a2, b, visited, out);
                }
            }
        }
    }

    fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) {
        let pn = self.node_mut(parent);
        if pn.child1 == Some(old) {
            pn.child1 = Some(new);
        } else {
            debug_assert_eq!(pn.child2, Some(old));
            pn.child2 = Some(new);
        }
        self.node_mut(new).parent = Some(parent);
    }

    fn refit(&mut self, id: NodeId) {
        let n = self.node(id);
        if let (Some(c1), Some(c2)) = (n.child1, n.child2) {
            let merged = self.node(c1).aabb.union(&self.node(c2).aabb);
            self.node_mut(id).aabb = merged;
        }
    }

    /// Exchanges the parent slots of two nodes from different parents.
    fn cross_swap(&mut self, a: NodeId, b: NodeId) {
        let pa = self.node(a).parent.unwrap();
        let pb = self.node(b).parent.unwrap();
        self.replace_child(pa, a, b);
        self.replace_child(pb, b, a);
    }

    /// Attempts the four local rotations around `id` and its sibling,
    /// applying the one with the most negative summed-area delta. The
    /// grouping the grandparent sees is unchanged; only the arrangement
    /// below it moves.
    fn rotate(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).parent else {
            return;
        };
        let p = self.node(parent);
        let sibling = if p.child1 == Some(id) { p.child2 } else { p.child1 };
        let sibling = sibling.unwrap();

        let node_aabb = self.node(id).aabb;
        let sibling_aabb = self.node(sibling).aabb;

        // Candidates are encoded as the pair of nodes to cross-swap plus
        // the internal node whose AABB must be refit afterwards.
        let mut best_delta = 0.0f32;
        let mut best: Option<(NodeId, NodeId, NodeId)> = None;

        if let (Some(c1), Some(c2)) = (self.node(id).child1, self.node(id).child2) {
            let d = self.node(c1).aabb.union(&sibling_aabb).area() - node_aabb.area();
            if d < best_delta {
                best_delta = d;
                best = Some((sibling, c2, id));
            }
            let d = self.node(c2).aabb.union(&sibling_aabb).area() - node_aabb.area();
            if d < best_delta {
                best_delta = d;
                best = Some((sibling, c1, id));
            }
        }
        if let (Some(s1), Some(s2)) = (self.node(sibling).child1, self.node(sibling).child2) {
            let d = self.node(s1).aabb.union(&node_aabb).area() - sibling_aabb.area();
            if d < best_delta {
                best_delta = d;
                best = Some((id, s2, sibling));
            }
            let d = self.node(s2).aabb.union(&node_aabb).area() - sibling_aabb.area();
            if d < best_delta {
                best_delta = d;
                best = Some((id, s1, sibling));
            }
        }

        if let Some((x, y, refit_target)) = best {
            self.cross_swap(x, y);
            self.refit(refit_target);
        }
    }

    /// Walks the whole tree checking the structural invariants: internal
    /// AABBs equal the union of their children, parent/child links agree,
    /// every live slot is reachable from the root exactly once.
    pub fn validate(&self) {
        let live = self.nodes.iter().flatten().count();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();
        if let Some(root) = self.root {
            assert!(self.node(root).parent.is_none(), "root has a parent");
            queue.push_back(root);
        }
        while let Some(i) = queue.pop_front() {
            assert!(seen.insert(i), "node {i} reachable twice");
            let n = self.node(i);
            match (n.child1, n.child2) {
                (Some(c1), Some(c2)) => {
                    assert!(!n.is_leaf(), "internal node {i} carries a body");
                    assert_eq!(self.node(c1).parent, Some(i));
                    assert_eq!(self.node(c2).parent, Some(i));
                    let merged = self.node(c1).aabb.union(&self.node(c2).aabb);
                    assert_eq!(n.aabb, merged, "node {i} AABB out of date");
                    queue.push_back(c1);
                    queue.push_back(c2);
                }
                (None, None) => assert!(n.is_leaf(), "childless node {i} has no body"),
                _ => panic!("node {i} has exactly one child"),
            }
        }
        assert_eq!(seen.len(), live, "unreachable nodes in arena");
    }
}

/// Canonical unordered key for a node pair.
#[inline]
fn pair_key(a: NodeId, b: NodeId) -> u64 {
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    ((lo as u64) << 32) | hi as u64
}
