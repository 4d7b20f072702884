use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::{AppError, AppResult};
use crate::models::{Resource, ResourceGraph, ResourceLink};

#[derive(Debug, Clone)]
struct Node {
    resource: Resource,
    parents: Vec<String>,
    /// Sorted by (link position, child id).
    children: Vec<String>,
}

/// Content hierarchy as an arena keyed by resource id. A resource may hang under
/// several parents (a lesson shared by two workshops); cycles are rejected on build.
#[derive(Debug, Clone, Default)]
pub struct ResourceTree {
    nodes: HashMap<String, Node>,
}

impl ResourceTree {
    pub fn build(resources: Vec<Resource>, links: Vec<ResourceLink>) -> AppResult<Self> {
        let mut nodes: HashMap<String, Node> = HashMap::with_capacity(resources.len());
        for resource in resources {
            let id = resource.id.clone();
            if nodes.contains_key(&id) {
                return Err(AppError::ValidationError(format!(
                    "duplicate resource id: {id}"
                )));
            }
            nodes.insert(
                id,
                Node {
                    resource,
                    parents: Vec::new(),
                    children: Vec::new(),
                },
            );
        }

        let mut ordered: HashMap<String, Vec<(f64, String)>> = HashMap::new();
        let mut seen_links: HashSet<(&str, &str)> = HashSet::with_capacity(links.len());
        for link in &links {
            if link.parent_id == link.child_id {
                return Err(AppError::ValidationError(format!(
                    "resource {} links to itself",
                    link.parent_id
                )));
            }
            for id in [&link.parent_id, &link.child_id] {
                if !nodes.contains_key(id) {
                    return Err(AppError::ValidationError(format!(
                        "link references unknown resource: {id}"
                    )));
                }
            }
            if !seen_links.insert((link.parent_id.as_str(), link.child_id.as_str())) {
                return Err(AppError::ValidationError(format!(
                    "duplicate link {} -> {}",
                    link.parent_id, link.child_id
                )));
            }
            ordered
                .entry(link.parent_id.clone())
                .or_default()
                .push((link.position, link.child_id.clone()));
        }

        for link in &links {
            if let Some(child) = nodes.get_mut(&link.child_id) {
                child.parents.push(link.parent_id.clone());
            }
        }
        for (parent_id, mut children) in ordered {
            children.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
            if let Some(parent) = nodes.get_mut(&parent_id) {
                parent.children = children.into_iter().map(|(_, id)| id).collect();
            }
        }
        for node in nodes.values_mut() {
            node.parents.sort();
        }

        let tree = Self { nodes };
        tree.ensure_acyclic()?;
        Ok(tree)
    }

    pub fn from_graph(graph: ResourceGraph) -> AppResult<Self> {
        Self::build(graph.resources, graph.links)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Resource> {
        self.nodes.get(id).map(|n| &n.resource)
    }

    /// Direct children in display order.
    pub fn children(&self, id: &str) -> &[String] {
        self.nodes
            .get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
    }

    pub fn get_parents(&self, id: &str) -> Vec<String> {
        self.nodes
            .get(id)
            .map(|n| n.parents.clone())
            .unwrap_or_default()
    }

    /// Every id reachable through child links, excluding `id` itself. A node reached
    /// through two parents is reported once; reaching a node already on the current
    /// path is an error.
    pub fn get_all_descendant_ids(&self, id: &str) -> AppResult<HashSet<String>> {
        let mut found: HashSet<String> = HashSet::new();
        let Some(root) = self.nodes.get_key_value(id).map(|(k, _)| k.as_str()) else {
            return Ok(found);
        };

        let mut on_path: HashSet<&str> = HashSet::from([root]);
        let mut stack: Vec<(&str, usize)> = vec![(root, 0)];
        while let Some(&(current, next)) = stack.last() {
            match self.children(current).get(next) {
                Some(child) => {
                    if let Some(top) = stack.last_mut() {
                        top.1 += 1;
                    }
                    if on_path.contains(child.as_str()) {
                        return Err(AppError::ValidationError(format!(
                            "cycle detected at {child} below {id}"
                        )));
                    }
                    if found.insert(child.clone()) {
                        on_path.insert(child.as_str());
                        stack.push((child.as_str(), 0));
                    }
                }
                None => {
                    on_path.remove(current);
                    stack.pop();
                }
            }
        }
        Ok(found)
    }

    /// Every id reachable through parent links, excluding `id` itself.
    pub fn get_ancestor_ids(&self, id: &str) -> HashSet<String> {
        let mut found = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            for parent in self.nodes.get(current).map(|n| n.parents.as_slice()).unwrap_or_default() {
                if parent != id && found.insert(parent.clone()) {
                    queue.push_back(parent.as_str());
                }
            }
        }
        found
    }

    /// True when any ancestor (through any parent) is in `candidates`.
    pub fn has_ancestor_in(&self, id: &str, candidates: &HashSet<String>) -> bool {
        if candidates.is_empty() {
            return false;
        }
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            let Some(node) = self.nodes.get(current) else {
                continue;
            };
            for parent in &node.parents {
                if candidates.contains(parent) {
                    return true;
                }
                if visited.insert(parent.as_str()) {
                    queue.push_back(parent.as_str());
                }
            }
        }
        false
    }

    // 三色 DFS: 0 未访问, 1 在栈上, 2 已完成
    fn ensure_acyclic(&self) -> AppResult<()> {
        let mut color: HashMap<&str, u8> = HashMap::with_capacity(self.nodes.len());
        let mut roots: Vec<&str> = self.nodes.keys().map(String::as_str).collect();
        roots.sort_unstable();

        for root in roots {
            if color.get(root).copied().unwrap_or(0) != 0 {
                continue;
            }
            color.insert(root, 1);
            let mut stack: Vec<(&str, usize)> = vec![(root, 0)];
            while let Some(&(current, next)) = stack.last() {
                match self.children(current).get(next) {
                    Some(child) => {
                        if let Some(top) = stack.last_mut() {
                            top.1 += 1;
                        }
                        match color.get(child.as_str()).copied().unwrap_or(0) {
                            0 => {
                                color.insert(child.as_str(), 1);
                                stack.push((child.as_str(), 0));
                            }
                            1 => {
                                return Err(AppError::ValidationError(format!(
                                    "resource graph contains a cycle through {child}"
                                )));
                            }
                            _ => {}
                        }
                    }
                    None => {
                        color.insert(current, 2);
                        stack.pop();
                    }
                }
            }
        }
        Ok(())
    }

    #[cfg(test)]
    fn force_link(&mut self, parent_id: &str, child_id: &str) {
        if let Some(parent) = self.nodes.get_mut(parent_id) {
            parent.children.push(child_id.to_string());
        }
        if let Some(child) = self.nodes.get_mut(child_id) {
            child.parents.push(parent_id.to_string());
        }
    }
}
