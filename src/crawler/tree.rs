//! URL tree produced by a crawl
//!
//! While a crawl runs, nodes live in a flat arena indexed by [`NodeId`], with
//! a map from normalized URL to id. A URL seeded from the sitemap and later
//! found as a link therefore always resolves to the same node. The arena is
//! converted into nested [`UrlNode`]s once the crawl is finished.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::crawler::page::PageMetadata;

/// Stable index of a node inside a [`UrlTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug)]
struct NodeSlot {
    url: String,
    title: Option<String>,
    description: Option<String>,
    children: Vec<NodeId>,
}

/// Arena of discovered URLs, rooted at the crawl's base URL
#[derive(Debug)]
pub struct UrlTree {
    slots: Vec<NodeSlot>,
    by_url: HashMap<String, NodeId>,
}

impl UrlTree {
    /// Create a tree holding only the root
    pub fn new(root_url: impl Into<String>) -> Self {
        let url = root_url.into();
        let mut by_url = HashMap::new();
        by_url.insert(url.clone(), NodeId(0));
        Self {
            slots: vec![NodeSlot {
                url,
                title: None,
                description: None,
                children: Vec::new(),
            }],
            by_url,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Append a new child under `parent`. Returns `None` if the URL is already
    /// part of the tree.
    pub fn add_child(&mut self, parent: NodeId, url: impl Into<String>) -> Option<NodeId> {
        let url = url.into();
        if self.by_url.contains_key(&url) {
            return None;
        }

        let id = NodeId(self.slots.len());
        self.slots.push(NodeSlot {
            url: url.clone(),
            title: None,
            description: None,
            children: Vec::new(),
        });
        self.by_url.insert(url, id);
        self.slots[parent.0].children.push(id);
        Some(id)
    }

    /// Attach fetched metadata to an existing node
    pub fn set_metadata(&mut self, id: NodeId, metadata: PageMetadata) {
        let slot = &mut self.slots[id.0];
        slot.title = metadata.title;
        slot.description = metadata.description;
    }

    /// Convert the arena into a nested tree
    pub fn into_root(self) -> UrlNode {
        let mut slots: Vec<Option<NodeSlot>> = self.slots.into_iter().map(Some).collect();
        build_node(&mut slots, NodeId(0))
    }
}

fn build_node(slots: &mut [Option<NodeSlot>], id: NodeId) -> UrlNode {
    let slot = slots[id.0]
        .take()
        .unwrap_or_else(|| unreachable!("node {} visited twice", id.0));
    let children = slot
        .children
        .iter()
        .map(|child| build_node(slots, *child))
        .collect();

    UrlNode {
        url: slot.url,
        title: slot.title,
        description: slot.description,
        children,
    }
}

/// A discovered URL and the pages first discovered from it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlNode {
    /// Normalized URL (no fragment or query, no trailing slash except root)
    pub url: String,

    /// Page title, if the page was fetched and had one
    pub title: Option<String>,

    /// Page description, if the page was fetched and had one
    pub description: Option<String>,

    /// Children in discovery order
    pub children: Vec<UrlNode>,
}

impl UrlNode {
    /// All nodes in pre-order, starting with `self`
    pub fn flatten(&self) -> Vec<&UrlNode> {
        let mut nodes = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            nodes.push(node);
            stack.extend(node.children.iter().rev());
        }
        nodes
    }

    /// Number of parent links between `self` and the node with the given URL
    pub fn depth_of(&self, url: &str) -> Option<usize> {
        if self.url == url {
            return Some(0);
        }
        self.children
            .iter()
            .find_map(|child| child.depth_of(url))
            .map(|depth| depth + 1)
    }
}

/// Outcome of a crawl. Per-page failures are collected in `errors`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlResult {
    /// Root of the URL tree (the normalized base URL)
    pub root: UrlNode,

    /// Number of nodes in the tree
    pub total: usize,

    /// Human-readable per-page failures
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_child_dedups() {
        let mut tree = UrlTree::new("https://example.com/");
        let root = tree.root();

        let a = tree.add_child(root, "https://example.com/a").unwrap();
        assert!(tree.add_child(root, "https://example.com/a").is_none());
        assert!(tree.add_child(a, "https://example.com/").is_none());
        tree.add_child(a, "https://example.com/a/b").unwrap();

        assert_eq!(tree.len(), 3);
        assert_eq!(tree.by_url.get("https://example.com/a"), Some(&a));
    }

    #[test]
    fn test_into_root_preserves_order_and_metadata() {
        let mut tree = UrlTree::new("https://example.com/");
        let root = tree.root();
        let b = tree.add_child(root, "https://example.com/b").unwrap();
        tree.add_child(root, "https://example.com/a").unwrap();
        tree.add_child(b, "https://example.com/b/1").unwrap();
        tree.set_metadata(
            b,
            PageMetadata {
                title: Some("B".to_string()),
                description: None,
            },
        );

        let node = tree.into_root();
        assert_eq!(node.children.len(), 2);
        assert_eq!(node.children[0].url, "https://example.com/b");
        assert_eq!(node.children[0].title.as_deref(), Some("B"));
        assert_eq!(node.children[1].url, "https://example.com/a");

        let flat: Vec<&str> = node.flatten().iter().map(|n| n.url.as_str()).collect();
        assert_eq!(
            flat,
            vec![
                "https://example.com/",
                "https://example.com/b",
                "https://example.com/b/1",
                "https://example.com/a",
            ]
        );
        assert_eq!(node.depth_of("https://example.com/b/1"), Some(2));
        assert_eq!(node.depth_of("https://example.com/missing"), None);
    }
}
