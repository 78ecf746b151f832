// Research types: outline, generated notes, run report

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// One planned section of the research tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineNode {
    pub title: String,
    /// Directions for the content stage. May be empty.
    pub instructions: String,
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    pub fn new(title: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            instructions: instructions.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<OutlineNode>) -> Self {
        self.children = children;
        self
    }
}

/// Location of a node: child indices starting from the top-level section
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    pub fn top(index: usize) -> Self {
        Self(vec![index])
    }

    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    pub fn parent(&self) -> Option<Self> {
        if self.0.len() > 1 {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        } else {
            None
        }
    }

    /// 0 for top-level sections
    pub fn level(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|i| (i + 1).to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}

/// The planned research tree: one or more top-level sections
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outline {
    pub sections: Vec<OutlineNode>,
}

impl Outline {
    pub fn new(sections: Vec<OutlineNode>) -> Self {
        Self { sections }
    }

    pub fn node(&self, path: &NodePath) -> Option<&OutlineNode> {
        let (first, rest) = path.indices().split_first()?;
        let mut node = self.sections.get(*first)?;
        for index in rest {
            node = node.children.get(*index)?;
        }
        Some(node)
    }

    /// Every node in pre-order (parent before children, siblings in order)
    pub fn walk(&self) -> Vec<(NodePath, &OutlineNode)> {
        let mut out = Vec::new();
        let mut stack: Vec<(NodePath, &OutlineNode)> = self
            .sections
            .iter()
            .enumerate()
            .rev()
            .map(|(i, node)| (NodePath::top(i), node))
            .collect();
        while let Some((path, node)) = stack.pop() {
            for (i, child) in node.children.iter().enumerate().rev() {
                stack.push((path.child(i), child));
            }
            out.push((path, node));
        }
        out
    }

    /// Titles of the ancestors of `path`, outermost first
    pub fn parent_titles(&self, path: &NodePath) -> Vec<&str> {
        let mut titles = Vec::new();
        let mut current = path.parent();
        while let Some(p) = current {
            if let Some(node) = self.node(&p) {
                titles.push(node.title.as_str());
            }
            current = p.parent();
        }
        titles.reverse();
        titles
    }

    pub fn len(&self) -> usize {
        self.walk().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Number of levels, counting the top level as one
    pub fn depth(&self) -> usize {
        self.walk()
            .iter()
            .map(|(path, _)| path.level() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Indented title tree, for `--plan-only` output
    pub fn render_tree(&self) -> String {
        let mut out = String::new();
        for (path, node) in self.walk() {
            out.push_str(&"  ".repeat(path.level()));
            out.push_str("- ");
            out.push_str(&node.title);
            out.push('\n');
        }
        out
    }
}

/// A cited source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    #[serde(default)]
    pub title: String,
    pub url: String,
}

/// Content produced for one outline node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedNote {
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub sources: Vec<Source>,
    /// Exact title of the outline parent; a label, not a reference
    pub parent: Option<String>,
}

/// Pipeline stage a failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Planning,
    Content,
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Planning => "planning",
            Stage::Content => "content",
            Stage::Write => "write",
        };
        f.write_str(s)
    }
}

/// A node that did not produce a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeFailure {
    pub title: String,
    pub stage: Stage,
    pub reason: String,
}

/// Outcome of a research run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Absolute paths of the notes written, in outline order
    pub written: Vec<PathBuf>,
    pub failures: Vec<NodeFailure>,
    /// The first top-level note, if it was written
    pub root_note: Option<PathBuf>,
    pub outline: Option<Outline>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_theory() -> Outline {
        Outline::new(vec![OutlineNode::new("Graph Theory", "root").with_children(vec![
            OutlineNode::new("Graphs", "g").with_children(vec![OutlineNode::new("Edges", "e")]),
            OutlineNode::new("Trees", "t"),
        ])])
    }

    #[test]
    fn test_walk_is_preorder() {
        let outline = graph_theory();
        let titles: Vec<&str> = outline.walk().iter().map(|(_, n)| n.title.as_str()).collect();
        assert_eq!(titles, ["Graph Theory", "Graphs", "Edges", "Trees"]);

        let paths: Vec<String> = outline.walk().iter().map(|(p, _)| p.to_string()).collect();
        assert_eq!(paths, ["1", "1.1", "1.1.1", "1.2"]);
    }

    #[test]
    fn test_node_lookup_and_parents() {
        let outline = graph_theory();
        let edges = NodePath::top(0).child(0).child(0);
        assert_eq!(outline.node(&edges).unwrap().title, "Edges");
        assert_eq!(outline.parent_titles(&edges), ["Graph Theory", "Graphs"]);
        assert!(outline.parent_titles(&NodePath::top(0)).is_empty());
        assert!(outline.node(&NodePath::top(3)).is_none());
    }

    #[test]
    fn test_len_and_depth() {
        let outline = graph_theory();
        assert_eq!(outline.len(), 4);
        assert_eq!(outline.depth(), 3);
    }

    #[test]
    fn test_node_path_parent_and_order() {
        let p = NodePath::top(1).child(2);
        assert_eq!(p.parent(), Some(NodePath::top(1)));
        assert_eq!(NodePath::top(1).parent(), None);
        assert!(NodePath::top(0).child(5) < NodePath::top(1));
        assert_eq!(p.level(), 1);
    }

    #[test]
    fn test_render_tree() {
        assert_eq!(
            graph_theory().render_tree(),
            "- Graph Theory\n  - Graphs\n    - Edges\n  - Trees\n"
        );
    }
}
