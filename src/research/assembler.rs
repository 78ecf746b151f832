// Note assembler
//
// Turns the outline plus generated notes into Vault Files: unique file names,
// frontmatter, and the sources / related-notes sections that link the tree.
// `write_tree` writes children before their parent so that every link points
// at a file that exists.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;

use super::types::{GeneratedNote, NodePath, Outline, OutlineNode};
use crate::errors::VaultError;
use crate::vault::{sanitize_filename, wiki_link, Frontmatter, VaultFile, VaultStore, NOTE_EXTENSION};

/// Frontmatter `type` of every note we write
pub const NOTE_TYPE: &str = "note";

/// A file ready to be written, tagged with the node it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledNote {
    pub node: NodePath,
    pub file: VaultFile,
}

/// Result of `write_tree`: absolute paths in outline order, plus failed writes
#[derive(Debug, Default)]
pub struct WriteOutcome {
    pub written: BTreeMap<NodePath, PathBuf>,
    pub failed: Vec<(NodePath, VaultError)>,
}

pub struct Assembler<'a> {
    store: &'a VaultStore,
    root_name: Option<String>,
    created: String,
}

impl<'a> Assembler<'a> {
    /// `created` is stamped into every note's frontmatter
    pub fn new(store: &'a VaultStore, created: impl Into<String>) -> Self {
        Self {
            store,
            root_name: None,
            created: created.into(),
        }
    }

    /// File name (without extension) for the first top-level note
    pub fn with_root_name(mut self, name: Option<String>) -> Self {
        self.root_name = name.filter(|n| !n.trim().is_empty());
        self
    }

    /// Pick a unique stem for every outline node, in outline order.
    ///
    /// Nodes without a generated note still reserve a name so that links to
    /// them stay stable.
    pub fn assign_stems(&self, outline: &Outline) -> HashMap<NodePath, String> {
        let mut taken: HashSet<String> = HashSet::new();
        let mut stems = HashMap::new();

        for (path, node) in outline.walk() {
            let base = match (&self.root_name, path == NodePath::top(0)) {
                (Some(name), true) => sanitize_filename(name),
                _ => sanitize_filename(&node.title),
            };
            let mut stem = base.clone();
            let mut n = 2;
            while !self.is_free(&stem, &taken) {
                stem = format!("{}-{}", base, n);
                n += 1;
            }
            if stem != base {
                tracing::debug!("'{}' is taken, using '{}'", base, stem);
            }
            taken.insert(stem.to_lowercase());
            stems.insert(path, stem);
        }
        stems
    }

    // Case-insensitive so names stay distinct on case-folding filesystems
    fn is_free(&self, stem: &str, taken: &HashSet<String>) -> bool {
        !taken.contains(&stem.to_lowercase()) && !self.store.exists(&note_path(stem))
    }

    /// Build one Vault File per node that has a generated note, linking to
    /// every child that has one
    pub fn assemble(
        &self,
        outline: &Outline,
        notes: &BTreeMap<NodePath, GeneratedNote>,
    ) -> Vec<AssembledNote> {
        let stems = self.assign_stems(outline);
        outline
            .walk()
            .into_iter()
            .filter_map(|(path, node)| {
                let note = notes.get(&path)?;
                let parent = path
                    .parent()
                    .filter(|p| notes.contains_key(p))
                    .and_then(|p| stems.get(&p))
                    .map(String::as_str);
                let children: Vec<NodePath> = child_paths(&path, node)
                    .filter(|child| notes.contains_key(child))
                    .collect();
                self.build(&path, note, &stems, parent, &children)
            })
            .collect()
    }

    /// Assemble and write every note, deepest first.
    ///
    /// A parent lists only the children whose files were written. If a
    /// parent's own write fails, its written children are rewritten without
    /// the parent link.
    pub fn write_tree(
        &self,
        outline: &Outline,
        notes: &BTreeMap<NodePath, GeneratedNote>,
    ) -> WriteOutcome {
        let stems = self.assign_stems(outline);
        let mut outcome = WriteOutcome::default();

        for (path, node) in outline.walk().into_iter().rev() {
            let Some(note) = notes.get(&path) else {
                continue;
            };
            let parent = path
                .parent()
                .filter(|p| notes.contains_key(p))
                .and_then(|p| stems.get(&p))
                .map(String::as_str);
            let children: Vec<NodePath> = child_paths(&path, node)
                .filter(|child| outcome.written.contains_key(child))
                .collect();
            let Some(assembled) = self.build(&path, note, &stems, parent, &children) else {
                continue;
            };

            match self.store.write(&assembled.file) {
                Ok(written) => {
                    outcome.written.insert(path, written);
                }
                Err(e) => {
                    tracing::error!(node = %note.title, stage = "write", "{}", e);
                    for child in &children {
                        self.unlink_parent(outline, notes, &stems, child, &outcome.written);
                    }
                    outcome.failed.push((path, e));
                }
            }
        }
        outcome
    }

    fn unlink_parent(
        &self,
        outline: &Outline,
        notes: &BTreeMap<NodePath, GeneratedNote>,
        stems: &HashMap<NodePath, String>,
        path: &NodePath,
        written: &BTreeMap<NodePath, PathBuf>,
    ) {
        let (Some(node), Some(note)) = (outline.node(path), notes.get(path)) else {
            return;
        };
        let children: Vec<NodePath> = child_paths(path, node)
            .filter(|child| written.contains_key(child))
            .collect();
        if let Some(assembled) = self.build(path, note, stems, None, &children) {
            if let Err(e) = self.store.write(&assembled.file) {
                tracing::warn!("Could not drop the parent link from {}: {}", note.title, e);
            }
        }
    }

    fn build(
        &self,
        path: &NodePath,
        note: &GeneratedNote,
        stems: &HashMap<NodePath, String>,
        parent: Option<&str>,
        children: &[NodePath],
    ) -> Option<AssembledNote> {
        let stem = stems.get(path)?;
        let child_stems: Vec<&str> = children
            .iter()
            .filter_map(|child| stems.get(child).map(String::as_str))
            .collect();
        let body = render_body(note, parent, &child_stems);
        Some(AssembledNote {
            node: path.clone(),
            file: VaultFile::new(note_path(stem), self.frontmatter(note), body),
        })
    }

    fn frontmatter(&self, note: &GeneratedNote) -> Frontmatter {
        let mut fm = Frontmatter::new()
            .with_text("type", NOTE_TYPE)
            .with_list("tags", note.tags.clone());
        if let Some(parent) = &note.parent {
            fm = fm.with_text("parent", parent.clone());
        }
        fm.with_text("created", self.created.clone())
    }
}

fn child_paths<'n>(path: &'n NodePath, node: &OutlineNode) -> impl Iterator<Item = NodePath> + 'n {
    (0..node.children.len()).map(move |i| path.child(i))
}

fn note_path(stem: &str) -> PathBuf {
    PathBuf::from(format!("{}.{}", stem, NOTE_EXTENSION))
}

fn render_body(note: &GeneratedNote, parent: Option<&str>, children: &[&str]) -> String {
    let mut sections = vec![format!("# {}", note.title), note.body.trim().to_string()];

    if !note.sources.is_empty() {
        let lines: Vec<String> = note
            .sources
            .iter()
            .map(|s| format!("- [{}]({})", s.title.replace(['[', ']'], ""), s.url))
            .collect();
        sections.push(format!("## Sources\n\n{}", lines.join("\n")));
    }

    if parent.is_some() || !children.is_empty() {
        let mut lines = Vec::new();
        if let Some(parent) = parent {
            lines.push(format!("- Parent: {}", wiki_link(parent)));
        }
        for child in children {
            lines.push(format!("- {}", wiki_link(child)));
        }
        sections.push(format!("## Related Notes\n\n{}", lines.join("\n")));
    }

    let mut body = sections.join("\n\n");
    body.push('\n');
    body
}
