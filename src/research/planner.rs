// Planning stage
//
// One structured call turns the research query into an Outline. The model is
// asked for a flat list of {id, title, instructions, parent_id, level} entries;
// nested {title, instructions, children} trees are accepted as well. Anything
// that does not decode or does not form a valid tree fails the run.

use serde::Deserialize;
use serde_json::json;
use std::collections::{HashMap, HashSet};

use super::types::{Outline, OutlineNode};
use crate::config::constants::PLANNING_MAX_TOKENS;
use crate::errors::PlanningFailure;
use crate::gateway::{LlmGateway, Prompt, ResponseShape};
use crate::prompts::{planning_user_prompt, ContextDocument, PromptLibrary};

/// Soft size targets; plans outside them are used but logged
const TARGET_NOTES: std::ops::RangeInclusive<usize> = 10..=15;
const TARGET_LEVELS: std::ops::RangeInclusive<usize> = 3..=5;

/// One entry of a flat plan
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PlanEntry {
    id: String,
    title: String,
    #[serde(default)]
    instructions: String,
    #[serde(default)]
    parent_id: Option<String>,
    #[serde(default)]
    level: Option<usize>,
}

/// One node of a nested plan. Extra keys (`id`, `level`) are ignored
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PlanTree {
    title: String,
    #[serde(default)]
    instructions: String,
    #[serde(default)]
    children: Vec<PlanTree>,
    #[serde(default)]
    parent_id: Option<String>,
}

/// Every plan shape we accept from the model
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawPlan {
    Wrapped { notes: Vec<PlanEntry> },
    Flat(Vec<PlanEntry>),
    Tree(PlanTree),
    Forest(Vec<PlanTree>),
}

/// JSON schema sent with the planning request
pub fn plan_response_shape() -> ResponseShape {
    ResponseShape::new(
        "research_plan",
        "Hierarchical research plan as a flat list of notes",
        json!({
            "type": "object",
            "properties": {
                "notes": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string" },
                            "title": { "type": "string" },
                            "instructions": { "type": "string" },
                            "parent_id": { "type": ["string", "null"] },
                            "level": { "type": "integer" }
                        },
                        "required": ["id", "title", "instructions", "parent_id", "level"],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["notes"],
            "additionalProperties": false
        }),
    )
}

/// Planning stage over the planning backend
pub struct Planner {
    gateway: LlmGateway,
    model: String,
}

impl Planner {
    pub fn new(gateway: LlmGateway, model: impl Into<String>) -> Self {
        Self {
            gateway,
            model: model.into(),
        }
    }

    /// Produce the outline for `query`
    pub async fn plan(
        &self,
        query: &str,
        context: &[ContextDocument],
        prompts: &PromptLibrary,
    ) -> Result<Outline, PlanningFailure> {
        let prompt = Prompt {
            system: prompts.planning_system(query),
            user: planning_user_prompt(query, context),
            model: self.model.clone(),
            max_tokens: PLANNING_MAX_TOKENS,
        };

        tracing::info!(
            backend = self.gateway.backend(),
            model = %self.model,
            context_docs = context.len(),
            "Planning research structure"
        );

        let reply = self
            .gateway
            .generate_json::<RawPlan>(&prompt, Some(&plan_response_shape()))
            .await?;

        let outline = build_outline(reply.value)?;
        check_targets(&outline);
        tracing::info!(
            "Plan has {} note(s) across {} level(s)",
            outline.len(),
            outline.depth()
        );
        Ok(outline)
    }
}

/// Validate a decoded plan and turn it into an Outline
pub(crate) fn build_outline(plan: RawPlan) -> Result<Outline, PlanningFailure> {
    let sections = match plan {
        RawPlan::Wrapped { notes } | RawPlan::Flat(notes) => from_flat(notes)?,
        RawPlan::Tree(tree) => vec![from_tree(tree)?],
        RawPlan::Forest(trees) => trees
            .into_iter()
            .map(from_tree)
            .collect::<Result<Vec<_>, _>>()?,
    };
    if sections.is_empty() {
        return Err(invalid("plan contains no notes"));
    }
    Ok(Outline::new(sections))
}

fn invalid(reason: impl Into<String>) -> PlanningFailure {
    PlanningFailure::InvalidPlan(reason.into())
}

fn from_tree(tree: PlanTree) -> Result<OutlineNode, PlanningFailure> {
    let title = tree.title.trim().to_string();
    if title.is_empty() {
        return Err(invalid("a note has an empty title"));
    }
    // A flat entry that lost its id would otherwise decode as a detached tree
    if tree.parent_id.as_deref().is_some_and(|p| !p.trim().is_empty()) {
        return Err(invalid(format!("note '{}' has a parent_id but no id", title)));
    }
    let children = tree
        .children
        .into_iter()
        .map(from_tree)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(OutlineNode::new(title, tree.instructions).with_children(children))
}

fn from_flat(entries: Vec<PlanEntry>) -> Result<Vec<OutlineNode>, PlanningFailure> {
    if entries.is_empty() {
        return Err(invalid("plan contains no notes"));
    }

    let mut by_id: HashMap<&str, &PlanEntry> = HashMap::new();
    for entry in &entries {
        if entry.id.trim().is_empty() {
            return Err(invalid(format!("note '{}' has an empty id", entry.title)));
        }
        if entry.title.trim().is_empty() {
            return Err(invalid(format!("note '{}' has an empty title", entry.id)));
        }
        if by_id.insert(entry.id.as_str(), entry).is_some() {
            return Err(invalid(format!("duplicate note id '{}'", entry.id)));
        }
    }

    // Children grouped by parent, in plan order; roots have no parent
    let mut roots = Vec::new();
    let mut children: HashMap<&str, Vec<&PlanEntry>> = HashMap::new();
    for entry in &entries {
        match parent_of(entry) {
            None => {
                if let Some(level) = entry.level {
                    if level != 0 {
                        return Err(invalid(format!(
                            "root note '{}' has level {} (expected 0)",
                            entry.id, level
                        )));
                    }
                }
                roots.push(entry);
            }
            Some(parent_id) => {
                let parent = by_id.get(parent_id).ok_or_else(|| {
                    invalid(format!(
                        "note '{}' references unknown parent '{}'",
                        entry.id, parent_id
                    ))
                })?;
                if parent_id == entry.id {
                    return Err(invalid(format!("note '{}' is its own parent", entry.id)));
                }
                if let (Some(level), Some(parent_level)) = (entry.level, parent.level) {
                    if level != parent_level + 1 {
                        return Err(invalid(format!(
                            "note '{}' has level {} but its parent '{}' has level {}",
                            entry.id, level, parent.id, parent_level
                        )));
                    }
                }
                children.entry(parent_id).or_default().push(entry);
            }
        }
    }

    if roots.is_empty() {
        return Err(invalid("plan has no root note (every note has a parent)"));
    }
    if roots.len() > 1 {
        tracing::warn!(
            "Plan has {} root notes; each becomes a top-level section",
            roots.len()
        );
    }

    let mut visited = HashSet::new();
    let sections: Vec<OutlineNode> = roots
        .iter()
        .map(|root| attach(root, &children, &mut visited))
        .collect();

    if visited.len() != entries.len() {
        let orphaned: Vec<&str> = entries
            .iter()
            .filter(|e| !visited.contains(e.id.as_str()))
            .map(|e| e.id.as_str())
            .collect();
        return Err(invalid(format!(
            "notes not reachable from a root (cycle?): {}",
            orphaned.join(", ")
        )));
    }

    Ok(sections)
}

fn parent_of(entry: &PlanEntry) -> Option<&str> {
    entry
        .parent_id
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
}

fn attach<'a>(
    entry: &'a PlanEntry,
    children: &HashMap<&str, Vec<&'a PlanEntry>>,
    visited: &mut HashSet<&'a str>,
) -> OutlineNode {
    visited.insert(entry.id.as_str());
    let mut kids = Vec::new();
    for kid in children.get(entry.id.as_str()).into_iter().flatten() {
        if !visited.contains(kid.id.as_str()) {
            kids.push(attach(kid, children, visited));
        }
    }
    OutlineNode::new(entry.title.trim(), entry.instructions.clone()).with_children(kids)
}

fn check_targets(outline: &Outline) {
    let notes = outline.len();
    let levels = outline.depth();
    if !TARGET_NOTES.contains(&notes) {
        tracing::warn!(
            "Plan has {} notes (target {}-{}); proceeding anyway",
            notes,
            TARGET_NOTES.start(),
            TARGET_NOTES.end()
        );
    }
    if !TARGET_LEVELS.contains(&levels) {
        tracing::warn!(
            "Plan is {} level(s) deep (target {}-{}); proceeding anyway",
            levels,
            TARGET_LEVELS.start(),
            TARGET_LEVELS.end()
        );
    }
}
