//! Skill graph: an immutable DAG of skills and their prerequisites.
//!
//! The graph is validated once when it is loaded (unique ids, resolvable
//! prerequisites, no cycles) and is read-only afterwards, so it can be shared
//! across threads behind an `Arc` without locking.

use crate::core::assets;
use crate::core::error::TutorError;
use crate::plugins::policy::PrerequisiteSource;
use clap::{Parser, Subcommand};
use colored::Colorize;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const SKILL_GRAPH_FILE: &str = "skill_graph.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillNode {
    pub id: String,
    pub title: String,
    /// Review order matters: the first unmet prerequisite is reviewed first.
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SkillGraphFile {
    #[serde(default)]
    skills: Vec<SkillNode>,
}

#[derive(Debug, Clone)]
pub struct SkillGraph {
    nodes: FxHashMap<String, SkillNode>,
    order: Vec<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

impl SkillGraph {
    /// Build and validate a graph from nodes in declaration order.
    pub fn from_nodes(nodes: Vec<SkillNode>) -> Result<Self, TutorError> {
        let mut map = FxHashMap::default();
        let mut order = Vec::with_capacity(nodes.len());
        for node in nodes {
            if node.id.trim().is_empty() {
                return Err(TutorError::ValidationError(
                    "skill with empty id".to_string(),
                ));
            }
            if map.contains_key(&node.id) {
                return Err(TutorError::ValidationError(format!(
                    "duplicate skill id '{}'",
                    node.id
                )));
            }
            order.push(node.id.clone());
            map.insert(node.id.clone(), node);
        }

        let graph = Self { nodes: map, order };
        graph.check_edges()?;
        if let Some(cycle) = graph.find_cycle() {
            return Err(TutorError::ValidationError(format!(
                "prerequisite cycle: {}",
                cycle.join(" -> ")
            )));
        }
        Ok(graph)
    }

    pub fn from_toml(raw: &str) -> Result<Self, TutorError> {
        let file: SkillGraphFile = toml::from_str(raw)?;
        Self::from_nodes(file.skills)
    }

    pub fn builtin() -> Result<Self, TutorError> {
        Self::from_toml(assets::EMBEDDED_SKILL_GRAPH)
    }

    pub fn load(data_dir: Option<&Path>) -> Result<Self, TutorError> {
        Self::from_toml(&assets::load_data(data_dir, SKILL_GRAPH_FILE)?)
    }

    fn check_edges(&self) -> Result<(), TutorError> {
        for id in &self.order {
            let node = &self.nodes[id];
            let mut seen = FxHashSet::default();
            for p in &node.prerequisites {
                if p == id {
                    return Err(TutorError::ValidationError(format!(
                        "skill '{}' lists itself as a prerequisite",
                        id
                    )));
                }
                if !self.nodes.contains_key(p) {
                    return Err(TutorError::ValidationError(format!(
                        "skill '{}' requires unknown skill '{}'",
                        id, p
                    )));
                }
                if !seen.insert(p.as_str()) {
                    return Err(TutorError::ValidationError(format!(
                        "skill '{}' lists prerequisite '{}' twice",
                        id, p
                    )));
                }
            }
        }
        Ok(())
    }

    /// Depth-first search with an explicit stack of (skill, next prerequisite
    /// index), so arbitrarily deep graphs load without recursion.
    fn find_cycle(&self) -> Option<Vec<String>> {
        let mut marks: FxHashMap<&str, Mark> = FxHashMap::default();
        for root in &self.order {
            if marks.contains_key(root.as_str()) {
                continue;
            }
            marks.insert(root.as_str(), Mark::InProgress);
            let mut stack: Vec<(&str, usize)> = vec![(root.as_str(), 0)];
            while let Some(top) = stack.last_mut() {
                let (id, next) = *top;
                let Some(p) = self.prerequisites_of(id).get(next) else {
                    marks.insert(id, Mark::Done);
                    stack.pop();
                    continue;
                };
                top.1 += 1;
                match marks.get(p.as_str()).copied() {
                    Some(Mark::InProgress) => {
                        let start = stack.iter().position(|(s, _)| *s == p.as_str())?;
                        let mut cycle: Vec<String> =
                            stack[start..].iter().map(|(s, _)| s.to_string()).collect();
                        cycle.push(p.clone());
                        return Some(cycle);
                    }
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(p.as_str(), Mark::InProgress);
                        stack.push((p.as_str(), 0));
                    }
                }
            }
        }
        None
    }

    pub fn resolve(&self, id: &str) -> Option<&SkillNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn title_of(&self, id: &str) -> Option<&str> {
        self.nodes.get(id).map(|n| n.title.as_str())
    }

    /// Skills in declaration order.
    pub fn skills(&self) -> impl Iterator<Item = &SkillNode> {
        self.order.iter().map(|id| &self.nodes[id])
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Skills that list `id` as a prerequisite, in declaration order.
    pub fn dependents_of(&self, id: &str) -> Vec<&SkillNode> {
        self.skills()
            .filter(|n| n.prerequisites.iter().any(|p| p == id))
            .collect()
    }

    /// Every transitive prerequisite of `id` followed by `id` itself, such that each
    /// skill appears after all of its prerequisites.
    pub fn learning_path(&self, id: &str) -> Result<Vec<String>, TutorError> {
        if !self.contains(id) {
            return Err(TutorError::UnknownSkill(id.to_string()));
        }
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        let mut out = Vec::new();
        seen.insert(id);
        let mut stack: Vec<(&str, usize)> = vec![(id, 0)];
        while let Some(top) = stack.last_mut() {
            let (node, next) = *top;
            match self.prerequisites_of(node).get(next) {
                Some(p) => {
                    top.1 += 1;
                    if seen.insert(p.as_str()) {
                        stack.push((p.as_str(), 0));
                    }
                }
                None => {
                    out.push(node.to_string());
                    stack.pop();
                }
            }
        }
        Ok(out)
    }
}

impl PrerequisiteSource for SkillGraph {
    fn prerequisites_of(&self, id: &str) -> &[String] {
        self.nodes
            .get(id)
            .map(|n| n.prerequisites.as_slice())
            .unwrap_or(&[])
    }
}

// --- CLI ---

#[derive(Parser, Debug)]
#[clap(name = "graph", about = "Inspect the skill graph")]
pub struct GraphCli {
    #[clap(subcommand)]
    pub command: GraphCommand,
}

#[derive(Subcommand, Debug)]
pub enum GraphCommand {
    /// List every skill with its prerequisites.
    List {
        #[clap(long, default_value = "text")]
        format: String,
    },
    /// Show one skill, its prerequisites and the skills it unlocks.
    Show {
        #[clap(long)]
        id: String,
    },
    /// Print the ordered learning path that ends at a skill.
    Path {
        #[clap(long)]
        id: String,
    },
}

pub fn run_graph_cli(graph: &SkillGraph, cli: GraphCli) -> Result<(), TutorError> {
    match cli.command {
        GraphCommand::List { format } => {
            if format == "json" {
                let skills: Vec<&SkillNode> = graph.skills().collect();
                println!("{}", serde_json::to_string_pretty(&skills)?);
            } else {
                for node in graph.skills() {
                    let prereqs = if node.prerequisites.is_empty() {
                        "-".bright_black().to_string()
                    } else {
                        node.prerequisites.join(", ")
                    };
                    println!(
                        "{}  {}  <- {}",
                        node.id.bright_cyan(),
                        node.title.bright_white(),
                        prereqs
                    );
                }
            }
        }
        GraphCommand::Show { id } => {
            let node = graph
                .resolve(&id)
                .ok_or_else(|| TutorError::UnknownSkill(id.clone()))?;
            let dependents: Vec<&str> = graph
                .dependents_of(&id)
                .into_iter()
                .map(|n| n.id.as_str())
                .collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "id": node.id,
                    "title": node.title,
                    "prerequisites": node.prerequisites,
                    "unlocks": dependents,
                }))?
            );
        }
        GraphCommand::Path { id } => {
            for (i, step) in graph.learning_path(&id)?.iter().enumerate() {
                println!(
                    "{:>2}. {}  {}",
                    i + 1,
                    step.bright_cyan(),
                    graph.title_of(step).unwrap_or_default()
                );
            }
        }
    }
    Ok(())
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "graph",
        "version": "0.1.0",
        "description": "Read-only skill DAG with prerequisite edges",
        "commands": [
            { "name": "list", "parameters": ["format"] },
            { "name": "show", "parameters": ["id"] },
            { "name": "path", "parameters": ["id"] }
        ],
        "storage": [SKILL_GRAPH_FILE]
    })
}
