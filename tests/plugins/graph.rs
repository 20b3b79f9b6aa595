use std::fs;
use tempfile::tempdir;
use tutorpath::core::error::TutorError;
use tutorpath::plugins::graph::{SKILL_GRAPH_FILE, SkillGraph, SkillNode};
use tutorpath::plugins::policy::PrerequisiteSource;

fn node(id: &str, prereqs: &[&str]) -> SkillNode {
    SkillNode {
        id: id.to_string(),
        title: id.to_uppercase(),
        prerequisites: prereqs.iter().map(|p| p.to_string()).collect(),
    }
}

fn validation_message(res: Result<SkillGraph, TutorError>) -> String {
    match res {
        Err(TutorError::ValidationError(msg)) => msg,
        Err(other) => panic!("expected validation error, got {other:?}"),
        Ok(_) => panic!("expected validation error, graph loaded"),
    }
}

#[test]
fn builtin_graph_resolves_and_keeps_order() {
    let graph = SkillGraph::builtin().unwrap();
    assert_eq!(graph.len(), 7);
    assert_eq!(
        graph.prerequisites_of("core.arrays"),
        &["prereq.programming.basics", "core.bigO.time"]
    );
    assert!(graph.prerequisites_of("prereq.math.basics").is_empty());
    assert!(graph.prerequisites_of("nope").is_empty());
    assert_eq!(graph.title_of("core.bigO.time"), Some("Time Complexity (Big O)"));
    assert!(graph.resolve("nope").is_none());

    let first = graph.skills().next().unwrap();
    assert_eq!(first.id, "prereq.math.basics");
}

#[test]
fn very_deep_chain_loads_and_walks() {
    let depth = 200_000;
    let nodes: Vec<SkillNode> = (0..depth)
        .map(|i| SkillNode {
            id: format!("s{}", i),
            title: format!("Skill {}", i),
            prerequisites: if i == 0 {
                Vec::new()
            } else {
                vec![format!("s{}", i - 1)]
            },
        })
        .collect();
    let graph = SkillGraph::from_nodes(nodes).unwrap();
    let path = graph.learning_path(&format!("s{}", depth - 1)).unwrap();
    assert_eq!(path.len(), depth);
    assert_eq!(path[0], "s0");
}

#[test]
fn deep_cycle_is_reported() {
    let depth = 50_000;
    let nodes: Vec<SkillNode> = (0..depth)
        .map(|i| SkillNode {
            id: format!("s{}", i),
            title: String::new(),
            prerequisites: vec![format!("s{}", (i + 1) % depth)],
        })
        .collect();
    let err = SkillGraph::from_nodes(nodes).unwrap_err();
    assert!(matches!(err, TutorError::ValidationError(msg) if msg.contains("cycle")));
}

#[test]
fn dependents_follow_declaration_order() {
    let graph = SkillGraph::builtin().unwrap();
    let ids: Vec<&str> = graph
        .dependents_of("core.bigO.time")
        .into_iter()
        .map(|n| n.id.as_str())
        .collect();
    assert_eq!(ids, vec!["core.bigO.space", "core.arrays", "core.search.binary"]);
}

#[test]
fn learning_path_puts_prerequisites_first() {
    let graph = SkillGraph::builtin().unwrap();
    let path = graph.learning_path("core.search.binary").unwrap();
    assert_eq!(path.last().map(String::as_str), Some("core.search.binary"));

    let pos = |id: &str| path.iter().position(|p| p == id).unwrap();
    for step in &path {
        for p in graph.prerequisites_of(step) {
            assert!(pos(p) < pos(step), "{p} must precede {step}");
        }
    }
    assert!(!path.contains(&"core.bigO.space".to_string()));
    assert_eq!(path.len(), 6);

    assert!(matches!(
        graph.learning_path("ghost"),
        Err(TutorError::UnknownSkill(_))
    ));
}

#[test]
fn cycles_are_rejected_with_path() {
    let msg = validation_message(SkillGraph::from_nodes(vec![
        node("a", &["c"]),
        node("b", &["a"]),
        node("c", &["b"]),
    ]));
    assert!(msg.starts_with("prerequisite cycle:"), "{msg}");
    assert!(msg.contains("a -> c -> b -> a"), "{msg}");
}

#[test]
fn broken_edges_are_rejected() {
    let msg = validation_message(SkillGraph::from_nodes(vec![node("a", &["missing"])]));
    assert!(msg.contains("unknown skill 'missing'"));

    let msg = validation_message(SkillGraph::from_nodes(vec![node("a", &["a"])]));
    assert!(msg.contains("itself"));

    let msg = validation_message(SkillGraph::from_nodes(vec![
        node("a", &[]),
        node("b", &["a", "a"]),
    ]));
    assert!(msg.contains("twice"));

    let msg = validation_message(SkillGraph::from_nodes(vec![node("a", &[]), node("a", &[])]));
    assert!(msg.contains("duplicate"));
}

#[test]
fn data_dir_overrides_embedded_graph() {
    let tmp = tempdir().unwrap();
    fs::write(
        tmp.path().join(SKILL_GRAPH_FILE),
        r#"
[[skills]]
id = "one"
title = "One"

[[skills]]
id = "two"
title = "Two"
prerequisites = ["one"]
"#,
    )
    .unwrap();

    let graph = SkillGraph::load(Some(tmp.path())).unwrap();
    assert_eq!(graph.len(), 2);
    assert_eq!(graph.prerequisites_of("two"), &["one"]);

    let empty = tempdir().unwrap();
    let fallback = SkillGraph::load(Some(empty.path())).unwrap();
    assert_eq!(fallback.len(), 7);
}
