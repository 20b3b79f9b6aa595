use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use tempfile::tempdir;
use tutorpath::core::audit::{self, AuditKind, AuditLog};
use tutorpath::core::config::TutorConfig;
use tutorpath::core::error::TutorError;
use tutorpath::core::store::StoreKind;
use tutorpath::plugins::explain::{ContentExplainer, Explanation};
use tutorpath::plugins::graph::SkillGraph;
use tutorpath::plugins::orchestrator::{GradeReport, IngestEvent, Tutor};
use tutorpath::plugins::policy::{Action, Confidence, Intent, PolicyConfig};
use tutorpath::plugins::questions::QuestionBank;
use tutorpath::plugins::state::MemoryStateStore;
use tutorpath::plugins::templating::DIAGNOSTIC_OPTIONS;

fn tutor_at(root_skill: &str) -> Tutor {
    Tutor::new(
        Arc::new(SkillGraph::builtin().unwrap()),
        Arc::new(QuestionBank::builtin().unwrap()),
        Box::new(MemoryStateStore::new()),
        PolicyConfig::default(),
        root_skill,
    )
    .unwrap()
}

fn tutor() -> Tutor {
    tutor_at("prereq.math.basics")
}

#[test]
fn start_offers_diagnostic_with_titles() {
    let t = tutor();
    let turn = t.decide_and_advance("s", None, Some("start")).unwrap();
    assert_eq!(turn.intent, Intent::Start);
    assert_eq!(turn.action, Action::OfferDiagnostic);
    assert_eq!(turn.titles.next_title.as_deref(), Some("Math Basics"));
    assert!(turn.question.is_none());

    let ui = t.render(&turn).unwrap();
    assert_eq!(ui.options, DIAGNOSTIC_OPTIONS.to_vec());
    assert!(ui.rationale.contains("Math Basics"));

    // START is stateless: a second start offers again
    let again = t.decide_and_advance("s", None, Some("start")).unwrap();
    assert_eq!(again.action, Action::OfferDiagnostic);
}

#[test]
fn questions_are_consumed_in_bank_order_until_exhausted() {
    let t = tutor();
    let mut ids = Vec::new();
    for _ in 0..3 {
        let turn = t.decide_and_advance("s", Some("next"), None).unwrap();
        assert_eq!(turn.action, Action::AskQuestion);
        assert_eq!(turn.confidence, Confidence::High);
        ids.push(turn.question.unwrap().id);
    }
    assert_eq!(ids, vec!["math.1", "math.2", "math.3"]);

    let state = t.snapshot("s").unwrap().unwrap();
    assert_eq!(state.cursor("prereq.math.basics"), 3);
    assert_eq!(state.pending_items("prereq.math.basics", t.bank()), 0);

    // nothing pending, not ready, no prerequisites: terminal fallback, empty question
    let turn = t.decide_and_advance("s", None, None).unwrap();
    assert_eq!(turn.action, Action::AskQuestion);
    assert_eq!(turn.confidence, Confidence::Low);
    assert!(turn.question.is_none());
    assert_eq!(t.snapshot("s").unwrap().unwrap().cursor("prereq.math.basics"), 3);
}

#[test]
fn questions_never_leak_answers() {
    let t = tutor();
    let turn = t.decide_and_advance("s", None, None).unwrap();
    let raw = serde_json::to_value(&turn).unwrap();
    assert!(raw["question"].get("answer").is_none());
    assert_eq!(raw["question"]["id"], "math.1");
}

#[test]
fn grading_updates_the_owning_skill() {
    let t = tutor();
    let ok = t.grade_answer("s", "bigo.2", " O(n) ").unwrap();
    assert!(ok.correct);
    assert_eq!(ok.skill, "core.bigO.time");
    assert_eq!(ok.expected, "O(n)");

    let bad = t.grade_answer("s", "bigo.1", "o(1)").unwrap();
    assert!(!bad.correct);

    let state = t.snapshot("s").unwrap().unwrap();
    let score = state.scores["core.bigO.time"];
    assert_eq!((score.correct, score.total), (1, 3));
}

#[test]
fn unknown_question_leaves_state_untouched() {
    let t = tutor();
    let err = t.grade_answer("fresh", "does-not-exist", "42").unwrap_err();
    assert!(matches!(err, TutorError::UnknownQuestion(_)));
    assert_eq!(err.code(), "unknown_question");
    assert_eq!(t.snapshot("fresh").unwrap(), None);

    t.grade_answer("known", "math.1", "32").unwrap();
    let before = t.snapshot("known").unwrap();
    t.grade_answer("known", "nope", "32").unwrap_err();
    assert_eq!(t.snapshot("known").unwrap(), before);
}

#[test]
fn review_moves_focus_to_first_unmet_prerequisite() {
    let t = tutor_at("core.bigO.time");
    t.grade_answer("s", "vocab.1", "algorithm").unwrap();

    let turn = t.decide_and_advance("s", None, None).unwrap();
    assert_eq!(turn.action, Action::ReviewPrereq);
    assert_eq!(turn.next_node.as_deref(), Some("prereq.algorithms.vocab"));
    assert_eq!(turn.from_node.as_deref(), Some("core.bigO.time"));
    assert_eq!(
        turn.titles.from_title.as_deref(),
        Some("Time Complexity (Big O)")
    );
    assert_eq!(
        t.snapshot("s").unwrap().unwrap().current_node,
        "prereq.algorithms.vocab"
    );

    let ui = t.render(&turn).unwrap();
    assert!(ui.rationale.contains("1/3 correct"), "{}", ui.rationale);
    assert!(ui.rationale.contains("head straight back"), "{}", ui.rationale);
}

#[test]
fn mastered_skill_advances_and_lists_unlocked_dependents() {
    let t = tutor();
    for _ in 0..3 {
        t.decide_and_advance("s", None, None).unwrap();
    }
    t.grade_answer("s", "math.1", "32").unwrap();
    t.grade_answer("s", "math.2", "3").unwrap();

    let turn = t.decide_and_advance("s", None, None).unwrap();
    assert_eq!(turn.action, Action::Advance);
    assert_eq!(turn.confidence, Confidence::High);
    assert_eq!(turn.unlocked, vec!["prereq.algorithms.vocab"]);
    assert_eq!(
        t.snapshot("s").unwrap().unwrap().current_node,
        "prereq.math.basics"
    );
    let ui = t.render(&turn).unwrap();
    assert!(ui.rationale.contains("2/3"), "{}", ui.rationale);
}

#[test]
fn declining_diagnostic_answers_content_and_remembers() {
    let t = tutor();
    let turn = t
        .decide_and_advance("s", None, Some("diagnostic_no"))
        .unwrap();
    assert_eq!(turn.action, Action::AnswerContent);
    assert!(t.snapshot("s").unwrap().unwrap().skipped_diagnostic);

    let ui = t.render(&turn).unwrap();
    let content = ui.content.unwrap();
    assert!(content.rationale.contains("skipped"));
    assert!(ui.rationale.contains("Math Basics"));

    t.decide_and_advance("s", None, Some("diagnostic_yes"))
        .unwrap();
    assert!(!t.snapshot("s").unwrap().unwrap().skipped_diagnostic);
}

struct CannedExplainer;

impl ContentExplainer for CannedExplainer {
    fn explain(&self, topic: &str, _skipped: bool) -> Result<Explanation, TutorError> {
        Ok(Explanation {
            content_markdown: format!("canned {topic}"),
            rationale: "canned".to_string(),
        })
    }
}

#[test]
fn explainer_is_pluggable() {
    let t = tutor().with_explainer(Box::new(CannedExplainer));
    let turn = t
        .decide_and_advance("s", None, Some("content_only"))
        .unwrap();
    let ui = t.render(&turn).unwrap();
    assert_eq!(ui.content.unwrap().content_markdown, "canned Math Basics");
}

#[test]
fn reset_forgets_the_session() {
    let t = tutor();
    t.decide_and_advance("s", None, None).unwrap();
    assert!(t.reset_session("s").unwrap());
    assert_eq!(t.snapshot("s").unwrap(), None);
    assert!(!t.reset_session("s").unwrap());

    let turn = t.decide_and_advance("s", None, None).unwrap();
    assert_eq!(turn.question.unwrap().id, "math.1");
}

#[test]
fn ingest_requires_question_id_for_answers() {
    let t = tutor();
    let err = t
        .ingest(&IngestEvent {
            session_id: "s".into(),
            action: Some("answer".into()),
            answer: Some("32".into()),
            ..Default::default()
        })
        .unwrap_err();
    match err {
        TutorError::ValidationError(msg) => {
            assert_eq!(msg, "question_id required when action=answer")
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(t.snapshot("s").unwrap(), None);
}

#[test]
fn ingest_grades_then_decides() {
    let t = tutor();
    let first = t
        .ingest(&IngestEvent {
            session_id: "s".into(),
            message: Some("hi".into()),
            ..Default::default()
        })
        .unwrap();
    assert!(first.graded.is_none());
    let q = first.result.ui.question.clone().unwrap();
    assert_eq!(q.id, "math.1");

    let resp = t
        .ingest(&IngestEvent {
            session_id: "s".into(),
            action: Some("answer".into()),
            question_id: Some(q.id),
            answer: Some("32".into()),
            ..Default::default()
        })
        .unwrap();
    match resp.graded {
        Some(GradeReport::Graded(g)) => assert!(g.correct),
        other => panic!("unexpected graded slot {other:?}"),
    }
    assert_eq!(resp.result.turn.question.unwrap().id, "math.2");

    let raw = serde_json::to_value(&first).unwrap();
    assert_eq!(raw["result"]["action"], "ASK_QUESTION");
    assert!(raw["result"]["ui"]["rationale"].is_string());
    assert!(raw["server_time"].as_str().unwrap().ends_with('Z'));
}

#[test]
fn ingest_reports_unknown_question_in_graded_slot() {
    let t = tutor();
    let resp = t
        .ingest(&IngestEvent {
            session_id: "s".into(),
            action: Some("answer".into()),
            question_id: Some("does-not-exist".into()),
            answer: Some("42".into()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(
        resp.graded,
        Some(GradeReport::Failed {
            error: "unknown_question".to_string()
        })
    );
    let raw = serde_json::to_value(&resp).unwrap();
    assert_eq!(raw["graded"]["error"], "unknown_question");
    assert!(t.snapshot("s").unwrap().unwrap().scores.is_empty());
}

#[test]
fn concurrent_turns_on_one_session_hand_out_distinct_questions() {
    let t = Arc::new(tutor());
    let handles: Vec<_> = (0..3)
        .map(|_| {
            let t = Arc::clone(&t);
            thread::spawn(move || {
                t.decide_and_advance("shared", None, None)
                    .unwrap()
                    .question
                    .map(|q| q.id)
            })
        })
        .collect();
    let ids: HashSet<String> = handles
        .into_iter()
        .filter_map(|h| h.join().unwrap())
        .collect();
    assert_eq!(ids.len(), 3);
    assert_eq!(
        t.snapshot("shared").unwrap().unwrap().cursor("prereq.math.basics"),
        3
    );
}

#[test]
fn unknown_root_skill_is_rejected() {
    let res = Tutor::new(
        Arc::new(SkillGraph::builtin().unwrap()),
        Arc::new(QuestionBank::builtin().unwrap()),
        Box::new(MemoryStateStore::new()),
        PolicyConfig::default(),
        "ghost.skill",
    );
    assert!(matches!(res, Err(TutorError::UnknownSkill(_))));
}

#[test]
fn configured_sqlite_tutor_persists_and_audits() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    let mut config = TutorConfig::default();
    config.store.backend = StoreKind::Sqlite;

    {
        let t = Tutor::from_config(root, &config).unwrap();
        t.ingest(&IngestEvent {
            session_id: "s".into(),
            action: Some("start".into()),
            ..Default::default()
        })
        .unwrap();
        t.decide_and_advance("s", None, None).unwrap();
        t.grade_answer("s", "math.1", "32").unwrap();
    }

    let t = Tutor::from_config(root, &config).unwrap();
    let state = t.snapshot("s").unwrap().unwrap();
    assert_eq!(state.cursor("prereq.math.basics"), 1);
    assert_eq!(state.scores["prereq.math.basics"].correct, 1);
    assert_eq!(t.list_sessions().unwrap(), vec!["s"]);

    let log = AuditLog::at(config.audit_path(root).unwrap());
    let entries = log.entries_for("s").unwrap();
    let kinds: Vec<AuditKind> = entries.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            AuditKind::Ingest,
            AuditKind::Decision,
            AuditKind::Decision,
            AuditKind::Graded
        ]
    );
    assert!(entries.iter().all(audit::verify_entry));
}
