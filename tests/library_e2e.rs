//! Drives the six end-to-end scenarios against a literal library program,
//! the way `examples/univrs-metadol/tests/integration_tests.rs` drives
//! fixtures through the public API rather than through internals.

use std::fs;

use serde_json::{json, Value};

use dpcl::ast::{Event, ObjectRef, Trigger};
use dpcl::directives::parse_event;
use dpcl::world::{FrameBody, Program};
use dpcl::{query, EngineConfig, Evaluator, Loader};

fn load_library() -> Program {
    let path = "tests/fixtures/library.json";
    let content = fs::read_to_string(path).expect("Failed to read tests/fixtures/library.json");
    let raw: Vec<Value> =
        serde_json::from_str(&content).expect("library.json must be a JSON array of directives");
    Loader::load(&raw).unwrap_or_else(|e| panic!("Failed to load library.json: {e:?}"))
}

fn request(agent: &str, action: Value) -> Event {
    let span = dpcl::ast::Span::at_directive(0);
    parse_event(&json!({"agent": agent, "action": action}), &span)
        .expect("well-formed action request")
}

fn bare(tag: &str) -> Event {
    Event::Atomic(tag.to_string())
}

// ============================================================
// 1. Register
// ============================================================

#[test]
fn register_grants_membership() {
    let mut program = load_library();
    let bare_events = std::mem::take(&mut program.bare_events);
    let mut evaluator = Evaluator::new(&mut program.world, EngineConfig::default());
    evaluator.submit_bare_events(bare_events).unwrap();

    evaluator
        .submit(request("alice", json!("#register")))
        .unwrap();

    assert!(evaluator.world().has("alice", "member"));
    let report = query::show(&ObjectRef::name("alice"), evaluator.world()).unwrap();
    let text = report.to_string();
    assert!(text.contains("student"), "{text}");
    assert!(text.contains("member"), "{text}");
}

// ============================================================
// 2. Borrow + return
// ============================================================

#[test]
fn borrow_then_return_destroys_the_instance() {
    let mut program = load_library();
    let bare_events = std::mem::take(&mut program.bare_events);
    let mut evaluator = Evaluator::new(&mut program.world, EngineConfig::default());
    evaluator.submit_bare_events(bare_events).unwrap();
    evaluator
        .submit(request("alice", json!("#register")))
        .unwrap();

    evaluator
        .submit(request(
            "alice",
            json!({"event": "#borrow", "refinement": {"item": "dracula"}}),
        ))
        .unwrap();

    let instance_id = evaluator
        .world()
        .instance_by_alias("b1")
        .expect("borrowing instance should be live after #borrow");
    let instance = evaluator.world().instance(instance_id).unwrap();
    assert_eq!(instance.bindings.get("lender"), Some(&ObjectRef::name("library")));
    assert_eq!(instance.bindings.get("borrower"), Some(&ObjectRef::name("alice")));
    assert_eq!(instance.bindings.get("item"), Some(&ObjectRef::name("dracula")));

    evaluator
        .submit(request(
            "alice",
            json!({"event": "#return", "refinement": {"item": "dracula"}}),
        ))
        .unwrap();

    assert!(!evaluator.world().instance_is_live(instance_id));
    assert!(evaluator.world().instance_by_alias("b1").is_none());
}

// ============================================================
// 3. Deadline + fine
// ============================================================

#[test]
fn timeout_violates_duty_and_creates_fine_power() {
    let mut program = load_library();
    let bare_events = std::mem::take(&mut program.bare_events);
    let mut evaluator = Evaluator::new(&mut program.world, EngineConfig::default());
    evaluator.submit_bare_events(bare_events).unwrap();
    evaluator
        .submit(request("alice", json!("#register")))
        .unwrap();
    evaluator
        .submit(request(
            "alice",
            json!({"event": "#borrow", "refinement": {"item": "dracula"}}),
        ))
        .unwrap();

    evaluator.submit(bare("timeout")).unwrap();

    let world = evaluator.world();
    let fine_power_live = world.frames_in_load_order().any(|id| {
        matches!(
            world.frame(id).map(|f| &f.body),
            Some(FrameBody::Power(p)) if p.alias.as_deref() == Some("fine_power")
        )
    });
    assert!(
        fine_power_live,
        "expected a power for the library to #fine to become live after the timeout violation"
    );

    evaluator
        .submit(request(
            "library",
            json!({"event": "#fine", "refinement": {"target": "alice"}}),
        ))
        .unwrap();
    assert!(evaluator.world().has("alice", "fined"));
}

// ============================================================
// 4. Request return
// ============================================================

#[test]
fn request_return_creates_new_duty_with_early_timeout_violation() {
    let mut program = load_library();
    let bare_events = std::mem::take(&mut program.bare_events);
    let mut evaluator = Evaluator::new(&mut program.world, EngineConfig::default());
    evaluator.submit_bare_events(bare_events).unwrap();
    evaluator
        .submit(request("alice", json!("#register")))
        .unwrap();
    evaluator
        .submit(request(
            "alice",
            json!({"event": "#borrow", "refinement": {"item": "dracula"}}),
        ))
        .unwrap();

    evaluator
        .submit(request(
            "library",
            json!({"event": "#request_return", "refinement": {"item": "dracula"}}),
        ))
        .unwrap();

    let world = evaluator.world();
    let violation = world.frames_in_load_order().find_map(|id| match world.frame(id).map(|f| &f.body) {
        Some(FrameBody::Deontic(d)) if d.frame.alias.as_deref() == Some("d2") => {
            Some(d.frame.violation.clone())
        }
        _ => None,
    });
    assert_eq!(
        violation,
        Some(Some(Trigger::OnEvent(Event::Atomic("early_timeout".to_string())))),
        "expected a new duty d2 with an #early_timeout violation trigger"
    );
}

// ============================================================
// 5. Unauthorized action
// ============================================================

#[test]
fn unauthorized_register_is_a_silent_no_op() {
    let mut program = load_library();
    let bare_events = std::mem::take(&mut program.bare_events);
    let mut evaluator = Evaluator::new(&mut program.world, EngineConfig::default());
    evaluator.submit_bare_events(bare_events).unwrap();

    evaluator.submit(request("bob", json!("#register"))).unwrap();

    assert!(!evaluator.world().has("bob", "member"));
}

// ============================================================
// 6. Double register
// ============================================================

#[test]
fn double_register_is_idempotent() {
    let mut program = load_library();
    let bare_events = std::mem::take(&mut program.bare_events);
    let mut evaluator = Evaluator::new(&mut program.world, EngineConfig::default());
    evaluator.submit_bare_events(bare_events).unwrap();

    evaluator
        .submit(request("alice", json!("#register")))
        .unwrap();
    evaluator
        .submit(request("alice", json!("#register")))
        .unwrap();

    assert_eq!(
        evaluator
            .world()
            .descriptors_of("alice")
            .filter(|d| *d == "member")
            .count(),
        1
    );
}
