//! Property-style checks for the seven invariants and the round-trip
//! property in spec.md §8, plus the public-API cascade-overflow path,
//! exercised through the same public API as `library_e2e.rs` rather than
//! through internals.

use std::collections::BTreeMap;
use std::fs;

use proptest::prelude::*;
use serde_json::{json, Value};

use dpcl::ast::{DeonticFrame, DeonticPosition, Event, ObjectRef, PowerFrame, PowerPosition, Span, Trigger};
use dpcl::directives::parse_event;
use dpcl::error::{DpclError, NameError};
use dpcl::world::{FrameBody, LiveDeonticFrame, Owner, Program};
use dpcl::{query, EngineConfig, Evaluator, Loader, World};

fn load_library() -> Program {
    let content = fs::read_to_string("tests/fixtures/library.json")
        .expect("Failed to read tests/fixtures/library.json");
    let raw: Vec<Value> =
        serde_json::from_str(&content).expect("library.json must be a JSON array of directives");
    Loader::load(&raw).unwrap_or_else(|e| panic!("Failed to load library.json: {e:?}"))
}

fn request(agent: &str, action: Value) -> Event {
    let span = Span::at_directive(0);
    parse_event(&json!({"agent": agent, "action": action}), &span).expect("well-formed action request")
}

// ============================================================
// 1. Determinism
// ============================================================

#[test]
fn replaying_the_same_inputs_yields_identical_world_states() {
    fn run() -> Vec<String> {
        let mut program = load_library();
        let bare_events = std::mem::take(&mut program.bare_events);
        let mut evaluator = Evaluator::new(&mut program.world, EngineConfig::default());
        evaluator.submit_bare_events(bare_events).unwrap();

        let mut snapshots = Vec::new();
        for event in [
            request("alice", json!("#register")),
            request("alice", json!({"event": "#borrow", "refinement": {"item": "dracula"}})),
            request("bob", json!("#register")),
        ] {
            evaluator.submit(event).unwrap();
            let report = query::show(&ObjectRef::name("alice"), evaluator.world()).unwrap();
            snapshots.push(report.to_string());
        }
        snapshots
    }

    assert_eq!(run(), run(), "identical input streams must yield identical show outputs at every step");
}

// ============================================================
// 2. Monotonic atomics
// ============================================================

proptest! {
    #[test]
    fn declared_atomics_never_disappear(
        toggles in prop::collection::vec((prop::sample::select(vec!["alice", "bob", "dracula"]), any::<bool>()), 0..20)
    ) {
        let mut program = load_library();
        let bare_events = std::mem::take(&mut program.bare_events);
        let mut evaluator = Evaluator::new(&mut program.world, EngineConfig::default());
        evaluator.submit_bare_events(bare_events).unwrap();

        for (entity, gains) in toggles {
            let event = Event::Naming {
                entity: ObjectRef::name(entity),
                descriptor: ObjectRef::name("member"),
                gains,
            };
            let _ = evaluator.submit(event);
        }

        for atomic in ["alice", "bob", "library", "student", "member", "dracula", "fined"] {
            prop_assert!(evaluator.world().is_atomic(atomic), "{atomic} should remain atomic");
        }
    }
}

// ============================================================
// 3. Alias uniqueness
// ============================================================

#[test]
fn rejects_duplicate_alias_across_different_directive_kinds_at_root() {
    let raw = vec![
        json!({"atomics": ["alice", "student", "member"]}),
        json!({
            "position": "power", "holder": "student", "action": "#register",
            "consequence": "#noop", "alias": "shared"
        }),
        json!({
            "event": "#ping", "reaction": "#pong", "alias": "shared"
        }),
    ];
    let err = Loader::load(&raw).unwrap_err();
    assert!(matches!(err, DpclError::Name(NameError::DuplicateAlias { .. })));
}

#[test]
fn same_alias_string_is_fine_across_distinct_lexical_scopes() {
    // "shared" is used once at the root program scope and once inside a
    // compound-frame template's own content scope. Per spec.md's invariant,
    // alias uniqueness is checked within a scope, and a template's content is
    // its own lexical scope distinct from the root program scope.
    let raw = vec![
        json!({
            "position": "power", "holder": "student", "action": "#register",
            "consequence": "#noop", "alias": "shared"
        }),
        json!({
            "object": "widget",
            "params": [],
            "content": [
                {
                    "position": "power", "holder": "owner", "action": "#use",
                    "consequence": "#noop", "alias": "shared"
                }
            ]
        }),
    ];
    Loader::load(&raw).expect("reusing an alias across distinct lexical scopes must be legal");
}

// ============================================================
// 4. Destruction cascade
// ============================================================

#[test]
fn destroying_an_instance_removes_its_whole_subtree() {
    let mut world = World::new();
    let parent_id = world.create_instance("outer", BTreeMap::new(), Owner::Root);
    world.bind_instance_alias("outer1", parent_id);

    let child_id = world.create_instance("inner", BTreeMap::new(), Owner::Instance(parent_id));
    world.bind_instance_alias("inner1", child_id);

    let frame_id = world.add_frame(
        FrameBody::Power(PowerFrame {
            position: PowerPosition::Power,
            holder: ObjectRef::name("alice"),
            action: Event::Atomic("use".into()),
            consequence: Event::Atomic("noop".into()),
            alias: Some("child_power".to_string()),
            span: Span::default(),
        }),
        Owner::Instance(child_id),
        Some("child_power".to_string()),
    );

    assert!(world.instance_is_live(parent_id));
    assert!(world.instance_is_live(child_id));
    assert!(world.frame_is_live(frame_id));

    world.destroy_instance(parent_id);

    assert!(!world.instance_is_live(parent_id));
    assert!(!world.instance_is_live(child_id), "destroying the parent must destroy owned children");
    assert!(!world.frame_is_live(frame_id), "destroying the parent must remove transitively-owned frames");
    assert!(world.instance_by_alias("outer1").is_none());
    assert!(world.instance_by_alias("inner1").is_none(), "a destroyed child's alias must not resolve");
    assert!(world.frame_by_alias("child_power").is_none());
}

// ============================================================
// 5. Fixpoint convergence (bounded)
// ============================================================

#[test]
fn an_unbounded_reactive_loop_surfaces_cascade_overflow_via_the_public_api() {
    let raw = vec![json!({"event": "#ping", "reaction": "#ping"})];
    let program = Loader::load(&raw).unwrap();
    let mut world = program.world;
    let mut evaluator = Evaluator::new(&mut world, EngineConfig { step_budget: 10 });

    let err = evaluator.submit(Event::Atomic("ping".to_string())).unwrap_err();
    assert!(matches!(err, DpclError::CascadeOverflow { step_budget: 10 }));
}

// ============================================================
// 6. Unification soundness
// ============================================================

proptest! {
    #[test]
    fn power_with_descriptor_holder_matches_iff_agent_has_it(has_student in any::<bool>()) {
        let mut program = load_library();
        let bare_events = std::mem::take(&mut program.bare_events);
        let mut evaluator = Evaluator::new(&mut program.world, EngineConfig::default());
        evaluator.submit_bare_events(bare_events).unwrap();

        if !has_student {
            // library.json's bare event already grants alice `student`;
            // retract it so the negative case is exercised too.
            let retract = Event::Naming {
                entity: ObjectRef::name("alice"),
                descriptor: ObjectRef::name("student"),
                gains: false,
            };
            evaluator.submit(retract).unwrap();
        }

        evaluator.submit(request("alice", json!("#register"))).unwrap();

        prop_assert_eq!(evaluator.world().has("alice", "member"), has_student);
    }
}

// ============================================================
// 7. Duty lifecycle
// ============================================================

#[test]
fn violation_never_retires_a_duty_but_fulfillment_does() {
    let mut world = World::new();
    world.declare_atomic("alice");
    world.declare_atomic("bob");

    let frame_id = world.add_frame(
        FrameBody::Deontic(LiveDeonticFrame::new(DeonticFrame {
            position: DeonticPosition::Duty,
            holder: ObjectRef::name("alice"),
            counterparty: Some(ObjectRef::name("bob")),
            action: Event::Atomic("pay".into()),
            violation: Some(Trigger::OnEvent(Event::Atomic("missed_deadline".into()))),
            fulfillment: Some(Trigger::OnEvent(Event::Atomic("paid".into()))),
            termination: None,
            alias: Some("d".to_string()),
            span: Span::default(),
        })),
        Owner::Root,
        Some("d".to_string()),
    );

    let mut evaluator = Evaluator::new(&mut world, EngineConfig::default());

    evaluator.submit(Event::Atomic("missed_deadline".into())).unwrap();
    assert!(evaluator.world().frame_is_live(frame_id), "a violation must not retire the duty");

    evaluator.submit(Event::Atomic("missed_deadline".into())).unwrap();
    assert!(
        evaluator.world().frame_is_live(frame_id),
        "repeated violations must still not retire the duty"
    );

    evaluator.submit(Event::Atomic("paid".into())).unwrap();
    assert!(!evaluator.world().frame_is_live(frame_id), "fulfillment must retire the duty");
}

#[test]
fn explicit_minus_retires_a_live_duty() {
    let mut world = World::new();
    world.declare_atomic("alice");

    let frame_id = world.add_frame(
        FrameBody::Deontic(LiveDeonticFrame::new(DeonticFrame {
            position: DeonticPosition::Duty,
            holder: ObjectRef::name("alice"),
            counterparty: None,
            action: Event::Atomic("pay".into()),
            violation: None,
            fulfillment: None,
            termination: None,
            alias: Some("d".to_string()),
            span: Span::default(),
        })),
        Owner::Root,
        Some("d".to_string()),
    );

    let mut evaluator = Evaluator::new(&mut world, EngineConfig::default());
    evaluator.submit(Event::Minus(Box::new(ObjectRef::name("d")))).unwrap();

    assert!(!evaluator.world().frame_is_live(frame_id));
}

// ============================================================
// Round-trip: show reflects gains immediately
// ============================================================

#[test]
fn show_reflects_a_gained_descriptor_immediately_and_a_lost_one_immediately() {
    let mut world = World::new();
    world.declare_atomic("alice");
    world.declare_atomic("member");
    let mut evaluator = Evaluator::new(&mut world, EngineConfig::default());

    evaluator
        .submit(Event::Naming {
            entity: ObjectRef::name("alice"),
            descriptor: ObjectRef::name("member"),
            gains: true,
        })
        .unwrap();
    let report = query::show(&ObjectRef::name("alice"), evaluator.world()).unwrap();
    assert!(report.to_string().contains("member"));

    evaluator
        .submit(Event::Naming {
            entity: ObjectRef::name("alice"),
            descriptor: ObjectRef::name("member"),
            gains: false,
        })
        .unwrap();
    let report = query::show(&ObjectRef::name("alice"), evaluator.world()).unwrap();
    assert!(!report.to_string().contains("has: member"), "{report}");
}
