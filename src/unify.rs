//! The unifier (C4): matches external action requests against power frames,
//! and matches observed events against reactive-rule event patterns, binding
//! refinement variables along the way.
//!
//! Unification here is deterministic and never backtracks within a single
//! frame: spec.md §4.4 defines exactly one accumulation pass per candidate
//! frame, either producing one environment or failing outright. A failed
//! match is not an error (spec.md §7's `unification_error` row): callers
//! receive `None` and move on to the next candidate frame.

use crate::ast::{Event, EventArg, ObjectRef};
use crate::world::{Bindings, World};

/// Attempts to unify an external action request's agent against a power
/// frame's `holder`. Returns the bindings so far on success.
///
/// - If `holder` resolves to a specific entity/instance name, the request's
///   agent must be exactly that name.
/// - If `holder` is a bare descriptor-typed reference, the request succeeds
///   only if `has(agent, holder)` currently holds.
fn match_holder(
    holder: &ObjectRef,
    agent: &str,
    world: &World,
    env: &Bindings,
) -> Option<Bindings> {
    match holder {
        ObjectRef::Reserved(crate::ast::Reserved::Holder) => {
            // A static `holder` field cannot itself be the literal keyword
            // `holder` in a well-formed program; treat it as "anyone" to
            // stay permissive rather than reject a pathological frame here.
            Some(env.clone().with_holder(agent))
        }
        ObjectRef::Wildcard => Some(env.clone().with_holder(agent)),
        ObjectRef::Name(name) => {
            if let Some(bound) = env.lookup_param(name) {
                // `holder` names a template parameter (e.g. a duty's own
                // "borrower"), bound in the owning instance's environment
                // rather than a statically declared atomic or descriptor.
                let resolved = world.lookup_ref(bound, env).ok()?;
                return if resolved == agent || world.has(agent, &resolved) {
                    Some(env.clone().with_holder(agent))
                } else {
                    None
                };
            }
            // `name` may denote a specific entity (identity match) or a
            // descriptor (agent must currently hold it) — both are plain
            // atomics in this model, so try either reading rather than
            // picking one based on how `name` happens to be declared.
            if name == agent || world.has(agent, name) {
                Some(env.clone().with_holder(agent))
            } else {
                None
            }
        }
        _ => {
            let resolved = world.lookup_ref(holder, env).ok()?;
            if resolved == agent || world.has(agent, &resolved) {
                Some(env.clone().with_holder(agent))
            } else {
                None
            }
        }
    }
}

/// Structurally unifies a request event `request` against a frame's action
/// pattern `pattern`, accumulating bindings into `env`. `allow_wildcard`
/// gates whether `#*` in `pattern` matches anything — true for power-action
/// matching, false for reactive-rule event matching (spec.md §9, Open
/// Question 2).
pub fn match_event(
    pattern: &Event,
    request: &Event,
    env: Bindings,
    allow_wildcard: bool,
) -> Option<Bindings> {
    match pattern {
        Event::Wildcard if allow_wildcard => Some(env),
        Event::Wildcard => None,
        Event::Atomic(tag) => match request {
            Event::Atomic(rtag) if rtag == tag => Some(env),
            _ => None,
        },
        Event::Refined {
            tag,
            refinement: pattern_refinement,
        } => {
            let (rtag, request_refinement) = match request {
                Event::Refined { tag, refinement } => (tag, Some(refinement)),
                Event::Atomic(tag) => (tag, None),
                _ => return None,
            };
            if rtag != tag {
                return None;
            }
            let mut env = env;
            for (key, pattern_value) in pattern_refinement {
                let request_value = request_refinement.and_then(|r| r.get(key));
                env = unify_refinement_value(key, pattern_value, request_value, env)?;
            }
            Some(env)
        }
        Event::Scoped { agent, action } => match request {
            Event::Scoped {
                agent: ragent,
                action: raction,
            } => {
                let agent_name = match agent {
                    ObjectRef::Name(n) => Some(n.clone()),
                    _ => None,
                };
                let req_agent_name = match ragent {
                    ObjectRef::Name(n) => Some(n.clone()),
                    _ => None,
                };
                if agent_name.is_some() && agent_name != req_agent_name {
                    return None;
                }
                match_event(action, raction, env, allow_wildcard)
            }
            _ => None,
        },
        Event::Plus(target) => match request {
            Event::Plus(rtarget) if target == rtarget => Some(env),
            _ => None,
        },
        Event::Minus(target) => match request {
            Event::Minus(rtarget) if target == rtarget => Some(env),
            _ => None,
        },
        Event::Naming {
            entity,
            descriptor,
            gains,
        } => match request {
            Event::Naming {
                entity: rentity,
                descriptor: rdescriptor,
                gains: rgains,
            } if entity == rentity && descriptor == rdescriptor && gains == rgains => Some(env),
            _ => None,
        },
    }
}

/// Resolves an object reference against only the dynamic environment (not
/// the world), used to decide whether a refinement-pattern key is already
/// "bound… under the current bindings" (spec.md §4.4(2)(a)) or is instead a
/// fresh "parameter name" to record a binding for (§4.4(2)(b)).
fn resolve_in_env(object_ref: &ObjectRef, env: &Bindings) -> Option<ObjectRef> {
    match object_ref {
        ObjectRef::Name(name) => env.lookup_param(name).cloned(),
        ObjectRef::Reserved(crate::ast::Reserved::SelfRef) => env.self_name().map(ObjectRef::name),
        ObjectRef::Reserved(crate::ast::Reserved::Holder) => env.holder_name().map(ObjectRef::name),
        ObjectRef::Reserved(crate::ast::Reserved::Super) => env.super_name().map(ObjectRef::name),
        _ => None,
    }
}

fn unify_refinement_value(
    key: &str,
    pattern_value: &EventArg,
    request_value: Option<&EventArg>,
    mut env: Bindings,
) -> Option<Bindings> {
    let _ = key;
    match pattern_value {
        EventArg::Object(pattern_obj) => {
            let request_obj = match request_value {
                Some(EventArg::Object(v)) => v,
                _ => return None,
            };
            if let Some(bound) = resolve_in_env(pattern_obj, &env) {
                // (a) already bound under current bindings: check equality.
                (bound == *request_obj).then_some(env)
            } else if let ObjectRef::Name(param) = pattern_obj {
                // (b) a free parameter name: record the binding.
                env = env.with_param(param.clone(), request_obj.clone());
                Some(env)
            } else {
                // Not a bindable name (e.g. a literal scoped/refined
                // reference with no env binding): structural equality.
                (pattern_obj == request_obj).then_some(env)
            }
        }
        EventArg::Event(expected) => match request_value {
            Some(EventArg::Event(actual)) => match_event(expected, actual, env, false),
            _ => None,
        },
    }
}

/// Attempts to unify an external action request against a power frame.
/// Returns the accumulated [`Bindings`] on success, `None` on a non-matching
/// request (not an error).
pub fn try_match_power(
    holder: &ObjectRef,
    action_pattern: &Event,
    agent: &str,
    request_action: &Event,
    world: &World,
    base_env: &Bindings,
) -> Option<Bindings> {
    let env = match_holder(holder, agent, world, base_env)?;
    match_event(action_pattern, request_action, env, true)
}
