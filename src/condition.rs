//! The boolean/condition engine (C6): evaluates guards attached to
//! transformational rules and to deontic triggers.
//!
//! Unlike [`crate::unify`], evaluation here never fails and never mutates:
//! every [`BooleanExpr`] resolves to exactly one of `true`/`false` against a
//! given world and environment, mirroring the teacher's pure `eval_binary`/
//! `eval_unary` dispatch but over a three-variant logic rather than a full
//! expression language.

use crate::ast::{BooleanExpr, ObjectRef, Reserved};
use crate::world::{Bindings, World};

/// Evaluates a boolean expression against `world` under `env`.
///
/// An [`ObjectRef`](crate::ast::ObjectRef) that fails to resolve (e.g. a
/// dangling alias) is treated as "does not live" rather than propagated as an
/// error: conditions are a total function of the current world, and a stale
/// reference is simply false, not a malformed program (only the loader
/// rejects malformed programs).
pub fn eval(expr: &BooleanExpr, env: &Bindings, world: &World) -> bool {
    match expr {
        BooleanExpr::Literal(b) => *b,
        BooleanExpr::Descriptor {
            entity,
            has,
            descriptor,
        } => {
            let Ok(entity_name) = world.lookup_ref(entity, env) else {
                return false;
            };
            let Ok(descriptor_name) = world.lookup_ref(descriptor, env) else {
                return false;
            };
            world.has(&entity_name, &descriptor_name) == *has
        }
        BooleanExpr::Negate(inner) => !eval(inner, env, world),
        BooleanExpr::Lives(object_ref) => lives(object_ref, env, world),
    }
}

/// Liveness test for [`BooleanExpr::Lives`] (spec.md §4.6: "Bare object
/// reference → true iff the reference resolves to a live object (instance
/// or atomic)").
///
/// This deliberately does not reuse [`World::lookup_ref`]: that resolver's
/// bare-name fallback is meant to name any declared identifier for use in a
/// `has` relation, including descriptors that are never themselves the
/// subject of one, and so treats undeclared names as resolvable too. A
/// liveness check has no such latitude: an undeclared name must be false.
fn lives(object_ref: &ObjectRef, env: &Bindings, world: &World) -> bool {
    match object_ref {
        ObjectRef::Name(name) => {
            if world.is_live_object(name) {
                true
            } else if let Some(resolved) = env.instance_alias(name) {
                world.is_live_object(&resolved)
            } else if let Some(bound) = env.lookup_param(name) {
                lives(bound, env, world)
            } else {
                false
            }
        }
        ObjectRef::Reserved(Reserved::SelfRef) => {
            env.self_name().is_some_and(|name| world.is_live_object(&name))
        }
        ObjectRef::Reserved(Reserved::Holder) => {
            env.holder_name().is_some_and(|name| world.is_live_object(&name))
        }
        ObjectRef::Reserved(Reserved::Super) => {
            env.super_name().is_some_and(|name| world.is_live_object(&name))
        }
        ObjectRef::Wildcard => true,
        ObjectRef::Refined { alias, .. } => alias.as_deref().is_some_and(|alias| {
            world.instance_by_alias(alias).is_some()
                || env
                    .instance_alias(alias)
                    .is_some_and(|resolved| world.is_live_object(&resolved))
        }),
        ObjectRef::Scoped { scope, .. } => lives(scope, env, world),
    }
}
