//! The world store (C3): atomics, `has` relations, live instances, and live
//! frames. The sole mutable object in the engine — [`crate::eval::cascade`]
//! owns it exclusively for the duration of a cascade.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::ast::{
    CompoundFrame, DeonticFrame, Directive, ObjectRef, PowerFrame, ReactiveRule, Reserved,
    TransformationalRule,
};
use crate::error::NameError;

/// Identifies a live frame instance arena-wide. Monotonic; never reused
/// after removal, matching the "Cyclic ownership" design note's "frames
/// storing ids rather than pointers."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub u64);

/// Identifies a live compound-frame instance arena-wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub u64);

/// The owner of a frame or instance: the top-level program, or another
/// instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    /// Declared at the top level of the program.
    Root,
    /// Owned by the instance that created it (via `plus`).
    Instance(InstanceId),
}

/// The content of a live frame: one of the four frame kinds.
#[derive(Debug, Clone)]
pub enum FrameBody {
    /// A power frame.
    Power(PowerFrame),
    /// A deontic frame, with its edge-trigger bookkeeping.
    Deontic(LiveDeonticFrame),
    /// A reactive rule.
    Reactive(ReactiveRule),
    /// A transformational rule.
    Transformational(TransformationalRule),
}

/// A deontic frame plus the last-observed truth value of each of its three
/// boolean-shaped triggers, needed to detect a false→true transition
/// (spec.md §9, Open Question 3).
#[derive(Debug, Clone)]
pub struct LiveDeonticFrame {
    /// The underlying frame.
    pub frame: DeonticFrame,
    /// Last value of the violation trigger, if boolean-shaped.
    pub last_violation: Option<bool>,
    /// Last value of the fulfillment trigger, if boolean-shaped.
    pub last_fulfillment: Option<bool>,
    /// Last value of the termination trigger, if boolean-shaped.
    pub last_termination: Option<bool>,
}

impl LiveDeonticFrame {
    /// Wraps a deontic frame with fresh (unobserved) edge-trigger state.
    pub fn new(frame: DeonticFrame) -> Self {
        Self {
            frame,
            last_violation: None,
            last_fulfillment: None,
            last_termination: None,
        }
    }
}

/// A frame together with its owner and optional alias.
#[derive(Debug, Clone)]
pub struct LiveFrame {
    /// The frame's content.
    pub body: FrameBody,
    /// Who owns (and can therefore transitively destroy) this frame.
    pub owner: Owner,
    /// The frame's alias, if any, unique within its owner's scope.
    pub alias: Option<String>,
}

/// A live instance of a compound-frame template.
#[derive(Debug, Clone)]
pub struct Instance {
    /// The template this instance was created from.
    pub template: String,
    /// Positional parameter bindings (`param -> argument`).
    pub bindings: BTreeMap<String, ObjectRef>,
    /// This instance's owner (the instance whose `plus` created it, or
    /// `Root` for a bare top-level `plus {object: template, ...}`).
    pub parent: Owner,
    /// Frames and child instances owned by this instance.
    pub owned_frames: Vec<FrameId>,
    /// Child instances created by frames owned by this instance.
    pub owned_children: Vec<InstanceId>,
}

/// The engine's single mutable state: declared atomics, `has` relations,
/// live instances, live frames, and the registered templates.
#[derive(Debug, Default)]
pub struct World {
    atomics: HashSet<String>,
    has: HashSet<(String, String)>,
    instances: HashMap<InstanceId, Instance>,
    frames: HashMap<FrameId, LiveFrame>,
    /// Append-only load-order index; tombstoned (not removed) on frame
    /// removal so iteration order stays stable across a cascade, per
    /// spec.md §4.5 step 2 and §5's reproducibility guarantee.
    frame_order: Vec<FrameId>,
    templates: HashMap<String, CompoundFrame>,
    /// Aliases bound to instances created by a `plus` of a refined object
    /// carrying an `alias` (spec.md §3's "refined object `{object,
    /// refinement, alias?}`"), persistent for the program's lifetime rather
    /// than scoped to one match, since later events may reference the
    /// instance by alias from anywhere.
    instance_aliases: HashMap<String, InstanceId>,
    next_frame_id: u64,
    next_instance_id: u64,
}

impl World {
    /// Creates an empty world.
    pub fn new() -> Self {
        Self::default()
    }

    // -- atomics ---------------------------------------------------------

    /// Declares an atomic entity. A no-op if already declared.
    pub fn declare_atomic(&mut self, name: &str) {
        self.atomics.insert(name.to_string());
    }

    /// Returns true if `name` was declared as an atomic.
    pub fn is_atomic(&self, name: &str) -> bool {
        self.atomics.contains(name)
    }

    // -- has relations -----------------------------------------------------

    /// Adds `has(entity, descriptor)`. A no-op if already present (set
    /// semantics, per spec.md §3 invariants).
    pub fn assert_has(&mut self, entity: &str, descriptor: &str) {
        self.has.insert((entity.to_string(), descriptor.to_string()));
    }

    /// Removes `has(entity, descriptor)`. A no-op if absent.
    pub fn retract_has(&mut self, entity: &str, descriptor: &str) {
        self.has.remove(&(entity.to_string(), descriptor.to_string()));
    }

    /// Returns whether `has(entity, descriptor)` currently holds.
    pub fn has(&self, entity: &str, descriptor: &str) -> bool {
        self.has.contains(&(entity.to_string(), descriptor.to_string()))
    }

    /// Iterates all descriptors `entity` currently has.
    pub fn descriptors_of<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.has
            .iter()
            .filter(move |(e, _)| e == entity)
            .map(|(_, d)| d.as_str())
    }

    // -- templates -----------------------------------------------------

    /// Registers a compound-frame template.
    pub fn register_template(&mut self, template: CompoundFrame) {
        self.templates.insert(template.object.clone(), template);
    }

    /// Looks up a registered template by name.
    pub fn template(&self, name: &str) -> Option<&CompoundFrame> {
        self.templates.get(name)
    }

    // -- instances -----------------------------------------------------

    /// Creates a new instance of `template`, bound to `bindings`, owned by
    /// `parent`. Does not instantiate `content` — that is the evaluator's
    /// job (it must enqueue/process `content` directives itself).
    pub fn create_instance(
        &mut self,
        template: &str,
        bindings: BTreeMap<String, ObjectRef>,
        parent: Owner,
    ) -> InstanceId {
        let id = InstanceId(self.next_instance_id);
        self.next_instance_id += 1;
        self.instances.insert(
            id,
            Instance {
                template: template.to_string(),
                bindings,
                parent,
                owned_frames: Vec::new(),
                owned_children: Vec::new(),
            },
        );
        if let Owner::Instance(parent_id) = parent {
            if let Some(parent_inst) = self.instances.get_mut(&parent_id) {
                parent_inst.owned_children.push(id);
            }
        }
        id
    }

    /// Returns the instance for `id`, if live.
    pub fn instance(&self, id: InstanceId) -> Option<&Instance> {
        self.instances.get(&id)
    }

    /// Returns true if `id` names a live instance.
    pub fn instance_is_live(&self, id: InstanceId) -> bool {
        self.instances.contains_key(&id)
    }

    /// The canonical name an instance is known by when no user alias was
    /// given, and the name `has` relations on it are stored under.
    pub fn instance_name(id: InstanceId) -> String {
        format!("instance#{}", id.0)
    }

    /// Binds `alias` to `id`, persistent for the program's lifetime.
    pub fn bind_instance_alias(&mut self, alias: impl Into<String>, id: InstanceId) {
        self.instance_aliases.insert(alias.into(), id);
    }

    /// Looks up an instance by a previously-bound alias.
    pub fn instance_by_alias(&self, alias: &str) -> Option<InstanceId> {
        self.instance_aliases.get(alias).copied()
    }

    /// Returns true iff `name` denotes a currently-live object: a declared
    /// atomic, an instance reachable by a bound alias, or an instance's own
    /// canonical `instance#N` name (spec.md §4.6: "a live object, instance
    /// or atomic"). Unlike [`Self::lookup_ref`], this never falls back to
    /// treating an undeclared name as resolvable.
    pub fn is_live_object(&self, name: &str) -> bool {
        if self.is_atomic(name) || self.instance_by_alias(name).is_some() {
            return true;
        }
        name.strip_prefix("instance#")
            .and_then(|n| n.parse::<u64>().ok())
            .is_some_and(|n| self.instance_is_live(InstanceId(n)))
    }

    /// Destroys an instance and recursively destroys everything it owns:
    /// its frames and its child instances (spec.md §3's destruction
    /// invariant).
    pub fn destroy_instance(&mut self, id: InstanceId) {
        let Some(inst) = self.instances.remove(&id) else {
            return;
        };
        self.instance_aliases.retain(|_, alias_id| *alias_id != id);
        for frame_id in inst.owned_frames {
            self.remove_frame(frame_id);
        }
        for child in inst.owned_children {
            self.destroy_instance(child);
        }
    }

    // -- frames -----------------------------------------------------

    /// Adds a live frame, scoped to `owner`, returning its fresh id.
    pub fn add_frame(&mut self, body: FrameBody, owner: Owner, alias: Option<String>) -> FrameId {
        let id = FrameId(self.next_frame_id);
        self.next_frame_id += 1;
        self.frames.insert(
            id,
            LiveFrame {
                body,
                owner,
                alias,
            },
        );
        self.frame_order.push(id);
        if let Owner::Instance(owner_id) = owner {
            if let Some(inst) = self.instances.get_mut(&owner_id) {
                inst.owned_frames.push(id);
            }
        }
        id
    }

    /// Removes a live frame by id. A no-op if already removed.
    pub fn remove_frame(&mut self, id: FrameId) {
        self.frames.remove(&id);
    }

    /// Returns true if `id` names a currently-live frame.
    pub fn frame_is_live(&self, id: FrameId) -> bool {
        self.frames.contains_key(&id)
    }

    /// Returns a live frame by id.
    pub fn frame(&self, id: FrameId) -> Option<&LiveFrame> {
        self.frames.get(&id)
    }

    /// Returns a mutable live frame by id (used to update deontic
    /// edge-trigger bookkeeping).
    pub fn frame_mut(&mut self, id: FrameId) -> Option<&mut LiveFrame> {
        self.frames.get_mut(&id)
    }

    /// Iterates live frame ids in load order (spec.md §4.5 step 2: "matching
    /// order is the load order of frames").
    pub fn frames_in_load_order(&self) -> impl Iterator<Item = FrameId> + '_ {
        self.frame_order.iter().copied().filter(move |id| self.frames.contains_key(id))
    }

    /// Finds a live frame by alias, searching all live frames (aliases are
    /// unique program-wide within their defining scope, so this is
    /// unambiguous in a well-formed program).
    pub fn frame_by_alias(&self, alias: &str) -> Option<FrameId> {
        self.frames_in_load_order()
            .find(|id| self.frames[id].alias.as_deref() == Some(alias))
    }

    /// Resolves an object reference against the current world. `env` gives
    /// the dynamic bindings (`self`, `holder`, `super`, and template
    /// parameters) in scope.
    ///
    /// Returns `Ok(Some(name))` when the reference resolves to a concrete
    /// entity/instance name usable in a `has` relation, `Ok(None)` when it
    /// resolves to something that does not have such a name (e.g. a bare
    /// descriptor used structurally), and `Err` when it cannot be resolved
    /// at all.
    pub fn lookup_ref(
        &self,
        object_ref: &ObjectRef,
        env: &Bindings,
    ) -> Result<String, NameError> {
        match object_ref {
            ObjectRef::Name(name) => {
                if let Some(id) = self.instance_by_alias(name) {
                    Ok(Self::instance_name(id))
                } else if self.is_atomic(name)
                    || self.frame_by_alias(name).is_some()
                    || env.instance_alias(name).is_some()
                {
                    Ok(name.clone())
                } else if let Some(bound) = env.lookup_param(name) {
                    self.lookup_ref(bound, env)
                } else {
                    // Descriptors and other uninstantiated atomics are still
                    // resolvable by bare name: any declared identifier is
                    // usable even if never the target of a `has`.
                    Ok(name.clone())
                }
            }
            ObjectRef::Reserved(Reserved::SelfRef) => env
                .self_name()
                .ok_or_else(|| NameError::UnknownReference {
                    name: "self".to_string(),
                    span: Default::default(),
                }),
            ObjectRef::Reserved(Reserved::Holder) => env
                .holder_name()
                .ok_or_else(|| NameError::UnknownReference {
                    name: "holder".to_string(),
                    span: Default::default(),
                }),
            ObjectRef::Reserved(Reserved::Super) => env
                .super_name()
                .ok_or_else(|| NameError::UnknownReference {
                    name: "super".to_string(),
                    span: Default::default(),
                }),
            ObjectRef::Wildcard => Ok("*".to_string()),
            ObjectRef::Refined { alias, .. } => {
                if let Some(alias) = alias {
                    if let Some(id) = self.instance_by_alias(alias) {
                        return Ok(Self::instance_name(id));
                    }
                    if let Some(name) = env.instance_alias(alias) {
                        return Ok(name);
                    }
                }
                Err(NameError::UnknownReference {
                    name: "<refined object>".to_string(),
                    span: Default::default(),
                })
            }
            ObjectRef::Scoped { scope, name } => {
                let scope_name = self.lookup_ref(scope, env)?;
                Ok(format!("{scope_name}.{name}"))
            }
        }
    }
}

/// Dynamic name bindings in scope while resolving a reference or matching an
/// event: `self`, `holder`, `super`, named instances created in the current
/// cascade, and template parameters.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    self_name: Option<String>,
    holder_name: Option<String>,
    super_name: Option<String>,
    params: BTreeMap<String, ObjectRef>,
    /// Aliases bound to resolved instance/entity names, for refined-object
    /// aliases created earlier in the same cascade.
    instance_aliases: BTreeMap<String, String>,
}

impl Bindings {
    /// Creates empty bindings (top-level / root scope).
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of these bindings with `self` bound to `name`.
    pub fn with_self(mut self, name: impl Into<String>) -> Self {
        self.self_name = Some(name.into());
        self
    }

    /// Returns a copy of these bindings with `holder` bound to `name`.
    pub fn with_holder(mut self, name: impl Into<String>) -> Self {
        self.holder_name = Some(name.into());
        self
    }

    /// Returns a copy of these bindings with `super` bound to `name`.
    pub fn with_super(mut self, name: impl Into<String>) -> Self {
        self.super_name = Some(name.into());
        self
    }

    /// Returns a copy of these bindings with `param` bound to `value`.
    pub fn with_param(mut self, param: impl Into<String>, value: ObjectRef) -> Self {
        self.params.insert(param.into(), value);
        self
    }

    /// Binds an alias to a resolved name (used by the unifier when a refined
    /// object carries an `alias`).
    pub fn bind_instance_alias(&mut self, alias: impl Into<String>, name: impl Into<String>) {
        self.instance_aliases.insert(alias.into(), name.into());
    }

    /// Returns the name bound to `self`, if any.
    pub fn self_name(&self) -> Option<String> {
        self.self_name.clone()
    }

    /// Returns the name bound to `holder`, if any.
    pub fn holder_name(&self) -> Option<String> {
        self.holder_name.clone()
    }

    /// Returns the name bound to `super`, if any.
    pub fn super_name(&self) -> Option<String> {
        self.super_name.clone()
    }

    /// Returns the object reference bound to a parameter name, if any.
    pub fn lookup_param(&self, name: &str) -> Option<&ObjectRef> {
        self.params.get(name)
    }

    /// Returns the resolved name bound to an instance alias, if any.
    pub fn instance_alias(&self, alias: &str) -> Option<String> {
        self.instance_aliases.get(alias).cloned()
    }
}

/// Top-level result of loading a program: a [`World`] with every atomic,
/// static frame, and template installed, plus the bare events spec.md §6
/// says are "injected at load time" — queued for the first cascade rather
/// than applied during loading itself, so they still go through the usual
/// power/reactive matching and fixpoint machinery.
#[derive(Debug, Default)]
pub struct Program {
    /// The constructed world.
    pub world: World,
    /// Bare top-level events to submit to the evaluator before any external
    /// input.
    pub bare_events: Vec<crate::ast::Event>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_relation_is_a_set() {
        let mut world = World::new();
        world.assert_has("alice", "member");
        world.assert_has("alice", "member");
        assert_eq!(world.descriptors_of("alice").count(), 1);
        world.retract_has("alice", "member");
        assert!(!world.has("alice", "member"));
        world.retract_has("alice", "member");
        assert!(!world.has("alice", "member"));
    }

    #[test]
    fn destroying_instance_cascades_to_owned_frames_and_children() {
        let mut world = World::new();
        let parent = world.create_instance("t", BTreeMap::new(), Owner::Root);
        let frame_id = world.add_frame(
            FrameBody::Reactive(ReactiveRule {
                event: crate::ast::Event::Atomic("tick".into()),
                reaction: crate::ast::Event::Atomic("tock".into()),
                alias: None,
                span: Default::default(),
            }),
            Owner::Instance(parent),
            None,
        );
        let child = world.create_instance("t2", BTreeMap::new(), Owner::Instance(parent));
        let child_frame = world.add_frame(
            FrameBody::Reactive(ReactiveRule {
                event: crate::ast::Event::Atomic("a".into()),
                reaction: crate::ast::Event::Atomic("b".into()),
                alias: None,
                span: Default::default(),
            }),
            Owner::Instance(child),
            None,
        );

        world.destroy_instance(parent);

        assert!(!world.instance_is_live(parent));
        assert!(!world.instance_is_live(child));
        assert!(!world.frame_is_live(frame_id));
        assert!(!world.frame_is_live(child_frame));
    }

    #[test]
    fn frames_iterate_in_load_order_even_after_removal() {
        let mut world = World::new();
        let rule = || ReactiveRule {
            event: crate::ast::Event::Atomic("x".into()),
            reaction: crate::ast::Event::Atomic("y".into()),
            alias: None,
            span: Default::default(),
        };
        let a = world.add_frame(FrameBody::Reactive(rule()), Owner::Root, None);
        let b = world.add_frame(FrameBody::Reactive(rule()), Owner::Root, None);
        let c = world.add_frame(FrameBody::Reactive(rule()), Owner::Root, None);
        world.remove_frame(b);
        let order: Vec<_> = world.frames_in_load_order().collect();
        assert_eq!(order, vec![a, c]);
    }
}
