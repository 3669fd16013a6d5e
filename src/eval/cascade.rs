//! The evaluator (C5): drives the cascade described in spec.md §4.5 over an
//! explicit [`WorkQueue`], one external input at a time, draining to
//! fixpoint before returning.
//!
//! Grounded on the teacher's `Interpreter` (`examples/univrs-metadol/src/eval/
//! interpreter.rs`): a struct owning the mutable state, a dispatch method per
//! event kind, `Result<_, _>` threaded through every step. Restructured from
//! expression-tree recursion to an explicit work queue per the
//! "Coroutine-free cascade" design note (spec.md §9).

use std::collections::BTreeMap;

use crate::ast::{Event, EventArg, ObjectRef, ProductionTarget};
use crate::condition;
use crate::error::{DpclError, RuntimeError};
use crate::eval::queue::WorkQueue;
use crate::unify;
use crate::world::{Bindings, FrameBody, LiveDeonticFrame, Owner, World};

/// Engine configuration. The step budget is the only termination-forcing
/// mechanism beyond natural fixpoint (spec.md §4.5's "Termination").
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Maximum number of event dispatches permitted within one cascade
    /// before [`DpclError::CascadeOverflow`] is surfaced.
    pub step_budget: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { step_budget: 10_000 }
    }
}

/// Drives cascades over an exclusively-owned [`World`].
pub struct Evaluator<'w> {
    world: &'w mut World,
    config: EngineConfig,
}

impl<'w> Evaluator<'w> {
    /// Creates an evaluator over `world` with the given configuration.
    pub fn new(world: &'w mut World, config: EngineConfig) -> Self {
        Self { world, config }
    }

    /// Read-only access to the world, e.g. for [`crate::query::show`]
    /// between cascades.
    pub fn world(&self) -> &World {
        self.world
    }

    /// Submits one external input event and drains the cascade to fixpoint
    /// (spec.md §5: "the evaluator must drain to fixpoint before accepting
    /// the next input").
    pub fn submit(&mut self, event: Event) -> Result<(), DpclError> {
        let mut queue = WorkQueue::new();
        queue.push(event, Owner::Root);
        self.drain(&mut queue)
    }

    /// Submits the bare events collected at load time (spec.md §6: "bare
    /// events, injected at load time"), each draining to fixpoint in order
    /// before the next is submitted.
    pub fn submit_bare_events(&mut self, events: Vec<Event>) -> Result<(), DpclError> {
        for event in events {
            self.submit(event)?;
        }
        Ok(())
    }

    fn drain(&mut self, queue: &mut WorkQueue) -> Result<(), DpclError> {
        while let Some((raw_event, owner)) = queue.pop() {
            if queue.dispatched() > self.config.step_budget {
                return Err(DpclError::CascadeOverflow {
                    step_budget: self.config.step_budget,
                });
            }
            let env = self.base_env_for_owner(owner);
            let event = instantiate_event(&raw_event, &env, self.world)?;
            self.dispatch(&event, owner, queue)?;
        }
        Ok(())
    }

    fn dispatch(&mut self, event: &Event, owner: Owner, queue: &mut WorkQueue) -> Result<(), DpclError> {
        self.match_powers(event, queue)?;
        self.match_reactive_rules(event, owner, queue)?;
        self.apply(event, owner, queue)?;
        self.run_transformational_fixpoint(queue)?;
        self.check_deontic_triggers(event, queue)?;
        Ok(())
    }

    /// Step 2: match `event` (when it is an external action request) against
    /// every live power frame, enqueueing instantiated consequences in load
    /// order.
    fn match_powers(&mut self, event: &Event, queue: &mut WorkQueue) -> Result<(), DpclError> {
        let (agent_ref, action) = match event {
            Event::Scoped { agent, action } => (agent, action.as_ref()),
            _ => return Ok(()),
        };
        let agent_name = self.world.lookup_ref(agent_ref, &Bindings::new())?;
        for id in self.world.frames_in_load_order().collect::<Vec<_>>() {
            let Some((power, owner)) = self.world.frame(id).and_then(|live| match &live.body {
                FrameBody::Power(p) => Some((p.clone(), live.owner)),
                _ => None,
            }) else {
                continue;
            };
            let base_env = self.base_env_for_owner(owner);
            if let Some(env) =
                unify::try_match_power(&power.holder, &power.action, &agent_name, action, self.world, &base_env)
            {
                let consequence = instantiate_event(&power.consequence, &env, self.world)?;
                queue.push(consequence, owner);
            }
        }
        Ok(())
    }

    /// Step 3: match `event` against every live reactive rule's `event`
    /// pattern (wildcard disallowed, per spec.md §9 Open Question 2),
    /// enqueueing instantiated reactions.
    fn match_reactive_rules(
        &mut self,
        event: &Event,
        producing_owner: Owner,
        queue: &mut WorkQueue,
    ) -> Result<(), DpclError> {
        for id in self.world.frames_in_load_order().collect::<Vec<_>>() {
            let Some((rule, owner)) = self.world.frame(id).and_then(|live| match &live.body {
                FrameBody::Reactive(r) => Some((r.clone(), live.owner)),
                _ => None,
            }) else {
                continue;
            };
            let base_env = self.base_env_for_owner(owner);
            if let Some(env) = unify::match_event(&rule.event, event, base_env, false) {
                let reaction = instantiate_event(&rule.reaction, &env, self.world)?;
                // A reaction takes effect in whichever scope owns the rule
                // that fired it, not necessarily the scope that produced the
                // triggering event.
                let _ = producing_owner;
                queue.push(reaction, owner);
            }
        }
        Ok(())
    }

    /// Step 4: applies a production or naming event's side effect. Action
    /// requests and bare/refined events have no direct side effect beyond
    /// the matching already performed in steps 2–3.
    fn apply(&mut self, event: &Event, owner: Owner, queue: &mut WorkQueue) -> Result<(), DpclError> {
        match event {
            Event::Plus(target) => self.apply_plus(target, owner, queue),
            Event::Minus(target) => self.apply_minus(target, owner),
            Event::Naming {
                entity,
                descriptor,
                gains,
            } => self.apply_naming(entity, descriptor, *gains, owner),
            _ => Ok(()),
        }
    }

    fn apply_plus(
        &mut self,
        target: &ProductionTarget,
        owner: Owner,
        queue: &mut WorkQueue,
    ) -> Result<(), DpclError> {
        match target {
            ProductionTarget::Power(frame) => {
                self.world.add_frame(FrameBody::Power((**frame).clone()), owner, frame.alias.clone());
                Ok(())
            }
            ProductionTarget::Deontic(frame) => {
                self.world.add_frame(
                    FrameBody::Deontic(LiveDeonticFrame::new((**frame).clone())),
                    owner,
                    frame.alias.clone(),
                );
                Ok(())
            }
            // Only a `Name` or `Refined` target names a compound-frame
            // template to instantiate. A `Scoped` target is the shape of
            // the synthetic `plus {scope: duty_alias, name: violated}`
            // notification spec.md §4.5 step 6 enqueues on violation: it
            // exists only to be observed by reactive rules in step 3 and
            // has no instantiation effect of its own here.
            ProductionTarget::Ref(object_ref @ (ObjectRef::Name(_) | ObjectRef::Refined { .. })) => {
                self.instantiate_template(object_ref, owner, queue)
            }
            ProductionTarget::Ref(_) => Ok(()),
        }
    }

    fn instantiate_template(
        &mut self,
        object_ref: &ObjectRef,
        owner: Owner,
        queue: &mut WorkQueue,
    ) -> Result<(), DpclError> {
        let (template_name, refinement, alias) = match object_ref {
            ObjectRef::Name(name) => (name.clone(), BTreeMap::new(), None),
            ObjectRef::Refined {
                object,
                refinement,
                alias,
            } => {
                let ObjectRef::Name(name) = object.as_ref() else {
                    return Err(RuntimeError::NotLive {
                        target: "plus target must name a compound-frame template".to_string(),
                    }
                    .into());
                };
                (name.clone(), refinement.clone(), alias.clone())
            }
            _ => unreachable!("caller only routes Name/Refined targets here"),
        };
        let Some(template) = self.world.template(&template_name).cloned() else {
            return Err(RuntimeError::NotLive { target: template_name }.into());
        };
        let mut bindings = BTreeMap::new();
        for param in &template.params {
            if let Some(value) = refinement.get(param) {
                bindings.insert(param.clone(), value.clone());
            }
        }
        let instance_id = self.world.create_instance(&template_name, bindings, owner);
        if let Some(alias) = alias {
            self.world.bind_instance_alias(alias, instance_id);
        }
        let instance_owner = Owner::Instance(instance_id);
        let instance_env = self.base_env_for_owner(instance_owner);

        for directive in &template.content {
            self.install_instance_directive(directive, instance_id, &instance_env, queue)?;
        }
        for descriptor in &template.initial_descriptors {
            let descriptor_name = self.world.lookup_ref(descriptor, &instance_env)?;
            let instance_name = World::instance_name(instance_id);
            self.world.assert_has(&instance_name, &descriptor_name);
        }
        Ok(())
    }

    fn install_instance_directive(
        &mut self,
        directive: &crate::ast::Directive,
        instance_id: crate::world::InstanceId,
        instance_env: &Bindings,
        queue: &mut WorkQueue,
    ) -> Result<(), DpclError> {
        use crate::ast::Directive;
        let owner = Owner::Instance(instance_id);
        match directive {
            Directive::AtomicDeclarations(names) => {
                for name in names {
                    self.world.declare_atomic(name);
                }
                Ok(())
            }
            Directive::Power(frame) => {
                self.world.add_frame(FrameBody::Power(frame.clone()), owner, frame.alias.clone());
                Ok(())
            }
            Directive::Deontic(frame) => {
                self.world.add_frame(
                    FrameBody::Deontic(LiveDeonticFrame::new(frame.clone())),
                    owner,
                    frame.alias.clone(),
                );
                Ok(())
            }
            Directive::Reactive(rule) => {
                self.world.add_frame(FrameBody::Reactive(rule.clone()), owner, rule.alias.clone());
                Ok(())
            }
            Directive::Transformational(rule) => {
                self.world.add_frame(
                    FrameBody::Transformational(rule.clone()),
                    owner,
                    rule.alias.clone(),
                );
                Ok(())
            }
            Directive::Compound(nested) => {
                self.world.register_template(nested.clone());
                Ok(())
            }
            Directive::BareEvent(event) => {
                let instantiated = instantiate_event(event, instance_env, self.world)?;
                queue.push(instantiated, owner);
                Ok(())
            }
        }
    }

    fn apply_minus(&mut self, target: &ObjectRef, owner: Owner) -> Result<(), DpclError> {
        let env = self.base_env_for_owner(owner);
        if matches!(target, ObjectRef::Reserved(crate::ast::Reserved::SelfRef)) {
            let Owner::Instance(id) = owner else {
                return Err(RuntimeError::UnboundReserved {
                    keyword: "self".to_string(),
                }
                .into());
            };
            self.world.destroy_instance(id);
            return Ok(());
        }
        // Check the target's own name against the alias tables before
        // calling `lookup_ref`: `lookup_ref` resolves an instance alias
        // straight to the instance's canonical `instance#N` name, and that
        // canonical name is never itself registered as an alias, so looking
        // it up a second time would always miss.
        let raw_name = match target {
            ObjectRef::Name(name) => name.clone(),
            _ => self.world.lookup_ref(target, &env)?,
        };
        if let Some(id) = self.world.instance_by_alias(&raw_name) {
            self.world.destroy_instance(id);
            return Ok(());
        }
        if let Some(frame_id) = self.world.frame_by_alias(&raw_name) {
            self.world.remove_frame(frame_id);
            return Ok(());
        }
        Err(RuntimeError::NotLive { target: raw_name }.into())
    }

    fn apply_naming(
        &mut self,
        entity: &ObjectRef,
        descriptor: &ObjectRef,
        gains: bool,
        owner: Owner,
    ) -> Result<(), DpclError> {
        let env = self.base_env_for_owner(owner);
        let entity_name = self.world.lookup_ref(entity, &env)?;
        let descriptor_name = self.world.lookup_ref(descriptor, &env)?;
        if gains {
            self.world.assert_has(&entity_name, &descriptor_name);
        } else {
            self.world.retract_has(&entity_name, &descriptor_name);
        }
        Ok(())
    }

    /// Step 5: re-runs every transformational rule until none fires
    /// (spec.md §4.5's fixpoint). Loop detection uses a per-iteration
    /// "world changed" flag rather than hashing the world.
    fn run_transformational_fixpoint(&mut self, queue: &mut WorkQueue) -> Result<(), DpclError> {
        loop {
            let mut changed = false;
            for id in self.world.frames_in_load_order().collect::<Vec<_>>() {
                let Some((rule, owner)) = self.world.frame(id).and_then(|live| match &live.body {
                    FrameBody::Transformational(r) => Some((r.clone(), live.owner)),
                    _ => None,
                }) else {
                    continue;
                };
                let env = self.base_env_for_owner(owner);
                if condition::eval(&rule.condition, &env, self.world) {
                    changed |= self.apply_conclusion(&rule.conclusion, &env, owner, queue)?;
                }
            }
            if !changed {
                return Ok(());
            }
        }
    }

    /// Applies a transformational rule's conclusion, returning whether it
    /// changed the world (monotone: re-asserting an existing relation is a
    /// no-op and does not count as a change, keeping the fixpoint loop
    /// terminating). A naming-shape conclusion asserts or retracts the `has`
    /// relation directly; any other shape (spec.md §4.5 step 5's `has`-shape
    /// object-reference assertion included) is an event and is enqueued for
    /// the cascade's next dispatch rather than applied in-place, since the
    /// fixpoint loop only ever touches descriptor relations directly.
    fn apply_conclusion(
        &mut self,
        conclusion: &Event,
        env: &Bindings,
        owner: Owner,
        queue: &mut WorkQueue,
    ) -> Result<bool, DpclError> {
        match conclusion {
            Event::Naming {
                entity,
                descriptor,
                gains,
            } => {
                let entity_name = self.world.lookup_ref(entity, env)?;
                let descriptor_name = self.world.lookup_ref(descriptor, env)?;
                let before = self.world.has(&entity_name, &descriptor_name);
                if *gains {
                    self.world.assert_has(&entity_name, &descriptor_name);
                } else {
                    self.world.retract_has(&entity_name, &descriptor_name);
                }
                Ok(before != *gains)
            }
            _ => {
                queue.push(conclusion.clone(), owner);
                Ok(false)
            }
        }
    }

    /// Step 6: checks every live deontic frame's violation/fulfillment/
    /// termination triggers against the event just processed and the
    /// post-fixpoint world.
    fn check_deontic_triggers(&mut self, event: &Event, queue: &mut WorkQueue) -> Result<(), DpclError> {
        for id in self.world.frames_in_load_order().collect::<Vec<_>>() {
            let Some((mut live, owner)) = self.world.frame(id).and_then(|live| match &live.body {
                FrameBody::Deontic(d) => Some((d.clone(), live.owner)),
                _ => None,
            }) else {
                continue;
            };
            let env = self.base_env_for_owner(owner);
            let mut retire = false;

            if let Some(fulfillment) = &live.frame.fulfillment {
                if self.trigger_fires(fulfillment, event, &env, &mut live.last_fulfillment) {
                    retire = true;
                }
            }
            if !retire {
                if let Some(termination) = &live.frame.termination {
                    if self.trigger_fires(termination, event, &env, &mut live.last_termination) {
                        retire = true;
                    }
                }
            }
            if let Some(violation) = &live.frame.violation {
                if self.trigger_fires(violation, event, &env, &mut live.last_violation) {
                    if let Some(alias) = &live.frame.alias {
                        let synthetic = Event::Plus(Box::new(ProductionTarget::Ref(ObjectRef::Scoped {
                            scope: Box::new(ObjectRef::name(alias.clone())),
                            name: "violated".to_string(),
                        })));
                        // Re-inject on the same work queue so reactive rules
                        // may observe it under the cascade's one step budget.
                        queue.push(synthetic, owner);
                    }
                }
            }

            if retire {
                self.world.remove_frame(id);
            } else if let Some(frame) = self.world.frame_mut(id) {
                frame.body = FrameBody::Deontic(live);
            }
        }
        Ok(())
    }

    /// Evaluates one trigger, updating its edge-trigger cache for
    /// boolean-shaped triggers (spec.md §9 Open Question 3).
    fn trigger_fires(
        &self,
        trigger: &crate::ast::Trigger,
        event: &Event,
        env: &Bindings,
        last_value: &mut Option<bool>,
    ) -> bool {
        match trigger {
            crate::ast::Trigger::OnEvent(pattern) => {
                unify::match_event(pattern, event, env.clone(), false).is_some()
            }
            crate::ast::Trigger::OnBecomesTrue(expr) => {
                let now = condition::eval(expr, env, self.world);
                let fired = now && *last_value != Some(true);
                *last_value = Some(now);
                fired
            }
        }
    }

    fn base_env_for_owner(&self, owner: Owner) -> Bindings {
        match owner {
            Owner::Root => Bindings::new(),
            Owner::Instance(id) => {
                let mut env = Bindings::new().with_self(World::instance_name(id));
                if let Some(inst) = self.world.instance(id) {
                    for (param, value) in &inst.bindings {
                        env = env.with_param(param.clone(), value.clone());
                    }
                    if let Owner::Instance(parent_id) = inst.parent {
                        env = env.with_super(World::instance_name(parent_id));
                    }
                }
                env
            }
        }
    }
}

/// Substitutes reserved keywords and bound parameter names throughout an
/// object reference with their resolved, concrete values.
fn instantiate_object_ref(
    object_ref: &ObjectRef,
    env: &Bindings,
    world: &World,
) -> Result<ObjectRef, DpclError> {
    match object_ref {
        ObjectRef::Reserved(_) => Ok(ObjectRef::name(world.lookup_ref(object_ref, env)?)),
        ObjectRef::Name(name) => match env.lookup_param(name) {
            Some(bound) => instantiate_object_ref(bound, env, world),
            None => Ok(object_ref.clone()),
        },
        ObjectRef::Wildcard => Ok(ObjectRef::Wildcard),
        ObjectRef::Refined {
            object,
            refinement,
            alias,
        } => {
            let object = Box::new(instantiate_object_ref(object, env, world)?);
            let refinement = refinement
                .iter()
                .map(|(k, v)| Ok((k.clone(), instantiate_object_ref(v, env, world)?)))
                .collect::<Result<BTreeMap<_, _>, DpclError>>()?;
            Ok(ObjectRef::Refined {
                object,
                refinement,
                alias: alias.clone(),
            })
        }
        ObjectRef::Scoped { scope, name } => Ok(ObjectRef::Scoped {
            scope: Box::new(instantiate_object_ref(scope, env, world)?),
            name: name.clone(),
        }),
    }
}

/// Substitutes reserved keywords and bound parameter names throughout an
/// event, producing a concrete event ready to enqueue or apply.
fn instantiate_event(event: &Event, env: &Bindings, world: &World) -> Result<Event, DpclError> {
    match event {
        Event::Atomic(tag) => Ok(Event::Atomic(tag.clone())),
        Event::Wildcard => Ok(Event::Wildcard),
        Event::Refined { tag, refinement } => {
            let refinement = refinement
                .iter()
                .map(|(k, v)| {
                    let v = match v {
                        EventArg::Object(o) => EventArg::Object(instantiate_object_ref(o, env, world)?),
                        EventArg::Event(e) => EventArg::Event(instantiate_event(e, env, world)?),
                    };
                    Ok((k.clone(), v))
                })
                .collect::<Result<BTreeMap<_, _>, DpclError>>()?;
            Ok(Event::Refined {
                tag: tag.clone(),
                refinement,
            })
        }
        Event::Scoped { agent, action } => Ok(Event::Scoped {
            agent: instantiate_object_ref(agent, env, world)?,
            action: Box::new(instantiate_event(action, env, world)?),
        }),
        Event::Plus(target) => {
            let target = match target.as_ref() {
                ProductionTarget::Ref(object_ref) => {
                    ProductionTarget::Ref(instantiate_object_ref(object_ref, env, world)?)
                }
                ProductionTarget::Power(frame) => ProductionTarget::Power(frame.clone()),
                ProductionTarget::Deontic(frame) => ProductionTarget::Deontic(frame.clone()),
            };
            Ok(Event::Plus(Box::new(target)))
        }
        Event::Minus(target) => {
            if matches!(target.as_ref(), ObjectRef::Reserved(crate::ast::Reserved::SelfRef)) {
                // Left unresolved: `apply_minus` special-cases a literal
                // `self` target to destroy the owning instance directly.
                // Resolving it here would bake in the owner's canonical
                // `instance#N` name, which has no alias registered under it
                // and so can never be destroyed again.
                Ok(Event::Minus(target.clone()))
            } else {
                Ok(Event::Minus(Box::new(instantiate_object_ref(target, env, world)?)))
            }
        }
        Event::Naming {
            entity,
            descriptor,
            gains,
        } => Ok(Event::Naming {
            entity: instantiate_object_ref(entity, env, world)?,
            descriptor: instantiate_object_ref(descriptor, env, world)?,
            gains: *gains,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{DeonticPosition, DeonticFrame, PowerFrame, PowerPosition, Reserved, Span};

    fn span() -> Span {
        Span::at_directive(0)
    }

    #[test]
    fn power_match_enqueues_consequence_and_applies_naming() {
        let mut world = World::new();
        world.declare_atomic("alice");
        world.declare_atomic("student");
        world.declare_atomic("member");
        world.assert_has("alice", "student");
        world.add_frame(
            FrameBody::Power(PowerFrame {
                position: PowerPosition::Power,
                holder: ObjectRef::name("student"),
                action: Event::Atomic("register".into()),
                consequence: Event::Naming {
                    entity: ObjectRef::Reserved(Reserved::Holder),
                    descriptor: ObjectRef::name("member"),
                    gains: true,
                },
                alias: None,
                span: span(),
            }),
            Owner::Root,
            None,
        );

        let mut evaluator = Evaluator::new(&mut world, EngineConfig::default());
        evaluator
            .submit(Event::Scoped {
                agent: ObjectRef::name("alice"),
                action: Box::new(Event::Atomic("register".into())),
            })
            .unwrap();

        assert!(evaluator.world().has("alice", "member"));
    }

    #[test]
    fn unauthorized_request_is_a_silent_no_op() {
        let mut world = World::new();
        world.declare_atomic("bob");
        world.declare_atomic("student");
        world.add_frame(
            FrameBody::Power(PowerFrame {
                position: PowerPosition::Power,
                holder: ObjectRef::name("student"),
                action: Event::Atomic("register".into()),
                consequence: Event::Naming {
                    entity: ObjectRef::Reserved(Reserved::Holder),
                    descriptor: ObjectRef::name("member"),
                    gains: true,
                },
                alias: None,
                span: span(),
            }),
            Owner::Root,
            None,
        );

        let mut evaluator = Evaluator::new(&mut world, EngineConfig::default());
        evaluator
            .submit(Event::Scoped {
                agent: ObjectRef::name("bob"),
                action: Box::new(Event::Atomic("register".into())),
            })
            .unwrap();

        assert!(!evaluator.world().has("bob", "member"));
    }

    #[test]
    fn step_budget_overflow_surfaces_cascade_overflow() {
        let mut world = World::new();
        world.add_frame(
            FrameBody::Reactive(crate::ast::ReactiveRule {
                event: Event::Atomic("ping".into()),
                reaction: Event::Atomic("ping".into()),
                alias: None,
                span: span(),
            }),
            Owner::Root,
            None,
        );
        let mut evaluator = Evaluator::new(&mut world, EngineConfig { step_budget: 5 });
        let err = evaluator.submit(Event::Atomic("ping".into())).unwrap_err();
        assert!(matches!(err, DpclError::CascadeOverflow { step_budget: 5 }));
    }

    #[test]
    fn deontic_violation_enqueues_synthetic_event() {
        let mut world = World::new();
        world.declare_atomic("alice");
        world.add_frame(
            FrameBody::Deontic(LiveDeonticFrame::new(DeonticFrame {
                position: DeonticPosition::Duty,
                holder: ObjectRef::name("alice"),
                counterparty: None,
                action: Event::Atomic("return_book".into()),
                violation: Some(crate::ast::Trigger::OnEvent(Event::Atomic("timeout".into()))),
                fulfillment: None,
                termination: None,
                alias: Some("d1".to_string()),
                span: span(),
            })),
            Owner::Root,
            Some("d1".to_string()),
        );
        world.add_frame(
            FrameBody::Reactive(crate::ast::ReactiveRule {
                event: Event::Plus(Box::new(ProductionTarget::Ref(ObjectRef::Scoped {
                    scope: Box::new(ObjectRef::name("d1")),
                    name: "violated".to_string(),
                }))),
                reaction: Event::Naming {
                    entity: ObjectRef::name("alice"),
                    descriptor: ObjectRef::name("delinquent"),
                    gains: true,
                },
                alias: None,
                span: span(),
            }),
            Owner::Root,
            None,
        );

        let mut evaluator = Evaluator::new(&mut world, EngineConfig::default());
        evaluator.submit(Event::Atomic("timeout".into())).unwrap();

        assert!(evaluator.world().has("alice", "delinquent"));
    }
}
