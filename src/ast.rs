//! Term model for DPCL programs.
//!
//! This module defines the complete internal representation of a loaded DPCL
//! program: atomic entities, object references, events, power frames, deontic
//! frames, compound (template) frames, and the two kinds of rules. Every
//! variant here is distinguished by structural tag, never by field
//! absence — a refined object is never confused with a scoped object, a
//! production event is never confused with a naming event.
//!
//! The AST is immutable once [`crate::loader::Loader`] produces it; all
//! mutation happens in [`crate::world::World`].

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;

/// Source location of a directive or sub-term, for diagnostics.
///
/// Unlike a text-file lexer's line/column span, a DPCL program is a JSON
/// array of directives: `directive` is the index of the enclosing top-level
/// directive and `path` is a JSON-pointer-shaped breadcrumb to the offending
/// sub-term within it (e.g. `"/consequence/refinement/item"`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Span {
    /// Index of the top-level directive this span is within.
    pub directive: usize,
    /// JSON-pointer-shaped path from the directive root to the term.
    pub path: String,
}

impl Span {
    /// Creates a span rooted at a given directive index with an empty path.
    pub fn at_directive(directive: usize) -> Self {
        Self {
            directive,
            path: String::new(),
        }
    }

    /// Returns a new span with `segment` appended to the path.
    pub fn push(&self, segment: &str) -> Self {
        let mut path = self.path.clone();
        path.push('/');
        path.push_str(segment);
        Self {
            directive: self.directive,
            path,
        }
    }
}

/// Reserved words that name a dynamically-bound position rather than a
/// declared atomic or instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Reserved {
    /// The instance enclosing the frame currently being evaluated.
    SelfRef,
    /// The instance that created the enclosing instance (its template's
    /// owner), mirroring `self` one level up the ownership chain.
    Super,
    /// The agent bound as the holder of the enclosing frame.
    Holder,
}

/// A reference to an object: an entity, a reserved keyword, the wildcard, a
/// refinement of another reference, or a reference scoped to a named child
/// of another object.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ObjectRef {
    /// A bare name: an atomic, a descriptor, an instance alias, or a bound
    /// parameter, resolved against the current environment.
    Name(String),
    /// One of `self`, `super`, `holder`.
    Reserved(Reserved),
    /// The wildcard `*`, matching any object.
    Wildcard,
    /// `{object, refinement, alias?}` — parameterizes `object` by a mapping
    /// from parameter names to further object references.
    Refined {
        /// The object being refined.
        object: Box<ObjectRef>,
        /// Parameter bindings.
        refinement: BTreeMap<String, ObjectRef>,
        /// Optional alias for this refined object within its defining scope.
        alias: Option<String>,
    },
    /// `{scope, name}` — names a child of another object.
    Scoped {
        /// The enclosing object.
        scope: Box<ObjectRef>,
        /// The child's name within that scope.
        name: String,
    },
}

impl ObjectRef {
    /// Convenience constructor for a bare name reference.
    pub fn name(s: impl Into<String>) -> Self {
        ObjectRef::Name(s.into())
    }
}

/// An event: atomic, refined, an external action request, or one of the two
/// production/naming event shapes that mutate the world.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Event {
    /// `#tag` — an atomic event, identified only by its tag.
    Atomic(String),
    /// `{event: #tag, refinement}` — an atomic event parameterized by a
    /// mapping from parameter names (or event tags, for nested events) to
    /// object references or nested events.
    Refined {
        /// The event tag.
        tag: String,
        /// Parameter bindings: either an object reference or a nested event.
        refinement: BTreeMap<String, EventArg>,
    },
    /// `{agent, action}` — an external action request.
    Scoped {
        /// The agent performing the action.
        agent: ObjectRef,
        /// The action requested, itself an event.
        action: Box<Event>,
    },
    /// `{plus: object}` — creates a frame or instance.
    Plus(Box<ProductionTarget>),
    /// `{minus: object}` — destroys a frame or instance.
    Minus(Box<ObjectRef>),
    /// `{entity, descriptor, gains}` — adds or removes a `has` relation.
    Naming {
        /// The entity gaining or losing the descriptor.
        entity: ObjectRef,
        /// The descriptor.
        descriptor: ObjectRef,
        /// `true` to add the relation, `false` to remove it.
        gains: bool,
    },
    /// The wildcard event `#*`, matching any event (power-action unification
    /// only — see `unify::match_event`).
    Wildcard,
}

/// The target of a `plus` production event (spec.md §4.5 step 4): either a
/// reference to an object — a compound-frame template to instantiate, bare
/// or refined by parameter bindings — or a power/deontic frame asserted
/// directly in place, with no template instantiation involved.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ProductionTarget {
    /// Names a compound-frame template (optionally refined by the
    /// template's parameter bindings) or, for `minus`-shaped uses reused
    /// here, a live frame/instance alias.
    Ref(ObjectRef),
    /// An inline power frame literal.
    Power(Box<PowerFrame>),
    /// An inline deontic frame literal.
    Deontic(Box<DeonticFrame>),
}

/// A refinement value: either an object reference or a nested event,
/// matching spec.md's "refinement is a mapping from parameter names to
/// object references or from event tags to events."
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EventArg {
    /// An object-valued refinement argument.
    Object(ObjectRef),
    /// An event-valued refinement argument.
    Event(Event),
}

/// The institutional position a power frame asserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PowerPosition {
    /// Authority to bring about the consequence.
    Power,
    /// Subjection to another's power over this holder.
    Liability,
    /// Absence of power.
    Disability,
    /// Protection from another's power.
    Immunity,
}

/// The deontic position a deontic frame asserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DeonticPosition {
    /// An obligation to act.
    Duty,
    /// An obligation not to act.
    Prohibition,
    /// Freedom to act or not.
    Liberty,
    /// Entitlement to another's performance.
    Claim,
    /// Protection from another's claim.
    Protection,
    /// Absence of claim.
    NoClaim,
}

/// `{position, holder, action, consequence, alias?}`.
///
/// Asserts: when `holder` performs `action` (modulo refinement unification),
/// `consequence` fires.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PowerFrame {
    /// The institutional position this frame asserts.
    pub position: PowerPosition,
    /// Who holds the position.
    pub holder: ObjectRef,
    /// The action that, when performed, triggers the consequence.
    pub action: Event,
    /// The event that fires when the action unifies.
    pub consequence: Event,
    /// Optional alias for this frame within its defining scope.
    pub alias: Option<String>,
    /// Source location.
    pub span: Span,
}

/// A trigger attached to a deontic frame: either an event pattern or a
/// boolean expression evaluated edge-triggered (false→true).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Trigger {
    /// Fires when the named event pattern is observed.
    OnEvent(Event),
    /// Fires on the false→true transition of this boolean expression.
    OnBecomesTrue(BooleanExpr),
}

/// `{position, holder, counterparty?, action, violation?, fulfillment?, termination?, alias?}`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeonticFrame {
    /// The deontic position this frame asserts.
    pub position: DeonticPosition,
    /// Who bears the obligation/entitlement.
    pub holder: ObjectRef,
    /// The other party, if any.
    pub counterparty: Option<ObjectRef>,
    /// The action the obligation concerns.
    pub action: Event,
    /// Trigger that marks a breach; does not retire the frame.
    pub violation: Option<Trigger>,
    /// Trigger that discharges the obligation; retires the frame.
    pub fulfillment: Option<Trigger>,
    /// Trigger that ends the obligation without discharge; retires the frame.
    pub termination: Option<Trigger>,
    /// Optional alias for this frame within its defining scope.
    pub alias: Option<String>,
    /// Source location.
    pub span: Span,
}

/// A directive nested inside a compound frame's `content`, or appearing at
/// the top level of a program.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Directive {
    /// Declares a set of atomic entity names.
    AtomicDeclarations(Vec<String>),
    /// A static power frame.
    Power(PowerFrame),
    /// A static deontic frame.
    Deontic(DeonticFrame),
    /// A compound frame template declaration.
    Compound(CompoundFrame),
    /// A reactive rule.
    Reactive(ReactiveRule),
    /// A transformational rule.
    Transformational(TransformationalRule),
    /// A bare event, injected into the work queue at load time.
    BareEvent(Event),
}

/// `{object, params, content, initial_descriptors?}` — a schema for creating
/// instances.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CompoundFrame {
    /// The template's name, used to key it in the loader's template
    /// registry and to reference it from `plus`.
    pub object: String,
    /// Formal parameter names, bound positionally at instantiation.
    pub params: Vec<String>,
    /// Directives instantiated, with `self` bound to the new instance and
    /// each parameter bound to its argument, when `plus` creates an
    /// instance of this template.
    pub content: Vec<Directive>,
    /// Descriptors the new instance itself gains immediately on creation.
    pub initial_descriptors: Vec<ObjectRef>,
    /// Optional alias for the template.
    pub alias: Option<String>,
    /// Source location.
    pub span: Span,
}

/// `{condition, conclusion, alias?}` — when `condition` holds, `conclusion`
/// is asserted. Monotone: re-running a satisfied rule is a no-op.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransformationalRule {
    /// Guard evaluated against the current world.
    pub condition: BooleanExpr,
    /// The naming event or descriptor assertion applied when the guard
    /// holds.
    pub conclusion: Event,
    /// Optional alias for this rule.
    pub alias: Option<String>,
    /// Source location.
    pub span: Span,
}

/// `{event?, reaction, alias?}` — when `event` matches an observed event,
/// `reaction` fires. A rule with no `event` field is rejected at load time
/// (spec.md §9, Open Question 1).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReactiveRule {
    /// The event pattern that triggers this rule.
    pub event: Event,
    /// The transition event fired when `event` matches.
    pub reaction: Event,
    /// Optional alias for this rule.
    pub alias: Option<String>,
    /// Source location.
    pub span: Span,
}

/// A boolean condition evaluated over the world (C6).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BooleanExpr {
    /// A constant.
    Literal(bool),
    /// `{entity, has, descriptor}` — true iff both references resolve and
    /// `has(entity, descriptor) == has`.
    Descriptor {
        /// The entity under test.
        entity: ObjectRef,
        /// Whether the relation must hold (`true`) or must not (`false`).
        has: bool,
        /// The descriptor under test.
        descriptor: ObjectRef,
    },
    /// `{negate: expr}` — logical NOT.
    Negate(Box<BooleanExpr>),
    /// A bare object reference: true iff it resolves to a live object.
    Lives(ObjectRef),
}
