//! The program loader (C2): validates a directives array, resolves aliases,
//! and produces a [`Program`] — a fully-populated [`World`] plus the bare
//! events to submit at the start of the first cascade.
//!
//! Grounded on the teacher's `parser.rs` (one function per construct,
//! structured errors rather than panics) and `hir/validate.rs` (a validation
//! pass over an already-lowered representation). Here the two collapse into
//! one pass, since a DPCL program has no surface syntax of its own to parse
//! separately from its schema.

use std::collections::HashMap;

use serde_json::Value;

use crate::ast::{CompoundFrame, Directive, Event, ObjectRef, ProductionTarget, Reserved, Span};
use crate::directives::parse_directive;
use crate::error::{DpclError, IoError, NameError};
use crate::world::{FrameBody, LiveDeonticFrame, Owner, Program, World};

const RESERVED_WORDS: [&str; 4] = ["self", "super", "holder", "*"];

/// Loads and validates a DPCL program.
pub struct Loader;

impl Loader {
    /// Parses and loads a program from raw JSON directive values (spec.md §6's
    /// "Program file").
    pub fn load(raw: &[Value]) -> Result<Program, DpclError> {
        let directives = raw
            .iter()
            .enumerate()
            .map(|(i, v)| parse_directive(v, &Span::at_directive(i)))
            .collect::<Result<Vec<_>, _>>()?;
        Self::load_directives(&directives)
    }

    /// Loads a program from an already-lowered, already-flattened directives
    /// array (post-`flatten_imports`, if the caller uses it).
    pub fn load_directives(directives: &[Directive]) -> Result<Program, DpclError> {
        let mut world = World::new();
        let mut bare_events = Vec::new();
        let mut scope: HashMap<String, Span> = HashMap::new();

        for directive in directives {
            install(directive, &mut world, &mut bare_events, &mut scope)?;
        }

        Ok(Program { world, bare_events })
    }

    /// Splices `{"import": {"path": ..., "alias": ...}}` directives into a
    /// raw directives array via `resolve`, a caller-supplied filesystem hook
    /// (spec.md §6's "simple textual inclusion"). The pure evaluation path
    /// never calls this; it exists for a future shell to call before
    /// [`Loader::load`].
    pub fn flatten_imports(
        values: Vec<Value>,
        resolve: &mut impl FnMut(&str) -> Result<Vec<Value>, IoError>,
    ) -> Result<Vec<Value>, IoError> {
        let mut out = Vec::new();
        for value in values {
            let import_path = value
                .as_object()
                .and_then(|obj| obj.get("import"))
                .and_then(|import| import.get("path"))
                .and_then(|p| p.as_str())
                .map(str::to_string);
            match import_path {
                Some(path) => {
                    let imported = resolve(&path)?;
                    out.extend(Self::flatten_imports(imported, resolve)?);
                }
                None => out.push(value),
            }
        }
        Ok(out)
    }
}

fn check_reserved(alias: &str, span: &Span) -> Result<(), NameError> {
    if RESERVED_WORDS.contains(&alias) {
        Err(NameError::ReservedKeywordMisuse {
            keyword: alias.to_string(),
            span: span.clone(),
        })
    } else {
        Ok(())
    }
}

fn register_alias(
    alias: &Option<String>,
    span: &Span,
    scope: &mut HashMap<String, Span>,
) -> Result<(), NameError> {
    let Some(alias) = alias else { return Ok(()) };
    check_reserved(alias, span)?;
    if let Some(first) = scope.get(alias) {
        return Err(NameError::DuplicateAlias {
            alias: alias.clone(),
            first: first.clone(),
            second: span.clone(),
        });
    }
    scope.insert(alias.clone(), span.clone());
    Ok(())
}

/// Statically rejects a `minus` target only when it is syntactically
/// guaranteed not to be `self` or a nameable frame/instance alias (SPEC_FULL
/// §4.2): a bare name is deferred to runtime since forward references to
/// frames declared later, or created dynamically via `plus`, are legal.
fn validate_minus_target(target: &ObjectRef, span: &Span) -> Result<(), NameError> {
    match target {
        ObjectRef::Reserved(Reserved::SelfRef) | ObjectRef::Name(_) => Ok(()),
        _ => Err(NameError::UnknownReference {
            name: "<minus target must be self or a live frame reference>".to_string(),
            span: span.clone(),
        }),
    }
}

/// Walks an event tree looking for `minus` targets to validate statically.
fn validate_event(event: &Event, span: &Span) -> Result<(), NameError> {
    match event {
        Event::Minus(target) => validate_minus_target(target, span),
        Event::Scoped { action, .. } => validate_event(action, span),
        Event::Plus(target) => validate_production_target(target, span),
        _ => Ok(()),
    }
}

/// Validates a `plus` target: a referenced template is left to runtime (a
/// forward reference is legal), but an inline frame literal's own nested
/// events (a power's `action`/`consequence`, a deontic's `action`) get the
/// same static `minus`-target check as any other directive.
fn validate_production_target(target: &ProductionTarget, span: &Span) -> Result<(), NameError> {
    match target {
        ProductionTarget::Ref(_) => Ok(()),
        ProductionTarget::Power(frame) => {
            validate_event(&frame.action, span)?;
            validate_event(&frame.consequence, span)
        }
        ProductionTarget::Deontic(frame) => validate_event(&frame.action, span),
    }
}

fn install(
    directive: &Directive,
    world: &mut World,
    bare_events: &mut Vec<Event>,
    scope: &mut HashMap<String, Span>,
) -> Result<(), DpclError> {
    match directive {
        Directive::AtomicDeclarations(names) => {
            for name in names {
                check_reserved(name, &Span::at_directive(0))?;
                world.declare_atomic(name);
            }
            Ok(())
        }
        Directive::Power(frame) => {
            register_alias(&frame.alias, &frame.span, scope)?;
            validate_event(&frame.action, &frame.span)?;
            validate_event(&frame.consequence, &frame.span)?;
            world.add_frame(FrameBody::Power(frame.clone()), Owner::Root, frame.alias.clone());
            Ok(())
        }
        Directive::Deontic(frame) => {
            register_alias(&frame.alias, &frame.span, scope)?;
            validate_event(&frame.action, &frame.span)?;
            world.add_frame(
                FrameBody::Deontic(LiveDeonticFrame::new(frame.clone())),
                Owner::Root,
                frame.alias.clone(),
            );
            Ok(())
        }
        Directive::Reactive(rule) => {
            register_alias(&rule.alias, &rule.span, scope)?;
            validate_event(&rule.event, &rule.span)?;
            validate_event(&rule.reaction, &rule.span)?;
            world.add_frame(FrameBody::Reactive(rule.clone()), Owner::Root, rule.alias.clone());
            Ok(())
        }
        Directive::Transformational(rule) => {
            register_alias(&rule.alias, &rule.span, scope)?;
            validate_event(&rule.conclusion, &rule.span)?;
            world.add_frame(
                FrameBody::Transformational(rule.clone()),
                Owner::Root,
                rule.alias.clone(),
            );
            Ok(())
        }
        Directive::Compound(template) => {
            register_alias(&template.alias, &template.span, scope)?;
            validate_template_content(template)?;
            world.register_template(template.clone());
            Ok(())
        }
        Directive::BareEvent(event) => {
            validate_event(event, &Span::at_directive(0))?;
            bare_events.push(event.clone());
            Ok(())
        }
    }
}

/// Validates aliases and `minus` targets within a template's `content`,
/// in the template's own defining scope (spec.md §3: "every alias is unique
/// within its defining scope"). Content directives are not installed into
/// any `World` here; they are instantiated fresh per-instance by the
/// evaluator when `plus` creates one.
fn validate_template_content(template: &CompoundFrame) -> Result<(), DpclError> {
    let mut scope: HashMap<String, Span> = HashMap::new();
    for directive in &template.content {
        validate_nested(directive, &mut scope)?;
    }
    Ok(())
}

fn validate_nested(directive: &Directive, scope: &mut HashMap<String, Span>) -> Result<(), DpclError> {
    match directive {
        Directive::AtomicDeclarations(names) => {
            for name in names {
                check_reserved(name, &Span::at_directive(0))?;
            }
            Ok(())
        }
        Directive::Power(frame) => {
            register_alias(&frame.alias, &frame.span, scope)?;
            validate_event(&frame.action, &frame.span)?;
            validate_event(&frame.consequence, &frame.span)?;
            Ok(())
        }
        Directive::Deontic(frame) => {
            register_alias(&frame.alias, &frame.span, scope)?;
            validate_event(&frame.action, &frame.span)?;
            Ok(())
        }
        Directive::Reactive(rule) => {
            register_alias(&rule.alias, &rule.span, scope)?;
            validate_event(&rule.event, &rule.span)?;
            validate_event(&rule.reaction, &rule.span)?;
            Ok(())
        }
        Directive::Transformational(rule) => {
            register_alias(&rule.alias, &rule.span, scope)?;
            validate_event(&rule.conclusion, &rule.span)?;
            Ok(())
        }
        Directive::Compound(template) => {
            register_alias(&template.alias, &template.span, scope)?;
            validate_template_content(template)
        }
        Directive::BareEvent(event) => validate_event(event, &Span::at_directive(0)).map_err(DpclError::from),
    }
}
