//! Lowering of raw JSON directive values into the [`crate::ast`] term model.
//!
//! A DPCL program is "JSON directives conforming to a published schema"
//! (spec.md §1); this module is that schema's implementation, expressed as a
//! small recursive-descent reader over [`serde_json::Value`] rather than a
//! derived [`serde::Deserialize`] impl, because spec.md §4.1 requires object
//! references and events to be "distinguishable by structural tag, never by
//! field absence" — i.e. the reader must inspect which keys are present, the
//! same discipline a text-grammar parser applies to tokens. This plays the
//! role the teacher's `lexer`/`parser` pair plays for DOL source text, one
//! layer thinner because the surface syntax here is already JSON.
//!
//! Every parse function takes the [`Span`] of its enclosing directive and the
//! JSON-pointer path walked to reach the value being parsed, and returns a
//! [`SchemaError`] naming exactly where the program is malformed.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::ast::{
    BooleanExpr, CompoundFrame, DeonticFrame, DeonticPosition, Directive, Event, EventArg,
    ObjectRef, PowerFrame, PowerPosition, ProductionTarget, Reserved, Span, Trigger,
};
use crate::error::SchemaError;

fn missing(field: &str, span: &Span) -> SchemaError {
    SchemaError::MissingField {
        field: field.to_string(),
        span: span.clone(),
    }
}

fn unrecognized(message: impl Into<String>, span: &Span) -> SchemaError {
    SchemaError::UnrecognizedDirective {
        message: message.into(),
        span: span.clone(),
    }
}

fn get<'a>(obj: &'a Value, field: &str, span: &Span) -> Result<&'a Value, SchemaError> {
    obj.get(field).ok_or_else(|| missing(field, span))
}

/// Parses one top-level (or nested, inside a compound frame's `content`)
/// directive.
pub fn parse_directive(value: &Value, span: &Span) -> Result<Directive, SchemaError> {
    let obj = value
        .as_object()
        .ok_or_else(|| unrecognized("directive must be a JSON object or array", span))?;

    if let Some(atomics) = obj.get("atomics") {
        let names = atomics
            .as_array()
            .ok_or_else(|| unrecognized("'atomics' must be an array of strings", span))?
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| unrecognized("atomic names must be strings", span))
            })
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Directive::AtomicDeclarations(names));
    }

    if obj.contains_key("position") {
        let position = get(value, "position", span)?
            .as_str()
            .ok_or_else(|| unrecognized("'position' must be a string", span))?;
        return match position {
            "power" | "liability" | "disability" | "immunity" => {
                parse_power_frame(value, span).map(Directive::Power)
            }
            "duty" | "prohibition" | "liberty" | "claim" | "protection" | "no-claim" => {
                parse_deontic_frame(value, span).map(Directive::Deontic)
            }
            other => Err(unrecognized(format!("unknown position '{other}'"), span)),
        };
    }

    if obj.contains_key("params") && obj.contains_key("content") {
        return parse_compound_frame(value, span).map(Directive::Compound);
    }

    if obj.contains_key("event") && obj.contains_key("reaction") {
        let event_span = span.push("event");
        let event = parse_event(get(value, "event", span)?, &event_span)?;
        let reaction_span = span.push("reaction");
        let reaction = parse_event(get(value, "reaction", span)?, &reaction_span)?;
        let alias = parse_optional_alias(obj);
        return Ok(Directive::Reactive(crate::ast::ReactiveRule {
            event,
            reaction,
            alias,
            span: span.clone(),
        }));
    }
    if obj.contains_key("reaction") && !obj.contains_key("event") {
        return Err(SchemaError::ReactiveRuleMissingEvent { span: span.clone() });
    }

    if obj.contains_key("condition") && obj.contains_key("conclusion") {
        let condition = parse_boolean_expr(get(value, "condition", span)?, &span.push("condition"))?;
        let conclusion = parse_event(get(value, "conclusion", span)?, &span.push("conclusion"))?;
        let alias = parse_optional_alias(obj);
        return Ok(Directive::Transformational(
            crate::ast::TransformationalRule {
                condition,
                conclusion,
                alias,
                span: span.clone(),
            },
        ));
    }

    // Anything else is a bare event, injected at load time.
    parse_event(value, span).map(Directive::BareEvent)
}

fn parse_optional_alias(obj: &serde_json::Map<String, Value>) -> Option<String> {
    obj.get("alias").and_then(|v| v.as_str()).map(str::to_string)
}

fn parse_power_position(s: &str) -> PowerPosition {
    match s {
        "power" => PowerPosition::Power,
        "liability" => PowerPosition::Liability,
        "disability" => PowerPosition::Disability,
        _ => PowerPosition::Immunity,
    }
}

fn parse_deontic_position(s: &str) -> DeonticPosition {
    match s {
        "duty" => DeonticPosition::Duty,
        "prohibition" => DeonticPosition::Prohibition,
        "liberty" => DeonticPosition::Liberty,
        "claim" => DeonticPosition::Claim,
        "protection" => DeonticPosition::Protection,
        _ => DeonticPosition::NoClaim,
    }
}

fn parse_power_frame(value: &Value, span: &Span) -> Result<PowerFrame, SchemaError> {
    let position = parse_power_position(get(value, "position", span)?.as_str().unwrap_or(""));
    let holder = parse_object_ref(get(value, "holder", span)?, &span.push("holder"))?;
    let action = parse_event(get(value, "action", span)?, &span.push("action"))?;
    let consequence =
        parse_event(get(value, "consequence", span)?, &span.push("consequence"))?;
    let alias = value.as_object().and_then(parse_optional_alias);
    Ok(PowerFrame {
        position,
        holder,
        action,
        consequence,
        alias,
        span: span.clone(),
    })
}

fn parse_deontic_frame(value: &Value, span: &Span) -> Result<DeonticFrame, SchemaError> {
    let position = parse_deontic_position(get(value, "position", span)?.as_str().unwrap_or(""));
    let holder = parse_object_ref(get(value, "holder", span)?, &span.push("holder"))?;
    let counterparty = match value.get("counterparty") {
        Some(v) => Some(parse_object_ref(v, &span.push("counterparty"))?),
        None => None,
    };
    let action = parse_event(get(value, "action", span)?, &span.push("action"))?;
    let violation = match value.get("violation") {
        Some(v) => Some(parse_trigger(v, &span.push("violation"))?),
        None => None,
    };
    let fulfillment = match value.get("fulfillment") {
        Some(v) => Some(parse_trigger(v, &span.push("fulfillment"))?),
        None => None,
    };
    let termination = match value.get("termination") {
        Some(v) => Some(parse_trigger(v, &span.push("termination"))?),
        None => None,
    };
    let alias = value.as_object().and_then(parse_optional_alias);
    Ok(DeonticFrame {
        position,
        holder,
        counterparty,
        action,
        violation,
        fulfillment,
        termination,
        alias,
        span: span.clone(),
    })
}

fn parse_compound_frame(value: &Value, span: &Span) -> Result<CompoundFrame, SchemaError> {
    let object = get(value, "object", span)?
        .as_str()
        .ok_or_else(|| unrecognized("'object' must be a string", span))?
        .to_string();
    let params = get(value, "params", span)?
        .as_array()
        .ok_or_else(|| unrecognized("'params' must be an array", span))?
        .iter()
        .map(|v| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| unrecognized("params must be strings", span))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let content_span = span.push("content");
    let content = get(value, "content", span)?
        .as_array()
        .ok_or_else(|| unrecognized("'content' must be an array", span))?
        .iter()
        .enumerate()
        .map(|(i, v)| parse_directive(v, &content_span.push(&i.to_string())))
        .collect::<Result<Vec<_>, _>>()?;
    let initial_descriptors = match value.get("initial_descriptors") {
        Some(v) => v
            .as_array()
            .ok_or_else(|| unrecognized("'initial_descriptors' must be an array", span))?
            .iter()
            .map(|d| parse_object_ref(d, &span.push("initial_descriptors")))
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };
    let alias = value.as_object().and_then(parse_optional_alias);
    Ok(CompoundFrame {
        object,
        params,
        content,
        initial_descriptors,
        alias,
        span: span.clone(),
    })
}

fn parse_trigger(value: &Value, span: &Span) -> Result<Trigger, SchemaError> {
    if looks_like_event(value) {
        parse_event(value, span).map(Trigger::OnEvent)
    } else {
        parse_boolean_expr(value, span).map(Trigger::OnBecomesTrue)
    }
}

fn looks_like_event(value: &Value) -> bool {
    match value {
        Value::String(s) => s.starts_with('#'),
        Value::Object(obj) => {
            obj.contains_key("event")
                || (obj.contains_key("agent") && obj.contains_key("action"))
                || obj.contains_key("plus")
                || obj.contains_key("minus")
                || obj.contains_key("gains")
        }
        _ => false,
    }
}

/// Parses an object reference.
pub fn parse_object_ref(value: &Value, span: &Span) -> Result<ObjectRef, SchemaError> {
    match value {
        Value::String(s) => Ok(match s.as_str() {
            "self" => ObjectRef::Reserved(Reserved::SelfRef),
            "super" => ObjectRef::Reserved(Reserved::Super),
            "holder" => ObjectRef::Reserved(Reserved::Holder),
            "*" => ObjectRef::Wildcard,
            name => ObjectRef::Name(name.to_string()),
        }),
        Value::Object(obj) => {
            if obj.contains_key("scope") && obj.contains_key("name") {
                let scope = parse_object_ref(get(value, "scope", span)?, &span.push("scope"))?;
                let name = get(value, "name", span)?
                    .as_str()
                    .ok_or_else(|| unrecognized("'name' must be a string", span))?
                    .to_string();
                return Ok(ObjectRef::Scoped {
                    scope: Box::new(scope),
                    name,
                });
            }
            if obj.contains_key("object") {
                let object = parse_object_ref(get(value, "object", span)?, &span.push("object"))?;
                let refinement = match value.get("refinement") {
                    Some(r) => parse_object_refinement(r, &span.push("refinement"))?,
                    None => BTreeMap::new(),
                };
                let alias = parse_optional_alias(obj);
                return Ok(ObjectRef::Refined {
                    object: Box::new(object),
                    refinement,
                    alias,
                });
            }
            Err(unrecognized(
                "object reference must be a name, 'self'/'super'/'holder', '*', \
                 {object, refinement}, or {scope, name}",
                span,
            ))
        }
        _ => Err(unrecognized("object reference must be a string or object", span)),
    }
}

fn parse_object_refinement(
    value: &Value,
    span: &Span,
) -> Result<BTreeMap<String, ObjectRef>, SchemaError> {
    let obj = value
        .as_object()
        .ok_or_else(|| unrecognized("refinement must be a JSON object", span))?;
    obj.iter()
        .map(|(k, v)| Ok((k.clone(), parse_object_ref(v, &span.push(k))?)))
        .collect()
}

/// Parses a `plus` target: either an object reference (a template to
/// instantiate, bare or refined by parameter bindings) or an inline power
/// or deontic frame literal, distinguished by the presence of `position`
/// the same way [`parse_directive`] distinguishes a top-level frame
/// directive.
fn parse_production_target(value: &Value, span: &Span) -> Result<ProductionTarget, SchemaError> {
    if let Some(obj) = value.as_object() {
        if obj.contains_key("position") {
            let position = get(value, "position", span)?
                .as_str()
                .ok_or_else(|| unrecognized("'position' must be a string", span))?;
            return match position {
                "power" | "liability" | "disability" | "immunity" => {
                    parse_power_frame(value, span).map(|f| ProductionTarget::Power(Box::new(f)))
                }
                "duty" | "prohibition" | "liberty" | "claim" | "protection" | "no-claim" => {
                    parse_deontic_frame(value, span).map(|f| ProductionTarget::Deontic(Box::new(f)))
                }
                other => Err(unrecognized(format!("unknown position '{other}'"), span)),
            };
        }
    }
    parse_object_ref(value, span).map(ProductionTarget::Ref)
}

fn parse_event_refinement(
    value: &Value,
    span: &Span,
) -> Result<BTreeMap<String, EventArg>, SchemaError> {
    let obj = value
        .as_object()
        .ok_or_else(|| unrecognized("refinement must be a JSON object", span))?;
    obj.iter()
        .map(|(k, v)| {
            let arg_span = span.push(k);
            let arg = if looks_like_event(v) {
                EventArg::Event(parse_event(v, &arg_span)?)
            } else {
                EventArg::Object(parse_object_ref(v, &arg_span)?)
            };
            Ok((k.clone(), arg))
        })
        .collect()
}

/// Parses an event.
pub fn parse_event(value: &Value, span: &Span) -> Result<Event, SchemaError> {
    match value {
        Value::String(s) => {
            let tag = s.strip_prefix('#').ok_or_else(|| {
                unrecognized("atomic events must be a '#'-prefixed tag", span)
            })?;
            if tag == "*" {
                Ok(Event::Wildcard)
            } else {
                Ok(Event::Atomic(tag.to_string()))
            }
        }
        Value::Object(obj) => {
            if obj.contains_key("event") {
                let tag_val = get(value, "event", span)?;
                let tag_str = tag_val
                    .as_str()
                    .ok_or_else(|| unrecognized("'event' must be a '#'-prefixed tag", span))?;
                let tag = tag_str
                    .strip_prefix('#')
                    .ok_or_else(|| unrecognized("'event' must be a '#'-prefixed tag", span))?
                    .to_string();
                let refinement = match value.get("refinement") {
                    Some(r) => parse_event_refinement(r, &span.push("refinement"))?,
                    None => BTreeMap::new(),
                };
                return Ok(Event::Refined { tag, refinement });
            }
            if obj.contains_key("agent") && obj.contains_key("action") {
                let agent = parse_object_ref(get(value, "agent", span)?, &span.push("agent"))?;
                let action = parse_event(get(value, "action", span)?, &span.push("action"))?;
                return Ok(Event::Scoped {
                    agent,
                    action: Box::new(action),
                });
            }
            if let Some(p) = obj.get("plus") {
                let target = parse_production_target(p, &span.push("plus"))?;
                return Ok(Event::Plus(Box::new(target)));
            }
            if let Some(m) = obj.get("minus") {
                let target = parse_object_ref(m, &span.push("minus"))?;
                return Ok(Event::Minus(Box::new(target)));
            }
            if obj.contains_key("entity") && obj.contains_key("descriptor") && obj.contains_key("gains")
            {
                let entity = parse_object_ref(get(value, "entity", span)?, &span.push("entity"))?;
                let descriptor =
                    parse_object_ref(get(value, "descriptor", span)?, &span.push("descriptor"))?;
                let gains = get(value, "gains", span)?
                    .as_bool()
                    .ok_or_else(|| unrecognized("'gains' must be a boolean", span))?;
                return Ok(Event::Naming {
                    entity,
                    descriptor,
                    gains,
                });
            }
            Err(unrecognized(
                "event must be a '#tag' string, {event, refinement}, {agent, action}, \
                 {plus}, {minus}, or {entity, descriptor, gains}",
                span,
            ))
        }
        _ => Err(unrecognized("event must be a string or object", span)),
    }
}

/// Parses a boolean expression (C6 guard/trigger shape).
pub fn parse_boolean_expr(value: &Value, span: &Span) -> Result<BooleanExpr, SchemaError> {
    match value {
        Value::Bool(b) => Ok(BooleanExpr::Literal(*b)),
        Value::Object(obj) => {
            if let Some(inner) = obj.get("negate") {
                return Ok(BooleanExpr::Negate(Box::new(parse_boolean_expr(
                    inner,
                    &span.push("negate"),
                )?)));
            }
            if obj.contains_key("entity") && obj.contains_key("has") && obj.contains_key("descriptor")
            {
                let entity = parse_object_ref(get(value, "entity", span)?, &span.push("entity"))?;
                let has = get(value, "has", span)?
                    .as_bool()
                    .ok_or_else(|| unrecognized("'has' must be a boolean", span))?;
                let descriptor =
                    parse_object_ref(get(value, "descriptor", span)?, &span.push("descriptor"))?;
                return Ok(BooleanExpr::Descriptor {
                    entity,
                    has,
                    descriptor,
                });
            }
            // Otherwise this object must be an object reference shape.
            parse_object_ref(value, span).map(BooleanExpr::Lives)
        }
        Value::String(_) => parse_object_ref(value, span).map(BooleanExpr::Lives),
        _ => Err(unrecognized(
            "boolean expression must be a bool, {negate}, {entity, has, descriptor}, or an object reference",
            span,
        )),
    }
}
