//! The query/inspection API (C7): `show(ref)` pretty-prints an entity's
//! atomic status and `has` relations, or a refined object reference's
//! matching live instance and the frames it owns (spec.md §4.7). Read-only —
//! no function here takes `&mut World`.
//!
//! Grounded on the teacher's `HirPrinter` (`examples/univrs-metadol/src/hir/
//! print.rs`): a small struct accumulating into a `String` via
//! `std::fmt::Write`, with one `print_*` method per shape. Here the report is
//! built once and returned as a `Display`-able value rather than printed
//! eagerly, so a caller can inspect it as well as print it.

use std::fmt;

use crate::ast::ObjectRef;
use crate::error::NameError;
use crate::world::{Bindings, FrameBody, Owner, World};

/// What `show` found for a given reference: either a bare entity's
/// descriptor set, or a live instance's owned frames.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ShowSubject {
    Entity {
        name: String,
        is_atomic: bool,
        descriptors: Vec<String>,
    },
    Instance {
        name: String,
        template: String,
        owned_frames: Vec<String>,
    },
    NoInstance {
        name: String,
    },
}

/// A structured, printable report produced by [`show`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowReport {
    subject: ShowSubject,
}

impl fmt::Display for ShowReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subject {
            ShowSubject::Entity {
                name,
                is_atomic,
                descriptors,
            } => {
                writeln!(f, "{name}:")?;
                writeln!(f, "  atomic: {is_atomic}")?;
                if descriptors.is_empty() {
                    writeln!(f, "  has: (none)")?;
                } else {
                    writeln!(f, "  has: {}", descriptors.join(", "))?;
                }
                Ok(())
            }
            ShowSubject::Instance {
                name,
                template,
                owned_frames,
            } => {
                writeln!(f, "{name} (instance of {template}):")?;
                if owned_frames.is_empty() {
                    writeln!(f, "  frames: (none)")?;
                } else {
                    writeln!(f, "  frames:")?;
                    for frame in owned_frames {
                        writeln!(f, "    - {frame}")?;
                    }
                }
                Ok(())
            }
            ShowSubject::NoInstance { name } => {
                writeln!(f, "{name}: no live instance")
            }
        }
    }
}

/// Pretty-prints `object_ref` against `world`: for a bare entity name, its
/// atomic status and the descriptors it currently has; for a refined
/// reference naming a live instance (by alias), the frames it owns.
pub fn show(object_ref: &ObjectRef, world: &World) -> Result<ShowReport, NameError> {
    let env = Bindings::new();
    if let ObjectRef::Refined { alias: Some(alias), .. } = object_ref {
        return Ok(show_instance(alias, world));
    }
    let name = world.lookup_ref(object_ref, &env)?;
    if world.instance_by_alias(&name).is_some() {
        return Ok(show_instance(&name, world));
    }
    let descriptors = world.descriptors_of(&name).map(str::to_string).collect();
    let is_atomic = world.is_atomic(&name);
    Ok(ShowReport {
        subject: ShowSubject::Entity {
            name,
            is_atomic,
            descriptors,
        },
    })
}

fn show_instance(alias: &str, world: &World) -> ShowReport {
    let Some(instance_id) = world.instance_by_alias(alias) else {
        return ShowReport {
            subject: ShowSubject::NoInstance {
                name: alias.to_string(),
            },
        };
    };
    let instance = world
        .instance(instance_id)
        .expect("instance_by_alias only returns live instance ids");
    let owned_frames = instance
        .owned_frames
        .iter()
        .filter_map(|id| world.frame(*id))
        .map(describe_frame)
        .collect();
    ShowReport {
        subject: ShowSubject::Instance {
            name: World::instance_name(instance_id),
            template: instance.template.clone(),
            owned_frames,
        },
    }
}

fn describe_frame(frame: &crate::world::LiveFrame) -> String {
    let kind = match &frame.body {
        FrameBody::Power(p) => format!("power({:?})", p.position),
        FrameBody::Deontic(d) => format!("deontic({:?})", d.frame.position),
        FrameBody::Reactive(_) => "reactive".to_string(),
        FrameBody::Transformational(_) => "transformational".to_string(),
    };
    match (&frame.alias, frame.owner) {
        (Some(alias), _) => format!("{kind} [{alias}]"),
        (None, Owner::Root) => kind,
        (None, Owner::Instance(id)) => format!("{kind} (owned by {})", World::instance_name(id)),
    }
}
