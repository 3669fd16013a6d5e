//! # DPCL — an interpreter for institutional/normative worlds
//!
//! DPCL (hereafter "the language") describes *institutional* or *normative*
//! worlds: atomic entities, the descriptors they gain or lose, the **powers**
//! that let agents perform institutional actions, the **duties** that bind
//! them, and the **reactive rules** that fire when events occur. Programs are
//! supplied as JSON directives; this crate loads them, then consumes a stream
//! of external action requests and drives the institutional state forward,
//! producing new facts, creating or destroying frames, and raising
//! violations when duties are breached.
//!
//! ## Quick start
//!
//! ```rust
//! use dpcl::loader::Loader;
//! use dpcl::eval::{EngineConfig, Evaluator};
//! use dpcl::ast::{Event, ObjectRef};
//! use serde_json::json;
//!
//! let program = Loader::load(&[
//!     json!({"atomics": ["alice", "student", "member"]}),
//!     json!({
//!         "position": "power",
//!         "holder": "student",
//!         "action": "#register",
//!         "consequence": {"entity": "holder", "descriptor": "member", "gains": true}
//!     }),
//! ]).unwrap();
//!
//! let mut world = program.world;
//! world.assert_has("alice", "student");
//!
//! let mut evaluator = Evaluator::new(&mut world, EngineConfig::default());
//! evaluator.submit_bare_events(program.bare_events).unwrap();
//! evaluator.submit(Event::Scoped {
//!     agent: ObjectRef::name("alice"),
//!     action: Box::new(Event::Atomic("register".to_string())),
//! }).unwrap();
//!
//! assert!(evaluator.world().has("alice", "member"));
//! ```
//!
//! ## Modules
//!
//! - [`ast`]: the term model — object references, events, frames, rules.
//! - [`directives`]: lowers raw JSON directives into [`ast`] terms.
//! - [`loader`]: validates a directives array and builds a [`world::Program`].
//! - [`world`]: the mutable store of atomics, `has` relations, instances, and
//!   live frames.
//! - [`unify`]: matches action requests against powers and reactive rules.
//! - [`condition`]: the boolean/condition engine.
//! - [`eval`]: the cascade evaluator.
//! - [`query`]: read-only `show` inspection.
//! - [`error`]: the error taxonomy.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod ast;
pub mod condition;
pub mod directives;
pub mod error;
pub mod eval;
pub mod loader;
pub mod query;
pub mod unify;
pub mod world;

pub use error::DpclError;
pub use eval::{EngineConfig, Evaluator};
pub use loader::Loader;
pub use query::{show, ShowReport};
pub use world::{Program, World};
