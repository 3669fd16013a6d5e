//! Error types for the DPCL engine.
//!
//! This module defines the error kinds used throughout the crate, matching
//! the taxonomy in spec.md §7. Note that a power/reactive-rule unification
//! miss is deliberately *not* an error variant: per spec.md, a non-matching
//! action request is a silent no-op, modeled by [`crate::unify`] returning
//! `None` rather than `Err`.

use thiserror::Error;

use crate::ast::Span;

/// Errors raised while validating and lowering directives (C2).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    /// A directive's JSON shape did not match any known directive kind.
    #[error("directive at {span:?} has an unrecognized shape: {message}")]
    UnrecognizedDirective {
        /// What was wrong with the shape.
        message: String,
        /// Location of the offending directive.
        span: Span,
    },

    /// A reactive rule declared no `event` field. Per spec.md §9, this is
    /// rejected rather than treated as "fires on every event."
    #[error("reactive rule at {span:?} is missing its required 'event' field")]
    ReactiveRuleMissingEvent {
        /// Location of the offending rule.
        span: Span,
    },

    /// A field required by a directive's schema was absent.
    #[error("directive at {span:?} is missing required field '{field}'")]
    MissingField {
        /// The missing field's name.
        field: String,
        /// Location of the offending directive.
        span: Span,
    },
}

/// Errors raised by name/alias resolution (C2) and at runtime for references
/// whose resolution can only be deferred to evaluation time.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NameError {
    /// A reserved keyword (`self`, `super`, `holder`, `*`) was used as an
    /// assignable alias.
    #[error("'{keyword}' is a reserved keyword and cannot be used as an alias (at {span:?})")]
    ReservedKeywordMisuse {
        /// The reserved keyword that was misused.
        keyword: String,
        /// Location of the offending alias.
        span: Span,
    },

    /// Two frames in the same scope declared the same alias.
    #[error("duplicate alias '{alias}' in scope (first declared at {first:?}, redeclared at {second:?})")]
    DuplicateAlias {
        /// The alias name.
        alias: String,
        /// Location of the first declaration.
        first: Span,
        /// Location of the conflicting declaration.
        second: Span,
    },

    /// A reference that must resolve statically (e.g. a compound-frame
    /// template name, a sibling alias) did not resolve to anything declared.
    #[error("unknown reference '{name}' (at {span:?})")]
    UnknownReference {
        /// The unresolved name.
        name: String,
        /// Location of the reference.
        span: Span,
    },
}

/// Errors raised while applying an event to the world (C5).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// `minus` targeted something other than `self` or a live frame/instance
    /// reference.
    #[error("cannot destroy '{target}': not a live frame or instance")]
    NotLive {
        /// A description of the attempted target.
        target: String,
    },

    /// `self` or `holder` was referenced outside a binding context (i.e.
    /// outside any frame/instance) at evaluation time.
    #[error("'{keyword}' referenced outside a binding context")]
    UnboundReserved {
        /// The reserved keyword (`self` or `holder`).
        keyword: String,
    },
}

/// Errors raised while resolving an `import` directive's filesystem target.
/// Only relevant to [`crate::loader::Loader::flatten_imports`]; the pure
/// evaluation path never performs IO.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IoError {
    /// The `load` or `import` target could not be read.
    #[error("could not read '{path}': {message}")]
    Unreadable {
        /// The path that could not be read.
        path: String,
        /// The underlying OS error message.
        message: String,
    },
}

/// The top-level error type surfaced by the engine.
///
/// Errors during a cascade abort that cascade and leave the world in the
/// state just before the offending event was popped (spec.md §7); errors
/// during load abort the load entirely, installing no partial program.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DpclError {
    /// A directive failed structural validation.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A reference could not be resolved, or an alias was misused.
    #[error(transparent)]
    Name(#[from] NameError),

    /// An event could not be legally applied to the world.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// The cascade's step budget was exceeded before reaching fixpoint.
    #[error("cascade exceeded its step budget of {step_budget} dispatches")]
    CascadeOverflow {
        /// The configured step budget.
        step_budget: usize,
    },

    /// An `import`/`load` target was unreadable.
    #[error(transparent)]
    Io(#[from] IoError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_displays_span() {
        let err = SchemaError::MissingField {
            field: "holder".to_string(),
            span: Span::at_directive(3),
        };
        assert!(err.to_string().contains("holder"));
    }

    #[test]
    fn dpcl_error_wraps_schema_error() {
        let err: DpclError = SchemaError::ReactiveRuleMissingEvent {
            span: Span::at_directive(0),
        }
        .into();
        assert!(matches!(err, DpclError::Schema(_)));
    }
}
