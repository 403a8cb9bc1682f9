/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Sass selector algebra.
//!
//! The in-memory representation of CSS selectors as Sass sees them
//! (comma-separated groups of combinator sequences of compounds), plus
//! the three operations that give nesting and `@extend` their meaning:
//!
//! * parent-reference resolution (`&`), distributing over commas;
//! * unification of compounds that must match the same element;
//! * `@extend` expansion, built on the `weave`/`subweave` interleaving.
//!
//! Selector trees come from [`parse_selector`] or are built directly.
//! Script interpolation stays opaque: `#{...}` is carried as source text
//! and must be resolved away before unify or extend run.

mod error;
mod extend;
mod parser;
mod selector;
mod sequence;
mod tokens;
mod weave;

pub use error::SelectorError;
pub use extend::ExtendMap;
pub use parser::{parse_selector, SelectorParseErrorKind};
pub use selector::{unify_namespaces, PseudoKind, SimpleSelector};
pub use sequence::{Combinator, CommaSequence, Member, Sequence, SimpleSequence, Simples};
pub use tokens::{Name, NamePart, Script};
