/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Interpolation-capable token streams.
//!
//! Sass permits `#{...}` interpolation inside selector names, so names,
//! namespaces, and attribute values are sequences of literal fragments and
//! opaque script nodes rather than plain strings.

use std::fmt;

use string_cache::DefaultAtom as Atom;

/// An unevaluated script expression embedded in a selector.
///
/// The algebra treats scripts as opaque leaf tokens: two scripts are equal
/// when their source text is equal, and the only capability exposed is
/// recovering that source text.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Script {
    source: Atom,
}

impl Script {
    pub fn new(source: &str) -> Script {
        Script {
            source: Atom::from(source),
        }
    }

    /// The source text of the expression, without the `#{}` wrapper.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{{{}}}", self.source)
    }
}

/// One fragment of a [`Name`].
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum NamePart {
    Literal(Atom),
    Script(Script),
}

/// A selector name: literal text interleaved with `#{...}` interpolation.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Name {
    pub parts: Vec<NamePart>,
}

impl Name {
    /// A name holding the single literal `text`.
    pub fn literal(text: &str) -> Name {
        Name {
            parts: vec![NamePart::Literal(Atom::from(text))],
        }
    }

    pub fn push_literal(&mut self, text: &str) {
        self.parts.push(NamePart::Literal(Atom::from(text)));
    }

    pub fn push_script(&mut self, script: Script) {
        self.parts.push(NamePart::Script(script));
    }

    /// Appends a copy of every part of `other`.
    pub fn push_name(&mut self, other: &Name) {
        self.parts.extend(other.parts.iter().cloned());
    }

    /// True when the name is exactly the literal `*`, the any-namespace
    /// wildcard.
    pub fn is_wildcard(&self) -> bool {
        match self.parts.as_slice() {
            [NamePart::Literal(atom)] => &**atom == "*",
            _ => false,
        }
    }

    /// A copy with ASCII whitespace trimmed from the literal edges.
    pub fn trimmed(&self) -> Name {
        let mut parts = self.parts.clone();
        if let Some(NamePart::Literal(atom)) = parts.first_mut() {
            let trimmed = Atom::from(atom.trim_start());
            *atom = trimmed;
        }
        if let Some(NamePart::Literal(atom)) = parts.last_mut() {
            let trimmed = Atom::from(atom.trim_end());
            *atom = trimmed;
        }
        Name { parts }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for part in &self.parts {
            match part {
                NamePart::Literal(atom) => f.write_str(atom)?,
                NamePart::Script(script) => fmt::Display::fmt(script, f)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_renders_with_wrapper() {
        let script = Script::new("$color");
        assert_eq!(script.source(), "$color");
        assert_eq!(script.to_string(), "#{$color}");
    }

    #[test]
    fn mixed_name_renders_in_order() {
        let mut name = Name::literal("item-");
        name.push_script(Script::new("$i"));
        assert_eq!(name.to_string(), "item-#{$i}");
    }

    #[test]
    fn wildcard_is_a_single_star_literal() {
        assert!(Name::literal("*").is_wildcard());
        assert!(!Name::literal("a").is_wildcard());
        assert!(!Name::literal("").is_wildcard());
        let mut two = Name::literal("*");
        two.push_literal("*");
        assert!(!two.is_wildcard());
    }

    #[test]
    fn trimmed_strips_only_the_edges() {
        let mut name = Name::literal("  2n + 1 ");
        assert_eq!(name.trimmed().to_string(), "2n + 1");
        name.push_script(Script::new("$x"));
        name.push_literal(" tail ");
        assert_eq!(name.trimmed().to_string(), "2n + 1 #{$x} tail");
    }
}
