/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Compound selectors, combinator sequences, and selector groups.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use smallvec::{smallvec, SmallVec};
use string_cache::DefaultAtom as Atom;

use crate::error::SelectorError;
use crate::selector::SimpleSelector;
use crate::tokens::Name;

/// Inline storage for compound members; most compounds hold one or two
/// simple selectors.
pub type Simples = SmallVec<[SimpleSelector; 2]>;

/// A sequence of simple selectors targeting one element, e.g. `a.foo#bar`.
///
/// Equality and hashing treat the non-base members as a set: order and
/// duplication are insignificant, and source locations never participate.
#[derive(Clone, Debug)]
pub struct SimpleSequence {
    pub members: Simples,
    pub line: Option<usize>,
    pub filename: Option<Atom>,
}

impl SimpleSequence {
    pub fn new(members: Simples) -> SimpleSequence {
        debug_assert!(!members.is_empty());
        SimpleSequence {
            members,
            line: None,
            filename: None,
        }
    }

    /// The element selector this compound targets, when it has one; an
    /// `Element` or `Universal` member can only appear first.
    pub fn base(&self) -> Option<&SimpleSelector> {
        match self.members.first() {
            Some(
                first @ (SimpleSelector::Universal { .. } | SimpleSelector::Element { .. }),
            ) => Some(first),
            _ => None,
        }
    }

    /// The members other than [`base`](SimpleSequence::base).
    pub fn rest(&self) -> &[SimpleSelector] {
        if self.base().is_some() {
            &self.members[1..]
        } else {
            &self.members[..]
        }
    }

    pub fn contains_parent_ref(&self) -> bool {
        self.members
            .iter()
            .any(|sel| matches!(sel, SimpleSelector::Parent))
    }

    /// Folds this compound's members into `sels`, producing the compound
    /// matching whatever both match. `Ok(None)` when no element can match
    /// both.
    pub fn unify(&self, sels: &[SimpleSelector]) -> Result<Option<SimpleSequence>, SelectorError> {
        let mut result = sels.to_vec();
        for sel in &self.members {
            match sel.unify(&result)? {
                Some(unified) => result = unified,
                None => return Ok(None),
            }
        }
        let mut unified = SimpleSequence::new(Simples::from_vec(result));
        unified.line = self.line;
        unified.filename = self.filename.clone();
        Ok(Some(unified))
    }

    /// Substitutes `parent` for a leading `&`, yielding the member run
    /// that replaces this compound in its sequence.
    pub(crate) fn resolve_parent_refs(
        &self,
        parent: &Sequence,
    ) -> Result<Vec<Member>, SelectorError> {
        if !matches!(self.members.first(), Some(SimpleSelector::Parent)) {
            return Ok(vec![Member::Simple(self.clone())]);
        }
        if self.members.len() == 1 {
            return Ok(parent.members.clone());
        }
        // `&suffix` appends the trailing simples to the parent's final
        // compound, so the parent must end in one.
        let last = match parent.members.last() {
            Some(Member::Simple(last)) => last,
            _ => {
                return Err(SelectorError::Syntax {
                    message: format!("Invalid parent selector: \"{}\"", parent),
                    line: self.line,
                    filename: self.filename.as_ref().map(|name| name.to_string()),
                });
            }
        };
        let mut members = last.members.clone();
        members.extend(self.members.iter().skip(1).cloned());
        let mut fused = SimpleSequence::new(members);
        fused.line = self.line;
        fused.filename = self.filename.clone();
        let mut result = parent.members[..parent.members.len() - 1].to_vec();
        result.push(Member::Simple(fused));
        Ok(result)
    }

    pub fn to_tokens(&self) -> Name {
        let mut out = Name::default();
        for sel in &self.members {
            out.push_name(&sel.to_tokens());
        }
        out
    }
}

impl PartialEq for SimpleSequence {
    fn eq(&self, other: &SimpleSequence) -> bool {
        self.base() == other.base() && set_eq(self.rest(), other.rest())
    }
}

impl Eq for SimpleSequence {}

impl Hash for SimpleSequence {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.base().hash(state);
        // Order-independent fold over the rest set; duplicates collapse so
        // the hash agrees with the set equality.
        let rest = self.rest();
        let mut acc = 0u64;
        for (at, sel) in rest.iter().enumerate() {
            if rest[..at].contains(sel) {
                continue;
            }
            let mut hasher = DefaultHasher::new();
            sel.hash(&mut hasher);
            acc ^= hasher.finish();
        }
        state.write_u64(acc);
    }
}

fn set_eq(first: &[SimpleSelector], second: &[SimpleSelector]) -> bool {
    first.iter().all(|sel| second.contains(sel)) && second.iter().all(|sel| first.contains(sel))
}

impl fmt::Display for SimpleSequence {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.to_tokens(), f)
    }
}

/// A combinator joining two compounds.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Combinator {
    Descendant,   // space
    Child,        // >
    NextSibling,  // +
    LaterSibling, // ~
}

impl Combinator {
    pub fn as_str(&self) -> &'static str {
        match *self {
            Combinator::Descendant => " ",
            Combinator::Child => ">",
            Combinator::NextSibling => "+",
            Combinator::LaterSibling => "~",
        }
    }
}

/// One element of a combinator sequence.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Member {
    Simple(SimpleSequence),
    Combinator(Combinator),
    /// Formatting-only marker; invisible to equality.
    Newline,
}

impl Member {
    pub fn as_simple(&self) -> Option<&SimpleSequence> {
        match self {
            Member::Simple(compound) => Some(compound),
            _ => None,
        }
    }

    /// Combinators and newline markers, the non-compound members.
    pub fn is_op(&self) -> bool {
        matches!(self, Member::Combinator(_) | Member::Newline)
    }
}

/// Compounds joined by combinators; one comma-separated alternative.
///
/// Equality and hashing skip newline markers.
#[derive(Clone, Debug)]
pub struct Sequence {
    pub members: Vec<Member>,
}

impl Sequence {
    /// Builds a sequence, restoring the member-list invariants: two
    /// compounds are never directly adjacent, and a descendant combinator
    /// touching another combinator is the implicit join made explicit and
    /// collapses into it.
    pub fn new(members: Vec<Member>) -> Sequence {
        let mut normalized: Vec<Member> = Vec::with_capacity(members.len());
        for member in members {
            match member {
                Member::Simple(_) => {
                    if matches!(normalized.last(), Some(Member::Simple(_))) {
                        normalized.push(Member::Combinator(Combinator::Descendant));
                    }
                    normalized.push(member);
                }
                Member::Combinator(Combinator::Descendant) => {
                    if !matches!(normalized.last(), Some(Member::Combinator(_))) {
                        normalized.push(member);
                    }
                }
                Member::Combinator(_) => {
                    if matches!(
                        normalized.last(),
                        Some(Member::Combinator(Combinator::Descendant))
                    ) {
                        normalized.pop();
                    }
                    normalized.push(member);
                }
                Member::Newline => normalized.push(member),
            }
        }
        Sequence {
            members: normalized,
        }
    }

    pub fn set_line(&mut self, line: usize) {
        for member in &mut self.members {
            if let Member::Simple(compound) = member {
                compound.line = Some(line);
            }
        }
    }

    pub fn set_filename(&mut self, filename: &str) {
        for member in &mut self.members {
            if let Member::Simple(compound) = member {
                compound.filename = Some(Atom::from(filename));
            }
        }
    }

    /// Location of the first compound, for diagnostics.
    pub fn line(&self) -> Option<usize> {
        self.members
            .iter()
            .find_map(|member| member.as_simple().and_then(|compound| compound.line))
    }

    pub fn filename(&self) -> Option<Atom> {
        self.members
            .iter()
            .find_map(|member| member.as_simple().and_then(|compound| compound.filename.clone()))
    }

    pub fn last_simple_sequence(&self) -> Option<&SimpleSequence> {
        match self.members.last() {
            Some(Member::Simple(compound)) => Some(compound),
            _ => None,
        }
    }

    pub fn contains_parent_ref(&self) -> bool {
        self.members
            .iter()
            .any(|member| member.as_simple().map_or(false, SimpleSequence::contains_parent_ref))
    }

    /// Rewrites `&` references against `parent`; a sequence without one is
    /// implicitly `& self`.
    pub(crate) fn resolve_parent_refs(&self, parent: &Sequence) -> Result<Sequence, SelectorError> {
        let mut members = self.members.clone();
        let leading_newline = matches!(members.first(), Some(Member::Newline));
        if leading_newline {
            members.remove(0);
        }
        let has_parent_head = members.iter().any(|member| {
            member.as_simple().map_or(false, |compound| {
                matches!(compound.members.first(), Some(SimpleSelector::Parent))
            })
        });
        if !has_parent_head {
            let mut with_parent = Vec::with_capacity(members.len() + 2);
            with_parent.push(Member::Simple(SimpleSequence::new(smallvec![
                SimpleSelector::Parent
            ])));
            with_parent.push(Member::Combinator(Combinator::Descendant));
            with_parent.extend(members);
            members = with_parent;
        }
        let mut resolved = Vec::with_capacity(members.len() + parent.members.len());
        if leading_newline {
            resolved.push(Member::Newline);
        }
        for member in &members {
            match member {
                Member::Simple(compound) => {
                    resolved.extend(compound.resolve_parent_refs(parent)?)
                }
                other => resolved.push(other.clone()),
            }
        }
        Ok(Sequence::new(resolved))
    }
}

impl PartialEq for Sequence {
    fn eq(&self, other: &Sequence) -> bool {
        let visible = |member: &&Member| !matches!(member, Member::Newline);
        self.members
            .iter()
            .filter(visible)
            .eq(other.members.iter().filter(visible))
    }
}

impl Eq for Sequence {}

impl Hash for Sequence {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for member in &self.members {
            if !matches!(member, Member::Newline) {
                member.hash(state);
            }
        }
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut words: Vec<String> = Vec::with_capacity(self.members.len());
        for member in &self.members {
            match member {
                Member::Simple(compound) => words.push(compound.to_string()),
                // The descendant combinator is the join itself.
                Member::Combinator(Combinator::Descendant) => {}
                Member::Combinator(combinator) => words.push(combinator.as_str().to_owned()),
                Member::Newline => words.push("\n".to_owned()),
            }
        }
        let joined = words.join(" ");
        f.write_str(
            &joined
                .replace(" \n ", "\n")
                .replace(" \n", "\n")
                .replace("\n ", "\n"),
        )
    }
}

/// A comma-separated selector group.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct CommaSequence {
    pub members: Vec<Sequence>,
}

impl CommaSequence {
    pub fn new(members: Vec<Sequence>) -> CommaSequence {
        CommaSequence { members }
    }

    pub fn set_line(&mut self, line: usize) {
        for seq in &mut self.members {
            seq.set_line(line);
        }
    }

    pub fn set_filename(&mut self, filename: &str) {
        for seq in &mut self.members {
            seq.set_filename(filename);
        }
    }

    pub fn contains_parent_ref(&self) -> bool {
        self.members.iter().any(Sequence::contains_parent_ref)
    }

    /// Rewrites `&` references against an ambient parent group,
    /// distributing over commas on both sides in `(parent, own)` order.
    pub fn resolve_parent_refs(
        &self,
        parent: Option<&CommaSequence>,
    ) -> Result<CommaSequence, SelectorError> {
        let parent = match parent {
            Some(parent) => parent,
            None => {
                for seq in &self.members {
                    if seq.contains_parent_ref() {
                        return Err(SelectorError::Syntax {
                            message: "base-level rules cannot contain '&'".to_owned(),
                            line: seq.line(),
                            filename: seq.filename().map(|name| name.to_string()),
                        });
                    }
                }
                return Ok(self.clone());
            }
        };
        let mut members = Vec::with_capacity(parent.members.len() * self.members.len());
        for parent_seq in &parent.members {
            for seq in &self.members {
                members.push(seq.resolve_parent_refs(parent_seq)?);
            }
        }
        Ok(CommaSequence::new(members))
    }
}

impl fmt::Display for CommaSequence {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for seq in &self.members {
            let rendered = seq.to_string();
            if !first {
                if rendered.starts_with('\n') {
                    f.write_str(",")?;
                } else {
                    f.write_str(", ")?;
                }
            }
            f.write_str(&rendered)?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::seq::SliceRandom;
    use rand::thread_rng;

    use super::*;
    use crate::parser::parse_selector;

    fn parse(text: &str) -> CommaSequence {
        parse_selector(text).unwrap()
    }

    fn seq(text: &str) -> Sequence {
        let mut parsed = parse(text);
        assert_eq!(parsed.members.len(), 1);
        parsed.members.remove(0)
    }

    fn compound(text: &str) -> SimpleSequence {
        match seq(text).members.remove(0) {
            Member::Simple(compound) => compound,
            other => panic!("expected a compound, got {:?}", other),
        }
    }

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn compound_equality_ignores_rest_order() {
        let reference = compound("a.x.y[z]:hover");
        let base = reference.members[0].clone();
        let rest: Vec<SimpleSelector> = reference.members[1..].to_vec();
        let mut rng = thread_rng();
        for _ in 0..16 {
            let mut shuffled = rest.clone();
            shuffled.shuffle(&mut rng);
            let mut members = Simples::new();
            members.push(base.clone());
            members.extend(shuffled);
            let permuted = SimpleSequence::new(members);
            assert_eq!(reference, permuted);
            assert_eq!(hash_of(&reference), hash_of(&permuted));
        }
    }

    #[test]
    fn compound_equality_ignores_duplicates_and_location() {
        let plain = compound("a.x");
        let mut doubled = plain.clone();
        doubled.members.push(doubled.members[1].clone());
        doubled.line = Some(42);
        doubled.filename = Some(Atom::from("other.scss"));
        assert_eq!(plain, doubled);
        assert_eq!(hash_of(&plain), hash_of(&doubled));
    }

    #[test]
    fn new_members_change_equality_and_hash() {
        let smaller = compound("a.x");
        let larger = compound("a.x.y");
        assert_ne!(smaller, larger);
        assert_ne!(hash_of(&smaller), hash_of(&larger));
    }

    #[test]
    fn base_position_is_significant() {
        let with_base = compound("a.x");
        let mut reversed_members = Simples::new();
        reversed_members.push(with_base.members[1].clone());
        reversed_members.push(with_base.members[0].clone());
        let reversed = SimpleSequence::new(reversed_members);
        // `a` is no longer in base position, so the two differ.
        assert_ne!(with_base, reversed);
    }

    #[test]
    fn sequences_ignore_newline_markers() {
        let plain = seq("a > b");
        let mut noisy_members = plain.members.clone();
        noisy_members.insert(1, Member::Newline);
        noisy_members.push(Member::Newline);
        let noisy = Sequence {
            members: noisy_members,
        };
        assert_eq!(plain, noisy);
        assert_eq!(hash_of(&plain), hash_of(&noisy));
    }

    #[test]
    fn constructor_restores_the_adjacency_invariant() {
        let first = compound("a");
        let second = compound("b");
        let normalized = Sequence::new(vec![
            Member::Simple(first),
            Member::Simple(second),
        ]);
        assert_eq!(normalized, seq("a b"));
        assert_eq!(normalized.to_string(), "a b");
    }

    #[test]
    fn constructor_collapses_redundant_descendants() {
        let built = Sequence::new(vec![
            Member::Simple(compound("a")),
            Member::Combinator(Combinator::Descendant),
            Member::Combinator(Combinator::Descendant),
            Member::Simple(compound("b")),
            Member::Combinator(Combinator::Descendant),
            Member::Combinator(Combinator::Child),
            Member::Simple(compound("c")),
        ]);
        assert_eq!(built, seq("a b > c"));
    }

    #[test]
    fn rendering() {
        assert_eq!(seq("a > b").to_string(), "a > b");
        assert_eq!(seq("a + b ~ c").to_string(), "a + b ~ c");
        assert_eq!(parse(".a, .b").to_string(), ".a, .b");
        assert_eq!(parse(".a,\n.b").to_string(), ".a,\n.b");
    }

    #[test]
    fn locations_propagate_to_every_compound() {
        let mut group = parse(".a .b, .c");
        group.set_line(7);
        group.set_filename("style.scss");
        for seq in &group.members {
            for member in &seq.members {
                if let Member::Simple(compound) = member {
                    assert_eq!(compound.line, Some(7));
                    assert_eq!(compound.filename.as_deref(), Some("style.scss"));
                }
            }
        }
    }

    #[test]
    fn resolve_without_parent_is_identity_when_no_parent_ref() {
        let group = parse(".foo, .bar > .baz");
        assert_eq!(group.resolve_parent_refs(None).unwrap(), group);
    }

    #[test]
    fn resolve_without_parent_rejects_parent_refs() {
        let group = parse(".foo, &.bar");
        let err = group.resolve_parent_refs(None).unwrap_err();
        match err {
            SelectorError::Syntax { message, line, .. } => {
                assert_eq!(message, "base-level rules cannot contain '&'");
                assert_eq!(line, Some(1));
            }
            other => panic!("expected a syntax error, got {:?}", other),
        }
    }

    #[test]
    fn resolve_nests_under_the_parent() {
        let resolved = parse(".foo")
            .resolve_parent_refs(Some(&parse(".bar")))
            .unwrap();
        assert_eq!(resolved.to_string(), ".bar .foo");
    }

    #[test]
    fn resolve_fuses_a_parent_suffix() {
        let resolved = parse("&.foo")
            .resolve_parent_refs(Some(&parse(".bar, .baz")))
            .unwrap();
        assert_eq!(resolved.to_string(), ".bar.foo, .baz.foo");
    }

    #[test]
    fn lone_parent_ref_becomes_the_parent() {
        let resolved = parse("&")
            .resolve_parent_refs(Some(&parse("a b")))
            .unwrap();
        assert_eq!(resolved.to_string(), "a b");
    }

    #[test]
    fn parent_ref_deeper_in_the_sequence() {
        let resolved = parse(".foo &")
            .resolve_parent_refs(Some(&parse("p")))
            .unwrap();
        assert_eq!(resolved.to_string(), ".foo p");
    }

    #[test]
    fn resolve_distributes_over_commas_in_parent_major_order() {
        let resolved = parse(".x, .y")
            .resolve_parent_refs(Some(&parse(".a, .b")))
            .unwrap();
        assert_eq!(resolved.members.len(), 4);
        assert_eq!(resolved.to_string(), ".a .x, .a .y, .b .x, .b .y");
    }

    #[test]
    fn parent_suffix_requires_a_trailing_compound() {
        let parent = CommaSequence::new(vec![Sequence {
            members: vec![
                Member::Simple(compound("a")),
                Member::Combinator(Combinator::Child),
            ],
        }]);
        let err = parse("&.foo").resolve_parent_refs(Some(&parent)).unwrap_err();
        match err {
            SelectorError::Syntax { message, .. } => {
                assert_eq!(message, "Invalid parent selector: \"a >\"");
            }
            other => panic!("expected a syntax error, got {:?}", other),
        }
    }

    #[test]
    fn lone_parent_ref_keeps_a_trailing_combinator_parent() {
        let parent = CommaSequence::new(vec![Sequence {
            members: vec![
                Member::Simple(compound("a")),
                Member::Combinator(Combinator::Child),
            ],
        }]);
        let resolved = parse("& b").resolve_parent_refs(Some(&parent)).unwrap();
        assert_eq!(resolved.to_string(), "a > b");
    }
}
