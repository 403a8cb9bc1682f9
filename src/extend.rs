/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! `@extend` expansion.

use std::collections::HashMap;
use std::fmt::Write;

use log::debug;

use crate::error::SelectorError;
use crate::selector::SimpleSelector;
use crate::sequence::{CommaSequence, Member, Sequence, SimpleSequence, Simples};
use crate::weave::weave;

/// Recursion bound for pathological extension graphs the cycle check
/// cannot name.
const EXTEND_DEPTH_LIMIT: usize = 100;

#[derive(Clone, Debug)]
struct Entry {
    /// The member set of the compound named by `@extend`.
    target: Vec<SimpleSelector>,
    /// The selector of the rule containing the `@extend`.
    extender: Sequence,
}

/// Extension registrations, looked up by target subset.
///
/// An entry registered for a target set matches every compound whose
/// member set contains it; lookups return matches in registration order.
#[derive(Clone, Debug, Default)]
pub struct ExtendMap {
    entries: Vec<Entry>,
    index: HashMap<SimpleSelector, Vec<usize>>,
}

impl ExtendMap {
    pub fn new() -> ExtendMap {
        ExtendMap::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registers `extender { @extend <target>; }`, where `target` is the
    /// member list of one compound selector.
    pub fn insert(&mut self, target: Vec<SimpleSelector>, extender: Sequence) {
        let id = self.entries.len();
        for sel in &target {
            self.index.entry(sel.clone()).or_default().push(id);
        }
        self.entries.push(Entry { target, extender });
    }

    /// Ids of the entries whose target set is a subset of `members`, in
    /// registration order.
    fn matching(&self, members: &[SimpleSelector]) -> Vec<usize> {
        let mut ids: Vec<usize> = members
            .iter()
            .filter_map(|sel| self.index.get(sel))
            .flat_map(|ids| ids.iter().copied())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids.retain(|&id| {
            self.entries[id]
                .target
                .iter()
                .all(|sel| members.contains(sel))
        });
        ids
    }
}

impl CommaSequence {
    /// Expands every matching `@extend` registration against this group.
    /// Each sequence contributes itself followed by its extensions.
    pub fn extend(&self, map: &ExtendMap) -> Result<CommaSequence, SelectorError> {
        let mut members = Vec::with_capacity(self.members.len());
        for seq in &self.members {
            let mut seen = Vec::new();
            members.extend(seq.do_extend(map, &mut seen)?);
        }
        Ok(CommaSequence::new(members))
    }
}

/// The chain of `(extended compound, entry id)` pairs above the current
/// recursion, for loop detection.
type SeenStack = Vec<(SimpleSequence, usize)>;

impl Sequence {
    fn do_extend(&self, map: &ExtendMap, seen: &mut SeenStack) -> Result<Vec<Sequence>, SelectorError> {
        let mut choices: Vec<Vec<Vec<Member>>> = Vec::with_capacity(self.members.len());
        for member in &self.members {
            match member {
                Member::Simple(compound) => {
                    let mut alternatives = vec![vec![member.clone()]];
                    for seq in compound.do_extend(map, seen)? {
                        alternatives.push(seq.members);
                    }
                    choices.push(alternatives);
                }
                other => choices.push(vec![vec![other.clone()]]),
            }
        }
        let mut result = Vec::new();
        for path in paths(&choices) {
            for woven in weave(path)? {
                result.push(Sequence::new(woven));
            }
        }
        Ok(result)
    }
}

impl SimpleSequence {
    fn do_extend(&self, map: &ExtendMap, seen: &mut SeenStack) -> Result<Vec<Sequence>, SelectorError> {
        let mut directs: Vec<(usize, Sequence)> = Vec::new();
        for id in map.matching(&self.members) {
            let entry = &map.entries[id];
            // What remains of this compound once the target is taken out.
            let mut remainder = self.members.to_vec();
            for target_sel in &entry.target {
                if let Some(at) = remainder.iter().position(|sel| sel == target_sel) {
                    remainder.remove(at);
                }
            }
            let last = match entry.extender.last_simple_sequence() {
                Some(last) => last,
                None => continue,
            };
            let unified = match last.unify(&remainder)? {
                Some(unified) => unified,
                None => continue,
            };
            let mut members = entry.extender.members[..entry.extender.members.len() - 1].to_vec();
            members.push(Member::Simple(unified));
            directs.push((id, Sequence::new(members)));
        }
        if !directs.is_empty() {
            debug!("{} matched {} @extend registration(s)", self, directs.len());
        }

        let mut result: Vec<Sequence> = directs.iter().map(|(_, seq)| seq.clone()).collect();
        let mut recursive: Vec<Sequence> = Vec::new();
        for (id, direct) in &directs {
            if let Some(at) = seen
                .iter()
                .position(|(compound, seen_id)| seen_id == id && compound == self)
            {
                return Err(extend_loop_error(map, &seen[at..]));
            }
            if seen.len() >= EXTEND_DEPTH_LIMIT {
                return Err(SelectorError::invariant(
                    "An @extend loop exists, but the exact loop couldn't be found.",
                ));
            }
            seen.push((self.clone(), *id));
            let expanded = direct.do_extend(map, seen)?;
            seen.pop();
            // The first alternative is the direct extension itself.
            for seq in expanded.into_iter().skip(1) {
                if !recursive.contains(&seq) {
                    recursive.push(seq);
                }
            }
        }
        result.extend(recursive);
        Ok(result)
    }
}

fn extend_loop_error(map: &ExtendMap, chain: &[(SimpleSequence, usize)]) -> SelectorError {
    let mut extensions: Vec<&Entry> = chain.iter().map(|&(_, id)| &map.entries[id]).collect();
    // Highest source line first.
    extensions.sort_by(|first, second| second.extender.line().cmp(&first.extender.line()));
    let lines: Vec<String> = extensions
        .iter()
        .map(|entry| {
            let target = SimpleSequence::new(Simples::from_vec(entry.target.clone()));
            let mut described = format!("{} extends {}", entry.extender, target);
            if let Some(line) = entry.extender.line() {
                let _ = write!(described, " on line {}", line);
                if let Some(filename) = entry.extender.filename() {
                    let _ = write!(described, " of {}", filename);
                }
            }
            described
        })
        .collect();
    SelectorError::Syntax {
        message: format!("An @extend loop was found:\n{}", lines.join(",\n")),
        line: extensions.first().and_then(|entry| entry.extender.line()),
        filename: extensions
            .first()
            .and_then(|entry| entry.extender.filename())
            .map(|name| name.to_string()),
    }
}

/// Cartesian product of the per-member alternative sets; the all-first
/// path comes first and reproduces the original sequence.
fn paths(choices: &[Vec<Vec<Member>>]) -> Vec<Vec<Vec<Member>>> {
    let mut paths: Vec<Vec<Vec<Member>>> = vec![Vec::new()];
    for alternatives in choices {
        let mut next = Vec::with_capacity(paths.len() * alternatives.len());
        for alternative in alternatives {
            for path in &paths {
                let mut extended = path.clone();
                extended.push(alternative.clone());
                next.push(extended);
            }
        }
        paths = next;
    }
    paths
}
