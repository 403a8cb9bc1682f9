/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! The `weave`/`subweave` interleaving behind `@extend` expansion.
//!
//! Weaving a path of mini-sequences yields every merged member list that
//! preserves the relative order within each input, optionally fusing
//! adjacent leading compounds that can match the same element.

use std::collections::{HashMap, VecDeque};

use log::trace;

use crate::error::SelectorError;
use crate::sequence::{Member, SimpleSequence};

type Weaves = Vec<Vec<Member>>;
type Cache = HashMap<(Vec<Member>, Vec<Member>), Weaves>;

/// Expands a path of parenthesized mini-sequences into all orderings
/// consistent with their relative order.
pub(crate) fn weave(path: Vec<Vec<Member>>) -> Result<Weaves, SelectorError> {
    // The memo table lives for exactly one weave.
    let mut cache = Cache::new();
    let mut befores: Weaves = vec![Vec::new()];
    let mut afters: VecDeque<Vec<Member>> = path.into();
    while let Some(current) = afters.pop_front() {
        let (rest, tail) = split_tail(current);
        let mut next = Vec::new();
        for before in &befores {
            for mut woven in subweave(before, &rest, &mut cache)? {
                woven.extend(tail.iter().cloned());
                next.push(woven);
            }
        }
        befores = next;
    }
    trace!("weave produced {} interleavings", befores.len());
    Ok(befores)
}

/// All interleavings of `seq1` and `seq2` that preserve the relative order
/// within each; where the leading compounds unify, their fusion is an
/// additional alternative consuming both.
fn subweave(seq1: &[Member], seq2: &[Member], cache: &mut Cache) -> Result<Weaves, SelectorError> {
    if seq1.is_empty() {
        return Ok(vec![seq2.to_vec()]);
    }
    if seq2.is_empty() {
        return Ok(vec![seq1.to_vec()]);
    }
    let key = (seq1.to_vec(), seq2.to_vec());
    if let Some(hit) = cache.get(&key) {
        return Ok(hit.clone());
    }

    let (head1, rest1) = seq_split(seq1);
    let (head2, rest2) = seq_split(seq2);
    let unified = match (last_simple(&head1), last_simple(&head2)) {
        (Some(first), Some(second)) => match first.unify(&second.members)? {
            Some(unified) => Some(unified),
            None => second.unify(&first.members)?,
        },
        _ => None,
    };

    let mut results = Weaves::new();
    for woven in subweave(&rest1, seq2, cache)? {
        results.push(concat(&head1, woven));
    }
    if let Some(unified) = unified {
        let fused_head = replace_last_simple(&head1, unified);
        for woven in subweave(&rest1, &rest2, cache)? {
            results.push(concat(&fused_head, woven));
        }
    }
    for woven in subweave(seq1, &rest2, cache)? {
        results.push(concat(&head2, woven));
    }

    cache.insert(key, results.clone());
    Ok(results)
}

/// Splits off the leading compound plus the combinator tokens around it,
/// so a head is never cut through a combinator.
fn seq_split(members: &[Member]) -> (Vec<Member>, Vec<Member>) {
    let mut at = 0;
    while at < members.len() && members[at].is_op() {
        at += 1;
    }
    if at < members.len() {
        at += 1;
    }
    while at < members.len() && members[at].is_op() {
        at += 1;
    }
    (members[..at].to_vec(), members[at..].to_vec())
}

/// Splits off the trailing compound together with the combinator tokens
/// adjacent to it, so a combinator never floats at the boundary.
fn split_tail(members: Vec<Member>) -> (Vec<Member>, Vec<Member>) {
    let mut at = members.len();
    while at > 0 && members[at - 1].is_op() {
        at -= 1;
    }
    if at > 0 {
        at -= 1;
    }
    while at > 0 && members[at - 1].is_op() {
        at -= 1;
    }
    let mut members = members;
    let tail = members.split_off(at);
    (members, tail)
}

fn last_simple(members: &[Member]) -> Option<&SimpleSequence> {
    members.iter().rev().find_map(Member::as_simple)
}

fn concat(head: &[Member], rest: Vec<Member>) -> Vec<Member> {
    let mut out = head.to_vec();
    out.extend(rest);
    out
}

fn replace_last_simple(head: &[Member], fused: SimpleSequence) -> Vec<Member> {
    let mut out = head.to_vec();
    if let Some(at) = out.iter().rposition(|member| member.as_simple().is_some()) {
        out[at] = Member::Simple(fused);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_selector;
    use crate::sequence::{Combinator, Sequence};

    fn members(text: &str) -> Vec<Member> {
        let mut parsed = parse_selector(text).unwrap();
        assert_eq!(parsed.members.len(), 1);
        parsed.members.remove(0).members
    }

    /// A mini-sequence ending in an explicit descendant join, the shape
    /// extension paths produce.
    fn open_members(text: &str) -> Vec<Member> {
        let mut result = members(text);
        result.push(Member::Combinator(Combinator::Descendant));
        result
    }

    fn rendered(weaves: &[Vec<Member>]) -> Vec<String> {
        weaves
            .iter()
            .map(|woven| Sequence::new(woven.clone()).to_string())
            .collect()
    }

    #[test]
    fn seq_split_keeps_combinators_with_the_head() {
        let (head, rest) = seq_split(&members("a b"));
        assert_eq!(rendered(&[head, rest]), vec!["a", "b"]);
        let (head, rest) = seq_split(&members("a > b + c"));
        assert_eq!(rendered(&[head, rest]), vec!["a >", "b + c"]);
    }

    #[test]
    fn split_tail_keeps_combinators_with_the_tail() {
        let (rest, tail) = split_tail(members("a > b"));
        assert_eq!(rendered(&[rest, tail]), vec!["a", "> b"]);
        let (rest, tail) = split_tail(open_members(".x"));
        assert_eq!(rest, Vec::<Member>::new());
        assert_eq!(rendered(&[tail]), vec![".x"]);
    }

    #[test]
    fn subweave_keeps_both_inputs_as_extremes() {
        let first = members(".x .y");
        let second = members(".a > .b");
        let mut cache = Cache::new();
        let woven = subweave(&first, &second, &mut cache).unwrap();
        let woven = rendered(&woven);
        assert!(woven.contains(&".x .y .a > .b".to_owned()), "{:?}", woven);
        assert!(woven.contains(&".a > .b .x .y".to_owned()), "{:?}", woven);
    }

    #[test]
    fn subweave_unifies_adjacent_heads() {
        let first = open_members(".x");
        let second = open_members(".a");
        let mut cache = Cache::new();
        let woven = subweave(&first, &second, &mut cache).unwrap();
        let woven = rendered(&woven);
        assert!(woven.contains(&".x .a".to_owned()), "{:?}", woven);
        assert!(woven.contains(&".a.x".to_owned()), "{:?}", woven);
        assert!(woven.contains(&".a .x".to_owned()), "{:?}", woven);
        // `.a.x` and `.x.a` are the same compound; members are a set.
        let fused_first = members(".a.x");
        let fused_flipped = members(".x.a");
        assert_eq!(fused_first, fused_flipped);
    }

    #[test]
    fn subweave_skips_fusion_when_heads_conflict() {
        let first = open_members("#x");
        let second = open_members("#y");
        let mut cache = Cache::new();
        let woven = subweave(&first, &second, &mut cache).unwrap();
        let woven = rendered(&woven);
        assert_eq!(woven, vec!["#x #y", "#y #x"]);
    }

    #[test]
    fn weave_of_singletons_reproduces_the_sequence() {
        let path: Vec<Vec<Member>> = members(".a > .b")
            .into_iter()
            .map(|member| vec![member])
            .collect();
        let woven = weave(path).unwrap();
        assert_eq!(rendered(&woven), vec![".a > .b"]);
    }

    #[test]
    fn weave_interleaves_the_last_group() {
        let path = vec![
            members(".a"),
            vec![Member::Combinator(Combinator::Descendant)],
            members(".x .y"),
        ];
        let woven = weave(path).unwrap();
        let woven = rendered(&woven);
        // The tail `.y` stays last; `.x` interleaves with `.a`.
        assert_eq!(woven, vec![".a .x .y", ".x.a .y", ".x .a .y"]);
    }
}
