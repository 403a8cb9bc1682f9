/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Simple selectors and their unification rules.

use std::fmt;

use crate::error::SelectorError;
use crate::tokens::{Name, Script};

/// Whether a pseudo selector was written with one colon or two.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PseudoKind {
    Class,
    Element,
}

/// A single atomic selector.
///
/// Namespaces follow the source encoding: `None` is an unspecified
/// namespace, `Some("")` the explicit no-namespace form (`|foo`), and
/// `Some("*")` the any-namespace wildcard (`*|foo`).
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum SimpleSelector {
    /// The `&` parent reference; resolved away before unification runs.
    Parent,
    Class {
        name: Name,
    },
    Id {
        name: Name,
    },
    Universal {
        namespace: Option<Name>,
    },
    Element {
        name: Name,
        namespace: Option<Name>,
    },
    /// `[name]` or `[name <op> value]`; `value` is present iff `operator`
    /// is.
    Attribute {
        name: Name,
        namespace: Option<Name>,
        operator: Option<String>,
        value: Option<Name>,
    },
    Pseudo {
        kind: PseudoKind,
        name: Name,
        arg: Option<Name>,
    },
    Negation(Box<SimpleSelector>),
    /// A bare `#{...}`; resolved away before unification runs.
    Interpolation(Script),
}

/// Reconciles two optional namespaces.
///
/// `None` is compatible with anything, and the `*` wildcard defers to the
/// other side, even an unspecified one. `Err(())` means the two cannot
/// coexist on one compound.
pub fn unify_namespaces(ns1: &Option<Name>, ns2: &Option<Name>) -> Result<Option<Name>, ()> {
    if ns1 == ns2 {
        return Ok(ns1.clone());
    }
    if is_wildcard(ns1) {
        return Ok(ns2.clone());
    }
    if is_wildcard(ns2) {
        return Ok(ns1.clone());
    }
    match (ns1, ns2) {
        (None, _) => Ok(ns2.clone()),
        (_, None) => Ok(ns1.clone()),
        _ => Err(()),
    }
}

fn is_wildcard(ns: &Option<Name>) -> bool {
    ns.as_ref().map_or(false, Name::is_wildcard)
}

impl SimpleSelector {
    /// Fuses `self` into `sels`, the member list of a compound targeting a
    /// single element. `Ok(None)` means no element can match both.
    pub fn unify(
        &self,
        sels: &[SimpleSelector],
    ) -> Result<Option<Vec<SimpleSelector>>, SelectorError> {
        match self {
            SimpleSelector::Parent => {
                Err(SelectorError::invariant("[BUG] Cannot unify parent selectors."))
            }
            SimpleSelector::Interpolation(_) => Err(SelectorError::invariant(
                "[BUG] Cannot unify interpolation selectors.",
            )),
            SimpleSelector::Id { .. } => {
                let conflict = sels
                    .iter()
                    .any(|sel| matches!(sel, SimpleSelector::Id { .. }) && sel != self);
                if conflict {
                    Ok(None)
                } else {
                    Ok(Some(self.unify_default(sels)))
                }
            }
            SimpleSelector::Pseudo {
                kind: PseudoKind::Element,
                ..
            } => {
                let conflict = sels.iter().any(|sel| {
                    matches!(
                        sel,
                        SimpleSelector::Pseudo {
                            kind: PseudoKind::Element,
                            ..
                        }
                    ) && sel != self
                });
                if conflict {
                    Ok(None)
                } else {
                    Ok(Some(self.unify_default(sels)))
                }
            }
            SimpleSelector::Universal { namespace } => Ok(unify_universal(self, namespace, sels)),
            SimpleSelector::Element { name, namespace } => Ok(unify_element(name, namespace, sels)),
            _ => Ok(Some(self.unify_default(sels))),
        }
    }

    /// The shared rule: an idempotent insert that keeps a trailing
    /// pseudo-element last.
    fn unify_default(&self, sels: &[SimpleSelector]) -> Vec<SimpleSelector> {
        if sels.iter().any(|sel| sel == self) {
            return sels.to_vec();
        }
        let mut result = sels.to_vec();
        if matches!(
            result.last(),
            Some(SimpleSelector::Pseudo {
                kind: PseudoKind::Element,
                ..
            })
        ) {
            let at = result.len() - 1;
            result.insert(at, self.clone());
        } else {
            result.push(self.clone());
        }
        result
    }

    /// The canonical token form.
    pub fn to_tokens(&self) -> Name {
        let mut out = Name::default();
        match self {
            SimpleSelector::Parent => out.push_literal("&"),
            SimpleSelector::Class { name } => {
                out.push_literal(".");
                out.push_name(name);
            }
            SimpleSelector::Id { name } => {
                out.push_literal("#");
                out.push_name(name);
            }
            SimpleSelector::Universal { namespace } => {
                if let Some(namespace) = namespace {
                    out.push_name(namespace);
                    out.push_literal("|");
                }
                out.push_literal("*");
            }
            SimpleSelector::Element { name, namespace } => {
                if let Some(namespace) = namespace {
                    out.push_name(namespace);
                    out.push_literal("|");
                }
                out.push_name(name);
            }
            SimpleSelector::Attribute {
                name,
                namespace,
                operator,
                value,
            } => {
                out.push_literal("[");
                if let Some(namespace) = namespace {
                    out.push_name(namespace);
                    out.push_literal("|");
                }
                out.push_name(name);
                if let Some(operator) = operator {
                    out.push_literal(operator);
                    if let Some(value) = value {
                        out.push_name(value);
                    }
                }
                out.push_literal("]");
            }
            SimpleSelector::Pseudo { kind, name, arg } => {
                out.push_literal(match kind {
                    PseudoKind::Class => ":",
                    PseudoKind::Element => "::",
                });
                out.push_name(name);
                if let Some(arg) = arg {
                    out.push_literal("(");
                    out.push_name(&arg.trimmed());
                    out.push_literal(")");
                }
            }
            SimpleSelector::Negation(inner) => {
                out.push_literal(":not(");
                out.push_name(&inner.to_tokens());
                out.push_literal(")");
            }
            SimpleSelector::Interpolation(script) => out.push_script(script.clone()),
        }
        out
    }
}

impl fmt::Display for SimpleSelector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.to_tokens(), f)
    }
}

fn unify_universal(
    this: &SimpleSelector,
    namespace: &Option<Name>,
    sels: &[SimpleSelector],
) -> Option<Vec<SimpleSelector>> {
    match sels.first() {
        None => Some(vec![this.clone()]),
        Some(SimpleSelector::Universal { namespace: other }) => {
            let unified = unify_namespaces(namespace, other).ok()?;
            let mut result = sels.to_vec();
            result[0] = SimpleSelector::Universal { namespace: unified };
            Some(result)
        }
        Some(SimpleSelector::Element {
            name,
            namespace: other,
        }) => {
            let unified = unify_namespaces(namespace, other).ok()?;
            let mut result = sels.to_vec();
            result[0] = SimpleSelector::Element {
                name: name.clone(),
                namespace: unified,
            };
            Some(result)
        }
        Some(_) => {
            // `*` and `*|*` add nothing to a compound that already
            // constrains the element some other way.
            if namespace.is_none() || is_wildcard(namespace) {
                Some(sels.to_vec())
            } else {
                let mut result = vec![this.clone()];
                result.extend_from_slice(sels);
                Some(result)
            }
        }
    }
}

fn unify_element(
    name: &Name,
    namespace: &Option<Name>,
    sels: &[SimpleSelector],
) -> Option<Vec<SimpleSelector>> {
    match sels.first() {
        Some(SimpleSelector::Universal { namespace: other }) => {
            let unified = unify_namespaces(namespace, other).ok()?;
            let mut result = sels.to_vec();
            result[0] = SimpleSelector::Element {
                name: name.clone(),
                namespace: unified,
            };
            Some(result)
        }
        Some(SimpleSelector::Element {
            name: other_name,
            namespace: other,
        }) => {
            if name != other_name {
                return None;
            }
            let unified = unify_namespaces(namespace, other).ok()?;
            let mut result = sels.to_vec();
            result[0] = SimpleSelector::Element {
                name: name.clone(),
                namespace: unified,
            };
            Some(result)
        }
        _ => {
            let mut result = vec![SimpleSelector::Element {
                name: name.clone(),
                namespace: namespace.clone(),
            }];
            result.extend_from_slice(sels);
            Some(result)
        }
    }
}
