/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::error::Error;
use std::fmt;

/// An error produced while parsing, resolving, or extending selectors.
///
/// `unify` returning `None` is not an error; it is the normal signal that
/// two selectors cannot match the same element.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SelectorError {
    /// A user-visible error in the input stylesheet.
    Syntax {
        message: String,
        line: Option<usize>,
        filename: Option<String>,
    },
    /// An internal precondition was violated; seeing one of these means a
    /// caller handed the algebra an unresolved selector tree.
    InvariantViolation(String),
}

impl SelectorError {
    pub(crate) fn invariant(message: &str) -> SelectorError {
        SelectorError::InvariantViolation(message.to_owned())
    }

    /// The message without location metadata.
    pub fn message(&self) -> &str {
        match *self {
            SelectorError::Syntax { ref message, .. } => message,
            SelectorError::InvariantViolation(ref message) => message,
        }
    }
}

impl fmt::Display for SelectorError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl Error for SelectorError {}
