/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Selector parsing.
//!
//! Builds [`CommaSequence`] trees from source text on top of the
//! `cssparser` tokenizer. Interpolation stays opaque: `#{...}` is captured
//! as the source text of the enclosed expression. Namespace prefixes are
//! carried through verbatim; no default namespace is consulted.

use cssparser::{
    match_ignore_ascii_case, BasicParseErrorKind, ParseError, ParseErrorKind, Parser, ParserInput,
    ToCss, Token,
};
use smallvec::SmallVec;

use crate::error::SelectorError;
use crate::selector::{PseudoKind, SimpleSelector};
use crate::sequence::{Combinator, CommaSequence, Member, Sequence, SimpleSequence, Simples};
use crate::tokens::{Name, Script};

/// Parser-level failures, carried inside `cssparser::ParseError`.
#[derive(Clone, Debug, PartialEq)]
pub enum SelectorParseErrorKind<'i> {
    /// A token that cannot start or continue a selector.
    UnexpectedToken(Token<'i>),
    /// A compound with no simple selectors, e.g. `a > , b`.
    EmptyCompound,
    /// A namespace separator not followed by an element name or `*`.
    InvalidQualifiedName,
    /// `.`, `#{`, or a pseudo colon not followed by a name.
    ExpectedName,
}

type SelectorResult<'i, T> = Result<T, ParseError<'i, SelectorParseErrorKind<'i>>>;

/// Parses a comma-separated selector group. Lines are recorded on every
/// compound; attach a filename afterwards with
/// [`CommaSequence::set_filename`].
pub fn parse_selector(text: &str) -> Result<CommaSequence, SelectorError> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    parse_comma_sequence(&mut parser).map_err(|err| {
        let message = match err.kind {
            ParseErrorKind::Basic(BasicParseErrorKind::UnexpectedToken(ref token)) => {
                format!("unexpected \"{}\" in selector", token.to_css_string())
            }
            ParseErrorKind::Basic(BasicParseErrorKind::EndOfInput) => {
                "unexpected end of selector".to_owned()
            }
            ParseErrorKind::Basic(_) => "invalid selector".to_owned(),
            ParseErrorKind::Custom(SelectorParseErrorKind::UnexpectedToken(ref token)) => {
                format!("unexpected \"{}\" in selector", token.to_css_string())
            }
            ParseErrorKind::Custom(SelectorParseErrorKind::EmptyCompound) => {
                "expected a selector".to_owned()
            }
            ParseErrorKind::Custom(SelectorParseErrorKind::InvalidQualifiedName) => {
                "expected an element name or \"*\" after the namespace separator".to_owned()
            }
            ParseErrorKind::Custom(SelectorParseErrorKind::ExpectedName) => {
                "expected a name".to_owned()
            }
        };
        SelectorError::Syntax {
            message,
            line: Some(err.location.line as usize + 1),
            filename: None,
        }
    })
}

fn parse_comma_sequence<'i>(input: &mut Parser<'i, '_>) -> SelectorResult<'i, CommaSequence> {
    let mut members = vec![parse_sequence(input)?];
    loop {
        let token = match input.next() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        match token {
            Token::Comma => members.push(parse_sequence(input)?),
            token => {
                return Err(input.new_custom_error(SelectorParseErrorKind::UnexpectedToken(token)))
            }
        }
    }
    Ok(CommaSequence::new(members))
}

fn parse_sequence<'i>(input: &mut Parser<'i, '_>) -> SelectorResult<'i, Sequence> {
    let mut members: Vec<Member> = Vec::new();
    if skip_whitespace(input) {
        // Remember that the group broke across lines here.
        members.push(Member::Newline);
    }
    members.push(Member::Simple(parse_compound(input)?));
    loop {
        // Whitespace may turn out to be a descendant combinator, or may
        // just precede `,`, an explicit combinator, or the end of input.
        let mut saw_whitespace = false;
        let mut saw_newline = false;
        let combinator;
        loop {
            let state = input.state();
            let token = match input.next_including_whitespace() {
                Ok(token) => token.clone(),
                Err(_) => return Ok(Sequence::new(members)),
            };
            match token {
                Token::WhiteSpace(text) => {
                    saw_whitespace = true;
                    saw_newline |= text.contains('\n');
                }
                Token::Delim('>') => {
                    combinator = Combinator::Child;
                    break;
                }
                Token::Delim('+') => {
                    combinator = Combinator::NextSibling;
                    break;
                }
                Token::Delim('~') => {
                    combinator = Combinator::LaterSibling;
                    break;
                }
                Token::Comma => {
                    input.reset(&state);
                    return Ok(Sequence::new(members));
                }
                _ => {
                    input.reset(&state);
                    if saw_whitespace {
                        combinator = Combinator::Descendant;
                        break;
                    }
                    return Ok(Sequence::new(members));
                }
            }
        }
        if saw_newline {
            members.push(Member::Newline);
        }
        members.push(Member::Combinator(combinator));
        skip_whitespace(input);
        members.push(Member::Simple(parse_compound(input)?));
    }
}

/// Consumes whitespace; true when it contained a newline.
fn skip_whitespace(input: &mut Parser) -> bool {
    let mut saw_newline = false;
    loop {
        let state = input.state();
        match input.next_including_whitespace() {
            Ok(&Token::WhiteSpace(text)) => saw_newline |= text.contains('\n'),
            _ => {
                input.reset(&state);
                return saw_newline;
            }
        }
    }
}

/// [ type_selector | universal ]? [ id | class | attrib | pseudo |
/// negation | parent | interpolation ]+
fn parse_compound<'i>(input: &mut Parser<'i, '_>) -> SelectorResult<'i, SimpleSequence> {
    let location = input.current_source_location();
    let mut members: Simples = SmallVec::new();
    if let Some(type_selector) = parse_type_selector(input)? {
        members.push(type_selector);
    }
    while let Some(simple) = parse_one_simple(input)? {
        members.push(simple);
    }
    if members.is_empty() {
        return Err(input.new_custom_error(SelectorParseErrorKind::EmptyCompound));
    }
    let mut compound = SimpleSequence::new(members);
    compound.line = Some(location.line as usize + 1);
    Ok(compound)
}

/// * `Ok(None)`: not a type selector; `input` was not consumed.
fn parse_type_selector<'i>(
    input: &mut Parser<'i, '_>,
) -> SelectorResult<'i, Option<SimpleSelector>> {
    Ok(match parse_qualified_name(input, false)? {
        None => None,
        Some((namespace, Some(name))) => Some(SimpleSelector::Element { name, namespace }),
        Some((namespace, None)) => Some(SimpleSelector::Universal { namespace }),
    })
}

/// * `Ok(None)`: not a qualified name; `input` was not consumed.
/// * `Ok(Some((namespace, None)))`: the `*` universal name.
fn parse_qualified_name<'i>(
    input: &mut Parser<'i, '_>,
    in_attr_selector: bool,
) -> SelectorResult<'i, Option<(Option<Name>, Option<Name>)>> {
    let start = input.state();
    let token = match input.next_including_whitespace() {
        Ok(token) => token.clone(),
        Err(_) => {
            input.reset(&start);
            return Ok(None);
        }
    };
    match token {
        Token::Ident(value) => {
            let after_ident = input.state();
            match input.next_including_whitespace() {
                Ok(&Token::Delim('|')) => {
                    explicit_namespace(input, Some(Name::literal(&value)), in_attr_selector)
                }
                _ => {
                    input.reset(&after_ident);
                    Ok(Some((None, Some(Name::literal(&value)))))
                }
            }
        }
        Token::Delim('*') => {
            let after_star = input.state();
            match input.next_including_whitespace() {
                Ok(&Token::Delim('|')) => {
                    explicit_namespace(input, Some(Name::literal("*")), in_attr_selector)
                }
                _ => {
                    input.reset(&after_star);
                    if in_attr_selector {
                        Err(input.new_custom_error(SelectorParseErrorKind::InvalidQualifiedName))
                    } else {
                        Ok(Some((None, None)))
                    }
                }
            }
        }
        Token::Delim('|') => explicit_namespace(input, Some(Name::literal("")), in_attr_selector),
        _ => {
            input.reset(&start);
            Ok(None)
        }
    }
}

fn explicit_namespace<'i>(
    input: &mut Parser<'i, '_>,
    namespace: Option<Name>,
    in_attr_selector: bool,
) -> SelectorResult<'i, Option<(Option<Name>, Option<Name>)>> {
    let token = match input.next_including_whitespace() {
        Ok(token) => token.clone(),
        Err(err) => return Err(err.into()),
    };
    match token {
        Token::Delim('*') if !in_attr_selector => Ok(Some((namespace, None))),
        Token::Ident(name) => Ok(Some((namespace, Some(Name::literal(&name))))),
        _ => Err(input.new_custom_error(SelectorParseErrorKind::InvalidQualifiedName)),
    }
}

/// Parse a simple selector other than a type selector.
///
/// * `Ok(None)`: not a simple selector; `input` was not consumed.
fn parse_one_simple<'i>(input: &mut Parser<'i, '_>) -> SelectorResult<'i, Option<SimpleSelector>> {
    let start = input.state();
    let token = match input.next_including_whitespace() {
        Ok(token) => token.clone(),
        Err(_) => {
            input.reset(&start);
            return Ok(None);
        }
    };
    match token {
        Token::IDHash(id) => {
            let name = parse_name_continuation(input, Name::literal(&id))?;
            Ok(Some(SimpleSelector::Id { name }))
        }
        Token::Delim('.') => {
            let name = parse_name(input)?;
            Ok(Some(SimpleSelector::Class { name }))
        }
        Token::Delim('&') => Ok(Some(SimpleSelector::Parent)),
        // A `#` that did not lex as an id hash begins `#{...}`.
        Token::Delim('#') => {
            let script = parse_interpolation(input)?;
            Ok(Some(SimpleSelector::Interpolation(script)))
        }
        Token::SquareBracketBlock => {
            let attribute = input.parse_nested_block(|input| parse_attribute(input))?;
            Ok(Some(attribute))
        }
        Token::Colon => parse_pseudo(input).map(Some),
        _ => {
            input.reset(&start);
            Ok(None)
        }
    }
}

/// A name after `.`: a literal, an interpolation, or a run of both.
fn parse_name<'i>(input: &mut Parser<'i, '_>) -> SelectorResult<'i, Name> {
    let token = match input.next_including_whitespace() {
        Ok(token) => token.clone(),
        Err(err) => return Err(err.into()),
    };
    let name = match token {
        Token::Ident(text) => Name::literal(&text),
        Token::Delim('#') => {
            let mut name = Name::default();
            name.push_script(parse_interpolation(input)?);
            name
        }
        _ => return Err(input.new_custom_error(SelectorParseErrorKind::ExpectedName)),
    };
    parse_name_continuation(input, name)
}

/// Extends `name` with directly adjacent literal and interpolation parts.
fn parse_name_continuation<'i>(
    input: &mut Parser<'i, '_>,
    mut name: Name,
) -> SelectorResult<'i, Name> {
    loop {
        let state = input.state();
        let token = match input.next_including_whitespace() {
            Ok(token) => token.clone(),
            Err(_) => {
                input.reset(&state);
                return Ok(name);
            }
        };
        match token {
            Token::Ident(text) => name.push_literal(&text),
            Token::Delim('#') => name.push_script(parse_interpolation(input)?),
            _ => {
                input.reset(&state);
                return Ok(name);
            }
        }
    }
}

/// Parses the `{...}` of an interpolation, after its `#`. The expression
/// is captured as source text; evaluation happens elsewhere.
fn parse_interpolation<'i>(input: &mut Parser<'i, '_>) -> SelectorResult<'i, Script> {
    let token = match input.next_including_whitespace() {
        Ok(token) => token.clone(),
        Err(err) => return Err(err.into()),
    };
    match token {
        Token::CurlyBracketBlock => {
            let source = input.parse_nested_block(|input| {
                let mut source = String::new();
                serialize_tokens(input, &mut source)?;
                Ok(source)
            })?;
            Ok(Script::new(source.trim()))
        }
        token => Err(input.new_custom_error(SelectorParseErrorKind::UnexpectedToken(token))),
    }
}

/// Re-serializes a token run, descending into nested blocks, so scripts
/// and pseudo arguments survive as opaque text.
fn serialize_tokens<'i>(input: &mut Parser<'i, '_>, out: &mut String) -> SelectorResult<'i, ()> {
    loop {
        let token = match input.next_including_whitespace() {
            Ok(token) => token.clone(),
            Err(_) => return Ok(()),
        };
        let _ = token.to_css(out);
        match token {
            Token::Function(_) | Token::ParenthesisBlock => {
                input.parse_nested_block(|input| serialize_tokens(input, out))?;
                out.push(')');
            }
            Token::SquareBracketBlock => {
                input.parse_nested_block(|input| serialize_tokens(input, out))?;
                out.push(']');
            }
            Token::CurlyBracketBlock => {
                input.parse_nested_block(|input| serialize_tokens(input, out))?;
                out.push('}');
            }
            _ => {}
        }
    }
}

/// The inside of a `[...]` block.
fn parse_attribute<'i>(input: &mut Parser<'i, '_>) -> SelectorResult<'i, SimpleSelector> {
    skip_whitespace(input);
    let (namespace, name) = match parse_qualified_name(input, true)? {
        Some((namespace, Some(name))) => (namespace, name),
        _ => return Err(input.new_custom_error(SelectorParseErrorKind::ExpectedName)),
    };
    let operator = match input.next().ok().cloned() {
        None => None,
        Some(Token::Delim('=')) => Some("=".to_owned()),
        Some(Token::IncludeMatch) => Some("~=".to_owned()),
        Some(Token::DashMatch) => Some("|=".to_owned()),
        Some(Token::PrefixMatch) => Some("^=".to_owned()),
        Some(Token::SubstringMatch) => Some("*=".to_owned()),
        Some(Token::SuffixMatch) => Some("$=".to_owned()),
        Some(token) => {
            return Err(input.new_custom_error(SelectorParseErrorKind::UnexpectedToken(token)))
        }
    };
    let value = match operator {
        None => None,
        Some(_) => {
            let token = match input.next() {
                Ok(token) => token.clone(),
                Err(err) => return Err(err.into()),
            };
            match token {
                // Quoted values keep their quotes in the token form.
                Token::Ident(_) | Token::QuotedString(_) => {
                    Some(Name::literal(&token.to_css_string()))
                }
                token => {
                    return Err(
                        input.new_custom_error(SelectorParseErrorKind::UnexpectedToken(token))
                    )
                }
            }
        }
    };
    input.expect_exhausted()?;
    Ok(SimpleSelector::Attribute {
        name,
        namespace,
        operator,
        value,
    })
}

/// A pseudo selector, after its first `:`.
fn parse_pseudo<'i>(input: &mut Parser<'i, '_>) -> SelectorResult<'i, SimpleSelector> {
    let mut kind = PseudoKind::Class;
    let mut token = match input.next_including_whitespace() {
        Ok(token) => token.clone(),
        Err(err) => return Err(err.into()),
    };
    if token == Token::Colon {
        kind = PseudoKind::Element;
        token = match input.next_including_whitespace() {
            Ok(token) => token.clone(),
            Err(err) => return Err(err.into()),
        };
    }
    match token {
        Token::Ident(name) => Ok(SimpleSelector::Pseudo {
            kind,
            name: Name::literal(&name),
            arg: None,
        }),
        Token::Function(name) => {
            match_ignore_ascii_case! { &name,
                "not" => {
                    let inner = input.parse_nested_block(|input| {
                        skip_whitespace(input);
                        let simple = match parse_type_selector(input)? {
                            Some(simple) => simple,
                            None => match parse_one_simple(input)? {
                                Some(simple) => simple,
                                None => {
                                    return Err(input
                                        .new_custom_error(SelectorParseErrorKind::ExpectedName))
                                }
                            },
                        };
                        skip_whitespace(input);
                        input.expect_exhausted()?;
                        Ok(simple)
                    })?;
                    Ok(SimpleSelector::Negation(Box::new(inner)))
                },
                _ => {
                    let mut arg = String::new();
                    input.parse_nested_block(|input| serialize_tokens(input, &mut arg))?;
                    Ok(SimpleSelector::Pseudo {
                        kind,
                        name: Name::literal(&name),
                        arg: Some(Name::literal(&arg)),
                    })
                }
            }
        }
        token => Err(input.new_custom_error(SelectorParseErrorKind::UnexpectedToken(token))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> CommaSequence {
        parse_selector(text).unwrap()
    }

    fn roundtrips(text: &str) {
        assert_eq!(parse(text).to_string(), text, "for input {:?}", text);
    }

    fn compound(members: Vec<SimpleSelector>) -> Member {
        Member::Simple(SimpleSequence::new(Simples::from_vec(members)))
    }

    fn class(name: &str) -> SimpleSelector {
        SimpleSelector::Class {
            name: Name::literal(name),
        }
    }

    #[test]
    fn parses_a_compound() {
        let parsed = parse("e.foo#bar");
        assert_eq!(
            parsed,
            CommaSequence::new(vec![Sequence::new(vec![compound(vec![
                SimpleSelector::Element {
                    name: Name::literal("e"),
                    namespace: None,
                },
                class("foo"),
                SimpleSelector::Id {
                    name: Name::literal("bar"),
                },
            ])])])
        );
    }

    #[test]
    fn parses_combinators() {
        let parsed = parse("e.foo > #bar");
        assert_eq!(
            parsed,
            CommaSequence::new(vec![Sequence::new(vec![
                compound(vec![
                    SimpleSelector::Element {
                        name: Name::literal("e"),
                        namespace: None,
                    },
                    class("foo"),
                ]),
                Member::Combinator(Combinator::Child),
                compound(vec![SimpleSelector::Id {
                    name: Name::literal("bar"),
                }]),
            ])])
        );
    }

    #[test]
    fn parses_namespaces() {
        assert_eq!(
            parse("svg|circle"),
            CommaSequence::new(vec![Sequence::new(vec![compound(vec![
                SimpleSelector::Element {
                    name: Name::literal("circle"),
                    namespace: Some(Name::literal("svg")),
                }
            ])])])
        );
        roundtrips("svg|circle");
        roundtrips("*|a");
        roundtrips("|a");
        roundtrips("*");
        roundtrips("ns|*");
    }

    #[test]
    fn parses_parent_references() {
        assert_eq!(
            parse("&.foo"),
            CommaSequence::new(vec![Sequence::new(vec![compound(vec![
                SimpleSelector::Parent,
                class("foo"),
            ])])])
        );
        roundtrips("&.foo");
        roundtrips("& .foo");
    }

    #[test]
    fn parses_attributes() {
        roundtrips("[disabled]");
        roundtrips("[href^=\"http\"]");
        roundtrips("[lang|=en]");
        roundtrips("[a=b]");
        roundtrips("[data-x~=\"y z\"]");
        roundtrips("ns|a[ns|b=c]");
    }

    #[test]
    fn parses_pseudos() {
        roundtrips(":hover");
        roundtrips("::after");
        roundtrips("a:nth-child(2n+1)");
        roundtrips(":not(.foo)");
        roundtrips(":not(a)");
        assert_eq!(
            parse(":not(.foo)"),
            CommaSequence::new(vec![Sequence::new(vec![compound(vec![
                SimpleSelector::Negation(Box::new(class("foo")))
            ])])])
        );
    }

    #[test]
    fn parses_interpolation() {
        let parsed = parse(".#{$color}");
        assert_eq!(
            parsed,
            CommaSequence::new(vec![Sequence::new(vec![compound(vec![
                SimpleSelector::Class {
                    name: {
                        let mut name = Name::default();
                        name.push_script(Script::new("$color"));
                        name
                    },
                }
            ])])])
        );
        roundtrips(".#{$color}");
        roundtrips(".item-#{$i}");
        roundtrips("#{$sel}");
        roundtrips("#a#{$suffix}");
    }

    #[test]
    fn parses_comma_groups_and_newlines() {
        roundtrips("a, b");
        roundtrips(".a > .b, .c + .d ~ .e");
        roundtrips("a,\nb");
        let parsed = parse("a,\nb");
        assert_eq!(parsed.members[1].members[0], Member::Newline);
        assert_eq!(parsed.members[1].line(), Some(2));
    }

    #[test]
    fn records_line_numbers() {
        let parsed = parse(".a\n> .b");
        assert_eq!(parsed.members[0].line(), Some(1));
        let last = parsed.members[0]
            .members
            .iter()
            .rev()
            .find_map(Member::as_simple)
            .unwrap();
        assert_eq!(last.line, Some(2));
    }

    #[test]
    fn whitespace_with_a_newline_keeps_the_marker() {
        let parsed = parse(".a\n.b");
        let members = &parsed.members[0].members;
        assert!(members.contains(&Member::Newline));
        assert_eq!(parsed.to_string(), ".a\n.b");
    }

    #[test]
    fn rejects_invalid_selectors() {
        assert!(parse_selector("").is_err());
        assert!(parse_selector(".").is_err());
        assert!(parse_selector("a >").is_err());
        assert!(parse_selector("a,").is_err());
        assert!(parse_selector("ns| b").is_err());
        assert!(parse_selector("[a=]").is_err());
    }

    #[test]
    fn errors_carry_line_numbers() {
        let err = parse_selector(".a,\n.").unwrap_err();
        match err {
            SelectorError::Syntax { line, .. } => assert_eq!(line, Some(2)),
            other => panic!("expected a syntax error, got {:?}", other),
        }
    }
}
