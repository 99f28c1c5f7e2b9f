//! Pure functions for walking a flattened token sequence
//!
//! None of these touch a message buffer. They rely on the invariant that a
//! `BEGIN_*` token's `component_token_count` spans exactly to its matching
//! `END_*` token, so whole subtrees can be stepped over without a stack.

use super::{Signal, Token};
use crate::Error;

/// Starting at `index`, append every consecutive sibling construct whose
/// opening token has `signal` (along with its entire subtree) to `out`.
/// Returns the index just past the last consumed token.
///
/// ```
/// use sbe_otf::{ir::navigate, Signal, Token};
///
/// let tokens = vec![
///     Token::new(Signal::BeginField, "a").with_component_token_count(3),
///     Token::new(Signal::Encoding, "a"),
///     Token::new(Signal::EndField, "a"),
///     Token::new(Signal::BeginGroup, "g").with_component_token_count(2),
///     Token::new(Signal::EndGroup, "g"),
/// ];
///
/// let mut fields = Vec::new();
/// let next = navigate::collect_fields(&tokens, 0, &mut fields);
/// assert_eq!(next, 3);
/// assert_eq!(fields.len(), 3);
/// ```
pub fn collect<'a>(
    signal: Signal,
    tokens: &'a [Token],
    index: usize,
    out: &mut Vec<&'a Token>,
) -> usize {
    let mut i = index;
    while let Some(token) = tokens.get(i) {
        if token.signal() != signal {
            break;
        }

        let limit = (i + token.component_token_count().max(1)).min(tokens.len());
        out.extend(&tokens[i..limit]);
        i = limit;
    }

    i
}

pub fn collect_fields<'a>(tokens: &'a [Token], index: usize, out: &mut Vec<&'a Token>) -> usize {
    collect(Signal::BeginField, tokens, index, out)
}

pub fn collect_groups<'a>(tokens: &'a [Token], index: usize, out: &mut Vec<&'a Token>) -> usize {
    collect(Signal::BeginGroup, tokens, index, out)
}

pub fn collect_var_data<'a>(
    tokens: &'a [Token],
    index: usize,
    out: &mut Vec<&'a Token>,
) -> usize {
    collect(Signal::BeginVarData, tokens, index, out)
}

/// The tokens of a message without the enclosing `BEGIN_MESSAGE` and
/// `END_MESSAGE`. Sequences too short to be bracketed yield an empty slice.
pub fn message_body(tokens: &[Token]) -> &[Token] {
    if tokens.len() < 2 {
        &[]
    } else {
        &tokens[1..tokens.len() - 1]
    }
}

/// Index of the first token at or after `start` with the given signal and
/// name
pub fn find_end_signal(tokens: &[Token], start: usize, signal: Signal, name: &str) -> Option<usize> {
    tokens
        .iter()
        .enumerate()
        .skip(start)
        .find(|(_, token)| token.signal() == signal && token.name() == name)
        .map(|(i, _)| i)
}

/// Names of the groups at the top level of `tokens`. Nested groups are
/// excluded.
pub fn find_sub_group_names(tokens: &[Token]) -> Vec<&str> {
    let mut names = Vec::new();
    let mut level = 0usize;
    for token in tokens {
        match token.signal() {
            Signal::BeginGroup => {
                if level == 0 {
                    names.push(token.name());
                }
                level += 1;
            }
            Signal::EndGroup => level = level.saturating_sub(1),
            _ => {}
        }
    }

    names
}

/// Index of the first token with the given signal
pub fn find_signal(tokens: &[Token], signal: Signal) -> Option<usize> {
    tokens.iter().position(|x| x.signal() == signal)
}

/// Index of the token that closes the construct opened at `index`. A leaf
/// closes itself.
pub fn find_end(tokens: &[Token], index: usize) -> Option<usize> {
    let token = tokens.get(index)?;
    let end = index.checked_add(token.component_token_count().checked_sub(1)?)?;
    (end < tokens.len()).then_some(end)
}

/// Number of constructs that enclose the token at `index`
pub fn nesting_depth(tokens: &[Token], index: usize) -> usize {
    let mut depth = 0usize;
    for token in tokens.iter().take(index) {
        if token.signal().is_begin() {
            depth += 1;
        } else if token.signal().is_end() {
            depth = depth.saturating_sub(1);
        }
    }
    depth
}

/// Verify the bracketing invariant: every `BEGIN_*` token's
/// `component_token_count` lands on an `END_*` of the matching kind and name,
/// and leaves have a count of one.
pub fn validate(tokens: &[Token]) -> Result<(), Error> {
    validate_range(tokens, 0, tokens.len())
}

fn validate_range(tokens: &[Token], start: usize, end: usize) -> Result<(), Error> {
    let mut i = start;
    while i < end {
        let token = &tokens[i];
        let count = token.component_token_count();
        match token.signal().end() {
            Some(expected) => {
                let close = find_end(tokens, i)
                    .filter(|&x| x > i && x < end)
                    .ok_or_else(|| {
                        Error::invalid_ir(format!(
                            "{} {} at index {} has component token count {} outside its scope",
                            token.signal(),
                            token.name(),
                            i,
                            count
                        ))
                    })?;

                let closing = &tokens[close];
                if closing.signal() != expected || closing.name() != token.name() {
                    return Err(Error::invalid_ir(format!(
                        "{} {} at index {} is closed by {} {}",
                        token.signal(),
                        token.name(),
                        i,
                        closing.signal(),
                        closing.name()
                    )));
                }

                validate_range(tokens, i + 1, close)?;
                i = close + 1;
            }
            None if token.signal().is_end() => {
                return Err(Error::invalid_ir(format!(
                    "unmatched {} {} at index {}",
                    token.signal(),
                    token.name(),
                    i
                )));
            }
            None => {
                if count != 1 {
                    return Err(Error::invalid_ir(format!(
                        "{} {} at index {} must have a component token count of 1",
                        token.signal(),
                        token.name(),
                        i
                    )));
                }
                i += 1;
            }
        }
    }

    Ok(())
}
