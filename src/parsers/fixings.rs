//Bcause
//Copyright (C) 2022-2023 A. Dubray
//
//This program is free software: you can redistribute it and/or modify
//it under the terms of the GNU Affero General Public License as published by
//the Free Software Foundation, either version 3 of the License, or
//(at your option) any later version.
//
//This program is distributed in the hope that it will be useful,
//but WITHOUT ANY WARRANTY; without even the implied warranty of
//MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//GNU Affero General Public License for more details.
//
//You should have received a copy of the GNU Affero General Public License
//along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Parser for the edges fixed before the search. A fixing is written `x<sym>y` with the variables
//! numbered as in the constraint file, and one of the following symbols
//!     - `<>` and `</>`: x <-> y present or absent
//!     - `->` and `/>`: x -> y present or absent
//!     - `<-` and `</`: x <- y present or absent
//!
//! For example "1<>2 2->3 3<-5 1</>4 2/>5 6</7". Whitespace around the symbols is allowed.

use crate::core::edge::{Edge, EdgeKind};
use crate::core::instance::Instance;
use crate::error::LoadError;

fn symbol_to_edge(symbol: &str) -> Option<(EdgeKind, bool)> {
    match symbol {
        "<>" => Some((EdgeKind::Bidirected, true)),
        "</>" => Some((EdgeKind::Bidirected, false)),
        "->" => Some((EdgeKind::Forward, true)),
        "/>" => Some((EdgeKind::Forward, false)),
        "<-" => Some((EdgeKind::Backward, true)),
        "</" => Some((EdgeKind::Backward, false)),
        _ => None,
    }
}

/// Consumes the characters of the iterator while the predicate holds
fn take_while<I: Iterator<Item = char>>(chars: &mut std::iter::Peekable<I>, predicate: impl Fn(char) -> bool) -> String {
    let mut taken = String::new();
    while let Some(c) = chars.peek().copied() {
        if !predicate(c) {
            break;
        }
        taken.push(c);
        chars.next();
    }
    taken
}

fn to_variable(token: &str, number: &str, instance: &Instance) -> Result<usize, LoadError> {
    let invalid = |reason: &str| LoadError::InvalidFixing { token: token.to_string(), reason: reason.to_string() };
    let value = number.parse::<usize>().map_err(|_| invalid("missing variable"))?;
    if value < instance.offset() {
        return Err(invalid("variable too small"));
    }
    if value - instance.offset() >= instance.size() {
        return Err(invalid("variable too large"));
    }
    Ok(value - instance.offset())
}

/// Parses the fixed edges of `text`
pub fn parse_fixings(text: &str, instance: &Instance) -> Result<Vec<Edge>, LoadError> {
    let mut fixings = vec![];
    let mut chars = text.chars().peekable();
    loop {
        let skipped = take_while(&mut chars, |c| !c.is_ascii_digit());
        if chars.peek().is_none() {
            if !skipped.trim().is_empty() {
                return Err(LoadError::InvalidFixing { token: skipped.trim().to_string(), reason: "missing variables".to_string() });
            }
            break;
        }
        let x = take_while(&mut chars, |c| c.is_ascii_digit());
        take_while(&mut chars, char::is_whitespace);
        let symbol = take_while(&mut chars, |c| matches!(c, '<' | '>' | '-' | '/'));
        take_while(&mut chars, char::is_whitespace);
        let y = take_while(&mut chars, |c| c.is_ascii_digit());
        let token = format!("{}{}{}", x, symbol, y);

        let (kind, present) = symbol_to_edge(&symbol).ok_or_else(|| LoadError::InvalidFixing {
            token: token.clone(),
            reason: format!("unknown symbol '{}'", symbol),
        })?;
        let x = to_variable(&token, &x, instance)?;
        let y = to_variable(&token, &y, instance)?;
        if x == y {
            return Err(LoadError::InvalidFixing { token, reason: "an edge needs two variables".to_string() });
        }
        fixings.push(Edge::new(x, y, kind, present));
    }
    Ok(fixings)
}
