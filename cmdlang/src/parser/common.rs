use super::errors::ParseError;
use super::Rule;
use crate::ast::{Identifier, Literal, Span};
use pest::iterators::Pair;

pub(super) fn span_of(pair: &Pair<Rule>) -> Span {
    let span = pair.as_span();
    Span::new(span.start(), span.end())
}

/// First inner pair, or an error naming the construct that was expected to have one.
pub(super) fn first_inner<'i>(
    pair: Pair<'i, Rule>,
    construct: &'static str,
) -> Result<Pair<'i, Rule>, ParseError> {
    let span = span_of(&pair);
    pair.into_inner()
        .next()
        .ok_or_else(|| ParseError::invalid(construct, "missing inner node", span))
}

pub(super) fn build_identifier(pair: Pair<Rule>) -> Identifier {
    Identifier::new(pair.as_str(), span_of(&pair))
}

pub(super) fn build_literal(pair: Pair<Rule>) -> Result<Literal, ParseError> {
    let span = span_of(&pair);
    match pair.as_rule() {
        Rule::integer => {
            let digits = pair.as_str().replace('_', "");
            digits
                .parse::<i64>()
                .map(Literal::Integer)
                .map_err(|e| ParseError::invalid("integer literal", e.to_string(), span))
        }
        Rule::float => pair
            .as_str()
            .parse::<f64>()
            .map(Literal::Float)
            .map_err(|e| ParseError::invalid("float literal", e.to_string(), span)),
        Rule::boolean => Ok(Literal::Boolean(pair.as_str() == "True")),
        Rule::none => Ok(Literal::None),
        Rule::string => {
            let inner = first_inner(pair, "string literal")?;
            Ok(Literal::String(unescape(inner.as_str())))
        }
        other => Err(ParseError::invalid(
            "literal",
            format!("unexpected rule {:?}", other),
            span,
        )),
    }
}

/// Resolves backslash escapes. Unknown escapes are kept verbatim, backslash included.
pub(super) fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::unescape;

    #[test]
    fn unescape_known_and_unknown_sequences() {
        assert_eq!(unescape(r"a\nb"), "a\nb");
        assert_eq!(unescape(r"it\'s"), "it's");
        assert_eq!(unescape(r"C:\path"), r"C:\path");
        assert_eq!(unescape(r#"say \"hi\""#), "say \"hi\"");
    }
}
