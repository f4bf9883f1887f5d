//! Analogy Phrase Grammar
//!
//! Splits a free-text phrase into signed words: `"king - man + woman"`
//! adds `king` and `woman` and subtracts `man`.

use super::search::QueryError;

/// Sign applied to a word's vector in the composed query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Sign {
    Plus,
    Minus,
}

/// One signed word extracted from a phrase
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Term {
    pub word: String,
    pub sign: Sign,
}

/// Parse a phrase into signed terms.
///
/// Tokens are split on whitespace. A bare `+` or `-` token signs the
/// word that follows it; a `+`/`-` glued to the front of a token signs
/// that word directly. Unsigned words default to `+`, the first word
/// included. A trailing operator with no word after it is ignored.
pub(crate) fn parse(phrase: &str) -> Result<Vec<Term>, QueryError> {
    let mut terms = Vec::new();
    let mut pending = Sign::Plus;

    for token in phrase.split_whitespace() {
        match token {
            "+" => {
                pending = Sign::Plus;
                continue;
            }
            "-" => {
                pending = Sign::Minus;
                continue;
            }
            _ => {}
        }

        // A glued sign prefix overrides any pending operator token
        let (sign, word) = if let Some(rest) = token.strip_prefix('+') {
            (Sign::Plus, rest)
        } else if let Some(rest) = token.strip_prefix('-') {
            (Sign::Minus, rest)
        } else {
            (pending, token)
        };

        terms.push(Term {
            word: word.to_string(),
            sign,
        });
        pending = Sign::Plus;
    }

    if terms.is_empty() {
        return Err(QueryError::EmptyPhrase);
    }
    Ok(terms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(word: &str, sign: Sign) -> Term {
        Term {
            word: word.to_string(),
            sign,
        }
    }

    #[test]
    fn test_operator_tokens() {
        let terms = parse("king - man + woman").unwrap();
        assert_eq!(
            terms,
            vec![
                term("king", Sign::Plus),
                term("man", Sign::Minus),
                term("woman", Sign::Plus),
            ]
        );
    }

    #[test]
    fn test_sign_prefixes() {
        let terms = parse("king -man +woman").unwrap();
        assert_eq!(
            terms,
            vec![
                term("king", Sign::Plus),
                term("man", Sign::Minus),
                term("woman", Sign::Plus),
            ]
        );
    }

    #[test]
    fn test_unsigned_words_default_to_plus() {
        let terms = parse("paris france").unwrap();
        assert_eq!(
            terms,
            vec![term("paris", Sign::Plus), term("france", Sign::Plus)]
        );
    }

    #[test]
    fn test_single_word() {
        let terms = parse("king").unwrap();
        assert_eq!(terms, vec![term("king", Sign::Plus)]);
    }

    #[test]
    fn test_leading_minus() {
        let terms = parse("- man king").unwrap();
        assert_eq!(
            terms,
            vec![term("man", Sign::Minus), term("king", Sign::Plus)]
        );
    }

    #[test]
    fn test_sign_resets_after_word() {
        // The minus applies to `man` only, not to `woman` too
        let terms = parse("- man woman").unwrap();
        assert_eq!(
            terms,
            vec![term("man", Sign::Minus), term("woman", Sign::Plus)]
        );
    }

    #[test]
    fn test_trailing_operator_ignored() {
        let terms = parse("king -").unwrap();
        assert_eq!(terms, vec![term("king", Sign::Plus)]);
    }

    #[test]
    fn test_empty_phrase() {
        assert_eq!(parse("").unwrap_err(), QueryError::EmptyPhrase);
        assert_eq!(parse("   ").unwrap_err(), QueryError::EmptyPhrase);
        assert_eq!(parse(" + - ").unwrap_err(), QueryError::EmptyPhrase);
    }
}
