//! Submission parser
//!
//! Turns one line of free text such as `+10 Eli great job at rush` into a
//! structured `(delta, subject, note)` triple. Accepted forms:
//!
//! - `+10 Eli Great job`
//! - `-5 matt Late to chapter` (name is normalized through the registry)
//! - `+2.5 Eli Half credit` (fractional values round half away from zero)
//! - `+10 to Eli for great work` (a leading `to` is skipped)
//!
//! The point value must start at the very first character; leading
//! whitespace is not tolerated.

use crate::registry::NameRegistry;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static POINT_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-][0-9]+(?:\.[0-9]+)?").expect("point value pattern is valid")
});

// 2^63; the first f64 above i64::MAX
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Successfully parsed submission line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    pub delta: i64,
    /// Canonical registry name
    pub subject: String,
    pub note: String,
}

/// Reasons a line is not ingestible
///
/// Format errors and validation errors (range, unknown name) are reported
/// through the same type; callers treat every variant as "skip this line".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    #[error("submission is empty")]
    Empty,

    #[error("submission does not start with a signed point value")]
    MissingPointValue,

    #[error("point value {0} is outside the 64-bit integer range")]
    OutOfRange(String),

    #[error("submission has no name after the point value")]
    MissingName,

    #[error("submission has no comment after the name")]
    MissingComment,

    #[error("'{0}' is not a recognized name")]
    UnknownName(String),
}

/// Parse one submission line against `registry`
pub fn parse(line: &str, registry: &NameRegistry) -> Result<ParsedLine, ParseFailure> {
    if line.trim().is_empty() {
        return Err(ParseFailure::Empty);
    }

    let token = POINT_VALUE
        .find(line)
        .ok_or(ParseFailure::MissingPointValue)?
        .as_str();
    let delta = round_point_value(token)?;

    let remainder = line[token.len()..].trim();
    if remainder.is_empty() {
        return Err(ParseFailure::MissingName);
    }
    let (mut raw_name, mut note) = split_name(remainder)?;

    if raw_name.eq_ignore_ascii_case("to") {
        (raw_name, note) = split_name(note)?;
    }

    let subject = registry
        .validate(raw_name)
        .ok_or_else(|| ParseFailure::UnknownName(raw_name.to_string()))?;

    Ok(ParsedLine {
        delta,
        subject,
        note: note.to_string(),
    })
}

/// Round a matched `[+-]digits(.digits)?` token to an `i64`
fn round_point_value(token: &str) -> Result<i64, ParseFailure> {
    let value: f64 = token
        .parse()
        .map_err(|_| ParseFailure::MissingPointValue)?;
    // f64::round rounds half away from zero
    let rounded = value.round();
    if !rounded.is_finite() || rounded < -I64_BOUND || rounded >= I64_BOUND {
        return Err(ParseFailure::OutOfRange(token.to_string()));
    }
    Ok(rounded as i64)
}

/// Split trimmed text at the first whitespace into `(name, comment)`
fn split_name(text: &str) -> Result<(&str, &str), ParseFailure> {
    match text.split_once(char::is_whitespace) {
        Some((name, rest)) => {
            let rest = rest.trim();
            if rest.is_empty() {
                Err(ParseFailure::MissingComment)
            } else {
                Ok((name, rest))
            }
        }
        None => Err(ParseFailure::MissingComment),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> NameRegistry {
        NameRegistry::new(
            ["Eli", "Matthew"],
            [("Matt".to_string(), "Matthew".to_string())],
        )
        .unwrap()
    }

    fn ok(line: &str) -> ParsedLine {
        parse(line, &registry()).unwrap()
    }

    fn fail(line: &str) -> ParseFailure {
        parse(line, &registry()).unwrap_err()
    }

    #[test]
    fn test_positive_and_negative() {
        assert_eq!(
            ok("+10 Eli Great job at recruitment"),
            ParsedLine {
                delta: 10,
                subject: "Eli".to_string(),
                note: "Great job at recruitment".to_string(),
            }
        );
        let neg = ok("-5 matt Being late");
        assert_eq!(neg.delta, -5);
        assert_eq!(neg.subject, "Matthew");
        assert_eq!(neg.note, "Being late");
    }

    #[test]
    fn test_required_failures() {
        assert_eq!(fail("+10"), ParseFailure::MissingName);
        assert_eq!(fail("+10 Eli"), ParseFailure::MissingComment);
        assert_eq!(fail(""), ParseFailure::Empty);
        assert_eq!(fail("   "), ParseFailure::Empty);
        assert_eq!(fail("Eli some comment"), ParseFailure::MissingPointValue);
    }

    #[test]
    fn test_leading_whitespace_not_tolerated() {
        assert_eq!(fail(" +10 Eli Great"), ParseFailure::MissingPointValue);
    }

    #[test]
    fn test_sign_required() {
        assert_eq!(fail("10 Eli Great"), ParseFailure::MissingPointValue);
    }

    #[test]
    fn test_fractional_rounding() {
        assert_eq!(ok("+10.7 Eli Good work").delta, 11);
        assert_eq!(ok("+10.3 Eli Good work").delta, 10);
        assert_eq!(ok("+2.5 Eli Half").delta, 3);
        assert_eq!(ok("-2.5 Eli Half").delta, -3);
        assert_eq!(ok("+0.4 Eli Tiny").delta, 0);
    }

    #[test]
    fn test_out_of_range() {
        assert!(matches!(
            fail("+9223372036854775808 Eli Too much"),
            ParseFailure::OutOfRange(_)
        ));
        assert!(matches!(
            fail("+99999999999999999999999 Eli Too much"),
            ParseFailure::OutOfRange(_)
        ));
        assert_eq!(ok("-9223372036854775808 Eli Floor").delta, i64::MIN);
    }

    #[test]
    fn test_to_prefix() {
        let parsed = ok("+10 to Eli for great work");
        assert_eq!(parsed.delta, 10);
        assert_eq!(parsed.subject, "Eli");
        assert_eq!(parsed.note, "for great work");

        assert_eq!(ok("+1 TO Eli thanks").subject, "Eli");
        assert_eq!(fail("+10 to Eli"), ParseFailure::MissingComment);
        assert_eq!(fail("+10 to"), ParseFailure::MissingComment);
    }

    #[test]
    fn test_unknown_name_not_recovered_from_comment() {
        assert_eq!(
            fail("+10 Bob gave points to Eli"),
            ParseFailure::UnknownName("Bob".to_string())
        );
    }

    #[test]
    fn test_comment_whitespace_trimmed() {
        let parsed = ok("+3 Eli \t  spaced   out  ");
        assert_eq!(parsed.note, "spaced   out");
    }

    #[test]
    fn test_value_glued_to_name() {
        let parsed = ok("+4Eli glued");
        assert_eq!(parsed.delta, 4);
        assert_eq!(parsed.subject, "Eli");
    }

    #[test]
    fn test_subject_keeps_configured_spelling() {
        let registry = NameRegistry::new(["McDonald", "Eli"], Vec::new()).unwrap();
        let parsed = parse("+1 mcdonald hi", &registry).unwrap();
        assert_eq!(parsed.subject, "McDonald");
        assert!(registry.is_valid(&parsed.subject));
    }

    #[test]
    fn test_trailing_dot_is_not_fraction() {
        // "+5." matches only "+5"; "." becomes the name token
        assert_eq!(
            fail("+5. Eli x"),
            ParseFailure::UnknownName(".".to_string())
        );
    }
}
