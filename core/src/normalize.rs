//! Canonicalization of interpreter output before comparison.
//!
//! Reference and submitted outputs may differ in incidental whitespace and in
//! how many trailing zeros a decimal is printed with. [`normalize`] maps both
//! sides onto one canonical line so that only differences in values or in
//! error class survive.

use std::fmt;

use lazy_regex::{lazy_regex, Lazy, Regex};
use serde::Serialize;

static RE_SYNTAX_ERROR_LINE: Lazy<Regex> = lazy_regex!(r"(?mi)^Syntax error.*$");
static RE_EVAL_ERROR_LINE: Lazy<Regex> = lazy_regex!(r"(?mi)^Evaluation error.*$");
static RE_WHITESPACE_RUN: Lazy<Regex> = lazy_regex!(r"\s+");
static RE_OPEN_PAREN_SPACE: Lazy<Regex> = lazy_regex!(r"\(\s+");
static RE_SPACE_CLOSE_PAREN: Lazy<Regex> = lazy_regex!(r"\s+\)");

// Only whole numeric tokens are rewritten. A number starts at the beginning of
// the text, after whitespace or after `(`, and ends at whitespace, `)` or the
// end of the text.
static RE_ZERO_FRACTION: Lazy<Regex> =
    lazy_regex!(r"(^|[\s(])([-+]?\d+)\.0+(\s|\)|$)");
static RE_FRACTION_ZEROS_BEFORE_DELIM: Lazy<Regex> =
    lazy_regex!(r"(^|[\s(])([-+]?\d+)\.(\d*[1-9])0+([\s)])");
static RE_FRACTION_ZEROS_AT_END: Lazy<Regex> =
    lazy_regex!(r"(^|[\s(])([-+]?\d+)\.(\d*[1-9])0+$");

pub const SYNTAX_ERROR: &str = "Syntax error";
pub const EVALUATION_ERROR: &str = "Evaluation error";

/// Normalize interpreter output.
///
/// The rewrite pass is applied until the text no longer changes, so
/// `normalize(&normalize(t)) == normalize(t)` for every `t`. A pass never makes
/// the text longer, which bounds the number of iterations.
///
/// ```
/// use grader_core::normalize::normalize;
///
/// assert_eq!(normalize("( 1.500\n  2.000 )\n"), "(1.5 2)");
/// assert_eq!(normalize("Syntax error: unexpected ')'"), "Syntax error");
/// ```
pub fn normalize(text: &str) -> String {
    let mut cur = normalize_once(text);
    loop {
        let next = normalize_once(&cur);
        if next == cur {
            return cur;
        }
        cur = next;
    }
}

fn normalize_once(text: &str) -> String {
    let s = RE_SYNTAX_ERROR_LINE.replace_all(text, SYNTAX_ERROR);
    let s = RE_EVAL_ERROR_LINE.replace_all(&s, EVALUATION_ERROR);
    let s = RE_WHITESPACE_RUN.replace_all(&s, " ");
    let s = RE_OPEN_PAREN_SPACE.replace_all(&s, "(");
    let s = RE_SPACE_CLOSE_PAREN.replace_all(&s, ")");
    let s = RE_ZERO_FRACTION.replace_all(&s, "${1}${2}${3}");
    let s = RE_FRACTION_ZEROS_BEFORE_DELIM.replace_all(&s, "${1}${2}.${3}${4}");
    let s = RE_FRACTION_ZEROS_AT_END.replace_all(&s, "${1}${2}.${3}");
    s.trim().to_owned()
}

/// Output that has been through [`normalize`]. Equality decides pass/fail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(normalize(raw.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn collapses_whitespace_into_single_line() {
        assert_eq!(normalize("1\n2\n\n  3\t4\r\n"), "1 2 3 4");
        assert_eq!(normalize("   \n\t "), "");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn strips_spaces_inside_parens() {
        assert_eq!(normalize("( a b )"), normalize("(a b)"));
        assert_eq!(normalize("(\n  (1 2)\n  3\n)"), "((1 2) 3)");
        assert_eq!(normalize("( )"), "()");
    }

    #[test]
    fn canonicalizes_decimals() {
        assert_eq!(normalize("1.0000"), "1");
        assert_eq!(normalize("1"), "1");
        assert_eq!(normalize("1.32000"), "1.32");
        assert_eq!(normalize("1.32000 more"), "1.32 more");
        assert_eq!(normalize("1.302000"), "1.302");
        assert_eq!(normalize("0.0500\n"), "0.05");
        assert_eq!(normalize("1.00\n"), "1");
        assert_eq!(normalize("(1.500 2.000)"), "(1.5 2)");
        assert_eq!(normalize("2.0 3.10 4.25"), "2 3.1 4.25");
    }

    #[test]
    fn rewrites_only_numeric_tokens() {
        assert_eq!(normalize("v1.00 x"), "v1.00 x");
        assert_eq!(normalize("file.000"), "file.000");
        assert_eq!(normalize("(a.50 b)"), "(a.50 b)");
        assert_eq!(normalize("-2.50 +3.0"), "-2.5 +3");
        assert_eq!(normalize("(1.0 2.0 3.0)"), "(1 2 3)");
    }

    #[test]
    fn keeps_significant_digits() {
        assert_eq!(normalize("1.5"), "1.5");
        assert_eq!(normalize("100"), "100");
        assert_eq!(normalize("10.01"), "10.01");
        assert_ne!(normalize("1.5"), normalize("1.05"));
        assert_ne!(normalize("10"), normalize("1"));
    }

    #[test]
    fn collapses_error_lines_by_class() {
        let a = normalize("Syntax error: unexpected token at line 4");
        let b = normalize("Syntax error near foo");
        assert_eq!(a, "Syntax error");
        assert_eq!(a, b);

        assert_eq!(normalize("syntax ERROR: whatever"), "Syntax error");
        assert_eq!(
            normalize("3\nEvaluation error: car of non-pair\n"),
            "3 Evaluation error"
        );
        assert_ne!(normalize("Syntax error: x"), normalize("Evaluation error: x"));
    }

    #[test]
    fn leaves_mid_line_error_phrases_alone() {
        assert_eq!(
            normalize("no Syntax error here"),
            "no Syntax error here"
        );
    }

    #[test]
    fn is_idempotent() {
        let samples = [
            "",
            "Syntax error\n(1 2)",
            "Evaluation error: bad\n 4.000 ",
            "1.0.000",
            "( 1.500 2.000 )\n",
            "1.00\n",
            "#<procedure>\n( a\t. b )",
            "x 0.10 y\n\n",
            "  (   )  ",
            "3\nSyntax error: x\n5.50",
        ];
        for t in samples {
            let once = normalize(t);
            assert_eq!(normalize(&once), once, "input: {:?}", t);
        }
    }

    #[test]
    fn whitespace_insertion_is_ignored() {
        let base = "(define x 1.5) (x y) 2";
        let spaced = "( define   x\n1.5 )\n\n(\tx y )   2 \n";
        assert_eq!(normalize(base), normalize(spaced));
    }

    #[test]
    fn normalized_text_compares_by_canonical_form() {
        assert_eq!(NormalizedText::new("(1.500 2.000)"), NormalizedText::new("(1.5 2)\n"));
        assert!(NormalizedText::new(" \n ").is_empty());
        assert_eq!(NormalizedText::new("1.0").to_string(), "1");
    }
}
