//! Shell-style wildcard patterns over component identifiers.
//!
//! Patterns are translated to anchored regexes rather than resolved against
//! the file system: components are identifiers, not necessarily real paths.
//! `*` matches any run of characters (including `/`), `?` matches one
//! character, and `[...]` / `[!...]` are character classes. Matching is
//! case-sensitive and must cover the whole identifier.

use regex::Regex;

#[derive(Debug, Clone)]
pub struct GlobPattern {
    pattern: String,
    regex: Regex,
}

impl GlobPattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&translate(pattern))?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    pub fn is_match(&self, component: &str) -> bool {
        self.regex.is_match(component)
    }
}

/// Translate a glob into an anchored regex source string.
pub fn translate(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::from("^(?s:");
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        i += 1;
        match c {
            '*' => {
                while i < chars.len() && chars[i] == '*' {
                    i += 1;
                }
                out.push_str(".*");
            }
            '?' => out.push('.'),
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    out.push_str(&translate_class(&chars[i..end]));
                    i = end + 1;
                }
                // Unterminated class: the bracket is literal
                None => out.push_str(r"\["),
            },
            other => out.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    out.push_str(")$");
    out
}

/// Index of the `]` closing a class that opens just before `start`.
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut j = start;
    if j < chars.len() && chars[j] == '!' {
        j += 1;
    }
    // A leading `]` is a member, not the terminator
    if j < chars.len() && chars[j] == ']' {
        j += 1;
    }
    while j < chars.len() && chars[j] != ']' {
        j += 1;
    }
    (j < chars.len()).then_some(j)
}

fn translate_class(members: &[char]) -> String {
    let (negated, members) = match members.split_first() {
        Some((&'!', rest)) => (true, rest),
        _ => (false, members),
    };

    let mut body = String::new();
    let mut i = 0;
    while i < members.len() {
        let c = members[i];
        if i + 2 < members.len() && members[i + 1] == '-' {
            let hi = members[i + 2];
            // Reversed ranges match nothing
            if c <= hi {
                push_class_char(&mut body, c);
                body.push('-');
                push_class_char(&mut body, hi);
            }
            i += 3;
        } else {
            push_class_char(&mut body, c);
            i += 1;
        }
    }

    match (body.is_empty(), negated) {
        // Never matches: a boundary and a non-boundary at one position
        (true, false) => r"(?:\b\B)".to_string(),
        (true, true) => ".".to_string(),
        (false, false) => format!("[{body}]"),
        (false, true) => format!("[^{body}]"),
    }
}

fn push_class_char(out: &mut String, c: char) {
    if matches!(c, '\\' | '[' | ']' | '&' | '~' | '^' | '-') {
        out.push('\\');
    }
    out.push(c);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, component: &str) -> bool {
        GlobPattern::new(pattern).unwrap().is_match(component)
    }

    #[test]
    fn star_spans_directories() {
        assert!(matches("a/*", "a/x.py"));
        assert!(matches("a/*", "a/deep/y.py"));
        assert!(matches("src/**/*.py", "src/auth/session.py"));
        assert!(!matches("a/*", "b/z.py"));
    }

    #[test]
    fn match_is_full_string_and_case_sensitive() {
        assert!(!matches("auth", "src/auth/login.py"));
        assert!(!matches("src/*.py", "src/a.pyc"));
        assert!(!matches("SRC/*", "src/a.py"));
    }

    #[test]
    fn question_mark_and_classes() {
        assert!(matches("v?.py", "v1.py"));
        assert!(!matches("v?.py", "v10.py"));
        assert!(matches("[ab].py", "a.py"));
        assert!(!matches("[!ab].py", "a.py"));
        assert!(matches("[!ab].py", "c.py"));
        assert!(matches("[]].py", "].py"));
        assert!(matches("[0-9].py", "7.py"));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        assert!(matches("a+b(c).py", "a+b(c).py"));
        assert!(!matches("a.py", "axpy"));
        assert!(matches("[abc", "[abc"));
        assert!(matches("[&~]", "&"));
        assert!(matches("[a-]", "-"));
    }

    #[test]
    fn reversed_ranges_match_nothing() {
        assert!(!matches("[z-a]", "m"));
        assert!(matches("[!z-a]", "m"));
        assert!(matches("[z-ab]", "b"));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn literal_patterns_match_only_themselves(s in "[a-zA-Z0-9_./+()-]{1,20}") {
            let glob = GlobPattern::new(&s).unwrap();
            prop_assert!(glob.is_match(&s));
            let extended = format!("{s}x");
            prop_assert!(!glob.is_match(&extended));
        }

        #[test]
        fn any_pattern_translates_to_a_valid_regex(s in "\\PC{0,24}") {
            prop_assert!(GlobPattern::new(&s).is_ok());
        }
    }
}
