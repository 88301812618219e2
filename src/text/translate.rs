//! Translation of XPath/XML-Schema regular expressions and of glob
//! wildcard patterns into the syntax of the `regex` crate.
//!
//! Pure string-to-string mapping; nothing here compiles or matches. The
//! caller hands the output to [`regex::Regex::new`].

use crate::error::RegexSyntaxError;

/// XML NameStartChar as a regex character-class body.
const NAME_START: &str = "_:A-Za-z\\u{C0}-\\u{D6}\\u{D8}-\\u{F6}\\u{F8}-\\u{2FF}\
\\u{370}-\\u{37D}\\u{37F}-\\u{1FFF}\\u{200C}-\\u{200D}\\u{2070}-\\u{218F}\
\\u{2C00}-\\u{2FEF}\\u{3001}-\\u{D7FF}\\u{F900}-\\u{FDCF}\\u{FDF0}-\\u{FFFD}";

/// Additional characters allowed in XML NameChar.
const NAME_EXTRA: &str = "\\-.0-9\\u{B7}\\u{300}-\\u{36F}\\u{203F}-\\u{2040}";

/// Translates an XPath (or, with `xpath_syntax == false`, plain XML
/// Schema) regular expression into `regex` crate syntax.
///
/// Maps character-class subtraction `[a-[b]]` to `[a&&[^b]]`, expands the
/// XML name escapes `\i \I \c \C`, and in XPath mode makes `.` exclude
/// line terminators. Constructs the target engine cannot express, back
/// references above all, are rejected with the offending construct and
/// its byte position.
pub fn translate(pattern: &str, xpath_syntax: bool) -> Result<String, RegexSyntaxError> {
    let chars: Vec<(usize, char)> = pattern.char_indices().collect();
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut i = 0;
    while i < chars.len() {
        let (pos, c) = chars[i];
        match c {
            '\\' => {
                i = translate_escape(&chars, i, &mut out, false)?;
            }
            '[' => {
                i = translate_class(&chars, i, &mut out, true)?;
            }
            '.' => {
                if xpath_syntax {
                    out.push_str("[^\\r\\n]");
                } else {
                    out.push('.');
                }
                i += 1;
            }
            '(' => {
                // no look-around or flag groups in the source syntax
                if chars.get(i + 1).map(|&(_, c)| c) == Some('?')
                    && chars.get(i + 2).map(|&(_, c)| c) != Some(':')
                {
                    return Err(RegexSyntaxError::new("(?", pos));
                }
                out.push('(');
                i += 1;
            }
            '{' => {
                // counted repetition passes through; a stray brace is a
                // literal in the source syntax
                let mut j = i + 1;
                while chars
                    .get(j)
                    .is_some_and(|&(_, c)| c.is_ascii_digit() || c == ',')
                {
                    j += 1;
                }
                let counted = j > i + 1
                    && chars[i + 1].1.is_ascii_digit()
                    && chars.get(j).map(|&(_, c)| c) == Some('}');
                if counted {
                    for &(_, c) in &chars[i..=j] {
                        out.push(c);
                    }
                    i = j + 1;
                } else {
                    out.push_str("\\{");
                    i += 1;
                }
            }
            ']' | '}' => {
                // unmatched closers are literals in the source syntax
                out.push('\\');
                out.push(c);
                i += 1;
            }
            '~' | '&' | '#' => {
                out.push('\\');
                out.push(c);
                i += 1;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    Ok(out)
}

/// Handles a `\` escape starting at `chars[i]`; returns the index after
/// the escape. `in_class` restricts which escapes are legal.
fn translate_escape(
    chars: &[(usize, char)],
    i: usize,
    out: &mut String,
    in_class: bool,
) -> Result<usize, RegexSyntaxError> {
    let (pos, _) = chars[i];
    let Some(&(_, esc)) = chars.get(i + 1) else {
        return Err(RegexSyntaxError::new("\\", pos));
    };
    match esc {
        'n' | 'r' | 't' | 'd' | 'D' | 's' | 'S' | 'w' | 'W' => {
            out.push('\\');
            out.push(esc);
            Ok(i + 2)
        }
        'p' | 'P' => {
            // copy \p{...} verbatim; the property names coincide
            let Some(&(_, '{')) = chars.get(i + 2) else {
                return Err(RegexSyntaxError::new(format!("\\{esc}"), pos));
            };
            out.push('\\');
            out.push(esc);
            out.push('{');
            let mut j = i + 3;
            loop {
                match chars.get(j) {
                    Some(&(_, '}')) => {
                        out.push('}');
                        return Ok(j + 1);
                    }
                    Some(&(_, c)) => {
                        out.push(c);
                        j += 1;
                    }
                    None => return Err(RegexSyntaxError::new(format!("\\{esc}{{"), pos)),
                }
            }
        }
        'i' | 'I' | 'c' | 'C' if !in_class => {
            out.push('[');
            if esc == 'I' || esc == 'C' {
                out.push('^');
            }
            out.push_str(NAME_START);
            if esc == 'c' || esc == 'C' {
                out.push_str(NAME_EXTRA);
            }
            out.push(']');
            Ok(i + 2)
        }
        '1'..='9' => Err(RegexSyntaxError::new(format!("\\{esc}"), pos)),
        c if c.is_ascii_punctuation() => {
            out.push('\\');
            out.push(c);
            Ok(i + 2)
        }
        c => Err(RegexSyntaxError::new(format!("\\{c}"), pos)),
    }
}

/// Translates a character class starting at the `[` at `chars[i]`;
/// returns the index after the closing `]`. `allow_subtraction` is off
/// while parsing a subtrahend, one level is all the target syntax can
/// negate cleanly.
fn translate_class(
    chars: &[(usize, char)],
    i: usize,
    out: &mut String,
    allow_subtraction: bool,
) -> Result<usize, RegexSyntaxError> {
    let (start_pos, _) = chars[i];
    out.push('[');
    let mut j = i + 1;
    if let Some(&(_, '^')) = chars.get(j) {
        out.push('^');
        j += 1;
    }
    loop {
        match chars.get(j) {
            None => return Err(RegexSyntaxError::new("[", start_pos)),
            Some(&(_, ']')) => {
                out.push(']');
                return Ok(j + 1);
            }
            Some(&(pos, '\\')) => {
                // name escapes cannot be spliced into a class body
                if let Some(&(_, e @ ('i' | 'I' | 'c' | 'C'))) = chars.get(j + 1) {
                    return Err(RegexSyntaxError::new(format!("\\{e}"), pos));
                }
                j = translate_escape(chars, j, out, true)?;
            }
            Some(&(pos, '-')) if chars.get(j + 1).map(|&(_, c)| c) == Some('[') => {
                if !allow_subtraction {
                    return Err(RegexSyntaxError::new("-[", pos));
                }
                let mut inner = String::new();
                j = translate_class(chars, j + 1, &mut inner, false)?;
                // inner is "[body]"; subtraction is intersection with the
                // complement, so flip the inner negation
                let body = &inner[1..inner.len() - 1];
                match body.strip_prefix('^') {
                    Some(positive) => {
                        out.push_str("&&[");
                        out.push_str(positive);
                    }
                    None => {
                        out.push_str("&&[^");
                        out.push_str(body);
                    }
                }
                out.push(']');
                match chars.get(j) {
                    Some(&(_, ']')) => {
                        out.push(']');
                        return Ok(j + 1);
                    }
                    _ => return Err(RegexSyntaxError::new("-[", pos)),
                }
            }
            Some(&(_, c)) => {
                if matches!(c, '&' | '~' | '[') {
                    out.push('\\');
                }
                out.push(c);
                j += 1;
            }
        }
    }
}

/// Translates a glob wildcard pattern (`?` any char, `*` any run,
/// `[...]` classes with `!` negation) into an anchored regex for
/// whole-token matching.
pub fn glob_to_regex(glob: &str) -> Result<String, RegexSyntaxError> {
    let mut out = String::with_capacity(glob.len() + 8);
    out.push_str("^(?:");
    let chars: Vec<(usize, char)> = glob.char_indices().collect();
    let mut i = 0;
    while i < chars.len() {
        let (pos, c) = chars[i];
        match c {
            '?' => out.push('.'),
            '*' => out.push_str(".*"),
            '\\' => {
                let Some(&(_, esc)) = chars.get(i + 1) else {
                    return Err(RegexSyntaxError::new("\\", pos));
                };
                push_literal(&mut out, esc);
                i += 1;
            }
            '[' => {
                out.push('[');
                let mut j = i + 1;
                if let Some(&(_, '!')) = chars.get(j) {
                    out.push('^');
                    j += 1;
                }
                loop {
                    match chars.get(j) {
                        None => return Err(RegexSyntaxError::new("[", pos)),
                        Some(&(_, ']')) => {
                            out.push(']');
                            break;
                        }
                        Some(&(_, '\\')) => {
                            let Some(&(_, esc)) = chars.get(j + 1) else {
                                return Err(RegexSyntaxError::new("\\", pos));
                            };
                            out.push('\\');
                            out.push(esc);
                            j += 2;
                            continue;
                        }
                        Some(&(_, c)) => {
                            if matches!(c, '&' | '~' | '[' | '^') {
                                out.push('\\');
                            }
                            out.push(c);
                            j += 1;
                            continue;
                        }
                    }
                }
                i = j;
            }
            c => push_literal(&mut out, c),
        }
        i += 1;
    }
    out.push_str(")$");
    Ok(out)
}

fn push_literal(out: &mut String, c: char) {
    if c.is_ascii_punctuation() {
        out.push('\\');
    }
    out.push(c);
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    fn compiles(pattern: &str) -> Regex {
        Regex::new(pattern).unwrap()
    }

    #[test]
    fn dot_excludes_newlines_in_xpath_mode() {
        assert_eq!(translate("a.b", true).unwrap(), "a[^\\r\\n]b");
        assert_eq!(translate("a.b", false).unwrap(), "a.b");
        let re = compiles(&translate("a.b", true).unwrap());
        assert!(re.is_match("axb"));
        assert!(!re.is_match("a\nb"));
    }

    #[test]
    fn class_subtraction() {
        let t = translate("[a-z-[aeiou]]+", true).unwrap();
        assert_eq!(t, "[a-z&&[^aeiou]]+");
        let re = compiles(&format!("^{t}$"));
        assert!(re.is_match("xyz"));
        assert!(!re.is_match("xay"));
    }

    #[test]
    fn subtraction_of_negated_class() {
        // a-z minus non-vowels leaves the vowels
        let t = translate("[a-z-[^aeiou]]", true).unwrap();
        assert_eq!(t, "[a-z&&[aeiou]]");
        let re = compiles(&t);
        assert!(re.is_match("a"));
        assert!(!re.is_match("x"));
    }

    #[test]
    fn name_escapes_expand() {
        let t = translate("\\i\\c*", true).unwrap();
        let re = compiles(&format!("^(?:{t})$"));
        assert!(re.is_match("xml-name.1"));
        assert!(re.is_match("_a"));
        assert!(!re.is_match("1abc")); // digits cannot start a name
    }

    #[test]
    fn back_references_rejected_with_position() {
        let err = translate("(a)\\1", true).unwrap_err();
        assert_eq!(err.construct, "\\1");
        assert_eq!(err.position, 3);
    }

    #[test]
    fn lookahead_rejected() {
        let err = translate("a(?=b)", true).unwrap_err();
        assert_eq!(err.construct, "(?");
        assert_eq!(err.position, 1);
        // non-capturing groups pass
        assert_eq!(translate("(?:ab)+", true).unwrap(), "(?:ab)+");
    }

    #[test]
    fn unterminated_class_rejected() {
        let err = translate("[abc", true).unwrap_err();
        assert_eq!(err.construct, "[");
        assert_eq!(err.position, 0);
    }

    #[test]
    fn counted_repetition_and_literal_braces() {
        assert_eq!(translate("a{2,3}", true).unwrap(), "a{2,3}");
        assert_eq!(translate("a{b}", true).unwrap(), "a\\{b\\}");
        let re = compiles(&translate("a{2,3}", true).unwrap());
        assert!(re.is_match("aa"));
        assert!(!re.is_match("a"));
    }

    #[test]
    fn escapes_pass_through() {
        assert_eq!(translate("\\d+\\.\\d+", true).unwrap(), "\\d+\\.\\d+");
        assert_eq!(translate("\\p{Lu}\\w*", true).unwrap(), "\\p{Lu}\\w*");
    }

    #[test]
    fn glob_question_mark_and_star() {
        let re = compiles(&glob_to_regex("wo?ld").unwrap());
        assert!(re.is_match("world"));
        assert!(re.is_match("wonld"));
        assert!(!re.is_match("wild"));
        assert!(!re.is_match("worlds")); // anchored

        let re = compiles(&glob_to_regex("data*").unwrap());
        assert!(re.is_match("data"));
        assert!(re.is_match("database"));
        assert!(!re.is_match("metadata"));
    }

    #[test]
    fn glob_classes_and_escapes() {
        let re = compiles(&glob_to_regex("ca[tr]").unwrap());
        assert!(re.is_match("cat"));
        assert!(re.is_match("car"));
        assert!(!re.is_match("cab"));

        let re = compiles(&glob_to_regex("ca[!tr]").unwrap());
        assert!(re.is_match("cab"));
        assert!(!re.is_match("cat"));

        let re = compiles(&glob_to_regex("a\\*b").unwrap());
        assert!(re.is_match("a*b"));
        assert!(!re.is_match("axb"));
    }

    #[test]
    fn glob_unterminated_class_rejected() {
        let err = glob_to_regex("a[bc").unwrap_err();
        assert_eq!(err.construct, "[");
        assert_eq!(err.position, 1);
    }
}
