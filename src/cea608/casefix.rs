//! Optional word-list case correction, applied after [`super::decoder::sentence_case`].
//!
//! Grounded on `original_source/src/608_helpers.c`'s `correct_case`: tokens
//! are split on the same punctuation/whitespace delimiter set used there,
//! and each lowercased token is looked up in a corrections table built
//! from the user-supplied `sentence_cap_file`. The original keeps that
//! table as two parallel arrays (`spell_lower`/`spell_correct`) searched
//! with `bsearch`; a `HashMap` is the idiomatic equivalent, and the
//! loader for the on-disk file wasn't part of the retrieved source, so
//! its format here (one `wrong correct` pair per line, `#`-prefixed
//! comments, blank lines ignored) is a documented choice rather than a
//! port.

use std::collections::HashMap;

use crate::error::{CcxError, Result};

fn is_delim(c: char) -> bool {
    matches!(
        c,
        ' ' | '\n'
            | '\r'
            | '\t'
            | '!'
            | '"'
            | '#'
            | '%'
            | '&'
            | '\''
            | '('
            | ')'
            | ';'
            | '<'
            | '='
            | '>'
            | '?'
            | '['
            | '\\'
            | ']'
            | '*'
            | '+'
            | ','
            | '-'
            | '.'
            | '/'
            | ':'
            | '^'
            | '_'
            | '{'
            | '|'
            | '}'
            | '~'
    )
}

/// Loads a case-correction table from disk. Each non-empty, non-comment
/// line is `wrong correct`, whitespace-separated; `wrong` is folded to
/// lowercase for lookup.
pub fn load_corrections(path: &str) -> Result<HashMap<String, String>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CcxError::Configuration(format!("capitalization file {path}: {e}")))?;
    let mut map = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((wrong, right)) = line.split_once(char::is_whitespace) else {
            return Err(CcxError::Configuration(format!(
                "capitalization file {path}: malformed line {line:?}"
            )));
        };
        map.insert(wrong.trim().to_lowercase(), right.trim().to_string());
    }
    Ok(map)
}

/// Replaces whole words whose lowercased form is in `corrections`,
/// leaving delimiters (and unmatched words) untouched.
pub fn correct_case(line: &str, corrections: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(line.len());
    let mut word = String::new();
    for ch in line.chars() {
        if is_delim(ch) {
            flush_word(&mut word, &mut out, corrections);
            out.push(ch);
        } else {
            word.push(ch);
        }
    }
    flush_word(&mut word, &mut out, corrections);
    out
}

fn flush_word(word: &mut String, out: &mut String, corrections: &HashMap<String, String>) {
    if word.is_empty() {
        return;
    }
    match corrections.get(&word.to_lowercase()) {
        Some(fixed) => out.push_str(fixed),
        None => out.push_str(word),
    }
    word.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_matching_word_preserving_delimiters() {
        let mut corrections = HashMap::new();
        corrections.insert("nasa".to_string(), "NASA".to_string());
        assert_eq!(correct_case("the nasa launch", &corrections), "the NASA launch");
    }

    #[test]
    fn leaves_unmatched_words_untouched() {
        let corrections = HashMap::new();
        assert_eq!(correct_case("Hello, world!", &corrections), "Hello, world!");
    }

    #[test]
    fn load_corrections_skips_comments_and_blank_lines() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("ccx_core_casefix_test_{}.txt", std::process::id()));
        std::fs::write(&path, "# comment\n\nnasa NASA\nesa ESA\n").unwrap();
        let map = load_corrections(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(map.get("nasa"), Some(&"NASA".to_string()));
        assert_eq!(map.get("esa"), Some(&"ESA".to_string()));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn load_corrections_missing_file_is_a_configuration_error() {
        let err = load_corrections("/nonexistent/path/to/corrections.txt").unwrap_err();
        assert!(matches!(err, CcxError::Configuration(_)));
    }
}
