//! Single-segment wildcard string matching.
//!
//! `*` matches any run of characters (including none), `?` matches exactly one
//! character, and the match is anchored to the whole candidate. Patterns are
//! compiled once into a [`WildcardMatcher`].
//!
//! Matching converges from both ends: the piece before the first `*` is
//! anchored at the start of the candidate, the piece after the last `*` is
//! anchored at its end, and only the pieces in between are searched for. A
//! long literal prefix and suffix around a single `*` therefore costs two
//! comparisons and never backtracks.

use std::fmt;

const ONE: char = '?';

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    One,
}

/// A run of tokens between two stars.
type Piece = Vec<Token>;

#[derive(Debug, Clone)]
enum Strategy {
    /// The pattern is a lone star.
    Any,
    /// No wildcard characters: plain equality.
    Exact(String),
    /// No star: a single piece that must cover the whole candidate.
    Anchored(Piece),
    /// At least one star. `head` is anchored at the start, `tail` at the end.
    Starred {
        head: Piece,
        middle: Vec<Piece>,
        tail: Piece,
    },
}

/// A compiled single-segment wildcard pattern.
///
/// # Examples
///
/// ```
/// use kyrostate::WildcardMatcher;
///
/// let m = WildcardMatcher::compile("user-*");
/// assert!(m.is_match("user-42"));
/// assert!(!m.is_match("admin-1"));
/// ```
#[derive(Debug, Clone)]
pub struct WildcardMatcher {
    pattern: String,
    strategy: Strategy,
    min_len: usize,
    max_len: usize,
}

impl WildcardMatcher {
    /// Compiles a pattern using `*` as the star character.
    #[must_use]
    pub fn compile(pattern: &str) -> Self {
        Self::compile_with(pattern, '*')
    }

    /// Compiles a pattern with a custom star character. `?` always matches one character.
    #[must_use]
    pub fn compile_with(pattern: &str, star: char) -> Self {
        let owned = pattern.to_string();
        let single_star = {
            let mut chars = pattern.chars();
            chars.next() == Some(star) && chars.next().is_none()
        };
        if single_star {
            return Self {
                pattern: owned,
                strategy: Strategy::Any,
                min_len: 0,
                max_len: usize::MAX,
            };
        }
        if !pattern.contains(star) && !pattern.contains(ONE) {
            return Self {
                min_len: pattern.len(),
                max_len: pattern.len(),
                pattern: owned,
                strategy: Strategy::Exact(pattern.to_string()),
            };
        }

        let mut pieces: Vec<Piece> = pattern.split(star).map(tokenize).collect();
        let mut literal_bytes = 0usize;
        let mut ones = 0usize;
        for token in pieces.iter().flatten() {
            match token {
                Token::Literal(lit) => literal_bytes += lit.len(),
                Token::One => ones += 1,
            }
        }
        let min_len = literal_bytes + ones;

        // `split` yields exactly one piece when the star never occurs.
        let strategy = if pieces.len() == 1 {
            Strategy::Anchored(pieces.pop().unwrap_or_default())
        } else {
            let tail = pieces.pop().unwrap_or_default();
            let head = pieces.remove(0);
            pieces.retain(|piece| !piece.is_empty());
            Strategy::Starred {
                head,
                middle: pieces,
                tail,
            }
        };
        let max_len = match strategy {
            Strategy::Starred { .. } => usize::MAX,
            // A single character is at most four bytes of UTF-8.
            _ => literal_bytes + ones * 4,
        };

        Self {
            pattern: owned,
            strategy,
            min_len,
            max_len,
        }
    }

    /// The source pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns true if the pattern contains no wildcard characters.
    #[must_use]
    pub const fn is_literal(&self) -> bool {
        matches!(self.strategy, Strategy::Exact(_))
    }

    /// Tests a candidate string against the pattern.
    #[must_use]
    pub fn is_match(&self, candidate: &str) -> bool {
        match &self.strategy {
            Strategy::Any => true,
            Strategy::Exact(literal) => literal == candidate,
            Strategy::Anchored(piece) => {
                if !self.length_in_range(candidate) {
                    return false;
                }
                match_forward(piece, candidate, 0) == Some(candidate.len())
            }
            Strategy::Starred { head, middle, tail } => {
                if !self.length_in_range(candidate) {
                    return false;
                }
                let Some(mut left) = match_forward(head, candidate, 0) else {
                    return false;
                };
                let Some(right) = match_backward(tail, candidate, candidate.len(), left) else {
                    return false;
                };
                for piece in middle {
                    match find_piece(piece, candidate, left, right) {
                        Some(end) => left = end,
                        None => return false,
                    }
                }
                true
            }
        }
    }

    fn length_in_range(&self, candidate: &str) -> bool {
        let len = candidate.len();
        len >= self.min_len && len <= self.max_len
    }
}

impl fmt::Display for WildcardMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

/// Convenience: compile `pattern` and test `candidate` once.
#[must_use]
pub fn wildcard_match(pattern: &str, candidate: &str) -> bool {
    pattern == candidate || WildcardMatcher::compile(pattern).is_match(candidate)
}

fn tokenize(piece: &str) -> Piece {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    for c in piece.chars() {
        if c == ONE {
            if !literal.is_empty() {
                tokens.push(Token::Literal(std::mem::take(&mut literal)));
            }
            tokens.push(Token::One);
        } else {
            literal.push(c);
        }
    }
    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    tokens
}

/// Matches `piece` starting at byte `pos`; returns the end position.
fn match_forward(piece: &[Token], s: &str, mut pos: usize) -> Option<usize> {
    for token in piece {
        let rest = s.get(pos..)?;
        match token {
            Token::Literal(lit) => {
                if !rest.starts_with(lit.as_str()) {
                    return None;
                }
                pos += lit.len();
            }
            Token::One => pos += rest.chars().next()?.len_utf8(),
        }
    }
    Some(pos)
}

/// Matches `piece` so that it ends at byte `end` and starts no earlier than
/// `floor`; returns the start position.
fn match_backward(piece: &[Token], s: &str, mut end: usize, floor: usize) -> Option<usize> {
    for token in piece.iter().rev() {
        let region = s.get(floor..end)?;
        match token {
            Token::Literal(lit) => {
                if !region.ends_with(lit.as_str()) {
                    return None;
                }
                end -= lit.len();
            }
            Token::One => end -= region.chars().next_back()?.len_utf8(),
        }
    }
    Some(end)
}

/// Finds the leftmost occurrence of `piece` inside `s[left..right]`; returns
/// the end position of that occurrence.
fn find_piece(piece: &[Token], s: &str, left: usize, right: usize) -> Option<usize> {
    let window = s.get(left..right)?;
    if let [Token::Literal(lit)] = piece {
        return window.find(lit.as_str()).map(|i| left + i + lit.len());
    }
    window
        .char_indices()
        .map(|(i, _)| left + i)
        .find_map(|start| match_forward(piece, s, start).filter(|&end| end <= right))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lone_star_matches_everything() {
        let m = WildcardMatcher::compile("*");
        assert!(m.is_match(""));
        assert!(m.is_match("anything.at.all"));
    }

    #[test]
    fn test_literal_is_equality() {
        let m = WildcardMatcher::compile("users");
        assert!(m.is_literal());
        assert!(m.is_match("users"));
        assert!(!m.is_match("user"));
        assert!(!m.is_match("users2"));
    }

    #[test]
    fn test_question_mark_matches_one_char() {
        let m = WildcardMatcher::compile("a?c");
        assert!(m.is_match("abc"));
        assert!(m.is_match("aéc"));
        assert!(!m.is_match("ac"));
        assert!(!m.is_match("abbc"));
    }

    #[test]
    fn test_prefix_and_suffix_anchors() {
        let m = WildcardMatcher::compile("tw*");
        assert!(m.is_match("two"));
        assert!(m.is_match("tw"));
        assert!(!m.is_match("atwo"));

        let m = WildcardMatcher::compile("*st");
        assert!(m.is_match("test"));
        assert!(!m.is_match("tests"));

        let m = WildcardMatcher::compile("t*st");
        assert!(m.is_match("test"));
        assert!(m.is_match("tst"));
        assert!(!m.is_match("ts"));
    }

    #[test]
    fn test_head_and_tail_do_not_overlap() {
        let m = WildcardMatcher::compile("ab*ba");
        assert!(m.is_match("abba"));
        assert!(!m.is_match("aba"));
    }

    #[test]
    fn test_middle_pieces_in_order() {
        let m = WildcardMatcher::compile("*a*b*");
        assert!(m.is_match("xaxbx"));
        assert!(m.is_match("ab"));
        assert!(!m.is_match("ba"));
    }

    #[test]
    fn test_middle_piece_with_question_mark() {
        let m = WildcardMatcher::compile("*a?b*");
        assert!(m.is_match("xa1b2b"));
        assert!(!m.is_match("xab"));
    }

    #[test]
    fn test_long_literal_runs_around_star() {
        let prefix = "p".repeat(512);
        let suffix = "s".repeat(512);
        let m = WildcardMatcher::compile(&format!("{prefix}*{suffix}"));
        assert!(m.is_match(&format!("{prefix}middle{suffix}")));
        assert!(!m.is_match(&format!("{prefix}middle{suffix}x")));
    }

    #[test]
    fn test_custom_star() {
        let m = WildcardMatcher::compile_with("a%c", '%');
        assert!(m.is_match("abbbc"));
        assert!(!m.is_match("a*"));
    }

    #[test]
    fn test_wildcard_match_helper() {
        assert!(wildcard_match("x*", "xyz"));
        assert!(!wildcard_match("x?", "xyz"));
    }
}
