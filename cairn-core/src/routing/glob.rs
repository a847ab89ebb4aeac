//! Shell-style glob patterns compiled for repeated matching.
//!
//! Servlet mappings use `*` (any run, slashes included), `?` (one
//! character), `[a-z]`/`[!a-z]` character classes and one extension over
//! the shell dialect: parenthesized alternation over literal words,
//! `(index|home).php`. Patterns compile once at registration into a token
//! program; matching walks it with backtracking and no per-request
//! compilation. Matching is case-sensitive.
//!
//! Malformed constructs degrade to literals: an unclosed `[` or `(` is
//! matched as the plain character.

#[derive(Debug, Clone)]
enum Token {
    Literal(char),
    /// `*`: any run of characters, empty included.
    AnyRun,
    /// `?`: exactly one character.
    AnyOne,
    /// `[...]`: one character inside (or outside) the given ranges.
    Class { negated: bool, ranges: Vec<(char, char)> },
    /// `(a|b)`: one of the literal alternatives.
    Alternation(Vec<Vec<char>>),
}

/// A compiled glob pattern.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    tokens: Vec<Token>,
}

impl GlobPattern {
    pub fn compile(pattern: &str) -> Self {
        let chars: Vec<char> = pattern.chars().collect();
        let mut tokens = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            match chars[i] {
                '*' => {
                    // Runs of stars collapse to one wildcard.
                    if !matches!(tokens.last(), Some(Token::AnyRun)) {
                        tokens.push(Token::AnyRun);
                    }
                    i += 1;
                }
                '?' => {
                    tokens.push(Token::AnyOne);
                    i += 1;
                }
                '[' => match parse_class(&chars, i) {
                    Some((token, next)) => {
                        tokens.push(token);
                        i = next;
                    }
                    None => {
                        tokens.push(Token::Literal('['));
                        i += 1;
                    }
                },
                '(' => match parse_alternation(&chars, i) {
                    Some((token, next)) => {
                        tokens.push(token);
                        i = next;
                    }
                    None => {
                        tokens.push(Token::Literal('('));
                        i += 1;
                    }
                },
                c => {
                    tokens.push(Token::Literal(c));
                    i += 1;
                }
            }
        }
        Self {
            source: pattern.to_string(),
            tokens,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, input: &str) -> bool {
        let chars: Vec<char> = input.chars().collect();
        match_tokens(&self.tokens, &chars)
    }

    /// Literal prefix of a `prefix/*` pattern, when the prefix itself is
    /// wildcard-free. Used to split a matched path into servlet path and
    /// path info.
    pub fn path_split_prefix(&self) -> Option<&str> {
        let prefix = self.source.strip_suffix("/*")?;
        if prefix
            .chars()
            .any(|c| matches!(c, '*' | '?' | '[' | '('))
        {
            return None;
        }
        Some(prefix)
    }
}

impl std::fmt::Display for GlobPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

/// Parse `[...]` starting at `chars[start] == '['`. Returns the token and
/// the index past the closing `]`, or `None` when the class never closes.
fn parse_class(chars: &[char], start: usize) -> Option<(Token, usize)> {
    let mut i = start + 1;
    let negated = matches!(chars.get(i), Some('!') | Some('^'));
    if negated {
        i += 1;
    }
    let mut ranges = Vec::new();
    // A `]` in first position is a member, not the terminator.
    if chars.get(i) == Some(&']') {
        ranges.push((']', ']'));
        i += 1;
    }
    loop {
        let c = *chars.get(i)?;
        if c == ']' {
            return Some((Token::Class { negated, ranges }, i + 1));
        }
        if chars.get(i + 1) == Some(&'-') && chars.get(i + 2).is_some_and(|&n| n != ']') {
            let hi = *chars.get(i + 2)?;
            ranges.push((c.min(hi), c.max(hi)));
            i += 3;
        } else {
            ranges.push((c, c));
            i += 1;
        }
    }
}

/// Parse `(a|b|c)` starting at `chars[start] == '('`. Alternatives are
/// literal, nesting is not supported.
fn parse_alternation(chars: &[char], start: usize) -> Option<(Token, usize)> {
    let close = chars[start + 1..]
        .iter()
        .position(|&c| c == ')')
        .map(|offset| start + 1 + offset)?;
    let mut alternatives = Vec::new();
    let mut current = Vec::new();
    for &c in &chars[start + 1..close] {
        if c == '|' {
            alternatives.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    alternatives.push(current);
    Some((Token::Alternation(alternatives), close + 1))
}

fn match_tokens(tokens: &[Token], input: &[char]) -> bool {
    let Some((first, rest)) = tokens.split_first() else {
        return input.is_empty();
    };
    match first {
        Token::Literal(c) => input.first() == Some(c) && match_tokens(rest, &input[1..]),
        Token::AnyOne => !input.is_empty() && match_tokens(rest, &input[1..]),
        Token::AnyRun => (0..=input.len()).any(|skip| match_tokens(rest, &input[skip..])),
        Token::Class { negated, ranges } => match input.first() {
            Some(&c) => {
                let inside = ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi);
                inside != *negated && match_tokens(rest, &input[1..])
            }
            None => false,
        },
        Token::Alternation(alternatives) => alternatives.iter().any(|alt| {
            input.len() >= alt.len()
                && input[..alt.len()] == alt[..]
                && match_tokens(rest, &input[alt.len()..])
        }),
    }
}
