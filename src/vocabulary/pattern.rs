//! Case-insensitive `LIKE` patterns
//!
//! `%` matches any run of characters (including none), `_` matches exactly
//! one character, and a backslash makes the next character literal. A pattern
//! ending in a lone backslash is rejected, as PostgreSQL does.

use crate::errors::LookupError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Literal(char),
    AnyOne,
    AnyRun,
}

/// Compiled, lowercased `ILIKE` pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikePattern {
    tokens: Vec<Token>,
}

impl LikePattern {
    pub fn parse(pattern: &str) -> Result<Self, LookupError> {
        let lowered = pattern.to_lowercase();
        let mut tokens = Vec::with_capacity(lowered.len());
        let mut chars = lowered.chars();

        while let Some(c) = chars.next() {
            let token = match c {
                '%' => Token::AnyRun,
                '_' => Token::AnyOne,
                '\\' => match chars.next() {
                    Some(escaped) => Token::Literal(escaped),
                    None => {
                        return Err(LookupError::InvalidPattern {
                            pattern: pattern.to_string(),
                            reason: "LIKE pattern must not end with escape character",
                        });
                    }
                },
                other => Token::Literal(other),
            };

            // Consecutive % collapse into one
            if token == Token::AnyRun && tokens.last() == Some(&Token::AnyRun) {
                continue;
            }
            tokens.push(token);
        }

        Ok(Self { tokens })
    }

    /// The literal text before a single trailing `%`, if that is the whole pattern.
    /// Such patterns can be answered with an ordered range scan.
    pub fn literal_prefix(&self) -> Option<String> {
        let (last, head) = self.tokens.split_last()?;
        if *last != Token::AnyRun {
            return None;
        }

        head.iter()
            .map(|token| match token {
                Token::Literal(c) => Some(*c),
                _ => None,
            })
            .collect()
    }

    /// Match against text that is already lowercased
    pub fn matches_lowercase(&self, text: &str) -> bool {
        let text: Vec<char> = text.chars().collect();
        let tokens = &self.tokens;

        let (mut t, mut p) = (0usize, 0usize);
        // Position of the last % and the text index it was tried at
        let mut backtrack: Option<(usize, usize)> = None;

        while t < text.len() {
            match tokens.get(p) {
                Some(Token::Literal(c)) if *c == text[t] => {
                    t += 1;
                    p += 1;
                }
                Some(Token::AnyOne) => {
                    t += 1;
                    p += 1;
                }
                Some(Token::AnyRun) => {
                    backtrack = Some((p, t));
                    p += 1;
                }
                _ => match backtrack {
                    Some((star, tried)) => {
                        p = star + 1;
                        t = tried + 1;
                        backtrack = Some((star, tried + 1));
                    }
                    None => return false,
                },
            }
        }

        tokens[p..].iter().all(|token| *token == Token::AnyRun)
    }

    pub fn matches(&self, text: &str) -> bool {
        self.matches_lowercase(&text.to_lowercase())
    }
}
