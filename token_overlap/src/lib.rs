//! Quick lookup of the tokens overlapping a character span.
//!
//! A `TokenOverlap` is built once per document from the length of its text and its tokens. Each
//! character offset is mapped to the token it falls into (or to the token preceding it, for
//! whitespace). Finding the tokens overlapping `[start, end)` then only requires two lookups
//! instead of a scan over all the tokens.
//!
//! ```rust
//! use token_overlap::{tokenize, TokenOverlap};
//!
//! let text = "This is a sentence.";
//! let overlap = TokenOverlap::new(text.chars().count(), tokenize(text));
//! assert_eq!(overlap.overlapping_tokens(6, 11).unwrap(), &[(5, 7), (8, 9), (10, 19)]);
//! ```

use thiserror::Error;

/// Character offsets `(start, end)` of a token. The `end` offset is exclusive.
pub type Span = (usize, usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OverlapError {
    #[error("End index {end} > text length {length}!")]
    OutOfBounds { end: usize, length: usize },
}

/// Splits the text on whitespace. The spans are counted in characters, not in bytes, and are
/// returned in ascending order.
pub fn tokenize(text: &str) -> Vec<Span> {
    let mut tokens = Vec::new();
    let mut token_start: Option<usize> = None;
    let mut length = 0;
    for (i, c) in text.chars().enumerate() {
        length = i + 1;
        match (c.is_whitespace(), token_start) {
            (true, Some(start)) => {
                tokens.push((start, i));
                token_start = None;
            }
            (false, None) => token_start = Some(i),
            _ => {}
        }
    }
    if let Some(start) = token_start {
        tokens.push((start, length));
    }
    tokens
}

/// Datastructure for quick lookup of tokens overlapping with a given span. The tokens must be
/// sorted and must not overlap each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenOverlap {
    tokens: Box<[Span]>,
    /// For every character, the index of the token containing it. Characters outside of any
    /// token point to the preceding token (`-1` before the first one).
    char2token: Box<[isize]>,
}

impl TokenOverlap {
    pub fn new(text_length: usize, tokens: Vec<Span>) -> Self {
        let char2token = Self::compute_mapping(text_length, &tokens);
        Self {
            tokens: tokens.into_boxed_slice(),
            char2token,
        }
    }

    /// Tokenizes the text with `tokenize` and builds the lookup table.
    pub fn from_text(text: &str) -> Self {
        Self::new(text.chars().count(), tokenize(text))
    }

    fn compute_mapping(text_length: usize, tokens: &[Span]) -> Box<[isize]> {
        let mut char2token = vec![0isize; text_length];
        let mut i = 0;
        for (token_idx, &(start, end)) in tokens.iter().enumerate() {
            let token_idx = token_idx as isize;
            fill(&mut char2token, i, start, token_idx - 1);
            fill(&mut char2token, start, end, token_idx);
            i = end;
        }
        fill(&mut char2token, i, text_length, tokens.len() as isize - 1);
        char2token.into_boxed_slice()
    }

    pub fn tokens(&self) -> &[Span] {
        &self.tokens
    }

    /// Length of the indexed text, in characters.
    pub fn text_length(&self) -> usize {
        self.char2token.len()
    }

    /// Returns every token having a non-empty intersection with `[start, end)`, in order. Empty
    /// and whitespace-only spans yield an empty slice.
    ///
    /// * `start`: Inclusive start offset of the span
    /// * `end`: Exclusive end offset of the span. Must not exceed the text length.
    pub fn overlapping_tokens(&self, start: usize, end: usize) -> Result<&[Span], OverlapError> {
        if end > self.char2token.len() {
            return Err(OverlapError::OutOfBounds {
                end,
                length: self.char2token.len(),
            });
        }
        if end < 1 || start >= end || self.tokens.is_empty() {
            return Ok(&[]);
        }
        // -1: start offset before the first token
        let mut start_token = self.char2token[start].max(0) as usize;
        // start offset between two tokens
        if self.tokens[start_token].1 <= start {
            start_token += 1;
        }
        // end offset is exclusive
        let end_token = self.char2token[end - 1];
        if end_token < 0 || (end_token as usize) < start_token {
            return Ok(&[]);
        }
        Ok(&self.tokens[start_token..=end_token as usize])
    }
}

/// Fills `slice[from..to]` with `value`. The range is clamped to the slice and an empty or
/// inverted range is a no-op.
fn fill(slice: &mut [isize], from: usize, to: usize, value: isize) {
    let to = to.min(slice.len());
    if from < to {
        slice[from..to].fill(value);
    }
}
