//! Pluggable tokenization.

/// A token and its byte range in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

/// Restartable token stream over a borrowed text.
///
/// Implementations are external collaborators; [`WordTokenizer`] is the
/// default used when the embedding engine supplies nothing else.
pub trait Tokenizer {
    /// Resets the stream to the start of `text`.
    fn set_text(&mut self, text: &str);

    /// Next token in input order, with byte offsets into the text last
    /// passed to [`set_text`](Tokenizer::set_text).
    fn next_token(&mut self) -> Option<Token<'_>>;
}

/// Splits on anything that is not alphanumeric; tokens are maximal
/// alphanumeric runs.
#[derive(Debug, Default)]
pub struct WordTokenizer {
    text: String,
    pos: usize,
}

impl WordTokenizer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tokenizer for WordTokenizer {
    fn set_text(&mut self, text: &str) {
        self.text.clear();
        self.text.push_str(text);
        self.pos = 0;
    }

    fn next_token(&mut self) -> Option<Token<'_>> {
        let rest = &self.text[self.pos..];
        let mut start = None;
        let mut end = self.text.len();
        for (i, c) in rest.char_indices() {
            if c.is_alphanumeric() {
                if start.is_none() {
                    start = Some(self.pos + i);
                }
            } else if let Some(s) = start {
                end = self.pos + i;
                self.pos = end;
                return Some(Token {
                    text: &self.text[s..end],
                    start: s,
                    end,
                });
            }
        }
        self.pos = self.text.len();
        start.map(|s| Token {
            text: &self.text[s..end],
            start: s,
            end,
        })
    }
}
