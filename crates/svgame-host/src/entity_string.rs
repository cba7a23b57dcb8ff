//! Tokenizer over the map's entity description text.
//!
//! The module pulls spawn definitions one token at a time. Tokens are
//! whitespace separated; `//` and `/* */` comments are skipped and double
//! quotes group a token that may contain spaces. Once the text runs out the
//! cursor becomes exhausted and stays so until [`EntityParser::reset`].

use svgame_abi::MAX_TOKEN_CHARS;

/// Cursor into the entity description text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntityParser {
    text: Vec<u8>,
    /// `None` once the end of the text has been consumed
    cursor: Option<usize>,
}

impl EntityParser {
    /// Rewind to the start of `text`.
    pub fn reset(&mut self, text: &str) {
        self.text = text.as_bytes().to_vec();
        self.cursor = Some(0);
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor.is_none()
    }

    /// Byte offset of the cursor, `None` when exhausted.
    pub fn position(&self) -> Option<usize> {
        self.cursor
    }

    /// Skip whitespace and comments. Returns `None` at the end of text.
    fn skip_ignored(&self, mut pos: usize) -> Option<usize> {
        let text = &self.text;
        loop {
            while pos < text.len() && text[pos] <= b' ' {
                pos += 1;
            }
            if pos >= text.len() {
                return None;
            }
            match (text[pos], text.get(pos + 1)) {
                (b'/', Some(b'/')) => {
                    while pos < text.len() && text[pos] != b'\n' {
                        pos += 1;
                    }
                }
                (b'/', Some(b'*')) => {
                    pos += 2;
                    while pos < text.len() && !(text[pos] == b'*' && text.get(pos + 1) == Some(&b'/')) {
                        pos += 1;
                    }
                    pos = (pos + 2).min(text.len());
                }
                _ => return Some(pos),
            }
        }
    }

    /// Next token, or the empty string once the text is exhausted.
    ///
    /// Tokens longer than `MAX_TOKEN_CHARS - 1` bytes are truncated.
    pub fn next_token(&mut self) -> String {
        let Some(start) = self.cursor else {
            return String::new();
        };
        let Some(mut pos) = self.skip_ignored(start) else {
            self.cursor = None;
            return String::new();
        };

        let text = &self.text;
        let mut token = Vec::new();
        if text[pos] == b'"' {
            pos += 1;
            while pos < text.len() && text[pos] != b'"' {
                token.push(text[pos]);
                pos += 1;
            }
            if pos < text.len() {
                pos += 1;
            }
        } else {
            while pos < text.len() && text[pos] > b' ' {
                token.push(text[pos]);
                pos += 1;
            }
        }
        token.truncate(MAX_TOKEN_CHARS - 1);
        self.cursor = Some(pos);
        String::from_utf8_lossy(&token).into_owned()
    }
}
