//! PowerShell tokenizer.
//!
//! Only as fine-grained as the tree builder needs: comments, strings and
//! brackets are recognised exactly so that braces inside them never
//! unbalance a function body; everything else collapses into words.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    Variable,
    Str,
    LineComment,
    BlockComment,
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Equals,
    Semi,
    Newline,
}

/// Byte range of a token in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn text<'a>(&self, src: &'a str) -> &'a str {
        &src[self.start..self.end]
    }

    pub fn is_comment(&self) -> bool {
        matches!(self.kind, TokenKind::LineComment | TokenKind::BlockComment)
    }

    /// Case-insensitive keyword test for word tokens.
    pub fn is_word(&self, src: &str, word: &str) -> bool {
        self.kind == TokenKind::Word && self.text(src).eq_ignore_ascii_case(word)
    }
}

/// Split PowerShell source into tokens. Whitespace other than newlines is
/// dropped; unterminated strings and comments run to the end of input.
pub fn tokenize(src: &str) -> Vec<Token> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let start = i;
        let kind = match bytes[i] {
            b' ' | b'\t' | b'\r' | b'\x0c' => {
                i += 1;
                continue;
            }
            b'\n' => {
                i += 1;
                TokenKind::Newline
            }
            // Line continuation
            b'`' if matches!(bytes.get(i + 1), Some(b'\n' | b'\r')) => {
                i += 2;
                if bytes.get(i - 1) == Some(&b'\r') && bytes.get(i) == Some(&b'\n') {
                    i += 1;
                }
                continue;
            }
            b'<' if bytes.get(i + 1) == Some(&b'#') => {
                i = skip_block_comment(bytes, i + 2);
                TokenKind::BlockComment
            }
            b'#' => {
                i = line_end(bytes, i);
                TokenKind::LineComment
            }
            b'\'' => {
                i = skip_single_quoted(bytes, i + 1);
                TokenKind::Str
            }
            b'"' => {
                i = skip_double_quoted(bytes, i + 1);
                TokenKind::Str
            }
            b'@' if is_here_string_start(bytes, i) => {
                i = skip_here_string(bytes, i);
                TokenKind::Str
            }
            b'$' => {
                i = skip_variable(bytes, i + 1);
                TokenKind::Variable
            }
            b'{' => {
                i += 1;
                TokenKind::LBrace
            }
            b'}' => {
                i += 1;
                TokenKind::RBrace
            }
            b'(' => {
                i += 1;
                TokenKind::LParen
            }
            b')' => {
                i += 1;
                TokenKind::RParen
            }
            b'[' => {
                i += 1;
                TokenKind::LBracket
            }
            b']' => {
                i += 1;
                TokenKind::RBracket
            }
            b',' => {
                i += 1;
                TokenKind::Comma
            }
            b'=' => {
                i += 1;
                TokenKind::Equals
            }
            b';' => {
                i += 1;
                TokenKind::Semi
            }
            _ => {
                i = skip_word(bytes, i);
                TokenKind::Word
            }
        };
        tokens.push(Token {
            kind,
            start,
            end: i,
        });
    }

    tokens
}

fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b' ' | b'\t'
            | b'\r'
            | b'\n'
            | b'{'
            | b'}'
            | b'('
            | b')'
            | b'['
            | b']'
            | b','
            | b';'
            | b'='
            | b'\''
            | b'"'
    )
}

fn skip_word(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && !is_delimiter(bytes[i]) {
        // Escaped character stays part of the word
        if bytes[i] == b'`' && i + 1 < bytes.len() {
            i += 1;
        }
        i += 1;
    }
    i
}

fn line_end(bytes: &[u8], i: usize) -> usize {
    bytes[i..]
        .iter()
        .position(|&b| b == b'\n')
        .map(|p| i + p)
        .unwrap_or(bytes.len())
}

fn skip_block_comment(bytes: &[u8], i: usize) -> usize {
    bytes[i..]
        .windows(2)
        .position(|w| w == b"#>")
        .map(|p| i + p + 2)
        .unwrap_or(bytes.len())
}

fn skip_single_quoted(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() {
        if bytes[i] == b'\'' {
            if bytes.get(i + 1) == Some(&b'\'') {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    i
}

fn skip_double_quoted(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() {
        match bytes[i] {
            b'`' => i += 2,
            b'"' if bytes.get(i + 1) == Some(&b'"') => i += 2,
            b'"' => return i + 1,
            b'$' if bytes.get(i + 1) == Some(&b'(') => i = skip_subexpression(bytes, i + 2),
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Skip `$( ... )` inside an expandable string; `i` points after the `(`.
fn skip_subexpression(bytes: &[u8], mut i: usize) -> usize {
    let mut depth = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'(' => {
                depth += 1;
                i += 1;
            }
            b')' => {
                depth -= 1;
                i += 1;
                if depth == 0 {
                    return i;
                }
            }
            b'\'' => i = skip_single_quoted(bytes, i + 1),
            b'"' => i = skip_double_quoted(bytes, i + 1),
            _ => i += 1,
        }
    }
    bytes.len()
}

/// `@'` or `@"` followed only by blanks up to the end of the line.
fn is_here_string_start(bytes: &[u8], i: usize) -> bool {
    if !matches!(bytes.get(i + 1), Some(b'\'' | b'"')) {
        return false;
    }
    bytes[i + 2..]
        .iter()
        .take_while(|&&b| b != b'\n')
        .all(|&b| b == b' ' || b == b'\t' || b == b'\r')
}

/// Here-strings close with `'@` / `"@` at the very start of a line.
fn skip_here_string(bytes: &[u8], i: usize) -> usize {
    let quote = bytes[i + 1];
    let mut pos = line_end(bytes, i);
    while pos < bytes.len() {
        let line_start = pos + 1;
        if bytes.get(line_start) == Some(&quote) && bytes.get(line_start + 1) == Some(&b'@') {
            return line_start + 2;
        }
        pos = line_end(bytes, line_start);
    }
    bytes.len()
}

fn skip_variable(bytes: &[u8], i: usize) -> usize {
    match bytes.get(i) {
        Some(b'{') => bytes[i..]
            .iter()
            .position(|&b| b == b'}')
            .map(|p| i + p + 1)
            .unwrap_or(bytes.len()),
        Some(b'$' | b'?' | b'^') => i + 1,
        _ => {
            let mut j = i;
            while j < bytes.len()
                && (bytes[j].is_ascii_alphanumeric()
                    || bytes[j] == b'_'
                    || bytes[j] == b':'
                    || bytes[j] >= 0x80)
            {
                j += 1;
            }
            j
        }
    }
}
