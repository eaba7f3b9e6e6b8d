//! Minimal Cypher lexer.
//!
//! Splits query text into code, string literals, backtick identifiers and
//! comments so repairs and checks never look inside a literal.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Code,
    Literal { quote: char, terminated: bool },
    Identifier,
    Comment,
}

/// A lexical segment with its byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub start: usize,
    pub end: usize,
}

impl Segment {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }

    pub fn is_code(&self) -> bool {
        self.kind == SegmentKind::Code
    }
}

fn push_code(out: &mut Vec<Segment>, from: usize, to: usize) {
    if to > from {
        out.push(Segment { kind: SegmentKind::Code, start: from, end: to });
    }
}

pub fn segments(text: &str) -> Vec<Segment> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut code_start = 0;
    let mut i = 0;

    // Every delimiter is ASCII, so byte indexing stays on char boundaries.
    while i < bytes.len() {
        match bytes[i] {
            q @ (b'"' | b'\'') => {
                push_code(&mut out, code_start, i);
                let start = i;
                i += 1;
                let mut terminated = false;
                while i < bytes.len() {
                    match bytes[i] {
                        b'\\' => i += 2,
                        b if b == q => {
                            i += 1;
                            terminated = true;
                            break;
                        }
                        _ => i += 1,
                    }
                }
                let end = i.min(bytes.len());
                out.push(Segment {
                    kind: SegmentKind::Literal { quote: q as char, terminated },
                    start,
                    end,
                });
                i = end;
                code_start = end;
            }
            b'`' => {
                push_code(&mut out, code_start, i);
                let start = i;
                let end = text[i + 1..].find('`').map_or(bytes.len(), |p| i + 1 + p + 1);
                out.push(Segment { kind: SegmentKind::Identifier, start, end });
                i = end;
                code_start = end;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                push_code(&mut out, code_start, i);
                let start = i;
                let end = text[i..].find('\n').map_or(bytes.len(), |p| i + p);
                out.push(Segment { kind: SegmentKind::Comment, start, end });
                i = end;
                code_start = end;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                push_code(&mut out, code_start, i);
                let start = i;
                let end = text[i + 2..].find("*/").map_or(bytes.len(), |p| i + 2 + p + 2);
                out.push(Segment { kind: SegmentKind::Comment, start, end });
                i = end;
                code_start = end;
            }
            _ => i += 1,
        }
    }
    push_code(&mut out, code_start, bytes.len());

    out
}

/// A word (`[A-Za-z0-9_.]+`) outside literals and identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Word<'a> {
    pub offset: usize,
    pub text: &'a str,
    /// Character immediately before the word, if any.
    pub prev: Option<char>,
    pub in_comment: bool,
}

impl Word<'_> {
    /// Property keys, labels and parameters are never keywords.
    pub fn is_keyword_position(&self) -> bool {
        !matches!(self.prev, Some('.' | ':' | '$'))
    }
}

pub fn words(text: &str) -> Vec<Word<'_>> {
    let mut out = Vec::new();
    for seg in segments(text) {
        let in_comment = match seg.kind {
            SegmentKind::Code => false,
            SegmentKind::Comment => true,
            _ => continue,
        };
        let body = seg.text(text);
        let mut start: Option<usize> = None;
        for (i, c) in body.char_indices().chain(std::iter::once((body.len(), ' '))) {
            let in_word = c.is_ascii_alphanumeric() || c == '_' || c == '.';
            match (start, in_word) {
                (None, true) => start = Some(i),
                (Some(s), false) => {
                    out.push(Word {
                        offset: seg.start + s,
                        text: &body[s..i],
                        prev: body[..s].chars().next_back(),
                        in_comment,
                    });
                    start = None;
                }
                _ => {}
            }
        }
    }
    out
}

/// Upper-cased words in keyword position within code, with byte offsets.
pub fn keywords(text: &str) -> Vec<(usize, String)> {
    words(text)
        .into_iter()
        .filter(|w| !w.in_comment && w.is_keyword_position())
        .map(|w| (w.offset, w.text.to_ascii_uppercase()))
        .collect()
}
