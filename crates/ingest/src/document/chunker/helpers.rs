//! Text splitting and merging utilities shared by the chunkers. Sizes are in
//! characters.

pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Split `text` after sentence terminals (`.`, `!`, `?`, `;`) followed by a
/// space and an uppercase letter, or by the end of the text. Fragments keep
/// their punctuation and are trimmed.
pub(crate) fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if !matches!(c, '.' | '!' | '?' | ';') {
            continue;
        }
        let end = i + c.len_utf8();
        let rest = &text[end..];
        let boundary = match rest.strip_prefix(' ') {
            Some(after) => after.is_empty() || after.starts_with(|ch: char| ch.is_uppercase()),
            None => false,
        };
        if boundary {
            let s = text[start..end].trim();
            if !s.is_empty() {
                sentences.push(s);
            }
            start = end;
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

/// Hard-wrap `text` at word boundaries into pieces of at most `max_chars`.
/// A single word longer than `max_chars` is cut at character boundaries.
fn wrap_words(text: &str, max_chars: usize, out: &mut Vec<String>) {
    let mut buf = String::new();
    for word in text.split_whitespace() {
        let needed = if buf.is_empty() { char_len(word) } else { char_len(&buf) + 1 + char_len(word) };
        if needed <= max_chars {
            if !buf.is_empty() {
                buf.push(' ');
            }
            buf.push_str(word);
            continue;
        }
        if !buf.is_empty() {
            out.push(std::mem::take(&mut buf));
        }
        if char_len(word) <= max_chars {
            buf.push_str(word);
        } else {
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                out.push(piece.iter().collect());
            }
        }
    }
    if !buf.is_empty() {
        out.push(buf);
    }
}

/// Split an over-long physical line into consecutive lines of at most
/// `max_chars`, preferring sentence boundaries. The first piece keeps the
/// line's leading indentation.
pub(crate) fn split_long_line(line: &str, max_chars: usize) -> Vec<String> {
    if max_chars == 0 || char_len(line) <= max_chars {
        return vec![line.to_string()];
    }
    let indent_len = line.len() - line.trim_start().len();
    let indent = &line[..indent_len];

    let mut pieces: Vec<String> = Vec::new();
    let mut buf = String::from(indent);
    for sentence in split_sentences(line) {
        let candidate = if buf.trim().is_empty() {
            char_len(&buf) + char_len(sentence)
        } else {
            char_len(&buf) + 1 + char_len(sentence)
        };
        if candidate <= max_chars {
            if !buf.trim().is_empty() {
                buf.push(' ');
            }
            buf.push_str(sentence);
            continue;
        }
        if !buf.trim().is_empty() {
            pieces.push(std::mem::take(&mut buf));
        }
        if char_len(sentence) <= max_chars {
            buf = sentence.to_string();
        } else {
            wrap_words(sentence, max_chars, &mut pieces);
            buf.clear();
        }
    }
    if !buf.trim().is_empty() {
        pieces.push(buf);
    }
    pieces
}

/// Split text into pieces of at most `max_chars`: paragraphs (`\n\n`) first,
/// then sentences, then words.
pub(crate) fn split_oversized(text: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    for para in text.split("\n\n") {
        let para = para.trim();
        if para.is_empty() {
            continue;
        }
        if char_len(para) <= max_chars {
            pieces.push(para.to_string());
            continue;
        }
        let mut buf = String::new();
        for sentence in split_sentences(para) {
            if buf.is_empty() && char_len(sentence) <= max_chars {
                buf.push_str(sentence);
            } else if !buf.is_empty() && char_len(&buf) + 1 + char_len(sentence) <= max_chars {
                buf.push(' ');
                buf.push_str(sentence);
            } else {
                if !buf.is_empty() {
                    pieces.push(std::mem::take(&mut buf));
                }
                if char_len(sentence) <= max_chars {
                    buf.push_str(sentence);
                } else {
                    wrap_words(sentence, max_chars, &mut pieces);
                }
            }
        }
        if !buf.is_empty() {
            pieces.push(buf);
        }
    }
    pieces
}

/// Fold fragments shorter than `min_chars` into their neighbour.
pub(crate) fn merge_tiny(fragments: Vec<String>, min_chars: usize) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(fragments.len());
    for frag in fragments {
        match merged.last_mut() {
            Some(last) if char_len(last) < min_chars => {
                last.push_str("\n\n");
                last.push_str(&frag);
            }
            _ => merged.push(frag),
        }
    }
    if merged.len() >= 2 && merged.last().is_some_and(|l| char_len(l) < min_chars) {
        if let Some(tail) = merged.pop() {
            if let Some(prev) = merged.last_mut() {
                prev.push_str("\n\n");
                prev.push_str(&tail);
            }
        }
    }
    merged
}
