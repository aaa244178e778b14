use std::path::Path;

use super::model::SupertonicError;

/// Maximum number of characters synthesized in one model call.
pub const MAX_CHUNK_CHARS: usize = 300;

/// Maps unicode codepoints to model token ids.
///
/// `unicode_indexer.json` is a flat array indexed by codepoint; negative
/// entries mark characters the model has no token for.
pub struct UnicodeIndexer {
    table: Vec<i64>,
}

impl UnicodeIndexer {
    pub fn load(path: &Path) -> Result<Self, SupertonicError> {
        let content = std::fs::read_to_string(path)?;
        let table: Vec<i64> = serde_json::from_str(&content).map_err(|e| {
            SupertonicError::Config(format!("Failed to parse {}: {e}", path.display()))
        })?;
        Ok(Self::from_table(table))
    }

    pub fn from_table(table: Vec<i64>) -> Self {
        Self { table }
    }

    /// Convert text to token ids. Characters without a token are dropped.
    pub fn encode(&self, text: &str) -> Vec<i64> {
        text.chars()
            .filter_map(|c| match self.table.get(c as usize) {
                Some(&id) if id >= 0 => Some(id),
                _ => {
                    log::debug!("Dropping character {c:?} with no token id");
                    None
                }
            })
            .collect()
    }
}

/// Normalize text before encoding.
///
/// Collapses whitespace, maps typographic quotes and dashes to their ASCII
/// forms, removes spaces before punctuation and terminates the text with a
/// period when it doesn't already end in punctuation.
pub fn preprocess(text: &str) -> String {
    let mapped: String = text
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{00b4}' | '`' => '\'',
            '\u{201c}' | '\u{201d}' => '"',
            '\u{2013}' | '\u{2014}' | '\u{2010}' | '\u{2011}' => '-',
            _ => c,
        })
        .collect();

    let mut out = String::with_capacity(mapped.len() + 1);
    for word in mapped.split_whitespace() {
        let attaches = word.starts_with([',', '.', '!', '?', ';', ':']);
        if !out.is_empty() && !attaches {
            out.push(' ');
        }
        out.push_str(word);
    }

    if let Some(last) = out.chars().last() {
        if !matches!(
            last,
            '.' | '!' | '?' | ';' | ':' | ',' | '\'' | '"' | ')' | ']' | '}' | '\u{2026}'
        ) {
            out.push('.');
        }
    }
    out
}

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Paragraphs (separated by blank lines) always start a new chunk. Within a
/// paragraph, whole sentences are packed greedily; a sentence longer than
/// the limit is split between words, and a single overlong word is split
/// wherever the limit falls.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();

    for paragraph in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let mut current = String::new();
        for sentence in split_sentences(paragraph) {
            for piece in split_long(&sentence, max_chars) {
                let needed = piece.chars().count() + usize::from(!current.is_empty());
                if current.chars().count() + needed > max_chars && !current.is_empty() {
                    chunks.push(std::mem::take(&mut current));
                }
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(&piece);
            }
        }
        if !current.is_empty() {
            chunks.push(current);
        }
    }

    chunks
}

/// Sentences end at `.`, `!` or `?` followed by whitespace.
fn split_sentences(paragraph: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = paragraph.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        let at_boundary = matches!(c, '.' | '!' | '?')
            && chars.peek().is_some_and(|next| next.is_whitespace());
        if at_boundary {
            sentences.push(normalize_space(&current));
            current.clear();
        }
    }
    let rest = normalize_space(&current);
    if !rest.is_empty() {
        sentences.push(rest);
    }

    sentences.retain(|s| !s.is_empty());
    sentences
}

fn split_long(sentence: &str, max_chars: usize) -> Vec<String> {
    if sentence.chars().count() <= max_chars {
        return vec![sentence.to_string()];
    }

    let mut pieces = Vec::new();
    let mut current = String::new();
    for word in sentence.split_whitespace() {
        let word_len = word.chars().count();
        if word_len > max_chars {
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
            }
            let chars: Vec<char> = word.chars().collect();
            pieces.extend(chars.chunks(max_chars).map(|c| c.iter().collect::<String>()));
            continue;
        }

        let current_len = current.chars().count();
        if current_len > 0 && current_len + 1 + word_len > max_chars {
            pieces.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

fn normalize_space(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
