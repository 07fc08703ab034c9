//! Text Chunking
//!
//! Splits free-form text into overlapping, size-bounded segments before
//! extraction. Token counts are approximated by whitespace-separated words,
//! which is stable across runs and close enough for budget purposes.
//!
//! Contract: deterministic for a given `(text, size, overlap)`; non-empty
//! input yields at least one chunk; splits land on sentence boundaries when
//! the text has any; a chunk never exceeds the size budget by more than one
//! sentence.

// ============================================================================
// CHUNKER
// ============================================================================

/// Sentence-aware sliding-window chunker.
#[derive(Debug, Clone)]
pub struct Chunker {
    size: usize,
    overlap: usize,
}

impl Chunker {
    /// Create a chunker with the given token budget and overlap.
    pub fn new(size: usize, overlap: usize) -> Self {
        Self { size, overlap }
    }

    /// Split `text` into ordered chunks.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }

        let sentences = split_sentences(trimmed);
        if sentences.is_empty() {
            return vec![trimmed.to_string()];
        }

        let mut chunks: Vec<String> = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut current_tokens = 0usize;

        for sentence in sentences {
            let sentence_tokens = token_count(&sentence);

            if !current.is_empty() && current_tokens + sentence_tokens > self.size {
                chunks.push(current.join(" "));

                // Seed the next chunk with trailing sentences of the previous
                // one, up to the overlap budget.
                let (seed, seed_tokens) = self.overlap_tail(&current);
                current = seed;
                current_tokens = seed_tokens;
            }

            current_tokens += sentence_tokens;
            current.push(sentence);
        }

        if !current.is_empty() {
            chunks.push(current.join(" "));
        }

        chunks.retain(|c| !c.trim().is_empty());
        if chunks.is_empty() {
            chunks.push(trimmed.to_string());
        }
        chunks
    }

    /// Trailing sentences of `chunk` totalling at most `overlap` tokens.
    fn overlap_tail(&self, chunk: &[String]) -> (Vec<String>, usize) {
        let mut seed: Vec<String> = Vec::new();
        let mut seed_tokens = 0usize;

        for sentence in chunk.iter().rev() {
            let tokens = token_count(sentence);
            if seed_tokens + tokens > self.overlap {
                break;
            }
            seed_tokens += tokens;
            seed.insert(0, sentence.clone());
        }

        (seed, seed_tokens)
    }
}

/// Whitespace token count.
fn token_count(text: &str) -> usize {
    text.split_whitespace().count()
}

// ============================================================================
// SENTENCE SPLITTING
// ============================================================================

/// Split text into sentences at `.`/`!`/`?` boundaries.
///
/// A terminal character ends a sentence when followed by whitespace or
/// end-of-input. Trailing text without terminal punctuation becomes a final
/// sentence of its own.
pub fn split_sentences(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut sentences = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    for i in 0..len {
        current.push(chars[i]);

        let is_terminal = matches!(chars[i], '.' | '!' | '?');
        if !is_terminal {
            continue;
        }

        let at_end = i + 1 >= len;
        let next_is_space = !at_end && chars[i + 1].is_whitespace();

        if at_end || next_is_space {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }

    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }

    sentences
}

// ============================================================================
// TESTS
// ============================================================================
