//! Sentence-aligned chunk segmentation.
//!
//! Text is cut into sentence units on the literal delimiter `". "` and the units are packed
//! greedily into chunks of at most `max_chunk_size` characters. Each unit keeps its trailing
//! delimiter, so concatenating the chunks in order reproduces the input exactly.
//!
//! The delimiter is blunt: abbreviations ("e.g. "), decimals followed by a space, and scripts
//! that do not end sentences with a Latin period all split in the wrong place or not at all.
//! A sentence longer than the bound is emitted as its own oversized chunk rather than cut.

use super::types::{ChunkingError, TextChunk};

/// Default maximum chunk length, in characters.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 8000;

const SENTENCE_DELIMITER: &str = ". ";

/// Split `text` into ordered chunks bounded by `max_chunk_size` characters.
///
/// - A chunk is closed when appending the next sentence would push it past the bound.
/// - Chunks are never empty; whitespace-only input yields no chunks.
/// - The result is a pure function of its inputs.
pub fn segment(text: &str, max_chunk_size: usize) -> Result<Vec<TextChunk>, ChunkingError> {
    if max_chunk_size == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut chunks = Vec::new();
    let mut buffer = String::new();
    let mut buffer_chars = 0usize;

    for sentence in text.split_inclusive(SENTENCE_DELIMITER) {
        let sentence_chars = sentence.chars().count();
        if buffer_chars > 0 && buffer_chars + sentence_chars > max_chunk_size {
            push_chunk(&mut chunks, std::mem::take(&mut buffer));
            buffer_chars = 0;
        }
        if sentence_chars > max_chunk_size {
            tracing::debug!(
                index = chunks.len(),
                sentence_chars,
                max_chunk_size,
                "Sentence exceeds chunk bound; emitting oversized chunk"
            );
        }
        buffer.push_str(sentence);
        buffer_chars += sentence_chars;
    }

    if !buffer.is_empty() {
        push_chunk(&mut chunks, buffer);
    }

    Ok(chunks)
}

fn push_chunk(chunks: &mut Vec<TextChunk>, content: String) {
    chunks.push(TextChunk {
        index: chunks.len(),
        content,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(chunks: &[TextChunk]) -> Vec<&str> {
        chunks.iter().map(|chunk| chunk.content.as_str()).collect()
    }

    #[test]
    fn splits_short_sentences_into_separate_chunks() {
        let text = "Sentence one. Sentence two. Sentence three.";
        let chunks = segment(text, 15).expect("segment");

        assert_eq!(
            contents(&chunks),
            vec!["Sentence one. ", "Sentence two. ", "Sentence three."]
        );
        for (position, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, position);
            assert!(chunk.content.chars().count() <= 15);
        }
    }

    #[test]
    fn packs_sentences_until_the_bound() {
        let text = "One. Two. Three. Four.";
        let chunks = segment(text, 10).expect("segment");
        assert_eq!(contents(&chunks), vec!["One. Two. ", "Three. ", "Four."]);
    }

    #[test]
    fn short_text_yields_single_chunk() {
        let texts = [
            "A single sentence without a delimiter",
            "Exactly twenty chars",
            "First. Second. Third.",
        ];
        for text in texts {
            let chunks = segment(text, text.chars().count()).expect("segment");
            assert_eq!(chunks.len(), 1, "text: {text:?}");
            assert_eq!(chunks[0].content, text);

            let roomy = segment(text, DEFAULT_MAX_CHUNK_SIZE).expect("segment");
            assert_eq!(roomy.len(), 1);
        }
    }

    #[test]
    fn sentences_that_exactly_fill_the_bound_share_a_chunk() {
        let chunks = segment("One. Two.", 9).expect("segment");
        assert_eq!(contents(&chunks), vec!["One. Two."]);

        let chunks = segment("One. Two.", 8).expect("segment");
        assert_eq!(contents(&chunks), vec!["One. ", "Two."]);
    }

    #[test]
    fn concatenation_reconstructs_input() {
        let texts = [
            "Alpha. Beta. Gamma. Delta. Epsilon.",
            "No delimiter at all",
            "Trailing delimiter. ",
            "Multiple.  Spaces. And\nnewlines. here",
            ". Leading delimiter. then text",
            "Accents éàü. Encore une phrase. Fin.",
        ];
        for text in texts {
            for bound in [1, 3, 8, 20, 1000] {
                let chunks = segment(text, bound).expect("segment");
                let rebuilt: String = chunks.iter().map(|chunk| chunk.content.as_str()).collect();
                assert_eq!(rebuilt, text, "bound {bound}");
            }
        }
    }

    #[test]
    fn oversized_sentence_becomes_its_own_chunk() {
        let long = "x".repeat(50);
        let text = format!("Short. {long}. Tail.");
        let chunks = segment(&text, 20).expect("segment");

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].content, "Short. ");
        assert_eq!(chunks[1].content, format!("{long}. "));
        assert_eq!(chunks[2].content, "Tail.");
    }

    #[test]
    fn chunks_are_never_empty_and_respect_bound() {
        let text = "a. bb. ccc. dddd. eeeee. ffffff. ggggggg. ".repeat(20);
        let chunks = segment(&text, 25).expect("segment");
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(!chunk.content.is_empty());
            assert!(chunk.content.chars().count() <= 25);
        }
    }

    #[test]
    fn bound_counts_characters_not_bytes() {
        let text = "ééééé. ààààà.";
        let chunks = segment(text, 13).expect("segment");
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn segmentation_is_deterministic() {
        let text = "Lorem ipsum dolor. Sit amet consectetur. Adipiscing elit. ".repeat(40);
        let first = segment(&text, 64).expect("segment");
        let second = segment(&text, 64).expect("segment");
        assert_eq!(first, second);
    }

    #[test]
    fn whitespace_input_yields_no_chunks() {
        assert!(segment("", 10).expect("segment").is_empty());
        assert!(segment("  \n\t ", 10).expect("segment").is_empty());
    }

    #[test]
    fn zero_bound_is_rejected() {
        let error = segment("hello", 0).unwrap_err();
        assert!(matches!(error, ChunkingError::InvalidChunkSize));
    }
}
