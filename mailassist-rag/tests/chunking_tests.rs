//! Property tests for recursive chunking.

use mailassist_rag::RecursiveChunker;
use proptest::prelude::*;

/// A text of unique, ordered words `w0000 w0001 ...` joined by mixed separators.
fn arb_text() -> impl Strategy<Value = (String, usize)> {
    proptest::collection::vec(prop_oneof![Just(" "), Just("\n"), Just("\n\n"), Just(". ")], 1..120)
        .prop_map(|separators| {
            let mut text = String::new();
            for (i, sep) in separators.iter().enumerate() {
                if i > 0 {
                    text.push_str(sep);
                }
                text.push_str(&format!("w{i:04}"));
            }
            (text, separators.len())
        })
}

fn word_indices(chunk: &str) -> Vec<usize> {
    chunk
        .split(|c: char| c.is_whitespace() || c == '.')
        .filter(|w| !w.is_empty())
        .map(|w| w.trim_start_matches('w').parse().unwrap())
        .collect()
}

/// Splitting and then dropping the overlap reproduces the word sequence.
mod prop_chunking_reassembly {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn chunks_are_bounded_ordered_substrings(
            (text, word_count) in arb_text(),
            chunk_size in 12usize..80,
            overlap_ratio in 0.0f64..0.5,
        ) {
            let overlap = (chunk_size as f64 * overlap_ratio) as usize;
            let chunks = RecursiveChunker::new(chunk_size, overlap).split_text(&text);

            prop_assert!(!chunks.is_empty());

            let mut next_word = 0usize;
            for chunk in &chunks {
                prop_assert!(chunk.chars().count() <= chunk_size, "chunk too long: {chunk:?}");
                prop_assert!(text.contains(chunk.as_str()));
                prop_assert_eq!(chunk.trim(), chunk.as_str());

                let words = word_indices(chunk);
                prop_assert!(!words.is_empty());
                prop_assert!(words.windows(2).all(|w| w[1] == w[0] + 1), "words out of order in {chunk:?}");
                prop_assert!(words[0] <= next_word, "gap before {chunk:?}");
                next_word = next_word.max(words[words.len() - 1] + 1);
            }
            prop_assert_eq!(next_word, word_count);
        }

        #[test]
        fn zero_overlap_never_repeats_words(
            (text, word_count) in arb_text(),
            chunk_size in 12usize..80,
        ) {
            let chunks = RecursiveChunker::new(chunk_size, 0).split_text(&text);
            let words: Vec<usize> = chunks.iter().flat_map(|c| word_indices(c)).collect();
            prop_assert_eq!(words, (0..word_count).collect::<Vec<_>>());
        }
    }
}

#[test]
fn handbook_paragraphs_split_on_blank_lines() {
    let text = "Annual Leave\nEmployees receive 25 days of annual leave per year.\n\n\
                Sick Leave\nEmployees receive 10 paid sick days. A doctor's note is required after 3 days.";
    let chunks = RecursiveChunker::new(120, 10).split_text(text);

    assert_eq!(chunks.len(), 2);
    assert!(chunks[0].starts_with("Annual Leave"));
    assert!(chunks[1].starts_with("Sick Leave"));
}
