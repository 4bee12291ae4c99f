use filing_pipeline::chunker::{chunk_text, reconstruct, ChunkOptions, ReconstructOptions};
use proptest::prelude::*;

fn size_options(max: usize, overlap: usize) -> ChunkOptions {
    ChunkOptions {
        max_chunk_size: max,
        min_chunk_size: 1,
        chunk_overlap: overlap,
        ..ChunkOptions::default()
    }
}

fn joined(remove_overlap: bool) -> ReconstructOptions {
    ReconstructOptions {
        separator: String::new(),
        remove_overlap,
    }
}

proptest! {
    #[test]
    fn chunks_without_overlap_concatenate_to_source(
        text in "[a-zé .!?\n]{0,600}",
        max in 5usize..120,
    ) {
        let result = chunk_text(&text, &size_options(max, 0)).unwrap();
        prop_assert_eq!(reconstruct(&result.chunks, &joined(false)), text);
    }

    #[test]
    fn overlap_is_removed_on_reconstruct(
        text in "[a-zé .!?\n]{0,600}",
        max in 10usize..120,
        overlap_share in 0usize..100,
    ) {
        let overlap = (max - 1) * overlap_share / 100;
        let result = chunk_text(&text, &size_options(max, overlap)).unwrap();
        prop_assert_eq!(reconstruct(&result.chunks, &joined(true)), text);
    }

    #[test]
    fn chunk_accounting_is_consistent(
        text in "[a-z .\n]{1,600}",
        max in 5usize..80,
    ) {
        let result = chunk_text(&text, &size_options(max, max / 4)).unwrap();

        prop_assert_eq!(result.total_chunks, result.chunks.len());
        prop_assert_eq!(result.original_length, text.chars().count());
        for (i, c) in result.chunks.iter().enumerate() {
            prop_assert_eq!(c.id, i);
            prop_assert_eq!(c.metadata.char_count, c.content.chars().count());
            prop_assert!(c.metadata.char_count <= max);
            prop_assert_eq!(&text[c.metadata.start..c.metadata.end], c.content.as_str());
        }
        prop_assert_eq!(result.chunk_lengths.len(), result.total_chunks);
        let average = if result.total_chunks == 0 {
            0.0
        } else {
            result.original_length as f64 / result.total_chunks as f64
        };
        prop_assert!((result.average_chunk_size - average).abs() < 1e-9);
    }
}
