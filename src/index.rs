use crate::chunking::Chunk;
use crate::embeddings::Embedding;
use crate::error::{RagError, Result};
use log::info;

/// A chunk returned by a similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// Squared Euclidean distance to the query vector
    pub distance: f32,
}

/// Flat in-memory index holding exactly one vector per chunk.
///
/// Built once and never mutated; search is exhaustive.
#[derive(Debug)]
pub struct VectorIndex {
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
    dimension: usize,
}

impl VectorIndex {
    /// Pair chunks with their embeddings
    pub fn build(chunks: Vec<Chunk>, embeddings: Vec<Embedding>) -> Result<Self> {
        if chunks.is_empty() {
            return Err(RagError::Initialization(
                "Corpus produced no chunks to index".to_string(),
            ));
        }
        if chunks.len() != embeddings.len() {
            return Err(RagError::Initialization(format!(
                "Got {} embeddings for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let dimension = embeddings[0].dimension();
        if dimension == 0 {
            return Err(RagError::Initialization(
                "Embeddings have zero dimensions".to_string(),
            ));
        }

        let mut vectors = Vec::with_capacity(embeddings.len());
        for (position, embedding) in embeddings.into_iter().enumerate() {
            if embedding.dimension() != dimension {
                return Err(RagError::Initialization(format!(
                    "Embedding {} has dimension {}, expected {}",
                    position,
                    embedding.dimension(),
                    dimension
                )));
            }
            if !is_finite(&embedding.values) {
                return Err(RagError::Initialization(format!(
                    "Embedding {} contains a non-finite value",
                    position
                )));
            }
            vectors.push(embedding.values);
        }

        info!(
            "Built vector index with {} entries of dimension {}",
            chunks.len(),
            dimension
        );

        Ok(VectorIndex {
            chunks,
            vectors,
            dimension,
        })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Return at most `k` chunks, nearest first. Equal distances keep index order.
    pub fn search(&self, query: &Embedding, k: usize) -> Result<Vec<ScoredChunk>> {
        if query.dimension() != self.dimension {
            return Err(RagError::EmbeddingService(format!(
                "Query embedding has dimension {}, index expects {}",
                query.dimension(),
                self.dimension
            )));
        }
        if !is_finite(&query.values) {
            return Err(RagError::EmbeddingService(
                "Query embedding contains a non-finite value".to_string(),
            ));
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .map(|vector| squared_l2(&query.values, vector))
            .enumerate()
            .collect();

        // sort_by is stable, so ties stay in insertion order
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(position, distance)| ScoredChunk {
                chunk: self.chunks[position].clone(),
                distance,
            })
            .collect())
    }
}

fn is_finite(values: &[f32]) -> bool {
    values.iter().all(|v| v.is_finite())
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str) -> Chunk {
        Chunk {
            text: text.to_string(),
            source_id: "test.txt".to_string(),
            offset: 0,
        }
    }

    fn index(points: &[(&str, [f32; 2])]) -> VectorIndex {
        VectorIndex::build(
            points.iter().map(|(text, _)| chunk(text)).collect(),
            points
                .iter()
                .map(|(_, values)| Embedding::new(values.to_vec()))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_search_orders_by_ascending_distance() {
        let index = index(&[
            ("far", [10.0, 10.0]),
            ("near", [1.0, 0.0]),
            ("middle", [3.0, 0.0]),
            ("farther", [20.0, 0.0]),
        ]);

        let results = index.search(&Embedding::new(vec![0.0, 0.0]), 3).unwrap();

        assert_eq!(
            results.iter().map(|r| r.chunk.text.as_str()).collect::<Vec<_>>(),
            vec!["near", "middle", "far"]
        );
        assert_eq!(results[0].distance, 1.0);
        assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_search_returns_at_most_k() {
        let index = index(&[("a", [0.0, 1.0]), ("b", [1.0, 0.0])]);

        assert_eq!(index.search(&Embedding::new(vec![0.0, 0.0]), 3).unwrap().len(), 2);
        assert!(index.search(&Embedding::new(vec![0.0, 0.0]), 0).unwrap().is_empty());
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let index = index(&[
            ("first", [1.0, 0.0]),
            ("second", [0.0, 1.0]),
            ("third", [-1.0, 0.0]),
        ]);

        let results = index.search(&Embedding::new(vec![0.0, 0.0]), 3).unwrap();

        assert_eq!(
            results.iter().map(|r| r.chunk.text.as_str()).collect::<Vec<_>>(),
            vec!["first", "second", "third"]
        );
    }

    #[test]
    fn test_build_requires_one_vector_per_chunk() {
        let result = VectorIndex::build(
            vec![chunk("a"), chunk("b")],
            vec![Embedding::new(vec![1.0, 0.0])],
        );
        assert!(matches!(result, Err(RagError::Initialization(_))));
    }

    #[test]
    fn test_build_rejects_mixed_dimensions_and_empty_corpus() {
        let result = VectorIndex::build(
            vec![chunk("a"), chunk("b")],
            vec![Embedding::new(vec![1.0, 0.0]), Embedding::new(vec![1.0])],
        );
        assert!(matches!(result, Err(RagError::Initialization(_))));

        assert!(matches!(
            VectorIndex::build(Vec::new(), Vec::new()),
            Err(RagError::Initialization(_))
        ));
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let index = index(&[("a", [0.0, 1.0])]);
        assert!(matches!(
            index.search(&Embedding::new(vec![0.0, 1.0, 2.0]), 1),
            Err(RagError::EmbeddingService(_))
        ));
    }

    #[test]
    fn test_build_rejects_non_finite_values() {
        for bad in [f32::NAN, -f32::NAN, f32::INFINITY] {
            let result = VectorIndex::build(
                vec![chunk("a"), chunk("b")],
                vec![Embedding::new(vec![1.0, 0.0]), Embedding::new(vec![bad, 0.0])],
            );
            assert!(matches!(result, Err(RagError::Initialization(_))));
        }
    }

    #[test]
    fn test_non_finite_query_is_rejected() {
        let index = index(&[("a", [0.0, 1.0]), ("b", [1.0, 0.0])]);

        for bad in [-f32::NAN, f32::NEG_INFINITY] {
            assert!(matches!(
                index.search(&Embedding::new(vec![bad, 0.0]), 1),
                Err(RagError::EmbeddingService(_))
            ));
        }
    }

    #[test]
    fn test_overflowing_distance_sorts_after_finite_ones() {
        let index = index(&[("huge", [f32::MAX, 0.0]), ("near", [1.0, 0.0])]);

        let results = index.search(&Embedding::new(vec![0.0, 0.0]), 2).unwrap();

        assert_eq!(results[0].chunk.text, "near");
        assert_eq!(results[1].distance, f32::INFINITY);
    }
}
