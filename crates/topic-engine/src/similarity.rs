//! Vector similarity functions.

use topic_types::Topic;

/// Calculate cosine similarity between two vectors.
///
/// Returns value in [-1.0, 1.0] where 1.0 = identical direction.
///
/// # Panics
/// Panics if vectors have different dimensions.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "Vectors must have same dimension");

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Similarity between two topics' stored embeddings.
///
/// `None` when either topic has no embedding or the dimensions differ
/// (e.g. embeddings produced by different models).
pub fn topic_similarity(a: &Topic, b: &Topic) -> Option<f32> {
    if !a.has_embedding() || !b.has_embedding() || a.embedding.len() != b.embedding.len() {
        return None;
    }
    Some(cosine_similarity(&a.embedding, &b.embedding))
}

/// Find every unordered pair of topics with similarity >= `threshold`.
///
/// Returns `(i, j, score)` with `i < j` indexing into `topics`. O(n²), which
/// is fine for the tens-to-hundreds of topics a category holds.
pub fn similar_pairs(topics: &[Topic], threshold: f32) -> Vec<(usize, usize, f32)> {
    let mut pairs = Vec::new();
    for i in 0..topics.len() {
        for j in (i + 1)..topics.len() {
            if let Some(score) = topic_similarity(&topics[i], &topics[j]) {
                if score >= threshold {
                    pairs.push((i, j, score));
                }
            }
        }
    }
    pairs
}

/// Find the closest embedding to `embedding` among `others` at or above
/// `threshold`. Returns the index and score.
pub fn best_match<'a, I>(embedding: &[f32], others: I, threshold: f32) -> Option<(usize, f32)>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let mut best: Option<(usize, f32)> = None;
    for (idx, other) in others.into_iter().enumerate() {
        if other.len() != embedding.len() || other.is_empty() {
            continue;
        }
        let sim = cosine_similarity(embedding, other);
        if sim >= threshold && best.map_or(true, |(_, b)| sim > b) {
            best = Some((idx, sim));
        }
    }
    best
}
