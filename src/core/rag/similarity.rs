//! Cosine similarity over embedding vectors.
//!
//! The knowledge base does a brute-force linear scan with this measure; there
//! is no index structure, which is acceptable only at the small corpus sizes
//! this service handles (a handful of PDFs and pages).

/// Cosine similarity between two vectors.
///
/// Defined as 0.0 when either vector is empty or has zero magnitude, so
/// unembedded chunks (embedding failures store an empty vector) simply never
/// score.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut mag_a = 0.0f32;
    let mut mag_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        mag_a += x * x;
        mag_b += y * y;
    }

    let mag_a = mag_a.sqrt();
    let mag_b = mag_b.sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}
