//! Vector math used for scoring and cluster statistics.

/// Cosine similarity in [-1, 1]. Zero vectors and mismatched lengths score 0.
///
/// Accumulates in f64 so a vector compared with itself scores exactly 1.0,
/// whatever its norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let (mut dot, mut na2, mut nb2) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        na2 += x * x;
        nb2 += y * y;
    }
    if na2 == 0.0 || nb2 == 0.0 {
        return 0.0;
    }
    (dot / (na2 * nb2).sqrt()).clamp(-1.0, 1.0) as f32
}

/// Euclidean norm
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Calculate centroid (average) of multiple embeddings
pub fn calculate_centroid(embeddings: &[Vec<f32>]) -> Vec<f32> {
    if embeddings.is_empty() {
        return Vec::new();
    }

    let dim = embeddings[0].len();
    let mut centroid = vec![0.0; dim];

    for emb in embeddings {
        for (i, val) in emb.iter().enumerate().take(dim) {
            centroid[i] += val;
        }
    }

    let n = embeddings.len() as f32;
    for val in centroid.iter_mut() {
        *val /= n;
    }

    centroid
}

/// Mean and max similarity of `query` against every member.
/// Returns `None` for an empty member list.
pub fn score_members(query: &[f32], members: &[Vec<f32>]) -> Option<(f32, f32)> {
    if members.is_empty() {
        return None;
    }

    let mut sum = 0.0f32;
    let mut max = f32::NEG_INFINITY;
    for member in members {
        let sim = cosine_similarity(query, member);
        sum += sim;
        max = max.max(sim);
    }

    Some((sum / members.len() as f32, max))
}

/// Average similarity over all unique pairs; 0 when there are fewer than two members.
pub fn mean_pairwise_similarity(members: &[Vec<f32>]) -> f32 {
    let mut sum = 0.0f32;
    let mut pairs = 0usize;
    for (i, a) in members.iter().enumerate() {
        for b in &members[i + 1..] {
            sum += cosine_similarity(a, b);
            pairs += 1;
        }
    }

    if pairs == 0 {
        0.0
    } else {
        sum / pairs as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_sim() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![2.0, 0.0, 0.0];
        let c = vec![0.0, 1.0, 0.0];
        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&a, &c), 0.0);
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_self_similarity_is_exactly_one() {
        for v in [
            vec![0.1f32, 0.2, 0.3],
            vec![3.7, -1.25, 0.001, 42.0],
            vec![1e-3, 2e-3],
        ] {
            assert_eq!(cosine_similarity(&v, &v), 1.0);
        }
        let (mean, max) = score_members(&[0.1, 0.2, 0.3], &[vec![0.1, 0.2, 0.3]]).unwrap();
        assert_eq!((mean, max), (1.0, 1.0));
    }

    #[test]
    fn test_cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_centroid_and_norm() {
        let members = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let centroid = calculate_centroid(&members);
        assert_eq!(centroid, vec![0.5, 0.5]);
        assert!((l2_norm(&centroid) - 0.5f32.sqrt()).abs() < 1e-6);
        assert!(calculate_centroid(&[]).is_empty());
    }

    #[test]
    fn test_score_members_mean_and_max() {
        let members = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let (mean, max) = score_members(&[1.0, 0.0], &members).unwrap();
        assert!((mean - 0.5).abs() < 1e-6);
        assert!((max - 1.0).abs() < 1e-6);
        assert!(score_members(&[1.0, 0.0], &[]).is_none());
    }

    #[test]
    fn test_mean_pairwise() {
        assert_eq!(mean_pairwise_similarity(&[vec![1.0, 0.0]]), 0.0);
        assert_eq!(mean_pairwise_similarity(&[]), 0.0);

        // pairs: (a,b)=1, (a,c)=0, (b,c)=0
        let members = vec![vec![1.0, 0.0], vec![3.0, 0.0], vec![0.0, 2.0]];
        assert!((mean_pairwise_similarity(&members) - 1.0 / 3.0).abs() < 1e-6);
    }
}
