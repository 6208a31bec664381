//! Best-pair embedding similarity between groups of vectors.

use crate::error::{Error, Result};
use crate::inference::EmbeddingClass;
use crate::store::{IndividualId, SightingId, Store};
use ndarray::{Array2, s};
use std::ops::Range;

/// Embeddings owned by one entity (a query sighting or a candidate individual).
pub type EmbeddingGroup = Vec<Vec<f32>>;

/// Stack groups into one matrix, remembering each group's row range.
fn stack(groups: &[EmbeddingGroup], dim: usize) -> Result<(Array2<f32>, Vec<Range<usize>>)> {
    let rows: usize = groups.iter().map(Vec::len).sum();
    let mut data = Vec::with_capacity(rows * dim);
    let mut ranges = Vec::with_capacity(groups.len());
    let mut start = 0;
    for group in groups {
        for vector in group {
            if vector.len() != dim {
                return Err(Error::EmbeddingDimension {
                    expected: dim,
                    actual: vector.len(),
                });
            }
            data.extend_from_slice(vector);
        }
        ranges.push(start..start + group.len());
        start += group.len();
    }
    let matrix = Array2::from_shape_vec((rows, dim), data).map_err(|e| Error::Internal {
        message: e.to_string(),
    })?;
    Ok((matrix, ranges))
}

/// `(queries x candidates)` matrix of `0.5 + max(q . c) / 2` over every vector
/// pair between a query group and a candidate group.
///
/// An entry is NaN when either group is empty. All dot products come from a
/// single matrix multiplication; each entry is a group-wise maximum over one
/// block of it.
pub fn embedding_scores(
    queries: &[EmbeddingGroup],
    candidates: &[EmbeddingGroup],
) -> Result<Array2<f64>> {
    let mut scores = Array2::from_elem((queries.len(), candidates.len()), f64::NAN);
    let Some(dim) = queries
        .iter()
        .chain(candidates)
        .flatten()
        .map(Vec::len)
        .next()
    else {
        return Ok(scores);
    };

    let (q, q_ranges) = stack(queries, dim)?;
    let (c, c_ranges) = stack(candidates, dim)?;
    let similarity = q.dot(&c.t());

    for (i, qr) in q_ranges.iter().enumerate() {
        if qr.is_empty() {
            continue;
        }
        for (j, cr) in c_ranges.iter().enumerate() {
            if cr.is_empty() {
                continue;
            }
            let best = similarity
                .slice(s![qr.clone(), cr.clone()])
                .fold(f32::NEG_INFINITY, |acc, &v| acc.max(v));
            scores[[i, j]] = 0.5 + f64::from(best) / 2.0;
        }
    }
    Ok(scores)
}

/// Embeddings of `class` reachable through a sighting's ground-truth boxes.
pub fn sighting_embeddings(
    store: &dyn Store,
    sighting: SightingId,
    class: EmbeddingClass,
) -> Result<EmbeddingGroup> {
    let boxes = store.boxes_for_sightings(&[sighting])?;
    collect(store, &boxes.iter().map(|b| b.id).collect::<Vec<_>>(), class)
}

/// Embeddings of `class` reachable through any sighting of an individual.
pub fn individual_embeddings(
    store: &dyn Store,
    individual: IndividualId,
    class: EmbeddingClass,
) -> Result<EmbeddingGroup> {
    let boxes = store.boxes_for_individual(individual)?;
    collect(store, &boxes.iter().map(|b| b.id).collect::<Vec<_>>(), class)
}

fn collect(
    store: &dyn Store,
    boxes: &[crate::store::GroundTruthId],
    class: EmbeddingClass,
) -> Result<EmbeddingGroup> {
    if boxes.is_empty() {
        return Ok(Vec::new());
    }
    let detections: Vec<_> = store
        .detections_for_ground_truth(boxes)?
        .iter()
        .map(|d| d.id)
        .collect();
    Ok(store
        .embeddings_for_detections(&detections, class)?
        .into_iter()
        .map(|e| e.vector)
        .collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn unit(x: f32, y: f32) -> Vec<f32> {
        let n = x.hypot(y);
        vec![x / n, y / n]
    }

    #[test]
    fn test_best_pair_is_rescaled() {
        let queries = vec![vec![unit(1.0, 0.0)]];
        let candidates = vec![
            vec![unit(0.0, 1.0), unit(1.0, 0.0)],
            vec![unit(-1.0, 0.0)],
        ];
        let scores = embedding_scores(&queries, &candidates).unwrap();
        assert!((scores[[0, 0]] - 1.0).abs() < 1e-6);
        assert!(scores[[0, 1]].abs() < 1e-6);
    }

    #[test]
    fn test_empty_query_row_is_nan() {
        let queries = vec![Vec::new(), vec![unit(0.0, 1.0)]];
        let candidates = vec![vec![unit(0.0, 1.0)], Vec::new()];
        let scores = embedding_scores(&queries, &candidates).unwrap();
        assert!(scores.row(0).iter().all(|v| v.is_nan()));
        assert!((scores[[1, 0]] - 1.0).abs() < 1e-6);
        assert!(scores[[1, 1]].is_nan());
    }

    #[test]
    fn test_no_embeddings_at_all() {
        let scores = embedding_scores(&[Vec::new()], &[Vec::new(), Vec::new()]).unwrap();
        assert_eq!(scores.dim(), (1, 2));
        assert!(scores.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_orthogonal_pair_scores_half() {
        let scores =
            embedding_scores(&[vec![unit(1.0, 0.0)]], &[vec![unit(0.0, 1.0)]]).unwrap();
        assert!((scores[[0, 0]] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_dimension_mismatch() {
        let err = embedding_scores(&[vec![vec![1.0, 0.0]]], &[vec![vec![1.0, 0.0, 0.0]]])
            .unwrap_err();
        assert!(matches!(
            err,
            Error::EmbeddingDimension {
                expected: 2,
                actual: 3
            }
        ));
    }
}
