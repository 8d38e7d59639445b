//! Lloyd's k-means, used to train the coarse quantizer.

use crate::{distance::squared_l2, VectorError};

const MAX_ITERATIONS: usize = 25;

#[derive(Debug, Clone)]
pub struct KMeans {
    k: usize,
}

impl KMeans {
    pub fn new(k: usize) -> Self {
        Self { k }
    }

    /// Cluster `data` and return `k` centroids.
    ///
    /// Seeds are taken at evenly spaced positions of `data`, so the result is
    /// deterministic for a given input order. A cluster that loses all its
    /// members keeps its previous centroid.
    pub fn fit(&self, data: &[Vec<f32>]) -> Result<Vec<Vec<f32>>, VectorError> {
        if self.k == 0 {
            return Err(VectorError::InvalidConfig("k must be positive".to_string()));
        }
        if data.len() < self.k {
            return Err(VectorError::InsufficientTrainingData {
                points: data.len(),
                clusters: self.k,
            });
        }
        let dimension = data[0].len();
        for point in data {
            if point.len() != dimension {
                return Err(VectorError::DimensionMismatch {
                    expected: dimension,
                    got: point.len(),
                });
            }
            if point.iter().any(|x| !x.is_finite()) {
                return Err(VectorError::NonFinite);
            }
        }

        let n = data.len();
        let mut centroids: Vec<Vec<f32>> = (0..self.k).map(|i| data[i * n / self.k].clone()).collect();
        let mut assignment = vec![usize::MAX; n];

        for iteration in 0..MAX_ITERATIONS {
            let mut changed = false;
            for (slot, point) in assignment.iter_mut().zip(data) {
                let nearest = nearest_centroid(&centroids, point);
                if *slot != nearest {
                    *slot = nearest;
                    changed = true;
                }
            }
            if !changed {
                tracing::trace!(iteration, "k-means converged");
                break;
            }

            let mut sums = vec![vec![0.0f64; dimension]; self.k];
            let mut counts = vec![0usize; self.k];
            for (&cluster, point) in assignment.iter().zip(data) {
                counts[cluster] += 1;
                for (sum, &x) in sums[cluster].iter_mut().zip(point) {
                    *sum += f64::from(x);
                }
            }
            for ((centroid, sum), &count) in centroids.iter_mut().zip(&sums).zip(&counts) {
                if count == 0 {
                    continue;
                }
                for (c, &s) in centroid.iter_mut().zip(sum) {
                    *c = (s / count as f64) as f32;
                }
            }
        }

        Ok(centroids)
    }
}

/// Index of the centroid closest to `point`; ties go to the lower index.
pub(crate) fn nearest_centroid(centroids: &[Vec<f32>], point: &[f32]) -> usize {
    let mut best = 0;
    let mut best_distance = f32::INFINITY;
    for (i, centroid) in centroids.iter().enumerate() {
        let distance = squared_l2(centroid, point);
        if distance < best_distance {
            best = i;
            best_distance = distance;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separates_two_blobs() {
        let data = vec![
            vec![0.0, 0.0],
            vec![0.2, 0.1],
            vec![0.1, 0.3],
            vec![10.0, 10.0],
            vec![10.2, 9.9],
            vec![9.8, 10.1],
        ];
        let mut centroids = KMeans::new(2).fit(&data).unwrap();
        centroids.sort_by(|a, b| a[0].total_cmp(&b[0]));

        assert!(centroids[0][0] < 1.0 && centroids[0][1] < 1.0);
        assert!(centroids[1][0] > 9.0 && centroids[1][1] > 9.0);
    }

    #[test]
    fn rejects_small_or_bad_input() {
        let data = vec![vec![1.0, 2.0]];
        assert_eq!(
            KMeans::new(2).fit(&data),
            Err(VectorError::InsufficientTrainingData {
                points: 1,
                clusters: 2
            })
        );

        let ragged = vec![vec![1.0, 2.0], vec![1.0]];
        assert!(matches!(
            KMeans::new(1).fit(&ragged),
            Err(VectorError::DimensionMismatch { .. })
        ));

        let nan = vec![vec![f32::NAN, 1.0]];
        assert_eq!(KMeans::new(1).fit(&nan), Err(VectorError::NonFinite));
    }

    #[test]
    fn duplicate_points_keep_all_centroids() {
        let data = vec![vec![1.0, 1.0]; 4];
        let centroids = KMeans::new(3).fit(&data).unwrap();
        assert_eq!(centroids.len(), 3);
        assert!(centroids.iter().all(|c| c == &vec![1.0, 1.0]));
    }
}
