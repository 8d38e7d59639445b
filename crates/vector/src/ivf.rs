use crate::{
    distance::squared_l2,
    kmeans::{nearest_centroid, KMeans},
    VectorError,
};

/// One hit from [`IvfFlatIndex::search`]; `distance` is squared L2.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub id: usize,
    pub distance: f32,
}

/// Inverted-file index storing full vectors in each list.
#[derive(Debug, Clone)]
pub struct IvfFlatIndex {
    dimension: usize,
    nlist: usize,
    nprobe: usize,
    centroids: Vec<Vec<f32>>,
    lists: Vec<Vec<(usize, Vec<f32>)>>,
    len: usize,
}

impl IvfFlatIndex {
    /// An untrained index over `dimension`-wide vectors with `nlist` clusters.
    /// Queries probe a single cluster unless [`with_nprobe`](Self::with_nprobe) says otherwise.
    pub fn new(dimension: usize, nlist: usize) -> Self {
        Self {
            dimension,
            nlist,
            nprobe: 1,
            centroids: Vec::new(),
            lists: Vec::new(),
            len: 0,
        }
    }

    pub fn with_nprobe(mut self, nprobe: usize) -> Self {
        self.nprobe = nprobe.max(1);
        self
    }

    /// Learn the coarse centroids from `data`. Retraining drops stored vectors.
    pub fn train(&mut self, data: &[Vec<f32>]) -> Result<(), VectorError> {
        if self.dimension == 0 {
            return Err(VectorError::InvalidConfig(
                "dimension must be positive".to_string(),
            ));
        }
        if let Some(point) = data.iter().find(|p| p.len() != self.dimension) {
            return Err(VectorError::DimensionMismatch {
                expected: self.dimension,
                got: point.len(),
            });
        }

        self.centroids = KMeans::new(self.nlist).fit(data)?;
        self.lists = vec![Vec::new(); self.nlist];
        self.len = 0;
        tracing::debug!(
            points = data.len(),
            nlist = self.nlist,
            "trained inverted-file index"
        );
        Ok(())
    }

    /// File `vector` under `id` in its nearest cluster.
    pub fn add(&mut self, id: usize, vector: &[f32]) -> Result<(), VectorError> {
        self.check_query(vector)?;
        let cluster = nearest_centroid(&self.centroids, vector);
        self.lists[cluster].push((id, vector.to_vec()));
        self.len += 1;
        Ok(())
    }

    /// Up to `k` stored vectors nearest to `query` among the probed clusters,
    /// closest first; equal distances order by id.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>, VectorError> {
        self.check_query(query)?;

        let mut clusters: Vec<(usize, f32)> = self
            .centroids
            .iter()
            .enumerate()
            .map(|(i, centroid)| (i, squared_l2(centroid, query)))
            .collect();
        clusters.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

        let mut hits: Vec<SearchResult> = clusters
            .iter()
            .take(self.nprobe)
            .flat_map(|&(cluster, _)| self.lists[cluster].iter())
            .map(|(id, vector)| SearchResult {
                id: *id,
                distance: squared_l2(vector, query),
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.id.cmp(&b.id)));
        hits.truncate(k);
        Ok(hits)
    }

    fn check_query(&self, vector: &[f32]) -> Result<(), VectorError> {
        if !self.is_trained() {
            return Err(VectorError::NotTrained);
        }
        if vector.len() != self.dimension {
            return Err(VectorError::DimensionMismatch {
                expected: self.dimension,
                got: vector.len(),
            });
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(VectorError::NonFinite);
        }
        Ok(())
    }

    pub fn is_trained(&self) -> bool {
        !self.centroids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Vec<Vec<f32>> {
        (0..10)
            .flat_map(|x| (0..10).map(move |y| vec![x as f32, y as f32]))
            .collect()
    }

    fn filled(nlist: usize, nprobe: usize) -> IvfFlatIndex {
        let data = grid();
        let mut index = IvfFlatIndex::new(2, nlist).with_nprobe(nprobe);
        index.train(&data).unwrap();
        for (id, point) in data.iter().enumerate() {
            index.add(id, point).unwrap();
        }
        index
    }

    #[test]
    fn exhaustive_probe_is_exact() {
        let index = filled(8, 8);
        assert_eq!(index.len(), 100);

        let hits = index.search(&[0.0, 0.0], 3).unwrap();
        let ids: Vec<usize> = hits.iter().map(|h| h.id).collect();
        // (0,0) then its two unit neighbours (0,1) and (1,0).
        assert_eq!(ids, vec![0, 1, 10]);
        assert_eq!(hits[0].distance, 0.0);
    }

    #[test]
    fn single_probe_stays_inside_one_cluster() {
        let index = filled(8, 1);
        let hits = index.search(&[4.5, 4.5], 100).unwrap();
        assert!(!hits.is_empty());
        assert!(hits.len() < 100);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn untrained_and_mismatched_queries_fail() {
        let mut index = IvfFlatIndex::new(2, 4);
        assert_eq!(index.search(&[0.0, 0.0], 1), Err(VectorError::NotTrained));
        assert_eq!(index.add(0, &[0.0, 0.0]), Err(VectorError::NotTrained));

        index.train(&grid()).unwrap();
        assert_eq!(
            index.search(&[0.0], 1),
            Err(VectorError::DimensionMismatch {
                expected: 2,
                got: 1
            })
        );
    }

    #[test]
    fn training_needs_as_many_points_as_clusters() {
        let mut index = IvfFlatIndex::new(2, 100);
        let err = index.train(&grid()[..20]).unwrap_err();
        assert_eq!(
            err,
            VectorError::InsufficientTrainingData {
                points: 20,
                clusters: 100
            }
        );
    }
}
