//! Inverted-file (IVF-flat) approximate nearest neighbor search.
//!
//! Vectors are partitioned into `nlist` coarse clusters by k-means. A query
//! scans only the `nprobe` clusters whose centroids are closest to it and
//! ranks their members by exact squared Euclidean distance.
//!
//! ```
//! use libris_vector::IvfFlatIndex;
//!
//! let points = vec![vec![0.0, 0.0], vec![0.1, 0.0], vec![9.0, 9.0], vec![9.1, 9.0]];
//! let mut index = IvfFlatIndex::new(2, 2).with_nprobe(2);
//! index.train(&points).unwrap();
//! for (id, point) in points.iter().enumerate() {
//!     index.add(id, point).unwrap();
//! }
//!
//! let hits = index.search(&[9.05, 9.0], 2).unwrap();
//! assert_eq!(hits.len(), 2);
//! assert!(hits.iter().all(|hit| hit.id >= 2));
//! ```

mod distance;
mod error;
mod ivf;
mod kmeans;

pub use distance::squared_l2;
pub use error::VectorError;
pub use ivf::{IvfFlatIndex, SearchResult};
pub use kmeans::KMeans;
