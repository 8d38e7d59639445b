//! Nearest-neighbor recommendations over `(ratings_count, average_rating)`.
//!
//! Three independent stages: [`feature_vector`] extracts a book's point,
//! [`CandidateIndex::build`] indexes a candidate pool, and
//! [`CandidateIndex::recommend`] answers one user's favorites against it.

use std::collections::HashSet;

use libris_kernel::settings::RecommendationSettings;
use libris_vector::{IvfFlatIndex, VectorError};

use crate::modules::books::models::Book;

const DIMENSION: usize = 2;

/// A book's position in feature space, or `None` when either statistic is missing.
pub fn feature_vector(book: &Book) -> Option<[f32; DIMENSION]> {
    let point = [book.ratings_count? as f32, book.average_rating? as f32];
    point.iter().all(|x| x.is_finite()).then_some(point)
}

/// Inverted-file index over the books that can be recommended.
pub struct CandidateIndex {
    books: Vec<Book>,
    index: Option<IvfFlatIndex>,
}

impl CandidateIndex {
    /// Index every candidate that has a feature vector. The cluster count is
    /// capped at the number of indexed books.
    pub fn build(
        candidates: Vec<Book>,
        settings: &RecommendationSettings,
    ) -> Result<Self, VectorError> {
        let (books, points): (Vec<Book>, Vec<Vec<f32>>) = candidates
            .into_iter()
            .filter_map(|book| feature_vector(&book).map(|point| (book, point.to_vec())))
            .unzip();

        if books.is_empty() {
            return Ok(Self { books, index: None });
        }

        let nlist = settings.nlist.clamp(1, books.len());
        let mut index = IvfFlatIndex::new(DIMENSION, nlist).with_nprobe(settings.nprobe);
        index.train(&points)?;
        for (position, point) in points.iter().enumerate() {
            index.add(position, point)?;
        }

        tracing::debug!(candidates = books.len(), nlist, "candidate index built");
        Ok(Self {
            books,
            index: Some(index),
        })
    }

    /// Number of indexed candidates.
    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Up to `neighbors` nearest candidates per favorite, merged in favorite
    /// order, first occurrence of each book kept, cut to `limit`.
    /// Favorites without a feature vector contribute nothing.
    pub fn recommend(
        &self,
        favorites: &[Book],
        neighbors: usize,
        limit: usize,
    ) -> Result<Vec<Book>, VectorError> {
        let Some(index) = &self.index else {
            return Ok(Vec::new());
        };

        let mut seen = HashSet::new();
        let mut picked = Vec::new();
        for query in favorites.iter().filter_map(feature_vector) {
            for hit in index.search(&query, neighbors)? {
                let Some(book) = self.books.get(hit.id) else {
                    continue;
                };
                if seen.insert(book.id) {
                    picked.push(book.clone());
                }
            }
        }
        picked.truncate(limit);
        Ok(picked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(id: i64, ratings_count: Option<i64>, average_rating: Option<f64>) -> Book {
        Book {
            id,
            title: format!("Book {id}"),
            description: String::new(),
            author_id: 1,
            publication_date: None,
            average_rating,
            ratings_count,
        }
    }

    fn exhaustive() -> RecommendationSettings {
        RecommendationSettings {
            nprobe: 100,
            ..RecommendationSettings::default()
        }
    }

    #[test]
    fn feature_vector_needs_both_statistics() {
        assert_eq!(feature_vector(&book(1, Some(120), Some(4.5))), Some([120.0, 4.5]));
        assert_eq!(feature_vector(&book(1, None, Some(4.5))), None);
        assert_eq!(feature_vector(&book(1, Some(3), None)), None);
        assert_eq!(feature_vector(&book(1, Some(3), Some(f64::NAN))), None);
    }

    #[test]
    fn small_pool_clamps_cluster_count() {
        let pool = vec![book(1, Some(10), Some(4.0)), book(2, Some(20), Some(3.0))];
        let index = CandidateIndex::build(pool, &RecommendationSettings::default()).unwrap();
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn books_without_features_are_not_candidates() {
        let pool = vec![book(1, None, Some(4.0)), book(2, Some(20), None)];
        let index = CandidateIndex::build(pool, &exhaustive()).unwrap();
        assert!(index.is_empty());

        let favorites = [book(9, Some(10), Some(4.0))];
        assert!(index.recommend(&favorites, 5, 5).unwrap().is_empty());
    }

    #[test]
    fn nearest_candidates_come_first() {
        let pool = vec![
            book(1, Some(1000), Some(4.0)),
            book(2, Some(10), Some(4.1)),
            book(3, Some(12), Some(3.9)),
            book(4, Some(5000), Some(2.0)),
        ];
        let index = CandidateIndex::build(pool, &exhaustive()).unwrap();

        let picked = index.recommend(&[book(9, Some(11), Some(4.0))], 2, 5).unwrap();
        let ids: Vec<i64> = picked.iter().map(|b| b.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&2) && ids.contains(&3));
    }

    #[test]
    fn merged_results_are_deduplicated_and_limited() {
        let pool: Vec<Book> = (1..=10).map(|id| book(id, Some(id * 10), Some(4.0))).collect();
        let index = CandidateIndex::build(pool, &exhaustive()).unwrap();

        let favorites = [
            book(90, Some(30), Some(4.0)),
            book(91, Some(31), Some(4.0)),
            book(92, None, None),
        ];
        let picked = index.recommend(&favorites, 3, 5).unwrap();
        let ids: Vec<i64> = picked.iter().map(|b| b.id).collect();

        let unique: HashSet<i64> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len());
        assert!(ids.len() <= 5);
        assert_eq!(ids[0], 3);
    }
}
