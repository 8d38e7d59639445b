//! Bulk import of authors and books from a zip archive.
//!
//! Both JSON documents are read straight out of the archive and fully parsed
//! before anything is written, so a malformed archive leaves the catalog
//! untouched. Writes are not wrapped in a transaction.

pub mod records;

use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, Read, Seek},
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::de::DeserializeOwned;
use thiserror::Error;
use time::Date;
use zip::{result::ZipError, ZipArchive};

use libris_db::DbPool;

use crate::modules::{
    authors::{models::NewAuthor, store as authors},
    books::{models::NewBook, store as books},
};
use records::{AuthorRecord, BookRecord, SourceId};

pub const AUTHORS_ENTRY: &str = "authors.json";
pub const BOOKS_ENTRY: &str = "books.json";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read archive: {0}")]
    Archive(#[from] ZipError),

    #[error("could not find {0} in the zip file")]
    MissingEntry(&'static str),

    #[error("{entry} is not a valid JSON array of records: {source}")]
    Parse {
        entry: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("record {index} of {entry} is invalid: {reason}")]
    InvalidRecord {
        entry: String,
        index: usize,
        reason: String,
    },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Counts reported after a successful load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub authors_created: usize,
    pub authors_reused: usize,
    pub books_created: usize,
    /// Books whose author id matched no record in the authors document.
    pub books_skipped: usize,
}

struct PendingBook {
    record: BookRecord,
    publication_date: Option<Date>,
}

/// Load `authors.json` and `books.json` from the archive at `path`.
pub async fn load_data_from_zip(db: &DbPool, path: &Path) -> Result<LoadSummary, LoadError> {
    let owned = path.to_path_buf();
    let parsed = tokio::task::spawn_blocking(move || read_archive(&owned))
        .await
        .context("archive reader task failed")?;
    let (author_records, pending_books) = parsed?;

    tracing::info!(
        path = %path.display(),
        authors = author_records.len(),
        books = pending_books.len(),
        "archive parsed"
    );

    let mut summary = LoadSummary::default();
    let mut author_ids: HashMap<SourceId, i64> = HashMap::with_capacity(author_records.len());

    for record in author_records {
        let author_id = match authors::find_by_name(db, &record.name).await? {
            Some(existing) => {
                summary.authors_reused += 1;
                existing.id
            }
            None => {
                let created = authors::insert(
                    db,
                    &NewAuthor {
                        name: record.name,
                        ratings_count: record.ratings_count,
                        average_rating: record.average_rating,
                        about: record.about.unwrap_or_default(),
                    },
                )
                .await?;
                summary.authors_created += 1;
                created.id
            }
        };
        author_ids.insert(record.id, author_id);
    }

    for PendingBook {
        record,
        publication_date,
    } in pending_books
    {
        let Some(&author_id) = author_ids.get(&record.author_id) else {
            tracing::warn!(
                title = %record.title,
                source_author_id = %record.author_id,
                "skipping book with unknown author"
            );
            summary.books_skipped += 1;
            continue;
        };

        books::insert(
            db,
            &NewBook {
                title: record.title,
                description: record.description.unwrap_or_default(),
                author_id,
                publication_date,
                average_rating: record.average_rating,
                ratings_count: record.ratings_count,
            },
        )
        .await?;
        summary.books_created += 1;
    }

    Ok(summary)
}

fn read_archive(path: &Path) -> Result<(Vec<AuthorRecord>, Vec<PendingBook>), LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;

    let authors_index = find_entry(&mut archive, AUTHORS_ENTRY)?;
    let books_index = find_entry(&mut archive, BOOKS_ENTRY)?;

    let author_records: Vec<AuthorRecord> = read_entry(&mut archive, authors_index)?;
    let book_records: Vec<BookRecord> = read_entry(&mut archive, books_index)?;

    let pending_books = book_records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let publication_date = record.parsed_publication_date().map_err(|err| {
                LoadError::InvalidRecord {
                    entry: BOOKS_ENTRY.to_string(),
                    index,
                    reason: format!("publication_date: {err}"),
                }
            })?;
            Ok(PendingBook {
                record,
                publication_date,
            })
        })
        .collect::<Result<Vec<_>, LoadError>>()?;

    Ok((author_records, pending_books))
}

/// Index of the first entry whose name contains `needle`.
fn find_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    needle: &'static str,
) -> Result<usize, LoadError> {
    for index in 0..archive.len() {
        if archive.by_index_raw(index)?.name().contains(needle) {
            return Ok(index);
        }
    }
    Err(LoadError::MissingEntry(needle))
}

fn read_entry<R: Read + Seek, T: DeserializeOwned>(
    archive: &mut ZipArchive<R>,
    index: usize,
) -> Result<Vec<T>, LoadError> {
    let entry = archive.by_index(index)?;
    let name = entry.name().to_string();
    serde_json::from_reader(BufReader::new(entry)).map_err(|source| LoadError::Parse {
        entry: name,
        source,
    })
}
