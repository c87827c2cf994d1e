//! Review file loader.
//!
//! Reads a CSV with `Title`, `Review`, `Rating` and `Date` columns into
//! `ReviewRecord`s. Column order is free and extra columns are ignored.

use crate::types::ReviewRecord;
use pizzarag_core::{AppError, AppResult};
use std::io::Read;
use std::path::Path;

const TITLE: &str = "Title";
const REVIEW: &str = "Review";
const RATING: &str = "Rating";
const DATE: &str = "Date";

/// Positions of the required columns in the header row.
#[derive(Debug)]
struct Columns {
    title: usize,
    review: usize,
    rating: usize,
    date: usize,
}

impl Columns {
    fn locate(headers: &csv::StringRecord, source: &str) -> AppResult<Self> {
        let find = |name: &str| {
            headers.iter().position(|h| h == name).ok_or_else(|| {
                AppError::DataLoad(format!(
                    "{}: missing required column '{}' (found: {})",
                    source,
                    name,
                    headers.iter().collect::<Vec<_>>().join(", ")
                ))
            })
        };

        Ok(Self {
            title: find(TITLE)?,
            review: find(REVIEW)?,
            rating: find(RATING)?,
            date: find(DATE)?,
        })
    }
}

/// Load review records from a CSV file.
///
/// Row ids are the zero-based data row index.
pub fn load_reviews(path: &Path) -> AppResult<Vec<ReviewRecord>> {
    if !path.is_file() {
        return Err(AppError::DataLoad(format!(
            "Review file not found: {:?}",
            path
        )));
    }

    let file = std::fs::File::open(path)
        .map_err(|e| AppError::DataLoad(format!("Failed to open {:?}: {}", path, e)))?;

    let records = read_reviews(file, &path.display().to_string())?;

    tracing::info!("Loaded {} reviews from {:?}", records.len(), path);
    Ok(records)
}

/// Read review records from any CSV source; `source` names it in errors.
pub fn read_reviews<R: Read>(reader: R, source: &str) -> AppResult<Vec<ReviewRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::DataLoad(format!("{}: failed to read header: {}", source, e)))?
        .clone();
    let columns = Columns::locate(&headers, source)?;

    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let raw = result
            .map_err(|e| AppError::DataLoad(format!("{}: row {}: {}", source, row, e)))?;
        let field = |idx: usize| raw.get(idx).unwrap_or_default();

        let rating_field = field(columns.rating).trim();
        let rating: f64 = rating_field.parse().map_err(|_| {
            AppError::DataLoad(format!(
                "{}: row {}: rating '{}' is not a number",
                source, row, rating_field
            ))
        })?;

        records.push(ReviewRecord {
            id: row.to_string(),
            text: format!("{} {}", field(columns.title), field(columns.review)),
            rating,
            date: field(columns.date).to_string(),
        });
    }

    tracing::debug!("Parsed {} review rows from {}", records.len(), source);
    Ok(records)
}
