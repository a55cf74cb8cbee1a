use std::path::PathBuf;

use uuid::Uuid;

use crate::domain::services::source_processor::SourceProcessingError;

/// A PDF to ingest: a local file or a remote URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    File(PathBuf),
    Url(String),
}

impl Source {
    /// Splits a comma separated CLI list, ignoring blank items
    pub fn files_from_list(list: &str) -> Vec<Source> {
        split_list(list).map(|item| Source::File(item.into())).collect()
    }

    pub fn urls_from_list(list: &str) -> Vec<Source> {
        split_list(list).map(|item| Source::Url(item.to_string())).collect()
    }
}

fn split_list(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|item| !item.is_empty())
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::File(path) => write!(f, "{}", path.display()),
            Source::Url(url) => url.fmt(f),
        }
    }
}

/// What happened to one source during a run
#[derive(Debug)]
pub struct SourceReport {
    pub source: Source,
    pub outcome: Result<ProcessedSource, SourceProcessingError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedSource {
    pub summary: String,
    /// Id of the summary vector in the vector index
    pub point_id: Uuid,
}
