//! On-disk storage for wiki entries.
//!
//! Each entry is a markdown file at `{dir}/{title}.md`. Titles are matched
//! without regard to case, so `Python` and `python` name the same entry.

use std::io::ErrorKind;
use std::path::PathBuf;

use rand::seq::IndexedRandom;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

const MAX_TITLE_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum WikiError {
    #[error("Title must be 1-64 letters, digits, spaces, '-', '_' or '.'")]
    InvalidTitle,

    #[error("An entry with this title already exists.")]
    AlreadyExists,

    #[error("Page not found")]
    NotFound,

    #[error("entry storage error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WikiError>;

/// Outcome of a search: either the query names an entry, or the entries
/// containing it.
#[derive(Debug, PartialEq, Eq)]
pub enum SearchResult {
    Exact(String),
    Partial(Vec<String>),
}

pub struct EntryStore {
    dir: PathBuf,
}

impl EntryStore {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Wiki entry directory: {}", dir.display());
        Ok(Self { dir })
    }

    fn entry_path(&self, title: &str) -> PathBuf {
        self.dir.join(format!("{title}.md"))
    }

    /// All entry titles, sorted.
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut titles = Vec::new();
        let mut dir = fs::read_dir(&self.dir).await?;
        while let Some(item) = dir.next_entry().await? {
            let name = item.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(title) = name.strip_suffix(".md") {
                if validate_title(title).is_ok() {
                    titles.push(title.to_string());
                }
            }
        }
        titles.sort();
        Ok(titles)
    }

    /// The stored spelling of `title`, if an entry matches it.
    async fn resolve(&self, title: &str) -> Result<Option<String>> {
        let wanted = title.to_lowercase();
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|t| t.to_lowercase() == wanted))
    }

    /// Returns the stored title together with the entry's markdown.
    pub async fn get(&self, title: &str) -> Result<(String, String)> {
        validate_title(title).map_err(|_| WikiError::NotFound)?;
        let stored = self.resolve(title).await?.ok_or(WikiError::NotFound)?;
        match fs::read_to_string(self.entry_path(&stored)).await {
            Ok(content) => Ok((stored, content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(WikiError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn create(&self, title: &str, content: &str) -> Result<()> {
        validate_title(title)?;
        if self.resolve(title).await?.is_some() {
            return Err(WikiError::AlreadyExists);
        }

        // create_new guards the race between the check above and the write.
        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        let file = options.open(self.entry_path(title)).await;
        let mut file = match file {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Err(WikiError::AlreadyExists),
            Err(e) => return Err(e.into()),
        };

        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        debug!("Created wiki entry {}", title);
        Ok(())
    }

    /// Replaces the content of an existing entry. Returns the stored title.
    pub async fn update(&self, title: &str, content: &str) -> Result<String> {
        validate_title(title).map_err(|_| WikiError::NotFound)?;
        let stored = self.resolve(title).await?.ok_or(WikiError::NotFound)?;
        fs::write(self.entry_path(&stored), content).await?;
        debug!("Updated wiki entry {}", stored);
        Ok(stored)
    }

    pub async fn search(&self, query: &str) -> Result<SearchResult> {
        let query = query.trim().to_lowercase();
        let titles = self.list().await?;

        if let Some(exact) = titles.iter().find(|t| t.to_lowercase() == query) {
            return Ok(SearchResult::Exact(exact.clone()));
        }

        let matches = titles
            .into_iter()
            .filter(|t| t.to_lowercase().contains(&query))
            .collect();
        Ok(SearchResult::Partial(matches))
    }

    /// A uniformly chosen title, or `None` for an empty wiki.
    pub async fn random(&self) -> Result<Option<String>> {
        let titles = self.list().await?;
        Ok(titles.choose(&mut rand::rng()).cloned())
    }
}

fn validate_title(title: &str) -> Result<()> {
    let valid = !title.is_empty()
        && title.chars().count() <= MAX_TITLE_LEN
        && !title.starts_with('.')
        && title.trim() == title
        && title
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.'));
    if valid { Ok(()) } else { Err(WikiError::InvalidTitle) }
}
