use std::fs;
use std::path::{Path, PathBuf};

use gofish_core::game::state::Action;
use gofish_core::model::rank::Rank;
use thiserror::Error;

/// One non-comment line of a move feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub line: usize,
    pub text: String,
    /// `None` when the line does not describe an ask.
    pub action: Option<Action>,
}

/// Pre-recorded moves consumed in order across a whole run.
#[derive(Debug, Clone)]
pub struct MoveFeed {
    source: Option<PathBuf>,
    entries: Vec<FeedEntry>,
    cursor: usize,
    strict: bool,
}

impl MoveFeed {
    pub fn from_path(path: impl AsRef<Path>, strict: bool) -> Result<Self, FeedError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| FeedError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut feed = Self::parse(&text, strict);
        feed.source = Some(path.to_path_buf());
        Ok(feed)
    }

    /// Accepts `Q` or `{"ask_rank":"Q"}` per line; blank lines and `#`
    /// comments are skipped.
    pub fn parse(text: &str, strict: bool) -> Self {
        let entries = text
            .lines()
            .enumerate()
            .filter_map(|(index, raw)| {
                let trimmed = raw.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    return None;
                }
                Some(FeedEntry {
                    line: index + 1,
                    text: trimmed.to_string(),
                    action: parse_action(trimmed),
                })
            })
            .collect();
        Self {
            source: None,
            entries,
            cursor: 0,
            strict,
        }
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn consumed(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.entries.len() - self.cursor
    }

    pub fn next_entry(&mut self) -> Option<FeedEntry> {
        let entry = self.entries.get(self.cursor).cloned()?;
        self.cursor += 1;
        Some(entry)
    }

    /// Errors in strict mode when lines were left unread.
    pub fn finish(&self) -> Result<(), FeedError> {
        if self.strict && self.remaining() > 0 {
            return Err(FeedError::Unconsumed {
                remaining: self.remaining(),
            });
        }
        Ok(())
    }
}

fn parse_action(text: &str) -> Option<Action> {
    if text.starts_with('{') {
        let value: serde_json::Value = serde_json::from_str(text).ok()?;
        return Action::from_value(&value).ok();
    }
    text.parse::<Rank>().ok().map(Action::ask)
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to read feed {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("feed ran out after {consumed} moves (game {game}, ply {ply})")]
    Exhausted {
        consumed: usize,
        game: usize,
        ply: usize,
    },
    #[error("feed line {line} ('{text}') is not a legal move (game {game}, ply {ply})")]
    Illegal {
        line: usize,
        text: String,
        game: usize,
        ply: usize,
    },
    #[error("{remaining} feed lines were not consumed")]
    Unconsumed { remaining: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = "# opening\nQ\n\n{\"ask_rank\":\"10\"}\n  k  \nnot-a-move\n";

    #[test]
    fn parses_bare_ranks_and_json_lines() {
        let mut feed = MoveFeed::parse(FEED, true);
        assert_eq!(feed.len(), 4);
        let first = feed.next_entry().unwrap();
        assert_eq!(first.line, 2);
        assert_eq!(first.action, Some(Action::ask(Rank::Queen)));
        assert_eq!(feed.next_entry().unwrap().action, Some(Action::ask(Rank::Ten)));
        assert_eq!(feed.next_entry().unwrap().action, Some(Action::ask(Rank::King)));
        let bad = feed.next_entry().unwrap();
        assert_eq!(bad.line, 6);
        assert!(bad.action.is_none());
        assert!(feed.next_entry().is_none());
        assert!(feed.finish().is_ok());
    }

    #[test]
    fn strict_feeds_reject_leftovers() {
        let mut feed = MoveFeed::parse("A\n2\n", true);
        feed.next_entry();
        assert!(matches!(feed.finish(), Err(FeedError::Unconsumed { remaining: 1 })));

        let lenient = MoveFeed::parse("A\n2\n", false);
        assert!(lenient.finish().is_ok());
    }

    #[test]
    fn reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("moves.txt");
        fs::write(&path, "7\n8\n").unwrap();
        let feed = MoveFeed::from_path(&path, false).unwrap();
        assert_eq!(feed.len(), 2);
        assert_eq!(feed.source(), Some(path.as_path()));
        assert!(MoveFeed::from_path(dir.path().join("missing"), true).is_err());
    }
}
