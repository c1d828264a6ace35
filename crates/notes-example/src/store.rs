//! Line-oriented note storage.
//!
//! One note per line; archived notes carry an `x ` marker. The store loads
//! eagerly and saves on teardown, so handlers mutate in memory only.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;

/// A single note.
#[derive(Debug, Clone)]
pub struct Note {
    pub text: String,
    pub archived: bool,
}

/// In-memory note list backed by a plain text file.
#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    notes: Vec<Note>,
}

impl Store {
    /// Opens the store, loading existing notes if the file exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, anyhow::Error> {
        let path = path.into();
        let notes = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            raw.lines()
                .filter(|line| !line.trim().is_empty())
                .map(|line| match line.strip_prefix("x ") {
                    Some(text) => Note {
                        text: text.to_string(),
                        archived: true,
                    },
                    None => Note {
                        text: line.to_string(),
                        archived: false,
                    },
                })
                .collect()
        } else {
            Vec::new()
        };
        Ok(Self { path, notes })
    }

    /// Appends an active note.
    pub fn add(&mut self, text: impl Into<String>) {
        self.notes.push(Note {
            text: text.into(),
            archived: false,
        });
    }

    /// The active (non-archived) notes, in insertion order.
    pub fn active(&self) -> impl Iterator<Item = &Note> {
        self.notes.iter().filter(|note| !note.archived)
    }

    /// Marks every active note archived, returning how many were moved.
    pub fn archive_all(&mut self) -> usize {
        let mut moved = 0;
        for note in &mut self.notes {
            if !note.archived {
                note.archived = true;
                moved += 1;
            }
        }
        moved
    }

    /// Writes the store back to its file.
    pub fn save(&self) -> Result<(), anyhow::Error> {
        let mut out = String::new();
        for note in &self.notes {
            if note.archived {
                out.push_str("x ");
            }
            out.push_str(&note.text);
            out.push('\n');
        }
        fs::write(&self.path, out).with_context(|| format!("writing {}", self.path.display()))
    }
}
