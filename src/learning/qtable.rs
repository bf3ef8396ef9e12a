//! Keyed action-value store with explicit growth and durable encoding.

use std::collections::HashMap;
use std::io;
use std::path::Path;

use prost::Message;

use crate::control::TrafficState;
use crate::infra::Direction;
use crate::sim_interface::{QTableEntry, QTableFile};

/// Stored values for the closed action set.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActionValues {
    pub horizontal: f64,
    pub vertical: f64,
}

impl ActionValues {
    pub fn value(&self, action: Direction) -> f64 {
        match action {
            Direction::Horizontal => self.horizontal,
            Direction::Vertical => self.vertical,
        }
    }

    pub fn value_mut(&mut self, action: Direction) -> &mut f64 {
        match action {
            Direction::Horizontal => &mut self.horizontal,
            Direction::Vertical => &mut self.vertical,
        }
    }

    /// Best action; ties break deterministically to horizontal.
    pub fn best(&self) -> Direction {
        if self.vertical > self.horizontal {
            Direction::Vertical
        } else {
            Direction::Horizontal
        }
    }

    pub fn max(&self) -> f64 {
        self.horizontal.max(self.vertical)
    }
}

/// Composite table key: intersection identity plus discrete state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QKey {
    pub intersection: String,
    pub state: TrafficState,
}

impl QKey {
    pub fn new(intersection: &str, state: TrafficState) -> Self {
        Self {
            intersection: intersection.to_string(),
            state,
        }
    }
}

/// Combined action-value table for all intersections.
///
/// Reads never grow the table; only [`QTable::entry`] inserts the
/// zero-valued default, and it is called exclusively from the update
/// path.
#[derive(Debug, Default)]
pub struct QTable {
    entries: HashMap<QKey, ActionValues>,
}

impl QTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only lookup; `None` for a never-visited state.
    pub fn lookup(&self, key: &QKey) -> Option<&ActionValues> {
        self.entries.get(key)
    }

    /// Get-or-insert-default, the single growth point of the table.
    pub fn entry(&mut self, key: QKey) -> &mut ActionValues {
        self.entries.entry(key).or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn to_message(&self, profile: &str) -> QTableFile {
        let mut entries: Vec<QTableEntry> = self
            .entries
            .iter()
            .map(|(key, values)| QTableEntry {
                intersection: key.intersection.clone(),
                state: key.state.encode(),
                horizontal: values.horizontal,
                vertical: values.vertical,
            })
            .collect();
        // Stable on-disk order regardless of hash iteration.
        entries.sort_by(|a, b| {
            a.intersection
                .cmp(&b.intersection)
                .then_with(|| a.state.cmp(&b.state))
        });

        QTableFile {
            profile: profile.to_string(),
            entries,
        }
    }

    fn from_message(file: QTableFile) -> io::Result<Self> {
        let mut entries = HashMap::with_capacity(file.entries.len());
        for entry in file.entries {
            let state = TrafficState::decode(&entry.state).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("bad state tuple of length {}", entry.state.len()),
                )
            })?;
            entries.insert(
                QKey {
                    intersection: entry.intersection,
                    state,
                },
                ActionValues {
                    horizontal: entry.horizontal,
                    vertical: entry.vertical,
                },
            );
        }
        Ok(Self { entries })
    }

    /// Persists the table as one encoded blob.
    pub fn save(&self, path: &Path, profile: &str) -> io::Result<()> {
        let blob = self.to_message(profile).encode_to_vec();
        std::fs::write(path, blob)?;
        tracing::info!("Saved {} table entries to {}", self.len(), path.display());
        Ok(())
    }

    /// Loads a table persisted under the given profile. A profile tag
    /// mismatch is invalid data: the key shapes differ between
    /// profiles, so every lookup against the loaded entries would miss
    /// while the table looks populated.
    pub fn load(path: &Path, profile: &str) -> io::Result<Self> {
        let blob = std::fs::read(path)?;
        let file = QTableFile::decode(blob.as_slice())
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        if file.profile != profile {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "table at {} was trained under the '{}' profile, active profile is '{}'",
                    path.display(),
                    file.profile,
                    profile
                ),
            ));
        }
        tracing::debug!(
            "Loaded {} table entries ({} profile) from {}",
            file.entries.len(),
            file.profile,
            path.display()
        );
        Self::from_message(file)
    }
}
