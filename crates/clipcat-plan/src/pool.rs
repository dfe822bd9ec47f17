use std::path::PathBuf;

use clipcat_core::errors::{ClipcatError, ErrorInfo};
use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::metadata::ClipRecord;

/// Position of a clip inside the pool; equal to its insertion order.
pub type ClipIndex = usize;

/// A source clip together with its usage counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    /// Unique clip identifier.
    pub id: String,
    /// Clip duration in seconds.
    pub duration: f64,
    /// Source file, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    usage_count: usize,
}

impl Clip {
    /// Number of units the clip has been placed into so far.
    pub fn usage_count(&self) -> usize {
        self.usage_count
    }
}

/// Owns every clip of a planning run and all of their usage counters.
///
/// The pool keeps clips in insertion order; that order is the tie-breaker for
/// every deterministic choice made over the pool. Counters only move through
/// [`ClipPool::increment_usage`] and its rollback counterpart
/// [`ClipPool::revert_usage`].
#[derive(Debug, Clone, Default)]
pub struct ClipPool {
    clips: IndexMap<String, Clip>,
}

impl ClipPool {
    /// Builds a pool from metadata records.
    ///
    /// Fails when the list is empty, when an id is empty or repeated, or when
    /// a duration is not a positive finite number.
    pub fn load(records: Vec<ClipRecord>) -> Result<Self, ClipcatError> {
        if records.is_empty() {
            return Err(ClipcatError::Configuration(
                ErrorInfo::new("empty-pool", "clip metadata contains no clips")
                    .with_hint("check the metadata file or lower min_clip_duration"),
            ));
        }
        let mut clips = IndexMap::with_capacity(records.len());
        for (position, record) in records.into_iter().enumerate() {
            if record.id.is_empty() {
                return Err(ClipcatError::Configuration(
                    ErrorInfo::new("empty-clip-id", "clip id must not be empty")
                        .with_context("position", position.to_string()),
                ));
            }
            if !(record.duration.is_finite() && record.duration > 0.0) {
                return Err(ClipcatError::Configuration(
                    ErrorInfo::new("clip-duration", "clip duration must be positive")
                        .with_context("clip", record.id)
                        .with_context("duration", record.duration.to_string()),
                ));
            }
            match clips.entry(record.id.clone()) {
                Entry::Occupied(_) => {
                    return Err(ClipcatError::Configuration(
                        ErrorInfo::new("duplicate-clip", "clip ids must be unique")
                            .with_context("clip", record.id),
                    ));
                }
                Entry::Vacant(slot) => {
                    slot.insert(Clip {
                        id: record.id,
                        duration: record.duration,
                        path: record.path,
                        usage_count: 0,
                    });
                }
            }
        }
        Ok(Self { clips })
    }

    /// Number of clips in the pool.
    pub fn len(&self) -> usize {
        self.clips.len()
    }

    /// Whether the pool holds no clips.
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Returns the clip stored at `index`.
    pub fn get(&self, index: ClipIndex) -> Option<&Clip> {
        self.clips.get_index(index).map(|(_, clip)| clip)
    }

    /// Looks a clip up by id.
    pub fn clip(&self, id: &str) -> Option<&Clip> {
        self.clips.get(id)
    }

    /// Resolves a clip id to its pool index.
    pub fn index_of(&self, id: &str) -> Option<ClipIndex> {
        self.clips.get_index_of(id)
    }

    /// Iterates over clips in insertion order.
    pub fn clips(&self) -> impl ExactSizeIterator<Item = &Clip> + '_ {
        self.clips.values()
    }

    /// Current usage count of the clip, if it exists.
    pub fn usage_of(&self, id: &str) -> Option<usize> {
        self.clips.get(id).map(|clip| clip.usage_count)
    }

    /// Usage count of the clip at `index`; unknown indices report zero.
    pub fn usage_at(&self, index: ClipIndex) -> usize {
        self.get(index).map_or(0, |clip| clip.usage_count)
    }

    /// Records one placement of the clip and returns the new count.
    pub fn increment_usage(&mut self, id: &str) -> Result<usize, ClipcatError> {
        let index = self.require_index(id)?;
        self.increment_at(index)
    }

    /// Undoes one earlier [`ClipPool::increment_usage`] of the clip.
    pub fn revert_usage(&mut self, id: &str) -> Result<usize, ClipcatError> {
        let index = self.require_index(id)?;
        self.revert_at(index)
    }

    pub(crate) fn increment_at(&mut self, index: ClipIndex) -> Result<usize, ClipcatError> {
        let clip = self.slot_mut(index)?;
        clip.usage_count += 1;
        Ok(clip.usage_count)
    }

    pub(crate) fn revert_at(&mut self, index: ClipIndex) -> Result<usize, ClipcatError> {
        let clip = self.slot_mut(index)?;
        if clip.usage_count == 0 {
            return Err(ClipcatError::Configuration(
                ErrorInfo::new("usage-underflow", "cannot revert an unused clip")
                    .with_context("clip", clip.id.clone()),
            ));
        }
        clip.usage_count -= 1;
        Ok(clip.usage_count)
    }

    /// Candidates sharing the lowest usage count, in the order given.
    pub fn least_used_set(&self, candidates: &[ClipIndex]) -> Vec<ClipIndex> {
        let known: Vec<ClipIndex> = candidates
            .iter()
            .copied()
            .filter(|&index| index < self.clips.len())
            .collect();
        let Some(floor) = known.iter().map(|&index| self.usage_at(index)).min() else {
            return Vec::new();
        };
        known
            .into_iter()
            .filter(|&index| self.usage_at(index) == floor)
            .collect()
    }

    /// Picks the least used clip among `candidates`; ties go to the clip
    /// inserted first.
    pub fn least_used(&self, candidates: &[ClipIndex]) -> Option<ClipIndex> {
        self.least_used_set(candidates).into_iter().min()
    }

    /// Minimum and maximum usage count over the whole pool.
    pub fn usage_spread(&self) -> (usize, usize) {
        let mut counts = self.clips.values().map(|clip| clip.usage_count);
        let Some(first) = counts.next() else {
            return (0, 0);
        };
        counts.fold((first, first), |(min, max), count| {
            (min.min(count), max.max(count))
        })
    }

    /// Snapshot of every usage counter in insertion order.
    pub fn usage_counts(&self) -> Vec<(String, usize)> {
        self.clips
            .values()
            .map(|clip| (clip.id.clone(), clip.usage_count))
            .collect()
    }

    fn require_index(&self, id: &str) -> Result<ClipIndex, ClipcatError> {
        self.index_of(id).ok_or_else(|| {
            ClipcatError::Configuration(
                ErrorInfo::new("unknown-clip", "clip is not part of the pool")
                    .with_context("clip", id),
            )
        })
    }

    fn slot_mut(&mut self, index: ClipIndex) -> Result<&mut Clip, ClipcatError> {
        self.clips
            .get_index_mut(index)
            .map(|(_, clip)| clip)
            .ok_or_else(|| {
                ClipcatError::Configuration(
                    ErrorInfo::new("unknown-clip", "clip index out of range")
                        .with_context("index", index.to_string()),
                )
            })
    }
}
