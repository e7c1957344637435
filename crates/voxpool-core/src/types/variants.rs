//! Randomized clip variant sets.
//!
//! A variant set holds several takes of the same sound (footsteps, impacts,
//! UI clicks) and hands one out per play request, never the same take twice
//! in a row.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::ClipDescriptor;
use crate::{Error, Result};

/// Ordered collection of clip descriptors picked pseudo-randomly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClipVariants {
    entries: Vec<ClipDescriptor>,
    /// Index handed out by the previous pick.
    #[serde(skip)]
    last: Option<usize>,
}

impl ClipVariants {
    pub const fn new(entries: Vec<ClipDescriptor>) -> Self {
        Self {
            entries,
            last: None,
        }
    }

    pub fn entries(&self) -> &[ClipDescriptor] {
        &self.entries
    }

    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a variant.
    pub fn push(&mut self, descriptor: ClipDescriptor) {
        self.entries.push(descriptor);
    }

    /// Index returned by the most recent pick.
    pub const fn last_index(&self) -> Option<usize> {
        self.last
    }

    /// Pick a variant using the thread-local RNG.
    pub fn pick(&mut self) -> Result<&ClipDescriptor> {
        self.pick_with(&mut rand::rng())
    }

    /// Pick a variant using the supplied RNG.
    pub fn pick_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<&ClipDescriptor> {
        let index = match (self.entries.len(), self.last) {
            (0, _) => return Err(Error::EmptyVariantSet),
            (1, _) => 0,
            (n, None) => rng.random_range(0..n),
            // Draw from the n - 1 other entries and skip over the previous one.
            (n, Some(last)) => {
                let drawn = rng.random_range(0..n - 1);
                if drawn >= last {
                    drawn + 1
                } else {
                    drawn
                }
            }
        };

        self.last = Some(index);
        Ok(&self.entries[index])
    }
}

impl From<Vec<ClipDescriptor>> for ClipVariants {
    fn from(entries: Vec<ClipDescriptor>) -> Self {
        Self::new(entries)
    }
}

impl FromIterator<ClipDescriptor> for ClipVariants {
    fn from_iter<I: IntoIterator<Item = ClipDescriptor>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
