//! When to rebuild the Barnes-Hut quadtree.
//!
//! Rebuilding every step keeps repulsion exact with respect to the current positions; rebuilding
//! less often trades staleness for speed.

use crate::error::{Error, Result};

pub trait UpdateSchedule {
    /// Returns `true` when `step` is the next scheduled update, then advances the schedule.
    ///
    /// Steps must be queried in increasing order. A scheduled step that is never queried is not
    /// caught up later.
    fn is_time_to_update(&mut self, step: usize) -> bool;
}

/// Fires at steps `0, k, 2k, ...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantSchedule {
    increment: usize,
    next: usize,
}

impl ConstantSchedule {
    pub fn new(increment: usize) -> Result<Self> {
        if increment == 0 {
            return Err(Error::InvalidSchedule { increment });
        }
        Ok(Self { increment, next: 0 })
    }

    pub fn increment(&self) -> usize {
        self.increment
    }
}

impl UpdateSchedule for ConstantSchedule {
    fn is_time_to_update(&mut self, step: usize) -> bool {
        if step == self.next {
            self.next += self.increment;
            true
        } else {
            false
        }
    }
}
