//! Mark-sweep garbage collection and renumbering of the object table.

mod dedup;
mod renumber;
mod sweep;

pub use dedup::{coalesce, objects_equal};
pub use renumber::{apply, plan, RenumberPlan};
pub use sweep::sweep;

/// One flag per object number: true when the object must be kept in the output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageSet {
    used: Vec<bool>,
}

impl UsageSet {
    /// Nothing marked
    pub fn new(len: usize) -> Self {
        Self {
            used: vec![false; len],
        }
    }

    /// Every slot except the free-list head marked
    pub fn all_used(len: usize) -> Self {
        let mut set = Self {
            used: vec![true; len],
        };
        if len > 0 {
            set.used[0] = false;
        }
        set
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }

    pub fn is_used(&self, num: u32) -> bool {
        self.used.get(num as usize).copied().unwrap_or(false)
    }

    /// Mark `num`; returns false when it was already marked or out of range
    pub fn mark(&mut self, num: u32) -> bool {
        match self.used.get_mut(num as usize) {
            Some(flag) if !*flag => {
                *flag = true;
                true
            }
            _ => false,
        }
    }

    pub fn unmark(&mut self, num: u32) {
        if let Some(flag) = self.used.get_mut(num as usize) {
            *flag = false;
        }
    }

    pub fn count(&self) -> usize {
        self.used.iter().filter(|u| **u).count()
    }

    /// Object numbers currently marked, ascending
    pub fn iter_used(&self) -> impl Iterator<Item = u32> + '_ {
        self.used
            .iter()
            .enumerate()
            .filter(|(_, used)| **used)
            .map(|(num, _)| num as u32)
    }
}

/// Per object number, the lower-numbered object it was merged into.
///
/// An object that was never merged maps to itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenumberMap {
    targets: Vec<u32>,
}

impl RenumberMap {
    pub fn identity(len: usize) -> Self {
        Self {
            targets: (0..len as u32).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn target(&self, num: u32) -> u32 {
        self.targets.get(num as usize).copied().unwrap_or(num)
    }

    pub fn is_fixed_point(&self, num: u32) -> bool {
        self.target(num) == num
    }

    pub fn merge(&mut self, num: u32, into: u32) {
        if let Some(slot) = self.targets.get_mut(num as usize) {
            *slot = into;
        }
    }
}
