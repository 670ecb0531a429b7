use crate::cli::Args;

/// How aggressively unused objects are removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum GarbageLevel {
    /// Write every object, reachable or not
    #[default]
    Off,
    /// Drop objects unreachable from the trailer
    Mark,
    /// Also renumber survivors into a dense object table
    Compact,
    /// Also merge structurally identical objects before compacting
    Deduplicate,
}

impl GarbageLevel {
    /// Map a repeated `-g` flag count onto a level, saturating at the strictest one
    pub fn from_count(count: u8) -> Self {
        match count {
            0 => GarbageLevel::Off,
            1 => GarbageLevel::Mark,
            2 => GarbageLevel::Compact,
            _ => GarbageLevel::Deduplicate,
        }
    }

    pub fn sweeps(&self) -> bool {
        *self >= GarbageLevel::Mark
    }

    pub fn compacts(&self) -> bool {
        *self >= GarbageLevel::Compact
    }

    pub fn deduplicates(&self) -> bool {
        *self >= GarbageLevel::Deduplicate
    }
}

/// Runtime options for one cleaning run
#[derive(Debug, Clone, Default)]
pub struct CleanOptions {
    pub garbage: GarbageLevel,
    /// Write streams fully decoded
    pub expand: bool,
    /// Hex encode streams that contain binary bytes
    pub ascii: bool,
    /// Comma separated page ranges to keep; `None` keeps the whole document
    pub pages: Option<String>,
}

impl CleanOptions {
    /// Create options from CLI arguments
    pub fn from_args(args: &Args) -> Self {
        Self {
            garbage: GarbageLevel::from_count(args.garbage),
            expand: args.decompress,
            ascii: args.ascii,
            pages: args.page_spec(),
        }
    }

    /// Objects are pretty printed when streams are expanded, so the output stays readable
    pub fn pretty(&self) -> bool {
        self.expand
    }
}
