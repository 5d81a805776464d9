//! Credit entry state.

/// Credit held for one fingerprint.
///
/// `Placeholder` is what a lookup leaves behind for a fingerprint that was
/// never seeded. It reads as zero credit and occupies capacity like any
/// other entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credit {
    /// Looked up before any backend authorization was recorded.
    Placeholder,
    /// Seeded with a batch; holds the number of backend bypasses left.
    Active(i64),
}

impl Credit {
    /// Build the state for a freshly installed batch.
    pub fn batch(size: i64) -> Self {
        if size > 0 {
            Credit::Active(size)
        } else {
            Credit::Placeholder
        }
    }

    /// Counter value as seen by a decrement. A placeholder reads as zero.
    pub fn value(&self) -> i64 {
        match self {
            Credit::Placeholder => 0,
            Credit::Active(n) => *n,
        }
    }

    /// True if a request may bypass the backend.
    pub fn is_available(&self) -> bool {
        self.value() > 0
    }
}

/// Map value: the credit plus the recency stamp of its last access.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Slot {
    pub credit: Credit,
    pub stamp: u64,
}

impl Slot {
    pub fn placeholder() -> Self {
        Self {
            credit: Credit::Placeholder,
            stamp: 0,
        }
    }

    pub fn with_credit(credit: Credit) -> Self {
        Self { credit, stamp: 0 }
    }
}
