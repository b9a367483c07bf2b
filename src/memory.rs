//! Memory accounting across the three cached tiers of a bucket file.
//!
//! ```text
//!   ┌───────────────────────────── MemoryUsage ─────────────────────────────┐
//!   │  metadata   │  header                    │  body                      │
//!   │  (slot      │  (document ids, header     │  (document body blobs)     │
//!   │   table)    │   fields)                  │                            │
//!   └─────────────┴────────────────────────────┴────────────────────────────┘
//!      evicted last      evicted second              evicted first
//! ```
//!
//! All components are unsigned; subtraction saturates at zero and is
//! `debug_assert`ed never to underflow, since an underflow means the
//! accounting has drifted.

use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// One of the three independently evictable slices of a bucket file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Metadata,
    Header,
    Body,
}

impl Tier {
    /// Tiers in eviction order: cheapest to reload first.
    pub const EVICTION_ORDER: [Tier; 3] = [Tier::Body, Tier::Header, Tier::Metadata];

    /// Returns the byte count of this tier in `usage`.
    #[inline]
    pub fn of(self, usage: &MemoryUsage) -> u64 {
        match self {
            Tier::Metadata => usage.metadata,
            Tier::Header => usage.header,
            Tier::Body => usage.body,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Tier::Metadata => "metadata",
            Tier::Header => "header",
            Tier::Body => "body",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Byte counts for metadata, header and body data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct MemoryUsage {
    pub metadata: u64,
    pub header: u64,
    pub body: u64,
}

impl MemoryUsage {
    pub const ZERO: MemoryUsage = MemoryUsage::new(0, 0, 0);

    #[inline]
    pub const fn new(metadata: u64, header: u64, body: u64) -> Self {
        Self {
            metadata,
            header,
            body,
        }
    }

    /// Total bytes over all tiers. Saturates instead of wrapping.
    #[inline]
    pub fn sum(&self) -> u64 {
        self.metadata
            .saturating_add(self.header)
            .saturating_add(self.body)
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Returns a copy with `tier` and every tier evicted before it zeroed.
    ///
    /// Stripping the header also strips the body; stripping metadata leaves
    /// nothing.
    pub fn without(self, tier: Tier) -> Self {
        match tier {
            Tier::Body => Self { body: 0, ..self },
            Tier::Header => Self {
                header: 0,
                body: 0,
                ..self
            },
            Tier::Metadata => Self::ZERO,
        }
    }
}

impl Add for MemoryUsage {
    type Output = MemoryUsage;

    fn add(self, rhs: MemoryUsage) -> MemoryUsage {
        MemoryUsage {
            metadata: self.metadata.saturating_add(rhs.metadata),
            header: self.header.saturating_add(rhs.header),
            body: self.body.saturating_add(rhs.body),
        }
    }
}

impl AddAssign for MemoryUsage {
    fn add_assign(&mut self, rhs: MemoryUsage) {
        *self = *self + rhs;
    }
}

impl Sub for MemoryUsage {
    type Output = MemoryUsage;

    fn sub(self, rhs: MemoryUsage) -> MemoryUsage {
        debug_assert!(
            self.metadata >= rhs.metadata && self.header >= rhs.header && self.body >= rhs.body,
            "memory usage underflow: {} - {}",
            self,
            rhs
        );
        MemoryUsage {
            metadata: self.metadata.saturating_sub(rhs.metadata),
            header: self.header.saturating_sub(rhs.header),
            body: self.body.saturating_sub(rhs.body),
        }
    }
}

impl SubAssign for MemoryUsage {
    fn sub_assign(&mut self, rhs: MemoryUsage) {
        *self = *self - rhs;
    }
}

impl std::iter::Sum for MemoryUsage {
    fn sum<I: Iterator<Item = MemoryUsage>>(iter: I) -> MemoryUsage {
        iter.fold(MemoryUsage::ZERO, Add::add)
    }
}

impl fmt::Display for MemoryUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MemoryUsage(meta: {}, header: {}, body: {}, sum: {})",
            self.metadata,
            self.header,
            self.body,
            self.sum()
        )
    }
}
