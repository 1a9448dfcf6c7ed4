//! Dense internal identifiers for graph nodes, edges, and input points.
//!
//! Each is a `u32` newtype that sorts and hashes like its integer, so ids
//! key maps and ascending lists directly.  `.index()` turns one into a
//! column offset.

use std::fmt;

/// Declares one id newtype with its sentinel and conversions.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[derive(serde::Serialize, serde::Deserialize)]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no valid ID".
            pub const INVALID: $name = $name(<$inner>::MAX);

            /// Position in the columns this id indexes.
            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl Default for $name {
            /// `INVALID`.
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<$name> for usize {
            #[inline(always)]
            fn from(id: $name) -> usize {
                id.0 as usize
            }
        }

        impl TryFrom<usize> for $name {
            type Error = std::num::TryFromIntError;
            fn try_from(n: usize) -> Result<$name, Self::Error> {
                <$inner>::try_from(n).map($name)
            }
        }
    };
}

typed_id! {
    /// Dense index of a road-network node.
    ///
    /// Assigned in ascending order of the external node id, so comparing
    /// `NodeId`s orders nodes the same way the source data does.
    pub struct NodeId(u32);
}

typed_id! {
    /// Index of a directed road-network edge (position in CSR order).
    pub struct EdgeId(u32);
}

typed_id! {
    /// Position of a record within its point set.
    pub struct PointId(u32);
}
