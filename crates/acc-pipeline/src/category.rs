//! Facility category descriptors.

use acc_network::PointSet;

/// One facility category: its points and the column prefix used in the
/// accessibility table.
pub struct Category {
    pub name:   String,
    pub points: PointSet,
    pub prefix: String,
}

impl Category {
    /// Category whose prefix equals its name.
    pub fn new(name: impl Into<String>, points: PointSet) -> Self {
        let name = name.into();
        Self { prefix: name.clone(), name, points }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// `{prefix}-1st` .. `{prefix}-{n}th`.
    pub fn drive_columns(&self, n: usize) -> Vec<String> {
        (1..=n).map(|k| format!("{}-{}", self.prefix, ordinal(k))).collect()
    }

    /// `{prefix}-mm-1st` .. `{prefix}-mm-{n}th`.
    pub fn multimodal_columns(&self, n: usize) -> Vec<String> {
        (1..=n).map(|k| format!("{}-mm-{}", self.prefix, ordinal(k))).collect()
    }

    pub fn straight_column(&self) -> String {
        format!("{}-straight", self.prefix)
    }
}

/// English ordinal: 1st, 2nd, 3rd, 4th, ..., 11th, 12th, 13th, 21st.
pub fn ordinal(k: usize) -> String {
    let suffix = match (k % 10, k % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{k}{suffix}")
}
