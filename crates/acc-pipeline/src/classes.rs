//! Composite score and quartile accessibility classes.
//!
//! The composite of an origin is the mean, over categories, of its
//! 1st-nearest multimodal cost, so the walking leg to the road is counted
//! once per category.  It is the fail value when any category is
//! unreachable.
//!
//! `{prefix}-straight` columns are not part of the composite.  They are
//! always metres, while the multimodal columns are seconds or minutes under
//! the time weight, and a mean across the two would mix units.  The
//! composite therefore stays in the unit of the cost columns.
//!
//! Classes split the reached composites at their 25th, 50th, and 75th
//! percentiles (linear interpolation between order statistics):
//!
//! | Composite            | Class                    |
//! |----------------------|--------------------------|
//! | `<= p25`             | high accessibility       |
//! | `<= p50`             | average accessibility    |
//! | `<= p75`             | low accessibility        |
//! | above, or fail value | no accessibility         |

use acc_core::FailValue;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AccessClass {
    High,
    Average,
    Low,
    NoAccess,
}

impl AccessClass {
    pub fn label(self) -> &'static str {
        match self {
            AccessClass::High     => "high accessibility",
            AccessClass::Average  => "average accessibility",
            AccessClass::Low      => "low accessibility",
            AccessClass::NoAccess => "no accessibility",
        }
    }
}

impl std::fmt::Display for AccessClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Mean of the per-category costs, or the fail value if any is unreached.
pub fn composite(costs: &[f64], fail: FailValue) -> f64 {
    if costs.is_empty() || costs.iter().any(|&c| fail.is_fail(c)) {
        return fail.value();
    }
    costs.iter().sum::<f64>() / costs.len() as f64
}

/// Percentile `q` in `[0, 1]` of an ascending slice, interpolating linearly.
pub fn percentile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Class boundaries computed from one run's composites.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ClassBreaks {
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
}

impl ClassBreaks {
    /// Breaks over the reached values of `composites`.  `None` when nothing
    /// was reached.
    pub fn from_composites(composites: impl IntoIterator<Item = f64>, fail: FailValue) -> Option<Self> {
        let mut reached: Vec<f64> = composites.into_iter().filter(|&c| fail.is_reached(c)).collect();
        reached.sort_by(f64::total_cmp);
        Some(Self {
            p25: percentile(&reached, 0.25)?,
            p50: percentile(&reached, 0.50)?,
            p75: percentile(&reached, 0.75)?,
        })
    }

    pub fn classify(&self, composite: f64, fail: FailValue) -> AccessClass {
        if fail.is_fail(composite) {
            AccessClass::NoAccess
        } else if composite <= self.p25 {
            AccessClass::High
        } else if composite <= self.p50 {
            AccessClass::Average
        } else if composite <= self.p75 {
            AccessClass::Low
        } else {
            AccessClass::NoAccess
        }
    }
}
