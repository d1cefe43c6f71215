//! Fixed interpretation policy for p-values and correlations.
//!
//! Every report renders p-values and correlation strengths through
//! these functions so the wording is identical across the whole
//! analysis surface.

use std::fmt;

/// Significance label assigned to a p-value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Significance {
    /// p < 0.001
    Extremely,
    /// p < 0.01
    Highly,
    /// p < 0.05
    Significant,
    /// p >= 0.05
    NotSignificant,
}

impl Significance {
    /// Classifies a p-value against the fixed 0.001 / 0.01 / 0.05
    /// thresholds.
    pub fn from_p(p: f64) -> Self {
        if p < 0.001 {
            Self::Extremely
        } else if p < 0.01 {
            Self::Highly
        } else if p < 0.05 {
            Self::Significant
        } else {
            Self::NotSignificant
        }
    }

    /// Returns `true` for any label below the 0.05 threshold.
    pub fn is_significant(self) -> bool {
        self != Self::NotSignificant
    }
}

impl fmt::Display for Significance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extremely => write!(f, "extremely significant (p < 0.001)"),
            Self::Highly => write!(f, "highly significant (p < 0.01)"),
            Self::Significant => write!(f, "significant (p < 0.05)"),
            Self::NotSignificant => write!(f, "not significant (p >= 0.05)"),
        }
    }
}

/// Strength label for a correlation coefficient that clears the
/// reporting threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelationStrength {
    /// |r| > 0.7
    Strong,
    /// 0.5 < |r| <= 0.7
    Moderate,
}

impl CorrelationStrength {
    /// Classifies |r|; `None` when the pair is below the 0.5
    /// reporting threshold.
    pub fn from_r(r: f64) -> Option<Self> {
        let abs = r.abs();
        if abs > 0.7 {
            Some(Self::Strong)
        } else if abs > 0.5 {
            Some(Self::Moderate)
        } else {
            None
        }
    }
}

impl fmt::Display for CorrelationStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strong => write!(f, "strong"),
            Self::Moderate => write!(f, "moderate"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn significance_thresholds_are_exclusive() {
        assert_eq!(Significance::from_p(0.0005), Significance::Extremely);
        assert_eq!(Significance::from_p(0.001), Significance::Highly);
        assert_eq!(Significance::from_p(0.005), Significance::Highly);
        assert_eq!(Significance::from_p(0.01), Significance::Significant);
        assert_eq!(Significance::from_p(0.049), Significance::Significant);
        assert_eq!(Significance::from_p(0.05), Significance::NotSignificant);
        assert_eq!(Significance::from_p(0.9), Significance::NotSignificant);
    }

    #[test]
    fn significance_labels() {
        assert!(Significance::from_p(0.03).is_significant());
        assert!(!Significance::from_p(0.2).is_significant());
        assert_eq!(
            Significance::from_p(0.0001).to_string(),
            "extremely significant (p < 0.001)"
        );
    }

    #[test]
    fn correlation_strength_thresholds() {
        assert_eq!(CorrelationStrength::from_r(0.9), Some(CorrelationStrength::Strong));
        assert_eq!(CorrelationStrength::from_r(-0.8), Some(CorrelationStrength::Strong));
        assert_eq!(CorrelationStrength::from_r(0.6), Some(CorrelationStrength::Moderate));
        assert_eq!(CorrelationStrength::from_r(0.7), Some(CorrelationStrength::Moderate));
        assert_eq!(CorrelationStrength::from_r(0.5), None);
        assert_eq!(CorrelationStrength::from_r(0.2), None);
    }
}
