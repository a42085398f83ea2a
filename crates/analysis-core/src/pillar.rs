//! Pillar sub-score assembly: weighted averages over optional components.

use crate::normalize::{clamp, round1, NEUTRAL_SCORE};
use serde::{Deserialize, Serialize};

/// One scored input inside a pillar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PillarComponent {
    pub name: String,
    /// Raw input value (ratio, return, ...) when present
    pub value: Option<f64>,
    /// Component score in 0..=100
    pub score: f64,
    pub weight: f64,
    /// Excluded components do not take part in the pillar average
    pub included: bool,
}

impl PillarComponent {
    /// Score `value` with `scorer` when it is finite; otherwise exclude the component.
    pub fn scored(name: &str, value: Option<f64>, weight: f64, scorer: impl FnOnce(f64) -> f64) -> Self {
        match value.filter(|v| v.is_finite()) {
            Some(v) => Self {
                name: name.to_string(),
                value: Some(v),
                score: clamp(scorer(v), 0.0, 100.0),
                weight,
                included: true,
            },
            None => Self::excluded(name, weight),
        }
    }

    pub fn excluded(name: &str, weight: f64) -> Self {
        Self {
            name: name.to_string(),
            value: None,
            score: NEUTRAL_SCORE,
            weight,
            included: false,
        }
    }

    /// Keep an excluded component in the average at the neutral score.
    pub fn or_neutral(mut self) -> Self {
        if !self.included {
            self.score = NEUTRAL_SCORE;
            self.included = true;
        }
        self
    }
}

/// A pillar score plus the components it was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PillarScore {
    pub score: f64,
    pub components: Vec<PillarComponent>,
}

impl PillarScore {
    /// Weighted mean of the included components; 50 when nothing is included.
    pub fn from_components(components: Vec<PillarComponent>) -> Self {
        let (weighted, total_weight) = components
            .iter()
            .filter(|c| c.included && c.weight > 0.0)
            .fold((0.0, 0.0), |(sum, w), c| (sum + c.score * c.weight, w + c.weight));

        let score = if total_weight > 0.0 {
            weighted / total_weight
        } else {
            NEUTRAL_SCORE
        };

        Self {
            score: round1(clamp(score, 0.0, 100.0)),
            components,
        }
    }

    pub fn component(&self, name: &str) -> Option<&PillarComponent> {
        self.components.iter().find(|c| c.name == name)
    }

    pub fn included_count(&self) -> usize {
        self.components.iter().filter(|c| c.included).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excluded_components_do_not_count() {
        let pillar = PillarScore::from_components(vec![
            PillarComponent::scored("a", Some(1.0), 1.0, |_| 80.0),
            PillarComponent::scored("b", None, 3.0, |_| 0.0),
        ]);
        assert_eq!(pillar.score, 80.0);
        assert_eq!(pillar.included_count(), 1);
    }

    #[test]
    fn test_empty_pillar_is_neutral() {
        let pillar = PillarScore::from_components(vec![PillarComponent::excluded("a", 1.0)]);
        assert_eq!(pillar.score, 50.0);
    }

    #[test]
    fn test_or_neutral_pulls_towards_fifty() {
        let pillar = PillarScore::from_components(vec![
            PillarComponent::scored("a", Some(1.0), 1.0, |_| 90.0),
            PillarComponent::excluded("b", 1.0).or_neutral(),
        ]);
        assert_eq!(pillar.score, 70.0);
    }

    #[test]
    fn test_scorer_output_is_clamped() {
        let c = PillarComponent::scored("a", Some(1.0), 1.0, |_| 140.0);
        assert_eq!(c.score, 100.0);
        let c = PillarComponent::scored("a", Some(1.0), 1.0, |_| f64::NAN);
        assert_eq!(c.score, 0.0);
    }
}
