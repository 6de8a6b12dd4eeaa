//! Seasonal scoring model: converts raw per-link environmental attributes
//! into a normalized composite desirability score.

use hashbrown::HashMap;

use crate::LinkId;
use crate::model::season::{Component, Season, clamp01};

/// Raw component values of one source record, as read from the data.
/// `None` means the column is absent for this dataset or row.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawComponents {
    pub flower: Option<f64>,
    pub shade: Option<f64>,
    pub maple: Option<f64>,
    pub wind: Option<f64>,
    pub cool_shelter: Option<f64>,
    pub streetfood: Option<f64>,
    pub tour: Option<f64>,
}

impl RawComponents {
    fn get(&self, component: Component) -> Option<f64> {
        match component {
            Component::Flower => self.flower,
            Component::Shade => self.shade,
            Component::Maple => self.maple,
            Component::Wind => self.wind,
            Component::CoolShelter => self.cool_shelter,
            Component::Streetfood => self.streetfood,
            Component::Tour => self.tour,
            Component::Sun => None,
        }
    }
}

/// Composite score of one edge together with its per-component breakdown,
/// which is kept on the edge for diagnostics.
#[derive(Debug, Clone)]
pub struct EdgeScore {
    pub composite: f64,
    pub components: HashMap<Component, f64>,
}

/// Scoring model for a fixed season and a fixed set of available components.
///
/// Weights are the season's importance points normalized over the components
/// actually present in the data, so they always sum to 1 when any usable
/// component has nonzero points. For a fixed season and input row the output
/// is a pure function of the row and the shading lookup.
#[derive(Debug, Clone)]
pub struct SeasonalScoringModel {
    season: Season,
    weights: HashMap<Component, f64>,
    shade_enabled: bool,
    shading: HashMap<LinkId, f64>,
}

impl SeasonalScoringModel {
    /// Build a model for `season` restricted to the components `available`
    /// in the source data. `shading` maps link ids to the raw sun-exposure
    /// value of the currently selected time bucket; pass an empty map when
    /// outside the daylight window.
    #[must_use]
    pub fn new(season: Season, available: &[Component], shading: HashMap<LinkId, f64>) -> Self {
        let mut usable: Vec<Component> = Component::ALL
            .iter()
            .copied()
            .filter(|c| c.column().is_some() && available.contains(c) && season.points(*c) > 0)
            .collect();

        // A shading override map enables shade even without a shade column,
        // and sun participates whenever shade data exists at all.
        let shade_data = available.contains(&Component::Shade) || !shading.is_empty();
        if shade_data {
            if season.points(Component::Shade) > 0 && !usable.contains(&Component::Shade) {
                usable.push(Component::Shade);
            }
            if season.points(Component::Sun) > 0 {
                usable.push(Component::Sun);
            }
        }

        let total: u32 = usable.iter().map(|&c| season.points(c)).sum();
        let weights = if total == 0 {
            HashMap::new()
        } else {
            usable
                .iter()
                .map(|&c| (c, f64::from(season.points(c)) / f64::from(total)))
                .collect()
        };

        Self {
            season,
            weights,
            shade_enabled: shade_data,
            shading,
        }
    }

    #[must_use]
    pub fn season(&self) -> Season {
        self.season
    }

    /// Normalized weights over the usable components; sums to 1 unless no
    /// usable component carries points.
    #[must_use]
    pub fn weights(&self) -> &HashMap<Component, f64> {
        &self.weights
    }

    /// Score one record. Every component is clamped to `[0, 1]`; the shade
    /// component is derived from the raw sun-exposure value, inverted so
    /// that 1 means fully shaded. When an override map is in effect it is
    /// the only exposure source (absent links count as 0, fully shaded);
    /// the column is consulted only without an override map.
    #[must_use]
    pub fn score(&self, link_id: LinkId, raw: &RawComponents) -> EdgeScore {
        let mut components: HashMap<Component, f64> = HashMap::new();

        if self.shade_enabled {
            let exposure = if self.shading.is_empty() {
                raw.shade.unwrap_or(0.0)
            } else {
                self.shading.get(&link_id).copied().unwrap_or(0.0)
            };
            let shade = 1.0 - clamp01(exposure);
            components.insert(Component::Shade, shade);
            components.insert(Component::Sun, 1.0 - shade);
        }

        for component in Component::ALL {
            if matches!(component, Component::Shade | Component::Sun) {
                continue;
            }
            if self.weights.contains_key(&component) {
                let value = clamp01(raw.get(component).unwrap_or(0.0));
                components.insert(component, value);
            }
        }

        let composite = components
            .iter()
            .map(|(c, v)| self.weights.get(c).copied().unwrap_or(0.0) * v)
            .sum::<f64>();

        EdgeScore {
            composite: clamp01(composite),
            components,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: [Component; 7] = [
        Component::Flower,
        Component::Shade,
        Component::Maple,
        Component::Wind,
        Component::CoolShelter,
        Component::Streetfood,
        Component::Tour,
    ];

    #[test]
    fn weights_sum_to_one_for_every_season() {
        for season in [Season::Spring, Season::Summer, Season::Fall, Season::Winter] {
            let model = SeasonalScoringModel::new(season, &FULL, HashMap::new());
            let sum: f64 = model.weights().values().sum();
            assert!(
                (sum - 1.0).abs() < 1e-6,
                "{season}: weights sum to {sum}, expected 1.0"
            );
        }
    }

    #[test]
    fn weights_restricted_to_available_columns() {
        let model =
            SeasonalScoringModel::new(Season::Summer, &[Component::Flower, Component::Tour], HashMap::new());
        let sum: f64 = model.weights().values().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(model.weights().contains_key(&Component::Flower));
        assert!(!model.weights().contains_key(&Component::Wind));
    }

    #[test]
    fn composite_is_clamped_and_weighted() {
        let model = SeasonalScoringModel::new(
            Season::Summer,
            &[Component::Flower, Component::Tour],
            HashMap::new(),
        );
        let raw = RawComponents {
            flower: Some(2.0), // clamped to 1.0
            tour: Some(0.5),
            ..RawComponents::default()
        };
        let score = model.score(1, &raw);
        // flower 1 pt, tour 9 pts -> weights 0.1 / 0.9
        let expected = 0.1 * 1.0 + 0.9 * 0.5;
        assert!((score.composite - expected).abs() < 1e-9);
        assert!(score.composite >= 0.0 && score.composite <= 1.0);
    }

    #[test]
    fn shade_is_inverted_exposure_and_sun_is_complement() {
        let mut shading = HashMap::new();
        shading.insert(7, 0.25); // mostly shaded link
        let model = SeasonalScoringModel::new(Season::Spring, &FULL, shading);
        let score = model.score(7, &RawComponents::default());
        let shade = score.components[&Component::Shade];
        let sun = score.components[&Component::Sun];
        assert!((shade - 0.75).abs() < 1e-9);
        assert!((sun - 0.25).abs() < 1e-9);
    }

    #[test]
    fn override_map_shadows_the_column_entirely() {
        let mut shading = HashMap::new();
        shading.insert(1, 0.5);
        let model = SeasonalScoringModel::new(Season::Summer, &FULL, shading);
        // link 2 has a column value but no override entry; the override map
        // wins with its 0 default, giving full shade
        let raw = RawComponents {
            shade: Some(0.9),
            ..RawComponents::default()
        };
        let score = model.score(2, &raw);
        assert_eq!(score.components[&Component::Shade], 1.0);

        // without an override map the column is used
        let model = SeasonalScoringModel::new(Season::Summer, &FULL, HashMap::new());
        let score = model.score(2, &raw);
        assert!((score.components[&Component::Shade] - 0.1).abs() < 1e-9);
    }

    #[test]
    fn missing_shading_value_defaults_to_zero_exposure() {
        // No override and no column value: exposure falls back to 0, which
        // inverts to a fully shaded component.
        let model = SeasonalScoringModel::new(Season::Summer, &FULL, HashMap::new());
        let score = model.score(42, &RawComponents::default());
        assert_eq!(score.components[&Component::Shade], 1.0);
    }

    #[test]
    fn scoring_is_deterministic() {
        let model = SeasonalScoringModel::new(Season::Fall, &FULL, HashMap::new());
        let raw = RawComponents {
            maple: Some(0.9),
            tour: Some(0.4),
            ..RawComponents::default()
        };
        let a = model.score(3, &raw).composite;
        let b = model.score(3, &raw).composite;
        assert_eq!(a, b);
    }
}
