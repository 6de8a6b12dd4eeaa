//! Season profiles: component importance points, daylight windows and the
//! time-bucketed shading column rule.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, FixedOffset, Timelike};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Clamp a raw score into the `[0, 1]` range.
#[must_use]
pub fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl Default for Season {
    fn default() -> Self {
        Season::Summer
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Fall => "fall",
            Season::Winter => "winter",
        })
    }
}

impl FromStr for Season {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spring" => Ok(Season::Spring),
            "summer" => Ok(Season::Summer),
            "fall" => Ok(Season::Fall),
            "winter" => Ok(Season::Winter),
            other => Err(Error::InvalidData(format!("unknown season '{other}'"))),
        }
    }
}

/// Environmental component of an edge's desirability score.
///
/// `Sun` is derived from `Shade` (`sun = 1 - shade`) and participates
/// whenever shade data exists; it has no column of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    Flower,
    Shade,
    Sun,
    Maple,
    Wind,
    CoolShelter,
    Streetfood,
    Tour,
}

impl Component {
    pub const ALL: [Component; 8] = [
        Component::Flower,
        Component::Shade,
        Component::Sun,
        Component::Maple,
        Component::Wind,
        Component::CoolShelter,
        Component::Streetfood,
        Component::Tour,
    ];

    /// Source-data column carrying this component, if any.
    #[must_use]
    pub fn column(self) -> Option<&'static str> {
        match self {
            Component::Flower => Some("flower_score"),
            Component::Shade => Some("shade_score"),
            Component::Maple => Some("maple_score"),
            Component::Wind => Some("wind_score"),
            Component::CoolShelter => Some("shelter_score"),
            Component::Streetfood => Some("streetfood_score"),
            Component::Tour => Some("tour_score"),
            Component::Sun => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Component::Flower => "flower",
            Component::Shade => "shade",
            Component::Sun => "sun",
            Component::Maple => "maple",
            Component::Wind => "wind",
            Component::CoolShelter => "cool_shelter",
            Component::Streetfood => "streetfood",
            Component::Tour => "tour",
        }
    }
}

impl Season {
    /// Integer importance points per component for this season. Zero means
    /// the component is unused in this season.
    #[must_use]
    pub fn points(self, component: Component) -> u32 {
        use Component::*;
        match self {
            Season::Spring => match component {
                Flower => 9,
                Shade => 1,
                Sun => 4,
                Wind => 1,
                Tour => 9,
                Maple | CoolShelter | Streetfood => 0,
            },
            Season::Summer => match component {
                Flower => 1,
                Shade => 9,
                Wind => 9,
                CoolShelter => 9,
                Tour => 9,
                Sun | Maple | Streetfood => 0,
            },
            Season::Fall => match component {
                Flower => 4,
                Shade => 1,
                Sun => 4,
                Maple => 9,
                Wind => 1,
                Tour => 9,
                CoolShelter | Streetfood => 0,
            },
            Season::Winter => match component {
                Sun => 9,
                Wind => 9,
                CoolShelter => 4,
                Streetfood => 9,
                Tour => 9,
                Flower | Shade | Maple => 0,
            },
        }
    }

    /// Hours of valid daylight for shading data, inclusive on both ends.
    #[must_use]
    pub fn daylight_hours(self) -> (u32, u32) {
        match self {
            Season::Spring | Season::Fall => (7, 18),
            Season::Summer => (6, 19),
            Season::Winter => (8, 17),
        }
    }

    /// Column of the shading table that applies at `now`, or `None` outside
    /// the season's daylight window (no shading is used after dark).
    ///
    /// Columns are bucketed per half-month and hour: `MMDD_HH_me`, with the
    /// day component fixed to `01` for days 1-14 and `15` otherwise.
    #[must_use]
    pub fn shading_column(self, now: DateTime<FixedOffset>) -> Option<String> {
        let (min_h, max_h) = self.daylight_hours();
        let hour = now.hour();
        if hour < min_h || hour > max_h {
            return None;
        }
        let day_bucket = if now.day() <= 14 { "01" } else { "15" };
        Some(format!("{:02}{}_{:02}_me", now.month(), day_bucket, hour))
    }

    /// Season that `now` falls into (Mar-May spring, Jun-Aug summer,
    /// Sep-Nov fall, otherwise winter).
    #[must_use]
    pub fn for_date(now: DateTime<FixedOffset>) -> Self {
        match now.month() {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Fall,
            _ => Season::Winter,
        }
    }
}
