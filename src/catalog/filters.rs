// Facet selections and the permissive parsing of their numeric inputs

use serde::{Deserialize, Serialize};

/// Parses a facet input as a finite, non-negative number.
///
/// Blank, unparseable, negative and non-finite inputs yield `None`, which the
/// query compiler treats as "filter not applied".
pub fn parse_facet_number(input: &str) -> Option<f64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n >= 0.0)
}

/// Like [`parse_facet_number`] but also requires a whole number (`"2020"`,
/// `"2020.0"`), as for year, mileage and price.
pub fn parse_facet_integer(input: &str) -> Option<u64> {
    parse_facet_number(input)
        .filter(|n| n.fract() == 0.0 && *n <= u64::MAX as f64)
        .map(|n| n as u64)
}

/// One side of a from/to range input after parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundInput {
    Absent,
    Valid(u64),
    Invalid,
}

impl BoundInput {
    pub fn parse(input: &str) -> Self {
        if input.trim().is_empty() {
            BoundInput::Absent
        } else {
            parse_facet_integer(input).map_or(BoundInput::Invalid, BoundInput::Valid)
        }
    }
}

/// Raw from/to inputs of a mileage or price facet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeInput {
    pub from: String,
    pub to: String,
}

impl RangeInput {
    pub fn between(from: impl Into<String>, to: impl Into<String>) -> Self {
        RangeInput {
            from: from.into(),
            to: to.into(),
        }
    }
}

#[cfg(test)]
impl RangeInput {
    // The legacy single "at most" form
    pub fn at_most(to: impl Into<String>) -> Self {
        RangeInput::between("", to)
    }
}

/// Currently selected facet values, kept as the raw strings the user entered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub search: String,
    // Brand id
    pub brand: String,
    // Series id; only meaningful together with a brand
    pub series: String,
    pub color: String,
    pub engine_volume: String,
    pub year: String,
    pub mileage: RangeInput,
    pub price: RangeInput,
}

impl FilterState {
    pub fn is_empty(&self) -> bool {
        self == &FilterState::default()
    }

    pub fn has_brand(&self) -> bool {
        !self.brand.trim().is_empty()
    }

    /// Series id, if it can take part in a query (a brand must be chosen).
    pub fn effective_series(&self) -> Option<&str> {
        let series = self.series.trim();
        (self.has_brand() && !series.is_empty()).then_some(series)
    }
}

/// A single facet change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterAction {
    SetSearch(String),
    SetBrand(String),
    SetSeries(String),
    SetColor(String),
    SetEngineVolume(String),
    SetYear(String),
    SetMileage(RangeInput),
    SetPrice(RangeInput),
    Clear,
}

impl FilterState {
    /// Applies one facet change. Choosing a different brand drops the series,
    /// and a series cannot be chosen while no brand is selected.
    pub fn apply(&self, action: FilterAction) -> FilterState {
        let mut next = self.clone();
        match action {
            FilterAction::SetSearch(value) => next.search = value,
            FilterAction::SetBrand(value) => {
                if value != self.brand {
                    next.series.clear();
                }
                next.brand = value;
            }
            FilterAction::SetSeries(value) => {
                if self.has_brand() {
                    next.series = value;
                }
            }
            FilterAction::SetColor(value) => next.color = value,
            FilterAction::SetEngineVolume(value) => next.engine_volume = value,
            FilterAction::SetYear(value) => next.year = value,
            FilterAction::SetMileage(range) => next.mileage = range,
            FilterAction::SetPrice(range) => next.price = range,
            FilterAction::Clear => next = FilterState::default(),
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn facet_numbers_are_permissive() {
        assert_eq!(parse_facet_number(" 1.5 "), Some(1.5));
        assert_eq!(parse_facet_number(""), None);
        assert_eq!(parse_facet_number("abc"), None);
        assert_eq!(parse_facet_number("NaN"), None);
        assert_eq!(parse_facet_number("inf"), None);
        assert_eq!(parse_facet_number("-3"), None);
    }

    #[test]
    fn facet_integers_reject_fractions() {
        assert_eq!(parse_facet_integer("2020"), Some(2020));
        assert_eq!(parse_facet_integer("2020.0"), Some(2020));
        assert_eq!(parse_facet_integer("2020.5"), None);
        assert_eq!(parse_facet_integer("20k"), None);
    }

    #[test]
    fn bound_inputs_distinguish_blank_from_garbage() {
        assert_eq!(BoundInput::parse("  "), BoundInput::Absent);
        assert_eq!(BoundInput::parse("5000"), BoundInput::Valid(5000));
        assert_eq!(BoundInput::parse("lots"), BoundInput::Invalid);
    }

    #[test]
    fn changing_brand_clears_series() {
        let state = FilterState {
            brand: "5".into(),
            series: "12".into(),
            ..FilterState::default()
        };
        let next = state.apply(FilterAction::SetBrand("7".into()));
        assert_eq!(next.brand, "7");
        assert_eq!(next.series, "");
    }

    #[test]
    fn reselecting_same_brand_keeps_series() {
        let state = FilterState {
            brand: "5".into(),
            series: "12".into(),
            ..FilterState::default()
        };
        assert_eq!(state.apply(FilterAction::SetBrand("5".into())), state);
    }

    #[test]
    fn series_requires_a_brand() {
        let next = FilterState::default().apply(FilterAction::SetSeries("12".into()));
        assert_eq!(next.series, "");

        let with_brand = FilterState {
            brand: "5".into(),
            ..FilterState::default()
        };
        let next = with_brand.apply(FilterAction::SetSeries("12".into()));
        assert_eq!(next.effective_series(), Some("12"));
    }

    #[test]
    fn clear_resets_everything() {
        let state = FilterState {
            search: "han".into(),
            color: "red".into(),
            price: RangeInput::at_most("30000"),
            ..FilterState::default()
        };
        assert!(state.apply(FilterAction::Clear).is_empty());
    }
}
