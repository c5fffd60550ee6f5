// Sorting, page arithmetic and the compact page-number strip

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Pages shown around the current one in the page strip.
pub const VISIBLE_PAGES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    DateCreated,
    Year,
    Mileage,
    Price,
}

impl SortField {
    pub const ALL: [SortField; 4] = [
        SortField::DateCreated,
        SortField::Year,
        SortField::Mileage,
        SortField::Price,
    ];

    /// Column name in the Cars collection.
    pub fn as_str(self) -> &'static str {
        match self {
            SortField::DateCreated => "date_created",
            SortField::Year => "year",
            SortField::Mileage => "mileage",
            SortField::Price => "price",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortField::DateCreated => "Newest",
            SortField::Year => "Year",
            SortField::Mileage => "Mileage",
            SortField::Price => "Price",
        }
    }
}

impl FromStr for SortField {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortField::ALL
            .into_iter()
            .find(|field| field.as_str() == s.trim())
            .ok_or(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

impl FromStr for SortOrder {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: SortField,
    pub order: SortOrder,
}

impl Default for SortSpec {
    // Newest listings first
    fn default() -> Self {
        SortSpec {
            field: SortField::DateCreated,
            order: SortOrder::Desc,
        }
    }
}

impl SortSpec {
    /// Column-header behavior: the same field flips direction, a new field
    /// starts ascending.
    pub fn select(self, field: SortField) -> SortSpec {
        if field == self.field {
            SortSpec {
                field,
                order: self.order.reversed(),
            }
        } else {
            SortSpec {
                field,
                order: SortOrder::Asc,
            }
        }
    }

    /// `price` or `-price`.
    pub fn expression(self) -> String {
        let sign = match self.order {
            SortOrder::Desc => "-",
            SortOrder::Asc => "",
        };
        format!("{}{}", sign, self.field.as_str())
    }
}

/// A catalog listing surface. Each one fixes its own page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Catalog,
    Brand,
    Series,
    Year,
}

impl Surface {
    pub fn page_size(self) -> u32 {
        match self {
            Surface::Catalog => 16,
            Surface::Brand | Surface::Series | Surface::Year => 15,
        }
    }
}

pub fn total_pages(total_matching: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    let pages = total_matching.div_ceil(u64::from(page_size));
    u32::try_from(pages).unwrap_or(u32::MAX)
}

pub fn offset(page: u32, page_size: u32) -> u64 {
    u64::from(page.max(1) - 1) * u64::from(page_size)
}

/// Pagination controls are only rendered when there is more than one page.
pub fn shows_pagination(total_pages: u32) -> bool {
    total_pages > 1
}

/// Navigation to `requested`; anything outside `[1, total_pages]` leaves the
/// page unchanged.
pub fn navigate(current: u32, requested: u32, total_pages: u32) -> u32 {
    if (1..=total_pages).contains(&requested) {
        requested
    } else {
        current
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageStrip {
    pub current: u32,
    pub total_pages: u32,
    // Shown separately when the window does not start at page 1
    pub first: Option<u32>,
    pub leading_gap: bool,
    pub window: Vec<u32>,
    pub trailing_gap: bool,
    pub last: Option<u32>,
}

impl PageStrip {
    pub fn has_previous(&self) -> bool {
        self.current > 1
    }

    pub fn has_next(&self) -> bool {
        self.current < self.total_pages
    }
}

/// At most [`VISIBLE_PAGES`] consecutive pages centered on `current`, shifted
/// at either end so the window stays full, plus first/last jump targets.
pub fn page_strip(current: u32, total_pages: u32) -> PageStrip {
    if total_pages == 0 {
        return PageStrip {
            current,
            total_pages,
            first: None,
            leading_gap: false,
            window: Vec::new(),
            trailing_gap: false,
            last: None,
        };
    }
    let current = current.clamp(1, total_pages);
    let mut start = current.saturating_sub(VISIBLE_PAGES / 2).max(1);
    let end = (start + VISIBLE_PAGES - 1).min(total_pages);
    if end - start + 1 < VISIBLE_PAGES {
        start = (end + 1).saturating_sub(VISIBLE_PAGES).max(1);
    }

    PageStrip {
        current,
        total_pages,
        first: (start > 1).then_some(1),
        leading_gap: start > 2,
        window: (start..=end).collect(),
        trailing_gap: end + 1 < total_pages,
        last: (end < total_pages).then_some(total_pages),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn same_field_toggles_direction() {
        let spec = SortSpec {
            field: SortField::Price,
            order: SortOrder::Asc,
        };
        assert_eq!(
            spec.select(SortField::Price),
            SortSpec {
                field: SortField::Price,
                order: SortOrder::Desc
            }
        );
        assert_eq!(
            spec.select(SortField::Year),
            SortSpec {
                field: SortField::Year,
                order: SortOrder::Asc
            }
        );
    }

    #[test]
    fn sort_expression_prefixes_descending() {
        assert_eq!(SortSpec::default().expression(), "-date_created");
        let asc = SortSpec {
            field: SortField::Mileage,
            order: SortOrder::Asc,
        };
        assert_eq!(asc.expression(), "mileage");
    }

    #[test]
    fn sort_values_parse_from_query_strings() {
        assert_eq!("price".parse::<SortField>(), Ok(SortField::Price));
        assert_eq!("date_created".parse::<SortField>(), Ok(SortField::DateCreated));
        assert!("brand".parse::<SortField>().is_err());
        assert_eq!("desc".parse::<SortOrder>(), Ok(SortOrder::Desc));
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0, 16), 0);
        assert_eq!(total_pages(16, 16), 1);
        assert_eq!(total_pages(17, 16), 2);
        assert_eq!(total_pages(46, 15), 4);
        assert!(!shows_pagination(total_pages(0, 16)));
        assert!(!shows_pagination(total_pages(16, 16)));
        assert!(shows_pagination(total_pages(17, 16)));
    }

    #[test]
    fn surfaces_define_their_own_page_size() {
        assert_eq!(Surface::Catalog.page_size(), 16);
        assert_eq!(Surface::Brand.page_size(), 15);
        assert_eq!(offset(3, 15), 30);
        assert_eq!(offset(0, 15), 0);
    }

    #[test]
    fn out_of_range_navigation_is_ignored() {
        assert_eq!(navigate(2, 0, 4), 2);
        assert_eq!(navigate(2, 9, 4), 2);
        assert_eq!(navigate(2, 4, 4), 4);
    }

    #[test]
    fn strip_centers_on_current_page() {
        let strip = page_strip(6, 12);
        assert_eq!(strip.window, vec![4, 5, 6, 7, 8]);
        assert_eq!(strip.first, Some(1));
        assert!(strip.leading_gap);
        assert!(strip.trailing_gap);
        assert_eq!(strip.last, Some(12));
    }

    #[test]
    fn strip_is_clamped_at_the_edges() {
        let start = page_strip(1, 12);
        assert_eq!(start.window, vec![1, 2, 3, 4, 5]);
        assert_eq!(start.first, None);
        assert!(!start.has_previous());

        let end = page_strip(12, 12);
        assert_eq!(end.window, vec![8, 9, 10, 11, 12]);
        assert_eq!(end.last, None);
        assert!(!end.has_next());
    }

    #[test]
    fn strip_without_gap_when_neighbouring_first_page() {
        let strip = page_strip(4, 10);
        assert_eq!(strip.window, vec![2, 3, 4, 5, 6]);
        assert_eq!(strip.first, Some(1));
        assert!(!strip.leading_gap);
    }

    #[test]
    fn short_strips_show_every_page() {
        let strip = page_strip(2, 3);
        assert_eq!(strip.window, vec![1, 2, 3]);
        assert_eq!(strip.first, None);
        assert_eq!(strip.last, None);
        assert!(page_strip(1, 0).window.is_empty());
    }
}
