//! List filtering and summary counts shared by every entity family.

use std::borrow::Cow;

use serde::Serialize;

pub trait Searchable {
    /// Text fields matched by the free-text search box.
    fn search_fields(&self) -> Vec<Cow<'_, str>>;

    /// Value of a categorical facet (`status`, `type`, `class`, ...).
    fn facet(&self, name: &str) -> Option<&str>;
}

pub trait Summarize: Sized {
    type Summary: Serialize;

    fn summarize(items: &[Self]) -> Self::Summary;
}

/// One categorical filter. `"all"` and blank values match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(String),
}

impl CategoryFilter {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") | Some("all") => Self::All,
            Some(v) => Self::Only(v.to_string()),
        }
    }

    fn admits(&self, value: Option<&str>) -> bool {
        match self {
            Self::All => true,
            Self::Only(want) => value == Some(want.as_str()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    search: Option<String>,
    facets: Vec<(&'static str, CategoryFilter)>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, term: Option<&str>) -> Self {
        self.search = term
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty());
        self
    }

    pub fn facet(mut self, name: &'static str, filter: CategoryFilter) -> Self {
        if filter != CategoryFilter::All {
            self.facets.push((name, filter));
        }
        self
    }

    pub fn is_unfiltered(&self) -> bool {
        self.search.is_none() && self.facets.is_empty()
    }

    pub fn matches<T: Searchable>(&self, record: &T) -> bool {
        if let Some(needle) = &self.search {
            let hit = record
                .search_fields()
                .iter()
                .any(|f| f.to_lowercase().contains(needle.as_str()));
            if !hit {
                return false;
            }
        }
        self.facets
            .iter()
            .all(|(name, f)| f.admits(record.facet(name)))
    }

    /// Filtered records in source order.
    pub fn apply<T: Searchable + Clone>(&self, items: &[T]) -> Vec<T> {
        items.iter().filter(|r| self.matches(*r)).cloned().collect()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct View<T, S> {
    pub records: Vec<T>,
    pub matched: usize,
    /// Counts over the whole collection, not just the matched records.
    pub stats: S,
}

pub fn derive_view<T>(items: &[T], query: &ListQuery) -> View<T, T::Summary>
where
    T: Searchable + Summarize + Clone,
{
    let records = query.apply(items);
    View {
        matched: records.len(),
        records,
        stats: T::summarize(items),
    }
}

pub fn count_where<T>(items: &[T], pred: impl Fn(&T) -> bool) -> usize {
    items.iter().filter(|r| pred(r)).count()
}

/// Share of `part` in `whole` as a percentage with one decimal.
pub fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    ((part as f64 / whole as f64) * 1000.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        name: &'static str,
        status: &'static str,
        kind: &'static str,
    }

    impl Searchable for Row {
        fn search_fields(&self) -> Vec<Cow<'_, str>> {
            vec![Cow::Borrowed(self.name)]
        }
        fn facet(&self, name: &str) -> Option<&str> {
            match name {
                "status" => Some(self.status),
                "type" => Some(self.kind),
                _ => None,
            }
        }
    }

    fn rows() -> Vec<Row> {
        vec![
            Row { name: "Science Lab", status: "available", kind: "laboratory" },
            Row { name: "Main Library", status: "occupied", kind: "library" },
            Row { name: "Computer Lab", status: "occupied", kind: "laboratory" },
        ]
    }

    #[test]
    fn all_sentinel_and_blank_mean_no_filter() {
        assert_eq!(CategoryFilter::parse(Some("all")), CategoryFilter::All);
        assert_eq!(CategoryFilter::parse(Some("  ")), CategoryFilter::All);
        assert_eq!(CategoryFilter::parse(None), CategoryFilter::All);
        assert!(ListQuery::new()
            .search(Some("   "))
            .facet("status", CategoryFilter::parse(Some("all")))
            .is_unfiltered());
    }

    #[test]
    fn search_is_case_insensitive_and_facets_are_conjunctive() {
        let q = ListQuery::new()
            .search(Some("LAB"))
            .facet("status", CategoryFilter::parse(Some("occupied")));
        let out = q.apply(&rows());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "Computer Lab");
    }

    #[test]
    fn filter_order_does_not_matter() {
        let a = ListQuery::new()
            .facet("status", CategoryFilter::parse(Some("occupied")))
            .facet("type", CategoryFilter::parse(Some("laboratory")));
        let b = ListQuery::new()
            .facet("type", CategoryFilter::parse(Some("laboratory")))
            .facet("status", CategoryFilter::parse(Some("occupied")));
        assert_eq!(a.apply(&rows()), b.apply(&rows()));
    }

    #[test]
    fn filtering_twice_changes_nothing() {
        let q = ListQuery::new().search(Some("lib"));
        let once = q.apply(&rows());
        let twice = q.apply(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn unknown_facet_value_matches_nothing() {
        let q = ListQuery::new().facet("status", CategoryFilter::parse(Some("closed")));
        assert!(q.apply(&rows()).is_empty());
    }

    #[test]
    fn percent_rounds_to_one_decimal() {
        assert_eq!(percent(2, 3), 66.7);
        assert_eq!(percent(0, 0), 0.0);
    }
}
