//! Filter, sort and paginate a dataset into one visible page.
//!
//! The view engine holds no state of its own. Callers keep their filters,
//! sort and page settings (see [`ViewState`]) and ask [`compute_view`] for
//! the slice to display. Bad paging input is clamped, never rejected, and
//! the corrected values are reported back in the [`ViewResult`].
//!
//! ## Comparison rules
//!
//! All record values are strings, so filtering is exact string equality.
//! Sorting uses the key's [`Coercion`]: `Text` compares code points, which
//! puts `"10"` before `"2"`. That is the expected result for text keys; use
//! `Numeric` for columns that hold numbers.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use crate::record::{Dataset, Record};
use crate::stage::{StageTrace, build_stages, run_stages};

/// Page size used when the caller's input is not a number.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Field -> expected value. `None` or `""` leaves the field unfiltered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    filters: BTreeMap<String, Option<String>>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`FilterSpec::set`].
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.filters.insert(field.into(), Some(value.into()));
    }

    /// Turn a field's filter off without forgetting the field.
    pub fn clear(&mut self, field: impl Into<String>) {
        self.filters.insert(field.into(), None);
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.filters.get(field).and_then(|v| v.as_deref())
    }

    /// Filters that actually constrain the view.
    pub fn active(&self) -> impl Iterator<Item = (&str, &str)> {
        self.filters.iter().filter_map(|(field, value)| match value.as_deref() {
            Some(v) if !v.is_empty() => Some((field.as_str(), v)),
            _ => None,
        })
    }

    pub fn is_active(&self) -> bool {
        self.active().next().is_some()
    }
}

/// Sort direction; converts to and from the `1` / `-1` integer form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    /// Negative values mean descending; anything else ascending.
    pub fn from_sign(sign: i64) -> Self {
        if sign < 0 {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        }
    }

    pub fn sign(self) -> i64 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }

    pub fn apply(self, ord: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Ascending => f.write_str("ASC"),
            SortDirection::Descending => f.write_str("DESC"),
        }
    }
}

/// How sort keys are compared.
///
/// In every mode a record missing the key orders before one that has it
/// (ascending).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Coercion {
    /// Raw strings by code point.
    #[default]
    Text,
    /// Values parsed as `f64`. Unparseable values order after all numbers
    /// and compare as text among themselves.
    Numeric,
}

fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|n| !n.is_nan())
}

impl Coercion {
    pub fn compare(self, left: Option<&str>, right: Option<&str>) -> Ordering {
        let (l, r) = match (left, right) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => (l, r),
        };

        match self {
            Coercion::Text => l.cmp(r),
            Coercion::Numeric => match (parse_number(l), parse_number(r)) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => l.cmp(r),
            },
        }
    }
}

impl fmt::Display for Coercion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coercion::Text => f.write_str("TEXT"),
            Coercion::Numeric => f.write_str("NUMERIC"),
        }
    }
}

/// Optional sort key with direction and comparison mode.
///
/// Without a key the filtered records keep their input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSpec {
    pub key: Option<String>,
    pub direction: SortDirection,
    pub coercion: Coercion,
}

impl SortSpec {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn by(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::default()
        }
    }

    pub fn direction(mut self, direction: SortDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn descending(self) -> Self {
        self.direction(SortDirection::Descending)
    }

    pub fn coercion(mut self, coercion: Coercion) -> Self {
        self.coercion = coercion;
        self
    }
}

/// Requested page, 1-based. Out-of-range values are clamped by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpec {
    pub page: usize,
    pub page_size: usize,
}

impl Default for PageSpec {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageSpec {
    pub fn new(page: usize, page_size: usize) -> Self {
        Self { page, page_size }
    }

    /// Build from raw UI text.
    ///
    /// Each input is read as a leading integer (`" 12px"` is 12).
    /// Unreadable input falls back to page 1 and `default_size`; zero or
    /// negative values become 1.
    pub fn parse(page: &str, page_size: &str, default_size: usize) -> Self {
        let page = parse_int_prefix(page).map_or(1, at_least_one);
        let page_size = parse_int_prefix(page_size).map_or(default_size.max(1), at_least_one);
        Self { page, page_size }
    }
}

fn at_least_one(n: i64) -> usize {
    usize::try_from(n.max(1)).unwrap_or(usize::MAX)
}

/// Leading-integer parse: optional whitespace, optional sign, digits.
/// Trailing characters are ignored. Saturates instead of overflowing.
pub fn parse_int_prefix(text: &str) -> Option<i64> {
    let s = text.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let digits: &str = {
        let end = digits
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(digits.len());
        &digits[..end]
    };
    if digits.is_empty() {
        return None;
    }

    let magnitude = digits.bytes().fold(0i64, |acc, b| {
        acc.saturating_mul(10).saturating_add(i64::from(b - b'0'))
    });
    Some(if negative { -magnitude } else { magnitude })
}

/// One computed page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewResult<'a> {
    /// Records matching the filters, before pagination.
    pub total: usize,
    /// Clamped 1-based page number.
    pub page: usize,
    /// Clamped page size (at least 1).
    pub page_size: usize,
    /// `max(1, ceil(total / page_size))`.
    pub page_count: usize,
    /// The records on this page, in view order.
    pub records: Vec<&'a Record>,
}

impl ViewResult<'_> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The clamped paging values, for writing back into caller state.
    pub fn page_spec(&self) -> PageSpec {
        PageSpec::new(self.page, self.page_size)
    }
}

/// Clamp a page request against a result size.
///
/// Returns `(page, page_size, page_count)`.
pub fn clamp_page(request: PageSpec, total: usize) -> (usize, usize, usize) {
    let page_size = request.page_size.max(1);
    let page_count = total.div_ceil(page_size).max(1);
    let page = request.page.clamp(1, page_count);
    (page, page_size, page_count)
}

/// Compute the visible page of `dataset`.
pub fn compute_view<'a>(
    dataset: &'a Dataset,
    filters: &FilterSpec,
    sort: &SortSpec,
    page: PageSpec,
) -> ViewResult<'a> {
    compute_view_traced(dataset, filters, sort, page).0
}

/// [`compute_view`], also returning record counts for each stage.
pub fn compute_view_traced<'a>(
    dataset: &'a Dataset,
    filters: &FilterSpec,
    sort: &SortSpec,
    page: PageSpec,
) -> (ViewResult<'a>, Vec<StageTrace>) {
    let stages = build_stages(filters, sort);
    let (visible, traces) = run_stages(dataset.iter().collect(), &stages);

    let total = visible.len();
    let (page, page_size, page_count) = clamp_page(page, total);
    let start = (page - 1).saturating_mul(page_size).min(total);
    let end = start.saturating_add(page_size).min(total);

    log::debug!(
        "view: {} records, {total} after filters, page {page}/{page_count} ({}..{end})",
        dataset.len(),
        start
    );

    let records = visible[start..end].to_vec();
    let result = ViewResult {
        total,
        page,
        page_size,
        page_count,
        records,
    };
    (result, traces)
}

/// Caller-held view settings.
///
/// [`ViewState::apply`] writes the clamped page and page size back, so
/// controls bound to this state show the values actually used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub filters: FilterSpec,
    pub sort: SortSpec,
    pub page: PageSpec,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply<'a>(&mut self, dataset: &'a Dataset) -> ViewResult<'a> {
        let result = compute_view(dataset, &self.filters, &self.sort, self.page);
        self.page = result.page_spec();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv::parse;

    fn numbers(n: usize) -> Dataset {
        let mut text = String::from("n,parity\n");
        for i in 1..=n {
            let parity = if i % 2 == 0 { "even" } else { "odd" };
            text.push_str(&format!("{i},{parity}\n"));
        }
        parse(&text)
    }

    fn col<'a>(result: &ViewResult<'a>, column: &str) -> Vec<&'a str> {
        result
            .records
            .iter()
            .map(|&r| r.get(column).unwrap_or(""))
            .collect()
    }

    #[test]
    fn test_first_page() {
        let ds = numbers(25);
        let v = compute_view(&ds, &FilterSpec::new(), &SortSpec::none(), PageSpec::new(1, 10));
        assert_eq!(v.total, 25);
        assert_eq!(v.page_count, 3);
        assert_eq!(col(&v, "n"), vec!["1", "2", "3", "4", "5", "6", "7", "8", "9", "10"]);
    }

    #[test]
    fn test_last_partial_page() {
        let ds = numbers(25);
        let v = compute_view(&ds, &FilterSpec::new(), &SortSpec::none(), PageSpec::new(3, 10));
        assert_eq!(col(&v, "n"), vec!["21", "22", "23", "24", "25"]);
    }

    #[test]
    fn test_page_past_end_clamps() {
        let ds = numbers(25);
        let v = compute_view(&ds, &FilterSpec::new(), &SortSpec::none(), PageSpec::new(99, 10));
        assert_eq!(v.page, 3);
        assert_eq!(v.len(), 5);
    }

    #[test]
    fn test_zero_page_and_size_clamp_to_one() {
        let ds = numbers(5);
        let v = compute_view(&ds, &FilterSpec::new(), &SortSpec::none(), PageSpec::new(0, 0));
        assert_eq!(v.page, 1);
        assert_eq!(v.page_size, 1);
        assert_eq!(v.page_count, 5);
        assert_eq!(col(&v, "n"), vec!["1"]);
    }

    #[test]
    fn test_filter_no_match() {
        let ds = numbers(10);
        let filters = FilterSpec::new().with("parity", "prime");
        let v = compute_view(&ds, &filters, &SortSpec::none(), PageSpec::new(4, 3));
        assert_eq!(v.total, 0);
        assert!(v.is_empty());
        assert_eq!(v.page, 1);
        assert_eq!(v.page_count, 1);
    }

    #[test]
    fn test_filters_and_combine() {
        let ds = numbers(10);
        let filters = FilterSpec::new().with("parity", "even").with("n", "4");
        let v = compute_view(&ds, &filters, &SortSpec::none(), PageSpec::default());
        assert_eq!(col(&v, "n"), vec!["4"]);
    }

    #[test]
    fn test_empty_and_cleared_filters_are_ignored() {
        let ds = numbers(4);
        let mut filters = FilterSpec::new().with("parity", "");
        filters.set("n", "1");
        filters.clear("n");
        assert!(!filters.is_active());
        let v = compute_view(&ds, &filters, &SortSpec::none(), PageSpec::default());
        assert_eq!(v.total, 4);
    }

    #[test]
    fn test_sort_descending_text() {
        let ds = numbers(12);
        let v = compute_view(
            &ds,
            &FilterSpec::new(),
            &SortSpec::by("n").descending(),
            PageSpec::new(1, 3),
        );
        // Text order: "9" > "8" > "7" > ... > "12" > "11" > "10" > "1"
        assert_eq!(col(&v, "n"), vec!["9", "8", "7"]);
    }

    #[test]
    fn test_sort_numeric_descending() {
        let ds = numbers(12);
        let sort = SortSpec::by("n").descending().coercion(Coercion::Numeric);
        let v = compute_view(&ds, &FilterSpec::new(), &sort, PageSpec::new(1, 3));
        assert_eq!(col(&v, "n"), vec!["12", "11", "10"]);
    }

    #[test]
    fn test_sort_asc_then_desc_reversed() {
        let ds = numbers(20);
        let page = PageSpec::new(1, 100);
        let asc = compute_view(&ds, &FilterSpec::new(), &SortSpec::by("n"), page);
        let desc = compute_view(&ds, &FilterSpec::new(), &SortSpec::by("n").descending(), page);
        let mut reversed = col(&desc, "n");
        reversed.reverse();
        assert_eq!(col(&asc, "n"), reversed);
    }

    #[test]
    fn test_dataset_untouched() {
        let ds = numbers(6);
        let before = ds.clone();
        let _ = compute_view(
            &ds,
            &FilterSpec::new().with("parity", "odd"),
            &SortSpec::by("n").descending(),
            PageSpec::new(1, 2),
        );
        assert_eq!(ds, before);
    }

    #[test]
    fn test_traced_reports_stages() {
        let ds = numbers(10);
        let (v, traces) = compute_view_traced(
            &ds,
            &FilterSpec::new().with("parity", "odd"),
            &SortSpec::by("n"),
            PageSpec::default(),
        );
        assert_eq!(v.total, 5);
        assert_eq!(traces.len(), 2);
        assert_eq!(traces[0].output_count, 5);
    }

    #[test]
    fn test_state_writes_back_clamped_page() {
        let ds = numbers(7);
        let mut state = ViewState::new();
        state.page = PageSpec::new(50, 0);
        let v = state.apply(&ds);
        assert_eq!(v.page, 7);
        assert_eq!(state.page, PageSpec::new(7, 1));
    }

    #[test]
    fn test_direction_sign() {
        assert_eq!(SortDirection::from_sign(1), SortDirection::Ascending);
        assert_eq!(SortDirection::from_sign(-1), SortDirection::Descending);
        assert_eq!(SortDirection::Descending.sign(), -1);
    }

    #[test]
    fn test_parse_int_prefix() {
        assert_eq!(parse_int_prefix("12"), Some(12));
        assert_eq!(parse_int_prefix("  7px"), Some(7));
        assert_eq!(parse_int_prefix("-3"), Some(-3));
        assert_eq!(parse_int_prefix("+4"), Some(4));
        assert_eq!(parse_int_prefix("2.9"), Some(2));
        assert_eq!(parse_int_prefix("abc"), None);
        assert_eq!(parse_int_prefix(""), None);
        assert_eq!(parse_int_prefix("-"), None);
        assert_eq!(parse_int_prefix("99999999999999999999999"), Some(i64::MAX));
    }

    #[test]
    fn test_page_spec_parse_falls_back() {
        assert_eq!(PageSpec::parse("abc", "", 100), PageSpec::new(1, 100));
        assert_eq!(PageSpec::parse("-2", "0", 100), PageSpec::new(1, 1));
        assert_eq!(PageSpec::parse("3", "25", 100), PageSpec::new(3, 25));
        assert_eq!(PageSpec::parse("x", "y", 0), PageSpec::new(1, 1));
    }

    #[test]
    fn test_numeric_coercion_non_numbers_last() {
        let c = Coercion::Numeric;
        assert_eq!(c.compare(Some("5"), Some("n/a")), Ordering::Less);
        assert_eq!(c.compare(Some("b"), Some("a")), Ordering::Greater);
        assert_eq!(c.compare(Some(" 2 "), Some("10")), Ordering::Less);
        assert_eq!(c.compare(None, Some("1")), Ordering::Less);
    }
}
