//! # tableview-rs
//!
//! Decode delimited text into records, then filter, sort and paginate them
//! into the page a table would show.
//!
//! ## Overview
//!
//! - **Decoding**: a quote-aware CSV scanner turns text into a
//!   [`Dataset`] of [`Record`]s keyed by the header row. It never fails.
//! - **JSON**: an array of objects loads into the same `Dataset` shape.
//! - **Views**: [`compute_view`] applies exact-match filters, an optional
//!   stable sort and a clamped page request, returning the page plus the
//!   filtered total.
//! - **View specs**: filters, sort and paging can be stored as text and
//!   applied with [`execute_view`].
//!
//! ## Example
//!
//! ```
//! use tableview_rs::{FilterSpec, PageSpec, SortSpec, compute_view, parse};
//!
//! let ds = parse("id,type,quality\n1,sword,3\n2,bow,1\n3,sword,5\n");
//!
//! let view = compute_view(
//!     &ds,
//!     &FilterSpec::new().with("type", "sword"),
//!     &SortSpec::by("quality").descending(),
//!     PageSpec::new(1, 10),
//! );
//!
//! assert_eq!(view.total, 2);
//! assert_eq!(view.records[0].get("id"), Some("3"));
//! ```

pub mod csv;
pub mod dsl;
pub mod error;
pub mod json;
pub mod logging;
pub mod record;
pub mod source;
pub mod stage;
pub mod view;

pub use csv::{DecodeOptions, RaggedPolicy, decode, encode, encode_records, parse, parse_rows};
pub use dsl::{Command, build_state, execute_view, parse_commands};
pub use error::ViewError;
pub use json::{records_from_json, records_from_value};
pub use record::{Dataset, Record};
pub use source::{Format, load, load_csv, load_json};
pub use stage::{FilterStage, SortStage, Stage, StageTrace};
pub use view::{
    Coercion, DEFAULT_PAGE_SIZE, FilterSpec, PageSpec, SortDirection, SortSpec, ViewResult,
    ViewState, clamp_page, compute_view, compute_view_traced,
};
