//! CLI tool to show one page of a CSV or JSON table.
//!
//! Usage:
//!   view-run <input> [--spec view.spec] [-f key=value]... [--sort key [--asc|--desc] [--numeric]]
//!            [-p page] [--page-size n] [-o output.csv]
//!
//! Command-line options override the spec file. If no output file is
//! specified, writes to stdout.

use clap::{Parser, ValueEnum};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use tableview_rs::{
    Coercion, DEFAULT_PAGE_SIZE, DecodeOptions, Format, PageSpec, RaggedPolicy, SortDirection,
    ViewError, ViewState, build_state, compute_view_traced, encode_records, load, logging,
    parse_commands,
};

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    Json,
}

impl From<FormatArg> for Format {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => Format::Csv,
            FormatArg::Json => Format::Json,
        }
    }
}

/// Filter, sort and paginate a table, writing the page as CSV.
#[derive(Parser)]
#[command(name = "view-run")]
struct Cli {
    /// Input data file (delimited text, or JSON array of objects)
    input: PathBuf,

    /// View spec file (FILTER / SORT / PAGE / SIZE commands)
    #[arg(short, long)]
    spec: Option<PathBuf>,

    /// Keep records where KEY equals VALUE (repeatable; empty VALUE clears)
    #[arg(short, long = "filter", value_name = "KEY=VALUE", value_parser = parse_filter_arg)]
    filters: Vec<(String, String)>,

    /// Sort by this column
    #[arg(long)]
    sort: Option<String>,

    /// Sort ascending (overrides a DESC in the spec file)
    #[arg(long, conflicts_with = "desc")]
    asc: bool,

    /// Sort descending
    #[arg(long)]
    desc: bool,

    /// Compare sort keys as numbers
    #[arg(long)]
    numeric: bool,

    /// Page to show (1-based; bad values fall back to 1)
    #[arg(short, long, allow_hyphen_values = true)]
    page: Option<String>,

    /// Records per page (bad values fall back to the default)
    #[arg(long, allow_hyphen_values = true)]
    page_size: Option<String>,

    /// Field delimiter for delimited input and output
    #[arg(short, long, default_value_t = ',')]
    delimiter: char,

    /// Input format (default: from the file extension)
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Give short rows empty values instead of leaving columns out
    #[arg(long)]
    fill_empty: bool,

    /// Write output to file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Show paths, stage counts, and paging on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn parse_filter_arg(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

/// Spec file first, then command-line overrides.
fn build_view_state(cli: &Cli) -> Result<ViewState, ViewError> {
    let mut state = match &cli.spec {
        Some(path) => {
            let text = fs::read_to_string(path).map_err(|e| ViewError::io(path, e))?;
            build_state(&parse_commands(&text)?, DEFAULT_PAGE_SIZE)
        }
        None => ViewState::new(),
    };

    for (key, value) in &cli.filters {
        if value.is_empty() {
            state.filters.clear(key.as_str());
        } else {
            state.filters.set(key.as_str(), value.as_str());
        }
    }

    if let Some(key) = &cli.sort {
        state.sort.key = Some(key.clone());
    }
    if cli.asc {
        state.sort.direction = SortDirection::Ascending;
    }
    if cli.desc {
        state.sort.direction = SortDirection::Descending;
    }
    if cli.numeric {
        state.sort.coercion = Coercion::Numeric;
    }

    if cli.page.is_some() || cli.page_size.is_some() {
        let page = cli
            .page
            .clone()
            .unwrap_or_else(|| state.page.page.to_string());
        let size = cli
            .page_size
            .clone()
            .unwrap_or_else(|| state.page.page_size.to_string());
        state.page = PageSpec::parse(&page, &size, DEFAULT_PAGE_SIZE);
    }

    Ok(state)
}

fn write_output(path: Option<&Path>, output: &str) -> Result<(), ViewError> {
    match path {
        Some(out_path) => {
            if let Some(parent) = out_path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent).map_err(|e| ViewError::io(parent, e))?;
            }
            fs::write(out_path, output).map_err(|e| ViewError::io(out_path, e))
        }
        None => io::stdout()
            .write_all(output.as_bytes())
            .map_err(|e| ViewError::io("<stdout>", e)),
    }
}

fn run(cli: &Cli) -> Result<(), ViewError> {
    let mut state = build_view_state(cli)?;

    let format = cli
        .format
        .map(Format::from)
        .unwrap_or_else(|| Format::from_path(&cli.input));
    let ragged = if cli.fill_empty {
        RaggedPolicy::FillEmpty
    } else {
        RaggedPolicy::OmitMissing
    };
    let options = DecodeOptions::new().delimiter(cli.delimiter).ragged(ragged);

    if cli.verbose {
        eprintln!("Input:    {} ({format:?})", cli.input.display());
        if let Some(spec) = &cli.spec {
            eprintln!("Spec:     {}", spec.display());
        }
        eprintln!(
            "Output:   {}",
            cli.output
                .as_deref()
                .map_or_else(|| "(stdout)".to_string(), |p| p.display().to_string())
        );
    }

    let dataset = load(&cli.input, format, &options)?;
    let (view, traces) = compute_view_traced(&dataset, &state.filters, &state.sort, state.page);
    state.page = view.page_spec();

    for trace in &traces {
        log::debug!(
            "{}: {} -> {}",
            trace.name,
            trace.input_count,
            trace.output_count
        );
    }

    let output = encode_records(dataset.columns(), view.records.iter().copied(), cli.delimiter);
    write_output(cli.output.as_deref(), &output)?;

    if cli.verbose {
        eprintln!(
            "Records:  {} in -> {} matched, page {}/{}, showing {} of {}",
            dataset.len(),
            view.total,
            state.page.page,
            view.page_count,
            view.len(),
            view.total
        );
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
