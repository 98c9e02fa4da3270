//! CLI tool for inspecting the row groups, columns and pages of Parquet files.

mod error;
mod render;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use log::debug;
use parquet_inspect_core::{InspectOptions, Inspector};
use serde::Serialize;
use snafu::ResultExt;

use crate::error::{
    CliResult, InspectSnafu, JsonSnafu, OpenFileSnafu, ParseConfigSnafu, ReadConfigSnafu,
};

#[derive(Debug, Args)]
struct Common {
    /// Parquet file to inspect
    #[arg(long)]
    file: PathBuf,

    /// Print the result as pretty JSON instead of a table
    #[arg(long, default_value_t = false)]
    json: bool,

    /// JSON file with inspection options
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// File-level summary
    Summary {
        #[command(flatten)]
        common: Common,
    },

    /// List row groups
    RowGroups {
        #[command(flatten)]
        common: Common,
    },

    /// Show one row group
    RowGroup {
        #[arg(allow_negative_numbers = true)]
        rg: i64,

        #[command(flatten)]
        common: Common,
    },

    /// List the column chunks of a row group
    Columns {
        #[arg(allow_negative_numbers = true)]
        rg: i64,

        #[command(flatten)]
        common: Common,
    },

    /// Show one column chunk
    Column {
        #[arg(allow_negative_numbers = true)]
        rg: i64,

        #[arg(allow_negative_numbers = true)]
        col: i64,

        #[command(flatten)]
        common: Common,
    },

    /// List the pages of a column chunk
    Pages {
        #[arg(allow_negative_numbers = true)]
        rg: i64,

        #[arg(allow_negative_numbers = true)]
        col: i64,

        #[command(flatten)]
        common: Common,
    },

    /// Show one page header
    Page {
        #[arg(allow_negative_numbers = true)]
        rg: i64,

        #[arg(allow_negative_numbers = true)]
        col: i64,

        #[arg(allow_negative_numbers = true)]
        page: i64,

        #[command(flatten)]
        common: Common,
    },

    /// Decode the values of one data page
    Content {
        #[arg(allow_negative_numbers = true)]
        rg: i64,

        #[arg(allow_negative_numbers = true)]
        col: i64,

        #[arg(allow_negative_numbers = true)]
        page: i64,

        #[command(flatten)]
        common: Common,
    },

    /// Resolve a dotted column path against the schema
    Resolve {
        /// e.g. address.city
        path: String,

        #[command(flatten)]
        common: Common,
    },
}

#[derive(Debug, Parser)]
#[command(name = "pqinspect", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

fn load_options(config: Option<&Path>) -> CliResult<InspectOptions> {
    let Some(path) = config else {
        return Ok(InspectOptions::default());
    };
    let text = std::fs::read_to_string(path).context(ReadConfigSnafu {
        path: path.display().to_string(),
    })?;
    let options = serde_json::from_str(&text).context(ParseConfigSnafu {
        path: path.display().to_string(),
    })?;
    debug!("loaded options from {}: {options:?}", path.display());
    Ok(options)
}

fn open(common: &Common) -> CliResult<Inspector> {
    let options = load_options(common.config.as_deref())?;
    Inspector::open_with_options(&common.file, options).context(OpenFileSnafu {
        path: common.file.display().to_string(),
    })
}

/// Print `value` as JSON or through its table renderer.
fn emit<T: Serialize>(value: &T, json: bool, table: impl FnOnce(&T) -> String) -> CliResult<()> {
    if json {
        let text = serde_json::to_string_pretty(value).context(JsonSnafu)?;
        println!("{text}");
    } else {
        println!("{}", table(value));
    }
    Ok(())
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Command::Summary { common } => {
            let insp = open(&common)?;
            emit(&insp.summary(), common.json, render::summary)
        }

        Command::RowGroups { common } => {
            let insp = open(&common)?;
            emit(&insp.list_row_groups(), common.json, |g| render::row_groups(g))
        }

        Command::RowGroup { rg, common } => {
            let insp = open(&common)?;
            let group = insp.row_group(rg).context(InspectSnafu)?;
            emit(&group, common.json, |g| {
                render::row_groups(std::slice::from_ref(g))
            })
        }

        Command::Columns { rg, common } => {
            let insp = open(&common)?;
            let cols = insp.list_columns(rg).context(InspectSnafu)?;
            emit(&cols, common.json, |c| render::columns(c))
        }

        Command::Column { rg, col, common } => {
            let insp = open(&common)?;
            let info = insp.column(rg, col).context(InspectSnafu)?;
            emit(&info, common.json, render::column)
        }

        Command::Pages { rg, col, common } => {
            let insp = open(&common)?;
            let walk = insp.list_pages(rg, col).context(InspectSnafu)?;
            emit(&walk, common.json, render::pages)
        }

        Command::Page {
            rg,
            col,
            page,
            common,
        } => {
            let insp = open(&common)?;
            let page = insp.page(rg, col, page).context(InspectSnafu)?;
            emit(&page, common.json, render::page)
        }

        Command::Content {
            rg,
            col,
            page,
            common,
        } => {
            let insp = open(&common)?;
            let content = insp.page_content(rg, col, page).context(InspectSnafu)?;
            emit(&content, common.json, render::content)
        }

        Command::Resolve { path, common } => {
            let insp = open(&common)?;
            let element = insp.resolve_column(&path).context(InspectSnafu)?;
            emit(&element, common.json, render::schema_element)
        }
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
