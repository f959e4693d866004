//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "autoinsight")]
#[command(about = "Talk to the data-analysis agent from a terminal")]
#[command(version)]
pub struct Cli {
    /// Backend base URL (overrides AUTOINSIGHT_BASE_URL)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Request timeout in seconds (overrides AUTOINSIGHT_TIMEOUT_SECS)
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Print the rendered HTML of each entry instead of its raw text
    #[arg(long, global = true)]
    pub html: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a natural-language database query
    Query {
        /// Query text
        query: String,

        /// Print the visualization studio link for the result
        #[arg(long)]
        visualize_link: bool,
    },
    /// List files stored on the backend
    Files,
    /// Upload a data file (.csv, .xlsx, .xls, .json, .txt)
    Upload {
        path: PathBuf,
    },
    /// Ask a question about an uploaded file
    Analyze {
        /// Name of the file on the backend
        #[arg(long)]
        file: String,

        /// Question about the file
        message: String,
    },
    /// Create a chart from data and a request
    Visualize(VisualizeArgs),
}

#[derive(Args, Debug)]
#[command(group(clap::ArgGroup::new("source").required(true)))]
pub struct VisualizeArgs {
    /// Inline data text
    #[arg(long, group = "source")]
    pub data: Option<String>,

    /// Read data from a local file
    #[arg(long, group = "source")]
    pub data_file: Option<PathBuf>,

    /// Fetch data from a URL
    #[arg(long, group = "source")]
    pub data_url: Option<String>,

    /// Studio link (or its `data` parameter) printed by `query --visualize-link`
    #[arg(long, group = "source")]
    pub link: Option<String>,

    /// Preferred chart type (bar, line, pie, ...)
    #[arg(long)]
    pub chart_type: Option<String>,

    /// What to visualize
    pub request: String,
}
