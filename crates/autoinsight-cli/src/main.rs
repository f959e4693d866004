//! `autoinsight`: terminal front end for the query, analysis and
//! visualization consoles.

mod args;
mod terminal;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, bail};
use autoinsight_console::prelude::*;
use autoinsight_console::init_observability;
use clap::Parser as _;
use tracing::info;

use crate::args::{Cli, Command, VisualizeArgs};
use crate::terminal::{TerminalSurface, absolute_url};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_observability();
    let cli = Cli::parse();

    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = cli.base_url.as_deref() {
        config = config.base_url(base_url);
    }
    if let Some(secs) = cli.timeout_secs {
        config = config.timeout(Duration::from_secs(secs));
    }
    let base_url = config.base_url.clone();
    let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(config)?);
    info!(event = "cli.start", domain = "cli", base_url = %base_url);

    match cli.command {
        Command::Query {
            query,
            visualize_link,
        } => {
            let surface = Arc::new(TerminalSurface::new(cli.html, &base_url));
            let console = QueryConsole::new(backend, surface, default_renderer());
            settle(console.submit(&query).await)?;
            if visualize_link {
                if console.can_visualize() {
                    println!("{}", absolute_url(&base_url, &console.visualization_link()));
                } else {
                    eprintln!("The query returned no data to visualize.");
                }
            }
        }
        Command::Files => {
            let surface = Arc::new(TerminalSurface::new(cli.html, &base_url));
            let chat = AnalysisChat::new(backend, surface, default_renderer());
            chat.refresh_files().await?;
        }
        Command::Upload { path } => {
            let bytes = std::fs::read(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .context("upload path has no file name")?
                .to_string();
            let surface = Arc::new(TerminalSurface::new(cli.html, &base_url));
            let chat = AnalysisChat::new(backend, surface, default_renderer());
            settle(chat.upload(FileUpload::new(name, bytes)).await)?;
        }
        Command::Analyze { file, message } => {
            let surface = Arc::new(TerminalSurface::new(cli.html, &base_url));
            let chat = AnalysisChat::new(backend, surface, default_renderer());
            chat.select_file(&file);
            settle(chat.submit(&message).await)?;
        }
        Command::Visualize(args) => {
            let surface = Arc::new(TerminalSurface::new(cli.html, &base_url));
            let studio = VisualizationStudio::new(backend, surface, default_renderer());
            load_studio(&studio, &args)?;
            settle(studio.submit().await)?;
        }
    }
    Ok(())
}

fn load_studio(studio: &VisualizationStudio, args: &VisualizeArgs) -> anyhow::Result<()> {
    if let Some(data) = &args.data {
        studio.switch_source(DataSource::Text);
        studio.set_data_text(data.clone());
    } else if let Some(path) = &args.data_file {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let name = path.display().to_string();
        studio.switch_source(DataSource::File);
        studio.on_file_drop(FileUpload::new(name, bytes));
    } else if let Some(url) = &args.data_url {
        studio.switch_source(DataSource::Url);
        studio.set_data_url(url.clone());
    } else if let Some(link) = &args.link {
        studio.seed_from_link(link)?;
    }
    if let Some(chart_type) = &args.chart_type {
        studio.select_chart_type(chart_type.clone());
    }
    studio.set_query(args.request.clone());
    Ok(())
}

fn settle(outcome: SubmitOutcome) -> anyhow::Result<()> {
    match outcome {
        SubmitOutcome::Completed(_) => Ok(()),
        SubmitOutcome::Failed(message) => bail!(message),
        SubmitOutcome::Rejected(reason) => bail!(rejection_text(&reason)),
    }
}

fn rejection_text(reason: &RejectReason) -> String {
    match reason {
        RejectReason::Busy => "a request is already in flight".to_string(),
        RejectReason::EmptyInput => "input is empty".to_string(),
        RejectReason::NoFileSelected => "no file selected".to_string(),
        RejectReason::UnsupportedFileType(ext) if ext.is_empty() => {
            "file has no extension".to_string()
        }
        RejectReason::UnsupportedFileType(ext) => format!("unsupported file type {ext}"),
        RejectReason::MissingInput => "both data and a visualization request are required".to_string(),
    }
}
