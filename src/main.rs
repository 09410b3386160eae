use anyhow::Result;
use clap::Parser;
use dwarfscraper::{
    config::{PipelineConfig, SourceKind},
    pipeline,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Scrape the brown-dwarf table, convert to solar units and merge with a
/// local star catalogue.
#[derive(Parser, Debug)]
#[command(name = "dwarfscraper", version)]
struct Cli {
    /// YAML config file; flags below override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Page to scrape.
    #[arg(long)]
    url: Option<String>,

    /// Where the page markup comes from.
    #[arg(long, value_enum)]
    source: Option<SourceKind>,

    /// Saved markup to read (implies `--source file`).
    #[arg(long)]
    html_file: Option<PathBuf>,

    /// Also write the fetched markup here.
    #[arg(long)]
    save_html: Option<PathBuf>,

    /// WebDriver endpoint for `--source browser`.
    #[arg(long)]
    webdriver: Option<String>,

    /// Seconds to wait for the marker element.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Show the browser window.
    #[arg(long)]
    no_headless: bool,

    /// Second dataset joined on `name`.
    #[arg(short, long)]
    external: Option<PathBuf>,

    /// Directory for the CSV outputs.
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Fail when no tables or rows are found.
    #[arg(long)]
    strict: bool,
}

impl Cli {
    fn into_config(self) -> Result<PipelineConfig> {
        let mut cfg = match &self.config {
            Some(path) => PipelineConfig::from_yaml_file(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(url) = self.url {
            cfg.fetch.start_url = url;
        }
        if let Some(source) = self.source {
            cfg.fetch.source = source;
        }
        if let Some(path) = self.html_file {
            cfg.fetch.html_file = Some(path);
            if self.source.is_none() {
                cfg.fetch.source = SourceKind::File;
            }
        }
        if let Some(path) = self.save_html {
            cfg.fetch.save_html = Some(path);
        }
        if let Some(endpoint) = self.webdriver {
            cfg.fetch.webdriver_url = endpoint;
        }
        if let Some(secs) = self.timeout_secs {
            cfg.fetch.wait_timeout_secs = secs;
        }
        if self.no_headless {
            cfg.fetch.headless = false;
        }
        if let Some(path) = self.external {
            cfg.merge.external_path = path;
        }
        if let Some(dir) = self.output_dir {
            cfg.output.dir = dir;
        }
        cfg.strict |= self.strict;
        Ok(cfg)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging (stderr; stdout carries the status line) ────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .init();

    // ─── 2) configure ────────────────────────────────────────────────
    let cfg = Cli::parse().into_config()?;
    info!(url = %cfg.fetch.start_url, source = ?cfg.fetch.source, "startup");

    // ─── 3) run ──────────────────────────────────────────────────────
    let report = pipeline::run(&cfg).await?;
    println!("{}", report.merge.message());
    Ok(())
}
