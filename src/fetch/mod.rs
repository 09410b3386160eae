// src/fetch/mod.rs

use anyhow::{Context, Result};
use scraper::{Html, Selector};
use std::{path::Path, time::Duration};
use tokio::fs;
use tracing::info;

use crate::config::{FetchConfig, SourceKind};
use crate::error::{FetchError, PipelineError};

pub mod browser;
pub mod http;

/// Obtain the page markup from the configured source.
///
/// Browser sources only return once the marker has rendered; the other
/// sources are checked for the marker after the fact so every path gives
/// the same guarantee to the extractor.
#[tracing::instrument(level = "info", skip(cfg), fields(source = ?cfg.source))]
pub async fn fetch_markup(cfg: &FetchConfig) -> Result<String> {
    let markup = match cfg.source {
        SourceKind::Browser => browser::render_page(cfg).await?,
        SourceKind::Http => {
            let timeout = Duration::from_secs(cfg.wait_timeout_secs);
            let markup = http::get_page(&cfg.start_url, timeout).await?;
            ensure_marker(&markup, &cfg.marker_class, &cfg.start_url)?;
            markup
        }
        SourceKind::File => {
            let path = cfg.html_file.as_deref().ok_or_else(|| {
                PipelineError::InvalidConfig("source `file` needs html_file".to_string())
            })?;
            let markup = read_saved(path).await?;
            ensure_marker(&markup, &cfg.marker_class, &path.display().to_string())?;
            markup
        }
    };
    info!(bytes = markup.len(), "page markup ready");

    if let Some(dest) = &cfg.save_html {
        fs::write(dest, &markup)
            .await
            .with_context(|| format!("saving page markup to {}", dest.display()))?;
        info!(path = %dest.display(), "saved page markup");
    }

    Ok(markup)
}

async fn read_saved(path: &Path) -> Result<String, FetchError> {
    fs::read_to_string(path)
        .await
        .map_err(|source| FetchError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// CSS selector for "any element carrying `class`".
pub(crate) fn class_selector(class: &str) -> Result<Selector, PipelineError> {
    Selector::parse(&format!(".{}", class)).map_err(|e| {
        PipelineError::InvalidConfig(format!("class {:?} is not selectable: {:?}", class, e))
    })
}

/// Fails with `MarkerMissing` unless `markup` holds an element with `marker_class`.
pub fn ensure_marker(markup: &str, marker_class: &str, source_name: &str) -> Result<()> {
    let selector = class_selector(marker_class)?;
    let document = Html::parse_document(markup);
    if document.select(&selector).next().is_none() {
        return Err(FetchError::MarkerMissing {
            source_name: source_name.to_string(),
            marker: marker_class.to_string(),
        }
        .into());
    }
    Ok(())
}
