// src/fetch/browser.rs

use fantoccini::{error::CmdError, Client, ClientBuilder, Locator};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::FetchConfig;
use crate::error::FetchError;

/// Render `cfg.start_url` in a WebDriver session and return the page source
/// once an element with `cfg.marker_class` exists.
///
/// The session is closed before returning, whatever the outcome.
pub async fn render_page(cfg: &FetchConfig) -> Result<String, FetchError> {
    let client = open_session(cfg).await?;
    info!(endpoint = %cfg.webdriver_url, "webdriver session opened");

    let outcome = capture_markup(&client, cfg).await;

    match client.close().await {
        Ok(()) => debug!("webdriver session closed"),
        Err(e) => warn!(error = %e, "closing webdriver session failed"),
    }
    outcome
}

async fn open_session(cfg: &FetchConfig) -> Result<Client, FetchError> {
    ClientBuilder::native()
        .capabilities(capabilities(&cfg.browser, cfg.headless))
        .connect(&cfg.webdriver_url)
        .await
        .map_err(|e| FetchError::Session {
            endpoint: cfg.webdriver_url.clone(),
            message: e.to_string(),
        })
}

async fn capture_markup(client: &Client, cfg: &FetchConfig) -> Result<String, FetchError> {
    client
        .goto(&cfg.start_url)
        .await
        .map_err(|e| command_error("goto", e))?;

    let timeout = Duration::from_secs(cfg.wait_timeout_secs);
    let marker = format!(".{}", cfg.marker_class);
    match client
        .wait()
        .at_most(timeout)
        .for_element(Locator::Css(&marker))
        .await
    {
        Ok(_) => {}
        Err(CmdError::WaitTimeout) => {
            return Err(FetchError::Timeout {
                url: cfg.start_url.clone(),
                marker: cfg.marker_class.clone(),
                timeout,
            })
        }
        Err(e) => return Err(command_error("wait", e)),
    }

    client.source().await.map_err(|e| command_error("source", e))
}

fn command_error(command: &'static str, err: CmdError) -> FetchError {
    FetchError::Command {
        command,
        message: err.to_string(),
    }
}

/// W3C capabilities for the requested browser.
fn capabilities(browser: &str, headless: bool) -> Map<String, Value> {
    let mut caps = Map::new();
    match browser.to_lowercase().as_str() {
        "firefox" => {
            caps.insert("browserName".to_string(), json!("firefox"));
            let args: Vec<&str> = if headless { vec!["-headless"] } else { vec![] };
            caps.insert("moz:firefoxOptions".to_string(), json!({ "args": args }));
        }
        other => {
            caps.insert("browserName".to_string(), json!(other));
            let mut args = vec!["--disable-gpu", "--no-sandbox"];
            if headless {
                args.push("--headless=new");
            }
            caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
        }
    }
    caps
}
