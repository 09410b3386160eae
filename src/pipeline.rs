// src/pipeline.rs

use anyhow::{Context, Result};
use tokio::time::Instant;
use tracing::info;

use crate::config::PipelineConfig;
use crate::fetch;
use crate::process::{self, MergeOutcome};

/// Counts and paths from one run, for logging and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub tables: usize,
    pub raw_rows: usize,
    pub projected: usize,
    pub converted: usize,
    pub dropped: usize,
    pub merge: MergeOutcome,
}

/// Fetch → extract → project → checkpoint → convert → merge.
///
/// Each stage consumes the previous one's output; files written by finished
/// stages stay on disk when a later stage fails.
pub async fn run(cfg: &PipelineConfig) -> Result<RunReport> {
    cfg.validate()?;
    let start = Instant::now();

    // ─── 1) page markup ──────────────────────────────────────────────
    let markup = fetch::fetch_markup(&cfg.fetch)
        .await
        .with_context(|| format!("fetching {}", cfg.fetch.start_url))?;

    // ─── 2) tables → raw rows ────────────────────────────────────────
    let extraction = process::extract_tables(&markup, cfg.table_class())?;
    drop(markup);

    // ─── 3) projection + checkpoint ──────────────────────────────────
    let records =
        process::project_extraction(&extraction, &cfg.columns, cfg.table_class(), cfg.strict)?;
    let projected = records.len();
    let scraped_path = cfg.output.scraped_path();
    process::persist_projection(records, &scraped_path)
        .with_context(|| format!("writing {}", scraped_path.display()))?;

    // ─── 4) reload, clean, convert ───────────────────────────────────
    let checkpoint = process::load_checkpoint(&scraped_path)?;
    let outcome = process::clean_and_convert(&checkpoint, &cfg.factors)?;
    let dropped = outcome.dropped();
    let converted_path = cfg.output.converted_path();
    let converted = process::persist_converted(outcome, &converted_path)
        .with_context(|| format!("writing {}", converted_path.display()))?;

    // ─── 5) merge with the external dataset ──────────────────────────
    let merge = process::merge_with_external(&converted, &cfg.merge, &cfg.output.merged_path())?;

    let report = RunReport {
        tables: extraction.table_count(),
        raw_rows: extraction.rows.len(),
        projected,
        converted: converted.len(),
        dropped,
        merge,
    };
    info!(elapsed = ?start.elapsed(), ?report, "pipeline finished");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FetchConfig, MergeConfig, OutputConfig, SourceKind};
    use crate::error::PipelineError;
    use crate::process::Table;
    use std::{fs, path::Path};
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,dwarfscraper=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    const PAGE: &str = r#"<html><body>
<table class="wikitable sortable">
  <tr><th>Name</th><th>Constellation</th><th>RA</th><th>Dec</th><th>Type</th><th>Distance (ly)</th><th>Age</th><th>Mass</th><th>Radius</th><th>Notes</th></tr>
  <tr><td>Luhman 16A</td><td>Vela</td><td>10h 49m</td><td>−53° 19′</td><td>L7.5</td><td>6.5</td><td>0.6–0.8 Gyr</td><td>33.5 MJup</td><td>0.97 RJup</td><td>nearest</td></tr>
  <tr><td>Too short</td><td>a</td><td>b</td><td>c</td><td>d</td></tr>
</table>
</body></html>"#;

    fn config(dir: &Path, external: &Path) -> Result<PipelineConfig> {
        let page = dir.join("page.html");
        fs::write(&page, PAGE)?;
        Ok(PipelineConfig {
            fetch: FetchConfig {
                source: SourceKind::File,
                html_file: Some(page),
                ..FetchConfig::default()
            },
            output: OutputConfig {
                dir: dir.join("out"),
                ..OutputConfig::default()
            },
            merge: MergeConfig {
                external_path: external.to_path_buf(),
                ..MergeConfig::default()
            },
            ..PipelineConfig::default()
        })
    }

    #[tokio::test]
    async fn luhman_16a_end_to_end_without_external_dataset() -> Result<()> {
        init_test_logging();
        let dir = tempfile::tempdir()?;
        let external = dir.path().join("brightest_stars.csv");
        let cfg = config(dir.path(), &external)?;

        let report = run(&cfg).await?;
        assert_eq!(report.tables, 1);
        assert_eq!(report.raw_rows, 2);
        assert_eq!(report.projected, 1);
        assert_eq!(report.converted, 1);
        assert_eq!(report.merge, MergeOutcome::InputAbsent { path: external });
        assert!(!cfg.output.merged_path().exists());

        let scraped = Table::read_csv(cfg.output.scraped_path())?;
        assert_eq!(
            scraped.rows,
            vec![vec![
                "Luhman 16A".to_string(),
                "6.5".to_string(),
                "33.5 MJup".to_string(),
                "0.97 RJup".to_string(),
            ]]
        );

        let converted = Table::read_csv(cfg.output.converted_path())?;
        let mass: f64 = converted.rows[0][2].parse()?;
        let radius: f64 = converted.rows[0][3].parse()?;
        assert!((mass - 0.03197870).abs() < 1e-8);
        assert!((radius - 0.09968011).abs() < 1e-8);
        Ok(())
    }

    #[tokio::test]
    async fn external_dataset_is_merged_on_name() -> Result<()> {
        init_test_logging();
        let dir = tempfile::tempdir()?;
        let external = dir.path().join("brightest_stars.csv");
        fs::write(&external, "name,luminosity\nSirius,25.4\nLuhman 16A,0.00002\n")?;
        let cfg = config(dir.path(), &external)?;

        let report = run(&cfg).await?;
        assert_eq!(
            report.merge,
            MergeOutcome::Merged {
                path: cfg.output.merged_path(),
                rows: 2
            }
        );

        let merged = Table::read_csv(cfg.output.merged_path())?;
        assert_eq!(
            merged.headers,
            vec!["name", "luminosity", "distance", "mass", "radius"]
        );
        assert_eq!(merged.rows[0][0], "Luhman 16A");
        assert_eq!(merged.rows[0][1], "0.00002");
        assert_eq!(merged.rows[0][2], "6.5");
        assert_eq!(merged.rows[1][0], "Sirius");
        assert_eq!(merged.rows[1][2], "");
        Ok(())
    }

    #[tokio::test]
    async fn strict_mode_rejects_a_page_without_rows() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let external = dir.path().join("brightest_stars.csv");
        let mut cfg = config(dir.path(), &external)?;
        cfg.columns.min_cells = 11;
        cfg.strict = true;

        let err = run(&cfg).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::ExtractionEmpty { .. })
        ));
        assert!(!cfg.output.scraped_path().exists());
        Ok(())
    }

    #[tokio::test]
    async fn lenient_mode_writes_empty_tables() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let external = dir.path().join("brightest_stars.csv");
        let mut cfg = config(dir.path(), &external)?;
        cfg.columns.min_cells = 11;

        let report = run(&cfg).await?;
        assert_eq!(report.projected, 0);
        assert_eq!(report.converted, 0);
        assert_eq!(
            fs::read_to_string(cfg.output.converted_path())?,
            "id,name,distance,mass,radius\n"
        );
        Ok(())
    }
}
