use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{error, info, instrument, warn};

use crate::config::ProviderConfig;
use crate::dates::{DateRange, iso};
use crate::error::Result;
use crate::export::{build_workbook, export_path};
use crate::io::excel_write;
use crate::model::DateKeyedResults;
use crate::providers::Integration;

/// Fetches everything one integration offers for `range` and exports it.
///
/// Returns the written workbook path, or `None` when the provider had no
/// itineraries at all.
#[instrument(
    level = "info",
    skip_all,
    fields(integration = integration.name(), output_dir = %output_dir.display())
)]
pub fn run_integration(
    integration: &dyn Integration,
    config: &ProviderConfig,
    range: &DateRange,
    output_dir: &Path,
) -> Result<Option<PathBuf>> {
    let results = integration.fetch(config, range)?;
    info!(
        dates = results.date_count(),
        records = results.record_count(),
        "itineraries collected"
    );
    export_results(integration.name(), &results, range, output_dir)
}

/// Writes `results` to `<output_dir>/<provider>-itinerarios-<start>-<end>.xlsx`.
pub fn export_results(
    provider: &str,
    results: &DateKeyedResults,
    range: &DateRange,
    output_dir: &Path,
) -> Result<Option<PathBuf>> {
    if results.is_empty() {
        warn!(provider, "no itineraries to export");
        return Ok(None);
    }

    info!(provider, "exporting data");
    let workbook = build_workbook(results);
    let path = export_path(output_dir, provider, range.start(), range.end());
    excel_write::write_workbook(&path, &workbook)?;
    info!(provider, path = %path.display(), "data exported");
    Ok(Some(path))
}

/// Runs the integrations one after another.
///
/// A provider that answers with a fatal status or rejects the request only
/// ends its own integration: nothing is exported for it and the batch moves
/// on. Every other error stops the batch.
///
/// `load_config` is asked for each integration's configuration right before
/// it runs, so a missing variable only surfaces once its turn comes.
pub fn run_batch<F>(
    integrations: &[&dyn Integration],
    range: &DateRange,
    output_dir: &Path,
    load_config: F,
) -> Result<Vec<Option<PathBuf>>>
where
    F: Fn(&dyn Integration) -> Result<ProviderConfig>,
{
    let started = Instant::now();
    info!(
        start = %iso(range.start()),
        end = %iso(range.end()),
        dates = range.len(),
        integrations = integrations.len(),
        "starting process"
    );

    let outcome = integrations
        .iter()
        .map(|integration| run_one(*integration, range, output_dir, &load_config))
        .collect::<Result<Vec<_>>>();

    match &outcome {
        Ok(_) => info!(elapsed = %seconds(started.elapsed()), "process completed"),
        Err(err) => error!(elapsed = %seconds(started.elapsed()), error = %err, "process aborted"),
    }
    outcome
}

fn run_one<F>(
    integration: &dyn Integration,
    range: &DateRange,
    output_dir: &Path,
    load_config: &F,
) -> Result<Option<PathBuf>>
where
    F: Fn(&dyn Integration) -> Result<ProviderConfig>,
{
    let started = Instant::now();
    let config = load_config(integration)?;
    if !integration.ready() {
        warn!(integration = integration.name(), "integration is not ready");
    }
    info!(integration = integration.name(), "starting integration");

    let exported = match run_integration(integration, &config, range, output_dir) {
        Ok(exported) => exported,
        Err(err) if err.ends_integration() => {
            error!(integration = integration.name(), error = %err, "integration aborted");
            None
        }
        Err(err) => return Err(err),
    };
    info!(
        integration = integration.name(),
        elapsed = %seconds(started.elapsed()),
        "integration completed"
    );
    Ok(exported)
}

fn seconds(duration: Duration) -> String {
    format!("{:.2}s", duration.as_secs_f64())
}
