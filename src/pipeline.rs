//! Fetch → tidy → write, once per indicator, with the indicators run side by side.
use crate::api::{PageSource, fetch_indicator};
use crate::error::{Error, PipelineFailure, Result};
use crate::models::{INDICATORS, tidy};
use crate::storage;
use log::{error, info};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::{self, JoinHandle};

/// Output prefix of a plain run; files land at `{prefix}_{indicator}.csv`.
pub const DEFAULT_PREFIX: &str = "./build/worldbank";

/// A CSV file produced by a completed pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub indicator: String,
    pub path: PathBuf,
    pub rows: usize,
}

/// `{prefix}_{suffix}.csv`
pub fn output_path(prefix: impl AsRef<Path>, suffix: &str) -> PathBuf {
    let mut s = OsString::from(prefix.as_ref().as_os_str());
    s.push("_");
    s.push(suffix);
    s.push(".csv");
    PathBuf::from(s)
}

/// Run one indicator through fetch, tidy and write.
pub async fn fetch_and_save<S>(
    source: &S,
    path: impl Into<PathBuf>,
    indicator: &str,
) -> Result<WrittenFile>
where
    S: PageSource + ?Sized,
{
    let path = path.into();
    let raw = fetch_indicator(source, indicator).await?;

    let target = path.clone();
    let rows = task::spawn_blocking(move || storage::write_csv(&target, tidy(raw))).await??;
    info!("{indicator}: wrote {rows} rows to {}", path.display());

    Ok(WrittenFile {
        indicator: indicator.to_string(),
        path,
        rows,
    })
}

/// Launch one pipeline per indicator and wait for every one of them.
///
/// Repeated ids are run once. Handles are awaited in input order, so completed
/// files come back in that order. If any pipeline failed the
/// result is [`Error::Pipelines`] carrying all failures; files written by the
/// pipelines that succeeded stay on disk, as do partial files of failed ones.
pub async fn fetch_and_save_many<S, I>(
    source: Arc<S>,
    prefix: impl AsRef<Path>,
    indicators: I,
) -> Result<Vec<WrittenFile>>
where
    S: PageSource + 'static,
    I: IntoIterator,
    I::Item: Into<String>,
{
    let prefix = prefix.as_ref();
    // one task per distinct id, first occurrence wins
    let mut ids: Vec<String> = Vec::new();
    for id in indicators {
        let id: String = id.into();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    let jobs: Vec<(String, JoinHandle<Result<WrittenFile>>)> = ids
        .into_iter()
        .map(|id| {
            let source = Arc::clone(&source);
            let path = output_path(prefix, &id);
            let task_id = id.clone();
            let handle =
                tokio::spawn(async move { fetch_and_save(&*source, path, &task_id).await });
            (id, handle)
        })
        .collect();

    let total = jobs.len();
    let mut written = Vec::with_capacity(total);
    let mut failures = Vec::new();
    for (indicator, handle) in jobs {
        match handle.await.map_err(Error::from).and_then(|r| r) {
            Ok(file) => written.push(file),
            Err(err) => {
                error!("{indicator}: {err}");
                failures.push(PipelineFailure {
                    indicator,
                    error: err,
                });
            }
        }
    }

    if failures.is_empty() {
        Ok(written)
    } else {
        Err(Error::Pipelines { failures, total })
    }
}

/// Run the whole indicator catalog, then write `{prefix}_meta.csv`.
///
/// The metadata table is only written when every pipeline succeeded.
pub async fn fetch_and_save_all<S>(
    source: Arc<S>,
    prefix: impl AsRef<Path>,
) -> Result<Vec<WrittenFile>>
where
    S: PageSource + 'static,
{
    let prefix = prefix.as_ref();
    let mut written =
        fetch_and_save_many(source, prefix, INDICATORS.iter().map(|i| i.id)).await?;

    let path = output_path(prefix, "meta");
    let target = path.clone();
    let rows = task::spawn_blocking(move || storage::save_indicators(&INDICATORS, &target)).await??;
    info!("wrote {rows} indicator labels to {}", path.display());
    written.push(WrittenFile {
        indicator: "meta".to_string(),
        path,
        rows,
    });
    Ok(written)
}
