//! Background check for a newer release.
//!
//! The check runs concurrently with judging and never blocks it. Its result is
//! only looked at once the session is over, and a check that has not finished
//! by then is abandoned.

use std::{path::Path, time::Duration};

use anyhow::Context as _;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::config::UpdateConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateNotice {
    pub current: String,
    pub latest: String,
}

pub struct UpdateCheck {
    rx: mpsc::Receiver<UpdateNotice>,
    handle: JoinHandle<()>,
}

impl UpdateCheck {
    /// Starts the check in the background. `None` when checking is disabled.
    pub fn spawn(cfg: &UpdateConfig, current_version: &str) -> Option<Self> {
        if !cfg.enabled || cfg.version_url.trim().is_empty() {
            return None;
        }

        let (tx, rx) = mpsc::channel(1);
        let url = cfg.version_url.trim().to_owned();
        let current = current_version.to_owned();

        let handle = tokio::spawn(async move {
            match fetch_latest_version(&url).await {
                Ok(latest) if is_newer(&latest, &current) => {
                    let _ = tx.send(UpdateNotice { current, latest }).await;
                }
                Ok(latest) => log::debug!("Up to date (latest={})", latest),
                Err(e) => log::debug!("Update check failed: {:#}", e),
            }
        });
        Some(Self { rx, handle })
    }

    /// Returns the notice if the check already finished and found a new version.
    pub fn try_take(&mut self) -> Option<UpdateNotice> {
        self.rx.try_recv().ok()
    }

    #[cfg(test)]
    async fn wait(&mut self) -> Option<UpdateNotice> {
        self.rx.recv().await
    }

    pub fn cancel(self) {
        self.handle.abort();
    }
}

/// Any published version string other than ours counts as an update.
pub fn is_newer(latest: &str, current: &str) -> bool {
    !latest.is_empty() && latest != current
}

async fn fetch_latest_version(url: &str) -> anyhow::Result<String> {
    let body = client()?
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    Ok(body.trim().to_owned())
}

fn client() -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("Failed to build http client")
}

/// Downloads `url` into `dir`, naming the file after the last url segment.
pub async fn download(url: &str, dir: impl AsRef<Path>) -> anyhow::Result<std::path::PathBuf> {
    let name = url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty() && !s.contains(':'))
        .unwrap_or("olympcheck.download");
    let dest = dir.as_ref().join(name);

    let bytes = client()?
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await
        .with_context(|| format!("Failed to download {}", url))?;
    fsutil::write(&dest, &bytes)?;
    Ok(dest)
}
