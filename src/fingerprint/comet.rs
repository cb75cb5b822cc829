//! Agent-extension probe
//!
//! Identifies the Comet agent extension through three escalating stages:
//! a prior positive cached in tab storage, a scan of script/link/stylesheet
//! URLs for the extension ID, and finally a race of candidate resource
//! loads inside the extension package. The race resolves on the first
//! successful load or after one second, whichever comes first; losing
//! loads are dropped.

use futures::stream::{FuturesUnordered, StreamExt};
use std::time::Duration;
use tracing::debug;

use super::registry::{COMET_DETECTED_KEY, COMET_EXTENSION_ID, COMET_RESOURCE_PATHS};
use super::types::ProbeGroup;
use crate::host::{ElementInfo, HostPage, TabStorage};
use crate::signal::Signal;

/// Upper bound on the resource-probe race
const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

pub(crate) async fn probe(
    page: &dyn HostPage,
    storage: &dyn TabStorage,
    elements: &[ElementInfo],
    stylesheets: &[String],
) -> ProbeGroup {
    // A positive identification sticks for the life of the tab.
    if storage.read(COMET_DETECTED_KEY).as_deref() == Some("true") {
        return ProbeGroup::from_signals(
            vec![Signal::new("comet.extension.cached", true, 10)],
            true,
        );
    }

    if let Some(src) = elements
        .iter()
        .filter(|e| e.tag == "script")
        .filter_map(|e| e.src.as_deref())
        .find(|src| src.contains(COMET_EXTENSION_ID))
    {
        return ProbeGroup::from_signals(
            vec![Signal::new("comet.extension.script", src, 10)],
            true,
        );
    }

    let stylesheet_hit = elements
        .iter()
        .filter(|e| e.tag == "link")
        .filter_map(|e| e.href.as_deref())
        .chain(stylesheets.iter().map(String::as_str))
        .find(|url| url.contains(COMET_EXTENSION_ID));

    if let Some(url) = stylesheet_hit {
        return ProbeGroup::from_signals(
            vec![Signal::new("comet.extension.stylesheet", url, 10)],
            true,
        );
    }

    if let Some(url) = race_resources(page).await {
        // Best-effort cache; a failed write just means re-probing next load.
        if storage.write(COMET_DETECTED_KEY, "true").is_err() {
            debug!("Could not cache extension identification");
        }

        return ProbeGroup::from_signals(
            vec![Signal::new("comet.extension.resource_probe", url, 10)],
            true,
        );
    }

    ProbeGroup::default()
}

/// Launch all candidate resource loads concurrently; resolve on the first
/// success or the timeout
async fn race_resources(page: &dyn HostPage) -> Option<String> {
    let mut loads: FuturesUnordered<_> = COMET_RESOURCE_PATHS
        .iter()
        .map(|path| {
            let url = format!("chrome-extension://{}/{}", COMET_EXTENSION_ID, path);
            async move {
                let hit = page.load_extension_resource(&url).await;
                (url, hit)
            }
        })
        .collect();

    let winner = tokio::time::timeout(PROBE_TIMEOUT, async {
        while let Some((url, hit)) = loads.next().await {
            if hit {
                return Some(url);
            }
        }
        None
    })
    .await;

    winner.unwrap_or(None)
}
