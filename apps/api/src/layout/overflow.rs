//! Overflow Detector: flags preview containers whose content is taller than their box.
//!
//! The browser measures `scrollHeight` / `clientHeight` for the node ids emitted by
//! the preview adapter and posts them here. Results are advisory: they toggle a CSS
//! class in the preview and never feed back into the page plan or the PDF.

use serde::{Deserialize, Serialize};

/// Tolerance for sub-pixel rounding between `scrollHeight` and `clientHeight`.
pub const DEFAULT_EPSILON_PX: f32 = 1.0;

/// Class the preview toggles on an overflowing node.
pub const OVERFLOW_CLASS: &str = "cv-overflow";

/// Delays (ms after mount or after a content change) at which the client re-measures.
///
/// Fonts and images may still be loading right after render, so a single
/// measurement is unreliable.
pub const RECHECK_SCHEDULE_MS: [u64; 4] = [0, 150, 500, 1500];

/// One DOM measurement. Missing heights mean the node was not found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverflowProbe {
    pub node_id: String,
    #[serde(default)]
    pub scroll_height: Option<f32>,
    #[serde(default)]
    pub client_height: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverflowFlag {
    pub node_id: String,
    pub overflow_px: f32,
    /// Page number parsed from the node id, when it follows the preview scheme.
    pub page: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverflowReport {
    pub flags: Vec<OverflowFlag>,
    pub overflowing_pages: Vec<usize>,
    pub css_class: String,
    pub recheck_schedule_ms: Vec<u64>,
}

/// Returns the probes whose content exceeds their box by more than `epsilon`.
///
/// Unmounted nodes and zero-height containers are skipped silently.
pub fn detect_overflow(probes: &[OverflowProbe], epsilon: f32) -> Vec<OverflowFlag> {
    probes
        .iter()
        .filter_map(|probe| {
            let scroll = probe.scroll_height?;
            let client = probe.client_height?;
            if !scroll.is_finite() || !client.is_finite() || client <= 0.0 {
                return None;
            }
            let excess = scroll - client;
            (excess > epsilon).then(|| OverflowFlag {
                node_id: probe.node_id.clone(),
                overflow_px: excess,
                page: page_of(&probe.node_id),
            })
        })
        .collect()
}

/// Runs detection and summarizes which pages are affected.
pub fn build_report(probes: &[OverflowProbe], epsilon: f32) -> OverflowReport {
    let flags = detect_overflow(probes, epsilon);
    let mut overflowing_pages: Vec<usize> = flags.iter().filter_map(|f| f.page).collect();
    overflowing_pages.sort_unstable();
    overflowing_pages.dedup();

    OverflowReport {
        flags,
        overflowing_pages,
        css_class: OVERFLOW_CLASS.to_string(),
        recheck_schedule_ms: RECHECK_SCHEDULE_MS.to_vec(),
    }
}

/// Node id of a page container.
pub fn page_node_id(page: usize) -> String {
    format!("page-{page}")
}

/// Node id of a section container on a page.
pub fn section_node_id(page: usize, section_key: &str) -> String {
    format!("page-{page}-{section_key}")
}

fn page_of(node_id: &str) -> Option<usize> {
    let rest = node_id.strip_prefix("page-")?;
    let number = rest.split('-').next()?;
    number.parse().ok()
}
