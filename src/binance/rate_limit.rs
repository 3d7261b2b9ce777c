// =============================================================================
// Request-Weight Tracker — keeps kline polling under Binance's 1m weight cap
// =============================================================================
//
// Binance allows 1200 request weight per minute per IP on the spot API. We
// hard-cap ourselves at 1000. The tracker reads `X-MBX-USED-WEIGHT-1M` after
// every response. The reported weight only counts for the window it was seen
// in: once a full window passes without a fresh header, the budget is
// considered spent down to zero again.
// =============================================================================

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Hard ceiling at which we refuse to send additional requests.
const WEIGHT_HARD_LIMIT: u32 = 1000;
/// Soft warning threshold.
const WEIGHT_WARN_THRESHOLD: u32 = 800;
/// Length of Binance's rolling weight window.
const WEIGHT_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Default)]
struct WeightWindow {
    used: u32,
    updated_at: Option<Instant>,
}

pub struct WeightTracker {
    state: Mutex<WeightWindow>,
    window: Duration,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct WeightSnapshot {
    pub used_weight_1m: u32,
    pub hard_limit: u32,
}

impl WeightTracker {
    pub fn new() -> Self {
        Self::with_window(WEIGHT_WINDOW)
    }

    pub(crate) fn with_window(window: Duration) -> Self {
        Self {
            state: Mutex::new(WeightWindow::default()),
            window,
        }
    }

    /// Weight used in the current window; zero once the last report is stale.
    fn current(&self) -> u32 {
        let mut state = self.state.lock();
        match state.updated_at {
            Some(at) if at.elapsed() >= self.window => {
                if state.used > 0 {
                    info!(previous_weight = state.used, "rate-limit window rolled over");
                }
                *state = WeightWindow::default();
                0
            }
            _ => state.used,
        }
    }

    /// Update the counter from Binance response headers.
    pub fn update_from_headers(&self, headers: &reqwest::header::HeaderMap) {
        let Some(w) = headers
            .get("X-MBX-USED-WEIGHT-1M")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u32>().ok())
        else {
            return;
        };

        let prev = self.current();
        {
            let mut state = self.state.lock();
            state.used = w;
            state.updated_at = Some(Instant::now());
        }

        if w >= WEIGHT_WARN_THRESHOLD && prev < WEIGHT_WARN_THRESHOLD {
            warn!(
                used_weight = w,
                hard_limit = WEIGHT_HARD_LIMIT,
                "rate-limit weight crossed warning threshold"
            );
        }
        debug!(used_weight_1m = w, "rate-limit weight updated from header");
    }

    /// `true` if spending `weight` more would stay within the hard limit.
    pub fn can_send_request(&self, weight: u32) -> bool {
        let current = self.current();
        let allowed = current.saturating_add(weight) <= WEIGHT_HARD_LIMIT;
        if !allowed {
            warn!(
                current_weight = current,
                requested_weight = weight,
                hard_limit = WEIGHT_HARD_LIMIT,
                "request blocked — would exceed rate-limit"
            );
        }
        allowed
    }

    pub fn snapshot(&self) -> WeightSnapshot {
        WeightSnapshot {
            used_weight_1m: self.current(),
            hard_limit: WEIGHT_HARD_LIMIT,
        }
    }
}

impl Default for WeightTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WeightTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeightTracker")
            .field("used_weight_1m", &self.current())
            .field("window", &self.window)
            .finish()
    }
}
