//! Synthetic price series generator.
//!
//! Last-resort stand-in used only when every real provider is down or in
//! cooldown. The series is a deterministic geometric walk seeded from the
//! symbol name, anchored so its final close equals the last live close
//! the controller has seen for that symbol (100.0 when none exists).
//! Always flagged `Provenance::Synthetic` so downstream confidence is
//! discounted; never written back into any live-price cache.

use chrono::{DateTime, Duration, Utc};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::types::{PriceBar, PriceSeries, Provenance};

/// Anchor price used when no live close has ever been observed.
const DEFAULT_ANCHOR: f64 = 100.0;
/// Daily return band: each synthetic step is within ±2%.
const DAILY_BAND: f64 = 0.02;

/// Deterministic linear congruential generator (Numerical Recipes
/// constants). Good enough for plausible-looking bars; this is not a
/// statistical model.
struct Lcg(u64);

impl Lcg {
    fn from_symbol(symbol: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        symbol.hash(&mut hasher);
        Self(hasher.finish() | 1)
    }

    fn next_u01(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
        // Upper 53 bits → [0, 1)
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Generate a synthetic daily series ending at `end`.
///
/// The walk is computed backwards from the anchor so the most recent
/// close — the one strategy construction uses — matches the last known
/// real price when one is available.
pub fn generate_at(
    symbol: &str,
    lookback_days: usize,
    anchor_close: Option<f64>,
    end: DateTime<Utc>,
) -> PriceSeries {
    let anchor = anchor_close.filter(|p| *p > 0.0).unwrap_or(DEFAULT_ANCHOR);
    let days = lookback_days.max(1);
    let mut rng = Lcg::from_symbol(symbol);

    let returns: Vec<f64> = (0..days)
        .map(|_| (rng.next_u01() - 0.5) * 2.0 * DAILY_BAND)
        .collect();

    // Walk closes backwards from the anchor.
    let mut closes = vec![0.0; days];
    closes[days - 1] = anchor;
    for i in (0..days - 1).rev() {
        closes[i] = closes[i + 1] / (1.0 + returns[i + 1]);
    }

    let bars: Vec<PriceBar> = closes
        .iter()
        .enumerate()
        .map(|(i, close)| {
            let spread = close * (0.002 + 0.006 * rng.next_u01());
            let open = close * (1.0 - returns[i] / 2.0);
            PriceBar {
                timestamp: end - Duration::days((days - 1 - i) as i64),
                open,
                high: open.max(*close) + spread,
                low: open.min(*close) - spread,
                close: *close,
                volume: (500_000.0 + 4_500_000.0 * rng.next_u01()).floor(),
            }
        })
        .collect();

    PriceSeries {
        symbol: symbol.to_string(),
        bars,
        provenance: Provenance::Synthetic,
    }
}

/// Generate a synthetic daily series ending now.
pub fn generate(symbol: &str, lookback_days: usize, anchor_close: Option<f64>) -> PriceSeries {
    generate_at(symbol, lookback_days, anchor_close, Utc::now())
}
