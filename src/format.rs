//! Renders a [`SignalPayload`] as the five-line HTML message sent to the chat.
//!
//! Two fallback rules apply and must not be mixed up:
//! [`truthy_or`] replaces any falsy value (absent, `""`, `0`, `false`), while
//! [`present_or`] replaces only absent values, so a price of `0` still shows.

use crate::signal::{render_f64, Scalar, SignalPayload};

pub const DEFAULT_PRODUCT: &str = "KVFX";
pub const UNKNOWN: &str = "?";
pub const PLACEHOLDER: &str = "—";

/// Build the chat message for one alert.
pub fn format_message(payload: &SignalPayload) -> String {
    let signal = payload.signal();
    let market = payload.market();
    let risk = payload.risk();
    let extras = signal.extras();

    let timeframe = truthy(extras.tf.as_ref()).or_else(|| truthy(market.timeframe.as_ref()));

    [
        format!(
            "🧭 <b>{}</b> • <code>{}</code> {}",
            truthy_or(payload.product.as_ref(), DEFAULT_PRODUCT),
            truthy_or(market.symbol.as_ref(), UNKNOWN),
            truthy_or(signal.direction.as_ref(), UNKNOWN),
        ),
        format!(
            "🔔 <b>{}</b>  | 💪 {}/5  | 🤖 conf {}",
            truthy_or(signal.kind.as_ref(), UNKNOWN),
            present_or(signal.strength.as_ref(), PLACEHOLDER),
            to_fixed_2(signal.confidence.unwrap_or(0.0)),
        ),
        format!(
            "⏱ TF: {}  •  💵 {}",
            truthy_or(timeframe, PLACEHOLDER),
            present_or(market.price.as_ref(), PLACEHOLDER),
        ),
        format!(
            "🎯 TP: {}  •  🛡 SL: {}  •  Risk%: {}",
            present_or(risk.tp.as_ref(), PLACEHOLDER),
            present_or(risk.sl.as_ref(), PLACEHOLDER),
            present_or(risk.risk_pct.as_ref(), PLACEHOLDER),
        ),
        format!(
            "🔗 Chart: {}",
            truthy_or(payload.meta().chart_url.as_ref(), PLACEHOLDER),
        ),
    ]
    .join("\n")
}

fn truthy(value: Option<&Scalar>) -> Option<&Scalar> {
    value.filter(|v| v.is_truthy())
}

/// Logical-OR fallback: any falsy value is replaced.
pub fn truthy_or(value: Option<&Scalar>, fallback: &str) -> String {
    match truthy(value) {
        Some(v) => v.to_string(),
        None => fallback.to_string(),
    }
}

/// Nullish fallback: only an absent value is replaced.
pub fn present_or(value: Option<&Scalar>, fallback: &str) -> String {
    match value {
        Some(v) => v.to_string(),
        None => fallback.to_string(),
    }
}

/// Fixed two-decimal rendering with JavaScript `toFixed(2)` rounding:
/// exact halves round away from zero.
pub fn to_fixed_2(value: f64) -> String {
    if !value.is_finite() || value.abs() >= 1e21 {
        return render_f64(value);
    }
    // Normalize -0
    let value = if value == 0.0 { 0.0 } else { value };

    // Only multiples of 1/8 with an odd numerator sit exactly on a half cent
    let eighths = value * 8.0;
    let is_tie = eighths.fract() == 0.0 && eighths.rem_euclid(2.0) == 1.0;
    if !is_tie {
        return format!("{:.2}", value);
    }

    let cents = (value.abs() * 100.0).ceil() as u64;
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}{}.{:02}", sign, cents / 100, cents % 100)
}
