use serde::{de, Deserialize, Deserializer};
use serde_json::{Number, Value};
use std::fmt;

/// An alert as posted by the charting service. Every section is optional;
/// missing parts fall back to placeholders when the message is formatted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignalPayload {
    #[serde(default)]
    pub product: Option<Scalar>,
    #[serde(default, deserialize_with = "object_or_none")]
    pub signal: Option<SignalSection>,
    #[serde(default, deserialize_with = "object_or_none")]
    pub market: Option<MarketSection>,
    #[serde(default, deserialize_with = "object_or_none")]
    pub risk: Option<RiskSection>,
    #[serde(default, deserialize_with = "object_or_none")]
    pub meta: Option<MetaSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignalSection {
    #[serde(default)]
    pub direction: Option<Scalar>,
    #[serde(default, rename = "type")]
    pub kind: Option<Scalar>,
    /// 0 to 5
    #[serde(default)]
    pub strength: Option<Scalar>,
    /// 0.0 to 1.0
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default, deserialize_with = "object_or_none")]
    pub extras: Option<Extras>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Extras {
    #[serde(default)]
    pub tf: Option<Scalar>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarketSection {
    #[serde(default)]
    pub symbol: Option<Scalar>,
    #[serde(default)]
    pub timeframe: Option<Scalar>,
    #[serde(default)]
    pub price: Option<Scalar>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RiskSection {
    #[serde(default)]
    pub tp: Option<Scalar>,
    #[serde(default)]
    pub sl: Option<Scalar>,
    #[serde(default, rename = "riskPct")]
    pub risk_pct: Option<Scalar>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetaSection {
    #[serde(default)]
    pub chart_url: Option<Scalar>,
}

static EMPTY_SIGNAL: SignalSection = SignalSection {
    direction: None,
    kind: None,
    strength: None,
    confidence: None,
    extras: None,
};
static EMPTY_EXTRAS: Extras = Extras { tf: None };
static EMPTY_MARKET: MarketSection = MarketSection {
    symbol: None,
    timeframe: None,
    price: None,
};
static EMPTY_RISK: RiskSection = RiskSection {
    tp: None,
    sl: None,
    risk_pct: None,
};
static EMPTY_META: MetaSection = MetaSection { chart_url: None };

/// Sections are read only from JSON objects; any other value has no
/// properties and resolves to an all-absent section.
fn object_or_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    match Value::deserialize(deserializer)? {
        value @ Value::Object(_) => T::deserialize(value).map(Some).map_err(de::Error::custom),
        _ => Ok(None),
    }
}

impl SignalPayload {
    /// Explicit parse step for a raw request body.
    ///
    /// Invalid JSON and a `null` body are errors. Any other non-object body
    /// (array, string, number, boolean) carries no fields and formats as
    /// all placeholders.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        match serde_json::from_slice::<Value>(body)? {
            value @ (Value::Object(_) | Value::Null) => serde_json::from_value(value),
            _ => Ok(Self::default()),
        }
    }

    pub fn signal(&self) -> &SignalSection {
        self.signal.as_ref().unwrap_or(&EMPTY_SIGNAL)
    }

    pub fn market(&self) -> &MarketSection {
        self.market.as_ref().unwrap_or(&EMPTY_MARKET)
    }

    pub fn risk(&self) -> &RiskSection {
        self.risk.as_ref().unwrap_or(&EMPTY_RISK)
    }

    pub fn meta(&self) -> &MetaSection {
        self.meta.as_ref().unwrap_or(&EMPTY_META)
    }
}

impl SignalSection {
    pub fn extras(&self) -> &Extras {
        self.extras.as_ref().unwrap_or(&EMPTY_EXTRAS)
    }
}

/// A display value of arbitrary JSON type. Renders the way a JavaScript
/// template literal would, since alert templates are written against that.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Scalar(Value);

impl Scalar {
    #[cfg(test)]
    pub fn new(value: impl Into<Value>) -> Self {
        Self(value.into())
    }

    /// JavaScript truthiness: `""`, `0`, `false` and `null` are falsy.
    pub fn is_truthy(&self) -> bool {
        match &self.0 {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_value(&self.0))
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => render_number(n),
        Value::String(s) => s.clone(),
        // Array.prototype.join renders null elements as empty strings
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => render_value(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn render_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    n.as_f64().map(render_f64).unwrap_or_else(|| n.to_string())
}

/// Number-to-string conversion matching JavaScript's `String(number)`.
pub(crate) fn render_f64(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let magnitude = value.abs();
    if (1e-6..1e21).contains(&magnitude) {
        if value.fract() == 0.0 {
            format!("{:.0}", value)
        } else {
            format!("{}", value)
        }
    } else {
        let exp = format!("{:e}", value);
        match exp.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => {
                format!("{}e+{}", mantissa, power)
            }
            _ => exp,
        }
    }
}
