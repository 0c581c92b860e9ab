//! Column naming.
//!
//! Every derived column name is a pure function of its base signal and
//! parameter, so two stages with distinct parameters never collide.

pub const OPEN: &str = "Open";
pub const HIGH: &str = "High";
pub const LOW: &str = "Low";
pub const CLOSE: &str = "Close";
pub const VOLUME: &str = "Volume";

/// Base OHLCV columns every provider must return.
pub const OHLCV: [&str; 5] = [OPEN, HIGH, LOW, CLOSE, VOLUME];

pub const FORWARD_RETURN: &str = "forward_return";

/// Prefix carried by every benchmark-derived column.
pub const BENCHMARK_PREFIX: &str = "benchmark_";

pub const MACD_LINE: &str = "macd_line";
pub const MACD_SIGNAL_LINE: &str = "macd_signal_line";
pub const MACD_HISTOGRAM: &str = "macd_histogram";

pub const RSI: &str = "rsi";

pub const BOLLINGER_MID: &str = "bollinger_mid";
pub const BOLLINGER_LOWER: &str = "bollinger_lower";
pub const BOLLINGER_UPPER: &str = "bollinger_upper";

pub fn return_h(prefix: &str, horizon: usize) -> String {
    format!("{prefix}return_{horizon}")
}

pub fn volume_h(prefix: &str, horizon: usize) -> String {
    format!("{prefix}volume_{horizon}")
}

pub fn volatility_h(horizon: usize) -> String {
    format!("volatility_{horizon}")
}

/// `return_1`, the one-bar return consumed by the volatility and RSI stages.
pub fn return_1() -> String {
    return_h("", 1)
}
