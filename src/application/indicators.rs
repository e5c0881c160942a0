//! Indicator engine.
//!
//! Turns a bar window into a discrete timing signal with a numeric score and
//! ATR-sized exit levels. Everything here is pure and deterministic: the same
//! bars always produce the same analysis.
//!
//! Scoring, evaluated in this order on the latest bar:
//!
//! 1. close above the slow EMA: +2, BUY unless RSI is overbought
//! 2. golden cross (fast EMA crosses above slow on this bar): +3, STRONG_BUY
//! 3. breakout (close crosses above slow EMA on this bar): +1
//! 4. RSI overbought: WAIT with score 0, overriding everything above
//! 5. RSI oversold: BUY_DIP, +2, even when the trend condition failed

use serde::Serialize;

use crate::domain::error::DomainError;
use crate::domain::values::bar::Bar;
use crate::domain::values::signal::TechSignal;

pub const FAST_SPAN: usize = 20;
pub const SLOW_SPAN: usize = 50;
pub const RSI_PERIOD: usize = 14;
pub const ATR_PERIOD: usize = 14;
pub const OVERBOUGHT: f64 = 70.0;
pub const OVERSOLD: f64 = 30.0;
/// ATR substitute, as a fraction of close, when history is too short.
pub const ATR_FALLBACK_PCT: f64 = 0.02;
pub const STOP_ATR_MULT: f64 = 2.0;
pub const TARGET_ATR_MULT: f64 = 3.0;
/// Current and previous bar are both needed for the crossover checks.
pub const MIN_BARS: usize = 2;

pub const TREND_SMA_PERIOD: usize = 30;

/// Result of analysing an intraday bar window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechnicalAnalysis {
    pub signal: TechSignal,
    pub score: f64,
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub rsi: f64,
    pub atr: f64,
    pub fast_ema: f64,
    pub slow_ema: f64,
    /// Fast EMA crossed above slow EMA on the latest bar.
    pub crossover: bool,
    /// Close crossed above slow EMA on the latest bar.
    pub breakout: bool,
    pub diagnostics: Vec<String>,
}

impl TechnicalAnalysis {
    /// `stop_loss < entry < take_profit`, the shape a position requires.
    pub fn has_valid_exits(&self) -> bool {
        self.stop_loss < self.entry && self.entry < self.take_profit
    }
}

/// Exponential moving average, `alpha = 2 / (span + 1)`, seeded with the
/// first value.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    smooth(values, alpha)
}

fn smooth(values: &[f64], alpha: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for &v in values {
        let next = match prev {
            Some(p) => alpha * v + (1.0 - alpha) * p,
            None => v,
        };
        out.push(next);
        prev = Some(next);
    }
    out
}

/// Wilder RSI: gains and losses smoothed with `alpha = 1 / period`.
///
/// The first bar has no change and contributes a zero gain and loss. A
/// window with no movement at all reads 50; one with no losses reads 100.
pub fn wilder_rsi(closes: &[f64], period: usize) -> Vec<f64> {
    if closes.is_empty() {
        return Vec::new();
    }
    let mut gains = Vec::with_capacity(closes.len());
    let mut losses = Vec::with_capacity(closes.len());
    gains.push(0.0);
    losses.push(0.0);
    for w in closes.windows(2) {
        let delta = w[1] - w[0];
        gains.push(delta.max(0.0));
        losses.push((-delta).max(0.0));
    }

    let alpha = 1.0 / period as f64;
    let avg_gain = smooth(&gains, alpha);
    let avg_loss = smooth(&losses, alpha);

    avg_gain
        .iter()
        .zip(avg_loss.iter())
        .map(|(&g, &l)| {
            if l == 0.0 {
                if g == 0.0 {
                    50.0
                } else {
                    100.0
                }
            } else {
                100.0 - 100.0 / (1.0 + g / l)
            }
        })
        .collect()
}

/// Average true range: simple mean of the last `period` true ranges.
/// `None` until `period` true ranges exist.
pub fn atr(bars: &[Bar], period: usize) -> Vec<Option<f64>> {
    let mut true_ranges = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        let hl = bar.high - bar.low;
        let tr = if i == 0 {
            hl
        } else {
            let prev_close = bars[i - 1].close;
            hl.max((bar.high - prev_close).abs())
                .max((bar.low - prev_close).abs())
        };
        true_ranges.push(tr);
    }

    (0..true_ranges.len())
        .map(|i| {
            if i + 1 < period {
                None
            } else {
                let window = &true_ranges[i + 1 - period..=i];
                Some(window.iter().sum::<f64>() / period as f64)
            }
        })
        .collect()
}

/// Analyse an intraday window. Fails with `DataUnavailable` when there are
/// fewer than [`MIN_BARS`] bars; callers must skip the candidate rather than
/// read it as NEUTRAL.
pub fn analyze(bars: &[Bar]) -> Result<TechnicalAnalysis, DomainError> {
    if bars.len() < MIN_BARS {
        return Err(DomainError::DataUnavailable(format!(
            "need at least {MIN_BARS} bars, got {}",
            bars.len()
        )));
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let fast = ema(&closes, FAST_SPAN);
    let slow = ema(&closes, SLOW_SPAN);
    let rsi_series = wilder_rsi(&closes, RSI_PERIOD);
    let atr_series = atr(bars, ATR_PERIOD);

    let last = bars.len() - 1;
    let prev = last - 1;
    let close = closes[last];
    let rsi = rsi_series[last];
    let atr = match atr_series[last] {
        // A flat window (halted ticker) yields zero and would collapse the exits.
        Some(v) if v.is_finite() && v > 0.0 => v,
        _ => close * ATR_FALLBACK_PCT,
    };

    let mut signal = TechSignal::Neutral;
    let mut score = 0.0;
    let mut diagnostics = Vec::new();

    if close > slow[last] {
        score += 2.0;
        diagnostics.push(format!("Uptrend: close {close:.2} above EMA{SLOW_SPAN} {:.2}", slow[last]));
        if rsi < OVERBOUGHT {
            signal = TechSignal::Buy;
        } else {
            diagnostics.push("RSI too high to confirm the trend".to_string());
        }
    }

    let crossover = fast[last] > slow[last] && fast[prev] <= slow[prev];
    if crossover {
        score += 3.0;
        signal = TechSignal::StrongBuy;
        diagnostics.push(format!("Golden cross: EMA{FAST_SPAN} crossed above EMA{SLOW_SPAN}"));
    }

    let breakout = close > slow[last] && closes[prev] <= slow[prev];
    if breakout {
        score += 1.0;
        diagnostics.push(format!("Breakout above EMA{SLOW_SPAN}"));
    }

    if rsi >= OVERBOUGHT {
        signal = TechSignal::Wait;
        score = 0.0;
        diagnostics.push(format!("Overbought: RSI {rsi:.0}"));
    }

    if rsi < OVERSOLD {
        signal = TechSignal::BuyDip;
        score += 2.0;
        diagnostics.push(format!("Oversold: RSI {rsi:.0}"));
    }

    Ok(TechnicalAnalysis {
        signal,
        score,
        entry: close,
        stop_loss: close - STOP_ATR_MULT * atr,
        take_profit: close + TARGET_ATR_MULT * atr,
        rsi,
        atr,
        fast_ema: fast[last],
        slow_ema: slow[last],
        crossover,
        breakout,
        diagnostics,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrendVerdict {
    Bullish,
    Bearish,
}

impl std::fmt::Display for TrendVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendVerdict::Bullish => write!(f, "BULLISH"),
            TrendVerdict::Bearish => write!(f, "BEARISH"),
        }
    }
}

/// Coarse medium-term trend from weekly bars.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendCheck {
    pub verdict: TrendVerdict,
    pub close: f64,
    pub sma: f64,
    pub rsi: f64,
    pub details: Vec<String>,
}

/// Weekly close against its 30-bar SMA. Needs at least 30 bars.
pub fn trend_check(bars: &[Bar]) -> Result<TrendCheck, DomainError> {
    if bars.len() < TREND_SMA_PERIOD {
        return Err(DomainError::DataUnavailable(format!(
            "need at least {TREND_SMA_PERIOD} weekly bars, got {}",
            bars.len()
        )));
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let tail = &closes[closes.len() - TREND_SMA_PERIOD..];
    let sma = tail.iter().sum::<f64>() / TREND_SMA_PERIOD as f64;
    let close = closes[closes.len() - 1];
    let rsi = wilder_rsi(&closes, RSI_PERIOD)
        .last()
        .copied()
        .unwrap_or(50.0);

    let verdict = if close > sma {
        TrendVerdict::Bullish
    } else {
        TrendVerdict::Bearish
    };

    let mut details = vec![format!("Weekly RSI: {rsi:.0}")];
    if verdict == TrendVerdict::Bearish {
        details.push(format!("Below weekly SMA{TREND_SMA_PERIOD}"));
    }

    Ok(TrendCheck {
        verdict,
        close,
        sma,
        rsi,
        details,
    })
}
