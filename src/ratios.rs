//! Pure ratio functions over reconciled facts and market data.
//!
//! Every division follows the same rule: a non-positive denominator returns
//! exactly 0, for any numerator. Zero/negative equity is rare and callers do
//! not consume signed-ratio semantics, so the simplification is applied
//! uniformly rather than special-cased.

/// Retained earnings as a percentage of total equity.
pub fn retained_earnings_ratio(retained: i64, equity: i64) -> f64 {
    if equity > 0 {
        retained as f64 / equity as f64 * 100.0
    } else {
        0.0
    }
}

/// Cash plus short-term financial assets as a percentage of current assets.
pub fn cash_ratio(cash: i64, short_term_financial: i64, current_assets: i64) -> f64 {
    if current_assets > 0 {
        (cash + short_term_financial) as f64 / current_assets as f64 * 100.0
    } else {
        0.0
    }
}

/// Return on equity in percent.
pub fn roe(net_income: i64, equity: i64) -> f64 {
    if equity > 0 {
        net_income as f64 / equity as f64 * 100.0
    } else {
        0.0
    }
}

/// Price-to-book ratio from market capitalization and total equity.
pub fn pbr(market_cap: i64, equity: i64) -> f64 {
    if equity > 0 {
        market_cap as f64 / equity as f64
    } else {
        0.0
    }
}

/// Composite screening score. Only the PBR term is clamped (at 3) to cap the
/// reward for extremely low valuations; yield and profitability contribute
/// unbounded, so the score itself is unbounded above.
pub fn composite_score(pbr: f64, dividend_yield: f64, roe: f64) -> f64 {
    (3.0 - pbr.min(3.0)) * 30.0 + dividend_yield * 5.0 + roe * 1.5
}
