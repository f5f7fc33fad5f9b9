//! Formatted terminal output.
//!
//! Formatting lives in one place so the statistics and fitting code stay free
//! of presentation concerns and output changes stay local.

use crate::domain::{EvaluationRow, ModelKind, TimeSeries};
use crate::fit::{ArimaSelection, HoldoutOutcome};
use crate::stats::{Correlogram, Decomposition, LjungBox, StationarityReport, DEFAULT_ALPHA};

const BAR_WIDTH: usize = 20;

/// Header block: symbol, period range and price range.
pub fn format_series_summary(symbol: &str, series: &TimeSeries) -> String {
    let mut out = String::new();
    out.push_str("=== tf - monthly forecast comparison ===\n");
    out.push_str(&format!("Symbol: {symbol}\n"));
    out.push_str(&format!(
        "Series: {}..{} | n={} | frequency={}\n",
        series.start(),
        series.end(),
        series.len(),
        series.frequency()
    ));
    if let Some((lo, hi)) = series.min_max() {
        let last = series.values().last().copied().unwrap_or(f64::NAN);
        out.push_str(&format!("Adjusted close: [{lo:.2}, {hi:.2}] | last={last:.2}\n"));
    }
    out
}

/// ADF/KPSS results for one series with the stationarity verdict.
pub fn format_stationarity(label: &str, report: &StationarityReport) -> String {
    let verdict = if report.is_stationary(DEFAULT_ALPHA) {
        "stationary"
    } else {
        "non-stationary"
    };
    let mut out = String::new();
    out.push_str(&format!("Stationarity ({label}): {verdict}\n"));
    out.push_str(&format!(
        "  ADF  stat={:>8.4} p={:.4} lags={}\n",
        report.adf.statistic, report.adf.p_value, report.adf.lags
    ));
    out.push_str(&format!(
        "  KPSS stat={:>8.4} p={:.4} lags={}\n",
        report.kpss.statistic, report.kpss.p_value, report.kpss.lags
    ));
    out
}

/// ACF/PACF bars. `*` marks lags outside the white-noise band.
pub fn format_correlogram(label: &str, correlogram: &Correlogram) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Correlogram ({label}): band=±{:.3}\n",
        correlogram.band
    ));
    out.push_str(
        format!("{:>4} {:>7} {:<w$} {:>7} {:<w$}\n", "lag", "acf", "", "pacf", "", w = BAR_WIDTH + 1).trim_end(),
    );
    out.push('\n');

    for (k, pacf) in correlogram.pacf.iter().enumerate() {
        let lag = k + 1;
        let acf = correlogram.acf.get(lag).copied().unwrap_or(f64::NAN);
        let line = format!(
            "{lag:>4} {acf:>+7.3} {:<w$} {pacf:>+7.3} {}",
            bar(acf, correlogram.band),
            bar(*pacf, correlogram.band),
            w = BAR_WIDTH + 1
        );
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

fn bar(r: f64, band: f64) -> String {
    if !r.is_finite() {
        return String::new();
    }
    let len = (r.abs().min(1.0) * BAR_WIDTH as f64).round() as usize;
    let mut s = "#".repeat(len);
    if r.abs() > band {
        s.push('*');
    }
    s
}

/// Component ranges of an STL decomposition.
pub fn format_decomposition(stl: &Decomposition) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "STL (period {}): seasonal strength={:.3} | seasonal amplitude={:.3}\n",
        stl.period,
        stl.seasonal_strength(),
        stl.seasonal_amplitude()
    ));
    for (name, values) in [
        ("trend", &stl.trend),
        ("seasonal", &stl.seasonal),
        ("remainder", &stl.remainder),
    ] {
        let (lo, hi) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        out.push_str(&format!("  {name:<10} [{lo:>10.3}, {hi:>10.3}]\n"));
    }
    out
}

/// The model comparison table, one row per fitted model.
pub fn format_comparison_table(rows: &[EvaluationRow]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<18} {:>12} {:>12} {:>12}\n", "model", "rmse", "aic", "bic"));
    out.push_str(&format!("{:-<18} {:-<12} {:-<12} {:-<12}\n", "", "", "", ""));
    for row in rows {
        out.push_str(&format!(
            "{:<18} {:>12} {:>12} {:>12}\n",
            truncate(row.model.display_name(), 18),
            fmt_opt(row.rmse, 4),
            fmt_opt(row.aic, 2),
            fmt_opt(row.bic, 2),
        ));
    }
    out
}

pub fn format_skipped(skipped: &[(ModelKind, String)]) -> String {
    let mut out = String::new();
    for (kind, reason) in skipped {
        out.push_str(&format!("  (skipped {}) {reason}\n", kind.display_name()));
    }
    out
}

/// Selected ARIMA order, differencing decisions and the residual check.
pub fn format_arima_selection(selection: &ArimaSelection, ljung_box: Option<&LjungBox>) -> String {
    let mut out = String::new();
    out.push_str(&format!("ARIMA: {}\n", selection.spec.label()));
    let strength = selection
        .differencing
        .seasonal_strength
        .map_or_else(|| "n/a".to_string(), |s| format!("{s:.3}"));
    out.push_str(&format!(
        "- differencing: d={} D={} (seasonal strength {strength})\n",
        selection.differencing.d, selection.differencing.seasonal_d
    ));
    out.push_str(&format!("- orders tried: {}\n", selection.models_tried));
    if let Some(c) = selection.best.criteria {
        out.push_str(&format!(
            "- loglik={:.3} aicc={:.3} (n={}, k={})\n",
            c.log_likelihood, c.aicc, c.n_obs, c.n_params
        ));
    }
    if let Some(lb) = ljung_box {
        out.push_str(&format!(
            "- Ljung-Box Q={:.3} lags={} df={} p={:.4}\n",
            lb.statistic, lb.lags, lb.df, lb.p_value
        ));
    }
    out
}

/// Out-of-sample results and the preferred model.
pub fn format_holdout(outcome: &HoldoutOutcome) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Hold-out: train={} test={} (test starts {})\n",
        outcome.train_len, outcome.test_len, outcome.test_start
    ));
    for r in &outcome.results {
        let chosen = if Some(r.model) == outcome.preferred { "*" } else { " " };
        out.push_str(&format!(
            "{chosen} {:<18} rmse={:>12} {}\n",
            truncate(r.model.display_name(), 18),
            fmt_opt(r.rmse, 4),
            r.label
        ));
    }
    out.push_str(&format_skipped(&outcome.skipped));
    match outcome.preferred {
        Some(kind) => out.push_str(&format!("Preferred model: {}\n", kind.display_name())),
        None => out.push_str("Preferred model: none (no hold-out forecast succeeded)\n"),
    }
    out
}

fn fmt_opt(v: Option<f64>, decimals: usize) -> String {
    match v {
        Some(x) if x.is_finite() => format!("{x:.decimals$}"),
        _ => "-".to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
