//! ASCII plotting for terminal output.
//!
//! A fixed-size character grid, deterministic so it can be snapshot-tested.
//!
//! - actual series: `-` line
//! - forecast overlays: one marker character per model

use crate::domain::TimeSeries;

/// Point forecasts drawn on top of the series, starting at index `start`.
#[derive(Debug, Clone, Copy)]
pub struct Overlay<'a> {
    pub marker: char,
    pub label: &'a str,
    pub start: usize,
    pub values: &'a [f64],
}

/// Render `series` as a line with `overlays` as markers.
pub fn render_forecast_plot(series: &TimeSeries, overlays: &[Overlay<'_>], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let n_total = overlays
        .iter()
        .map(|o| o.start + o.values.len())
        .fold(series.len(), usize::max);
    let x_max = n_total.saturating_sub(1).max(1) as f64;

    let curve: Vec<(f64, f64)> = series
        .values()
        .iter()
        .enumerate()
        .map(|(i, &v)| (i as f64, v))
        .collect();
    let marks: Vec<(f64, f64, char)> = overlays
        .iter()
        .flat_map(|o| {
            o.values
                .iter()
                .enumerate()
                .map(move |(k, &v)| ((o.start + k) as f64, v, o.marker))
        })
        .filter(|(_, v, _)| v.is_finite())
        .collect();

    let all_y = curve.iter().map(|p| p.1).chain(marks.iter().map(|m| m.1));
    let (y_min, y_max) = y_range(all_y).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];
    draw_curve(&mut grid, &curve, x_max, y_min, y_max);
    for &(x, y, marker) in &marks {
        let col = map_x(x, 0.0, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        grid[row][col] = marker;
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {}..{} | y=[{y_min:.2}, {y_max:.2}]\n",
        series.start(),
        series.start().offset(n_total.saturating_sub(1) as i64),
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out.push_str("Legend: - actual");
    for o in overlays {
        out.push_str(&format!(" | {} {}", o.marker, o.label));
    }
    out.push('\n');
    out
}

fn y_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (min_y, max_y) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    (min_y.is_finite() && max_y.is_finite() && max_y > min_y).then_some((min_y, max_y))
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let pad = ((max - min).abs() * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // max is row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], x_max: f64, y_min: f64, y_max: f64) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in curve.iter().filter(|p| p.1.is_finite()) {
        let col = map_x(x, 0.0, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        match prev {
            Some((c0, r0)) => draw_line(grid, c0, r0, col, row, '-'),
            None => grid[row][col] = '-',
        }
        prev = Some((col, row));
    }
}

/// Bresenham line; only fills empty cells.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let (mut x0, mut y0) = (x0 as isize, y0 as isize);
    let (x1, y1) = (x1 as isize, y1 as isize);

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if let Some(cell) = grid
            .get_mut(y0 as usize)
            .and_then(|row| row.get_mut(x0 as usize))
            .filter(|cell| **cell == ' ')
        {
            *cell = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
