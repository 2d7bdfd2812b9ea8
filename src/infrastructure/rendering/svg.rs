//! Headless SVG charts: line series with legend, histogram and annotated
//! heatmap. Output is a standalone UTF-8 SVG document.

use std::fmt::Write;

const WIDTH: f64 = 720.0;
const HEIGHT: f64 = 480.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 60.0;

pub mod palette {
    pub const BACKGROUND: &str = "#FFFFFF";
    pub const GRID: &str = "#D0D7DE";
    pub const TEXT: &str = "#161B22";
    pub const TITLE: &str = "#0D2A6B";
    pub const RED: &str = "#FF1744";
    pub const GREEN: &str = "#00A152";
    pub const BLUE: &str = "#2979FF";
    pub const BAR: &str = "#87CEEB";
}

/// One line of a line chart
pub struct Series<'a> {
    pub label: &'a str,
    pub color: &'a str,
    pub values: &'a [f64],
}

/// Line chart over shared x values; non-finite points are skipped
pub fn line_chart(title: &str, x_label: &str, y_label: &str, x: &[f64], series: &[Series<'_>]) -> String {
    let ys = series.iter().flat_map(|s| s.values.iter().copied());
    let (x_min, x_max) = bounds(x.iter().copied());
    let (y_min, y_max) = bounds(ys);
    let frame = Frame::new(x_min, x_max, y_min, y_max);

    let mut svg = open_document(title);
    frame.grid(&mut svg);
    frame.axis_labels(&mut svg, x_label, y_label);

    for s in series {
        let points: Vec<String> = x
            .iter()
            .zip(s.values)
            .filter(|(xv, yv)| xv.is_finite() && yv.is_finite())
            .map(|(xv, yv)| format!("{:.2},{:.2}", frame.px(*xv), frame.py(*yv)))
            .collect();
        let _ = writeln!(
            svg,
            r#"<polyline fill="none" stroke="{}" stroke-width="2" points="{}"/>"#,
            s.color,
            points.join(" ")
        );
        for point in &points {
            if let Some((cx, cy)) = point.split_once(',') {
                let _ = writeln!(
                    svg,
                    r#"<circle cx="{}" cy="{}" r="3" fill="{}"/>"#,
                    cx, cy, s.color
                );
            }
        }
    }

    legend(&mut svg, series);
    close_document(svg)
}

/// Histogram of `values` over `bins` equal-width buckets
pub fn histogram(title: &str, x_label: &str, values: &[f64], bins: usize) -> String {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let counts = bucket_counts(&finite, bins.max(1));
    let (lo, hi) = bounds(finite.iter().copied());
    let max_count = counts.iter().map(|(_, _, c)| *c).max().unwrap_or(0) as f64;
    let frame = Frame::new(lo, hi, 0.0, max_count.max(1.0));

    let mut svg = open_document(title);
    frame.grid(&mut svg);
    frame.axis_labels(&mut svg, x_label, "Frequency");

    for (start, end, count) in counts {
        let x0 = frame.px(start);
        let x1 = frame.px(end);
        let y = frame.py(count as f64);
        let _ = writeln!(
            svg,
            r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}" stroke="{}" stroke-width="1.5"/>"#,
            x0,
            y,
            (x1 - x0).max(1.0),
            frame.py(0.0) - y,
            palette::BAR,
            palette::TEXT
        );
    }
    close_document(svg)
}

/// Square heatmap with each cell annotated to two decimals
pub fn heatmap(title: &str, labels: &[&str], matrix: &[Vec<f64>]) -> String {
    let n = labels.len().max(1);
    let side = (HEIGHT - MARGIN_TOP - MARGIN_BOTTOM).min(WIDTH - 2.0 * MARGIN_LEFT);
    let cell = side / n as f64;
    let origin_x = MARGIN_LEFT + 60.0;
    let origin_y = MARGIN_TOP;

    let mut svg = open_document(title);
    for (i, row) in matrix.iter().enumerate() {
        for (j, value) in row.iter().enumerate() {
            let x = origin_x + j as f64 * cell;
            let y = origin_y + i as f64 * cell;
            let _ = writeln!(
                svg,
                r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}" stroke="{}" stroke-width="0.5"/>"#,
                x,
                y,
                cell,
                cell,
                diverging_color(*value),
                palette::BACKGROUND
            );
            let text = if value.is_finite() {
                format!("{:.2}", value)
            } else {
                "nan".to_string()
            };
            let _ = writeln!(
                svg,
                r#"<text x="{:.2}" y="{:.2}" font-size="{:.1}" text-anchor="middle" dominant-baseline="middle" font-weight="bold" fill="{}">{}</text>"#,
                x + cell / 2.0,
                y + cell / 2.0,
                (cell / 3.5).clamp(6.0, 12.0),
                palette::TEXT,
                text
            );
        }
    }
    for (i, label) in labels.iter().enumerate() {
        let center = i as f64 * cell + cell / 2.0;
        let _ = writeln!(
            svg,
            r#"<text x="{:.2}" y="{:.2}" font-size="10" text-anchor="end" dominant-baseline="middle" fill="{}">{}</text>"#,
            origin_x - 4.0,
            origin_y + center,
            palette::TEXT,
            escape(label)
        );
        let lx = origin_x + center;
        let ly = origin_y + side + 8.0;
        let _ = writeln!(
            svg,
            r#"<text x="{:.2}" y="{:.2}" font-size="10" text-anchor="end" transform="rotate(-45 {:.2} {:.2})" fill="{}">{}</text>"#,
            lx,
            ly,
            lx,
            ly,
            palette::TEXT,
            escape(label)
        );
    }
    close_document(svg)
}

/// Linear scale from data space to the plot area
struct Frame {
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
}

impl Frame {
    fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        let (x_min, x_max) = widen(x_min, x_max);
        let (y_min, y_max) = widen(y_min, y_max);
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    fn px(&self, x: f64) -> f64 {
        let width = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
        MARGIN_LEFT + (x - self.x_min) / (self.x_max - self.x_min) * width
    }

    fn py(&self, y: f64) -> f64 {
        let height = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
        HEIGHT - MARGIN_BOTTOM - (y - self.y_min) / (self.y_max - self.y_min) * height
    }

    fn grid(&self, svg: &mut String) {
        const TICKS: usize = 5;
        for i in 0..=TICKS {
            let t = i as f64 / TICKS as f64;
            let xv = self.x_min + t * (self.x_max - self.x_min);
            let yv = self.y_min + t * (self.y_max - self.y_min);
            let (x, y) = (self.px(xv), self.py(yv));
            let _ = writeln!(
                svg,
                r#"<line x1="{x:.2}" y1="{top:.2}" x2="{x:.2}" y2="{bottom:.2}" stroke="{grid}" stroke-dasharray="4 3"/>"#,
                top = MARGIN_TOP,
                bottom = HEIGHT - MARGIN_BOTTOM,
                grid = palette::GRID
            );
            let _ = writeln!(
                svg,
                r#"<line x1="{left:.2}" y1="{y:.2}" x2="{right:.2}" y2="{y:.2}" stroke="{grid}" stroke-dasharray="4 3"/>"#,
                left = MARGIN_LEFT,
                right = WIDTH - MARGIN_RIGHT,
                grid = palette::GRID
            );
            let _ = writeln!(
                svg,
                r#"<text x="{x:.2}" y="{:.2}" font-size="11" text-anchor="middle" fill="{}">{}</text>"#,
                HEIGHT - MARGIN_BOTTOM + 16.0,
                palette::TEXT,
                tick_label(xv)
            );
            let _ = writeln!(
                svg,
                r#"<text x="{:.2}" y="{y:.2}" font-size="11" text-anchor="end" dominant-baseline="middle" fill="{}">{}</text>"#,
                MARGIN_LEFT - 6.0,
                palette::TEXT,
                tick_label(yv)
            );
        }
    }

    fn axis_labels(&self, svg: &mut String, x_label: &str, y_label: &str) {
        let _ = writeln!(
            svg,
            r#"<text x="{:.2}" y="{:.2}" font-size="14" font-weight="bold" text-anchor="middle" fill="{}">{}</text>"#,
            (MARGIN_LEFT + WIDTH - MARGIN_RIGHT) / 2.0,
            HEIGHT - 16.0,
            palette::TEXT,
            escape(x_label)
        );
        let cy = (MARGIN_TOP + HEIGHT - MARGIN_BOTTOM) / 2.0;
        let _ = writeln!(
            svg,
            r#"<text x="18" y="{cy:.2}" font-size="14" font-weight="bold" text-anchor="middle" transform="rotate(-90 18 {cy:.2})" fill="{}">{}</text>"#,
            palette::TEXT,
            escape(y_label)
        );
    }
}

fn open_document(title: &str) -> String {
    let mut svg = String::with_capacity(8 * 1024);
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif">"#,
        w = WIDTH,
        h = HEIGHT
    );
    let _ = writeln!(
        svg,
        r#"<rect width="100%" height="100%" fill="{}"/>"#,
        palette::BACKGROUND
    );
    let _ = writeln!(
        svg,
        r#"<text x="{:.2}" y="30" font-size="16" font-weight="bold" text-anchor="middle" fill="{}">{}</text>"#,
        WIDTH / 2.0,
        palette::TITLE,
        escape(title)
    );
    svg
}

fn close_document(mut svg: String) -> String {
    svg.push_str("</svg>\n");
    svg
}

fn legend(svg: &mut String, series: &[Series<'_>]) {
    for (i, s) in series.iter().enumerate() {
        let y = MARGIN_TOP + 12.0 + i as f64 * 18.0;
        let x = WIDTH - MARGIN_RIGHT - 130.0;
        let _ = writeln!(
            svg,
            r#"<line x1="{:.2}" y1="{y:.2}" x2="{:.2}" y2="{y:.2}" stroke="{}" stroke-width="2"/>"#,
            x,
            x + 20.0,
            s.color
        );
        let _ = writeln!(
            svg,
            r#"<text x="{:.2}" y="{y:.2}" font-size="12" dominant-baseline="middle" fill="{}">{}</text>"#,
            x + 26.0,
            palette::TEXT,
            escape(s.label)
        );
    }
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
        .unwrap_or((0.0, 1.0))
}

fn widen(lo: f64, hi: f64) -> (f64, f64) {
    if (hi - lo).abs() < f64::EPSILON {
        (lo - 0.5, hi + 0.5)
    } else {
        (lo, hi)
    }
}

/// `(start, end, count)` per bucket; the last bucket is closed on the right
pub fn bucket_counts(values: &[f64], bins: usize) -> Vec<(f64, f64, usize)> {
    if values.is_empty() {
        return Vec::new();
    }
    let (lo, hi) = bounds(values.iter().copied());
    let (lo, hi) = widen(lo, hi);
    let width = (hi - lo) / bins as f64;
    let mut counts = vec![0usize; bins];
    for v in values {
        let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, c)| (lo + i as f64 * width, lo + (i + 1) as f64 * width, c))
        .collect()
}

/// Blue (-1) through white (0) to red (+1)
fn diverging_color(value: f64) -> String {
    if !value.is_finite() {
        return "#BDBDBD".to_string();
    }
    let v = value.clamp(-1.0, 1.0);
    let (r, g, b) = if v >= 0.0 {
        (255.0, 255.0 - 155.0 * v, 255.0 - 185.0 * v)
    } else {
        (255.0 + 196.0 * v, 255.0 + 120.0 * v, 255.0)
    };
    format!("#{:02X}{:02X}{:02X}", r as u8, g as u8, b as u8)
}

fn tick_label(v: f64) -> String {
    if v.abs() >= 1000.0 || (v.fract() == 0.0 && v.abs() < 1e6) {
        format!("{:.0}", v)
    } else {
        format!("{:.2}", v)
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_chart_contains_series_and_legend() {
        let x = [10.0, 20.0, 30.0];
        let svg = line_chart(
            "Learning Curve for m<1>",
            "Training Set Size",
            "Score",
            &x,
            &[
                Series { label: "Train score", color: palette::RED, values: &[0.9, 0.92, 0.95] },
                Series { label: "Test score", color: palette::GREEN, values: &[0.7, 0.8, 0.85] },
            ],
        );
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert_eq!(svg.matches("<polyline").count(), 2);
        assert!(svg.contains("Train score"));
        assert!(svg.contains("m&lt;1&gt;"));
    }

    #[test]
    fn test_bucket_counts() {
        let counts = bucket_counts(&[1.0, 1.0, 2.0, 12.0], 11);
        assert_eq!(counts.len(), 11);
        assert_eq!(counts[0].2, 2);
        assert_eq!(counts[1].2, 1);
        assert_eq!(counts[10].2, 1);
        assert_eq!(counts.iter().map(|c| c.2).sum::<usize>(), 4);
    }

    #[test]
    fn test_flat_values_do_not_divide_by_zero() {
        let counts = bucket_counts(&[5.0, 5.0], 3);
        assert_eq!(counts.iter().map(|c| c.2).sum::<usize>(), 2);
        let svg = histogram("flat", "x", &[5.0, 5.0], 3);
        assert!(!svg.contains("NaN"));
    }

    #[test]
    fn test_heatmap_annotations() {
        let svg = heatmap("Correlation", &["a", "b"], &[vec![1.0, -0.5], vec![-0.5, 1.0]]);
        assert!(svg.contains(">1.00<"));
        assert!(svg.contains(">-0.50<"));
        assert_eq!(diverging_color(0.0), "#FFFFFF");
    }
}
