use std::{
    collections::BTreeMap,
    f64::consts::PI,
    path::{Path, PathBuf},
};

use anyhow::Context;

use crate::{
    changes::{AllocationChanges, InstrumentChanges},
    consolidate::{ConsolidatedPortfolio, ConsolidatedRow},
    Result,
};

const WIDTH: f64 = 960.0;
const HEIGHT: f64 = 640.0;
const PADDING: f64 = 48.0;
const INCREASE_COLOR: &str = "#4fa487";
const DECREASE_COLOR: &str = "#af4b64";
const ACCENT_COLOR: &str = "#348dc1";
const PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

const TOP_HOLDINGS: usize = 10;
const HEATMAP_ROWS: usize = 20;
const WATERFALL_EACH_SIDE: usize = 5;
/// NAV% movement above which a scatter point gets a label.
const SCATTER_LABEL_THRESHOLD: f64 = 1.0;

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn svg_header(width: f64, height: f64, title: &str) -> String {
    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}"><style>text{{font-family:Arial,sans-serif;font-size:11px;fill:#444}}</style><rect width="100%" height="100%" fill="#fff" /><text x="{x:.2}" y="28" text-anchor="middle" style="font-size:16px;fill:#222">{title}</text>"##,
        w = width,
        h = height,
        x = width / 2.0,
        title = escape(title)
    )
}

fn svg_footer() -> &'static str {
    "</svg>"
}

/// Shortens long instrument names for axis labels.
fn truncate(label: &str, max: usize) -> String {
    if label.chars().count() <= max {
        label.to_string()
    } else {
        let mut s: String = label.chars().take(max.saturating_sub(1)).collect();
        s.push('…');
        s
    }
}

fn wedge_path(cx: f64, cy: f64, r: f64, start: f64, end: f64) -> String {
    let (x1, y1) = (cx + r * start.cos(), cy + r * start.sin());
    let (x2, y2) = (cx + r * end.cos(), cy + r * end.sin());
    let large_arc = u8::from(end - start > PI);
    format!(
        "M {cx:.2} {cy:.2} L {x1:.2} {y1:.2} A {r:.2} {r:.2} 0 {large_arc} 1 {x2:.2} {y2:.2} Z"
    )
}

/// Top holdings of one month as a pie, slices sized by NAV%.
pub fn top_holdings_pie(portfolio: &ConsolidatedPortfolio, month_idx: usize) -> Option<String> {
    let month = portfolio.months.get(month_idx)?;
    let mut held: Vec<(&ConsolidatedRow, f64)> = portfolio
        .rows
        .iter()
        .filter_map(|r| r.nav_percent(month_idx).filter(|v| *v > 0.).map(|v| (r, v)))
        .collect();
    if held.is_empty() {
        return None;
    }
    held.sort_by(|a, b| b.1.total_cmp(&a.1));
    held.truncate(TOP_HOLDINGS);
    let total: f64 = held.iter().map(|(_, v)| v).sum();

    let mut svg = svg_header(
        WIDTH,
        HEIGHT,
        &format!("Top {} Holdings by NAV% - {month}", held.len()),
    );
    let (cx, cy, r) = (WIDTH * 0.32, HEIGHT / 2.0 + 10.0, HEIGHT * 0.36);
    let mut angle = -PI / 2.0;
    for (i, (row, v)) in held.iter().enumerate() {
        let sweep = v / total * 2.0 * PI;
        let color = PALETTE[i % PALETTE.len()];
        if held.len() == 1 {
            svg.push_str(&format!(r#"<circle cx="{cx:.2}" cy="{cy:.2}" r="{r:.2}" fill="{color}" />"#));
        } else {
            svg.push_str(&format!(
                r##"<path d="{d}" fill="{color}" stroke="#fff" stroke-width="1" />"##,
                d = wedge_path(cx, cy, r, angle, angle + sweep)
            ));
        }
        let mid = angle + sweep / 2.0;
        svg.push_str(&format!(
            r##"<text x="{x:.2}" y="{y:.2}" text-anchor="middle" style="font-weight:bold;fill:#fff">{pct:.1}%</text>"##,
            x = cx + r * 0.75 * mid.cos(),
            y = cy + r * 0.75 * mid.sin(),
            pct = v / total * 100.0
        ));
        angle += sweep;

        let ly = PADDING + 30.0 + i as f64 * 22.0;
        let lx = WIDTH * 0.64;
        svg.push_str(&format!(
            r#"<rect x="{lx:.2}" y="{y:.2}" width="12" height="12" fill="{color}" /><text x="{tx:.2}" y="{ty:.2}">{label} ({row_v:.2}%)</text>"#,
            y = ly - 10.0,
            tx = lx + 18.0,
            ty = ly,
            label = escape(&truncate(&row.name, 40)),
            row_v = v
        ));
    }
    svg.push_str(svg_footer());
    Some(svg)
}

/// NAV% summed per industry for one month, smallest first.
pub fn sector_allocation(portfolio: &ConsolidatedPortfolio, month_idx: usize) -> Vec<(String, f64)> {
    let mut sectors: BTreeMap<&str, f64> = BTreeMap::new();
    for row in &portfolio.rows {
        if let Some(v) = row.nav_percent(month_idx) {
            *sectors.entry(row.industry_or_default()).or_default() += v;
        }
    }
    let mut sectors: Vec<(String, f64)> = sectors
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    sectors.sort_by(|a, b| a.1.total_cmp(&b.1));
    sectors
}

/// Horizontal bar per industry with its share of NAV.
pub fn sector_allocation_bars(portfolio: &ConsolidatedPortfolio, month_idx: usize) -> Option<String> {
    let month = portfolio.months.get(month_idx)?;
    let sectors = sector_allocation(portfolio, month_idx);
    if sectors.is_empty() {
        return None;
    }
    let bar_h = 18.0;
    let height = f64::max(HEIGHT, 2.0 * PADDING + 30.0 + sectors.len() as f64 * (bar_h + 6.0));
    let label_w = 220.0;
    let plot_w = WIDTH - label_w - 2.0 * PADDING - 60.0;
    let max_v = sectors.iter().map(|(_, v)| v.abs()).fold(0., f64::max).max(f64::EPSILON);

    let mut svg = svg_header(WIDTH, height, &format!("Sector-wise Allocation - {month}"));
    for (i, (sector, v)) in sectors.iter().enumerate() {
        let y = PADDING + 20.0 + i as f64 * (bar_h + 6.0);
        let x0 = PADDING + label_w;
        let w = v.abs() / max_v * plot_w;
        svg.push_str(&format!(
            r#"<text x="{lx:.2}" y="{ty:.2}" text-anchor="end">{label}</text><rect x="{x0:.2}" y="{y:.2}" width="{w:.2}" height="{bar_h}" fill="{ACCENT_COLOR}" /><text x="{vx:.2}" y="{ty:.2}">{v:.2}%</text>"#,
            lx = x0 - 8.0,
            ty = y + bar_h - 5.0,
            label = escape(&truncate(sector, 36)),
            vx = x0 + w + 6.0,
        ));
    }
    svg.push_str(&format!(
        r#"<text x="{x:.2}" y="{y:.2}" text-anchor="middle">NAV %</text>"#,
        x = PADDING + label_w + plot_w / 2.0,
        y = height - PADDING / 2.0
    ));
    svg.push_str(svg_footer());
    Some(svg)
}

/// Diverging red-yellow-blue colour for `value` in `[-max, max]`.
fn diverging_color(value: f64, max: f64) -> String {
    const RED: (f64, f64, f64) = (215., 48., 39.);
    const MID: (f64, f64, f64) = (255., 255., 191.);
    const BLUE: (f64, f64, f64) = (69., 117., 180.);
    let t = if max > 0. { (value / max).clamp(-1., 1.) } else { 0. };
    let (from, to, k) = if t < 0. { (MID, RED, -t) } else { (MID, BLUE, t) };
    let mix = |a: f64, b: f64| (a + (b - a) * k).round() as u8;
    format!(
        "#{:02x}{:02x}{:02x}",
        mix(from.0, to.0),
        mix(from.1, to.1),
        mix(from.2, to.2)
    )
}

/// Instruments with the largest total quantity movement, largest first.
pub fn top_movers(changes: &AllocationChanges, n: usize) -> Vec<&InstrumentChanges> {
    let mut movers: Vec<&InstrumentChanges> = changes
        .instruments
        .iter()
        .filter(|i| i.total_absolute() > 0.)
        .collect();
    movers.sort_by(|a, b| b.total_absolute().total_cmp(&a.total_absolute()));
    movers.truncate(n);
    movers
}

/// Quantity change of the biggest movers, one column per period.
pub fn holdings_changes_heatmap(changes: &AllocationChanges) -> Option<String> {
    if changes.is_empty() {
        return None;
    }
    let movers = top_movers(changes, HEATMAP_ROWS);
    if movers.is_empty() {
        return None;
    }
    let max = movers
        .iter()
        .flat_map(|i| i.changes.iter().filter_map(|c| c.absolute))
        .map(f64::abs)
        .fold(0., f64::max);

    let label_w = 240.0;
    let cell_h = 24.0;
    let cell_w = ((WIDTH - label_w - 2.0 * PADDING) / changes.periods.len() as f64).min(180.0);
    let height = 2.0 * PADDING + 80.0 + movers.len() as f64 * cell_h;

    let mut svg = svg_header(WIDTH, height, &format!("Changes in Top {} Holdings", movers.len()));
    for (j, period) in changes.periods.iter().enumerate() {
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{y:.2}" text-anchor="middle">{label}</text>"#,
            x = PADDING + label_w + (j as f64 + 0.5) * cell_w,
            y = PADDING + 16.0,
            label = escape(&period.to_string())
        ));
    }
    for (i, instrument) in movers.iter().enumerate() {
        let y = PADDING + 30.0 + i as f64 * cell_h;
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{ty:.2}" text-anchor="end">{label}</text>"#,
            x = PADDING + label_w - 8.0,
            ty = y + cell_h - 8.0,
            label = escape(&truncate(&instrument.name, 36))
        ));
        for (j, change) in instrument.changes.iter().enumerate() {
            let x = PADDING + label_w + j as f64 * cell_w;
            let (fill, text) = match change.absolute {
                Some(v) => (diverging_color(v, max), format!("{v:.0}")),
                None => ("#eeeeee".to_string(), String::new()),
            };
            svg.push_str(&format!(
                r##"<rect x="{x:.2}" y="{y:.2}" width="{cell_w:.2}" height="{cell_h}" fill="{fill}" stroke="#fff" /><text x="{tx:.2}" y="{ty:.2}" text-anchor="middle" style="fill:#222">{text}</text>"##,
                tx = x + cell_w / 2.0,
                ty = y + cell_h - 8.0,
            ));
        }
    }
    svg.push_str(&format!(
        r#"<text x="{x:.2}" y="{y:.2}" text-anchor="middle">Change in Quantity</text>"#,
        x = PADDING + label_w + cell_w * changes.periods.len() as f64 / 2.0,
        y = height - PADDING / 2.0
    ));
    svg.push_str(svg_footer());
    Some(svg)
}

/// NAV% of the first month against the last, with a no-change diagonal.
pub fn nav_changes_scatter(portfolio: &ConsolidatedPortfolio) -> Option<String> {
    if portfolio.months.len() < 2 {
        return None;
    }
    let last = portfolio.months.len() - 1;
    let points: Vec<(&ConsolidatedRow, f64, f64)> = portfolio
        .rows
        .iter()
        .filter_map(|r| Some((r, r.nav_percent(0)?, r.nav_percent(last)?)))
        .collect();
    if points.is_empty() {
        return None;
    }
    let max_nav = points
        .iter()
        .map(|(_, a, b)| a.max(*b))
        .fold(0., f64::max)
        .max(f64::EPSILON);
    let (first_m, last_m) = (portfolio.months[0], portfolio.months[last]);
    let inner = HEIGHT - 2.0 * PADDING - 20.0;
    let x0 = (WIDTH - inner) / 2.0;
    let y0 = HEIGHT - PADDING;
    let sx = |v: f64| x0 + v / max_nav * inner;
    let sy = |v: f64| y0 - v / max_nav * inner;

    let mut svg = svg_header(WIDTH, HEIGHT, &format!("NAV% Changes: {first_m} vs {last_m}"));
    svg.push_str(&format!(
        r##"<line x1="{x0:.2}" y1="{y0:.2}" x2="{x1:.2}" y2="{y0:.2}" stroke="#000" /><line x1="{x0:.2}" y1="{y0:.2}" x2="{x0:.2}" y2="{y1:.2}" stroke="#000" /><line x1="{x0:.2}" y1="{y0:.2}" x2="{x1:.2}" y2="{y1:.2}" stroke="#d62728" stroke-dasharray="6 4" opacity="0.5" />"##,
        x1 = sx(max_nav),
        y1 = sy(max_nav),
    ));
    for (row, a, b) in &points {
        svg.push_str(&format!(
            r#"<circle cx="{x:.2}" cy="{y:.2}" r="4" fill="{ACCENT_COLOR}" opacity="0.5" />"#,
            x = sx(*a),
            y = sy(*b)
        ));
        if (b - a).abs() > SCATTER_LABEL_THRESHOLD {
            svg.push_str(&format!(
                r#"<text x="{x:.2}" y="{y:.2}" style="font-size:9px">{label}</text>"#,
                x = sx(*a) + 5.0,
                y = sy(*b) - 5.0,
                label = escape(&truncate(&row.name, 30))
            ));
        }
    }
    svg.push_str(&format!(
        r#"<text x="{mx:.2}" y="{ly:.2}" text-anchor="middle">NAV% in {first_m}</text><text x="{lx:.2}" y="{my:.2}" text-anchor="middle" transform="rotate(-90 {lx:.2} {my:.2})">NAV% in {last_m}</text>"#,
        mx = x0 + inner / 2.0,
        ly = y0 + 30.0,
        lx = x0 - 30.0,
        my = y0 - inner / 2.0,
    ));
    svg.push_str(svg_footer());
    Some(svg)
}

/// Biggest increases and decreases of a single-period change, largest gains first.
pub fn waterfall_entries(span: &AllocationChanges) -> Vec<(&str, f64)> {
    let values: Vec<(&str, f64)> = span
        .instruments
        .iter()
        .filter_map(|i| Some((i.name.as_str(), i.changes.first()?.absolute?)))
        .collect();
    let mut increases: Vec<(&str, f64)> = values.iter().copied().filter(|(_, v)| *v > 0.).collect();
    increases.sort_by(|a, b| b.1.total_cmp(&a.1));
    increases.truncate(WATERFALL_EACH_SIDE);
    let mut decreases: Vec<(&str, f64)> = values.iter().copied().filter(|(_, v)| *v < 0.).collect();
    decreases.sort_by(|a, b| a.1.total_cmp(&b.1));
    decreases.truncate(WATERFALL_EACH_SIDE);
    increases.extend(decreases);
    increases
}

pub fn quantity_changes_waterfall(span: &AllocationChanges) -> Option<String> {
    let period = span.periods.first()?;
    let entries = waterfall_entries(span);
    if entries.is_empty() {
        return None;
    }
    let max = entries.iter().map(|(_, v)| v.abs()).fold(0., f64::max);
    let plot_h = HEIGHT - 2.0 * PADDING - 140.0;
    let zero = PADDING + 20.0 + plot_h / 2.0;
    let slot = (WIDTH - 2.0 * PADDING) / entries.len() as f64;
    let bar_w = slot * 0.7;

    let mut svg = svg_header(WIDTH, HEIGHT, &format!("Top Holdings Changes - {period}"));
    svg.push_str(&format!(
        r##"<line x1="{PADDING}" y1="{zero:.2}" x2="{x2:.2}" y2="{zero:.2}" stroke="#000" />"##,
        x2 = WIDTH - PADDING
    ));
    for (i, (name, v)) in entries.iter().enumerate() {
        let h = v.abs() / max * plot_h / 2.0;
        let x = PADDING + i as f64 * slot + (slot - bar_w) / 2.0;
        let (y, color, ty) = if *v > 0. {
            (zero - h, INCREASE_COLOR, zero - h - 4.0)
        } else {
            (zero, DECREASE_COLOR, zero + h + 12.0)
        };
        let cx = x + bar_w / 2.0;
        let ly = zero + plot_h / 2.0 + 24.0;
        svg.push_str(&format!(
            r#"<rect x="{x:.2}" y="{y:.2}" width="{bar_w:.2}" height="{h:.2}" fill="{color}" /><text x="{cx:.2}" y="{ty:.2}" text-anchor="middle" style="font-weight:bold">{value:.0}</text><text x="{cx:.2}" y="{ly:.2}" text-anchor="end" transform="rotate(-45 {cx:.2} {ly:.2})">{label}</text>"#,
            value = v,
            label = escape(&truncate(name, 28))
        ));
    }
    svg.push_str(svg_footer());
    Some(svg)
}

fn save(dir: &Path, file_name: &str, svg: &str) -> Result<PathBuf> {
    let path = dir.join(file_name);
    std::fs::write(&path, svg).with_context(|| format!("failed to write {}", path.display()))?;
    log::debug!("wrote {}", path.display());
    Ok(path)
}

/// Renders every chart into `output_dir` and returns the files written.
///
/// A chart lacking the data it needs is skipped with a warning.
pub fn create_all_charts<P: AsRef<Path>>(
    portfolio: &ConsolidatedPortfolio,
    changes: &AllocationChanges,
    span: &AllocationChanges,
    output_dir: P,
) -> Result<Vec<PathBuf>> {
    let dir = output_dir.as_ref();
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;

    let mut charts: Vec<(String, Option<String>)> = Vec::new();
    for (idx, month) in portfolio.months.iter().enumerate() {
        log::info!("creating charts for {month}");
        charts.push((
            format!("top_holdings_pie_{}.svg", month.compact()),
            top_holdings_pie(portfolio, idx),
        ));
        charts.push((
            format!("sector_allocation_{}.svg", month.compact()),
            sector_allocation_bars(portfolio, idx),
        ));
    }
    charts.push((
        "holdings_changes_heatmap.svg".to_string(),
        holdings_changes_heatmap(changes),
    ));
    charts.push((
        "nav_changes_scatter.svg".to_string(),
        nav_changes_scatter(portfolio),
    ));
    if let Some(period) = span.periods.first() {
        charts.push((
            format!("quantity_changes_waterfall_{}.svg", period.slug()),
            quantity_changes_waterfall(span),
        ));
    }

    let mut written = Vec::new();
    for (file_name, svg) in charts {
        match svg {
            Some(svg) => written.push(save(dir, &file_name, &svg)?),
            None => log::warn!("not enough data for {file_name}, skipped"),
        }
    }
    Ok(written)
}
