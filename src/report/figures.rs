//! SVG figures
//!
//! Three figure kinds, all deterministic for a given jitter seed:
//! - raincloud plot of both hands with paired lines per participant
//! - simple-slopes plot (AQ-10 against FTT at three ages) per hand
//! - Johnson-Neyman plot (conditional AQ-10 slope across age) per hand

use super::html::escape_html;
use super::{coefficient, fmt2, RenderError};
use crate::dataset::{Hand, Participant};
use crate::moderation::{conditional_slope, HandModels, Predictor};
use crate::stats::{self, INTERCEPT};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 420.0;
const MARGIN_LEFT: f64 = 64.0;
const MARGIN_RIGHT: f64 = 24.0;
const MARGIN_TOP: f64 = 44.0;
const MARGIN_BOTTOM: f64 = 56.0;

const DOMINANT_COLOR: &str = "#4a90d9";
const NON_DOMINANT_COLOR: &str = "#5cb85c";
const AGE_LEVEL_COLORS: [&str; 3] = ["#5cb85c", "#333333", "#d9534f"];
const SIGNIFICANT_COLOR: &str = "#d9534f";
const MUTED_COLOR: &str = "#999999";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FigureKind {
    Raincloud,
    SimpleSlopes(Hand),
    JohnsonNeyman(Hand),
}

fn hand_slug(hand: Hand) -> &'static str {
    match hand {
        Hand::Dominant => "dominant",
        Hand::NonDominant => "nondominant",
    }
}

fn hand_color(hand: Hand) -> &'static str {
    match hand {
        Hand::Dominant => DOMINANT_COLOR,
        Hand::NonDominant => NON_DOMINANT_COLOR,
    }
}

impl FigureKind {
    /// Stable identifier, also used in figure file names
    pub fn id(self) -> String {
        match self {
            FigureKind::Raincloud => "hand-raincloud".to_string(),
            FigureKind::SimpleSlopes(h) => format!("simple-slopes-{}", hand_slug(h)),
            FigureKind::JohnsonNeyman(h) => format!("johnson-neyman-{}", hand_slug(h)),
        }
    }

    /// Regression section a figure belongs to (`None` for the hand comparison)
    pub fn hand(self) -> Option<Hand> {
        match self {
            FigureKind::Raincloud => None,
            FigureKind::SimpleSlopes(h) | FigureKind::JohnsonNeyman(h) => Some(h),
        }
    }
}

/// A rendered figure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub kind: FigureKind,
    pub id: String,
    pub caption: String,
    #[serde(skip)]
    pub svg: String,
}

impl Figure {
    fn new(kind: FigureKind, caption: String, svg: String) -> Self {
        Self {
            kind,
            id: kind.id(),
            caption,
            svg,
        }
    }

    /// File name next to a document with the given stem
    pub fn file_name(&self, stem: &str) -> String {
        format!("{}_{}.svg", stem, self.id)
    }
}

/// Linear map from data to pixels
#[derive(Debug, Clone, Copy)]
struct Scale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl Scale {
    fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    fn map(&self, v: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if d1 == d0 {
            return (r0 + r1) / 2.0;
        }
        r0 + (v - d0) / (d1 - d0) * (r1 - r0)
    }
}

/// Widen a data extent by 5% on each side (or by one unit when flat)
fn padded(min: f64, max: f64) -> (f64, f64) {
    if !(min.is_finite() && max.is_finite()) {
        return (0.0, 1.0);
    }
    if max - min < f64::EPSILON {
        return (min - 1.0, max + 1.0);
    }
    let pad = (max - min) * 0.05;
    (min - pad, max + pad)
}

/// Min and max via trueno
fn extent(values: &[f64]) -> (f64, f64) {
    let data: Vec<f32> = values.iter().map(|&v| v as f32).collect();
    let v = trueno::Vector::from_slice(&data);
    let min = v.min().unwrap_or(0.0);
    let max = v.max().unwrap_or(0.0);
    (f64::from(min), f64::from(max))
}

/// Round tick positions covering [min, max]
fn ticks(min: f64, max: f64, target: usize) -> Vec<f64> {
    let span = (max - min).abs().max(f64::EPSILON);
    let raw = span / target as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    let step = [1.0, 2.0, 2.5, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|s| span / s <= target as f64)
        .unwrap_or(10.0 * magnitude);

    let mut out = Vec::new();
    let mut v = (min / step).ceil() * step;
    while v <= max + step * 1e-9 && out.len() <= target * 2 {
        out.push(if v.abs() < step * 1e-9 { 0.0 } else { v });
        v += step;
    }
    out
}

fn tick_label(v: f64) -> String {
    if (v - v.round()).abs() < 1e-9 {
        format!("{:.0}", v)
    } else {
        format!("{:.1}", v)
    }
}

/// SVG document under construction
struct Canvas {
    body: String,
}

impl Canvas {
    fn new() -> Self {
        Self {
            body: String::new(),
        }
    }

    fn line(&mut self, from: (f64, f64), to: (f64, f64), stroke: &str, width: f64, dashed: bool) {
        let dash = if dashed {
            r#" stroke-dasharray="5,4""#
        } else {
            ""
        };
        self.body.push_str(&format!(
            r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}" stroke-width="{}"{}/>"#,
            from.0, from.1, to.0, to.1, stroke, width, dash
        ));
        self.body.push('\n');
    }

    fn polyline(&mut self, points: &[(f64, f64)], stroke: &str, width: f64) {
        self.body.push_str(&format!(
            r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="{}"/>"#,
            Self::points(points),
            stroke,
            width
        ));
        self.body.push('\n');
    }

    fn polygon(&mut self, points: &[(f64, f64)], fill: &str, opacity: f64) {
        self.body.push_str(&format!(
            r#"<polygon points="{}" fill="{}" fill-opacity="{}" stroke="none"/>"#,
            Self::points(points),
            fill,
            opacity
        ));
        self.body.push('\n');
    }

    fn circle(&mut self, center: (f64, f64), r: f64, fill: &str, opacity: f64) {
        self.body.push_str(&format!(
            r#"<circle cx="{:.1}" cy="{:.1}" r="{}" fill="{}" fill-opacity="{}"/>"#,
            center.0, center.1, r, fill, opacity
        ));
        self.body.push('\n');
    }

    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, fill: &str, stroke: &str) {
        self.body.push_str(&format!(
            r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}" stroke="{}"/>"#,
            x, y, w, h, fill, stroke
        ));
        self.body.push('\n');
    }

    fn text(&mut self, at: (f64, f64), anchor: &str, size: u32, content: &str) {
        self.body.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}" text-anchor="{}" font-size="{}">{}</text>"#,
            at.0,
            at.1,
            anchor,
            size,
            escape_html(content)
        ));
        self.body.push('\n');
    }

    fn vertical_text(&mut self, at: (f64, f64), size: u32, content: &str) {
        self.body.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="{}" transform="rotate(-90 {:.1} {:.1})">{}</text>"#,
            at.0,
            at.1,
            size,
            at.0,
            at.1,
            escape_html(content)
        ));
        self.body.push('\n');
    }

    fn points(points: &[(f64, f64)]) -> String {
        points
            .iter()
            .map(|(x, y)| format!("{:.1},{:.1}", x, y))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn finish(self, title: &str) -> String {
        let mut svg = String::new();
        svg.push_str(&format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif">"#,
            w = WIDTH,
            h = HEIGHT
        ));
        svg.push('\n');
        svg.push_str(&format!("<title>{}</title>\n", escape_html(title)));
        svg.push_str(r#"<rect width="100%" height="100%" fill="white"/>"#);
        svg.push('\n');
        svg.push_str(&self.body);
        svg.push_str("</svg>\n");
        svg
    }
}

fn plot_x() -> (f64, f64) {
    (MARGIN_LEFT, WIDTH - MARGIN_RIGHT)
}

fn plot_y() -> (f64, f64) {
    (HEIGHT - MARGIN_BOTTOM, MARGIN_TOP)
}

/// Frame, ticks, axis labels and title
fn axes(canvas: &mut Canvas, x: Option<&Scale>, y: &Scale, labels: (&str, &str), title: &str) {
    let (x0, x1) = plot_x();
    let (y0, y1) = plot_y();
    canvas.line((x0, y0), (x1, y0), "#333", 1.0, false);
    canvas.line((x0, y0), (x0, y1), "#333", 1.0, false);

    for t in ticks(y.domain.0, y.domain.1, 6) {
        let py = y.map(t);
        canvas.line((x0 - 4.0, py), (x0, py), "#333", 1.0, false);
        canvas.line((x0, py), (x1, py), "#eeeeee", 1.0, false);
        canvas.text((x0 - 7.0, py + 4.0), "end", 11, &tick_label(t));
    }
    if let Some(x) = x {
        for t in ticks(x.domain.0, x.domain.1, 8) {
            let px = x.map(t);
            canvas.line((px, y0), (px, y0 + 4.0), "#333", 1.0, false);
            canvas.text((px, y0 + 17.0), "middle", 11, &tick_label(t));
        }
    }

    canvas.text(((x0 + x1) / 2.0, HEIGHT - 14.0), "middle", 13, labels.0);
    canvas.vertical_text((18.0, (y0 + y1) / 2.0), 13, labels.1);
    canvas.text((WIDTH / 2.0, 24.0), "middle", 15, title);
}

/// Quartiles and Tukey whiskers
struct BoxSummary {
    q1: f64,
    median: f64,
    q3: f64,
    low: f64,
    high: f64,
}

impl BoxSummary {
    fn new(values: &[f64]) -> Result<Self, RenderError> {
        let q1 = stats::quantile(values, 0.25)?;
        let median = stats::quantile(values, 0.5)?;
        let q3 = stats::quantile(values, 0.75)?;
        let fence = 1.5 * (q3 - q1);
        let inside = values
            .iter()
            .copied()
            .filter(|v| *v >= q1 - fence && *v <= q3 + fence);
        let (low, high) = inside.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        Ok(Self {
            q1,
            median,
            q3,
            low: if low.is_finite() { low } else { q1 },
            high: if high.is_finite() { high } else { q3 },
        })
    }
}

/// Gaussian kernel density on `grid` with Silverman's bandwidth
fn kernel_density(values: &[f64], grid: &[f64]) -> Vec<f64> {
    let n = values.len() as f64;
    let sd = stats::sample_sd(values);
    let iqr = match (stats::quantile(values, 0.25), stats::quantile(values, 0.75)) {
        (Ok(q1), Ok(q3)) => q3 - q1,
        _ => 0.0,
    };
    let spread = if iqr > 0.0 { sd.min(iqr / 1.34) } else { sd };
    let mut h = 0.9 * spread * n.powf(-0.2);
    if !(h.is_finite() && h > 0.0) {
        h = 1.0;
    }
    let norm = 1.0 / (n * h * (2.0 * std::f64::consts::PI).sqrt());
    grid.iter()
        .map(|g| {
            values
                .iter()
                .map(|v| (-0.5 * ((g - v) / h).powi(2)).exp())
                .sum::<f64>()
                * norm
        })
        .collect()
}

/// Paired raincloud plot of both hands
///
/// Each hand gets a half density (outer side), a box summary and jittered
/// points; grey lines connect the two scores of every participant.
pub fn raincloud_figure(participants: &[Participant], seed: u64) -> Result<Figure, RenderError> {
    let dominant: Vec<f64> = participants.iter().map(|p| p.dominant).collect();
    let non_dominant: Vec<f64> = participants.iter().map(|p| p.non_dominant).collect();
    let all: Vec<f64> = dominant.iter().chain(&non_dominant).copied().collect();
    let (lo, hi) = extent(&all);
    let y = Scale::new(padded(lo, hi), plot_y());

    let mut canvas = Canvas::new();
    let title = "Finger-tapping scores by hand";
    axes(&mut canvas, None, &y, ("Hand", "FTT score (taps)"), title);

    let (x0, x1) = plot_x();
    let centers = [x0 + (x1 - x0) * 0.33, x0 + (x1 - x0) * 0.67];
    // Outer side of each hand: dominant cloud to the left, non-dominant to the right
    let sides = [-1.0, 1.0];
    let mut rng = StdRng::seed_from_u64(seed);

    let mut jittered: Vec<Vec<(f64, f64)>> = Vec::with_capacity(2);
    for (k, hand) in Hand::ALL.into_iter().enumerate() {
        let values = if hand == Hand::Dominant {
            &dominant
        } else {
            &non_dominant
        };
        let color = hand_color(hand);
        let side = sides[k];
        let center = centers[k];

        // Half density
        let grid: Vec<f64> = (0..=80)
            .map(|i| y.domain.0 + (y.domain.1 - y.domain.0) * i as f64 / 80.0)
            .collect();
        let density = kernel_density(values, &grid);
        let peak = density.iter().copied().fold(0.0, f64::max);
        let base = center + side * 34.0;
        let mut outline: Vec<(f64, f64)> = grid
            .iter()
            .zip(&density)
            .map(|(g, d)| {
                let w = if peak > 0.0 { d / peak * 90.0 } else { 0.0 };
                (base + side * w, y.map(*g))
            })
            .collect();
        outline.push((base, y.map(y.domain.1)));
        outline.push((base, y.map(y.domain.0)));
        canvas.polygon(&outline, color, 0.35);

        // Box summary
        let summary = BoxSummary::new(values)?;
        let bx = center + side * 20.0;
        canvas.line((bx, y.map(summary.low)), (bx, y.map(summary.high)), "#333", 1.0, false);
        canvas.rect(
            bx - 6.0,
            y.map(summary.q3),
            12.0,
            (y.map(summary.q1) - y.map(summary.q3)).max(0.5),
            "white",
            "#333",
        );
        canvas.line(
            (bx - 6.0, y.map(summary.median)),
            (bx + 6.0, y.map(summary.median)),
            "#333",
            2.0,
            false,
        );

        // Rain
        let points: Vec<(f64, f64)> = values
            .iter()
            .map(|v| (center + rng.gen_range(-8.0..8.0), y.map(*v)))
            .collect();
        jittered.push(points);

        canvas.text(
            (center, HEIGHT - MARGIN_BOTTOM + 18.0),
            "middle",
            12,
            hand.label(),
        );
    }

    for (a, b) in jittered[0].iter().zip(&jittered[1]) {
        canvas.line(*a, *b, "#cccccc", 0.8, false);
    }
    for (k, hand) in Hand::ALL.into_iter().enumerate() {
        for p in &jittered[k] {
            canvas.circle(*p, 3.0, hand_color(hand), 0.8);
        }
    }

    let caption = format!(
        "Dominant and non-dominant finger-tapping scores (n = {}). Half densities, \
         box summaries (median and quartiles) and individual scores; grey lines join \
         each participant's two scores.",
        participants.len()
    );
    Ok(Figure::new(FigureKind::Raincloud, caption, canvas.finish(title)))
}

/// Predicted FTT against AQ-10 at the three age levels of the simple slopes
pub fn simple_slopes_figure(models: &HandModels) -> Result<Figure, RenderError> {
    let model = &models.primary;
    let fit = &model.fit;
    let centering = &model.centering;
    let b0 = coefficient(fit, INTERCEPT)?.estimate;
    let b_aq = coefficient(fit, Predictor::Aq.name())?.estimate;
    let b_age = coefficient(fit, Predictor::Age.name())?.estimate;
    let b_gender = coefficient(fit, Predictor::Gender.name())?.estimate;
    let interaction = format!("{}:{}", Predictor::Aq.name(), Predictor::Age.name());
    let b_int = coefficient(fit, &interaction)?.estimate;
    if models.age_slopes.is_empty() {
        return Err(RenderError::missing(&model.name, "simple slopes"));
    }

    let gender_col = model
        .design
        .term_names
        .iter()
        .position(|t| t == Predictor::Gender.name())
        .ok_or_else(|| RenderError::missing(&model.name, "gender design column"))?;
    let gender_mean = stats::mean(&model.design.columns[gender_col]);

    let aq_raw: Vec<f64> = model.design.columns[0]
        .iter()
        .map(|c| c + centering.aq_mean)
        .collect();
    let outcome = &model.design.outcome;

    let predict = |aq: f64, age: f64| {
        let aq_c = aq - centering.aq_mean;
        let age_c = age - centering.age_mean;
        b0 + b_aq * aq_c + b_age * age_c + b_gender * gender_mean + b_int * aq_c * age_c
    };
    let aq_max = f64::from(crate::dataset::AQ10_MAX);
    let mut y_values: Vec<f64> = outcome.clone();
    for s in &models.age_slopes {
        y_values.push(predict(0.0, s.moderator_value));
        y_values.push(predict(aq_max, s.moderator_value));
    }
    let (lo, hi) = extent(&y_values);

    let x = Scale::new((-0.5, aq_max + 0.5), plot_x());
    let y = Scale::new(padded(lo, hi), plot_y());
    let hand = models.hand;
    let title = format!("Simple slopes of AQ-10: {} hand", hand.label().to_lowercase());

    let mut canvas = Canvas::new();
    axes(&mut canvas, Some(&x), &y, ("AQ-10 score", "FTT score (taps)"), &title);

    for (a, v) in aq_raw.iter().zip(outcome) {
        canvas.circle((x.map(*a), y.map(*v)), 2.5, MUTED_COLOR, 0.5);
    }
    for (i, s) in models.age_slopes.iter().enumerate() {
        let color = AGE_LEVEL_COLORS[i % AGE_LEVEL_COLORS.len()];
        let line = [
            (x.map(0.0), y.map(predict(0.0, s.moderator_value))),
            (x.map(aq_max), y.map(predict(aq_max, s.moderator_value))),
        ];
        canvas.polyline(&line, color, 2.0);
        let ly = MARGIN_TOP + 14.0 + i as f64 * 16.0;
        canvas.line((WIDTH - 190.0, ly - 4.0), (WIDTH - 170.0, ly - 4.0), color, 2.0, false);
        canvas.text(
            (WIDTH - 165.0, ly),
            "start",
            11,
            &format!("{} (age {}): b = {}", s.level, fmt2(s.moderator_value), fmt2(s.slope)),
        );
    }

    let caption = format!(
        "Predicted {} FTT across AQ-10 at mean age and one SD either side, \
         gender held at its sample mean; points are observed scores.",
        hand.label().to_lowercase()
    );
    Ok(Figure::new(FigureKind::SimpleSlopes(hand), caption, canvas.finish(&title)))
}

/// Conditional AQ-10 slope with its confidence band across the observed ages
pub fn johnson_neyman_figure(models: &HandModels) -> Result<Figure, RenderError> {
    let model = &models.primary;
    let jn = &models.johnson_neyman;
    let (age_lo, age_hi) = (jn.observed_min, jn.observed_max);
    let steps = 100;

    let mut samples = Vec::with_capacity(steps + 1);
    for i in 0..=steps {
        let age = age_lo + (age_hi - age_lo) * i as f64 / steps as f64;
        let m = age - model.centering.age_mean;
        let (slope, se) = conditional_slope(model, Predictor::Aq, Predictor::Age, m)?;
        samples.push((age, slope, slope - jn.t_critical * se, slope + jn.t_critical * se));
    }

    let mut y_values: Vec<f64> = samples.iter().flat_map(|s| [s.2, s.3]).collect();
    y_values.push(0.0);
    let (lo, hi) = extent(&y_values);
    let x = Scale::new(padded(age_lo, age_hi), plot_x());
    let y = Scale::new(padded(lo, hi), plot_y());
    let hand = models.hand;
    let title = format!("Johnson-Neyman plot: {} hand", hand.label().to_lowercase());

    let mut canvas = Canvas::new();
    axes(&mut canvas, Some(&x), &y, ("Age (years)", "Slope of AQ-10 on FTT"), &title);

    let band: Vec<(f64, f64)> = samples
        .iter()
        .map(|s| (x.map(s.0), y.map(s.3)))
        .chain(samples.iter().rev().map(|s| (x.map(s.0), y.map(s.2))))
        .collect();
    canvas.polygon(&band, MUTED_COLOR, 0.25);
    canvas.line(
        (x.map(x.domain.0), y.map(0.0)),
        (x.map(x.domain.1), y.map(0.0)),
        "#333",
        1.0,
        true,
    );

    for pair in samples.windows(2) {
        let mid = (pair[0].0 + pair[1].0) / 2.0;
        let color = if jn.is_significant_at(mid) {
            SIGNIFICANT_COLOR
        } else {
            MUTED_COLOR
        };
        canvas.line(
            (x.map(pair[0].0), y.map(pair[0].1)),
            (x.map(pair[1].0), y.map(pair[1].1)),
            color,
            2.5,
            false,
        );
    }

    for bound in jn.bounds.iter().filter(|b| b.within_observed) {
        let px = x.map(bound.value);
        canvas.line((px, y.map(y.domain.0)), (px, y.map(y.domain.1)), "#333", 1.0, true);
        canvas.text((px + 4.0, MARGIN_TOP + 12.0), "start", 11, &fmt2(bound.value));
    }

    let caption = format!(
        "Conditional slope of AQ-10 on {} FTT across age with its {:.0}% confidence band; \
         red segments mark ages where the slope is significant (\u{3b1} = {}).",
        hand.label().to_lowercase(),
        (1.0 - jn.alpha) * 100.0,
        jn.alpha
    );
    Ok(Figure::new(FigureKind::JohnsonNeyman(hand), caption, canvas.finish(&title)))
}
