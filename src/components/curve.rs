use egui::{Pos2, pos2};

use crate::error::{Error, Result};
use crate::ops::adjustments::{Lut, build_curve_lut};
use crate::settings::EditorSettings;
use crate::signal::{ListenerId, Signal};

/// Upper bound of the curve domain on both axes.
pub const CURVE_MAX: f32 = 255.0;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CurveEvent {
    /// Fired on every drag step, for live preview.
    Updated(Lut),
    /// Fired when a drag ends or the curve is reset.
    Committed(Lut),
}

/// Draggable tone curve in a 0..=255 × 0..=255 domain (y grows upward).
///
/// The first and last points stay on the left and right edges; interior
/// points keep at least `min_gap` between themselves and their neighbours.
pub struct CurveEditor {
    points: Vec<Pos2>,
    count: usize,
    hit_radius: f32,
    min_gap: f32,
    dragging: Option<usize>,
    events: Signal<CurveEvent>,
}

impl Default for CurveEditor {
    fn default() -> Self {
        Self::from_settings(&EditorSettings::default())
    }
}

impl std::fmt::Debug for CurveEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurveEditor").field("points", &self.points).field("dragging", &self.dragging).finish()
    }
}

impl CurveEditor {
    pub fn new(count: usize, hit_radius: f32, min_gap: f32) -> Self {
        let count = count.max(2);
        Self {
            points: identity_points(count),
            count,
            hit_radius,
            min_gap,
            dragging: None,
            events: Signal::new(),
        }
    }

    pub fn from_settings(settings: &EditorSettings) -> Self {
        Self::new(settings.curve_points, settings.curve_hit_radius, settings.curve_min_gap)
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&CurveEvent) + 'static) -> ListenerId {
        self.events.subscribe(listener)
    }

    pub fn points(&self) -> &[Pos2] {
        &self.points
    }

    pub fn dragging(&self) -> Option<usize> {
        self.dragging
    }

    pub fn lut(&self) -> Lut {
        let pts: Vec<(f32, f32)> = self.points.iter().map(|p| (p.x, p.y)).collect();
        build_curve_lut(&pts)
    }

    pub fn is_identity(&self) -> bool {
        self.lut().iter().enumerate().all(|(i, &v)| v as usize == i)
    }

    /// Grab the point nearest to `pos` (Manhattan distance) within the hit
    /// radius. Returns whether a point was grabbed.
    pub fn press(&mut self, pos: Pos2) -> bool {
        self.dragging = self
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| (i, (p.x - pos.x).abs() + (p.y - pos.y).abs()))
            .filter(|&(_, d)| d < self.hit_radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i);
        self.dragging.is_some()
    }

    /// Move the grabbed point toward `pos`, within its constraints.
    pub fn drag(&mut self, pos: Pos2) {
        let Some(i) = self.dragging else { return };
        let last = self.points.len() - 1;
        let x = if i == 0 {
            0.0
        } else if i == last {
            CURVE_MAX
        } else {
            let lo = self.points[i - 1].x + self.min_gap;
            let hi = self.points[i + 1].x - self.min_gap;
            if lo > hi {
                // Neighbours closer than two gaps: stay halfway.
                (self.points[i - 1].x + self.points[i + 1].x) / 2.0
            } else {
                pos.x.clamp(lo, hi)
            }
        };
        self.points[i] = pos2(x, pos.y.clamp(0.0, CURVE_MAX));
        let lut = self.lut();
        self.events.emit(&CurveEvent::Updated(lut));
    }

    pub fn release(&mut self) {
        if self.dragging.take().is_some() {
            let lut = self.lut();
            self.events.emit(&CurveEvent::Committed(lut));
        }
    }

    /// Back to the evenly spaced identity diagonal.
    pub fn reset(&mut self) {
        self.points = identity_points(self.count);
        self.dragging = None;
        let lut = self.lut();
        self.events.emit(&CurveEvent::Committed(lut));
    }

    /// Replace the control points (sorted by x, strictly increasing, inside
    /// the domain, at least two).
    pub fn set_points(&mut self, points: &[(f32, f32)]) -> Result<()> {
        validate_points(points)?;
        self.points = points.iter().map(|&(x, y)| pos2(x, y)).collect();
        self.dragging = None;
        let lut = self.lut();
        self.events.emit(&CurveEvent::Committed(lut));
        Ok(())
    }
}

fn identity_points(count: usize) -> Vec<Pos2> {
    (0..count)
        .map(|i| {
            let v = i as f32 * CURVE_MAX / (count - 1) as f32;
            pos2(v, v)
        })
        .collect()
}

fn validate_points(points: &[(f32, f32)]) -> Result<()> {
    if points.len() < 2 {
        return Err(Error::InvalidArgument("a curve needs at least two points".into()));
    }
    for &(x, y) in points {
        if !(0.0..=CURVE_MAX).contains(&x) || !(0.0..=CURVE_MAX).contains(&y) {
            return Err(Error::InvalidArgument(format!("curve point {x}:{y} is outside 0..=255")));
        }
    }
    if points.windows(2).any(|w| w[1].0 <= w[0].0) {
        return Err(Error::InvalidArgument("curve points must have strictly increasing x".into()));
    }
    // End points slide vertically only, so they always sit on the edges.
    let (first, last) = (points[0].0, points[points.len() - 1].0);
    if first != 0.0 || last != CURVE_MAX {
        return Err(Error::InvalidArgument(format!(
            "a curve must start at x=0 and end at x=255, got {first} and {last}"
        )));
    }
    Ok(())
}

/// Parse `"x:y,x:y,..."` into control points, sorted by x.
pub fn parse_curve_points(s: &str) -> Result<Vec<(f32, f32)>> {
    let mut points = Vec::new();
    for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (x, y) = pair
            .split_once(':')
            .ok_or_else(|| Error::InvalidArgument(format!("expected x:y, got '{pair}'")))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<f32>()
                .map_err(|_| Error::InvalidArgument(format!("'{v}' is not a number in '{pair}'")))
        };
        points.push((parse(x)?, parse(y)?));
    }
    points.sort_by(|a, b| a.0.total_cmp(&b.0));
    validate_points(&points)?;
    Ok(points)
}
