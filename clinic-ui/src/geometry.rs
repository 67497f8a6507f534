//! Chart Geometry
//!
//! Scale, label and hit-testing math for the canvas renderer. Kept free of
//! DOM types so it can be tested off the browser.

use std::f64::consts::PI;

/// Plot area inside the canvas margins
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Area {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Area {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Centre of the `index`-th of `count` equal columns
    pub fn column_center(&self, index: usize, count: usize) -> f64 {
        let slot = self.width / count.max(1) as f64;
        self.left + slot * (index as f64 + 0.5)
    }

    pub fn column_width(&self, count: usize) -> f64 {
        self.width / count.max(1) as f64
    }
}

/// Round a raw step up to 1, 2, 2.5 or 5 times a power of ten
pub fn nice_step(raw: f64) -> f64 {
    if !raw.is_finite() || raw <= 0.0 {
        return 1.0;
    }

    let magnitude = 10f64.powf(raw.log10().floor());
    let fraction = raw / magnitude;
    let nice = if fraction <= 1.0 {
        1.0
    } else if fraction <= 2.0 {
        2.0
    } else if fraction <= 2.5 {
        2.5
    } else if fraction <= 5.0 {
        5.0
    } else {
        10.0
    };

    nice * magnitude
}

/// Vertical value axis starting at zero
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueAxis {
    pub max: f64,
    pub step: f64,
}

/// Most tick lines drawn on a value axis
const MAX_VALUE_TICKS: usize = 10;

impl ValueAxis {
    /// Fit `values` with about five ticks, or with `step_size` when given
    pub fn fit(values: &[f64], step_size: Option<f64>) -> Self {
        let top = values.iter().copied().fold(0.0_f64, f64::max);

        let mut step = match step_size {
            Some(step) if step > 0.0 => step,
            _ => nice_step(top / 5.0),
        };
        while (top / step).ceil() as usize > MAX_VALUE_TICKS {
            step *= 2.0;
        }

        let max = ((top / step).ceil() * step).max(step);
        Self { max, step }
    }

    /// Tick values from zero to `max`
    pub fn ticks(&self) -> Vec<f64> {
        let count = (self.max / self.step).round() as usize;
        (0..=count).map(|i| i as f64 * self.step).collect()
    }

    /// Canvas y coordinate of `value`
    pub fn y_for(&self, value: f64, area: &Area) -> f64 {
        area.bottom() - (value / self.max) * area.height
    }
}

/// Draw every n-th category label so at most `limit` are shown
pub fn label_stride(count: usize, limit: Option<usize>) -> usize {
    match limit {
        Some(limit) if limit > 0 && count > limit => count.div_ceil(limit),
        _ => 1,
    }
}

/// Label rotation in degrees
///
/// `min_deg` while the widest label fits its column, `max_deg` as soon as
/// neighbouring labels would overlap.
pub fn label_rotation(widest: f64, column_width: f64, min_deg: f64, max_deg: f64) -> f64 {
    if widest <= column_width || widest <= 0.0 {
        return min_deg;
    }
    max_deg.max(min_deg)
}

/// Area of the canvas that answers for one data point
#[derive(Debug, Clone, PartialEq)]
pub enum HitRegion {
    Bar {
        index: usize,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    Slice {
        index: usize,
        cx: f64,
        cy: f64,
        radius: f64,
        start: f64,
        end: f64,
    },
    /// Whole-height column, matched by horizontal distance
    Column { index: usize, x: f64 },
}

impl HitRegion {
    pub fn index(&self) -> usize {
        match self {
            HitRegion::Bar { index, .. }
            | HitRegion::Slice { index, .. }
            | HitRegion::Column { index, .. } => *index,
        }
    }

    fn contains(&self, px: f64, py: f64) -> bool {
        match *self {
            HitRegion::Bar {
                x,
                y,
                width,
                height,
                ..
            } => px >= x && px <= x + width && py >= y && py <= y + height,
            HitRegion::Slice {
                cx,
                cy,
                radius,
                start,
                end,
                ..
            } => {
                let (dx, dy) = (px - cx, py - cy);
                if dx * dx + dy * dy > radius * radius {
                    return false;
                }
                let mut angle = dy.atan2(dx);
                while angle < start {
                    angle += 2.0 * PI;
                }
                angle < end
            }
            HitRegion::Column { .. } => true,
        }
    }
}

/// Data point under the pointer
///
/// Columns match the horizontally nearest one inside the plot area; bars
/// and slices must contain the pointer.
pub fn hit_test(regions: &[HitRegion], area: &Area, px: f64, py: f64) -> Option<usize> {
    let columns = regions.iter().filter_map(|r| match r {
        HitRegion::Column { index, x } => Some((*index, (px - x).abs())),
        _ => None,
    });

    let inside = px >= area.left && px <= area.right() && py >= area.top && py <= area.bottom();
    let nearest = columns
        .filter(|_| inside)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(index, _)| index);

    nearest.or_else(|| {
        regions
            .iter()
            .find(|r| !matches!(r, HitRegion::Column { .. }) && r.contains(px, py))
            .map(HitRegion::index)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area() -> Area {
        Area {
            left: 60.0,
            top: 20.0,
            width: 400.0,
            height: 200.0,
        }
    }

    #[test]
    fn test_nice_step() {
        assert_eq!(nice_step(0.7), 1.0);
        assert_eq!(nice_step(3.0), 5.0);
        assert_eq!(nice_step(240.0), 250.0);
        assert_eq!(nice_step(0.0), 1.0);
    }

    #[test]
    fn test_value_axis_fit() {
        let axis = ValueAxis::fit(&[1200.0, 800.0], None);
        assert_eq!(axis.step, 250.0);
        assert_eq!(axis.max, 1250.0);
        assert_eq!(axis.ticks().len(), 6);

        let empty = ValueAxis::fit(&[], None);
        assert_eq!(empty.max, 1.0);
    }

    #[test]
    fn test_step_size_is_widened_past_ten_ticks() {
        let small = ValueAxis::fit(&[4.0], Some(1.0));
        assert_eq!((small.max, small.step), (4.0, 1.0));

        let large = ValueAxis::fit(&[35.0], Some(1.0));
        assert!(large.ticks().len() <= MAX_VALUE_TICKS + 1);
        assert_eq!(large.step.fract(), 0.0);
    }

    #[test]
    fn test_y_for() {
        let axis = ValueAxis { max: 10.0, step: 2.0 };
        assert_eq!(axis.y_for(0.0, &area()), 220.0);
        assert_eq!(axis.y_for(10.0, &area()), 20.0);
    }

    #[test]
    fn test_label_stride() {
        assert_eq!(label_stride(7, Some(10)), 1);
        assert_eq!(label_stride(30, Some(10)), 3);
        assert_eq!(label_stride(31, Some(10)), 4);
        assert_eq!(label_stride(31, None), 1);
    }

    #[test]
    fn test_label_rotation() {
        assert_eq!(label_rotation(40.0, 50.0, 0.0, 45.0), 0.0);
        assert_eq!(label_rotation(200.0, 50.0, 0.0, 45.0), 45.0);

        // Barely overlapping labels still get the full angle
        assert_eq!(label_rotation(51.0, 50.0, 0.0, 45.0), 45.0);
        assert_eq!(label_rotation(0.0, 0.0, 0.0, 45.0), 0.0);
    }

    #[test]
    fn test_hit_bars_and_slices() {
        let regions = vec![
            HitRegion::Bar {
                index: 0,
                x: 70.0,
                y: 100.0,
                width: 30.0,
                height: 120.0,
            },
            HitRegion::Slice {
                index: 1,
                cx: 300.0,
                cy: 100.0,
                radius: 50.0,
                start: -PI / 2.0,
                end: 0.0,
            },
        ];

        assert_eq!(hit_test(&regions, &area(), 80.0, 150.0), Some(0));
        assert_eq!(hit_test(&regions, &area(), 80.0, 50.0), None);
        // upper-right quarter of the pie
        assert_eq!(hit_test(&regions, &area(), 320.0, 80.0), Some(1));
        assert_eq!(hit_test(&regions, &area(), 280.0, 120.0), None);
    }

    #[test]
    fn test_hit_nearest_column() {
        let regions: Vec<_> = (0..4)
            .map(|i| HitRegion::Column {
                index: i,
                x: area().column_center(i, 4),
            })
            .collect();

        assert_eq!(hit_test(&regions, &area(), 61.0, 30.0), Some(0));
        assert_eq!(hit_test(&regions, &area(), 330.0, 200.0), Some(2));
        assert_eq!(hit_test(&regions, &area(), 10.0, 30.0), None);
    }
}
