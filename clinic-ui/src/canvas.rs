//! Canvas Chart Surface
//!
//! Draws bar, pie and line charts from a [`ChartSpec`] on HTML5 canvases,
//! with hover tooltips built from the spec's precomputed lines.

use std::cell::RefCell;
use std::f64::consts::PI;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, Document, Event, HtmlCanvasElement, MouseEvent};

use clinic_dashboard::chart::{Dataset, LegendPosition};
use clinic_dashboard::{ChartHandle, ChartKind, ChartSpec, ChartSurface, MountError};

use crate::geometry::{hit_test, label_rotation, label_stride, Area, HitRegion, ValueAxis};
use crate::page::Listener;

const AXIS_TEXT: &str = "#6c757d";
const GRID_LINE: &str = "#e9ecef";
const FONT: &str = "12px sans-serif";
const TOOLTIP_BACKGROUND: &str = "rgba(0, 0, 0, 0.8)";

// Margins
const MARGIN_LEFT: f64 = 60.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 20.0;
const MARGIN_BOTTOM: f64 = 40.0;

const LEGEND_HEIGHT: f64 = 30.0;

/// Mounts charts on `<canvas>` elements of a document
#[derive(Clone)]
pub struct CanvasSurface {
    document: Document,
}

impl CanvasSurface {
    pub fn new(document: Document) -> Self {
        Self { document }
    }
}

impl ChartSurface for CanvasSurface {
    type Handle = CanvasChart;

    fn mount(&mut self, mount_id: &str, spec: &ChartSpec) -> Result<CanvasChart, MountError> {
        let element = self
            .document
            .get_element_by_id(mount_id)
            .ok_or_else(|| MountError::Missing(mount_id.to_string()))?;

        let unsupported = |reason: &str| MountError::Unsupported {
            id: mount_id.to_string(),
            reason: reason.to_string(),
        };

        let canvas = element
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| unsupported("not a canvas"))?;
        let ctx = match canvas.get_context("2d") {
            Ok(Some(ctx)) => ctx
                .dyn_into::<CanvasRenderingContext2d>()
                .map_err(|_| unsupported("no 2d context"))?,
            _ => return Err(unsupported("no 2d context")),
        };

        let chart = Rc::new(CanvasChartState {
            canvas,
            ctx,
            spec: spec.clone(),
            layout: RefCell::new(Layout::default()),
        });
        chart.fit_to_element();
        chart.draw(None);

        let target: &web_sys::EventTarget = chart.canvas.as_ref();
        let on_move = {
            let chart = Rc::clone(&chart);
            Listener::new(target, "mousemove", move |event: Event| {
                if let Some(event) = event.dyn_ref::<MouseEvent>() {
                    chart.hover(event);
                }
            })
        };
        let on_leave = {
            let chart = Rc::clone(&chart);
            Listener::new(target, "mouseleave", move |_| chart.draw(None))
        };

        Ok(CanvasChart {
            chart,
            listeners: vec![on_move, on_leave],
            disposed: false,
        })
    }
}

/// Chart drawn on a canvas
pub struct CanvasChart {
    chart: Rc<CanvasChartState>,
    listeners: Vec<Listener>,
    disposed: bool,
}

impl CanvasChart {
    pub fn spec(&self) -> &ChartSpec {
        &self.chart.spec
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.chart.canvas
    }

    /// Index of the data point under canvas coordinates `(x, y)`
    pub fn point_at(&self, x: f64, y: f64) -> Option<usize> {
        let layout = self.chart.layout.borrow();
        hit_test(&layout.regions, &layout.area, x, y)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl ChartHandle for CanvasChart {
    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.listeners.clear();
        self.chart.clear();
        self.disposed = true;
    }
}

#[derive(Default)]
struct Layout {
    area: Area,
    regions: Vec<HitRegion>,
}

struct CanvasChartState {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    spec: ChartSpec,
    layout: RefCell<Layout>,
}

impl CanvasChartState {
    /// Match the drawing buffer to the element's layout size
    fn fit_to_element(&self) {
        if !self.spec.options.responsive {
            return;
        }
        let (width, height) = (self.canvas.client_width(), self.canvas.client_height());
        if width > 0 {
            self.canvas.set_width(width as u32);
        }
        if height > 0 && !self.spec.options.maintain_aspect_ratio {
            self.canvas.set_height(height as u32);
        }
    }

    fn size(&self) -> (f64, f64) {
        (self.canvas.width() as f64, self.canvas.height() as f64)
    }

    fn clear(&self) {
        let (width, height) = self.size();
        self.ctx.clear_rect(0.0, 0.0, width, height);
        *self.layout.borrow_mut() = Layout::default();
    }

    fn hover(&self, event: &MouseEvent) {
        // Pointer offsets are in CSS pixels; the layout is in canvas pixels
        let scale_x = match self.canvas.client_width() {
            w if w > 0 => self.canvas.width() as f64 / w as f64,
            _ => 1.0,
        };
        let scale_y = match self.canvas.client_height() {
            h if h > 0 => self.canvas.height() as f64 / h as f64,
            _ => 1.0,
        };
        let (x, y) = (event.offset_x() as f64 * scale_x, event.offset_y() as f64 * scale_y);

        let index = {
            let layout = self.layout.borrow();
            hit_test(&layout.regions, &layout.area, x, y)
        };
        self.draw(index.map(|i| (i, x, y)));
    }

    fn draw(&self, hover: Option<(usize, f64, f64)>) {
        let (width, height) = self.size();
        self.ctx.clear_rect(0.0, 0.0, width, height);
        self.ctx.set_font(FONT);

        let layout = match self.spec.kind {
            ChartKind::Bar => self.draw_bar(width, height),
            ChartKind::Pie => self.draw_pie(width, height),
            ChartKind::Line => self.draw_line(width, height),
        };
        *self.layout.borrow_mut() = layout;

        if let Some((index, x, y)) = hover {
            self.draw_tooltip(index, x, y, width);
        }
    }

    fn dataset(&self) -> Option<&Dataset> {
        self.spec.data.datasets.first()
    }

    /// Plot area, grid and both axes of a bar or line chart
    fn draw_axes(&self, width: f64, height: f64) -> (Area, ValueAxis) {
        let labels = self.spec.labels();
        let (x_ticks, y_ticks) = match &self.spec.options.scales {
            Some(scales) => (scales.x.ticks.clone(), scales.y.ticks.clone()),
            None => Default::default(),
        };

        let plot_width = (width - MARGIN_LEFT - MARGIN_RIGHT).max(1.0);
        let column_width = plot_width / labels.len().max(1) as f64;
        let widest = labels
            .iter()
            .filter_map(|label| self.ctx.measure_text(label).ok())
            .map(|metrics| metrics.width())
            .fold(0.0, f64::max);
        let rotation = label_rotation(widest, column_width, x_ticks.min_rotation, x_ticks.max_rotation);
        let label_drop = widest * rotation.to_radians().sin();

        let area = Area {
            left: MARGIN_LEFT,
            top: MARGIN_TOP,
            width: plot_width,
            height: (height - MARGIN_TOP - MARGIN_BOTTOM - label_drop).max(1.0),
        };
        let axis = ValueAxis::fit(self.spec.values(), y_ticks.step_size);

        // Horizontal grid lines with value labels
        self.ctx.set_line_width(1.0);
        self.ctx.set_text_align("right");
        self.ctx.set_text_baseline("middle");
        for tick in axis.ticks() {
            let y = axis.y_for(tick, &area);
            self.ctx.set_stroke_style(&GRID_LINE.into());
            self.ctx.begin_path();
            self.ctx.move_to(area.left, y);
            self.ctx.line_to(area.right(), y);
            self.ctx.stroke();

            self.ctx.set_fill_style(&AXIS_TEXT.into());
            let _ = self.ctx.fill_text(&y_ticks.format.apply(tick), area.left - 8.0, y);
        }

        // Category labels under the columns
        let stride = label_stride(labels.len(), x_ticks.max_ticks_limit);
        self.ctx.set_fill_style(&AXIS_TEXT.into());
        if rotation > 0.0 {
            self.ctx.set_text_align("right");
            self.ctx.set_text_baseline("middle");
        } else {
            self.ctx.set_text_align("center");
            self.ctx.set_text_baseline("top");
        }
        for (i, label) in labels.iter().enumerate().step_by(stride) {
            let x = area.column_center(i, labels.len());
            let y = area.bottom() + 8.0;
            if rotation > 0.0 {
                self.ctx.save();
                let _ = self.ctx.translate(x, y);
                let _ = self.ctx.rotate(-rotation.to_radians());
                let _ = self.ctx.fill_text(label, 0.0, 0.0);
                self.ctx.restore();
            } else {
                let _ = self.ctx.fill_text(label, x, y);
            }
        }

        (area, axis)
    }

    fn draw_bar(&self, width: f64, height: f64) -> Layout {
        let (area, axis) = self.draw_axes(width, height);
        let Some(dataset) = self.dataset() else {
            return Layout {
                area,
                regions: Vec::new(),
            };
        };

        let count = dataset.data.len();
        let bar_width = area.column_width(count) * 0.6;
        let radius = dataset.border_radius.unwrap_or(0.0);
        let mut regions = Vec::with_capacity(count);

        for (i, value) in dataset.data.iter().enumerate() {
            let x = area.column_center(i, count) - bar_width / 2.0;
            let y = axis.y_for(*value, &area);
            let bar_height = area.bottom() - y;

            self.ctx.set_fill_style(&color_at(&dataset.background_color, i).into());
            self.ctx.set_stroke_style(&dataset.border_color.as_str().into());
            self.ctx.set_line_width(dataset.border_width);
            self.rounded_top_rect(x, y, bar_width, bar_height, radius);
            self.ctx.fill();
            if dataset.border_width > 0.0 {
                self.ctx.stroke();
            }

            regions.push(HitRegion::Bar {
                index: i,
                x,
                y,
                width: bar_width,
                height: bar_height,
            });
        }

        Layout { area, regions }
    }

    fn draw_pie(&self, width: f64, height: f64) -> Layout {
        let legend = &self.spec.options.legend;
        let legend_space = if legend.display { LEGEND_HEIGHT } else { 0.0 };
        let (top_space, bottom_space) = match legend.position {
            LegendPosition::Top => (legend_space, 0.0),
            LegendPosition::Bottom => (0.0, legend_space),
        };

        let area = Area {
            left: 0.0,
            top: top_space,
            width,
            height: (height - legend_space).max(1.0),
        };
        let (cx, cy) = (area.left + area.width / 2.0, area.top + area.height / 2.0);
        let radius = (area.width.min(area.height) / 2.0 - 10.0).max(1.0);

        let mut regions = Vec::new();
        if let Some(dataset) = self.dataset() {
            let total: f64 = dataset.data.iter().sum();
            let mut start = -PI / 2.0;

            for (i, value) in dataset.data.iter().enumerate() {
                if total <= 0.0 || *value <= 0.0 {
                    continue;
                }
                let end = start + value / total * 2.0 * PI;

                self.ctx.begin_path();
                self.ctx.move_to(cx, cy);
                let _ = self.ctx.arc(cx, cy, radius, start, end);
                self.ctx.close_path();
                self.ctx.set_fill_style(&color_at(&dataset.background_color, i).into());
                self.ctx.fill();
                if dataset.border_width > 0.0 {
                    self.ctx.set_stroke_style(&dataset.border_color.as_str().into());
                    self.ctx.set_line_width(dataset.border_width);
                    self.ctx.stroke();
                }

                regions.push(HitRegion::Slice {
                    index: i,
                    cx,
                    cy,
                    radius,
                    start,
                    end,
                });
                start = end;
            }

            if legend.display {
                let y = match legend.position {
                    LegendPosition::Top => legend_space / 2.0,
                    LegendPosition::Bottom => height - bottom_space / 2.0,
                };
                self.draw_legend(&dataset.background_color, y, width);
            }
        }

        Layout { area, regions }
    }

    fn draw_line(&self, width: f64, height: f64) -> Layout {
        let (area, axis) = self.draw_axes(width, height);
        let Some(dataset) = self.dataset() else {
            return Layout {
                area,
                regions: Vec::new(),
            };
        };

        let count = dataset.data.len();
        let points: Vec<(f64, f64)> = dataset
            .data
            .iter()
            .enumerate()
            .map(|(i, value)| (area.column_center(i, count), axis.y_for(*value, &area)))
            .collect();
        let tension = dataset.tension.unwrap_or(0.0);

        if let (Some(first), Some(last)) = (points.first(), points.last()) {
            if dataset.fill == Some(true) {
                self.trace_line(&points, tension);
                self.ctx.line_to(last.0, area.bottom());
                self.ctx.line_to(first.0, area.bottom());
                self.ctx.close_path();
                self.ctx.set_fill_style(&color_at(&dataset.background_color, 0).into());
                self.ctx.fill();
            }

            self.trace_line(&points, tension);
            self.ctx.set_stroke_style(&dataset.border_color.as_str().into());
            self.ctx.set_line_width(dataset.border_width);
            self.ctx.stroke();
        }

        let radius = dataset.point_radius.unwrap_or(3.0);
        let point_color = dataset
            .point_background_color
            .clone()
            .unwrap_or_else(|| dataset.border_color.clone());
        for (x, y) in &points {
            self.ctx.begin_path();
            let _ = self.ctx.arc(*x, *y, radius, 0.0, PI * 2.0);
            self.ctx.set_fill_style(&point_color.as_str().into());
            self.ctx.fill();
            self.ctx.set_stroke_style(&"#ffffff".into());
            self.ctx.set_line_width(2.0);
            self.ctx.stroke();
        }

        let regions = points
            .iter()
            .enumerate()
            .map(|(index, (x, _))| HitRegion::Column { index, x: *x })
            .collect();

        Layout { area, regions }
    }

    /// Path through `points`, smoothed with cubic segments when `tension > 0`
    fn trace_line(&self, points: &[(f64, f64)], tension: f64) {
        self.ctx.begin_path();
        let Some(first) = points.first() else {
            return;
        };
        self.ctx.move_to(first.0, first.1);

        for i in 1..points.len() {
            let (x, y) = points[i];
            if tension <= 0.0 {
                self.ctx.line_to(x, y);
                continue;
            }

            let p0 = points[i.saturating_sub(2)];
            let p1 = points[i - 1];
            let p3 = points[(i + 1).min(points.len() - 1)];
            let cp1 = (p1.0 + (x - p0.0) * tension / 2.0, p1.1 + (y - p0.1) * tension / 2.0);
            let cp2 = (x - (p3.0 - p1.0) * tension / 2.0, y - (p3.1 - p1.1) * tension / 2.0);
            self.ctx.bezier_curve_to(cp1.0, cp1.1, cp2.0, cp2.1, x, y);
        }
    }

    fn rounded_top_rect(&self, x: f64, y: f64, width: f64, height: f64, radius: f64) {
        let r = radius.min(width / 2.0).min(height.max(0.0));
        self.ctx.begin_path();
        self.ctx.move_to(x, y + height);
        self.ctx.line_to(x, y + r);
        let _ = self.ctx.arc_to(x, y, x + r, y, r);
        self.ctx.line_to(x + width - r, y);
        let _ = self.ctx.arc_to(x + width, y, x + width, y + r, r);
        self.ctx.line_to(x + width, y + height);
        self.ctx.close_path();
    }

    fn draw_legend(&self, colors: &[String], y: f64, width: f64) {
        let labels = self.spec.labels();
        let swatch = 12.0;
        let gap = 16.0;

        let widths: Vec<f64> = labels
            .iter()
            .map(|label| {
                let text = self.ctx.measure_text(label).map(|m| m.width()).unwrap_or(0.0);
                swatch + 6.0 + text
            })
            .collect();
        let total = widths.iter().sum::<f64>() + gap * labels.len().saturating_sub(1) as f64;

        self.ctx.set_text_align("left");
        self.ctx.set_text_baseline("middle");
        let mut x = ((width - total) / 2.0).max(0.0);
        for (i, label) in labels.iter().enumerate() {
            self.ctx.set_fill_style(&color_at(colors, i).into());
            self.ctx.fill_rect(x, y - swatch / 2.0, swatch, swatch);
            self.ctx.set_fill_style(&AXIS_TEXT.into());
            let _ = self.ctx.fill_text(label, x + swatch + 6.0, y);
            x += widths[i] + gap;
        }
    }

    fn draw_tooltip(&self, index: usize, x: f64, y: f64, width: f64) {
        let lines = self.spec.tooltip_at(index);
        if lines.is_empty() {
            return;
        }
        let title = self.spec.labels().get(index).cloned().unwrap_or_default();

        let text: Vec<&str> = std::iter::once(title.as_str())
            .chain(lines.iter().map(String::as_str))
            .collect();
        let text_width = text
            .iter()
            .filter_map(|line| self.ctx.measure_text(line).ok())
            .map(|m| m.width())
            .fold(0.0, f64::max);

        let padding = 6.0;
        let line_height = 16.0;
        let box_width = text_width + padding * 2.0;
        let box_height = line_height * text.len() as f64 + padding * 2.0;

        // Keep the box on the canvas
        let left = if x + 12.0 + box_width > width {
            (x - 12.0 - box_width).max(0.0)
        } else {
            x + 12.0
        };
        let top = (y - box_height / 2.0).max(0.0);

        self.ctx.set_fill_style(&TOOLTIP_BACKGROUND.into());
        self.ctx.fill_rect(left, top, box_width, box_height);

        self.ctx.set_fill_style(&"#ffffff".into());
        self.ctx.set_text_align("left");
        self.ctx.set_text_baseline("top");
        for (i, line) in text.iter().enumerate() {
            let font = if i == 0 { "bold 12px sans-serif" } else { FONT };
            self.ctx.set_font(font);
            let _ = self
                .ctx
                .fill_text(line, left + padding, top + padding + i as f64 * line_height);
        }
        self.ctx.set_font(FONT);
    }
}

fn color_at(colors: &[String], index: usize) -> &str {
    if colors.is_empty() {
        return "#6c757d";
    }
    &colors[index % colors.len()]
}
