use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use journey_model::{Category, CategoryId, LatLng, Pin, PinId};

use crate::geometry::{bearing_degrees, midpoint, Bounds};

/// The parts of a Leaflet-like map this crate draws through. Layers are opaque handles owned by
/// the surface. Markers and polylines are always placed into a group, and a group only appears on
/// the map once `add_layer` is called, so a whole route shows up or disappears at once.
pub trait MapSurface {
    type Layer: Clone;

    fn create_layer_group(&mut self) -> Self::Layer;
    fn place_polyline(&mut self, group: &Self::Layer, pts: &[LatLng], style: &LineStyle)
        -> Self::Layer;
    fn place_marker(&mut self, group: &Self::Layer, at: LatLng, icon: &MarkerIcon) -> Self::Layer;
    fn add_layer(&mut self, layer: &Self::Layer);
    fn remove_layer(&mut self, layer: &Self::Layer);
    fn fit_bounds(&mut self, bounds: Bounds, padding: f64);
}

/// Creates and destroys the small single-pin map shown while confirming a stop.
pub trait PreviewHost {
    type Map;

    fn open_preview(&mut self, center: LatLng, zoom: u8) -> Self::Map;
    fn close_preview(&mut self, map: Self::Map);
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RouteStyle {
    pub base_color: String,
    pub center_color: String,
    pub base_weight: f64,
    pub center_weight: f64,
    pub base_opacity: f64,
    pub center_opacity: f64,
    pub arrow_color: String,
    pub show_numbers: bool,
}

impl Default for RouteStyle {
    fn default() -> Self {
        Self {
            base_color: "#1e3a8a".to_string(),
            center_color: "#5bb0ff".to_string(),
            base_weight: 10.0,
            center_weight: 4.0,
            base_opacity: 0.95,
            center_opacity: 1.0,
            arrow_color: "#2b76c6".to_string(),
            show_numbers: true,
        }
    }
}

impl RouteStyle {
    fn base_line(&self) -> LineStyle {
        LineStyle::round(&self.base_color, self.base_weight, self.base_opacity)
    }

    fn center_line(&self) -> LineStyle {
        LineStyle::round(&self.center_color, self.center_weight, self.center_opacity)
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineStyle {
    pub color: String,
    pub weight: f64,
    pub opacity: f64,
    pub line_cap: &'static str,
    pub line_join: &'static str,
}

impl LineStyle {
    fn round(color: &str, weight: f64, opacity: f64) -> Self {
        Self {
            color: color.to_string(),
            weight,
            opacity,
            line_cap: "round",
            line_join: "round",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum MarkerIcon {
    /// Points east at 0 degrees, rotated counter-clockwise by `angle`.
    Arrow { angle: f64, color: String },
    /// 1-based position along a route
    Badge { ordinal: usize },
    Pin {
        glyph: &'static str,
        image_url: Option<String>,
    },
}

/// Everything a Leaflet `divIcon` needs.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IconSpec {
    pub kind: &'static str,
    pub html: String,
    pub class_name: &'static str,
    pub icon_size: [u32; 2],
    pub icon_anchor: [u32; 2],
    pub interactive: bool,
}

impl MarkerIcon {
    /// Decorations must never steal clicks from the pins underneath.
    pub fn interactive(&self) -> bool {
        matches!(self, MarkerIcon::Pin { .. })
    }

    pub fn spec(&self) -> IconSpec {
        let interactive = self.interactive();
        match self {
            MarkerIcon::Arrow { angle, color } => IconSpec {
                kind: "arrow",
                html: arrow_svg(*angle, color),
                class_name: "journey-arrow-icon",
                icon_size: [28, 12],
                icon_anchor: [14, 6],
                interactive,
            },
            MarkerIcon::Badge { ordinal } => IconSpec {
                kind: "badge",
                html: format!("<div class=\"journey-number-badge\">{ordinal}</div>"),
                class_name: "journey-number-icon",
                icon_size: [24, 24],
                icon_anchor: [12, 12],
                interactive,
            },
            MarkerIcon::Pin { glyph, image_url } => {
                let inner = match image_url {
                    Some(url) => format!(
                        "<img src=\"{}\" style=\"width:100%;height:100%;object-fit:cover;border-radius:50%;\">",
                        escape_html(url)
                    ),
                    None => glyph.to_string(),
                };
                IconSpec {
                    kind: "pin",
                    html: format!("<div class=\"journey-pin-icon\">{inner}</div>"),
                    class_name: "",
                    icon_size: [40, 50],
                    icon_anchor: [20, 50],
                    interactive,
                }
            }
        }
    }
}

// CSS rotation is clockwise with y pointing down, so negate the map bearing.
fn arrow_svg(angle: f64, color: &str) -> String {
    format!(
        concat!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"28\" height=\"12\" viewBox=\"0 0 28 12\" ",
            "style=\"display:block; transform: rotate({:.2}deg);\">",
            "<path d=\"M2 6 L18 6 L14 2 L16 0 L26 6 L16 12 L14 10 L18 6 L2 6 Z\" fill=\"{}\"/>",
            "</svg>"
        ),
        -angle,
        escape_html(color)
    )
}

pub(crate) fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RouteHandle(u64);

pub struct RenderedRoute<L> {
    pub handle: RouteHandle,
    group: L,
    pub arrows: usize,
    pub badges: usize,
    pub bounds: Bounds,
}

/// Draws at most one route at a time. Drawing again replaces the previous route.
pub struct RouteRenderer<L> {
    active: Option<RenderedRoute<L>>,
    next_handle: u64,
}

impl<L: Clone> Default for RouteRenderer<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: Clone> RouteRenderer<L> {
    pub fn new() -> Self {
        Self {
            active: None,
            next_handle: 0,
        }
    }

    pub fn active(&self) -> Option<&RenderedRoute<L>> {
        self.active.as_ref()
    }

    /// Returns None and leaves any current route alone if there aren't at least 2 points.
    pub fn render<S: MapSurface<Layer = L>>(
        &mut self,
        surface: &mut S,
        pts: &[LatLng],
        style: &RouteStyle,
    ) -> Option<RouteHandle> {
        if pts.len() < 2 {
            warn!("Need at least 2 points to draw a route, got {}", pts.len());
            return None;
        }
        let bounds = Bounds::from_points(pts)?;
        self.clear(surface);

        let group = surface.create_layer_group();
        surface.place_polyline(&group, pts, &style.base_line());
        surface.place_polyline(&group, pts, &style.center_line());

        let mut arrows = 0;
        for pair in pts.windows(2) {
            let icon = MarkerIcon::Arrow {
                angle: bearing_degrees(pair[0], pair[1]),
                color: style.arrow_color.clone(),
            };
            surface.place_marker(&group, midpoint(pair[0], pair[1]), &icon);
            arrows += 1;
        }

        let mut badges = 0;
        if style.show_numbers {
            for (idx, pt) in pts.iter().enumerate() {
                surface.place_marker(&group, *pt, &MarkerIcon::Badge { ordinal: idx + 1 });
                badges += 1;
            }
        }

        surface.add_layer(&group);
        info!("Route drawn with {} points", pts.len());

        let handle = RouteHandle(self.next_handle);
        self.next_handle += 1;
        self.active = Some(RenderedRoute {
            handle,
            group,
            arrows,
            badges,
            bounds,
        });
        Some(handle)
    }

    /// True if something was removed
    pub fn clear<S: MapSurface<Layer = L>>(&mut self, surface: &mut S) -> bool {
        match self.active.take() {
            Some(route) => {
                surface.remove_layer(&route.group);
                true
            }
            None => false,
        }
    }

    /// Only clears if `handle` is still the route on the map.
    pub fn clear_handle<S: MapSurface<Layer = L>>(
        &mut self,
        surface: &mut S,
        handle: RouteHandle,
    ) -> bool {
        if self.active.as_ref().map(|r| r.handle) == Some(handle) {
            self.clear(surface)
        } else {
            false
        }
    }
}

/// The main map's pin markers, replaced wholesale on every refresh.
pub struct PinLayer<L> {
    group: Option<L>,
}

impl<L: Clone> Default for PinLayer<L> {
    fn default() -> Self {
        Self { group: None }
    }
}

impl<L: Clone> PinLayer<L> {
    /// Draws every active pin, optionally only from one category. Returns how many were drawn.
    pub fn show<S: MapSurface<Layer = L>>(
        &mut self,
        surface: &mut S,
        pins: &[Pin],
        now: DateTime<Utc>,
        only: Option<CategoryId>,
    ) -> usize {
        self.clear(surface);

        let group = surface.create_layer_group();
        let mut count = 0;
        for pin in pins {
            if !pin.is_active(now) || only.is_some_and(|c| c != pin.category) {
                continue;
            }
            let icon = MarkerIcon::Pin {
                glyph: Category::icon_for(pin.category),
                image_url: pin.image_url.clone(),
            };
            surface.place_marker(&group, pin.position(), &icon);
            count += 1;
        }
        surface.add_layer(&group);
        self.group = Some(group);
        count
    }

    pub fn clear<S: MapSurface<Layer = L>>(&mut self, surface: &mut S) {
        if let Some(group) = self.group.take() {
            surface.remove_layer(&group);
        }
    }
}

/// Holds the one preview map that may be open.
pub struct PreviewSlot<M> {
    open: Option<(PinId, M)>,
}

impl<M> Default for PreviewSlot<M> {
    fn default() -> Self {
        Self { open: None }
    }
}

impl<M> PreviewSlot<M> {
    pub fn showing(&self) -> Option<PinId> {
        self.open.as_ref().map(|(id, _)| *id)
    }

    pub fn show<H: PreviewHost<Map = M>>(&mut self, host: &mut H, pin: &Pin, zoom: u8) {
        self.close(host);
        let map = host.open_preview(pin.position(), zoom);
        self.open = Some((pin.id, map));
    }

    pub fn close<H: PreviewHost<Map = M>>(&mut self, host: &mut H) {
        if let Some((_, map)) = self.open.take() {
            host.close_preview(map);
        }
    }
}
