use serde::Deserialize;

use crate::render::RouteStyle;

pub const DEFAULT_API_BASE: &str = "http://localhost:5000";

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PlannerConfig {
    /// None means the page's own origin, or `DEFAULT_API_BASE` outside a browser
    pub api_base: Option<String>,
    pub route_style: RouteStyle,
    pub preview_zoom: u8,
    /// In pixels, applied on every side when zooming to a route
    pub fit_padding: f64,
    /// BCP 47 tag used to sort pin titles
    pub sort_locale: String,
    pub hide_expired_in_wizard: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            api_base: None,
            route_style: RouteStyle::default(),
            preview_zoom: 15,
            fit_padding: 50.0,
            sort_locale: "ja".to_string(),
            hide_expired_in_wizard: true,
        }
    }
}

impl PlannerConfig {
    pub fn api_base_or(&self, fallback: Option<String>) -> String {
        self.api_base
            .clone()
            .or(fallback)
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
    }
}
