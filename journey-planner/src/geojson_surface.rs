use std::collections::BTreeMap;

use geo::{line_measures::LengthMeasurable, Coord, Haversine, LineString};
use geojson::{Feature, FeatureCollection, Geometry};

use journey_model::LatLng;

use crate::geometry::Bounds;
use crate::render::{LineStyle, MapSurface, MarkerIcon};

/// A map surface that just collects GeoJSON features, for use outside a browser.
#[derive(Default)]
pub struct GeoJsonSurface {
    groups: BTreeMap<usize, Group>,
    next_id: usize,
    fitted: Option<(Bounds, f64)>,
}

#[derive(Default)]
struct Group {
    on_map: bool,
    features: Vec<(usize, Feature)>,
}

impl GeoJsonSurface {
    /// Only layers that were added to the map count.
    pub fn to_feature_collection(&self) -> FeatureCollection {
        self.groups
            .values()
            .filter(|g| g.on_map)
            .flat_map(|g| g.features.iter().map(|(_, f)| f.clone()))
            .collect()
    }

    pub fn to_geojson_string(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&geojson::GeoJson::from(self.to_feature_collection()))
    }

    pub fn fitted(&self) -> Option<(Bounds, f64)> {
        self.fitted
    }

    fn add_feature(&mut self, group: usize, feature: Feature) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        self.groups
            .entry(group)
            .or_default()
            .features
            .push((id, feature));
        id
    }
}

impl MapSurface for GeoJsonSurface {
    type Layer = usize;

    fn create_layer_group(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        self.groups.insert(id, Group::default());
        id
    }

    fn place_polyline(&mut self, group: &usize, pts: &[LatLng], style: &LineStyle) -> usize {
        let line: LineString = pts.iter().map(|pt| Coord::from(*pt)).collect();
        let mut f = Feature::from(Geometry::from(&line));
        f.set_property("kind", "line");
        f.set_property("color", style.color.clone());
        f.set_property("weight", style.weight);
        f.set_property("opacity", style.opacity);
        f.set_property("line_cap", style.line_cap);
        f.set_property("line_join", style.line_join);
        f.set_property("length_meters", line.length(&Haversine));
        self.add_feature(*group, f)
    }

    fn place_marker(&mut self, group: &usize, at: LatLng, icon: &MarkerIcon) -> usize {
        let mut f = Feature::from(Geometry::from(geojson::Value::Point(vec![at.lng, at.lat])));
        let spec = icon.spec();
        f.set_property("kind", spec.kind);
        f.set_property("interactive", spec.interactive);
        match icon {
            MarkerIcon::Arrow { angle, color } => {
                f.set_property("rotation", *angle);
                f.set_property("color", color.clone());
            }
            MarkerIcon::Badge { ordinal } => {
                f.set_property("ordinal", *ordinal);
            }
            MarkerIcon::Pin { glyph, image_url } => {
                f.set_property("glyph", *glyph);
                f.set_property("image_url", image_url.clone());
            }
        }
        self.add_feature(*group, f)
    }

    fn add_layer(&mut self, layer: &usize) {
        if let Some(group) = self.groups.get_mut(layer) {
            group.on_map = true;
        }
    }

    fn remove_layer(&mut self, layer: &usize) {
        if self.groups.remove(layer).is_some() {
            return;
        }
        for group in self.groups.values_mut() {
            group.features.retain(|(id, _)| id != layer);
        }
    }

    fn fit_bounds(&mut self, bounds: Bounds, padding: f64) {
        self.fitted = Some((bounds, padding));
    }
}
