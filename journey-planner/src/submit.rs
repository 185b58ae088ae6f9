use std::collections::BTreeMap;

use serde::Deserialize;

use journey_model::{PinId, RoutePinOrder};

use crate::error::ApiError;

/// The journey form fields besides the pins. Only the name is interpreted here; everything else
/// (cover image, notes, ...) is passed through as-is.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct JourneyMetadata {
    pub name: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl JourneyMetadata {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extra: BTreeMap::new(),
        }
    }
}

/// The multipart field holding the cover image.
pub const COVER_FIELD: &str = "image";

/// An image file picked in the journey form.
#[derive(Clone, Debug, PartialEq)]
pub struct CoverImage {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct JourneyPayload {
    pub route_pins: Vec<RoutePinOrder>,
    pub metadata: JourneyMetadata,
    pub cover: Option<CoverImage>,
}

impl JourneyPayload {
    pub fn new(selection: &[PinId], metadata: JourneyMetadata) -> Self {
        Self {
            route_pins: route_pin_orders(selection),
            metadata,
            cover: None,
        }
    }

    pub fn with_cover(mut self, cover: CoverImage) -> Self {
        self.cover = Some(cover);
        self
    }

    /// The text fields of `POST /api/routes`. The cover image, if any, is sent separately.
    pub fn form_fields(&self) -> Result<Vec<(String, String)>, serde_json::Error> {
        let mut fields = vec![("name".to_string(), self.metadata.name.clone())];
        for (key, value) in &self.metadata.extra {
            if key != "name" && key != "route_pins" && key != COVER_FIELD {
                fields.push((key.clone(), value.clone()));
            }
        }
        fields.push((
            "route_pins".to_string(),
            serde_json::to_string(&self.route_pins)?,
        ));
        Ok(fields)
    }
}

/// Order is the 0-based position in the selection, whatever ordinal the user saw.
pub fn route_pin_orders(selection: &[PinId]) -> Vec<RoutePinOrder> {
    selection
        .iter()
        .enumerate()
        .map(|(order, pin_id)| RoutePinOrder {
            pin_id: *pin_id,
            order,
        })
        .collect()
}

#[derive(Deserialize, Debug)]
pub struct CreateRouteResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl CreateRouteResponse {
    pub fn into_result(self) -> Result<(), ApiError> {
        if self.success {
            Ok(())
        } else {
            Err(ApiError::Rejected(self.error.filter(|e| !e.is_empty())))
        }
    }
}
