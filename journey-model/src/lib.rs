use chrono::{DateTime, NaiveDateTime, Utc};
use geo::Coord;
use serde::{Deserialize, Deserializer, Serialize};

/// A WGS84 position. Latitude is the vertical axis, longitude the horizontal one.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl From<LatLng> for Coord {
    fn from(pt: LatLng) -> Coord {
        Coord {
            x: pt.lng,
            y: pt.lat,
        }
    }
}

impl From<Coord> for LatLng {
    fn from(c: Coord) -> LatLng {
        LatLng { lat: c.y, lng: c.x }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[serde(transparent)]
pub struct PinId(pub u32);
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[serde(transparent)]
pub struct RouteId(pub u32);
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[serde(transparent)]
pub struct CategoryId(pub u32);

/// A pin as returned by `GET /api/pins` and `GET /api/routes/{id}/pins`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Pin {
    pub id: PinId,
    pub lat: f64,
    pub lng: f64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: CategoryId,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub caution: Option<String>,
    #[serde(default, deserialize_with = "deserialize_expiry")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Pin {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }

    /// Expired pins stay on the server, but aren't shown.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires) => expires >= now,
            None => true,
        }
    }
}

// The server sometimes sends naive timestamps; treat those as UTC. Anything unparseable means the
// pin never expires.
fn deserialize_expiry<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
    let raw: Option<String> = Option::deserialize(d)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    None
}

/// One entry of `GET /api/routes`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RouteSummary {
    pub id: RouteId,
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// One element of the `route_pins` field of `POST /api/routes`.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub struct RoutePinOrder {
    pub pin_id: PinId,
    pub order: usize,
}

#[derive(Serialize, Clone, Copy, Debug)]
pub struct Category {
    pub id: CategoryId,
    pub name: &'static str,
    pub icon: &'static str,
}

const FALLBACK_ICON: &str = "📦";

pub const CATEGORIES: [Category; 12] = [
    category(1, "食べる", "🍽️"),
    category(2, "見る", "👁️"),
    category(3, "遊ぶ", "🎮"),
    category(4, "学ぶ", "📚"),
    category(5, "体験する", "🎯"),
    category(6, "探索する", "🔍"),
    category(7, "休憩する", "🛋️"),
    category(8, "泊まる", "🏨"),
    category(9, "フォトスポット", "📸"),
    category(10, "イベント", "🎪"),
    category(11, "注意！", "⚠️"),
    category(12, "その他", FALLBACK_ICON),
];

const fn category(id: u32, name: &'static str, icon: &'static str) -> Category {
    Category {
        id: CategoryId(id),
        name,
        icon,
    }
}

impl Category {
    pub fn lookup(id: CategoryId) -> Option<&'static Category> {
        CATEGORIES.iter().find(|c| c.id == id)
    }

    pub fn by_name(name: &str) -> Option<&'static Category> {
        CATEGORIES.iter().find(|c| c.name == name)
    }

    /// The display glyph for a category, falling back to the "other" box.
    pub fn icon_for(id: CategoryId) -> &'static str {
        Self::lookup(id).map(|c| c.icon).unwrap_or(FALLBACK_ICON)
    }
}
