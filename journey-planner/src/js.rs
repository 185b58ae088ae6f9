use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Once;

use chrono::Utc;
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use journey_model::{CategoryId, LatLng, Pin, PinId, RouteId, RouteSummary, CATEGORIES};

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::browser::{Gallery, ShowOutcome, Stop};
use crate::config::PlannerConfig;
use crate::geocode::Geocoder;
use crate::geometry::Bounds;
use crate::planner::Planner;
use crate::render::{LineStyle, MapSurface, MarkerIcon, PreviewHost};
use crate::submit::{CoverImage, JourneyMetadata};
use crate::wizard::{Confirmation, Listing, Step, SubmitOutcome};

static START: Once = Once::new();

#[wasm_bindgen]
extern "C" {
    /// Wraps the page's Leaflet map. Layers are whatever Leaflet objects the adapter returns.
    pub type MapAdapter;

    #[wasm_bindgen(method, js_name = createLayerGroup)]
    fn js_create_layer_group(this: &MapAdapter) -> JsValue;
    #[wasm_bindgen(method, js_name = placePolyline)]
    fn js_place_polyline(this: &MapAdapter, group: &JsValue, latlngs: JsValue, style: JsValue)
        -> JsValue;
    #[wasm_bindgen(method, js_name = placeMarker)]
    fn js_place_marker(this: &MapAdapter, group: &JsValue, lat: f64, lng: f64, icon: JsValue)
        -> JsValue;
    #[wasm_bindgen(method, js_name = addLayer)]
    fn js_add_layer(this: &MapAdapter, layer: &JsValue);
    #[wasm_bindgen(method, js_name = removeLayer)]
    fn js_remove_layer(this: &MapAdapter, layer: &JsValue);
    #[wasm_bindgen(method, js_name = fitBounds)]
    fn js_fit_bounds(this: &MapAdapter, south: f64, west: f64, north: f64, east: f64, padding: f64);

    /// Creates the throwaway single-pin maps shown while confirming a stop.
    pub type PreviewAdapter;

    #[wasm_bindgen(method, js_name = openPreview)]
    fn js_open_preview(this: &PreviewAdapter, lat: f64, lng: f64, zoom: u8) -> JsValue;
    #[wasm_bindgen(method, js_name = closePreview)]
    fn js_close_preview(this: &PreviewAdapter, map: JsValue);
}

impl MapSurface for MapAdapter {
    type Layer = JsValue;

    fn create_layer_group(&mut self) -> JsValue {
        self.js_create_layer_group()
    }

    fn place_polyline(&mut self, group: &JsValue, pts: &[LatLng], style: &LineStyle) -> JsValue {
        let latlngs: Vec<[f64; 2]> = pts.iter().map(|pt| [pt.lat, pt.lng]).collect();
        self.js_place_polyline(group, to_js(&latlngs), to_js(style))
    }

    fn place_marker(&mut self, group: &JsValue, at: LatLng, icon: &MarkerIcon) -> JsValue {
        self.js_place_marker(group, at.lat, at.lng, to_js(&icon.spec()))
    }

    fn add_layer(&mut self, layer: &JsValue) {
        self.js_add_layer(layer);
    }

    fn remove_layer(&mut self, layer: &JsValue) {
        self.js_remove_layer(layer);
    }

    fn fit_bounds(&mut self, bounds: Bounds, padding: f64) {
        self.js_fit_bounds(bounds.south, bounds.west, bounds.north, bounds.east, padding);
    }
}

impl PreviewHost for PreviewAdapter {
    type Map = JsValue;

    fn open_preview(&mut self, center: LatLng, zoom: u8) -> JsValue {
        self.js_open_preview(center.lat, center.lng, zoom)
    }

    fn close_preview(&mut self, map: JsValue) {
        self.js_close_preview(map);
    }
}

type Inner = Rc<RefCell<Planner<MapAdapter, PreviewAdapter>>>;

#[wasm_bindgen]
pub struct JsJourneyPlanner {
    inner: Inner,
    api: ApiClient,
    geocoder: Geocoder,
}

#[wasm_bindgen]
impl JsJourneyPlanner {
    #[wasm_bindgen(constructor)]
    pub fn new(map: Option<MapAdapter>, previews: Option<PreviewAdapter>) -> JsJourneyPlanner {
        START.call_once(|| {
            // Panics shouldn't happen, but if they do, console.log them.
            console_error_panic_hook::set_once();
            if let Err(err) = console_log::init_with_level(log::Level::Info) {
                web_sys::console::log_1(&format!("Logging already set up: {err}").into());
            }
        });
        if map.is_none() {
            log::info!("No map yet; saved routes will be listed as text");
        }

        let config = PlannerConfig::default();
        let api = ApiClient::new(config.api_base_or(page_origin()));
        Self {
            inner: Rc::new(RefCell::new(Planner::new(config, map, previews))),
            api,
            geocoder: Geocoder::default(),
        }
    }

    /// Replaces the configuration. Bad input is logged and ignored.
    #[wasm_bindgen(js_name = setConfig)]
    pub fn set_config(&mut self, input: JsValue) {
        match serde_wasm_bindgen::from_value::<PlannerConfig>(input) {
            Ok(config) => {
                self.api = ApiClient::new(config.api_base_or(page_origin()));
                self.inner.borrow_mut().set_config(config);
            }
            Err(err) => {
                log::error!("Bad input to setConfig: {err}");
            }
        }
    }

    pub fn categories(&self) -> JsValue {
        to_js(&CATEGORIES)
    }

    // Journey wizard

    #[wasm_bindgen(js_name = openWizard)]
    pub fn open_wizard(&self) -> Result<(), JsValue> {
        self.inner.borrow_mut().open_wizard().map_err(err_to_js)
    }

    #[wasm_bindgen(js_name = cancelWizard)]
    pub fn cancel_wizard(&self) -> Result<(), JsValue> {
        self.inner.borrow_mut().cancel_wizard().map_err(err_to_js)
    }

    /// Resolves to true once the pin list is shown, or false if the user moved on meanwhile.
    #[wasm_bindgen(js_name = chooseCategory)]
    pub fn choose_category(&self, category: u32) -> Result<js_sys::Promise, JsValue> {
        let ticket = self
            .inner
            .borrow_mut()
            .choose_category(CategoryId(category))
            .map_err(err_to_js)?;
        let inner = self.inner.clone();
        let api = self.api.clone();
        Ok(future_to_promise(async move {
            let result = api.pins().await;
            let applied = inner.borrow_mut().pins_loaded(ticket, result, Utc::now());
            Ok(JsValue::from_bool(applied))
        }))
    }

    #[wasm_bindgen(js_name = backToCategories)]
    pub fn back_to_categories(&self) -> Result<(), JsValue> {
        self.inner.borrow_mut().back_to_categories().map_err(err_to_js)
    }

    #[wasm_bindgen(js_name = selectPin)]
    pub fn select_pin(&self, id: u32) -> Result<JsValue, JsValue> {
        let pin = self
            .inner
            .borrow_mut()
            .select_pin(PinId(id))
            .map_err(err_to_js)?;
        Ok(to_js(&pin))
    }

    /// Returns `{added, askContinue}`.
    #[wasm_bindgen(js_name = confirmPin)]
    pub fn confirm_pin(&self, yes: bool) -> Result<JsValue, JsValue> {
        let confirmation = self.inner.borrow_mut().confirm_pin(yes).map_err(err_to_js)?;
        let (added, ask_continue) = match confirmation {
            Confirmation::Rejected => (false, false),
            Confirmation::Added { ask_continue } => (true, ask_continue),
        };
        Ok(to_js(&ConfirmView {
            added,
            ask_continue,
        }))
    }

    #[wasm_bindgen(js_name = continueAdding)]
    pub fn continue_adding(&self) -> Result<(), JsValue> {
        self.inner.borrow_mut().continue_adding().map_err(err_to_js)
    }

    #[wasm_bindgen(js_name = stopAdding)]
    pub fn stop_adding(&self) -> Result<(), JsValue> {
        self.inner.borrow_mut().stop_adding().map_err(err_to_js)
    }

    /// Takes the journey form's text fields as a plain object of strings, plus the picked cover
    /// file if any. Rejects immediately if no pins were chosen; otherwise resolves to
    /// `{saved, message}`, reloading the saved routes on success.
    #[wasm_bindgen(js_name = submitJourney)]
    pub fn submit_journey(
        &self,
        form: JsValue,
        cover: Option<web_sys::File>,
    ) -> Result<js_sys::Promise, JsValue> {
        let metadata: JourneyMetadata = serde_wasm_bindgen::from_value(form)?;
        let (ticket, payload) = self
            .inner
            .borrow_mut()
            .begin_submit(metadata)
            .map_err(|err| JsValue::from_str(&err.user_message()))?;
        let inner = self.inner.clone();
        let api = self.api.clone();
        Ok(future_to_promise(async move {
            let result = match read_cover(cover).await {
                Ok(Some(cover)) => api.create_route(&payload.with_cover(cover)).await,
                Ok(None) => api.create_route(&payload).await,
                Err(err) => Err(err),
            };
            let outcome = inner.borrow_mut().submit_finished(ticket, result);
            let view = match outcome {
                Some(SubmitOutcome::Saved) => {
                    reload_routes(&inner, &api).await;
                    SubmitView {
                        saved: true,
                        message: None,
                    }
                }
                Some(SubmitOutcome::Failed(msg)) => SubmitView {
                    saved: false,
                    message: Some(msg),
                },
                None => SubmitView {
                    saved: false,
                    message: None,
                },
            };
            Ok(to_js(&view))
        }))
    }

    /// Everything needed to draw the wizard's current screen.
    #[wasm_bindgen(js_name = wizardView)]
    pub fn wizard_view(&self) -> JsValue {
        let planner = self.inner.borrow();
        let wizard = planner.wizard();
        let mut view = WizardView {
            step: "idle",
            cursor: wizard.cursor(),
            prompt: wizard.prompt(),
            selection: wizard.selection(),
            category: None,
            pins: None,
            no_matches: false,
            loading: false,
            pin: None,
            submitting: false,
            notice: wizard.notice(),
        };
        match wizard.step() {
            Step::Idle => {}
            Step::CategoryBrowse => view.step = "categories",
            Step::PinBrowse { category, listing } => {
                view.step = "pins";
                view.category = Some(*category);
                match listing {
                    Listing::Loading(_) => view.loading = true,
                    Listing::Ready(pins) => {
                        view.pins = Some(pins.as_slice());
                        view.no_matches = pins.is_empty();
                    }
                }
            }
            Step::Confirming { category, pin, .. } => {
                view.step = "confirming";
                view.category = Some(*category);
                view.pin = Some(pin);
            }
            Step::AskContinue => view.step = "askContinue",
            Step::Finalizing { submitting } => {
                view.step = "finalizing";
                view.submitting = submitting.is_some();
            }
        }
        to_js(&view)
    }

    // Saved routes

    /// Resolves once the gallery is (re)loaded. See `routesView`.
    #[wasm_bindgen(js_name = listRoutes)]
    pub fn list_routes(&self) -> js_sys::Promise {
        let inner = self.inner.clone();
        let api = self.api.clone();
        future_to_promise(async move {
            reload_routes(&inner, &api).await;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = routesView)]
    pub fn routes_view(&self) -> JsValue {
        let planner = self.inner.borrow();
        let routes = planner.routes();
        let view = RoutesView {
            entries: routes.entries(),
            loading: matches!(routes.gallery(), Gallery::Loading(_)),
            error: match routes.gallery() {
                Gallery::Failed(msg) => Some(msg.as_str()),
                _ => None,
            },
            displayed: routes.displayed(),
            minimized: routes.is_minimized(),
        };
        to_js(&view)
    }

    /// Resolves to `{kind, points?, stops?, message?}`.
    #[wasm_bindgen(js_name = showRoute)]
    pub fn show_route(&self, id: u32) -> js_sys::Promise {
        let ticket = self.inner.borrow_mut().begin_show_route(RouteId(id));
        let inner = self.inner.clone();
        let api = self.api.clone();
        future_to_promise(async move {
            let result = api.route_pins(RouteId(id)).await;
            let outcome = inner.borrow_mut().route_loaded(ticket, result);
            Ok(to_js(&ShowView::from(outcome)))
        })
    }

    #[wasm_bindgen(js_name = closeRoutes)]
    pub fn close_routes(&self) {
        self.inner.borrow_mut().close_routes();
    }

    #[wasm_bindgen(js_name = restoreRoutes)]
    pub fn restore_routes(&self) {
        self.inner.borrow_mut().restore_routes();
    }

    // Map layers

    /// Draws `[{lat, lng}, ...]` as a journey. False if nothing was drawn.
    #[wasm_bindgen(js_name = drawRoute)]
    pub fn draw_route(&self, latlngs: JsValue) -> Result<bool, JsValue> {
        let pts: Vec<LatLng> = serde_wasm_bindgen::from_value(latlngs)?;
        Ok(self.inner.borrow_mut().draw_route(&pts).is_some())
    }

    #[wasm_bindgen(js_name = clearRoute)]
    pub fn clear_route(&self) -> bool {
        self.inner.borrow_mut().clear_route()
    }

    /// Reloads the pins on the main map, optionally only one category. Resolves to the number
    /// of visible pins, or null if a later refresh superseded this one.
    #[wasm_bindgen(js_name = refreshPins)]
    pub fn refresh_pins(&self, category: Option<u32>) -> js_sys::Promise {
        let ticket = self
            .inner
            .borrow_mut()
            .begin_refresh_pins(category.map(CategoryId));
        let inner = self.inner.clone();
        let api = self.api.clone();
        future_to_promise(async move {
            let result = api.pins().await;
            let count = inner
                .borrow_mut()
                .pins_refreshed(ticket, result, Utc::now())
                .map_err(|err| err_to_js(err.user_message()))?;
            Ok(count.map(|n| JsValue::from_f64(n as f64)).unwrap_or(JsValue::NULL))
        })
    }

    // Geocoding

    /// Resolves to an address string, or null.
    #[wasm_bindgen(js_name = reverseGeocode)]
    pub fn reverse_geocode(&self, lat: f64, lng: f64) -> js_sys::Promise {
        let geocoder = self.geocoder.clone();
        future_to_promise(async move {
            let address = geocoder.reverse(LatLng::new(lat, lng)).await;
            Ok(address.map(JsValue::from).unwrap_or(JsValue::NULL))
        })
    }

    /// Resolves to `{lat, lng}`, or null.
    pub fn geocode(&self, address: String) -> js_sys::Promise {
        let geocoder = self.geocoder.clone();
        future_to_promise(async move {
            let pt = geocoder.forward(&address).await;
            Ok(pt.map(|pt| to_js(&pt)).unwrap_or(JsValue::NULL))
        })
    }
}

async fn read_cover(file: Option<web_sys::File>) -> Result<Option<CoverImage>, ApiError> {
    let Some(file) = file else {
        return Ok(None);
    };
    let buffer = wasm_bindgen_futures::JsFuture::from(file.array_buffer())
        .await
        .map_err(|err| ApiError::Cover(format!("{err:?}")))?;
    Ok(Some(CoverImage {
        file_name: file.name(),
        mime: Some(file.type_())
            .filter(|mime| !mime.is_empty())
            .unwrap_or_else(|| "application/octet-stream".to_string()),
        bytes: js_sys::Uint8Array::new(&buffer).to_vec(),
    }))
}

async fn reload_routes(inner: &Inner, api: &ApiClient) {
    let ticket = inner.borrow_mut().begin_list_routes();
    let result = api.routes().await;
    inner.borrow_mut().routes_loaded(ticket, result);
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WizardView<'a> {
    step: &'static str,
    cursor: usize,
    prompt: String,
    selection: &'a [PinId],
    category: Option<CategoryId>,
    pins: Option<&'a [Pin]>,
    no_matches: bool,
    loading: bool,
    pin: Option<&'a Pin>,
    submitting: bool,
    notice: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmView {
    added: bool,
    ask_continue: bool,
}

#[derive(Serialize)]
struct SubmitView {
    saved: bool,
    message: Option<String>,
}

#[derive(Serialize)]
struct RoutesView<'a> {
    entries: &'a [RouteSummary],
    loading: bool,
    error: Option<&'a str>,
    displayed: Option<RouteId>,
    minimized: bool,
}

#[derive(Serialize)]
struct ShowView {
    kind: &'static str,
    points: Option<usize>,
    stops: Option<Vec<Stop>>,
    message: Option<String>,
}

impl From<ShowOutcome> for ShowView {
    fn from(outcome: ShowOutcome) -> Self {
        let mut view = ShowView {
            kind: "stale",
            points: None,
            stops: None,
            message: None,
        };
        match outcome {
            ShowOutcome::Stale => {}
            ShowOutcome::Empty => view.kind = "empty",
            ShowOutcome::Single => view.kind = "single",
            ShowOutcome::Drawn { points } => {
                view.kind = "drawn";
                view.points = Some(points);
            }
            ShowOutcome::Textual(stops) => {
                view.kind = "textual";
                view.stops = Some(stops);
            }
            ShowOutcome::Failed(msg) => {
                view.kind = "failed";
                view.message = Some(msg);
            }
        }
        view
    }
}

fn page_origin() -> Option<String> {
    web_sys::window()?.location().origin().ok()
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> JsValue {
    // Plain objects, not Maps, so the page can use them directly
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    match value.serialize(&serializer) {
        Ok(js) => js,
        Err(err) => {
            log::error!("Couldn't convert to JS: {err}");
            JsValue::NULL
        }
    }
}

fn err_to_js<E: std::fmt::Display>(err: E) -> JsValue {
    JsValue::from_str(&err.to_string())
}
