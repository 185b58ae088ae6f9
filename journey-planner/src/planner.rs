use chrono::{DateTime, Utc};
use log::info;

use journey_model::{CategoryId, LatLng, Pin, PinId, RouteId, RouteSummary};

use crate::browser::{SavedRoutes, ShowOutcome};
use crate::config::PlannerConfig;
use crate::error::{ApiError, WizardError};
use crate::render::{MapSurface, PinLayer, PreviewHost, PreviewSlot, RouteHandle, RouteRenderer};
use crate::submit::{JourneyMetadata, JourneyPayload};
use crate::wizard::{Confirmation, SubmitOutcome, TitleOrder, Wizard};
use crate::{Ticket, Tickets};

/// Everything one map page needs: the journey wizard, the saved-routes gallery, and the layers
/// they draw. The map and preview host are optional, since the page may not have created them.
///
/// Fetching is up to the caller. Methods that need data hand out a `Ticket`, and the matching
/// `*_loaded` / `*_finished` method applies the response, ignoring it if it arrives too late.
pub struct Planner<S: MapSurface, H: PreviewHost> {
    config: PlannerConfig,
    wizard: Wizard,
    routes: SavedRoutes,
    map: Option<S>,
    previews: Option<H>,
    preview: PreviewSlot<H::Map>,
    route: RouteRenderer<S::Layer>,
    pins: PinLayer<S::Layer>,
    pending_pins: Option<(Ticket, Option<CategoryId>)>,
    tickets: Tickets,
}

impl<S: MapSurface, H: PreviewHost> Planner<S, H> {
    pub fn new(config: PlannerConfig, map: Option<S>, previews: Option<H>) -> Self {
        let wizard = Wizard::new(
            TitleOrder::new(&config.sort_locale),
            config.hide_expired_in_wizard,
        );
        Self {
            config,
            wizard,
            routes: SavedRoutes::default(),
            map,
            previews,
            preview: PreviewSlot::default(),
            route: RouteRenderer::new(),
            pins: PinLayer::default(),
            pending_pins: None,
            tickets: Tickets::default(),
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: PlannerConfig) {
        if config.sort_locale != self.config.sort_locale {
            self.wizard.set_order(TitleOrder::new(&config.sort_locale));
        }
        self.wizard.set_hide_expired(config.hide_expired_in_wizard);
        self.config = config;
    }

    pub fn wizard(&self) -> &Wizard {
        &self.wizard
    }

    pub fn routes(&self) -> &SavedRoutes {
        &self.routes
    }

    pub fn map(&self) -> Option<&S> {
        self.map.as_ref()
    }

    pub fn previews(&self) -> Option<&H> {
        self.previews.as_ref()
    }

    pub fn previewing(&self) -> Option<PinId> {
        self.preview.showing()
    }

    // Journey wizard

    pub fn open_wizard(&mut self) -> Result<(), WizardError> {
        self.wizard.open()?;
        self.close_preview();
        Ok(())
    }

    pub fn cancel_wizard(&mut self) -> Result<(), WizardError> {
        self.wizard.cancel()?;
        self.close_preview();
        Ok(())
    }

    pub fn choose_category(&mut self, category: CategoryId) -> Result<Ticket, WizardError> {
        self.wizard.choose_category(category)
    }

    pub fn back_to_categories(&mut self) -> Result<(), WizardError> {
        self.wizard.back_to_categories()
    }

    pub fn pins_loaded(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<Pin>, ApiError>,
        now: DateTime<Utc>,
    ) -> bool {
        self.wizard.pins_loaded(ticket, result, now)
    }

    /// Asks about one pin, with a small map of where it is.
    pub fn select_pin(&mut self, id: PinId) -> Result<Pin, WizardError> {
        let pin = self.wizard.select_pin(id)?;
        if let Some(host) = self.previews.as_mut() {
            self.preview.show(host, &pin, self.config.preview_zoom);
        }
        Ok(pin)
    }

    pub fn confirm_pin(&mut self, yes: bool) -> Result<Confirmation, WizardError> {
        let confirmation = self.wizard.confirm(yes)?;
        self.close_preview();
        Ok(confirmation)
    }

    pub fn continue_adding(&mut self) -> Result<(), WizardError> {
        self.wizard.continue_adding()
    }

    pub fn stop_adding(&mut self) -> Result<(), WizardError> {
        self.wizard.stop_adding()
    }

    pub fn begin_submit(
        &mut self,
        metadata: JourneyMetadata,
    ) -> Result<(Ticket, JourneyPayload), WizardError> {
        self.wizard.begin_submit(metadata)
    }

    /// After `SubmitOutcome::Saved`, the caller should reload the saved-routes gallery.
    pub fn submit_finished(
        &mut self,
        ticket: Ticket,
        result: Result<(), ApiError>,
    ) -> Option<SubmitOutcome> {
        self.wizard.submit_finished(ticket, result)
    }

    fn close_preview(&mut self) {
        if let Some(host) = self.previews.as_mut() {
            self.preview.close(host);
        }
    }

    // Saved routes

    pub fn begin_list_routes(&mut self) -> Ticket {
        self.routes.begin_list()
    }

    pub fn routes_loaded(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<RouteSummary>, ApiError>,
    ) -> bool {
        self.routes.list_loaded(ticket, result)
    }

    pub fn begin_show_route(&mut self, id: RouteId) -> Ticket {
        self.routes.begin_show(id)
    }

    pub fn route_loaded(&mut self, ticket: Ticket, result: Result<Vec<Pin>, ApiError>) -> ShowOutcome {
        self.routes.show_loaded(
            ticket,
            result,
            self.map.as_mut(),
            &mut self.route,
            &self.config.route_style,
            self.config.fit_padding,
        )
    }

    pub fn close_routes(&mut self) {
        self.routes.close(self.map.as_mut(), &mut self.route);
    }

    pub fn restore_routes(&mut self) {
        self.routes.restore();
    }

    // Direct drawing

    /// Draws any sequence of points as a journey, replacing the current one.
    pub fn draw_route(&mut self, pts: &[LatLng]) -> Option<RouteHandle> {
        let map = self.map.as_mut()?;
        self.route.render(map, pts, &self.config.route_style)
    }

    pub fn clear_route(&mut self) -> bool {
        match self.map.as_mut() {
            Some(map) => self.route.clear(map),
            None => false,
        }
    }

    pub fn active_route(&self) -> Option<RouteHandle> {
        self.route.active().map(|r| r.handle)
    }

    /// Starts reloading the main map's pins. Only the latest refresh gets drawn.
    pub fn begin_refresh_pins(&mut self, only: Option<CategoryId>) -> Ticket {
        let ticket = self.tickets.issue();
        self.pending_pins = Some((ticket, only));
        ticket
    }

    /// Ok(None) means a newer refresh was started meanwhile, and nothing changed.
    pub fn pins_refreshed(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<Pin>, ApiError>,
        now: DateTime<Utc>,
    ) -> Result<Option<usize>, ApiError> {
        let only = match self.pending_pins {
            Some((pending, only)) if pending == ticket => only,
            _ => {
                info!("Discarding stale pin refresh {ticket:?}");
                return Ok(None);
            }
        };
        self.pending_pins = None;
        let pins = result?;
        Ok(Some(self.show_pins(&pins, now, only)))
    }

    /// Refreshes the pins on the main map. Returns how many are visible.
    pub fn show_pins(&mut self, pins: &[Pin], now: DateTime<Utc>, only: Option<CategoryId>) -> usize {
        match self.map.as_mut() {
            Some(map) => self.pins.show(map, pins, now, only),
            None => 0,
        }
    }
}
