use log::{info, warn};
use serde::Serialize;

use journey_model::{Pin, RouteId, RouteSummary};

use crate::error::{ApiError, ROUTES_FETCH_FAILED};
use crate::geometry::Bounds;
use crate::render::{MapSurface, RouteRenderer, RouteStyle};
use crate::{Ticket, Tickets};

#[derive(Clone, Debug, Default, PartialEq)]
pub enum Gallery {
    #[default]
    Empty,
    Loading(Ticket),
    Ready,
    Failed(String),
}

/// A stop listed as text when there's no map to draw on.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Stop {
    pub title: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ShowOutcome {
    /// The response belonged to a request that's no longer wanted
    Stale,
    /// The route has no pins; nothing changed
    Empty,
    Drawn { points: usize },
    /// Only one pin. The map is centered on it, and no line is drawn.
    Single,
    Textual(Vec<Stop>),
    Failed(String),
}

/// The gallery of saved journeys, plus whichever one is drawn on the map.
#[derive(Default)]
pub struct SavedRoutes {
    entries: Vec<RouteSummary>,
    gallery: Gallery,
    pending_show: Option<(RouteId, Ticket)>,
    displayed: Option<RouteId>,
    minimized: bool,
    tickets: Tickets,
}

impl SavedRoutes {
    pub fn entries(&self) -> &[RouteSummary] {
        &self.entries
    }

    pub fn gallery(&self) -> &Gallery {
        &self.gallery
    }

    pub fn displayed(&self) -> Option<RouteId> {
        self.displayed
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    /// Starts (re)loading the list of saved journeys.
    pub fn begin_list(&mut self) -> Ticket {
        let ticket = self.tickets.issue();
        self.gallery = Gallery::Loading(ticket);
        ticket
    }

    /// On failure the old entries stay. Returns false for stale responses.
    pub fn list_loaded(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<RouteSummary>, ApiError>,
    ) -> bool {
        if self.gallery != Gallery::Loading(ticket) {
            info!("Discarding stale route list {ticket:?}");
            return false;
        }
        match result {
            Ok(entries) => {
                self.entries = entries;
                self.gallery = Gallery::Ready;
            }
            Err(err) => {
                warn!("Loading saved routes failed: {err}");
                self.gallery = Gallery::Failed(ROUTES_FETCH_FAILED.to_string());
            }
        }
        true
    }

    pub fn begin_show(&mut self, id: RouteId) -> Ticket {
        let ticket = self.tickets.issue();
        self.pending_show = Some((id, ticket));
        ticket
    }

    /// Draws a fetched route, replacing whatever route was drawn before. Without a map, the stops
    /// are returned as text instead.
    pub fn show_loaded<S: MapSurface>(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<Pin>, ApiError>,
        map: Option<&mut S>,
        renderer: &mut RouteRenderer<S::Layer>,
        style: &RouteStyle,
        padding: f64,
    ) -> ShowOutcome {
        let Some((id, pending)) = self.pending_show else {
            return ShowOutcome::Stale;
        };
        if pending != ticket {
            info!("Discarding stale route {id:?} {ticket:?}");
            return ShowOutcome::Stale;
        }
        self.pending_show = None;

        let pins = match result {
            Ok(pins) => pins,
            Err(err) => {
                warn!("Loading route {id:?} failed: {err}");
                return ShowOutcome::Failed(err.user_message());
            }
        };
        if pins.is_empty() {
            return ShowOutcome::Empty;
        }

        let Some(surface) = map else {
            return ShowOutcome::Textual(
                pins.into_iter()
                    .map(|p| Stop {
                        title: p.title,
                        description: p.description,
                    })
                    .collect(),
            );
        };

        let pts: Vec<_> = pins.iter().map(Pin::position).collect();
        renderer.clear(surface);
        let drawn = renderer.render(surface, &pts, style).is_some();
        if let Some(bounds) = Bounds::from_points(&pts) {
            surface.fit_bounds(bounds, padding);
        }
        if !drawn {
            // The previous route was cleared above
            self.displayed = None;
            return ShowOutcome::Single;
        }
        self.displayed = Some(id);
        self.minimized = true;
        ShowOutcome::Drawn { points: pts.len() }
    }

    /// Stops viewing routes entirely.
    pub fn close<S: MapSurface>(
        &mut self,
        map: Option<&mut S>,
        renderer: &mut RouteRenderer<S::Layer>,
    ) {
        if let Some(surface) = map {
            renderer.clear(surface);
        }
        self.pending_show = None;
        self.displayed = None;
        self.minimized = false;
    }

    pub fn minimize(&mut self) {
        self.minimized = true;
    }

    pub fn restore(&mut self) {
        self.minimized = false;
    }
}
