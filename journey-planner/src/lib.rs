//! Builds multi-pin journeys on a map and draws saved ones back as directional routes.
//!
//! The browser bindings live in `js` and only exist when compiling to wasm32. Everything else is
//! plain Rust so it can be exercised natively.

pub mod api;
pub mod browser;
pub mod config;
pub mod error;
pub mod geocode;
pub mod geojson_surface;
pub mod geometry;
pub mod planner;
pub mod render;
pub mod submit;
pub mod wizard;

#[cfg(target_arch = "wasm32")]
mod js;

pub use journey_model::*;

/// Identifies one outstanding request, so a response that arrives after the user moved on can be
/// recognized and dropped.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Ticket(u64);

#[derive(Default)]
pub(crate) struct Tickets {
    next: u64,
}

impl Tickets {
    pub(crate) fn issue(&mut self) -> Ticket {
        self.next += 1;
        Ticket(self.next)
    }
}
