use anyhow::{bail, Result};
use clap::Parser;
use log::info;

use journey_model::Pin;
use journey_planner::geojson_surface::GeoJsonSurface;
use journey_planner::render::{RouteRenderer, RouteStyle};

/// Draws a saved journey the way the map page does, as GeoJSON.
#[derive(Parser)]
struct Args {
    /// Path to the JSON array returned by `GET /api/routes/{id}/pins`
    #[arg(long)]
    input: String,

    /// Output file to write
    #[arg(long, default_value = "journey.geojson")]
    output: String,

    /// Don't place numbered badges on the stops
    #[arg(long)]
    no_numbers: bool,
}

fn main() -> Result<()> {
    simple_logger::init_with_level(log::Level::Info)?;
    let args = Args::parse();

    let pins: Vec<Pin> = serde_json::from_str(&std::fs::read_to_string(&args.input)?)?;
    let pts: Vec<_> = pins.iter().map(Pin::position).collect();

    let style = RouteStyle {
        show_numbers: !args.no_numbers,
        ..Default::default()
    };
    let mut surface = GeoJsonSurface::default();
    let mut renderer = RouteRenderer::new();
    if renderer.render(&mut surface, &pts, &style).is_none() {
        bail!("{} has {} pins; a journey needs at least 2", args.input, pins.len());
    }

    std::fs::write(&args.output, surface.to_geojson_string()?)?;
    info!("Wrote {}", args.output);
    Ok(())
}
