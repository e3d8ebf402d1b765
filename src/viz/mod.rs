//! Map visualisation of monthly energy per turbine.
//!
//! Joins the monthly energy summary with turbine positions and renders a
//! scatter-style geographic plot where marker size and color both encode
//! energy. The output is one standalone HTML document; the only external
//! reference is the plotly.js script tag the chart embeds.

use serde_json::json;
use thiserror::Error;
use tracing::warn;

use crate::source::{TurbineId, TurbineMetadata};
use crate::summary::MonthlyEnergy;

/// Template wrapping the plotly figure in a standalone document.
const MAP_TEMPLATE: &str = include_str!("map.html.tera");

/// Marker diameter, in pixels, given to the turbine with the highest energy.
const MAX_MARKER_SIZE_PX: f64 = 20.0;

/// Fixed map zoom level, sized for a single wind farm.
const MAP_ZOOM: u32 = 12;

/// Errors that can occur while rendering the map document.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The HTML template failed to render.
    #[error("template rendering failed: {0}")]
    Template(#[from] tera::Error),

    /// The figure could not be serialized to JSON.
    #[error("figure serialization failed: {0}")]
    Figure(#[from] serde_json::Error),
}

/// One joined row of the map: a turbine with both a position and an energy
/// value for the month.
#[derive(Debug, Clone, PartialEq)]
struct MapRow {
    turbine_id: TurbineId,
    latitude: f64,
    longitude: f64,
    energy_kwh: f64,
}

/// Render the monthly energy map as a standalone HTML document.
///
/// Performs an inner join between `energy` and `metadata` on turbine id;
/// turbines present on only one side are dropped from the output without
/// failing the render. The document's first bytes are `<html>`.
pub fn render(energy: &MonthlyEnergy, metadata: &TurbineMetadata) -> Result<String, RenderError> {
    let rows = join(energy, metadata);
    let figure = scatter_map_figure(&rows);

    let mut context = tera::Context::new();
    context.insert("title", "Monthly energy by turbine");
    context.insert("figure", &serde_json::to_string(&figure)?);

    let html = tera::Tera::one_off(MAP_TEMPLATE, &context, false)?;
    Ok(html)
}

/// Inner join of energy and metadata on turbine id. Unmatched turbines on
/// either side are dropped; the drop is counted and logged, never an error.
fn join(energy: &MonthlyEnergy, metadata: &TurbineMetadata) -> Vec<MapRow> {
    let mut rows = Vec::with_capacity(energy.len());
    let mut without_position = 0usize;

    for (turbine_id, energy_kwh) in energy {
        match metadata.get(turbine_id) {
            Some(position) => rows.push(MapRow {
                turbine_id: *turbine_id,
                latitude: position.latitude,
                longitude: position.longitude,
                energy_kwh: *energy_kwh,
            }),
            None => without_position += 1,
        }
    }

    let without_energy = metadata
        .keys()
        .filter(|turbine_id| !energy.contains_key(turbine_id))
        .count();

    if without_position > 0 || without_energy > 0 {
        warn!(
            without_position,
            without_energy, "dropping turbines missing from one side of the energy/metadata join"
        );
    }

    rows
}

/// Build the plotly `scattermapbox` figure for the joined rows.
fn scatter_map_figure(rows: &[MapRow]) -> serde_json::Value {
    let lat: Vec<f64> = rows.iter().map(|row| row.latitude).collect();
    let lon: Vec<f64> = rows.iter().map(|row| row.longitude).collect();
    let text: Vec<String> = rows.iter().map(|row| row.turbine_id.to_string()).collect();
    let energy: Vec<f64> = rows.iter().map(|row| row.energy_kwh).collect();

    let max_energy = energy.iter().copied().fold(0.0_f64, f64::max);
    // plotly area scaling: marker area proportional to the value
    let sizeref = if max_energy > 0.0 {
        2.0 * max_energy / (MAX_MARKER_SIZE_PX * MAX_MARKER_SIZE_PX)
    } else {
        1.0
    };

    json!({
        "data": [{
            "type": "scattermapbox",
            "mode": "markers",
            "lat": lat,
            "lon": lon,
            "text": text,
            "hoverinfo": "text",
            "marker": {
                "size": energy,
                "sizemode": "area",
                "sizeref": sizeref,
                "sizemin": 3,
                "color": energy,
                "colorscale": "Viridis",
                "showscale": true,
                "colorbar": {"title": "Energy (kWh)"}
            }
        }],
        "layout": {
            "mapbox": {
                "style": "open-street-map",
                "zoom": MAP_ZOOM,
                "center": {"lat": mean(&lat), "lon": mean(&lon)}
            },
            "margin": {"l": 0, "r": 0, "t": 0, "b": 0}
        }
    })
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Coordinates;

    fn metadata_with(entries: &[(TurbineId, f64, f64)]) -> TurbineMetadata {
        entries
            .iter()
            .map(|(id, latitude, longitude)| {
                (
                    *id,
                    Coordinates {
                        latitude: *latitude,
                        longitude: *longitude,
                    },
                )
            })
            .collect()
    }

    fn energy_with(entries: &[(TurbineId, f64)]) -> MonthlyEnergy {
        entries.iter().copied().collect()
    }

    #[test]
    fn test_render_produces_standalone_html() {
        let energy = energy_with(&[(1, 1000.0 / 6.0)]);
        let metadata = metadata_with(&[(1, 55.902502, -2.306389)]);

        let html = render(&energy, &metadata).expect("should render");
        assert!(html.starts_with("<html>"));
        assert!(html.contains("scattermapbox"));
        assert!(html.contains("55.902502"));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn test_join_is_inner_on_turbine_id() {
        // turbine 2 has no position, turbine 3 has no energy
        let energy = energy_with(&[(1, 100.0), (2, 50.0)]);
        let metadata = metadata_with(&[(1, 55.9, -2.3), (3, 55.8, -2.4)]);

        let rows = join(&energy, &metadata);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].turbine_id, 1);
    }

    #[test]
    fn test_render_drops_unmatched_turbines_without_error() {
        let energy = energy_with(&[(1, 100.0), (2, 50.0)]);
        let metadata = metadata_with(&[(1, 55.9, -2.3), (3, 55.8, -2.4)]);

        let html = render(&energy, &metadata).expect("mismatch must not fail the render");
        // only the joined turbine's position appears
        assert!(html.contains("55.9"));
        assert!(!html.contains("55.8"));
    }

    #[test]
    fn test_render_with_empty_inputs() {
        let html = render(&MonthlyEnergy::new(), &TurbineMetadata::new())
            .expect("empty inputs must not fail");
        assert!(html.starts_with("<html>"));
    }

    #[test]
    fn test_figure_encodes_energy_as_size_and_color() {
        let rows = vec![
            MapRow {
                turbine_id: 1,
                latitude: 55.9,
                longitude: -2.3,
                energy_kwh: 100.0,
            },
            MapRow {
                turbine_id: 2,
                latitude: 55.8,
                longitude: -2.4,
                energy_kwh: 400.0,
            },
        ];
        let figure = scatter_map_figure(&rows);
        let marker = &figure["data"][0]["marker"];
        assert_eq!(marker["size"], marker["color"]);
        assert_eq!(marker["sizemode"], "area");
        assert_eq!(figure["data"][0]["text"][1], "2");
        assert_eq!(figure["layout"]["mapbox"]["style"], "open-street-map");
    }

    #[test]
    fn test_figure_centers_on_mean_position() {
        let rows = vec![
            MapRow {
                turbine_id: 1,
                latitude: 10.0,
                longitude: 20.0,
                energy_kwh: 1.0,
            },
            MapRow {
                turbine_id: 2,
                latitude: 30.0,
                longitude: 40.0,
                energy_kwh: 2.0,
            },
        ];
        let figure = scatter_map_figure(&rows);
        assert_eq!(figure["layout"]["mapbox"]["center"]["lat"], 20.0);
        assert_eq!(figure["layout"]["mapbox"]["center"]["lon"], 30.0);
    }
}
