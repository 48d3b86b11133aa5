//! Route line extraction from the routing collaborator's response.

use serde_json::Value;

use crate::events::Coordinates;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("select start and end buildings")]
    MissingSelection,
    #[error("route has {0} stop(s) with coordinates; at least 2 are needed to draw it")]
    InsufficientCoordinates(usize),
}

/// Coordinates of every stop that carries them, in path order.
///
/// Stops without coordinates are skipped; the line needs at least two.
pub fn route_polyline(path: &[Value]) -> Result<Vec<Coordinates>, RouteError> {
    let mut points = Vec::with_capacity(path.len());
    for stop in path {
        match Coordinates::from_record(stop) {
            Some(at) => points.push(at),
            None => tracing::warn!(stop = %stop, "route stop has no coordinates; skipped"),
        }
    }
    if points.len() < 2 {
        return Err(RouteError::InsufficientCoordinates(points.len()));
    }
    Ok(points)
}
