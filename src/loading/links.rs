//! Scored street link ingestion.
//!
//! Links come as CSV rows with WKT geometry and optional per-component
//! score columns. Component availability is decided once from the header;
//! malformed rows are skipped with a warning, never fatal.

use std::fs::File;
use std::path::Path;
use std::str::FromStr;

use geo::{Coord, LineString};
use log::warn;
use serde::Deserialize;

use crate::model::projection::Projection;
use crate::model::scoring::RawComponents;
use crate::model::season::Component;
use crate::{Error, LinkId, NodeId};

#[derive(Debug, Deserialize)]
struct LinkRecord {
    start_node_id: NodeId,
    end_node_id: NodeId,
    link_id: LinkId,
    link_len_m: f64,
    geometry_wkt: String,
    #[serde(default)]
    flower_score: Option<f64>,
    #[serde(default)]
    shade_score: Option<f64>,
    #[serde(default)]
    maple_score: Option<f64>,
    #[serde(default)]
    wind_score: Option<f64>,
    #[serde(default)]
    shelter_score: Option<f64>,
    #[serde(default)]
    streetfood_score: Option<f64>,
    #[serde(default)]
    tour_score: Option<f64>,
}

/// One usable link row, geometry already in projected coordinates.
pub(crate) struct ScoredLink {
    pub u: NodeId,
    pub v: NodeId,
    pub link_id: LinkId,
    pub length_m: f64,
    pub raw: RawComponents,
    pub geometry: LineString<f64>,
}

/// Read and project all usable link rows, and report which score components
/// the file carries (from the header, not from row contents).
pub(crate) fn read_links(
    path: &Path,
    projection: &dyn Projection,
) -> Result<(Vec<ScoredLink>, Vec<Component>), Error> {
    let file = File::open(path).map_err(|e| {
        std::io::Error::new(
            e.kind(),
            format!("failed to open links file '{}': {e}", path.display()),
        )
    })?;
    let mut reader = csv::Reader::from_reader(file);

    let headers = reader.headers()?.clone();
    let available: Vec<Component> = Component::ALL
        .iter()
        .copied()
        .filter(|c| c.column().is_some_and(|col| headers.iter().any(|h| h == col)))
        .collect();

    let mut links = Vec::new();
    for (line, row) in reader.deserialize::<LinkRecord>().enumerate() {
        let record = match row {
            Ok(r) => r,
            Err(e) => {
                warn!("skipping malformed link row {}: {e}", line + 2);
                continue;
            }
        };
        match scored_link(&record, projection) {
            Ok(link) => links.push(link),
            Err(e) => warn!("skipping link {}: {e}", record.link_id),
        }
    }
    Ok((links, available))
}

fn scored_link(record: &LinkRecord, projection: &dyn Projection) -> Result<ScoredLink, Error> {
    if !(record.link_len_m > 0.0) || !record.link_len_m.is_finite() {
        return Err(Error::InvalidData(format!(
            "non-positive length {}",
            record.link_len_m
        )));
    }
    let geometry = parse_linestring(&record.geometry_wkt, projection)?;
    Ok(ScoredLink {
        u: record.start_node_id,
        v: record.end_node_id,
        link_id: record.link_id,
        length_m: record.link_len_m,
        raw: RawComponents {
            flower: record.flower_score,
            shade: record.shade_score,
            maple: record.maple_score,
            wind: record.wind_score,
            cool_shelter: record.shelter_score,
            streetfood: record.streetfood_score,
            tour: record.tour_score,
        },
        geometry,
    })
}

/// Parse a WKT `LINESTRING` of geographic (lon, lat) coordinates and project
/// it onto the metric plane.
fn parse_linestring(s: &str, projection: &dyn Projection) -> Result<LineString<f64>, Error> {
    let parsed = wkt::Wkt::<f64>::from_str(s).map_err(|e| Error::GeometryParse(e.to_string()))?;
    let geometry: geo::Geometry<f64> = parsed
        .try_into()
        .map_err(|e| Error::GeometryParse(format!("{e:?}")))?;
    let geo::Geometry::LineString(line) = geometry else {
        return Err(Error::GeometryParse("expected a LINESTRING".into()));
    };
    if line.0.len() < 2 {
        return Err(Error::GeometryParse("linestring with fewer than 2 points".into()));
    }
    Ok(LineString::new(
        line.0
            .iter()
            .map(|c| projection.project(c.x, c.y))
            .collect::<Vec<Coord<f64>>>(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::projection::LocalTangentPlane;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_links_and_reports_available_components() {
        let file = write_csv(
            "start_node_id,end_node_id,link_id,link_len_m,geometry_wkt,flower_score,tour_score\n\
             1,2,100,120.5,\"LINESTRING(126.98 37.57, 126.981 37.57)\",0.8,0.3\n",
        );
        let proj = LocalTangentPlane::new(126.98, 37.57);
        let (links, available) = read_links(file.path(), &proj).unwrap();

        assert_eq!(links.len(), 1);
        assert_eq!(links[0].link_id, 100);
        assert_eq!(links[0].raw.flower, Some(0.8));
        assert_eq!(links[0].raw.shade, None);
        assert_eq!(available, vec![Component::Flower, Component::Tour]);
        // first vertex is the projection origin
        assert!(links[0].geometry.0[0].x.abs() < 1e-9);
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let file = write_csv(
            "start_node_id,end_node_id,link_id,link_len_m,geometry_wkt\n\
             1,2,100,120.5,\"LINESTRING(126.98 37.57, 126.981 37.57)\"\n\
             x,2,101,50.0,\"LINESTRING(126.98 37.57, 126.982 37.57)\"\n\
             2,3,102,-4.0,\"LINESTRING(126.981 37.57, 126.982 37.57)\"\n\
             2,3,103,60.0,\"not wkt at all\"\n",
        );
        let proj = LocalTangentPlane::new(126.98, 37.57);
        let (links, _) = read_links(file.path(), &proj).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].link_id, 100);
    }

    #[test]
    fn point_wkt_is_rejected() {
        let proj = LocalTangentPlane::new(0.0, 0.0);
        assert!(matches!(
            parse_linestring("POINT(1 1)", &proj),
            Err(Error::GeometryParse(_))
        ));
    }
}
