//! Run pipeline: polygon → parcels → batch aggregation → export file.

use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use parcelscope_batch::{BatchRequest, BatchRunner};
use parcelscope_core::{LatLng, ParcelResult, Polygon, PolygonDraft};
use parcelscope_export::{ExportLayout, write_export};
use parcelscope_registry::ParcelLocator;

pub struct RunStats {
    pub parcels: usize,
    pub done: usize,
    pub failed: usize,
    pub rows_written: usize,
    pub elapsed_secs: f64,
}

pub struct RunOutcome {
    pub stats: RunStats,
    pub results: Vec<ParcelResult>,
}

/// Load a polygon from a JSON vertex list (`[{"lat": .., "lng": ..}, ...]`).
pub fn load_polygon(path: &Path) -> anyhow::Result<Polygon> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading polygon {}", path.display()))?;
    let vertices: Vec<LatLng> = serde_json::from_str(&text)
        .with_context(|| format!("parsing polygon {}", path.display()))?;

    let mut draft = PolygonDraft::start();
    for vertex in vertices {
        draft.push(vertex);
    }
    draft
        .close()
        .with_context(|| format!("closing polygon {}", path.display()))
}

/// Run the full pipeline: locate parcels → aggregate each one → write the export.
pub async fn run_pipeline(
    locator: &ParcelLocator,
    runner: &BatchRunner,
    polygon: &Polygon,
    request: &BatchRequest,
    layout: &ExportLayout,
    out: &Path,
) -> anyhow::Result<RunOutcome> {
    let start = Instant::now();

    // 1. Resolve parcels. A failed query is an error, not an empty area.
    let parcels = locator
        .locate(polygon.vertices())
        .await
        .context("querying geometry service")?;
    eprintln!("  Found {} parcels in polygon", parcels.len());

    // 2. Aggregate, strictly one parcel at a time.
    let summary = runner
        .run_to_end(parcels, request, |progress| {
            eprint!(
                "\r  Processed {}/{} ({}%)",
                progress.completed, progress.total, progress.percent
            );
        })
        .await;
    if !summary.results.is_empty() {
        eprintln!();
    }

    // 3. Export.
    let rows_written = write_export(out, layout, &summary.results)
        .with_context(|| format!("writing export {}", out.display()))?;

    Ok(RunOutcome {
        stats: RunStats {
            parcels: summary.results.len(),
            done: summary.done,
            failed: summary.failed,
            rows_written,
            elapsed_secs: start.elapsed().as_secs_f64(),
        },
        results: summary.results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn loads_vertex_list() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "area.json",
            r#"[{"lat": 37.36, "lng": 127.10}, {"lat": 37.37, "lng": 127.11}, {"lat": 37.365, "lng": 127.12}]"#,
        );
        let polygon = load_polygon(&path).unwrap();
        assert_eq!(polygon.vertices().len(), 3);
        assert_eq!(polygon.bounding_box().to_query_param(), "127.1,37.36,127.12,37.37");
    }

    #[test]
    fn rejects_two_vertices() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "line.json", r#"[{"lat": 1, "lng": 2}, {"lat": 3, "lng": 4}]"#);
        let err = load_polygon(&path).unwrap_err();
        assert!(err.to_string().contains("closing polygon"));
    }

    #[test]
    fn rejects_malformed_json() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "bad.json", "{not json");
        assert!(load_polygon(&path).is_err());
        assert!(load_polygon(&dir.path().join("missing.json")).is_err());
    }
}
