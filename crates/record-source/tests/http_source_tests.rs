//! End-to-end tests of the HTTP page source against an in-process server.

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use record_source::{
    create_spatial_chunks, ChunkFetcher, ChunkStream, ChunkingConfig, DatabaseConfig,
    HttpPageSource, PageQuery, PageSource, SourceError,
};
use serde_json::Value;
use test_utils::{bbox, bounds, page_json, raw_point_record, time_slices, SHORT_PERIODS};

const TOTAL_RECORDS: u64 = 15;

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Serves TOTAL_RECORDS records, echoing the request's start year into the period.
async fn geodata(Query(params): Query<HashMap<String, String>>) -> Result<Json<Value>, StatusCode> {
    let page: u32 = params.get("page").and_then(|p| p.parse().ok()).ok_or(StatusCode::BAD_REQUEST)?;
    let page_size: u32 = params
        .get("page_size")
        .and_then(|p| p.parse().ok())
        .ok_or(StatusCode::BAD_REQUEST)?;
    let min_lon: f64 = params
        .get("min_lon")
        .and_then(|p| p.parse().ok())
        .ok_or(StatusCode::BAD_REQUEST)?;
    let min_lat: f64 = params
        .get("min_lat")
        .and_then(|p| p.parse().ok())
        .ok_or(StatusCode::BAD_REQUEST)?;
    let year: i32 = params
        .get("start_year")
        .and_then(|s| s.get(..4))
        .and_then(|y| y.parse().ok())
        .unwrap_or(1900);

    let first = (page - 1) as u64 * page_size as u64;
    let last = (first + page_size as u64).min(TOTAL_RECORDS);
    let records = (first..last)
        .map(|i| {
            let lon = min_lon + 0.001 * (i + 1) as f64;
            raw_point_record("text", lon, min_lat + 0.001, &["archive"], year, year + 1)
        })
        .collect();

    Ok(Json(page_json(records, TOTAL_RECORDS, page, page_size)))
}

fn database(addr: SocketAddr, batch_size: u32) -> DatabaseConfig {
    DatabaseConfig {
        batch_size,
        ..DatabaseConfig::new(format!("http://{}", addr))
    }
}

#[tokio::test]
async fn test_http_source_pages_through_chunk() {
    let addr = serve(Router::new().route("/api/geodata", get(geodata))).await;
    let config = database(addr, 4);
    let chunking = ChunkingConfig {
        chunk_rows: 1,
        chunk_cols: 1,
        delay_ms: 0,
        ..Default::default()
    };

    let source = HttpPageSource::new(&config).unwrap();
    let fetcher = ChunkFetcher::new(source, &config, &chunking);
    let chunks = create_spatial_chunks(&bounds(bbox::CENTRE), &chunking).unwrap();
    let slices = time_slices(SHORT_PERIODS);

    let result = fetcher
        .fetch_chunk(&chunks[0], Some(&slices[0]), None)
        .await
        .unwrap();

    assert_eq!(result.stats.total_raw, 15);
    assert_eq!(result.stats.valid_processed, 15);
    assert!(result.features.iter().all(|f| f.start_year == 1850));
    assert!(result.vocabulary.tags.contains("archive"));
}

#[tokio::test]
async fn test_default_params_cannot_shrink_pages() {
    let addr = serve(Router::new().route("/api/geodata", get(geodata))).await;
    let mut config = database(addr, 2000);
    config
        .default_params
        .insert("page_size".to_string(), "4".to_string());
    let chunking = ChunkingConfig {
        chunk_rows: 1,
        chunk_cols: 1,
        delay_ms: 0,
        ..Default::default()
    };

    let fetcher = ChunkFetcher::new(HttpPageSource::new(&config).unwrap(), &config, &chunking);
    let chunks = create_spatial_chunks(&bounds(bbox::CENTRE), &chunking).unwrap();

    let result = fetcher.fetch_chunk(&chunks[0], None, None).await.unwrap();

    assert_eq!(result.stats.total_raw, 15);
    assert_eq!(result.features.len(), 15);
}

#[tokio::test]
async fn test_http_status_error() {
    let app = Router::new().route(
        "/api/geodata",
        get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "try later") }),
    );
    let addr = serve(app).await;
    let source = HttpPageSource::new(&database(addr, 10)).unwrap();

    let query = PageQuery {
        bounds: bounds(bbox::CENTRE),
        time_range: None,
        record_kind: None,
        page: 1,
        page_size: 10,
    };

    match source.fetch_page(&query).await {
        Err(SourceError::Status { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "try later");
        }
        other => panic!("expected status error, got {:?}", other.map(|p| p.data.len())),
    }
}

#[tokio::test]
async fn test_undecodable_body_fails_chunk_but_not_stream() {
    let app = Router::new().route("/api/geodata", get(|| async { "<html>maintenance</html>" }));
    let addr = serve(app).await;
    let config = database(addr, 10);
    let chunking = ChunkingConfig {
        chunk_rows: 1,
        chunk_cols: 2,
        delay_ms: 0,
        ..Default::default()
    };

    let fetcher = ChunkFetcher::new(HttpPageSource::new(&config).unwrap(), &config, &chunking);
    let chunks = create_spatial_chunks(&bounds(bbox::CENTRE), &chunking).unwrap();
    let mut stream = ChunkStream::new(&fetcher, &chunks, None, chunking.delay());

    let mut yielded = 0;
    while let Some(result) = stream.next_chunk().await {
        yielded += 1;
        assert!(result.is_failed());
        assert!(result.error.unwrap().contains("Unexpected response"));
    }
    assert_eq!(yielded, 2);
    assert_eq!(stream.totals().failed_chunks, 2);
}
