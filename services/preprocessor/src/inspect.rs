//! Human-readable summary of a container's metadata.

use std::fmt::Write;

use container::VisualizationMetadata;

pub fn describe(metadata: &VisualizationMetadata) -> String {
    let mut out = String::new();
    let dims = &metadata.heatmap_dimensions;

    let _ = writeln!(out, "version:      {}", metadata.version);
    let _ = writeln!(out, "generated:    {}", metadata.timestamp);
    let _ = writeln!(
        out,
        "bounds:       lon {:.6}..{:.6}, lat {:.6}..{:.6}",
        dims.min_lon, dims.max_lon, dims.min_lat, dims.max_lat
    );
    let _ = writeln!(
        out,
        "primary grid: {}x{} ({} cells)",
        dims.cols_amount,
        dims.rows_amount,
        metadata.heatmap_blueprint.cells.len()
    );
    let _ = writeln!(out, "resolutions:  {}", metadata.resolution_keys().join(", "));

    let slices: Vec<&str> = metadata.time_slices.iter().map(|s| s.label.as_str()).collect();
    let _ = writeln!(out, "time slices:  {} [{}]", slices.len(), slices.join(", "));
    if let Some(range) = &metadata.time_range {
        let _ = writeln!(out, "time range:   {} .. {}", range.start, range.end);
    }

    let _ = writeln!(out, "record kinds: {}", metadata.record_kinds.join(", "));
    let _ = writeln!(out, "tags:         {}", metadata.tags.len());
    let _ = writeln!(out, "tag combos:   {}", metadata.tag_combinations.len());

    let sections = &metadata.sections;
    let _ = writeln!(
        out,
        "heatmaps:     offset {} length {}",
        sections.heatmaps.offset, sections.heatmaps.length
    );
    let _ = writeln!(
        out,
        "histograms:   offset {} length {}",
        sections.histograms.offset, sections.histograms.length
    );

    if let Some(stats) = &metadata.stats {
        let _ = writeln!(out, "features:     {}", stats.total_features);
        for (kind, count) in &stats.features_per_record_kind {
            let _ = writeln!(out, "  {kind}: {count}");
        }
    }

    out
}
