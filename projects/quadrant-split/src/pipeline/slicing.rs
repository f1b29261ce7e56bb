use crate::pipeline::types::{GridSpec, Region};
use anyhow::Result;

/// Boundaries along one dimension: `floor(k * total / parts)` for `k` in `0..=parts`.
///
/// Consecutive boundaries never overlap and the last one is always `total`,
/// so any remainder lands in the trailing parts.
pub fn grid_offsets(total: u32, parts: u32) -> Vec<u32> {
    (0..=parts)
        .map(|k| ((k as u64 * total as u64) / parts as u64) as u32)
        .collect()
}

/// Splits a `width` x `height` image into grid regions, row-major.
///
/// For the default 2x2 grid this yields top-left, top-right, bottom-left,
/// bottom-right.
pub fn compute_regions(width: u32, height: u32, grid: &GridSpec) -> Result<Vec<Region>> {
    if grid.rows == 0 || grid.cols == 0 {
        anyhow::bail!("Grid must have at least one row and column, got {:?}", grid);
    }
    if width < grid.cols || height < grid.rows {
        anyhow::bail!(
            "Image {}x{} is too small for a {}x{} grid",
            width,
            height,
            grid.cols,
            grid.rows
        );
    }

    let xs = grid_offsets(width, grid.cols);
    let ys = grid_offsets(height, grid.rows);

    let mut regions = Vec::with_capacity(grid.len());
    for row in ys.windows(2) {
        for col in xs.windows(2) {
            regions.push(Region {
                index: regions.len(),
                x: col[0],
                y: row[0],
                width: col[1] - col[0],
                height: row[1] - row[0],
            });
        }
    }

    Ok(regions)
}
