//! Table detection from ruling lines and column alignment.
//!
//! Two strategies run per page. Ruled tables come from the vertical and
//! horizontal strokes drawn around cells. Aligned tables come from
//! consecutive lines whose cell start positions line up, the way a
//! stream-mode extractor reads tables without any graphics.

use crate::model::{Line, Rect, Ruling, Span};

use super::lists::{is_bullet_marker, is_number_marker};

/// Minimum rows for an aligned table.
pub const MIN_TABLE_ROWS: usize = 2;
/// Tolerance (pt) when matching cell starts to column positions.
pub const ALIGNMENT_TOLERANCE: f32 = 5.0;
/// Aligned runs with more columns than this are word-level splits.
pub const MAX_TABLE_COLUMNS: usize = 12;
/// Gap, as a multiple of the font size, that separates two cells.
pub const CELL_GAP_FACTOR: f32 = 1.5;
/// Slope tolerance (pt) for horizontal and vertical rulings.
pub const RULING_EPSILON: f32 = 1.0;
/// Mean words per cell above which an aligned run reads as prose.
pub const MAX_MEAN_CELL_WORDS: f32 = 8.0;

/// Table detector configuration.
#[derive(Debug, Clone)]
pub struct TableDetectorConfig {
    /// Minimum number of rows for an aligned table
    pub min_rows: usize,
    /// Maximum number of columns for an aligned table
    pub max_columns: usize,
    /// Cell start alignment tolerance (points)
    pub alignment_tolerance: f32,
    /// Horizontal gap that separates cells (fraction of font size)
    pub cell_gap_factor: f32,
    /// Orientation tolerance for ruling lines (points)
    pub ruling_epsilon: f32,
}

impl Default for TableDetectorConfig {
    fn default() -> Self {
        Self {
            min_rows: MIN_TABLE_ROWS,
            max_columns: MAX_TABLE_COLUMNS,
            alignment_tolerance: ALIGNMENT_TOLERANCE,
            cell_gap_factor: CELL_GAP_FACTOR,
            ruling_epsilon: RULING_EPSILON,
        }
    }
}

/// A table found on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedTable {
    /// Indices of the page lines the table consumed, ascending
    pub lines: Vec<usize>,
    /// Rows of cells; every row has the same cell count
    pub rows: Vec<Vec<Vec<Span>>>,
    /// Area covered by the table
    pub bbox: Rect,
    /// Found from ruling lines rather than alignment
    pub ruled: bool,
}

impl DetectedTable {
    pub fn column_count(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }
}

/// Detects ruled and aligned tables in a page's lines.
pub struct TableDetector {
    config: TableDetectorConfig,
}

impl TableDetector {
    /// Create a new table detector with default configuration.
    pub fn new() -> Self {
        Self {
            config: TableDetectorConfig::default(),
        }
    }

    /// Create a new table detector with custom configuration.
    pub fn with_config(config: TableDetectorConfig) -> Self {
        Self { config }
    }

    /// Find tables among `lines`. A line belongs to at most one table.
    pub fn detect(&self, lines: &[Line], rulings: &[Ruling]) -> Vec<DetectedTable> {
        self.detect_excluding(lines, rulings, &vec![false; lines.len()])
    }

    /// Like [`detect`](Self::detect), but lines flagged in `excluded` never
    /// join a table and break any aligned run they interrupt.
    pub fn detect_excluding(
        &self,
        lines: &[Line],
        rulings: &[Ruling],
        excluded: &[bool],
    ) -> Vec<DetectedTable> {
        let mut consumed: Vec<bool> = (0..lines.len())
            .map(|i| excluded.get(i).copied().unwrap_or(false))
            .collect();
        let mut tables = self.detect_ruled(lines, rulings, &mut consumed);
        tables.extend(self.detect_aligned(lines, &mut consumed));
        tables.sort_by_key(|t| t.lines.first().copied().unwrap_or(usize::MAX));

        log::debug!(
            "TableDetector: {} table(s) over {} lines",
            tables.len(),
            lines.len()
        );
        tables
    }

    // ==================== Ruled tables ====================

    fn detect_ruled(
        &self,
        lines: &[Line],
        rulings: &[Ruling],
        consumed: &mut [bool],
    ) -> Vec<DetectedTable> {
        let eps = self.config.ruling_epsilon;
        let horizontals: Vec<&Ruling> = rulings.iter().filter(|r| r.is_horizontal(eps)).collect();
        let mut verticals: Vec<Rect> = rulings
            .iter()
            .filter(|r| r.is_vertical(eps))
            .map(|r| Rect::new(r.start.x, r.start.y, r.end.x, r.end.y))
            .collect();
        if verticals.len() < 3 {
            return Vec::new();
        }
        verticals.sort_by(|a, b| a.y0.total_cmp(&b.y0));

        // Regions: verticals whose y-ranges overlap.
        let mut regions: Vec<(Rect, Vec<f32>)> = Vec::new();
        for v in verticals {
            match regions.last_mut() {
                Some((area, xs)) if v.y0 <= area.y1 + eps * 2.0 => {
                    *area = area.union(&v);
                    xs.push(v.x0);
                }
                _ => regions.push((v, vec![v.x0])),
            }
        }

        let mut tables = Vec::new();
        for (area, xs) in regions {
            let columns = merge_positions(xs, eps * 2.0);
            if columns.len() < 3 {
                continue;
            }
            let region = Rect::new(columns[0], area.y0, columns[columns.len() - 1], area.y1);

            let members: Vec<usize> = (0..lines.len())
                .filter(|&i| !consumed[i])
                .filter(|&i| {
                    let b = lines[i].bbox;
                    b.center_y() >= region.y0
                        && b.center_y() <= region.y1
                        && b.center_x() >= region.x0
                        && b.center_x() <= region.x1
                })
                .collect();
            if members.is_empty() {
                continue;
            }

            let band_edges = merge_positions(
                horizontals
                    .iter()
                    .filter(|h| {
                        let y = h.start.y;
                        y >= region.y0 - eps * 2.0
                            && y <= region.y1 + eps * 2.0
                            && h.start.x.min(h.end.x) < region.x1
                            && h.start.x.max(h.end.x) > region.x0
                    })
                    .map(|h| h.start.y)
                    .collect(),
                eps * 2.0,
            );

            let rows = if band_edges.len() > 2 {
                self.ruled_rows_by_band(lines, &members, &columns, &band_edges)
            } else {
                members
                    .iter()
                    .map(|&i| assign_by_center(&lines[i].spans, &columns))
                    .collect()
            };
            let rows: Vec<Vec<Vec<Span>>> = rows
                .into_iter()
                .filter(|row| row.iter().any(|cell| !cell.is_empty()))
                .collect();
            if rows.is_empty() {
                continue;
            }

            for &i in &members {
                consumed[i] = true;
            }
            log::debug!(
                "TableDetector: ruled table with {} rows x {} columns",
                rows.len(),
                columns.len() - 1
            );
            tables.push(DetectedTable {
                lines: members,
                rows,
                bbox: region,
                ruled: true,
            });
        }
        tables
    }

    fn ruled_rows_by_band(
        &self,
        lines: &[Line],
        members: &[usize],
        columns: &[f32],
        band_edges: &[f32],
    ) -> Vec<Vec<Vec<Span>>> {
        let mut bands: Vec<Vec<Span>> = vec![Vec::new(); band_edges.len() - 1];
        for &i in members {
            for span in &lines[i].spans {
                let cy = span.bbox.center_y();
                let band = band_edges
                    .windows(2)
                    .position(|w| cy >= w[0] && cy < w[1])
                    .unwrap_or(if cy < band_edges[0] { 0 } else { bands.len() - 1 });
                bands[band].push(span.clone());
            }
        }
        bands
            .iter()
            .map(|spans| {
                let mut sorted = spans.clone();
                sorted.sort_by(|a, b| {
                    a.baseline()
                        .total_cmp(&b.baseline())
                        .then(a.bbox.x0.total_cmp(&b.bbox.x0))
                });
                assign_by_center(&sorted, columns)
            })
            .collect()
    }

    // ==================== Aligned tables ====================

    fn detect_aligned(&self, lines: &[Line], consumed: &mut [bool]) -> Vec<DetectedTable> {
        let cells: Vec<Vec<Vec<Span>>> = lines
            .iter()
            .map(|line| self.split_cells(line))
            .collect();

        let mut tables = Vec::new();
        let mut i = 0;
        while i < lines.len() {
            if consumed[i] || cells[i].len() < 2 {
                i += 1;
                continue;
            }

            let mut run = vec![i];
            let mut columns = merge_positions(
                cells[i].iter().map(|c| cell_start(c)).collect(),
                self.config.alignment_tolerance,
            );
            let mut j = i + 1;
            while j < lines.len() && !consumed[j] && cells[j].len() >= 2 {
                let starts: Vec<f32> = cells[j].iter().map(|c| cell_start(c)).collect();
                let matching = starts
                    .iter()
                    .filter(|&&x| {
                        columns
                            .iter()
                            .any(|&c| (x - c).abs() <= self.config.alignment_tolerance)
                    })
                    .count();
                if matching < 2 {
                    break;
                }
                columns.extend(starts);
                columns = merge_positions(columns, self.config.alignment_tolerance);
                run.push(j);
                j += 1;
            }

            if let Some(table) = self.build_aligned(lines, &cells, &run, &columns) {
                for &k in &run {
                    consumed[k] = true;
                }
                tables.push(table);
                i = j;
            } else {
                i += 1;
            }
        }
        tables
    }

    fn build_aligned(
        &self,
        lines: &[Line],
        cells: &[Vec<Vec<Span>>],
        run: &[usize],
        columns: &[f32],
    ) -> Option<DetectedTable> {
        if run.len() < self.config.min_rows {
            return None;
        }
        if columns.len() > self.config.max_columns {
            log::debug!(
                "TableDetector: skipping region, too many columns ({} > {})",
                columns.len(),
                self.config.max_columns
            );
            return None;
        }
        if self.is_list_pattern(cells, run, columns.len()) {
            log::debug!("TableDetector: skipping region, detected as list pattern");
            return None;
        }

        let cell_count: usize = run.iter().map(|&k| cells[k].len()).sum();
        let word_count: usize = run
            .iter()
            .flat_map(|&k| cells[k].iter())
            .flat_map(|cell| cell.iter())
            .map(|span| span.text.split_whitespace().count())
            .sum();
        if word_count as f32 / cell_count.max(1) as f32 > MAX_MEAN_CELL_WORDS {
            log::debug!("TableDetector: skipping region, cells read as prose");
            return None;
        }

        let rows: Vec<Vec<Vec<Span>>> = run
            .iter()
            .map(|&k| {
                let mut row: Vec<Vec<Span>> = vec![Vec::new(); columns.len()];
                for cell in &cells[k] {
                    let col = self.find_column_for_cell(cell_start(cell), columns);
                    row[col].extend(cell.iter().cloned());
                }
                row
            })
            .collect();

        let bbox = run
            .iter()
            .map(|&k| lines[k].bbox)
            .reduce(|a, b| a.union(&b))
            .unwrap_or_default();

        log::debug!(
            "TableDetector: aligned table with {} rows x {} columns",
            rows.len(),
            columns.len()
        );
        Some(DetectedTable {
            lines: run.to_vec(),
            rows,
            bbox,
            ruled: false,
        })
    }

    /// Split a line into cells wherever the gap between spans is wide.
    fn split_cells(&self, line: &Line) -> Vec<Vec<Span>> {
        let mut cells: Vec<Vec<Span>> = Vec::new();
        for span in &line.spans {
            let starts_cell = match cells.last().and_then(|c| c.last()) {
                Some(prev) => {
                    let gap = span.bbox.x0 - prev.bbox.x1;
                    gap >= span.font_size.max(prev.font_size) * self.config.cell_gap_factor
                }
                None => true,
            };
            if starts_cell {
                cells.push(vec![span.clone()]);
            } else if let Some(cell) = cells.last_mut() {
                cell.push(span.clone());
            }
        }
        cells
    }

    /// Rightmost column starting at or before the cell (with tolerance).
    fn find_column_for_cell(&self, x: f32, columns: &[f32]) -> usize {
        columns
            .iter()
            .rposition(|&c| c <= x + self.config.alignment_tolerance)
            .unwrap_or(0)
    }

    /// Check if aligned rows actually represent a numbered or bulleted list.
    ///
    /// When a list marker and its text are separate spans at different X
    /// positions, the rows look like a two-column table.
    fn is_list_pattern(&self, cells: &[Vec<Vec<Span>>], run: &[usize], columns: usize) -> bool {
        let mut bullet_count = 0;
        let mut number_count = 0;
        for &k in run {
            let first: String = cells[k]
                .first()
                .map(|c| c.iter().map(|s| s.text.as_str()).collect())
                .unwrap_or_default();
            if is_bullet_marker(&first) {
                bullet_count += 1;
            } else if is_number_marker(&first) {
                number_count += 1;
            }
        }
        let rows = run.len().max(1) as f32;
        let bullet_ratio = bullet_count as f32 / rows;
        let total_ratio = (bullet_count + number_count) as f32 / rows;

        // Bullet markers are almost never real table data; numbered first
        // columns are only rejected for two-column runs.
        bullet_ratio >= 0.5 || (columns == 2 && total_ratio >= 0.5)
    }
}

impl Default for TableDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn cell_start(cell: &[Span]) -> f32 {
    cell.first().map(|s| s.bbox.x0).unwrap_or(0.0)
}

/// Sort positions and collapse clusters closer than `tolerance` to their
/// first member.
fn merge_positions(mut positions: Vec<f32>, tolerance: f32) -> Vec<f32> {
    positions.retain(|p| p.is_finite());
    positions.sort_by(f32::total_cmp);
    let mut merged: Vec<f32> = Vec::with_capacity(positions.len());
    for p in positions {
        match merged.last() {
            Some(&last) if p - last <= tolerance => {}
            _ => merged.push(p),
        }
    }
    merged
}

/// Distribute spans over the cells bounded by consecutive `edges`.
fn assign_by_center(spans: &[Span], edges: &[f32]) -> Vec<Vec<Span>> {
    let cells = edges.len().saturating_sub(1).max(1);
    let mut row: Vec<Vec<Span>> = vec![Vec::new(); cells];
    for span in spans {
        let cx = span.bbox.center_x();
        let col = edges
            .windows(2)
            .position(|w| cx >= w[0] && cx < w[1])
            .unwrap_or(if edges.first().is_some_and(|&e| cx < e) {
                0
            } else {
                cells - 1
            });
        row[col].push(span.clone());
    }
    row
}
