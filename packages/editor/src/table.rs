//! # Table Topology
//!
//! Reconstructs the logical row/column grid of a table from its physical
//! `tr`/`td` tree and performs structural edits that keep spans consistent.
//!
//! ## Grid model
//!
//! Every call re-runs [`TableGrid::analyze`] over the live tree; nothing is
//! cached between operations. Each physical cell stamps its
//! `rowspan × colspan` footprint into the occupancy matrix, starting at the
//! first free column of its row:
//!
//! ```text
//! <tr><td rowspan=2>A</td><td>B</td></tr>        A B
//! <tr><td>C</td></tr>                      →     A C
//! ```
//!
//! Footprints are clipped to the physical row count; overlapping footprints
//! keep whichever cell claimed the slot first.
//!
//! ## Edge policy
//!
//! Out-of-range indices, stale table handles and non-rectangular merges are
//! no-ops. Deleting the last remaining row or column is refused too.

use crate::config::TableConfig;
use resume_dom::{Document, NodeId};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;

const SECTION_TAGS: &[&str] = &["thead", "tbody", "tfoot"];

/// Largest `colspan` honored when reading a cell
pub const MAX_COLSPAN: usize = 1000;
/// Largest `rowspan` honored when reading a cell
pub const MAX_ROWSPAN: usize = 65534;
/// Largest row or column count `create_table` will build
pub const MAX_NEW_TABLE_DIMENSION: usize = 100;

/// Footprint of a cell, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellBounds {
    pub start_row: usize,
    pub end_row: usize,
    pub start_col: usize,
    pub end_col: usize,
}

impl CellBounds {
    pub fn row_span(&self) -> usize {
        self.end_row - self.start_row + 1
    }

    pub fn col_span(&self) -> usize {
        self.end_col - self.start_col + 1
    }

    fn union(&self, other: &CellBounds) -> CellBounds {
        CellBounds {
            start_row: self.start_row.min(other.start_row),
            end_row: self.end_row.max(other.end_row),
            start_col: self.start_col.min(other.start_col),
            end_col: self.end_col.max(other.end_col),
        }
    }
}

/// Width and left offset of one logical column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnMetric {
    pub index: usize,
    pub width: u32,
    pub left: u32,
}

/// Occupancy matrix of one table, derived from its physical tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableGrid {
    rows: Vec<NodeId>,
    slots: Vec<Vec<Option<NodeId>>>,
    max_cols: usize,
}

impl TableGrid {
    pub fn analyze(doc: &Document, table: NodeId) -> Self {
        let rows = physical_rows(doc, table);
        let mut slots: Vec<Vec<Option<NodeId>>> = vec![Vec::new(); rows.len()];

        for (r, row) in rows.iter().enumerate() {
            let mut col = 0;
            for cell in cells_of(doc, *row) {
                while slots[r].get(col).is_some_and(Option::is_some) {
                    col += 1;
                }
                let row_span = span(doc, cell, "rowspan");
                let col_span = span(doc, cell, "colspan");

                for rr in r..(r + row_span).min(rows.len()) {
                    for cc in col..col + col_span {
                        if slots[rr].len() <= cc {
                            slots[rr].resize(cc + 1, None);
                        }
                        if slots[rr][cc].is_none() {
                            slots[rr][cc] = Some(cell);
                        }
                    }
                }
                col += col_span;
            }
        }

        let max_cols = slots.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut slots {
            row.resize(max_cols, None);
        }

        Self {
            rows,
            slots,
            max_cols,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Widest row's column count
    pub fn column_count(&self) -> usize {
        self.max_cols
    }

    /// Physical `tr` elements, in order
    pub fn rows(&self) -> &[NodeId] {
        &self.rows
    }

    pub fn cell_at(&self, row: usize, col: usize) -> Option<NodeId> {
        self.slots.get(row)?.get(col).copied().flatten()
    }

    pub fn cell_bounds(&self, cell: NodeId) -> Option<CellBounds> {
        let mut bounds: Option<CellBounds> = None;
        for (r, row) in self.slots.iter().enumerate() {
            for (c, slot) in row.iter().enumerate() {
                if *slot != Some(cell) {
                    continue;
                }
                let here = CellBounds {
                    start_row: r,
                    end_row: r,
                    start_col: c,
                    end_col: c,
                };
                bounds = Some(bounds.map_or(here, |b| b.union(&here)));
            }
        }
        bounds
    }

    /// Distinct cells touching a row, left to right
    pub fn cells_in_row(&self, row: usize) -> Vec<NodeId> {
        let mut out = Vec::new();
        for cell in self.slots.get(row).into_iter().flatten().flatten() {
            if !out.contains(cell) {
                out.push(*cell);
            }
        }
        out
    }

    /// Distinct cells touching a column, top to bottom
    pub fn cells_in_column(&self, col: usize) -> Vec<NodeId> {
        let mut out = Vec::new();
        for row in &self.slots {
            if let Some(Some(cell)) = row.get(col) {
                if !out.contains(cell) {
                    out.push(*cell);
                }
            }
        }
        out
    }

    /// Anchor column of every cell in the grid
    fn anchor_columns(&self) -> HashMap<NodeId, usize> {
        let mut anchors = HashMap::new();
        for row in &self.slots {
            for (c, slot) in row.iter().enumerate() {
                if let Some(cell) = slot {
                    anchors.entry(*cell).or_insert(c);
                }
            }
        }
        anchors
    }
}

/// Structural editor over one table of a live document
pub struct TableEditor<'a> {
    doc: &'a mut Document,
    table: NodeId,
    config: TableConfig,
}

impl<'a> TableEditor<'a> {
    /// `None` unless `table` is an attached `table` element of `doc`
    pub fn new(doc: &'a mut Document, table: NodeId, config: &TableConfig) -> Option<Self> {
        if !doc.is_element(table, "table") || !doc.is_attached(table) {
            debug!("Table handle is stale or not a table");
            return None;
        }
        Some(Self {
            doc,
            table,
            config: config.clone(),
        })
    }

    pub fn table(&self) -> NodeId {
        self.table
    }

    pub fn analyze(&self) -> TableGrid {
        TableGrid::analyze(self.doc, self.table)
    }

    pub fn cell_at(&self, row: usize, col: usize) -> Option<NodeId> {
        self.analyze().cell_at(row, col)
    }

    pub fn cell_bounds(&self, cell: NodeId) -> Option<CellBounds> {
        self.analyze().cell_bounds(cell)
    }

    /// Effective width and left offset per logical column
    pub fn column_metrics(&self) -> Vec<ColumnMetric> {
        let grid = self.analyze();
        let mut metrics = Vec::with_capacity(grid.column_count());
        let mut left: u32 = 0;

        for col in 0..grid.column_count() {
            let anchored: Vec<NodeId> = grid
                .cells_in_column(col)
                .into_iter()
                .filter(|cell| grid.cell_bounds(*cell).is_some_and(|b| b.start_col == col))
                .collect();

            let single = anchored.iter().find_map(|cell| {
                let bounds = grid.cell_bounds(*cell)?;
                (bounds.col_span() == 1).then(|| px(self.doc.style(*cell, "width")))?
            });
            let shared = || {
                anchored.iter().find_map(|cell| {
                    let bounds = grid.cell_bounds(*cell)?;
                    px(self.doc.style(*cell, "width")).map(|w| w / bounds.col_span() as u32)
                })
            };
            let width = single
                .or_else(shared)
                .unwrap_or(self.config.default_column_width);

            metrics.push(ColumnMetric {
                index: col,
                width,
                left,
            });
            left = left.saturating_add(width);
        }
        metrics
    }

    pub fn insert_row_end(&mut self) -> Option<NodeId> {
        let rows = self.analyze().row_count();
        self.insert_row_at(rows)
    }

    pub fn insert_row_before(&mut self, cell: NodeId) -> Option<NodeId> {
        let bounds = self.cell_bounds(cell)?;
        self.insert_row_at(bounds.start_row)
    }

    pub fn insert_row_after(&mut self, cell: NodeId) -> Option<NodeId> {
        let bounds = self.cell_bounds(cell)?;
        self.insert_row_at(bounds.end_row + 1)
    }

    /// Insert a row so it becomes row `index`; vertical spans crossing it grow instead
    pub fn insert_row_at(&mut self, index: usize) -> Option<NodeId> {
        let grid = self.analyze();
        if index > grid.row_count() {
            return None;
        }
        self.clip_row_spans(&grid);

        let new_row = self.doc.create_element("tr");
        let mut grown = HashSet::new();
        for col in 0..grid.column_count() {
            let spanning = grid.cell_at(index, col).filter(|cell| {
                grid.cell_bounds(*cell)
                    .is_some_and(|b| b.start_row < index)
            });
            if let Some(cell) = spanning {
                if grown.insert(cell) {
                    let rows = span(self.doc, cell, "rowspan");
                    set_span(self.doc, cell, "rowspan", rows + 1);
                }
                continue;
            }
            let td = self.doc.create_element("td");
            self.doc.append_child(new_row, td);
        }

        match grid.rows().get(index) {
            Some(reference) => {
                let parent = self.doc.parent(*reference)?;
                self.doc.insert_before(parent, new_row, *reference);
            }
            None => match grid.rows().last() {
                Some(last) => self.doc.insert_after(*last, new_row),
                None => self.doc.append_child(self.table, new_row),
            },
        }
        debug!(index, "Inserted table row");
        Some(new_row)
    }

    /// Rewrite `rowspan` attributes that reach past the last row to their clipped extent
    fn clip_row_spans(&mut self, grid: &TableGrid) {
        let mut seen = HashSet::new();
        for row in 0..grid.row_count() {
            for cell in grid.cells_in_row(row) {
                if !seen.insert(cell) {
                    continue;
                }
                let Some(bounds) = grid.cell_bounds(cell) else {
                    continue;
                };
                if span(self.doc, cell, "rowspan") > bounds.row_span() {
                    set_span(self.doc, cell, "rowspan", bounds.row_span());
                }
            }
        }
    }

    pub fn delete_row_end(&mut self) -> bool {
        let rows = self.analyze().row_count();
        match rows.checked_sub(1) {
            Some(last) => self.delete_row_at(last),
            None => false,
        }
    }

    /// Remove row `index`; spans crossing it shrink, multi-row cells anchored in it move down
    pub fn delete_row_at(&mut self, index: usize) -> bool {
        let grid = self.analyze();
        if index >= grid.row_count() || grid.row_count() <= 1 {
            return false;
        }
        let anchors = grid.anchor_columns();
        let row = grid.rows()[index];
        let next_row = grid.rows().get(index + 1).copied();

        for cell in grid.cells_in_row(index) {
            let Some(bounds) = grid.cell_bounds(cell) else {
                continue;
            };
            if bounds.start_row < index {
                set_span(self.doc, cell, "rowspan", bounds.row_span() - 1);
            } else if bounds.row_span() > 1 {
                let Some(next_row) = next_row else {
                    continue;
                };
                let position = cells_of(self.doc, next_row)
                    .into_iter()
                    .filter(|c| anchors.get(c).is_some_and(|col| *col < bounds.start_col))
                    .count();
                set_span(self.doc, cell, "rowspan", bounds.row_span() - 1);
                self.doc.insert_child(next_row, position, cell);
            }
        }

        self.doc.remove(row);
        debug!(index, "Deleted table row");
        true
    }

    pub fn insert_column_end(&mut self) -> usize {
        let cols = self.analyze().column_count();
        self.insert_column_at(cols)
    }

    pub fn insert_column_before(&mut self, cell: NodeId) -> usize {
        match self.cell_bounds(cell) {
            Some(bounds) => self.insert_column_at(bounds.start_col),
            None => 0,
        }
    }

    pub fn insert_column_after(&mut self, cell: NodeId) -> usize {
        match self.cell_bounds(cell) {
            Some(bounds) => self.insert_column_at(bounds.end_col + 1),
            None => 0,
        }
    }

    /// Insert a column so it becomes column `index`; returns the number of new cells
    ///
    /// Horizontal spans crossing the column widen instead of receiving a cell.
    pub fn insert_column_at(&mut self, index: usize) -> usize {
        let grid = self.analyze();
        if index > grid.column_count() {
            return 0;
        }
        let anchors = grid.anchor_columns();
        let mut widened = HashSet::new();
        let mut created = 0;

        for (r, row) in grid.rows().iter().enumerate() {
            let spanning = grid.cell_at(r, index).filter(|cell| {
                grid.cell_bounds(*cell)
                    .is_some_and(|b| b.start_col < index)
            });
            if let Some(cell) = spanning {
                if widened.insert(cell) {
                    let cols = span(self.doc, cell, "colspan");
                    set_span(self.doc, cell, "colspan", cols + 1);
                }
                continue;
            }

            let position = cells_of(self.doc, *row)
                .into_iter()
                .filter(|c| anchors.get(c).is_some_and(|col| *col < index))
                .count();
            let td = self.doc.create_element("td");
            self.doc.insert_child(*row, position, td);
            created += 1;
        }
        debug!(index, created, "Inserted table column");
        created
    }

    pub fn delete_column_end(&mut self) -> bool {
        let cols = self.analyze().column_count();
        match cols.checked_sub(1) {
            Some(last) => self.delete_column_at(last),
            None => false,
        }
    }

    /// Remove column `index`; spanning cells narrow, single-column cells go
    pub fn delete_column_at(&mut self, index: usize) -> bool {
        let grid = self.analyze();
        if index >= grid.column_count() || grid.column_count() <= 1 {
            return false;
        }
        for cell in grid.cells_in_column(index) {
            let Some(bounds) = grid.cell_bounds(cell) else {
                continue;
            };
            if bounds.col_span() > 1 {
                set_span(self.doc, cell, "colspan", bounds.col_span() - 1);
            } else {
                self.doc.remove(cell);
            }
        }
        debug!(index, "Deleted table column");
        true
    }

    /// Merge a rectangular selection into its top-left cell
    pub fn merge_cells(&mut self, cells: &[NodeId]) -> Option<NodeId> {
        let grid = self.analyze();
        let selected: HashSet<NodeId> = cells.iter().copied().collect();
        if selected.len() < 2 {
            return None;
        }

        let mut rect: Option<CellBounds> = None;
        for cell in &selected {
            let bounds = grid.cell_bounds(*cell)?;
            rect = Some(rect.map_or(bounds, |r| r.union(&bounds)));
        }
        let rect = rect?;

        for r in rect.start_row..=rect.end_row {
            for c in rect.start_col..=rect.end_col {
                if !grid.cell_at(r, c).is_some_and(|cell| selected.contains(&cell)) {
                    debug!("Merge selection is not rectangular");
                    return None;
                }
            }
        }

        let anchor = grid.cell_at(rect.start_row, rect.start_col)?;
        let mut ordered = Vec::new();
        for r in rect.start_row..=rect.end_row {
            for cell in grid.cells_in_row(r) {
                if selected.contains(&cell) && cell != anchor && !ordered.contains(&cell) {
                    ordered.push(cell);
                }
            }
        }

        for cell in ordered {
            let moved = self.doc.children(cell).to_vec();
            if !moved.is_empty() && !self.doc.children(anchor).is_empty() {
                let br = self.doc.create_element("br");
                self.doc.append_child(anchor, br);
            }
            for child in moved {
                self.doc.append_child(anchor, child);
            }
            self.doc.remove(cell);
        }

        set_span(self.doc, anchor, "rowspan", rect.row_span());
        set_span(self.doc, anchor, "colspan", rect.col_span());
        debug!(rows = rect.row_span(), cols = rect.col_span(), "Merged cells");
        Some(anchor)
    }

    /// Reset a spanning cell to 1×1 and refill its former footprint with empty cells
    pub fn split_cell(&mut self, cell: NodeId) -> bool {
        let grid = self.analyze();
        let Some(bounds) = grid.cell_bounds(cell) else {
            return false;
        };
        if bounds.row_span() == 1 && bounds.col_span() == 1 {
            return false;
        }
        let anchors = grid.anchor_columns();

        set_span(self.doc, cell, "rowspan", 1);
        set_span(self.doc, cell, "colspan", 1);

        for r in bounds.start_row..=bounds.end_row {
            let row = grid.rows()[r];
            let mut position = cells_of(self.doc, row)
                .into_iter()
                .filter(|c| anchors.get(c).is_some_and(|col| *col < bounds.start_col))
                .count();
            let mut needed = bounds.col_span();
            if r == bounds.start_row {
                position += 1;
                needed -= 1;
            }
            for _ in 0..needed {
                let td = self.doc.create_element("td");
                self.doc.insert_child(row, position, td);
                position += 1;
            }
        }
        debug!(rows = bounds.row_span(), cols = bounds.col_span(), "Split cell");
        true
    }

    /// Set a row's height, clamped to the configured floor; returns the applied height
    pub fn set_row_height(&mut self, index: usize, height: u32) -> Option<u32> {
        let grid = self.analyze();
        let row = *grid.rows().get(index)?;
        let height = height.max(self.config.min_row_height);
        let value = format!("{}px", height);

        self.doc.set_style(row, "height", value.clone());
        for cell in grid.cells_in_row(index) {
            if grid.cell_bounds(cell).is_some_and(|b| b.row_span() == 1) {
                self.doc.set_style(cell, "height", value.clone());
            }
        }
        Some(height)
    }

    /// Set a column's width, clamped to the configured floor; returns the applied width
    ///
    /// Each cell is sized once, so a spanning cell gets the width, not width × span.
    pub fn set_column_width(&mut self, index: usize, width: u32) -> Option<u32> {
        let grid = self.analyze();
        if index >= grid.column_count() {
            return None;
        }
        let width = width.max(self.config.min_column_width);
        let value = format!("{}px", width);
        for cell in grid.cells_in_column(index) {
            self.doc.set_style(cell, "width", value.clone());
        }
        Some(width)
    }

    /// Grow or shrink a column by `delta` pixels from its current metric
    pub fn resize_column(&mut self, index: usize, delta: i64) -> Option<u32> {
        let current = self.column_metrics().get(index)?.width as i64;
        let target = (current + delta).clamp(0, u32::MAX as i64) as u32;
        self.set_column_width(index, target)
    }

    /// Apply many column widths against a single grid; returns the number of cells sized
    ///
    /// A spanning cell takes the width of the first column it covers.
    pub fn apply_column_widths(&mut self, widths: &[u32]) -> usize {
        let grid = self.analyze();
        let mut sized = HashSet::new();
        for (col, width) in widths.iter().enumerate().take(grid.column_count()) {
            let value = format!("{}px", (*width).max(self.config.min_column_width));
            for cell in grid.cells_in_column(col) {
                if sized.insert(cell) {
                    self.doc.set_style(cell, "width", value.clone());
                }
            }
        }
        sized.len()
    }
}

/// Build a `rows × cols` table and append it to `parent`.
/// Both dimensions are clamped to `1..=MAX_NEW_TABLE_DIMENSION`.
pub fn create_table(doc: &mut Document, parent: NodeId, rows: usize, cols: usize) -> NodeId {
    let rows = rows.clamp(1, MAX_NEW_TABLE_DIMENSION);
    let cols = cols.clamp(1, MAX_NEW_TABLE_DIMENSION);
    let table = doc.create_element("table");
    let body = doc.create_element("tbody");
    doc.append_child(table, body);
    for _ in 0..rows {
        let tr = doc.create_element("tr");
        for _ in 0..cols {
            let td = doc.create_element("td");
            doc.append_child(tr, td);
        }
        doc.append_child(body, tr);
    }
    doc.append_child(parent, table);
    table
}

/// Nearest enclosing table of any node
pub fn enclosing_table(doc: &Document, node: NodeId) -> Option<NodeId> {
    doc.closest(node, "table")
}

fn physical_rows(doc: &Document, table: NodeId) -> Vec<NodeId> {
    let mut rows = Vec::new();
    for child in doc.children(table) {
        if doc.is_element(*child, "tr") {
            rows.push(*child);
        } else if SECTION_TAGS.iter().any(|t| doc.is_element(*child, t)) {
            rows.extend(
                doc.children(*child)
                    .iter()
                    .copied()
                    .filter(|n| doc.is_element(*n, "tr")),
            );
        }
    }
    rows
}

fn cells_of(doc: &Document, row: NodeId) -> Vec<NodeId> {
    doc.children(row)
        .iter()
        .copied()
        .filter(|n| doc.is_element(*n, "td") || doc.is_element(*n, "th"))
        .collect()
}

fn span(doc: &Document, cell: NodeId, attr: &str) -> usize {
    let limit = if attr == "colspan" { MAX_COLSPAN } else { MAX_ROWSPAN };
    doc.attribute(cell, attr)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(1)
        .clamp(1, limit)
}

fn set_span(doc: &mut Document, cell: NodeId, attr: &str, value: usize) {
    if value <= 1 {
        doc.remove_attribute(cell, attr);
    } else {
        doc.set_attribute(cell, attr, value.to_string());
    }
}

fn px(value: Option<&str>) -> Option<u32> {
    value?.trim().trim_end_matches("px").trim().parse::<f64>().ok().map(|v| v.round() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use resume_dom::ContentNode;

    fn cell(text: &str) -> ContentNode {
        ContentNode::element("td").with_child(ContentNode::text(text))
    }

    fn table_doc(rows: Vec<Vec<ContentNode>>) -> (Document, NodeId) {
        let body = ContentNode::element("tbody").with_children(
            rows.into_iter()
                .map(|cells| ContentNode::element("tr").with_children(cells)),
        );
        let doc = Document::with_body([ContentNode::element("table").with_child(body)]);
        let table = doc.child_at(doc.root(), 0).unwrap();
        (doc, table)
    }

    fn simple2x2() -> (Document, NodeId) {
        table_doc(vec![vec![cell("a"), cell("b")], vec![cell("c"), cell("d")]])
    }

    fn text_at(doc: &Document, grid: &TableGrid, row: usize, col: usize) -> String {
        doc.text_content(grid.cell_at(row, col).unwrap())
    }

    #[test]
    fn test_plain_grid_has_distinct_cells() {
        let (doc, table) = table_doc(vec![
            vec![cell("a"), cell("b"), cell("c")],
            vec![cell("d"), cell("e"), cell("f")],
        ]);
        let grid = TableGrid::analyze(&doc, table);
        assert_eq!(grid.row_count(), 2);
        assert_eq!(grid.column_count(), 3);

        let mut seen = HashSet::new();
        for r in 0..2 {
            for c in 0..3 {
                let cell = grid.cell_at(r, c).unwrap();
                assert!(seen.insert(cell));
                assert_eq!(
                    grid.cell_bounds(cell),
                    Some(CellBounds {
                        start_row: r,
                        end_row: r,
                        start_col: c,
                        end_col: c,
                    })
                );
            }
        }
        assert_eq!(grid.cell_at(2, 0), None);
        assert_eq!(grid.cell_at(0, 3), None);
    }

    #[test]
    fn test_rowspan_shares_slots() {
        let (doc, table) = table_doc(vec![
            vec![cell("a").with_attr("rowspan", "2"), cell("b")],
            vec![cell("c")],
        ]);
        let grid = TableGrid::analyze(&doc, table);
        let a = grid.cell_at(0, 0).unwrap();
        assert_eq!(grid.cell_at(1, 0), Some(a));
        assert_eq!(
            grid.cell_bounds(a),
            Some(CellBounds {
                start_row: 0,
                end_row: 1,
                start_col: 0,
                end_col: 0,
            })
        );
        assert_eq!(text_at(&doc, &grid, 1, 1), "c");
    }

    #[test]
    fn test_span_footprint_is_clipped_to_table() {
        let (doc, table) = table_doc(vec![vec![cell("a").with_attr("rowspan", "5")]]);
        let grid = TableGrid::analyze(&doc, table);
        assert_eq!(grid.row_count(), 1);
        assert_eq!(grid.cell_bounds(grid.cell_at(0, 0).unwrap()).unwrap().row_span(), 1);
    }

    #[test]
    fn test_insert_row_end_clips_overhanging_rowspan() {
        let (mut doc, table) =
            table_doc(vec![vec![cell("a").with_attr("rowspan", "5"), cell("b")]]);
        let config = TableConfig::default();
        let mut editor = TableEditor::new(&mut doc, table, &config).unwrap();

        let row = editor.insert_row_end().unwrap();
        let grid = editor.analyze();
        assert_eq!((grid.row_count(), grid.column_count()), (2, 2));
        assert_eq!(cells_of(editor.doc, row).len(), 2);
        assert_eq!(grid.cell_at(1, 0), Some(cells_of(editor.doc, row)[0]));

        let a = grid.cell_at(0, 0).unwrap();
        assert_eq!(editor.doc.attribute(a, "rowspan"), None);
        assert_eq!(grid.cell_bounds(a).unwrap().row_span(), 1);
    }

    #[test]
    fn test_oversized_spans_are_clamped() {
        let (doc, table) = table_doc(vec![vec![
            cell("a").with_attr("colspan", "1000000000"),
            cell("b").with_attr("rowspan", "99999999"),
        ]]);
        let grid = TableGrid::analyze(&doc, table);
        assert_eq!(grid.column_count(), MAX_COLSPAN + 1);

        let b = grid.cell_at(0, MAX_COLSPAN).unwrap();
        assert_eq!(span(&doc, b, "rowspan"), MAX_ROWSPAN);
        assert_eq!(grid.cell_bounds(b).unwrap().row_span(), 1);
    }

    #[test]
    fn test_rows_without_tbody() {
        let doc = Document::with_body([ContentNode::element("table")
            .with_child(ContentNode::element("tr").with_child(cell("x")))
            .with_child(
                ContentNode::element("thead")
                    .with_child(ContentNode::element("tr").with_child(cell("y"))),
            )]);
        let table = doc.child_at(doc.root(), 0).unwrap();
        let grid = TableGrid::analyze(&doc, table);
        assert_eq!(grid.row_count(), 2);
        assert_eq!(text_at(&doc, &grid, 1, 0), "y");
    }

    #[test]
    fn test_stale_handle_is_rejected() {
        let (mut doc, table) = simple2x2();
        let config = TableConfig::default();
        let root = doc.root();
        assert!(TableEditor::new(&mut doc, root, &config).is_none());

        doc.remove(table);
        assert!(TableEditor::new(&mut doc, table, &config).is_none());
    }

    #[test]
    fn test_insert_row_end_with_rowspan() {
        let (mut doc, table) = table_doc(vec![
            vec![cell("a").with_attr("rowspan", "2"), cell("b")],
            vec![cell("c")],
        ]);
        let config = TableConfig::default();
        let mut editor = TableEditor::new(&mut doc, table, &config).unwrap();

        let row = editor.insert_row_end().unwrap();
        let grid = editor.analyze();
        assert_eq!(grid.row_count(), 3);
        assert_eq!(grid.rows()[2], row);
        assert_eq!(grid.cells_in_row(2).len(), 2);
        assert!(grid.cell_at(2, 1).is_some());
    }

    #[test]
    fn test_insert_row_inside_span_grows_it() {
        let (mut doc, table) = table_doc(vec![
            vec![cell("a").with_attr("rowspan", "2"), cell("b")],
            vec![cell("c")],
        ]);
        let config = TableConfig::default();
        let mut editor = TableEditor::new(&mut doc, table, &config).unwrap();

        editor.insert_row_at(1).unwrap();
        let grid = editor.analyze();
        let a = grid.cell_at(0, 0).unwrap();
        assert_eq!(grid.cell_bounds(a).unwrap().row_span(), 3);
        assert_eq!(grid.cells_in_row(1), vec![a, grid.cell_at(1, 1).unwrap()]);
        assert_eq!(editor.doc.text_content(grid.cell_at(2, 1).unwrap()), "c");
    }

    #[test]
    fn test_insert_row_before_and_after() {
        let (mut doc, table) = simple2x2();
        let config = TableConfig::default();
        let mut editor = TableEditor::new(&mut doc, table, &config).unwrap();
        let d = editor.cell_at(1, 1).unwrap();

        editor.insert_row_before(d).unwrap();
        editor.insert_row_after(d).unwrap();
        let grid = editor.analyze();
        assert_eq!(grid.row_count(), 4);
        assert_eq!(grid.cell_bounds(d).unwrap().start_row, 2);
        assert_eq!(editor.doc.text_content(grid.cell_at(3, 0).unwrap()), "");
    }

    #[test]
    fn test_delete_row_end_shrinks_spans() {
        let (mut doc, table) = table_doc(vec![
            vec![cell("a").with_attr("rowspan", "2"), cell("b")],
            vec![cell("c")],
        ]);
        let config = TableConfig::default();
        let mut editor = TableEditor::new(&mut doc, table, &config).unwrap();
        let a = editor.cell_at(0, 0).unwrap();

        assert!(editor.delete_row_end());
        let grid = editor.analyze();
        assert_eq!(grid.row_count(), 1);
        assert_eq!(editor.doc.attribute(a, "rowspan"), None);
        assert_eq!(grid.cell_bounds(a).unwrap().row_span(), 1);
    }

    #[test]
    fn test_delete_row_moves_anchored_span_down() {
        let (mut doc, table) = table_doc(vec![
            vec![cell("a"), cell("b").with_attr("rowspan", "2")],
            vec![cell("c")],
            vec![cell("d"), cell("e")],
        ]);
        let config = TableConfig::default();
        let mut editor = TableEditor::new(&mut doc, table, &config).unwrap();
        let b = editor.cell_at(0, 1).unwrap();

        assert!(editor.delete_row_at(0));
        let grid = editor.analyze();
        assert_eq!(grid.row_count(), 2);
        assert_eq!(grid.cell_at(0, 1), Some(b));
        assert_eq!(grid.cell_bounds(b).unwrap().row_span(), 1);
        assert_eq!(editor.doc.text_content(grid.cell_at(0, 0).unwrap()), "c");
        assert_eq!(editor.doc.text_content(grid.cell_at(1, 1).unwrap()), "e");
    }

    #[test]
    fn test_last_row_and_column_are_kept() {
        let (mut doc, table) = table_doc(vec![vec![cell("only")]]);
        let config = TableConfig::default();
        let mut editor = TableEditor::new(&mut doc, table, &config).unwrap();
        assert!(!editor.delete_row_end());
        assert!(!editor.delete_column_end());
        assert_eq!(editor.analyze().row_count(), 1);
    }

    #[test]
    fn test_delete_column_end_on_simple2x2() {
        let (mut doc, table) = simple2x2();
        let config = TableConfig::default();
        let mut editor = TableEditor::new(&mut doc, table, &config).unwrap();

        assert!(editor.delete_column_end());
        let grid = editor.analyze();
        assert_eq!(grid.column_count(), 1);
        assert_eq!(grid.row_count(), 2);
        for r in 0..2 {
            let cell = grid.cell_at(r, 0).unwrap();
            assert_eq!(editor.doc.attribute(cell, "colspan"), None);
        }
        assert_eq!(editor.doc.text_content(grid.cell_at(1, 0).unwrap()), "c");
    }

    #[test]
    fn test_delete_column_narrows_spanning_cell() {
        let (mut doc, table) = table_doc(vec![
            vec![cell("title").with_attr("colspan", "2")],
            vec![cell("c"), cell("d")],
        ]);
        let config = TableConfig::default();
        let mut editor = TableEditor::new(&mut doc, table, &config).unwrap();
        let title = editor.cell_at(0, 0).unwrap();

        assert!(editor.delete_column_end());
        let grid = editor.analyze();
        assert_eq!(grid.column_count(), 1);
        assert_eq!(grid.cell_at(0, 0), Some(title));
        assert_eq!(editor.doc.attribute(title, "colspan"), None);
    }

    #[test]
    fn test_insert_column_end_with_full_width_header() {
        let (mut doc, table) = table_doc(vec![
            vec![cell("title").with_attr("colspan", "3")],
            vec![cell("a"), cell("b"), cell("c")],
        ]);
        let config = TableConfig::default();
        let mut editor = TableEditor::new(&mut doc, table, &config).unwrap();
        let title = editor.cell_at(0, 0).unwrap();

        assert_eq!(editor.insert_column_end(), 2);
        let grid = editor.analyze();
        assert_eq!(grid.column_count(), 4);
        // The header keeps its span and the appended cell takes the new slot
        assert_eq!(grid.cell_bounds(title).unwrap().col_span(), 3);
        assert!(grid.cell_at(0, 3).is_some_and(|c| c != title));
        assert!(grid.cell_at(1, 3).is_some());
    }

    #[test]
    fn test_insert_column_inside_span_widens_it() {
        let (mut doc, table) = table_doc(vec![
            vec![cell("title").with_attr("colspan", "2")],
            vec![cell("a"), cell("b")],
        ]);
        let config = TableConfig::default();
        let mut editor = TableEditor::new(&mut doc, table, &config).unwrap();
        let title = editor.cell_at(0, 0).unwrap();

        assert_eq!(editor.insert_column_at(1), 1);
        let grid = editor.analyze();
        assert_eq!(grid.column_count(), 3);
        assert_eq!(grid.cell_bounds(title).unwrap().col_span(), 3);
        assert_eq!(editor.doc.text_content(grid.cell_at(1, 0).unwrap()), "a");
        assert_eq!(editor.doc.text_content(grid.cell_at(1, 1).unwrap()), "");
        assert_eq!(editor.doc.text_content(grid.cell_at(1, 2).unwrap()), "b");
    }

    #[test]
    fn test_insert_column_before_under_rowspan() {
        let (mut doc, table) = table_doc(vec![
            vec![cell("a"), cell("b").with_attr("rowspan", "2")],
            vec![cell("c")],
        ]);
        let config = TableConfig::default();
        let mut editor = TableEditor::new(&mut doc, table, &config).unwrap();
        let b = editor.cell_at(0, 1).unwrap();

        assert_eq!(editor.insert_column_before(b), 2);
        let grid = editor.analyze();
        assert_eq!(grid.column_count(), 3);
        assert_eq!(grid.cell_bounds(b).unwrap().start_col, 2);
        assert_eq!(grid.cell_at(1, 2), Some(b));
        assert!(grid.cell_at(1, 1).is_some());
    }

    #[test]
    fn test_out_of_range_indices_are_no_ops() {
        let (mut doc, table) = simple2x2();
        let config = TableConfig::default();
        let mut editor = TableEditor::new(&mut doc, table, &config).unwrap();
        let before = editor.analyze();

        assert_eq!(editor.insert_row_at(5), None);
        assert!(!editor.delete_row_at(2));
        assert_eq!(editor.insert_column_at(3), 0);
        assert!(!editor.delete_column_at(2));
        assert_eq!(editor.set_row_height(2, 40), None);
        assert_eq!(editor.set_column_width(2, 80), None);
        assert_eq!(editor.analyze(), before);
    }

    #[test]
    fn test_merge_then_split_restores_shape() {
        let (mut doc, table) = table_doc(vec![
            vec![cell("a"), cell("b"), cell("c")],
            vec![cell("d"), cell("e"), cell("f")],
            vec![cell("g"), cell("h"), cell("i")],
        ]);
        let config = TableConfig::default();
        let mut editor = TableEditor::new(&mut doc, table, &config).unwrap();
        let grid = editor.analyze();
        let selection = vec![
            grid.cell_at(0, 0).unwrap(),
            grid.cell_at(0, 1).unwrap(),
            grid.cell_at(1, 0).unwrap(),
            grid.cell_at(1, 1).unwrap(),
        ];

        let merged = editor.merge_cells(&selection).unwrap();
        let grid = editor.analyze();
        assert_eq!(merged, selection[0]);
        assert_eq!(grid.cell_at(1, 1), Some(merged));
        assert_eq!(
            grid.cell_bounds(merged),
            Some(CellBounds {
                start_row: 0,
                end_row: 1,
                start_col: 0,
                end_col: 1,
            })
        );
        assert_eq!(editor.doc.text_content(merged), "abde");
        assert_eq!(editor.doc.text_content(grid.cell_at(1, 2).unwrap()), "f");

        assert!(editor.split_cell(merged));
        let grid = editor.analyze();
        let mut distinct = HashSet::new();
        for r in 0..2 {
            for c in 0..2 {
                distinct.insert(grid.cell_at(r, c).unwrap());
            }
        }
        assert_eq!(distinct.len(), 4);
        assert_eq!(grid.column_count(), 3);
        assert_eq!(editor.doc.text_content(grid.cell_at(0, 2).unwrap()), "c");
        assert_eq!(editor.doc.text_content(grid.cell_at(1, 2).unwrap()), "f");
    }

    #[test]
    fn test_merge_rejects_non_rectangular() {
        let (mut doc, table) = table_doc(vec![
            vec![cell("a"), cell("b")],
            vec![cell("c"), cell("d")],
        ]);
        let config = TableConfig::default();
        let mut editor = TableEditor::new(&mut doc, table, &config).unwrap();
        let grid = editor.analyze();
        let diagonal = [grid.cell_at(0, 0).unwrap(), grid.cell_at(1, 1).unwrap()];
        assert_eq!(editor.merge_cells(&diagonal), None);
        assert_eq!(editor.merge_cells(&diagonal[..1]), None);
        assert_eq!(editor.analyze(), grid);
    }

    #[test]
    fn test_split_single_cell_is_no_op() {
        let (mut doc, table) = simple2x2();
        let config = TableConfig::default();
        let mut editor = TableEditor::new(&mut doc, table, &config).unwrap();
        let a = editor.cell_at(0, 0).unwrap();
        assert!(!editor.split_cell(a));
    }

    #[test]
    fn test_row_height_clamps_below_floor() {
        let (mut doc, table) = simple2x2();
        let config = TableConfig::default();
        let mut editor = TableEditor::new(&mut doc, table, &config).unwrap();

        assert_eq!(editor.set_row_height(0, 10), Some(32));
        assert_eq!(editor.set_row_height(1, 48), Some(48));
        let grid = editor.analyze();
        assert_eq!(editor.doc.style(grid.rows()[0], "height"), Some("32px"));
        assert_eq!(editor.doc.style(grid.cell_at(1, 1).unwrap(), "height"), Some("48px"));
    }

    #[test]
    fn test_column_width_sizes_spanning_cell_once() {
        let (mut doc, table) = table_doc(vec![
            vec![cell("title").with_attr("colspan", "2")],
            vec![cell("a"), cell("b")],
        ]);
        let config = TableConfig::default();
        let mut editor = TableEditor::new(&mut doc, table, &config).unwrap();

        assert_eq!(editor.set_column_width(0, 100), Some(100));
        let grid = editor.analyze();
        let title = grid.cell_at(0, 0).unwrap();
        assert_eq!(editor.doc.style(title, "width"), Some("100px"));
        assert_eq!(editor.doc.style(grid.cell_at(1, 0).unwrap(), "width"), Some("100px"));
        assert_eq!(editor.doc.style(grid.cell_at(1, 1).unwrap(), "width"), None);

        assert_eq!(editor.set_column_width(1, 20), Some(60));
    }

    #[test]
    fn test_apply_column_widths() {
        let (mut doc, table) = table_doc(vec![
            vec![cell("title").with_attr("colspan", "2")],
            vec![cell("a"), cell("b")],
        ]);
        let config = TableConfig::default();
        let mut editor = TableEditor::new(&mut doc, table, &config).unwrap();

        assert_eq!(editor.apply_column_widths(&[100, 150, 999]), 3);
        let grid = editor.analyze();
        assert_eq!(editor.doc.style(grid.cell_at(0, 0).unwrap(), "width"), Some("100px"));
        assert_eq!(editor.doc.style(grid.cell_at(1, 1).unwrap(), "width"), Some("150px"));
    }

    #[test]
    fn test_column_metrics_and_resize() {
        let (mut doc, table) = table_doc(vec![
            vec![cell("a").with_style("width", "100px"), cell("b")],
            vec![cell("c"), cell("d")],
        ]);
        let config = TableConfig::default();
        let mut editor = TableEditor::new(&mut doc, table, &config).unwrap();

        assert_eq!(
            editor.column_metrics(),
            vec![
                ColumnMetric { index: 0, width: 100, left: 0 },
                ColumnMetric { index: 1, width: 120, left: 100 },
            ]
        );

        assert_eq!(editor.resize_column(0, 25), Some(125));
        assert_eq!(editor.resize_column(1, -100), Some(60));
        assert_eq!(editor.column_metrics()[1].left, 125);
        assert_eq!(editor.resize_column(7, 10), None);
    }

    #[test]
    fn test_column_metrics_saturate_on_huge_widths() {
        let (mut doc, table) = table_doc(vec![vec![
            cell("a").with_style("width", "3000000000px"),
            cell("b").with_style("width", "3000000000px"),
            cell("c"),
        ]]);
        let config = TableConfig::default();
        let editor = TableEditor::new(&mut doc, table, &config).unwrap();

        let metrics = editor.column_metrics();
        assert_eq!(metrics[1].left, 3_000_000_000);
        assert_eq!(metrics[2].left, u32::MAX);
    }

    #[test]
    fn test_create_table() {
        let mut doc = Document::new();
        let root = doc.root();
        let table = create_table(&mut doc, root, 0, 3);
        let grid = TableGrid::analyze(&doc, table);
        assert_eq!(grid.row_count(), 1);
        assert_eq!(grid.column_count(), 3);

        let td = grid.cell_at(0, 2).unwrap();
        assert_eq!(enclosing_table(&doc, td), Some(table));
    }

    #[test]
    fn test_create_table_caps_dimensions() {
        let mut doc = Document::new();
        let root = doc.root();
        let table = create_table(&mut doc, root, 1_000_000, 5);
        let grid = TableGrid::analyze(&doc, table);
        assert_eq!(grid.row_count(), MAX_NEW_TABLE_DIMENSION);
        assert_eq!(grid.column_count(), 5);
    }
}
