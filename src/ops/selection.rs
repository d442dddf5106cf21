// ============================================================================
// SELECTION – marquee / lasso hit-testing and lift-move-commit of cells
// ============================================================================

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

use crate::canvas::{Cell, Color, PixelGrid, Point};
use crate::components::history::HistoryManager;

/// Set of selected grid indices.
pub type Selection = BTreeSet<usize>;

/// Geometry collected while dragging with the select tool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SelectionShape {
    /// Axis-aligned box between the drag start and the current pointer.
    #[default]
    Rectangle,
    /// Polyline lasso closed back to its first point.
    Freehand,
}

/// Every selection gesture is in exactly one of these states.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum SelectionState {
    #[default]
    Idle,
    Selecting {
        shape: SelectionShape,
        /// Canvas pixel coordinates. Always `[start, current]` for rectangles.
        path: Vec<Point>,
    },
    Selected {
        cells: Selection,
    },
    Moving {
        cells: Selection,
        /// Original index → colour at lift time, for every selected cell.
        buffer: BTreeMap<usize, Cell>,
        drag_start: Point,
        /// Pixel-space displacement; snapped to cells only on commit.
        offset: Point,
    },
}

// ----------------------------------------------------------------------------
// Hit-testing
// ----------------------------------------------------------------------------

/// Range of cells along one axis whose centres lie within `[a, b]` (either order).
fn cell_span(a: f32, b: f32, cell_size: f32, cells: u32) -> Option<(u32, u32)> {
    if !(cell_size > 0.0) || cells == 0 {
        return None;
    }
    let (lo, hi) = (a.min(b), a.max(b));
    let first = (lo / cell_size - 0.5).ceil().max(0.0);
    let last = (hi / cell_size - 0.5).floor().min(cells as f32 - 1.0);
    if !(first <= last) {
        return None;
    }
    Some((first as u32, last as u32))
}

/// Cells whose centre falls inside the box spanned by `start` and `end`, inclusive.
pub fn rect_selection(start: Point, end: Point, width: u32, height: u32, cell_size: f32) -> Selection {
    let mut out = Selection::new();
    let (Some((x0, x1)), Some((y0, y1))) = (
        cell_span(start.x, end.x, cell_size, width),
        cell_span(start.y, end.y, cell_size, height),
    ) else {
        return out;
    };
    for y in y0..=y1 {
        for x in x0..=x1 {
            out.insert((y * width + x) as usize);
        }
    }
    out
}

/// Even-odd ray casting. Points exactly on an edge may land either way.
pub fn point_in_polygon(p: Point, polygon: &[Point]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (polygon[i], polygon[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn has_three_distinct(path: &[Point]) -> bool {
    let mut seen: Vec<Point> = Vec::with_capacity(3);
    for p in path {
        if !seen.contains(p) {
            seen.push(*p);
            if seen.len() == 3 {
                return true;
            }
        }
    }
    false
}

/// Cells whose centre lies inside the closed lasso `path`.
/// Fewer than three distinct points select nothing.
pub fn lasso_selection(path: &[Point], width: u32, height: u32, cell_size: f32) -> Selection {
    let mut out = Selection::new();
    if !has_three_distinct(path) {
        return out;
    }
    let (mut min, mut max) = (path[0], path[0]);
    for p in path {
        min = Point::new(min.x.min(p.x), min.y.min(p.y));
        max = Point::new(max.x.max(p.x), max.y.max(p.y));
    }
    let (Some((x0, x1)), Some((y0, y1))) = (
        cell_span(min.x, max.x, cell_size, width),
        cell_span(min.y, max.y, cell_size, height),
    ) else {
        return out;
    };
    for y in y0..=y1 {
        for x in x0..=x1 {
            let centre = Point::new((x as f32 + 0.5) * cell_size, (y as f32 + 0.5) * cell_size);
            if point_in_polygon(centre, path) {
                out.insert((y * width + x) as usize);
            }
        }
    }
    out
}

// ----------------------------------------------------------------------------
// Engine
// ----------------------------------------------------------------------------

/// Owns the live selection and the floating buffer. Grid writes go through
/// the supplied [`HistoryManager`]: lift and cancel are silent, commit,
/// delete and fill are recorded.
#[derive(Clone, Debug, Default)]
pub struct SelectionEngine {
    state: SelectionState,
}

impl SelectionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    /// The marked cells, while selected or moving.
    pub fn selection(&self) -> Option<&Selection> {
        match &self.state {
            SelectionState::Selected { cells } | SelectionState::Moving { cells, .. } => Some(cells),
            _ => None,
        }
    }

    /// True when a non-empty selection is live.
    pub fn has_selection(&self) -> bool {
        self.selection().is_some_and(|s| !s.is_empty())
    }

    pub fn contains(&self, index: usize) -> bool {
        self.selection().is_some_and(|s| s.contains(&index))
    }

    pub fn is_selecting(&self) -> bool {
        matches!(self.state, SelectionState::Selecting { .. })
    }

    pub fn is_moving(&self) -> bool {
        matches!(self.state, SelectionState::Moving { .. })
    }

    /// In-progress drag path, for drawing the marquee or lasso outline.
    pub fn path(&self) -> &[Point] {
        match &self.state {
            SelectionState::Selecting { path, .. } => path,
            _ => &[],
        }
    }

    pub fn move_offset(&self) -> Option<Point> {
        match &self.state {
            SelectionState::Moving { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    /// Painted cells of the floating buffer, keyed by their original index.
    pub fn floating_cells(&self) -> Vec<(usize, Color)> {
        match &self.state {
            SelectionState::Moving { buffer, .. } => buffer
                .iter()
                .filter_map(|(i, c)| c.map(|c| (*i, c)))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// `grid` with any floating cells put back where they were lifted from.
    /// Borrowed unless a move is in flight.
    pub fn settled<'a>(&self, grid: &'a PixelGrid) -> Cow<'a, PixelGrid> {
        match &self.state {
            SelectionState::Moving { buffer, .. } => {
                let mut settled = grid.clone();
                for (&i, &cell) in buffer {
                    settled.set(i, cell);
                }
                Cow::Owned(settled)
            }
            _ => Cow::Borrowed(grid),
        }
    }

    /// Pointer pressed with the select tool. Inside the live selection this
    /// lifts it; anywhere else it starts a fresh selection.
    pub fn pointer_down(
        &mut self,
        history: &mut HistoryManager<PixelGrid>,
        point: Point,
        index: Option<usize>,
        shape: SelectionShape,
    ) {
        if self.is_moving() {
            self.cancel_gesture(history);
        }
        match std::mem::take(&mut self.state) {
            SelectionState::Selected { cells } if index.is_some_and(|i| cells.contains(&i)) => {
                self.lift(history, cells, point);
            }
            _ => {
                self.state = SelectionState::Selecting { shape, path: vec![point] };
            }
        }
    }

    fn lift(&mut self, history: &mut HistoryManager<PixelGrid>, cells: Selection, point: Point) {
        let mut grid = history.state().clone();
        let buffer: BTreeMap<usize, Cell> = cells.iter().map(|&i| (i, grid.get(i))).collect();
        for &i in &cells {
            grid.set(i, None);
        }
        history.silent_set(grid);
        self.state = SelectionState::Moving {
            cells,
            buffer,
            drag_start: point,
            offset: Point::ZERO,
        };
    }

    /// Pointer moved. Never touches the grid.
    pub fn pointer_move(&mut self, point: Point) {
        match &mut self.state {
            SelectionState::Selecting { shape: SelectionShape::Rectangle, path } => {
                let start = path.first().copied().unwrap_or(point);
                *path = vec![start, point];
            }
            SelectionState::Selecting { shape: SelectionShape::Freehand, path } => {
                path.push(point);
            }
            SelectionState::Moving { drag_start, offset, .. } => {
                *offset = point - *drag_start;
            }
            _ => {}
        }
    }

    /// Pointer released: finish a selection drag or commit a move.
    pub fn pointer_up(&mut self, history: &mut HistoryManager<PixelGrid>, cell_size: f32, content_only: bool) {
        match std::mem::take(&mut self.state) {
            SelectionState::Selecting { shape, path } => {
                let grid = history.state();
                let mut cells = match shape {
                    SelectionShape::Rectangle => match (path.first(), path.last()) {
                        (Some(a), Some(b)) => rect_selection(*a, *b, grid.width(), grid.height(), cell_size),
                        _ => Selection::new(),
                    },
                    SelectionShape::Freehand => lasso_selection(&path, grid.width(), grid.height(), cell_size),
                };
                if content_only {
                    cells.retain(|&i| grid.get(i).is_some());
                }
                if !cells.is_empty() {
                    self.state = SelectionState::Selected { cells };
                }
            }
            SelectionState::Moving { buffer, offset, .. } => {
                self.commit(history, buffer, offset, cell_size);
            }
            other => self.state = other,
        }
    }

    /// Write the floating cells at `offset` (snapped to whole cells) and
    /// select where they landed. Destinations off the grid are dropped; if
    /// none remain the engine ends up Idle with no selection.
    fn commit(
        &mut self,
        history: &mut HistoryManager<PixelGrid>,
        buffer: BTreeMap<usize, Cell>,
        offset: Point,
        cell_size: f32,
    ) {
        let (dx, dy) = if cell_size > 0.0 {
            ((offset.x / cell_size).round() as i64, (offset.y / cell_size).round() as i64)
        } else {
            (0, 0)
        };

        let mut grid = history.state().clone();
        let mut moved = Selection::new();
        for (&src, &cell) in &buffer {
            let Some((x, y)) = grid.coords_of(src) else { continue };
            let Some(dst) = grid.index_of(x as i64 + dx, y as i64 + dy) else { continue };
            moved.insert(dst);
            if cell.is_some() {
                grid.set(dst, cell);
            }
        }

        if grid == *history.committed() {
            history.silent_set(grid);
        } else {
            history.record(grid);
        }
        // Everything clipped off the grid: no selection survives, stay Idle.
        if !moved.is_empty() {
            self.state = SelectionState::Selected { cells: moved };
        }
    }

    /// Interrupt. Moving → restore lifted cells and keep the selection;
    /// selecting → drop the path; selected → deselect.
    pub fn cancel(&mut self, history: &mut HistoryManager<PixelGrid>) {
        match std::mem::take(&mut self.state) {
            SelectionState::Moving { cells, buffer, .. } => {
                restore(history, &buffer);
                self.state = SelectionState::Selected { cells };
            }
            SelectionState::Selecting { .. } | SelectionState::Selected { .. } | SelectionState::Idle => {}
        }
    }

    /// Abort an in-flight drag (selecting or moving) but keep a settled selection.
    pub fn cancel_gesture(&mut self, history: &mut HistoryManager<PixelGrid>) {
        if self.is_moving() || self.is_selecting() {
            self.cancel(history);
        }
    }

    /// Drop everything without touching the grid. Callers cancel a move first.
    pub fn clear(&mut self) {
        self.state = SelectionState::Idle;
    }

    /// Empty every selected cell as one recorded edit. The selection stays.
    pub fn delete_selected(&mut self, history: &mut HistoryManager<PixelGrid>) -> bool {
        self.write_selected(history, None)
    }

    /// Paint every selected cell with `color` as one recorded edit.
    pub fn fill_selected(&mut self, history: &mut HistoryManager<PixelGrid>, color: Color) -> bool {
        self.write_selected(history, Some(color))
    }

    fn write_selected(&mut self, history: &mut HistoryManager<PixelGrid>, value: Cell) -> bool {
        let SelectionState::Selected { cells } = &self.state else { return false };
        let mut grid = history.state().clone();
        let mut changed = false;
        for &i in cells {
            changed |= grid.set(i, value);
        }
        if changed {
            history.record(grid);
        }
        changed
    }
}

fn restore(history: &mut HistoryManager<PixelGrid>, buffer: &BTreeMap<usize, Cell>) {
    let mut grid = history.state().clone();
    for (&i, &cell) in buffer {
        grid.set(i, cell);
    }
    history.silent_set(grid);
}
