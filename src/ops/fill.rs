// ============================================================================
// FLOOD FILL – 4-connected region replace
// ============================================================================

use crate::canvas::{Cell, PixelGrid};

/// Replace the 4-connected region of `target` cells around `start` with
/// `replacement`.
///
/// Uses an explicit DFS stack so a full 256×256 region never recurses. A
/// popped index is only painted if it still holds `target`, so no cell is
/// painted twice. Returns `true` when any cell changed.
pub fn flood_fill(grid: &mut PixelGrid, start: Option<usize>, target: Cell, replacement: Cell) -> bool {
    let Some(start) = start else { return false };
    if target == replacement || start >= grid.len() {
        return false;
    }

    let mut changed = false;
    let mut stack: Vec<usize> = Vec::with_capacity(1024);
    stack.push(start);

    while let Some(idx) = stack.pop() {
        if grid.get(idx) != target {
            continue;
        }
        grid.set(idx, replacement);
        changed = true;
        stack.extend(grid.neighbors(idx));
    }

    changed
}

/// Fill starting at `start`, taking the target from the cell itself.
pub fn fill_at(grid: &mut PixelGrid, start: usize, replacement: Cell) -> bool {
    let target = grid.get(start);
    flood_fill(grid, Some(start), target, replacement)
}
