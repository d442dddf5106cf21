use image::{Rgba, RgbaImage};
use pixelpattern::canvas::{MAX_SIZE, PixelGrid};
use pixelpattern::components::colors::COLOR_HISTORY_LEN;
use pixelpattern::ops::import::import_image;
use pixelpattern::ops::selection::{SelectionShape, SelectionState};
use pixelpattern::{CanvasRect, Color, FixedAnswer, PointerEvent, Project, Tool};

const RED: Color = Color::new(0xFF, 0x00, 0x00);
const BLUE: Color = Color::new(0x00, 0x00, 0xFF);

/// A project whose canvas sits at (100, 50) on screen, 20px cells.
struct Editor {
    project: Project,
    rect: CanvasRect,
}

impl Editor {
    fn new(w: u32, h: u32) -> Self {
        let project = Project::new_untitled(1, w, h).unwrap();
        let rect = CanvasRect::new(100.0, 50.0, w as f32 * 20.0, h as f32 * 20.0);
        Self { project, rect }
    }

    /// Screen point of the centre of cell (x, y).
    fn at(&self, x: u32, y: u32) -> (f32, f32) {
        (self.rect.left + x as f32 * 20.0 + 10.0, self.rect.top + y as f32 * 20.0 + 10.0)
    }

    fn click(&mut self, x: u32, y: u32) {
        let (sx, sy) = self.at(x, y);
        self.project.handle_pointer(PointerEvent::down(sx, sy), &self.rect);
        self.project.handle_pointer(PointerEvent::up(sx, sy), &self.rect);
    }

    /// Press at canvas pixel `from`, drag to `to`, release.
    fn drag_px(&mut self, from: (f32, f32), to: (f32, f32)) {
        let (l, t) = (self.rect.left, self.rect.top);
        self.project.handle_pointer(PointerEvent::down(l + from.0, t + from.1), &self.rect);
        self.project.handle_pointer(PointerEvent::drag(l + to.0, t + to.1), &self.rect);
        self.project.handle_pointer(PointerEvent::up(l + to.0, t + to.1), &self.rect);
    }

    fn paint(&mut self, color: Color, cells: &[(u32, u32)]) {
        self.project.set_tool(Tool::Pencil);
        self.project.set_color(color);
        for &(x, y) in cells {
            self.click(x, y);
        }
    }

    fn cell(&self, x: u32, y: u32) -> Option<Color> {
        let g = self.project.grid();
        g.get(g.index_of(x as i64, y as i64).unwrap())
    }

    fn selected(&self) -> Vec<usize> {
        self.project
            .selection()
            .selection()
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }
}

#[test]
fn new_grids_are_empty_and_sized() {
    for (w, h) in [(1, 1), (32, 32), (7, 3), (MAX_SIZE, MAX_SIZE)] {
        let g = PixelGrid::new(w, h).unwrap();
        assert_eq!(g.len(), (w * h) as usize);
        assert!(g.cells().iter().all(Option::is_none));
    }
    assert!(PixelGrid::new(0, 5).is_err());
    assert!(PixelGrid::new(5, MAX_SIZE + 1).is_err());
}

#[test]
fn painting_same_colour_twice_records_once() {
    let mut ed = Editor::new(4, 4);
    ed.paint(RED, &[(1, 1), (1, 1)]);
    assert_eq!(ed.project.history().undo_count(), 1);
    assert_eq!(ed.cell(1, 1), Some(RED));
}

#[test]
fn fill_covers_open_grid_in_one_step() {
    let mut ed = Editor::new(5, 5);
    ed.project.set_color(RED);
    ed.project.set_tool(Tool::Fill);
    ed.click(2, 2);
    assert_eq!(ed.project.grid().painted_count(), 25);
    assert!(ed.project.grid().cells().iter().all(|c| *c == Some(RED)));
    assert_eq!(ed.project.history().undo_count(), 1);
}

#[test]
fn fill_stops_at_walls() {
    let mut ed = Editor::new(5, 5);
    let wall: Vec<(u32, u32)> = (0..5).map(|y| (2, y)).collect();
    ed.paint(Color::BLACK, &wall);

    ed.project.set_color(RED);
    ed.project.set_tool(Tool::Fill);
    ed.click(0, 0);
    for y in 0..5 {
        assert_eq!(ed.cell(0, y), Some(RED));
        assert_eq!(ed.cell(1, y), Some(RED));
        assert_eq!(ed.cell(2, y), Some(Color::BLACK));
        assert_eq!(ed.cell(3, y), None);
        assert_eq!(ed.cell(4, y), None);
    }
}

#[test]
fn fill_with_same_colour_is_noop() {
    let mut ed = Editor::new(3, 3);
    ed.paint(RED, &[(0, 0)]);
    let before = ed.project.grid().clone();
    ed.project.set_tool(Tool::Fill);
    ed.click(0, 0);
    assert_eq!(*ed.project.grid(), before);
    assert_eq!(ed.project.history().undo_count(), 1);
}

#[test]
fn rectangle_selection_by_cell_centre() {
    let mut ed = Editor::new(10, 10);
    ed.project.set_tool(Tool::Select);
    ed.drag_px((0.0, 0.0), (39.0, 39.0));
    assert_eq!(ed.selected(), vec![0, 1, 10, 11]);

    // Dragging up-left from outside the selection starts a new box.
    ed.drag_px((99.0, 99.0), (60.0, 60.0));
    assert_eq!(ed.selected(), vec![33, 34, 43, 44]);
}

#[test]
fn lasso_needs_three_points() {
    let mut ed = Editor::new(10, 10);
    ed.project.set_tool(Tool::Select);
    ed.project.tools.selection_shape = SelectionShape::Freehand;
    ed.drag_px((5.0, 5.0), (150.0, 150.0));
    assert_eq!(*ed.project.selection().state(), SelectionState::Idle);
    assert!(!ed.project.selection().has_selection());
}

#[test]
fn lasso_selects_enclosed_cells() {
    let mut ed = Editor::new(10, 10);
    ed.project.set_tool(Tool::Select);
    ed.project.tools.selection_shape = SelectionShape::Freehand;
    let (l, t) = (ed.rect.left, ed.rect.top);
    ed.project.handle_pointer(PointerEvent::down(l, t), &ed.rect);
    for (x, y) in [(60.0, 0.0), (60.0, 60.0), (0.0, 60.0)] {
        ed.project.handle_pointer(PointerEvent::drag(l + x, t + y), &ed.rect);
    }
    ed.project.handle_pointer(PointerEvent::up(l, t + 60.0), &ed.rect);
    assert_eq!(ed.selected(), vec![0, 1, 2, 10, 11, 12, 20, 21, 22]);
}

#[test]
fn content_only_selection_drops_empty_cells() {
    let mut ed = Editor::new(10, 10);
    ed.paint(RED, &[(1, 0)]);
    ed.project.set_tool(Tool::Select);
    ed.project.tools.content_only = true;
    ed.drag_px((0.0, 0.0), (39.0, 39.0));
    assert_eq!(ed.selected(), vec![1]);
}

#[test]
fn move_clips_at_right_edge() {
    let mut ed = Editor::new(10, 10);
    ed.paint(RED, &[(8, 0), (9, 0), (8, 1), (9, 1)]);
    ed.paint(BLUE, &[(0, 1), (0, 2)]);
    let undo_before = ed.project.history().undo_count();

    ed.project.set_tool(Tool::Select);
    ed.drag_px((160.0, 0.0), (199.0, 39.0));
    assert_eq!(ed.selected(), vec![8, 9, 18, 19]);

    // Press inside, drag one cell right.
    ed.drag_px((170.0, 10.0), (190.0, 10.0));

    assert_eq!(ed.cell(8, 0), None);
    assert_eq!(ed.cell(8, 1), None);
    assert_eq!(ed.cell(9, 0), Some(RED));
    assert_eq!(ed.cell(9, 1), Some(RED));
    // No wraparound into the next row.
    assert_eq!(ed.cell(0, 1), Some(BLUE));
    assert_eq!(ed.cell(0, 2), Some(BLUE));
    assert_eq!(ed.project.grid().painted_count(), 4);
    assert_eq!(ed.selected(), vec![9, 19]);

    assert_eq!(ed.project.history().undo_count(), undo_before + 1);
    ed.project.undo();
    assert_eq!(ed.cell(8, 0), Some(RED));
    assert_eq!(ed.cell(9, 1), Some(RED));
}

#[test]
fn cancelled_move_restores_cells() {
    let mut ed = Editor::new(6, 6);
    ed.paint(RED, &[(1, 1), (2, 1)]);
    let before = ed.project.grid().clone();
    let undo_before = ed.project.history().undo_count();

    ed.project.set_tool(Tool::Select);
    ed.drag_px((20.0, 20.0), (59.0, 39.0));
    let (l, t) = (ed.rect.left, ed.rect.top);
    ed.project.handle_pointer(PointerEvent::down(l + 30.0, t + 30.0), &ed.rect);
    ed.project.handle_pointer(PointerEvent::drag(l + 70.0, t + 90.0), &ed.rect);
    assert!(ed.project.selection().is_moving());
    assert_eq!(ed.cell(1, 1), None);

    ed.project.cancel();
    assert_eq!(*ed.project.grid(), before);
    assert!(!ed.project.selection().is_moving());
    assert!(ed.project.selection().floating_cells().is_empty());
    assert_eq!(ed.selected(), vec![7, 8]);
    assert_eq!(ed.project.history().undo_count(), undo_before);
}

#[test]
fn undo_mid_move_cancels_first() {
    let mut ed = Editor::new(6, 6);
    ed.paint(RED, &[(0, 0)]);
    ed.paint(BLUE, &[(5, 5)]);
    ed.project.set_tool(Tool::Select);
    ed.drag_px((0.0, 0.0), (19.0, 19.0));
    let (l, t) = (ed.rect.left, ed.rect.top);
    ed.project.handle_pointer(PointerEvent::down(l + 10.0, t + 10.0), &ed.rect);

    assert!(ed.project.undo());
    assert_eq!(ed.cell(0, 0), Some(RED));
    assert_eq!(ed.cell(5, 5), None);
}

#[test]
fn history_keeps_last_fifty() {
    let mut ed = Editor::new(8, 8);
    let cells: Vec<(u32, u32)> = (0..60).map(|i| (i % 8, i / 8)).collect();
    ed.paint(RED, &cells);
    assert_eq!(ed.project.history().len(), 50);

    let mut undos = 0;
    for _ in 0..50 {
        if ed.project.undo() {
            undos += 1;
        }
    }
    assert_eq!(undos, 49);
    assert!(!ed.project.can_undo());
    assert_eq!(ed.project.grid().painted_count(), 11);
}

#[test]
fn new_edit_after_undo_discards_redo() {
    let mut ed = Editor::new(4, 4);
    ed.paint(RED, &[(0, 0), (1, 0)]);
    ed.project.undo();
    assert!(ed.project.can_redo());
    ed.paint(BLUE, &[(3, 3)]);
    assert!(!ed.project.can_redo());
    assert!(!ed.project.redo());
}

#[test]
fn resize_leaves_single_timeline_entry() {
    let mut ed = Editor::new(4, 4);
    ed.paint(RED, &[(0, 0), (1, 0)]);
    assert!(ed.project.resize(6, 2, FixedAnswer(true)).unwrap());
    let h = ed.project.history();
    assert_eq!(h.len(), 1);
    assert_eq!(h.committed(), ed.project.grid());
    assert!(!ed.project.can_undo());
    assert!(!ed.project.can_redo());
}

#[test]
fn colour_history_is_bounded_and_deduplicated() {
    let mut ed = Editor::new(16, 1);
    for i in 0..12u8 {
        ed.paint(Color::new(i, i, i), &[(i as u32, 0)]);
    }
    ed.paint(Color::new(3, 3, 3), &[(15, 0)]);

    let colors: Vec<Color> = ed.project.color_history().colors().copied().collect();
    assert_eq!(colors.len(), COLOR_HISTORY_LEN);
    assert_eq!(colors[0], Color::new(3, 3, 3));
    assert_eq!(colors.iter().filter(|c| **c == Color::new(3, 3, 3)).count(), 1);
}

#[test]
fn import_downscales_and_thresholds_alpha() {
    let solid = RgbaImage::from_pixel(500, 100, Rgba([10, 20, 30, 200]));
    let grid = import_image(&solid, 256).unwrap();
    assert_eq!((grid.width(), grid.height()), (256, 51));
    assert!(grid.cells().iter().all(|c| c.map(|c| c.to_hex()).as_deref() == Some("#0A141E")));

    let faint = RgbaImage::from_pixel(500, 100, Rgba([10, 20, 30, 100]));
    let grid = import_image(&faint, 256).unwrap();
    assert!(!grid.has_content());
}

#[test]
fn project_files_round_trip() {
    let dir = std::env::temp_dir().join(format!("pixelpattern_engine_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let mut ed = Editor::new(5, 3);
    ed.paint(RED, &[(0, 0), (4, 2)]);
    for name in ["art.json", "art.pxb"] {
        let path = dir.join(name);
        ed.project.save(Some(&path)).unwrap();
        assert!(!ed.project.is_dirty);
        assert_eq!(ed.project.name, name);

        let loaded = Project::from_file(2, &path, &Default::default()).unwrap();
        assert_eq!(loaded.grid(), ed.project.grid());
        assert!(!loaded.can_undo());
    }

    ed.project.set_export_scale(4);
    let png = ed.project.export_png(Some(&dir.join("art.png"))).unwrap();
    let img = image::open(png).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (20, 12));
    assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0, 255]);
    assert_eq!(img.get_pixel(5, 0).0[3], 0);

    let _ = std::fs::remove_dir_all(&dir);
}
