use crate::canvas::{CanvasRect, Cell, Color, PixelGrid, Point, Viewport};
use crate::components::colors::ColorHistory;
use crate::components::history::HistoryManager;
use crate::ops::fill::flood_fill;
use crate::ops::selection::{SelectionEngine, SelectionShape};

/// Bit of `PointerEvent::buttons` for the primary button.
pub const PRIMARY_BUTTON: u16 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Pencil,
    Eraser,
    Fill,
    Picker,
    Select,
}

impl Tool {
    pub const ALL: [Tool; 5] = [Tool::Pencil, Tool::Eraser, Tool::Fill, Tool::Picker, Tool::Select];

    pub fn name(&self) -> &'static str {
        match self {
            Tool::Pencil => "pencil",
            Tool::Eraser => "eraser",
            Tool::Fill => "fill",
            Tool::Picker => "picker",
            Tool::Select => "select",
        }
    }

    pub fn from_name(name: &str) -> Option<Tool> {
        Tool::ALL.into_iter().find(|t| t.name().eq_ignore_ascii_case(name.trim()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerKind {
    Down,
    Move,
    Up,
}

/// A pointer event in client (screen) coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub client: Point,
    /// Pressed-button mask; bit 0 is the primary button.
    pub buttons: u16,
}

impl PointerEvent {
    pub fn down(x: f32, y: f32) -> Self {
        Self { kind: PointerKind::Down, client: Point::new(x, y), buttons: PRIMARY_BUTTON }
    }

    /// Motion with the primary button held.
    pub fn drag(x: f32, y: f32) -> Self {
        Self { kind: PointerKind::Move, client: Point::new(x, y), buttons: PRIMARY_BUTTON }
    }

    /// Motion with no button held.
    pub fn hover(x: f32, y: f32) -> Self {
        Self { kind: PointerKind::Move, client: Point::new(x, y), buttons: 0 }
    }

    pub fn up(x: f32, y: f32) -> Self {
        Self { kind: PointerKind::Up, client: Point::new(x, y), buttons: 0 }
    }

    pub fn primary_held(&self) -> bool {
        self.buttons & PRIMARY_BUTTON != 0
    }
}

/// Per-session tool settings.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolState {
    active: Tool,
    pub color: Color,
    pub selection_shape: SelectionShape,
    /// Only keep painted cells when a selection drag finishes.
    pub content_only: bool,
    /// A pencil/eraser stroke is in progress.
    stroke_active: bool,
}

impl Default for ToolState {
    fn default() -> Self {
        Self {
            active: Tool::Pencil,
            color: Color::BLACK,
            selection_shape: SelectionShape::Rectangle,
            content_only: false,
            stroke_active: false,
        }
    }
}

impl ToolState {
    pub fn active(&self) -> Tool {
        self.active
    }

    /// Switch tools. Ends any stroke but leaves the selection alone.
    pub fn set_tool(&mut self, tool: Tool) {
        self.active = tool;
        self.stroke_active = false;
    }

    pub fn is_drawing(&self) -> bool {
        self.stroke_active
    }
}

/// Everything a pointer event may touch, borrowed from the owning project.
pub struct EditContext<'a> {
    pub tools: &'a mut ToolState,
    pub history: &'a mut HistoryManager<PixelGrid>,
    pub selection: &'a mut SelectionEngine,
    pub colors: &'a mut ColorHistory,
    pub viewport: &'a Viewport,
}

// ============================================================================
// POINTER DISPATCH
// ============================================================================

/// Route one pointer event. A drag owned by the selection engine keeps
/// receiving move/up events whatever tool is active; otherwise the active
/// tool decides.
pub fn handle_pointer(ctx: EditContext<'_>, event: PointerEvent, rect: &CanvasRect) {
    let EditContext { tools, history, selection, colors, viewport } = ctx;
    let point = rect.to_local(event.client);
    let cell_size = viewport.cell_size();

    if selection.is_selecting() || selection.is_moving() {
        match event.kind {
            PointerKind::Move => {
                selection.pointer_move(point);
                return;
            }
            PointerKind::Up => {
                selection.pointer_up(history, cell_size, tools.content_only);
                return;
            }
            // A press that isn't part of the drag abandons it, so the tool
            // below sees the grid the gesture started from.
            PointerKind::Down => selection.cancel_gesture(history),
        }
    }

    let index = viewport.resolve(point, history.state());

    match (tools.active, event.kind) {
        (_, PointerKind::Up) => tools.stroke_active = false,
        (Tool::Select, PointerKind::Down) => {
            selection.pointer_down(history, point, index, tools.selection_shape);
        }
        (Tool::Select, PointerKind::Move) => {}
        (Tool::Picker, PointerKind::Down) => {
            if let Some(i) = index
                && let Some(color) = history.state().get(i)
            {
                tools.color = color;
                colors.push(color);
                tools.set_tool(Tool::Pencil);
            }
        }
        (Tool::Picker, PointerKind::Move) => {}
        (Tool::Fill, PointerKind::Down) => {
            let Some(i) = index else { return };
            colors.push(tools.color);
            fill(history, i, Some(tools.color));
        }
        (Tool::Fill, PointerKind::Move) => {}
        (Tool::Pencil | Tool::Eraser, PointerKind::Down) => {
            tools.stroke_active = true;
            paint(tools, history, colors, index);
        }
        (Tool::Pencil | Tool::Eraser, PointerKind::Move) => {
            if tools.stroke_active && event.primary_held() {
                paint(tools, history, colors, index);
            }
        }
    }
}

fn paint(
    tools: &ToolState,
    history: &mut HistoryManager<PixelGrid>,
    colors: &mut ColorHistory,
    index: Option<usize>,
) {
    let Some(i) = index else { return };
    let value: Cell = match tools.active {
        Tool::Eraser => None,
        _ => {
            colors.push(tools.color);
            Some(tools.color)
        }
    };
    if history.state().get(i) == value {
        return;
    }
    let mut grid = history.state().clone();
    grid.set(i, value);
    history.record(grid);
}

fn fill(history: &mut HistoryManager<PixelGrid>, start: usize, replacement: Cell) {
    let target = history.state().get(start);
    if target == replacement {
        return;
    }
    let mut grid = history.state().clone();
    if flood_fill(&mut grid, Some(start), target, replacement) {
        history.record(grid);
    }
}
