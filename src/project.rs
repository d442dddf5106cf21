use std::borrow::Cow;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use uuid::Uuid;

use crate::canvas::{CanvasRect, Color, GridError, PixelGrid, Point, Viewport, validate_dimensions};
use crate::components::colors::{ColorHistory, INITIAL_HISTORY};
use crate::components::history::HistoryManager;
use crate::components::tools::{self, EditContext, PointerEvent, Tool, ToolState};
use crate::io::{self, ProjectError};
use crate::ops::import;
use crate::ops::reference::ReferenceImage;
use crate::ops::selection::SelectionEngine;
use crate::settings::EngineSettings;
use crate::{log_info, log_warn};

/// Yes/no question asked before a destructive replacement of the grid.
pub trait ConfirmPrompt {
    fn confirm(&mut self, message: &str) -> bool;
}

impl<F: FnMut(&str) -> bool> ConfirmPrompt for F {
    fn confirm(&mut self, message: &str) -> bool {
        self(message)
    }
}

/// Fixed answer, for headless callers.
#[derive(Clone, Copy, Debug)]
pub struct FixedAnswer(pub bool);

impl ConfirmPrompt for FixedAnswer {
    fn confirm(&mut self, _message: &str) -> bool {
        self.0
    }
}

pub const RESIZE_PROMPT: &str = "Resizing will clear current canvas. Continue?";

/// Single open document: the grid with its history, the selection, tool
/// settings and view state.
pub struct Project {
    pub id: Uuid,
    /// `None` for unsaved/untitled files.
    pub path: Option<PathBuf>,
    pub is_dirty: bool,
    /// Display name (derived from path or "Untitled-X")
    pub name: String,

    history: HistoryManager<PixelGrid>,
    selection: SelectionEngine,
    colors: ColorHistory,
    pub tools: ToolState,
    pub viewport: Viewport,
    reference: Option<ReferenceImage>,
    export_scale: u32,
}

impl Project {
    pub fn new_untitled(untitled_counter: usize, width: u32, height: u32) -> Result<Self, GridError> {
        Self::build(untitled_counter, width, height, &EngineSettings::default())
    }

    pub fn from_settings(untitled_counter: usize, settings: &EngineSettings) -> Result<Self, GridError> {
        Self::build(untitled_counter, settings.default_width, settings.default_height, settings)
    }

    fn build(untitled_counter: usize, width: u32, height: u32, settings: &EngineSettings) -> Result<Self, GridError> {
        let grid = PixelGrid::new(width, height)?;
        Ok(Self {
            id: Uuid::new_v4(),
            path: None,
            is_dirty: false,
            name: format!("Untitled-{}", untitled_counter),
            history: HistoryManager::new(grid, settings.max_undo_steps),
            selection: SelectionEngine::new(),
            colors: ColorHistory::with_colors(&INITIAL_HISTORY, settings.color_history_len),
            tools: ToolState::default(),
            viewport: settings.viewport(),
            reference: None,
            export_scale: io::clamp_export_scale(settings.export_scale),
        })
    }

    /// Open a project file (`.json` or `.pxb`).
    pub fn from_file(untitled_counter: usize, path: &Path, settings: &EngineSettings) -> Result<Self, ProjectError> {
        let mut project = Self::build(untitled_counter, 1, 1, settings)?;
        project.load_file(path)?;
        Ok(project)
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    /// The live grid.
    pub fn grid(&self) -> &PixelGrid {
        self.history.state()
    }

    /// The grid as it would be with any in-flight move put back. What
    /// save and export write.
    pub fn settled_grid(&self) -> Cow<'_, PixelGrid> {
        self.selection.settled(self.history.state())
    }

    pub fn width(&self) -> u32 {
        self.grid().width()
    }

    pub fn height(&self) -> u32 {
        self.grid().height()
    }

    pub fn history(&self) -> &HistoryManager<PixelGrid> {
        &self.history
    }

    pub fn selection(&self) -> &SelectionEngine {
        &self.selection
    }

    pub fn color_history(&self) -> &ColorHistory {
        &self.colors
    }

    pub fn reference(&self) -> Option<&ReferenceImage> {
        self.reference.as_ref()
    }

    pub fn export_scale(&self) -> u32 {
        self.export_scale
    }

    pub fn set_export_scale(&mut self, scale: u32) {
        self.export_scale = io::clamp_export_scale(scale);
    }

    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.is_dirty = false;
    }

    pub fn update_name_from_path(&mut self) {
        if let Some(ref path) = self.path {
            self.name = path
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "Unknown".to_string());
        }
    }

    /// Get the display title (name with dirty indicator)
    pub fn display_title(&self) -> String {
        if self.is_dirty {
            format!("{}*", self.name)
        } else {
            self.name.clone()
        }
    }

    // ------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------

    /// Feed a pointer event. `rect` is the canvas' current on-screen bounds.
    pub fn handle_pointer(&mut self, event: PointerEvent, rect: &CanvasRect) {
        let before = self.history.generation();
        let ctx = EditContext {
            tools: &mut self.tools,
            history: &mut self.history,
            selection: &mut self.selection,
            colors: &mut self.colors,
            viewport: &self.viewport,
        };
        tools::handle_pointer(ctx, event, rect);
        if self.history.generation() != before {
            self.mark_dirty();
        }
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.tools.set_tool(tool);
    }

    /// Choose the drawing colour without touching the recent list.
    pub fn set_color(&mut self, color: Color) {
        self.tools.color = color;
    }

    /// Top-left of the hovered cell in canvas pixels, if any.
    pub fn hover(&self, client: Point, rect: &CanvasRect) -> Option<Point> {
        self.viewport.hover_origin(rect.to_local(client), self.grid())
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) -> bool {
        self.selection.cancel_gesture(&mut self.history);
        let changed = self.history.undo();
        if changed {
            self.mark_dirty();
        }
        changed
    }

    pub fn redo(&mut self) -> bool {
        self.selection.cancel_gesture(&mut self.history);
        let changed = self.history.redo();
        if changed {
            self.mark_dirty();
        }
        changed
    }

    /// Interrupt: put a floating selection back or drop the selection.
    pub fn cancel(&mut self) {
        let before = self.history.generation();
        self.selection.cancel(&mut self.history);
        if self.history.generation() != before {
            self.mark_dirty();
        }
    }

    pub fn delete_selection(&mut self) -> bool {
        let changed = self.selection.delete_selected(&mut self.history);
        if changed {
            self.mark_dirty();
        }
        changed
    }

    pub fn fill_selection(&mut self) -> bool {
        let color = self.tools.color;
        let changed = self.selection.fill_selected(&mut self.history, color);
        if changed {
            self.colors.push(color);
            self.mark_dirty();
        }
        changed
    }

    /// Empty every cell as one undoable edit.
    pub fn clear_canvas(&mut self) -> bool {
        self.selection.cancel_gesture(&mut self.history);
        self.selection.clear();
        if !self.grid().has_content() {
            return false;
        }
        let mut grid = self.grid().clone();
        grid.clear();
        self.history.record(grid);
        self.mark_dirty();
        log_info!("cleared {}x{} canvas", self.width(), self.height());
        true
    }

    /// Replace the grid with an empty one of the new size. History is reset.
    /// Returns `Ok(false)` when the prompt declined.
    pub fn resize(&mut self, width: u32, height: u32, mut prompt: impl ConfirmPrompt) -> Result<bool, GridError> {
        if let Err(e) = validate_dimensions(width, height) {
            log_warn!("resize rejected: {}", e);
            return Err(e);
        }
        self.selection.cancel_gesture(&mut self.history);
        if self.grid().has_content() && !prompt.confirm(RESIZE_PROMPT) {
            log_info!("resize to {}x{} declined", width, height);
            return Ok(false);
        }
        self.install(PixelGrid::new(width, height)?);
        self.mark_dirty();
        log_info!("resized canvas to {}x{}", width, height);
        Ok(true)
    }

    /// Install `grid` without a history entry and forget all history.
    fn install(&mut self, grid: PixelGrid) {
        self.selection.cancel_gesture(&mut self.history);
        self.selection.clear();
        self.history.silent_set(grid);
        self.history.clear();
    }

    // ------------------------------------------------------------------
    // Files
    // ------------------------------------------------------------------

    pub fn to_json(&self) -> Result<String, ProjectError> {
        io::project_to_json(&self.settled_grid())
    }

    /// Replace the grid from JSON text. The project is untouched on error.
    pub fn load_json(&mut self, text: &str) -> Result<(), ProjectError> {
        let grid = io::project_from_json(text).inspect_err(|e| {
            log_warn!("invalid project: {}", e);
        })?;
        log_info!("loaded {}x{} project", grid.width(), grid.height());
        self.install(grid);
        self.mark_clean();
        Ok(())
    }

    pub fn load_file(&mut self, path: &Path) -> Result<(), ProjectError> {
        let grid = io::load_project(path).inspect_err(|e| {
            log_warn!("failed to open {}: {}", path.display(), e);
        })?;
        log_info!("opened {} ({}x{})", path.display(), grid.width(), grid.height());
        self.install(grid);
        self.path = Some(path.to_path_buf());
        self.update_name_from_path();
        self.mark_clean();
        Ok(())
    }

    /// Save to `path`, or the current path. Format follows the extension.
    pub fn save(&mut self, path: Option<&Path>) -> Result<PathBuf, ProjectError> {
        let target = match (path, &self.path) {
            (Some(p), _) => p.to_path_buf(),
            (None, Some(p)) => p.clone(),
            (None, None) => PathBuf::from(io::default_project_name()),
        };
        io::save_project(&self.settled_grid(), &target)?;
        log_info!("saved {}", target.display());
        self.path = Some(target.clone());
        self.update_name_from_path();
        self.mark_clean();
        Ok(target)
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, ProjectError> {
        io::encode_png(&self.settled_grid(), self.export_scale)
    }

    /// Write the scaled PNG to `path`, or a generated name in the working
    /// directory.
    pub fn export_png(&self, path: Option<&Path>) -> Result<PathBuf, ProjectError> {
        let grid = self.settled_grid();
        let target = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(io::default_export_name(&grid)));
        io::export_png(&grid, self.export_scale, &target)?;
        log_info!("exported {} at {}x", target.display(), self.export_scale);
        Ok(target)
    }

    // ------------------------------------------------------------------
    // Import / reference
    // ------------------------------------------------------------------

    /// Rasterize `image` into the grid, bounded by the current canvas size.
    /// Always asks first. Returns `Ok(false)` when declined.
    pub fn import_image(&mut self, image: &RgbaImage, mut prompt: impl ConfirmPrompt) -> Result<bool, ProjectError> {
        let limit = self.width().max(self.height());
        let grid = import::import_image(image, limit)?;
        let message = format!(
            "Importing will resize grid to {}x{} and clear current work. Continue?",
            grid.width(),
            grid.height()
        );
        if !prompt.confirm(&message) {
            log_info!("import declined");
            return Ok(false);
        }
        log_info!(
            "imported {}x{} image as {}x{} grid",
            image.width(),
            image.height(),
            grid.width(),
            grid.height()
        );
        self.install(grid);
        self.mark_dirty();
        Ok(true)
    }

    pub fn import_image_bytes(&mut self, bytes: &[u8], prompt: impl ConfirmPrompt) -> Result<bool, ProjectError> {
        let image = io::decode_image(bytes).inspect_err(|e| {
            log_warn!("import decode failed: {}", e);
        })?;
        self.import_image(&image, prompt)
    }

    pub fn set_reference(&mut self, image: RgbaImage) {
        self.reference = Some(ReferenceImage::new(image));
    }

    pub fn load_reference_bytes(&mut self, bytes: &[u8]) -> Result<(), ProjectError> {
        self.set_reference(io::decode_image(bytes)?);
        Ok(())
    }

    pub fn clear_reference(&mut self) {
        self.reference = None;
    }

    /// Sample the reference image at a client point. On success the colour
    /// becomes current, joins the recent list, and the pencil is selected.
    pub fn pick_reference_color(&mut self, client: Point, displayed: CanvasRect) -> Option<Color> {
        let color = self.reference.as_ref()?.sample_displayed(client, displayed)?;
        self.tools.color = color;
        self.colors.push(color);
        self.tools.set_tool(Tool::Pencil);
        Some(color)
    }
}
