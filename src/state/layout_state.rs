//! Split-pane layout state
//!
//! Tracks the editor/preview split, the drag-to-resize gesture and which
//! panel (if any) is fullscreen.

use crate::config::{MAX_SPLIT_PERCENT, MIN_SPLIT_PERCENT};

/// One of the two main panes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Editor,
    Preview,
}

/// Assumed container width until the first resize event
const INITIAL_CONTAINER_WIDTH: f32 = 1200.0;

/// Horizontal extent of the container the panes live in
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerBounds {
    pub left: f32,
    pub width: f32,
}

impl Default for ContainerBounds {
    fn default() -> Self {
        Self {
            left: 0.0,
            width: INITIAL_CONTAINER_WIDTH,
        }
    }
}

/// What is currently shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelVisibility {
    pub editor: bool,
    pub preview: bool,
    pub resizer: bool,
}

/// Icon and tooltip of a panel's fullscreen toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleLabel {
    pub icon: &'static str,
    pub tooltip: &'static str,
}

const EXPAND_ICON: &str = "view-fullscreen-symbolic";
const RESTORE_ICON: &str = "view-restore-symbolic";

/// Split view layout
#[derive(Debug, Clone)]
pub struct LayoutState {
    split_percent: f32,
    fullscreen: Option<Panel>,
    resizing: bool,
    bounds: ContainerBounds,
}

impl LayoutState {
    pub fn new(default_split_percent: f32) -> Self {
        Self {
            split_percent: clamp_split(default_split_percent),
            fullscreen: None,
            resizing: false,
            bounds: ContainerBounds::default(),
        }
    }

    /// Editor share of the container width, in percent
    pub fn split_percent(&self) -> f32 {
        self.split_percent
    }

    pub fn is_resizing(&self) -> bool {
        self.resizing
    }

    pub fn fullscreen(&self) -> Option<Panel> {
        self.fullscreen
    }

    pub fn set_bounds(&mut self, bounds: ContainerBounds) {
        self.bounds = bounds;
    }

    /// Arm a resize drag
    pub fn start_resize(&mut self) {
        if self.fullscreen.is_none() {
            self.resizing = true;
        }
    }

    /// Recompute the split from the pointer position. Returns whether the
    /// split changed.
    pub fn handle_resize(&mut self, pointer_x: f32) -> bool {
        if !self.resizing || self.bounds.width <= 0.0 {
            return false;
        }
        let percent = (pointer_x - self.bounds.left) / self.bounds.width * 100.0;
        let percent = clamp_split(percent);
        let changed = (percent - self.split_percent).abs() > f32::EPSILON;
        self.split_percent = percent;
        changed
    }

    /// Disarm the resize drag
    pub fn stop_resize(&mut self) {
        self.resizing = false;
    }

    /// Flex portions `(editor, preview)` for the current split
    pub fn portions(&self) -> (u16, u16) {
        let editor = (self.split_percent * 10.0).round() as u16;
        (editor, 1000 - editor)
    }

    /// Toggle fullscreen on a panel
    pub fn toggle_fullscreen(&mut self, panel: Panel) {
        if self.fullscreen == Some(panel) {
            self.exit_fullscreen();
            return;
        }
        self.exit_fullscreen();
        self.resizing = false;
        self.fullscreen = Some(panel);
        log::debug!("{:?} panel entered fullscreen", panel);
    }

    /// Leave fullscreen. Returns whether anything was fullscreen.
    pub fn exit_fullscreen(&mut self) -> bool {
        self.fullscreen.take().is_some()
    }

    pub fn visibility(&self) -> PanelVisibility {
        match self.fullscreen {
            None => PanelVisibility {
                editor: true,
                preview: true,
                resizer: true,
            },
            Some(panel) => PanelVisibility {
                editor: panel == Panel::Editor,
                preview: panel == Panel::Preview,
                resizer: false,
            },
        }
    }

    pub fn toggle_label(&self, panel: Panel) -> ToggleLabel {
        if self.fullscreen == Some(panel) {
            return ToggleLabel {
                icon: RESTORE_ICON,
                tooltip: "Exit fullscreen",
            };
        }
        ToggleLabel {
            icon: EXPAND_ICON,
            tooltip: match panel {
                Panel::Editor => "Fullscreen editor",
                Panel::Preview => "Fullscreen preview",
            },
        }
    }
}

impl Default for LayoutState {
    fn default() -> Self {
        Self::new(50.0)
    }
}

fn clamp_split(percent: f32) -> f32 {
    if percent.is_nan() {
        return MIN_SPLIT_PERCENT;
    }
    percent.clamp(MIN_SPLIT_PERCENT, MAX_SPLIT_PERCENT)
}
