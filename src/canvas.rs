use egui::{CursorIcon, Key, Modifiers, PointerButton, Pos2, Rect, Vec2, pos2, vec2};

use crate::buffer::{ImageInput, PixelBuffer};
use crate::error::Result;
use crate::ops::transform;
use crate::settings::EditorSettings;
use crate::signal::{ListenerId, Signal};

/// Smallest and largest allowed zoom factor.
pub const MIN_SCALE: f32 = 0.01;
pub const MAX_SCALE: f32 = 100.0;

/// Viewport size used until the host reports a real one.
pub const DEFAULT_VIEWPORT: Vec2 = Vec2 { x: 1280.0, y: 720.0 };

// ============================================================================
// VIEW TRANSFORM
// ============================================================================

/// Maps image space to viewport space. `pan` is the image-space point shown
/// at the centre of the viewport; `scale` is viewport pixels per image pixel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    pub scale: f32,
    pub pan: Pos2,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self { scale: 1.0, pan: Pos2::ZERO }
    }
}

impl ViewTransform {
    pub fn image_to_screen(&self, p: Pos2, viewport: Vec2) -> Pos2 {
        pos2(0.0, 0.0) + viewport * 0.5 + (p - self.pan) * self.scale
    }

    pub fn screen_to_image(&self, s: Pos2, viewport: Vec2) -> Pos2 {
        self.pan + (s - (pos2(0.0, 0.0) + viewport * 0.5)) / self.scale
    }
}

// ============================================================================
// CROP RECTANGLE
// ============================================================================

/// Crop selection in image coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CropRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl CropRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f32, height as f32)
    }

    /// Normalised box spanned by two corners.
    pub fn from_corners(a: Pos2, b: Pos2) -> Self {
        Self::new(a.x.min(b.x), a.y.min(b.y), (a.x - b.x).abs(), (a.y - b.y).abs())
    }

    pub fn is_empty(&self) -> bool {
        self.width < 1.0 || self.height < 1.0
    }

    /// Pull the rectangle inside a `width`×`height` image: an edge past the
    /// boundary first slides the rectangle back in, and whatever still
    /// overhangs (a rectangle larger than the image) is cut off.
    /// Returns whether anything changed.
    pub fn clamp_to(&mut self, width: u32, height: u32) -> bool {
        let before = *self;
        let (x, w) = clamp_span(self.x, self.width, width as f32);
        let (y, h) = clamp_span(self.y, self.height, height as f32);
        *self = Self::new(x, y, w, h);
        *self != before
    }

    /// Integer pixel bounds `(x, y, w, h)` for cropping.
    pub fn to_pixels(&self) -> (u32, u32, u32, u32) {
        let x = self.x.round().max(0.0) as u32;
        let y = self.y.round().max(0.0) as u32;
        let w = self.width.round().max(0.0) as u32;
        let h = self.height.round().max(0.0) as u32;
        (x, y, w, h)
    }
}

fn clamp_span(start: f32, len: f32, limit: f32) -> (f32, f32) {
    let len = len.clamp(0.0, limit);
    let start = start.clamp(0.0, limit - len);
    (start, len)
}

// ============================================================================
// INPUT / EVENTS
// ============================================================================

/// Raw input fed to [`Canvas::handle_input`], in viewport coordinates.
#[derive(Clone, Debug, PartialEq)]
pub enum CanvasInput {
    PointerPressed { pos: Pos2, button: PointerButton },
    PointerMoved { pos: Pos2 },
    PointerReleased { pos: Pos2, button: PointerButton },
    /// Positive scrolls away from the user (zoom in).
    Wheel { delta: f32 },
    KeyPressed(Key),
    ModifiersChanged(Modifiers),
    Resized(Vec2),
}

/// Notifications emitted to subscribers.
#[derive(Clone, Debug, PartialEq)]
pub enum CanvasEvent {
    CropRectChanged(CropRect),
    ViewChanged(ViewTransform),
    ImageChanged { width: u32, height: u32 },
    CursorChanged(CursorIcon),
    CloseRequested,
}

/// Pointer state between a primary press and its release.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Interaction {
    #[default]
    Idle,
    Panning { last: Pos2 },
    DrawingCrop { anchor: Pos2 },
    RegionZoomDragging { start: Pos2, current: Pos2 },
}

// ============================================================================
// OVERLAY BUTTONS
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayAction {
    Fit,
    Original,
    ZoomIn,
    ZoomOut,
}

impl OverlayAction {
    pub fn all() -> &'static [OverlayAction] {
        &[OverlayAction::Fit, OverlayAction::Original, OverlayAction::ZoomIn, OverlayAction::ZoomOut]
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayButton {
    pub action: OverlayAction,
    pub rect: Rect,
}

// ============================================================================
// CANVAS
// ============================================================================

/// Viewport controller: owns the view transform, crop rectangle, overlay
/// buttons and the current/previous/original image slots.
pub struct Canvas {
    pan_sensitivity: f32,
    zoom_in_factor: f32,
    zoom_out_factor: f32,
    min_drag: f32,
    button_size: f32,
    button_margin: f32,
    button_spacing: f32,

    viewport: Vec2,
    view: ViewTransform,
    current: Option<PixelBuffer>,
    previous: Option<PixelBuffer>,
    original: Option<PixelBuffer>,
    peeking: bool,
    crop_mode: bool,
    crop_rect: Option<CropRect>,
    interaction: Interaction,
    modifiers: Modifiers,
    cursor: CursorIcon,
    buttons: Vec<OverlayButton>,
    events: Signal<CanvasEvent>,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(&EditorSettings::default())
    }
}

impl Canvas {
    pub fn new(settings: &EditorSettings) -> Self {
        let mut canvas = Self {
            pan_sensitivity: settings.pan_sensitivity,
            zoom_in_factor: settings.zoom_in_factor,
            zoom_out_factor: settings.zoom_out_factor,
            min_drag: settings.region_zoom_min_drag,
            button_size: settings.button_size,
            button_margin: settings.button_margin,
            button_spacing: settings.button_spacing,
            viewport: DEFAULT_VIEWPORT,
            view: ViewTransform::default(),
            current: None,
            previous: None,
            original: None,
            peeking: false,
            crop_mode: false,
            crop_rect: None,
            interaction: Interaction::Idle,
            modifiers: Modifiers::NONE,
            cursor: CursorIcon::Default,
            buttons: Vec::new(),
            events: Signal::new(),
        };
        canvas.layout_buttons();
        canvas
    }

    // --- observers -------------------------------------------------------

    pub fn subscribe(&mut self, listener: impl FnMut(&CanvasEvent) + 'static) -> ListenerId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.events.unsubscribe(id)
    }

    fn emit(&mut self, event: CanvasEvent) {
        self.events.emit(&event);
    }

    fn notify_view(&mut self) {
        let view = self.view;
        self.emit(CanvasEvent::ViewChanged(view));
    }

    fn set_cursor(&mut self, cursor: CursorIcon) {
        if self.cursor != cursor {
            self.cursor = cursor;
            self.emit(CanvasEvent::CursorChanged(cursor));
        }
    }

    // --- accessors -------------------------------------------------------

    pub fn view(&self) -> ViewTransform {
        self.view
    }

    pub fn scale(&self) -> f32 {
        self.view.scale
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn interaction(&self) -> Interaction {
        self.interaction
    }

    pub fn cursor(&self) -> CursorIcon {
        self.cursor
    }

    pub fn buttons(&self) -> &[OverlayButton] {
        &self.buttons
    }

    pub fn crop_mode(&self) -> bool {
        self.crop_mode
    }

    pub fn crop_rect(&self) -> Option<CropRect> {
        self.crop_rect
    }

    pub fn current_image(&self) -> Option<&PixelBuffer> {
        self.current.as_ref()
    }

    pub fn previous_image(&self) -> Option<&PixelBuffer> {
        self.previous.as_ref()
    }

    pub fn original_image(&self) -> Option<&PixelBuffer> {
        self.original.as_ref()
    }

    /// What is on screen right now (the original while peeking).
    pub fn displayed_image(&self) -> Option<&PixelBuffer> {
        if self.peeking { self.original.as_ref() } else { self.current.as_ref() }
    }

    pub fn has_image(&self) -> bool {
        self.current.is_some()
    }

    fn image_size(&self) -> Option<(u32, u32)> {
        self.displayed_image().map(PixelBuffer::dimensions)
    }

    // --- coordinates -----------------------------------------------------

    pub fn screen_to_image(&self, s: Pos2) -> Pos2 {
        self.view.screen_to_image(s, self.viewport)
    }

    pub fn image_to_screen(&self, p: Pos2) -> Pos2 {
        self.view.image_to_screen(p, self.viewport)
    }

    /// Image-space region currently on screen, `None` without an image.
    pub fn visible_image_rect(&self) -> Option<Rect> {
        let (w, h) = self.image_size()?;
        let view = Rect::from_two_pos(self.screen_to_image(Pos2::ZERO), self.screen_to_image(Pos2::ZERO + self.viewport));
        let image = Rect::from_min_size(Pos2::ZERO, vec2(w as f32, h as f32));
        let visible = view.intersect(image);
        (visible.width() > 0.0 && visible.height() > 0.0).then_some(visible)
    }

    fn clamp_to_image(&self, p: Pos2) -> Pos2 {
        match self.image_size() {
            Some((w, h)) => pos2(p.x.clamp(0.0, w as f32), p.y.clamp(0.0, h as f32)),
            None => p,
        }
    }

    // --- zoom ------------------------------------------------------------

    /// Replace the zoom factor (100% = 1.0).
    pub fn set_zoom(&mut self, scale: f32) {
        if !self.has_image() {
            return;
        }
        self.view.scale = scale.clamp(MIN_SCALE, MAX_SCALE);
        log_debug!("zoom set to {:.0}%", self.view.scale * 100.0);
        self.notify_view();
    }

    /// Multiply the zoom factor.
    pub fn zoom_by(&mut self, factor: f32) {
        let scale = self.view.scale * factor;
        self.set_zoom(scale);
    }

    pub fn zoom_in(&mut self) {
        self.zoom_by(self.zoom_in_factor);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_by(self.zoom_out_factor);
    }

    /// Scale the whole image into the viewport and centre it.
    pub fn fit_to_view(&mut self) {
        let Some((w, h)) = self.image_size() else { return };
        let rect = Rect::from_min_size(Pos2::ZERO, vec2(w as f32, h as f32));
        self.fit_rect(rect);
        log_debug!("fit to view at {:.1}%", self.view.scale * 100.0);
    }

    /// Scale and centre so that `rect` (image space) fills the viewport.
    fn fit_rect(&mut self, rect: Rect) {
        if rect.width() <= 0.0 || rect.height() <= 0.0 {
            return;
        }
        let scale = (self.viewport.x / rect.width()).min(self.viewport.y / rect.height());
        self.view = ViewTransform { scale: scale.clamp(MIN_SCALE, MAX_SCALE), pan: rect.center() };
        self.notify_view();
    }

    /// 100% zoom, pan untouched.
    pub fn original_size(&mut self) {
        self.set_zoom(1.0);
    }

    /// Centre the image; 100% when it fits the viewport, fit-to-view otherwise.
    pub fn show_initial_size(&mut self) {
        let Some((w, h)) = self.image_size() else { return };
        self.view.pan = pos2(w as f32 / 2.0, h as f32 / 2.0);
        if w as f32 <= self.viewport.x && h as f32 <= self.viewport.y {
            self.original_size();
        } else {
            self.fit_to_view();
        }
    }

    fn run_overlay(&mut self, action: OverlayAction) {
        match action {
            OverlayAction::Fit => self.fit_to_view(),
            OverlayAction::Original => self.original_size(),
            OverlayAction::ZoomIn => self.zoom_in(),
            OverlayAction::ZoomOut => self.zoom_out(),
        }
    }

    // --- image slots -----------------------------------------------------

    /// Display `buf`. The image shown before becomes the previous one; the
    /// first image ever shown also becomes the original.
    pub fn show_image(&mut self, buf: PixelBuffer) {
        let (w, h) = buf.dimensions();
        self.previous = self.current.replace(buf.clone());
        if self.original.is_none() {
            self.original = Some(buf);
        }
        self.peeking = false;
        self.emit(CanvasEvent::ImageChanged { width: w, height: h });
        self.show_initial_size();
        self.refresh_crop_rect();
    }

    /// Swap in a re-rendered version of the current image, keeping zoom and
    /// pan. A buffer of different dimensions is shown with [`Self::show_image`]
    /// instead, since the old view and crop rectangle no longer apply.
    pub fn replace_current(&mut self, buf: PixelBuffer) {
        if self.image_size() != Some(buf.dimensions()) {
            self.show_image(buf);
            return;
        }
        let (w, h) = buf.dimensions();
        self.previous = self.current.replace(buf);
        self.peeking = false;
        self.emit(CanvasEvent::ImageChanged { width: w, height: h });
    }

    /// Start over with `buf` as current and original, no previous image.
    pub fn show_new_image(&mut self, buf: PixelBuffer) {
        self.original = None;
        self.current = None;
        self.show_image(buf);
        self.previous = None;
    }

    /// Resolve any accepted image representation and display it.
    pub fn set_image(&mut self, input: impl Into<ImageInput>) -> Result<()> {
        let buf = input.into().resolve()?;
        self.show_image(buf);
        Ok(())
    }

    /// Hold-to-compare: show the original while `on`.
    pub fn peek_original(&mut self, on: bool) {
        let on = on && self.original.is_some();
        if self.peeking == on {
            return;
        }
        self.peeking = on;
        if let Some((width, height)) = self.image_size() {
            self.emit(CanvasEvent::ImageChanged { width, height });
        }
    }

    // --- crop ------------------------------------------------------------

    pub fn set_crop_mode(&mut self, enabled: bool) {
        self.crop_mode = enabled;
        self.interaction = Interaction::Idle;
        if enabled {
            if self.crop_rect.is_none() {
                self.reset_crop_rect();
            }
            self.set_cursor(CursorIcon::Crosshair);
        } else {
            self.crop_rect = None;
            self.set_cursor(CursorIcon::Default);
        }
    }

    fn refresh_crop_rect(&mut self) {
        if self.crop_mode {
            self.reset_crop_rect();
        } else {
            self.crop_rect = None;
        }
    }

    /// Select the whole image.
    pub fn reset_crop_rect(&mut self) {
        let Some((w, h)) = self.image_size() else { return };
        let rect = CropRect::full(w, h);
        self.crop_rect = Some(rect);
        self.emit(CanvasEvent::CropRectChanged(rect));
    }

    /// Numeric crop entry. The rectangle is clamped into the image and
    /// stored; a notification fires only when clamping altered it, since the
    /// caller already knows the values it typed.
    pub fn set_crop_rectangle(&mut self, x: f32, y: f32, width: f32, height: f32) {
        let Some((w, h)) = self.image_size() else { return };
        let mut rect = CropRect::new(x, y, width, height);
        let clipped = rect.clamp_to(w, h);
        self.crop_rect = Some(rect);
        if clipped {
            log_debug!("crop rect clamped to {rect:?}");
            self.emit(CanvasEvent::CropRectChanged(rect));
        }
    }

    /// Crop the current image to `rect` and display the result.
    /// Returns `None` (and changes nothing) for an empty rectangle or when
    /// no image is loaded.
    pub fn crop_image(&mut self, rect: CropRect) -> Option<PixelBuffer> {
        let current = self.current.as_ref()?;
        let mut rect = rect;
        rect.clamp_to(current.width(), current.height());
        if rect.is_empty() {
            return None;
        }
        let (x, y, w, h) = rect.to_pixels();
        let cropped = transform::crop(current, x, y, w, h)?;
        log_info!("Cropped to {}x{} at ({x}, {y})", cropped.width(), cropped.height());
        self.show_image(cropped.clone());
        Some(cropped)
    }

    // --- geometry --------------------------------------------------------

    fn apply_geometry(&mut self, op: transform::GeometryOp) {
        let Some(current) = self.current.as_ref() else { return };
        let out = op.apply(current);
        log_debug!("{op:?} -> {}x{}", out.width(), out.height());
        self.show_image(out);
    }

    pub fn flip_horizontal(&mut self) {
        self.apply_geometry(transform::GeometryOp::FlipHorizontal);
    }

    pub fn flip_vertical(&mut self) {
        self.apply_geometry(transform::GeometryOp::FlipVertical);
    }

    pub fn rotate_left(&mut self) {
        self.apply_geometry(transform::GeometryOp::RotateLeft);
    }

    pub fn rotate_right(&mut self) {
        self.apply_geometry(transform::GeometryOp::RotateRight);
    }

    // --- overlay layout --------------------------------------------------

    /// Row of buttons centred along the bottom edge.
    fn layout_buttons(&mut self) {
        let actions = OverlayAction::all();
        let size = self.button_size;
        let gap = self.button_spacing;
        let total = actions.len() as f32 * size + (actions.len() as f32 - 1.0) * gap;
        let left = self.viewport.x / 2.0 - total / 2.0;
        let top = self.viewport.y - (size + self.button_margin);
        self.buttons = actions
            .iter()
            .enumerate()
            .map(|(i, &action)| OverlayButton {
                action,
                rect: Rect::from_min_size(pos2(left + (size + gap) * i as f32, top), vec2(size, size)),
            })
            .collect();
    }

    fn button_at(&self, pos: Pos2) -> Option<OverlayAction> {
        self.buttons.iter().find(|b| b.rect.contains(pos)).map(|b| b.action)
    }

    // --- input state machine --------------------------------------------

    fn zoom_modifier(&self) -> bool {
        self.modifiers.ctrl || self.modifiers.command
    }

    fn idle_cursor(&self) -> CursorIcon {
        match (self.zoom_modifier(), self.crop_mode) {
            (true, true) => CursorIcon::Grab,
            (true, false) => CursorIcon::Crosshair,
            (false, true) => CursorIcon::Crosshair,
            (false, false) => CursorIcon::Default,
        }
    }

    pub fn handle_input(&mut self, input: CanvasInput) {
        match input {
            CanvasInput::PointerPressed { pos, button } => self.on_press(pos, button),
            CanvasInput::PointerMoved { pos } => self.on_move(pos),
            CanvasInput::PointerReleased { pos, button } => self.on_release(pos, button),
            CanvasInput::Wheel { delta } => {
                if delta > 0.0 {
                    self.zoom_in();
                } else {
                    self.zoom_out();
                }
            }
            CanvasInput::KeyPressed(key) => self.on_key(key),
            CanvasInput::ModifiersChanged(m) => {
                self.modifiers = m;
                if self.interaction == Interaction::Idle {
                    let cursor = self.idle_cursor();
                    self.set_cursor(cursor);
                }
            }
            CanvasInput::Resized(size) => {
                self.viewport = vec2(size.x.max(1.0), size.y.max(1.0));
                self.layout_buttons();
            }
        }
    }

    fn on_press(&mut self, pos: Pos2, button: PointerButton) {
        if button != PointerButton::Primary || !self.has_image() {
            return;
        }
        if let Some(action) = self.button_at(pos) {
            self.run_overlay(action);
            return;
        }
        self.interaction = if self.zoom_modifier() {
            Interaction::RegionZoomDragging { start: pos, current: pos }
        } else if self.crop_mode {
            let anchor = self.clamp_to_image(self.screen_to_image(pos));
            self.crop_rect = Some(CropRect::from_corners(anchor, anchor));
            Interaction::DrawingCrop { anchor }
        } else {
            self.set_cursor(CursorIcon::Grabbing);
            Interaction::Panning { last: pos }
        };
    }

    fn on_move(&mut self, pos: Pos2) {
        match self.interaction {
            Interaction::Idle => {}
            Interaction::Panning { last } => {
                let delta = pos - last;
                self.view.pan -= delta / self.view.scale * self.pan_sensitivity;
                self.interaction = Interaction::Panning { last: pos };
                self.notify_view();
            }
            Interaction::DrawingCrop { anchor } => {
                let p = self.clamp_to_image(self.screen_to_image(pos));
                self.crop_rect = Some(CropRect::from_corners(anchor, p));
            }
            Interaction::RegionZoomDragging { start, .. } => {
                self.interaction = Interaction::RegionZoomDragging { start, current: pos };
            }
        }
    }

    fn on_release(&mut self, pos: Pos2, button: PointerButton) {
        if button != PointerButton::Primary {
            return;
        }
        let interaction = std::mem::take(&mut self.interaction);
        match interaction {
            Interaction::Idle => return,
            Interaction::Panning { .. } => {}
            Interaction::DrawingCrop { anchor } => {
                let p = self.clamp_to_image(self.screen_to_image(pos));
                let rect = CropRect::from_corners(anchor, p);
                self.crop_rect = Some(rect);
                self.emit(CanvasEvent::CropRectChanged(rect));
            }
            Interaction::RegionZoomDragging { start, .. } => self.finish_region_zoom(start, pos),
        }
        let cursor = self.idle_cursor();
        self.set_cursor(cursor);
    }

    /// Zoom into the dragged box when it is a real drag and a strict part of
    /// what is visible; otherwise treat it as a click.
    fn finish_region_zoom(&mut self, start: Pos2, end: Pos2) {
        let drag = end - start;
        if drag.x.abs() <= self.min_drag || drag.y.abs() <= self.min_drag {
            return;
        }
        let Some(visible) = self.visible_image_rect() else { return };
        let dragged = Rect::from_two_pos(self.screen_to_image(start), self.screen_to_image(end));
        let target = dragged.intersect(visible);
        if target.width() <= 0.0 || target.height() <= 0.0 || target == visible {
            return;
        }
        self.fit_rect(target);
    }

    fn on_key(&mut self, key: Key) {
        match key {
            Key::Escape => self.emit(CanvasEvent::CloseRequested),
            Key::Num1 => {
                if (self.view.scale - 1.0).abs() > f32::EPSILON {
                    self.original_size();
                } else {
                    self.fit_to_view();
                }
            }
            Key::Num2 => self.set_zoom(2.0),
            Key::Num3 => self.set_zoom(3.0),
            Key::Num4 => self.set_zoom(4.0),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ChannelLayout;
    use approx::assert_relative_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn image(w: u32, h: u32) -> PixelBuffer {
        PixelBuffer::filled(w, h, ChannelLayout::Rgb, &[90, 90, 90])
    }

    fn canvas_with(w: u32, h: u32) -> Canvas {
        let mut c = Canvas::default();
        c.show_new_image(image(w, h));
        c
    }

    fn recorder(c: &mut Canvas) -> Rc<RefCell<Vec<CanvasEvent>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        c.subscribe(move |e| sink.borrow_mut().push(e.clone()));
        log
    }

    fn press(c: &mut Canvas, pos: Pos2) {
        c.handle_input(CanvasInput::PointerPressed { pos, button: PointerButton::Primary });
    }

    fn release(c: &mut Canvas, pos: Pos2) {
        c.handle_input(CanvasInput::PointerReleased { pos, button: PointerButton::Primary });
    }

    fn ctrl() -> Modifiers {
        Modifiers { ctrl: true, command: true, ..Modifiers::NONE }
    }

    #[test]
    fn screen_image_round_trip() {
        let view = ViewTransform { scale: 2.5, pan: pos2(40.0, 30.0) };
        let vp = vec2(800.0, 600.0);
        let p = pos2(13.0, 77.0);
        let back = view.screen_to_image(view.image_to_screen(p, vp), vp);
        assert_relative_eq!(back.x, p.x, epsilon = 1e-4);
        assert_relative_eq!(back.y, p.y, epsilon = 1e-4);
        assert_eq!(view.image_to_screen(view.pan, vp), pos2(400.0, 300.0));
    }

    #[test]
    fn crop_clamp_scenario() {
        let mut r = CropRect::new(-10.0, 5.0, 50.0, 50.0);
        assert!(r.clamp_to(100, 100));
        assert_eq!(r, CropRect::new(0.0, 5.0, 50.0, 50.0));

        let mut inside = CropRect::new(10.0, 10.0, 20.0, 20.0);
        assert!(!inside.clamp_to(100, 100));
    }

    #[test]
    fn crop_clamp_always_in_bounds() {
        let cases = [
            (-500.0, -500.0, 2000.0, 30.0),
            (90.0, 95.0, 50.0, 50.0),
            (250.0, -3.0, 10.0, 400.0),
            (5.0, 5.0, -20.0, 10.0),
        ];
        for (x, y, w, h) in cases {
            let mut r = CropRect::new(x, y, w, h);
            r.clamp_to(100, 80);
            assert!(r.x >= 0.0 && r.y >= 0.0, "{r:?}");
            assert!(r.width >= 0.0 && r.height >= 0.0, "{r:?}");
            assert!(r.x + r.width <= 100.0 && r.y + r.height <= 80.0, "{r:?}");
        }
    }

    #[test]
    fn fit_original_fit_is_stable() {
        let mut c = canvas_with(4000, 3000);
        c.fit_to_view();
        let first = c.scale();
        assert_relative_eq!(first, (1280.0f32 / 4000.0).min(720.0 / 3000.0));
        c.original_size();
        assert_eq!(c.scale(), 1.0);
        c.fit_to_view();
        assert_eq!(c.scale(), first);
    }

    #[test]
    fn initial_size_depends_on_fit() {
        let c = canvas_with(200, 100);
        assert_eq!(c.scale(), 1.0);
        assert_eq!(c.view().pan, pos2(100.0, 50.0));

        let c = canvas_with(2560, 720);
        assert_relative_eq!(c.scale(), 0.5);
    }

    #[test]
    fn no_image_means_no_ops() {
        let mut c = Canvas::default();
        let log = recorder(&mut c);
        c.fit_to_view();
        c.zoom_in();
        c.set_crop_rectangle(0.0, 0.0, 10.0, 10.0);
        c.flip_horizontal();
        press(&mut c, pos2(10.0, 10.0));
        assert_eq!(c.interaction(), Interaction::Idle);
        assert!(c.crop_image(CropRect::new(0.0, 0.0, 5.0, 5.0)).is_none());
        assert!(log.borrow().is_empty());
        assert_eq!(c.scale(), 1.0);
    }

    #[test]
    fn wheel_and_presets() {
        let mut c = canvas_with(100, 100);
        c.handle_input(CanvasInput::Wheel { delta: 120.0 });
        assert_relative_eq!(c.scale(), 1.1);
        c.handle_input(CanvasInput::Wheel { delta: -120.0 });
        assert_relative_eq!(c.scale(), 0.99, epsilon = 1e-6);
        // A zero delta counts as a step out.
        c.handle_input(CanvasInput::Wheel { delta: 0.0 });
        assert_relative_eq!(c.scale(), 0.891, epsilon = 1e-6);
        c.set_zoom(1.0);
        c.handle_input(CanvasInput::KeyPressed(Key::Num3));
        assert_eq!(c.scale(), 3.0);
        c.handle_input(CanvasInput::KeyPressed(Key::Num1));
        assert_eq!(c.scale(), 1.0);
        c.handle_input(CanvasInput::KeyPressed(Key::Num1));
        assert_relative_eq!(c.scale(), 7.2);
    }

    #[test]
    fn escape_requests_close() {
        let mut c = Canvas::default();
        let log = recorder(&mut c);
        c.handle_input(CanvasInput::KeyPressed(Key::Escape));
        assert_eq!(*log.borrow(), vec![CanvasEvent::CloseRequested]);
    }

    #[test]
    fn panning_moves_against_the_drag() {
        let mut c = canvas_with(200, 100);
        c.set_zoom(2.0);
        press(&mut c, pos2(300.0, 300.0));
        assert!(matches!(c.interaction(), Interaction::Panning { .. }));
        c.handle_input(CanvasInput::PointerMoved { pos: pos2(340.0, 280.0) });
        release(&mut c, pos2(340.0, 280.0));
        assert_eq!(c.interaction(), Interaction::Idle);
        assert_eq!(c.view().pan, pos2(100.0 - 20.0, 50.0 + 10.0));
    }

    #[test]
    fn drawing_crop_clamps_and_notifies_on_release() {
        let mut c = canvas_with(200, 100);
        c.set_crop_mode(true);
        assert_eq!(c.crop_rect(), Some(CropRect::full(200, 100)));
        let log = recorder(&mut c);

        // At 100% the image spans screen x 540..740, y 310..410.
        let start = c.image_to_screen(pos2(150.0, 20.0));
        press(&mut c, start);
        c.handle_input(CanvasInput::PointerMoved { pos: pos2(0.0, 0.0) });
        assert!(log.borrow().iter().all(|e| !matches!(e, CanvasEvent::CropRectChanged(_))));
        let end = c.image_to_screen(pos2(500.0, 60.0));
        release(&mut c, end);

        let expected = CropRect::new(150.0, 20.0, 50.0, 40.0);
        assert_eq!(c.crop_rect(), Some(expected));
        assert!(log.borrow().contains(&CanvasEvent::CropRectChanged(expected)));
    }

    #[test]
    fn set_crop_rectangle_only_notifies_when_clipped() {
        let mut c = canvas_with(100, 100);
        c.set_crop_mode(true);
        let log = recorder(&mut c);
        let changes = |log: &Rc<RefCell<Vec<CanvasEvent>>>| -> Vec<CanvasEvent> {
            log.borrow().iter().filter(|e| matches!(e, CanvasEvent::CropRectChanged(_))).cloned().collect()
        };

        // Interior rectangle: stored silently.
        c.set_crop_rectangle(10.0, 10.0, 20.0, 20.0);
        assert_eq!(c.crop_rect(), Some(CropRect::new(10.0, 10.0, 20.0, 20.0)));
        assert!(changes(&log).is_empty());

        c.set_crop_rectangle(-10.0, 5.0, 50.0, 50.0);
        c.set_crop_rectangle(0.0, 5.0, 50.0, 50.0);
        assert_eq!(changes(&log), vec![CanvasEvent::CropRectChanged(CropRect::new(0.0, 5.0, 50.0, 50.0))]);
    }

    #[test]
    fn replace_current_keeps_the_view() {
        let mut c = canvas_with(200, 100);
        c.zoom_by(3.0);
        let view = c.view();
        c.replace_current(image(200, 100));
        assert_eq!(c.view(), view);
        assert_eq!(c.previous_image().map(|b| b.dimensions()), Some((200, 100)));

        // A different size re-fits.
        c.replace_current(image(50, 40));
        assert_eq!(c.scale(), 1.0);
        assert_eq!(c.view().pan, pos2(25.0, 20.0));
    }

    #[test]
    fn pan_scales_with_sensitivity() {
        let settings = EditorSettings { pan_sensitivity: 2.0, ..EditorSettings::default() };
        let mut c = Canvas::new(&settings);
        c.show_new_image(image(200, 100));
        c.set_zoom(2.0);
        press(&mut c, pos2(300.0, 300.0));
        c.handle_input(CanvasInput::PointerMoved { pos: pos2(340.0, 280.0) });
        release(&mut c, pos2(340.0, 280.0));
        // delta (40, -20) / scale 2 * sensitivity 2
        assert_eq!(c.view().pan, pos2(100.0 - 40.0, 50.0 + 20.0));
    }

    #[test]
    fn modifier_change_mid_drag_keeps_interaction() {
        let mut c = canvas_with(200, 100);
        press(&mut c, pos2(300.0, 300.0));
        let before = c.interaction();
        assert!(matches!(before, Interaction::Panning { .. }));
        c.handle_input(CanvasInput::ModifiersChanged(ctrl()));
        assert_eq!(c.interaction(), before);
        assert_eq!(c.cursor(), CursorIcon::Grabbing);

        release(&mut c, pos2(300.0, 300.0));
        // Back to idle with the modifier still held: region-zoom cursor.
        assert_eq!(c.cursor(), CursorIcon::Crosshair);
    }

    #[test]
    fn region_zoom_needs_a_real_drag() {
        let mut c = canvas_with(200, 100);
        c.handle_input(CanvasInput::ModifiersChanged(ctrl()));
        assert_eq!(c.cursor(), CursorIcon::Crosshair);

        let a = c.image_to_screen(pos2(50.0, 25.0));
        press(&mut c, a);
        release(&mut c, a + vec2(2.0, 40.0));
        assert_eq!(c.scale(), 1.0);

        press(&mut c, a);
        assert!(matches!(c.interaction(), Interaction::RegionZoomDragging { .. }));
        c.handle_input(CanvasInput::PointerMoved { pos: a + vec2(50.0, 25.0) });
        release(&mut c, a + vec2(50.0, 25.0));
        assert_relative_eq!(c.scale(), (1280.0f32 / 50.0).min(720.0 / 25.0));
        assert_eq!(c.view().pan, pos2(75.0, 37.5));
    }

    #[test]
    fn region_zoom_covering_everything_is_ignored() {
        let mut c = canvas_with(200, 100);
        c.handle_input(CanvasInput::ModifiersChanged(ctrl()));
        press(&mut c, pos2(1.0, 1.0));
        release(&mut c, pos2(1279.0, 719.0));
        assert_eq!(c.scale(), 1.0);
    }

    #[test]
    fn overlay_buttons_layout_and_click() {
        let mut c = canvas_with(4000, 3000);
        let b = c.buttons().to_vec();
        assert_eq!(b.len(), 4);
        // 4·60 + 3·1 = 243 wide, centred; 15 px above the bottom edge.
        assert_relative_eq!(b[0].rect.min.x, 640.0 - 121.5);
        assert_relative_eq!(b[1].rect.min.x, 640.0 - 121.5 + 61.0);
        assert_relative_eq!(b[0].rect.max.y, 705.0);

        press(&mut c, b[1].rect.center());
        assert_eq!(c.interaction(), Interaction::Idle);
        assert_eq!(c.scale(), 1.0);

        c.handle_input(CanvasInput::Resized(vec2(400.0, 300.0)));
        assert_relative_eq!(c.buttons()[0].rect.min.y, 300.0 - 75.0);
        assert_eq!(c.scale(), 1.0);
    }

    #[test]
    fn slots_track_current_previous_original() {
        let mut c = Canvas::default();
        c.show_new_image(image(10, 10));
        c.show_image(image(20, 20));
        c.show_image(image(30, 30));
        assert_eq!(c.current_image().map(|b| b.width()), Some(30));
        assert_eq!(c.previous_image().map(|b| b.width()), Some(20));
        assert_eq!(c.original_image().map(|b| b.width()), Some(10));

        c.peek_original(true);
        assert_eq!(c.displayed_image().map(|b| b.width()), Some(10));
        c.peek_original(false);
        assert_eq!(c.displayed_image().map(|b| b.width()), Some(30));

        c.show_new_image(image(5, 5));
        assert!(c.previous_image().is_none());
        assert_eq!(c.original_image().map(|b| b.width()), Some(5));
    }

    #[test]
    fn set_image_rejects_bad_input() {
        let mut c = Canvas::default();
        let bad = ImageInput::Gray { width: 4, height: 4, data: vec![0; 3] };
        assert!(c.set_image(bad).is_err());
        assert!(!c.has_image());
        c.set_image(image(3, 2)).unwrap();
        assert_eq!(c.current_image().map(|b| b.dimensions()), Some((3, 2)));
    }

    #[test]
    fn crop_and_rotate() {
        let mut c = canvas_with(100, 60);
        assert!(c.crop_image(CropRect::new(10.0, 10.0, 0.0, 20.0)).is_none());
        let cropped = c.crop_image(CropRect::new(10.0, 10.0, 40.0, 20.0)).unwrap();
        assert_eq!(cropped.dimensions(), (40, 20));
        c.rotate_left();
        assert_eq!(c.current_image().map(|b| b.dimensions()), Some((20, 40)));
        c.set_crop_mode(true);
        c.flip_vertical();
        assert_eq!(c.crop_rect(), Some(CropRect::full(20, 40)));
    }

    #[test]
    fn visible_rect_is_clipped_to_image() {
        let c = canvas_with(200, 100);
        assert_eq!(c.visible_image_rect(), Some(Rect::from_min_size(Pos2::ZERO, vec2(200.0, 100.0))));
        let mut big = canvas_with(4000, 3000);
        big.set_zoom(1.0);
        let v = big.visible_image_rect().unwrap();
        assert_relative_eq!(v.width(), 1280.0);
        assert_relative_eq!(v.height(), 720.0);
    }
}
