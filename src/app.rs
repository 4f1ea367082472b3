use std::path::Path;

use crate::buffer::{ImageInput, PixelBuffer};
use crate::canvas::Canvas;
use crate::components::history::EditHistory;
use crate::components::tools::{
    ColorsTool, CropTool, CurvesTool, DenoiseTool, LightingTool, SharpnessTool, Tool, ToolSession,
};
use crate::error::Result;
use crate::io::{self, ImageInfo};
use crate::ops::adjustments::{self, Channel};
use crate::settings::EditorSettings;
use crate::signal::{ListenerId, Signal};

// ============================================================================
// EDIT EVENTS
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditEvent {
    /// A new image was opened and the history restarted.
    Opened { width: u32, height: u32 },
    /// A tool result was appended to the history at `index`.
    Confirmed { index: usize, label: String },
    /// History record `index` is now displayed.
    Selected { index: usize },
    /// History record `index` was removed; `shown` is displayed instead.
    Deleted { index: usize, shown: usize },
}

// ============================================================================
// EDITOR - main canvas plus the linear edit history
// ============================================================================

/// The editing workspace: one main canvas, the history of confirmed edits,
/// and the settings tools are created from.
pub struct Editor {
    canvas: Canvas,
    history: Option<EditHistory>,
    /// File facts of the opened image; `None` for in-memory buffers.
    info: Option<ImageInfo>,
    settings: EditorSettings,
    events: Signal<EditEvent>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorSettings::default())
    }
}

impl Editor {
    pub fn new(settings: EditorSettings) -> Self {
        Self { canvas: Canvas::new(&settings), history: None, info: None, settings, events: Signal::new() }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&EditEvent) + 'static) -> ListenerId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    pub fn history(&self) -> Option<&EditHistory> {
        self.history.as_ref()
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    /// The image tools start from.
    pub fn current_image(&self) -> Option<&PixelBuffer> {
        self.canvas.current_image()
    }

    pub fn info(&self) -> Option<&ImageInfo> {
        self.info.as_ref()
    }

    /// Histogram of the displayed image.
    pub fn histogram(&self, channel: Channel) -> Option<[u32; 256]> {
        self.canvas.current_image().map(|buf| adjustments::compute_histogram(buf, channel))
    }

    // --- opening ---------------------------------------------------------

    /// Load `path` and start a fresh history from it.
    pub fn open_image(&mut self, path: &Path) -> Result<()> {
        let (buf, info) = io::load_with_info(path)?;
        self.start(buf);
        self.info = Some(info);
        Ok(())
    }

    pub fn open_buffer(&mut self, input: impl Into<ImageInput>) -> Result<()> {
        let buf = input.into().resolve()?;
        self.start(buf);
        self.info = None;
        Ok(())
    }

    fn start(&mut self, buf: PixelBuffer) {
        let (width, height) = buf.dimensions();
        self.canvas.show_new_image(buf.clone());
        match self.history.as_mut() {
            Some(h) => h.clear_with(buf),
            None => self.history = Some(EditHistory::new(buf)),
        }
        log_info!("Editing new image {width}x{height}");
        self.events.emit(&EditEvent::Opened { width, height });
    }

    // --- tool sessions ---------------------------------------------------

    /// Open `tool` on the current image. `None` when nothing is loaded.
    pub fn begin<T: Tool>(&self, tool: T) -> Option<ToolSession<T>> {
        let base = self.canvas.current_image()?.clone();
        Some(ToolSession::open(tool, base, &self.settings))
    }

    pub fn begin_lighting(&self) -> Option<ToolSession<LightingTool>> {
        self.begin(LightingTool::new(&self.settings))
    }

    pub fn begin_colors(&self) -> Option<ToolSession<ColorsTool>> {
        self.begin(ColorsTool::new())
    }

    pub fn begin_curves(&self) -> Option<ToolSession<CurvesTool>> {
        self.begin(CurvesTool::new(&self.settings))
    }

    pub fn begin_crop(&self) -> Option<ToolSession<CropTool>> {
        self.begin(CropTool::new())
    }

    pub fn begin_sharpness(&self) -> Option<ToolSession<SharpnessTool>> {
        self.begin(SharpnessTool::new())
    }

    pub fn begin_denoise(&self) -> Option<ToolSession<DenoiseTool>> {
        self.begin(DenoiseTool::new())
    }

    /// Confirm `session` and commit its full-resolution result.
    pub fn finish<T: Tool>(&mut self, session: ToolSession<T>) -> Result<Option<usize>> {
        let (buf, label) = session.confirm()?;
        Ok(self.confirm_edit(buf, label))
    }

    // --- history ---------------------------------------------------------

    /// Display `buf`, append it to the history and make it the baseline of
    /// the next tool. Returns the new record's index, or `None` when no
    /// image has been opened.
    pub fn confirm_edit(&mut self, buf: PixelBuffer, label: impl Into<String>) -> Option<usize> {
        let Some(history) = self.history.as_mut() else {
            log_warn!("edit confirmed with no image open; ignored");
            return None;
        };
        let label = label.into();
        let (w, h) = buf.dimensions();
        self.canvas.show_image(buf.clone());
        let index = history.commit(buf, label.clone());
        log_info!("Committed '{label}' as #{index} ({w}x{h}, {} bytes held)", history.memory_usage());
        self.events.emit(&EditEvent::Confirmed { index, label });
        Some(index)
    }

    /// Display history record `index`. Returns `false` if it does not exist.
    pub fn show_history(&mut self, index: usize) -> bool {
        let Some(buf) = self.history.as_mut().and_then(|h| h.select(index)).cloned() else {
            return false;
        };
        self.canvas.show_image(buf);
        self.events.emit(&EditEvent::Selected { index });
        true
    }

    /// Remove history record `index` and display its successor (or the
    /// preceding record when it was the last). The original is never removed.
    pub fn delete_history(&mut self, index: usize) -> Option<usize> {
        let history = self.history.as_mut()?;
        let label = history.get(index).map(|r| r.label.clone());
        let Some(shown) = history.delete(index) else {
            log_warn!("refused to delete history record #{index}");
            return None;
        };
        let buf = history.selected_record().buffer.clone();
        log_info!("Deleted history record #{index} ({}), showing #{shown}", label.unwrap_or_default());
        self.canvas.show_image(buf);
        self.events.emit(&EditEvent::Deleted { index, shown });
        Some(shown)
    }

    /// Write the displayed image to `path`.
    pub fn save(&self, path: &Path, quality: u8) -> Result<bool> {
        let Some(buf) = self.canvas.current_image() else { return Ok(false) };
        io::save_image(buf, path, quality)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ChannelLayout;
    use crate::components::history::ORIGINAL_LABEL;
    use crate::ops::transform::GeometryOp;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn gradient() -> PixelBuffer {
        PixelBuffer::from_fn(32, 16, ChannelLayout::Rgb, |x, y| [(x * 8) as u8, (y * 16) as u8, 64, 255])
    }

    #[test]
    fn nothing_to_edit_before_open() {
        let mut ed = Editor::default();
        assert!(ed.begin_lighting().is_none());
        assert_eq!(ed.confirm_edit(gradient(), "x"), None);
        assert!(!ed.show_history(0));
        assert_eq!(ed.delete_history(1), None);
    }

    #[test]
    fn sessions_commit_into_history() {
        let mut ed = Editor::default();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        ed.subscribe(move |e| sink.borrow_mut().push(e.clone()));

        ed.open_buffer(gradient()).unwrap();
        let mut crop = ed.begin_crop().unwrap();
        crop.geometry(GeometryOp::RotateLeft).unwrap();
        assert_eq!(ed.finish(crop).unwrap(), Some(1));
        assert_eq!(ed.current_image().map(|b| b.dimensions()), Some((16, 32)));

        // The next tool starts from the committed result.
        let session = ed.begin_sharpness().unwrap();
        assert_eq!(session.preview_baseline().map(|b| b.dimensions()), Some((16, 32)));
        ed.finish(session).unwrap();

        let mut denoise = ed.begin_denoise().unwrap();
        denoise.update(|t| t.set_slider(80)).unwrap();
        assert_eq!(ed.finish(denoise).unwrap(), Some(3));

        let h = ed.history().unwrap();
        assert_eq!(h.labels(), vec![ORIGINAL_LABEL, "Crop and Rotate", "Sharpness Adjustment", "De-noise Adjustment"]);
        assert_eq!(
            events.borrow()[..2],
            [
                EditEvent::Opened { width: 32, height: 16 },
                EditEvent::Confirmed { index: 1, label: "Crop and Rotate".into() },
            ]
        );
    }

    #[test]
    fn delete_and_select_update_the_canvas() {
        let mut ed = Editor::default();
        ed.open_buffer(gradient()).unwrap();
        let a = PixelBuffer::filled(4, 4, ChannelLayout::Rgb, &[1, 1, 1]);
        let b = PixelBuffer::filled(5, 5, ChannelLayout::Rgb, &[2, 2, 2]);
        ed.confirm_edit(a.clone(), "a");
        ed.confirm_edit(b.clone(), "b");

        assert!(ed.show_history(1));
        assert_eq!(ed.current_image(), Some(&a));

        assert_eq!(ed.delete_history(0), None);
        assert_eq!(ed.delete_history(2), Some(1));
        assert_eq!(ed.current_image(), Some(&a));
        assert_eq!(ed.delete_history(1), Some(0));
        assert_eq!(ed.current_image(), Some(&gradient()));
    }

    #[test]
    fn opening_a_file_keeps_its_info() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g.png");
        io::save_image(&gradient(), &path, 90).unwrap();

        let mut ed = Editor::default();
        assert!(ed.histogram(Channel::Red).is_none());
        ed.open_image(&path).unwrap();
        let info = ed.info().unwrap();
        assert_eq!((info.width, info.height, info.bits_per_pixel), (32, 16, 24));
        assert_eq!(info.file_name, "g.png");

        let blue = ed.histogram(Channel::Blue).unwrap();
        assert_eq!(blue[64], 32 * 16);
        assert_eq!(ed.histogram(Channel::Luminance).map(|h| h.iter().sum::<u32>()), Some(512));

        ed.open_buffer(gradient()).unwrap();
        assert!(ed.info().is_none());
    }

    #[test]
    fn reopening_restarts_history() {
        let mut ed = Editor::default();
        ed.open_buffer(gradient()).unwrap();
        ed.confirm_edit(PixelBuffer::filled(2, 2, ChannelLayout::Rgb, &[0, 0, 0]), "edit");
        ed.open_buffer(PixelBuffer::filled(3, 3, ChannelLayout::Rgb, &[9, 9, 9])).unwrap();
        assert_eq!(ed.history().map(|h| h.len()), Some(1));
        assert_eq!(ed.canvas().previous_image(), None);
    }
}
