//! Main application module implementing the Cosmic Application trait
//!
//! This is the central hub of the application, implementing libCosmic's
//! Application trait for window management and message routing. Network and
//! file work runs as tasks whose results come back as messages; every result
//! carries the ticket of the request it answers so late arrivals are dropped.

use crate::api::ApiClient;
use crate::config::{Config, APP_ID};
use crate::file_handler;
use crate::menu::{keyboard_shortcuts_subscription, resize_subscription, Action as MenuAction};
use crate::message::{
    AlertMessage, ConvertMessage, DialogMessage, EditorMessage, FileMessage, LayoutMessage,
    Message, OcrMessage, PreviewMessage, SystemMessage,
};
use crate::ocr::{clipboard, CandidateImage};
use crate::preview::{CodeHighlighter, MathEngineStatus, MathTypesetter, UnicodeTypesetter};
use crate::state::{
    formula_snippet, AlertLevel, AppState, ContainerBounds, ConvertRefusal, PendingConfirm,
    RecognitionOutcome, RenderTicket,
};
use crate::ui;

use chrono::Local;
use cosmic::app::{Core, Task};
use cosmic::iced::{time, Subscription};
use cosmic::widget::menu::KeyBind;
use cosmic::widget::text_editor::{Action, Edit, Motion};
use cosmic::widget::{image, text_editor};
use cosmic::{Application, ApplicationExt, Element};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Extensions offered by the formula image picker
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];

/// Cosmic Md2Word Application
pub struct CosmicMd2Word {
    /// libCosmic core reference
    core: Core,

    /// Application state
    pub state: AppState,

    /// Text editor widget contents, mirrored into `state.editor`
    pub editor_content: text_editor::Content,

    /// Decoded pixels of the selected formula image
    ocr_preview: Option<image::Handle>,

    /// Backend client, or why it could not be built
    api: Result<ApiClient, String>,

    /// Code block highlighter for the preview
    highlighter: Arc<CodeHighlighter>,

    /// Keyboard shortcut bindings
    key_binds: HashMap<KeyBind, MenuAction>,
}

/// Application flags passed during initialization
#[derive(Debug, Clone, Default)]
pub struct Flags {
    /// Base URL override from the command line
    pub server: Option<String>,

    /// Markdown file to load at startup
    pub file: Option<PathBuf>,
}

impl Application for CosmicMd2Word {
    /// Executor for async tasks
    type Executor = cosmic::executor::Default;

    /// Application flags
    type Flags = Flags;

    /// Application message type
    type Message = Message;

    /// Application ID following reverse-DNS convention
    const APP_ID: &'static str = APP_ID;

    fn core(&self) -> &Core {
        &self.core
    }

    fn core_mut(&mut self) -> &mut Core {
        &mut self.core
    }

    /// Initialize the application
    fn init(core: Core, flags: Self::Flags) -> (Self, Task<Self::Message>) {
        let mut config = Config::load().unwrap_or_else(|e| {
            log::warn!("Using default configuration: {}", e);
            Config::default()
        });
        if let Some(server) = flags.server {
            config.server.base_url = server;
        }
        log::info!("Backend at {}", config.server.base_url);

        let api = ApiClient::new(&config.server).map_err(|e| {
            log::error!("Cannot use backend: {}", e);
            e.to_string()
        });

        let mut app = Self {
            core,
            state: AppState::new(config),
            editor_content: text_editor::Content::new(),
            ocr_preview: None,
            api,
            highlighter: Arc::new(CodeHighlighter::new(cosmic::theme::is_dark())),
            key_binds: crate::menu::key_binds(),
        };

        app.set_header_title("Markdown to Word".to_string());

        let mut tasks = vec![app.start_math_engine()];

        // Empty buffer: placeholder, counters and timestamp without a request
        let initial = app.state.apply_update(Local::now());
        tasks.push(app.render_preview(initial));

        if let Err(e) = &app.api {
            let message = e.clone();
            tasks.push(app.alert(AlertLevel::Error, message));
        }

        if let Some(path) = flags.file {
            tasks.push(Task::perform(
                async move {
                    file_handler::read_document(&path)
                        .await
                        .map_err(|e| e.user_message())
                },
                |result| Self::app_message(Message::File(FileMessage::LocalLoaded(result))),
            ));
        }

        (app, Task::batch(tasks))
    }

    /// Handle incoming messages
    fn update(&mut self, message: Self::Message) -> Task<Self::Message> {
        match message {
            Message::Editor(msg) => self.handle_editor_message(msg),
            Message::Preview(msg) => self.handle_preview_message(msg),
            Message::Convert(msg) => self.handle_convert_message(msg),
            Message::Ocr(msg) => self.handle_ocr_message(msg),
            Message::Layout(msg) => self.handle_layout_message(msg),
            Message::Alert(msg) => self.handle_alert_message(msg),
            Message::File(msg) => self.handle_file_message(msg),
            Message::Dialog(msg) => self.handle_dialog_message(msg),
            Message::System(msg) => self.handle_system_message(msg),
            Message::Surface(_) => Task::none(), // Surface actions are handled by libcosmic
            Message::None => Task::none(),
        }
    }

    /// Render the application view
    fn view(&self) -> Element<'_, Self::Message> {
        ui::view(&self.state, &self.editor_content)
    }

    /// Modal overlay: the confirmation prompt wins over formula recognition
    fn dialog(&self) -> Option<Element<'_, Self::Message>> {
        if let Some(pending) = self.state.pending_confirm {
            return Some(ui::confirm_dialog(pending));
        }
        if self.state.ocr.is_open() {
            return Some(ui::ocr_dialog(&self.state, self.ocr_preview.as_ref()));
        }
        None
    }

    /// Handle subscription events
    fn subscription(&self) -> Subscription<Self::Message> {
        let mut subscriptions = vec![keyboard_shortcuts_subscription()];

        if self.state.layout.is_resizing() {
            subscriptions.push(resize_subscription());
        }

        if self.state.math.is_polling() {
            subscriptions.push(
                time::every(self.state.config.math.poll_interval())
                    .map(|_| Message::Preview(PreviewMessage::PollEngine)),
            );
        }

        Subscription::batch(subscriptions)
    }

    /// Elements to show at the start of the header bar (menu bar)
    fn header_start(&self) -> Vec<Element<'_, Self::Message>> {
        use cosmic::widget::menu::ItemHeight;
        use cosmic::widget::responsive_menu_bar;

        let menu_bar = responsive_menu_bar()
            .item_height(ItemHeight::Dynamic(40))
            .into_element(
                self.core(),
                &self.key_binds,
                cosmic::widget::Id::new("menu-bar"),
                Message::Surface,
                crate::menu::menu_items(),
            );

        vec![menu_bar]
    }
}

impl CosmicMd2Word {
    /// Helper to wrap message in cosmic Action
    fn app_message(msg: Message) -> cosmic::Action<Message> {
        cosmic::Action::App(msg)
    }

    /// Deliver `msg` after `delay`
    fn after(delay: Duration, msg: Message) -> Task<Message> {
        Task::perform(tokio::time::sleep(delay), move |_| Self::app_message(msg))
    }

    /// Show an alert and schedule its expiry
    fn alert(&mut self, level: AlertLevel, message: impl Into<String>) -> Task<Message> {
        self.state.alerts.show(level, message);
        self.expire_current_alert()
    }

    fn expire_current_alert(&self) -> Task<Message> {
        match self.state.alerts.current() {
            Some(alert) => Self::after(
                self.state.config.ui.alert_duration(),
                Message::Alert(AlertMessage::Expire(alert.id)),
            ),
            None => Task::none(),
        }
    }

    /// Build the math engine off the update loop
    fn start_math_engine(&mut self) -> Task<Message> {
        self.state.math.begin_initialization();
        let macros = Config::macros_path().ok();
        Task::perform(
            async move {
                UnicodeTypesetter::load(macros)
                    .await
                    .map(|engine| Arc::new(engine) as Arc<dyn MathTypesetter>)
            },
            |result| Self::app_message(Message::Preview(PreviewMessage::EngineLoaded(result))),
        )
    }

    /// Send the buffer to the render service for `ticket`
    fn render_preview(&self, ticket: Option<RenderTicket>) -> Task<Message> {
        let Some(ticket) = ticket else {
            return Task::none();
        };
        let api = self.api.clone();
        let content = self.state.editor.text();
        Task::perform(
            async move {
                let api = api?;
                api.preview(&content).await.map_err(|e| e.to_string())
            },
            move |result| {
                Self::app_message(Message::Preview(PreviewMessage::Rendered { ticket, result }))
            },
        )
    }

    /// Typeset the preview's math, or come back later while the engine loads
    fn typeset_preview(&mut self) -> Task<Message> {
        if !self.state.preview.needs_typeset() {
            return Task::none();
        }
        match self.state.math.typesetter() {
            Some(engine) => {
                if let Some(report) = self.state.preview.typeset(engine.as_ref()) {
                    log::debug!(
                        "typeset {} formula(s), {} failed",
                        report.rendered,
                        report.failed
                    );
                }
                Task::none()
            }
            None if self.state.math.status() == MathEngineStatus::Failed => {
                log::debug!("math engine unavailable, showing raw LaTeX");
                Task::none()
            }
            None => Self::after(
                self.state.config.math.retry_delay(),
                Message::Preview(PreviewMessage::RetryTypeset(
                    self.state.preview.current_ticket(),
                )),
            ),
        }
    }

    /// Point the buffer caret at the widget cursor
    fn sync_caret(&mut self) {
        let (line, column) = self.editor_content.cursor_position();
        self.state.editor.set_caret_from_cursor(line, column);
    }

    /// Replace the buffer and widget contents, then take the debounced path
    fn load_text(&mut self, text: &str) -> Task<Message> {
        self.editor_content = text_editor::Content::with_text(text);
        let ticket = self.state.editor.on_change(text);
        self.sync_caret();
        Self::after(
            self.state.config.editor.debounce(),
            Message::Editor(EditorMessage::Settled(ticket)),
        )
    }

    fn clear_document(&mut self) -> Task<Message> {
        self.editor_content = text_editor::Content::new();
        let render = self.state.replace_document("", Local::now());
        Task::batch([
            self.render_preview(render),
            self.alert(AlertLevel::Success, "Content cleared"),
        ])
    }

    /// Read and validate an image file for recognition
    fn load_image(&mut self, path: PathBuf) -> Task<Message> {
        let ticket = self.state.ocr.begin_image_load();
        let max = self.state.config.ocr.max_image_bytes;
        Task::perform(
            async move {
                CandidateImage::from_path(&path, max)
                    .await
                    .map_err(|e| e.user_message())
            },
            move |result| {
                Self::app_message(Message::Ocr(OcrMessage::ImageLoaded { ticket, result }))
            },
        )
    }

    fn paste_image(&mut self) -> Task<Message> {
        let ticket = self.state.ocr.begin_image_load();
        let max = self.state.config.ocr.max_image_bytes;
        Task::perform(
            async move {
                clipboard::read_image_async(max)
                    .await
                    .map_err(|e| e.user_message())
            },
            move |result| {
                Self::app_message(Message::Ocr(OcrMessage::ImageLoaded { ticket, result }))
            },
        )
    }

    /// Handle editor-related messages
    fn handle_editor_message(&mut self, msg: EditorMessage) -> Task<Message> {
        match msg {
            EditorMessage::Action(action) => {
                let is_edit = action.is_edit();
                self.editor_content.perform(action);

                let ticket = is_edit.then(|| {
                    let text = self.editor_content.text();
                    self.state.editor.on_change(&text)
                });

                self.sync_caret();

                match ticket {
                    Some(ticket) => Self::after(
                        self.state.config.editor.debounce(),
                        Message::Editor(EditorMessage::Settled(ticket)),
                    ),
                    None => Task::none(),
                }
            }

            EditorMessage::Settled(ticket) => {
                if !self.state.editor.is_current(ticket) {
                    return Task::none();
                }
                let render = self.state.apply_update(Local::now());
                self.render_preview(render)
            }
        }
    }

    /// Handle preview-related messages
    fn handle_preview_message(&mut self, msg: PreviewMessage) -> Task<Message> {
        match msg {
            PreviewMessage::Rendered { ticket, result } => {
                if !self.state.preview.complete(ticket, result) {
                    return Task::none();
                }
                self.state.preview.highlight(&self.highlighter);
                self.typeset_preview()
            }

            PreviewMessage::RetryTypeset(ticket) => {
                if !self.state.preview.is_current(ticket) {
                    return Task::none();
                }
                self.typeset_preview()
            }

            PreviewMessage::EngineLoaded(Ok(engine)) => {
                self.state.math.install(engine);
                self.typeset_preview()
            }

            PreviewMessage::EngineLoaded(Err(e)) => {
                self.state.math.fail(&e);
                self.alert(AlertLevel::Error, format!("Math renderer failed to load: {}", e))
            }

            PreviewMessage::PollEngine => {
                let status = self.state.math.poll(Instant::now());
                if status == MathEngineStatus::Failed {
                    log::warn!("{}", status.display_name());
                }
                Task::none()
            }
        }
    }

    /// Handle conversion messages
    fn handle_convert_message(&mut self, msg: ConvertMessage) -> Task<Message> {
        match msg {
            ConvertMessage::Start => {
                let content = self.state.editor.text();
                match self.state.conversion.try_begin(&content) {
                    Ok(()) => {
                        let api = self.api.clone();
                        let filename = self.state.config.editor.convert_filename.clone();
                        Task::perform(
                            async move {
                                let api = api?;
                                api.convert(&content, &filename)
                                    .await
                                    .map_err(|e| e.to_string())
                            },
                            |result| {
                                Self::app_message(Message::Convert(ConvertMessage::Finished(
                                    result,
                                )))
                            },
                        )
                    }
                    Err(ConvertRefusal::Busy) => {
                        log::debug!("conversion already running");
                        Task::none()
                    }
                    Err(refusal) => self.alert(AlertLevel::Error, refusal.to_string()),
                }
            }

            ConvertMessage::Finished(result) => match self.state.conversion.finish(result) {
                Ok(document) => {
                    log::info!(
                        "conversion ready: {} ({})",
                        document.filename,
                        document.download_id
                    );
                    let api = self.api.clone();
                    let dir = self.state.config.download_dir();
                    Task::perform(
                        async move {
                            let api = api?;
                            let bytes = api.download(&document).await.map_err(|e| e.to_string())?;
                            file_handler::save_download(&dir, &document.filename, &bytes)
                                .await
                                .map_err(|e| e.user_message())
                        },
                        |result| Self::app_message(Message::Convert(ConvertMessage::Saved(result))),
                    )
                }
                Err(e) => self.alert(AlertLevel::Error, format!("Conversion failed: {}", e)),
            },

            ConvertMessage::Saved(Ok(path)) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                self.alert(
                    AlertLevel::Success,
                    format!("Conversion successful! Saved {}", name),
                )
            }

            ConvertMessage::Saved(Err(e)) => {
                self.alert(AlertLevel::Error, format!("Download failed: {}", e))
            }
        }
    }

    /// Handle formula recognition messages
    fn handle_ocr_message(&mut self, msg: OcrMessage) -> Task<Message> {
        match msg {
            OcrMessage::Open => {
                self.state.ocr.open();
                Task::none()
            }

            OcrMessage::Close => {
                self.state.ocr.close();
                self.ocr_preview = None;
                Task::none()
            }

            OcrMessage::PickImage => Task::perform(
                async {
                    rfd::AsyncFileDialog::new()
                        .set_title("Select Formula Image")
                        .add_filter("Images", IMAGE_EXTENSIONS)
                        .pick_file()
                        .await
                        .map(|handle| handle.path().to_path_buf())
                },
                |path| Self::app_message(Message::Ocr(OcrMessage::ImagePicked(path))),
            ),

            OcrMessage::ImagePicked(Some(path)) => self.load_image(path),

            OcrMessage::ImagePicked(None) => Task::none(),

            OcrMessage::PasteImage => self.paste_image(),

            OcrMessage::ImageLoaded { ticket, result } => {
                match self.state.ocr.accept_image(ticket, result) {
                    None => Task::none(),
                    Some(Ok(())) => {
                        self.ocr_preview = self
                            .state
                            .ocr
                            .image()
                            .and_then(|img| match img.to_rgba() {
                                Ok(pixels) => Some(pixels),
                                Err(e) => {
                                    log::warn!("no preview for {}: {}", img.display_name(), e);
                                    None
                                }
                            })
                            .map(|(width, height, rgba)| {
                                image::Handle::from_rgba(width, height, rgba)
                            });
                        Task::none()
                    }
                    Some(Err(message)) => self.alert(AlertLevel::Error, message),
                }
            }

            OcrMessage::Recognize => {
                let Some((ticket, image)) = self.state.ocr.begin_recognition() else {
                    return Task::none();
                };
                let api = self.api.clone();
                Task::perform(
                    async move {
                        let png = match image.to_png() {
                            Ok(png) => png,
                            Err(e) => {
                                return RecognitionOutcome::Failed {
                                    message: e.user_message(),
                                    suggestions: Vec::new(),
                                }
                            }
                        };
                        match api {
                            Ok(api) => RecognitionOutcome::from_result(
                                api.recognize_formula(png).await,
                            ),
                            Err(message) => RecognitionOutcome::Failed {
                                message,
                                suggestions: Vec::new(),
                            },
                        }
                    },
                    move |outcome| {
                        Self::app_message(Message::Ocr(OcrMessage::Recognized { ticket, outcome }))
                    },
                )
            }

            OcrMessage::Recognized { ticket, outcome } => {
                self.state.ocr.complete(ticket, outcome);
                Task::none()
            }

            OcrMessage::Insert => {
                // a paste would replace the selection; insert at its end instead
                if self.editor_content.selection().is_some() {
                    self.editor_content.perform(Action::Move(Motion::Right));
                }
                self.sync_caret();
                let snippet = self.state.ocr.recognized_latex().map(formula_snippet);
                match self.state.insert_recognized_formula(Local::now()) {
                    Ok(render) => {
                        if let Some(snippet) = snippet {
                            self.editor_content
                                .perform(Action::Edit(Edit::Paste(Arc::new(snippet))));
                        }
                        self.sync_caret();
                        self.ocr_preview = None;
                        Task::batch([self.render_preview(render), self.expire_current_alert()])
                    }
                    Err(e) => self.alert(AlertLevel::Error, e.to_string()),
                }
            }
        }
    }

    /// Handle layout messages
    fn handle_layout_message(&mut self, msg: LayoutMessage) -> Task<Message> {
        match msg {
            LayoutMessage::StartResize => self.state.layout.start_resize(),
            LayoutMessage::PointerMoved(x) => {
                self.state.layout.handle_resize(x);
            }
            LayoutMessage::StopResize => self.state.layout.stop_resize(),
            LayoutMessage::ToggleFullscreen(panel) => self.state.layout.toggle_fullscreen(panel),
            LayoutMessage::ExitFullscreen => {
                self.state.layout.exit_fullscreen();
            }
        }
        Task::none()
    }

    /// Handle alert messages
    fn handle_alert_message(&mut self, msg: AlertMessage) -> Task<Message> {
        match msg {
            AlertMessage::Expire(id) => {
                self.state.alerts.expire(id);
            }
            AlertMessage::Dismiss => self.state.alerts.dismiss(),
        }
        Task::none()
    }

    /// Handle file-related messages
    fn handle_file_message(&mut self, msg: FileMessage) -> Task<Message> {
        match msg {
            FileMessage::Open => Task::perform(
                async {
                    rfd::AsyncFileDialog::new()
                        .set_title("Open Markdown Document")
                        .add_filter("Markdown", file_handler::DOCUMENT_EXTENSIONS)
                        .pick_file()
                        .await
                        .map(|handle| handle.path().to_path_buf())
                },
                |path| Self::app_message(Message::File(FileMessage::Picked(path))),
            ),

            FileMessage::Picked(None) => Task::none(),

            FileMessage::Picked(Some(path)) => {
                if self.state.uploading {
                    return Task::none();
                }
                self.state.uploading = true;
                let api = self.api.clone();
                Task::perform(
                    async move {
                        let api = api?;
                        let (name, bytes) = file_handler::read_for_upload(&path)
                            .await
                            .map_err(|e| e.user_message())?;
                        api.upload_document(name, bytes)
                            .await
                            .map_err(|e| e.to_string())
                    },
                    |result| Self::app_message(Message::File(FileMessage::Uploaded(result))),
                )
            }

            FileMessage::Uploaded(result) => {
                self.state.uploading = false;
                match result {
                    Ok(content) => {
                        self.editor_content = text_editor::Content::with_text(&content);
                        let render = self.state.replace_document(&content, Local::now());
                        Task::batch([
                            self.render_preview(render),
                            self.alert(AlertLevel::Success, "File uploaded successfully"),
                        ])
                    }
                    Err(e) => self.alert(AlertLevel::Error, format!("Upload failed: {}", e)),
                }
            }

            FileMessage::Dropped(path) => {
                log::debug!("dropped {}", path.display());
                let is_image = mime_guess::from_path(&path)
                    .first()
                    .is_some_and(|mime| mime.type_() == mime_guess::mime::IMAGE);

                if self.state.ocr.is_open() || is_image {
                    self.load_image(path)
                } else if file_handler::is_document_path(&path) {
                    Task::perform(
                        async move {
                            file_handler::read_document(&path)
                                .await
                                .map_err(|e| e.user_message())
                        },
                        |result| Self::app_message(Message::File(FileMessage::LocalLoaded(result))),
                    )
                } else {
                    let message = crate::error::FileError::Unsupported { path }.user_message();
                    self.alert(AlertLevel::Error, message)
                }
            }

            FileMessage::LocalLoaded(Ok(text)) => self.load_text(&text),

            FileMessage::LocalLoaded(Err(e)) => self.alert(AlertLevel::Error, e),

            FileMessage::Clear => {
                if self.state.request_clear() {
                    Task::none()
                } else {
                    self.clear_document()
                }
            }
        }
    }

    /// Handle dialog-related messages
    fn handle_dialog_message(&mut self, msg: DialogMessage) -> Task<Message> {
        match msg {
            DialogMessage::Confirm => match self.state.pending_confirm.take() {
                Some(PendingConfirm::ClearDocument) => self.clear_document(),
                Some(PendingConfirm::RecognizePastedImage) => self.paste_image(),
                None => Task::none(),
            },

            DialogMessage::Cancel => {
                self.state.pending_confirm = None;
                Task::none()
            }
        }
    }

    /// Handle system-related messages
    fn handle_system_message(&mut self, msg: SystemMessage) -> Task<Message> {
        match msg {
            SystemMessage::UnhandledPaste => {
                if self.state.ocr.is_open() {
                    return self.paste_image();
                }
                if self.state.pending_confirm.is_some() {
                    return Task::none();
                }
                Task::perform(
                    async {
                        tokio::task::spawn_blocking(clipboard::has_image)
                            .await
                            .unwrap_or(false)
                    },
                    |has_image| {
                        Self::app_message(Message::System(SystemMessage::ClipboardChecked {
                            has_image,
                        }))
                    },
                )
            }

            SystemMessage::ClipboardChecked { has_image: true } => {
                if !self.state.ocr.is_open() {
                    self.state.pending_confirm = Some(PendingConfirm::RecognizePastedImage);
                }
                Task::none()
            }

            SystemMessage::ClipboardChecked { has_image: false } => self.alert(
                AlertLevel::Info,
                "Paste an image to recognize a formula, or press Ctrl+Shift+F",
            ),

            SystemMessage::Escape => {
                self.state.layout.exit_fullscreen();
                if self.state.pending_confirm.take().is_none() && self.state.ocr.is_open() {
                    self.state.ocr.close();
                    self.ocr_preview = None;
                }
                Task::none()
            }

            SystemMessage::WindowResized { width, height } => {
                log::debug!("window resized to {}x{}", width, height);
                self.state.layout.set_bounds(ContainerBounds { left: 0.0, width });
                Task::none()
            }
        }
    }
}
