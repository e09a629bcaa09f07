//! Menu bar and keyboard shortcut handling
//!
//! Provides the application menu bar, keyboard shortcut definitions and the
//! raw window event routing (file drops, unhandled pastes, resize drags).

use cosmic::iced::keyboard::Key;
use cosmic::iced::{event, keyboard, mouse, window, Event, Subscription};
use cosmic::iced_futures::event::listen_raw;
use cosmic::widget::menu::action::MenuAction;
use cosmic::widget::menu::key_bind::Modifier;
use cosmic::widget::menu::{Item, KeyBind};
use std::collections::HashMap;

use crate::message::{
    ConvertMessage, FileMessage, LayoutMessage, Message, OcrMessage, SystemMessage,
};
use crate::state::Panel;

/// Menu actions that can be triggered from the menu bar or keyboard shortcuts
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Action {
    // Document actions
    OpenDocument,
    ClearDocument,
    ConvertToWord,

    // Tools
    RecognizeFormula,

    // View actions
    ToggleEditorFullscreen,
    TogglePreviewFullscreen,
}

impl MenuAction for Action {
    type Message = Message;

    fn message(&self) -> Self::Message {
        self.to_message()
    }
}

impl Action {
    /// Convert action to application message
    pub fn to_message(self) -> Message {
        match self {
            Action::OpenDocument => Message::File(FileMessage::Open),
            Action::ClearDocument => Message::File(FileMessage::Clear),
            Action::ConvertToWord => Message::Convert(ConvertMessage::Start),
            Action::RecognizeFormula => Message::Ocr(OcrMessage::Open),
            Action::ToggleEditorFullscreen => {
                Message::Layout(LayoutMessage::ToggleFullscreen(Panel::Editor))
            }
            Action::TogglePreviewFullscreen => {
                Message::Layout(LayoutMessage::ToggleFullscreen(Panel::Preview))
            }
        }
    }
}

/// Create default keyboard shortcuts
pub fn key_binds() -> HashMap<KeyBind, Action> {
    let mut binds = HashMap::new();

    binds.insert(
        KeyBind {
            modifiers: vec![Modifier::Ctrl],
            key: Key::Character("o".into()),
        },
        Action::OpenDocument,
    );
    binds.insert(
        KeyBind {
            modifiers: vec![Modifier::Ctrl],
            key: Key::Character("n".into()),
        },
        Action::ClearDocument,
    );
    binds.insert(
        KeyBind {
            modifiers: vec![Modifier::Ctrl],
            key: Key::Character("s".into()),
        },
        Action::ConvertToWord,
    );
    binds.insert(
        KeyBind {
            modifiers: vec![Modifier::Ctrl, Modifier::Shift],
            key: Key::Character("f".into()),
        },
        Action::RecognizeFormula,
    );
    binds.insert(
        KeyBind {
            modifiers: vec![],
            key: Key::Named(keyboard::key::Named::F11),
        },
        Action::TogglePreviewFullscreen,
    );

    binds
}

/// Type alias for menu items with our action type
pub type MenuItems = Vec<(&'static str, Vec<Item<Action, &'static str>>)>;

/// Create menu bar items
pub fn menu_items() -> MenuItems {
    vec![
        (
            "Document",
            vec![
                Item::Button("Open...", None, Action::OpenDocument),
                Item::Button("Convert to Word", None, Action::ConvertToWord),
                Item::Divider,
                Item::Button("Clear", None, Action::ClearDocument),
            ],
        ),
        (
            "Tools",
            vec![Item::Button(
                "Recognize Formula...",
                None,
                Action::RecognizeFormula,
            )],
        ),
        (
            "View",
            vec![
                Item::Button("Fullscreen Editor", None, Action::ToggleEditorFullscreen),
                Item::Button("Fullscreen Preview", None, Action::TogglePreviewFullscreen),
            ],
        ),
    ]
}

/// Map a key press to a message
///
/// Shortcuts apply even while the editor has focus. Ctrl+V only counts when
/// no widget consumed it, which is how an image paste outside any text
/// input is detected.
pub fn shortcut_message(
    key: &Key,
    modifiers: keyboard::Modifiers,
    status: event::Status,
) -> Option<Message> {
    if let Key::Named(named) = key {
        return match named {
            keyboard::key::Named::Escape => Some(Message::System(SystemMessage::Escape)),
            keyboard::key::Named::F11 => Some(Action::TogglePreviewFullscreen.to_message()),
            _ => None,
        };
    }

    let Key::Character(c) = key else {
        return None;
    };
    if !modifiers.control() || modifiers.alt() {
        return None;
    }
    let c_lower = c.to_lowercase();

    if modifiers.shift() {
        return match c_lower.as_str() {
            "f" => Some(Action::RecognizeFormula.to_message()),
            _ => None,
        };
    }

    match c_lower.as_str() {
        "s" => Some(Action::ConvertToWord.to_message()),
        "o" => Some(Action::OpenDocument.to_message()),
        "n" => Some(Action::ClearDocument.to_message()),
        "v" if status == event::Status::Ignored => {
            Some(Message::System(SystemMessage::UnhandledPaste))
        }
        _ => None,
    }
}

/// Keyboard shortcuts and window events subscription
pub fn keyboard_shortcuts_subscription() -> Subscription<Message> {
    listen_raw(|event, status, _| match event {
        Event::Keyboard(keyboard::Event::KeyPressed { key, modifiers, .. }) => {
            shortcut_message(&key, modifiers, status)
        }
        Event::Window(window::Event::FileDropped(path)) => {
            Some(Message::File(FileMessage::Dropped(path)))
        }
        Event::Window(window::Event::Resized(size)) => {
            Some(Message::System(SystemMessage::WindowResized {
                width: size.width,
                height: size.height,
            }))
        }
        _ => None,
    })
}

/// Pointer tracking while the divider is being dragged
pub fn resize_subscription() -> Subscription<Message> {
    listen_raw(|event, _, _| match event {
        Event::Mouse(mouse::Event::CursorMoved { position }) => {
            Some(Message::Layout(LayoutMessage::PointerMoved(position.x)))
        }
        Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) => {
            Some(Message::Layout(LayoutMessage::StopResize))
        }
        _ => None,
    })
}
