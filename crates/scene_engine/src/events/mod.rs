//! Input and window events
//!
//! The windowing layer lives outside this crate. It translates its native
//! events into [`Event`] values and hands them to
//! [`Scene::handle_event`](crate::scene::Scene::handle_event), which forwards
//! them to every component that opted into event handling.

/// Keys the built-in components react to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// W
    W,
    /// A
    A,
    /// S
    S,
    /// D
    D,
    /// Q
    Q,
    /// E
    E,
    /// Space bar
    Space,
    /// Left shift
    LeftShift,
    /// Escape
    Escape,
    /// Any other key, by platform scancode
    Other(u32),
}

/// Mouse buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Primary button
    Left,
    /// Secondary button
    Right,
    /// Wheel button
    Middle,
    /// Extra buttons by index
    Other(u8),
}

/// Event type identification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// Keyboard key changed state
    Key,
    /// Mouse cursor moved
    MouseMoved,
    /// Mouse button changed state
    MouseButton,
    /// Swapchain surface changed size
    Resized,
}

/// Event payload
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// Keyboard key pressed or released
    Key {
        /// Which key
        key: Key,
        /// `true` on press, `false` on release
        pressed: bool,
    },
    /// Cursor position in window pixels
    MouseMoved {
        /// Horizontal position
        x: f32,
        /// Vertical position
        y: f32,
    },
    /// Mouse button pressed or released
    MouseButton {
        /// Which button
        button: MouseButton,
        /// `true` on press, `false` on release
        pressed: bool,
    },
    /// New drawable extent in pixels
    Resized {
        /// Width
        width: u32,
        /// Height
        height: u32,
    },
}

/// A timestamped input or window event
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// What happened
    pub kind: EventKind,
    /// Timestamp when event was created (seconds)
    pub timestamp: f64,
}

impl Event {
    /// Create a new event
    pub fn new(kind: EventKind, timestamp: f64) -> Self {
        Self { kind, timestamp }
    }

    /// Key press event
    pub fn key_pressed(key: Key, timestamp: f64) -> Self {
        Self::new(EventKind::Key { key, pressed: true }, timestamp)
    }

    /// Key release event
    pub fn key_released(key: Key, timestamp: f64) -> Self {
        Self::new(EventKind::Key { key, pressed: false }, timestamp)
    }

    /// Cursor movement event
    pub fn mouse_moved(x: f32, y: f32, timestamp: f64) -> Self {
        Self::new(EventKind::MouseMoved { x, y }, timestamp)
    }

    /// Surface resize event
    pub fn resized(width: u32, height: u32, timestamp: f64) -> Self {
        Self::new(EventKind::Resized { width, height }, timestamp)
    }

    /// Type of this event
    pub fn event_type(&self) -> EventType {
        match self.kind {
            EventKind::Key { .. } => EventType::Key,
            EventKind::MouseMoved { .. } => EventType::MouseMoved,
            EventKind::MouseButton { .. } => EventType::MouseButton,
            EventKind::Resized { .. } => EventType::Resized,
        }
    }

    /// Position argument if this is a cursor event
    pub fn position(&self) -> Option<(f32, f32)> {
        match self.kind {
            EventKind::MouseMoved { x, y } => Some((x, y)),
            _ => None,
        }
    }
}
