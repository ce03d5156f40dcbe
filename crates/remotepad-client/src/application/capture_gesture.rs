//! Gesture capture: turns raw pointer events into intents.
//!
//! Two surfaces are recognised independently:
//!
//! - The **trackpad** classifies by how many contacts the gesture reached.
//!   One finger moves the cursor, two fingers scroll vertically, and a
//!   release without travel beyond the tap slop is a left (one finger) or
//!   right (two fingers) click.
//! - The **switcher** strip drives the host's window switcher: touching it
//!   holds `alt` and taps `tab`, every step of horizontal travel taps `tab`
//!   again (or `shift+tab` going backwards), and lifting releases `alt`.
//!
//! Continuous motion comes out as [`Intent::Motion`] and is fed to the
//! smoother; everything discrete comes out as [`Intent::Command`] and goes
//! straight to the wire.

use std::collections::HashMap;

use remotepad_core::protocol::keys;
use remotepad_core::{Command, MouseButton};
use tracing::warn;

/// Identifier the platform assigns to one finger for the life of a touch.
pub type PointerId = u64;

/// Position in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn distance_to(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Raw pointer event as delivered by the platform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { id: PointerId, at: Point },
    Move { id: PointerId, at: Point },
    Up { id: PointerId, at: Point },
    /// The platform took the touch away (system gesture, focus loss).
    Cancel { id: PointerId },
}

/// Which region of the screen an event landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Trackpad,
    Switcher,
}

/// Continuous motion, accumulated and smoothed before sending.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Motion {
    Move { dx: f64, dy: f64 },
    Scroll { dx: f64, dy: f64 },
}

/// Output of gesture recognition.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Motion(Motion),
    Command(Command),
}

/// Receives intents as they are recognised.  Implementations must not block.
pub trait IntentSink {
    fn submit(&self, intent: Intent);
}

/// Tunables for the recognisers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureConfig {
    /// Travel in pixels beyond which a touch is a drag rather than a tap.
    pub tap_slop: f64,
    /// Horizontal travel in pixels per switcher step.
    pub switch_step_width: f64,
}

const DEFAULT_TAP_SLOP: f64 = 10.0;
const DEFAULT_STEP_WIDTH: f64 = 70.0;
/// Narrower steps would turn one swipe into an unbounded burst of tabs.
const MIN_STEP_WIDTH: f64 = 1.0;

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            tap_slop: DEFAULT_TAP_SLOP,
            switch_step_width: DEFAULT_STEP_WIDTH,
        }
    }
}

impl GestureConfig {
    /// Replaces values the recognisers cannot work with by their defaults.
    pub fn sanitized(self) -> Self {
        Self {
            tap_slop: checked_tap_slop(self.tap_slop),
            switch_step_width: checked_step_width(self.switch_step_width),
        }
    }
}

fn checked_tap_slop(tap_slop: f64) -> f64 {
    if tap_slop.is_finite() && tap_slop >= 0.0 {
        tap_slop
    } else {
        warn!("tap slop {tap_slop} is invalid, using {DEFAULT_TAP_SLOP}");
        DEFAULT_TAP_SLOP
    }
}

fn checked_step_width(step_width: f64) -> f64 {
    if step_width.is_finite() && step_width >= MIN_STEP_WIDTH {
        step_width
    } else {
        warn!("switcher step width {step_width} is invalid, using {DEFAULT_STEP_WIDTH}");
        DEFAULT_STEP_WIDTH
    }
}

// ── Trackpad ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Contact {
    origin: Point,
    at: Point,
}

/// Recogniser for the main trackpad surface.
#[derive(Debug)]
pub struct TrackpadRecognizer {
    tap_slop: f64,
    contacts: HashMap<PointerId, Contact>,
    /// Most contacts seen at once since the first finger went down.
    peak: usize,
    /// Set once any contact travelled beyond the tap slop.
    dragging: bool,
    cancelled: bool,
    /// Position motion deltas are measured from (contact or centroid).
    reference: Option<Point>,
}

impl TrackpadRecognizer {
    /// An invalid `tap_slop` (negative or not finite) falls back to the default.
    pub fn new(tap_slop: f64) -> Self {
        Self {
            tap_slop: checked_tap_slop(tap_slop),
            contacts: HashMap::new(),
            peak: 0,
            dragging: false,
            cancelled: false,
            reference: None,
        }
    }

    pub fn handle(&mut self, event: PointerEvent) -> Option<Intent> {
        match event {
            PointerEvent::Down { id, at } => {
                self.contacts.insert(id, Contact { origin: at, at });
                self.peak = self.peak.max(self.contacts.len());
                self.reference = self.anchor();
                None
            }
            PointerEvent::Move { id, at } => {
                let contact = self.contacts.get_mut(&id)?;
                contact.at = at;
                if !self.dragging && contact.origin.distance_to(at) > self.tap_slop {
                    self.dragging = true;
                }
                if !self.dragging {
                    return None;
                }
                self.motion()
            }
            PointerEvent::Up { id, at } => {
                if let Some(contact) = self.contacts.get_mut(&id) {
                    contact.at = at;
                }
                self.lift(id)
            }
            PointerEvent::Cancel { id } => {
                if self.contacts.contains_key(&id) {
                    self.cancelled = true;
                }
                self.lift(id)
            }
        }
    }

    fn motion(&mut self) -> Option<Intent> {
        let count = self.contacts.len();
        // Only gestures that have stayed at their peak contact count move anything.
        if count != self.peak {
            return None;
        }
        let anchor = self.anchor()?;
        let reference = self.reference.replace(anchor)?;
        let (dx, dy) = (anchor.x - reference.x, anchor.y - reference.y);
        match count {
            1 if dx != 0.0 || dy != 0.0 => Some(Intent::Motion(Motion::Move { dx, dy })),
            2 if dy != 0.0 => Some(Intent::Motion(Motion::Scroll { dx: 0.0, dy })),
            _ => None,
        }
    }

    fn lift(&mut self, id: PointerId) -> Option<Intent> {
        self.contacts.remove(&id)?;
        if !self.contacts.is_empty() {
            self.reference = self.anchor();
            return None;
        }
        let click = if self.dragging || self.cancelled {
            None
        } else {
            match self.peak {
                1 => Some(MouseButton::Left),
                2 => Some(MouseButton::Right),
                _ => None,
            }
        };
        self.reset();
        click.map(|button| Intent::Command(Command::Click { button }))
    }

    /// Centroid of the current contacts.
    fn anchor(&self) -> Option<Point> {
        if self.contacts.is_empty() {
            return None;
        }
        let n = self.contacts.len() as f64;
        let (sx, sy) = self
            .contacts
            .values()
            .fold((0.0, 0.0), |(sx, sy), c| (sx + c.at.x, sy + c.at.y));
        Some(Point::new(sx / n, sy / n))
    }

    fn reset(&mut self) {
        self.contacts.clear();
        self.peak = 0;
        self.dragging = false;
        self.cancelled = false;
        self.reference = None;
    }
}

// ── Switcher ──────────────────────────────────────────────────────────────────

/// Recogniser for the window-switcher strip.
///
/// Holds `alt` for as long as a finger is on the strip.  The release is
/// emitted exactly once per engagement, whichever of lift, cancel or
/// [`SwitcherRecognizer::finalize`] happens first.
#[derive(Debug)]
pub struct SwitcherRecognizer {
    step_width: f64,
    pointer: Option<PointerId>,
    origin_x: f64,
    steps: i64,
}

impl SwitcherRecognizer {
    /// A `step_width` below one pixel or not finite falls back to the default.
    pub fn new(step_width: f64) -> Self {
        Self {
            step_width: checked_step_width(step_width),
            pointer: None,
            origin_x: 0.0,
            steps: 0,
        }
    }

    pub fn is_engaged(&self) -> bool {
        self.pointer.is_some()
    }

    pub fn handle(&mut self, event: PointerEvent) -> Vec<Command> {
        match event {
            PointerEvent::Down { id, at } if self.pointer.is_none() => {
                self.pointer = Some(id);
                self.origin_x = at.x;
                self.steps = 0;
                vec![Command::key_down(keys::ALT), Command::tap(keys::TAB)]
            }
            PointerEvent::Move { id, at } if self.pointer == Some(id) => self.step_to(at.x),
            PointerEvent::Up { id, .. } | PointerEvent::Cancel { id }
                if self.pointer == Some(id) =>
            {
                self.finalize()
            }
            _ => Vec::new(),
        }
    }

    /// Releases the held modifier if the strip is engaged.
    pub fn finalize(&mut self) -> Vec<Command> {
        match self.pointer.take() {
            Some(_) => vec![Command::key_up(keys::ALT)],
            None => Vec::new(),
        }
    }

    fn step_to(&mut self, x: f64) -> Vec<Command> {
        if !x.is_finite() {
            return Vec::new();
        }
        let step = ((x - self.origin_x) / self.step_width).round() as i64;
        let diff = step - self.steps;
        self.steps = step;

        let mut out = Vec::new();
        if diff > 0 {
            for _ in 0..diff {
                out.push(Command::tap(keys::TAB));
            }
        } else {
            for _ in 0..diff.unsigned_abs() {
                out.push(Command::key_down(keys::SHIFT));
                out.push(Command::tap(keys::TAB));
                out.push(Command::key_up(keys::SHIFT));
            }
        }
        out
    }
}

// ── Facade ────────────────────────────────────────────────────────────────────

/// Both recognisers, evaluated side by side.
#[derive(Debug)]
pub struct GestureCapture {
    trackpad: TrackpadRecognizer,
    switcher: SwitcherRecognizer,
}

impl GestureCapture {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            trackpad: TrackpadRecognizer::new(config.tap_slop),
            switcher: SwitcherRecognizer::new(config.switch_step_width),
        }
    }

    pub fn handle(&mut self, surface: Surface, event: PointerEvent) -> Vec<Intent> {
        match surface {
            Surface::Trackpad => self.trackpad.handle(event).into_iter().collect(),
            Surface::Switcher => self
                .switcher
                .handle(event)
                .into_iter()
                .map(Intent::Command)
                .collect(),
        }
    }

    /// Recognises `event` and forwards every resulting intent to `sink`.
    pub fn dispatch(&mut self, surface: Surface, event: PointerEvent, sink: &impl IntentSink) {
        for intent in self.handle(surface, event) {
            sink.submit(intent);
        }
    }

    /// Releases anything held; call when the view goes away mid-gesture.
    pub fn finalize(&mut self) -> Vec<Intent> {
        self.trackpad.reset();
        self.switcher
            .finalize()
            .into_iter()
            .map(Intent::Command)
            .collect()
    }
}

impl Default for GestureCapture {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}
