use std::collections::HashSet;

use glam::Vec2;

use crate::camera::MoveDirection;
use crate::frame::PolygonFill;

/// Identifier for a physical keyboard key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Named(NamedKey),
    Character(char),
    Digit(u8),
}

impl KeyCode {
    pub fn from_name(name: &str) -> Option<Self> {
        if let Some(key) = parse_named_key(name) {
            return Some(key);
        }
        let mut chars = name.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) if ch.is_ascii_alphabetic() => {
                Some(Self::Character(ch.to_ascii_uppercase()))
            }
            (Some(ch), None) if ch.is_ascii_digit() => Some(Self::Digit(ch as u8 - b'0')),
            _ => None,
        }
    }
}

fn parse_named_key(name: &str) -> Option<KeyCode> {
    use NamedKey::*;
    let key = match name {
        "Left" => Left,
        "Right" => Right,
        "Up" => Up,
        "Down" => Down,
        "Escape" | "Esc" => Escape,
        "Minus" | "-" => Minus,
        "Equal" | "=" => Equal,
        _ => return None,
    };
    Some(KeyCode::Named(key))
}

/// Non-alphanumeric keys the viewer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Left,
    Right,
    Up,
    Down,
    Escape,
    Minus,
    Equal,
}

/// Fog densities selectable from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FogPreset {
    Clear,
    Light,
    Dense,
}

impl FogPreset {
    pub fn density(self) -> f32 {
        match self {
            FogPreset::Clear => 0.0,
            FogPreset::Light => 0.04,
            FogPreset::Dense => 0.08,
        }
    }
}

/// State change requested by a key that is held during a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Move(MoveDirection),
    /// Spin the rotating part by this many degrees.
    SpinModel(f32),
    /// Rotate the sun around the world Y axis by this many degrees.
    RotateLight(f32),
    /// `None` is the unsupported mode bound to key 4.
    PolygonMode(Option<PolygonFill>),
    Fog(FogPreset),
    PointLight(bool),
}

/// Held-key bindings, evaluated once per frame in this order.
const HELD_BINDINGS: &[(&str, Action)] = &[
    ("W", Action::Move(MoveDirection::Forward)),
    ("S", Action::Move(MoveDirection::Backward)),
    ("A", Action::Move(MoveDirection::Left)),
    ("D", Action::Move(MoveDirection::Right)),
    ("Up", Action::Move(MoveDirection::Up)),
    ("Down", Action::Move(MoveDirection::Down)),
    ("Right", Action::Move(MoveDirection::TurnRight)),
    ("Left", Action::Move(MoveDirection::TurnLeft)),
    ("Q", Action::SpinModel(-1.0)),
    ("E", Action::SpinModel(1.0)),
    ("1", Action::PolygonMode(Some(PolygonFill::Point))),
    ("2", Action::PolygonMode(Some(PolygonFill::Line))),
    ("3", Action::PolygonMode(Some(PolygonFill::Fill))),
    ("4", Action::PolygonMode(None)),
    ("J", Action::RotateLight(-1.0)),
    ("L", Action::RotateLight(1.0)),
    ("0", Action::Fog(FogPreset::Clear)),
    ("Minus", Action::Fog(FogPreset::Light)),
    ("Equal", Action::Fog(FogPreset::Dense)),
    ("Z", Action::PointLight(false)),
    ("X", Action::PointLight(true)),
];

/// Keys handled on the press edge instead of while held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ToggleDepthMap,
    Quit,
}

pub fn command_for(key: KeyCode) -> Option<Command> {
    match key {
        KeyCode::Character('M') => Some(Command::ToggleDepthMap),
        KeyCode::Named(NamedKey::Escape) => Some(Command::Quit),
        _ => None,
    }
}

/// Pressed/released table polled once per frame.
#[derive(Debug, Default)]
pub struct InputState {
    keys: HashSet<KeyCode>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key_down(&mut self, key: KeyCode) {
        self.keys.insert(key);
    }

    pub fn set_key_up(&mut self, key: KeyCode) {
        self.keys.remove(&key);
    }

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys.contains(&key)
    }

    pub fn is_key_down_by_name(&self, name: &str) -> bool {
        KeyCode::from_name(name).is_some_and(|key| self.is_key_down(key))
    }

    /// Actions for every bound key currently held, in binding order.
    pub fn held_actions(&self) -> impl Iterator<Item = Action> + '_ {
        HELD_BINDINGS
            .iter()
            .filter(|(name, _)| self.is_key_down_by_name(name))
            .map(|(_, action)| *action)
    }
}

/// Turns absolute cursor positions into scaled pitch/yaw deltas.
#[derive(Debug, Clone, Copy)]
pub struct MouseTracker {
    last: Vec2,
    sensitivity: f32,
}

impl MouseTracker {
    /// `origin` is the position the first delta is measured from, normally
    /// the window centre.
    pub fn new(origin: Vec2, sensitivity: f32) -> Self {
        Self {
            last: origin,
            sensitivity,
        }
    }

    /// Returns `(pitch_delta, yaw_delta)` in degrees: vertical motion
    /// pitches, horizontal motion yaws.
    pub fn track(&mut self, position: Vec2) -> (f32, f32) {
        let delta = (position - self.last) * self.sensitivity;
        self.last = position;
        (delta.y, delta.x)
    }
}
