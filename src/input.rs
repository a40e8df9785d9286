// Input module
// Platform-neutral events and the key -> slot selection they drive

use crate::assets::Slot;
use log::{debug, info};

/// Keys the demo distinguishes; everything else is `Other`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    /// Any printable key, lowercased
    Char(char),
    Other,
}

/// Events gathered from the platform between two loop iterations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Quit,
    KeyDown(Key),
    /// Anything the loop does not react to
    Other,
}

/// Key that selects the stretch slot
pub const STRETCH_KEY: Key = Key::Char('o');

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Terminated,
}

/// Slot shown while `key` is the last key pressed
pub fn slot_for_key(key: Key) -> Slot {
    match key {
        Key::Up => Slot::Up,
        Key::Down => Slot::Down,
        Key::Left => Slot::Left,
        Key::Right => Slot::Right,
        k if k == STRETCH_KEY => Slot::Stretch,
        _ => Slot::Default,
    }
}

/// The currently displayed slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    current: Slot,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            current: Slot::Default,
        }
    }
}

impl Selection {
    pub fn current(&self) -> Slot {
        self.current
    }

    /// Apply one event, returning whether the loop keeps running
    pub fn apply(&mut self, event: Event) -> LoopState {
        match event {
            Event::Quit => {
                info!("Quit requested");
                LoopState::Terminated
            }
            Event::KeyDown(key) => {
                let slot = slot_for_key(key);
                if slot != self.current {
                    debug!("{:?} pressed, showing {} image", key, slot);
                }
                self.current = slot;
                LoopState::Running
            }
            Event::Other => LoopState::Running,
        }
    }

    /// Drain a whole batch of events
    ///
    /// Key presses after a quit in the same batch still update the selection;
    /// the loop stays terminated.
    pub fn drain<I>(&mut self, events: I) -> LoopState
    where
        I: IntoIterator<Item = Event>,
    {
        let mut state = LoopState::Running;
        for event in events {
            if self.apply(event) == LoopState::Terminated {
                state = LoopState::Terminated;
            }
        }
        state
    }
}
