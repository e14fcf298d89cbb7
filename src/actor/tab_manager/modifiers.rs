use crate::sys::event::Modifiers;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModifierSource {
    #[default]
    Key,
    Poll,
}

/// Held modifiers as seen from two sources: key events, and the pointer's
/// modifier mask sampled while a drag is in progress. Key events can be
/// swallowed by other clients, so the poll is kept as a second opinion.
/// Whichever source reported last wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModifierTracker {
    from_keys: Modifiers,
    from_poll: Modifiers,
    current: Modifiers,
    last: ModifierSource,
}

impl ModifierTracker {
    pub fn current(&self) -> Modifiers { self.current }

    pub fn last_source(&self) -> ModifierSource { self.last }

    pub fn from_keys(&self) -> Modifiers { self.from_keys }

    pub fn from_poll(&self) -> Modifiers { self.from_poll }

    /// Returns whether grouping became armed or disarmed.
    pub fn on_key(&mut self, modifiers: Modifiers) -> bool {
        self.from_keys = modifiers;
        self.update(modifiers, ModifierSource::Key)
    }

    pub fn on_poll(&mut self, modifiers: Modifiers) -> bool {
        self.from_poll = modifiers;
        self.update(modifiers, ModifierSource::Poll)
    }

    fn update(&mut self, modifiers: Modifiers, source: ModifierSource) -> bool {
        let was_armed = self.arms_grouping();
        self.current = modifiers;
        self.last = source;
        was_armed != self.arms_grouping()
    }

    pub fn arms_grouping(&self) -> bool { self.current.arms_grouping() }
}
