//! Connection and load state shown alongside a live view.

/// Where a view's data feed currently stands.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum FeedPhase {
    #[default]
    Idle,
    Loading,
    Live,
    /// The push connection dropped; the last snapshot is still shown.
    Reconnecting,
    /// The last snapshot fetch failed. `has_data` is true when an earlier
    /// load succeeded and its data is still on screen.
    LoadFailed { message: String, has_data: bool },
}

/// Tracks a feed through load, live, and reconnect transitions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeedStatus {
    phase: FeedPhase,
    loaded_once: bool,
    needs_resync: bool,
}

impl FeedStatus {
    #[must_use]
    pub const fn phase(&self) -> &FeedPhase {
        &self.phase
    }

    /// Whether a snapshot has been loaded at least once.
    #[must_use]
    pub const fn has_data(&self) -> bool {
        self.loaded_once
    }

    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self.phase, FeedPhase::Live)
    }

    /// True after a reconnect that may have missed events, until the next
    /// successful load.
    #[must_use]
    pub const fn needs_resync(&self) -> bool {
        self.needs_resync
    }

    pub fn begin_load(&mut self) {
        self.phase = FeedPhase::Loading;
    }

    pub fn load_succeeded(&mut self) {
        self.phase = FeedPhase::Live;
        self.loaded_once = true;
        self.needs_resync = false;
    }

    pub fn load_failed(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(has_data = self.loaded_once, "Snapshot load failed: {message}");
        self.phase = FeedPhase::LoadFailed {
            message,
            has_data: self.loaded_once,
        };
    }

    /// Ignored unless the feed is live.
    pub fn disconnected(&mut self) {
        if self.is_live() {
            self.phase = FeedPhase::Reconnecting;
        }
    }

    /// `lossy` marks a reconnect after which missed events cannot be replayed.
    pub fn reconnected(&mut self, lossy: bool) {
        if self.phase == FeedPhase::Reconnecting {
            self.phase = FeedPhase::Live;
            self.needs_resync |= lossy;
        }
    }
}
