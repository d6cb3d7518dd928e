use std::fmt;

/// The two ad formats the bridge drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum AdFormat {
    Interstitial,
    Rewarded,
}

impl AdFormat {
    pub const ALL: [AdFormat; 2] = [AdFormat::Interstitial, AdFormat::Rewarded];

    /// Bit flag the mediation SDK uses for this format.
    pub const fn flag(self) -> i32 {
        match self {
            AdFormat::Interstitial => 3,
            AdFormat::Rewarded => 128,
        }
    }

    /// Bitwise-OR of both format flags, as passed to initialize.
    pub const fn all_flags() -> i32 {
        AdFormat::Interstitial.flag() | AdFormat::Rewarded.flag()
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            AdFormat::Interstitial => "interstitial",
            AdFormat::Rewarded => "rewarded",
        }
    }

    /// Failure reason reported when a show finds no inventory.
    pub const fn not_available_reason(self) -> &'static str {
        match self {
            AdFormat::Interstitial => "interstitial_not_available",
            AdFormat::Rewarded => "rewarded_not_available",
        }
    }

    pub const fn failed_to_load_reason(self) -> &'static str {
        match self {
            AdFormat::Interstitial => "interstitial_failed_to_load",
            AdFormat::Rewarded => "rewarded_failed_to_load",
        }
    }
}

impl fmt::Display for AdFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle tag of an interstitial or rewarded event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum AdEvent {
    Loaded,
    FailedToLoad,
    ShowFailed,
    Shown,
    Clicked,
    Closed,
    Expired,
    /// Rewarded only.
    Reward,
}

impl AdEvent {
    pub const fn as_str(self) -> &'static str {
        match self {
            AdEvent::Loaded => "loaded",
            AdEvent::FailedToLoad => "failed_to_load",
            AdEvent::ShowFailed => "show_failed",
            AdEvent::Shown => "shown",
            AdEvent::Clicked => "clicked",
            AdEvent::Closed => "closed",
            AdEvent::Expired => "expired",
            AdEvent::Reward => "reward",
        }
    }

    /// Events after which no further event belongs to the same show.
    pub const fn is_terminal(self) -> bool {
        matches!(self, AdEvent::ShowFailed | AdEvent::Closed | AdEvent::Expired)
    }
}

impl fmt::Display for AdEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The only shape that crosses the boundary to the consumer.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum CanonicalEvent {
    Init {
        success: bool,
        reason: Option<String>,
    },
    Interstitial {
        event: AdEvent,
        success: bool,
        reason: Option<String>,
    },
    Rewarded {
        event: AdEvent,
        success: bool,
        reason: Option<String>,
        rewarded: bool,
        amount: f64,
        currency: Option<String>,
    },
}

impl CanonicalEvent {
    pub fn init(success: bool, reason: Option<String>) -> Self {
        CanonicalEvent::Init { success, reason }
    }

    /// A lifecycle event for `format` with no reward payload.
    pub fn ad(format: AdFormat, event: AdEvent, success: bool, reason: Option<String>) -> Self {
        match format {
            AdFormat::Interstitial => CanonicalEvent::Interstitial { event, success, reason },
            AdFormat::Rewarded => CanonicalEvent::Rewarded {
                event,
                success,
                reason,
                rewarded: false,
                amount: 0.0,
                currency: None,
            },
        }
    }

    /// `show_failed` with the given reason.
    pub fn show_failed(format: AdFormat, reason: impl Into<String>) -> Self {
        Self::ad(format, AdEvent::ShowFailed, false, Some(reason.into()))
    }

    /// Event name as the consumer sees it. Init events are named after
    /// their outcome.
    pub fn name(&self) -> &'static str {
        match self {
            CanonicalEvent::Init { success: true, .. } => "initialized",
            CanonicalEvent::Init { success: false, .. } => "init_failed",
            CanonicalEvent::Interstitial { event, .. } | CanonicalEvent::Rewarded { event, .. } => event.as_str(),
        }
    }

    pub fn success(&self) -> bool {
        match self {
            CanonicalEvent::Init { success, .. }
            | CanonicalEvent::Interstitial { success, .. }
            | CanonicalEvent::Rewarded { success, .. } => *success,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            CanonicalEvent::Init { reason, .. }
            | CanonicalEvent::Interstitial { reason, .. }
            | CanonicalEvent::Rewarded { reason, .. } => reason.as_deref(),
        }
    }

    pub fn format(&self) -> Option<AdFormat> {
        match self {
            CanonicalEvent::Init { .. } => None,
            CanonicalEvent::Interstitial { .. } => Some(AdFormat::Interstitial),
            CanonicalEvent::Rewarded { .. } => Some(AdFormat::Rewarded),
        }
    }

    /// Init results are always terminal; ad events per [`AdEvent::is_terminal`].
    pub fn is_terminal(&self) -> bool {
        match self {
            CanonicalEvent::Init { .. } => true,
            CanonicalEvent::Interstitial { event, .. } | CanonicalEvent::Rewarded { event, .. } => {
                event.is_terminal()
            }
        }
    }
}
