/// Snapshot of what the bridge knows about user consent.
///
/// `can_show_ads` and `status` are `None` when the consent surface does not
/// expose them.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConsentState {
    pub info_updated: bool,
    pub can_show_ads: Option<bool>,
    pub status: Option<String>,
}

impl ConsentState {
    /// Ads may be requested only after at least one successful update, when
    /// the "can show ads" probe did not say no, and when the status text
    /// mentions neither "required" nor "unknown".
    pub fn is_ready(&self) -> bool {
        if !self.info_updated {
            return false;
        }
        if self.can_show_ads == Some(false) {
            return false;
        }
        match &self.status {
            Some(status) => !status_blocks_ads(status),
            None => true,
        }
    }
}

/// Case-insensitive check of a consent status value's text.
pub fn status_blocks_ads(status: &str) -> bool {
    let lo = status.to_ascii_lowercase();
    lo.contains("required") || lo.contains("unknown")
}

/// Preferred constants of the consent status enum, most preferred first.
pub const STATUS_PREFERENCE: &[&str] = &[
    "NotRequired",
    "NOT_REQUIRED",
    "NOTREQUIRED",
    "Obtained",
    "OBTAINED",
    "Granted",
    "GRANTED",
];

/// Preference for any other enum taken by a consent setter.
pub const SETTER_ENUM_PREFERENCE: &[&str] = &[
    "NotRequired",
    "NOT_REQUIRED",
    "NOTREQUIRED",
    "Obtained",
    "OBTAINED",
    "Granted",
    "GRANTED",
    "True",
    "TRUE",
];

/// First preferred constant present in `available`, else the first
/// available constant. `None` only for an empty enum.
pub fn pick_constant(preference: &[&str], available: &[String]) -> Option<String> {
    preference
        .iter()
        .find(|p| available.iter().any(|a| a == *p))
        .map(|p| (*p).to_string())
        .or_else(|| available.first().cloned())
}
