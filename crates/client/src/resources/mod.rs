//! Per-resource read queries and mutations.
//!
//! Each resource exposes cached reads (as [`crate::query::Query`] handles
//! keyed by the resource name and its parameters) and mutations that
//! invalidate every cached read of that resource when they succeed.

pub mod analytics;
pub mod profile;
pub mod settings;
pub mod voice_messages;

pub use analytics::{Analytics, AnalyticsOverview, DailyCount, MessageStats, TimeRange};
pub use profile::{Profile, ProfilePatch, Profiles};
pub use settings::{NotificationSettings, Preferences, Settings, Theme};
pub use voice_messages::{
    MessageFilters, MessageId, MessageStatus, NewVoiceMessage, ShareLink, ShareRequest, VoiceMessage,
    VoiceMessagePatch, VoiceMessages,
};

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

/// One page of a paginated listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(alias = "data")]
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.limit))
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages()
    }
}

/// Everything but RFC 3986 unreserved characters.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// Percent-encode a single path segment.
pub(crate) fn segment(value: &str) -> String {
    utf8_percent_encode(value, SEGMENT).to_string()
}
