/// Recognized delivery channels. Variants such as `releases` collapse onto these by prefix.
pub const KNOWN_CHANNELS: &[&str] = &["release", "beta", "aurora", "nightly", "esr"];

/// Channel that impressions from unrecognized channels are folded into.
pub const FALLBACK_CHANNEL: &str = "release";

/// Placeholder the query service emits for an unresolved country.
pub const COUNTRY_ERROR_PLACEHOLDER: &str = "ERROR";

/// Unknown countries are reported under this code.
pub const UNKNOWN_COUNTRY: &str = "XX";

/// Name of the date field in bound query parameters.
pub const BIND_DATE_PARAM: &str = "date";

/// Default Redash query ids.
pub const DEFAULT_QUERY_ID_JOB_EVENTS: u64 = 68_136;
pub const DEFAULT_QUERY_ID_JOB_IMPRESSION_TOTALS: u64 = 68_341;
pub const DEFAULT_QUERY_ID_CHANNEL_IMPRESSIONS: u64 = 68_344;
