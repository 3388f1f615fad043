//! Remote filename synthesis.

use chrono::{DateTime, TimeZone};

use crate::profile::EndpointProfile;

/// Fixed-width, sortable, second-resolution stamp (`YYYYMMDDhhmmss`).
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Build `{path}/{prefix}_{stem}_{timestamp}_{suffix}.{extension}`.
///
/// Two calls within the same second produce the same name.
pub fn synthesize<Tz>(profile: &EndpointProfile, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let naming = &profile.naming;
    format!(
        "{}/{}_{}_{}_{}.{}",
        naming.path,
        naming.prefix,
        naming.stem,
        now.format(TIMESTAMP_FORMAT),
        naming.suffix,
        naming.extension
    )
}
