use crate::types::UserId;

/// Route component constants shared across crates
pub const API_ROUTE_COMPONENT: &str = "api";
pub const API_ROUTE_PREFIX: &str = const_str::concat!("/", API_ROUTE_COMPONENT);

pub const USERS_ROUTE_COMPONENT: &str = "users";

/// MIME type for every feed response.
pub const CALENDAR_CONTENT_TYPE: &str = "text/calendar";

/// Product identifier stamped into the merged envelope prolog.
pub const CALENDAR_PRODID: &str = "-//calmux//Calmux Aggregator//EN";

/// Fixed timezone label for the merged envelope (`X-WR-TIMEZONE`).
pub const CALENDAR_TIMEZONE: &str = "Etc/UTC";

/// Property carrying per-event provenance in merged output.
pub const ORIGIN_PROPERTY: &str = "X-WR-ORIGIN";

/// Resource path that an access key for the personal aggregate must match.
#[must_use]
pub fn schedule_resource_path(user_id: UserId) -> String {
    format!("/users/{user_id}/all.ics")
}

/// Resource path that an access key for the personal booking feed must match.
#[must_use]
pub fn bookings_resource_path(user_id: UserId) -> String {
    format!("/users/{user_id}/bookings.ics")
}
