use chrono::{DateTime, SubsecRound, Utc};

/// Current time at the microsecond precision `TIMESTAMPTZ` stores, so that
/// persisted values read back equal to the ones written.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
