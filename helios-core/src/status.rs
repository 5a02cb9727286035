//! Pure derivation of agent liveness status from last-seen time.

use chrono::{DateTime, Duration, Utc};

use crate::model::AgentStatus;

/// Warning cutoff: agents silent for longer than this are `warning`.
pub const WARNING_CUTOFF: Duration = Duration::minutes(2);

/// Offline cutoff: agents silent for longer than this are `offline`.
pub const OFFLINE_CUTOFF: Duration = Duration::minutes(5);

/// Derive an agent's status from `now - last_seen` and its `paused` flag.
///
/// Paused agents are left untouched: they are reported as `online` regardless
/// of how long they have been silent, since pausing is an operator-driven
/// state rather than a liveness signal.
#[must_use]
pub fn derive(now: DateTime<Utc>, last_seen: DateTime<Utc>, paused: bool) -> AgentStatus {
    if paused {
        return AgentStatus::Online;
    }
    let delta = now - last_seen;
    if delta > OFFLINE_CUTOFF {
        AgentStatus::Offline
    } else if delta > WARNING_CUTOFF {
        AgentStatus::Warning
    } else {
        AgentStatus::Online
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(now: DateTime<Utc>, secs: i64) -> DateTime<Utc> {
        now - Duration::seconds(secs)
    }

    #[test]
    fn online_just_registered() {
        let now = Utc::now();
        assert_eq!(derive(now, at(now, 0), false), AgentStatus::Online);
    }

    #[test]
    fn warning_after_two_minutes() {
        let now = Utc::now();
        assert_eq!(derive(now, at(now, 121), false), AgentStatus::Warning);
        assert_eq!(derive(now, at(now, 119), false), AgentStatus::Online);
    }

    #[test]
    fn offline_after_five_minutes() {
        let now = Utc::now();
        assert_eq!(derive(now, at(now, 301), false), AgentStatus::Offline);
        assert_eq!(derive(now, at(now, 299), false), AgentStatus::Warning);
    }

    #[test]
    fn paused_agent_always_online() {
        let now = Utc::now();
        assert_eq!(derive(now, at(now, 10_000), true), AgentStatus::Online);
    }
}
