//! # Restart policy for the supervised worker.
//!
//! [`RestartPolicy`] decides whether a watchdog-triggered restart is actually
//! carried out.
//!
//! - [`RestartPolicy::Auto`] the worker is stopped, the cooldown elapses, and the
//!   worker is started again (default).
//! - [`RestartPolicy::Manual`] the worker is only stopped and a
//!   `RestartSuppressed` notification is published; starting it again takes an
//!   explicit call.
//!
//! ```text
//! RestartRequest ──► Auto   ──► stop ─► cooldown ─► start
//!                └─► Manual ──► stop ─► RestartSuppressed (no start)
//! ```
//!
//! The donation scheduler temporarily overrides the policy with `Auto` so
//! that its argument swap always applies, then puts the user's choice back.

/// Policy controlling whether restart requests start the worker again.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RestartPolicy {
    /// Stop, wait the cooldown, start again (default).
    #[default]
    Auto,
    /// Stop only; never start automatically.
    Manual,
}

impl RestartPolicy {
    /// Maps the boolean "auto restart" flag used by collaborators.
    #[inline]
    pub fn from_flag(auto_restart: bool) -> Self {
        if auto_restart {
            RestartPolicy::Auto
        } else {
            RestartPolicy::Manual
        }
    }

    /// Returns `true` when restarts start the worker again.
    #[inline]
    pub fn is_auto(self) -> bool {
        matches!(self, RestartPolicy::Auto)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_round_trip() {
        assert_eq!(RestartPolicy::from_flag(true), RestartPolicy::Auto);
        assert_eq!(RestartPolicy::from_flag(false), RestartPolicy::Manual);
        assert!(RestartPolicy::default().is_auto());
    }
}
