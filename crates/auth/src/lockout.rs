//! Brute-force lockout state machine.
//!
//! One `Lockout` per identity combines the `locked` flag with the consecutive
//! failure counter. Transitions:
//!
//! ```text
//! UNLOCKED --failure (counter reaches threshold)--> LOCKED   [BRUTE_FORCE, LOCK_USER]
//! UNLOCKED --failure (below threshold)-----------> UNLOCKED [LOGIN_FAILED]
//! any      --success-----------------------------> same     (counter := 0)
//! any      --administrative lock-----------------> LOCKED   [LOCK_USER]
//! any      --administrative unlock---------------> UNLOCKED [UNLOCK_USER]
//! LOCKED   --failure-----------------------------> LOCKED   (not counted)
//! ```
//!
//! There is no automatic unlock.

use serde::{Deserialize, Serialize};

use accountd_core::{AccountError, Aggregate, AggregateRoot, IdentityId};

/// Lockout tuning.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockoutPolicy {
    /// Consecutive failures that lock the account. `0` disables automatic locking.
    pub max_failed_attempts: u32,
    /// Whether an administrative unlock also clears the failure counter.
    pub reset_counter_on_unlock: bool,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            reset_counter_on_unlock: false,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LockState {
    #[default]
    Unlocked,
    Locked,
}

impl core::fmt::Display for LockState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LockState::Unlocked => write!(f, "UNLOCKED"),
            LockState::Locked => write!(f, "LOCKED"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockCause {
    Administrator,
    BruteForce,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockoutCommand {
    AuthenticationSucceeded,
    AuthenticationFailed,
    Lock,
    Unlock,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockoutEvent {
    FailureRecorded { failures: u32 },
    FailuresReset,
    BruteForceDetected { failures: u32 },
    Locked { cause: LockCause },
    Unlocked { counter_reset: bool },
}

/// Lockout state of one identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lockout {
    identity: IdentityId,
    state: LockState,
    failures: u32,
    policy: LockoutPolicy,
    version: u64,
}

impl Lockout {
    /// A fresh, unlocked identity with no recorded failures.
    pub fn new(identity: IdentityId, policy: LockoutPolicy) -> Self {
        Self::restore(identity, policy, false, 0)
    }

    /// Rebuild from persisted state.
    pub fn restore(identity: IdentityId, policy: LockoutPolicy, locked: bool, failures: u32) -> Self {
        Self {
            identity,
            state: if locked { LockState::Locked } else { LockState::Unlocked },
            failures,
            policy,
            version: 0,
        }
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn is_locked(&self) -> bool {
        self.state == LockState::Locked
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    fn handle_failure(&self) -> Vec<LockoutEvent> {
        // The credential check never runs for a locked account.
        if self.is_locked() {
            return vec![];
        }

        let failures = self.failures.saturating_add(1);
        let mut events = vec![LockoutEvent::FailureRecorded { failures }];

        if failures == self.policy.max_failed_attempts {
            events.push(LockoutEvent::BruteForceDetected { failures });
            events.push(LockoutEvent::Locked {
                cause: LockCause::BruteForce,
            });
        }
        events
    }
}

impl AggregateRoot for Lockout {
    type Id = IdentityId;

    fn id(&self) -> &Self::Id {
        &self.identity
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Aggregate for Lockout {
    type Command = LockoutCommand;
    type Event = LockoutEvent;
    type Error = AccountError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            LockoutEvent::FailureRecorded { failures } => self.failures = *failures,
            LockoutEvent::FailuresReset => self.failures = 0,
            LockoutEvent::BruteForceDetected { .. } => {}
            LockoutEvent::Locked { .. } => self.state = LockState::Locked,
            LockoutEvent::Unlocked { counter_reset } => {
                self.state = LockState::Unlocked;
                if *counter_reset {
                    self.failures = 0;
                }
            }
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        let events = match command {
            LockoutCommand::AuthenticationSucceeded => {
                if self.failures == 0 {
                    vec![]
                } else {
                    vec![LockoutEvent::FailuresReset]
                }
            }
            LockoutCommand::AuthenticationFailed => self.handle_failure(),
            LockoutCommand::Lock => vec![LockoutEvent::Locked {
                cause: LockCause::Administrator,
            }],
            LockoutCommand::Unlock => vec![LockoutEvent::Unlocked {
                counter_reset: self.policy.reset_counter_on_unlock,
            }],
        };
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lockout() -> Lockout {
        Lockout::new(IdentityId::new(), LockoutPolicy::default())
    }

    fn fail(l: &mut Lockout) -> Vec<LockoutEvent> {
        l.execute(&LockoutCommand::AuthenticationFailed).unwrap()
    }

    #[test]
    fn fifth_failure_locks() {
        let mut l = lockout();
        for n in 1..=4 {
            assert_eq!(fail(&mut l), vec![LockoutEvent::FailureRecorded { failures: n }]);
            assert!(!l.is_locked());
        }

        let events = fail(&mut l);
        assert_eq!(
            events,
            vec![
                LockoutEvent::FailureRecorded { failures: 5 },
                LockoutEvent::BruteForceDetected { failures: 5 },
                LockoutEvent::Locked {
                    cause: LockCause::BruteForce
                },
            ]
        );
        assert!(l.is_locked());
        assert_eq!(l.failures(), 5);
    }

    #[test]
    fn failures_while_locked_are_ignored() {
        let mut l = Lockout::restore(IdentityId::new(), LockoutPolicy::default(), true, 5);
        assert!(fail(&mut l).is_empty());
        assert_eq!(l.failures(), 5);
        assert_eq!(l.version(), 0);
    }

    #[test]
    fn success_resets_counter_idempotently() {
        let mut l = lockout();
        for _ in 0..4 {
            fail(&mut l);
        }
        let events = l.execute(&LockoutCommand::AuthenticationSucceeded).unwrap();
        assert_eq!(events, vec![LockoutEvent::FailuresReset]);
        assert_eq!(l.failures(), 0);

        let events = l.execute(&LockoutCommand::AuthenticationSucceeded).unwrap();
        assert!(events.is_empty());
        assert_eq!(l.failures(), 0);
        assert!(!l.is_locked());
    }

    #[test]
    fn new_run_after_success_locks_on_its_fifth_failure() {
        let mut l = lockout();
        for _ in 0..4 {
            fail(&mut l);
        }
        l.execute(&LockoutCommand::AuthenticationSucceeded).unwrap();

        for _ in 0..4 {
            fail(&mut l);
        }
        assert!(!l.is_locked());
        fail(&mut l);
        assert!(l.is_locked());
    }

    #[test]
    fn unlock_keeps_counter_by_default() {
        let mut l = Lockout::restore(IdentityId::new(), LockoutPolicy::default(), true, 5);
        let events = l.execute(&LockoutCommand::Unlock).unwrap();
        assert_eq!(events, vec![LockoutEvent::Unlocked { counter_reset: false }]);
        assert!(!l.is_locked());
        assert_eq!(l.failures(), 5);

        // Past the threshold the equality check no longer fires.
        fail(&mut l);
        assert!(!l.is_locked());
        assert_eq!(l.failures(), 6);
    }

    #[test]
    fn unlock_can_reset_counter() {
        let policy = LockoutPolicy {
            reset_counter_on_unlock: true,
            ..LockoutPolicy::default()
        };
        let mut l = Lockout::restore(IdentityId::new(), policy, true, 5);
        l.execute(&LockoutCommand::Unlock).unwrap();
        assert_eq!(l.failures(), 0);

        for _ in 0..5 {
            fail(&mut l);
        }
        assert!(l.is_locked());
    }

    #[test]
    fn administrative_lock_is_idempotent_on_state() {
        let mut l = lockout();
        l.execute(&LockoutCommand::Lock).unwrap();
        assert!(l.is_locked());

        let events = l.execute(&LockoutCommand::Lock).unwrap();
        assert_eq!(
            events,
            vec![LockoutEvent::Locked {
                cause: LockCause::Administrator
            }]
        );
        assert_eq!(l.state(), LockState::Locked);
    }

    #[test]
    fn zero_threshold_never_locks() {
        let policy = LockoutPolicy {
            max_failed_attempts: 0,
            ..LockoutPolicy::default()
        };
        let mut l = Lockout::new(IdentityId::new(), policy);
        for _ in 0..20 {
            fail(&mut l);
        }
        assert!(!l.is_locked());
        assert_eq!(l.failures(), 20);
    }
}
