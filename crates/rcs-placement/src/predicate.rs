//! Event filter for the placement controller.

use rcs_state::Capp;

/// Enqueue only live Capps that carry no placement yet.
///
/// Once the has-placement annotation is set the binding is sticky: later
/// changes, including new decisions, never reach the scheduler.
pub fn should_schedule(_old: Option<&Capp>, new: Option<&Capp>) -> bool {
    new.is_some_and(|capp| capp.placement().is_none() && !capp.metadata.is_deleting())
}
