//! Hiring pipeline transitions.
//!
//! ```text
//! unset -> APPLIED -> INVITED -> HIRED
//!             |          |
//!             +----------+--> REJECTED
//! ```
//!
//! `REJECTED` and `HIRED` are terminal.

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::lifecycle::history;
use crate::models::{
    application::Application, history_entry::HistoryEntry, status::ApplicationStatus,
};

use ApplicationStatus::{Applied, Hired, Invited, Rejected};

/// Statuses reachable in one step from `current`.
pub fn allowed_next(current: Option<ApplicationStatus>) -> &'static [ApplicationStatus] {
    match current {
        None => &[Applied],
        Some(Applied) => &[Invited, Rejected],
        Some(Invited) => &[Hired, Rejected],
        Some(Rejected) | Some(Hired) => &[],
    }
}

pub fn can_transition(current: Option<ApplicationStatus>, to: ApplicationStatus) -> bool {
    current != Some(to) && allowed_next(current).contains(&to)
}

/// Moves `application` to `to` and records the change under `entry_id`.
///
/// Self-transitions and anything outside [`allowed_next`] fail with
/// [`Error::InvalidTransition`], leaving status and history untouched.
pub fn transition(
    application: &mut Application,
    to: ApplicationStatus,
    entry_id: i64,
) -> Result<HistoryEntry> {
    let from = application.status();
    if !can_transition(from, to) {
        warn!(
            application_id = application.id,
            from = ?from,
            to = %to,
            allowed = ?allowed_next(from),
            "rejected status transition"
        );
        return Err(Error::InvalidTransition { from, to });
    }

    let entry = history::append(application, entry_id, to, None)?;
    application.status = Some(to);
    info!(
        application_id = application.id,
        from = ?from,
        to = %to,
        history = application.history().len(),
        "application status changed"
    );
    Ok(entry)
}

/// Creation hook: an application first persisted without a status enters the
/// pipeline as `APPLIED`. Returns `None` when the status was already set.
pub fn on_create(application: &mut Application, entry_id: i64) -> Result<Option<HistoryEntry>> {
    if application.status().is_some() {
        return Ok(None);
    }
    transition(application, Applied, entry_id).map(Some)
}
