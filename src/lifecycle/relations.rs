//! Bidirectional links between offers, applications and history entries.
//!
//! The child's foreign key is authoritative; the parent's member list mirrors
//! it. Every function here leaves the pair consistent: a child appears in
//! exactly the collection of the parent it points at, and nowhere else.

use tracing::debug;

use crate::error::{Error, Result};
use crate::lifecycle::arena::{Arena, Identified};
use crate::models::{application::Application, history_entry::HistoryEntry, offer::Offer};

/// Owning side of a back-reference collection.
pub trait Parent: Identified {
    const KIND: &'static str;

    fn members(&self) -> &[i64];
    fn members_mut(&mut self) -> &mut Vec<i64>;
}

/// Side holding the authoritative reference.
pub trait Child: Identified {
    const KIND: &'static str;

    fn parent_id(&self) -> Option<i64>;
    fn set_parent_id(&mut self, parent: Option<i64>);
}

impl Parent for Offer {
    const KIND: &'static str = "offer";

    fn members(&self) -> &[i64] {
        &self.applications
    }

    fn members_mut(&mut self) -> &mut Vec<i64> {
        &mut self.applications
    }
}

impl Parent for Application {
    const KIND: &'static str = "application";

    fn members(&self) -> &[i64] {
        &self.history
    }

    fn members_mut(&mut self) -> &mut Vec<i64> {
        &mut self.history
    }
}

impl Child for Application {
    const KIND: &'static str = "application";

    fn parent_id(&self) -> Option<i64> {
        self.offer_id
    }

    fn set_parent_id(&mut self, parent: Option<i64>) {
        self.offer_id = parent;
    }
}

impl Child for HistoryEntry {
    const KIND: &'static str = "history entry";

    fn parent_id(&self) -> Option<i64> {
        self.application_id
    }

    fn set_parent_id(&mut self, parent: Option<i64>) {
        self.application_id = parent;
    }
}

/// Links a detached child to `parent`. Re-attaching to the same parent is a
/// no-op; a child still linked elsewhere is refused.
pub fn attach<C: Child, P: Parent>(child: &mut C, parent: &mut P) -> Result<()> {
    match child.parent_id() {
        Some(current) if current == parent.id() => {
            if !parent.members().contains(&child.id()) {
                parent.members_mut().push(child.id());
            }
            Ok(())
        }
        Some(current) => Err(Error::Internal(format!(
            "{} #{} is still linked to {} #{}",
            C::KIND,
            child.id(),
            P::KIND,
            current
        ))),
        None => {
            child.set_parent_id(Some(parent.id()));
            parent.members_mut().push(child.id());
            debug!(
                child = child.id(),
                parent = parent.id(),
                members = parent.members().len(),
                "linked {} to {}",
                C::KIND,
                P::KIND
            );
            Ok(())
        }
    }
}

/// Unlinks `child` from `parent`. No-op when they are not linked.
pub fn detach<C: Child, P: Parent>(child: &mut C, parent: &mut P) {
    let before = parent.members().len();
    parent.members_mut().retain(|member| *member != child.id());

    if child.parent_id() == Some(parent.id()) {
        child.set_parent_id(None);
        debug!(
            child = child.id(),
            parent = parent.id(),
            before,
            after = parent.members().len(),
            "unlinked {} from {}",
            C::KIND,
            P::KIND
        );
    }
}

/// Moves `child` to `target` (or nowhere), keeping both the previous and the
/// new parent collection in sync. Both parents must be present in `parents`;
/// nothing is mutated otherwise.
pub fn set_parent<C: Child, P: Parent>(
    child: &mut C,
    parents: &mut Arena<P>,
    target: Option<i64>,
) -> Result<()> {
    let current = child.parent_id();
    if current == target {
        return Ok(());
    }

    for id in [current, target].into_iter().flatten() {
        if !parents.contains(id) {
            return Err(Error::NotFound(format!("{} #{} not found", P::KIND, id)));
        }
    }

    if let Some(previous) = current.and_then(|id| parents.get_mut(id)) {
        detach(child, previous);
    }
    if let Some(next) = target.and_then(|id| parents.get_mut(id)) {
        attach(child, next)?;
    }
    Ok(())
}

pub fn set_offer_for_application(
    application: &mut Application,
    offers: &mut Arena<Offer>,
    offer: Option<i64>,
) -> Result<()> {
    set_parent(application, offers, offer)
}

pub fn set_application_for_history_entry(
    entry: &mut HistoryEntry,
    applications: &mut Arena<Application>,
    application: Option<i64>,
) -> Result<()> {
    set_parent(entry, applications, application)
}

/// True when every collection member points back at its parent exactly once
/// and every linked child is listed by a parent present in `parents`.
pub fn is_consistent<P: Parent, C: Child>(parents: &Arena<P>, children: &Arena<C>) -> bool {
    let members_point_back = parents.iter().all(|parent| {
        let members = parent.members();
        members.iter().enumerate().all(|(idx, member)| {
            !members[..idx].contains(member)
                && children
                    .get(*member)
                    .is_some_and(|child| child.parent_id() == Some(parent.id()))
        })
    });

    let children_listed = children.iter().all(|child| match child.parent_id() {
        None => true,
        Some(pid) => parents
            .get(pid)
            .is_some_and(|parent| parent.members().contains(&child.id())),
    });

    members_point_back && children_listed
}
