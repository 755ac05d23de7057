//! Role and ownership gate consulted by the services before every mutating
//! or sensitive read operation.
//!
//! The decision is a pure function of the caller and the requested action,
//! so it can be exercised without a store or a transport layer.

use tracing::warn;

use crate::models::{Role, User};
use crate::utils::error::AppError;

/// The authenticated identity on whose behalf an operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub id: i64,
    pub role: Role,
}

impl Caller {
    pub fn new(id: i64, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&User> for Caller {
    fn from(user: &User) -> Self {
        Self::new(user.id, user.role)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    RegisterUser,
    ListUsers,
    UpdateUser { target: i64, changes_role: bool },
    ManageLocation,
    CreateEvent { organizer_id: i64 },
    ManageEvent { organizer_id: i64 },
    WriteTicket,
    DeleteTicket,
    ListTickets,
    ReadAnyBooking,
    ListEventBookings { organizer_id: i64 },
    BookEvent,
    ListOwnBookings,
    DeleteOwnBooking { owner_id: i64 },
    ManageAnyBooking,
}

impl Action {
    fn denial(&self) -> &'static str {
        match self {
            Action::RegisterUser => "Only administrators can register users",
            Action::ListUsers => "Only administrators can list users",
            Action::UpdateUser { .. } => "You can only update your own profile",
            Action::ManageLocation => "Only administrators can manage locations",
            Action::CreateEvent { .. } => "Organizers can only create events for themselves",
            Action::ManageEvent { .. } => "You can only manage your own events",
            Action::WriteTicket => "Only organizers and administrators can manage tickets",
            Action::DeleteTicket => "Only administrators can delete tickets",
            Action::ListTickets => "Only administrators can list all tickets",
            Action::ReadAnyBooking | Action::ManageAnyBooking => {
                "The user doesn't have enough privileges"
            }
            Action::ListEventBookings { .. } => "You can only view bookings for your own events",
            Action::BookEvent | Action::ListOwnBookings => "Authentication required",
            Action::DeleteOwnBooking { .. } => "You can only delete your own bookings",
        }
    }
}

pub fn is_allowed(caller: &Caller, action: &Action) -> bool {
    let admin = caller.is_admin();
    match *action {
        Action::RegisterUser
        | Action::ListUsers
        | Action::ManageLocation
        | Action::DeleteTicket
        | Action::ListTickets
        | Action::ReadAnyBooking
        | Action::ManageAnyBooking => admin,
        Action::UpdateUser {
            target,
            changes_role,
        } => admin || (target == caller.id && !changes_role),
        Action::CreateEvent { organizer_id } => {
            admin || (caller.role == Role::Organizer && organizer_id == caller.id)
        }
        Action::ManageEvent { organizer_id } | Action::ListEventBookings { organizer_id } => {
            admin || organizer_id == caller.id
        }
        Action::WriteTicket => caller.role.can_organize(),
        Action::BookEvent | Action::ListOwnBookings => true,
        Action::DeleteOwnBooking { owner_id } => owner_id == caller.id,
    }
}

pub fn authorize(caller: &Caller, action: Action) -> Result<(), AppError> {
    if is_allowed(caller, &action) {
        return Ok(());
    }
    warn!(
        caller_id = caller.id,
        role = caller.role.as_str(),
        action = ?action,
        "Authorization denied"
    );
    Err(AppError::Forbidden(action.denial().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADMIN: Caller = Caller { id: 1, role: Role::Admin };
    const ORGANIZER: Caller = Caller { id: 2, role: Role::Organizer };
    const VISITOR: Caller = Caller { id: 3, role: Role::Visitor };

    #[test]
    fn test_admin_only_actions() {
        for action in [
            Action::RegisterUser,
            Action::ListUsers,
            Action::ManageLocation,
            Action::DeleteTicket,
            Action::ListTickets,
            Action::ReadAnyBooking,
            Action::ManageAnyBooking,
        ] {
            assert!(is_allowed(&ADMIN, &action), "{:?}", action);
            assert!(!is_allowed(&ORGANIZER, &action), "{:?}", action);
            assert!(!is_allowed(&VISITOR, &action), "{:?}", action);
        }
    }

    #[test]
    fn test_organizer_creates_events_only_for_self() {
        assert!(is_allowed(&ORGANIZER, &Action::CreateEvent { organizer_id: 2 }));
        assert!(!is_allowed(&ORGANIZER, &Action::CreateEvent { organizer_id: 5 }));
        assert!(is_allowed(&ADMIN, &Action::CreateEvent { organizer_id: 5 }));
        assert!(!is_allowed(&VISITOR, &Action::CreateEvent { organizer_id: 3 }));
    }

    #[test]
    fn test_event_management_requires_ownership() {
        let own = Action::ManageEvent { organizer_id: 2 };
        let other = Action::ManageEvent { organizer_id: 9 };
        assert!(is_allowed(&ORGANIZER, &own));
        assert!(!is_allowed(&ORGANIZER, &other));
        assert!(is_allowed(&ADMIN, &other));
    }

    #[test]
    fn test_ticket_writes_need_organizer_or_admin() {
        assert!(is_allowed(&ORGANIZER, &Action::WriteTicket));
        assert!(is_allowed(&ADMIN, &Action::WriteTicket));
        assert!(!is_allowed(&VISITOR, &Action::WriteTicket));
    }

    #[test]
    fn test_own_booking_deletion_is_owner_scoped() {
        assert!(is_allowed(&VISITOR, &Action::DeleteOwnBooking { owner_id: 3 }));
        assert!(!is_allowed(&ORGANIZER, &Action::DeleteOwnBooking { owner_id: 3 }));
        // the "own" path is scoped to self even for admins
        assert!(!is_allowed(&ADMIN, &Action::DeleteOwnBooking { owner_id: 3 }));
    }

    #[test]
    fn test_self_update_cannot_change_role() {
        let plain = Action::UpdateUser { target: 3, changes_role: false };
        let promote = Action::UpdateUser { target: 3, changes_role: true };
        assert!(is_allowed(&VISITOR, &plain));
        assert!(!is_allowed(&VISITOR, &promote));
        assert!(is_allowed(&ADMIN, &promote));
    }

    #[test]
    fn test_authorize_reports_forbidden() {
        let err = authorize(&VISITOR, Action::ManageLocation).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(authorize(&VISITOR, Action::BookEvent).is_ok());
    }
}
