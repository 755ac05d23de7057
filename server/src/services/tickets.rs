use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use super::EventService;
use crate::models::{NewTicket, Ticket, TicketPatch};
use crate::policy::{authorize, Action, Caller};
use crate::store::{Store, TicketFilter};
use crate::utils::error::AppError;

/// Ticket lifecycle: `Active -> Cancelled`, plus physical removal.
///
/// Availability is headroom against the event's capacity, not a count of
/// issued rows: `ticket_capacity - active tickets`.
#[derive(Clone)]
pub struct TicketService {
    store: Arc<dyn Store>,
    events: EventService,
}

impl TicketService {
    pub fn new(store: Arc<dyn Store>, events: EventService) -> Self {
        Self { store, events }
    }

    pub async fn create(&self, caller: &Caller, ticket: NewTicket) -> Result<Ticket, AppError> {
        authorize(caller, Action::WriteTicket)?;
        ticket.validate()?;
        self.events.get(ticket.event_id).await?;

        let ticket = self.store.insert_ticket(&ticket).await?;
        info!(ticket_id = ticket.id, event_id = ticket.event_id, "Ticket created");
        Ok(ticket)
    }

    pub async fn get(&self, id: i64) -> Result<Ticket, AppError> {
        self.store
            .ticket_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Ticket", id))
    }

    pub async fn list(&self, caller: &Caller) -> Result<Vec<Ticket>, AppError> {
        authorize(caller, Action::ListTickets)?;
        self.store.list_tickets(TicketFilter::All).await
    }

    pub async fn list_by_event(&self, event_id: i64) -> Result<Vec<Ticket>, AppError> {
        self.store.list_tickets(TicketFilter::Event(event_id)).await
    }

    pub async fn list_available_by_event(&self, event_id: i64) -> Result<Vec<Ticket>, AppError> {
        self.store
            .list_tickets(TicketFilter::ActiveForEvent(event_id))
            .await
    }

    /// Remaining headroom for the event. Negative when capacity was lowered
    /// below the number of active tickets.
    pub async fn count_available_by_event(&self, event_id: i64) -> Result<i64, AppError> {
        let event = self.events.get(event_id).await?;
        let active = self.store.count_active_tickets(event_id).await?;
        let headroom = i64::from(event.ticket_capacity) - active;
        debug!(event_id, active, headroom, "Computed ticket headroom");
        Ok(headroom)
    }

    /// Moving an active ticket to another event takes a slot there, so the
    /// store re-checks that event's headroom.
    pub async fn update(&self, caller: &Caller, id: i64, patch: TicketPatch) -> Result<Ticket, AppError> {
        authorize(caller, Action::WriteTicket)?;
        patch.validate()?;
        let mut ticket = self.get(id).await?;
        if let Some(event_id) = patch.event_id {
            if event_id != ticket.event_id {
                self.events.get(event_id).await?;
            }
        }

        ticket.apply(patch);
        let ticket = self.store.update_ticket(&ticket).await?;
        info!(ticket_id = id, "Ticket updated");
        Ok(ticket)
    }

    /// Cancelling an already cancelled ticket succeeds and leaves it as it
    /// was. A ticket held by a booking cannot be cancelled; remove the
    /// booking instead.
    pub async fn cancel(&self, caller: &Caller, id: i64) -> Result<Ticket, AppError> {
        authorize(caller, Action::WriteTicket)?;
        let mut ticket = self.get(id).await?;
        if !ticket.cancel(Utc::now()) {
            debug!(ticket_id = id, "Ticket already cancelled");
            return Ok(ticket);
        }

        let ticket = self.store.update_ticket(&ticket).await?;
        info!(ticket_id = id, event_id = ticket.event_id, "Ticket cancelled");
        Ok(ticket)
    }

    pub async fn delete(&self, caller: &Caller, id: i64) -> Result<Ticket, AppError> {
        authorize(caller, Action::DeleteTicket)?;
        let ticket = self
            .store
            .delete_ticket(id)
            .await?
            .ok_or_else(|| AppError::not_found("Ticket", id))?;
        info!(ticket_id = id, event_id = ticket.event_id, "Ticket deleted");
        Ok(ticket)
    }
}
