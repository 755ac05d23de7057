use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;

use crate::auth::CurrentUser;
use crate::models::{NewTicket, TicketPatch};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

pub async fn list_tickets(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Response, AppError> {
    let tickets = state.services.tickets.list(&current.caller()).await?;
    Ok(success(tickets, "Tickets retrieved"))
}

pub async fn get_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<i64>,
) -> Result<Response, AppError> {
    let ticket = state.services.tickets.get(ticket_id).await?;
    Ok(success(ticket, "Ticket retrieved"))
}

pub async fn create_ticket(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(ticket): Json<NewTicket>,
) -> Result<Response, AppError> {
    let ticket = state
        .services
        .tickets
        .create(&current.caller(), ticket)
        .await?;
    Ok(created(ticket, "Ticket created"))
}

pub async fn update_ticket(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(ticket_id): Path<i64>,
    Json(patch): Json<TicketPatch>,
) -> Result<Response, AppError> {
    let ticket = state
        .services
        .tickets
        .update(&current.caller(), ticket_id, patch)
        .await?;
    Ok(success(ticket, "Ticket updated"))
}

pub async fn cancel_ticket(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(ticket_id): Path<i64>,
) -> Result<Response, AppError> {
    let ticket = state
        .services
        .tickets
        .cancel(&current.caller(), ticket_id)
        .await?;
    Ok(success(ticket, "Ticket cancelled"))
}

pub async fn delete_ticket(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(ticket_id): Path<i64>,
) -> Result<Response, AppError> {
    let ticket = state
        .services
        .tickets
        .delete(&current.caller(), ticket_id)
        .await?;
    Ok(success(ticket, "Ticket deleted"))
}

pub async fn list_tickets_by_event(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
) -> Result<Response, AppError> {
    let tickets = state.services.tickets.list_by_event(event_id).await?;
    Ok(success(tickets, "Tickets retrieved"))
}

pub async fn list_available_tickets_by_event(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
) -> Result<Response, AppError> {
    let tickets = state
        .services
        .tickets
        .list_available_by_event(event_id)
        .await?;
    Ok(success(tickets, "Available tickets retrieved"))
}

pub async fn count_available_tickets_by_event(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
) -> Result<Response, AppError> {
    let available = state
        .services
        .tickets
        .count_available_by_event(event_id)
        .await?;
    Ok(success(available, "Available ticket count retrieved"))
}
