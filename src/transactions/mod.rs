use axum::Router;

use crate::state::AppState;

mod contract;
mod dto;
pub mod handlers;
pub mod repo;

pub fn router() -> Router<AppState> {
    handlers::transaction_routes()
}
