use axum::{Json, extract::State, http::StatusCode};
use seatdesk_db::models::PaymentConfirmedEvent;
use seatdesk_services::licensing::OrderReport;

use crate::{error::ApiError, extractors::cms::CmsCaller, state::AppState};

/// Called by the back office once an order's payment is confirmed.
/// Responds 200 when every unit was applied and 207 when some failed;
/// the body lists both sides either way.
pub async fn confirm(
    State(state): State<AppState>,
    _caller: CmsCaller,
    Json(event): Json<PaymentConfirmedEvent>,
) -> Result<(StatusCode, Json<OrderReport>), ApiError> {
    if event.order_id.is_empty() || event.team_id.is_empty() {
        return Err(ApiError::Validation(
            "order_id and team_id are required".to_string(),
        ));
    }

    let report = state.licensing.orders.confirm_order(event).await;
    let status = if report.is_complete() {
        StatusCode::OK
    } else {
        StatusCode::MULTI_STATUS
    };

    Ok((status, Json(report)))
}
