use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::api::error::ApiError;
use crate::use_cases::create_charge_sale::CreateChargeSaleUseCase;
use crate::use_cases::create_credit_request::CreateCreditRequestUseCase;
use crate::use_cases::process_credit_request::ProcessCreditRequestUseCase;

// Estado compartido de la aplicación
pub struct AppState {
    pub create_credit_request_use_case: CreateCreditRequestUseCase,
    pub process_credit_request_use_case: ProcessCreditRequestUseCase,
    pub create_charge_sale_use_case: CreateChargeSaleUseCase,
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/credit_request", post(create_credit_request))
        .route("/charge_sale", post(create_charge_sale))
        .route("/admin/process_credit_request", post(process_credit_request))
        .with_state(state)
}

// DTO de entrada para crear una solicitud de crédito
#[derive(Deserialize, ToSchema)]
pub struct CreateCreditRequestBody {
    pub seller_phone_number: String,
    pub amount: Decimal,
}

// DTO de entrada para crear una venta de carga
#[derive(Deserialize, ToSchema)]
pub struct CreateChargeSaleBody {
    pub seller_phone_number: String,
    pub receiver_phone_number: String,
    pub amount: Decimal,
}

// DTO de entrada para procesar una solicitud de crédito.
// status: 1=WAITING (eco sin efecto), 2=ACCEPTED (aprueba), 3=REJECTED (rechaza)
#[derive(Deserialize, ToSchema)]
pub struct ProcessCreditRequestBody {
    pub status: i32,
    pub credit_id: i64,
    pub phone_number: String,
}

// Handler: Crear solicitud de crédito de un vendedor
// POST /credit_request
#[utoipa::path(
    post,
    path = "/credit_request",
    request_body = CreateCreditRequestBody,
    responses(
        (status = 201, description = "Credit request created, returns its id as code"),
        (status = 400, description = "Invalid amount or malformed input"),
        (status = 404, description = "Seller not found")
    )
)]
pub async fn create_credit_request(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateCreditRequestBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let request = state
        .create_credit_request_use_case
        .execute(&payload.seller_phone_number, payload.amount)
        .await?;

    Ok((StatusCode::CREATED, Json(json!({ "code": request.id }))))
}

// Handler: Venta de carga de un vendedor hacia un teléfono receptor
// POST /charge_sale
#[utoipa::path(
    post,
    path = "/charge_sale",
    request_body = CreateChargeSaleBody,
    responses(
        (status = 201, description = "Charge sale completed, returns its id as code"),
        (status = 400, description = "Invalid amount, inactive wallet or insufficient balance"),
        (status = 404, description = "Seller not found"),
        (status = 409, description = "Wallet locks busy or too much contention"),
        (status = 500, description = "Transfer failed and was compensated")
    )
)]
pub async fn create_charge_sale(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateChargeSaleBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let sale = state
        .create_charge_sale_use_case
        .execute(
            &payload.seller_phone_number,
            &payload.receiver_phone_number,
            payload.amount,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(json!({ "code": sale.id }))))
}

// Handler: Procesamiento administrativo de una solicitud de crédito
// POST /admin/process_credit_request
#[utoipa::path(
    post,
    path = "/admin/process_credit_request",
    request_body = ProcessCreditRequestBody,
    responses(
        (status = 202, description = "Request processed (or echoed for status 1)"),
        (status = 400, description = "Invalid input or request not in WAITING"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Admin account not found")
    )
)]
pub async fn process_credit_request(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ProcessCreditRequestBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    state
        .process_credit_request_use_case
        .execute(&payload.phone_number, payload.credit_id, payload.status)
        .await?;

    Ok((StatusCode::ACCEPTED, Json(json!({ "msg": "done" }))))
}
