use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::application::{parse_account_id, AccountService};
use crate::domain::{Account, Amount, CustomerDetails, Transaction};

use super::dto::{CreateAccountRequest, TransactionRequest, UpdateLimitRequest};
use super::errors::ApiError;

type Service = State<Arc<AccountService>>;
type ApiResult<T> = Result<T, ApiError>;

pub async fn create_account(
    State(service): Service,
    Json(body): Json<CreateAccountRequest>,
) -> ApiResult<(StatusCode, Json<Account>)> {
    let account = service.create_account(body.details, body.limit).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

pub async fn list_accounts(State(service): Service) -> ApiResult<Json<Vec<Account>>> {
    Ok(Json(service.get_all_accounts().await?))
}

pub async fn get_account(State(service): Service, Path(id): Path<String>) -> ApiResult<Json<Account>> {
    let id = parse_account_id(&id)?;
    Ok(Json(service.get_account(id).await?))
}

pub async fn remove_account(State(service): Service, Path(id): Path<String>) -> ApiResult<StatusCode> {
    let id = parse_account_id(&id)?;
    service.remove_account(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_balance(State(service): Service, Path(id): Path<String>) -> ApiResult<Json<Amount>> {
    let id = parse_account_id(&id)?;
    Ok(Json(service.get_balance(id).await?))
}

pub async fn get_transactions(
    State(service): Service,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Transaction>>> {
    let id = parse_account_id(&id)?;
    Ok(Json(service.get_all_transactions(id).await?))
}

pub async fn deposit(
    State(service): Service,
    Path(id): Path<String>,
    Json(body): Json<TransactionRequest>,
) -> ApiResult<Json<Account>> {
    let id = parse_account_id(&id)?;
    Ok(Json(service.deposit(id, body.date, body.amount).await?))
}

pub async fn withdraw(
    State(service): Service,
    Path(id): Path<String>,
    Json(body): Json<TransactionRequest>,
) -> ApiResult<Json<Account>> {
    let id = parse_account_id(&id)?;
    Ok(Json(service.withdraw(id, body.date, body.amount).await?))
}

pub async fn change_details(
    State(service): Service,
    Path(id): Path<String>,
    Json(details): Json<CustomerDetails>,
) -> ApiResult<Json<Account>> {
    let id = parse_account_id(&id)?;
    Ok(Json(service.change_details(id, details).await?))
}

pub async fn change_limit(
    State(service): Service,
    Path(id): Path<String>,
    Json(body): Json<UpdateLimitRequest>,
) -> ApiResult<Json<Account>> {
    let id = parse_account_id(&id)?;
    Ok(Json(service.change_limit(id, body.limit).await?))
}

pub async fn get_total(State(service): Service) -> ApiResult<Json<Amount>> {
    Ok(Json(service.get_total().await?))
}
