//! Contracts and their facility options.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde_json::Value;

use seniorcare_core::{EntityId, Group, HasLifecycleState, LifecycleState, Projection};
use seniorcare_entities::{
    CONTRACT_FACILITY_STATE, Contract, ContractFacilityOption, ContractType,
};

use crate::app::dto::{ChangeStateRequest, decode_record, parse_id};
use crate::app::errors::{self, domain_error_to_response, repository_error_to_response};
use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/contracts", post(create_contract))
        .route("/contracts/:id", get(get_contract).delete(delete_contract))
        .route("/contracts/:id/facility-options", post(add_facility_option))
        .route("/contract-facility-options/:id", get(get_facility_option))
        .route("/contract-facility-options/:id/state", put(change_option_state))
}

async fn load_contract(
    services: &AppServices,
    id: EntityId,
) -> Result<Contract, axum::response::Response> {
    match services.repo::<Contract>().get(id).await {
        Ok(Some(contract)) => Ok(contract),
        Ok(None) => Err(errors::not_found("contract")),
        Err(e) => Err(repository_error_to_response(e)),
    }
}

async fn create_contract(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<Value>,
) -> axum::response::Response {
    let contract: Contract = match decode_record(body, &[("id", EntityId::new().to_string())]) {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.repo::<Contract>().add(actor.user_id(), contract).await {
        Ok(saved) => common::created(saved.project("detail")),
        Err(e) => repository_error_to_response(e),
    }
}

async fn get_contract(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: EntityId = match parse_id(&id, "contract") {
        Ok(v) => v,
        Err(res) => return res,
    };
    match load_contract(&services, id).await {
        Ok(contract) => Json(contract.project("detail")).into_response(),
        Err(res) => res,
    }
}

async fn delete_contract(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: EntityId = match parse_id(&id, "contract") {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.repo::<Contract>().remove(id).await {
        Ok(outcome) => common::deleted(id, &outcome),
        Err(e) => repository_error_to_response(e),
    }
}

async fn add_facility_option(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> axum::response::Response {
    let contract_id: EntityId = match parse_id(&id, "contract") {
        Ok(v) => v,
        Err(res) => return res,
    };
    let contract = match load_contract(&services, contract_id).await {
        Ok(v) => v,
        Err(res) => return res,
    };
    if contract.contract_type != ContractType::Facility {
        return errors::json_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "invariant_violation",
            "facility options belong to facility contracts",
        );
    }
    let option: ContractFacilityOption = match decode_record(
        body,
        &[
            ("id", EntityId::new().to_string()),
            ("contract_id", contract_id.to_string()),
        ],
    ) {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services
        .repo::<ContractFacilityOption>()
        .add(actor.user_id(), option)
        .await
    {
        Ok(saved) => common::created(saved.project("detail")),
        Err(e) => repository_error_to_response(e),
    }
}

async fn get_facility_option(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: EntityId = match parse_id(&id, "option") {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.repo::<ContractFacilityOption>().get(id).await {
        Ok(Some(option)) => Json(option.project("detail")).into_response(),
        Ok(None) => errors::not_found("contract facility option"),
        Err(e) => repository_error_to_response(e),
    }
}

async fn change_option_state(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<ChangeStateRequest>,
) -> axum::response::Response {
    let id: EntityId = match parse_id(&id, "option") {
        Ok(v) => v,
        Err(res) => return res,
    };
    let state = match LifecycleState::try_from(body.state) {
        Ok(v) => v,
        Err(e) => return domain_error_to_response(e),
    };
    match services
        .repo::<ContractFacilityOption>()
        .edit_in(
            actor.user_id(),
            id,
            |option| {
                option.set_state(state);
                Ok(())
            },
            &[Group::from_static(CONTRACT_FACILITY_STATE)],
        )
        .await
    {
        Ok(saved) => Json(saved.project("detail")).into_response(),
        Err(e) => repository_error_to_response(e),
    }
}
