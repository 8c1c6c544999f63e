use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    routing::post,
};
use serde_json::Value;

use seniorcare_core::{Projection, SpaceId};
use seniorcare_entities::{
    Allergen, CareLevel, Credit, Discount, Expense, Facility, InsuranceCompany, Medication,
    PaymentType, Resident, ResponsiblePersonRole, RpPaymentType, Salutation, Space, Speciality,
};

use crate::app::dto::decode_record;
use crate::app::errors::repository_error_to_response;
use crate::app::routes::{common, grid, resources};
use crate::app::services::AppServices;
use crate::context::ActorContext;

pub async fn create(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<Value>,
) -> axum::response::Response {
    let space: Space = match decode_record(body, &[("id", SpaceId::new().to_string())]) {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.repo::<Space>().add(actor.user_id(), space).await {
        Ok(saved) => common::created(saved.project("detail")),
        Err(e) => repository_error_to_response(e),
    }
}

/// Routes under `/spaces/{space_id}`.
pub fn scoped_router() -> Router {
    Router::new()
        .route("/grid/:entity", post(grid::page))
        .nest("/allergens", resources::router::<Allergen>())
        .nest("/care-levels", resources::router::<CareLevel>())
        .nest("/credits", resources::router::<Credit>())
        .nest("/discounts", resources::router::<Discount>())
        .nest("/expenses", resources::router::<Expense>())
        .nest("/insurance-companies", resources::router::<InsuranceCompany>())
        .nest("/medications", resources::router::<Medication>())
        .nest("/payment-types", resources::router::<PaymentType>())
        .nest("/responsible-person-roles", resources::router::<ResponsiblePersonRole>())
        .nest("/rp-payment-types", resources::router::<RpPaymentType>())
        .nest("/salutations", resources::router::<Salutation>())
        .nest("/specialities", resources::router::<Speciality>())
        .nest("/facilities", resources::router::<Facility>())
        .nest("/residents", resources::router::<Resident>())
}
