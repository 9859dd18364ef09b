use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;

use super::{blocking, AppState};
use crate::auth::{self, Credentials, Registration};
use crate::error::{ServiceError, ServiceResult};
use crate::models::{AuthContext, PatientPublic, StaffPublic, TokenResponse};
use crate::search::{self, SearchFields};

/// Success envelope: `{"data": ...}`.
#[derive(Debug, Serialize)]
pub struct Data<T> {
    pub data: T,
}

pub async fn create_staff(
    State(state): State<AppState>,
    payload: Result<Json<Registration>, JsonRejection>,
) -> ServiceResult<(StatusCode, Json<Data<StaffPublic>>)> {
    let Json(registration) = payload?;
    let staff = blocking(move || {
        auth::register(state.store.as_ref(), state.passwords.as_ref(), registration)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(Data { data: staff })))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> ServiceResult<Json<Data<TokenResponse>>> {
    let Json(credentials) = payload?;
    let response = blocking(move || {
        auth::login(
            state.store.as_ref(),
            state.passwords.as_ref(),
            &state.tokens,
            credentials,
        )
    })
    .await?;
    Ok(Json(Data { data: response }))
}

/// Looks a patient up by national ID or passport ID.
pub async fn get_patient(
    State(state): State<AppState>,
    identifier: Result<Path<String>, PathRejection>,
) -> ServiceResult<Json<PatientPublic>> {
    let Path(identifier) = identifier?;
    let patient = blocking(move || {
        state
            .store
            .find_patient_by_identifier(&identifier)
            .map_err(ServiceError::internal("Failed to look up patient"))?
            .ok_or(ServiceError::NotFound("Patient not found"))
    })
    .await?;
    Ok(Json(patient.into()))
}

/// Searches the caller's hospital. Requires [`require_token`](super::middleware::require_token).
pub async fn search_patients(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    query: Result<Query<SearchFields>, QueryRejection>,
) -> ServiceResult<Json<Data<Vec<PatientPublic>>>> {
    let Query(fields) = query?;
    let filter = search::build(ctx.hospital_id, &fields);
    let patients = blocking(move || {
        state
            .store
            .search_patients(&filter)
            .map_err(ServiceError::internal("Failed to search patients"))
    })
    .await?;
    Ok(Json(Data {
        data: patients.into_iter().map(PatientPublic::from).collect(),
    }))
}
