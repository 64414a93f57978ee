use attendance_protocol::{
    AttendanceResponse, AttendanceUpdate, Credentials, Identity, LoginResponse, Month, RecordKey, ReportResponse,
    Status, UpdateResponse, UsersResponse,
};
use async_std::task;
use serde::Deserialize;
use tracing::{debug, info, trace, warn};
use warp::{reply, Rejection, Reply};

use crate::{
    error::ApiError,
    metrics::Outcome,
    policy,
    report,
    server::AttendanceServer,
};

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    #[serde(default)]
    pub month: String,
}

fn reject<E: Into<ApiError>>(error: E) -> Rejection {
    warp::reject::custom(error.into())
}

pub async fn login(credentials: Credentials, server: AttendanceServer) -> Result<impl Reply, Rejection> {
    trace!("login attempt {:?}", credentials);
    let auth = server.auth.clone();
    let verified = task::spawn_blocking(move || auth.authenticate(&credentials.username, &credentials.password)).await;
    match verified {
        Ok(user) => {
            server.metrics.login(Outcome::Success);
            info!("{} logged in", user.username);
            Ok(reply::json(&LoginResponse { success: true, user }))
        }
        Err(error) => {
            server.metrics.login(Outcome::Rejected);
            Err(reject(error))
        }
    }
}

pub async fn list_attendance(identity: Identity, server: AttendanceServer) -> Result<impl Reply, Rejection> {
    trace!("{} lists attendance", identity.username);
    let data = server.store.get_all().await.map_err(reject)?;
    Ok(reply::json(&AttendanceResponse { success: true, data }))
}

/// Create or self-mark
pub async fn mark_attendance(
    identity: Identity,
    update: AttendanceUpdate,
    server: AttendanceServer,
) -> Result<impl Reply, Rejection> {
    apply_update(identity, update, server, "Attendance updated successfully").await
}

/// Admin override
pub async fn override_attendance(
    identity: Identity,
    update: AttendanceUpdate,
    server: AttendanceServer,
) -> Result<impl Reply, Rejection> {
    if let Err(error) = policy::require_admin(&identity) {
        warn!("{} attempted an override", identity.username);
        server.metrics.update(Outcome::Rejected);
        return Err(reject(error));
    }
    apply_update(identity, update, server, "Attendance status changed successfully").await
}

async fn apply_update(
    identity: Identity,
    update: AttendanceUpdate,
    server: AttendanceServer,
    message: &str,
) -> Result<reply::Json, Rejection> {
    match update_record(&identity, &update, &server).await {
        Ok(()) => {
            server.metrics.update(Outcome::Success);
            debug!("{} set {} to {}", identity.username, update.key, update.status);
            Ok(reply::json(&UpdateResponse {
                success: true,
                message: message.into(),
            }))
        }
        Err(error @ ApiError::Storage(_)) => {
            server.metrics.update(Outcome::Failed);
            Err(reject(error))
        }
        Err(error) => {
            server.metrics.update(Outcome::Rejected);
            warn!("refused update of {:?} by {}: {}", update.key, identity.username, error);
            Err(reject(error))
        }
    }
}

async fn update_record(identity: &Identity, update: &AttendanceUpdate, server: &AttendanceServer) -> Result<(), ApiError> {
    let key = update.key.parse::<RecordKey>()?;
    let status = update.status.parse::<Status>()?;
    policy::authorize_update(identity, &key, status)?;
    server.store.set(key, status).await?;
    Ok(())
}

pub async fn monthly_report(
    identity: Identity,
    query: ReportQuery,
    server: AttendanceServer,
) -> Result<impl Reply, Rejection> {
    policy::require_admin(&identity).map_err(reject)?;
    let month = query.month.parse::<Month>().map_err(reject)?;

    let records = server.store.get_all().await.map_err(reject)?;
    let report = report::monthly_report(month, &server.users.profiles(), &records);
    debug!("{} requested the report for {}", identity.username, month);

    Ok(reply::json(&ReportResponse { success: true, report }))
}

pub async fn list_users(server: AttendanceServer) -> Result<impl Reply, Rejection> {
    Ok(reply::json(&UsersResponse {
        success: true,
        users: server.users.profiles(),
    }))
}
