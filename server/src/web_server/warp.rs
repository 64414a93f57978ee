use anyhow::Context as _;
use async_std::task;
use async_trait::async_trait;
use attendance_protocol::ErrorResponse;
use hannibal::{Actor, Context, Handler};
use tracing::{debug, error, info, trace};
use warp::{
    filters::body::BodyDeserializeError,
    http::StatusCode,
    reject::{InvalidQuery, LengthRequired, MethodNotAllowed, PayloadTooLarge, UnsupportedMediaType},
    Filter, Rejection, Reply,
};

use std::{convert::Infallible, net::SocketAddr};

use super::handlers::{self, ReportQuery};
use crate::{error::ApiError, server::AttendanceServer};

const BODY_LIMIT: u64 = 16 * 1024;

fn with_server(server: AttendanceServer) -> impl Filter<Extract = (AttendanceServer,), Error = Infallible> + Clone {
    warp::any().map(move || server.clone())
}

/// Establishes the caller's identity from the `Authorization` header
fn authenticated(server: AttendanceServer) -> impl Filter<Extract = (attendance_protocol::Identity,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let auth = server.auth.clone();
        async move {
            task::spawn_blocking(move || auth.authenticate_header(header.as_deref()))
                .await
                .map_err(|error| warp::reject::custom(ApiError::from(error)))
        }
    })
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: serde::de::DeserializeOwned + Send,
{
    warp::body::content_length_limit(BODY_LIMIT).and(warp::body::json())
}

pub fn routes(server: AttendanceServer) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let login = warp::path("login")
        .and(warp::path::end())
        .and(warp::post())
        .and(json_body())
        .and(with_server(server.clone()))
        .and_then(handlers::login);

    let attendance = warp::path("attendance").and(warp::path::end());

    let list = attendance
        .and(warp::get())
        .and(authenticated(server.clone()))
        .and(with_server(server.clone()))
        .and_then(handlers::list_attendance);

    let mark = attendance
        .and(warp::post())
        .and(authenticated(server.clone()))
        .and(json_body())
        .and(with_server(server.clone()))
        .and_then(handlers::mark_attendance);

    let overrule = attendance
        .and(warp::put())
        .and(authenticated(server.clone()))
        .and(json_body())
        .and(with_server(server.clone()))
        .and_then(handlers::override_attendance);

    let report = warp::path!("attendance" / "report")
        .and(warp::get())
        .and(authenticated(server.clone()))
        .and(warp::query::<ReportQuery>())
        .and(with_server(server.clone()))
        .and_then(handlers::monthly_report);

    let users = warp::path("users")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_server(server.clone()))
        .and_then(handlers::list_users);

    let metrics = warp::path("metrics")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_server(server))
        .map(|server: AttendanceServer| server.metrics.render());

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST", "PUT", "OPTIONS"])
        .allow_headers(vec!["content-type", "authorization"]);

    login
        .or(list)
        .or(mark)
        .or(overrule)
        .or(report)
        .or(users)
        .or(metrics)
        .recover(handle_rejection)
        .with(cors)
        .with(warp::log::custom(|info| {
            trace!(
                "{} {} {} {:?}",
                info.method(),
                info.path(),
                info.status(),
                info.remote_addr()
            )
        }))
}

/// Turns every rejection into `{success: false, message}`
pub async fn handle_rejection(rejection: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, String::from("Endpoint not found"))
    } else if let Some(error) = rejection.find::<ApiError>() {
        if error.status() == StatusCode::INTERNAL_SERVER_ERROR {
            error!("{}", error);
        }
        (error.status(), error.public_message())
    } else if let Some(error) = rejection.find::<BodyDeserializeError>() {
        debug!("bad body {}", error);
        (StatusCode::BAD_REQUEST, String::from("Request body is not valid JSON"))
    } else if rejection.find::<InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, String::from("Invalid query string"))
    } else if rejection.find::<PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, String::from("Request body is too large"))
    } else if rejection.find::<LengthRequired>().is_some() {
        (StatusCode::LENGTH_REQUIRED, String::from("Content-Length is required"))
    } else if rejection.find::<UnsupportedMediaType>().is_some() {
        (StatusCode::UNSUPPORTED_MEDIA_TYPE, String::from("Expected a JSON body"))
    } else if rejection.find::<MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, String::from("Method Not Allowed"))
    } else {
        error!("unhandled rejection {:?}", rejection);
        (StatusCode::INTERNAL_SERVER_ERROR, String::from("Internal server error"))
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&ErrorResponse::new(message)),
        status,
    ))
}

pub struct WebServer {
    server: AttendanceServer,
}

impl WebServer {
    pub fn new(server: AttendanceServer) -> Self {
        Self { server }
    }

    #[tracing::instrument(level = tracing::Level::INFO, skip_all, name = "warp_server")]
    async fn start(&mut self, addr: SocketAddr) -> Result<(), warp::Error> {
        let routes = routes(self.server.clone());

        debug!("checking {} for availability", addr);
        let (bound, serving) = warp::serve(routes).try_bind_ephemeral(addr)?;
        info!("listening on http://{}", bound);
        serving.await;

        info!("web server has terminated");
        Ok(())
    }
}

#[async_trait]
impl Actor for WebServer {
    const NAME: &'static str = module_path!();

    async fn started(&mut self, _ctx: &mut Context<Self>) -> hannibal::Result<()> {
        info!("started web server");
        Ok(())
    }

    async fn stopped(&mut self, _ctx: &mut Context<Self>) {
        info!("shutting down web server");
    }
}

#[async_trait]
impl Handler<super::Listen> for WebServer {
    async fn handle(&mut self, _ctx: &mut Context<Self>, msg: super::Listen) -> anyhow::Result<()> {
        let served = self.start(msg.socket).await;
        if let Err(error) = &served {
            error!("cannot serve on {}: {}", msg.socket, error);
        }
        served.with_context(|| format!("cannot serve on {}", msg.socket))
    }
}
