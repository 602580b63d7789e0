//! Feed endpoints: personal aggregates, linked calendars, booking feeds,
//! and stored per-group documents.

use salvo::http::HeaderValue;
use salvo::http::header::CONTENT_TYPE;
use salvo::{Depot, Request, Response, Router, handler};

use calmux_core::constants::{
    CALENDAR_CONTENT_TYPE, USERS_ROUTE_COMPONENT, bookings_resource_path, schedule_resource_path,
};
use calmux_core::error::CoreError;
use calmux_core::types::UserId;
use calmux_service::{IdentityProfile, RequestKind, ServiceError};

use crate::config::{Settings, get_settings_from_depot};
use crate::error::{AppError, AppResult, render_error};
use crate::middleware::auth::current_user;
use crate::state::{AppServices, get_services_from_depot};

/// Envelope display name for booking feeds.
const BOOKINGS_CALNAME: &str = "Bookings";

#[must_use]
pub fn routes() -> Router {
    // Literal segments are pushed before parameterized ones so that
    // `users/me/...` and the global `bookings.ics` take precedence.
    Router::new()
        .push(
            Router::with_path(USERS_ROUTE_COMPONENT)
                .push(
                    Router::with_path("me")
                        .push(Router::with_path("all.ics").get(my_schedule))
                        .push(Router::with_path("bookings.ics").get(my_bookings)),
                )
                .push(
                    Router::with_path("{user_id}")
                        .push(Router::with_path("all.ics").get(user_schedule))
                        .push(Router::with_path("bookings.ics").get(user_bookings))
                        .push(
                            Router::with_path("linked")
                                .push(Router::with_path("{alias}.ics").get(linked_schedule)),
                        ),
                ),
        )
        .push(Router::with_path("bookings.ics").get(global_bookings))
        .push(Router::with_path("{group_alias}.ics").get(group_document))
}

/// ## Summary
/// Personal aggregate for the authenticated requester.
#[handler]
async fn my_schedule(depot: &Depot, res: &mut Response) {
    if let Err(err) = serve_my_schedule(depot, res).await {
        render_error(res, &err);
    }
}

async fn serve_my_schedule(depot: &Depot, res: &mut Response) -> AppResult<()> {
    let services = get_services_from_depot(depot)?;
    let settings = get_settings_from_depot(depot)?;
    let user = require_user(depot)?;

    let profile = resolve_profile(&services, user).await?;
    let sources = services
        .resolver
        .resolve(user, &RequestKind::PersonalAggregate)
        .await?;

    stream_feed(
        res,
        &services,
        sources,
        &schedule_calname(&profile, &settings),
    );
    Ok(())
}

/// ## Summary
/// Personal aggregate for an arbitrary user, gated by the access key stored
/// for the `/users/{user_id}/all.ics` resource.
#[handler]
async fn user_schedule(req: &mut Request, depot: &Depot, res: &mut Response) {
    if let Err(err) = serve_user_schedule(req, depot, res).await {
        render_error(res, &err);
    }
}

async fn serve_user_schedule(
    req: &mut Request,
    depot: &Depot,
    res: &mut Response,
) -> AppResult<()> {
    let services = get_services_from_depot(depot)?;
    let settings = get_settings_from_depot(depot)?;
    let user = user_param(req)?;
    let key = access_key_param(req)?;

    let profile = resolve_profile(&services, user).await?;
    check_access(&services, user, &schedule_resource_path(user), &key).await?;

    let sources = services
        .resolver
        .resolve(user, &RequestKind::PersonalAggregate)
        .await?;

    stream_feed(
        res,
        &services,
        sources,
        &schedule_calname(&profile, &settings),
    );
    Ok(())
}

/// ## Summary
/// One linked remote calendar by alias. No key is required; the alias only
/// resolves through the owning user's profile.
#[handler]
async fn linked_schedule(req: &mut Request, depot: &Depot, res: &mut Response) {
    if let Err(err) = serve_linked_schedule(req, depot, res).await {
        render_error(res, &err);
    }
}

async fn serve_linked_schedule(
    req: &mut Request,
    depot: &Depot,
    res: &mut Response,
) -> AppResult<()> {
    let services = get_services_from_depot(depot)?;
    let user = user_param(req)?;
    let alias: String = req.param("alias").ok_or_else(|| {
        AppError::CoreError(CoreError::ValidationError("missing alias".to_string()))
    })?;

    let sources = services
        .resolver
        .resolve(user, &RequestKind::LinkedAlias(alias.clone()))
        .await?;

    stream_feed(res, &services, sources, &alias);
    Ok(())
}

/// ## Summary
/// Booking feed for the authenticated requester.
#[handler]
async fn my_bookings(depot: &Depot, res: &mut Response) {
    if let Err(err) = serve_my_bookings(depot, res).await {
        render_error(res, &err);
    }
}

async fn serve_my_bookings(depot: &Depot, res: &mut Response) -> AppResult<()> {
    let services = get_services_from_depot(depot)?;
    let user = require_user(depot)?;

    let sources = services
        .resolver
        .resolve(user, &RequestKind::BookingPersonal)
        .await?;

    stream_feed(res, &services, sources, BOOKINGS_CALNAME);
    Ok(())
}

/// ## Summary
/// Booking feed for an arbitrary user, gated by the access key stored for
/// the `/users/{user_id}/bookings.ics` resource.
#[handler]
async fn user_bookings(req: &mut Request, depot: &Depot, res: &mut Response) {
    if let Err(err) = serve_user_bookings(req, depot, res).await {
        render_error(res, &err);
    }
}

async fn serve_user_bookings(
    req: &mut Request,
    depot: &Depot,
    res: &mut Response,
) -> AppResult<()> {
    let services = get_services_from_depot(depot)?;
    let user = user_param(req)?;
    let key = access_key_param(req)?;

    resolve_profile(&services, user).await?;
    check_access(&services, user, &bookings_resource_path(user), &key).await?;

    let sources = services
        .resolver
        .resolve(user, &RequestKind::BookingPersonal)
        .await?;

    stream_feed(res, &services, sources, BOOKINGS_CALNAME);
    Ok(())
}

/// ## Summary
/// The booking service's global feed. Open to unauthenticated requests.
#[handler]
async fn global_bookings(depot: &Depot, res: &mut Response) {
    if let Err(err) = serve_global_bookings(depot, res).await {
        render_error(res, &err);
    }
}

async fn serve_global_bookings(depot: &Depot, res: &mut Response) -> AppResult<()> {
    let services = get_services_from_depot(depot)?;

    // The global feed is identity-independent; the resolver ignores the
    // user id for this request kind.
    let sources = services
        .resolver
        .resolve(0, &RequestKind::BookingGlobal)
        .await?;

    stream_feed(res, &services, sources, BOOKINGS_CALNAME);
    Ok(())
}

/// ## Summary
/// The stored document for one group, served verbatim. Groups without a
/// stored document cannot be synthesized on the fly and answer 501.
#[handler]
async fn group_document(req: &mut Request, depot: &Depot, res: &mut Response) {
    if let Err(err) = serve_group_document(req, depot, res).await {
        render_error(res, &err);
    }
}

async fn serve_group_document(
    req: &mut Request,
    depot: &Depot,
    res: &mut Response,
) -> AppResult<()> {
    let services = get_services_from_depot(depot)?;
    let alias: String = req.param("group_alias").ok_or_else(|| {
        AppError::CoreError(CoreError::ValidationError("missing group alias".to_string()))
    })?;

    let entry = services
        .catalog
        .resolve_alias(&alias)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("event group {alias}")))?;

    let Some(path) = entry.static_path else {
        return Err(ServiceError::UnsupportedSource(format!(
            "event group {alias} has no static document"
        ))
        .into());
    };

    let body = tokio::fs::read(&path).await.map_err(|e| {
        ServiceError::UpstreamUnavailable {
            status: None,
            detail: format!("reading {}: {e}", path.display()),
        }
    })?;

    res.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static(CALENDAR_CONTENT_TYPE),
    );
    res.write_body(body).map_err(|_e| {
        AppError::CoreError(CoreError::InvariantViolation("failed to write response body"))
    })?;
    Ok(())
}

fn require_user(depot: &Depot) -> AppResult<UserId> {
    current_user(depot).ok_or_else(|| ServiceError::NotAuthenticated.into())
}

fn user_param(req: &Request) -> AppResult<UserId> {
    req.param::<UserId>("user_id")
        .ok_or_else(|| CoreError::ValidationError("invalid user id".to_string()).into())
}

fn access_key_param(req: &Request) -> AppResult<String> {
    req.query::<String>("access_key").ok_or_else(|| {
        ServiceError::Forbidden("access_key query parameter is required".to_string()).into()
    })
}

async fn resolve_profile(services: &AppServices, user: UserId) -> AppResult<IdentityProfile> {
    services
        .directory
        .resolve(user)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("user {user}")).into())
}

async fn check_access(
    services: &AppServices,
    user: UserId,
    resource_path: &str,
    supplied_key: &str,
) -> AppResult<()> {
    if services.gate.check(user, resource_path, supplied_key).await? {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(format!("invalid access key for {resource_path}")).into())
    }
}

fn schedule_calname(profile: &IdentityProfile, settings: &Settings) -> String {
    format!(
        "{} schedule from {}",
        profile.contact_address, settings.calendar.name
    )
}

fn stream_feed(
    res: &mut Response,
    services: &AppServices,
    sources: Vec<calmux_service::CalendarSource>,
    display_name: &str,
) {
    res.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static(CALENDAR_CONTENT_TYPE),
    );
    res.stream(services.streamer.merge(sources, display_name));
}
