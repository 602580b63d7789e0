use salvo::Depot;
use tracing::error;

use calmux_core::types::UserId;

use crate::state::get_services_from_depot;

pub mod depot_keys {
    pub const AUTHENTICATED_PRINCIPAL: &str = "authenticated_principal";
}

/// The requester as established by `AuthMiddleware`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepotIdentity {
    User(UserId),
    Public,
}

/// The authenticated user for this request, if any.
#[must_use]
pub fn current_user(depot: &Depot) -> Option<UserId> {
    match depot.get::<DepotIdentity>(depot_keys::AUTHENTICATED_PRINCIPAL) {
        Ok(DepotIdentity::User(user)) => Some(*user),
        _ => None,
    }
}

pub struct AuthMiddleware;

/// ## Summary
/// Authentication middleware: verifies a bearer token when one is present
/// and stores the resulting identity in the depot. Requests without a valid
/// token proceed as public; handlers that require an identity return 401.
///
/// ## Side Effects
/// Inserts a `DepotIdentity` under `depot_keys::AUTHENTICATED_PRINCIPAL`.
#[salvo::async_trait]
impl salvo::Handler for AuthMiddleware {
    #[tracing::instrument(skip(self, req, depot, res, ctrl), fields(
        method = %req.method(),
        path = %req.uri().path()
    ))]
    async fn handle(
        &self,
        req: &mut salvo::Request,
        depot: &mut Depot,
        res: &mut salvo::Response,
        ctrl: &mut salvo::FlowCtrl,
    ) {
        tracing::trace!("Authenticating request");

        let Some(token) = bearer_token(req) else {
            depot.insert(depot_keys::AUTHENTICATED_PRINCIPAL, DepotIdentity::Public);
            return;
        };

        let services = match get_services_from_depot(depot) {
            Ok(s) => s,
            Err(e) => {
                error!(error = ?e, "Failed to get services from depot");
                res.status_code(salvo::http::StatusCode::INTERNAL_SERVER_ERROR);
                ctrl.skip_rest();
                return;
            }
        };

        match services.verifier.verify(&token).await {
            Ok(Some(user)) => {
                tracing::debug!(user_id = user, "User authenticated successfully");
                depot.insert(depot_keys::AUTHENTICATED_PRINCIPAL, DepotIdentity::User(user));
            }
            Ok(None) => {
                tracing::debug!("Token not recognized, treating request as public");
                depot.insert(depot_keys::AUTHENTICATED_PRINCIPAL, DepotIdentity::Public);
            }
            Err(e) => {
                error!(error = %e, "Token verification failed");
                res.status_code(salvo::http::StatusCode::INTERNAL_SERVER_ERROR);
                ctrl.skip_rest();
            }
        }
    }
}

fn bearer_token(req: &salvo::Request) -> Option<String> {
    let header = req
        .headers()
        .get(salvo::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?;
    let token = header.strip_prefix("Bearer ")?;
    (!token.is_empty()).then(|| token.to_string())
}
