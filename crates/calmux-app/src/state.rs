//! Request-scoped access to the aggregation services via the depot.

use std::sync::Arc;

use salvo::async_trait;

use calmux_service::{
    AccessGate, AuthVerifier, GroupCatalog, IdentityDirectory, MergeStreamer, SourceResolver,
};

use crate::error::{AppError, AppResult};

/// The aggregation engine plus its collaborators, built once at startup.
pub struct AppServices {
    pub resolver: SourceResolver,
    pub streamer: MergeStreamer,
    pub gate: AccessGate,
    pub verifier: Arc<dyn AuthVerifier>,
    pub directory: Arc<dyn IdentityDirectory>,
    pub catalog: Arc<dyn GroupCatalog>,
}

pub struct ServicesHandler {
    pub services: Arc<AppServices>,
}

#[async_trait]
impl salvo::Handler for ServicesHandler {
    async fn handle(
        &self,
        _req: &mut salvo::Request,
        depot: &mut salvo::Depot,
        _res: &mut salvo::Response,
        _ctrl: &mut salvo::FlowCtrl,
    ) {
        depot.inject(Arc::clone(&self.services));
    }
}

/// ## Summary
/// Retrieves the application services from the depot.
///
/// ## Errors
/// Returns an error if the services are not found in the depot.
pub fn get_services_from_depot(depot: &salvo::Depot) -> AppResult<Arc<AppServices>> {
    depot.obtain::<Arc<AppServices>>().cloned().map_err(|_err| {
        AppError::CoreError(calmux_core::error::CoreError::InvariantViolation(
            "Services not found in depot",
        ))
    })
}
