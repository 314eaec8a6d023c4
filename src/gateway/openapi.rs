//! OpenAPI / Swagger UI documentation
//!
//! - Swagger UI: `/docs`
//! - OpenAPI JSON: `/api-docs/openapi.json`

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::gateway::types::{
    BankInfo, ErrorBody, HealthResponse, IncomingClaimRequest, OpenAccountRequest,
};
use crate::money::Currency;
use crate::transfer::TransferRequest;

/// End-user bearer tokens (HS256 JWT)
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Interbank API",
        version = "1.0.0",
        description = "Multi-currency accounts and signed bank-to-bank transfers through a central bank registry.",
        license(name = "MIT")
    ),
    paths(
        crate::gateway::handlers::health::health_check,
        crate::gateway::handlers::keys::get_key_set,
        crate::gateway::handlers::b2b::receive_incoming,
        crate::gateway::handlers::account::bank_info,
        crate::gateway::handlers::account::open_account,
        crate::gateway::handlers::account::list_accounts,
        crate::gateway::handlers::account::get_account,
        crate::gateway::handlers::transfer::create_transfer,
        crate::gateway::handlers::transfer::create_internal_transfer,
        crate::gateway::handlers::transfer::create_external_transfer,
        crate::gateway::handlers::transfer::list_transfers,
        crate::gateway::handlers::transfer::get_transfer,
    ),
    components(schemas(
        BankInfo,
        Currency,
        ErrorBody,
        HealthResponse,
        IncomingClaimRequest,
        OpenAccountRequest,
        TransferRequest,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "System", description = "Health and bank identity"),
        (name = "Accounts", description = "Customer accounts"),
        (name = "Transfers", description = "Internal and outbound transfers"),
        (name = "Bank-to-Bank", description = "Claims from partner banks and our public key set")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/jwks.json",
            "/transfers/incoming",
            "/bank-info",
            "/accounts",
            "/accounts/{account_number}",
            "/transfers",
            "/transfers/internal",
            "/transfers/external",
            "/transfers/{id}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
        let schemes = doc.components.unwrap().security_schemes;
        assert!(schemes.contains_key("bearer_auth"));
    }
}
