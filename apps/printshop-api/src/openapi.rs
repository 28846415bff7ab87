//! OpenAPI documentation for the whole API

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Print Shop API",
        version = "0.1.0",
        description = "Storefront, custom print jobs and shop administration over MongoDB",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    modifiers(&BearerAuth),
    nest(
        (path = "/api/auth", api = domain_users::AuthApiDoc),
        (path = "/api/users", api = domain_users::ApiDoc),
        (path = "/api/products", api = domain_products::ApiDoc),
        (path = "/api/cart", api = domain_carts::ApiDoc),
        (path = "/api/orders", api = domain_orders::ApiDoc),
        (path = "/api/print-orders", api = domain_print_orders::ApiDoc),
        (path = "/api/reviews", api = domain_reviews::ApiDoc),
        (path = "/api/messages", api = domain_messages::ApiDoc),
        (path = "/api/reports", api = domain_reports::ApiDoc)
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by protected operations.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
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
