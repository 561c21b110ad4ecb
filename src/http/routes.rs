use axum::Router;

use crate::app::AppContext;

/// Trait for composable route modules
///
/// Implement this trait to create modular, reusable route groups.
/// Each module can register its own routes and be composed into the main
/// application router.
///
/// # Example
///
/// ```ignore
/// struct PricingModule;
///
/// impl RouteModule for PricingModule {
///     fn routes(&self) -> Router<AppContext> {
///         Router::new().route("/pricing/plans", get(list_plans))
///     }
/// }
/// ```
pub trait RouteModule {
    /// Returns a router with all routes for this module
    ///
    /// The router should NOT have state applied - state is applied when the
    /// modules are assembled. Handlers should use `State<AppContext>` to
    /// access the application context.
    fn routes(&self) -> Router<AppContext>
    where
        Self: Sized;

    /// Optional: specify a path prefix for all routes in this module
    fn prefix(&self) -> Option<&str> {
        None
    }

    /// Registers this module's routes into the application router
    fn register(self, router: Router<AppContext>) -> Router<AppContext>
    where
        Self: Sized,
    {
        let routes = self.routes();

        if let Some(prefix) = self.prefix() {
            router.nest(prefix, routes)
        } else {
            router.merge(routes)
        }
    }
}
