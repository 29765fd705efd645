// ── Domain hooks ──
//
// One binder per resource. Each declares its query keys, binds queries to
// the private client through the context's cache, and builds mutations that
// invalidate the namespaces they affect. Hooks hold a context clone, so
// they are cheap to create on demand: `ctx.team().list(&params)`.

pub mod analytics;
pub mod invoices;
pub mod reviews;
pub mod subscriptions;
pub mod team;
pub mod users;

pub use analytics::AnalyticsHooks;
pub use invoices::InvoiceHooks;
pub use reviews::ReviewHooks;
pub use subscriptions::SubscriptionHooks;
pub use team::TeamHooks;
pub use users::UserHooks;
