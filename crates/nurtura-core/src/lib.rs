//! Reactive data layer between `nurtura-api` and dashboard front ends.
//!
//! - **[`DashboardContext`]**: explicit session scope owning the public and
//!   private API clients, the query cache and the notifier. Built at
//!   sign-in, cleared with [`end_session()`](DashboardContext::end_session).
//!   [`for_request()`](DashboardContext::for_request) gives a copy with an
//!   empty cache for one-shot work.
//!
//! - **[`QueryCache`]**: entries addressed by [`QueryKey`] (`DashMap` +
//!   `tokio::sync::watch`), with staleness, retry of transient failures,
//!   in-flight de-duplication and prefix invalidation.
//!   [`QueryObserver`] is the subscription handle with `state()` /
//!   `changed()` / `refetch()` / `into_stream()`.
//!
//! - **[`Mutation`]**: `idle → pending → success | error` state machine that
//!   invalidates related prefixes and posts a [`Notification`] on completion.
//!
//! - **Hooks** ([`hooks`]): analytics, reviews, team, invoices,
//!   subscriptions and users, each declaring its keys and endpoints.
//!
//! - **Domain model** ([`model`]): wire types plus [`ListParams`] filters.

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod hooks;
pub mod model;
pub mod mutation;
pub mod notify;

// ── Primary re-exports ──────────────────────────────────────────────
pub use cache::{QueryCache, QueryKey, QueryObserver, QueryOptions, QueryState, QueryStream};
pub use config::DashboardConfig;
pub use context::DashboardContext;
pub use error::CoreError;
pub use hooks::{
    AnalyticsHooks, InvoiceHooks, ReviewHooks, SubscriptionHooks, TeamHooks, UserHooks,
};
pub use mutation::{Mutation, MutationStatus};
pub use notify::{ChannelNotifier, Notification, NotificationLevel, Notifier, TracingNotifier};

pub use model::{
    Ack, AdminUser, AnalyticsOverview, BookingStats, CancelSubscription, CompleteInvite,
    Invoice, InvoiceStatus, InviteMember, ListParams, MemberStatus, Page, PageMeta,
    RevenuePoint, Review, ReviewStatus, SubscriptionPlan, SubscriptionStatus, TeamMember,
    UpdateMemberRole, UpdateReviewStatus, UpdateUserStatus, UserGrowthPoint, UserStatus,
    UserSubscription,
};

// Session and error types front ends need alongside the context.
pub use nurtura_api::{
    ErrorKind, MemorySessionStore, NormalizedError, RealtimeConnection, RealtimeMessage, Role,
    Session, SessionProvider, SessionStatus, SessionUser,
};
