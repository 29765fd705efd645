// ── Domain model ──
//
// Wire types for the dashboard resources. Fields the dashboard does not
// use land in `extra` so nothing the backend sends is lost on a round trip.

mod ack;
mod analytics;
mod invoice;
mod page;
mod params;
mod review;
mod subscription;
mod team;
mod user;

pub use ack::Ack;
pub use analytics::{AnalyticsOverview, BookingStats, RevenuePoint, UserGrowthPoint};
pub use invoice::{Invoice, InvoiceStatus};
pub use page::{Page, PageMeta};
pub use params::ListParams;
pub use review::{Review, ReviewStatus, UpdateReviewStatus};
pub use subscription::{CancelSubscription, SubscriptionPlan, SubscriptionStatus, UserSubscription};
pub use team::{CompleteInvite, InviteMember, MemberStatus, TeamMember, UpdateMemberRole};
pub use user::{AdminUser, UpdateUserStatus, UserStatus};
