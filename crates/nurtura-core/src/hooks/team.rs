// ── Team management hooks ──
//
// Staff accounts and invitations. Invite completion is the one call made
// through the public client: the invitee has no session yet.

use std::sync::Arc;

use nurtura_api::{Method, NormalizedError, Role};

use crate::cache::{QueryKey, QueryObserver};
use crate::context::{DashboardContext, send};
use crate::model::{
    Ack, CompleteInvite, InviteMember, ListParams, Page, TeamMember, UpdateMemberRole,
};
use crate::mutation::Mutation;

pub const NAMESPACE: &str = "admin-team";

pub mod keys {
    use super::{ListParams, NAMESPACE, QueryKey};

    pub fn all() -> QueryKey {
        QueryKey::new(NAMESPACE)
    }

    pub fn list(params: &ListParams) -> QueryKey {
        all().with("list").with_params(params)
    }
}

pub struct TeamHooks {
    ctx: DashboardContext,
}

impl TeamHooks {
    pub(crate) fn new(ctx: DashboardContext) -> Self {
        Self { ctx }
    }

    pub async fn list(&self, params: &ListParams) -> Result<Arc<Page<TeamMember>>, NormalizedError> {
        self.ctx
            .cached(
                keys::list(params),
                "/admin/team".into(),
                params.to_query(),
                "Failed to load team members",
            )
            .await
    }

    pub fn watch_list(&self, params: &ListParams) -> QueryObserver<Page<TeamMember>> {
        self.ctx.observe(
            keys::list(params),
            "/admin/team".into(),
            params.to_query(),
            "Failed to load team members",
        )
    }

    /// `POST /admin/team/invite`
    pub fn invite(&self) -> Mutation<InviteMember, Ack> {
        let client = self.ctx.private_client().clone();
        self.ctx
            .guarded_mutation(
                "invite_member",
                Role::can_manage_team,
                "manage the team",
                move |input: InviteMember| {
                    let client = client.clone();
                    async move {
                        send(&client, Method::POST, "/admin/team/invite", Some(&input), "Failed to send invitation")
                            .await
                    }
                },
            )
            .invalidates(keys::all())
            .success_message("Invitation sent")
    }

    /// `PATCH /admin/team/{id}`
    pub fn update_role(&self) -> Mutation<UpdateMemberRole, Ack> {
        let client = self.ctx.private_client().clone();
        self.ctx
            .guarded_mutation(
                "update_member_role",
                Role::can_manage_team,
                "manage the team",
                move |input: UpdateMemberRole| {
                    let client = client.clone();
                    async move {
                        let path = format!("/admin/team/{}", input.id);
                        send(&client, Method::PATCH, &path, Some(&input), "Failed to update member").await
                    }
                },
            )
            .invalidates(keys::all())
            .success_message("Member updated")
    }

    /// `DELETE /admin/team/{id}`
    pub fn remove(&self) -> Mutation<String, Ack> {
        let client = self.ctx.private_client().clone();
        self.ctx
            .guarded_mutation(
                "remove_member",
                Role::can_manage_team,
                "manage the team",
                move |id: String| {
                    let client = client.clone();
                    async move {
                        let path = format!("/admin/team/{id}");
                        send::<()>(&client, Method::DELETE, &path, None, "Failed to remove member").await
                    }
                },
            )
            .invalidates(keys::all())
            .success_message("Member removed")
    }

    /// `POST /admin/team/{id}/resend`
    pub fn resend_invite(&self) -> Mutation<String, Ack> {
        let client = self.ctx.private_client().clone();
        self.ctx
            .guarded_mutation(
                "resend_invite",
                Role::can_manage_team,
                "manage the team",
                move |id: String| {
                    let client = client.clone();
                    async move {
                        let path = format!("/admin/team/{id}/resend");
                        send::<()>(&client, Method::POST, &path, None, "Failed to resend invitation").await
                    }
                },
            )
            .invalidates(keys::all())
            .success_message("Invitation resent")
    }

    /// `POST /admin/team/invite/complete` on the public client. Invalidates
    /// nothing: the invitee has no cache worth refreshing.
    pub fn complete_invite(&self) -> Mutation<CompleteInvite, Ack> {
        let client = self.ctx.public_client().clone();
        self.ctx
            .mutation("complete_invite", move |input: CompleteInvite| {
                let client = client.clone();
                async move {
                    send(
                        &client,
                        Method::POST,
                        "/admin/team/invite/complete",
                        Some(&input),
                        "Failed to accept invitation",
                    )
                    .await
                }
            })
            .success_message("Invitation accepted")
    }
}
