//! [`Command`] definition.

pub mod assign_claim;
pub mod authorize_user_session;
pub mod cancel_commission;
pub mod convert_referral;
pub mod create_admin;
pub mod create_affiliate;
pub mod create_claim;
pub mod create_earning;
pub mod create_firm;
pub mod create_user;
pub mod create_user_session;
pub mod delete_claim;
pub mod delete_earning;
pub mod mark_notification_read;
pub mod pay_commissions;
pub mod process_commission;
pub mod request_firm_connection;
pub mod review_firm_connection;
pub mod send_notification;
pub mod track_referral;
pub mod unassign_claim;
pub mod update_claim;
pub mod update_earning_status;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    assign_claim::AssignClaim, authorize_user_session::AuthorizeUserSession,
    cancel_commission::CancelCommission, convert_referral::ConvertReferral,
    create_admin::CreateAdmin, create_affiliate::CreateAffiliate,
    create_claim::CreateClaim, create_earning::CreateEarning,
    create_firm::CreateFirm, create_user::CreateUser,
    create_user_session::CreateUserSession, delete_claim::DeleteClaim,
    delete_earning::DeleteEarning,
    mark_notification_read::MarkNotificationRead,
    pay_commissions::PayCommissions, process_commission::ProcessCommission,
    request_firm_connection::RequestFirmConnection,
    review_firm_connection::ReviewFirmConnection,
    send_notification::SendNotification, track_referral::TrackReferral,
    unassign_claim::UnassignClaim, update_claim::UpdateClaim,
    update_earning_status::UpdateEarningStatus,
};

#[cfg(test)]
mod spec {
    use common::Money;
    use secrecy::SecretBox;

    use crate::{
        domain::{
            affiliate::{self, commission, Partner},
            claim, earning, firm, notification,
            user::{self, Role},
            Actor, Claim, Decision, Earning, Firm, Notification, User,
        },
        infra::Memory,
        query,
        read, Command as _, Config, Service,
    };

    use super::{
        assign_claim, create_earning, delete_claim, pay_commissions,
        unassign_claim, update_claim, update_earning_status, AssignClaim,
        CancelCommission, ConvertReferral, CreateAdmin, CreateAffiliate,
        CreateClaim, CreateEarning, CreateFirm, CreateUser, DeleteClaim,
        DeleteEarning, PayCommissions, ProcessCommission,
        RequestFirmConnection, ReviewFirmConnection, TrackReferral,
        UnassignClaim, UpdateClaim, UpdateEarningStatus,
    };

    type Svc = Service<Memory>;

    fn money(amount: &str) -> Money {
        amount.parse().unwrap()
    }

    fn password() -> SecretBox<user::Password> {
        SecretBox::new(Box::new(user::Password::new("password1").unwrap()))
    }

    fn service() -> Svc {
        Service::new(Config::with_secret(b"secret"), Memory::new())
    }

    async fn admin(svc: &Svc) -> User {
        svc.execute(CreateAdmin {
            name: user::Name::new("Root").unwrap(),
            email: user::Email::new("root@example.com").unwrap(),
            password: password(),
        })
        .await
        .unwrap()
        .unwrap()
    }

    async fn register(
        svc: &Svc,
        email: &str,
        role: Role,
        firm_id: Option<firm::Id>,
    ) -> User {
        svc.execute(CreateUser {
            name: user::Name::new("Someone").unwrap(),
            email: user::Email::new(email).unwrap(),
            password: password(),
            role,
            firm_id,
        })
        .await
        .unwrap()
    }

    async fn firm(svc: &Svc, admin: &User) -> Firm {
        svc.execute(CreateFirm {
            name: firm::Name::new("Acme Insurance").unwrap(),
            initiator_id: admin.id,
        })
        .await
        .unwrap()
    }

    async fn claim(
        svc: &Svc,
        initiator: &User,
        firm: &Firm,
        fee: Option<&str>,
    ) -> Claim {
        svc.execute(CreateClaim {
            firm_id: firm.id,
            kind: claim::Kind::WaterDamage,
            priority: claim::Priority::High,
            title: claim::Title::new("Flooded basement").unwrap(),
            description: None,
            estimated_value: Some(money("12000")),
            adjuster_fee: fee.map(money),
            address: claim::Address::default(),
            incident_at: None,
            reported_at: None,
            deadline: None,
            initiator_id: initiator.id,
        })
        .await
        .unwrap()
    }

    fn assign(claim: &Claim, initiator: &User) -> AssignClaim {
        AssignClaim {
            claim_id: claim.id,
            adjuster_id: None,
            initiator_id: initiator.id,
        }
    }

    async fn stored(svc: &Svc, id: claim::Id, viewer: &User) -> Option<Claim> {
        svc.execute(query::claim::ById {
            claim_id: id,
            viewer: Actor::from(viewer),
        })
        .await
        .unwrap()
    }

    async fn earnings(svc: &Svc, user: &User) -> Vec<Earning> {
        svc.execute(query::earnings::List::by(read::earning::Filter {
            user_id: user.id,
            status: None,
        }))
        .await
        .unwrap()
    }

    async fn notifications(svc: &Svc, user: &User) -> Vec<Notification> {
        svc.execute(query::notifications::List::by(
            read::notification::Filter {
                user_id: user.id,
                unread_only: false,
            },
        ))
        .await
        .unwrap()
    }

    async fn partner(svc: &Svc, id: affiliate::Id, admin: &User) -> Partner {
        svc.execute(query::affiliate::ById {
            affiliate_id: id,
            viewer: Actor::from(admin),
        })
        .await
        .unwrap()
        .unwrap()
        .partner
    }

    /// Creates a [`Partner`] with a `0.20` rate and a converted referral
    /// worth `100`, returning the accrued commission.
    async fn converted(
        svc: &Svc,
        admin: &User,
        code: &str,
        email: &str,
    ) -> (Partner, commission::Commission) {
        let partner = svc
            .execute(CreateAffiliate {
                name: affiliate::Name::new("Best Partner").unwrap(),
                code: affiliate::Code::new(code).unwrap(),
                commission_rate: "0.20".parse().unwrap(),
                initiator_id: admin.id,
            })
            .await
            .unwrap();
        let referred = register(svc, email, Role::Adjuster, None).await;
        let referral = svc
            .execute(TrackReferral {
                code: partner.code.clone(),
                referred_user_id: referred.id,
            })
            .await
            .unwrap();
        let out = svc
            .execute(ConvertReferral {
                referral_id: referral.id,
                subscription_amount: money("100"),
                initiator_id: admin.id,
            })
            .await
            .unwrap();
        (partner, out.commission)
    }

    #[tokio::test]
    async fn self_assignment_records_pending_fee() {
        let svc = service();
        let root = admin(&svc).await;
        let acme = firm(&svc, &root).await;
        let adjuster =
            register(&svc, "a@example.com", Role::Adjuster, None).await;
        let c = claim(&svc, &root, &acme, Some("500")).await;
        assert_eq!(c.status, claim::Status::Available);

        let assigned = svc.execute(assign(&c, &adjuster)).await.unwrap();

        assert_eq!(assigned.status, claim::Status::Assigned);
        assert_eq!(assigned.adjuster_id, Some(adjuster.id));
        let stored = stored(&svc, c.id, &root).await.unwrap();
        assert_eq!(stored.status, claim::Status::Assigned);
        assert_eq!(stored.adjuster_id, Some(adjuster.id));

        let earnings = earnings(&svc, &adjuster).await;
        assert_eq!(earnings.len(), 1);
        assert_eq!(earnings[0].amount, money("500"));
        assert_eq!(earnings[0].status, earning::Status::Pending);
        assert_eq!(earnings[0].claim_id, Some(c.id));
        assert_eq!(earnings[0].kind, earning::Kind::claim_fee());

        let notes = notifications(&svc, &adjuster).await;
        assert!(notes
            .iter()
            .any(|n| n.kind == notification::Kind::ClaimAssigned));
    }

    #[tokio::test]
    async fn unassignment_reverses_pending_fee() {
        let svc = service();
        let root = admin(&svc).await;
        let acme = firm(&svc, &root).await;
        let adjuster =
            register(&svc, "a@example.com", Role::Adjuster, None).await;
        let c = claim(&svc, &root, &acme, Some("500")).await;
        drop(svc.execute(assign(&c, &adjuster)).await.unwrap());

        let unassigned = svc
            .execute(UnassignClaim {
                claim_id: c.id,
                initiator_id: adjuster.id,
            })
            .await
            .unwrap();

        assert_eq!(unassigned.status, claim::Status::Available);
        assert_eq!(unassigned.adjuster_id, None);
        assert!(earnings(&svc, &adjuster).await.is_empty());
        let notes = notifications(&svc, &adjuster).await;
        assert!(notes
            .iter()
            .any(|n| n.kind == notification::Kind::ClaimUnassigned));
    }

    #[tokio::test]
    async fn refuses_assigning_assigned_claim() {
        let svc = service();
        let root = admin(&svc).await;
        let acme = firm(&svc, &root).await;
        let first = register(&svc, "a@example.com", Role::Adjuster, None).await;
        let second =
            register(&svc, "b@example.com", Role::Adjuster, None).await;
        let c = claim(&svc, &root, &acme, Some("500")).await;
        drop(svc.execute(assign(&c, &first)).await.unwrap());

        let err = svc.execute(assign(&c, &second)).await.unwrap_err();

        assert!(matches!(
            err.as_ref(),
            assign_claim::ExecutionError::Transition(
                claim::TransitionError::NotAvailable,
            ),
        ));
        let stored = stored(&svc, c.id, &root).await.unwrap();
        assert_eq!(stored.adjuster_id, Some(first.id));
        assert_eq!(earnings(&svc, &first).await.len(), 1);
        assert!(earnings(&svc, &second).await.is_empty());
    }

    #[tokio::test]
    async fn hides_available_claims_of_foreign_firms() {
        let svc = service();
        let root = admin(&svc).await;
        let acme = firm(&svc, &root).await;
        let other = firm(&svc, &root).await;
        let boss =
            register(&svc, "boss@example.com", Role::FirmAdmin, Some(other.id))
                .await;
        let adjuster =
            register(&svc, "a@example.com", Role::Adjuster, None).await;
        let c = claim(&svc, &root, &acme, None).await;
        let cmd = AssignClaim {
            claim_id: c.id,
            adjuster_id: Some(adjuster.id),
            initiator_id: boss.id,
        };

        let err = svc.execute(cmd).await.unwrap_err();
        assert!(matches!(
            err.as_ref(),
            assign_claim::ExecutionError::ClaimNotExists(_),
        ));

        drop(svc.execute(assign(&c, &adjuster)).await.unwrap());

        let err = svc.execute(cmd).await.unwrap_err();
        assert!(matches!(
            err.as_ref(),
            assign_claim::ExecutionError::Transition(
                claim::TransitionError::NotAvailable,
            ),
        ));
    }

    #[tokio::test]
    async fn only_one_of_concurrent_assignments_wins() {
        let svc = service();
        let root = admin(&svc).await;
        let acme = firm(&svc, &root).await;
        let first = register(&svc, "a@example.com", Role::Adjuster, None).await;
        let second =
            register(&svc, "b@example.com", Role::Adjuster, None).await;
        let c = claim(&svc, &root, &acme, Some("500")).await;

        let (a, b) = tokio::join!(
            svc.execute(assign(&c, &first)),
            svc.execute(assign(&c, &second)),
        );

        assert_eq!(usize::from(a.is_ok()) + usize::from(b.is_ok()), 1);
        let err = a.err().or(b.err()).unwrap();
        assert!(matches!(
            err.as_ref(),
            assign_claim::ExecutionError::Transition(
                claim::TransitionError::NotAvailable,
            ),
        ));
        let fees = earnings(&svc, &first).await.len()
            + earnings(&svc, &second).await.len();
        assert_eq!(fees, 1);
    }

    #[tokio::test]
    async fn unassigns_only_once() {
        let svc = service();
        let root = admin(&svc).await;
        let acme = firm(&svc, &root).await;
        let adjuster =
            register(&svc, "a@example.com", Role::Adjuster, None).await;
        let c = claim(&svc, &root, &acme, Some("500")).await;
        drop(svc.execute(assign(&c, &adjuster)).await.unwrap());
        let unassign = UnassignClaim {
            claim_id: c.id,
            initiator_id: root.id,
        };

        drop(svc.execute(unassign).await.unwrap());
        let err = svc.execute(unassign).await.unwrap_err();

        assert!(matches!(
            err.as_ref(),
            unassign_claim::ExecutionError::Transition(
                claim::TransitionError::NotAssigned,
            ),
        ));
        let stored = stored(&svc, c.id, &root).await.unwrap();
        assert_eq!(stored.status, claim::Status::Available);
        assert!(earnings(&svc, &adjuster).await.is_empty());
        let unassigned = notifications(&svc, &adjuster)
            .await
            .into_iter()
            .filter(|n| n.kind == notification::Kind::ClaimUnassigned)
            .count();
        assert_eq!(unassigned, 1);
    }

    #[tokio::test]
    async fn assignee_unassigns_only_once() {
        let svc = service();
        let root = admin(&svc).await;
        let acme = firm(&svc, &root).await;
        let adjuster =
            register(&svc, "a@example.com", Role::Adjuster, None).await;
        let c = claim(&svc, &root, &acme, Some("500")).await;
        drop(svc.execute(assign(&c, &adjuster)).await.unwrap());
        let unassign = UnassignClaim {
            claim_id: c.id,
            initiator_id: adjuster.id,
        };

        drop(svc.execute(unassign).await.unwrap());
        let err = svc.execute(unassign).await.unwrap_err();

        assert!(matches!(
            err.as_ref(),
            unassign_claim::ExecutionError::Transition(
                claim::TransitionError::NotAssigned,
            ),
        ));
        assert!(earnings(&svc, &adjuster).await.is_empty());
    }

    #[tokio::test]
    async fn firm_admin_assigns_only_connected_adjusters() {
        let svc = service();
        let root = admin(&svc).await;
        let acme = firm(&svc, &root).await;
        let boss =
            register(&svc, "boss@example.com", Role::FirmAdmin, Some(acme.id))
                .await;
        let adjuster =
            register(&svc, "a@example.com", Role::Adjuster, None).await;
        let c = claim(&svc, &boss, &acme, None).await;
        let cmd = AssignClaim {
            claim_id: c.id,
            adjuster_id: Some(adjuster.id),
            initiator_id: boss.id,
        };

        let err = svc.execute(cmd).await.unwrap_err();
        assert!(matches!(
            err.as_ref(),
            assign_claim::ExecutionError::NotConnected(_),
        ));

        let conn = svc
            .execute(RequestFirmConnection {
                firm_id: acme.id,
                message: None,
                initiator_id: adjuster.id,
            })
            .await
            .unwrap();
        let conn = svc
            .execute(ReviewFirmConnection {
                connection_id: conn.id,
                decision: Decision::Approve,
                initiator_id: boss.id,
            })
            .await
            .unwrap();
        assert!(conn.is_approved());

        let assigned = svc.execute(cmd).await.unwrap();
        assert_eq!(assigned.adjuster_id, Some(adjuster.id));
        assert!(earnings(&svc, &adjuster).await.is_empty());

        let kinds = notifications(&svc, &adjuster)
            .await
            .into_iter()
            .map(|n| n.kind)
            .collect::<Vec<_>>();
        assert!(kinds.contains(&notification::Kind::FirmConnection));
        assert!(kinds.contains(&notification::Kind::ClaimAssigned));
    }

    #[tokio::test]
    async fn rejects_assigning_to_non_adjuster() {
        let svc = service();
        let root = admin(&svc).await;
        let acme = firm(&svc, &root).await;
        let boss =
            register(&svc, "boss@example.com", Role::FirmAdmin, Some(acme.id))
                .await;
        let c = claim(&svc, &root, &acme, None).await;

        let err = svc
            .execute(AssignClaim {
                claim_id: c.id,
                adjuster_id: Some(boss.id),
                initiator_id: root.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            assign_claim::ExecutionError::InvalidAdjuster(_),
        ));
    }

    #[tokio::test]
    async fn moves_claim_through_lifecycle() {
        let svc = service();
        let root = admin(&svc).await;
        let acme = firm(&svc, &root).await;
        let adjuster =
            register(&svc, "a@example.com", Role::Adjuster, None).await;
        let c = claim(&svc, &root, &acme, Some("300")).await;
        drop(svc.execute(assign(&c, &adjuster)).await.unwrap());
        let update = |status| UpdateClaim {
            claim_id: c.id,
            status: Some(status),
            initiator_id: adjuster.id,
            ..UpdateClaim::default()
        };

        let err = svc
            .execute(update(claim::Status::Assigned))
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            update_claim::ExecutionError::Transition(
                claim::TransitionError::AssignmentRequired,
            ),
        ));

        let started = svc
            .execute(update(claim::Status::InProgress))
            .await
            .unwrap();
        assert_eq!(started.status, claim::Status::InProgress);
        assert!(started.completed_at.is_none());

        let completed = svc
            .execute(UpdateClaim {
                final_value: Some(money("9500")),
                ..update(claim::Status::Completed)
            })
            .await
            .unwrap();
        assert_eq!(completed.status, claim::Status::Completed);
        assert_eq!(completed.adjuster_id, Some(adjuster.id));
        assert!(completed.completed_at.is_some());
        assert_eq!(completed.final_value, Some(money("9500")));

        // Fee stays owed once the work is done.
        assert_eq!(earnings(&svc, &adjuster).await.len(), 1);

        let err = svc
            .execute(update(claim::Status::Cancelled))
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            update_claim::ExecutionError::Transition(
                claim::TransitionError::Illegal { .. },
            ),
        ));
        let notes = notifications(&svc, &adjuster)
            .await
            .into_iter()
            .filter(|n| n.kind == notification::Kind::ClaimStatusChanged)
            .count();
        assert_eq!(notes, 2);
    }

    #[tokio::test]
    async fn cancellation_reverses_pending_fee() {
        let svc = service();
        let root = admin(&svc).await;
        let acme = firm(&svc, &root).await;
        let adjuster =
            register(&svc, "a@example.com", Role::Adjuster, None).await;
        let c = claim(&svc, &root, &acme, Some("300")).await;
        drop(svc.execute(assign(&c, &adjuster)).await.unwrap());

        let cancelled = svc
            .execute(UpdateClaim {
                claim_id: c.id,
                status: Some(claim::Status::Cancelled),
                initiator_id: root.id,
                ..UpdateClaim::default()
            })
            .await
            .unwrap();

        assert_eq!(cancelled.status, claim::Status::Cancelled);
        assert_eq!(cancelled.adjuster_id, None);
        assert!(earnings(&svc, &adjuster).await.is_empty());
    }

    #[tokio::test]
    async fn hides_foreign_claims_from_adjusters() {
        let svc = service();
        let root = admin(&svc).await;
        let acme = firm(&svc, &root).await;
        let first = register(&svc, "a@example.com", Role::Adjuster, None).await;
        let second =
            register(&svc, "b@example.com", Role::Adjuster, None).await;
        let taken = claim(&svc, &root, &acme, None).await;
        let open = claim(&svc, &root, &acme, None).await;
        drop(svc.execute(assign(&taken, &first)).await.unwrap());

        assert!(stored(&svc, taken.id, &second).await.is_none());
        assert!(stored(&svc, taken.id, &first).await.is_some());

        let page = svc
            .execute(query::claims::List {
                arguments: read::claim::list::Arguments::new(None, None, 10)
                    .unwrap(),
                filter: read::claim::list::Filter::default(),
                viewer: Actor::from(&second),
            })
            .await
            .unwrap();
        let ids = page.edges.iter().map(|e| e.node.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![open.id]);

        let page = svc
            .execute(query::claims::List {
                arguments: read::claim::list::Arguments::new(Some(1), None, 10)
                    .unwrap(),
                filter: read::claim::list::Filter::default(),
                viewer: Actor::from(&root),
            })
            .await
            .unwrap();
        assert!(page.has_next_page);
        assert_eq!(page.edges[0].node.id, open.id);
    }

    #[tokio::test]
    async fn deletion_keeps_settled_earnings() {
        let svc = service();
        let root = admin(&svc).await;
        let acme = firm(&svc, &root).await;
        let adjuster =
            register(&svc, "a@example.com", Role::Adjuster, None).await;
        let c = claim(&svc, &root, &acme, Some("300")).await;
        drop(svc.execute(assign(&c, &adjuster)).await.unwrap());
        let bonus = svc
            .execute(CreateEarning {
                amount: money("50"),
                kind: earning::Kind::new("BONUS").unwrap(),
                earned_at: None,
                claim_id: Some(c.id),
                description: None,
                initiator_id: adjuster.id,
            })
            .await
            .unwrap();
        drop(
            svc.execute(UpdateEarningStatus {
                earning_id: bonus.id,
                status: earning::Status::Paid,
                initiator_id: adjuster.id,
            })
            .await
            .unwrap(),
        );

        drop(
            svc.execute(DeleteClaim {
                claim_id: c.id,
                initiator_id: root.id,
            })
            .await
            .unwrap(),
        );

        assert!(stored(&svc, c.id, &root).await.is_none());
        let left = earnings(&svc, &adjuster).await;
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id, bonus.id);
        assert_eq!(left[0].claim_id, None);
    }

    #[tokio::test]
    async fn refuses_deleting_claim_in_progress() {
        let svc = service();
        let root = admin(&svc).await;
        let acme = firm(&svc, &root).await;
        let adjuster =
            register(&svc, "a@example.com", Role::Adjuster, None).await;
        let c = claim(&svc, &root, &acme, None).await;
        drop(svc.execute(assign(&c, &adjuster)).await.unwrap());
        drop(
            svc.execute(UpdateClaim {
                claim_id: c.id,
                status: Some(claim::Status::InProgress),
                initiator_id: adjuster.id,
                ..UpdateClaim::default()
            })
            .await
            .unwrap(),
        );

        let err = svc
            .execute(DeleteClaim {
                claim_id: c.id,
                initiator_id: root.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            delete_claim::ExecutionError::ActiveOrCompleted(_),
        ));
        assert!(stored(&svc, c.id, &root).await.is_some());
    }

    #[tokio::test]
    async fn guards_earnings_ledger() {
        let svc = service();
        let root = admin(&svc).await;
        let acme = firm(&svc, &root).await;
        let owner = register(&svc, "a@example.com", Role::Adjuster, None).await;
        let other = register(&svc, "b@example.com", Role::Adjuster, None).await;
        let foreign = claim(&svc, &root, &acme, None).await;

        let err = svc
            .execute(CreateEarning {
                amount: money("10"),
                kind: earning::Kind::claim_fee(),
                earned_at: None,
                claim_id: Some(foreign.id),
                description: None,
                initiator_id: owner.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            create_earning::ExecutionError::ClaimNotExists(_),
        ));

        let e = svc
            .execute(CreateEarning {
                amount: money("10"),
                kind: earning::Kind::new("TRAVEL").unwrap(),
                earned_at: None,
                claim_id: None,
                description: None,
                initiator_id: owner.id,
            })
            .await
            .unwrap();
        let set = |status, initiator: &User| UpdateEarningStatus {
            earning_id: e.id,
            status,
            initiator_id: initiator.id,
        };

        let err = svc
            .execute(set(earning::Status::Paid, &other))
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            update_earning_status::ExecutionError::EarningNotExists(_),
        ));

        let paid = svc
            .execute(set(earning::Status::Paid, &owner))
            .await
            .unwrap();
        assert!(paid.paid_at.is_some());

        let err = svc
            .execute(set(earning::Status::Pending, &owner))
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            update_earning_status::ExecutionError::AlreadyPaid(_),
        ));

        let err = svc
            .execute(DeleteEarning {
                earning_id: e.id,
                initiator_id: owner.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            super::delete_earning::ExecutionError::AlreadyPaid(_),
        ));

        let summary = svc
            .execute(query::earnings::Summary { user_id: owner.id })
            .await
            .unwrap();
        assert_eq!(summary.total.count, 1);
        assert_eq!(summary.of_status(earning::Status::Paid).amount, money("10"));
    }

    #[tokio::test]
    async fn conversion_accrues_commission() {
        let svc = service();
        let root = admin(&svc).await;

        let (p, commission) =
            converted(&svc, &root, "PARTNER1", "r@example.com").await;

        assert_eq!(commission.amount, money("20"));
        assert_eq!(commission.status, commission::Status::Pending);
        let details = svc
            .execute(query::affiliate::ById {
                affiliate_id: p.id,
                viewer: Actor::from(&root),
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(details.partner.total_earnings, money("20"));
        assert_eq!(details.partner.total_referrals, 1);
        assert_eq!(details.commissions.len(), 1);
    }

    #[tokio::test]
    async fn tracks_referral_once() {
        let svc = service();
        let root = admin(&svc).await;
        let (p, _) = converted(&svc, &root, "PARTNER1", "r@example.com").await;
        let referred = register(&svc, "n@example.com", Role::Adjuster, None)
            .await;
        let track = || TrackReferral {
            code: p.code.clone(),
            referred_user_id: referred.id,
        };

        drop(svc.execute(track()).await.unwrap());
        let err = svc.execute(track()).await.unwrap_err();

        assert!(matches!(
            err.as_ref(),
            super::track_referral::ExecutionError::AlreadyTracked(_),
        ));
        assert_eq!(partner(&svc, p.id, &root).await.total_referrals, 2);
    }

    #[tokio::test]
    async fn cancelling_approved_commission_debits_partner() {
        let svc = service();
        let root = admin(&svc).await;
        let (p, c) = converted(&svc, &root, "PARTNER1", "r@example.com").await;

        let approved = svc
            .execute(ProcessCommission {
                commission_id: c.id,
                decision: Decision::Approve,
                initiator_id: root.id,
            })
            .await
            .unwrap();
        assert_eq!(approved.status, commission::Status::Approved);
        assert_eq!(partner(&svc, p.id, &root).await.total_earnings, c.amount);

        let cancelled = svc
            .execute(CancelCommission {
                commission_id: c.id,
                initiator_id: root.id,
            })
            .await
            .unwrap();

        assert_eq!(cancelled.status, commission::Status::Cancelled);
        assert_eq!(partner(&svc, p.id, &root).await.total_earnings, Money::ZERO);
    }

    #[tokio::test]
    async fn cancelling_pending_commission_keeps_totals() {
        let svc = service();
        let root = admin(&svc).await;
        let (p, c) = converted(&svc, &root, "PARTNER1", "r@example.com").await;

        drop(
            svc.execute(CancelCommission {
                commission_id: c.id,
                initiator_id: root.id,
            })
            .await
            .unwrap(),
        );

        assert_eq!(partner(&svc, p.id, &root).await.total_earnings, c.amount);
        let err = svc
            .execute(CancelCommission {
                commission_id: c.id,
                initiator_id: root.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            super::cancel_commission::ExecutionError::Transition(
                commission::TransitionError::Cancelled(_),
            ),
        ));
    }

    #[tokio::test]
    async fn pays_commissions_all_or_nothing() {
        let svc = service();
        let root = admin(&svc).await;
        let (p, first) =
            converted(&svc, &root, "PARTNER1", "r1@example.com").await;
        let referred = register(&svc, "r2@example.com", Role::Adjuster, None)
            .await;
        let referral = svc
            .execute(TrackReferral {
                code: p.code.clone(),
                referred_user_id: referred.id,
            })
            .await
            .unwrap();
        let second = svc
            .execute(ConvertReferral {
                referral_id: referral.id,
                subscription_amount: money("50"),
                initiator_id: root.id,
            })
            .await
            .unwrap()
            .commission;
        let pay = |ids| PayCommissions {
            commission_ids: ids,
            method: commission::PaymentMethod::BankTransfer,
            reference: None,
            initiator_id: root.id,
        };

        let paid = svc.execute(pay(vec![second.id])).await.unwrap();
        assert_eq!(paid.len(), 1);
        assert_eq!(paid[0].status, commission::Status::Paid);
        assert!(paid[0].paid_at.is_some());

        let err = svc
            .execute(pay(vec![first.id, second.id, first.id]))
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            pay_commissions::ExecutionError::NotPayable,
        ));

        let details = svc
            .execute(query::affiliate::ById {
                affiliate_id: p.id,
                viewer: Actor::from(&root),
            })
            .await
            .unwrap()
            .unwrap();
        let status_of = |id| {
            details
                .commissions
                .iter()
                .find(|c| c.id == id)
                .map(|c| c.status)
        };
        assert_eq!(status_of(first.id), Some(commission::Status::Pending));
        assert_eq!(status_of(second.id), Some(commission::Status::Paid));

        let err = svc
            .execute(ProcessCommission {
                commission_id: second.id,
                decision: Decision::Reject,
                initiator_id: root.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            super::process_commission::ExecutionError::Transition(
                commission::TransitionError::NotPending(_),
            ),
        ));
    }

    #[tokio::test]
    async fn only_admins_manage_affiliates() {
        let svc = service();
        let adjuster =
            register(&svc, "a@example.com", Role::Adjuster, None).await;

        let err = svc
            .execute(CreateAffiliate {
                name: affiliate::Name::new("Sneaky").unwrap(),
                code: affiliate::Code::new("SNEAKY").unwrap(),
                commission_rate: "0.5".parse().unwrap(),
                initiator_id: adjuster.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            super::create_affiliate::ExecutionError::Forbidden(_),
        ));
    }
}
