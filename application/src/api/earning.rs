//! `Earning`-related definitions.

use std::collections::BTreeMap;

use axum::Extension;
use common::{DateTime, Money};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use service::{
    command::{self, Command as _},
    domain::{self, claim, earning, user},
    query, read, Query as _,
};

use crate::{
    api::{Json, Path, PrivilegeError, Query},
    define_error, AsError, Error, Service, Session,
};

/// An entry in the earnings ledger of a `User`.
#[derive(Debug, Serialize)]
pub struct Earning {
    /// Unique identifier of this `Earning`.
    pub id: earning::Id,

    /// ID of the `User` owning this `Earning`.
    pub user_id: user::Id,

    /// ID of the claim this `Earning` is recorded for.
    pub claim_id: Option<claim::Id>,

    /// Amount of this `Earning`.
    pub amount: Money,

    /// Kind of this `Earning`.
    pub kind: earning::Kind,

    /// Status of this `Earning`.
    pub status: earning::Status,

    /// Description of this `Earning`.
    pub description: Option<earning::Description>,

    /// `DateTime` when this `Earning` was earned.
    pub earned_at: DateTime,

    /// `DateTime` when this `Earning` was paid.
    pub paid_at: Option<DateTime>,

    /// `DateTime` when this `Earning` was recorded.
    pub created_at: DateTime,
}

impl From<domain::Earning> for Earning {
    fn from(e: domain::Earning) -> Self {
        Self {
            id: e.id,
            user_id: e.user_id,
            claim_id: e.claim_id,
            amount: e.amount,
            kind: e.kind,
            status: e.status,
            description: e.description,
            earned_at: e.earned_at.coerce(),
            paid_at: e.paid_at.map(|at| at.coerce()),
            created_at: e.created_at.coerce(),
        }
    }
}

/// Number and total amount of `Earning`s.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Tally {
    /// Number of `Earning`s.
    pub count: u64,

    /// Total amount of `Earning`s.
    pub amount: Money,
}

impl From<read::earning::Tally> for Tally {
    fn from(t: read::earning::Tally) -> Self {
        Self {
            count: t.count,
            amount: t.amount,
        }
    }
}

/// Summary of the earnings ledger.
#[derive(Debug, Serialize)]
pub struct Summary {
    /// `Tally` of all the `Earning`s.
    pub total: Tally,

    /// `Tally` of the `Earning`s earned this month.
    pub this_month: Tally,

    /// `Tally` of the `Earning`s per status.
    pub by_status: BTreeMap<earning::Status, Tally>,

    /// `Tally` of the `Earning`s per kind.
    pub by_kind: BTreeMap<earning::Kind, Tally>,

    /// `Tally` of the `Earning`s per `YYYY-MM` month.
    pub by_month: BTreeMap<String, Tally>,
}

impl From<read::earning::Summary> for Summary {
    fn from(s: read::earning::Summary) -> Self {
        Self {
            total: s.total.into(),
            this_month: s.this_month().into(),
            by_status: s
                .by_status
                .into_iter()
                .map(|(k, t)| (k, t.into()))
                .collect(),
            by_kind: s.by_kind.into_iter().map(|(k, t)| (k, t.into())).collect(),
            by_month: s
                .by_month
                .into_iter()
                .map(|(m, t)| (m.to_string(), t.into()))
                .collect(),
        }
    }
}

/// Parameters of an `Earning`s list request.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Status of the listed `Earning`s.
    pub status: Option<earning::Status>,
}

/// Lists `Earning`s of the authenticated `User`, most recent first.
#[tracing::instrument(
    skip_all,
    fields(user.id = %session.user.id, http.route = "GET /earnings"),
)]
pub async fn list(
    Extension(service): Extension<Service>,
    session: Session,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Earning>>, Error> {
    service
        .execute(query::earnings::List::by(read::earning::Filter {
            user_id: session.user.id,
            status: params.status,
        }))
        .await
        .map_err(AsError::into_error)
        .map(|list| Json(list.into_iter().map(Into::into).collect()))
}

/// Summarizes the earnings ledger of the authenticated `User`.
#[tracing::instrument(
    skip_all,
    fields(user.id = %session.user.id, http.route = "GET /earnings/summary"),
)]
pub async fn summary(
    Extension(service): Extension<Service>,
    session: Session,
) -> Result<Json<Summary>, Error> {
    service
        .execute(query::earnings::Summary {
            user_id: session.user.id,
        })
        .await
        .map_err(AsError::into_error)
        .map(|s| Json(s.into()))
}

/// Body of an `Earning` creation request.
#[derive(Debug, Deserialize)]
pub struct NewEarning {
    /// Amount of the `Earning`.
    pub amount: Money,

    /// Kind of the `Earning`.
    pub kind: String,

    /// `DateTime` when the `Earning` was earned, now by default.
    pub earned_at: Option<earning::EarningDateTime>,

    /// ID of the claim the `Earning` is recorded for.
    pub claim_id: Option<claim::Id>,

    /// Description of the `Earning`.
    pub description: Option<String>,
}

/// Records a new `PENDING` `Earning` of the authenticated `User`.
///
/// # Errors
///
/// Possible error codes:
/// - `VALIDATION_FAILED` - some of the provided fields are invalid;
/// - `ZERO_AMOUNT` - provided amount is zero;
/// - `CLAIM_NOT_EXISTS` - claim doesn't exist or is not assigned to the
///   authenticated `User`.
#[tracing::instrument(
    skip_all,
    fields(user.id = %session.user.id, http.route = "POST /earnings"),
)]
pub async fn create(
    Extension(service): Extension<Service>,
    session: Session,
    Json(body): Json<NewEarning>,
) -> Result<(StatusCode, Json<Earning>), Error> {
    let (kind, description) = validate! {
        kind = body.kind.parse::<earning::Kind>(),
        description = body
            .description
            .map(|d| d.parse::<earning::Description>())
            .transpose(),
    }?;

    let earning = service
        .execute(command::CreateEarning {
            amount: body.amount,
            kind,
            earned_at: body.earned_at,
            claim_id: body.claim_id,
            description,
            initiator_id: session.user.id,
        })
        .await
        .map_err(AsError::into_error)?;

    Ok((StatusCode::CREATED, Json(earning.into())))
}

/// Body of an `Earning` status update.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    /// New status of the `Earning`.
    pub status: earning::Status,
}

/// Changes status of an `Earning` of the authenticated `User`.
///
/// # Errors
///
/// Possible error codes:
/// - `EARNING_NOT_EXISTS` - `Earning` doesn't exist or is not owned;
/// - `EARNING_PAID` - paid `Earning` cannot leave the `PAID` status.
#[tracing::instrument(
    skip_all,
    fields(
        earning.id = %earning_id,
        status = %body.status,
        user.id = %session.user.id,
        http.route = "PUT /earnings/:id",
    ),
)]
pub async fn update_status(
    Extension(service): Extension<Service>,
    session: Session,
    Path(earning_id): Path<earning::Id>,
    Json(body): Json<StatusUpdate>,
) -> Result<Json<Earning>, Error> {
    service
        .execute(command::UpdateEarningStatus {
            earning_id,
            status: body.status,
            initiator_id: session.user.id,
        })
        .await
        .map_err(AsError::into_error)
        .map(|e| Json(e.into()))
}

/// Deletes an unpaid `Earning` of the authenticated `User`.
///
/// # Errors
///
/// Possible error codes:
/// - `EARNING_NOT_EXISTS` - `Earning` doesn't exist or is not owned;
/// - `EARNING_PAID` - paid `Earning`s cannot be deleted.
#[tracing::instrument(
    skip_all,
    fields(
        earning.id = %earning_id,
        user.id = %session.user.id,
        http.route = "DELETE /earnings/:id",
    ),
)]
pub async fn delete(
    Extension(service): Extension<Service>,
    session: Session,
    Path(earning_id): Path<earning::Id>,
) -> Result<Json<Earning>, Error> {
    service
        .execute(command::DeleteEarning {
            earning_id,
            initiator_id: session.user.id,
        })
        .await
        .map_err(AsError::into_error)
        .map(|e| Json(e.into()))
}

define_error! {
    enum EarningError {
        #[code = "EARNING_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Earning` with the provided ID doesn't exist"]
        NotExists,

        #[code = "EARNING_PAID"]
        #[status = CONFLICT]
        #[message = "`Earning` is paid already"]
        Paid,
    }
}

impl AsError for command::create_earning::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "CLAIM_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "Claim doesn't exist or is not assigned to the \
                             authenticated `User`"]
                ClaimNotExists,

                #[code = "ZERO_AMOUNT"]
                #[status = BAD_REQUEST]
                #[message = "`Earning` amount must be positive"]
                ZeroAmount,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::ClaimNotExists(_) => Some(Error::ClaimNotExists.into()),
            Self::Forbidden(_) => Some(PrivilegeError::Forbidden.into()),
            Self::ZeroAmount => Some(Error::ZeroAmount.into()),
            Self::UserNotExists(_) => None,
        }
    }
}

impl AsError for command::update_earning_status::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::AlreadyPaid(_) => Some(EarningError::Paid.into()),
            Self::EarningNotExists(_) => Some(EarningError::NotExists.into()),
            Self::UserNotExists(_) => None,
        }
    }
}

impl AsError for command::delete_earning::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::AlreadyPaid(_) => Some(EarningError::Paid.into()),
            Self::EarningNotExists(_) => Some(EarningError::NotExists.into()),
            Self::UserNotExists(_) => None,
        }
    }
}

#[cfg(test)]
mod spec {
    use http::StatusCode;
    use serde_json::json;

    use crate::api::spec::App;

    #[tokio::test]
    async fn keeps_ledger() {
        let app = App::new();
        let (token, user_id) =
            app.register("a@example.com", "ADJUSTER", None).await;

        let (status, bonus) = app
            .call(
                "POST",
                "/earnings",
                Some(&token),
                Some(json!({
                    "amount": "120.5",
                    "kind": "BONUS",
                    "earned_at": "2024-03-02T10:00:00Z",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{bonus}");
        assert_eq!(bonus["status"], "PENDING");
        assert_eq!(bonus["user_id"], user_id.as_str());
        assert!(bonus["paid_at"].is_null());

        let (status, body) = app
            .call(
                "POST",
                "/earnings",
                Some(&token),
                Some(json!({"amount": "0", "kind": "BONUS"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "ZERO_AMOUNT");

        let uri = format!("/earnings/{}", bonus["id"].as_str().unwrap());
        let (status, paid) = app
            .call("PUT", &uri, Some(&token), Some(json!({"status": "PAID"})))
            .await;
        assert_eq!(status, StatusCode::OK, "{paid}");
        assert!(paid["paid_at"].is_string());

        let (status, body) = app
            .call(
                "PUT",
                &uri,
                Some(&token),
                Some(json!({"status": "DISPUTED"})),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "EARNING_PAID");

        let (status, body) = app.call("DELETE", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "EARNING_PAID");

        let (status, summary) =
            app.call("GET", "/earnings/summary", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["total"]["count"], 1);
        assert_eq!(summary["total"]["amount"], "120.50");
        assert_eq!(summary["by_status"]["PAID"]["count"], 1);
        assert_eq!(summary["by_kind"]["BONUS"]["amount"], "120.50");
        assert_eq!(summary["by_month"]["2024-03"]["count"], 1);
    }

    #[tokio::test]
    async fn hides_foreign_earnings() {
        let app = App::new();
        let (owner, _) = app.register("a@example.com", "ADJUSTER", None).await;
        let (other, _) = app.register("b@example.com", "ADJUSTER", None).await;
        let (_, earning) = app
            .call(
                "POST",
                "/earnings",
                Some(&owner),
                Some(json!({"amount": 10, "kind": "BONUS"})),
            )
            .await;
        let uri = format!("/earnings/{}", earning["id"].as_str().unwrap());

        let (status, body) = app.call("DELETE", &uri, Some(&other), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "EARNING_NOT_EXISTS");

        let (_, list) =
            app.call("GET", "/earnings?status=PENDING", Some(&other), None).await;
        assert!(list.as_array().unwrap().is_empty());

        let (status, deleted) =
            app.call("DELETE", &uri, Some(&owner), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted["id"], earning["id"]);
    }
}
