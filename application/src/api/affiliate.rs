//! Affiliate `Partner`, `Referral` and `Commission` definitions.

use axum::Extension;
use common::{DateTime, Money, Rate};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use service::{
    command::{self, Command as _},
    domain::{
        affiliate::{self, commission, referral},
        user, Decision,
    },
    query, Query as _,
};

use crate::{
    api::{Json, Path, PrivilegeError, Query},
    define_error, AsError, Error, Service, Session,
};

/// An affiliate partner bringing new users.
#[derive(Debug, Serialize)]
pub struct Partner {
    /// Unique identifier of this `Partner`.
    pub id: affiliate::Id,

    /// Referral code of this `Partner`.
    pub code: affiliate::Code,

    /// Name of this `Partner`.
    pub name: affiliate::Name,

    /// Share of a subscription this `Partner` earns.
    pub commission_rate: Rate,

    /// Status of this `Partner`.
    pub status: affiliate::Status,

    /// Number of users referred by this `Partner`.
    pub total_referrals: u32,

    /// Total amount of approved and paid commissions.
    pub total_earnings: Money,

    /// `DateTime` when this `Partner` was created.
    pub created_at: DateTime,
}

impl From<affiliate::Partner> for Partner {
    fn from(p: affiliate::Partner) -> Self {
        Self {
            id: p.id,
            code: p.code,
            name: p.name,
            commission_rate: p.commission_rate,
            status: p.status,
            total_referrals: p.total_referrals,
            total_earnings: p.total_earnings,
            created_at: p.created_at.coerce(),
        }
    }
}

/// A user referred by a `Partner`.
#[derive(Debug, Serialize)]
pub struct Referral {
    /// Unique identifier of this `Referral`.
    pub id: referral::Id,

    /// ID of the referring `Partner`.
    pub affiliate_id: affiliate::Id,

    /// ID of the referred user.
    pub referred_user_id: user::Id,

    /// Status of this `Referral`.
    pub status: referral::Status,

    /// Subscription amount this `Referral` converted with.
    pub subscription_amount: Option<Money>,

    /// `DateTime` when this `Referral` converted.
    pub converted_at: Option<DateTime>,

    /// `DateTime` when this `Referral` was tracked.
    pub created_at: DateTime,
}

impl From<affiliate::Referral> for Referral {
    fn from(r: affiliate::Referral) -> Self {
        Self {
            id: r.id,
            affiliate_id: r.affiliate_id,
            referred_user_id: r.referred_user_id,
            status: r.status,
            subscription_amount: r.subscription_amount,
            converted_at: r.converted_at.map(|at| at.coerce()),
            created_at: r.created_at.coerce(),
        }
    }
}

/// Commission of a `Partner` for a converted `Referral`.
#[derive(Debug, Serialize)]
pub struct Commission {
    /// Unique identifier of this `Commission`.
    pub id: commission::Id,

    /// ID of the earning `Partner`.
    pub affiliate_id: affiliate::Id,

    /// ID of the `Referral` this `Commission` is for.
    pub referral_id: referral::Id,

    /// Amount of this `Commission`.
    pub amount: Money,

    /// Rate this `Commission` was computed with.
    pub rate: Rate,

    /// Status of this `Commission`.
    pub status: commission::Status,

    /// `DateTime` when this `Commission` was paid.
    pub paid_at: Option<DateTime>,

    /// Method this `Commission` was paid with.
    pub payment_method: Option<commission::PaymentMethod>,

    /// Reference of the payment.
    pub payment_reference: Option<commission::PaymentReference>,

    /// `DateTime` when this `Commission` was accrued.
    pub created_at: DateTime,
}

impl From<affiliate::Commission> for Commission {
    fn from(c: affiliate::Commission) -> Self {
        Self {
            id: c.id,
            affiliate_id: c.affiliate_id,
            referral_id: c.referral_id,
            amount: c.amount,
            rate: c.rate,
            status: c.status,
            paid_at: c.paid_at.map(|at| at.coerce()),
            payment_method: c.payment_method,
            payment_reference: c.payment_reference,
            created_at: c.created_at.coerce(),
        }
    }
}

/// `Partner` along with its `Commission`s.
#[derive(Debug, Serialize)]
pub struct Details {
    /// `Partner` itself.
    #[serde(flatten)]
    pub partner: Partner,

    /// `Commission`s of the `Partner`, newest first.
    pub commissions: Vec<Commission>,
}

/// Body of a `Partner` creation request.
#[derive(Debug, Deserialize)]
pub struct NewPartner {
    /// Name of the `Partner`.
    pub name: String,

    /// Referral code of the `Partner`.
    pub code: String,

    /// Share of a subscription the `Partner` earns.
    pub commission_rate: Rate,
}

/// Creates a new `ACTIVE` `Partner`.
///
/// # Errors
///
/// Possible error codes:
/// - `VALIDATION_FAILED` - some of the provided fields are invalid;
/// - `FORBIDDEN` - authenticated `User` is not an administrator;
/// - `CODE_OCCUPIED` - provided code is used by another `Partner`.
#[tracing::instrument(
    skip_all,
    fields(
        code = %body.code,
        user.id = %session.user.id,
        http.route = "POST /affiliate/partners",
    ),
)]
pub async fn create_partner(
    Extension(service): Extension<Service>,
    session: Session,
    Json(body): Json<NewPartner>,
) -> Result<(StatusCode, Json<Partner>), Error> {
    let (name, code) = validate! {
        name = body.name.parse::<affiliate::Name>(),
        code = body.code.parse::<affiliate::Code>(),
    }?;

    let partner = service
        .execute(command::CreateAffiliate {
            name,
            code,
            commission_rate: body.commission_rate,
            initiator_id: session.user.id,
        })
        .await
        .map_err(AsError::into_error)?;

    Ok((StatusCode::CREATED, Json(partner.into())))
}

/// Returns the `Partner` with its `Commission`s.
///
/// # Errors
///
/// Possible error codes:
/// - `FORBIDDEN` - authenticated `User` is not an administrator;
/// - `PARTNER_NOT_EXISTS` - `Partner` with the provided ID doesn't exist.
#[tracing::instrument(
    skip_all,
    fields(
        affiliate.id = %affiliate_id,
        user.id = %session.user.id,
        http.route = "GET /affiliate/partners/:id",
    ),
)]
pub async fn partner(
    Extension(service): Extension<Service>,
    session: Session,
    Path(affiliate_id): Path<affiliate::Id>,
) -> Result<Json<Details>, Error> {
    let details = service
        .execute(query::affiliate::ById {
            affiliate_id,
            viewer: session.actor(),
        })
        .await
        .map_err(AsError::into_error)?
        .ok_or_else(|| Error::from(AffiliateError::PartnerNotExists))?;

    Ok(Json(Details {
        partner: details.partner.into(),
        commissions: details
            .commissions
            .into_iter()
            .map(Into::into)
            .collect(),
    }))
}

/// Body of a `Referral` tracking request.
#[derive(Debug, Deserialize)]
pub struct NewReferral {
    /// Referral code of the `Partner`.
    pub code: String,

    /// ID of the referred user.
    pub user_id: user::Id,
}

/// Tracks a user referred by a `Partner`.
///
/// # Errors
///
/// Possible error codes:
/// - `VALIDATION_FAILED` - provided code is malformed;
/// - `INVALID_CODE` - no active `Partner` has the provided code;
/// - `USER_NOT_EXISTS` - referred user doesn't exist;
/// - `ALREADY_TRACKED` - referral of the user is tracked already.
#[tracing::instrument(
    skip_all,
    fields(
        code = %body.code,
        referred.id = %body.user_id,
        http.route = "POST /affiliate/referral",
    ),
)]
pub async fn track_referral(
    Extension(service): Extension<Service>,
    Json(body): Json<NewReferral>,
) -> Result<(StatusCode, Json<Referral>), Error> {
    let (code,) = validate! { code = body.code.parse::<affiliate::Code>() }?;

    let referral = service
        .execute(command::TrackReferral {
            code,
            referred_user_id: body.user_id,
        })
        .await
        .map_err(AsError::into_error)?;

    Ok((StatusCode::CREATED, Json(referral.into())))
}

/// Body of a `Referral` conversion request.
#[derive(Debug, Deserialize)]
pub struct Conversion {
    /// ID of the converted `Referral`.
    pub referral_id: referral::Id,

    /// Amount of the subscription the referred user bought.
    pub subscription_amount: Money,
}

/// Converted `Referral` along with the accrued `Commission`.
#[derive(Debug, Serialize)]
pub struct Converted {
    /// Converted `Referral`.
    pub referral: Referral,

    /// Accrued `Commission`.
    pub commission: Commission,
}

/// Converts a pending `Referral`, accruing a `Commission` to its `Partner`.
///
/// # Errors
///
/// Possible error codes:
/// - `FORBIDDEN` - authenticated `User` is not an administrator;
/// - `REFERRAL_NOT_EXISTS` - `Referral` with the provided ID doesn't exist;
/// - `ALREADY_CONVERTED` - `Referral` is converted already.
#[tracing::instrument(
    skip_all,
    fields(
        referral.id = %body.referral_id,
        user.id = %session.user.id,
        http.route = "PUT /affiliate/referral",
    ),
)]
pub async fn convert_referral(
    Extension(service): Extension<Service>,
    session: Session,
    Json(body): Json<Conversion>,
) -> Result<Json<Converted>, Error> {
    let out = service
        .execute(command::ConvertReferral {
            referral_id: body.referral_id,
            subscription_amount: body.subscription_amount,
            initiator_id: session.user.id,
        })
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(Converted {
        referral: out.referral.into(),
        commission: out.commission.into(),
    }))
}

/// Body of a `Commission`s payment request.
#[derive(Debug, Deserialize)]
pub struct Payment {
    /// IDs of the `Commission`s to pay.
    pub commission_ids: Vec<commission::Id>,

    /// Method of the payment.
    pub payment_method: commission::PaymentMethod,

    /// Reference of the payment.
    pub payment_reference: Option<String>,
}

/// Pays the provided pending `Commission`s all at once.
///
/// # Errors
///
/// Possible error codes:
/// - `VALIDATION_FAILED` - provided payment reference is invalid;
/// - `FORBIDDEN` - authenticated `User` is not an administrator;
/// - `EMPTY_BATCH` - no `Commission`s were provided;
/// - `NOT_PAYABLE` - some `Commission`s are missing or processed already.
#[tracing::instrument(
    skip_all,
    fields(
        count = body.commission_ids.len(),
        user.id = %session.user.id,
        http.route = "PUT /affiliate/commission",
    ),
)]
pub async fn pay_commissions(
    Extension(service): Extension<Service>,
    session: Session,
    Json(body): Json<Payment>,
) -> Result<Json<Vec<Commission>>, Error> {
    let (reference,) = validate! {
        payment_reference = body
            .payment_reference
            .map(|r| r.parse::<commission::PaymentReference>())
            .transpose(),
    }?;

    service
        .execute(command::PayCommissions {
            commission_ids: body.commission_ids,
            method: body.payment_method,
            reference,
            initiator_id: session.user.id,
        })
        .await
        .map_err(AsError::into_error)
        .map(|paid| Json(paid.into_iter().map(Into::into).collect()))
}

/// Body of a `Commission` review.
#[derive(Debug, Deserialize)]
pub struct Review {
    /// ID of the reviewed `Commission`.
    pub commission_id: commission::Id,

    /// Decision upon the `Commission`.
    pub decision: Decision,
}

/// Approves or rejects a pending `Commission`.
///
/// # Errors
///
/// Possible error codes:
/// - `FORBIDDEN` - authenticated `User` is not an administrator;
/// - `COMMISSION_NOT_EXISTS` - `Commission` doesn't exist;
/// - `COMMISSION_PROCESSED` - `Commission` is not pending anymore.
#[tracing::instrument(
    skip_all,
    fields(
        commission.id = %body.commission_id,
        decision = %body.decision,
        user.id = %session.user.id,
        http.route = "POST /affiliate/commission",
    ),
)]
pub async fn process_commission(
    Extension(service): Extension<Service>,
    session: Session,
    Json(body): Json<Review>,
) -> Result<Json<Commission>, Error> {
    service
        .execute(command::ProcessCommission {
            commission_id: body.commission_id,
            decision: body.decision,
            initiator_id: session.user.id,
        })
        .await
        .map_err(AsError::into_error)
        .map(|c| Json(c.into()))
}

/// Parameters of a `Commission` cancellation request.
#[derive(Debug, Deserialize)]
pub struct Cancellation {
    /// ID of the `Commission` to cancel.
    pub id: commission::Id,
}

/// Cancels an unpaid `Commission`, debiting its `Partner` if it was
/// approved.
///
/// # Errors
///
/// Possible error codes:
/// - `FORBIDDEN` - authenticated `User` is not an administrator;
/// - `COMMISSION_NOT_EXISTS` - `Commission` doesn't exist;
/// - `COMMISSION_PAID` - paid `Commission`s cannot be cancelled;
/// - `COMMISSION_CANCELLED` - `Commission` is cancelled already.
#[tracing::instrument(
    skip_all,
    fields(
        commission.id = %params.id,
        user.id = %session.user.id,
        http.route = "DELETE /affiliate/commission",
    ),
)]
pub async fn cancel_commission(
    Extension(service): Extension<Service>,
    session: Session,
    Query(params): Query<Cancellation>,
) -> Result<Json<Commission>, Error> {
    service
        .execute(command::CancelCommission {
            commission_id: params.id,
            initiator_id: session.user.id,
        })
        .await
        .map_err(AsError::into_error)
        .map(|c| Json(c.into()))
}

define_error! {
    enum AffiliateError {
        #[code = "PARTNER_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Partner` with the provided ID doesn't exist"]
        PartnerNotExists,

        #[code = "COMMISSION_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Commission` with the provided ID doesn't exist"]
        CommissionNotExists,
    }
}

impl AsError for commission::TransitionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "COMMISSION_PROCESSED"]
                #[status = CONFLICT]
                #[message = "`Commission` is processed already"]
                NotPending,

                #[code = "COMMISSION_PAID"]
                #[status = CONFLICT]
                #[message = "`Commission` is paid already"]
                Paid,

                #[code = "COMMISSION_CANCELLED"]
                #[status = CONFLICT]
                #[message = "`Commission` is cancelled already"]
                Cancelled,
            }
        }

        Some(
            match self {
                Self::NotPending(_) => Error::NotPending,
                Self::Paid(_) => Error::Paid,
                Self::Cancelled(_) => Error::Cancelled,
            }
            .into(),
        )
    }
}

impl AsError for query::affiliate::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Forbidden => Some(PrivilegeError::Forbidden.into()),
        }
    }
}

impl AsError for command::create_affiliate::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "CODE_OCCUPIED"]
                #[status = CONFLICT]
                #[message = "Code is used by another `Partner`"]
                CodeOccupied,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::CodeOccupied(_) => Some(Error::CodeOccupied.into()),
            Self::Forbidden(_) => Some(PrivilegeError::Forbidden.into()),
            Self::UserNotExists(_) => None,
        }
    }
}

impl AsError for command::track_referral::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "ALREADY_TRACKED"]
                #[status = CONFLICT]
                #[message = "Referral of the user is tracked already"]
                AlreadyTracked,

                #[code = "INVALID_CODE"]
                #[status = NOT_FOUND]
                #[message = "Invalid or inactive affiliate code"]
                InvalidCode,

                #[code = "USER_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "Referred user doesn't exist"]
                UserNotExists,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::AlreadyTracked(_) => Some(Error::AlreadyTracked.into()),
            Self::InvalidCode(_) => Some(Error::InvalidCode.into()),
            Self::UserNotExists(_) => Some(Error::UserNotExists.into()),
        }
    }
}

impl AsError for command::convert_referral::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "ALREADY_CONVERTED"]
                #[status = CONFLICT]
                #[message = "Referral is converted already"]
                AlreadyConverted,

                #[code = "REFERRAL_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "Referral with the provided ID doesn't exist"]
                ReferralNotExists,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::AlreadyConverted(_) => Some(Error::AlreadyConverted.into()),
            Self::Forbidden(_) => Some(PrivilegeError::Forbidden.into()),
            Self::ReferralNotExists(_) => Some(Error::ReferralNotExists.into()),
            Self::PartnerNotExists(_) | Self::UserNotExists(_) => None,
        }
    }
}

impl AsError for command::pay_commissions::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "EMPTY_BATCH"]
                #[status = BAD_REQUEST]
                #[message = "No commissions to pay"]
                EmptyBatch,

                #[code = "NOT_PAYABLE"]
                #[status = BAD_REQUEST]
                #[message = "Some commissions not found or already processed"]
                NotPayable,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::EmptyBatch => Some(Error::EmptyBatch.into()),
            Self::Forbidden(_) => Some(PrivilegeError::Forbidden.into()),
            Self::NotPayable => Some(Error::NotPayable.into()),
            Self::UserNotExists(_) => None,
        }
    }
}

impl AsError for command::process_commission::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::CommissionNotExists(_) => {
                Some(AffiliateError::CommissionNotExists.into())
            }
            Self::Forbidden(_) => Some(PrivilegeError::Forbidden.into()),
            Self::Transition(e) => e.try_as_error(),
            Self::UserNotExists(_) => None,
        }
    }
}

impl AsError for command::cancel_commission::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::CommissionNotExists(_) => {
                Some(AffiliateError::CommissionNotExists.into())
            }
            Self::Forbidden(_) => Some(PrivilegeError::Forbidden.into()),
            Self::Transition(e) => e.try_as_error(),
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
    async fn runs_referral_pipeline() {
        let app = App::new();
        let admin = app.admin().await;

        let (status, partner) = app
            .call(
                "POST",
                "/affiliate/partners",
                Some(&admin),
                Some(json!({
                    "name": "Best Partner",
                    "code": "best2024",
                    "commission_rate": "0.2",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{partner}");
        assert_eq!(partner["code"], "BEST2024");
        assert_eq!(partner["status"], "ACTIVE");

        let (_, user_id) = app.register("a@example.com", "ADJUSTER", None).await;
        let (status, referral) = app
            .call(
                "POST",
                "/affiliate/referral",
                None,
                Some(json!({"code": "BEST2024", "user_id": user_id})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{referral}");
        assert_eq!(referral["status"], "PENDING");

        let (status, body) = app
            .call(
                "POST",
                "/affiliate/referral",
                None,
                Some(json!({"code": "BEST2024", "user_id": user_id})),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "ALREADY_TRACKED");

        let (status, converted) = app
            .call(
                "PUT",
                "/affiliate/referral",
                Some(&admin),
                Some(json!({
                    "referral_id": referral["id"],
                    "subscription_amount": "99.99",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{converted}");
        assert_eq!(converted["referral"]["status"], "CONVERTED");
        assert_eq!(converted["commission"]["amount"], "20.00");
        assert_eq!(converted["commission"]["status"], "PENDING");

        let (status, paid) = app
            .call(
                "PUT",
                "/affiliate/commission",
                Some(&admin),
                Some(json!({
                    "commission_ids": [converted["commission"]["id"]],
                    "payment_method": "PAYPAL",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{paid}");
        assert_eq!(paid[0]["status"], "PAID");
        assert_eq!(paid[0]["payment_method"], "PAYPAL");

        let uri = format!(
            "/affiliate/commission?id={}",
            converted["commission"]["id"].as_str().unwrap(),
        );
        let (status, body) = app.call("DELETE", &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "COMMISSION_PAID");

        let uri = format!(
            "/affiliate/partners/{}",
            partner["id"].as_str().unwrap(),
        );
        let (status, details) = app.call("GET", &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(details["total_referrals"], 1);
        assert_eq!(details["commissions"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejects_unknown_code() {
        let app = App::new();
        let (_, user_id) = app.register("a@example.com", "ADJUSTER", None).await;

        let (status, body) = app
            .call(
                "POST",
                "/affiliate/referral",
                None,
                Some(json!({"code": "NOPE123", "user_id": user_id})),
            )
            .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "INVALID_CODE");
    }

    #[tokio::test]
    async fn rejects_empty_and_unpayable_batches() {
        let app = App::new();
        let admin = app.admin().await;

        let (status, body) = app
            .call(
                "PUT",
                "/affiliate/commission",
                Some(&admin),
                Some(json!({
                    "commission_ids": [],
                    "payment_method": "CHECK",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "EMPTY_BATCH");

        let (status, body) = app
            .call(
                "PUT",
                "/affiliate/commission",
                Some(&admin),
                Some(json!({
                    "commission_ids": ["8c0b4f3e-3c2a-4d57-9a8e-6f1d2b7c9e01"],
                    "payment_method": "CHECK",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "NOT_PAYABLE");
    }

    #[tokio::test]
    async fn forbids_non_admins() {
        let app = App::new();
        let (token, _) = app.register("a@example.com", "ADJUSTER", None).await;

        let (status, body) = app
            .call(
                "POST",
                "/affiliate/partners",
                Some(&token),
                Some(json!({
                    "name": "Sneaky",
                    "code": "SNEAKY1",
                    "commission_rate": "0.5",
                })),
            )
            .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "FORBIDDEN");
    }
}
