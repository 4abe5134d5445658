//! `Claim`-related definitions.

use axum::Extension;
use common::{DateTime, Money};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use service::{
    command::{self, Command as _},
    domain::{self, claim, firm, user},
    query,
    read::claim::list,
    Query as _,
};

use crate::{
    api::{Json, Path, PrivilegeError, Query},
    define_error, AsError, Error, Service, Session,
};

/// An insurance claim to be handled by an adjuster.
#[derive(Debug, Serialize)]
pub struct Claim {
    /// Unique identifier of this `Claim`.
    pub id: claim::Id,

    /// Human-readable number of this `Claim`.
    pub number: claim::Number,

    /// Kind of the damage.
    pub kind: claim::Kind,

    /// Status of this `Claim`.
    pub status: claim::Status,

    /// Priority of this `Claim`.
    pub priority: claim::Priority,

    /// Title of this `Claim`.
    pub title: claim::Title,

    /// Description of this `Claim`.
    pub description: Option<claim::Description>,

    /// Estimated value of the damage.
    pub estimated_value: Option<Money>,

    /// Final value of the damage.
    pub final_value: Option<Money>,

    /// Fee the adjuster earns for handling this `Claim`.
    pub adjuster_fee: Option<Money>,

    /// Address of the damaged property.
    pub address: claim::Address,

    /// `DateTime` of the incident.
    pub incident_at: Option<DateTime>,

    /// `DateTime` when the incident was reported.
    pub reported_at: Option<DateTime>,

    /// Deadline for handling this `Claim`.
    pub deadline: Option<DateTime>,

    /// `DateTime` when this `Claim` was completed.
    pub completed_at: Option<DateTime>,

    /// ID of the firm this `Claim` belongs to.
    pub firm_id: firm::Id,

    /// ID of the adjuster handling this `Claim`.
    pub adjuster_id: Option<user::Id>,

    /// `DateTime` when this `Claim` was created.
    pub created_at: DateTime,

    /// `DateTime` when this `Claim` was updated last time.
    pub updated_at: DateTime,
}

impl From<domain::Claim> for Claim {
    fn from(c: domain::Claim) -> Self {
        Self {
            id: c.id,
            number: c.number,
            kind: c.kind,
            status: c.status,
            priority: c.priority,
            title: c.title,
            description: c.description,
            estimated_value: c.estimated_value,
            final_value: c.final_value,
            adjuster_fee: c.adjuster_fee,
            address: c.address,
            incident_at: c.incident_at.map(|at| at.coerce()),
            reported_at: c.reported_at.map(|at| at.coerce()),
            deadline: c.deadline.map(|at| at.coerce()),
            completed_at: c.completed_at.map(|at| at.coerce()),
            firm_id: c.firm_id,
            adjuster_id: c.adjuster_id,
            created_at: c.created_at.coerce(),
            updated_at: c.updated_at.coerce(),
        }
    }
}

/// Address of the damaged property, as provided by a client.
#[derive(Debug, Default, Deserialize)]
pub struct Address {
    /// Street line.
    pub street: Option<String>,

    /// City.
    pub city: Option<String>,

    /// State.
    pub state: Option<String>,

    /// ZIP code.
    pub zip_code: Option<String>,
}

impl TryFrom<Address> for claim::Address {
    type Error = &'static str;

    fn try_from(raw: Address) -> Result<Self, Self::Error> {
        let part = |p: Option<String>| {
            p.map(|p| p.parse::<claim::AddressPart>()).transpose()
        };
        Ok(Self {
            street: part(raw.street)?,
            city: part(raw.city)?,
            state: part(raw.state)?,
            zip_code: part(raw.zip_code)?,
        })
    }
}

/// Page of `Claim`s.
#[derive(Debug, Serialize)]
pub struct Page {
    /// `Claim`s on this `Page`.
    pub items: Vec<Claim>,

    /// Indicator whether there are more `Claim`s after this `Page`.
    pub has_next_page: bool,

    /// Cursor to request the next `Page` with.
    pub end_cursor: Option<claim::Number>,
}

/// Parameters of a `Claim`s list request.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Status of the listed `Claim`s.
    pub status: Option<claim::Status>,

    /// ID of the firm the listed `Claim`s belong to.
    pub firm_id: Option<firm::Id>,

    /// ID of the adjuster handling the listed `Claim`s.
    pub adjuster_id: Option<user::Id>,

    /// Words to search in the `Claim`s texts.
    pub search: Option<String>,

    /// Number of `Claim`s to return.
    pub first: Option<usize>,

    /// Cursor to return the `Claim`s after.
    pub after: Option<claim::Number>,
}

/// Lists `Claim`s visible to the authenticated `User`, newest first.
///
/// # Errors
///
/// Possible error codes:
/// - `VALIDATION_FAILED` - invalid search query or page size.
#[tracing::instrument(
    skip_all,
    fields(user.id = %session.user.id, http.route = "GET /claims"),
)]
pub async fn list(
    Extension(service): Extension<Service>,
    session: Session,
    Query(params): Query<ListParams>,
) -> Result<Json<Page>, Error> {
    /// Number of `Claim`s returned when no `first` is specified.
    const DEFAULT_PAGE_SIZE: usize = 20;

    let ListParams {
        status,
        firm_id,
        adjuster_id,
        search,
        first,
        after,
    } = params;
    let (search, arguments) = validate! {
        search = search
            .map(|s| list::Search::new(s).ok_or("blank search query"))
            .transpose(),
        first = list::Arguments::new(first, after, DEFAULT_PAGE_SIZE)
            .ok_or("page size must be between 1 and 100"),
    }?;

    let page = service
        .execute(query::claims::List {
            arguments,
            filter: list::Filter {
                status,
                firm_id,
                adjuster_id,
                search,
                ..list::Filter::default()
            },
            viewer: session.actor(),
        })
        .await
        .map_err(AsError::into_error)?;

    let end_cursor = page.end_cursor().cloned();
    Ok(Json(Page {
        has_next_page: page.has_next_page,
        items: page.edges.into_iter().map(|e| e.node.into()).collect(),
        end_cursor,
    }))
}

/// Returns the `Claim` with the provided ID.
///
/// # Errors
///
/// Possible error codes:
/// - `CLAIM_NOT_EXISTS` - `Claim` doesn't exist or is not visible.
#[tracing::instrument(
    skip_all,
    fields(
        claim.id = %claim_id,
        user.id = %session.user.id,
        http.route = "GET /claims/:id",
    ),
)]
pub async fn get(
    Extension(service): Extension<Service>,
    session: Session,
    Path(claim_id): Path<claim::Id>,
) -> Result<Json<Claim>, Error> {
    service
        .execute(query::claim::ById {
            claim_id,
            viewer: session.actor(),
        })
        .await
        .map_err(AsError::into_error)?
        .map(|c| Json(c.into()))
        .ok_or_else(|| ClaimError::NotExists.into())
}

/// Body of a `Claim` creation request.
#[derive(Debug, Deserialize)]
pub struct NewClaim {
    /// ID of the firm the `Claim` belongs to.
    pub firm_id: firm::Id,

    /// Kind of the damage.
    pub kind: claim::Kind,

    /// Priority, `MEDIUM` by default.
    pub priority: Option<claim::Priority>,

    /// Title of the `Claim`.
    pub title: String,

    /// Description of the `Claim`.
    pub description: Option<String>,

    /// Estimated value of the damage.
    pub estimated_value: Option<Money>,

    /// Fee the adjuster earns for handling the `Claim`.
    pub adjuster_fee: Option<Money>,

    /// Address of the damaged property.
    #[serde(default)]
    pub address: Address,

    /// `DateTime` of the incident.
    pub incident_at: Option<claim::IncidentDateTime>,

    /// `DateTime` when the incident was reported.
    pub reported_at: Option<claim::ReportDateTime>,

    /// Deadline for handling the `Claim`.
    pub deadline: Option<claim::DeadlineDateTime>,
}

/// Creates a new `AVAILABLE` `Claim` in a firm.
///
/// # Errors
///
/// Possible error codes:
/// - `VALIDATION_FAILED` - some of the provided fields are invalid;
/// - `FORBIDDEN` - authenticated `User` doesn't manage the firm;
/// - `FIRM_NOT_EXISTS` - firm with the provided ID doesn't exist.
#[tracing::instrument(
    skip_all,
    fields(
        firm.id = %body.firm_id,
        user.id = %session.user.id,
        http.route = "POST /claims",
    ),
)]
pub async fn create(
    Extension(service): Extension<Service>,
    session: Session,
    Json(body): Json<NewClaim>,
) -> Result<(StatusCode, Json<Claim>), Error> {
    let (title, description, address) = validate! {
        title = body.title.parse::<claim::Title>(),
        description = body
            .description
            .map(|d| d.parse::<claim::Description>())
            .transpose(),
        address = claim::Address::try_from(body.address),
    }?;

    let claim = service
        .execute(command::CreateClaim {
            firm_id: body.firm_id,
            kind: body.kind,
            priority: body.priority.unwrap_or(claim::Priority::Medium),
            title,
            description,
            estimated_value: body.estimated_value,
            adjuster_fee: body.adjuster_fee,
            address,
            incident_at: body.incident_at,
            reported_at: body.reported_at,
            deadline: body.deadline,
            initiator_id: session.user.id,
        })
        .await
        .map_err(AsError::into_error)?;

    Ok((StatusCode::CREATED, Json(claim.into())))
}

/// Body of a `Claim` update request.
///
/// Omitted fields are left untouched.
#[derive(Debug, Default, Deserialize)]
pub struct ClaimUpdate {
    /// New kind of the damage.
    pub kind: Option<claim::Kind>,

    /// New priority.
    pub priority: Option<claim::Priority>,

    /// New title.
    pub title: Option<String>,

    /// New description.
    pub description: Option<String>,

    /// New estimated value of the damage.
    pub estimated_value: Option<Money>,

    /// Final value of the damage.
    pub final_value: Option<Money>,

    /// New adjuster fee.
    pub adjuster_fee: Option<Money>,

    /// New address.
    pub address: Option<Address>,

    /// New `DateTime` of the incident.
    pub incident_at: Option<claim::IncidentDateTime>,

    /// New `DateTime` when the incident was reported.
    pub reported_at: Option<claim::ReportDateTime>,

    /// New deadline.
    pub deadline: Option<claim::DeadlineDateTime>,

    /// Status to move the `Claim` to.
    pub status: Option<claim::Status>,
}

/// Updates fields and status of a `Claim`.
///
/// # Errors
///
/// Possible error codes:
/// - `VALIDATION_FAILED` - some of the provided fields are invalid;
/// - `CLAIM_NOT_EXISTS` - `Claim` doesn't exist or is not visible;
/// - `FORBIDDEN` - authenticated `User` may not update the `Claim`;
/// - `ASSIGNMENT_REQUIRED` - `ASSIGNED` status requires an assignment;
/// - `ILLEGAL_TRANSITION` - `Claim` cannot move to the requested status.
#[tracing::instrument(
    skip_all,
    fields(
        claim.id = %claim_id,
        status = ?body.status,
        user.id = %session.user.id,
        http.route = "PATCH /claims/:id",
    ),
)]
pub async fn update(
    Extension(service): Extension<Service>,
    session: Session,
    Path(claim_id): Path<claim::Id>,
    Json(body): Json<ClaimUpdate>,
) -> Result<Json<Claim>, Error> {
    let (title, description, address) = validate! {
        title = body.title.map(|t| t.parse::<claim::Title>()).transpose(),
        description = body
            .description
            .map(|d| d.parse::<claim::Description>())
            .transpose(),
        address = body.address.map(claim::Address::try_from).transpose(),
    }?;

    service
        .execute(command::UpdateClaim {
            claim_id,
            kind: body.kind,
            priority: body.priority,
            title,
            description,
            estimated_value: body.estimated_value,
            final_value: body.final_value,
            adjuster_fee: body.adjuster_fee,
            address,
            incident_at: body.incident_at,
            reported_at: body.reported_at,
            deadline: body.deadline,
            status: body.status,
            initiator_id: session.user.id,
        })
        .await
        .map_err(AsError::into_error)
        .map(|c| Json(c.into()))
}

/// Deletes a `Claim` along with its pending earnings.
///
/// # Errors
///
/// Possible error codes:
/// - `CLAIM_NOT_EXISTS` - `Claim` doesn't exist or is not visible;
/// - `FORBIDDEN` - authenticated `User` may not delete the `Claim`;
/// - `CLAIM_ACTIVE_OR_COMPLETED` - `Claim` is being handled or completed.
#[tracing::instrument(
    skip_all,
    fields(
        claim.id = %claim_id,
        user.id = %session.user.id,
        http.route = "DELETE /claims/:id",
    ),
)]
pub async fn delete(
    Extension(service): Extension<Service>,
    session: Session,
    Path(claim_id): Path<claim::Id>,
) -> Result<Json<Claim>, Error> {
    service
        .execute(command::DeleteClaim {
            claim_id,
            initiator_id: session.user.id,
        })
        .await
        .map_err(AsError::into_error)
        .map(|c| Json(c.into()))
}

/// Body of a `Claim` assignment request.
#[derive(Debug, Default, Deserialize)]
pub struct Assignment {
    /// ID of the adjuster to assign the `Claim` to.
    ///
    /// The authenticated `User` assigns the `Claim` to itself if omitted.
    pub adjuster_id: Option<user::Id>,
}

/// Assigns an `AVAILABLE` `Claim` to an adjuster.
///
/// # Errors
///
/// Possible error codes:
/// - `CLAIM_NOT_EXISTS` - `Claim` doesn't exist or is not visible;
/// - `FORBIDDEN` - authenticated `User` may not assign the `Claim`;
/// - `INVALID_ADJUSTER` - target `User` is not an active adjuster;
/// - `ADJUSTER_NOT_CONNECTED` - target adjuster is not connected to the firm;
/// - `CLAIM_NOT_AVAILABLE` - `Claim` is not available for assignment.
#[tracing::instrument(
    skip_all,
    fields(
        claim.id = %claim_id,
        user.id = %session.user.id,
        http.route = "POST /claims/:id/assign",
    ),
)]
pub async fn assign(
    Extension(service): Extension<Service>,
    session: Session,
    Path(claim_id): Path<claim::Id>,
    body: Option<Json<Assignment>>,
) -> Result<Json<Claim>, Error> {
    let Json(body) = body.unwrap_or_default();

    service
        .execute(command::AssignClaim {
            claim_id,
            adjuster_id: body.adjuster_id,
            initiator_id: session.user.id,
        })
        .await
        .map_err(AsError::into_error)
        .map(|c| Json(c.into()))
}

/// Releases an `ASSIGNED` `Claim` back for assignment.
///
/// # Errors
///
/// Possible error codes:
/// - `CLAIM_NOT_EXISTS` - `Claim` doesn't exist or is not visible;
/// - `FORBIDDEN` - authenticated `User` may not unassign the `Claim`;
/// - `CLAIM_NOT_ASSIGNED` - `Claim` has no adjuster;
/// - `CLAIM_ACTIVE_OR_COMPLETED` - `Claim` is being handled or completed.
#[tracing::instrument(
    skip_all,
    fields(
        claim.id = %claim_id,
        user.id = %session.user.id,
        http.route = "DELETE /claims/:id/assign",
    ),
)]
pub async fn unassign(
    Extension(service): Extension<Service>,
    session: Session,
    Path(claim_id): Path<claim::Id>,
) -> Result<Json<Claim>, Error> {
    service
        .execute(command::UnassignClaim {
            claim_id,
            initiator_id: session.user.id,
        })
        .await
        .map_err(AsError::into_error)
        .map(|c| Json(c.into()))
}

define_error! {
    enum ClaimError {
        #[code = "CLAIM_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Claim` with the provided ID doesn't exist"]
        NotExists,

        #[code = "FIRM_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "Firm with the provided ID doesn't exist"]
        FirmNotExists,
    }
}

impl AsError for claim::TransitionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "CLAIM_NOT_AVAILABLE"]
                #[status = CONFLICT]
                #[message = "Claim is not available for assignment"]
                NotAvailable,

                #[code = "CLAIM_NOT_ASSIGNED"]
                #[status = BAD_REQUEST]
                #[message = "Claim is not assigned"]
                NotAssigned,

                #[code = "CLAIM_ACTIVE_OR_COMPLETED"]
                #[status = BAD_REQUEST]
                #[message = "Claim is being handled or completed already"]
                ActiveOrCompleted,

                #[code = "ASSIGNMENT_REQUIRED"]
                #[status = BAD_REQUEST]
                #[message = "Claim can be assigned only by assigning an \
                             adjuster"]
                AssignmentRequired,

                #[code = "ILLEGAL_TRANSITION"]
                #[status = CONFLICT]
                #[message = "Claim cannot move to the requested status"]
                Illegal,
            }
        }

        Some(
            match self {
                Self::NotAvailable => Error::NotAvailable,
                Self::NotAssigned => Error::NotAssigned,
                Self::ActiveOrCompleted => Error::ActiveOrCompleted,
                Self::AssignmentRequired => Error::AssignmentRequired,
                Self::Illegal { .. } => Error::Illegal,
            }
            .into(),
        )
    }
}

impl AsError for command::create_claim::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::FirmNotExists(_) => Some(ClaimError::FirmNotExists.into()),
            Self::Forbidden(_) => Some(PrivilegeError::Forbidden.into()),
            Self::UserNotExists(_) => None,
        }
    }
}

impl AsError for command::assign_claim::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "INVALID_ADJUSTER"]
                #[status = BAD_REQUEST]
                #[message = "Target `User` is not an active adjuster"]
                InvalidAdjuster,

                #[code = "ADJUSTER_NOT_CONNECTED"]
                #[status = FORBIDDEN]
                #[message = "Adjuster is not connected to the firm"]
                NotConnected,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::ClaimNotExists(_) => Some(ClaimError::NotExists.into()),
            Self::Forbidden(_) => Some(PrivilegeError::Forbidden.into()),
            Self::InvalidAdjuster(_) => Some(Error::InvalidAdjuster.into()),
            Self::NotConnected(_) => Some(Error::NotConnected.into()),
            Self::Transition(e) => e.try_as_error(),
            Self::UserNotExists(_) => None,
        }
    }
}

impl AsError for command::unassign_claim::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::ClaimNotExists(_) => Some(ClaimError::NotExists.into()),
            Self::Forbidden(_) => Some(PrivilegeError::Forbidden.into()),
            Self::Transition(e) => e.try_as_error(),
            Self::UserNotExists(_) => None,
        }
    }
}

impl AsError for command::update_claim::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::ClaimNotExists(_) => Some(ClaimError::NotExists.into()),
            Self::Forbidden(_) => Some(PrivilegeError::Forbidden.into()),
            Self::Transition(e) => e.try_as_error(),
            Self::UserNotExists(_) => None,
        }
    }
}

impl AsError for command::delete_claim::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "CLAIM_ACTIVE_OR_COMPLETED"]
                #[status = BAD_REQUEST]
                #[message = "Cannot delete claims being handled or completed"]
                ActiveOrCompleted,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::ActiveOrCompleted(_) => Some(Error::ActiveOrCompleted.into()),
            Self::ClaimNotExists(_) => Some(ClaimError::NotExists.into()),
            Self::Forbidden(_) => Some(PrivilegeError::Forbidden.into()),
            Self::UserNotExists(_) => None,
        }
    }
}

#[cfg(test)]
mod spec {
    use http::StatusCode;
    use serde_json::json;

    use crate::api::spec::App;

    /// Creates a firm with an `AVAILABLE` claim worth a `500` fee, returning
    /// the administrator token and the claim ID.
    async fn setup(app: &App) -> (String, String) {
        let admin = app.admin().await;
        let (status, firm) = app
            .call(
                "POST",
                "/firms",
                Some(&admin),
                Some(json!({"name": "Acme Insurance"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{firm}");
        let (status, claim) = app
            .call(
                "POST",
                "/claims",
                Some(&admin),
                Some(json!({
                    "firm_id": firm["id"],
                    "kind": "WATER_DAMAGE",
                    "title": "Flooded basement",
                    "adjuster_fee": "500",
                    "address": {"city": "Springfield"},
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{claim}");
        assert_eq!(claim["status"], "AVAILABLE");
        assert_eq!(claim["priority"], "MEDIUM");
        assert_eq!(claim["address"]["city"], "Springfield");
        (admin, claim["id"].as_str().unwrap().to_owned())
    }

    #[tokio::test]
    async fn self_assigns_and_unassigns() {
        let app = App::new();
        let (_, claim_id) = setup(&app).await;
        let (adjuster, adjuster_id) =
            app.register("a@example.com", "ADJUSTER", None).await;
        let uri = format!("/claims/{claim_id}/assign");

        let (status, claim) =
            app.call("POST", &uri, Some(&adjuster), None).await;
        assert_eq!(status, StatusCode::OK, "{claim}");
        assert_eq!(claim["status"], "ASSIGNED");
        assert_eq!(claim["adjuster_id"], adjuster_id.as_str());

        let (status, earnings) =
            app.call("GET", "/earnings", Some(&adjuster), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(earnings.as_array().unwrap().len(), 1);
        assert_eq!(earnings[0]["amount"], "500.00");
        assert_eq!(earnings[0]["status"], "PENDING");

        let (status, body) =
            app.call("POST", &uri, Some(&adjuster), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "CLAIM_NOT_AVAILABLE");

        let (status, claim) =
            app.call("DELETE", &uri, Some(&adjuster), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(claim["status"], "AVAILABLE");
        assert!(claim["adjuster_id"].is_null());

        let (status, body) =
            app.call("DELETE", &uri, Some(&adjuster), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "CLAIM_NOT_ASSIGNED");

        let (_, earnings) =
            app.call("GET", "/earnings", Some(&adjuster), None).await;
        assert!(earnings.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn hides_foreign_claims() {
        let app = App::new();
        let (_, claim_id) = setup(&app).await;
        let (first, _) = app.register("a@example.com", "ADJUSTER", None).await;
        let (second, _) =
            app.register("b@example.com", "ADJUSTER", None).await;
        let uri = format!("/claims/{claim_id}");
        drop(
            app.call("POST", &format!("{uri}/assign"), Some(&first), None)
                .await,
        );

        let (status, body) = app.call("GET", &uri, Some(&second), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "CLAIM_NOT_EXISTS");

        let (status, body) = app
            .call("POST", &format!("{uri}/assign"), Some(&second), None)
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "CLAIM_NOT_AVAILABLE");

        let (status, page) =
            app.call("GET", "/claims", Some(&second), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(page["items"].as_array().unwrap().is_empty());
        assert_eq!(page["has_next_page"], false);

        let (status, claim) = app.call("GET", &uri, Some(&first), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(claim["id"], claim_id.as_str());
    }

    #[tokio::test]
    async fn forbids_adjusters_creating_claims() {
        let app = App::new();
        drop(setup(&app).await);
        let (adjuster, _) =
            app.register("a@example.com", "ADJUSTER", None).await;
        let (_, page) = app.call("GET", "/claims", Some(&adjuster), None).await;
        let firm_id = page["items"][0]["firm_id"].clone();

        let (status, body) = app
            .call(
                "POST",
                "/claims",
                Some(&adjuster),
                Some(json!({
                    "firm_id": firm_id,
                    "kind": "THEFT",
                    "title": "Stolen bike",
                })),
            )
            .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn walks_through_lifecycle() {
        let app = App::new();
        let (admin, claim_id) = setup(&app).await;
        let (adjuster, _) =
            app.register("a@example.com", "ADJUSTER", None).await;
        let uri = format!("/claims/{claim_id}");
        drop(
            app.call("POST", &format!("{uri}/assign"), Some(&adjuster), None)
                .await,
        );

        let (status, claim) = app
            .call(
                "PATCH",
                &uri,
                Some(&adjuster),
                Some(json!({"status": "IN_PROGRESS", "priority": "URGENT"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{claim}");
        assert_eq!(claim["status"], "IN_PROGRESS");
        assert_eq!(claim["priority"], "URGENT");

        let (status, body) = app
            .call(
                "PATCH",
                &uri,
                Some(&adjuster),
                Some(json!({"status": "ASSIGNED"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "ASSIGNMENT_REQUIRED");

        let (status, body) = app.call("DELETE", &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "CLAIM_ACTIVE_OR_COMPLETED");

        let (status, claim) = app
            .call(
                "PATCH",
                &uri,
                Some(&adjuster),
                Some(json!({"status": "COMPLETED", "final_value": "950.5"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{claim}");
        assert_eq!(claim["status"], "COMPLETED");
        assert_eq!(claim["final_value"], "950.50");
        assert!(claim["completed_at"].is_string());

        let (status, body) = app
            .call(
                "PATCH",
                &uri,
                Some(&admin),
                Some(json!({"status": "CANCELLED"})),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "ILLEGAL_TRANSITION");
    }

    #[tokio::test]
    async fn validates_list_parameters() {
        let app = App::new();
        let (admin, _) = setup(&app).await;

        let (status, body) =
            app.call("GET", "/claims?first=0", Some(&admin), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["details"]["first"].is_string());

        let (status, page) = app
            .call("GET", "/claims?search=flooded", Some(&admin), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["items"].as_array().unwrap().len(), 1);
    }
}
