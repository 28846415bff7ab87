use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use axum_helpers::{
    AdminUser, CurrentUser, MaybeUser, UuidPath, ValidatedJson,
    errors::responses::{
        BadRequestUuidResponse, BadRequestValidationResponse, ConflictResponse,
        ForbiddenResponse, InternalServerErrorResponse, NotFoundResponse, UnauthorizedResponse,
    },
};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::error::MessageResult;
use crate::models::{
    ContactRequest, Message, ReplyRequest, Side, Thread, ThreadFilter, ThreadList, ThreadStatus,
    UnreadCount,
};
use crate::repository::ThreadRepository;
use crate::service::MessageService;

#[derive(OpenApi)]
#[openapi(
    paths(
        contact, list_my_threads, my_unread, get_thread, reply,
        admin_list, admin_unread, close_thread, reopen_thread, delete_thread
    ),
    components(
        schemas(
            Thread, ThreadList, ThreadStatus, Message, Side, UnreadCount, ContactRequest,
            ReplyRequest
        ),
        responses(
            BadRequestUuidResponse,
            BadRequestValidationResponse,
            UnauthorizedResponse,
            ForbiddenResponse,
            NotFoundResponse,
            ConflictResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = "Messages", description = "Customer conversations with the shop"),
        (name = "Messages (admin)", description = "Inbox management")
    )
)]
pub struct ApiDoc;

type SharedService<R> = Arc<MessageService<R>>;

/// Create the `/messages` router
pub fn router<R: ThreadRepository + 'static>(service: MessageService<R>) -> Router {
    Router::new()
        .route("/", post(contact).get(list_my_threads))
        .route("/unread", get(my_unread))
        .route("/{id}", get(get_thread))
        .route("/{id}/reply", post(reply))
        .route("/admin", get(admin_list))
        .route("/admin/unread", get(admin_unread))
        .route("/admin/{id}/close", post(close_thread))
        .route("/admin/{id}/reopen", post(reopen_thread))
        .route("/admin/{id}", delete(delete_thread))
        .with_state(Arc::new(service))
}

/// Contact the shop (guests give a name and email)
#[utoipa::path(
    post,
    path = "",
    tag = "Messages",
    request_body = ContactRequest,
    responses(
        (status = 201, description = "Thread opened", body = Thread),
        (status = 400, response = BadRequestValidationResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn contact<R: ThreadRepository>(
    State(service): State<SharedService<R>>,
    MaybeUser(user): MaybeUser,
    ValidatedJson(input): ValidatedJson<ContactRequest>,
) -> MessageResult<(StatusCode, Json<Thread>)> {
    let thread = service.contact(user.as_ref(), input).await?;
    Ok((StatusCode::CREATED, Json(thread)))
}

/// The caller's threads
#[utoipa::path(
    get,
    path = "",
    tag = "Messages",
    responses(
        (status = 200, description = "Threads", body = Vec<Thread>),
        (status = 401, response = UnauthorizedResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn list_my_threads<R: ThreadRepository>(
    State(service): State<SharedService<R>>,
    CurrentUser(user): CurrentUser,
) -> MessageResult<Json<Vec<Thread>>> {
    Ok(Json(service.list_mine(user.id).await?))
}

/// Threads with replies the caller has not read
#[utoipa::path(
    get,
    path = "/unread",
    tag = "Messages",
    responses(
        (status = 200, description = "Unread threads", body = UnreadCount),
        (status = 401, response = UnauthorizedResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn my_unread<R: ThreadRepository>(
    State(service): State<SharedService<R>>,
    CurrentUser(user): CurrentUser,
) -> MessageResult<Json<UnreadCount>> {
    Ok(Json(service.unread_for_customer(user.id).await?))
}

/// Read a thread
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Messages",
    params(("id" = Uuid, Path, description = "Thread ID")),
    responses(
        (status = 200, description = "Thread", body = Thread),
        (status = 400, response = BadRequestUuidResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn get_thread<R: ThreadRepository>(
    State(service): State<SharedService<R>>,
    CurrentUser(user): CurrentUser,
    UuidPath(id): UuidPath,
) -> MessageResult<Json<Thread>> {
    Ok(Json(service.get(&user, id).await?))
}

/// Reply on a thread (owner or admin)
#[utoipa::path(
    post,
    path = "/{id}/reply",
    tag = "Messages",
    params(("id" = Uuid, Path, description = "Thread ID")),
    request_body = ReplyRequest,
    responses(
        (status = 200, description = "Reply posted", body = Thread),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn reply<R: ThreadRepository>(
    State(service): State<SharedService<R>>,
    CurrentUser(user): CurrentUser,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<ReplyRequest>,
) -> MessageResult<Json<Thread>> {
    Ok(Json(service.reply(&user, id, input).await?))
}

/// Inbox
#[utoipa::path(
    get,
    path = "/admin",
    tag = "Messages (admin)",
    params(ThreadFilter),
    responses(
        (status = 200, description = "Threads", body = ThreadList),
        (status = 403, response = ForbiddenResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn admin_list<R: ThreadRepository>(
    State(service): State<SharedService<R>>,
    AdminUser(_admin): AdminUser,
    Query(filter): Query<ThreadFilter>,
) -> MessageResult<Json<ThreadList>> {
    Ok(Json(service.list(filter).await?))
}

/// Threads waiting for the shop
#[utoipa::path(
    get,
    path = "/admin/unread",
    tag = "Messages (admin)",
    responses(
        (status = 200, description = "Unread threads", body = UnreadCount),
        (status = 403, response = ForbiddenResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn admin_unread<R: ThreadRepository>(
    State(service): State<SharedService<R>>,
    AdminUser(_admin): AdminUser,
) -> MessageResult<Json<UnreadCount>> {
    Ok(Json(service.unread_for_admin().await?))
}

#[utoipa::path(
    post,
    path = "/admin/{id}/close",
    tag = "Messages (admin)",
    params(("id" = Uuid, Path, description = "Thread ID")),
    responses(
        (status = 200, description = "Thread closed", body = Thread),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn close_thread<R: ThreadRepository>(
    State(service): State<SharedService<R>>,
    AdminUser(_admin): AdminUser,
    UuidPath(id): UuidPath,
) -> MessageResult<Json<Thread>> {
    Ok(Json(service.close(id).await?))
}

#[utoipa::path(
    post,
    path = "/admin/{id}/reopen",
    tag = "Messages (admin)",
    params(("id" = Uuid, Path, description = "Thread ID")),
    responses(
        (status = 200, description = "Thread reopened", body = Thread),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn reopen_thread<R: ThreadRepository>(
    State(service): State<SharedService<R>>,
    AdminUser(_admin): AdminUser,
    UuidPath(id): UuidPath,
) -> MessageResult<Json<Thread>> {
    Ok(Json(service.reopen(id).await?))
}

#[utoipa::path(
    delete,
    path = "/admin/{id}",
    tag = "Messages (admin)",
    params(("id" = Uuid, Path, description = "Thread ID")),
    responses(
        (status = 204, description = "Thread deleted"),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn delete_thread<R: ThreadRepository>(
    State(service): State<SharedService<R>>,
    AdminUser(_admin): AdminUser,
    UuidPath(id): UuidPath,
) -> MessageResult<StatusCode> {
    service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
