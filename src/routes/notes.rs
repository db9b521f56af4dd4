use std::collections::HashMap;

use anyhow::{Context, Result};
use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use serde::{Deserialize, Serialize};

use crate::{
    api::storage,
    app_error::{AppError, StdResponse},
    app_state::AppState,
    middleware::{self, AdminIdentity},
    models::{
        CompanyNoteEntity, CreateCompanyNoteEntity, CreateNoteAttachmentEntity,
        CreateNoteReplyEntity, NoteAttachmentEntity, NoteReplyEntity,
    },
    schema::{companies, company_notes, note_attachments, note_replies},
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new()
        .nest(
            "/companies",
            OpenApiRouter::new()
                .routes(utoipa_axum::routes!(get_company_notes))
                .routes(utoipa_axum::routes!(create_note))
                .route_layer(axum::middleware::from_fn(middleware::admins_authorization)),
        )
        .nest(
            "/notes",
            OpenApiRouter::new()
                .routes(utoipa_axum::routes!(create_reply))
                .routes(utoipa_axum::routes!(create_attachment))
                .route_layer(axum::middleware::from_fn(middleware::admins_authorization)),
        )
}

#[derive(Serialize, ToSchema)]
struct NoteAttachmentRes {
    pub attachment: NoteAttachmentEntity,
    /// Time-limited download URL.
    pub url: String,
}

#[derive(Serialize, ToSchema)]
struct GetNoteRes {
    pub note: CompanyNoteEntity,
    pub replies: Vec<NoteReplyEntity>,
    pub attachments: Vec<NoteAttachmentRes>,
}

/// Fetch every note attached to a company, including notes hidden from the
/// client, with replies and signed attachment URLs.
#[utoipa::path(
    get,
    path = "/{id}/notes",
    tags = ["Notes"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Company ID to fetch notes for")
    ),
    responses(
        (status = 200, description = "List company notes", body = StdResponse<Vec<GetNoteRes>, String>)
    )
)]
async fn get_company_notes(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let notes: Vec<CompanyNoteEntity> = company_notes::table
        .filter(company_notes::company_id.eq(id))
        .order_by(company_notes::created_at.desc())
        .get_results(conn)
        .await
        .context("Failed to get notes")?;

    let note_ids: Vec<i32> = notes.iter().map(|note| note.id).collect();
    let replies: Vec<NoteReplyEntity> = note_replies::table
        .filter(note_replies::note_id.eq_any(&note_ids))
        .order_by(note_replies::created_at.asc())
        .get_results(conn)
        .await
        .context("Failed to get note replies")?;
    let attachments: Vec<NoteAttachmentEntity> = note_attachments::table
        .filter(note_attachments::note_id.eq_any(&note_ids))
        .get_results(conn)
        .await
        .context("Failed to get note attachments")?;

    let mut replies_by_note: HashMap<i32, Vec<NoteReplyEntity>> = HashMap::new();
    for reply in replies {
        replies_by_note.entry(reply.note_id).or_default().push(reply);
    }

    let mut attachments_by_note: HashMap<i32, Vec<NoteAttachmentRes>> = HashMap::new();
    for attachment in attachments {
        let url = storage::create_signed_url(
            state.http_client.clone(),
            storage::BUCKET_COMPANY_NOTES,
            &attachment.storage_path,
        )
        .await?;
        attachments_by_note
            .entry(attachment.note_id)
            .or_default()
            .push(NoteAttachmentRes { attachment, url });
    }

    let notes_res: Vec<GetNoteRes> = notes
        .into_iter()
        .map(|note| GetNoteRes {
            replies: replies_by_note.remove(&note.id).unwrap_or_default(),
            attachments: attachments_by_note.remove(&note.id).unwrap_or_default(),
            note,
        })
        .collect();

    Ok(StdResponse {
        data: Some(notes_res),
        message: Some("Get company notes successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct CreateNoteReq {
    pub body: String,
    pub visible_to_client: bool,
}

/// Attach a note to a company.
#[utoipa::path(
    post,
    path = "/{id}/notes",
    tags = ["Notes"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Company ID to attach the note to")
    ),
    request_body = CreateNoteReq,
    responses(
        (status = 200, description = "Created note successfully", body = StdResponse<CompanyNoteEntity, String>)
    )
)]
async fn create_note(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(identity): Extension<AdminIdentity>,
    Json(body): Json<CreateNoteReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let company_exists: i64 = companies::table
        .find(id)
        .count()
        .get_result(conn)
        .await
        .context("Failed to get company")?;
    if company_exists == 0 {
        return Err(AppError::NotFound);
    }

    let note: CompanyNoteEntity = diesel::insert_into(company_notes::table)
        .values(CreateCompanyNoteEntity {
            company_id: id,
            author_id: identity.user_id,
            body: body.body,
            visible_to_client: body.visible_to_client,
        })
        .returning(CompanyNoteEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to create note")?;

    Ok(StdResponse {
        data: Some(note),
        message: Some("Created note successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct CreateReplyReq {
    pub body: String,
}

/// Reply to an existing note.
#[utoipa::path(
    post,
    path = "/{id}/replies",
    tags = ["Notes"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Note ID to reply to")
    ),
    request_body = CreateReplyReq,
    responses(
        (status = 200, description = "Created reply successfully", body = StdResponse<NoteReplyEntity, String>)
    )
)]
async fn create_reply(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(identity): Extension<AdminIdentity>,
    Json(body): Json<CreateReplyReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let note_exists: i64 = company_notes::table
        .find(id)
        .count()
        .get_result(conn)
        .await
        .context("Failed to get note")?;
    if note_exists == 0 {
        return Err(AppError::NotFound);
    }

    let reply: NoteReplyEntity = diesel::insert_into(note_replies::table)
        .values(CreateNoteReplyEntity {
            note_id: id,
            author_id: identity.user_id,
            body: body.body,
        })
        .returning(NoteReplyEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to create reply")?;

    Ok(StdResponse {
        data: Some(reply),
        message: Some("Created reply successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct CreateAttachmentReq {
    pub file_name: String,
    /// Path of the already-uploaded object in the company-notes bucket.
    pub storage_path: String,
}

/// Register an uploaded file as a note attachment and return a signed URL
/// for it.
#[utoipa::path(
    post,
    path = "/{id}/attachments",
    tags = ["Notes"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Note ID to attach the file to")
    ),
    request_body = CreateAttachmentReq,
    responses(
        (status = 200, description = "Created attachment successfully", body = StdResponse<NoteAttachmentRes, String>)
    )
)]
async fn create_attachment(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Json(body): Json<CreateAttachmentReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let note_exists: i64 = company_notes::table
        .find(id)
        .count()
        .get_result(conn)
        .await
        .context("Failed to get note")?;
    if note_exists == 0 {
        return Err(AppError::NotFound);
    }

    let attachment: NoteAttachmentEntity = diesel::insert_into(note_attachments::table)
        .values(CreateNoteAttachmentEntity {
            note_id: id,
            file_name: body.file_name,
            storage_path: body.storage_path,
        })
        .returning(NoteAttachmentEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to create attachment")?;

    let url = storage::create_signed_url(
        state.http_client.clone(),
        storage::BUCKET_COMPANY_NOTES,
        &attachment.storage_path,
    )
    .await?;

    Ok(StdResponse {
        data: Some(NoteAttachmentRes { attachment, url }),
        message: Some("Created attachment successfully"),
    })
}
