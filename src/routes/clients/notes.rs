use std::collections::HashMap;

use anyhow::{Context, Result};
use axum::{Extension, extract::State, response::IntoResponse};
use diesel::{ExpressionMethods, QueryDsl};
use diesel_async::RunQueryDsl;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use serde::Serialize;

use crate::{
    api::storage,
    app_error::{AppError, StdResponse},
    app_state::AppState,
    middleware::{self, ClientIdentity},
    models::{CompanyNoteEntity, NoteAttachmentEntity, NoteReplyEntity},
    schema::{company_notes, note_attachments, note_replies},
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/clients/notes",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_my_notes))
            .route_layer(axum::middleware::from_fn(
                middleware::clients_authorization,
            )),
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

/// Fetch the client-visible notes for the authenticated client's company,
/// with replies and signed attachment URLs.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Client notes"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List my notes", body = StdResponse<Vec<GetNoteRes>, String>)
    )
)]
async fn get_my_notes(
    State(state): State<AppState>,
    Extension(identity): Extension<ClientIdentity>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let notes: Vec<CompanyNoteEntity> = company_notes::table
        .filter(company_notes::company_id.eq(identity.company_id))
        .filter(company_notes::visible_to_client.eq(true))
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
        message: Some("Get notes successfully"),
    })
}
