//! services/api/src/web/ocr.rs
//!
//! The document-analysis endpoint: multipart intake, PDF rasterization
//! with a scoped temp file, concurrent per-page structured extraction,
//! and aggregate usage/cost accounting.

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::Json,
};
use bytes::Bytes;
use futures::future::try_join_all;
use serde::Serialize;
use sintgpt_core::{
    cost::{format_dollars, VISION_RATES},
    domain::{PageAnalysisResult, TokenUsage, UploadKind},
    ports::PortError,
};
use tracing::{error, info, warn};

use crate::web::rest::{api_error, provider_status, ApiFailure};
use crate::web::state::AppState;

/// Name of the multipart field carrying the uploaded file.
const IMAGE_FIELD: &str = "image";

//=========================================================================================
// API Response Structs
//=========================================================================================

/// Aggregate token counts and cost estimate across all pages. Costs are
/// formatted dollar strings, e.g. `"$0.0123"`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
    pub input_cost: String,
    pub output_cost: String,
    pub total_cost: String,
}

/// The response payload of a successful document analysis.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeDocumentResponse {
    pub analyses: Vec<PageAnalysisResult>,
    pub total_pages: u32,
    pub overall_usage: OverallUsage,
}

//=========================================================================================
// Handler
//=========================================================================================

/// POST /api/ocr/image
///
/// Accepts a multipart form with a single file part named `image`. PDFs
/// are rasterized page by page and analyzed concurrently; images are a
/// single page; anything else is rejected before the provider is called.
pub async fn analyze_document_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<AnalyzeDocumentResponse>, ApiFailure> {
    let mut upload: Option<(Option<String>, Bytes)> = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        api_error(
            StatusCode::BAD_REQUEST,
            format!("Failed to read multipart data: {}", e),
        )
    })? {
        if field.name() == Some(IMAGE_FIELD) {
            let mime = field.content_type().map(ToString::to_string);
            let data = field.bytes().await.map_err(|e| {
                api_error(
                    StatusCode::BAD_REQUEST,
                    format!("Failed to read file bytes: {}", e),
                )
            })?;
            upload = Some((mime, data));
            break;
        }
    }

    let (mime, data) = upload.ok_or_else(|| {
        api_error(
            StatusCode::BAD_REQUEST,
            "Bad Request: Missing file in the request.",
        )
    })?;
    if data.is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Bad Request: Missing file in the request.",
        ));
    }

    let analyses = match UploadKind::resolve(mime.as_deref(), data) {
        UploadKind::Pdf { data } => analyze_pdf(&state, data).await?,
        UploadKind::Image { data, mime } => analyze_single_image(&state, data, mime).await?,
        UploadKind::Unsupported { mime } => {
            warn!("Rejected upload with unsupported type: {}", mime);
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                "Bad Request: Invalid file type. Only images and PDFs are supported.",
            ));
        }
    };

    let total_pages = analyses.len() as u32;
    let mut totals = TokenUsage::default();
    for page in &analyses {
        totals.accumulate(&page.usage);
    }
    let cost = VISION_RATES.estimate(&totals);

    info!(
        "Overall token usage: pages={}, inputTokens={}, outputTokens={}, totalTokens={}, inputCost={}, outputCost={}, totalCost={}",
        total_pages,
        totals.prompt_tokens,
        totals.completion_tokens,
        totals.prompt_tokens + totals.completion_tokens,
        format_dollars(cost.input_cost),
        format_dollars(cost.output_cost),
        format_dollars(cost.total()),
    );

    Ok(Json(AnalyzeDocumentResponse {
        analyses,
        total_pages,
        overall_usage: OverallUsage {
            input_tokens: totals.prompt_tokens,
            output_tokens: totals.completion_tokens,
            total_tokens: totals.prompt_tokens + totals.completion_tokens,
            input_cost: format_dollars(cost.input_cost),
            output_cost: format_dollars(cost.output_cost),
            total_cost: format_dollars(cost.total()),
        },
    }))
}

//=========================================================================================
// Per-variant processing
//=========================================================================================

/// Rasterizes every PDF page and fans out one extraction call per page.
/// Any failure aborts the whole request; the temp file is removed on every
/// path because the guard deletes it on drop.
async fn analyze_pdf(
    state: &AppState,
    data: Bytes,
) -> Result<Vec<PageAnalysisResult>, ApiFailure> {
    let temp = tempfile::Builder::new()
        .prefix("sintgpt-upload-")
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| {
            error!("Failed to create temp PDF file: {}", e);
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error processing PDF document.",
            )
        })?;

    tokio::fs::write(temp.path(), &data).await.map_err(|e| {
        error!("Failed to write temp PDF file: {}", e);
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Error processing PDF document.",
        )
    })?;

    let pages = state.rasterizer.rasterize_pdf(temp.path()).await.map_err(|e| {
        error!("Error processing PDF: {}", e);
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Error processing PDF document.",
        )
    })?;

    let total_pages = pages.len() as u32;
    if total_pages == 0 {
        warn!("PDF has 0 pages.");
        return Ok(Vec::new());
    }

    let page_tasks = pages.into_iter().enumerate().map(|(index, png)| {
        let page_number = index as u32 + 1;
        let adapter = state.extraction_adapter.clone();
        async move {
            info!(
                "Processing PDF page {} of {} (parallel)...",
                page_number, total_pages
            );
            let (analysis, usage) = adapter
                .analyze_page(&png, "image/png", page_number, total_pages)
                .await?;
            Ok::<_, PortError>(PageAnalysisResult {
                page_number,
                analysis,
                usage,
            })
        }
    });

    let mut results = try_join_all(page_tasks).await.map_err(|e| {
        error!("Error processing PDF: {}", e);
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Error processing PDF document.",
        )
    })?;

    // Pages complete in arbitrary order; the caller always sees them by
    // page number.
    results.sort_by_key(|result| result.page_number);
    Ok(results)
}

/// Treats a plain image upload as a single page.
async fn analyze_single_image(
    state: &AppState,
    data: Bytes,
    mime: String,
) -> Result<Vec<PageAnalysisResult>, ApiFailure> {
    info!("Sending image to the vision model for analysis...");
    let (analysis, usage) = state
        .extraction_adapter
        .analyze_page(&data, &mime, 1, 1)
        .await
        .map_err(|e| {
            error!("Error processing document analysis request: {}", e);
            match e {
                PortError::Provider { status, message } => api_error(
                    provider_status(status),
                    format!("AI API Error: {}", message),
                ),
                PortError::MalformedResponse(_) => api_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "AI failed to generate an analysis matching the required format.",
                ),
                _ => api_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error: Could not analyze document.",
                ),
            }
        })?;

    Ok(vec![PageAnalysisResult {
        page_number: 1,
        analysis,
        usage,
    }])
}
