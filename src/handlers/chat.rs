use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::services::ai::ChatMessage;
use crate::{errors::ServiceError, ApiResponse, AppState};

const ADMIN_ASSISTANT_PROMPT: &str = "You are the AutoWorx Virtual AI Assistant. You are friendly, \
helpful, and speak like a real human. Your goal is to help users with repair status and car \
questions. CRITICAL: Do NOT use markdown symbols. No asterisks, no hashes, no bullet points with \
symbols. Just use plain text, natural paragraphs, and clear sentences. Communicate like a helpful \
person, not a bot writing code.";

const CUSTOMER_ASSISTANT_PROMPT: &str = "You are the Autoworx AI Assistant, a friendly and \
experienced auto shop expert. Your goal is to assist customers visiting the Autoworx Repairs & \
Gen. Merchandise website.

WHO YOU ARE:
- You are helpful, professional, yet warm and local to Cagayan de Oro.
- You know about cars and can give basic advice (e.g., explaining why a car might be squeaking).
- You promote Autoworx services: Tinsmith (body work), Painting, Detailing, Alignment, Glassworks, and General Mechanical repairs.

SHOP INFO:
- Phone: 0936-354-9603
- Email: autoworxcagayan2025@gmail.com
- Location: Cagayan de Oro City.
- We specialise in all car brands (Toyota, Mitsubishi, Ford, etc.)

YOUR MISSION:
1. Answer customer questions about car issues and our services.
2. If they seem interested in a repair, encourage them to \"Book an Appointment\" using the button on the site.
3. If they have an existing repair, they can use their \"Tracking Code\" on the Tracking page.

CRITICAL STYLE RULES:
- NO MARKDOWN. Do not use bold, headers, or bullets.
- Use plain text only.
- Sound like a human talking, not a robot.
- Keep responses relatively concise but helpful.";

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChatReply {
    pub message: String,
}

async fn run_chat(
    state: &AppState,
    system_prompt: &str,
    messages: Vec<ChatMessage>,
) -> Result<Json<ApiResponse<ChatReply>>, ServiceError> {
    if messages.is_empty() {
        return Err(ServiceError::ValidationError(
            "Messages array is required".to_string(),
        ));
    }

    let mut full_messages = Vec::with_capacity(messages.len() + 1);
    full_messages.push(ChatMessage::system(system_prompt));
    full_messages.extend(messages);

    let reply = state.services.ai.chat(&full_messages).await?;

    Ok(Json(ApiResponse::success(ChatReply { message: reply })))
}

/// Dashboard mini-chatbot (public, same assistant the admin widget embeds)
pub async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ApiResponse<ChatReply>>, ServiceError> {
    run_chat(&state, ADMIN_ASSISTANT_PROMPT, body.messages).await
}

/// Customer-facing website chat bubble (public)
pub async fn customer_chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ApiResponse<ChatReply>>, ServiceError> {
    run_chat(&state, CUSTOMER_ASSISTANT_PROMPT, body.messages).await
}
