// =============================================================================
// EMBED ROUTES - Widget config, script and streaming endpoint
// =============================================================================
//
// The embed widget is a self-contained script third-party sites load from
// /embed.js. It talks back to /api/embed/stream, which is locked down two
// ways: an origin/referer allow-list (relaxed in development) and an embed
// key that must match EMBED_API_KEY.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use crate::http::error::ApiError;
use crate::http::sse::sse_response;
use crate::http::state::AppState;

use super::{check_rate_limit, parse_messages};

/// Domains allowed to call the embed streaming endpoint.
const ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "https://az-1.info",
    "https://www.az-1.info",
];

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Prefix match against the allow-list; development mode allows everything.
fn origin_allowed(origin: Option<&str>, referer: Option<&str>, is_development: bool) -> bool {
    if is_development {
        return true;
    }
    ALLOWED_ORIGINS.iter().any(|allowed| {
        origin.is_some_and(|o| o.starts_with(allowed))
            || referer.is_some_and(|r| r.starts_with(allowed))
    })
}

/// GET /api/embed/config - widget configuration.
///
/// The `domain` query parameter is accepted but not yet validated against a
/// per-customer registry.
pub async fn config(
    State(state): State<Arc<AppState>>,
    Query(_params): Query<HashMap<String, String>>,
) -> Response {
    let body = json!({
        "apiEndpoint": state.settings.embed_stream_endpoint(),
        "theme": {
            "primaryColor": "#00797D",
            "secondaryColor": "#634B7B",
            "backgroundColor": "#ffffff",
            "textColor": "#1a1a1a",
        },
        "ui": {
            "position": "bottom-right",
            "zIndex": 999999,
            "borderRadius": "12px",
            "shadow": "0 10px 40px rgba(0,0,0,0.1)",
        },
        "messages": {
            "welcomeMessage": "Hi! I'm your Arizona Digital Navigator. How can I help you with broadband and digital skills today?",
            "placeholder": "Type your message here...",
            "sendButton": "Send",
        },
        "features": {
            "allowFileUpload": false,
            "enableVoice": true,
            "showTypingIndicator": true,
            "enableMarkdown": true,
        },
    });

    (
        [(header::CACHE_CONTROL, "public, max-age=3600")],
        Json(body),
    )
        .into_response()
}

/// POST /api/embed/stream - SSE chat for embedded widgets.
pub async fn stream(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    let origin = header_str(&headers, header::ORIGIN);
    let referer = header_str(&headers, header::REFERER);

    if !origin_allowed(
        origin.as_deref(),
        referer.as_deref(),
        state.settings.environment.is_development(),
    ) {
        return Err(ApiError::Forbidden {
            message: "This domain is not authorized to use the embed widget".to_string(),
        });
    }

    let embed_key = body.get("embedKey").and_then(Value::as_str).unwrap_or("");
    if embed_key.is_empty() || embed_key != state.settings.embed_api_key {
        return Err(ApiError::Unauthorized {
            message: "Invalid API key for embed usage".to_string(),
        });
    }

    let messages = parse_messages(&body)?;

    check_rate_limit(&state.limiter, |wait| {
        format!("Please wait {wait} before sending another message.")
    })?;

    tracing::info!(
        count = messages.len(),
        origin = origin.as_deref().unwrap_or("-"),
        "processing embed streaming request"
    );

    let remaining = state.limiter.remaining_requests();
    let events = state.chat.stream(messages, remaining);
    Ok(sse_response(
        events,
        Some(origin.unwrap_or_else(|| "*".to_string())),
    ))
}

/// OPTIONS /api/embed/stream - CORS preflight.
pub async fn preflight(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let origin = header_str(&headers, header::ORIGIN);

    if !origin_allowed(
        origin.as_deref(),
        None,
        state.settings.environment.is_development(),
    ) {
        return StatusCode::FORBIDDEN.into_response();
    }

    let allow_origin = origin
        .as_deref()
        .and_then(|o| HeaderValue::from_str(o).ok())
        .unwrap_or_else(|| HeaderValue::from_static("*"));

    let mut response = StatusCode::OK.into_response();
    let response_headers = response.headers_mut();
    response_headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin);
    response_headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    response_headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response_headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static("86400"),
    );
    response
}

/// GET /embed.js - the self-contained widget script with the endpoints and
/// embed key inlined at serve time.
pub async fn script(State(state): State<Arc<AppState>>) -> Response {
    let script = EMBED_SCRIPT_TEMPLATE
        .replace("__API_ENDPOINT__", &state.settings.embed_stream_endpoint())
        .replace(
            "__CONFIG_ENDPOINT__",
            &state.settings.embed_config_endpoint(),
        )
        .replace("__EMBED_KEY__", &state.settings.embed_api_key);

    (
        [
            (header::CONTENT_TYPE, "application/javascript"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        script,
    )
        .into_response()
}

const EMBED_SCRIPT_TEMPLATE: &str = r#"
(function() {
  'use strict';

  // Configuration
  const CONFIG = {
    apiEndpoint: '__API_ENDPOINT__',
    configEndpoint: '__CONFIG_ENDPOINT__',
    embedKey: '__EMBED_KEY__',
  };

  // Check if already loaded
  if (window.AZ1ChatbotLoaded) return;
  window.AZ1ChatbotLoaded = true;

  let isOpen = false;
  let messages = [];

  // Default configuration (can be overridden by window.AZ1ChatbotConfig)
  const defaultConfig = {
    position: 'right',
    welcomeMessage: "Hi! I'm your Arizona Digital Navigator. How can I help you with broadband and digital skills today?",
    placeholder: 'Type your message here...',
    primaryColor: '#00797D',
    secondaryColor: '#634B7B',
  };
  const config = { ...defaultConfig, ...(window.AZ1ChatbotConfig || {}) };

  const styles = `
    #az1-chatbot-widget {
      position: fixed;
      bottom: 20px;
      ${config.position === 'left' ? 'left: 20px;' : 'right: 20px;'}
      z-index: 999999;
      font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
    }
    #az1-chatbot-button {
      width: 60px;
      height: 60px;
      border-radius: 50%;
      background: linear-gradient(135deg, ${config.primaryColor}, ${config.secondaryColor});
      border: none;
      cursor: pointer;
      box-shadow: 0 4px 20px rgba(0,0,0,0.15);
      color: white;
      font-size: 24px;
    }
    #az1-chatbot-container {
      position: absolute;
      bottom: 80px;
      ${config.position === 'left' ? 'left: 0;' : 'right: 0;'}
      width: 350px;
      height: 500px;
      background: white;
      border-radius: 12px;
      box-shadow: 0 10px 40px rgba(0,0,0,0.15);
      display: none;
      flex-direction: column;
      overflow: hidden;
    }
    #az1-chatbot-header {
      background: linear-gradient(135deg, ${config.primaryColor}, ${config.secondaryColor});
      color: white;
      padding: 15px 20px;
      font-weight: 600;
      display: flex;
      justify-content: space-between;
      align-items: center;
    }
    #az1-chatbot-messages {
      flex: 1;
      overflow-y: auto;
      padding: 20px;
      display: flex;
      flex-direction: column;
      gap: 15px;
    }
    .az1-message {
      max-width: 80%;
      padding: 12px 16px;
      border-radius: 18px;
      word-wrap: break-word;
    }
    .az1-message.user {
      background: ${config.primaryColor};
      color: white;
      align-self: flex-end;
    }
    .az1-message.assistant {
      background: #f1f1f1;
      color: #333;
      align-self: flex-start;
    }
    #az1-chatbot-input-container {
      padding: 15px 20px;
      border-top: 1px solid #eee;
      display: flex;
      gap: 10px;
    }
    #az1-chatbot-input {
      flex: 1;
      border: 1px solid #ddd;
      border-radius: 20px;
      padding: 10px 15px;
      outline: none;
      font-size: 14px;
    }
    #az1-chatbot-send {
      background: ${config.primaryColor};
      color: white;
      border: none;
      border-radius: 50%;
      width: 40px;
      height: 40px;
      cursor: pointer;
      font-size: 16px;
    }
  `;

  const styleSheet = document.createElement('style');
  styleSheet.textContent = styles;
  document.head.appendChild(styleSheet);

  const widgetHTML = `
    <div id="az1-chatbot-widget">
      <button id="az1-chatbot-button" aria-label="Open chat">&#128172;</button>
      <div id="az1-chatbot-container">
        <div id="az1-chatbot-header">
          <span>Arizona Digital Navigator</span>
          <button id="az1-chatbot-close" aria-label="Close chat">&times;</button>
        </div>
        <div id="az1-chatbot-messages"></div>
        <div id="az1-chatbot-input-container">
          <input type="text" id="az1-chatbot-input" placeholder="${config.placeholder}" />
          <button id="az1-chatbot-send" aria-label="Send message">&rarr;</button>
        </div>
      </div>
    </div>
  `;
  document.body.insertAdjacentHTML('beforeend', widgetHTML);

  const button = document.getElementById('az1-chatbot-button');
  const container = document.getElementById('az1-chatbot-container');
  const closeBtn = document.getElementById('az1-chatbot-close');
  const messagesDiv = document.getElementById('az1-chatbot-messages');
  const input = document.getElementById('az1-chatbot-input');
  const sendBtn = document.getElementById('az1-chatbot-send');

  function toggleChat() {
    isOpen = !isOpen;
    container.style.display = isOpen ? 'flex' : 'none';
    if (isOpen && messages.length === 0) {
      addMessage('assistant', config.welcomeMessage);
    }
    if (isOpen) input.focus();
  }

  function addMessage(role, content) {
    messages.push({ role, content });
    const messageDiv = document.createElement('div');
    messageDiv.className = `az1-message ${role}`;
    messageDiv.textContent = content;
    messagesDiv.appendChild(messageDiv);
    messagesDiv.scrollTop = messagesDiv.scrollHeight;
  }

  async function sendMessage() {
    const message = input.value.trim();
    if (!message) return;

    input.value = '';
    addMessage('user', message);

    try {
      const response = await fetch(CONFIG.apiEndpoint, {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: JSON.stringify({ messages: messages, embedKey: CONFIG.embedKey })
      });

      if (!response.ok) {
        throw new Error(`HTTP error! status: ${response.status}`);
      }

      const reader = response.body.getReader();
      const decoder = new TextDecoder();
      let assistantMessage = '';
      let assistantDiv = null;

      while (true) {
        const { done, value } = await reader.read();
        if (done) break;

        const chunk = decoder.decode(value);
        for (const line of chunk.split('\n')) {
          if (!line.startsWith('data: ')) continue;
          const payload = line.slice(6);
          if (payload === '[DONE]') continue;
          try {
            const data = JSON.parse(payload);
            if (data.text) {
              assistantMessage += data.text;
              if (!assistantDiv) {
                addMessage('assistant', assistantMessage);
                assistantDiv = messagesDiv.lastElementChild;
              } else {
                assistantDiv.textContent = assistantMessage;
                messages[messages.length - 1].content = assistantMessage;
              }
              messagesDiv.scrollTop = messagesDiv.scrollHeight;
            } else if (data.error) {
              addMessage('assistant', data.message);
            }
          } catch (e) {
            // Ignore JSON parse errors for incomplete chunks
          }
        }
      }
    } catch (error) {
      console.error('Chat error:', error);
      addMessage('assistant', 'Sorry, I encountered an error. Please try again.');
    }
  }

  button.addEventListener('click', toggleChat);
  closeBtn.addEventListener('click', toggleChat);
  sendBtn.addEventListener('click', sendMessage);
  input.addEventListener('keypress', (e) => {
    if (e.key === 'Enter') sendMessage();
  });
})();
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_allowed_by_prefix() {
        assert!(origin_allowed(Some("https://az-1.info"), None, false));
        assert!(origin_allowed(
            Some("https://www.az-1.info/some/page"),
            None,
            false
        ));
        assert!(!origin_allowed(Some("https://evil.example"), None, false));
    }

    #[test]
    fn test_referer_is_checked_too() {
        assert!(origin_allowed(
            None,
            Some("http://localhost:3000/widget"),
            false
        ));
        assert!(!origin_allowed(None, None, false));
    }

    #[test]
    fn test_development_allows_everything() {
        assert!(origin_allowed(Some("https://evil.example"), None, true));
        assert!(origin_allowed(None, None, true));
    }

    #[test]
    fn test_script_template_placeholders() {
        assert!(EMBED_SCRIPT_TEMPLATE.contains("__API_ENDPOINT__"));
        assert!(EMBED_SCRIPT_TEMPLATE.contains("__EMBED_KEY__"));
        assert!(EMBED_SCRIPT_TEMPLATE.contains("[DONE]"));
    }
}
