//! Live reload over WebSocket

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ServerState;
use crate::bundler::CompileStats;

pub const LIVE_RELOAD_PATH: &str = "/__webpacker_live";

/// Messages pushed to the pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ReloadMessage {
    Connected,

    /// A compile succeeded
    Reload { hash: String },

    /// A compile finished with errors; the page stays as it is
    Errors { messages: Vec<String> },
}

impl ReloadMessage {
    pub fn from_stats(stats: &CompileStats) -> Self {
        if stats.has_errors() {
            ReloadMessage::Errors {
                messages: stats.errors.clone(),
            }
        } else {
            ReloadMessage::Reload {
                hash: stats.hash.clone(),
            }
        }
    }
}

const CLIENT_SCRIPT: &str = r#"
<script>
(function() {
  var ws = new WebSocket((location.protocol === 'https:' ? 'wss://' : 'ws://') + location.host + '/__webpacker_live');

  ws.onmessage = function(event) {
    var message = JSON.parse(event.data);

    switch (message.type) {
      case 'reload':
        location.reload();
        break;

      case 'errors':
        message.messages.forEach(function(m) { console.error('[webpacker]', m); });
        break;

      case 'connected':
        console.log('[webpacker] live reload connected');
        break;
    }
  };

  ws.onclose = function() {
    console.log('[webpacker] disconnected, reloading when the server is back...');
    setTimeout(function() { location.reload(); }, 1000);
  };
})();
</script>
"#;

/// Insert the client script before `</body>`, or append it
pub fn inject_client(html: &str) -> String {
    if let Some(pos) = html.rfind("</body>") {
        let mut result = html.to_string();
        result.insert_str(pos, CLIENT_SCRIPT);
        result
    } else {
        format!("{}{}", html, CLIENT_SCRIPT)
    }
}

pub(super) async fn websocket(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<ServerState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut reload_rx = state.reload_tx.subscribe();

    if let Ok(json) = serde_json::to_string(&ReloadMessage::Connected) {
        let _ = sender.send(Message::Text(json)).await;
    }
    debug!("Live reload client connected");

    let mut send_task = tokio::spawn(async move {
        while let Ok(message) = reload_rx.recv().await {
            let Ok(json) = serde_json::to_string(&message) else {
                continue;
            };
            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            if let Message::Close(_) = message {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    debug!("Live reload client disconnected");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::bundler::Mode;

    #[test]
    fn test_inject_before_body_end() {
        let html = inject_client("<html><body><p>x</p></body></html>");

        let script = html.find(LIVE_RELOAD_PATH).unwrap();
        assert!(script > html.find("<p>x</p>").unwrap());
        assert!(script < html.find("</body>").unwrap());
    }

    #[test]
    fn test_inject_without_body() {
        let html = inject_client("<p>fragment</p>");
        assert!(html.starts_with("<p>fragment</p>"));
        assert!(html.contains(LIVE_RELOAD_PATH));
    }

    #[test]
    fn test_message_from_stats() {
        let ok = CompileStats::new(Mode::Development, vec![], vec![], vec![], Duration::ZERO);
        assert_eq!(
            ReloadMessage::from_stats(&ok),
            ReloadMessage::Reload {
                hash: ok.hash.clone()
            }
        );

        let failed = CompileStats::new(
            Mode::Development,
            vec![],
            vec!["js/app.js: syntax error".to_string()],
            vec![],
            Duration::ZERO,
        );
        assert_eq!(
            serde_json::to_value(ReloadMessage::from_stats(&failed)).unwrap(),
            serde_json::json!({ "type": "errors", "messages": ["js/app.js: syntax error"] })
        );
    }
}
