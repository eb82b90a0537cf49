//! Local HTTP listener for the OAuth redirect.
//!
//! The provider redirects the browser to `http://localhost:<port>/callback`
//! with `code`/`state` (or `error`) in the query. This server accepts that
//! one request, answers with a small HTML page, and hands the raw query
//! string to the caller for [`complete_authorization`].
//!
//! [`complete_authorization`]: crate::SessionManager::complete_authorization

use crate::error::{SessionError, SessionResult};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, error, info};

/// Default redirect port.
pub const DEFAULT_CALLBACK_PORT: u16 = 8237;

/// Default wall-clock timeout for the redirect.
pub const DEFAULT_CALLBACK_TIMEOUT_SECS: u64 = 180;

/// One-shot server for the provider redirect.
pub struct CallbackServer {
    port: u16,
    timeout_secs: u64,
}

impl CallbackServer {
    pub fn new(port: u16, timeout_secs: u64) -> Self {
        Self { port, timeout_secs }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_CALLBACK_PORT, DEFAULT_CALLBACK_TIMEOUT_SECS)
    }

    /// The redirect URI to register with the provider and to pass to both
    /// halves of the authorization flow.
    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}/callback", self.port)
    }

    /// Wait for the provider redirect and return its raw query string.
    ///
    /// The caller is responsible for opening the browser at the authorize
    /// URL first. Times out with [`SessionError::CallbackTimeout`].
    pub async fn wait_for_redirect(&self) -> SessionResult<String> {
        let addr = format!("127.0.0.1:{}", self.port);
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            SessionError::OAuth(format!("Failed to bind callback server on {addr}: {e}"))
        })?;

        info!(port = self.port, "Callback server listening");

        let (tx, rx) = oneshot::channel::<String>();
        let tx = Arc::new(tokio::sync::Mutex::new(Some(tx)));

        let server_handle = tokio::spawn({
            let tx = tx.clone();
            async move {
                loop {
                    match listener.accept().await {
                        Ok((mut socket, _)) => {
                            let tx = tx.clone();
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(&mut socket, tx).await {
                                    error!("Error handling callback connection: {}", e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                            break;
                        }
                    }
                }
            }
        });

        let timeout = tokio::time::Duration::from_secs(self.timeout_secs);
        let result = match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(query)) => Ok(query),
            Ok(Err(_)) => Err(SessionError::OAuth("Callback channel closed".to_string())),
            Err(_) => Err(SessionError::CallbackTimeout),
        };

        server_handle.abort();
        result
    }
}

/// Extract the query string from a `GET /callback?... HTTP/1.1` request
/// line. `None` for anything that is not a callback request.
fn callback_query(request_line: &str) -> Option<&str> {
    let path = request_line
        .strip_prefix("GET ")?
        .split(" HTTP/")
        .next()?;
    if !path.starts_with("/callback") {
        return None;
    }
    Some(path.split_once('?').map(|(_, query)| query).unwrap_or(""))
}

async fn handle_connection(
    socket: &mut tokio::net::TcpStream,
    tx: Arc<tokio::sync::Mutex<Option<oneshot::Sender<String>>>>,
) -> SessionResult<()> {
    let (reader, mut writer) = socket.split();
    let mut reader = BufReader::new(reader);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    debug!(request = %request_line.trim(), "Received callback request");

    let Some(query) = callback_query(&request_line) else {
        send_response(&mut writer, 404, "Not Found", "Not Found").await?;
        return Ok(());
    };

    let page = if query.contains("error=") {
        error_page()
    } else {
        success_page()
    };
    send_response(&mut writer, 200, "OK", &page).await?;

    if let Some(tx) = tx.lock().await.take() {
        let _ = tx.send(query.to_string());
    }

    Ok(())
}

async fn send_response(
    writer: &mut tokio::net::tcp::WriteHalf<'_>,
    status_code: u16,
    status_text: &str,
    body: &str,
) -> SessionResult<()> {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_code,
        status_text,
        body.len(),
        body
    );
    writer.write_all(response.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

fn success_page() -> String {
    r#"<!DOCTYPE html>
<html>
<head><title>Sign-in received</title></head>
<body style="font-family: system-ui; text-align: center; padding: 50px;">
<h1>Almost there</h1>
<p>You can close this window and return to the terminal.</p>
<script>setTimeout(() => window.close(), 2000);</script>
</body>
</html>"#
        .to_string()
}

fn error_page() -> String {
    r#"<!DOCTYPE html>
<html>
<head><title>Sign-in failed</title></head>
<body style="font-family: system-ui; text-align: center; padding: 50px;">
<h1>Sign-in failed</h1>
<p>You can close this window and try again from the terminal.</p>
</body>
</html>"#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_uri() {
        let server = CallbackServer::new(8237, 180);
        assert_eq!(server.redirect_uri(), "http://localhost:8237/callback");
    }

    #[test]
    fn test_callback_query_extraction() {
        assert_eq!(
            callback_query("GET /callback?code=abc&state=xyz HTTP/1.1\r\n"),
            Some("code=abc&state=xyz")
        );
        assert_eq!(callback_query("GET /callback HTTP/1.1\r\n"), Some(""));
        assert_eq!(callback_query("GET /favicon.ico HTTP/1.1\r\n"), None);
        assert_eq!(callback_query("POST /callback HTTP/1.1\r\n"), None);
    }

    #[tokio::test]
    async fn test_timeout_without_redirect() {
        let server = CallbackServer::new(18237, 0);
        let result = server.wait_for_redirect().await;
        assert!(matches!(result, Err(SessionError::CallbackTimeout)));
    }
}
