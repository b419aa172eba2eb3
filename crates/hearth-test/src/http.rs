//! One-shot HTTP responder for REST client tests.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A local HTTP server that answers exactly one request.
#[derive(Debug)]
pub struct MockHttpServer {
    base_url: String,
    task: JoinHandle<String>,
}

impl MockHttpServer {
    /// Bind to a free port and answer the first request with `status` and
    /// a JSON `body`.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn serve_once(status: u16, body: impl Into<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind local port");
        let addr = listener.local_addr().expect("local address");
        let body = body.into();

        let task = tokio::spawn(async move {
            let Ok((mut socket, _)) = listener.accept().await else {
                return String::new();
            };
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status} Mock\r\ncontent-type: application/json\r\n\
                 content-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
            request
        });

        Self {
            base_url: format!("http://{addr}"),
            task,
        }
    }

    /// Base URL of the server, e.g. `http://127.0.0.1:1234`.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Wait for the request to be served and return its raw text.
    ///
    /// # Panics
    ///
    /// Panics if the server task panicked.
    pub async fn request(self) -> String {
        self.task.await.expect("mock HTTP server task")
    }
}

/// Read headers and, if announced, the body.
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let Ok(read) = socket.read(&mut chunk).await else {
            break;
        };
        if read == 0 {
            break;
        }
        buf.extend_from_slice(chunk.get(..read).unwrap_or_default());
        if request_complete(&buf) {
            break;
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn request_complete(buf: &[u8]) -> bool {
    let text = String::from_utf8_lossy(buf);
    let Some((head, body)) = text.split_once("\r\n\r\n") else {
        return false;
    };
    let length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    body.len() >= length
}
