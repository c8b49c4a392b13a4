//! Fingerprinting, resolution, reconciliation and downloads

mod download;
mod engine;
mod error;
mod reconcile;
mod resolve;
mod scan;

pub use download::{is_plain_filename, Downloader, FileTransfer, TransferState};
pub use engine::{InstallReport, SyncEngine, UpgradeOutcome, UpgradeReport};
pub use error::{SyncError, SyncResult};
pub use reconcile::{reconcile, reconcile_with, Reconciliation};
pub use resolve::{hit_matches, installable_files, is_compatible, resolve, SOURCES_TOKEN};
pub use scan::{hash_file, scan_directory, FileHash, HashAlgorithm};

/// Minimal HTTP/1.1 server for transfer tests
#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve canned replies per path and return the base url.
    ///
    /// Each path answers with its replies in order; the last one repeats.
    /// Unknown paths get a 404.
    pub(crate) async fn serve(routes: Vec<(&str, Vec<(u16, Vec<u8>)>)>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let routes: HashMap<String, Vec<(u16, Vec<u8>)>> = routes
            .into_iter()
            .map(|(path, replies)| (path.to_string(), replies))
            .collect();
        let routes = Arc::new(Mutex::new(routes));

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let routes = routes.clone();
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&buf[..n]),
                        }
                    }

                    let head = String::from_utf8_lossy(&request);
                    let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();

                    let (status, body) = {
                        let mut routes = routes.lock().unwrap();
                        match routes.get_mut(&path) {
                            Some(replies) if replies.len() > 1 => replies.remove(0),
                            Some(replies) if !replies.is_empty() => replies[0].clone(),
                            _ => (404, b"not found".to_vec()),
                        }
                    };

                    let header = format!(
                        "HTTP/1.1 {} X\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        status,
                        body.len()
                    );
                    let _ = socket.write_all(header.as_bytes()).await;
                    let _ = socket.write_all(&body).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        format!("http://{}", addr)
    }
}
