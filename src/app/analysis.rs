//! Analysis request logic

use super::App;
use crate::types::*;
use crate::utils::{mime_for_path, resolve_prediction_url};
use eframe::egui;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

fn fail(state: &Arc<Mutex<AnalysisState>>, ctx: &egui::Context, error: AnalysisError) {
    state.lock().unwrap().phase = AnalysisPhase::Failed(error);
    ctx.request_repaint();
}

/// POST the image to `/predict`, then fetch the result image the response
/// points at. All outcomes land in the shared state; the UI thread decodes.
async fn run_analysis(
    image_path: PathBuf,
    file_name: String,
    server_url: String,
    state: Arc<Mutex<AnalysisState>>,
    ctx: egui::Context,
) {
    let bytes = match std::fs::read(&image_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, path = %image_path.display(), "Failed to read image file");
            fail(&state, &ctx, AnalysisError::Connection(e.to_string()));
            return;
        }
    };

    let mime = mime_for_path(&image_path);
    let part = match reqwest::multipart::Part::bytes(bytes)
        .file_name(file_name)
        .mime_str(mime)
    {
        Ok(part) => part,
        Err(e) => {
            warn!(error = %e, mime, "Failed to build multipart body");
            fail(&state, &ctx, AnalysisError::Connection(e.to_string()));
            return;
        }
    };
    let form = reqwest::multipart::Form::new().part("image", part);

    let client = reqwest::Client::new();
    let predict_url = format!("{}{}", server_url, crate::constants::PREDICT_ROUTE);
    debug!(url = %predict_url, "Sending prediction request");

    let response = match client.post(&predict_url).multipart(form).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, url = %predict_url, "Prediction request failed");
            fail(&state, &ctx, AnalysisError::Connection(e.to_string()));
            return;
        }
    };

    let status = response.status();
    // A body that does not parse reads as a broken server, not a prediction miss.
    let parsed = match response.json::<PredictResponse>().await {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(error = %e, %status, "Prediction response was not usable JSON");
            fail(&state, &ctx, AnalysisError::Connection(e.to_string()));
            return;
        }
    };

    let prediction_path = match parsed.prediction_path {
        Some(path) => path,
        None => {
            warn!(%status, server_error = ?parsed.error, "Response carried no prediction_path");
            fail(&state, &ctx, AnalysisError::NoPrediction);
            return;
        }
    };

    let result_url = resolve_prediction_url(&server_url, &prediction_path);
    info!(url = %result_url, "Prediction ready, fetching result image");
    state.lock().unwrap().phase = AnalysisPhase::Fetching;
    ctx.request_repaint();

    match client.get(&result_url).send().await {
        Ok(response) if response.status().is_success() => {
            let total_size = response.content_length().unwrap_or(0);
            let mut bytes_vec = Vec::with_capacity(total_size as usize);
            let mut stream = response.bytes_stream();

            while let Some(chunk) = stream.next().await {
                match chunk {
                    Ok(data) => bytes_vec.extend_from_slice(&data),
                    Err(e) => {
                        warn!(error = %e, url = %result_url, "Result image stream failed");
                        fail(&state, &ctx, AnalysisError::Connection(e.to_string()));
                        return;
                    }
                }
            }

            info!(bytes = bytes_vec.len(), "Result image fetched");
            state.lock().unwrap().phase = AnalysisPhase::Done {
                result_url,
                bytes: bytes_vec,
            };
            ctx.request_repaint();
        }
        Ok(response) => {
            warn!(status = %response.status(), url = %result_url, "Result image fetch rejected");
            fail(
                &state,
                &ctx,
                AnalysisError::Connection(format!("HTTP {}", response.status())),
            );
        }
        Err(e) => {
            warn!(error = %e, url = %result_url, "Result image fetch failed");
            fail(&state, &ctx, AnalysisError::Connection(e.to_string()));
        }
    }
}

impl App {
    /// Kick off the one outstanding analysis for the selected image.
    pub fn start_analysis(&mut self, ctx: &egui::Context) {
        let Some(selected) = self.selected_image.clone() else {
            return;
        };
        if self.analysis.lock().unwrap().in_flight() {
            return;
        }

        info!(file = %selected.path.display(), "Starting analysis");

        self.error_message = None;
        self.result_texture = None;
        self.result_url = None;
        self.result_bytes = None;
        self.progress = Some(crate::app::progress::SyntheticProgress::start());
        self.analysis.lock().unwrap().phase = AnalysisPhase::Uploading;

        let state = self.analysis.clone();
        let ctx = ctx.clone();
        let server_url = self.server_url_normalized();
        let file_name = selected.file_name.clone();
        self.runtime.spawn(async move {
            run_analysis(selected.path, file_name, server_url, state, ctx).await;
        });
    }

    /// Drain the shared state: decode finished results, surface failures.
    /// Runs every frame on the UI thread, which owns all texture creation.
    pub fn poll_analysis(&mut self, ctx: &egui::Context) {
        let settled = {
            let mut s = self.analysis.lock().unwrap();
            match s.phase {
                AnalysisPhase::Done { .. } | AnalysisPhase::Failed(_) => {
                    Some(std::mem::take(&mut s.phase))
                }
                _ => None,
            }
        };

        let Some(phase) = settled else {
            return;
        };

        if let Some(progress) = &mut self.progress {
            progress.finish();
        }

        match phase {
            AnalysisPhase::Done { result_url, bytes } => {
                match image::load_from_memory(&bytes) {
                    Ok(img) => {
                        let rgba = img.to_rgba8();
                        let size = [rgba.width() as usize, rgba.height() as usize];
                        let pixels = rgba.into_raw();
                        let texture = ctx.load_texture(
                            "segmentation_result",
                            egui::ColorImage::from_rgba_unmultiplied(size, &pixels),
                            egui::TextureOptions::LINEAR,
                        );
                        info!(url = %result_url, width = size[0], height = size[1], "Result displayed");
                        self.result_texture = Some(texture);
                        self.result_url = Some(result_url);
                        self.result_bytes = Some(bytes);
                    }
                    Err(e) => {
                        warn!(error = %e, url = %result_url, "Result image failed to decode");
                        self.error_message =
                            Some(AnalysisError::NoPrediction.user_message().to_string());
                    }
                }
            }
            AnalysisPhase::Failed(error) => {
                self.error_message = Some(error.user_message().to_string());
            }
            _ => {}
        }
        ctx.request_repaint();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};

    /// Serves one canned response per incoming connection, in order, and
    /// returns the request heads it saw.
    fn spawn_server(
        responses: Vec<(&'static str, String)>,
    ) -> (String, std::thread::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let handle = std::thread::spawn(move || {
            let mut seen = Vec::new();
            for (content_type, body) in responses {
                let (mut stream, _) = listener.accept().unwrap();
                seen.push(read_request(&mut stream));
                let reply = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    content_type,
                    body.len(),
                    body
                );
                stream.write_all(reply.as_bytes()).unwrap();
            }
            seen
        });
        (base_url, handle)
    }

    /// Reads headers plus the Content-Length body, returns the head.
    fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..pos]).to_string();
                let body_len = head
                    .lines()
                    .find_map(|l| l.to_ascii_lowercase().strip_prefix("content-length:").map(str::to_string))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                while buf.len() - (pos + 4) < body_len {
                    let n = stream.read(&mut chunk).unwrap();
                    if n == 0 {
                        break;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                }
                return head;
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    /// Runs the whole request ladder against `server_url` and returns the
    /// settled phase.
    fn run_to_settled(server_url: &str) -> AnalysisPhase {
        let dir = tempfile::tempdir().unwrap();
        let image_path = dir.path().join("leaf.png");
        std::fs::write(&image_path, b"fake image bytes").unwrap();

        let state = Arc::new(Mutex::new(AnalysisState::default()));
        let ctx = egui::Context::default();
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(run_analysis(
            image_path,
            "leaf.png".to_string(),
            server_url.to_string(),
            state.clone(),
            ctx,
        ));
        let phase = std::mem::take(&mut state.lock().unwrap().phase);
        phase
    }

    #[test]
    fn prediction_path_leads_to_result_fetch_from_resolved_url() {
        let (base_url, handle) = spawn_server(vec![
            (
                "application/json",
                r#"{"prediction_path": "/static/predictions/abc.png"}"#.to_string(),
            ),
            ("image/png", "result image bytes".to_string()),
        ]);

        let phase = run_to_settled(&base_url);
        match phase {
            AnalysisPhase::Done { result_url, bytes } => {
                assert_eq!(
                    result_url,
                    format!("{}/static/predictions/abc.png", base_url)
                );
                assert_eq!(bytes, b"result image bytes".to_vec());
            }
            other => panic!("expected Done, got {:?}", other),
        }

        let seen = handle.join().unwrap();
        assert!(seen[0].starts_with("POST /predict "));
        assert!(seen[0].to_ascii_lowercase().contains("multipart/form-data"));
        assert!(seen[1].starts_with("GET /static/predictions/abc.png "));
    }

    #[test]
    fn missing_prediction_path_is_semantic_failure() {
        let (base_url, handle) = spawn_server(vec![(
            "application/json",
            r#"{"error": "No image uploaded"}"#.to_string(),
        )]);

        let phase = run_to_settled(&base_url);
        match phase {
            AnalysisPhase::Failed(error) => {
                assert_eq!(error, AnalysisError::NoPrediction);
                assert_eq!(error.user_message(), "Prediction failed. Try again.");
            }
            other => panic!("expected Failed, got {:?}", other),
        }
        handle.join().unwrap();
    }

    #[test]
    fn non_json_body_is_transport_failure() {
        let (base_url, handle) = spawn_server(vec![(
            "text/html",
            "<html>502 bad gateway</html>".to_string(),
        )]);

        let phase = run_to_settled(&base_url);
        match phase {
            AnalysisPhase::Failed(error) => {
                assert!(matches!(error, AnalysisError::Connection(_)));
                assert_eq!(error.user_message(), "Server Error: Unable to connect.");
            }
            other => panic!("expected Failed, got {:?}", other),
        }
        handle.join().unwrap();
    }

    #[test]
    fn refused_connection_is_transport_failure() {
        // Bind then drop to get a port nothing is listening on.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let phase = run_to_settled(&base_url);
        match phase {
            AnalysisPhase::Failed(error) => {
                assert!(matches!(error, AnalysisError::Connection(_)));
                assert_eq!(error.user_message(), "Server Error: Unable to connect.");
            }
            other => panic!("expected Failed, got {:?}", other),
        }
    }
}
