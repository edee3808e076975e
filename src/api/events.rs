/// WebSocket change feed for the image and publish stores
///
/// Clients receive a full snapshot of each store on connect and again after
/// every mutation. Snapshots come from `watch` channels, so a slow client
/// skips intermediate states and only ever sees the latest one.
///
/// # Protocol
///
/// JSON text frames tagged by `type`:
/// - `info`: connection status and errors
/// - `images`: images, selection, templates and which images have renders
/// - `tasks`: every publish task
use crate::{
    context::AppContext,
    images::{
        models::{Selection, UploadedImage, WatermarkTemplate},
        ImageState,
    },
    publish::{PublishState, PublishTask},
};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use serde::Serialize;
use tokio::time::{interval, timeout, Duration, Instant};

const SEND_TIMEOUT_MS: u64 = 5000; // Timeout for sending a message
const PING_INTERVAL_SECS: u64 = 30; // Send ping every 30 seconds

/// Build event routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/api/events", get(subscribe_events))
}

/// Change feed frame
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EventFrame<'a> {
    Info(InfoEvent),
    Images(ImagesEvent<'a>),
    Tasks(TasksEvent<'a>),
}

#[derive(Debug, Serialize)]
pub struct InfoEvent {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagesEvent<'a> {
    pub images: &'a [UploadedImage],
    pub selected_images: &'a Selection,
    pub templates: &'a [WatermarkTemplate],
    pub current_template: Option<&'a WatermarkTemplate>,
    /// Ids of images that have a watermarked render
    pub processed_images: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct TasksEvent<'a> {
    pub tasks: &'a [PublishTask],
}

impl<'a> From<&'a ImageState> for EventFrame<'a> {
    fn from(state: &'a ImageState) -> Self {
        let mut processed_images: Vec<&str> = state.processed.keys().map(String::as_str).collect();
        processed_images.sort_unstable();

        EventFrame::Images(ImagesEvent {
            images: &state.images,
            selected_images: &state.selected,
            templates: &state.templates,
            current_template: state.current_template.as_ref(),
            processed_images,
        })
    }
}

impl<'a> From<&'a PublishState> for EventFrame<'a> {
    fn from(state: &'a PublishState) -> Self {
        EventFrame::Tasks(TasksEvent {
            tasks: &state.tasks,
        })
    }
}

/// WebSocket handler for the change feed
pub async fn subscribe_events(ws: WebSocketUpgrade, State(ctx): State<AppContext>) -> Response {
    ws.on_upgrade(move |socket| handle_subscription(socket, ctx))
}

async fn handle_subscription(socket: WebSocket, ctx: AppContext) {
    let (mut sender, mut receiver) = socket.split();

    let mut images_rx = ctx.images.subscribe();
    let mut tasks_rx = ctx.publish.subscribe();

    let info = EventFrame::Info(InfoEvent {
        name: "Connected".to_string(),
        message: None,
    });
    if send_frame(&mut sender, &info).await.is_err() {
        return;
    }

    // Initial snapshots
    let images = images_rx.borrow_and_update().clone();
    if send_frame(&mut sender, &EventFrame::from(images.as_ref())).await.is_err() {
        return;
    }
    let tasks = tasks_rx.borrow_and_update().clone();
    if send_frame(&mut sender, &EventFrame::from(tasks.as_ref())).await.is_err() {
        return;
    }

    tracing::debug!("Change feed subscriber connected");

    let mut ping_interval = interval(Duration::from_secs(PING_INTERVAL_SECS));
    let mut last_activity = Instant::now();

    loop {
        let result = tokio::select! {
            changed = images_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let images = images_rx.borrow_and_update().clone();
                let Ok(json) = encode_frame(&EventFrame::from(images.as_ref())) else {
                    break;
                };
                send_text(&mut sender, json).await
            }

            changed = tasks_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let tasks = tasks_rx.borrow_and_update().clone();
                let Ok(json) = encode_frame(&EventFrame::from(tasks.as_ref())) else {
                    break;
                };
                send_text(&mut sender, json).await
            }

            // Send periodic pings
            _ = ping_interval.tick() => {
                if last_activity.elapsed() > Duration::from_secs(PING_INTERVAL_SECS) {
                    sender
                        .send(Message::Ping(vec![]))
                        .await
                        .map_err(|_| SendError::Disconnected)
                } else {
                    Ok(())
                }
            }

            // Handle client messages
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!("Change feed subscriber disconnected");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => sender
                        .send(Message::Pong(data))
                        .await
                        .map_err(|_| SendError::Disconnected),
                    Some(Ok(_)) => Ok(()),
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                }
            }
        };

        match result {
            Ok(()) => last_activity = Instant::now(),
            Err(SendError::Timeout) => {
                tracing::warn!("Send timeout, client may be slow");
                break;
            }
            Err(SendError::Disconnected) => {
                tracing::debug!("Client disconnected during send");
                break;
            }
        }
    }
}

/// Error type for sending frames
#[derive(Debug)]
enum SendError {
    Timeout,
    Disconnected,
}

fn encode_frame(frame: &EventFrame<'_>) -> Result<String, SendError> {
    serde_json::to_string(frame).map_err(|_| SendError::Disconnected)
}

/// Send a frame with timeout
async fn send_frame(
    sender: &mut SplitSink<WebSocket, Message>,
    frame: &EventFrame<'_>,
) -> Result<(), SendError> {
    let json = encode_frame(frame)?;
    send_text(sender, json).await
}

async fn send_text(
    sender: &mut SplitSink<WebSocket, Message>,
    json: String,
) -> Result<(), SendError> {
    match timeout(
        Duration::from_millis(SEND_TIMEOUT_MS),
        sender.send(Message::Text(json)),
    )
    .await
    {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(_)) => Err(SendError::Disconnected),
        Err(_) => Err(SendError::Timeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::models::WatermarkTemplate;

    #[test]
    fn test_images_frame_shape() {
        let mut state = ImageState::default();
        state.images.push(UploadedImage::new(
            "a.png".to_string(),
            "image/png".to_string(),
            axum::body::Bytes::from_static(b"png"),
        ));
        let id = state.images[0].id.clone();
        state.selected.insert(&id);
        state.current_template =
            Some(WatermarkTemplate::new("Logo", r#"{"objects":[]}"#.to_string(), None).unwrap());

        let json = serde_json::to_value(EventFrame::from(&state)).unwrap();
        assert_eq!(json["type"], "images");
        assert_eq!(json["selectedImages"][0], id.as_str());
        assert_eq!(json["currentTemplate"]["name"], "Logo");
        assert_eq!(json["processedImages"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_tasks_and_info_frames() {
        let state = PublishState::default();
        let json = serde_json::to_value(EventFrame::from(&state)).unwrap();
        assert_eq!(json["type"], "tasks");
        assert!(json["tasks"].as_array().unwrap().is_empty());

        let info = EventFrame::Info(InfoEvent {
            name: "Connected".to_string(),
            message: None,
        });
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["type"], "info");
        assert!(json.get("message").is_none());
    }

    #[test]
    fn test_encoded_frame_is_compact_json() {
        let state = PublishState::default();
        let json = encode_frame(&EventFrame::from(&state)).unwrap();
        assert_eq!(json, r#"{"type":"tasks","tasks":[]}"#);
    }
}
