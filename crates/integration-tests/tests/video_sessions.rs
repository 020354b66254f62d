mod support;

use session_core::{IngestOutcome, QueryOutcome, RagApiClient, SessionPhase, VideoSession};

use support::client_for;
use support::rag_backend::MockRagBackend;

const VIDEO_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

#[tokio::test]
async fn prepared_video_answers_with_filtered_sources() {
    let backend = MockRagBackend::start().await;
    let session = VideoSession::new(client_for(&backend.base_url));
    session.set_url(VIDEO_URL);

    let prepared = session.prepare().await.expect("prepare should start");
    assert_eq!(prepared, IngestOutcome::Ready { document_id: None });
    assert_eq!(session.phase(), SessionPhase::Ready);

    let outcome = session.ask(" What is it about? ").await.expect("ask should start");
    assert_eq!(
        outcome,
        QueryOutcome::Answered {
            answer: format!("The video at {VIDEO_URL} covers: What is it about?"),
            sources: vec!["00:00-00:30".to_string()],
        }
    );
    let answer = session.snapshot().answer.expect("answer should be stored");
    assert_eq!(answer.reported_sources, 3);

    session.ask("And the ending?").await.expect("ask should start");
    backend
        .with_state(|recorded| {
            assert_eq!(recorded.prepared, vec![VIDEO_URL.to_string()]);
            assert_eq!(recorded.asks.len(), 2);
            assert!(recorded.asks.iter().all(|ask| ask.youtube_url == VIDEO_URL));
            assert_eq!(recorded.asks[0].question, "What is it about?");
        })
        .await;
}

#[tokio::test]
async fn backend_rejection_of_url_is_shown_verbatim() {
    let backend = MockRagBackend::start().await;
    let session = VideoSession::new(client_for(&backend.base_url));
    session.set_url("https://vimeo.com/12345");

    let outcome = session.prepare().await.expect("prepare should start");

    assert_eq!(
        outcome,
        IngestOutcome::Failed {
            message: "Invalid YouTube URL".to_string()
        }
    );
    let state = session.snapshot();
    assert_eq!(state.ingest.error(), Some("Invalid YouTube URL"));
    assert!(state.prepared_url.is_none());
    assert_eq!(state.url, "https://vimeo.com/12345");
}

#[tokio::test]
async fn unreachable_backend_uses_generic_message() {
    let backend = MockRagBackend::start().await;
    let http_client = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .build()
        .expect("unpooled client should build");
    let session = VideoSession::new(RagApiClient::new(backend.base_url.clone(), http_client));
    session.set_url(VIDEO_URL);
    session.ask("First?").await.expect("ask should start");
    assert!(session.snapshot().answer.is_some());

    backend.stop();
    // The listener is dropped once the aborted task is cancelled.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let outcome = session.ask("Second?").await.expect("ask should start");
    assert_eq!(
        outcome,
        QueryOutcome::Failed {
            message: "Request failed.".to_string()
        }
    );
    let state = session.snapshot();
    assert!(state.answer.is_none());
    assert_eq!(state.query.error(), Some("Request failed."));
    assert!(!state.query.in_flight);
}
