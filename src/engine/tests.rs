use super::*;
use crate::deck::Rank;
use crate::ranking::MemoryIdentityStore;
use crate::testing::{FailAt, FakeAudioBackend, FakeCollectionApi, RecordingRankingService};
use std::time::Duration;

struct Harness {
    engine: RankingEngine,
    events: mpsc::UnboundedReceiver<EngineEvent>,
    audio: FakeAudioBackend,
    ranking: RecordingRankingService,
    collections: FakeCollectionApi,
}

fn settings() -> EngineSettings {
    EngineSettings {
        screen_width: 300.0,
        transition: TransitionConfig {
            exit_ms: 0,
            enter_ms: 0,
        },
        autoplay: true,
        user_id_key: "userId".to_string(),
        export: ExportConfig::default(),
    }
}

fn cards(n: usize) -> Vec<Item> {
    (0..n)
        .map(|i| {
            Item::new(format!("item-{}", i), format!("Song {}", i), "Band")
                .with_preview(format!("preview-{}.mp3", i))
                .with_external_url(format!("https://open.spotify.com/track/track{}", i))
        })
        .collect()
}

fn harness_with(items: &[Item], friends: &[Friend], settings: EngineSettings) -> Harness {
    let audio = FakeAudioBackend::default();
    let ranking = RecordingRankingService::default();
    let collections = FakeCollectionApi::default();

    let services = EngineServices {
        audio: Arc::new(audio.clone()),
        identity: Arc::new(MemoryIdentityStore::with_value("userId", "u-1")),
        ranking: Arc::new(ranking.clone()),
        collections: Arc::new(collections.clone()),
    };

    let (tx, events) = mpsc::unbounded_channel();
    let mut engine = RankingEngine::new(items, friends, services, settings);
    engine.set_event_sender(tx);

    Harness {
        engine,
        events,
        audio,
        ranking,
        collections,
    }
}

fn harness(n: usize) -> Harness {
    harness_with(&cards(n), &[], settings())
}

fn drain(events: &mut mpsc::UnboundedReceiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

fn rank(value: u8) -> Rank {
    Rank::new(value).unwrap()
}

#[tokio::test]
async fn test_short_flick_on_single_card_accepts_rank_one() {
    let mut h = harness(1);
    let now = Instant::now();
    h.engine.start(now).await;

    assert_eq!(
        h.engine.release(30.0, 0.0, now),
        ReleaseOutcome::Committed(Decision::Accept(rank(1)))
    );
    h.engine.tick(now).await;

    assert_eq!(h.engine.state(), DeckState::Exhausted);
    assert_eq!(h.engine.liked().len(), 1);
    assert_eq!(h.engine.liked()[0].item.id, "item-0");
    assert_eq!(h.engine.liked()[0].rank, rank(1));

    h.engine.flush_submissions().await;
    assert_eq!(
        h.ranking.calls(),
        vec![("item-0".to_string(), 1, Some("u-1".to_string()))]
    );

    let summary = h.engine.summary();
    assert_eq!((summary.liked, summary.disliked, summary.exhausted), (1, 0, true));
    assert!(drain(&mut h.events).contains(&EngineEvent::DeckExhausted { liked: 1, disliked: 0 }));
}

#[tokio::test]
async fn test_reject_is_never_submitted() {
    let mut h = harness(1);
    let now = Instant::now();
    h.engine.start(now).await;

    assert_eq!(
        h.engine.release(-50.0, 0.0, now),
        ReleaseOutcome::Committed(Decision::Reject)
    );
    h.engine.tick(now).await;
    h.engine.flush_submissions().await;

    assert_eq!(h.engine.disliked().len(), 1);
    assert!(h.engine.liked().is_empty());
    assert!(h.ranking.calls().is_empty());
    assert_eq!(h.engine.state(), DeckState::Exhausted);
}

#[tokio::test]
async fn test_tiny_drag_snaps_back() {
    let mut h = harness(1);
    let now = Instant::now();
    h.engine.start(now).await;

    assert_eq!(h.engine.drag(10.0, 4.0), Some(1));
    assert_eq!(h.engine.visual().offset_x, 10.0);

    assert_eq!(h.engine.release(10.0, 0.0, now), ReleaseOutcome::SnappedBack);
    h.engine.tick(now).await;

    assert_eq!(h.engine.state(), DeckState::Presenting(0));
    assert_eq!(h.engine.visual(), CardVisual::neutral());
    assert!(h.engine.liked().is_empty() && h.engine.disliked().is_empty());
}

#[tokio::test]
async fn test_dislike_button_records_rank_one_accept() {
    let mut h = harness(2);
    let now = Instant::now();
    h.engine.start(now).await;

    // A drag in progress doesn't change what the button records
    h.engine.drag(-120.0, 0.0);
    assert_eq!(
        h.engine.dislike(now),
        ReleaseOutcome::Committed(Decision::Accept(rank(1)))
    );
    h.engine.tick(now).await;
    h.engine.flush_submissions().await;

    assert_eq!(h.engine.liked().len(), 1);
    assert_eq!(h.engine.liked()[0].rank, rank(1));
    assert!(h.engine.disliked().is_empty());
    assert_eq!(h.ranking.calls().len(), 1);
}

#[tokio::test]
async fn test_like_button_records_rank_five() {
    let mut h = harness(2);
    let now = Instant::now();
    h.engine.start(now).await;

    h.engine.like(now);
    h.engine.tick(now).await;
    assert_eq!(h.engine.liked()[0].rank, rank(5));
    assert_eq!(h.engine.state(), DeckState::Presenting(1));
}

#[tokio::test]
async fn test_input_ignored_while_transitioning() {
    let mut h = harness_with(
        &cards(3),
        &[],
        EngineSettings {
            transition: TransitionConfig {
                exit_ms: 200,
                enter_ms: 100,
            },
            ..settings()
        },
    );
    let now = Instant::now();
    h.engine.start(now).await;

    h.engine.release(-80.0, 0.0, now);
    assert!(h.engine.is_busy());
    assert_eq!(h.engine.release(120.0, 0.0, now), ReleaseOutcome::Ignored);
    assert_eq!(h.engine.like(now), ReleaseOutcome::Ignored);
    assert_eq!(h.engine.dislike(now), ReleaseOutcome::Ignored);
    assert_eq!(h.engine.drag(50.0, 0.0), None);

    // Cursor holds until the exit animation is done
    h.engine.tick(now + Duration::from_millis(100)).await;
    assert_eq!(h.engine.state(), DeckState::Transitioning { from: 0 });
    assert_eq!(h.engine.summary().position, 0);

    h.engine.tick(now + Duration::from_millis(200)).await;
    assert_eq!(h.engine.state(), DeckState::Presenting(1));
    assert!(!h.engine.is_busy());
    assert_eq!(h.engine.disliked().len(), 1);
    assert!(h.engine.liked().is_empty());
}

#[tokio::test]
async fn test_audio_is_swapped_in_order_on_advance() {
    let mut h = harness(2);
    let now = Instant::now();
    h.engine.start(now).await;
    assert_eq!(h.audio.log(), vec!["load:preview-0.mp3", "play:preview-0.mp3"]);
    assert!(h.engine.audio().is_playing());

    h.engine.release(100.0, 0.0, now);
    h.engine.tick(now).await;

    assert_eq!(
        h.audio.log(),
        vec![
            "load:preview-0.mp3",
            "play:preview-0.mp3",
            "stop:preview-0.mp3",
            "unload:preview-0.mp3",
            "load:preview-1.mp3",
            "play:preview-1.mp3",
        ]
    );
    assert_eq!(h.audio.max_live(), 1);

    h.engine.release(-100.0, 0.0, now);
    h.engine.tick(now).await;
    assert_eq!(h.engine.state(), DeckState::Exhausted);
    assert_eq!(h.audio.live(), 0);
    assert!(!h.engine.audio().is_playing());
}

#[tokio::test]
async fn test_preview_released_even_when_paused() {
    let mut h = harness(2);
    let now = Instant::now();
    h.engine.start(now).await;
    h.engine.toggle_playback().await;
    assert!(!h.engine.audio().is_playing());
    assert_eq!(h.audio.live(), 1);

    h.engine.like(now);
    h.engine.tick(now).await;
    assert!(h.audio.log().contains(&"unload:preview-0.mp3".to_string()));
    assert_eq!(h.audio.max_live(), 1);
}

#[tokio::test]
async fn test_submission_uses_values_captured_at_decision_time() {
    let mut h = harness(3);
    h.ranking.hold();
    let now = Instant::now();
    h.engine.start(now).await;

    // Accept card 0 with rank 4; the network call is stuck
    assert_eq!(
        h.engine.release(100.0, 0.0, now),
        ReleaseOutcome::Committed(Decision::Accept(rank(4)))
    );
    h.engine.tick(now).await;
    // Deck moves on regardless
    h.engine.release(-100.0, 0.0, now);
    h.engine.tick(now).await;
    assert_eq!(h.engine.state(), DeckState::Presenting(2));

    h.ranking.release_all();
    h.engine.flush_submissions().await;
    assert_eq!(
        h.ranking.calls(),
        vec![("item-0".to_string(), 4, Some("u-1".to_string()))]
    );
}

#[tokio::test]
async fn test_submission_failure_leaves_deck_alone() {
    let mut h = harness(2);
    h.ranking.fail();
    let now = Instant::now();
    h.engine.start(now).await;

    h.engine.like(now);
    h.engine.tick(now).await;
    h.engine.flush_submissions().await;

    assert_eq!(h.engine.liked().len(), 1);
    assert_eq!(h.engine.state(), DeckState::Presenting(1));
    assert!(!drain(&mut h.events)
        .iter()
        .any(|event| matches!(event, EngineEvent::Notice(_))));
}

#[tokio::test]
async fn test_audio_failure_is_reported_and_session_continues() {
    let mut h = harness(2);
    h.audio.fail_on("preview-0.mp3");
    let now = Instant::now();
    h.engine.start(now).await;

    let events = drain(&mut h.events);
    assert!(events
        .iter()
        .any(|event| matches!(event, EngineEvent::Notice(msg) if msg.contains("preview"))));
    assert!(!h.engine.audio().is_loaded());

    h.engine.like(now);
    h.engine.tick(now).await;
    assert_eq!(h.engine.state(), DeckState::Presenting(1));
    assert!(h.engine.audio().is_playing());
}

#[tokio::test]
async fn test_session_runs_without_an_output_device() {
    let ranking = RecordingRankingService::default();
    let services = EngineServices {
        audio: Arc::new(crate::audio::NoOutputDevice {
            reason: "no default device".to_string(),
        }),
        identity: Arc::new(MemoryIdentityStore::new()),
        ranking: Arc::new(ranking.clone()),
        collections: Arc::new(FakeCollectionApi::default()),
    };
    let (tx, mut events) = mpsc::unbounded_channel();
    let mut engine = RankingEngine::new(&cards(2), &[], services, settings());
    engine.set_event_sender(tx);

    let now = Instant::now();
    engine.start(now).await;
    assert!(drain(&mut events)
        .iter()
        .any(|event| matches!(event, EngineEvent::Notice(_))));

    engine.like(now);
    engine.tick(now).await;
    engine.like(now);
    engine.tick(now).await;
    engine.flush_submissions().await;

    assert!(engine.summary().exhausted);
    assert_eq!(engine.summary().liked, 2);
    assert_eq!(ranking.calls().len(), 2);
}

#[tokio::test]
async fn test_counts_track_cursor_across_a_session() {
    let mut h = harness(8);
    let now = Instant::now();
    h.engine.start(now).await;

    let releases = [30.0, -60.0, 5.0, 140.0, -44.0, -200.0, 46.0, 20.0, 0.0, -50.0, 90.0, 12.0];
    for dx in releases {
        let before = h.engine.summary().position;
        let outcome = h.engine.release(dx, 0.0, now);
        h.engine.tick(now).await;

        let summary = h.engine.summary();
        assert_eq!(summary.liked + summary.disliked, summary.position);
        match outcome {
            ReleaseOutcome::Committed(_) => assert_eq!(summary.position, before + 1),
            _ => assert_eq!(summary.position, before),
        }
    }

    assert!(h.engine.summary().exhausted);
}

#[tokio::test]
async fn test_friend_names_annotate_cards() {
    let mut items = cards(2);
    items[0].shared_by = Some(7);
    items[1].shared_by = Some(99);
    let friends = vec![Friend {
        id: 7,
        username: "maya".to_string(),
    }];
    let mut h = harness_with(&items, &friends, settings());
    let now = Instant::now();
    h.engine.start(now).await;

    let card = h.engine.current_card().unwrap();
    assert_eq!(card.shared_by, Some("maya"));
    assert_eq!((card.position, card.total), (0, 2));

    h.engine.like(now);
    h.engine.tick(now).await;
    assert_eq!(h.engine.current_card().unwrap().shared_by, None);
}

#[tokio::test]
async fn test_empty_deck_is_exhausted_from_the_start() {
    let mut h = harness(0);
    h.engine.start(Instant::now()).await;

    assert_eq!(h.engine.state(), DeckState::Exhausted);
    assert!(h.engine.current_card().is_none());
    assert_eq!(
        drain(&mut h.events),
        vec![EngineEvent::DeckExhausted { liked: 0, disliked: 0 }]
    );
    assert!(h.audio.log().is_empty());
}

#[tokio::test]
async fn test_export_requires_exhausted_deck_and_a_name() {
    let mut h = harness(1);
    let now = Instant::now();
    h.engine.start(now).await;

    assert!(matches!(h.engine.export("Friday"), Err(ExportError::NotExhausted)));

    h.engine.like(now);
    h.engine.tick(now).await;
    assert!(matches!(h.engine.export("  "), Err(ExportError::MissingName)));
    assert!(h.collections.calls().is_empty());
}

#[tokio::test]
async fn test_export_after_exhaustion() {
    let mut h = harness(3);
    let now = Instant::now();
    h.engine.start(now).await;

    h.engine.like(now);
    h.engine.tick(now).await;
    h.engine.release(-100.0, 0.0, now);
    h.engine.tick(now).await;
    h.engine.dislike(now);
    h.engine.tick(now).await;
    drain(&mut h.events);

    let report = h.engine.export("Friday").unwrap().await.unwrap().unwrap();
    assert_eq!(report.exported, 2);
    assert_eq!(report.name, "Ranked Friday");
    assert_eq!(
        h.collections.entries(),
        vec![vec![
            "spotify:track:track0".to_string(),
            "spotify:track:track2".to_string()
        ]]
    );
    assert_eq!(drain(&mut h.events), vec![EngineEvent::ExportCompleted(report)]);
}

#[tokio::test]
async fn test_export_failure_shows_one_generic_notice() {
    let mut h = harness(1);
    h.collections.fail_at(FailAt::Create);
    let now = Instant::now();
    h.engine.start(now).await;
    h.engine.like(now);
    h.engine.tick(now).await;
    drain(&mut h.events);

    let result = h.engine.export("Friday").unwrap().await.unwrap();
    assert!(matches!(result, Err(ExportError::CreateCollection(_))));
    assert_eq!(
        drain(&mut h.events),
        vec![
            EngineEvent::Notice(ExportError::USER_MESSAGE.to_string()),
            EngineEvent::ExportFailed,
        ]
    );
    // Export never touches the session's own record
    assert_eq!(h.engine.liked().len(), 1);
}

#[tokio::test]
async fn test_settle_waits_out_the_exit() {
    let mut h = harness_with(
        &cards(2),
        &[],
        EngineSettings {
            transition: TransitionConfig {
                exit_ms: 20,
                enter_ms: 0,
            },
            ..settings()
        },
    );
    h.engine.start(Instant::now()).await;

    h.engine.release(-100.0, 0.0, Instant::now());
    h.engine.settle().await;
    assert_eq!(h.engine.state(), DeckState::Presenting(1));
}

#[tokio::test]
async fn test_complete_session_releases_audio_and_signals() {
    let Harness {
        mut engine,
        mut events,
        audio,
        ..
    } = harness(2);
    engine.start(Instant::now()).await;
    assert_eq!(audio.live(), 1);
    drain(&mut events);

    engine.complete_session().await;
    assert_eq!(audio.live(), 0);
    assert_eq!(drain(&mut events), vec![EngineEvent::SessionComplete]);
}

#[tokio::test]
async fn test_autoplay_off_loads_nothing_until_asked() {
    let mut h = harness_with(
        &cards(1),
        &[],
        EngineSettings {
            autoplay: false,
            ..settings()
        },
    );
    h.engine.start(Instant::now()).await;
    assert!(h.audio.log().is_empty());
    assert_eq!(h.engine.audio().source(), Some("preview-0.mp3"));

    h.engine.toggle_playback().await;
    assert!(h.engine.audio().is_playing());
    h.engine.toggle_playback().await;
    assert!(!h.engine.audio().is_playing());
}
