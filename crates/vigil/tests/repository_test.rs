//! State repository: records, composite writes, retention, tolerant deletes

use vigil::prelude::*;
use vigil::{Clock, Cookie, LiveStatus, ManualClock};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

fn repository() -> (StateRepository, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let store = LmdbStore::open_with_clock(
        EngineConfig::in_memory().with_sweep_interval(0),
        clock.clone(),
    )
    .unwrap();
    let coordinator = Coordinator::with_store(Arc::new(store));
    let keys = KeySet::new("bilibili");
    PatternIndexRegistry::new(coordinator.clone(), keys.clone())
        .start()
        .unwrap();
    let repo = StateRepository::new(coordinator, keys, RetentionConfig::default());
    (repo, clock)
}

fn live_session(id: i64) -> LiveSession {
    LiveSession {
        producer: ProducerInfo::new(id, format!("streamer-{}", id)),
        room_id: id * 100,
        title: "late night".into(),
        status: LiveStatus::Live,
        cover_url: Some("https://example.invalid/cover.jpg".into()),
        started_at: Some(1_700_000_000),
    }
}

fn post_record(id: i64, post_id: i64) -> PostRecord {
    PostRecord {
        producer: ProducerInfo::new(id, format!("writer-{}", id)),
        post_id,
        published_at: 1_700_000_000,
        text: "hello".into(),
    }
}

#[test]
fn test_live_session_round_trip_and_expiry() {
    let (repo, clock) = repository();
    let session = live_session(42);

    repo.add_live_session(None, &session).unwrap();
    assert_eq!(repo.get_live_session(None, 42).unwrap(), session);

    clock.advance(DAY * 7 - Duration::from_secs(1));
    assert!(repo.get_live_session(None, 42).is_ok());

    clock.advance(Duration::from_secs(1));
    assert!(matches!(
        repo.get_live_session(None, 42),
        Err(VigilError::NotFound(_))
    ));

    // Embedded producer info was written alongside and does not expire
    assert_eq!(
        repo.get_producer_info(None, 42).unwrap(),
        session.producer
    );
}

#[test]
fn test_delete_absent_live_session_succeeds() {
    let (repo, _clock) = repository();
    repo.delete_live_session(None, 42).unwrap();

    repo.add_live_session(None, &live_session(42)).unwrap();
    repo.delete_live_session(None, 42).unwrap();
    assert!(repo.get_live_session(None, 42).is_err());
    repo.delete_live_session(None, 42).unwrap();
}

#[test]
fn test_missing_records_are_not_found() {
    let (repo, _clock) = repository();
    assert!(matches!(repo.get_producer_info(None, 1), Err(VigilError::NotFound(_))));
    assert!(matches!(repo.get_producer_stat(None, 1), Err(VigilError::NotFound(_))));
    assert!(matches!(repo.get_post_record(None, 1), Err(VigilError::NotFound(_))));
    assert!(matches!(repo.get_credentials(None, "nobody"), Err(VigilError::NotFound(_))));
    assert!(matches!(repo.get_first_seen(None, 1), Err(VigilError::NotFound(_))));
}

#[test]
fn test_producer_stat_with_ttl() {
    let (repo, clock) = repository();
    let stat = ProducerStat {
        id: 7,
        followers: 1200,
        following: 3,
    };
    repo.add_producer_stat(None, &stat, Some(Duration::from_secs(600)))
        .unwrap();
    assert_eq!(repo.get_producer_stat(None, 7).unwrap(), stat);

    clock.advance(Duration::from_secs(601));
    assert!(repo.get_producer_stat(None, 7).is_err());
}

#[test]
fn test_post_record_refreshes_producer_info() {
    let (repo, _clock) = repository();
    repo.add_producer_info(None, &ProducerInfo::new(9, "old name"))
        .unwrap();

    let record = post_record(9, 5001);
    repo.add_post_record(None, &record).unwrap();

    assert_eq!(repo.get_post_record(None, 9).unwrap(), record);
    assert_eq!(repo.get_producer_info(None, 9).unwrap().name, "writer-9");
}

#[test]
fn test_composite_write_is_atomic_under_rollback() {
    let (repo, _clock) = repository();
    let coordinator = repo.coordinator().clone();

    let result: Result<()> = coordinator.with_read_write(None, |tx| {
        repo.add_live_session(Some(&mut *tx), &live_session(5))?;
        repo.add_post_record(Some(tx), &post_record(5, 1))?;
        Err(VigilError::Rollback)
    });

    assert!(matches!(result, Err(VigilError::Rollback)));
    assert!(repo.get_producer_info(None, 5).is_err());
    assert!(repo.get_live_session(None, 5).is_err());
    assert!(repo.get_post_record(None, 5).is_err());
}

#[test]
fn test_listing_through_indexes() {
    let (repo, _clock) = repository();
    for id in [3, 1, 2] {
        repo.add_live_session(None, &live_session(id)).unwrap();
    }
    repo.add_post_record(None, &post_record(4, 1)).unwrap();

    let sessions = repo.list_live_sessions(None).unwrap();
    let ids: Vec<i64> = sessions.iter().map(|s| s.producer.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);

    let infos = repo.list_producer_infos(None).unwrap();
    assert_eq!(infos.len(), 4);
}

#[test]
fn test_clear_producer_tolerates_missing_records() {
    let (repo, _clock) = repository();
    repo.add_live_session(None, &live_session(8)).unwrap();
    repo.set_first_seen_if_absent(None, 8, 1_690_000_000).unwrap();

    // live session, producer info and first-seen exist; post and counter do not
    assert_eq!(repo.clear_producer(None, 8).unwrap(), 3);
    assert!(repo.get_producer_info(None, 8).is_err());
    assert!(repo.get_first_seen(None, 8).is_err());

    assert_eq!(repo.clear_producer(None, 8).unwrap(), 0);
}

#[test]
fn test_delete_post_and_live() {
    let (repo, _clock) = repository();
    repo.add_post_record(None, &post_record(6, 77)).unwrap();

    repo.delete_post_and_live(None, 6).unwrap();
    assert!(repo.get_post_record(None, 6).is_err());
    repo.delete_post_record(None, 6).unwrap();
}

#[test]
fn test_post_seen_marks_expire_after_retention() {
    let (repo, clock) = repository();

    assert!(repo.check_post_seen(None, 900));
    assert!(!repo.mark_post_seen(None, 900).unwrap());
    assert!(!repo.check_post_seen(None, 900));
    assert!(repo.mark_post_seen(None, 900).unwrap());

    clock.advance(Duration::from_secs(120 * 60 * 60));
    assert!(repo.check_post_seen(None, 900));
}

#[test]
fn test_not_live_streak() {
    let (repo, _clock) = repository();
    assert_eq!(repo.inc_not_live_count(None, 3), 1);
    assert_eq!(repo.inc_not_live_count(None, 3), 2);
    repo.clear_not_live_count(None, 3).unwrap();
    repo.clear_not_live_count(None, 3).unwrap();
    assert_eq!(repo.inc_not_live_count(None, 3), 1);
}

#[test]
fn test_not_live_streak_degrades_to_zero_after_close() {
    let (repo, _clock) = repository();
    repo.coordinator().store().unwrap().close().unwrap();
    assert_eq!(repo.inc_not_live_count(None, 3), 0);
}

#[test]
fn test_first_seen_keeps_original() {
    let (repo, _clock) = repository();
    assert!(repo.set_first_seen_if_absent(None, 1, 100).unwrap());
    assert!(!repo.set_first_seen_if_absent(None, 1, 200).unwrap());
    assert_eq!(repo.get_first_seen(None, 1).unwrap(), 100);

    repo.unset_first_seen(None, 1).unwrap();
    repo.unset_first_seen(None, 1).unwrap();
    assert!(repo.set_first_seen_if_absent(None, 1, 200).unwrap());
    assert_eq!(repo.get_first_seen(None, 1).unwrap(), 200);
}

#[test]
fn test_origin_mark_suppresses_for_fifteen_minutes() {
    let (repo, clock) = repository();
    assert!(repo.set_origin_mark_if_absent(None, 10, "BV1xx").unwrap());
    assert!(!repo.set_origin_mark_if_absent(None, 10, "BV1xx").unwrap());
    // Other groups are independent
    assert!(repo.set_origin_mark_if_absent(None, 11, "BV1xx").unwrap());

    clock.advance(Duration::from_secs(15 * 60));
    assert!(repo.set_origin_mark_if_absent(None, 10, "BV1xx").unwrap());
}

#[test]
fn test_try_freshen_once_per_interval() {
    let (repo, clock) = repository();
    let interval = Duration::from_secs(30);
    assert!(repo.try_freshen(None, "live", interval).unwrap());
    assert!(!repo.try_freshen(None, "live", interval).unwrap());
    assert!(repo.try_freshen(None, "post", interval).unwrap());

    clock.advance(interval);
    assert!(repo.try_freshen(None, "live", interval).unwrap());
}

#[test]
fn test_credentials_expire_with_first_cookie() {
    let (repo, clock) = repository();
    let now = clock.now_secs();
    let bundle = CredentialBundle {
        cookies: vec![
            Cookie {
                name: "SESSDATA".into(),
                value: "token".into(),
                http_only: true,
                expires: now + 3600,
            },
            Cookie {
                name: "bili_jct".into(),
                value: "csrf".into(),
                http_only: false,
                expires: now + 99_999,
            },
        ],
        domains: vec![".bilibili.com".into()],
    };

    repo.set_credentials(None, "alice", &bundle).unwrap();
    assert_eq!(repo.get_credentials(None, "alice").unwrap(), bundle);

    clock.advance(Duration::from_secs(3600));
    assert!(matches!(
        repo.get_credentials(None, "alice"),
        Err(VigilError::NotFound(_))
    ));
}

#[test]
fn test_credentials_without_expiry_persist() {
    let (repo, clock) = repository();
    let bundle = CredentialBundle {
        cookies: vec![Cookie {
            name: "SESSDATA".into(),
            value: "token".into(),
            http_only: true,
            expires: 0,
        }],
        domains: vec![],
    };
    repo.set_credentials(None, "bob", &bundle).unwrap();
    clock.advance(DAY * 365);
    assert_eq!(repo.get_credentials(None, "bob").unwrap(), bundle);
}

#[test]
fn test_expired_credentials_rejected() {
    let (repo, clock) = repository();
    let bundle = CredentialBundle {
        cookies: vec![Cookie {
            name: "SESSDATA".into(),
            value: "stale".into(),
            http_only: true,
            expires: clock.now_secs() - 1,
        }],
        domains: vec![],
    };
    assert!(matches!(
        repo.set_credentials(None, "carol", &bundle),
        Err(VigilError::InvalidState(_))
    ));
    assert!(repo.get_credentials(None, "carol").is_err());
}

#[test]
fn test_listing_an_empty_store() {
    let (repo, _clock) = repository();
    assert!(repo.list_live_sessions(None).unwrap().is_empty());
    assert!(repo.list_producer_infos(None).unwrap().is_empty());
    assert_eq!(repo.clear_producer(None, 9).unwrap(), 0);
}
