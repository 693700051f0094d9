mod common;

use std::time::Duration;

use maze::{Error, Peer, Role};

use crate::common::*;

/// Registers a peer the tracker believes in but nobody is listening for.
async fn ghost(tracker: &maze::tracker::Handle) -> Peer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let ghost = Peer::new("ghost", listener.local_addr().unwrap());
    drop(listener);
    tracker.tracker().register(ghost.clone()).unwrap();
    ghost
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn first_player_starts_the_game() {
    let tracker = tracker(6, 4).await;
    let p = join("p", &tracker).await;

    assert_eq!(p.role().await, Some(Role::Primary));
    let state = snapshot(&p).await;
    assert_eq!(names(&state), ["p"]);
    assert_eq!((state.n(), state.k()), (6, 4));
    assert_eq!(state.treasures().len(), 4);
    assert_eq!(state.count(), 0);
    assert_eq!(tracked(&tracker), ["p"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn duplicate_name_is_refused() {
    let tracker = tracker(6, 1).await;
    let _p = join("p", &tracker).await;

    let error = config("p", &tracker).join().await.unwrap_err();
    assert_eq!(error, Error::DuplicateName("p".to_string()));
    assert_eq!(tracked(&tracker), ["p"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn gives_up_after_retries() {
    let tracker = tracker(6, 1).await;
    ghost(&tracker).await;

    let error = config("c", &tracker)
        .with_retries(2, Duration::from_millis(10))
        .join()
        .await
        .unwrap_err();

    assert_eq!(error, Error::Bootstrap { attempts: 3 });
    assert_eq!(tracked(&tracker), ["ghost"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn retry_sees_refreshed_peers() {
    let tracker = tracker(6, 1).await;
    ghost(&tracker).await;

    let forget = async {
        tokio::time::sleep(Duration::from_millis(75)).await;
        tracker.tracker().unregister("ghost");
    };
    let (node, ()) = tokio::join!(config("c", &tracker).join(), forget);

    let c = node.unwrap();
    assert_eq!(c.role().await, Some(Role::Primary));
    assert_eq!(tracked(&tracker), ["c"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn joiner_skips_crashed_primary() {
    let tracker = tracker(10, 1).await;
    let p = join("p", &tracker).await;
    let b = join("b", &tracker).await;

    p.shutdown().await;
    let detect = async {
        tokio::time::sleep(Duration::from_millis(75)).await;
        b.heartbeat().await;
    };
    let (node, ()) = tokio::join!(config("c", &tracker).join(), detect);

    let c = node.unwrap();
    assert_eq!(b.role().await, Some(Role::Primary));
    assert_eq!(c.role().await, Some(Role::Backup));
    assert_eq!(names(&snapshot(&c).await), ["b", "c"]);
    assert_eq!(snapshot(&c).await, snapshot(&b).await);
    assert_eq!(tracked(&tracker), ["b", "c"]);
}
