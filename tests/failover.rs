mod common;

use maze::Role;

use crate::common::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn quiet_heartbeat_changes_nothing() {
    let tracker = tracker(10, 2).await;
    let p = join("p", &tracker).await;
    let b = join("b", &tracker).await;
    let c = join("c", &tracker).await;
    let before = snapshot(&p).await;

    p.heartbeat().await;
    b.heartbeat().await;
    c.heartbeat().await;

    assert_eq!(snapshot(&p).await, before);
    assert_eq!(snapshot(&b).await, before);
    assert_eq!(tracked(&tracker), ["p", "b", "c"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn primary_replaces_crashed_backup() {
    let tracker = tracker(10, 2).await;
    let p = join("p", &tracker).await;
    let b = join("b", &tracker).await;
    let c = join("c", &tracker).await;
    let d = join("d", &tracker).await;

    b.shutdown().await;
    p.heartbeat().await;

    let primary = snapshot(&p).await;
    assert_eq!(names(&primary), ["p", "c", "d"]);
    assert_eq!(p.role().await, Some(Role::Primary));
    assert_eq!(c.role().await, Some(Role::Backup));
    assert_eq!(d.role().await, Some(Role::Normal));
    assert_eq!(snapshot(&c).await, primary);
    assert_eq!(tracked(&tracker), ["p", "c", "d"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn backup_takes_over_from_crashed_primary() {
    let tracker = tracker(20, 2).await;
    let p = join("p", &tracker).await;
    let b = join("b", &tracker).await;
    let c = join("c", &tracker).await;
    let d = join("d", &tracker).await;
    let before = snapshot(&b).await;

    p.shutdown().await;
    b.heartbeat().await;

    assert_eq!(b.role().await, Some(Role::Primary));
    assert_eq!(c.role().await, Some(Role::Backup));
    assert_eq!(d.role().await, Some(Role::Normal));

    let primary = snapshot(&b).await;
    assert_eq!(names(&primary), ["b", "c", "d"]);
    for player in primary.players() {
        assert_eq!(player.pos, before.player(&player.name).unwrap().pos, "{} moved", player.name);
    }
    assert_eq!(primary.treasures(), before.treasures());
    assert_eq!(snapshot(&c).await, primary);
    assert_eq!(tracked(&tracker), ["b", "c", "d"]);

    // The game carries on under the new Primary
    let (direction, to) = free_direction(&primary, "d").unwrap();
    assert!(d.send_move(direction).await.unwrap().is_moved());
    assert_eq!(snapshot(&b).await.player("d").unwrap().pos, to);
    assert_eq!(snapshot(&c).await.count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn backup_reports_crashed_successor() {
    let tracker = tracker(10, 2).await;
    let p = join("p", &tracker).await;
    let b = join("b", &tracker).await;
    let c = join("c", &tracker).await;

    c.shutdown().await;
    b.heartbeat().await;

    assert_eq!(names(&snapshot(&p).await), ["p", "b"]);
    assert_eq!(snapshot(&b).await, snapshot(&p).await);
    assert_eq!(b.role().await, Some(Role::Backup));
    assert_eq!(tracked(&tracker), ["p", "b"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn normal_reports_crashed_successor() {
    let tracker = tracker(10, 2).await;
    let p = join("p", &tracker).await;
    let b = join("b", &tracker).await;
    let c = join("c", &tracker).await;
    let d = join("d", &tracker).await;
    let _e = join("e", &tracker).await;

    // c learns about d through a read
    c.refresh().await.unwrap();
    d.shutdown().await;
    c.heartbeat().await;

    let primary = snapshot(&p).await;
    assert_eq!(names(&primary), ["p", "b", "c", "e"]);
    assert_eq!(snapshot(&b).await, primary);
    assert!(snapshot(&c).await.player("d").is_none());
    assert_eq!(tracked(&tracker), ["p", "b", "c", "e"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn primary_only_watches_its_backup() {
    let tracker = tracker(10, 2).await;
    let p = join("p", &tracker).await;
    let _b = join("b", &tracker).await;
    let c = join("c", &tracker).await;

    // c is the Backup's successor, not the Primary's
    c.shutdown().await;
    p.heartbeat().await;

    assert_eq!(names(&snapshot(&p).await), ["p", "b", "c"]);
}
