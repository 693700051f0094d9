mod common;

use maze::Role;

use crate::common::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn primary_hands_leadership_to_backup() {
    let tracker = tracker(20, 2).await;
    let p = join("p", &tracker).await;
    let b = join("b", &tracker).await;
    let c = join("c", &tracker).await;
    let before = snapshot(&p).await;

    p.quit().await.unwrap();

    assert_eq!(p.role().await, Some(Role::Retiree));
    assert_eq!(b.role().await, Some(Role::Primary));
    assert_eq!(c.role().await, Some(Role::Backup));

    let primary = snapshot(&b).await;
    assert_eq!(names(&primary), ["b", "c"]);
    assert_eq!(primary.player("c").unwrap().pos, before.player("c").unwrap().pos);
    assert_eq!(snapshot(&c).await, primary);
    assert_eq!(tracked(&tracker), ["b", "c"]);

    let (direction, to) = free_direction(&primary, "c").unwrap();
    assert!(c.send_move(direction).await.unwrap().is_moved());
    assert_eq!(snapshot(&b).await.player("c").unwrap().pos, to);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn backup_leaves_through_primary() {
    let tracker = tracker(10, 2).await;
    let p = join("p", &tracker).await;
    let b = join("b", &tracker).await;
    let c = join("c", &tracker).await;

    b.quit().await.unwrap();

    let primary = snapshot(&p).await;
    assert_eq!(names(&primary), ["p", "c"]);
    assert_eq!(c.role().await, Some(Role::Backup));
    assert_eq!(snapshot(&c).await, primary);
    assert_eq!(tracked(&tracker), ["p", "c"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn normal_leaves_through_primary() {
    let tracker = tracker(10, 2).await;
    let p = join("p", &tracker).await;
    let b = join("b", &tracker).await;
    let c = join("c", &tracker).await;
    let _d = join("d", &tracker).await;

    c.quit().await.unwrap();

    let primary = snapshot(&p).await;
    assert_eq!(names(&primary), ["p", "b", "d"]);
    assert_eq!(snapshot(&b).await, primary);
    assert_eq!(tracked(&tracker), ["p", "b", "d"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn last_player_quits() {
    let tracker = tracker(5, 1).await;
    let p = join("p", &tracker).await;

    p.quit().await.unwrap();

    assert_eq!(p.role().await, Some(Role::Retiree));
    assert!(tracked(&tracker).is_empty());

    // The next player starts a fresh game
    let q = join("q", &tracker).await;
    assert_eq!(q.role().await, Some(Role::Primary));
    assert_eq!(names(&snapshot(&q).await), ["q"]);
}
