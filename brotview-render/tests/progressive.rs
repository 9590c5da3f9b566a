use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use brotview_core::{ColorMapRegistry, EscapeParams, Rect, Session};
use brotview_render::{render_tile, CycleState, PixelBuffer, RenderRequest, Scheduler};

const TIMEOUT: Duration = Duration::from_secs(20);

fn request(rect: Rect, block_size: u32) -> RenderRequest {
    RenderRequest::new(
        64,
        64,
        rect,
        block_size,
        EscapeParams::new(100).unwrap(),
        ColorMapRegistry::builtin().default_map().clone(),
    )
    .unwrap()
}

fn full_set() -> Rect {
    Rect::new(-2.0, -1.5, 3.0, 3.0).unwrap()
}

fn seahorse() -> Rect {
    Rect::new(-0.76, 0.09, 0.02, 0.02).unwrap()
}

/// Poll until settled, returning every frame taken along the way.
fn run_to_settled(scheduler: &mut Scheduler) -> Vec<PixelBuffer> {
    let start = Instant::now();
    let mut frames = Vec::new();
    loop {
        scheduler.poll();
        if let Some(frame) = scheduler.take_frame() {
            frames.push(frame);
        }
        if scheduler.state().is_settled() {
            return frames;
        }
        assert!(start.elapsed() < TIMEOUT, "render cycle did not settle");
        std::thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn full_cycle_is_idempotent() {
    let mut scheduler = Scheduler::new(None);

    scheduler.start_cycle(request(full_set(), 16)).unwrap();
    let first = run_to_settled(&mut scheduler);
    scheduler.start_cycle(request(full_set(), 16)).unwrap();
    let second = run_to_settled(&mut scheduler);

    assert_eq!(first.last(), second.last());
    assert_eq!(first.last(), Some(&render_tile(&request(full_set(), 1)).unwrap()));
}

#[test]
fn invalidation_mid_cycle_shows_only_latest_view() {
    let sent = Arc::new(AtomicUsize::new(0));
    let notified = Arc::clone(&sent);
    let mut scheduler = Scheduler::new(Some(Arc::new(move || {
        notified.fetch_add(1, Ordering::SeqCst);
    })));
    let passes_b: Vec<PixelBuffer> = [16, 8, 4, 2, 1]
        .iter()
        .map(|&b| render_tile(&request(seahorse(), b)).unwrap())
        .collect();

    // A large, slow view whose refinement passes are still being produced.
    let slow = RenderRequest {
        width: 256,
        height: 256,
        params: EscapeParams::new(2000).unwrap(),
        ..request(seahorse(), 16)
    };
    scheduler.start_cycle(slow).unwrap();
    let start = Instant::now();
    while sent.load(Ordering::SeqCst) == 0 {
        assert!(start.elapsed() < TIMEOUT, "worker never sent a pass");
        std::thread::sleep(Duration::from_millis(1));
    }
    // The worker's first pass is queued and unread; the coarse one is discarded.
    assert_eq!(scheduler.state(), CycleState::Coarse);
    assert!(scheduler.take_frame().is_some());

    scheduler.start_cycle(request(seahorse(), 16)).unwrap();
    let frames = run_to_settled(&mut scheduler);

    assert!(!frames.is_empty());
    for frame in &frames {
        assert!(passes_b.contains(frame), "frame from a superseded cycle");
    }
    assert_eq!(frames.last(), passes_b.last());
}

#[test]
fn worker_notifies_host() {
    let count = Arc::new(AtomicUsize::new(0));
    let notified = Arc::clone(&count);
    let mut scheduler = Scheduler::new(Some(Arc::new(move || {
        notified.fetch_add(1, Ordering::SeqCst);
    })));
    assert!(!scheduler.is_inline());

    scheduler.start_cycle(request(full_set(), 16)).unwrap();
    run_to_settled(&mut scheduler);

    // Passes 8, 4, 2 and 1 each send before notifying.
    assert!(count.load(Ordering::SeqCst) >= 4);
}

#[test]
fn inline_matches_worker() {
    let mut worker = Scheduler::new(None);
    let mut inline = Scheduler::inline();

    worker.start_cycle(request(seahorse(), 8)).unwrap();
    inline.start_cycle(request(seahorse(), 8)).unwrap();

    let from_worker = run_to_settled(&mut worker);
    let from_inline = run_to_settled(&mut inline);
    assert_eq!(from_worker.last(), from_inline.last());
    // One pass per poll, and the 4 pass replaces the untaken coarse frame.
    assert_eq!(from_inline.len(), 3);
}

#[test]
fn drop_mid_cycle_does_not_hang() {
    let mut scheduler = Scheduler::new(None);
    let big = RenderRequest {
        width: 1024,
        height: 1024,
        params: EscapeParams::new(5000).unwrap(),
        ..request(full_set(), 16)
    };
    scheduler.start_cycle(big).unwrap();
    drop(scheduler);
}

#[test]
fn session_changes_drive_cycles() {
    let mut session = Session::with_defaults();
    let mut scheduler = Scheduler::inline();

    scheduler
        .start_cycle(RenderRequest::from_session(&session, 64, 64, session.max_block_size()).unwrap())
        .unwrap();
    let before = run_to_settled(&mut scheduler);

    session.set_color_map("Blue to green").unwrap();
    scheduler
        .start_cycle(RenderRequest::from_session(&session, 64, 64, session.max_block_size()).unwrap())
        .unwrap();
    assert_eq!(scheduler.state(), CycleState::Coarse);
    let after = run_to_settled(&mut scheduler);

    assert_ne!(before.last(), after.last());
}
