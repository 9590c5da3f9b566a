//! Progressive render cycles.
//!
//! A cycle renders the same view at shrinking block sizes, coarsest first.
//! The coarse pass is computed synchronously by [`Scheduler::start_cycle`]
//! so there is always something to show; the finer passes run on the
//! `render-worker` thread and come back through a channel that the host
//! drains with [`Scheduler::poll`]. Every cycle gets a fresh generation
//! from the shared [`RenderCancel`]; passes and messages from older
//! generations are abandoned or dropped, never published.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info, warn};

use crate::buffer::PixelBuffer;
use crate::compositor::{render_tile_cancellable, RenderCancel, RenderRequest};

/// Called by the worker after each message it sends, so the host can wake
/// up and poll.
pub type RepaintNotifier = Arc<dyn Fn() + Send + Sync>;

// ---------------------------------------------------------------------------
// Cycle state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    /// No cycle started yet.
    Idle,
    /// The coarse pass is published; finer passes are pending.
    Coarse,
    /// The pass at this block size is published; finer passes are pending.
    Refining(u32),
    /// The single-pixel pass is published.
    Settled,
}

impl CycleState {
    pub fn is_settled(self) -> bool {
        self == Self::Settled
    }

    /// `true` while passes are still outstanding.
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Coarse | Self::Refining(_))
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Coarse => "Rendering\u{2026}",
            Self::Refining(_) => "Refining\u{2026}",
            Self::Settled => "Done",
        }
    }
}

/// Block size of the pass after one at `block_size`: halved, rounding up,
/// never below 1.
pub fn next_block_size(block_size: u32) -> u32 {
    block_size.div_ceil(2).max(1)
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Interactive thread → worker.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub generation: u64,
    /// The first pass to render; later passes halve its block size.
    pub request: RenderRequest,
}

/// Worker → interactive thread.
#[derive(Debug)]
pub struct RenderProgress {
    pub generation: u64,
    pub block_size: u32,
    /// Set on the last message of a cycle, which carries no buffer.
    pub done: bool,
    pub buffer: Option<PixelBuffer>,
}

/// Render the passes of one cycle from `request.block_size` down to 1,
/// handing each to `emit`, then emit the `done` marker.
///
/// Stops early when the generation goes stale. Returns `false` if `emit`
/// refused a message, meaning nobody is listening any more.
pub fn run_passes(
    request: &RenderRequest,
    cancel: &RenderCancel,
    generation: u64,
    mut emit: impl FnMut(RenderProgress) -> bool,
) -> bool {
    let mut block_size = request.block_size;
    loop {
        let pass = request.with_block_size(block_size);
        let buffer = match render_tile_cancellable(&pass, cancel, generation) {
            Ok(Some(buffer)) => buffer,
            Ok(None) => return true,
            Err(e) => {
                error!(generation, block_size, "Render pass failed: {e}");
                return true;
            }
        };
        if !emit(RenderProgress {
            generation,
            block_size,
            done: false,
            buffer: Some(buffer),
        }) {
            return false;
        }
        if block_size == 1 {
            return emit(RenderProgress {
                generation,
                block_size,
                done: true,
                buffer: None,
            });
        }
        block_size = next_block_size(block_size);
    }
}

fn drain_latest(initial: RenderJob, rx: &Receiver<RenderJob>) -> RenderJob {
    let mut job = initial;
    while let Ok(newer) = rx.try_recv() {
        job = newer;
    }
    job
}

/// Body of the `render-worker` thread. Runs until the job channel closes
/// or the progress receiver is dropped.
pub fn render_worker(
    rx: Receiver<RenderJob>,
    tx: Sender<RenderProgress>,
    cancel: Arc<RenderCancel>,
    notify: Option<RepaintNotifier>,
) {
    while let Ok(initial) = rx.recv() {
        let job = drain_latest(initial, &rx);
        if !cancel.is_current(job.generation) {
            debug!(generation = job.generation, "Skipping stale job");
            continue;
        }
        let listening = run_passes(&job.request, &cancel, job.generation, |progress| {
            if tx.send(progress).is_err() {
                return false;
            }
            if let Some(notify) = &notify {
                notify();
            }
            true
        });
        if !listening {
            break;
        }
    }
    debug!("Render worker exiting");
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

enum Backend {
    Worker {
        tx: Option<Sender<RenderJob>>,
        rx: Receiver<RenderProgress>,
        handle: Option<JoinHandle<()>>,
    },
    /// Remaining passes run on the caller's thread, one per poll.
    Inline,
}

/// Drives progressive render cycles for one view.
pub struct Scheduler {
    cancel: Arc<RenderCancel>,
    backend: Backend,
    generation: u64,
    state: CycleState,
    /// Request of the current cycle.
    request: Option<RenderRequest>,
    /// Block size of the next pass not yet published.
    next_block: Option<u32>,
    pending: Option<PixelBuffer>,
}

impl Scheduler {
    /// Start a scheduler backed by a `render-worker` thread, falling back
    /// to inline rendering if the thread cannot be spawned.
    pub fn new(notify: Option<RepaintNotifier>) -> Self {
        let cancel = Arc::new(RenderCancel::new());
        let (tx_job, rx_job) = mpsc::channel::<RenderJob>();
        let (tx_progress, rx_progress) = mpsc::channel::<RenderProgress>();

        let worker_cancel = Arc::clone(&cancel);
        let spawned = thread::Builder::new()
            .name("render-worker".into())
            .spawn(move || render_worker(rx_job, tx_progress, worker_cancel, notify));

        let backend = match spawned {
            Ok(handle) => {
                info!("Render worker started");
                Backend::Worker {
                    tx: Some(tx_job),
                    rx: rx_progress,
                    handle: Some(handle),
                }
            }
            Err(e) => {
                warn!("Failed to spawn render worker, rendering inline: {e}");
                Backend::Inline
            }
        };
        Self::with_backend(cancel, backend)
    }

    /// A scheduler that never uses a worker thread.
    pub fn inline() -> Self {
        Self::with_backend(Arc::new(RenderCancel::new()), Backend::Inline)
    }

    fn with_backend(cancel: Arc<RenderCancel>, backend: Backend) -> Self {
        Self {
            generation: cancel.generation(),
            cancel,
            backend,
            state: CycleState::Idle,
            request: None,
            next_block: None,
            pending: None,
        }
    }

    /// Cancel whatever is in flight and start a new cycle for `request`,
    /// whose block size is the coarsest pass.
    ///
    /// The coarse pass is rendered before this returns and is immediately
    /// available through [`take_frame`](Self::take_frame).
    pub fn start_cycle(&mut self, request: RenderRequest) -> crate::Result<()> {
        request.validate()?;
        self.generation = self.cancel.cancel();
        let generation = self.generation;
        let max_block = request.block_size;
        debug!(
            generation,
            max_block,
            width = request.width,
            height = request.height,
            "Starting render cycle"
        );

        if let Some(buffer) = render_tile_cancellable(&request, &self.cancel, generation)? {
            self.pending = Some(buffer);
        }

        if max_block == 1 {
            self.state = CycleState::Settled;
            self.next_block = None;
            self.request = Some(request);
            return Ok(());
        }

        let next = next_block_size(max_block);
        self.state = CycleState::Coarse;
        self.next_block = Some(next);

        if let Backend::Worker { tx: Some(tx), .. } = &self.backend {
            let job = RenderJob {
                generation,
                request: request.with_block_size(next),
            };
            if tx.send(job).is_err() {
                warn!("Render worker unavailable, rendering inline");
                self.fall_back_to_inline();
            }
        }
        self.request = Some(request);
        Ok(())
    }

    /// Collect finished passes. Call once per host frame.
    pub fn poll(&mut self) {
        let mut received = Vec::new();
        let mut disconnected = false;
        if let Backend::Worker { rx, .. } = &self.backend {
            loop {
                match rx.try_recv() {
                    Ok(progress) => received.push(progress),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        disconnected = true;
                        break;
                    }
                }
            }
        }
        for progress in received {
            self.accept(progress);
        }
        if disconnected {
            warn!("Render worker disconnected, rendering inline");
            self.fall_back_to_inline();
        }
        if matches!(self.backend, Backend::Inline) {
            self.step_inline();
        }
    }

    fn accept(&mut self, progress: RenderProgress) {
        if progress.generation != self.generation {
            debug!(
                generation = progress.generation,
                current = self.generation,
                "Dropping stale pass"
            );
            return;
        }
        if progress.done {
            self.state = CycleState::Settled;
            self.next_block = None;
            return;
        }
        if let Some(buffer) = progress.buffer {
            self.publish(progress.block_size, buffer);
        }
    }

    fn publish(&mut self, block_size: u32, buffer: PixelBuffer) {
        self.pending = Some(buffer);
        if block_size <= 1 {
            self.state = CycleState::Settled;
            self.next_block = None;
        } else {
            self.state = CycleState::Refining(block_size);
            self.next_block = Some(next_block_size(block_size));
        }
        debug!(generation = self.generation, block_size, "Pass published");
    }

    fn step_inline(&mut self) {
        let (Some(block_size), Some(request)) = (self.next_block, &self.request) else {
            return;
        };
        let pass = request.with_block_size(block_size);
        match render_tile_cancellable(&pass, &self.cancel, self.generation) {
            Ok(Some(buffer)) => self.publish(block_size, buffer),
            Ok(None) => {}
            Err(e) => {
                error!(block_size, "Inline render pass failed: {e}");
                self.next_block = None;
            }
        }
    }

    fn fall_back_to_inline(&mut self) {
        let old = std::mem::replace(&mut self.backend, Backend::Inline);
        if let Backend::Worker { tx, handle, .. } = old {
            drop(tx);
            if let Some(handle) = handle {
                if handle.join().is_err() {
                    error!("Render worker panicked");
                }
            }
        }
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    /// `true` when a pass is waiting to be displayed.
    pub fn has_pending_frame(&self) -> bool {
        self.pending.is_some()
    }

    /// Hand the newest published pass to the display.
    pub fn take_frame(&mut self) -> Option<PixelBuffer> {
        self.pending.take()
    }

    /// Band progress of the pass being rendered, as `(done, total)`.
    pub fn progress(&self) -> (usize, usize) {
        self.cancel.progress()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_inline(&self) -> bool {
        matches!(self.backend, Backend::Inline)
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Backend::Worker { tx, handle, .. } = &mut self.backend {
            tx.take();
            if let Some(handle) = handle.take() {
                let _ = handle.join();
            }
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("generation", &self.generation)
            .field("state", &self.state)
            .field("next_block", &self.next_block)
            .field("inline", &self.is_inline())
            .field("pending", &self.pending.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use brotview_core::{ColorMapRegistry, EscapeParams, Rect};

    use super::*;
    use crate::compositor::render_tile;

    fn request(block_size: u32) -> RenderRequest {
        RenderRequest::new(
            48,
            32,
            Rect::new(-2.0, -1.5, 3.0, 3.0).unwrap(),
            block_size,
            EscapeParams::new(40).unwrap(),
            ColorMapRegistry::builtin().default_map().clone(),
        )
        .unwrap()
    }

    /// A scheduler wired to channels the caller controls, with no thread.
    fn detached_worker(
        tx: Sender<RenderJob>,
        rx: Receiver<RenderProgress>,
    ) -> Scheduler {
        Scheduler::with_backend(
            Arc::new(RenderCancel::new()),
            Backend::Worker {
                tx: Some(tx),
                rx,
                handle: None,
            },
        )
    }

    /// Take every published frame until the cycle settles.
    fn frames_until_settled(s: &mut Scheduler) -> Vec<PixelBuffer> {
        let mut frames = Vec::new();
        for _ in 0..16 {
            if let Some(frame) = s.take_frame() {
                frames.push(frame);
            }
            if s.state().is_settled() && !s.has_pending_frame() {
                break;
            }
            s.poll();
        }
        frames
    }

    #[test]
    fn block_sizes_halve_rounding_up() {
        let mut sizes = vec![16];
        while *sizes.last().unwrap() > 1 {
            sizes.push(next_block_size(*sizes.last().unwrap()));
        }
        assert_eq!(sizes, [16, 8, 4, 2, 1]);
        assert_eq!(next_block_size(5), 3);
        assert_eq!(next_block_size(3), 2);
        assert_eq!(next_block_size(1), 1);
    }

    #[test]
    fn run_passes_emits_every_pass_then_done() {
        let cancel = RenderCancel::new();
        let gen = cancel.generation();
        let mut seen = Vec::new();
        let listening = run_passes(&request(5), &cancel, gen, |p| {
            seen.push((p.block_size, p.done, p.buffer.is_some()));
            true
        });
        assert!(listening);
        assert_eq!(
            seen,
            [
                (5, false, true),
                (3, false, true),
                (2, false, true),
                (1, false, true),
                (1, true, false)
            ]
        );
    }

    #[test]
    fn run_passes_stops_when_receiver_refuses() {
        let cancel = RenderCancel::new();
        let gen = cancel.generation();
        let mut count = 0;
        assert!(!run_passes(&request(16), &cancel, gen, |_| {
            count += 1;
            false
        }));
        assert_eq!(count, 1);
    }

    #[test]
    fn run_passes_abandons_stale_generation() {
        let cancel = RenderCancel::new();
        let gen = cancel.generation();
        cancel.cancel();
        let mut count = 0;
        assert!(run_passes(&request(16), &cancel, gen, |_| {
            count += 1;
            true
        }));
        assert_eq!(count, 0);
    }

    #[test]
    fn inline_cycle_walks_states() {
        let mut s = Scheduler::inline();
        assert_eq!(s.state(), CycleState::Idle);

        s.start_cycle(request(4)).unwrap();
        assert_eq!(s.state(), CycleState::Coarse);
        assert!(s.has_pending_frame());
        assert_eq!(s.take_frame(), Some(render_tile(&request(4)).unwrap()));
        assert!(!s.has_pending_frame());

        s.poll();
        assert_eq!(s.state(), CycleState::Refining(2));
        s.poll();
        assert_eq!(s.state(), CycleState::Settled);
        assert_eq!(s.take_frame(), Some(render_tile(&request(1)).unwrap()));

        s.poll();
        assert_eq!(s.state(), CycleState::Settled);
        assert!(!s.has_pending_frame());
    }

    #[test]
    fn single_pixel_max_block_settles_immediately() {
        let mut s = Scheduler::inline();
        s.start_cycle(request(1)).unwrap();
        assert_eq!(s.state(), CycleState::Settled);
        assert!(s.has_pending_frame());
    }

    #[test]
    fn invalid_request_leaves_state_alone() {
        let mut s = Scheduler::inline();
        assert!(s.start_cycle(request(4).with_block_size(0)).is_err());
        assert_eq!(s.state(), CycleState::Idle);
        assert_eq!(s.generation(), 0);
    }

    #[test]
    fn stale_progress_is_dropped() {
        let mut s = Scheduler::inline();
        s.start_cycle(request(8)).unwrap();
        s.take_frame();
        let stale = s.generation() - 1;
        s.accept(RenderProgress {
            generation: stale,
            block_size: 1,
            done: false,
            buffer: Some(PixelBuffer::new(48, 32)),
        });
        assert!(!s.has_pending_frame());
        assert_eq!(s.state(), CycleState::Coarse);
    }

    #[test]
    fn failed_job_send_falls_back_to_inline() {
        let (tx_job, rx_job) = mpsc::channel::<RenderJob>();
        let (_tx_progress, rx_progress) = mpsc::channel::<RenderProgress>();
        drop(rx_job);
        let mut s = detached_worker(tx_job, rx_progress);
        assert!(!s.is_inline());

        s.start_cycle(request(4)).unwrap();
        assert!(s.is_inline());
        assert_eq!(s.state(), CycleState::Coarse);

        let frames = frames_until_settled(&mut s);
        assert_eq!(s.state(), CycleState::Settled);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames.last(), Some(&render_tile(&request(1)).unwrap()));
    }

    #[test]
    fn disconnected_worker_falls_back_to_inline() {
        let (tx_job, _rx_job) = mpsc::channel::<RenderJob>();
        let (tx_progress, rx_progress) = mpsc::channel::<RenderProgress>();
        drop(tx_progress);
        let mut s = detached_worker(tx_job, rx_progress);

        s.start_cycle(request(4)).unwrap();
        assert!(!s.is_inline());
        assert!(s.take_frame().is_some());

        s.poll();
        assert!(s.is_inline());
        assert_eq!(s.state(), CycleState::Refining(2));

        let frames = frames_until_settled(&mut s);
        assert_eq!(s.state(), CycleState::Settled);
        assert_eq!(frames.last(), Some(&render_tile(&request(1)).unwrap()));
    }
}
