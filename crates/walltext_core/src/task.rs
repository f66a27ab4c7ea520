use std::{
    sync::{
        atomic::{AtomicI32, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::trace;

/// A continuation that must run on the tick thread.
pub type TickJob<Ctx> = Box<dyn FnOnce(&mut Ctx) + Send + 'static>;

/// Owned by the tick thread. Drains the continuations queued by [`TickHandle`]s.
pub struct TickScheduler<Ctx> {
    receiver: UnboundedReceiver<TickJob<Ctx>>,
    handle: TickHandle<Ctx>,
}

/// Cheap, cloneable and `Send` side of the scheduler.
/// Background work never touches the tick context directly, it queues a continuation instead.
pub struct TickHandle<Ctx> {
    sender: UnboundedSender<TickJob<Ctx>>,
    nb: Arc<AtomicI32>, // number of background jobs whose continuation is not queued yet
}

impl<Ctx> Clone for TickHandle<Ctx> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            nb: Arc::clone(&self.nb),
        }
    }
}

impl<Ctx: 'static> TickHandle<Ctx> {
    /// Queue `job` for the next tick boundary. Jobs run in submission order.
    pub fn next_tick<F>(&self, job: F)
    where
        F: FnOnce(&mut Ctx) + Send + 'static,
    {
        if self.sender.send(Box::new(job)).is_err() {
            trace!("tick scheduler is gone, dropping job");
        }
    }

    /// Run `work` on the worker pool, then `then` on the tick with its result.
    pub fn background<T, W, C>(&self, work: W, then: C)
    where
        T: Send + 'static,
        W: FnOnce() -> T + Send + 'static,
        C: FnOnce(&mut Ctx, T) + Send + 'static,
    {
        let handle = self.clone();
        self.nb.fetch_add(1, Ordering::Relaxed);
        rayon::spawn(move || {
            // decrement only once the continuation is queued, see TickScheduler::run_until_idle
            let _guard = scopeguard::guard(Arc::clone(&handle.nb), |nb| {
                nb.fetch_sub(1, Ordering::Relaxed);
            });
            let result = work();
            handle.next_tick(move |ctx| then(ctx, result));
        });
    }

    pub fn count(&self) -> i32 {
        self.nb.load(Ordering::Relaxed)
    }
    pub fn is_running(&self) -> bool {
        self.count() != 0
    }
}

impl<Ctx: 'static> Default for TickScheduler<Ctx> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Ctx: 'static> TickScheduler<Ctx> {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded_channel();
        Self {
            receiver,
            handle: TickHandle {
                sender,
                nb: Arc::new(AtomicI32::new(0)),
            },
        }
    }

    pub fn handle(&self) -> TickHandle<Ctx> {
        self.handle.clone()
    }

    /// Runs every job queued before this call. Jobs queued while running wait for the next tick.
    pub fn tick(&mut self, ctx: &mut Ctx) -> usize {
        let mut pending = Vec::new();
        while let Ok(job) = self.receiver.try_recv() {
            pending.push(job);
        }
        let nb = pending.len();
        for job in pending {
            job(ctx);
        }
        nb
    }

    /// Ticks until no background job is running and nothing is queued.
    /// Returns false if `timeout` elapsed first.
    pub fn run_until_idle(&mut self, ctx: &mut Ctx, timeout: Duration) -> bool {
        let start = Instant::now();
        loop {
            // sample before ticking: a job that finished before the sample already queued its continuation
            let busy = self.handle.is_running();
            let ran = self.tick(ctx);
            if !busy && ran == 0 {
                return true;
            }
            if start.elapsed() > timeout {
                return false;
            }
            if ran == 0 {
                std::thread::sleep(Duration::from_millis(1));
            }
        }
    }
}
