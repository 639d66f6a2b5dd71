//! Probabilistic fault injection.
//!
//! # Responsibilities
//! - Draw one sample per request from a shared random source
//! - Commit a synthetic 500 without touching the wrapped handler, or pass
//!   the request and the caller's sink straight through
//!
//! # Design Decisions
//! - The random source is the only shared mutable state in the handler tree
//! - Default source is the thread-local generator (lock free)
//! - Seeded source serialises access through a mutex for reproducibility

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{Handler, ResponseSink};
use crate::error::BuildError;
use crate::observability::metrics;

/// Body of the synthetic failure.
pub const CHAOS_BODY: &str = "Chaos";

/// A uniform sampler over `[0, 1)`, safe to call from many tasks at once.
pub trait RandomSource: Send + Sync + std::fmt::Debug {
    fn sample(&self) -> f64;
}

/// Samples from the calling thread's generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn sample(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

/// A deterministic generator shared behind a mutex.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn sample(&self) -> f64 {
        // Poisoning leaves the generator usable.
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.gen::<f64>()
    }
}

/// Fails a configurable share of requests with a synthetic 500.
#[derive(Debug)]
pub struct ChaosHandler {
    inner: Box<dyn Handler>,
    failure_chance: f64,
    random: Arc<dyn RandomSource>,
}

impl ChaosHandler {
    /// Wrap `inner`, sampling from the thread-local generator.
    pub fn new(inner: Box<dyn Handler>, failure_chance: f64) -> Result<Self, BuildError> {
        Self::with_source(inner, failure_chance, Arc::new(ThreadRandom))
    }

    /// Wrap `inner`, sampling from `random`.
    pub fn with_source(
        inner: Box<dyn Handler>,
        failure_chance: f64,
        random: Arc<dyn RandomSource>,
    ) -> Result<Self, BuildError> {
        if !(0.0..=1.0).contains(&failure_chance) {
            return Err(BuildError::InvalidProbability(failure_chance));
        }
        Ok(Self {
            inner,
            failure_chance,
            random,
        })
    }

    pub fn failure_chance(&self) -> f64 {
        self.failure_chance
    }
}

#[async_trait]
impl Handler for ChaosHandler {
    async fn serve(&self, request: Request<Body>, sink: &mut dyn ResponseSink) {
        // A chance of zero must never fire, even on a sample of exactly 0.0.
        let inject = self.failure_chance > 0.0 && self.random.sample() <= self.failure_chance;
        if inject {
            tracing::debug!(
                failure_chance = self.failure_chance,
                path = %request.uri().path(),
                "Injecting chaos failure"
            );
            metrics::record_chaos_injected();
            sink.set_status(StatusCode::INTERNAL_SERVER_ERROR);
            sink.write(CHAOS_BODY.as_bytes());
            return;
        }

        self.inner.serve(request, sink).await;
    }
}
