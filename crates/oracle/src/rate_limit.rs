use log::debug;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

pub const RATE_WINDOW: Duration = Duration::from_secs(60);

/// Sliding-window admission control: at most `max_per_window` admissions in
/// any [`RATE_WINDOW`].
///
/// State is per process. Callers sharing one quota across processes are not
/// coordinated.
#[derive(Debug)]
pub struct RateLimiter {
    max_per_window: usize,
    window: Duration,
    admitted: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// `max_per_minute == 0` disables limiting.
    pub fn new(max_per_minute: usize) -> Self {
        Self::with_window(max_per_minute, RATE_WINDOW)
    }

    pub fn with_window(max_per_window: usize, window: Duration) -> Self {
        Self {
            max_per_window,
            window,
            admitted: Mutex::new(VecDeque::new()),
        }
    }

    pub fn max_per_window(&self) -> usize {
        self.max_per_window
    }

    /// Wait for admission and record it. Returns how long the caller was held.
    ///
    /// The queue lock is held while waiting, so concurrent callers are
    /// admitted in arrival order.
    pub async fn acquire(&self) -> Duration {
        if self.max_per_window == 0 {
            return Duration::ZERO;
        }

        let started = Instant::now();
        let mut admitted = self.admitted.lock().await;
        loop {
            let now = Instant::now();
            while admitted
                .front()
                .is_some_and(|oldest| now.duration_since(*oldest) >= self.window)
            {
                admitted.pop_front();
            }

            if admitted.len() < self.max_per_window {
                admitted.push_back(now);
                return now.duration_since(started);
            }

            let Some(oldest) = admitted.front().copied() else {
                continue;
            };
            let wait = self.window.saturating_sub(now.duration_since(oldest));
            debug!("rate limit reached, waiting {:.1}s", wait.as_secs_f64());
            sleep(wait).await;
        }
    }

    /// Admissions currently inside the window.
    pub async fn in_window(&self) -> usize {
        let now = Instant::now();
        self.admitted
            .lock()
            .await
            .iter()
            .filter(|at| now.duration_since(**at) < self.window)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn admits_up_to_ceiling_without_waiting() {
        let limiter = RateLimiter::new(3);
        for _ in 0..3 {
            assert_eq!(limiter.acquire().await, Duration::ZERO);
        }
        assert_eq!(limiter.in_window().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn next_request_waits_for_oldest_to_leave_window() {
        let limiter = RateLimiter::new(2);
        limiter.acquire().await;
        tokio::time::advance(Duration::from_secs(10)).await;
        limiter.acquire().await;

        let waited = limiter.acquire().await;
        assert_eq!(waited, Duration::from_secs(50));
        assert_eq!(limiter.in_window().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn window_slides() {
        let limiter = RateLimiter::new(1);
        limiter.acquire().await;
        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(limiter.acquire().await, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_ceiling_disables_limiting() {
        let limiter = RateLimiter::new(0);
        for _ in 0..100 {
            assert_eq!(limiter.acquire().await, Duration::ZERO);
        }
    }
}
