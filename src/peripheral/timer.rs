// Copyright 2026 blehr-uart contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Single-shot notification timer, rearmed by its owner after each tick.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
pub struct PeriodicTimer {
    period: Duration,
    deadline: Option<Instant>,
}

impl PeriodicTimer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            deadline: None,
        }
    }

    /// Schedule the next tick one period from now, replacing any pending one.
    pub fn arm(&mut self) {
        self.deadline = Some(Instant::now() + self.period);
    }

    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

/// Wait for `deadline`, or forever when there is none.
pub async fn expired(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arm_disarm() {
        let mut timer = PeriodicTimer::new(Duration::from_secs(1));
        assert!(!timer.is_armed());

        timer.arm();
        assert!(timer.is_armed());
        assert!(timer.deadline().unwrap() > Instant::now());

        timer.disarm();
        assert!(!timer.is_armed());
        assert_eq!(timer.deadline(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_waits_for_deadline() {
        let mut timer = PeriodicTimer::new(Duration::from_millis(250));
        let start = Instant::now();
        timer.arm();

        expired(timer.deadline()).await;
        assert!(start.elapsed() >= Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarmed_never_expires() {
        let result = tokio::time::timeout(Duration::from_secs(60), expired(None)).await;
        assert!(result.is_err());
    }
}
