// Draw countdown timer with spoken reminders.
//
// `Stopped → Running → Expired` at one-second resolution. While more than
// five seconds remain the timer announces the remaining time at every
// five-second mark; in the final five seconds it announces every second.
// Speech goes through the `Speaker` trait so the orchestrator can run
// silent; speech failures are swallowed, a reminder that does not play is
// not an error.
//
// Second ticks come from a spawned interval task sending generation-tagged
// `CoreEvent::TimerTick`s, same pattern as the reveal animation.

use std::process::{Command, Stdio};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::format::spoken_time;
use crate::protocol::CoreEvent;

pub trait Speaker: Send + Sync {
    fn speak(&self, text: &str);
}

/// Speaks through the system TTS command, trying `say` (macOS) then
/// `espeak`. Fire and forget; a missing binary just means no audio.
pub struct SystemSpeaker;

impl Speaker for SystemSpeaker {
    fn speak(&self, text: &str) {
        for program in ["say", "espeak"] {
            let spawned = Command::new(program)
                .arg(text)
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn();
            if spawned.is_ok() {
                return;
            }
        }
        debug!("no TTS command available, reminder not spoken");
    }
}

pub struct SilentSpeaker;

impl Speaker for SilentSpeaker {
    fn speak(&self, _text: &str) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Stopped,
    Running,
    Expired,
}

pub struct DrawTimer {
    phase: TimerPhase,
    remaining: u32,
    total: u32,
    generation: u64,
    ticker: Option<JoinHandle<()>>,
    events: mpsc::Sender<CoreEvent>,
}

impl DrawTimer {
    pub fn new(events: mpsc::Sender<CoreEvent>) -> Self {
        DrawTimer {
            phase: TimerPhase::Stopped,
            remaining: 0,
            total: 0,
            generation: 0,
            ticker: None,
            events,
        }
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    /// Start (or restart) the countdown from the full duration. A running
    /// timer is cancelled first, so restart always means a fresh window.
    pub fn start(&mut self, seconds: u32) {
        self.stop_ticker();
        self.generation += 1;
        self.total = seconds;
        self.remaining = seconds;

        if seconds == 0 {
            self.phase = TimerPhase::Expired;
            return;
        }
        self.phase = TimerPhase::Running;

        let generation = self.generation;
        let events = self.events.clone();
        self.ticker = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.tick().await; // completes immediately
            loop {
                interval.tick().await;
                if events
                    .send(CoreEvent::TimerTick { generation })
                    .await
                    .is_err()
                {
                    break;
                }
            }
        }));
    }

    /// Halt without expiring (timer card closed).
    pub fn stop(&mut self) {
        self.stop_ticker();
        self.generation += 1;
        self.phase = TimerPhase::Stopped;
        self.remaining = 0;
    }

    /// One second elapsed. Returns `true` if the display should update.
    pub fn tick(&mut self, generation: u64, speaker: &dyn Speaker) -> bool {
        if generation != self.generation || self.phase != TimerPhase::Running {
            return false;
        }
        self.remaining = self.remaining.saturating_sub(1);

        if self.remaining == 0 {
            self.phase = TimerPhase::Expired;
            self.stop_ticker();
            speaker.speak("Time is up");
            return true;
        }

        let announce = if self.remaining <= 5 {
            true
        } else {
            self.remaining % 5 == 0
        };
        if announce {
            let text = format!("{} remaining", spoken_time(self.remaining));
            speaker.speak(&text);
        }
        true
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

impl Drop for DrawTimer {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}
