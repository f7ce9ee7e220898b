//! Page sequencing and auto-play for the storybook viewer.
//!
//! [`Sequencer`] is a synchronous state machine. It never sleeps or performs I/O;
//! every operation returns the [`Effect`]s the caller must carry out (arm a timer,
//! ask for narration audio, cancel whatever is pending). Each armed mechanism is
//! identified by a [`Ticket`], and a delivery carrying any other ticket is ignored,
//! so a timer or audio callback that outlived a pause or a page change cannot move
//! the page.

use std::time::Duration;

use crate::formats::Narrative;

pub const FLIP_DURATION: Duration = Duration::from_millis(600);
pub const DWELL_DURATION: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackTiming {
    pub flip: Duration,
    pub dwell: Duration,
}

impl Default for PlaybackTiming {
    fn default() -> Self {
        Self {
            flip: FLIP_DURATION,
            dwell: DWELL_DURATION,
        }
    }
}

/// Identifies one scheduled flip or one armed advance mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
    page_index: usize,
}

impl Ticket {
    /// Page the ticket was issued for (the target page, for flips).
    pub fn page_index(&self) -> usize {
        self.page_index
    }
}

/// What the current page is waiting on before it advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dwell {
    AwaitingNarration,
    Narrating,
    Timer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Cancel the pending narration request, audio playback or dwell timer.
    Disarm,
    ScheduleFlip { ticket: Ticket, after: Duration },
    RequestNarration { ticket: Ticket },
    PlayNarration { ticket: Ticket },
    ScheduleDwell { ticket: Ticket, after: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackSnapshot {
    pub page_index: usize,
    pub total_pages: usize,
    pub is_playing: bool,
    pub is_transitioning: bool,
    pub dwell: Option<Dwell>,
}

#[derive(Debug, Clone, Copy)]
struct Armed {
    ticket: Ticket,
    dwell: Dwell,
}

#[derive(Debug)]
pub struct Sequencer {
    total_pages: usize,
    page_index: usize,
    is_playing: bool,
    flip: Option<Ticket>,
    armed: Option<Armed>,
    generation: u64,
    timing: PlaybackTiming,
}

impl Sequencer {
    pub fn new(total_pages: usize, timing: PlaybackTiming) -> Self {
        Self {
            total_pages: total_pages.max(1),
            page_index: 0,
            is_playing: false,
            flip: None,
            armed: None,
            generation: 0,
            timing,
        }
    }

    pub fn for_narrative(narrative: &Narrative, timing: PlaybackTiming) -> Self {
        Self::new(narrative.total_pages(), timing)
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_transitioning(&self) -> bool {
        self.flip.is_some()
    }

    pub fn dwell(&self) -> Option<Dwell> {
        self.armed.map(|armed| armed.dwell)
    }

    pub fn is_last_page(&self) -> bool {
        self.page_index + 1 == self.total_pages
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            page_index: self.page_index,
            total_pages: self.total_pages,
            is_playing: self.is_playing,
            is_transitioning: self.is_transitioning(),
            dwell: self.dwell(),
        }
    }

    /// New narrative: back to the cover, stopped.
    pub fn load(&mut self, total_pages: usize) -> Vec<Effect> {
        self.total_pages = total_pages.max(1);
        self.page_index = 0;
        self.is_playing = false;
        self.flip = None;
        self.armed = None;
        vec![Effect::Disarm]
    }

    pub fn close(&mut self) -> Vec<Effect> {
        self.is_playing = false;
        self.flip = None;
        self.armed = None;
        vec![Effect::Disarm]
    }

    pub fn play(&mut self) -> Vec<Effect> {
        if self.is_playing {
            return Vec::new();
        }
        self.is_playing = true;
        if self.flip.is_some() {
            // Dwell starts when the flip commits.
            return Vec::new();
        }
        self.arm_narration()
    }

    pub fn pause(&mut self) -> Vec<Effect> {
        if !self.is_playing {
            return Vec::new();
        }
        self.is_playing = false;
        self.armed = None;
        vec![Effect::Disarm]
    }

    pub fn toggle(&mut self) -> Vec<Effect> {
        if self.is_playing {
            self.pause()
        } else {
            self.play()
        }
    }

    pub fn next(&mut self) -> Vec<Effect> {
        if self.flip.is_some() {
            return Vec::new();
        }
        if self.is_last_page() {
            if !self.is_playing {
                return Vec::new();
            }
            tracing::debug!(page_index = self.page_index, "reached last page; stopping");
            self.is_playing = false;
            self.armed = None;
            return vec![Effect::Disarm];
        }
        self.begin_flip(self.page_index + 1)
    }

    pub fn prev(&mut self) -> Vec<Effect> {
        if self.flip.is_some() || self.page_index == 0 {
            return Vec::new();
        }
        self.begin_flip(self.page_index - 1)
    }

    pub fn flip_elapsed(&mut self, ticket: Ticket) -> Vec<Effect> {
        if self.flip != Some(ticket) {
            return Vec::new();
        }
        self.flip = None;
        self.page_index = ticket.page_index;
        tracing::debug!(page_index = self.page_index, "page committed");
        if self.is_playing {
            self.arm_narration()
        } else {
            Vec::new()
        }
    }

    pub fn narration_ready(&mut self, ticket: Ticket, has_audio: bool) -> Vec<Effect> {
        if !self.is_armed(ticket, Dwell::AwaitingNarration) {
            return Vec::new();
        }
        if has_audio {
            self.set_dwell(Dwell::Narrating);
            vec![Effect::PlayNarration { ticket }]
        } else {
            self.start_timer(ticket)
        }
    }

    /// Audio was obtained but could not be played.
    pub fn narration_failed(&mut self, ticket: Ticket) -> Vec<Effect> {
        if !self.is_armed(ticket, Dwell::Narrating) {
            return Vec::new();
        }
        self.start_timer(ticket)
    }

    pub fn narration_finished(&mut self, ticket: Ticket) -> Vec<Effect> {
        if !self.is_armed(ticket, Dwell::Narrating) {
            return Vec::new();
        }
        self.advance()
    }

    pub fn dwell_elapsed(&mut self, ticket: Ticket) -> Vec<Effect> {
        if !self.is_armed(ticket, Dwell::Timer) {
            return Vec::new();
        }
        self.advance()
    }

    fn advance(&mut self) -> Vec<Effect> {
        self.armed = None;
        if !self.is_playing {
            return Vec::new();
        }
        self.next()
    }

    fn begin_flip(&mut self, target: usize) -> Vec<Effect> {
        self.armed = None;
        let ticket = self.issue(target);
        self.flip = Some(ticket);
        vec![
            Effect::Disarm,
            Effect::ScheduleFlip {
                ticket,
                after: self.timing.flip,
            },
        ]
    }

    fn arm_narration(&mut self) -> Vec<Effect> {
        let ticket = self.issue(self.page_index);
        self.armed = Some(Armed {
            ticket,
            dwell: Dwell::AwaitingNarration,
        });
        vec![Effect::Disarm, Effect::RequestNarration { ticket }]
    }

    fn start_timer(&mut self, ticket: Ticket) -> Vec<Effect> {
        self.set_dwell(Dwell::Timer);
        vec![Effect::ScheduleDwell {
            ticket,
            after: self.timing.dwell,
        }]
    }

    fn is_armed(&self, ticket: Ticket, dwell: Dwell) -> bool {
        self.is_playing
            && self
                .armed
                .is_some_and(|armed| armed.ticket == ticket && armed.dwell == dwell)
    }

    fn set_dwell(&mut self, dwell: Dwell) {
        if let Some(armed) = self.armed.as_mut() {
            armed.dwell = dwell;
        }
    }

    fn issue(&mut self, page_index: usize) -> Ticket {
        self.generation += 1;
        Ticket {
            generation: self.generation,
            page_index,
        }
    }
}
