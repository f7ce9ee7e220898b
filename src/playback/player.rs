use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::formats::Narrative;
use crate::gemini::AudioClip;
use crate::playback::audio::AudioOutput;
use crate::playback::sequencer::{Effect, PlaybackSnapshot, PlaybackTiming, Sequencer, Ticket};
use crate::speech::{SpeechSynthesizer, narrate};

#[derive(Debug, Clone)]
pub enum Command {
    Play,
    Pause,
    TogglePlay,
    Next,
    Prev,
    Load(Box<Narrative>),
}

#[derive(Debug)]
enum Signal {
    FlipElapsed(Ticket),
    NarrationReady(Ticket, Option<AudioClip>),
    NarrationFinished(Ticket),
    NarrationFailed(Ticket),
    DwellElapsed(Ticket),
}

/// Handle to a running viewer. Dropping it (or calling [`PlayerHandle::close`])
/// stops the viewer and cancels any pending timer or audio.
pub struct PlayerHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<PlaybackSnapshot>,
    task: JoinHandle<()>,
}

impl PlayerHandle {
    pub fn send(&self, command: Command) -> anyhow::Result<()> {
        self.commands
            .send(command)
            .map_err(|_| anyhow::anyhow!("player is closed"))
    }

    pub fn play(&self) -> anyhow::Result<()> {
        self.send(Command::Play)
    }

    pub fn pause(&self) -> anyhow::Result<()> {
        self.send(Command::Pause)
    }

    pub fn toggle(&self) -> anyhow::Result<()> {
        self.send(Command::TogglePlay)
    }

    pub fn next(&self) -> anyhow::Result<()> {
        self.send(Command::Next)
    }

    pub fn prev(&self) -> anyhow::Result<()> {
        self.send(Command::Prev)
    }

    pub fn load(&self, narrative: Narrative) -> anyhow::Result<()> {
        self.send(Command::Load(Box::new(narrative)))
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.state.clone()
    }

    pub async fn close(self) -> anyhow::Result<()> {
        let Self { commands, task, .. } = self;
        drop(commands);
        task.await.context("join player task")
    }
}

pub struct Player {
    sequencer: Sequencer,
    narrative: Narrative,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    output: Arc<dyn AudioOutput>,
    signals: mpsc::UnboundedSender<Signal>,
    state: watch::Sender<PlaybackSnapshot>,
    pending: Option<JoinHandle<()>>,
    flip: Option<JoinHandle<()>>,
    clip: Option<AudioClip>,
}

impl Player {
    /// Starts a viewer for `narrative` on the current tokio runtime, on the cover, paused.
    pub fn spawn(
        narrative: Narrative,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        output: Arc<dyn AudioOutput>,
        timing: PlaybackTiming,
    ) -> PlayerHandle {
        let sequencer = Sequencer::for_narrative(&narrative, timing);
        let (state_tx, state_rx) = watch::channel(sequencer.snapshot());
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();

        let player = Self {
            sequencer,
            narrative,
            synthesizer,
            output,
            signals: signal_tx,
            state: state_tx,
            pending: None,
            flip: None,
            clip: None,
        };
        let task = tokio::spawn(run(player, command_rx, signal_rx));

        PlayerHandle {
            commands: command_tx,
            state: state_rx,
            task,
        }
    }

    fn handle_command(&mut self, command: Command) -> Vec<Effect> {
        tracing::debug!(?command, page_index = self.sequencer.page_index(), "player command");
        match command {
            Command::Play => self.sequencer.play(),
            Command::Pause => self.sequencer.pause(),
            Command::TogglePlay => self.sequencer.toggle(),
            Command::Next => self.sequencer.next(),
            Command::Prev => self.sequencer.prev(),
            Command::Load(narrative) => {
                self.narrative = *narrative;
                abort(&mut self.flip);
                self.sequencer.load(self.narrative.total_pages())
            }
        }
    }

    fn handle_signal(&mut self, signal: Signal) -> Vec<Effect> {
        match signal {
            Signal::FlipElapsed(ticket) => self.sequencer.flip_elapsed(ticket),
            Signal::NarrationReady(ticket, clip) => {
                let effects = self.sequencer.narration_ready(ticket, clip.is_some());
                if !effects.is_empty() {
                    self.clip = clip;
                }
                effects
            }
            Signal::NarrationFinished(ticket) => self.sequencer.narration_finished(ticket),
            Signal::NarrationFailed(ticket) => self.sequencer.narration_failed(ticket),
            Signal::DwellElapsed(ticket) => self.sequencer.dwell_elapsed(ticket),
        }
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Disarm => {
                    abort(&mut self.pending);
                    self.clip = None;
                }
                Effect::ScheduleFlip { ticket, after } => {
                    abort(&mut self.flip);
                    self.flip = Some(self.after(after, Signal::FlipElapsed(ticket)));
                }
                Effect::ScheduleDwell { ticket, after } => {
                    abort(&mut self.pending);
                    self.pending = Some(self.after(after, Signal::DwellElapsed(ticket)));
                }
                Effect::RequestNarration { ticket } => {
                    abort(&mut self.pending);
                    let text = self
                        .narrative
                        .page(ticket.page_index())
                        .map(|page| page.narration().to_owned())
                        .unwrap_or_default();
                    let synthesizer = Arc::clone(&self.synthesizer);
                    let signals = self.signals.clone();
                    self.pending = Some(tokio::spawn(async move {
                        let clip = narrate(synthesizer.as_ref(), &text).await;
                        let _ = signals.send(Signal::NarrationReady(ticket, clip));
                    }));
                }
                Effect::PlayNarration { ticket } => {
                    abort(&mut self.pending);
                    let Some(clip) = self.clip.take() else {
                        let _ = self.signals.send(Signal::NarrationFailed(ticket));
                        continue;
                    };
                    let output = Arc::clone(&self.output);
                    let signals = self.signals.clone();
                    self.pending = Some(tokio::spawn(async move {
                        let signal = match output.play(&clip).await {
                            Ok(()) => Signal::NarrationFinished(ticket),
                            Err(err) => {
                                tracing::debug!(error = %format!("{err:#}"), "narration playback failed");
                                Signal::NarrationFailed(ticket)
                            }
                        };
                        let _ = signals.send(signal);
                    }));
                }
            }
        }
    }

    fn after(&self, delay: Duration, signal: Signal) -> JoinHandle<()> {
        let signals = self.signals.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = signals.send(signal);
        })
    }

    fn publish(&self) {
        let snapshot = self.sequencer.snapshot();
        self.state.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        });
    }

    fn teardown(&mut self) {
        let effects = self.sequencer.close();
        self.apply(effects);
        abort(&mut self.flip);
        self.publish();
        tracing::debug!("player closed");
    }
}

async fn run(
    mut player: Player,
    mut commands: mpsc::UnboundedReceiver<Command>,
    mut signals: mpsc::UnboundedReceiver<Signal>,
) {
    loop {
        let effects = tokio::select! {
            command = commands.recv() => match command {
                Some(command) => player.handle_command(command),
                None => break,
            },
            Some(signal) = signals.recv() => player.handle_signal(signal),
        };
        player.apply(effects);
        player.publish();
    }
    player.teardown();
}

fn abort(task: &mut Option<JoinHandle<()>>) {
    if let Some(task) = task.take() {
        task.abort();
    }
}
