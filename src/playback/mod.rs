pub mod audio;
pub mod player;
pub mod sequencer;

pub use audio::{AudioOutput, PacedOutput};
pub use player::{Command, Player, PlayerHandle};
pub use sequencer::{
    DWELL_DURATION, Dwell, Effect, FLIP_DURATION, PlaybackSnapshot, PlaybackTiming, Sequencer,
    Ticket,
};
