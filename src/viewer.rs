use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use tokio::io::AsyncBufReadExt as _;
use tokio::sync::watch;

use crate::cli::PlayArgs;
use crate::formats::{Narrative, Page};
use crate::gemini::{GeminiClient, GeminiConfig};
use crate::playback::{PacedOutput, PlaybackSnapshot, PlaybackTiming, Player, PlayerHandle};
use crate::speech;

pub async fn run(args: PlayArgs) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(&args.story)
        .await
        .with_context(|| format!("read story: {}", args.story))?;
    let narrative: Narrative = serde_json::from_str(&raw).context("parse story json")?;
    if narrative.scenes.is_empty() {
        anyhow::bail!("story has no scenes: {}", args.story);
    }
    if !args.dwell_secs.is_finite() || args.dwell_secs <= 0.0 {
        anyhow::bail!("--dwell-secs must be > 0");
    }
    let dwell = Duration::try_from_secs_f64(args.dwell_secs).context("--dwell-secs out of range")?;

    let client = GeminiClient::new(GeminiConfig::from_env())?;
    let synthesizer = speech::from_client(&client);
    let output = Arc::new(PacedOutput::new(args.audio_dir.map(PathBuf::from)));
    let timing = PlaybackTiming {
        dwell,
        ..PlaybackTiming::default()
    };

    tracing::info!(
        title = %narrative.title,
        pages = narrative.total_pages(),
        interactive = args.interactive,
        "open storybook"
    );
    let player = Player::spawn(narrative.clone(), synthesizer, output, timing);
    let state = player.subscribe();
    print_page(&narrative, 0);

    if args.interactive {
        drive_interactive(&player, &narrative, state).await?;
    } else {
        player.play()?;
        drive_autoplay(&narrative, state).await?;
    }

    player.close().await
}

async fn drive_autoplay(
    narrative: &Narrative,
    mut state: watch::Receiver<PlaybackSnapshot>,
) -> anyhow::Result<()> {
    let mut shown = 0;
    let mut started = false;
    loop {
        state.changed().await.context("player stopped")?;
        let snapshot = *state.borrow_and_update();
        if snapshot.page_index != shown {
            shown = snapshot.page_index;
            print_page(narrative, shown);
        }
        if snapshot.is_playing {
            started = true;
        } else if started && !snapshot.is_transitioning {
            tracing::info!(page_index = shown, "playback finished");
            return Ok(());
        }
    }
}

async fn drive_interactive(
    player: &PlayerHandle,
    narrative: &Narrative,
    mut state: watch::Receiver<PlaybackSnapshot>,
) -> anyhow::Result<()> {
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut shown = 0;
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("read stdin")? else {
                    return Ok(());
                };
                match line.trim() {
                    "n" | "next" => player.next()?,
                    "p" | "prev" => player.prev()?,
                    "" | "space" | "play" | "pause" => player.toggle()?,
                    "q" | "quit" => return Ok(()),
                    other => eprintln!("unknown command: {other:?} (n, p, space, q)"),
                }
            }
            changed = state.changed() => {
                changed.context("player stopped")?;
                let snapshot = *state.borrow_and_update();
                if snapshot.page_index != shown {
                    shown = snapshot.page_index;
                    print_page(narrative, shown);
                }
            }
        }
    }
}

fn print_page(narrative: &Narrative, index: usize) {
    let total = narrative.total_pages();
    match narrative.page(index) {
        Some(Page::Cover { title, category }) => {
            println!("[{}/{total}] {title} ({})", index + 1, category.label());
        }
        Some(Page::Scene { number, scene }) => {
            println!("[{}/{total}] 장면 {number}", index + 1);
            println!("{}", scene.narration_text);
            println!("(image prompt: {})", scene.image_description);
        }
        Some(Page::Summary { note }) => {
            println!("[{}/{total}] {note}", index + 1);
        }
        None => {}
    }
}
