use media_screensaver::catalog::Catalog;
use media_screensaver::config::PlaybackTiming;
use media_screensaver::events::Key;
use media_screensaver::media::MediaItem;
use media_screensaver::sequencer::{Command, Phase, Sequencer};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn catalog(paths: &[&str]) -> Arc<Catalog> {
    let items = paths
        .iter()
        .map(|p| MediaItem::classify(PathBuf::from(p)).unwrap())
        .collect();
    Arc::new(Catalog::from_items(items).unwrap())
}

fn timing() -> PlaybackTiming {
    PlaybackTiming {
        first_image_delay: Duration::from_secs(5),
        image_delay: Duration::from_secs(10),
        minimum_video_watch: Duration::from_secs(10),
    }
}

fn sequencer(paths: &[&str]) -> Sequencer {
    Sequencer::new(catalog(paths), timing())
}

#[test]
fn start_shows_first_item_with_the_short_delay() {
    let mut seq = sequencer(&["/m/a.jpg", "/m/b.png"]);
    let commands = seq.start(Instant::now());
    assert_eq!(
        commands,
        vec![
            Command::ShowImage(PathBuf::from("/m/a.jpg")),
            Command::ArmTimer(Duration::from_secs(5)),
        ]
    );
    assert_eq!(seq.phase(), Phase::ShowingImage);
    assert_eq!(seq.cursor(), 0);
}

#[test]
fn cursor_advances_modulo_catalog_length() {
    let mut seq = sequencer(&["/m/a.jpg", "/m/b.png", "/m/c.webp"]);
    let now = Instant::now();
    seq.start(now);
    for n in 1..=7 {
        seq.advance(now);
        assert_eq!(seq.cursor(), n % 3);
    }
}

#[test]
fn image_to_image_uses_the_steady_state_delay() {
    let mut seq = sequencer(&["/m/a.jpg", "/m/b.png"]);
    let now = Instant::now();
    seq.start(now);
    let commands = seq.on_timer(now + Duration::from_secs(5));
    assert_eq!(
        commands,
        vec![
            Command::ShowImage(PathBuf::from("/m/b.png")),
            Command::ArmTimer(Duration::from_secs(10)),
        ]
    );
}

#[test]
fn scenario_image_video_image_then_wrap() {
    let mut seq = sequencer(&["/m/a.jpg", "/m/b.mp4", "/m/c.png"]);
    let t0 = Instant::now();

    let shown = seq.start(t0);
    assert_eq!(shown[0], Command::ShowImage(PathBuf::from("/m/a.jpg")));

    // image timer expires -> video starts, countdown is cancelled
    let t1 = t0 + Duration::from_secs(5);
    let commands = seq.on_timer(t1);
    assert_eq!(
        commands,
        vec![
            Command::CancelTimer,
            Command::PlayVideo(PathBuf::from("/m/b.mp4")),
        ]
    );
    assert_eq!(seq.phase(), Phase::ShowingVideo);

    // position reaches the end only after the minimum watch elapsed
    let clip = Duration::from_secs(3);
    assert!(
        seq.on_position_changed(t1 + Duration::from_secs(3), clip, clip)
            .is_empty()
    );
    let commands = seq.on_position_changed(t1 + Duration::from_secs(11), clip, clip);
    assert_eq!(commands[0], Command::StopVideo);
    assert_eq!(commands[1], Command::ShowImage(PathBuf::from("/m/c.png")));
    // image after a video gets the short delay again
    assert_eq!(commands[2], Command::ArmTimer(Duration::from_secs(5)));

    // final image timer expiry wraps to the first item
    let t2 = t1 + Duration::from_secs(16);
    let commands = seq.on_timer(t2);
    assert_eq!(commands[0], Command::ShowImage(PathBuf::from("/m/a.jpg")));
    assert_eq!(seq.cursor(), 0);
}

#[test]
fn video_end_is_debounced_until_minimum_watch() {
    let mut seq = sequencer(&["/m/v.mp4", "/m/a.jpg"]);
    let t0 = Instant::now();
    seq.start(t0);

    let clip = Duration::from_millis(1800);
    // a looping short clip keeps reporting positions past its end
    for secs in [1u64, 3, 5, 9] {
        assert!(
            seq.on_position_changed(t0 + Duration::from_secs(secs), clip, clip)
                .is_empty(),
            "end signal before minimum watch must be ignored"
        );
    }
    assert_eq!(seq.phase(), Phase::ShowingVideo);

    let commands = seq.on_position_changed(t0 + Duration::from_secs(10), clip, clip);
    assert_eq!(commands[0], Command::StopVideo);
    assert_eq!(seq.phase(), Phase::ShowingImage);
}

#[test]
fn position_short_of_the_end_never_advances() {
    let mut seq = sequencer(&["/m/v.mp4", "/m/a.jpg"]);
    let t0 = Instant::now();
    seq.start(t0);

    let commands = seq.on_position_changed(
        t0 + Duration::from_secs(60),
        Duration::from_secs(30),
        Duration::from_secs(90),
    );
    assert!(commands.is_empty());
}

#[test]
fn playback_finished_advances_from_video() {
    let mut seq = sequencer(&["/m/v.mp4", "/m/a.jpg"]);
    let now = Instant::now();
    seq.start(now);
    let commands = seq.on_playback_finished(now + Duration::from_secs(1));
    assert_eq!(commands[0], Command::ShowImage(PathBuf::from("/m/a.jpg")));
}

#[test]
fn space_rearms_the_current_image_countdown() {
    let mut seq = sequencer(&["/m/a.jpg", "/m/b.png"]);
    let now = Instant::now();
    seq.start(now);

    let commands = seq.on_key(now + Duration::from_secs(2), Key::Space);
    assert_eq!(commands, vec![Command::ArmTimer(Duration::from_secs(5))]);
    assert_eq!(seq.cursor(), 0, "space over an image must not skip");

    // after an image->image transition, space re-arms the longer delay
    seq.on_timer(now + Duration::from_secs(5));
    let commands = seq.on_key(now + Duration::from_secs(6), Key::Space);
    assert_eq!(commands, vec![Command::ArmTimer(Duration::from_secs(10))]);
}

#[test]
fn space_skips_the_current_video_immediately() {
    let mut seq = sequencer(&["/m/v.mp4", "/m/a.jpg"]);
    let now = Instant::now();
    seq.start(now);

    let commands = seq.on_key(now + Duration::from_secs(1), Key::Space);
    assert_eq!(commands[0], Command::StopVideo);
    assert_eq!(commands[1], Command::ShowImage(PathBuf::from("/m/a.jpg")));
    assert_eq!(seq.cursor(), 1);
}

#[test]
fn mute_toggle_does_not_touch_sequencing() {
    let mut seq = sequencer(&["/m/v.mp4", "/m/a.jpg"]);
    let now = Instant::now();
    seq.start(now);

    let commands = seq.on_key(now, Key::Mute);
    assert_eq!(commands, vec![Command::ToggleMute]);
    assert_eq!(seq.phase(), Phase::ShowingVideo);
    assert_eq!(seq.cursor(), 0);
}

#[test]
fn escape_quits_from_any_phase() {
    let mut seq = sequencer(&["/m/a.jpg"]);
    let now = Instant::now();
    assert_eq!(seq.on_key(now, Key::Escape), vec![Command::Quit]);
    seq.start(now);
    assert_eq!(seq.on_key(now, Key::Escape), vec![Command::Quit]);
}

#[test]
fn stale_timer_during_video_is_ignored() {
    let mut seq = sequencer(&["/m/v.mp4", "/m/a.jpg"]);
    let now = Instant::now();
    seq.start(now);
    assert!(seq.on_timer(now + Duration::from_secs(30)).is_empty());
    assert_eq!(seq.phase(), Phase::ShowingVideo);
}

#[test]
fn image_render_failure_does_not_advance() {
    let mut seq = sequencer(&["/m/a.jpg", "/m/b.png"]);
    let now = Instant::now();
    seq.start(now);
    let commands = seq.on_render_failed(now, &PathBuf::from("/m/a.jpg"));
    assert!(commands.is_empty());
    assert_eq!(seq.cursor(), 0);
    assert_eq!(seq.phase(), Phase::ShowingImage);
}

#[test]
fn failed_video_start_releases_the_slot() {
    // a video that cannot start has no countdown and no position reports;
    // absorbing the failure would leave the show black forever
    let mut seq = sequencer(&["/m/v.mp4", "/m/a.jpg"]);
    let now = Instant::now();
    seq.start(now);
    let commands = seq.on_render_failed(now, &PathBuf::from("/m/v.mp4"));
    assert_eq!(commands[0], Command::ShowImage(PathBuf::from("/m/a.jpg")));
    assert_eq!(seq.phase(), Phase::ShowingImage);
    assert_eq!(seq.cursor(), 1);
}

#[test]
fn stale_render_failure_during_video_is_ignored() {
    let mut seq = sequencer(&["/m/v.mp4", "/m/a.jpg"]);
    let now = Instant::now();
    seq.start(now);
    // a late failure report for some other item must not skip the video
    let commands = seq.on_render_failed(now, &PathBuf::from("/m/a.jpg"));
    assert!(commands.is_empty());
    assert_eq!(seq.phase(), Phase::ShowingVideo);
    assert_eq!(seq.cursor(), 0);
}

#[test]
fn single_item_catalog_wraps_onto_itself() {
    let mut seq = sequencer(&["/m/a.jpg"]);
    let now = Instant::now();
    seq.start(now);
    let commands = seq.on_timer(now + Duration::from_secs(5));
    assert_eq!(commands[0], Command::ShowImage(PathBuf::from("/m/a.jpg")));
    assert_eq!(seq.cursor(), 0);
}
