mod common;

use common::{Call, RecordingWorld};
use sim::{
    EpisodeScheduler, PlaybackConfig, PlaybackController, StepDirection, MAX_PLAYBACK_SPEED,
};
use std::time::Duration;

const BASE: f64 = 1.0 / 60.0;

fn controller(speed: f64) -> PlaybackController {
    PlaybackController::new(PlaybackConfig {
        speed,
        ..PlaybackConfig::default()
    })
}

#[test]
fn reverse_playback_takes_more_negative_steps() {
    let mut playback = controller(-2.0);
    let mut scheduler = EpisodeScheduler::new();
    let mut world = RecordingWorld::with_substeps(1);

    let report = playback
        .on_tick(&mut scheduler, &mut world, Duration::from_millis(16))
        .unwrap();

    assert_eq!(report.steps, 2);
    assert_eq!(report.timestep, -BASE);
    assert_eq!(world.updates(), vec![-BASE, -BASE]);
    assert!(playback.timer().is_armed());
}

#[test]
fn step_count_rounds_the_speed() {
    for (speed, steps) in [(0.4, 1), (1.0, 1), (2.5, 3), (2.6, 3), (-3.4, 3), (0.0, 1)] {
        assert_eq!(controller(speed).num_steps(), steps, "speed {speed}");
    }
}

#[test]
fn slow_playback_keeps_one_step_and_stretches_the_delay() {
    let mut playback = controller(0.25);
    let mut scheduler = EpisodeScheduler::new();
    let mut world = RecordingWorld::with_substeps(1);

    let report = playback
        .on_tick(&mut scheduler, &mut world, Duration::from_millis(16))
        .unwrap();
    assert_eq!(report.steps, 1);
    let delay = report.next_delay.unwrap();
    // four display intervals, less whatever the update itself took
    assert!(delay <= Duration::from_secs_f64(4.0 * BASE));
    assert!(delay > Duration::from_secs_f64(3.0 * BASE));
}

#[test]
fn zero_speed_stalls_the_timer() {
    let mut playback = controller(0.0);
    assert!(!playback.timer().is_armed());

    let mut scheduler = EpisodeScheduler::new();
    let mut world = RecordingWorld::with_substeps(1);
    let report = playback
        .on_tick(&mut scheduler, &mut world, Duration::from_millis(16))
        .unwrap();

    assert_eq!(report.next_delay, None);
    assert!(!playback.timer().is_armed());
}

#[test]
fn leaving_zero_speed_rearms_the_timer() {
    let mut playback = controller(0.0);
    playback.set_speed(0.5);
    assert_eq!(playback.timer().delay(), Some(playback.display_interval()));

    let mut playback = controller(1.0);
    playback.set_speed(0.0);
    playback.set_speed(f64::NAN);
    assert_eq!(playback.speed(), 0.0);
}

#[test]
fn faster_and_slower_nudge_the_speed() {
    let mut playback = controller(1.0);
    playback.faster();
    playback.faster();
    assert!((playback.speed() - 1.1).abs() < 1e-12);
    playback.slower();
    assert!((playback.speed() - 1.05).abs() < 1e-12);
    playback.change_speed(-3.05);
    assert!((playback.speed() + 2.0).abs() < 1e-12);
    playback.reset_speed();
    assert_eq!(playback.speed(), 1.0);
}

#[test]
fn paused_ticks_do_nothing() {
    let mut playback = controller(1.0);
    let mut scheduler = EpisodeScheduler::new();
    let mut world = RecordingWorld::with_substeps(1);

    assert!(!playback.toggle());
    let report = playback
        .on_tick(&mut scheduler, &mut world, Duration::from_millis(16))
        .unwrap();
    assert_eq!(report.steps, 0);
    assert!(world.calls.is_empty());
    assert!(!playback.timer().is_armed());

    assert!(playback.toggle());
    assert!(playback.timer().is_armed());
}

#[test]
fn single_frame_step_pauses_playback() {
    let mut playback = controller(4.0);
    let mut scheduler = EpisodeScheduler::new();
    let mut world = RecordingWorld::with_substeps(2);

    playback
        .step_frame(&mut scheduler, &mut world, StepDirection::Backward)
        .unwrap();
    assert_eq!(world.updates(), vec![-BASE / 2.0, -BASE / 2.0]);
    assert!(!playback.is_animating());
    assert!(!playback.timer().is_armed());

    playback
        .step_frame(&mut scheduler, &mut world, StepDirection::Forward)
        .unwrap();
    assert_eq!(world.updates().len(), 4);
}

#[test]
fn reset_mid_tick_does_not_stop_the_remaining_steps() {
    let mut playback = controller(3.0);
    let mut scheduler = EpisodeScheduler::new();
    let mut world = RecordingWorld::with_substeps(1);
    world.end_after = Some(1);

    let report = playback
        .on_tick(&mut scheduler, &mut world, Duration::from_millis(16))
        .unwrap();

    assert_eq!(report.steps, 3);
    assert_eq!(report.resets, 3);
    assert_eq!(world.updates().len(), 3);
    assert_eq!(world.count(&Call::EndEpisode), 3);
}

#[test]
fn fault_skips_the_rest_of_the_tick() {
    let mut playback = controller(3.0);
    let mut scheduler = EpisodeScheduler::new();
    let mut world = RecordingWorld::with_substeps(1);
    world.fail_on = Some(2);

    assert!(playback
        .on_tick(&mut scheduler, &mut world, Duration::from_millis(16))
        .is_err());
    assert_eq!(world.updates().len(), 1);
}

#[test]
fn throughput_is_reported_to_the_world() {
    let mut playback = controller(2.0);
    let mut scheduler = EpisodeScheduler::new();
    let mut world = RecordingWorld::with_substeps(1);

    playback
        .on_tick(&mut scheduler, &mut world, Duration::from_millis(500))
        .unwrap();
    assert_eq!(world.count(&Call::UpdatesPerSec(4.0)), 1);
    assert_eq!(playback.updates_per_sec(), 4.0);

    // a zero wall time gives no finite rate; the estimate is kept
    playback
        .on_tick(&mut scheduler, &mut world, Duration::ZERO)
        .unwrap();
    assert_eq!(world.calls.iter().filter(|c| matches!(c, Call::UpdatesPerSec(_))).count(), 1);
    assert_eq!(playback.updates_per_sec(), 4.0);
}

#[test]
fn huge_speeds_are_clamped() {
    let mut playback = controller(1e12);
    assert_eq!(playback.speed(), MAX_PLAYBACK_SPEED);
    assert_eq!(playback.num_steps(), 1000);

    playback.set_speed(-1e300);
    assert_eq!(playback.speed(), -MAX_PLAYBACK_SPEED);

    let mut scheduler = EpisodeScheduler::new();
    let mut world = RecordingWorld::with_substeps(1);
    let report = playback
        .on_tick(&mut scheduler, &mut world, Duration::from_millis(16))
        .unwrap();
    assert_eq!(report.steps, 1000);
    assert_eq!(world.updates().len(), 1000);
}
