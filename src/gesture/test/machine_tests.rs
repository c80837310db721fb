use std::time::{Duration, Instant};

use super::super::{GestureMachine, GestureTimingConfig, GestureType};

fn default_cfg() -> GestureTimingConfig {
    GestureTimingConfig {
        multi_press_window: 350,
        long_press_min: 80,
        long_press_max: 145,
        super_long_min: 146,
        super_long_max: 400,
        cancel_threshold: 900,
        debounce_delay: 5,
    }
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
fn single_tap_emits_single_after_window() {
    let t0 = Instant::now();
    let mut m = GestureMachine::new(default_cfg());
    m.handle_key_down(t0);
    assert_eq!(m.handle_key_up(t0 + ms(30)), None);
    // Finalize before window elapses: nothing yet.
    assert_eq!(m.finalize(t0 + ms(100)), None);
    // Finalize after multi_press_window has elapsed since the press.
    assert_eq!(m.finalize(t0 + ms(360)), Some(GestureType::Single));
}

#[test]
fn double_long_classifies_second_hold() {
    let cfg = GestureTimingConfig {
        long_press_min: 80,
        long_press_max: 145,
        ..default_cfg()
    };
    let t0 = Instant::now();
    let mut m = GestureMachine::new(cfg);
    m.handle_key_down(t0);
    assert_eq!(m.handle_key_up(t0 + ms(30)), None);
    m.handle_key_down(t0 + ms(50));
    assert_eq!(m.handle_key_up(t0 + ms(180)), None); // hold = 130ms -> long
    assert_eq!(m.finalize(t0 + ms(600)), Some(GestureType::DoubleLong));
}

/// Quadruple, then jail, then a later single.
#[test]
fn quadruple_then_jail_then_single() {
    let t0 = Instant::now();
    let mut m = GestureMachine::new(default_cfg());

    m.handle_key_down(t0);
    assert_eq!(m.handle_key_up(t0 + ms(15)), None);
    m.handle_key_down(t0 + ms(35));
    assert_eq!(m.handle_key_up(t0 + ms(50)), None);
    m.handle_key_down(t0 + ms(70));
    assert_eq!(m.handle_key_up(t0 + ms(85)), None);
    m.handle_key_down(t0 + ms(105));
    // 4th release resolves synchronously.
    assert_eq!(m.handle_key_up(t0 + ms(120)), Some(GestureType::Quadruple));

    // Jail until 120 + 200 = 320ms: a tap at 150/165 is fully discarded.
    m.handle_key_down(t0 + ms(150));
    assert_eq!(m.handle_key_up(t0 + ms(165)), None);
    assert_eq!(m.finalize(t0 + ms(700)), None);

    // After the jail expires, a fresh tap produces a single.
    m.handle_key_down(t0 + ms(330));
    assert_eq!(m.handle_key_up(t0 + ms(350)), None);
    assert_eq!(m.finalize(t0 + ms(710)), Some(GestureType::Single));
}

/// Jail window durations after triple/quadruple.
#[test]
fn jail_after_triple_is_120ms() {
    let t0 = Instant::now();
    let mut m = GestureMachine::new(default_cfg());
    for i in 0..3u64 {
        let down = t0 + ms(i * 20);
        m.handle_key_down(down);
        m.handle_key_up(down + ms(10));
    }
    assert_eq!(m.finalize(t0 + ms(400)), Some(GestureType::Triple));
    // Within 120ms of the resolve time, presses are dropped.
    let resolve_time = t0 + ms(400);
    m.handle_key_down(resolve_time + ms(100));
    assert_eq!(m.press_history_len(), 0, "press inside jail must not register");
}

/// A press held past cancel_threshold is discarded silently, and the
/// machine keeps working for subsequent unrelated presses.
#[test]
fn cancel_threshold_discards_silently() {
    let t0 = Instant::now();
    let mut m = GestureMachine::new(default_cfg());
    m.handle_key_down(t0);
    assert_eq!(m.handle_key_up(t0 + ms(950)), None);
    assert_eq!(m.press_history_len(), 0);

    // Subsequent unrelated presses still work.
    m.handle_key_down(t0 + ms(2000));
    assert_eq!(m.handle_key_up(t0 + ms(2020)), None);
    assert_eq!(m.finalize(t0 + ms(2400)), Some(GestureType::Single));
}

/// 5+ taps within the windows on one key yield exactly one
/// quadruple[_*], and later taps inside the jail are discarded.
#[test]
fn five_taps_yield_one_quadruple_and_drop_the_rest() {
    let t0 = Instant::now();
    let mut m = GestureMachine::new(default_cfg());
    let mut last_emitted = None;
    for i in 0..4u64 {
        let down = t0 + ms(i * 30);
        m.handle_key_down(down);
        if let Some(g) = m.handle_key_up(down + ms(10)) {
            last_emitted = Some(g);
        }
    }
    assert_eq!(last_emitted, Some(GestureType::Quadruple));

    // 5th tap arrives inside the 200ms post-quadruple jail.
    let fifth_down = t0 + ms(3 * 30) + ms(50);
    m.handle_key_down(fifth_down);
    assert_eq!(m.press_history_len(), 0);
}

/// press_history is empty at the moment resolution happens (verified
/// indirectly: right after resolve, state is clean for a fresh sequence
/// to begin).
#[test]
fn history_is_empty_immediately_after_emission() {
    let t0 = Instant::now();
    let mut m = GestureMachine::new(default_cfg());
    m.handle_key_down(t0);
    m.handle_key_up(t0 + ms(20));
    m.finalize(t0 + ms(400));
    assert_eq!(m.press_history_len(), 0);
}

#[test]
fn reset_clears_all_state_without_reallocating_instance() {
    let t0 = Instant::now();
    let mut m = GestureMachine::new(default_cfg());
    m.handle_key_down(t0);
    m.handle_key_up(t0 + ms(900));
    m.reset(default_cfg());
    m.handle_key_down(t0 + ms(5000));
    assert_eq!(m.handle_key_up(t0 + ms(5010)), None);
    assert_eq!(m.finalize(t0 + ms(5400)), Some(GestureType::Single));
}
