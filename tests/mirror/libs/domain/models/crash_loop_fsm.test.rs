// [tests/mirror/libs/domain/models/crash_loop_fsm.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE LA FSM DE CRASH-LOOP (V2.1 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L2-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DE INVARIANTES DE LA MÁQUINA DE REINICIOS
 *
 * Invariantes certificados:
 * 1. crash_looping ⇒ desired_state = stopped.
 * 2. restart_count ≥ 0 y (ventana ausente ⇔ contador 0) tras reset.
 * =================================================================
 */

use chrono::{DateTime, Duration, Utc};
use helmsman_domain_models::{
    crash_loop_step, crash_loop_unlock, DesiredState, CRASH_LOOP_THRESHOLD,
};
use proptest::prelude::*;

fn anchor_instant() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
        .expect("anchor timestamp")
        .with_timezone(&Utc)
}

proptest! {
    /// Invariante universal: disparar la FSM implica intención detenida.
    #[test]
    fn certify_trip_implies_stopped(
        exit_codes in proptest::collection::vec(0i64..4, 1..40),
        gaps_seconds in proptest::collection::vec(0i64..120, 1..40),
    ) {
        let mut count = 0i64;
        let mut window = None;
        let mut desired = DesiredState::Running;
        let mut instant = anchor_instant();

        for (exit_code, gap) in exit_codes.iter().zip(gaps_seconds.iter()) {
            instant += Duration::seconds(*gap);
            let verdict = crash_loop_step(count, window, desired, *exit_code, instant);

            prop_assert!(verdict.restart_count >= 0);
            if verdict.crash_looping {
                prop_assert_eq!(verdict.desired_state, DesiredState::Stopped);
                prop_assert!(verdict.restart_count >= CRASH_LOOP_THRESHOLD);
            }

            count = verdict.restart_count;
            window = verdict.restart_window_at;
            desired = verdict.desired_state;
        }
    }
}

#[test]
fn certify_scenario_five_rapid_exits() {
    // Cinco salidas con código 1, cada una dentro del mismo minuto.
    let mut count = 0i64;
    let mut window = None;
    let mut desired = DesiredState::Running;

    for step in 0..5 {
        let instant = anchor_instant() + Duration::seconds(step * 10);
        let verdict = crash_loop_step(count, window, desired, 1, instant);
        count = verdict.restart_count;
        window = verdict.restart_window_at;
        desired = verdict.desired_state;

        if step < 4 {
            assert!(!verdict.crash_looping, "threshold must not trip early");
        } else {
            assert!(verdict.crash_looping);
            assert_eq!(verdict.restart_count, 5);
            assert_eq!(verdict.desired_state, DesiredState::Stopped);
        }
    }
}

#[test]
fn certify_unlock_is_the_only_exit() {
    let verdict = crash_loop_unlock();

    assert!(!verdict.crash_looping);
    assert_eq!(verdict.desired_state, DesiredState::Running);
    assert_eq!(verdict.restart_count, 0);
    // Invariante: contador 0 ⇔ ventana ausente.
    assert_eq!(verdict.restart_window_at, None);
}

#[test]
fn certify_window_expiry_resets_count() {
    let first = crash_loop_step(0, None, DesiredState::Running, 1, anchor_instant());
    assert_eq!(first.restart_count, 1);

    let beyond_window = anchor_instant() + Duration::minutes(11);
    let second = crash_loop_step(
        first.restart_count,
        first.restart_window_at,
        DesiredState::Running,
        1,
        beyond_window,
    );

    assert_eq!(second.restart_count, 1);
    assert_eq!(second.restart_window_at, Some(beyond_window));
}
