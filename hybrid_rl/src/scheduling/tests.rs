//! Behavioral tests for the schedules.

use super::*;

// ============================================================================
// ANNEALED LR TESTS
// ============================================================================

mod annealed_lr_tests {
    use super::*;

    #[test]
    fn should_start_at_base_rate() {
        let sched = AnnealedLR::new(1e-3, 100);
        assert_eq!(sched.get_lr(0), 1e-3);
        assert_eq!(sched.get_lr(1), 1e-3);
    }

    #[test]
    fn should_decay_linearly() {
        let sched = AnnealedLR::new(1.0, 100);
        assert!((sched.get_lr(51) - 0.5).abs() < 1e-12);
        assert!((sched.get_lr(76) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn should_stop_at_floor() {
        let sched = AnnealedLR::new(2.0, 100);
        assert_eq!(sched.get_lr(101), 2.0 * AnnealedLR::FLOOR);
        assert_eq!(sched.get_lr(usize::MAX), 2.0 * AnnealedLR::FLOOR);
    }

    #[test]
    fn zero_anneal_steps_is_constant() {
        let sched = AnnealedLR::new(3e-4, 0);
        assert_eq!(sched.get_lr(0), 3e-4);
        assert_eq!(sched.get_lr(1_000_000), 3e-4);
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "non-negative"))]
    fn should_reject_negative_lr_in_debug() {
        let sched = AnnealedLR::new(-0.001, 100);
        assert_eq!(sched.get_lr(0), 0.0);
    }

    #[test]
    fn should_be_monotone_non_increasing() {
        let sched = AnnealedLR::new(1.0, 1000);
        let mut prev = f64::INFINITY;
        for step in (0..2000).step_by(7) {
            let lr = sched.get_lr(step);
            assert!(lr <= prev);
            assert!(lr > 0.0);
            prev = lr;
        }
    }
}

// ============================================================================
// EPSILON DECAY TESTS
// ============================================================================

mod epsilon_decay_tests {
    use super::*;

    #[test]
    fn should_start_at_initial_eps() {
        let sched = EpsilonDecay::new(0.9, 10_000);
        assert!((sched.get_eps(0) - 0.9).abs() < 1e-7);
    }

    #[test]
    fn should_halve_at_half_life() {
        let sched = EpsilonDecay::new(0.8, 500);
        assert!((sched.get_eps(500) - 0.4).abs() < 1e-6);
        assert!((sched.get_eps(1500) - 0.2).abs() < 1e-6);
    }

    #[test]
    fn zero_initial_eps_stays_zero() {
        let sched = EpsilonDecay::new(0.0, 10);
        assert_eq!(sched.get_eps(0), 0.0);
        assert_eq!(sched.get_eps(100), 0.0);
    }

    #[test]
    fn should_stay_in_unit_interval() {
        let sched = EpsilonDecay::new(1.0, 3);
        for step in [0, 1, 10, 1_000, usize::MAX / 2] {
            let eps = sched.get_eps(step);
            assert!((0.0..=1.0).contains(&eps));
        }
    }
}
