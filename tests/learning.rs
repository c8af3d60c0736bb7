use iznet::learning::{CategoryLearning, LearningParameters, PostsynapticGain, Stimulus};

fn quick() -> LearningParameters {
    LearningParameters {
        n_trials: 8,
        duration: 300.0,
        vis_dim: 10,
        vis_width: 3.0,
        seed: 5,
        ..LearningParameters::default()
    }
}

#[test]
fn learned_weights_stay_in_the_unit_interval() {
    let aggressive = LearningParameters {
        alpha_w: 0.5,
        beta_w: 0.5,
        gamma_w: 0.5,
        weak_post_ltd: true,
        alpha_w2: 0.5,
        beta_w2: 0.5,
        ..quick()
    };
    for params in [quick(), aggressive] {
        let result = CategoryLearning::new(params).unwrap().run().unwrap();
        assert!(result
            .w_vis_msn
            .iter()
            .chain(result.w_vis_pm.iter())
            .all(|w| (0.0..=1.0).contains(w)));
    }
}

#[test]
fn exponential_gain_keeps_weights_bounded() {
    let params = LearningParameters {
        gain: PostsynapticGain::Exponential { lambda: 1e-5 },
        ..quick()
    };
    let result = CategoryLearning::new(params).unwrap().run().unwrap();
    assert!(result.w_vis_msn.iter().all(|w| (0.0..=1.0).contains(w)));
}

#[test]
fn critic_follows_its_recurrence() {
    let result = CategoryLearning::new(quick()).unwrap().run().unwrap();
    let mut p = 0.5;
    for record in &result.trials {
        assert!((record.prediction - p).abs() < 1e-12);
        assert_eq!(record.reward, if record.correct() { 1.0 } else { 0.0 });
        assert!((record.rpe - (record.reward - p)).abs() < 1e-12);
        p += 0.01 * record.rpe;
    }
    assert!((result.final_prediction - p).abs() < 1e-12);
}

#[test]
fn trials_are_reproducible_from_the_seed() {
    let a = CategoryLearning::new(quick()).unwrap().run().unwrap();
    let b = CategoryLearning::new(quick()).unwrap().run().unwrap();
    assert_eq!(a, b);

    let c = CategoryLearning::new(LearningParameters { seed: 6, ..quick() })
        .unwrap()
        .run()
        .unwrap();
    assert_ne!(a.trials[0].stimulus, c.trials[0].stimulus);
}

#[test]
fn every_trial_starts_from_rest() {
    let mut driver = CategoryLearning::new(quick()).unwrap();
    let (_, first) = driver.run_trial_with(Stimulus::new(7.0, 2.0)).unwrap();
    let (_, second) = driver.run_trial_with(Stimulus::new(7.0, 2.0)).unwrap();
    assert_eq!(first.v.column(0), second.v.column(0));
    assert_eq!(first.u.column(0), second.u.column(0));
    assert!(first.g.column(0).iter().all(|g| *g == 0.0));
    for (cell, p) in driver.network().cells().iter().enumerate() {
        assert_eq!(first.v[(cell, 0)], p.v_rest);
    }
}

#[test]
fn partial_parameter_file_fills_defaults() {
    let params: LearningParameters =
        serde_json::from_str(r#"{ "n_trials": 12, "gain": { "kind": "exponential", "lambda": 0.001 } }"#)
            .unwrap();
    assert_eq!(params.n_trials, 12);
    assert_eq!(params.vis_dim, 100);
    assert_eq!(params.gain, PostsynapticGain::Exponential { lambda: 0.001 });
    assert!(params.validate().is_ok());

    let round_trip: LearningParameters =
        serde_json::from_str(&serde_json::to_string(&params).unwrap()).unwrap();
    assert_eq!(round_trip, params);
}
