//! Benchmarks for session analysis.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use motionlab_core::{
    Frame, JointId, Landmark, LandmarkPoint, MotionTypeHint, Session, TargetArea, TimedFrame,
};
use motionlab_engine::{BiomechEngine, EngineConfig, JointController, JointControllerConfig};

/// Frontal squat pose; `depth` 0 is standing, 1 is the bottom
fn squat_frame(depth: f64) -> Frame {
    let hip_y = 0.5 + 0.3 * depth;
    let hip_z = 0.2 * depth;
    let shoulder_y = hip_y - 0.5;

    let mut frame = Frame::new()
        .with(Landmark::LeftEar, LandmarkPoint::at(-0.08, shoulder_y - 0.35, hip_z))
        .with(Landmark::RightEar, LandmarkPoint::at(0.08, shoulder_y - 0.35, hip_z));
    let sides = [
        (
            -1.0,
            Landmark::LeftShoulder,
            Landmark::LeftElbow,
            Landmark::LeftWrist,
            Landmark::LeftHip,
            Landmark::LeftKnee,
            Landmark::LeftAnkle,
        ),
        (
            1.0,
            Landmark::RightShoulder,
            Landmark::RightElbow,
            Landmark::RightWrist,
            Landmark::RightHip,
            Landmark::RightKnee,
            Landmark::RightAnkle,
        ),
    ];
    for (sign, shoulder, elbow, wrist, hip, knee, ankle) in sides {
        frame = frame
            .with(shoulder, LandmarkPoint::at(sign * 0.2, shoulder_y, hip_z))
            .with(elbow, LandmarkPoint::at(sign * 0.25, shoulder_y + 0.1, hip_z - 0.25))
            .with(wrist, LandmarkPoint::at(sign * 0.2, shoulder_y + 0.05, hip_z - 0.5))
            .with(hip, LandmarkPoint::at(sign * 0.15, hip_y, hip_z))
            .with(knee, LandmarkPoint::at(sign * 0.15, 1.0, -0.3 * depth))
            .with(ankle, LandmarkPoint::at(sign * 0.15, 1.5, 0.0));
    }
    frame
}

fn create_squat_session(reps: usize) -> Session {
    let mut depths = vec![0.0; 10];
    for _ in 0..reps {
        depths.extend((0..15).map(|i| i as f64 / 15.0));
        depths.extend((0..15).map(|i| (15 - i) as f64 / 15.0));
    }

    Session::new(
        depths
            .into_iter()
            .enumerate()
            .map(|(i, d)| TimedFrame::new(i as i64 * 33, squat_frame(d)))
            .collect(),
    )
}

fn benchmark_session(c: &mut Criterion) {
    let engine = BiomechEngine::new(EngineConfig::default()).expect("default config is valid");

    let short = create_squat_session(3);
    let long = create_squat_session(20);

    c.bench_function("analyze_squat_3_reps", |b| {
        b.iter(|| engine.analyze(black_box(&short), TargetArea::Full, MotionTypeHint::Isotonic))
    });

    c.bench_function("analyze_squat_20_reps", |b| {
        b.iter(|| engine.analyze(black_box(&long), TargetArea::Full, MotionTypeHint::Isotonic))
    });
}

fn benchmark_joint_stress(c: &mut Criterion) {
    let knee = JointController::new(
        JointId::LeftKnee,
        JointControllerConfig::for_joint(JointId::LeftKnee),
    )
    .expect("default knee config is valid");

    c.bench_function("knee_stress", |b| {
        b.iter(|| {
            knee.calculate_joint_stress(
                black_box(1.6),
                black_box(1.5),
                black_box(0.033),
                black_box(120.0),
                Some(150.0),
            )
        })
    });
}

criterion_group!(benches, benchmark_session, benchmark_joint_stress);
criterion_main!(benches);
