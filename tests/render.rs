//! End-to-end rendering checks through the public API.

use std::sync::Arc;

use lumina::accel::{Accelerator, BruteForce};
use lumina::display::{BLACK, to_display};
use lumina::integrator::Integrator;
use lumina::prelude::*;
use lumina::sampling::PixelRng;

fn settings(w: u32, h: u32, spp: u32) -> RenderSettings {
    let mut s = RenderSettings::default();
    s.set_resolution(w, h).unwrap();
    s.set_samples_per_pixel(spp);
    s
}

/// Large ground sphere plus a unit sphere in front of the default camera.
fn ground_and_ball() -> Scene {
    let mut scene = Scene::new();
    scene.add_sphere(Vec3::new(0.0, -1001.0, 0.0), 1000.0, MaterialId::DEFAULT).unwrap();
    scene.add_sphere(Vec3::new(0.0, 0.0, 3.0), 1.0, MaterialId::DEFAULT).unwrap();
    scene
}

fn render_to_convergence(tracer: &mut dyn PathTracer) {
    while !tracer.render().unwrap().is_converged() {}
}

#[test]
fn test_sphere_hit_from_outside() {
    let mut scene = Scene::new();
    scene.add_sphere(Vec3::ZERO, 1.0, MaterialId::DEFAULT).unwrap();
    let mut accel = BruteForce::build(&scene).unwrap();
    accel.commit();

    let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
    let mut hit = accel.intersect(&ray, 1e-4, f32::INFINITY);
    assert!(hit.is_hit());
    assert!((hit.t - 4.0).abs() < 1e-4);
    hit.calculate_surface_properties(&ray);
    assert!(hit.normal.abs_diff_eq(Vec3::new(0.0, 0.0, -1.0), 1e-4));
    assert!(hit.position.abs_diff_eq(Vec3::new(0.0, 0.0, -1.0), 1e-4));
}

#[test]
fn test_empty_scene_sky_straight_up() {
    let scene = Scene::new();
    let mut accel = BruteForce::build(&scene).unwrap();
    accel.commit();
    let settings = RenderSettings::default();
    let integrator = Integrator::new(&accel, &scene, &settings);

    for state in [0, 1, 12345, u32::MAX] {
        let c = integrator.trace(Ray::new(Vec3::new(3.0, -2.0, 1.0), Vec3::Y), &mut PixelRng::from_state(state));
        assert!(c.abs_diff_eq(Vec4::new(0.5, 0.7, 1.0, 1.0), 1e-6));
    }
}

#[test]
fn test_russian_roulette_is_unbiased() {
    // rr_depth >= max_bounces disables roulette entirely
    let mut without = CpuPathTracer::<BruteForce>::new(Backend::Cpu);
    without.set_scene(ground_and_ball());
    let mut s = settings(32, 32, 1);
    s.set_russian_roulette_depth(8);
    without.set_settings(s);

    let mut with = CpuPathTracer::<BruteForce>::new(Backend::Cpu);
    with.set_scene(ground_and_ball());
    let mut s = settings(32, 32, 1);
    s.set_russian_roulette_depth(0);
    with.set_settings(s);

    let n = 20_000u32;
    for (x, y) in [(16, 16), (16, 28)] {
        let mut a = 0.0f64;
        let mut b = 0.0f64;
        for frame in 1..=n {
            let ca = without.trace_pixel(x, y, frame).unwrap();
            let cb = with.trace_pixel(x, y, frame).unwrap();
            a += (ca.x + ca.y + ca.z) as f64;
            b += (cb.x + cb.y + cb.z) as f64;
        }
        let (a, b) = (a / n as f64 / 3.0, b / n as f64 / 3.0);
        assert!(a > 0.05, "pixel ({x},{y}) unexpectedly dark: {a}");
        assert!((a - b).abs() < 0.03, "pixel ({x},{y}): no roulette {a}, roulette {b}");
    }
}

#[test]
fn test_max_bounces_zero_renders_black() {
    let mut tracer = create_path_tracer(Backend::Cpu);
    tracer.set_scene(ground_and_ball());
    let mut s = settings(8, 8, 2);
    s.set_max_bounces(0);
    tracer.set_settings(s);
    render_to_convergence(tracer.as_mut());

    assert!(tracer.accumulation().sums().iter().all(|p| p.truncate() == Vec3::ZERO));
    assert!(tracer.display().pixels().iter().all(|p| *p == BLACK));
}

#[test]
fn test_constant_environment_fills_image() {
    let mut scene = Scene::new();
    let env = EnvironmentMap::from_rgb_f32(2, 1, &[0.5, 0.25, 2.0, 0.5, 0.25, 2.0]).unwrap();
    scene.set_environment(Some(Arc::new(env)));

    let mut tracer = create_path_tracer(Backend::CpuSerial);
    tracer.set_scene(scene);
    tracer.set_settings(settings(6, 4, 3));
    render_to_convergence(tracer.as_mut());

    let expected = to_display(Vec3::new(0.5, 0.25, 2.0) * 3.0 * (1.0 / 3.0), 1.0);
    assert!(tracer.display().pixels().iter().all(|p| *p == expected));
}

#[test]
fn test_identical_setups_render_identical_bytes() {
    let run = || {
        let mut tracer = create_path_tracer(Backend::Cpu);
        tracer.set_scene(ground_and_ball());
        tracer.set_settings(settings(20, 12, 4));
        render_to_convergence(tracer.as_mut());
        tracer.display().as_bytes().to_vec()
    };
    assert_eq!(run(), run());
}

#[test]
fn test_scene_edit_between_frames_resets() {
    let mut tracer = create_path_tracer(Backend::Cpu);
    tracer.set_scene(ground_and_ball());
    tracer.set_settings(settings(8, 8, 100));
    for _ in 0..5 {
        tracer.render().unwrap();
    }
    assert_eq!(tracer.frame_count(), 5);

    let ball = tracer.scene().spheres().nth(1).map(|(id, _)| id).unwrap();
    tracer
        .scene_mut()
        .update_sphere(ball, Vec3::new(0.5, 0.0, 3.0), 1.0, MaterialId::DEFAULT)
        .unwrap();
    assert_eq!(tracer.render().unwrap(), FrameStatus::Rendered { frame_count: 1 });

    // Invalid edits report an error and keep accumulating
    assert!(tracer.scene_mut().remove_sphere(SphereId::new(99)).is_err());
    assert_eq!(tracer.render().unwrap(), FrameStatus::Rendered { frame_count: 2 });
}

#[test]
fn test_auto_exposure_brightens_dark_scene() {
    let mut scene = Scene::new();
    let env = EnvironmentMap::from_rgb_f32(1, 1, &[0.02, 0.02, 0.02]).unwrap();
    scene.set_environment(Some(Arc::new(env)));

    let mut tracer = create_path_tracer(Backend::Cpu);
    tracer.set_scene(scene);
    let mut s = settings(4, 4, 1);
    s.set_auto_exposure(true, 0.18);
    tracer.set_settings(s);
    render_to_convergence(tracer.as_mut());

    let display = tracer.display();
    assert!((display.exposure() - 0.18 / 0.021).abs() < 1e-3);
    assert!(display.pixel(0, 0)[0] > to_display(Vec3::splat(0.02), 1.0)[0]);
}

#[test]
fn test_progressive_worker_end_to_end() {
    let mut tracer = create_path_tracer(Backend::Cpu);
    tracer.set_scene(ground_and_ball());
    tracer.set_settings(settings(16, 16, 8));

    let renderer = ProgressiveRenderer::spawn(tracer).unwrap();
    renderer.start();
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(30);
    while renderer.sample_count() < 8 {
        assert!(std::time::Instant::now() < deadline);
        std::thread::sleep(std::time::Duration::from_millis(2));
    }
    let frame = renderer.latest_frame().unwrap();
    assert_eq!((frame.width, frame.height, frame.frame_count), (16, 16, 8));
    assert!(frame.pixels.chunks_exact(4).all(|px| px[3] == 255));
}

#[test]
fn test_camera_looking_straight_down() {
    let mut tracer = create_path_tracer(Backend::Cpu);
    tracer.set_scene(ground_and_ball());
    let mut s = settings(16, 16, 2);
    s.set_camera(Camera::look_at(Vec3::new(0.0, 5.0, 3.0), Vec3::new(0.0, 0.0, 3.0), Vec3::Y)).unwrap();
    tracer.set_settings(s);
    render_to_convergence(tracer.as_mut());

    assert!(tracer.accumulation().sums().iter().all(|p| p.is_finite()));
    // The ball fills the center of the frame
    assert_ne!(tracer.display().pixel(8, 8), BLACK);
}

#[test]
fn test_reads_after_edit_see_reset() {
    let mut tracer = create_path_tracer(Backend::Cpu);
    tracer.set_scene(ground_and_ball());
    tracer.set_settings(settings(8, 8, 10));
    tracer.render().unwrap();
    tracer.render().unwrap();
    assert_eq!(tracer.frame_count(), 2);

    tracer.settings_mut().set_exposure(4.0);
    assert_eq!(tracer.frame_count(), 0);
    assert!(tracer.accumulation().sums().iter().all(|p| *p == Vec4::ZERO));

    tracer.render().unwrap();
    tracer.scene_mut().add_sphere(Vec3::new(1.0, 0.0, 2.0), 0.5, MaterialId::DEFAULT).unwrap();
    assert_eq!(tracer.frame_count(), 0);
    assert!(tracer.display().pixels().iter().all(|p| *p == BLACK));
    assert_eq!(tracer.render().unwrap(), FrameStatus::Rendered { frame_count: 1 });
}
