// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use glam::{DMat4, DVec3};
use kurbo::Rect;
use understory_scene::{LocalNode, NodeId, Scene};
use understory_viewbox::{
    Canvas, ClipStrategy, Color, Placement, Primitive, SceneGraphRenderer, SoftwareBackend,
    TurntableCamera,
};

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn next_f64(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) / ((1u64 << 53) as f64)
    }
}

/// Two side-by-side view boxes sharing `lines` random line strips.
fn build(lines: usize, clip: ClipStrategy) -> (Canvas, SoftwareBackend) {
    let mut backend = SoftwareBackend::new();
    let mut canvas = Canvas::new((512.0, 256.0));
    let root = canvas.root();
    let vb1 = canvas
        .create_view_box(root, clip, "vb1", Some(Color::YELLOW))
        .unwrap();
    let vb2 = canvas
        .create_view_box(root, clip, "vb2", Some(Color::BLUE))
        .unwrap();
    canvas
        .set_placement(vb1, Placement::Manual(Rect::new(0.0, 0.0, 256.0, 256.0)))
        .unwrap();
    canvas
        .set_placement(vb2, Placement::Manual(Rect::new(256.0, 0.0, 512.0, 256.0)))
        .unwrap();
    canvas
        .view_box_mut(vb2)
        .unwrap()
        .set_camera(TurntableCamera::new());
    let s1 = canvas.view_box(vb1).unwrap().scene();
    let s2 = canvas.view_box(vb2).unwrap().scene();

    let mut rng = Rng::new(0x9E37_79B9_7F4A_7C15);
    for i in 0..lines {
        let pos = (0..32)
            .map(|_| {
                DVec3::new(
                    rng.next_f64() * 2.0 - 1.0,
                    rng.next_f64() * 2.0 - 1.0,
                    0.0,
                )
            })
            .collect();
        let g = backend.add_geometry(pos, Color::WHITE, Primitive::LineStrip);
        let node = canvas
            .scene_mut()
            .insert(
                s1,
                LocalNode::named(format!("line{i}"))
                    .with_geometry(g)
                    .with_transform(DMat4::from_translation(DVec3::new(0.0, 0.0, i as f64))),
            )
            .unwrap();
        canvas.scene_mut().add_parent(node, s2).unwrap();
    }
    (canvas, backend)
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    for &lines in &[16_usize, 256] {
        for clip in [ClipStrategy::Fragment, ClipStrategy::Viewport, ClipStrategy::FBO] {
            let (canvas, mut backend) = build(lines, clip);
            let mut renderer = SceneGraphRenderer::default();
            group.throughput(Throughput::Elements(2 * lines as u64));
            group.bench_function(format!("{clip}/{lines}"), |b| {
                b.iter(|| black_box(renderer.render(black_box(&canvas), &mut backend).unwrap()));
            });
        }
    }
    group.finish();
}

/// A chain `depth` nodes deep, for transform resolution.
fn chain(depth: usize) -> (Scene, NodeId) {
    let mut scene = Scene::new();
    let mut tip = scene.root();
    for _ in 0..depth {
        tip = scene
            .insert(
                tip,
                LocalNode::default().with_transform(DMat4::from_translation(DVec3::X)),
            )
            .unwrap();
    }
    (scene, tip)
}

fn bench_effective_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("effective_transform");
    for &depth in &[8_usize, 64, 512] {
        let (scene, tip) = chain(depth);
        group.bench_function(format!("chain/{depth}"), |b| {
            b.iter(|| black_box(scene.effective_transform(scene.root(), black_box(tip)).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_render, bench_effective_transform);
criterion_main!(benches);
