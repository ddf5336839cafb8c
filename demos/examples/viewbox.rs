// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Two view boxes over one scene.
//!
//! The left box clips in the fragment stage and looks through a pan/zoom camera; the right box
//! clips with the hardware viewport and looks through a turntable camera. A plot line and two boxes
//! are shared by both views, and two more boxes exist only in the 3D view. Both view boxes are
//! placed manually, so they keep their rectangles when the canvas is resized.
//!
//! Run:
//! - `RUST_LOG=debug cargo run -p understory_demos --example viewbox`

use glam::DVec3;
use kurbo::{Point, Rect};
use understory_scene::LocalNode;
use understory_viewbox::{
    Canvas, CanvasEvent, ClipStrategy, Color, InputEvent, Placement, Primitive, RenderError,
    SceneGraphRenderer, SoftwareBackend, TurntableCamera, UpAxis,
};

/// Xorshift generator with Box-Muller normal samples.
struct Rng(u64);

impl Rng {
    fn next_f64(&mut self) -> f64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        ((x >> 11) as f64) / ((1u64 << 53) as f64)
    }

    fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(f64::MIN_POSITIVE);
        let u2 = self.next_f64();
        mean + std_dev * (-2.0 * u1.ln()).sqrt() * (core::f64::consts::TAU * u2).cos()
    }
}

fn square(scale: f64, offset: f64, z: f64) -> Vec<DVec3> {
    [[0., 0.], [0., 1.], [1., 1.], [1., 0.], [0., 0.]]
        .iter()
        .map(|[x, y]| DVec3::new(x * scale + offset, y * scale + offset, z * scale + offset))
        .collect()
}

fn main() -> Result<(), RenderError> {
    env_logger::init();

    let mut backend = SoftwareBackend::new();
    let mut canvas = Canvas::new((800.0, 600.0));
    let root = canvas.root();

    let vb1 = canvas.create_view_box(root, ClipStrategy::Fragment, "vb1", Some(Color::YELLOW))?;
    let vb2 = canvas.create_view_box(root, ClipStrategy::Viewport, "vb2", Some(Color::BLUE))?;
    canvas.set_placement(vb1, Placement::Manual(Rect::new(0.0, 0.0, 400.0, 600.0)))?;
    canvas.set_placement(vb2, Placement::Manual(Rect::new(400.0, 0.0, 800.0, 600.0)))?;
    if let Some(vb) = canvas.view_box_mut(vb2) {
        vb.set_camera(
            TurntableCamera::new()
                .with_elevation(30.0)
                .with_azimuth(30.0)
                .with_up(UpAxis::PosY),
        );
    }
    let s1 = canvas
        .view_box(vb1)
        .ok_or(RenderError::UnknownViewBox(vb1))?
        .scene();
    let s2 = canvas
        .view_box(vb2)
        .ok_or(RenderError::UnknownViewBox(vb2))?
        .scene();

    // A plot line shown in both view boxes.
    const N: usize = 1000;
    let mut rng = Rng(0x2545_F491_4F6C_DD1D);
    let pos = (0..N)
        .map(|i| {
            let x = -1.0 + 2.0 * i as f64 / (N - 1) as f64;
            let y = if i < 20 { -0.5 } else { rng.normal(0.0, 0.5) };
            DVec3::new(x, y, 0.0)
        })
        .collect();
    let line = backend.add_geometry(pos, Color::WHITE, Primitive::LineStrip);
    let line1 = canvas
        .scene_mut()
        .insert(s1, LocalNode::named("line1").with_geometry(line))?;
    // Already a child of vb1; adding the same edge again changes nothing.
    canvas.scene_mut().add_parent(line1, s1)?;
    canvas.scene_mut().add_parent(line1, s2)?;

    // Two boxes shared by both views.
    let unit = backend.add_geometry(
        square(1.0, 0.0, 0.0),
        Color::from_unit(0.7, 0.0, 0.0, 1.0),
        Primitive::LineStrip,
    );
    let nd = backend.add_geometry(
        square(2.0, -1.0, 0.0),
        Color::from_unit(0.0, 0.7, 0.0, 1.0),
        Primitive::LineStrip,
    );
    let box1 = canvas
        .scene_mut()
        .insert(s1, LocalNode::named("unit box").with_geometry(unit))?;
    canvas.scene_mut().add_parent(box1, s2)?;
    let box2 = canvas
        .scene_mut()
        .insert(s1, LocalNode::named("nd box").with_geometry(nd))?;
    canvas.scene_mut().add_parent(box2, s2)?;

    // Two boxes lifted to z = 1, only in the 3D view.
    let unit_z = backend.add_geometry(square(1.0, 0.0, 1.0), Color::RED, Primitive::LineStrip);
    let nd_z = backend.add_geometry(square(2.0, -1.0, 1.0), Color::GREEN, Primitive::LineStrip);
    canvas
        .scene_mut()
        .insert(s2, LocalNode::named("unit box").with_geometry(unit_z))?;
    canvas
        .scene_mut()
        .insert(s2, LocalNode::named("nd box").with_geometry(nd_z))?;

    println!("{}", canvas.describe_tree(true));

    let mut renderer = SceneGraphRenderer::default();
    canvas.post(CanvasEvent::FrameTick);
    // Orbit the 3D view, then zoom the 2D view around a point left of its center.
    for event in [
        InputEvent::PointerDown {
            position: Point::new(600.0, 300.0),
        },
        InputEvent::PointerMove {
            position: Point::new(640.0, 280.0),
        },
        InputEvent::PointerUp {
            position: Point::new(640.0, 280.0),
        },
        InputEvent::Scroll {
            position: Point::new(100.0, 300.0),
            delta: 2.0,
        },
    ] {
        canvas.post(CanvasEvent::Input(event));
    }
    canvas.post(CanvasEvent::FrameTick);
    canvas.post(CanvasEvent::Resize {
        width: 400.0,
        height: 300.0,
    });
    canvas.post(CanvasEvent::FrameTick);

    let summary = canvas.process_events(&mut renderer, &mut backend)?;
    println!(
        "{} events, {} frames, last frame: {:?}",
        summary.processed, summary.frames, summary.last_frame
    );
    for vb in canvas.view_boxes() {
        println!(
            "{} \"{}\": {} camera, {} clip, rect {:?}, visible {:?}",
            vb.id(),
            vb.name(),
            vb.camera().name(),
            vb.clip(),
            vb.rect(),
            canvas.clip_rect(vb.id())
        );
    }

    canvas.post(CanvasEvent::Destroy);
    canvas.process_events(&mut renderer, &mut backend)?;
    Ok(())
}
