//! Scripted gestures for running a session without a pointer device.

use std::f32::consts::TAU;
use std::thread;
use std::time::Duration;

use duet_collab::StrokeSynchronizer;
use duet_core::{Point, ViewportSize};

/// Points along an outward spiral around `center`.
pub fn spiral(center: Point, max_radius: f32, turns: f32, steps: usize) -> Vec<Point> {
    let steps = steps.max(2);
    (0..steps)
        .map(|i| {
            let t = i as f32 / (steps - 1) as f32;
            let angle = t * turns * TAU;
            let r = t * max_radius;
            Point::new(center.x + r * angle.cos(), center.y + r * angle.sin())
        })
        .collect()
}

/// A left-to-right zig-zag inside the box at `origin` of `size`.
pub fn zigzag(origin: Point, size: ViewportSize, teeth: usize, steps_per_edge: usize) -> Vec<Point> {
    let teeth = teeth.max(1);
    let steps = steps_per_edge.max(1);
    let edges = teeth * 2;
    let edge_width = size.width / edges as f32;

    let mut points = vec![origin];
    for edge in 0..edges {
        let (from_y, to_y) = if edge % 2 == 0 {
            (origin.y, origin.y + size.height)
        } else {
            (origin.y + size.height, origin.y)
        };
        let x0 = origin.x + edge as f32 * edge_width;
        for s in 1..=steps {
            let f = s as f32 / steps as f32;
            points.push(Point::new(x0 + f * edge_width, from_y + f * (to_y - from_y)));
        }
    }
    points
}

/// Feed one gesture through the synchronizer, pausing `pace` between
/// pointer events.
pub fn replay(sync: &StrokeSynchronizer, points: &[Point], pace: Duration) {
    let Some((first, rest)) = points.split_first() else {
        return;
    };
    sync.begin(*first);
    let Some((last, middle)) = rest.split_last() else {
        sync.end(*first);
        return;
    };
    for p in middle {
        if !pace.is_zero() {
            thread::sleep(pace);
        }
        sync.extend(*p);
    }
    sync.end(*last);
}

/// Draw a spiral followed by a zig-zag sized to `viewport`.
pub fn play(sync: &StrokeSynchronizer, viewport: ViewportSize, pace: Duration) {
    let center = Point::new(viewport.width / 2.0, viewport.height / 2.0);
    let radius = viewport.width.min(viewport.height) * 0.4;
    replay(sync, &spiral(center, radius, 4.0, 600), pace);

    let margin = Point::new(viewport.width * 0.1, viewport.height * 0.1);
    let area = ViewportSize::new(viewport.width * 0.8, viewport.height * 0.2);
    replay(sync, &zigzag(margin, area, 6, 20), pace);
    log::info!("Demo gestures finished");
}
