//! Per-player camera state.
//!
//! The client streams viewport updates; the server tracks them behind a
//! cooldown. The selective per-view resend this enables is intentionally not
//! performed yet; see the camera intent handler.

use std::time::{Duration, Instant};

use crate::core::position::TilePos;

#[derive(Clone, Copy, Debug)]
pub struct CameraBounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

pub struct Camera {
    pub position: TilePos,
    zoom: f32,
    min_zoom: f32,
    max_zoom: f32,
    screen_width: i32,
    screen_height: i32,
    pub bounds: CameraBounds,
    last_update: Instant,
    cooldown: Duration,
}

impl Camera {
    pub fn new() -> Self {
        let mut camera = Self {
            position: TilePos::new(0, 0),
            zoom: 0.75,
            min_zoom: 0.5,
            max_zoom: 1.5,
            screen_width: 1920,
            screen_height: 1080,
            bounds: CameraBounds {
                left: 0,
                top: 0,
                right: 0,
                bottom: 0,
            },
            last_update: Instant::now(),
            cooldown: Duration::from_millis(250),
        };
        camera.update_bounds();
        camera
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
    }

    pub fn update_bounds(&mut self) {
        let half_width = (self.screen_width as f32 / self.zoom) / 2.0;
        let half_height = (self.screen_height as f32 / self.zoom) / 2.0;
        self.bounds = CameraBounds {
            left: (f32::from(self.position.x) - half_width) as i32,
            top: (f32::from(self.position.y) - half_height) as i32,
            right: (f32::from(self.position.x) + half_width) as i32,
            bottom: (f32::from(self.position.y) + half_height) as i32,
        };
    }

    pub fn can_update(&self) -> bool {
        self.last_update.elapsed() >= self.cooldown
    }

    pub fn touch(&mut self) {
        self.last_update = Instant::now();
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.bounds.left && x <= self.bounds.right && y >= self.bounds.top && y <= self.bounds.bottom
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_is_clamped() {
        let mut c = Camera::new();
        c.set_zoom(5.0);
        assert_eq!(c.zoom, 1.5);
        c.set_zoom(0.1);
        assert_eq!(c.zoom, 0.5);
    }

    #[test]
    fn bounds_center_on_position() {
        let mut c = Camera::new();
        c.position = TilePos::new(100, -100);
        c.update_bounds();
        assert!(c.contains(100, -100));
        assert!(!c.contains(100 + 4000, -100));
        assert_eq!((c.bounds.left + c.bounds.right) / 2, 100);
    }
}
