//! Fixed hexagonal map layout.
//!
//! Seven hexagons of size 2500: one at the origin, six around it. Player
//! spawn anchors are the deduplicated hexagon vertices; neutral bases sit on
//! the six outer centers plus the origin. Bushes and rocks are scattered
//! with minimum distances from every base.

use std::f64::consts::PI;

use rand::Rng;

use crate::core::polygon::{Polygon, Shape};
use crate::core::position::{TilePos, WorldPos};

pub const HEXAGON_SIZE: f64 = 2500.0;
pub const BUSH_COUNT: usize = 30;
pub const ROCK_COUNT: usize = 20;
const SCATTER_RADIUS: f64 = 8000.0;
const BUSH_MIN_DISTANCE: i16 = 800;
const ROCK_MIN_DISTANCE: i16 = 1000;

/// A static obstacle; units and unit-fired bullets die on contact.
pub struct Rock {
    pub polygon: Polygon,
    pub size: i32,
}

pub struct MapLayout {
    pub player_positions: Vec<TilePos>,
    pub neutral_positions: Vec<TilePos>,
    pub bushes: Vec<TilePos>,
    pub rocks: Vec<Rock>,
}

fn hexagon_vertices(center: TilePos, size: f64) -> Vec<TilePos> {
    (0..6)
        .map(|i| {
            let angle = PI / 3.0 * f64::from(i);
            TilePos {
                x: center.x + (size * angle.cos()).round() as i16,
                y: center.y + (size * angle.sin()).round() as i16,
            }
        })
        .collect()
}

/// Box-distance closeness test used by all scatter checks.
fn too_close(a: TilePos, b: TilePos, range: i16) -> bool {
    (a.x - b.x).abs() <= range && (a.y - b.y).abs() <= range
}

fn generate_anchor_grid() -> (Vec<TilePos>, Vec<TilePos>) {
    let mut player_positions = hexagon_vertices(TilePos::new(0, 0), HEXAGON_SIZE);
    let mut neutral_positions = Vec::new();

    let offsets = [
        (0.0, HEXAGON_SIZE * 3f64.sqrt()),
        (HEXAGON_SIZE * 1.5, HEXAGON_SIZE * 3f64.sqrt() / 2.0),
        (-HEXAGON_SIZE * 1.5, HEXAGON_SIZE * 3f64.sqrt() / 2.0),
        (-HEXAGON_SIZE * 1.5, -HEXAGON_SIZE * 3f64.sqrt() / 2.0),
        (HEXAGON_SIZE * 1.5, -HEXAGON_SIZE * 3f64.sqrt() / 2.0),
        (0.0, -HEXAGON_SIZE * 3f64.sqrt()),
    ];
    for (dx, dy) in offsets {
        let center = TilePos::new(dx.round() as i16, dy.round() as i16);
        player_positions.extend(hexagon_vertices(center, HEXAGON_SIZE));
        neutral_positions.push(center);
    }
    neutral_positions.push(TilePos::new(0, 0));

    // Neighboring hexagons share vertices; keep one anchor per spot.
    let mut unique: Vec<TilePos> = Vec::with_capacity(player_positions.len());
    for pos in player_positions {
        if !unique.iter().any(|&u| too_close(pos, u, 1)) {
            unique.push(pos);
        }
    }
    (unique, neutral_positions)
}

fn scatter_bushes(players: &[TilePos], neutrals: &[TilePos]) -> Vec<TilePos> {
    let mut rng = rand::thread_rng();
    let mut bushes: Vec<TilePos> = Vec::with_capacity(BUSH_COUNT);
    while bushes.len() < BUSH_COUNT {
        let angle = rng.gen_range(0.0..2.0 * PI);
        let distance = rng.gen_range(0.0..SCATTER_RADIUS);
        let pos = TilePos {
            x: (distance * angle.cos()) as i16,
            y: (distance * angle.sin()) as i16,
        };
        let clear = players
            .iter()
            .chain(neutrals.iter())
            .chain(bushes.iter())
            .all(|&other| !too_close(pos, other, BUSH_MIN_DISTANCE));
        if clear {
            bushes.push(pos);
        }
    }
    bushes
}

fn rock_at(pos: TilePos, size: i32, rng: &mut impl Rng) -> Rock {
    let mut polygon = Polygon::generate(Shape::Hexagon, size, 0.0);
    polygon.set_rotation(rng.gen_range(0.0..2.0 * PI));
    polygon.set_center(WorldPos::new(f32::from(pos.x), f32::from(pos.y)));
    Rock { polygon, size }
}

fn scatter_rocks(players: &[TilePos], neutrals: &[TilePos]) -> Vec<Rock> {
    let mut rng = rand::thread_rng();
    let mut rocks: Vec<Rock> = Vec::with_capacity(ROCK_COUNT);

    let is_clear = |pos: TilePos| {
        players
            .iter()
            .chain(neutrals.iter())
            .all(|&base| !too_close(pos, base, ROCK_MIN_DISTANCE))
    };

    // Half the rocks are large formations with satellite debris.
    while rocks.len() < ROCK_COUNT / 2 {
        let angle = rng.gen_range(0.0..2.0 * PI);
        let distance = rng.gen_range(0.0..SCATTER_RADIUS);
        let pos = TilePos {
            x: (distance * angle.cos()) as i16,
            y: (distance * angle.sin()) as i16,
        };
        if !is_clear(pos) {
            continue;
        }
        let size = rng.gen_range(60..100);
        rocks.push(rock_at(pos, size, &mut rng));

        let satellites = rng.gen_range(2..4);
        for _ in 0..satellites {
            let sat_angle = rng.gen_range(0.0..2.0 * PI);
            let factor = rng.gen_range(2.0..3.0);
            let sat = TilePos {
                x: (f64::from(pos.x) + factor * f64::from(size) * sat_angle.cos()) as i16,
                y: (f64::from(pos.y) + factor * f64::from(size) * sat_angle.sin()) as i16,
            };
            let sat_size = rng.gen_range(20..60);
            rocks.push(rock_at(sat, sat_size, &mut rng));
        }
    }

    // Fill the remainder with free-standing large rocks.
    while rocks.len() < ROCK_COUNT {
        let angle = rng.gen_range(0.0..2.0 * PI);
        let distance = rng.gen_range(0.0..SCATTER_RADIUS);
        let pos = TilePos {
            x: (distance * angle.cos()) as i16,
            y: (distance * angle.sin()) as i16,
        };
        if !is_clear(pos) {
            continue;
        }
        let size = rng.gen_range(60..100);
        rocks.push(rock_at(pos, size, &mut rng));
    }
    rocks
}

/// Build the whole map: anchors, bushes, rocks.
pub fn generate_layout() -> MapLayout {
    let (player_positions, neutral_positions) = generate_anchor_grid();
    let bushes = scatter_bushes(&player_positions, &neutral_positions);
    let rocks = scatter_rocks(&player_positions, &neutral_positions);
    MapLayout {
        player_positions,
        neutral_positions,
        bushes,
        rocks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seven_neutral_bases_with_origin_last() {
        let (_, neutrals) = generate_anchor_grid();
        assert_eq!(neutrals.len(), 7);
        assert_eq!(*neutrals.last().unwrap(), TilePos::new(0, 0));
    }

    #[test]
    fn player_anchors_are_deduplicated() {
        let (players, _) = generate_anchor_grid();
        // 7 hexagons x 6 vertices = 42 raw anchors; shared edges collapse.
        assert!(players.len() < 42);
        assert!(players.len() >= 24);
        for (i, a) in players.iter().enumerate() {
            for b in &players[i + 1..] {
                assert!(!too_close(*a, *b, 1), "{a:?} duplicates {b:?}");
            }
        }
    }

    #[test]
    fn bushes_respect_spacing() {
        let layout = generate_layout();
        assert_eq!(layout.bushes.len(), BUSH_COUNT);
        for (i, a) in layout.bushes.iter().enumerate() {
            for b in &layout.bushes[i + 1..] {
                assert!(!too_close(*a, *b, BUSH_MIN_DISTANCE));
            }
            for base in layout
                .player_positions
                .iter()
                .chain(layout.neutral_positions.iter())
            {
                assert!(!too_close(*a, *base, BUSH_MIN_DISTANCE));
            }
        }
    }

    #[test]
    fn rock_count_is_met() {
        let layout = generate_layout();
        assert!(layout.rocks.len() >= ROCK_COUNT);
        for rock in &layout.rocks {
            assert!((20..100).contains(&rock.size));
        }
    }
}
