//! Static arena geometry
//!
//! Arenas are immutable balance data looked up by id. Rooms only ever read
//! from them; per-match state (breakable obstacles) is instantiated from the
//! templates here at match start.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::OnceLock;

use super::geometry::{point_in_rect, Rect, Vec2};

/// Raised surface. Carried for clients as an altitude hint only.
#[derive(Debug, Clone)]
pub struct Platform {
    pub rect: Rect,
    pub height: f32,
}

/// Breakable obstacle as authored in the arena
#[derive(Debug, Clone)]
pub struct ObstacleTemplate {
    pub rect: Rect,
    pub health: f32,
}

/// Connector that moves a combatant into another arena
#[derive(Debug, Clone)]
pub struct Door {
    pub rect: Rect,
    pub target_arena: &'static str,
    /// Arrival point in the target arena (must lie outside its doors)
    pub target: Vec2,
}

#[derive(Debug, Clone)]
pub struct Arena {
    pub id: &'static str,
    pub width: f32,
    pub height: f32,
    /// Solid walls block movement, shots and projectiles
    pub walls: Vec<Rect>,
    pub platforms: Vec<Platform>,
    pub spawn_points: Vec<Vec2>,
    pub obstacles: Vec<ObstacleTemplate>,
    pub doors: Vec<Door>,
}

impl Arena {
    /// Whether a point lies within the arena bounds
    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= 0.0 && point.x <= self.width && point.y >= 0.0 && point.y <= self.height
    }

    /// Clamp a circle's center so the circle stays inside the arena
    pub fn clamp_circle(&self, center: Vec2, radius: f32) -> Vec2 {
        Vec2::new(
            center.x.clamp(radius, (self.width - radius).max(radius)),
            center.y.clamp(radius, (self.height - radius).max(radius)),
        )
    }

    /// Spawn point for the participant at `index`, wrapping around
    pub fn spawn_point(&self, index: usize) -> Vec2 {
        if self.spawn_points.is_empty() {
            return Vec2::new(self.width / 2.0, self.height / 2.0);
        }
        self.spawn_points[index % self.spawn_points.len()]
    }

    pub fn door_at(&self, point: Vec2) -> Option<&Door> {
        self.doors.iter().find(|d| point_in_rect(point, &d.rect))
    }
}

/// A breakable obstacle live in a match
#[derive(Debug, Clone)]
pub struct Obstacle {
    pub id: u32,
    pub arena_id: &'static str,
    pub rect: Rect,
    pub health: f32,
    pub max_health: f32,
}

impl Obstacle {
    pub fn from_template(id: u32, arena_id: &'static str, template: &ObstacleTemplate) -> Self {
        Self {
            id,
            arena_id,
            rect: template.rect,
            health: template.health,
            max_health: template.health,
        }
    }
}

/// Read-only lookup of every arena known to the server
pub struct ArenaCatalog {
    arenas: HashMap<&'static str, Arena>,
}

impl ArenaCatalog {
    pub fn get(&self, id: &str) -> Option<&Arena> {
        self.arenas.get(id)
    }

    /// The arena `start` plus every arena reachable from it through doors,
    /// in breadth-first order starting with `start`.
    pub fn connected(&self, start: &str) -> Vec<&Arena> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();
        let mut out = Vec::new();

        if let Some(arena) = self.get(start) {
            seen.insert(arena.id);
            queue.push_back(arena);
        }
        while let Some(arena) = queue.pop_front() {
            out.push(arena);
            for door in &arena.doors {
                if let Some(next) = self.get(door.target_arena) {
                    if seen.insert(next.id) {
                        queue.push_back(next);
                    }
                }
            }
        }
        out
    }

    /// Fresh obstacles for a match played from `start`
    pub fn instantiate_obstacles(&self, start: &str) -> Vec<Obstacle> {
        let mut next_id = 0;
        let mut obstacles = Vec::new();
        for arena in self.connected(start) {
            for template in &arena.obstacles {
                next_id += 1;
                obstacles.push(Obstacle::from_template(next_id, arena.id, template));
            }
        }
        obstacles
    }
}

static CATALOG: OnceLock<ArenaCatalog> = OnceLock::new();

/// Process-wide arena catalog
pub fn catalog() -> &'static ArenaCatalog {
    CATALOG.get_or_init(|| {
        let arenas = [foundry(), vault()]
            .into_iter()
            .map(|a| (a.id, a))
            .collect();
        ArenaCatalog { arenas }
    })
}

fn foundry() -> Arena {
    Arena {
        id: "foundry",
        width: 1600.0,
        height: 1000.0,
        walls: vec![
            Rect::new(700.0, 200.0, 200.0, 40.0),
            Rect::new(700.0, 760.0, 200.0, 40.0),
            Rect::new(300.0, 400.0, 40.0, 200.0),
            Rect::new(1260.0, 400.0, 40.0, 200.0),
        ],
        platforms: vec![
            Platform {
                rect: Rect::new(100.0, 100.0, 200.0, 150.0),
                height: 40.0,
            },
            Platform {
                rect: Rect::new(1300.0, 750.0, 200.0, 150.0),
                height: 40.0,
            },
        ],
        spawn_points: vec![
            Vec2::new(150.0, 500.0),
            Vec2::new(1450.0, 500.0),
            Vec2::new(800.0, 100.0),
            Vec2::new(800.0, 900.0),
        ],
        obstacles: vec![
            ObstacleTemplate {
                rect: Rect::new(500.0, 300.0, 60.0, 60.0),
                health: 50.0,
            },
            ObstacleTemplate {
                rect: Rect::new(1040.0, 640.0, 60.0, 60.0),
                health: 50.0,
            },
            ObstacleTemplate {
                rect: Rect::new(780.0, 470.0, 40.0, 60.0),
                health: 100.0,
            },
        ],
        doors: vec![Door {
            rect: Rect::new(1560.0, 460.0, 40.0, 80.0),
            target_arena: "vault",
            target: Vec2::new(80.0, 400.0),
        }],
    }
}

fn vault() -> Arena {
    Arena {
        id: "vault",
        width: 1000.0,
        height: 800.0,
        walls: vec![
            Rect::new(450.0, 0.0, 100.0, 250.0),
            Rect::new(450.0, 550.0, 100.0, 250.0),
        ],
        platforms: vec![Platform {
            rect: Rect::new(700.0, 300.0, 200.0, 200.0),
            height: 60.0,
        }],
        spawn_points: vec![
            Vec2::new(100.0, 250.0),
            Vec2::new(900.0, 400.0),
            Vec2::new(250.0, 650.0),
            Vec2::new(750.0, 650.0),
        ],
        obstacles: vec![ObstacleTemplate {
            rect: Rect::new(480.0, 350.0, 40.0, 100.0),
            health: 75.0,
        }],
        doors: vec![Door {
            rect: Rect::new(0.0, 360.0, 40.0, 80.0),
            target_arena: "foundry",
            target: Vec2::new(1500.0, 500.0),
        }],
    }
}
