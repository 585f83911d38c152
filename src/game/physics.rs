//! Combatant movement: horizontal handling, altitude regimes, wall resolution
//!
//! All quantities are per tick: velocities in world units per tick, fuel in
//! units per tick.

use crate::ws::protocol::MovementType;

use super::arena::Arena;
use super::geometry::{push_out_of_rect, rect_circle_overlap, Vec2};
use super::TickInput;

/// Highest reachable altitude
pub const MAX_ALTITUDE: f32 = 100.0;

/// Gap left between a combatant and a wall it was pushed out of
pub const WALL_MARGIN: f32 = 1.0;

/// Horizontal speed above which a gliding archetype counts as moving
pub const GLIDE_MIN_SPEED: f32 = 1.0;

/// How an archetype changes altitude
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VerticalMode {
    /// Ascend/descend burns fuel; gravity pulls down when idle
    Thrust { gravity: f32 },
    /// Ascend/descend freely, holds altitude when idle
    Hover,
    /// Ascending burns fuel; idle sinks slowly while moving, fast while still
    Glide { glide_rate: f32, fall_rate: f32 },
}

/// Movement constants per archetype
#[derive(Debug, Clone, Copy)]
pub struct MovementStats {
    /// Target horizontal speed at full input
    pub max_speed: f32,
    /// Fraction of the gap to target velocity closed each tick
    pub acceleration: f32,
    /// Velocity multiplier applied after acceleration
    pub friction: f32,
    /// Vertical speed while ascending or descending
    pub vertical_speed: f32,
    pub max_fuel: f32,
    /// Fuel spent per tick of thrust
    pub fuel_burn: f32,
    /// Fuel regained per grounded idle tick
    pub fuel_regen: f32,
    pub max_health: f32,
    /// Collision radius
    pub radius: f32,
    pub vertical: VerticalMode,
}

impl MovementStats {
    pub fn for_type(movement: MovementType) -> Self {
        match movement {
            MovementType::Jetpack => Self {
                max_speed: 6.0,
                acceleration: 0.25,
                friction: 0.92,
                vertical_speed: 3.0,
                max_fuel: 100.0,
                fuel_burn: 1.0,
                fuel_regen: 2.0,
                max_health: 100.0,
                radius: 15.0,
                vertical: VerticalMode::Thrust { gravity: 1.5 },
            },
            MovementType::Wings => Self {
                max_speed: 8.0,
                acceleration: 0.12,
                friction: 0.97,
                vertical_speed: 2.5,
                max_fuel: 60.0,
                fuel_burn: 1.5,
                fuel_regen: 1.5,
                max_health: 90.0,
                radius: 16.0,
                vertical: VerticalMode::Glide {
                    glide_rate: 0.4,
                    fall_rate: 2.0,
                },
            },
            MovementType::Levitation => Self {
                max_speed: 4.5,
                acceleration: 0.5,
                friction: 0.85,
                vertical_speed: 2.0,
                max_fuel: 0.0,
                fuel_burn: 0.0,
                fuel_regen: 0.0,
                max_health: 110.0,
                radius: 14.0,
                vertical: VerticalMode::Hover,
            },
        }
    }
}

/// Altitude state carried between ticks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalState {
    pub z: f32,
    pub vz: f32,
    pub fuel: f32,
}

/// Physics system for updating combatant motion
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Target velocity from directional flags. Diagonals are scaled by 1/√2
    /// so they are no faster than a single axis.
    pub fn target_velocity(input: &TickInput, stats: &MovementStats) -> Vec2 {
        let mut dx = 0.0;
        let mut dy = 0.0;
        if input.left {
            dx -= 1.0;
        }
        if input.right {
            dx += 1.0;
        }
        if input.up {
            dy -= 1.0;
        }
        if input.down {
            dy += 1.0;
        }
        if dx != 0.0 && dy != 0.0 {
            dx /= std::f32::consts::SQRT_2;
            dy /= std::f32::consts::SQRT_2;
        }
        Vec2::new(dx * stats.max_speed, dy * stats.max_speed)
    }

    /// Blend velocity toward the input target, then apply friction
    pub fn update_horizontal(velocity: Vec2, input: &TickInput, stats: &MovementStats) -> Vec2 {
        let target = Self::target_velocity(input, stats);
        let blended = velocity + (target - velocity) * stats.acceleration;
        blended * stats.friction
    }

    /// Advance altitude and fuel by one tick
    pub fn update_vertical(
        state: VerticalState,
        input: &TickInput,
        moving: bool,
        stats: &MovementStats,
    ) -> VerticalState {
        let ascend = input.ascend && !input.descend;
        let descend = input.descend && !input.ascend;
        let has_fuel = state.fuel > 0.0;

        let mut fuel = state.fuel;
        let mut thrusting = false;

        let vz = match stats.vertical {
            VerticalMode::Thrust { gravity } => {
                if (ascend || descend) && has_fuel {
                    thrusting = true;
                    fuel -= stats.fuel_burn;
                    if ascend {
                        stats.vertical_speed
                    } else {
                        -stats.vertical_speed
                    }
                } else {
                    -gravity
                }
            }
            VerticalMode::Hover => {
                if ascend {
                    stats.vertical_speed
                } else if descend {
                    -stats.vertical_speed
                } else {
                    0.0
                }
            }
            VerticalMode::Glide {
                glide_rate,
                fall_rate,
            } => {
                if ascend && has_fuel {
                    thrusting = true;
                    fuel -= stats.fuel_burn;
                    stats.vertical_speed
                } else if descend {
                    -stats.vertical_speed
                } else if moving {
                    -glide_rate
                } else {
                    -fall_rate
                }
            }
        };

        let z = (state.z + vz).clamp(0.0, MAX_ALTITUDE);
        let vz = if z <= 0.0 || z >= MAX_ALTITUDE { 0.0 } else { vz };

        if !thrusting && z <= 0.0 {
            fuel += stats.fuel_regen;
        }

        VerticalState {
            z,
            vz,
            fuel: fuel.clamp(0.0, stats.max_fuel),
        }
    }

    /// Integrate position, keep the circle in bounds, then push it out of
    /// each overlapping wall in turn. Each push only looks at the current
    /// position, so a concave corner can leave a residual overlap.
    pub fn integrate(position: Vec2, velocity: Vec2, radius: f32, arena: &Arena) -> Vec2 {
        let mut pos = arena.clamp_circle(position + velocity, radius);
        for wall in &arena.walls {
            if rect_circle_overlap(wall, pos, radius) {
                pos = push_out_of_rect(pos, radius, wall, WALL_MARGIN);
            }
        }
        pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::arena::catalog;

    fn input() -> TickInput {
        TickInput::default()
    }

    #[test]
    fn test_diagonal_not_faster() {
        let stats = MovementStats::for_type(MovementType::Jetpack);
        let axis = PhysicsSystem::target_velocity(
            &TickInput {
                right: true,
                ..input()
            },
            &stats,
        );
        let diag = PhysicsSystem::target_velocity(
            &TickInput {
                right: true,
                down: true,
                ..input()
            },
            &stats,
        );
        assert!((axis.length() - diag.length()).abs() < 1e-4);
    }

    #[test]
    fn test_archetypes_handle_differently() {
        let wings = MovementStats::for_type(MovementType::Wings);
        let lev = MovementStats::for_type(MovementType::Levitation);
        let push = TickInput {
            right: true,
            ..input()
        };

        let mut v_wings = Vec2::ZERO;
        let mut v_lev = Vec2::ZERO;
        for _ in 0..60 {
            v_wings = PhysicsSystem::update_horizontal(v_wings, &push, &wings);
            v_lev = PhysicsSystem::update_horizontal(v_lev, &push, &lev);
        }
        assert!(v_wings.x > v_lev.x);

        // Release: wings coast further than levitation
        for _ in 0..5 {
            v_wings = PhysicsSystem::update_horizontal(v_wings, &input(), &wings);
            v_lev = PhysicsSystem::update_horizontal(v_lev, &input(), &lev);
        }
        assert!(v_wings.x / wings.max_speed > v_lev.x / lev.max_speed);
    }

    #[test]
    fn test_thrust_denied_without_fuel() {
        let stats = MovementStats::for_type(MovementType::Jetpack);
        let up = TickInput {
            ascend: true,
            ..input()
        };
        let state = VerticalState {
            z: 50.0,
            vz: 0.0,
            fuel: 0.0,
        };
        let next = PhysicsSystem::update_vertical(state, &up, false, &stats);
        assert!(next.z < 50.0);
        assert_eq!(next.fuel, 0.0);
    }

    #[test]
    fn test_fuel_regenerates_only_grounded() {
        let stats = MovementStats::for_type(MovementType::Jetpack);
        let airborne = VerticalState {
            z: 80.0,
            vz: 0.0,
            fuel: 10.0,
        };
        let next = PhysicsSystem::update_vertical(airborne, &input(), false, &stats);
        assert_eq!(next.fuel, 10.0);

        let grounded = VerticalState {
            z: 0.0,
            vz: 0.0,
            fuel: 10.0,
        };
        let next = PhysicsSystem::update_vertical(grounded, &input(), false, &stats);
        assert_eq!(next.fuel, 10.0 + stats.fuel_regen);
    }

    #[test]
    fn test_hover_holds_altitude() {
        let stats = MovementStats::for_type(MovementType::Levitation);
        let state = VerticalState {
            z: 42.0,
            vz: 2.0,
            fuel: 0.0,
        };
        let next = PhysicsSystem::update_vertical(state, &input(), false, &stats);
        assert_eq!(next.z, 42.0);
        assert_eq!(next.vz, 0.0);
    }

    #[test]
    fn test_glide_slower_when_moving() {
        let stats = MovementStats::for_type(MovementType::Wings);
        let state = VerticalState {
            z: 50.0,
            vz: 0.0,
            fuel: 0.0,
        };
        let gliding = PhysicsSystem::update_vertical(state, &input(), true, &stats);
        let falling = PhysicsSystem::update_vertical(state, &input(), false, &stats);
        assert!(gliding.z > falling.z);
    }

    #[test]
    fn test_altitude_and_fuel_stay_bounded() {
        let inputs = [
            TickInput {
                ascend: true,
                ..input()
            },
            TickInput {
                descend: true,
                ..input()
            },
            input(),
        ];
        for movement in [
            MovementType::Jetpack,
            MovementType::Wings,
            MovementType::Levitation,
        ] {
            let stats = MovementStats::for_type(movement);
            let mut state = VerticalState {
                z: 0.0,
                vz: 0.0,
                fuel: stats.max_fuel,
            };
            for step in 0..600 {
                let i = &inputs[(step / 70) % inputs.len()];
                state = PhysicsSystem::update_vertical(state, i, step % 2 == 0, &stats);
                assert!((0.0..=MAX_ALTITUDE).contains(&state.z));
                assert!((0.0..=stats.max_fuel).contains(&state.fuel));
            }
        }
    }

    #[test]
    fn test_integrate_pushes_out_of_wall() {
        let arena = catalog().get("foundry").unwrap();
        let wall = arena.walls[0];
        let radius = 15.0;
        // Step into the wall from the left
        let start = Vec2::new(wall.x - radius - 2.0, wall.center().y);
        let pos = PhysicsSystem::integrate(start, Vec2::new(6.0, 0.0), radius, arena);
        assert!(!rect_circle_overlap(&wall, pos, radius));
    }

    #[test]
    fn test_integrate_clamps_to_bounds() {
        let arena = catalog().get("foundry").unwrap();
        let pos = PhysicsSystem::integrate(Vec2::new(5.0, 5.0), Vec2::new(-10.0, -10.0), 15.0, arena);
        assert_eq!(pos, Vec2::new(15.0, 15.0));
    }
}
