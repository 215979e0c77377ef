//! Fixed-step body and ball physics
//!
//! Every step uses only IEEE-754 single precision add, sub, mul, div and sqrt,
//! which round identically on every supported target. Nothing here may call
//! transcendental functions or fused multiply-add, otherwise peers and replays
//! drift apart.

use glam::Vec2;

use super::events::{MatchEvent, MatchEventKind};
use super::field::*;
use super::input::PlayerInput;
use super::snapshot::PhysicsState;

// x87-only targets compute in extended precision and would break replays.
#[cfg(all(target_arch = "x86", not(target_feature = "sse2")))]
compile_error!("deterministic physics requires SSE2 floating point on 32-bit x86");

/// Fallback direction for degenerate contacts (straight up)
const UP: Vec2 = Vec2::new(0.0, -1.0);

#[derive(Debug, Clone, Copy, Default)]
struct Body {
    position: Vec2,
    velocity: Vec2,
    posture: f32,
    animation_speed: f32,
    enabled: bool,
}

/// Physics world: one body per enabled slot plus the ball
#[derive(Debug, Clone)]
pub struct PhysicsWorld {
    bodies: [Body; MAX_PLAYERS],
    ball_position: Vec2,
    ball_velocity: Vec2,
    ball_rotation: f32,
    ball_angular_velocity: f32,
}

impl PhysicsWorld {
    pub fn new(enabled: [bool; MAX_PLAYERS]) -> Self {
        let mut bodies = [Body::default(); MAX_PLAYERS];
        for slot in PlayerSlot::ALL {
            let body = &mut bodies[slot.index()];
            body.enabled = enabled[slot.index()];
            if body.enabled {
                body.position = Vec2::new(slot.spawn_x(), GROUND_PLANE_HEIGHT);
            }
        }

        Self {
            bodies,
            ball_position: Vec2::new(LEFT_SERVE_X, STANDARD_BALL_HEIGHT),
            ball_velocity: Vec2::ZERO,
            ball_rotation: 0.0,
            ball_angular_velocity: STANDARD_BALL_ANGULAR_VELOCITY,
        }
    }

    /// Advance the world by one tick and return the events in emission order
    pub fn step(
        &mut self,
        inputs: &[PlayerInput; MAX_PLAYERS],
        ball_valid: bool,
        game_running: bool,
    ) -> Vec<MatchEvent> {
        let mut events = Vec::new();

        for slot in PlayerSlot::ALL {
            if self.bodies[slot.index()].enabled {
                self.handle_body(slot, inputs[slot.index()]);
            }
        }

        if game_running {
            // dt = 1: ds = a/2 * dt^2 + v * dt, dv = a * dt
            self.ball_position += Vec2::new(0.0, 0.5 * BALL_GRAVITATION) + self.ball_velocity;
            self.ball_velocity.y += BALL_GRAVITATION;
        }

        if ball_valid {
            for slot in PlayerSlot::ALL {
                if self.bodies[slot.index()].enabled {
                    if let Some(intensity) = self.handle_body_ball_collision(slot) {
                        events.push(MatchEvent::body_hit(slot, intensity));
                    }
                }
            }

            // teammates share a side, so only they can bump into each other
            for i in 0..MAX_PLAYERS {
                for j in (i + 2..MAX_PLAYERS).step_by(2) {
                    if self.bodies[i].enabled && self.bodies[j].enabled {
                        self.handle_bodies_collision(i, j);
                    }
                }
            }
        }

        self.handle_ball_world_collisions(&mut events);
        self.clamp_bodies();
        self.advance_rotation(game_running);

        events
    }

    fn handle_body(&mut self, slot: PlayerSlot, input: PlayerInput) {
        let grounded = self.body_grounded(slot);
        let body = &mut self.bodies[slot.index()];
        let mut gravity = GRAVITATION;

        if input.jump {
            if grounded {
                body.velocity.y = BODY_JUMP_VELOCITY;
                start_animation(body);
            }
            // holding jump gives a floatier arc
            gravity -= BODY_JUMP_BUFFER;
        }

        if (input.left || input.right) && grounded {
            start_animation(body);
        }

        body.velocity.x = (if input.right { BODY_SPEED } else { 0.0 })
            - (if input.left { BODY_SPEED } else { 0.0 });

        body.position += Vec2::new(0.0, 0.5 * gravity) + body.velocity;
        body.velocity.y += gravity;

        if body.position.y > GROUND_PLANE_HEIGHT {
            if body.velocity.y > BODY_LANDING_ANIMATION_SPEED {
                start_animation(body);
            }
            body.position.y = GROUND_PLANE_HEIGHT;
            body.velocity.y = 0.0;
        }

        animation_step(body);
    }

    /// Returns the hit intensity when the ball touches the body
    fn handle_body_ball_collision(&mut self, slot: PlayerSlot) -> Option<f32> {
        let body = self.bodies[slot.index()];
        let lower = body.position + Vec2::new(0.0, BODY_LOWER_SPHERE);
        let upper = body.position - Vec2::new(0.0, BODY_UPPER_SPHERE);

        let contact = if circles_overlap(self.ball_position, BALL_RADIUS, lower, BODY_LOWER_RADIUS) {
            lower
        } else if circles_overlap(self.ball_position, BALL_RADIUS, upper, BODY_UPPER_RADIUS) {
            upper
        } else {
            return None;
        };

        let intensity = ((body.velocity - self.ball_velocity).length() / HIT_INTENSITY_SCALE).min(1.0);

        self.ball_velocity = unit_or_up(self.ball_position - contact) * BALL_COLLISION_VELOCITY;
        self.ball_position += self.ball_velocity;
        Some(intensity)
    }

    fn handle_bodies_collision(&mut self, i: usize, j: usize) {
        let a = self.bodies[i].position;
        let b = self.bodies[j].position;
        let a_lower = a + Vec2::new(0.0, BODY_LOWER_SPHERE);
        let a_upper = a - Vec2::new(0.0, BODY_UPPER_SPHERE);
        let b_lower = b + Vec2::new(0.0, BODY_LOWER_SPHERE);
        let b_upper = b - Vec2::new(0.0, BODY_UPPER_SPHERE);

        let touching = circles_overlap(a_lower, BODY_LOWER_RADIUS, b_lower, BODY_LOWER_RADIUS)
            || circles_overlap(a_upper, BODY_UPPER_RADIUS, b_lower, BODY_LOWER_RADIUS)
            || circles_overlap(a_lower, BODY_LOWER_RADIUS, b_upper, BODY_UPPER_RADIUS);
        if !touching {
            return;
        }

        let push = unit_or_up(b - a) * BODY_PUSH_VELOCITY;
        self.bodies[j].velocity = push;
        self.bodies[i].velocity = -push;
        self.bodies[j].position += push;
        self.bodies[i].position -= push;
    }

    fn handle_ball_world_collisions(&mut self, events: &mut Vec<MatchEvent>) {
        if self.ball_position.y + BALL_RADIUS > GROUND_PLANE_HEIGHT_MAX {
            self.ball_velocity = Vec2::new(self.ball_velocity.x, -self.ball_velocity.y) * GROUND_DAMPING;
            self.ball_position.y = GROUND_PLANE_HEIGHT_MAX - BALL_RADIUS;
            events.push(MatchEvent::for_side(
                MatchEventKind::BallHitGround,
                Side::of_x(self.ball_position.x),
            ));
        }

        let net_top = Vec2::new(NET_POSITION_X, NET_SPHERE_POSITION);

        if self.ball_position.x - BALL_RADIUS <= LEFT_PLANE && self.ball_velocity.x < 0.0 {
            self.ball_velocity.x = -self.ball_velocity.x;
            self.ball_position.x = LEFT_PLANE + BALL_RADIUS;
            events.push(MatchEvent::for_side(MatchEventKind::BallHitWall, Side::Left));
        } else if self.ball_position.x + BALL_RADIUS >= RIGHT_PLANE && self.ball_velocity.x > 0.0 {
            self.ball_velocity.x = -self.ball_velocity.x;
            self.ball_position.x = RIGHT_PLANE - BALL_RADIUS;
            events.push(MatchEvent::for_side(MatchEventKind::BallHitWall, Side::Right));
        } else if self.ball_position.y > NET_SPHERE_POSITION
            && (self.ball_position.x - NET_POSITION_X).abs() < BALL_RADIUS + NET_RADIUS
        {
            // stem of the net
            let side = Side::of_x(self.ball_position.x);
            self.ball_velocity.x = -self.ball_velocity.x;
            self.ball_position.x = match side {
                Side::Right => NET_POSITION_X + BALL_RADIUS + NET_RADIUS,
                Side::Left => NET_POSITION_X - BALL_RADIUS - NET_RADIUS,
            };
            events.push(MatchEvent::for_side(MatchEventKind::BallHitNet, side));
        } else if (net_top - self.ball_position).length() < NET_RADIUS + BALL_RADIUS {
            let normal = unit_or_up(net_top - self.ball_position);

            // split kinetic energy into normal and tangential parts
            let along = normal.dot(self.ball_velocity);
            let mut normal_energy = along * along;
            let mut tangent_energy = (self.ball_velocity.length_squared() - normal_energy).max(0.0);
            normal_energy *= NET_NORMAL_DAMPING;
            tangent_energy *= NET_TANGENT_DAMPING;
            let speed = (normal_energy + tangent_energy).sqrt();

            let reflected = self.ball_velocity - normal * (2.0 * along);
            self.ball_velocity = unit_or_up(reflected) * speed;
            self.ball_position = net_top - normal * (NET_RADIUS + BALL_RADIUS);
            events.push(MatchEvent::new(MatchEventKind::BallHitNetTop, None));
        }
    }

    /// Keep bodies on their own half and inside the field
    fn clamp_bodies(&mut self) {
        for slot in PlayerSlot::ALL {
            let body = &mut self.bodies[slot.index()];
            if !body.enabled {
                continue;
            }

            match slot.side() {
                Side::Right => {
                    if body.position.x - BODY_LOWER_RADIUS < NET_POSITION_X + NET_RADIUS {
                        body.position.x = NET_POSITION_X + NET_RADIUS + BODY_LOWER_RADIUS;
                    }
                    if body.position.x > RIGHT_PLANE {
                        body.position.x = RIGHT_PLANE;
                    }
                }
                Side::Left => {
                    if body.position.x + BODY_LOWER_RADIUS > NET_POSITION_X - NET_RADIUS {
                        body.position.x = NET_POSITION_X - NET_RADIUS - BODY_LOWER_RADIUS;
                    }
                    if body.position.x < LEFT_PLANE {
                        body.position.x = LEFT_PLANE;
                    }
                }
            }
        }
    }

    fn advance_rotation(&mut self, game_running: bool) {
        if !game_running {
            self.ball_rotation -= self.ball_angular_velocity;
        } else {
            let spin = self.ball_angular_velocity * (self.ball_velocity.length() / BALL_SPIN_DIVISOR);
            if self.ball_velocity.x > 0.0 {
                self.ball_rotation += spin;
            } else {
                self.ball_rotation -= spin;
            }
        }

        if self.ball_rotation <= 0.0 {
            self.ball_rotation += BALL_ROTATION_WRAP;
        } else if self.ball_rotation >= BALL_ROTATION_WRAP {
            self.ball_rotation -= BALL_ROTATION_WRAP;
        }
    }

    pub fn body_grounded(&self, slot: PlayerSlot) -> bool {
        self.bodies[slot.index()].position.y >= GROUND_PLANE_HEIGHT
    }

    pub fn body_position(&self, slot: PlayerSlot) -> Vec2 {
        self.bodies[slot.index()].position
    }

    pub fn set_body_position(&mut self, slot: PlayerSlot, position: Vec2) {
        self.bodies[slot.index()].position = position;
    }

    pub fn body_velocity(&self, slot: PlayerSlot) -> Vec2 {
        self.bodies[slot.index()].velocity
    }

    pub fn set_body_velocity(&mut self, slot: PlayerSlot, velocity: Vec2) {
        self.bodies[slot.index()].velocity = velocity;
    }

    pub fn body_posture(&self, slot: PlayerSlot) -> f32 {
        self.bodies[slot.index()].posture
    }

    pub fn set_body_posture(&mut self, slot: PlayerSlot, posture: f32) {
        self.bodies[slot.index()].posture = posture;
    }

    pub fn player_enabled(&self, slot: PlayerSlot) -> bool {
        self.bodies[slot.index()].enabled
    }

    pub fn enabled_slots(&self) -> [bool; MAX_PLAYERS] {
        self.bodies.map(|body| body.enabled)
    }

    pub fn set_player_enabled(&mut self, slot: PlayerSlot, enabled: bool) {
        self.bodies[slot.index()].enabled = enabled;
    }

    pub fn ball_position(&self) -> Vec2 {
        self.ball_position
    }

    pub fn set_ball_position(&mut self, position: Vec2) {
        self.ball_position = position;
    }

    pub fn ball_velocity(&self) -> Vec2 {
        self.ball_velocity
    }

    pub fn set_ball_velocity(&mut self, velocity: Vec2) {
        self.ball_velocity = velocity;
    }

    pub fn ball_rotation(&self) -> f32 {
        self.ball_rotation
    }

    pub fn ball_angular_velocity(&self) -> f32 {
        self.ball_angular_velocity
    }

    pub fn set_ball_angular_velocity(&mut self, angular_velocity: f32) {
        self.ball_angular_velocity = angular_velocity;
    }

    /// Snapshot of all enabled bodies and the ball; disabled slots stay zeroed
    pub fn state(&self) -> PhysicsState {
        let mut state = PhysicsState::default();
        for (i, body) in self.bodies.iter().enumerate() {
            if body.enabled {
                state.body_position[i] = body.position;
                state.body_velocity[i] = body.velocity;
                state.body_posture[i] = body.posture;
                state.body_animation_speed[i] = body.animation_speed;
                state.enabled[i] = true;
            }
        }

        state.ball_position = self.ball_position;
        state.ball_velocity = self.ball_velocity;
        state.ball_rotation = self.ball_rotation;
        state.ball_angular_velocity = self.ball_angular_velocity;
        state
    }

    /// Restore a snapshot. Only slots enabled locally are overwritten, and a
    /// slot the snapshot marks disabled gets disabled here too.
    pub fn set_state(&mut self, state: &PhysicsState) {
        for (i, body) in self.bodies.iter_mut().enumerate() {
            if body.enabled {
                body.position = state.body_position[i];
                body.velocity = state.body_velocity[i];
                body.posture = state.body_posture[i];
                body.animation_speed = state.body_animation_speed[i];
                body.enabled = state.enabled[i];
            }
        }

        self.ball_position = state.ball_position;
        self.ball_velocity = state.ball_velocity;
        self.ball_rotation = state.ball_rotation;
        self.ball_angular_velocity = state.ball_angular_velocity;
    }
}

fn start_animation(body: &mut Body) {
    if body.animation_speed == 0.0 {
        body.animation_speed = BODY_ANIMATION_SPEED;
    }
}

fn animation_step(body: &mut Body) {
    if body.posture < 0.0 {
        body.animation_speed = 0.0;
        body.posture = 0.0;
    }
    if body.posture >= 4.5 {
        body.animation_speed = -BODY_ANIMATION_SPEED;
    }

    body.posture += body.animation_speed;

    if body.posture >= 5.0 {
        body.posture = 4.99;
    }
}

fn circles_overlap(a: Vec2, radius_a: f32, b: Vec2, radius_b: f32) -> bool {
    let max_distance = radius_a + radius_b;
    (a - b).length_squared() < max_distance * max_distance
}

fn unit_or_up(v: Vec2) -> Vec2 {
    let length = v.length();
    if length > 0.0 {
        v / length
    } else {
        UP
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUEL: [bool; MAX_PLAYERS] = [true, true, false, false];
    const IDLE: [PlayerInput; MAX_PLAYERS] = [PlayerInput {
        left: false,
        right: false,
        jump: false,
    }; MAX_PLAYERS];

    fn with_input(slot: PlayerSlot, input: PlayerInput) -> [PlayerInput; MAX_PLAYERS] {
        let mut inputs = IDLE;
        inputs[slot.index()] = input;
        inputs
    }

    #[test]
    fn idle_body_stays_on_the_ground() {
        let mut world = PhysicsWorld::new(DUEL);
        for _ in 0..500 {
            world.step(&IDLE, false, false);
            assert_eq!(world.body_position(PlayerSlot::Left).y, GROUND_PLANE_HEIGHT);
            assert_eq!(world.body_position(PlayerSlot::Right).y, GROUND_PLANE_HEIGHT);
            assert_eq!(world.body_velocity(PlayerSlot::Left), Vec2::ZERO);
        }
    }

    #[test]
    fn jump_only_works_from_the_ground() {
        let mut world = PhysicsWorld::new(DUEL);
        let jump = with_input(PlayerSlot::Left, PlayerInput::new(false, false, true));

        world.step(&jump, false, false);
        let after_first = world.body_velocity(PlayerSlot::Left).y;
        let held_gravity = GRAVITATION - BODY_JUMP_BUFFER;
        assert_eq!(after_first, BODY_JUMP_VELOCITY + held_gravity);

        // still airborne: holding jump only lowers gravity
        world.step(&jump, false, false);
        assert_eq!(
            world.body_velocity(PlayerSlot::Left).y,
            after_first + held_gravity
        );
        assert!(world.body_position(PlayerSlot::Left).y < GROUND_PLANE_HEIGHT);

        // eventually lands and rests
        for _ in 0..200 {
            world.step(&IDLE, false, false);
        }
        assert_eq!(world.body_position(PlayerSlot::Left).y, GROUND_PLANE_HEIGHT);
    }

    #[test]
    fn horizontal_input_sets_velocity_directly() {
        let mut world = PhysicsWorld::new(DUEL);
        let right = with_input(PlayerSlot::Left, PlayerInput::new(false, true, false));
        let start = world.body_position(PlayerSlot::Left).x;
        world.step(&right, false, false);
        assert_eq!(world.body_velocity(PlayerSlot::Left).x, BODY_SPEED);
        assert_eq!(world.body_position(PlayerSlot::Left).x, start + BODY_SPEED);
        assert!(world.body_posture(PlayerSlot::Left) > 0.0);

        world.step(&IDLE, false, false);
        assert_eq!(world.body_velocity(PlayerSlot::Left).x, 0.0);
    }

    #[test]
    fn bodies_cannot_cross_the_net_or_leave_the_field() {
        let mut world = PhysicsWorld::new(DUEL);
        let left_runs_right = PlayerInput::new(false, true, false);
        let right_runs_right = PlayerInput::new(false, true, false);
        let mut inputs = IDLE;
        inputs[0] = left_runs_right;
        inputs[1] = right_runs_right;
        for _ in 0..300 {
            world.step(&inputs, false, false);
        }
        assert_eq!(
            world.body_position(PlayerSlot::Left).x,
            NET_POSITION_X - NET_RADIUS - BODY_LOWER_RADIUS
        );
        assert_eq!(world.body_position(PlayerSlot::Right).x, RIGHT_PLANE);
    }

    #[test]
    fn posture_stays_in_range() {
        let mut world = PhysicsWorld::new(DUEL);
        let run = with_input(PlayerSlot::Left, PlayerInput::new(true, false, false));
        for _ in 0..200 {
            world.step(&run, false, false);
            let posture = world.body_posture(PlayerSlot::Left);
            assert!((-BODY_ANIMATION_SPEED..5.0).contains(&posture), "posture {posture}");
        }
    }

    #[test]
    fn dropped_ball_bounces_with_damping() {
        let mut world = PhysicsWorld::new(DUEL);
        world.set_ball_position(Vec2::new(-100.0, 200.0));
        world.set_ball_velocity(Vec2::ZERO);

        let mut previous = world.ball_velocity();
        for _ in 0..200 {
            let events = world.step(&IDLE, false, true);
            if events.iter().any(|e| e.kind == MatchEventKind::BallHitGround) {
                let impact = previous.y + BALL_GRAVITATION;
                let after = world.ball_velocity();
                assert!(after.y < 0.0);
                assert!((after.y + impact * GROUND_DAMPING).abs() < 1e-4);
                assert_eq!(after.x, 0.0);
                assert_eq!(world.ball_position().y, GROUND_PLANE_HEIGHT_MAX - BALL_RADIUS);
                assert_eq!(events[0].team(), Some(Side::Left));
                return;
            }
            previous = world.ball_velocity();
        }
        panic!("ball never reached the ground");
    }

    #[test]
    fn ball_is_frozen_while_game_is_not_running() {
        let mut world = PhysicsWorld::new(DUEL);
        let start = world.ball_position();
        let rotation = world.ball_rotation();
        world.step(&IDLE, true, false);
        assert_eq!(world.ball_position(), start);
        assert_ne!(world.ball_rotation(), rotation);
        let rotation = world.ball_rotation();
        assert!(rotation > 0.0 && rotation < BALL_ROTATION_WRAP);
    }

    #[test]
    fn ball_bounces_off_the_wall() {
        let mut world = PhysicsWorld::new(DUEL);
        world.set_ball_position(Vec2::new(LEFT_PLANE + BALL_RADIUS + 1.0, 150.0));
        world.set_ball_velocity(Vec2::new(-5.0, 0.0));
        let events = world.step(&IDLE, false, true);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, MatchEventKind::BallHitWall);
        assert_eq!(events[0].team(), Some(Side::Left));
        assert_eq!(world.ball_velocity().x, 5.0);
    }

    #[test]
    fn ball_hits_net_stem_from_the_right() {
        let mut world = PhysicsWorld::new(DUEL);
        world.set_ball_position(Vec2::new(45.0, 400.0));
        world.set_ball_velocity(Vec2::new(-8.0, 0.0));
        let events = world.step(&IDLE, false, true);
        assert_eq!(events[0].kind, MatchEventKind::BallHitNet);
        assert_eq!(events[0].team(), Some(Side::Right));
        assert_eq!(world.ball_velocity().x, 8.0);
        assert_eq!(world.ball_position().x, BALL_RADIUS + NET_RADIUS);
    }

    #[test]
    fn ball_on_net_top_loses_energy() {
        let mut world = PhysicsWorld::new(DUEL);
        world.set_ball_position(Vec2::new(-5.0, NET_SPHERE_POSITION - 44.0));
        world.set_ball_velocity(Vec2::new(0.0, 6.0));
        let speed_before = (world.ball_velocity() + Vec2::new(0.0, BALL_GRAVITATION)).length();
        let events = world.step(&IDLE, false, true);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, MatchEventKind::BallHitNetTop);
        assert_eq!(events[0].side, None);
        assert!(world.ball_velocity().length() < speed_before);
        assert!(world.ball_velocity().y < 0.0);
    }

    #[test]
    fn jumping_body_hits_the_ball() {
        let mut world = PhysicsWorld::new(DUEL);
        let jump = with_input(PlayerSlot::Left, PlayerInput::new(false, false, true));
        for _ in 0..60 {
            let events = world.step(&jump, true, false);
            if let Some(hit) = events.iter().find(|e| e.kind == MatchEventKind::BallHitBody) {
                assert_eq!(hit.side, Some(PlayerSlot::Left));
                assert!((0.0..=1.0).contains(&hit.intensity));
                let speed = world.ball_velocity().length();
                assert!((speed - BALL_COLLISION_VELOCITY).abs() < 1e-3);
                // ball leaves upward, body is directly below it
                assert!(world.ball_velocity().y < 0.0);
                return;
            }
        }
        panic!("body never reached the ball");
    }

    #[test]
    fn teammates_push_each_other_apart() {
        let mut world = PhysicsWorld::new([true, true, true, false]);
        world.set_body_position(PlayerSlot::Left2, Vec2::new(-190.0, GROUND_PLANE_HEIGHT));
        world.step(&IDLE, true, false);
        let a = world.body_position(PlayerSlot::Left).x;
        let b = world.body_position(PlayerSlot::Left2).x;
        assert!(a < -200.0 && b > -190.0);
    }

    #[test]
    fn identical_inputs_give_identical_results() {
        let mut a = PhysicsWorld::new(DUEL);
        let mut b = PhysicsWorld::new(DUEL);
        a.set_ball_velocity(Vec2::new(3.3, -7.1));
        b.set_ball_velocity(Vec2::new(3.3, -7.1));
        let inputs = [
            PlayerInput::new(false, true, true),
            PlayerInput::new(true, false, true),
            PlayerInput::default(),
            PlayerInput::default(),
        ];
        for _ in 0..400 {
            let ea = a.step(&inputs, true, true);
            let eb = b.step(&inputs, true, true);
            assert_eq!(ea, eb);
            assert_eq!(a.state(), b.state());
        }
    }

    #[test]
    fn state_round_trip_is_lossless() {
        let mut world = PhysicsWorld::new(DUEL);
        let inputs = with_input(PlayerSlot::Right, PlayerInput::new(true, false, true));
        for _ in 0..20 {
            world.step(&inputs, true, true);
        }
        let snapshot = world.state();
        let mut copy = PhysicsWorld::new(DUEL);
        copy.set_state(&snapshot);
        assert_eq!(copy.state(), snapshot);
    }
}
