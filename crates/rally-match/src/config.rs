//! Match configuration.

use std::time::Duration;

use rally_protocol::{FieldSpec, Side};
use rally_tick::TickConfig;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// FieldConfig
// ---------------------------------------------------------------------------

/// Playfield geometry and movement tuning.
///
/// Positions use screen coordinates: x grows to the right, y grows down.
/// Paddle positions are the paddle's top edge; the ball position is its
/// centre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    pub width: f32,
    pub height: f32,
    /// Thickness of the top and bottom walls.
    pub wall: f32,
    pub paddle_width: f32,
    pub paddle_height: f32,
    /// Gap between each paddle and its side's screen edge.
    pub paddle_inset: f32,
    pub ball_size: f32,
    /// Paddle travel per tick.
    pub paddle_speed: f32,
    /// Horizontal speed of a fresh serve.
    pub serve_speed: f32,
    /// Horizontal speed gained on every paddle hit.
    pub bounce_speedup: f32,
    /// Horizontal speed never exceeds this.
    pub max_ball_speed: f32,
    /// Vertical speed of a hit on the very edge of a paddle. Centre hits
    /// leave with no vertical speed.
    pub max_bounce_vy: f32,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            width: 640.0,
            height: 480.0,
            wall: 10.0,
            paddle_width: 10.0,
            paddle_height: 50.0,
            paddle_inset: 10.0,
            ball_size: 5.0,
            paddle_speed: 5.0,
            serve_speed: 5.0,
            bounce_speedup: 0.5,
            max_ball_speed: 12.0,
            max_bounce_vy: 6.0,
        }
    }
}

impl FieldConfig {
    /// Returns a geometry the engine can run.
    ///
    /// A field whose walls leave no room between them falls back to the
    /// defaults. A paddle taller than the gap between the walls is shrunk
    /// to fit.
    pub fn validated(mut self) -> Self {
        let playable = self.height - 2.0 * self.wall;
        if !(playable > 0.0 && self.width > 0.0) {
            tracing::warn!(
                width = self.width,
                height = self.height,
                wall = self.wall,
                "field has no playable area, using default geometry"
            );
            return Self::default();
        }
        if !(self.paddle_height > 0.0 && self.paddle_height <= playable) {
            let clamped = self.paddle_height.max(1.0).min(playable);
            tracing::warn!(
                paddle_height = self.paddle_height,
                clamped,
                "paddle does not fit between the walls, clamping"
            );
            self.paddle_height = clamped;
        }
        self
    }

    /// Top edge of a paddle resting at the vertical centre.
    pub fn paddle_home(&self) -> f32 {
        (self.height - self.paddle_height) / 2.0
    }

    /// Lowest and highest legal paddle top edge.
    pub fn paddle_bounds(&self) -> (f32, f32) {
        let min = self.wall;
        let max = self.height - self.wall - self.paddle_height;
        (min, max.max(min))
    }

    /// Left edge of a side's paddle.
    pub fn paddle_x(&self, side: Side) -> f32 {
        match side {
            Side::Left => self.paddle_inset,
            Side::Right => self.width - self.paddle_inset - self.paddle_width,
        }
    }

    /// The wire description sent to clients on seating.
    pub fn spec(&self) -> FieldSpec {
        FieldSpec {
            width: self.width,
            height: self.height,
            wall: self.wall,
            paddle_width: self.paddle_width,
            paddle_height: self.paddle_height,
            ball_size: self.ball_size,
        }
    }
}

// ---------------------------------------------------------------------------
// MatchConfig
// ---------------------------------------------------------------------------

/// Settings for one match actor.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    pub field: FieldConfig,
    /// Simulation and broadcast rate in Hz.
    pub tick_rate: u32,
    /// First side to reach this score wins.
    pub win_score: u32,
    /// How long both players have to vote for a rematch.
    pub rematch_window: Duration,
    /// Per-connection outbound queue length. When a client falls further
    /// behind than this, its oldest queued messages are dropped.
    pub outbox_capacity: usize,
    /// Capacity of the actor's command channel.
    pub command_buffer: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            field: FieldConfig::default(),
            tick_rate: 60,
            win_score: 5,
            rematch_window: Duration::from_secs(30),
            outbox_capacity: 128,
            command_buffer: 256,
        }
    }
}

impl MatchConfig {
    /// Copy with the field geometry made runnable.
    pub fn validated(mut self) -> Self {
        self.field = self.field.validated();
        self
    }

    /// Tick scheduler settings derived from this config.
    pub fn tick_config(&self) -> TickConfig {
        TickConfig::with_rate(self.tick_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_default_matches_classic_layout() {
        let field = FieldConfig::default();
        assert_eq!(field.paddle_home(), 215.0);
        assert_eq!(field.paddle_bounds(), (10.0, 420.0));
        assert_eq!(field.paddle_x(Side::Left), 10.0);
        assert_eq!(field.paddle_x(Side::Right), 620.0);
    }

    #[test]
    fn test_field_spec_copies_geometry() {
        let spec = FieldConfig::default().spec();
        assert_eq!(spec.width, 640.0);
        assert_eq!(spec.height, 480.0);
        assert_eq!(spec.paddle_height, 50.0);
        assert_eq!(spec.ball_size, 5.0);
    }

    #[test]
    fn test_match_config_default() {
        let config = MatchConfig::default();
        assert_eq!(config.tick_rate, 60);
        assert_eq!(config.win_score, 5);
        assert_eq!(config.rematch_window, Duration::from_secs(30));
        assert_eq!(config.tick_config().tick_rate_hz, 60);
    }

    #[test]
    fn test_paddle_bounds_stay_ordered_on_short_field() {
        let field = FieldConfig {
            height: 60.0,
            ..FieldConfig::default()
        };
        let (min, max) = field.paddle_bounds();
        assert!(min <= max);
        assert_eq!((min, max), (10.0, 10.0));
    }

    #[test]
    fn test_validated_shrinks_oversized_paddle() {
        let field = FieldConfig {
            height: 60.0,
            ..FieldConfig::default()
        }
        .validated();
        assert_eq!(field.paddle_height, 40.0);
        assert_eq!(field.paddle_bounds(), (10.0, 10.0));
    }

    #[test]
    fn test_validated_replaces_field_without_playable_area() {
        let field = FieldConfig {
            height: 20.0,
            ..FieldConfig::default()
        }
        .validated();
        assert_eq!(field, FieldConfig::default());
    }

    #[test]
    fn test_validated_keeps_sound_field_and_fixes_match_config() {
        assert_eq!(FieldConfig::default().validated(), FieldConfig::default());
        let config = MatchConfig {
            field: FieldConfig {
                paddle_height: 1_000.0,
                ..FieldConfig::default()
            },
            ..MatchConfig::default()
        }
        .validated();
        assert_eq!(config.field.paddle_height, 460.0);
    }
}
