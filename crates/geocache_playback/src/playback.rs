/// Shared clock for every track of one renderable object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackState {
    /// Elapsed playback time in seconds
    pub time: f32,
    pub looping: bool,
    pub backward: bool,
    /// Multiplier applied by [`PlaybackState::step`]; also scales motion vectors
    pub speed: f32,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            time: 0.0,
            looping: true,
            backward: false,
            speed: 1.0,
        }
    }
}

impl PlaybackState {
    /// Time after `dt` wall-clock seconds at the current speed and direction.
    #[must_use]
    pub fn step(&self, dt: f32) -> f32 {
        let direction = if self.backward { -1.0 } else { 1.0 };
        self.time + dt * self.speed * direction
    }
}
