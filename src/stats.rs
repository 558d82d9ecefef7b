//! Rolling flock metrics for the graphs panel and the audit.

use macroquad::prelude::Vec3;

use crate::flock::FlockRegistry;
use crate::math::normalize_or_zero;

/// Ring buffer that stores the last N samples of a metric.
pub struct RingBuffer {
    data: Vec<f32>,
    head: usize,
    len: usize,
    capacity: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            data: vec![0.0; capacity],
            head: 0,
            len: 0,
            capacity,
        }
    }

    pub fn push(&mut self, value: f32) {
        self.data[self.head] = value;
        self.head = (self.head + 1) % self.capacity;
        if self.len < self.capacity {
            self.len += 1;
        }
    }

    /// Samples in chronological order.
    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        let start = if self.len < self.capacity {
            0
        } else {
            self.head
        };
        (0..self.len).map(move |i| self.data[(start + i) % self.capacity])
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn last(&self) -> Option<f32> {
        if self.len == 0 {
            None
        } else {
            let idx = (self.head + self.capacity - 1) % self.capacity;
            Some(self.data[idx])
        }
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}

/// One measurement of the whole flock.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FlockMetrics {
    pub agent_count: usize,
    pub avg_speed: f32,
    pub max_speed: f32,
    /// Length of the mean unit velocity: 1 when everyone flies the same way, ~0 when scattered.
    pub polarization: f32,
    pub avg_neighbors: f32,
    /// Mean distance from the flock centroid.
    pub spread: f32,
}

impl FlockMetrics {
    pub fn measure(flock: &FlockRegistry) -> Self {
        let n = flock.len();
        if n == 0 {
            return Self::default();
        }

        let mut speed_sum = 0.0;
        let mut max_speed = 0.0f32;
        let mut heading_sum = Vec3::ZERO;
        let mut neighbor_sum = 0u64;
        let mut centroid = Vec3::ZERO;
        for (_, agent) in flock.all_agents() {
            let speed = agent.speed();
            speed_sum += speed;
            max_speed = max_speed.max(speed);
            heading_sum += normalize_or_zero(agent.velocity);
            neighbor_sum += agent.neighbor_count as u64;
            centroid += agent.position;
        }
        let inv = 1.0 / n as f32;
        centroid *= inv;

        let spread = flock
            .all_agents()
            .map(|(_, a)| a.position.distance(centroid))
            .sum::<f32>()
            * inv;

        Self {
            agent_count: n,
            avg_speed: speed_sum * inv,
            max_speed,
            polarization: (heading_sum * inv).length(),
            avg_neighbors: neighbor_sum as f32 * inv,
            spread,
        }
    }
}

/// All tracked flock statistics.
pub struct FlockStats {
    pub agent_count: RingBuffer,
    pub avg_speed: RingBuffer,
    pub polarization: RingBuffer,
    pub avg_neighbors: RingBuffer,
    pub spread: RingBuffer,
    pub sample_interval: u32,
    pub tick_counter: u32,
}

impl FlockStats {
    pub fn new(capacity: usize) -> Self {
        Self {
            agent_count: RingBuffer::new(capacity),
            avg_speed: RingBuffer::new(capacity),
            polarization: RingBuffer::new(capacity),
            avg_neighbors: RingBuffer::new(capacity),
            spread: RingBuffer::new(capacity),
            sample_interval: 10, // sample every N ticks
            tick_counter: 0,
        }
    }

    /// Call once per tick; a sample is kept every `sample_interval` ticks.
    pub fn record(&mut self, flock: &FlockRegistry) {
        self.tick_counter += 1;
        if self.tick_counter % self.sample_interval.max(1) != 0 {
            return;
        }

        let m = FlockMetrics::measure(flock);
        self.agent_count.push(m.agent_count as f32);
        self.avg_speed.push(m.avg_speed);
        self.polarization.push(m.polarization);
        self.avg_neighbors.push(m.avg_neighbors);
        self.spread.push(m.spread);
    }

    pub fn clear(&mut self) {
        self.agent_count.clear();
        self.avg_speed.clear();
        self.polarization.clear();
        self.avg_neighbors.clear();
        self.spread.clear();
        self.tick_counter = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;
    use macroquad::prelude::vec3;

    #[test]
    fn ring_buffer_iterates_in_insertion_order_after_wrap() {
        let mut buf = RingBuffer::new(3);
        buf.push(1.0);
        buf.push(2.0);
        buf.push(3.0);
        buf.push(4.0);

        let values: Vec<f32> = buf.iter().collect();
        assert_eq!(values, vec![2.0, 3.0, 4.0]);
        assert_eq!(buf.last(), Some(4.0));
    }

    #[test]
    fn aligned_flock_is_fully_polarized() {
        let mut flock = FlockRegistry::default();
        flock.add_agent(Agent::new(vec3(-1.0, 0.0, 0.0), vec3(0.0, 0.0, 2.0)));
        flock.add_agent(Agent::new(vec3(1.0, 0.0, 0.0), vec3(0.0, 0.0, 4.0)));
        let m = FlockMetrics::measure(&flock);
        assert_eq!(m.agent_count, 2);
        assert!((m.polarization - 1.0).abs() < 1e-5);
        assert!((m.avg_speed - 3.0).abs() < 1e-5);
        assert_eq!(m.max_speed, 4.0);
        assert!((m.spread - 1.0).abs() < 1e-5);
    }

    #[test]
    fn opposed_headings_cancel_out() {
        let mut flock = FlockRegistry::default();
        flock.add_agent(Agent::new(Vec3::ZERO, Vec3::X));
        flock.add_agent(Agent::new(Vec3::ZERO, -Vec3::X));
        assert!(FlockMetrics::measure(&flock).polarization < 1e-5);
        assert_eq!(FlockMetrics::measure(&FlockRegistry::default()), FlockMetrics::default());
    }

    #[test]
    fn stats_sample_every_interval() {
        let mut flock = FlockRegistry::default();
        flock.add_agent(Agent::new(Vec3::ZERO, Vec3::X));
        let mut stats = FlockStats::new(8);
        stats.sample_interval = 2;

        stats.record(&flock);
        assert!(stats.avg_speed.is_empty());
        stats.record(&flock);
        assert_eq!(stats.avg_speed.iter().collect::<Vec<_>>(), vec![1.0]);
        assert_eq!(stats.agent_count.last(), Some(1.0));
    }
}
