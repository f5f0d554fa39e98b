use crate::environment::Environment;
use rand::Rng;

/// Draws below this step `+1` on an axis.
const STEP_FORWARD_BELOW: f64 = 0.33;
/// Draws above this step `-1` on an axis.
const STEP_BACK_ABOVE: f64 = 0.66;

/// A forager on the resource plane.
///
/// Agents keep no handle to the environment or the population: the model owns
/// both and passes them in at call time.
#[derive(Clone, Debug, PartialEq)]
pub struct Agent {
    pub id: u32,
    pub x: usize,
    pub y: usize,
    pub store: f64,
    pub bite_size: f64,
    /// Store capacity. Values `<= 0` mean unlimited.
    pub store_size: f64,
}

impl Agent {
    pub fn new(id: u32, x: usize, y: usize, bite_size: f64, store_size: f64) -> Self {
        Self {
            id,
            x,
            y,
            store: 0.0,
            bite_size,
            store_size,
        }
    }

    pub fn position(&self) -> [usize; 2] {
        [self.x, self.y]
    }

    pub fn is_capped(&self) -> bool {
        self.store_size > 0.0
    }

    /// Whether one more bite fits in the store.
    pub fn has_capacity(&self) -> bool {
        !self.is_capped() || self.store + self.bite_size <= self.store_size
    }

    /// Step at most one cell per axis, then wrap into the environment window.
    pub fn move_step<R: Rng>(&mut self, rng: &mut R, environment: &Environment) {
        let dx = random_offset(rng);
        let dy = random_offset(rng);
        self.x = wrap(self.x, dx, environment.x_length());
        self.y = wrap(self.y, dy, environment.y_length());
    }

    /// Take one bite from the current cell if it holds strictly more than a
    /// bite and the store has room. Returns whether a bite was taken.
    pub fn eat(&mut self, environment: &mut Environment) -> bool {
        if environment.get(self.x, self.y) > self.bite_size && self.has_capacity() {
            let taken = environment.take(self.x, self.y, self.bite_size);
            self.store += taken;
            true
        } else {
            false
        }
    }

    pub fn distance_to(&self, other: &Agent) -> f64 {
        distance(self.position(), other.position())
    }
}

fn random_offset<R: Rng>(rng: &mut R) -> i64 {
    let r = rng.random::<f64>();
    if r < STEP_FORWARD_BELOW {
        1
    } else if r > STEP_BACK_ABOVE {
        -1
    } else {
        0
    }
}

fn wrap(coord: usize, delta: i64, length: usize) -> usize {
    if length == 0 {
        return coord;
    }
    (coord as i64 + delta).rem_euclid(length as i64) as usize
}

/// Plain Euclidean distance between two grid positions.
pub fn distance(a: [usize; 2], b: [usize; 2]) -> f64 {
    let dx = a[0] as f64 - b[0] as f64;
    let dy = a[1] as f64 - b[1] as f64;
    (dx * dx + dy * dy).sqrt()
}

/// Average stores pairwise between `agents[index]` and each listed neighbour,
/// in list order. Each pair uses the stores as they stand at that moment, so
/// the result depends on the order of `neighbours`.
pub fn share_with(agents: &mut [Agent], index: usize, neighbours: &[usize]) {
    for &other in neighbours {
        if other == index {
            continue;
        }
        let mean = (agents[index].store + agents[other].store) / 2.0;
        agents[index].store = mean;
        agents[other].store = mean;
    }
}

/// Indices of every other agent within `radius` of `agents[index]`, in
/// population order.
pub fn neighbours_within(agents: &[Agent], index: usize, radius: f64) -> Vec<usize> {
    let me = agents[index].position();
    agents
        .iter()
        .enumerate()
        .filter(|(i, other)| *i != index && distance(me, other.position()) <= radius)
        .map(|(i, _)| i)
        .collect()
}

/// Linear-scan form of neighbour sharing over the whole population.
pub fn share_with_neighbours(agents: &mut [Agent], index: usize, radius: f64) {
    let neighbours = neighbours_within(agents, index, radius);
    share_with(agents, index, &neighbours);
}
